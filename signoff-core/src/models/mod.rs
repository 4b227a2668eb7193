//! Data models for signoff

pub mod configuration;
pub mod definition;
pub mod history;
pub mod instance;
pub mod task;

pub use configuration::*;
pub use definition::*;
pub use history::*;
pub use instance::*;
pub use task::*;
