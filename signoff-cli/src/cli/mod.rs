//! CLI command handling

pub mod config;
pub mod definition;
pub mod definition_handlers;
pub mod handlers;
pub mod instance;
pub mod instance_handlers;
pub mod session;
pub mod task;
pub mod task_handlers;
