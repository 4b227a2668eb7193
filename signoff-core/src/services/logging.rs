//! Logging service

use crate::models::LogLevel;

/// Initialize logging with the specified level
///
/// `RUST_LOG` is not consulted; the level applies to the signoff crates only.
pub fn init_logging(level: LogLevel) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = match level {
        LogLevel::Error => "signoff_core=error,signoff=error",
        LogLevel::Warn => "signoff_core=warn,signoff=warn",
        LogLevel::Info => "signoff_core=info,signoff=info",
        LogLevel::Debug => "signoff_core=debug,signoff=debug",
        LogLevel::Trace => "signoff_core=trace,signoff=trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()?;

    Ok(())
}

/// Log a rejected engine operation with its subject
pub fn log_operation_failure(operation: &str, subject: &str, error: &str) {
    tracing::warn!(
        operation = operation,
        subject = subject,
        error = error,
        "Engine operation failed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Once;

    static INIT: Once = Once::new();

    fn init_test_logging() {
        INIT.call_once(|| {
            let _ = init_logging(LogLevel::Info);
        });
    }

    #[test]
    fn test_logging_initialization() {
        // A second global subscriber is refused, not a panic
        init_test_logging();
        assert!(init_logging(LogLevel::Debug).is_err());
    }

    #[test]
    fn test_log_functions() {
        init_test_logging();
        log_operation_failure("approve", "task 42", "already approved");
    }
}
