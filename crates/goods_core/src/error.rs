use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type surfaced by the command-line entry point.
#[derive(Error, Debug)]
pub enum GoodsError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    Input(String),

    #[error("Key store error: {0}")]
    KeyStore(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Transaction failed: {0}")]
    Execution(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Classification of errors for logging and exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Unknown network, unreadable config, bad RPC override.
    ConfigError,
    /// Malformed positional argument, environment value or input file.
    UserError,
    /// RPC unreachable, timed out, or the chain rejected the transaction.
    OperationError,
    /// Local storage or a bug.
    SystemError,
}

impl GoodsError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) => ErrorCategory::ConfigError,
            Self::Input(_) => ErrorCategory::UserError,
            Self::KeyStore(_) => ErrorCategory::SystemError,
            Self::Network(_) => ErrorCategory::OperationError,
            Self::Execution(_) => ErrorCategory::OperationError,
            Self::Internal(_) => ErrorCategory::SystemError,
        }
    }

    /// Process exit code: 2 when nothing was attempted, 1 when an operation failed.
    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::ConfigError | ErrorCategory::UserError => 2,
            ErrorCategory::OperationError | ErrorCategory::SystemError => 1,
        }
    }

    /// Short hint printed after the error itself.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Config(_) => Some("Check NETWORK and ~/.goods/config.json."),
            Self::KeyStore(_) => {
                Some("Is the signing key present under the key store for this network?")
            }
            Self::Network(_) => Some("Check the RPC endpoint and your connection."),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_and_input_errors_exit_with_two() {
        assert_eq!(GoodsError::Config("unknown network".into()).exit_code(), 2);
        assert_eq!(GoodsError::Input("bad number".into()).exit_code(), 2);
    }

    #[test]
    fn operation_errors_exit_with_one() {
        assert_eq!(GoodsError::Network("timeout".into()).exit_code(), 1);
        assert_eq!(GoodsError::Execution("panicked".into()).exit_code(), 1);
        assert_eq!(GoodsError::KeyStore("missing".into()).exit_code(), 1);
    }

    #[test]
    fn categories() {
        assert_eq!(GoodsError::Config(String::new()).category(), ErrorCategory::ConfigError);
        assert_eq!(GoodsError::Input(String::new()).category(), ErrorCategory::UserError);
        assert_eq!(
            GoodsError::Execution(String::new()).category(),
            ErrorCategory::OperationError
        );
        assert_eq!(GoodsError::Internal(String::new()).category(), ErrorCategory::SystemError);
    }

    #[test]
    fn display_includes_detail() {
        let err = GoodsError::Execution("Smart contract panicked: Unauthorized".into());
        assert_eq!(
            err.to_string(),
            "Transaction failed: Smart contract panicked: Unauthorized"
        );
    }

    #[test]
    fn hints_only_where_actionable() {
        assert!(GoodsError::Config(String::new()).hint().is_some());
        assert!(GoodsError::Input(String::new()).hint().is_none());
    }
}
