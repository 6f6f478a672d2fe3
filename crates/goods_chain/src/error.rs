//! Chain error types.

use std::path::PathBuf;
use std::time::Duration;

use goods_core::GoodsError;

/// Errors that can occur in the goods_chain crate.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// The network id has no profile.
    #[error("Unknown network: {0}")]
    UnknownNetwork(String),

    /// No key store directory is configured and the default cannot be found.
    #[error("Cannot locate the key store: {0}; set key_store_dir in the config")]
    KeyStoreLocation(String),

    /// A string that is not a valid NEAR account id.
    #[error("Invalid account id {id:?}: {reason}")]
    InvalidAccountId { id: String, reason: String },

    /// No key for the account in the key store.
    #[error("No key for {account_id} on {network} in {}", dir.display())]
    KeyNotFound {
        account_id: String,
        network: String,
        dir: PathBuf,
    },

    /// A key file exists but cannot be parsed.
    #[error("Corrupt key file {}: {reason}", path.display())]
    CorruptKey { path: PathBuf, reason: String },

    /// The account to be created already exists on chain.
    #[error("Account already exists: {0}")]
    AccountExists(String),

    /// The method is not part of the contract's declared interface.
    #[error("{method} is not a declared {classification} method of the {contract} contract")]
    MethodNotDeclared {
        contract: &'static str,
        method: String,
        classification: &'static str,
    },

    /// A change call was attempted without a signing key.
    #[error("Change method {0} needs a signer")]
    MissingSigner(String),

    /// Transport or RPC handler error.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// The transaction was included but failed.
    #[error("Execution failed: {0}")]
    Execution(String),

    /// An RPC round trip exceeded the configured timeout.
    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    /// The contract binary is missing or empty.
    #[error("Bad contract artifact {}: {reason}", path.display())]
    Artifact { path: PathBuf, reason: String },

    /// A metadata / zone / royalty file that cannot be used.
    #[error("Bad input file {}: {reason}", path.display())]
    InputFile { path: PathBuf, reason: String },

    /// JSON serialization / deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ChainError> for GoodsError {
    fn from(err: ChainError) -> Self {
        let msg = err.to_string();
        match err {
            ChainError::UnknownNetwork(_) | ChainError::KeyStoreLocation(_) => {
                GoodsError::Config(msg)
            }
            ChainError::InvalidAccountId { .. }
            | ChainError::MethodNotDeclared { .. }
            | ChainError::MissingSigner(_)
            | ChainError::Artifact { .. }
            | ChainError::InputFile { .. } => GoodsError::Input(msg),
            ChainError::KeyNotFound { .. } | ChainError::CorruptKey { .. } => {
                GoodsError::KeyStore(msg)
            }
            ChainError::Rpc(_) | ChainError::Timeout(_) => GoodsError::Network(msg),
            ChainError::AccountExists(_) | ChainError::Execution(_) => GoodsError::Execution(msg),
            ChainError::Serialization(_) | ChainError::Io(_) => GoodsError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_network_is_a_config_error() {
        let err: GoodsError = ChainError::UnknownNetwork("moonnet".into()).into();
        assert!(matches!(err, GoodsError::Config(_)));
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("moonnet"));
    }

    #[test]
    fn missing_key_store_location_is_a_config_error() {
        let err: GoodsError =
            ChainError::KeyStoreLocation("Could not determine home directory".into()).into();
        assert!(matches!(err, GoodsError::Config(_)));
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("key_store_dir"));
    }

    #[test]
    fn execution_failure_exits_with_one() {
        let err: GoodsError = ChainError::Execution("Unauthorized".into()).into();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn undeclared_method_message() {
        let err = ChainError::MethodNotDeclared {
            contract: "rocks",
            method: "mint_rock".into(),
            classification: "change",
        };
        assert_eq!(
            err.to_string(),
            "mint_rock is not a declared change method of the rocks contract"
        );
    }
}
