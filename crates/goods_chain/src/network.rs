use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use goods_core::GoodsConfig;
use near_primitives::types::AccountId;
use serde::{Deserialize, Serialize};

use crate::error::ChainError;

/// NEAR networks the tool knows endpoints for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
    Betanet,
    Localnet,
}

impl Network {
    pub const ALL: [Network; 4] = [
        Network::Mainnet,
        Network::Testnet,
        Network::Betanet,
        Network::Localnet,
    ];

    /// The id used in `NETWORK` and as the key store sub-directory.
    pub fn id(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Betanet => "betanet",
            Network::Localnet => "localnet",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Network::Mainnet => "NEAR Mainnet",
            Network::Testnet => "NEAR Testnet",
            Network::Betanet => "NEAR Betanet",
            Network::Localnet => "Local node",
        }
    }

    /// Parse a network id. `local` is accepted for [`Network::Localnet`].
    pub fn from_id(id: &str) -> Option<Self> {
        match id.trim().to_ascii_lowercase().as_str() {
            "mainnet" => Some(Network::Mainnet),
            "testnet" => Some(Network::Testnet),
            "betanet" => Some(Network::Betanet),
            "localnet" | "local" => Some(Network::Localnet),
            _ => None,
        }
    }

    /// Top-level account whose `create_account` method funds new top-level accounts.
    pub fn registrar(&self) -> Option<&'static str> {
        match self {
            Network::Mainnet => Some("near"),
            Network::Testnet => Some("testnet"),
            Network::Betanet => Some("betanet"),
            Network::Localnet => None,
        }
    }

    fn default_endpoints(&self) -> Endpoints {
        match self {
            Network::Mainnet => Endpoints {
                rpc: "https://rpc.mainnet.near.org",
                wallet: "https://app.mynearwallet.com",
                helper: "https://helper.mainnet.near.org",
                explorer: "https://nearblocks.io",
            },
            Network::Testnet => Endpoints {
                rpc: "https://rpc.testnet.near.org",
                wallet: "https://testnet.mynearwallet.com",
                helper: "https://helper.testnet.near.org",
                explorer: "https://testnet.nearblocks.io",
            },
            Network::Betanet => Endpoints {
                rpc: "https://rpc.betanet.near.org",
                wallet: "https://wallet.betanet.near.org",
                helper: "https://helper.betanet.near.org",
                explorer: "https://explorer.betanet.near.org",
            },
            Network::Localnet => Endpoints {
                rpc: "http://127.0.0.1:3030",
                wallet: "http://127.0.0.1:4000/wallet",
                helper: "http://127.0.0.1:3000",
                explorer: "http://127.0.0.1:9001",
            },
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

struct Endpoints {
    rpc: &'static str,
    wallet: &'static str,
    helper: &'static str,
    explorer: &'static str,
}

/// Everything an operation needs to know about the network it talks to.
///
/// Built once per process by [`NetworkProfile::lookup`] and passed explicitly
/// to the account manager and the contract invoker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkProfile {
    pub network: Network,
    pub rpc_url: String,
    pub wallet_url: String,
    pub helper_url: String,
    pub explorer_url: String,
    /// Root of the credentials directory; keys live in `<key_store_dir>/<network id>/`.
    pub key_store_dir: PathBuf,
    pub registrar_account_id: Option<AccountId>,
    /// `true` when `rpc_url` comes from a config override.
    pub is_custom_rpc: bool,
    pub timeout_secs: u64,
}

impl NetworkProfile {
    /// Resolve a network id against the built-in table and the config's overrides.
    ///
    /// Fails for an unrecognized id, and when no key store directory is
    /// configured and the home directory cannot be found. Callers must stop
    /// before any network operation in either case.
    pub fn lookup(id: &str, config: &GoodsConfig) -> Result<Self, ChainError> {
        let network =
            Network::from_id(id).ok_or_else(|| ChainError::UnknownNetwork(id.to_string()))?;
        let key_store_dir = config
            .key_store_root()
            .map_err(|e| ChainError::KeyStoreLocation(format!("{e:#}")))?;
        let endpoints = network.default_endpoints();

        let (rpc_url, is_custom_rpc) = match config.rpc_override(network.id()) {
            Some(url) => (url.to_string(), true),
            None => (endpoints.rpc.to_string(), false),
        };

        Ok(Self {
            network,
            rpc_url,
            wallet_url: endpoints.wallet.to_string(),
            helper_url: endpoints.helper.to_string(),
            explorer_url: endpoints.explorer.to_string(),
            key_store_dir,
            registrar_account_id: network.registrar().and_then(|r| r.parse().ok()),
            is_custom_rpc,
            timeout_secs: config.rpc_timeout_secs,
        })
    }

    pub fn id(&self) -> &'static str {
        self.network.id()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Explorer page for a transaction hash.
    pub fn transaction_url(&self, hash: &str) -> String {
        format!("{}/txns/{hash}", self.explorer_url.trim_end_matches('/'))
    }

    /// Explorer page for an account.
    pub fn account_url(&self, account_id: &str) -> String {
        format!("{}/address/{account_id}", self.explorer_url.trim_end_matches('/'))
    }
}
