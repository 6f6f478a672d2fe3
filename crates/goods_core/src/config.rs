use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

const DEFAULT_NETWORK: &str = "testnet";
const DEFAULT_RPC_TIMEOUT_SECS: u64 = 30;
const DEFAULT_GAS_TGAS: u64 = 30;

// ---------------------------------------------------------------------------
// GoodsConfig
// ---------------------------------------------------------------------------

/// Tool configuration stored at `~/.goods/config.json`.
///
/// Keys are **never** written here. Signing keys live in the NEAR credentials
/// directory (`~/.near-credentials` unless `key_store_dir` overrides it).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GoodsConfig {
    /// Network used when `NETWORK` is not set.
    pub default_network: String,
    /// Root of the key store. `None` means `~/.near-credentials`.
    pub key_store_dir: Option<PathBuf>,
    /// Per-network RPC URL overrides, keyed by network id.
    pub rpc_overrides: BTreeMap<String, String>,
    pub rpc_timeout_secs: u64,
    /// Gas attached to change calls when `GAS` is not set, in TGas.
    pub default_gas_tgas: u64,
    pub journal_enabled: bool,
    pub log_level: String,
}

impl Default for GoodsConfig {
    fn default() -> Self {
        Self {
            default_network: DEFAULT_NETWORK.into(),
            key_store_dir: None,
            rpc_overrides: BTreeMap::new(),
            rpc_timeout_secs: DEFAULT_RPC_TIMEOUT_SECS,
            default_gas_tgas: DEFAULT_GAS_TGAS,
            journal_enabled: true,
            log_level: "info".into(),
        }
    }
}

impl GoodsConfig {
    /// Returns the base config directory: `~/.goods/`
    pub fn base_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".goods"))
    }

    /// Returns the config file path: `~/.goods/config.json`
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("config.json"))
    }

    /// Returns the logs directory: `~/.goods/logs/`
    pub fn logs_dir() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("logs"))
    }

    /// Returns the operation journal path: `~/.goods/journal.jsonl`
    pub fn journal_path() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("journal.jsonl"))
    }

    /// The `near-cli` credentials directory: `~/.near-credentials/`
    pub fn default_key_store_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".near-credentials"))
    }

    /// Key store root after applying the `key_store_dir` override.
    pub fn key_store_root(&self) -> Result<PathBuf> {
        match &self.key_store_dir {
            Some(dir) => Ok(dir.clone()),
            None => Self::default_key_store_dir(),
        }
    }

    /// Ensures all required directories exist.
    pub fn ensure_dirs() -> Result<()> {
        let dirs = [Self::base_dir()?, Self::logs_dir()?];
        for dir in &dirs {
            if !dir.exists() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
            }
        }
        Ok(())
    }

    /// Loads config from disk, or creates default if missing.
    pub fn load() -> Result<Self> {
        Self::ensure_dirs()?;
        let path = Self::config_path()?;
        Self::load_from_path(&path)
    }

    /// Load config from a specific file path, writing defaults when it is absent.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            let config: Self =
                serde_json::from_str(&content).with_context(|| "Failed to parse config.json")?;
            config.validate()?;
            info!("Loaded config from {}", path.display());
            Ok(config)
        } else {
            let config = Self::default();
            config.save_to_path(path)?;
            info!("Created default config at {}", path.display());
            Ok(config)
        }
    }

    /// Save config to a specific file path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Override the RPC URL for a network.
    ///
    /// Returns `Err` if the URL fails validation.
    pub fn set_rpc_override(&mut self, network: &str, url: String) -> Result<()> {
        if !validate_url(&url) {
            anyhow::bail!("invalid RPC URL for {network}: {url}");
        }
        self.rpc_overrides.insert(network.to_string(), url);
        Ok(())
    }

    /// The overridden RPC URL for a network, if any.
    pub fn rpc_override(&self, network: &str) -> Option<&str> {
        self.rpc_overrides.get(network).map(String::as_str)
    }

    /// Reject a hand-edited config whose RPC overrides are not http(s) URLs.
    pub fn validate(&self) -> Result<()> {
        for (network, url) in &self.rpc_overrides {
            if !validate_url(url) {
                anyhow::bail!("invalid RPC URL for {network}: {url}");
            }
        }
        if self.rpc_timeout_secs == 0 {
            anyhow::bail!("rpc_timeout_secs must be greater than zero");
        }
        Ok(())
    }
}

/// Validate that a URL is well-formed and uses HTTP or HTTPS.
pub fn validate_url(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => {
            let scheme = parsed.scheme();
            (scheme == "http" || scheme == "https") && parsed.host().is_some()
        }
        Err(_) => false,
    }
}
