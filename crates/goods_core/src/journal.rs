use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Success,
    Failure,
}

/// One outbound operation, as appended to `~/.goods/journal.jsonl`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub timestamp: DateTime<Utc>,
    pub network: String,
    pub operation: String,
    pub target: String,
    pub status: EntryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JournalEntry {
    pub fn success(
        network: impl Into<String>,
        operation: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            network: network.into(),
            operation: operation.into(),
            target: target.into(),
            status: EntryStatus::Success,
            transaction_hash: None,
            error: None,
        }
    }

    pub fn failure(
        network: impl Into<String>,
        operation: impl Into<String>,
        target: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            status: EntryStatus::Failure,
            error: Some(error.into()),
            ..Self::success(network, operation, target)
        }
    }

    pub fn with_transaction(mut self, hash: impl Into<String>) -> Self {
        self.transaction_hash = Some(hash.into());
        self
    }
}

/// Append-only record of what each run did to the chain, so a run that stopped
/// halfway (account created, deploy failed) can be picked up by hand.
#[derive(Debug, Clone)]
pub struct Journal {
    path: Option<PathBuf>,
}

impl Journal {
    pub fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    /// A journal that drops every entry.
    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn record(&self, entry: &JournalEntry) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let mut line = serde_json::to_string(entry).context("failed to serialize journal entry")?;
        line.push('\n');

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open journal: {}", path.display()))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("Failed to append to journal: {}", path.display()))?;

        debug!(operation = %entry.operation, target = %entry.target, "journal entry recorded");
        Ok(())
    }

    /// Read every entry back. A missing file is an empty journal.
    pub fn read_entries(&self) -> Result<Vec<JournalEntry>> {
        let Some(path) = &self.path else {
            return Ok(Vec::new());
        };
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read journal: {}", path.display()))?;
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .enumerate()
            .map(|(idx, line)| {
                serde_json::from_str(line)
                    .with_context(|| format!("Corrupt journal line {}", idx + 1))
            })
            .collect()
    }
}
