pub mod config;
pub mod error;
pub mod journal;
pub mod logging;

pub use config::{GoodsConfig, validate_url};
pub use error::{ErrorCategory, GoodsError};
pub use journal::{EntryStatus, Journal, JournalEntry};
