//! Transaction Log & Replay
//!
//! Provides the append-only journal the matching engine writes before it
//! acknowledges any state change, a strict sequential reader with CRC32C and
//! gap detection, typed log records, and the replay loop that rebuilds state
//! at startup.

pub mod journal;
pub mod reader;
pub mod record;
pub mod recovery;
pub mod log;

pub use journal::{JournalConfig, JournalError};
pub use log::{AppendReceipt, LogState, TransactionLog};
pub use record::LogRecord;
pub use recovery::{EntryMeta, RecordApplier, RecoveryError, ReplayMetrics};
