//! Drive journal records back through an applier
//!
//! Recovery reads the journal from sequence 1, decodes each entry into a
//! `LogRecord` and hands it to a `RecordApplier`. The first unreadable,
//! undecodable or unappliable entry aborts recovery: a damaged log must keep
//! the engine down rather than let it start from an unknown state.

use crate::journal::JournalError;
use crate::reader::{JournalReader, ReaderError};
use crate::record::{CancelRecord, FillRecord, LogRecord, PlaceOrderRecord};
use std::error::Error as StdError;
use std::path::Path;
use std::time::Instant;
use thiserror::Error;
use types::account::BalanceDelta;

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum RecoveryError {
    #[error("Reader error: {0}")]
    Reader(#[from] ReaderError),

    #[error("Undecodable {tag} record at sequence {sequence}: {source}")]
    Decode {
        sequence: u64,
        tag: String,
        #[source]
        source: JournalError,
    },

    #[error("Failed to apply {tag} record at sequence {sequence}: {source}")]
    Apply {
        sequence: u64,
        tag: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

// ── Applier ─────────────────────────────────────────────────────────

/// Position of a record in the journal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryMeta {
    pub sequence: u64,
    pub timestamp: i64,
}

/// Receives replayed records in sequence order.
///
/// Implementations apply the effect without writing anything back to the
/// journal.
pub trait RecordApplier {
    type Error: StdError + Send + Sync + 'static;

    fn apply_place_order(&mut self, meta: EntryMeta, record: PlaceOrderRecord) -> Result<(), Self::Error>;

    fn apply_fill(&mut self, meta: EntryMeta, record: FillRecord) -> Result<(), Self::Error>;

    fn apply_cancel(&mut self, meta: EntryMeta, record: CancelRecord) -> Result<(), Self::Error>;

    fn apply_balance_adjust(&mut self, meta: EntryMeta, delta: BalanceDelta) -> Result<(), Self::Error>;
}

// ── Metrics ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayMetrics {
    pub replay_count: u64,
    pub place_orders: u64,
    pub fills: u64,
    pub cancels: u64,
    pub balance_adjusts: u64,
    /// Sequence of the last replayed entry (None for an empty journal)
    pub last_sequence: Option<u64>,
    pub last_timestamp: Option<i64>,
    pub replay_time_ms: u64,
}

// ── Replay ──────────────────────────────────────────────────────────

/// Replay every entry in `dir` through `applier`.
pub fn replay_journal<A: RecordApplier>(
    dir: &Path,
    applier: &mut A,
) -> Result<ReplayMetrics, RecoveryError> {
    let start = Instant::now();
    let mut metrics = ReplayMetrics::default();

    tracing::info!(dir = %dir.display(), "starting journal replay");

    let result = replay_entries(dir, applier, &mut metrics);
    metrics.replay_time_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(()) => {
            tracing::info!(
                entries = metrics.replay_count,
                place_orders = metrics.place_orders,
                fills = metrics.fills,
                cancels = metrics.cancels,
                balance_adjusts = metrics.balance_adjusts,
                last_sequence = ?metrics.last_sequence,
                elapsed_ms = metrics.replay_time_ms,
                "journal replay complete"
            );
            Ok(metrics)
        }
        Err(e) => {
            tracing::error!(
                error = %e,
                replayed = metrics.replay_count,
                "journal replay failed; refusing to start"
            );
            Err(e)
        }
    }
}

fn replay_entries<A: RecordApplier>(
    dir: &Path,
    applier: &mut A,
    metrics: &mut ReplayMetrics,
) -> Result<(), RecoveryError> {
    let mut reader = JournalReader::open(dir)?;

    while let Some(entry) = reader.next_entry()? {
        let meta = EntryMeta {
            sequence: entry.sequence,
            timestamp: entry.timestamp,
        };
        let record =
            LogRecord::decode(&entry.tag, &entry.payload).map_err(|source| RecoveryError::Decode {
                sequence: entry.sequence,
                tag: entry.tag.clone(),
                source,
            })?;

        let applied = match record {
            LogRecord::PlaceOrder(r) => {
                metrics.place_orders += 1;
                applier.apply_place_order(meta, r)
            }
            LogRecord::Fill(r) => {
                metrics.fills += 1;
                applier.apply_fill(meta, r)
            }
            LogRecord::CancelOrder(r) => {
                metrics.cancels += 1;
                applier.apply_cancel(meta, r)
            }
            LogRecord::BalanceAdjust(d) => {
                metrics.balance_adjusts += 1;
                applier.apply_balance_adjust(meta, d)
            }
        };
        applied.map_err(|e| RecoveryError::Apply {
            sequence: entry.sequence,
            tag: entry.tag.clone(),
            source: Box::new(e),
        })?;

        metrics.replay_count += 1;
        metrics.last_sequence = Some(entry.sequence);
        metrics.last_timestamp = Some(entry.timestamp);
    }

    Ok(())
}

// ── Tests ───────────────────────────────────────────────────────────
