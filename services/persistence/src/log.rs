//! Transaction Log: the engine's single durable record
//!
//! Wraps the journal writer behind one append lock so sequence numbers stay
//! gap-free no matter how many callers append concurrently. The log starts
//! `Closed`; the first append opens the writer (positioned after the last
//! replayed or on-disk entry) and moves it to `Appending`, where it stays
//! until the process exits.

use parking_lot::Mutex;
use std::path::Path;
use types::clock::LogicalClock;

use crate::journal::{JournalConfig, JournalError, JournalWriter};
use crate::reader::JournalReader;
use crate::record::LogRecord;
use crate::recovery::{replay_journal, RecordApplier, RecoveryError, ReplayMetrics};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogState {
    Closed,
    Appending,
}

/// Where an appended record landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendReceipt {
    pub sequence: u64,
    pub timestamp: i64,
}

struct LogInner {
    writer: Option<JournalWriter>,
    /// Known once replay has run (or the journal has been scanned)
    next_sequence: Option<u64>,
}

pub struct TransactionLog {
    config: JournalConfig,
    inner: Mutex<LogInner>,
    clock: LogicalClock,
}

impl TransactionLog {
    /// Create a closed log over `config.dir`. No I/O happens until replay
    /// or the first append.
    pub fn new(config: JournalConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(LogInner {
                writer: None,
                next_sequence: None,
            }),
            clock: LogicalClock::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.config.dir
    }

    pub fn state(&self) -> LogState {
        if self.inner.lock().writer.is_some() {
            LogState::Appending
        } else {
            LogState::Closed
        }
    }

    /// Sequence the next append will receive, if already known.
    pub fn next_sequence(&self) -> Option<u64> {
        let inner = self.inner.lock();
        match &inner.writer {
            Some(writer) => Some(writer.next_sequence()),
            None => inner.next_sequence,
        }
    }

    /// Durably append one record and return its sequence and timestamp.
    ///
    /// The record is flushed (and fsynced under the default policy) before
    /// this returns.
    pub fn append(&self, record: &LogRecord) -> Result<AppendReceipt, JournalError> {
        let payload = record.encode()?;
        let mut inner = self.inner.lock();

        if inner.writer.is_none() {
            let next = match inner.next_sequence {
                Some(next) => next,
                None => Self::scan_next_sequence(&self.config.dir)?,
            };
            inner.writer = Some(JournalWriter::open(self.config.clone(), next)?);
            tracing::info!(next_sequence = next, dir = %self.config.dir.display(), "transaction log open for appending");
        }

        let timestamp = self.clock.tick();
        let writer = inner
            .writer
            .as_mut()
            .ok_or_else(|| JournalError::Serialization("journal writer unavailable".into()))?;
        let entry = writer.write_event(timestamp, record.tag(), payload)?;

        Ok(AppendReceipt {
            sequence: entry.sequence,
            timestamp: entry.timestamp,
        })
    }

    /// Replay every logged record through `applier`, in sequence order.
    ///
    /// Must run before the first append; afterwards the journal on disk is
    /// no longer a complete picture of what the caller has applied.
    pub fn replay_all<A: RecordApplier>(&self, applier: &mut A) -> Result<ReplayMetrics, RecoveryError> {
        let mut inner = self.inner.lock();
        let metrics = replay_journal(&self.config.dir, applier)?;

        if let Some(ts) = metrics.last_timestamp {
            self.clock.observe(ts);
        }
        if inner.writer.is_none() {
            inner.next_sequence = Some(metrics.last_sequence.map_or(1, |s| s + 1));
        }
        Ok(metrics)
    }

    /// Flush and fsync outstanding writes.
    pub fn sync(&self) -> Result<(), JournalError> {
        match self.inner.lock().writer.as_mut() {
            Some(writer) => writer.sync(),
            None => Ok(()),
        }
    }

    fn scan_next_sequence(dir: &Path) -> Result<u64, JournalError> {
        let mut reader = JournalReader::open(dir)
            .map_err(|e| JournalError::Serialization(format!("cannot scan journal: {}", e)))?;
        reader
            .read_all()
            .map_err(|e| JournalError::Serialization(format!("cannot scan journal: {}", e)))?;
        Ok(reader.last_sequence().map_or(1, |s| s + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{CancelRecord, FillRecord, PlaceOrderRecord};
    use crate::recovery::EntryMeta;
    use rust_decimal::Decimal;
    use std::convert::Infallible;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;
    use types::account::BalanceDelta;
    use types::ids::{Asset, UserId};

    fn deposit(user: &str, amount: i64) -> LogRecord {
        LogRecord::BalanceAdjust(BalanceDelta::new(
            UserId::new(user),
            Asset::new("USD"),
            Decimal::from(amount),
        ))
    }

    #[derive(Default)]
    struct Collect(Vec<(u64, BalanceDelta)>);

    impl RecordApplier for Collect {
        type Error = Infallible;

        fn apply_place_order(&mut self, _: EntryMeta, _: PlaceOrderRecord) -> Result<(), Infallible> {
            Ok(())
        }

        fn apply_fill(&mut self, _: EntryMeta, _: FillRecord) -> Result<(), Infallible> {
            Ok(())
        }

        fn apply_cancel(&mut self, _: EntryMeta, _: CancelRecord) -> Result<(), Infallible> {
            Ok(())
        }

        fn apply_balance_adjust(&mut self, meta: EntryMeta, delta: BalanceDelta) -> Result<(), Infallible> {
            self.0.push((meta.sequence, delta));
            Ok(())
        }
    }

    #[test]
    fn test_closed_until_first_append() {
        let tmp = TempDir::new().unwrap();
        let log = TransactionLog::new(JournalConfig::new(tmp.path()));
        assert_eq!(log.state(), LogState::Closed);

        let receipt = log.append(&deposit("A", 1)).unwrap();
        assert_eq!(receipt.sequence, 1);
        assert_eq!(log.state(), LogState::Appending);
    }

    #[test]
    fn test_append_continues_after_replay() {
        let tmp = TempDir::new().unwrap();
        {
            let log = TransactionLog::new(JournalConfig::new(tmp.path()));
            log.append(&deposit("A", 1)).unwrap();
            log.append(&deposit("A", 2)).unwrap();
        }

        let log = TransactionLog::new(JournalConfig::new(tmp.path()));
        let mut collect = Collect::default();
        let metrics = log.replay_all(&mut collect).unwrap();
        assert_eq!(metrics.last_sequence, Some(2));
        assert_eq!(log.next_sequence(), Some(3));

        let receipt = log.append(&deposit("A", 3)).unwrap();
        assert_eq!(receipt.sequence, 3);
        assert!(receipt.timestamp > metrics.last_timestamp.unwrap());
    }

    #[test]
    fn test_append_without_replay_scans_journal() {
        let tmp = TempDir::new().unwrap();
        {
            let log = TransactionLog::new(JournalConfig::new(tmp.path()));
            log.append(&deposit("A", 1)).unwrap();
        }
        let log = TransactionLog::new(JournalConfig::new(tmp.path()));
        assert_eq!(log.append(&deposit("A", 2)).unwrap().sequence, 2);
    }

    #[test]
    fn test_concurrent_appends_are_gap_free() {
        let tmp = TempDir::new().unwrap();
        let log = Arc::new(TransactionLog::new(JournalConfig::new(tmp.path())));

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let log = Arc::clone(&log);
                thread::spawn(move || {
                    (0..25)
                        .map(|i| log.append(&deposit(&format!("U{}", t), i)).unwrap().sequence)
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut sequences: Vec<u64> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        sequences.sort_unstable();
        assert_eq!(sequences, (1..=100).collect::<Vec<_>>());

        let mut collect = Collect::default();
        let fresh = TransactionLog::new(JournalConfig::new(tmp.path()));
        assert_eq!(fresh.replay_all(&mut collect).unwrap().replay_count, 100);
    }
}
