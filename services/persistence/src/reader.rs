//! Strict sequential journal reader
//!
//! Reads every journal file in index order and yields entries in sequence
//! order. Any damage is an error, never skipped: a checksum mismatch, a
//! truncated frame (including a torn final frame), or a sequence that is not
//! exactly `previous + 1` stops the read with the byte offset of the problem.

use crate::journal::{journal_files, JournalEntry, JournalError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum ReaderError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Checksum mismatch in {file} at byte offset {offset}: entry seq={sequence}")]
    ChecksumMismatch {
        file: PathBuf,
        offset: u64,
        sequence: u64,
    },

    #[error("Corruption detected in {file} at byte offset {offset}: {source}")]
    Corruption {
        file: PathBuf,
        offset: u64,
        #[source]
        source: JournalError,
    },

    #[error("Sequence gap: expected {expected}, got {got}")]
    SequenceGap { expected: u64, got: u64 },
}

// ── Journal Reader ──────────────────────────────────────────────────

/// Sequential journal reader with checksum and sequence validation.
pub struct JournalReader {
    files: Vec<PathBuf>,
    current_file_idx: usize,
    data: Vec<u8>,
    pos: usize,
    last_sequence: Option<u64>,
}

impl JournalReader {
    /// Open a reader over all journal files in the given directory.
    ///
    /// A missing directory reads as an empty journal.
    pub fn open(dir: &Path) -> Result<Self, ReaderError> {
        let files = journal_files(dir)?;
        let mut reader = Self {
            files,
            current_file_idx: 0,
            data: Vec::new(),
            pos: 0,
            last_sequence: None,
        };
        reader.load_current_file()?;
        Ok(reader)
    }

    /// Read the next entry. Returns `None` once every file is exhausted.
    pub fn next_entry(&mut self) -> Result<Option<JournalEntry>, ReaderError> {
        while self.pos >= self.data.len() {
            if !self.advance_file()? {
                return Ok(None);
            }
        }

        let offset = self.pos as u64;
        let (entry, consumed) =
            JournalEntry::from_bytes(&self.data[self.pos..]).map_err(|source| {
                ReaderError::Corruption {
                    file: self.current_path(),
                    offset,
                    source,
                }
            })?;

        if !entry.verify_checksum() {
            return Err(ReaderError::ChecksumMismatch {
                file: self.current_path(),
                offset,
                sequence: entry.sequence,
            });
        }

        let expected = self.last_sequence.map_or(1, |s| s + 1);
        if entry.sequence != expected {
            return Err(ReaderError::SequenceGap {
                expected,
                got: entry.sequence,
            });
        }

        self.pos += consumed;
        self.last_sequence = Some(entry.sequence);
        Ok(Some(entry))
    }

    /// Read all remaining entries.
    pub fn read_all(&mut self) -> Result<Vec<JournalEntry>, ReaderError> {
        let mut entries = Vec::new();
        while let Some(entry) = self.next_entry()? {
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Last successfully read sequence number.
    pub fn last_sequence(&self) -> Option<u64> {
        self.last_sequence
    }

    // ── Internal Helpers ────────────────────────────────────────────

    fn current_path(&self) -> PathBuf {
        self.files
            .get(self.current_file_idx)
            .cloned()
            .unwrap_or_default()
    }

    fn load_current_file(&mut self) -> Result<(), ReaderError> {
        self.data = match self.files.get(self.current_file_idx) {
            Some(path) => fs::read(path)?,
            None => Vec::new(),
        };
        self.pos = 0;
        Ok(())
    }

    fn advance_file(&mut self) -> Result<bool, ReaderError> {
        if self.current_file_idx + 1 >= self.files.len() {
            return Ok(false);
        }
        self.current_file_idx += 1;
        self.load_current_file()?;
        Ok(true)
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::{JournalConfig, JournalWriter};
    use tempfile::TempDir;

    fn write_test_entries(config: JournalConfig, count: u64) {
        let mut writer = JournalWriter::open(config, 1).unwrap();
        for seq in 1..=count {
            writer
                .write_event(1_000_000_000 + seq as i64, "balance_adjust", vec![seq as u8; 10])
                .unwrap();
        }
        writer.sync().unwrap();
    }

    fn first_file(dir: &Path) -> PathBuf {
        journal_files(dir).unwrap().remove(0)
    }

    #[test]
    fn test_sequential_read() {
        let tmp = TempDir::new().unwrap();
        write_test_entries(JournalConfig::new(tmp.path()), 50);

        let mut reader = JournalReader::open(tmp.path()).unwrap();
        let entries = reader.read_all().unwrap();
        assert_eq!(entries.len(), 50);
        assert_eq!(entries[0].sequence, 1);
        assert_eq!(entries[49].sequence, 50);
        assert_eq!(reader.last_sequence(), Some(50));
    }

    #[test]
    fn test_checksum_mismatch_is_fatal() {
        let tmp = TempDir::new().unwrap();
        write_test_entries(JournalConfig::new(tmp.path()), 5);

        // Flip a payload byte of the first entry; the frame still parses
        let path = first_file(tmp.path());
        let mut data = fs::read(&path).unwrap();
        let tag_len = "balance_adjust".len();
        let payload_start = 4 + 8 + 8 + 2 + tag_len + 4;
        data[payload_start] ^= 0xFF;
        fs::write(&path, &data).unwrap();

        let mut reader = JournalReader::open(tmp.path()).unwrap();
        match reader.read_all() {
            Err(ReaderError::ChecksumMismatch { offset, sequence, .. }) => {
                assert_eq!(offset, 0);
                assert_eq!(sequence, 1);
            }
            other => panic!("Expected ChecksumMismatch, got {:?}", other.map(|e| e.len())),
        }
    }

    #[test]
    fn test_torn_tail_is_fatal() {
        let tmp = TempDir::new().unwrap();
        write_test_entries(JournalConfig::new(tmp.path()), 3);

        let path = first_file(tmp.path());
        let data = fs::read(&path).unwrap();
        fs::write(&path, &data[..data.len() - 5]).unwrap();

        let mut reader = JournalReader::open(tmp.path()).unwrap();
        assert_eq!(reader.next_entry().unwrap().unwrap().sequence, 1);
        assert_eq!(reader.next_entry().unwrap().unwrap().sequence, 2);
        assert!(matches!(
            reader.next_entry(),
            Err(ReaderError::Corruption { .. })
        ));
    }

    #[test]
    fn test_sequence_gap_detected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("journal-000000.bin");
        let mut bytes = JournalEntry::new(1, 100, "balance_adjust", vec![]).to_bytes().unwrap();
        bytes.extend(JournalEntry::new(3, 300, "balance_adjust", vec![]).to_bytes().unwrap());
        fs::write(&path, bytes).unwrap();

        let mut reader = JournalReader::open(tmp.path()).unwrap();
        match reader.read_all() {
            Err(ReaderError::SequenceGap { expected, got }) => {
                assert_eq!(expected, 2);
                assert_eq!(got, 3);
            }
            other => panic!("Expected SequenceGap, got {:?}", other.map(|e| e.len())),
        }
    }

    #[test]
    fn test_journal_must_start_at_one() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("journal-000000.bin");
        fs::write(&path, JournalEntry::new(7, 1, "balance_adjust", vec![]).to_bytes().unwrap()).unwrap();

        let mut reader = JournalReader::open(tmp.path()).unwrap();
        assert!(matches!(
            reader.next_entry(),
            Err(ReaderError::SequenceGap { expected: 1, got: 7 })
        ));
    }

    #[test]
    fn test_empty_and_missing_directory() {
        let tmp = TempDir::new().unwrap();
        assert!(JournalReader::open(tmp.path()).unwrap().read_all().unwrap().is_empty());

        let missing = tmp.path().join("does-not-exist");
        assert!(JournalReader::open(&missing).unwrap().read_all().unwrap().is_empty());
    }

    #[test]
    fn test_multi_file_read() {
        let tmp = TempDir::new().unwrap();
        let config = JournalConfig {
            max_file_size: 100,
            ..JournalConfig::new(tmp.path())
        };
        write_test_entries(config, 30);
        assert!(journal_files(tmp.path()).unwrap().len() > 1);

        let mut reader = JournalReader::open(tmp.path()).unwrap();
        let entries = reader.read_all().unwrap();
        assert_eq!(entries.len(), 30);
        assert_eq!(entries.last().unwrap().sequence, 30);
    }
}
