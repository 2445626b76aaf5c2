//! Append-only, checksummed journal files
//!
//! Every accepted mutation is framed, checksummed and flushed to disk before
//! the engine acknowledges it. Frames are never rewritten or removed.
//!
//! # Binary Format (per entry)
//! ```text
//! [total_len: u32]
//! [sequence:  u64]
//! [timestamp: i64]
//! [tag_len: u16][tag: bytes]
//! [payload_len: u32][payload: bytes]
//! [checksum: u32]  // CRC32C over sequence+timestamp+tag+payload
//! ```

use crc32c::crc32c;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Upper bound on a single frame body; anything larger is treated as corruption.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Fixed part of a frame body: seq + ts + tag_len + payload_len + crc.
const MIN_BODY_LEN: usize = 8 + 8 + 2 + 4 + 4;

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Sequence error: expected {expected}, got {got}")]
    SequenceError { expected: u64, got: u64 },

    #[error("Journal size limit exceeded: {current} >= {limit}")]
    SizeLimitExceeded { current: u64, limit: u64 },
}

// ── Journal Entry ───────────────────────────────────────────────────

/// A single framed journal entry.
///
/// `tag` names the record kind so each entry can be decoded on its own;
/// `payload` is the bincode-encoded record body.
#[derive(Debug, Clone, PartialEq)]
pub struct JournalEntry {
    /// Gap-free, strictly increasing sequence number, starting at 1
    pub sequence: u64,
    /// Logical timestamp (monotonic Unix nanos)
    pub timestamp: i64,
    pub tag: String,
    pub payload: Vec<u8>,
    /// CRC32C over (sequence ++ timestamp ++ tag ++ payload)
    pub checksum: u32,
}

impl JournalEntry {
    /// Create a new entry, computing the CRC32C checksum.
    pub fn new(sequence: u64, timestamp: i64, tag: impl Into<String>, payload: Vec<u8>) -> Self {
        let tag = tag.into();
        let checksum = Self::compute_checksum(sequence, timestamp, &tag, &payload);
        Self {
            sequence,
            timestamp,
            tag,
            payload,
            checksum,
        }
    }

    pub fn compute_checksum(sequence: u64, timestamp: i64, tag: &str, payload: &[u8]) -> u32 {
        let mut buf = Vec::with_capacity(16 + tag.len() + payload.len());
        buf.extend_from_slice(&sequence.to_le_bytes());
        buf.extend_from_slice(&timestamp.to_le_bytes());
        buf.extend_from_slice(tag.as_bytes());
        buf.extend_from_slice(payload);
        crc32c(&buf)
    }

    pub fn verify_checksum(&self) -> bool {
        self.checksum == Self::compute_checksum(self.sequence, self.timestamp, &self.tag, &self.payload)
    }

    /// Serialize entry to the binary wire format.
    pub fn to_bytes(&self) -> Result<Vec<u8>, JournalError> {
        let tag_len = u16::try_from(self.tag.len())
            .map_err(|_| JournalError::Serialization(format!("tag too long: {}", self.tag.len())))?;
        let payload_len = u32::try_from(self.payload.len())
            .map_err(|_| JournalError::Serialization("payload too large".into()))?;

        let body_len = MIN_BODY_LEN + self.tag.len() + self.payload.len();
        if body_len > MAX_FRAME_LEN {
            return Err(JournalError::Serialization(format!(
                "frame of {} bytes exceeds limit of {}",
                body_len, MAX_FRAME_LEN
            )));
        }

        let mut buf = Vec::with_capacity(4 + body_len);
        buf.extend_from_slice(&(body_len as u32).to_le_bytes());
        buf.extend_from_slice(&self.sequence.to_le_bytes());
        buf.extend_from_slice(&self.timestamp.to_le_bytes());
        buf.extend_from_slice(&tag_len.to_le_bytes());
        buf.extend_from_slice(self.tag.as_bytes());
        buf.extend_from_slice(&payload_len.to_le_bytes());
        buf.extend_from_slice(&self.payload);
        buf.extend_from_slice(&self.checksum.to_le_bytes());
        Ok(buf)
    }

    /// Deserialize one entry from the front of `data`.
    ///
    /// Returns `(entry, bytes_consumed)`. The checksum is read but not
    /// verified here; the reader does that so it can report the offset.
    pub fn from_bytes(data: &[u8]) -> Result<(Self, usize), JournalError> {
        let mut cursor = FrameCursor::new(data);

        let body_len = cursor.u32()? as usize;
        if body_len > MAX_FRAME_LEN {
            return Err(JournalError::Serialization(format!(
                "implausible body length: {}",
                body_len
            )));
        }
        if body_len < MIN_BODY_LEN {
            return Err(JournalError::Serialization(format!(
                "body too small: {} bytes, minimum is {}",
                body_len, MIN_BODY_LEN
            )));
        }
        if data.len() < 4 + body_len {
            return Err(JournalError::Serialization(format!(
                "incomplete entry: need {} bytes, have {}",
                4 + body_len,
                data.len()
            )));
        }

        let mut body = FrameCursor::new(&data[4..4 + body_len]);
        let sequence = body.u64()?;
        let timestamp = body.i64()?;
        let tag_len = body.u16()? as usize;
        let tag = String::from_utf8(body.take(tag_len)?.to_vec())
            .map_err(|e| JournalError::Serialization(e.to_string()))?;
        let payload_len = body.u32()? as usize;
        let payload = body.take(payload_len)?.to_vec();
        let checksum = body.u32()?;

        if !body.is_exhausted() {
            return Err(JournalError::Serialization(
                "trailing bytes inside frame body".into(),
            ));
        }

        Ok((
            Self {
                sequence,
                timestamp,
                tag,
                payload,
                checksum,
            },
            4 + body_len,
        ))
    }
}

/// Bounds-checked little-endian reader over a byte slice
struct FrameCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> FrameCursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], JournalError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| {
                JournalError::Serialization(format!(
                    "need {} bytes at offset {}, have {}",
                    len,
                    self.pos,
                    self.data.len() - self.pos
                ))
            })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], JournalError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u16(&mut self) -> Result<u16, JournalError> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    fn u32(&mut self) -> Result<u32, JournalError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn u64(&mut self) -> Result<u64, JournalError> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    fn i64(&mut self) -> Result<i64, JournalError> {
        Ok(i64::from_le_bytes(self.array()?))
    }

    fn is_exhausted(&self) -> bool {
        self.pos == self.data.len()
    }
}

// ── Flush / Fsync Policies ──────────────────────────────────────────

/// Controls when buffered data is flushed to OS.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlushPolicy {
    EveryWrite,
    EveryN(usize),
}

/// Controls when `fsync` (durable write) is called.
///
/// Only `EveryWrite` gives the "success means durable" guarantee; the others
/// exist for tests and bulk tooling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FsyncPolicy {
    EveryWrite,
    EveryN(usize),
    OnRotation,
}

// ── Journal Writer Configuration ────────────────────────────────────

#[derive(Debug, Clone)]
pub struct JournalConfig {
    /// Directory for journal files.
    pub dir: PathBuf,
    /// Maximum file size in bytes before rotation (default 64 MiB).
    pub max_file_size: u64,
    /// Maximum total journal size in bytes (0 = unlimited).
    pub max_total_size: u64,
    pub flush_policy: FlushPolicy,
    pub fsync_policy: FsyncPolicy,
}

impl JournalConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            max_file_size: 64 * 1024 * 1024,
            max_total_size: 0,
            flush_policy: FlushPolicy::EveryWrite,
            fsync_policy: FsyncPolicy::EveryWrite,
        }
    }
}

// ── Journal Writer ──────────────────────────────────────────────────

/// Append-only journal writer with checksums, rotation, and fsync control.
///
/// Not synchronized; `TransactionLog` owns it behind its append lock.
pub struct JournalWriter {
    config: JournalConfig,
    writer: BufWriter<File>,
    current_file: PathBuf,
    current_file_size: u64,
    next_sequence: u64,
    writes_since_flush: usize,
    writes_since_fsync: usize,
    file_index: u64,
    total_size: u64,
}

impl JournalWriter {
    /// Open the latest journal file for appending, creating the directory if
    /// needed. `next_sequence` is the sequence the next entry must carry.
    pub fn open(config: JournalConfig, next_sequence: u64) -> Result<Self, JournalError> {
        fs::create_dir_all(&config.dir)?;

        let file_index = latest_journal_index(&config.dir)?.unwrap_or(0);
        let current_file = journal_path(&config.dir, file_index);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&current_file)?;

        let current_file_size = file.metadata()?.len();
        let total_size = compute_total_size(&config.dir)?;

        Ok(Self {
            config,
            writer: BufWriter::new(file),
            current_file,
            current_file_size,
            next_sequence,
            writes_since_flush: 0,
            writes_since_fsync: 0,
            file_index,
            total_size,
        })
    }

    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    pub fn current_file_path(&self) -> &Path {
        &self.current_file
    }

    /// Append a pre-built entry. Its sequence must be exactly `next_sequence`.
    pub fn append(&mut self, entry: &JournalEntry) -> Result<(), JournalError> {
        if entry.sequence != self.next_sequence {
            return Err(JournalError::SequenceError {
                expected: self.next_sequence,
                got: entry.sequence,
            });
        }

        if self.config.max_total_size > 0 && self.total_size >= self.config.max_total_size {
            return Err(JournalError::SizeLimitExceeded {
                current: self.total_size,
                limit: self.config.max_total_size,
            });
        }

        if self.current_file_size >= self.config.max_file_size {
            self.rotate()?;
        }

        let bytes = entry.to_bytes()?;
        self.writer.write_all(&bytes)?;

        let written = bytes.len() as u64;
        self.current_file_size += written;
        self.total_size += written;
        self.next_sequence = entry.sequence + 1;
        self.writes_since_flush += 1;
        self.writes_since_fsync += 1;

        self.apply_flush_policy()?;
        self.apply_fsync_policy()?;

        Ok(())
    }

    /// Frame and append the next entry, assigning it `next_sequence`.
    pub fn write_event(
        &mut self,
        timestamp: i64,
        tag: &str,
        payload: Vec<u8>,
    ) -> Result<JournalEntry, JournalError> {
        let entry = JournalEntry::new(self.next_sequence, timestamp, tag, payload);
        self.append(&entry)?;
        Ok(entry)
    }

    /// Force flush + fsync (used before shutdown / rotation).
    pub fn sync(&mut self) -> Result<(), JournalError> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        self.writes_since_flush = 0;
        self.writes_since_fsync = 0;
        Ok(())
    }

    // ── Internal Helpers ────────────────────────────────────────────

    fn apply_flush_policy(&mut self) -> Result<(), JournalError> {
        let should_flush = match self.config.flush_policy {
            FlushPolicy::EveryWrite => true,
            FlushPolicy::EveryN(n) => self.writes_since_flush >= n,
        };
        // fsync below needs the bytes out of the BufWriter first
        let must_flush = should_flush || self.config.fsync_policy == FsyncPolicy::EveryWrite;
        if must_flush {
            self.writer.flush()?;
            self.writes_since_flush = 0;
        }
        Ok(())
    }

    fn apply_fsync_policy(&mut self) -> Result<(), JournalError> {
        let should_fsync = match self.config.fsync_policy {
            FsyncPolicy::EveryWrite => true,
            FsyncPolicy::EveryN(n) => self.writes_since_fsync >= n,
            FsyncPolicy::OnRotation => false,
        };
        if should_fsync {
            self.writer.flush()?;
            self.writer.get_ref().sync_all()?;
            self.writes_since_fsync = 0;
        }
        Ok(())
    }

    fn rotate(&mut self) -> Result<(), JournalError> {
        self.sync()?;

        self.file_index += 1;
        self.current_file = journal_path(&self.config.dir, self.file_index);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.current_file)?;

        self.writer = BufWriter::new(file);
        self.current_file_size = 0;
        tracing::debug!(file = %self.current_file.display(), "rotated journal file");
        Ok(())
    }
}

// ── File Layout ─────────────────────────────────────────────────────

pub(crate) fn journal_path(dir: &Path, index: u64) -> PathBuf {
    dir.join(format!("journal-{:06}.bin", index))
}

fn parse_journal_index(name: &str) -> Option<u64> {
    name.strip_prefix("journal-")?
        .strip_suffix(".bin")?
        .parse::<u64>()
        .ok()
}

/// All journal files in `dir`, sorted by index. Missing dir means no files.
pub(crate) fn journal_files(dir: &Path) -> Result<Vec<PathBuf>, io::Error> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if let Some(idx) = parse_journal_index(&entry.file_name().to_string_lossy()) {
            files.push((idx, entry.path()));
        }
    }
    files.sort_by_key(|(idx, _)| *idx);
    Ok(files.into_iter().map(|(_, p)| p).collect())
}

fn latest_journal_index(dir: &Path) -> Result<Option<u64>, io::Error> {
    Ok(journal_files(dir)?
        .last()
        .and_then(|p| p.file_name())
        .and_then(|n| parse_journal_index(&n.to_string_lossy())))
}

fn compute_total_size(dir: &Path) -> Result<u64, io::Error> {
    let mut total = 0u64;
    for path in journal_files(dir)? {
        total += fs::metadata(path)?.len();
    }
    Ok(total)
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_entry(seq: u64) -> JournalEntry {
        JournalEntry::new(
            seq,
            1_708_123_456_789_000_000 + (seq as i64),
            "place_order",
            vec![1, 2, 3, 4, 5],
        )
    }

    fn journal_file_count(dir: &Path) -> usize {
        journal_files(dir).unwrap().len()
    }

    #[test]
    fn test_journal_entry_checksum_computation() {
        assert!(sample_entry(1).verify_checksum());
    }

    #[test]
    fn test_journal_entry_checksum_detects_tamper() {
        let mut entry = sample_entry(1);
        entry.payload = vec![99, 98, 97];
        assert!(!entry.verify_checksum());
    }

    #[test]
    fn test_frame_decodes_to_same_entry() {
        let entry = sample_entry(42);
        let bytes = entry.to_bytes().unwrap();
        let (decoded, consumed) = JournalEntry::from_bytes(&bytes).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(entry, decoded);
    }

    #[test]
    fn test_truncated_frame_is_an_error() {
        let bytes = sample_entry(1).to_bytes().unwrap();
        for cut in [0, 3, 10, bytes.len() - 1] {
            assert!(JournalEntry::from_bytes(&bytes[..cut]).is_err(), "cut at {}", cut);
        }
    }

    #[test]
    fn test_implausible_length_rejected() {
        let mut bytes = sample_entry(1).to_bytes().unwrap();
        bytes[..4].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(JournalEntry::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_write_event_assigns_sequences() {
        let tmp = TempDir::new().unwrap();
        let mut writer = JournalWriter::open(JournalConfig::new(tmp.path()), 1).unwrap();

        let first = writer.write_event(10, "balance_adjust", vec![1]).unwrap();
        let second = writer.write_event(11, "balance_adjust", vec![2]).unwrap();

        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);
        assert_eq!(writer.next_sequence(), 3);
    }

    #[test]
    fn test_sequence_error_on_gap() {
        let tmp = TempDir::new().unwrap();
        let mut writer = JournalWriter::open(JournalConfig::new(tmp.path()), 1).unwrap();

        writer.append(&sample_entry(1)).unwrap();
        match writer.append(&sample_entry(5)) {
            Err(JournalError::SequenceError { expected, got }) => {
                assert_eq!(expected, 2);
                assert_eq!(got, 5);
            }
            other => panic!("Unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_every_write_policy_reaches_disk() {
        let tmp = TempDir::new().unwrap();
        let mut writer = JournalWriter::open(JournalConfig::new(tmp.path()), 1).unwrap();

        writer.append(&sample_entry(1)).unwrap();
        let size = fs::metadata(writer.current_file_path()).unwrap().len();
        assert_eq!(size, sample_entry(1).to_bytes().unwrap().len() as u64);
    }

    #[test]
    fn test_file_rotation_on_size_limit() {
        let tmp = TempDir::new().unwrap();
        let config = JournalConfig {
            max_file_size: 100,
            ..JournalConfig::new(tmp.path())
        };
        let mut writer = JournalWriter::open(config, 1).unwrap();

        for seq in 1..=20 {
            writer.append(&sample_entry(seq)).unwrap();
        }

        assert!(journal_file_count(tmp.path()) > 1, "Expected rotation to create multiple files");
    }

    #[test]
    fn test_reopen_appends_to_latest_file() {
        let tmp = TempDir::new().unwrap();
        let config = JournalConfig {
            max_file_size: 100,
            ..JournalConfig::new(tmp.path())
        };
        {
            let mut writer = JournalWriter::open(config.clone(), 1).unwrap();
            for seq in 1..=10 {
                writer.append(&sample_entry(seq)).unwrap();
            }
        }
        let before = journal_file_count(tmp.path());
        let writer = JournalWriter::open(config, 11).unwrap();
        assert_eq!(journal_file_count(tmp.path()), before);
        assert_eq!(
            writer.current_file_path(),
            journal_path(tmp.path(), before as u64 - 1)
        );
    }

    #[test]
    fn test_journal_size_limit() {
        let tmp = TempDir::new().unwrap();
        let config = JournalConfig {
            max_total_size: 200,
            ..JournalConfig::new(tmp.path())
        };
        let mut writer = JournalWriter::open(config, 1).unwrap();

        let mut hit_limit = false;
        for seq in 1..=1000 {
            match writer.append(&sample_entry(seq)) {
                Ok(_) => {}
                Err(JournalError::SizeLimitExceeded { .. }) => {
                    hit_limit = true;
                    break;
                }
                Err(e) => panic!("Unexpected error: {:?}", e),
            }
        }
        assert!(hit_limit, "Expected size limit to be hit");
    }

    #[test]
    fn test_sync_flushes_deferred_writes() {
        let tmp = TempDir::new().unwrap();
        let config = JournalConfig {
            flush_policy: FlushPolicy::EveryN(1000),
            fsync_policy: FsyncPolicy::OnRotation,
            ..JournalConfig::new(tmp.path())
        };
        let mut writer = JournalWriter::open(config, 1).unwrap();

        writer.append(&sample_entry(1)).unwrap();
        writer.sync().unwrap();

        let size = fs::metadata(writer.current_file_path()).unwrap().len();
        assert!(size > 0);
    }

    #[test]
    fn test_journal_file_naming() {
        let path = journal_path(Path::new("/tmp"), 42);
        assert_eq!(path, PathBuf::from("/tmp/journal-000042.bin"));
        assert_eq!(parse_journal_index("journal-000042.bin"), Some(42));
        assert_eq!(parse_journal_index("snapshot-000042.bin"), None);
    }
}
