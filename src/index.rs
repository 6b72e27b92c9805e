//! Offset index over a Pica+ dump file.
//!
//! An [`OffsetIndex`] maps each record key to the byte offset right after its
//! boundary marker line, so a single record can be re-read with one seek
//! instead of a scan. It is built with one forward pass over the raw bytes of
//! the dump and can be persisted as a small text table for reuse:
//!
//! ```text
//! /absolute/path/to/dump.pp
//! 000000001<TAB>27
//! 000000002<TAB>81
//! ```
//!
//! Rows are written in the order keys were first seen in the dump. If a key
//! occurs under several markers, the offset of the last occurrence wins.
//! The table stores no checksum: changing the dump invalidates the index
//! without detection, and the only remedy is a rebuild.
//!
//! # Examples
//!
//! ```no_run
//! use pica_parse::OffsetIndex;
//!
//! let index = OffsetIndex::build("catalog.pp")?;
//! index.persist("catalog.idx")?;
//!
//! let index = OffsetIndex::load("catalog.idx")?;
//! println!("{} records, first at {:?}", index.len(), index.get("000000001"));
//! # Ok::<(), pica_parse::PicaError>(())
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::{debug, info, warn};

use crate::boundary_scanner::{marker_key_bytes, RecordBoundaryScanner};
use crate::config::PicaConfig;
use crate::error::{PicaError, Result};

const READ_BUFFER_SIZE: usize = 1 << 16;

/// Mapping from record key to body offset within one dump file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetIndex {
    path: PathBuf,
    entries: IndexMap<String, u64>,
}

impl OffsetIndex {
    /// Create an empty index for the dump at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        OffsetIndex {
            path: path.into(),
            entries: IndexMap::new(),
        }
    }

    /// Build an index by scanning the dump at `path` once.
    ///
    /// # Errors
    ///
    /// Returns [`PicaError::FileNotFound`] if the dump does not exist,
    /// [`PicaError::MalformedMarker`] for a marker line without a key, or an
    /// I/O error.
    pub fn build(path: impl AsRef<Path>) -> Result<Self> {
        Self::build_with_config(path, &PicaConfig::default())
    }

    /// Build an index with a custom marker configuration.
    ///
    /// # Errors
    ///
    /// See [`build`](Self::build).
    pub fn build_with_config(path: impl AsRef<Path>, config: &PicaConfig) -> Result<Self> {
        let path = absolute_path(path.as_ref())?;
        let file = open_file(&path)?;
        let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);

        let mut index = OffsetIndex::new(path);
        let mut line = Vec::with_capacity(256);
        let mut position: u64 = 0;
        loop {
            line.clear();
            let read = reader.read_until(b'\n', &mut line)?;
            if read == 0 {
                break;
            }
            position += read as u64;
            if let Some(key) = marker_key_bytes(&line, config)? {
                index.insert(String::from_utf8_lossy(key).into_owned(), position);
            }
        }

        if index.is_empty() {
            warn!("No boundary markers found in {}", index.path.display());
        }
        info!(
            "Indexed {} records from {} ({position} bytes)",
            index.len(),
            index.path.display()
        );
        Ok(index)
    }

    /// Build an index from an in-memory copy of the dump at `path`.
    ///
    /// `path` is recorded as given; it should name the file `buffer` was read
    /// from so that lookups seek into the same bytes.
    ///
    /// # Errors
    ///
    /// Returns [`PicaError::NoRecords`] if `buffer` holds no marker line, or
    /// [`PicaError::MalformedMarker`] for a marker line without a key.
    pub fn from_bytes(path: impl Into<PathBuf>, buffer: &[u8], config: &PicaConfig) -> Result<Self> {
        let mut scanner = RecordBoundaryScanner::with_config(config.clone());
        let mut index = OffsetIndex::new(path);
        for (key, offset) in scanner.scan(buffer)? {
            index.insert(key, offset);
        }
        Ok(index)
    }

    /// Record `offset` for `key`, replacing any earlier offset.
    ///
    /// Returns the replaced offset. A replaced key keeps its original position
    /// in iteration order.
    pub fn insert(&mut self, key: String, offset: u64) -> Option<u64> {
        let previous = self.entries.insert(key, offset);
        if let Some(previous) = previous {
            debug!("Duplicate key at offset {offset}, replacing offset {previous}");
        }
        previous
    }

    /// Path of the indexed dump.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Offset of the record body for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<u64> {
        self.entries.get(key).copied()
    }

    /// Whether `key` is indexed.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of indexed keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over indexed keys in first-seen order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterate over `(key, offset)` pairs in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(key, &offset)| (key.as_str(), offset))
    }

    /// Write the index table to `destination`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn persist(&self, destination: impl AsRef<Path>) -> Result<()> {
        let destination = destination.as_ref();
        let mut writer = BufWriter::new(File::create(destination)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        info!(
            "Wrote index of {} keys to {}",
            self.len(),
            destination.display()
        );
        Ok(())
    }

    /// Write the index table to any writer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writeln!(writer, "{}", self.path.to_string_lossy())?;
        for (key, offset) in &self.entries {
            writeln!(writer, "{key}\t{offset}")?;
        }
        Ok(())
    }

    /// Load an index table written by [`persist`](Self::persist).
    ///
    /// # Errors
    ///
    /// Returns [`PicaError::CorruptIndex`] if the header line is missing or a
    /// row is not `<key>\t<offset>`, or an I/O error.
    pub fn load(source: impl AsRef<Path>) -> Result<Self> {
        let source = source.as_ref();
        let index = Self::read_from(BufReader::new(open_file(source)?))?;
        debug!(
            "Loaded index of {} keys for {} from {}",
            index.len(),
            index.path.display(),
            source.display()
        );
        Ok(index)
    }

    /// Read an index table from any buffered reader.
    ///
    /// # Errors
    ///
    /// See [`load`](Self::load).
    pub fn read_from<R: BufRead>(reader: R) -> Result<Self> {
        let mut lines = reader.lines();
        let header = lines
            .next()
            .transpose()?
            .ok_or_else(|| PicaError::CorruptIndex("missing header line".to_string()))?;
        let header = header.trim_end();
        if header.is_empty() {
            return Err(PicaError::CorruptIndex("empty header line".to_string()));
        }

        let mut index = OffsetIndex::new(header);
        for (number, line) in lines.enumerate() {
            let line = line?;
            let row = line.trim_end();
            if row.is_empty() {
                continue;
            }
            let (key, offset) = parse_row(row).ok_or_else(|| {
                PicaError::CorruptIndex(format!("line {}: {row:?}", number + 2))
            })?;
            index.entries.insert(key.to_string(), offset);
        }
        Ok(index)
    }
}

fn parse_row(row: &str) -> Option<(&str, u64)> {
    let (key, offset) = row.split_once('\t')?;
    if key.is_empty() || key.contains(char::is_whitespace) {
        return None;
    }
    Some((key, offset.trim().parse().ok()?))
}

fn absolute_path(path: &Path) -> Result<PathBuf> {
    std::fs::canonicalize(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => PicaError::FileNotFound(path.to_path_buf()),
        _ => PicaError::IoError(e),
    })
}

pub(crate) fn open_file(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => PicaError::FileNotFound(path.to_path_buf()),
        _ => PicaError::IoError(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const EXAMPLE: &str = "SET: a b c d e 000000001 f\n\
                           021A ƒavalue1\n\
                           021A ƒbvalue2\n\
                           SET: a b c d e 000000002 f\n\
                           021A ƒavalue3\n";

    fn write_dump(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_build_offsets() {
        let dump = write_dump(EXAMPLE.as_bytes());
        let index = OffsetIndex::build(dump.path()).unwrap();

        assert_eq!(index.len(), 2);
        let first = index.get("000000001").unwrap() as usize;
        let second = index.get("000000002").unwrap() as usize;
        assert!(EXAMPLE.as_bytes()[first..].starts_with("021A ƒavalue1".as_bytes()));
        assert!(EXAMPLE.as_bytes()[second..].starts_with("021A ƒavalue3".as_bytes()));
        assert!(index.path().is_absolute());
    }

    #[test]
    fn test_build_matches_in_memory_scan() {
        let dump = write_dump(EXAMPLE.as_bytes());
        let built = OffsetIndex::build(dump.path()).unwrap();
        let scanned =
            OffsetIndex::from_bytes(built.path(), EXAMPLE.as_bytes(), &PicaConfig::default())
                .unwrap();
        assert_eq!(built, scanned);
    }

    #[test]
    fn test_duplicate_key_keeps_last_offset() {
        let data = "SET: a b c d e 1 f\n003@ ƒ0first\nSET: a b c d e 1 f\n003@ ƒ0second\n";
        let dump = write_dump(data.as_bytes());
        let index = OffsetIndex::build(dump.path()).unwrap();

        assert_eq!(index.len(), 1);
        let offset = index.get("1").unwrap() as usize;
        assert!(data[offset..].starts_with("003@ ƒ0second"));
    }

    #[test]
    fn test_build_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = OffsetIndex::build(dir.path().join("missing.pp"));
        assert!(matches!(result, Err(PicaError::FileNotFound(_))));
    }

    #[test]
    fn test_build_malformed_marker() {
        let dump = write_dump(b"SET: only three tokens\n");
        let result = OffsetIndex::build(dump.path());
        assert!(matches!(result, Err(PicaError::MalformedMarker(_))));
    }

    #[test]
    fn test_persist_and_load() {
        let dump = write_dump(EXAMPLE.as_bytes());
        let index = OffsetIndex::build(dump.path()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let table = dir.path().join("dump.idx");
        index.persist(&table).unwrap();

        let text = std::fs::read_to_string(&table).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), index.path().to_string_lossy());
        assert_eq!(lines.next().unwrap(), "000000001\t27");

        let loaded = OffsetIndex::load(&table).unwrap();
        assert_eq!(loaded, index);
    }

    #[test]
    fn test_load_missing_header() {
        let result = OffsetIndex::read_from(Cursor::new(""));
        assert!(matches!(result, Err(PicaError::CorruptIndex(_))));
    }

    #[test]
    fn test_load_bad_offset() {
        let result = OffsetIndex::read_from(Cursor::new("/tmp/dump.pp\n1\tabc\n"));
        match result {
            Err(PicaError::CorruptIndex(msg)) => assert!(msg.contains("line 2"), "got: {msg}"),
            other => panic!("expected CorruptIndex, got {other:?}"),
        }
    }

    #[test]
    fn test_load_row_without_tab() {
        let result = OffsetIndex::read_from(Cursor::new("/tmp/dump.pp\n1 27\n"));
        assert!(matches!(result, Err(PicaError::CorruptIndex(_))));
    }

    #[test]
    fn test_load_skips_blank_rows() {
        let index = OffsetIndex::read_from(Cursor::new("/tmp/dump.pp\n1\t27\n\n2\t81\n")).unwrap();
        assert_eq!(index.path(), Path::new("/tmp/dump.pp"));
        assert_eq!(index.get("1"), Some(27));
        assert_eq!(index.get("2"), Some(81));
        assert_eq!(index.keys().collect::<Vec<_>>(), vec!["1", "2"]);
    }

    #[test]
    fn test_insert_reports_replacement() {
        let mut index = OffsetIndex::new("/tmp/dump.pp");
        assert_eq!(index.insert("1".to_string(), 10), None);
        assert_eq!(index.insert("1".to_string(), 20), Some(10));
        assert_eq!(index.iter().collect::<Vec<_>>(), vec![("1", 20)]);
    }
}
