//! Random-access record lookup through an [`OffsetIndex`].
//!
//! [`IndexedReader`] keeps the indexed dump open and serves single records by
//! key: it seeks to the stored offset and re-reads exactly one record's lines.
//!
//! A reader owns one file handle and one seek position, so [`fetch`]
//! takes `&mut self`. To look records up from several threads, give each
//! worker its own reader (they may share a cloned [`OffsetIndex`]) or put a
//! single reader behind a `Mutex`.
//!
//! [`fetch`]: IndexedReader::fetch
//!
//! # Examples
//!
//! ```no_run
//! use pica_parse::IndexedReader;
//!
//! let mut reader = IndexedReader::from_index_file("catalog.idx")?;
//! let record = reader.fetch("000000001")?;
//! println!("{record}");
//! # Ok::<(), pica_parse::PicaError>(())
//! ```

use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::Path;

use log::trace;

use crate::config::PicaConfig;
use crate::error::{PicaError, Result};
use crate::framer::read_block_lines;
use crate::index::{open_file, OffsetIndex};
use crate::record::Record;

/// Keyed access to the records of one indexed dump.
///
/// The dump file is closed when the reader is dropped.
#[derive(Debug)]
pub struct IndexedReader {
    index: OffsetIndex,
    file: BufReader<File>,
    config: PicaConfig,
}

impl IndexedReader {
    /// Open the dump recorded in `index`.
    ///
    /// # Errors
    ///
    /// Returns [`PicaError::FileNotFound`] if the dump no longer exists, or an
    /// I/O error if it cannot be opened.
    pub fn open(index: OffsetIndex) -> Result<Self> {
        Self::open_with_config(index, PicaConfig::default())
    }

    /// Open the dump recorded in `index` with a custom configuration.
    ///
    /// # Errors
    ///
    /// See [`open`](Self::open).
    pub fn open_with_config(index: OffsetIndex, config: PicaConfig) -> Result<Self> {
        let file = open_file(index.path())?;
        Ok(IndexedReader {
            index,
            file: BufReader::new(file),
            config,
        })
    }

    /// Index the dump at `path` and open it.
    ///
    /// # Errors
    ///
    /// Returns any error from [`OffsetIndex::build`] or [`open`](Self::open).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(OffsetIndex::build(path)?)
    }

    /// Load a persisted index table and open the dump it names.
    ///
    /// # Errors
    ///
    /// Returns any error from [`OffsetIndex::load`] or [`open`](Self::open).
    pub fn from_index_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(OffsetIndex::load(path)?)
    }

    /// Set the subfield separator of fetched records.
    #[must_use]
    pub fn with_separator(mut self, separator: char) -> Self {
        self.config.separator = separator;
        self
    }

    /// The index backing this reader.
    #[must_use]
    pub fn index(&self) -> &OffsetIndex {
        &self.index
    }

    /// Close the dump and return the index.
    #[must_use]
    pub fn into_index(self) -> OffsetIndex {
        self.index
    }

    /// Whether `key` can be fetched.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Read the record stored under `key`.
    ///
    /// Reads from the indexed offset up to the next boundary marker or the end
    /// of the file, never further.
    ///
    /// # Errors
    ///
    /// Returns [`PicaError::KeyNotFound`] if `key` is not indexed, or an I/O
    /// error if seeking or reading fails.
    pub fn fetch(&mut self, key: &str) -> Result<Record> {
        let offset = self
            .index
            .get(key)
            .ok_or_else(|| PicaError::KeyNotFound(key.to_string()))?;
        trace!("Fetching {key} at offset {offset}");

        self.file.seek(SeekFrom::Start(offset))?;
        let lines = read_block_lines(&mut self.file, &self.config)?;
        Ok(Record::from_lines(key, self.config.separator, lines))
    }

    /// Like [`fetch`](Self::fetch), returning `None` for unknown keys.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if seeking or reading fails.
    pub fn get(&mut self, key: &str) -> Result<Option<Record>> {
        match self.fetch(key) {
            Ok(record) => Ok(Some(record)),
            Err(PicaError::KeyNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
