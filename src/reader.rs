//! Streaming Pica+ records from files and buffers.
//!
//! This module provides [`PicaReader`], which yields one fully wrapped
//! [`Record`] at a time from any [`BufRead`] source, plus shortcuts for the
//! cheaper raw shapes of the same stream and [`open_dump`] for opening plain
//! or gzip-compressed dump files.
//!
//! Nothing here holds more than one record in memory; stopping early simply
//! leaves the source positioned after the last record read.
//!
//! # Examples
//!
//! Reading records from a file:
//!
//! ```no_run
//! use pica_parse::reader::{open_dump, PicaReader};
//!
//! let mut reader = PicaReader::new(open_dump("catalog.pp")?);
//!
//! while let Some(record) = reader.read_record()? {
//!     if let Some(title) = record.get_subfield("021A", 'a')? {
//!         println!("{}: {}", record.key, title);
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Reading from a buffer:
//!
//! ```
//! use pica_parse::reader::PicaReader;
//! use std::io::Cursor;
//!
//! let data = "SET: a b c d e 000000002 f\n021A ƒavalue3\n";
//! let records: Vec<_> = PicaReader::new(Cursor::new(data)).collect::<Result<_, _>>()?;
//!
//! assert_eq!(records[0].key, "000000002");
//! # Ok::<(), pica_parse::PicaError>(())
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::bufread::MultiGzDecoder;
use log::debug;

use crate::config::PicaConfig;
use crate::error::{PicaError, Result};
use crate::framer::{BlockReader, Lines, TagMap, TagPairs};
use crate::record::Record;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Reader yielding [`Record`]s from a Pica+ stream.
#[derive(Debug)]
pub struct PicaReader<R> {
    blocks: BlockReader<R, TagMap>,
}

impl<R: BufRead> PicaReader<R> {
    /// Create a reader with the default configuration.
    pub fn new(reader: R) -> Self {
        Self::with_config(reader, PicaConfig::default())
    }

    /// Create a reader with a custom configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use pica_parse::{PicaConfig, PicaReader};
    /// use std::io::Cursor;
    ///
    /// let data = "SET: a b c d e 1 f\n021A $aTitle\n";
    /// let config = PicaConfig::default().with_separator('$');
    /// let mut reader = PicaReader::with_config(Cursor::new(data), config);
    ///
    /// let record = reader.read_record()?.unwrap();
    /// assert_eq!(record.get_subfield("021A", 'a')?, Some("Title"));
    /// # Ok::<(), pica_parse::PicaError>(())
    /// ```
    pub fn with_config(reader: R, config: PicaConfig) -> Self {
        PicaReader {
            blocks: BlockReader::with_config(reader, config),
        }
    }

    /// Read the next record.
    ///
    /// Returns `Ok(Some(record))` if a record was read and `Ok(None)` at the end
    /// of the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream holds no boundary marker at all, a
    /// marker is malformed, or an I/O error occurs.
    pub fn read_record(&mut self) -> Result<Option<Record>> {
        let separator = self.blocks.config().separator;
        self.blocks
            .next()
            .transpose()
            .map(|block| block.map(|(key, fields)| Record::from_raw(key, separator, fields)))
    }

    /// Number of records read so far.
    #[must_use]
    pub fn records_read(&self) -> usize {
        self.blocks.records_read()
    }

    /// Consume the reader, returning the underlying source.
    pub fn into_inner(self) -> R {
        self.blocks.into_inner()
    }
}

impl<R: BufRead> Iterator for PicaReader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_record().transpose()
    }
}

/// Iterate over `(key, lines)` with each record's raw, non-blank lines.
pub fn read_lines<R: BufRead>(reader: R) -> BlockReader<R, Lines> {
    BlockReader::new(reader)
}

/// Iterate over `(key, tag map)` with bodies grouped by tag and left unparsed.
///
/// # Examples
///
/// ```
/// use pica_parse::reader::read_maps;
/// use std::io::Cursor;
///
/// let data = "SET: a b c d e 1 f\n021A ƒax\n021A ƒay\n";
/// for block in read_maps(Cursor::new(data)) {
///     let (key, fields) = block?;
///     assert_eq!(key, "1");
///     assert_eq!(fields["021A"].len(), 2);
/// }
/// # Ok::<(), pica_parse::PicaError>(())
/// ```
pub fn read_maps<R: BufRead>(reader: R) -> BlockReader<R, TagMap> {
    BlockReader::new(reader)
}

/// Iterate over `(key, pairs)` with `(tag, body)` pairs in source order.
pub fn read_pairs<R: BufRead>(reader: R) -> BlockReader<R, TagPairs> {
    BlockReader::new(reader)
}

/// Iterate over fully wrapped records with the default configuration.
pub fn read_records<R: BufRead>(reader: R) -> PicaReader<R> {
    PicaReader::new(reader)
}

/// Open a dump file for streaming, decompressing it if it is gzipped.
///
/// Compression is detected from the gzip magic bytes, not the file name.
///
/// # Errors
///
/// Returns [`PicaError::FileNotFound`] if `path` does not exist, or an I/O
/// error if it cannot be read.
pub fn open_dump(path: impl AsRef<Path>) -> Result<Box<dyn BufRead + Send>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => PicaError::FileNotFound(path.to_path_buf()),
        _ => PicaError::IoError(e),
    })?;
    let mut buffered = BufReader::new(file);
    if buffered.fill_buf()?.starts_with(&GZIP_MAGIC) {
        debug!("Opening {} as gzip stream", path.display());
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(buffered))))
    } else {
        debug!("Opening {} as plain text", path.display());
        Ok(Box::new(buffered))
    }
}
