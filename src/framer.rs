//! Splitting a plaintext Pica+ stream into record blocks.
//!
//! A dump is a sequence of lines. A record starts with a boundary marker line
//! (`SET: ...`) whose seventh whitespace token is the record key (PPN); every
//! following non-blank line up to the next marker belongs to that record.
//!
//! [`BlockReader`] drives this framing loop over any [`BufRead`] source and
//! hands each line to an [`Accumulator`], so the same loop can produce raw
//! lines, a tag map, ordered tag/body pairs, or just the set of tags seen.
//!
//! # Examples
//!
//! ```
//! use pica_parse::framer::{BlockReader, TagMap};
//! use std::io::Cursor;
//!
//! let dump = "SET: a b c d e 000000001 f\n021A ƒavalue1\n021A ƒbvalue2\n";
//! let mut blocks = BlockReader::<_, TagMap>::new(Cursor::new(dump));
//!
//! let (key, fields) = blocks.next().unwrap()?;
//! assert_eq!(key, "000000001");
//! assert_eq!(fields["021A"], vec!["ƒavalue1", "ƒbvalue2"]);
//! assert!(blocks.next().is_none());
//! # Ok::<(), pica_parse::PicaError>(())
//! ```

use std::io::BufRead;
use std::marker::PhantomData;

use indexmap::{IndexMap, IndexSet};

use crate::config::PicaConfig;
use crate::error::{PicaError, Result};

/// Tag to raw bodies, in first-occurrence order of the tag.
pub type RawMap = IndexMap<String, Vec<String>>;

/// Return the record key if `line` is a boundary marker.
///
/// Returns `Ok(None)` for ordinary lines.
///
/// # Errors
///
/// Returns [`PicaError::MalformedMarker`] if the line starts with the marker
/// prefix but has too few tokens to hold a key.
///
/// # Examples
///
/// ```
/// use pica_parse::framer::marker_key;
/// use pica_parse::PicaConfig;
///
/// let config = PicaConfig::default();
/// assert_eq!(marker_key("SET: a b c d e 123 f", &config)?, Some("123"));
/// assert_eq!(marker_key("021A ƒavalue", &config)?, None);
/// assert!(marker_key("SET: a b", &config).is_err());
/// # Ok::<(), pica_parse::PicaError>(())
/// ```
pub fn marker_key<'a>(line: &'a str, config: &PicaConfig) -> Result<Option<&'a str>> {
    if !line.starts_with(config.marker_prefix.as_str()) {
        return Ok(None);
    }
    line.split_whitespace()
        .nth(config.key_position)
        .map(Some)
        .ok_or_else(|| PicaError::MalformedMarker(line.to_string()))
}

/// Split a field line on its first space into `(tag, body)`.
///
/// A line without a space is a tag with an empty body.
#[must_use]
pub fn split_field_line(line: &str) -> (&str, &str) {
    line.split_once(' ').unwrap_or((line, ""))
}

/// Strategy for collecting the lines of one record block.
pub trait Accumulator {
    /// Container produced for each record.
    type Block;

    /// Create an empty container for a new record.
    fn new_block() -> Self::Block;

    /// Add one non-blank, right-stripped line to the container.
    fn push(block: &mut Self::Block, line: String);
}

/// Collect lines verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lines;

impl Accumulator for Lines {
    type Block = Vec<String>;

    fn new_block() -> Self::Block {
        Vec::new()
    }

    fn push(block: &mut Self::Block, line: String) {
        block.push(line);
    }
}

/// Group bodies by tag, keeping duplicates and first-occurrence tag order.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagMap;

impl Accumulator for TagMap {
    type Block = RawMap;

    fn new_block() -> Self::Block {
        IndexMap::new()
    }

    fn push(block: &mut Self::Block, line: String) {
        let (tag, body) = split_field_line(&line);
        block
            .entry(tag.to_string())
            .or_default()
            .push(body.to_string());
    }
}

/// Keep `(tag, body)` pairs in source order without grouping.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagPairs;

impl Accumulator for TagPairs {
    type Block = Vec<(String, String)>;

    fn new_block() -> Self::Block {
        Vec::new()
    }

    fn push(block: &mut Self::Block, line: String) {
        let (tag, body) = split_field_line(&line);
        block.push((tag.to_string(), body.to_string()));
    }
}

/// Record only which tags occur, ignoring bodies.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagSet;

impl Accumulator for TagSet {
    type Block = IndexSet<String>;

    fn new_block() -> Self::Block {
        IndexSet::new()
    }

    fn push(block: &mut Self::Block, line: String) {
        let (tag, _) = split_field_line(&line);
        if !block.contains(tag) {
            block.insert(tag.to_string());
        }
    }
}

/// Read one line, decoded lossily and stripped of trailing whitespace.
///
/// Returns `Ok(None)` at end of stream.
pub(crate) fn read_trimmed_line<R: BufRead>(
    reader: &mut R,
    buf: &mut Vec<u8>,
) -> std::io::Result<Option<String>> {
    buf.clear();
    if reader.read_until(b'\n', buf)? == 0 {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(buf).trim_end().to_string()))
}

/// Read the body lines of a single record from the current position.
///
/// Reads until the next boundary marker or end of stream, dropping blank lines.
/// This is the extraction routine used for indexed lookups, where `reader` has
/// been positioned just after a marker line.
///
/// # Errors
///
/// Returns an error if reading from `reader` fails.
pub fn read_block_lines<R: BufRead>(reader: &mut R, config: &PicaConfig) -> Result<Vec<String>> {
    let mut buf = Vec::new();
    let mut lines = Vec::new();
    while let Some(line) = read_trimmed_line(reader, &mut buf)? {
        if line.starts_with(config.marker_prefix.as_str()) {
            break;
        }
        if !line.is_empty() {
            lines.push(line);
        }
    }
    Ok(lines)
}

/// Iterator over `(key, block)` pairs of a Pica+ stream.
///
/// Lines before the first boundary marker are skipped. The iteration is
/// single-pass: it consumes the underlying reader, and a fresh reader is
/// needed to iterate again. A record followed by a malformed marker is yielded
/// before the error; after the first error the iterator is fused.
///
/// # Examples
///
/// ```
/// use pica_parse::framer::{BlockReader, Lines};
/// use std::io::Cursor;
///
/// let dump = "header junk\nSET: a b c d e 1 f\n\n003@ ƒ01\nSET: a b c d e 2 f\n";
/// let blocks: Vec<_> = BlockReader::<_, Lines>::new(Cursor::new(dump))
///     .collect::<Result<_, _>>()?;
///
/// assert_eq!(blocks.len(), 2);
/// assert_eq!(blocks[0], ("1".to_string(), vec!["003@ ƒ01".to_string()]));
/// assert_eq!(blocks[1], ("2".to_string(), vec![]));
/// # Ok::<(), pica_parse::PicaError>(())
/// ```
#[derive(Debug)]
pub struct BlockReader<R, A> {
    reader: R,
    config: PicaConfig,
    buf: Vec<u8>,
    pending_key: Option<String>,
    pending_error: Option<PicaError>,
    started: bool,
    finished: bool,
    records_read: usize,
    _strategy: PhantomData<A>,
}

impl<R: BufRead, A: Accumulator> BlockReader<R, A> {
    /// Create a block reader with the default configuration.
    pub fn new(reader: R) -> Self {
        Self::with_config(reader, PicaConfig::default())
    }

    /// Create a block reader with a custom configuration.
    pub fn with_config(reader: R, config: PicaConfig) -> Self {
        BlockReader {
            reader,
            config,
            buf: Vec::with_capacity(256),
            pending_key: None,
            pending_error: None,
            started: false,
            finished: false,
            records_read: 0,
            _strategy: PhantomData,
        }
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &PicaConfig {
        &self.config
    }

    /// Number of records yielded so far.
    #[must_use]
    pub fn records_read(&self) -> usize {
        self.records_read
    }

    /// Consume the block reader, returning the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }

    fn next_line(&mut self) -> Result<Option<String>> {
        Ok(read_trimmed_line(&mut self.reader, &mut self.buf)?)
    }

    fn first_key(&mut self) -> Result<String> {
        loop {
            let Some(line) = self.next_line()? else {
                return Err(PicaError::NoRecords);
            };
            if let Some(key) = marker_key(&line, &self.config)? {
                return Ok(key.to_string());
            }
        }
    }

    fn next_block(&mut self) -> Result<Option<(String, A::Block)>> {
        if let Some(e) = self.pending_error.take() {
            return Err(e);
        }
        let key = match self.pending_key.take() {
            Some(key) => key,
            None if self.started => return Ok(None),
            None => {
                self.started = true;
                self.first_key()?
            },
        };

        let mut block = A::new_block();
        while let Some(line) = self.next_line()? {
            match marker_key(&line, &self.config) {
                Ok(Some(next_key)) => {
                    self.pending_key = Some(next_key.to_string());
                    break;
                },
                // The finished block is still yielded; the error follows it.
                Err(e) => {
                    self.pending_error = Some(e);
                    break;
                },
                Ok(None) => {},
            }
            if !line.is_empty() {
                A::push(&mut block, line);
            }
        }
        Ok(Some((key, block)))
    }
}

impl<R: BufRead, A: Accumulator> Iterator for BlockReader<R, A> {
    type Item = Result<(String, A::Block)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_block() {
            Ok(Some(block)) => {
                self.records_read += 1;
                Some(Ok(block))
            },
            Ok(None) => {
                self.finished = true;
                None
            },
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            },
        }
    }
}

impl<R: BufRead, A: Accumulator> std::iter::FusedIterator for BlockReader<R, A> {}
