//! Tab-separated export of Pica+ records.
//!
//! This module writes one column per requested tag, with the record key in a
//! leading `PPN` column. Bodies are written raw, without subfield parsing.
//!
//! # Row Shapes
//!
//! - **Joined** ([`TsvWriter::with_join`]): one row per record; several
//!   fields with the same tag are joined with the given string.
//! - **Expanded** (default): as many rows per record as the most repeated
//!   requested tag; shorter columns are padded with empty cells.
//!
//! A tag missing from a record gives an empty cell, never an error.
//!
//! # Examples
//!
//! ```
//! use pica_parse::reader::read_maps;
//! use pica_parse::tsv::TsvWriter;
//! use std::io::Cursor;
//!
//! let dump = "SET: a b c d e 000000001 f\n021A ƒavalue1\n021A ƒbvalue2\n";
//! let mut writer = TsvWriter::new(Vec::new(), ["021A"]).with_join("; ");
//! writer.write_header()?;
//! writer.write_all(read_maps(Cursor::new(dump)))?;
//!
//! let output = String::from_utf8(writer.into_inner()?).unwrap();
//! assert_eq!(output, "PPN\t021A\n000000001\tƒavalue1; ƒbvalue2\n");
//! # Ok::<(), pica_parse::PicaError>(())
//! ```

use std::cmp::Reverse;
use std::io::{BufRead, Write};

use indexmap::IndexMap;
use log::debug;

use crate::config::PicaConfig;
use crate::error::{PicaError, Result};
use crate::framer::{BlockReader, RawMap, TagSet};
use crate::record::Record;

/// Name of the key column.
pub const KEY_COLUMN: &str = "PPN";

/// Columns exported when no tag list is given.
pub const DEFAULT_TAGS: &[&str] = &[
    "PPN", "002@", "003O", "004A", "009P", "010@", "011@", "021A", "021M", "022A", "022A/01",
    "025@", "027A", "027A/01", "027A/02", "027A/03", "028A", "028B/01", "028C", "028C/01",
    "028C/02", "028C/03", "028F", "032@", "032B", "033A", "034D", "036C", "036C/01", "036D",
    "036E", "036G", "037A", "037C", "041A", "041A/01", "041A/02", "044A", "044K", "045B", "045E",
    "045F", "045F/01", "045K", "045R", "045U", "045Z", "046B", "046C", "046L", "046M", "047C",
    "145S/01", "145S/02", "145S/06", "145S/07", "145S/08", "145S/11", "145Z/01", "145Z/02",
    "145Z/03",
];

/// Order candidate tags by how many records of a dump contain them.
///
/// Makes one pass over `reader` that only collects the distinct tags of each
/// record. The result starts with [`KEY_COLUMN`], followed by every candidate
/// seen in at least one record, most frequent first; ties keep candidate
/// order. Candidates never seen are dropped.
///
/// # Errors
///
/// Returns any framing or I/O error from reading the dump.
///
/// # Examples
///
/// ```
/// use pica_parse::tsv::frequency_rank;
/// use pica_parse::PicaConfig;
/// use std::io::Cursor;
///
/// let dump = "SET: a b c d e 1 f\n021A x\n028A y\nSET: a b c d e 2 f\n028A z\n";
/// let ranked = frequency_rank(Cursor::new(dump), &["021A", "028A", "044K"], &PicaConfig::default())?;
/// assert_eq!(ranked, vec!["PPN", "028A", "021A"]);
/// # Ok::<(), pica_parse::PicaError>(())
/// ```
pub fn frequency_rank<R, S>(reader: R, candidates: &[S], config: &PicaConfig) -> Result<Vec<String>>
where
    R: BufRead,
    S: AsRef<str>,
{
    let mut counts: IndexMap<&str, usize> = candidates
        .iter()
        .map(AsRef::as_ref)
        .filter(|tag| *tag != KEY_COLUMN)
        .map(|tag| (tag, 0))
        .collect();

    for block in BlockReader::<_, TagSet>::with_config(reader, config.clone()) {
        let (_, tags) = block?;
        for tag in &tags {
            if let Some(count) = counts.get_mut(tag.as_str()) {
                *count += 1;
            }
        }
    }

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().filter(|(_, n)| *n > 0).collect();
    ranked.sort_by_key(|(_, n)| Reverse(*n));
    debug!("Tag frequencies: {ranked:?}");

    Ok(std::iter::once(KEY_COLUMN.to_string())
        .chain(ranked.into_iter().map(|(tag, _)| tag.to_string()))
        .collect())
}

/// Writer producing tab-separated rows from records.
#[derive(Debug)]
pub struct TsvWriter<W: Write> {
    writer: csv::Writer<W>,
    tags: Vec<String>,
    join: Option<String>,
    rows_written: usize,
}

impl<W: Write> TsvWriter<W> {
    /// Create a writer for the given columns.
    ///
    /// [`KEY_COLUMN`] is inserted as the first column if `tags` lacks it.
    pub fn new<I, S>(writer: W, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tags: Vec<String> = tags.into_iter().map(Into::into).collect();
        if !tags.iter().any(|tag| tag == KEY_COLUMN) {
            tags.insert(0, KEY_COLUMN.to_string());
        }
        let writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .quote_style(csv::QuoteStyle::Never)
            .flexible(false)
            .from_writer(writer);
        TsvWriter {
            writer,
            tags,
            join: None,
            rows_written: 0,
        }
    }

    /// Join repeated fields into one cell with `separator`.
    #[must_use]
    pub fn with_join(mut self, separator: impl Into<String>) -> Self {
        self.join = Some(separator.into());
        self
    }

    /// Exported columns, key column included.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Number of data rows written so far.
    #[must_use]
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Write the column names.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_header(&mut self) -> Result<()> {
        self.writer.write_record(&self.tags).map_err(csv_error)
    }

    /// Write the rows of one record given as a raw tag map.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_block(&mut self, key: &str, fields: &RawMap) -> Result<()> {
        let key_cell = [key.to_string()];
        let columns: Vec<&[String]> = self
            .tags
            .iter()
            .map(|tag| {
                if tag == KEY_COLUMN {
                    &key_cell[..]
                } else {
                    fields.get(tag).map_or(&[][..], Vec::as_slice)
                }
            })
            .collect();

        if let Some(separator) = &self.join {
            let row: Vec<String> = columns
                .iter()
                .map(|cells| cells.join(separator.as_str()))
                .collect();
            self.writer.write_record(&row).map_err(csv_error)?;
            self.rows_written += 1;
            return Ok(());
        }

        let depth = columns.iter().map(|cells| cells.len()).max().unwrap_or(0);
        for i in 0..depth {
            let row = columns
                .iter()
                .map(|cells| cells.get(i).map_or("", String::as_str));
            self.writer.write_record(row).map_err(csv_error)?;
            self.rows_written += 1;
        }
        Ok(())
    }

    /// Write the rows of one record.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        self.write_block(&record.key, record.as_raw())
    }

    /// Write every record of a stream, returning the number of records.
    ///
    /// # Errors
    ///
    /// Returns the first framing, I/O or write error.
    pub fn write_all<I>(&mut self, blocks: I) -> Result<usize>
    where
        I: IntoIterator<Item = Result<(String, RawMap)>>,
    {
        let mut records = 0;
        for block in blocks {
            let (key, fields) = block?;
            self.write_block(&key, &fields)?;
            records += 1;
        }
        Ok(records)
    }

    /// Flush buffered rows.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing fails.
    pub fn flush(&mut self) -> Result<()> {
        Ok(self.writer.flush()?)
    }

    /// Flush and return the underlying writer.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing fails.
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| PicaError::IoError(std::io::Error::new(e.error().kind(), e.to_string())))
    }
}

fn csv_error(e: csv::Error) -> PicaError {
    PicaError::IoError(e.into())
}
