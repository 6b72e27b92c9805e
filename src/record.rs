//! Pica+ record structures and operations.
//!
//! A [`Record`] holds the record key (PPN), the subfield separator shared by
//! all of its fields, and an insertion-ordered map from tag to the raw bodies
//! carrying that tag. Bodies stay unparsed until a [`Field`] view is requested.
//!
//! # Examples
//!
//! ```
//! use pica_parse::Record;
//!
//! let record = Record::builder("000000001")
//!     .field("021A", "ƒavalue1")
//!     .field("021A", "ƒbvalue2")
//!     .field("028A", "ƒdJohann ƒaGoethe")
//!     .build();
//!
//! // Several 021A fields: the single-value accessor refuses to pick one
//! assert!(record.get_field("021A").is_err());
//! assert_eq!(record.get_all("021A")?.len(), 2);
//!
//! assert_eq!(record.get_subfield("028A", 'a')?, Some("Goethe"));
//! assert_eq!(record.get_subfield("999Z", 'a')?, None);
//! # Ok::<(), pica_parse::PicaError>(())
//! ```

use std::fmt;

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_SEPARATOR;
use crate::error::{PicaError, Result};
use crate::field::Field;
use crate::framer::{split_field_line, RawMap};

/// Every field of a record with its subfields materialized.
pub type FlatMap = IndexMap<String, Vec<IndexMap<char, Vec<String>>>>;

/// A Pica+ record.
///
/// Tags are stored in the order they were first seen and every tag maps to
/// a non-empty list of bodies, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawRecord")]
pub struct Record {
    /// Record key (PPN)
    pub key: String,
    /// Subfield separator used by every field of this record
    pub separator: char,
    fields: RawMap,
}

/// Serialized form of a [`Record`], normalized through [`Record::from_raw`].
#[derive(Deserialize)]
struct RawRecord {
    key: String,
    separator: char,
    fields: RawMap,
}

impl From<RawRecord> for Record {
    fn from(raw: RawRecord) -> Self {
        Record::from_raw(raw.key, raw.separator, raw.fields)
    }
}

impl Record {
    /// Create an empty record.
    #[must_use]
    pub fn new(key: impl Into<String>, separator: char) -> Self {
        Record {
            key: key.into(),
            separator,
            fields: IndexMap::new(),
        }
    }

    /// Create a builder for fluently constructing records.
    ///
    /// The builder starts with the default `'ƒ'` separator.
    #[must_use]
    pub fn builder(key: impl Into<String>) -> RecordBuilder {
        RecordBuilder {
            record: Record::new(key, DEFAULT_SEPARATOR),
        }
    }

    /// Build a record from unparsed field lines (`"<tag> <body>"`).
    #[must_use]
    pub fn from_lines<I, S>(key: impl Into<String>, separator: char, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut record = Record::new(key, separator);
        record.extend_raw(lines);
        record
    }

    /// Wrap a pre-built tag map as produced by the [`TagMap`](crate::framer::TagMap)
    /// accumulator.
    ///
    /// Tags mapped to an empty list are dropped so that every remaining tag
    /// has at least one body.
    #[must_use]
    pub fn from_raw(key: impl Into<String>, separator: char, mut fields: RawMap) -> Self {
        fields.retain(|_, bodies| !bodies.is_empty());
        Record {
            key: key.into(),
            separator,
            fields,
        }
    }

    /// Rebuild a record from `(key, tag, body)` storage rows.
    ///
    /// This is the inverse of [`to_triples`](Self::to_triples) and is what a
    /// relational store with `(ppn, field, content)` rows uses to hand records
    /// back.
    ///
    /// # Errors
    ///
    /// Returns [`PicaError::InvalidRecord`] if a row belongs to another key.
    pub fn from_raw_triples<I, K, T, B>(key: &str, separator: char, triples: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, T, B)>,
        K: AsRef<str>,
        T: Into<String>,
        B: Into<String>,
    {
        let mut record = Record::new(key, separator);
        for (row_key, tag, body) in triples {
            if row_key.as_ref() != key {
                return Err(PicaError::InvalidRecord(format!(
                    "row for {:?} passed while building {key:?}",
                    row_key.as_ref()
                )));
            }
            record.append(tag, body);
        }
        Ok(record)
    }

    /// Add one body for `tag`, after any existing bodies with that tag.
    pub fn append(&mut self, tag: impl Into<String>, body: impl Into<String>) {
        self.fields
            .entry(tag.into())
            .or_default()
            .push(body.into());
    }

    /// Add one unparsed field line, split on its first space.
    pub fn append_raw(&mut self, line: &str) {
        let (tag, body) = split_field_line(line);
        self.append(tag, body);
    }

    /// Add unparsed field lines in order.
    pub fn extend_raw<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            self.append_raw(line.as_ref());
        }
    }

    /// Whether at least one field has `tag`.
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.fields.contains_key(tag)
    }

    /// Number of field lines in the record.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.values().map(Vec::len).sum()
    }

    /// Whether the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Distinct tags in first-occurrence order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Unparsed bodies of every field with `tag`.
    #[must_use]
    pub fn raw_fields(&self, tag: &str) -> Option<&[String]> {
        self.fields.get(tag).map(Vec::as_slice)
    }

    /// The underlying tag map.
    #[must_use]
    pub fn as_raw(&self) -> &RawMap {
        &self.fields
    }

    /// Every field with `tag`, in source order.
    ///
    /// # Errors
    ///
    /// Returns [`PicaError::NotFound`] if no field has `tag`.
    pub fn get_all(&self, tag: &str) -> Result<Vec<Field<'_>>> {
        let (tag, bodies) = self
            .fields
            .get_key_value(tag)
            .ok_or_else(|| PicaError::NotFound(format!("field {tag} in record {}", self.key)))?;
        Ok(bodies
            .iter()
            .map(|body| Field::new(tag, body, self.separator))
            .collect())
    }

    /// The single field with `tag`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`PicaError::MultipleValues`] with every raw body if more than
    /// one field has `tag`.
    pub fn get_field(&self, tag: &str) -> Result<Option<Field<'_>>> {
        match self.fields.get_key_value(tag) {
            None => Ok(None),
            Some((tag, bodies)) => match bodies.as_slice() {
                [body] => Ok(Some(Field::new(tag, body, self.separator))),
                _ => Err(PicaError::MultipleValues {
                    key: tag.clone(),
                    values: bodies.clone(),
                }),
            },
        }
    }

    /// The single value of subfield `code` in the single field with `tag`.
    ///
    /// Returns `None` if the field or the subfield is absent.
    ///
    /// # Errors
    ///
    /// Returns [`PicaError::MultipleValues`] if the tag occurs more than once,
    /// or if the code occurs more than once within the field.
    pub fn get_subfield(&self, tag: &str, code: char) -> Result<Option<&str>> {
        match self.get_field(tag)? {
            Some(field) => field.get(code),
            None => Ok(None),
        }
    }

    /// Like [`get_subfield`](Self::get_subfield), with `default` for absence.
    ///
    /// # Errors
    ///
    /// Returns [`PicaError::MultipleValues`] under the same conditions as
    /// [`get_subfield`](Self::get_subfield).
    pub fn get_subfield_or<'a>(&'a self, tag: &str, code: char, default: &'a str) -> Result<&'a str> {
        Ok(self.get_subfield(tag, code)?.unwrap_or(default))
    }

    /// Iterate over every field, grouped by tag in first-occurrence order.
    pub fn iter(&self) -> impl Iterator<Item = Field<'_>> {
        self.fields.iter().flat_map(move |(tag, bodies)| {
            bodies
                .iter()
                .map(move |body| Field::new(tag, body, self.separator))
        })
    }

    /// Iterate over fields whose tag matches `pattern`.
    ///
    /// # Examples
    ///
    /// ```
    /// use pica_parse::Record;
    /// use regex::Regex;
    ///
    /// let record = Record::builder("1")
    ///     .field("028A", "ƒaGoethe")
    ///     .field("028C/01", "ƒaSchiller")
    ///     .field("021A", "ƒaFaust")
    ///     .build();
    ///
    /// let people = Regex::new(r"^028[A-C]").unwrap();
    /// assert_eq!(record.fields_matching_tag(&people).count(), 2);
    /// ```
    pub fn fields_matching_tag<'a>(
        &'a self,
        pattern: &'a Regex,
    ) -> impl Iterator<Item = Field<'a>> + 'a {
        self.iter().filter(move |field| pattern.is_match(field.tag()))
    }

    /// Fully parse every field into an owned, serializable map.
    #[must_use]
    pub fn to_flat_map(&self) -> FlatMap {
        self.fields
            .iter()
            .map(|(tag, bodies)| {
                let parsed = bodies
                    .iter()
                    .map(|body| Field::new(tag, body, self.separator).to_map())
                    .collect();
                (tag.clone(), parsed)
            })
            .collect()
    }

    /// Flatten into `(key, tag, body)` rows for tabular storage.
    pub fn to_triples(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        let key = self.key.as_str();
        self.fields.iter().flat_map(move |(tag, bodies)| {
            bodies
                .iter()
                .map(move |body| (key, tag.as_str(), body.as_str()))
        })
    }

    /// Serialize the record (key, separator, raw fields) to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Serialize the fully parsed record to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&serde_json::json!({
            "key": self.key,
            "fields": self.to_flat_map(),
        }))
    }
}

impl fmt::Display for Record {
    /// Writes one `"<tag> <body>"` line per field.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for field in self.iter() {
            writeln!(f, "{field}")?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = Field<'a>;
    type IntoIter = Box<dyn Iterator<Item = Field<'a>> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

/// Builder for fluently constructing records
///
/// # Examples
///
/// ```
/// use pica_parse::Record;
///
/// let record = Record::builder("123")
///     .separator('$')
///     .field("021A", "$aTitle")
///     .line("028A $aAuthor")
///     .build();
/// assert_eq!(record.get_subfield("028A", 'a')?, Some("Author"));
/// # Ok::<(), pica_parse::PicaError>(())
/// ```
#[derive(Debug)]
pub struct RecordBuilder {
    record: Record,
}

impl RecordBuilder {
    /// Set the subfield separator
    #[must_use]
    pub fn separator(mut self, separator: char) -> Self {
        self.record.separator = separator;
        self
    }

    /// Add a field from a tag and body
    #[must_use]
    pub fn field(mut self, tag: &str, body: &str) -> Self {
        self.record.append(tag, body);
        self
    }

    /// Add an unparsed field line
    #[must_use]
    pub fn line(mut self, line: &str) -> Self {
        self.record.append_raw(line);
        self
    }

    /// Build the record
    #[must_use]
    pub fn build(self) -> Record {
        self.record
    }
}
