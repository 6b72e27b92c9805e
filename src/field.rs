//! Pica+ fields and their subfields.
//!
//! A [`Field`] is a borrowed view of one field line of a [`Record`](crate::Record):
//! its tag, its raw body, and the record's subfield separator. Subfields are
//! parsed from the body on first access and cached for the lifetime of the
//! view.
//!
//! # Examples
//!
//! ```
//! use pica_parse::Field;
//!
//! let field = Field::new("021A", "ƒaDas Buch ƒhvon Niemand", 'ƒ');
//! assert_eq!(field.get('a')?, Some("Das Buch "));
//! assert_eq!(field.get('x')?, None);
//! assert_eq!(field.to_string(), "021A ƒaDas Buch ƒhvon Niemand");
//! # Ok::<(), pica_parse::PicaError>(())
//! ```

use std::cell::OnceCell;
use std::fmt;

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::error::{PicaError, Result};

/// Code given to the empty chunk between two consecutive separators.
pub const EMPTY_CODE: char = '\0';

/// Subfield code to values, in first-occurrence order of the code.
pub type SubfieldMap<'a> = IndexMap<char, SmallVec<[&'a str; 2]>>;

/// Parse a raw field body into its subfields.
///
/// Leading separators are stripped, the rest is split on `separator`, and the
/// first character of each chunk is its code. An empty body has no subfields.
///
/// # Examples
///
/// ```
/// use pica_parse::field::parse_subfields;
///
/// let map = parse_subfields("ƒaone ƒbtwo ƒathree", 'ƒ');
/// assert_eq!(map[&'a'].as_slice(), &["one ", "three"]);
/// assert_eq!(map[&'b'].as_slice(), &["two "]);
/// ```
#[must_use]
pub fn parse_subfields(raw: &str, separator: char) -> SubfieldMap<'_> {
    let mut map = SubfieldMap::new();
    let body = raw.trim_start_matches(separator);
    if body.is_empty() {
        return map;
    }
    for chunk in body.split(separator) {
        let mut chars = chunk.chars();
        let (code, value) = match chars.next() {
            Some(code) => (code, chars.as_str()),
            None => (EMPTY_CODE, ""),
        };
        map.entry(code).or_default().push(value);
    }
    map
}

/// One field of a record, parsed into subfields on demand.
#[derive(Clone)]
pub struct Field<'a> {
    tag: &'a str,
    raw: &'a str,
    separator: char,
    subfields: OnceCell<SubfieldMap<'a>>,
}

impl<'a> Field<'a> {
    /// Create a field view over a tag and raw body.
    #[must_use]
    pub fn new(tag: &'a str, raw: &'a str, separator: char) -> Self {
        Field {
            tag,
            raw,
            separator,
            subfields: OnceCell::new(),
        }
    }

    /// Field tag, e.g. `"021A"`.
    #[must_use]
    pub fn tag(&self) -> &'a str {
        self.tag
    }

    /// Unparsed body following the tag and its space.
    #[must_use]
    pub fn raw(&self) -> &'a str {
        self.raw
    }

    /// Subfield separator of the owning record.
    #[must_use]
    pub fn separator(&self) -> char {
        self.separator
    }

    /// Subfields keyed by code, parsed once and then cached.
    pub fn subfields(&self) -> &SubfieldMap<'a> {
        self.subfields
            .get_or_init(|| parse_subfields(self.raw, self.separator))
    }

    /// Whether any subfield carries `code`.
    #[must_use]
    pub fn contains(&self, code: char) -> bool {
        self.subfields().contains_key(&code)
    }

    /// All values of subfield `code`, in source order.
    ///
    /// # Errors
    ///
    /// Returns [`PicaError::NotFound`] if no subfield carries `code`.
    pub fn get_all(&self, code: char) -> Result<&[&'a str]> {
        self.subfields()
            .get(&code)
            .map(SmallVec::as_slice)
            .ok_or_else(|| PicaError::NotFound(format!("subfield {code:?} in {}", self.tag)))
    }

    /// The single value of subfield `code`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`PicaError::MultipleValues`] with every value if `code` occurs
    /// more than once.
    pub fn get(&self, code: char) -> Result<Option<&'a str>> {
        match self.subfields().get(&code).map(SmallVec::as_slice) {
            None => Ok(None),
            Some([value]) => Ok(Some(*value)),
            Some(values) => Err(PicaError::MultipleValues {
                key: code.to_string(),
                values: values.iter().map(ToString::to_string).collect(),
            }),
        }
    }

    /// The single value of subfield `code`, or `default` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`PicaError::MultipleValues`] if `code` occurs more than once.
    pub fn get_or<'d>(&self, code: char, default: &'d str) -> Result<&'d str>
    where
        'a: 'd,
    {
        Ok(self.get(code)?.unwrap_or(default))
    }

    /// Iterate over `(code, value)` pairs grouped by code.
    ///
    /// Codes appear in first-occurrence order, values in source order within
    /// a code. The iteration can be repeated; parsing happens only once.
    pub fn iter(&self) -> impl Iterator<Item = (char, &'a str)> + '_ {
        self.subfields()
            .iter()
            .flat_map(|(&code, values)| values.iter().map(move |&value| (code, value)))
    }

    /// Owned copy of the subfield map.
    #[must_use]
    pub fn to_map(&self) -> IndexMap<char, Vec<String>> {
        self.subfields()
            .iter()
            .map(|(&code, values)| (code, values.iter().map(ToString::to_string).collect()))
            .collect()
    }
}

impl fmt::Display for Field<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.tag, self.raw)
    }
}

impl fmt::Debug for Field<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("tag", &self.tag)
            .field("raw", &self.raw)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Field<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag && self.raw == other.raw && self.separator == other.separator
    }
}

impl Eq for Field<'_> {}
