#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # pica-parse: Pica+ plaintext catalog records
//!
//! A library for streaming, querying, indexing and exporting bibliographic
//! records in the Pica+ plaintext dump format.
//!
//! ## Quick Start
//!
//! ### Streaming Records
//!
//! ```
//! use pica_parse::PicaReader;
//! use std::io::Cursor;
//!
//! let dump = "SET: a b c d e 000000001 f\n021A ƒaDie Blechtrommel\n028A ƒdGünter ƒaGrass\n";
//! let mut reader = PicaReader::new(Cursor::new(dump));
//!
//! while let Some(record) = reader.read_record()? {
//!     if let Some(author) = record.get_field("028A")? {
//!         assert_eq!(author.get('a')?, Some("Grass"));
//!     }
//! }
//! # Ok::<(), pica_parse::PicaError>(())
//! ```
//!
//! ### Random Access by Key
//!
//! ```no_run
//! use pica_parse::{IndexedReader, OffsetIndex};
//!
//! let index = OffsetIndex::build("catalog.pp")?;
//! index.persist("catalog.idx")?;
//!
//! let mut reader = IndexedReader::open(index)?;
//! let record = reader.fetch("000000001")?;
//! println!("{}", record.to_json_pretty()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Modules
//!
//! - [`framer`]: Splitting a line stream into keyed record blocks
//! - [`boundary_scanner`]: Byte-level marker detection with `memchr`
//! - [`field`]: Fields and lazily parsed subfields
//! - [`record`]: Records (`Record`, `RecordBuilder`)
//! - [`reader`]: Streaming records from files and buffers
//! - [`index`]: Offset index over a dump file
//! - [`lookup`]: Keyed record access through an index
//! - [`tsv`]: Tab-separated export
//! - [`config`]: Dialect settings (marker, key position, separator)
//! - [`error`]: Error types and result type

pub mod boundary_scanner;
pub mod config;
pub mod error;
pub mod field;
pub mod framer;
pub mod index;
pub mod lookup;
pub mod reader;
/// Core record structures (`Record`, `RecordBuilder`)
pub mod record;
pub mod tsv;

pub use config::PicaConfig;
pub use error::{PicaError, Result};
pub use field::Field;
pub use index::OffsetIndex;
pub use lookup::IndexedReader;
pub use reader::PicaReader;
pub use record::{Record, RecordBuilder};
pub use tsv::TsvWriter;
