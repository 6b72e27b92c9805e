//! Record boundary detection over raw bytes.
//!
//! This module locates Pica+ boundary marker lines in a byte buffer using the
//! SIMD-accelerated `memchr` crate and reports, for each marker, the record key
//! and the byte offset at which that record's body begins (the first byte after
//! the marker line). Working on bytes keeps offsets exact regardless of the
//! text encoding of the dump.
//!
//! # Example
//!
//! ```
//! use pica_parse::boundary_scanner::RecordBoundaryScanner;
//!
//! let buffer = b"SET: a b c d e 1 f\n003@ \xc6\x9201\nSET: a b c d e 2 f\n";
//! let mut scanner = RecordBoundaryScanner::new();
//! let boundaries = scanner.scan(buffer)?;
//!
//! assert_eq!(boundaries, vec![("1".to_string(), 19), ("2".to_string(), buffer.len() as u64)]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use memchr::memmem;

use crate::config::PicaConfig;
use crate::error::{PicaError, Result};

/// Return the key bytes if `line` is a boundary marker.
///
/// Tokens are separated by runs of ASCII whitespace; a trailing line
/// terminator is ignored.
///
/// # Errors
///
/// Returns [`PicaError::MalformedMarker`] if the line starts with the marker
/// prefix but has too few tokens.
pub fn marker_key_bytes<'a>(line: &'a [u8], config: &PicaConfig) -> Result<Option<&'a [u8]>> {
    if !line.starts_with(config.marker_prefix.as_bytes()) {
        return Ok(None);
    }
    line.split(u8::is_ascii_whitespace)
        .filter(|token| !token.is_empty())
        .nth(config.key_position)
        .map(Some)
        .ok_or_else(|| {
            PicaError::MalformedMarker(String::from_utf8_lossy(line).trim_end().to_string())
        })
}

/// Boundary scanner for in-memory Pica+ dumps.
///
/// Returns every marker in source order, duplicates included; collapsing
/// duplicate keys is left to the caller.
#[derive(Debug, Default)]
pub struct RecordBoundaryScanner {
    config: PicaConfig,
    /// Pre-allocated buffer for reuse across scans
    boundaries: Vec<(String, u64)>,
}

impl RecordBoundaryScanner {
    /// Create a new boundary scanner with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(PicaConfig::default())
    }

    /// Create a new boundary scanner with a custom configuration.
    #[must_use]
    pub fn with_config(config: PicaConfig) -> Self {
        Self {
            config,
            boundaries: Vec::with_capacity(100),
        }
    }

    /// Scan a buffer for `(key, body offset)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`PicaError::NoRecords`] if the buffer holds no marker line, or
    /// [`PicaError::MalformedMarker`] for a marker without a key.
    ///
    /// # Examples
    ///
    /// ```
    /// use pica_parse::boundary_scanner::RecordBoundaryScanner;
    ///
    /// let data = b"junk\nSET: a b c d e 7 f\r\n021A x\n";
    /// let mut scanner = RecordBoundaryScanner::new();
    /// let boundaries = scanner.scan(data)?;
    ///
    /// assert_eq!(boundaries.len(), 1);
    /// assert_eq!(boundaries[0], ("7".to_string(), 25));
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn scan(&mut self, buffer: &[u8]) -> Result<Vec<(String, u64)>> {
        self.boundaries.clear();

        let mut start = 0;
        for newline in memchr::memchr_iter(b'\n', buffer) {
            self.visit_line(&buffer[start..newline], newline + 1)?;
            start = newline + 1;
        }
        if start < buffer.len() {
            self.visit_line(&buffer[start..], buffer.len())?;
        }

        if self.boundaries.is_empty() {
            return Err(PicaError::NoRecords);
        }

        Ok(self.boundaries.clone())
    }

    fn visit_line(&mut self, line: &[u8], next_line_start: usize) -> Result<()> {
        if let Some(key) = marker_key_bytes(line, &self.config)? {
            self.boundaries.push((
                String::from_utf8_lossy(key).into_owned(),
                next_line_start as u64,
            ));
        }
        Ok(())
    }

    /// Count marker lines in a buffer without extracting keys.
    ///
    /// # Examples
    ///
    /// ```
    /// use pica_parse::boundary_scanner::RecordBoundaryScanner;
    ///
    /// let data = b"SET: a b c d e 1 f\n021A x\nSET: a b c d e 2 f\n";
    /// let scanner = RecordBoundaryScanner::new();
    /// assert_eq!(scanner.count_records(data), 2);
    /// ```
    #[must_use]
    pub fn count_records(&self, buffer: &[u8]) -> usize {
        let prefix = self.config.marker_prefix.as_bytes();
        let mut needle = Vec::with_capacity(prefix.len() + 1);
        needle.push(b'\n');
        needle.extend_from_slice(prefix);

        let at_start = usize::from(buffer.starts_with(prefix));
        at_start + memmem::find_iter(buffer, &needle).count()
    }

    /// Clear internal state.
    pub fn clear(&mut self) {
        self.boundaries.clear();
    }

    /// Get the current capacity of the scanner.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.boundaries.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_key_bytes() {
        let config = PicaConfig::default();
        assert_eq!(
            marker_key_bytes(b"SET: a b c d e 123 f\r", &config).unwrap(),
            Some(&b"123"[..])
        );
        assert_eq!(marker_key_bytes(b"021A x", &config).unwrap(), None);
        assert!(marker_key_bytes(b"SET: a", &config).is_err());
    }

    #[test]
    fn test_scan_single_record() {
        let data = b"SET: a b c d e 1 f\n021A x\n";
        let mut scanner = RecordBoundaryScanner::new();
        let boundaries = scanner.scan(data).unwrap();

        assert_eq!(boundaries, vec![("1".to_string(), 19)]);
    }

    #[test]
    fn test_scan_offsets_point_after_marker() {
        let data = b"SET: a b c d e 1 f\n021A x\nSET: a b c d e 2 f\n021A y\n";
        let mut scanner = RecordBoundaryScanner::new();
        let boundaries = scanner.scan(data).unwrap();

        assert_eq!(boundaries.len(), 2);
        for (_, offset) in &boundaries {
            let rest = &data[*offset as usize..];
            assert!(rest.starts_with(b"021A"));
        }
    }

    #[test]
    fn test_scan_keeps_duplicates() {
        let data = b"SET: a b c d e 1 f\nSET: a b c d e 1 f\n";
        let mut scanner = RecordBoundaryScanner::new();
        let boundaries = scanner.scan(data).unwrap();

        assert_eq!(boundaries, vec![("1".to_string(), 19), ("1".to_string(), 38)]);
    }

    #[test]
    fn test_scan_empty_buffer() {
        let mut scanner = RecordBoundaryScanner::new();
        assert!(matches!(scanner.scan(b""), Err(PicaError::NoRecords)));
    }

    #[test]
    fn test_scan_no_markers() {
        let mut scanner = RecordBoundaryScanner::new();
        assert!(matches!(
            scanner.scan(b"021A x\n003@ y\n"),
            Err(PicaError::NoRecords)
        ));
    }

    #[test]
    fn test_scan_malformed_marker() {
        let mut scanner = RecordBoundaryScanner::new();
        let result = scanner.scan(b"SET: a b\n");
        assert!(matches!(result, Err(PicaError::MalformedMarker(_))));
    }

    #[test]
    fn test_marker_without_trailing_newline() {
        let data = b"SET: a b c d e 9 f";
        let mut scanner = RecordBoundaryScanner::new();
        let boundaries = scanner.scan(data).unwrap();
        assert_eq!(boundaries, vec![("9".to_string(), data.len() as u64)]);
    }

    #[test]
    fn test_count_records() {
        let data = b"SET: a b c d e 1 f\n021A x\nSET: a b c d e 2 f\n";
        let scanner = RecordBoundaryScanner::new();
        assert_eq!(scanner.count_records(data), 2);
        assert_eq!(scanner.count_records(b""), 0);
        assert_eq!(scanner.count_records(b"021A SET: inline\n"), 0);
    }

    #[test]
    fn test_reuse_scanner() {
        let mut scanner = RecordBoundaryScanner::new();

        let first = scanner.scan(b"SET: a b c d e 1 f\nSET: a b c d e 2 f\n").unwrap();
        assert_eq!(first.len(), 2);

        let second = scanner.scan(b"SET: a b c d e 3 f\n").unwrap();
        assert_eq!(second, vec![("3".to_string(), 19)]);
    }

    #[test]
    fn test_large_buffer() {
        let mut data = Vec::new();
        for i in 0..1000 {
            data.extend_from_slice(format!("SET: a b c d e {i:09} f\n021A ƒax\n").as_bytes());
        }

        let mut scanner = RecordBoundaryScanner::new();
        let boundaries = scanner.scan(&data).unwrap();

        assert_eq!(boundaries.len(), 1000);
        assert_eq!(boundaries[999].0, "000000999");
        assert_eq!(scanner.count_records(&data), 1000);
    }
}
