//! Common test helpers and utilities shared across test suite.

use std::io::Write;

use tempfile::NamedTempFile;

/// Path of the sample dump shipped with the tests.
#[allow(dead_code)]
pub const SAMPLE_DUMP: &str = "tests/data/sample.pp";

/// Keys of the records in the sample dump, in file order.
#[allow(dead_code)]
pub const SAMPLE_KEYS: [&str; 4] = ["000000001", "000000002", "000000003", "000000004"];

/// The two-record dump used throughout the format documentation.
#[allow(dead_code)]
pub const WORKED_EXAMPLE: &str = "SET: a b c d e 000000001 f\n\
                                  021A ƒavalue1\n\
                                  \n\
                                  021A ƒbvalue2\n\
                                  SET: a b c d e 000000002 f\n\
                                  021A ƒavalue3\n";

/// Writes `contents` to a fresh temporary file.
///
/// The file is removed when the returned handle is dropped.
pub fn write_dump(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(contents.as_bytes())
        .expect("Failed to write dump");
    file.flush().expect("Failed to flush dump");
    file
}

/// Generates a dump with `count` records and a repeated field in every
/// third record.
#[allow(dead_code)]
pub fn synthetic_dump(count: usize) -> String {
    let mut dump = String::new();
    for i in 0..count {
        dump.push_str(&format!("SET: S4 [1] TRF: {i} PPN {i:09} RELEVANCE\n"));
        dump.push_str(&format!("003@ ƒ0{i:09}\n"));
        dump.push_str(&format!("021A ƒaTitle {i} ƒhSubtitle\n"));
        if i % 3 == 0 {
            dump.push_str("044K ƒaFirst\n044K ƒaSecond\n");
        }
    }
    dump
}
