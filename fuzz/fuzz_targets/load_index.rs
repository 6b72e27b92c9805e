#![no_main]

use libfuzzer_sys::fuzz_target;
use pica_parse::OffsetIndex;

fuzz_target!(|data: &[u8]| {
    if let Ok(index) = OffsetIndex::read_from(data) {
        let mut written = Vec::new();
        index.write_to(&mut written).unwrap();
        let reloaded = OffsetIndex::read_from(written.as_slice()).unwrap();
        assert_eq!(reloaded.len(), index.len());
    }
});
