#![no_main]

use libfuzzer_sys::fuzz_target;
use pica_parse::boundary_scanner::RecordBoundaryScanner;
use pica_parse::tsv::TsvWriter;
use pica_parse::PicaReader;

fuzz_target!(|data: &[u8]| {
    let mut writer = TsvWriter::new(Vec::new(), ["021A", "028A"]).with_join("; ");
    for record in PicaReader::new(data).map_while(Result::ok) {
        for field in &record {
            let _ = field.subfields();
        }
        let _ = record.to_json();
        let _ = writer.write_record(&record);
    }

    let _ = RecordBoundaryScanner::new().scan(data);
});
