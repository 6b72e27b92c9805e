//! Integration tests for the pica-parse library

mod common;

use std::fs::File;
use std::io::{BufRead, BufReader, Cursor, Write};

use common::{synthetic_dump, write_dump, SAMPLE_DUMP, SAMPLE_KEYS, WORKED_EXAMPLE};
use pica_parse::reader::{open_dump, read_maps, read_records};
use pica_parse::tsv::TsvWriter;
use pica_parse::{IndexedReader, OffsetIndex, PicaConfig, PicaError, PicaReader, Record};
use regex::Regex;

fn sample_records() -> Vec<Record> {
    let file = File::open(SAMPLE_DUMP).expect("Could not open sample dump");
    read_records(BufReader::new(file))
        .collect::<Result<_, _>>()
        .expect("Failed to read sample dump")
}

#[test]
fn test_read_sample_dump() {
    let records = sample_records();
    let keys: Vec<&str> = records.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(keys, SAMPLE_KEYS);

    let first = &records[0];
    assert_eq!(first.len(), 7);
    assert_eq!(
        first.get_subfield("021A", 'a').unwrap(),
        Some("Die Blechtrommel ")
    );
    assert_eq!(first.get_subfield("028A", 'a').unwrap(), Some("Grass"));
    assert_eq!(first.get_field("010@").unwrap(), None);
}

#[test]
fn test_repeated_field_requires_get_all() {
    let records = sample_records();
    let first = &records[0];

    match first.get_field("044K") {
        Err(PicaError::MultipleValues { key, values }) => {
            assert_eq!(key, "044K");
            assert_eq!(values, vec!["ƒaRoman", "ƒaDanzig"]);
        },
        other => panic!("Expected MultipleValues, got {other:?}"),
    }

    let subjects: Vec<&str> = first
        .get_all("044K")
        .unwrap()
        .iter()
        .map(|field| field.get('a').unwrap().unwrap())
        .collect();
    assert_eq!(subjects, vec!["Roman", "Danzig"]);
}

#[test]
fn test_worked_example() {
    let records: Vec<Record> = PicaReader::new(Cursor::new(WORKED_EXAMPLE))
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(records.len(), 2);

    let first = &records[0];
    assert_eq!(first.key, "000000001");
    let titles = first.get_all("021A").unwrap();
    assert_eq!(titles.len(), 2);
    assert_eq!(titles[0].get('a').unwrap(), Some("value1"));
    assert_eq!(titles[1].get('b').unwrap(), Some("value2"));
    assert!(matches!(
        first.get_field("021A"),
        Err(PicaError::MultipleValues { .. })
    ));

    assert_eq!(records[1].get_subfield("021A", 'a').unwrap(), Some("value3"));
}

#[test]
fn test_index_matches_full_scan() {
    let index = OffsetIndex::build(SAMPLE_DUMP).unwrap();
    assert_eq!(index.keys().collect::<Vec<_>>(), SAMPLE_KEYS);

    let mut reader = IndexedReader::open(index).unwrap();
    for record in sample_records() {
        let fetched = reader.fetch(&record.key).unwrap();
        assert_eq!(fetched, record, "Mismatch for {}", record.key);
    }
}

#[test]
fn test_index_offsets_follow_marker_lines() {
    let dump = write_dump(WORKED_EXAMPLE);
    let index = OffsetIndex::build(dump.path()).unwrap();

    assert_eq!(index.get("000000001"), Some(27));
    let second = index.get("000000002").unwrap() as usize;
    assert!(WORKED_EXAMPLE[second..].starts_with("021A ƒavalue3"));
}

#[test]
fn test_in_memory_index_agrees_with_file_index() {
    let built = OffsetIndex::build(SAMPLE_DUMP).unwrap();
    let bytes = std::fs::read(SAMPLE_DUMP).unwrap();
    let scanned =
        OffsetIndex::from_bytes(built.path(), &bytes, &PicaConfig::default()).unwrap();
    assert_eq!(scanned, built);
}

#[test]
fn test_duplicate_key_last_wins() {
    let dump = write_dump(
        "SET: a b c d e 1 f\n021A ƒafirst\n\
         SET: a b c d e 2 f\n021A ƒaother\n\
         SET: a b c d e 1 f\n021A ƒasecond\n",
    );
    let index = OffsetIndex::build(dump.path()).unwrap();
    assert_eq!(index.len(), 2);
    assert_eq!(index.keys().collect::<Vec<_>>(), vec!["1", "2"]);

    let mut reader = IndexedReader::open(index).unwrap();
    let record = reader.fetch("1").unwrap();
    assert_eq!(record.get_subfield("021A", 'a').unwrap(), Some("second"));
}

#[test]
fn test_persisted_index_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let table = dir.path().join("sample.idx");

    let built = OffsetIndex::build(SAMPLE_DUMP).unwrap();
    built.persist(&table).unwrap();

    let mut lines = BufReader::new(File::open(&table).unwrap()).lines();
    let header = lines.next().unwrap().unwrap();
    assert!(std::path::Path::new(&header).is_absolute());
    let first_row = lines.next().unwrap().unwrap();
    assert!(first_row.starts_with("000000001\t"));

    let loaded = OffsetIndex::load(&table).unwrap();
    assert_eq!(loaded, built);

    let mut reader = IndexedReader::open(loaded).unwrap();
    assert_eq!(
        reader.fetch("000000003").unwrap().get_subfield("021A", 'a').unwrap(),
        Some("Hundejahre")
    );
}

#[test]
fn test_corrupt_index_table() {
    let mut table = tempfile::NamedTempFile::new().unwrap();
    writeln!(table, "/data/catalog.pp").unwrap();
    writeln!(table, "000000001\t27").unwrap();
    writeln!(table, "000000002 not-an-offset").unwrap();
    table.flush().unwrap();

    match OffsetIndex::load(table.path()) {
        Err(PicaError::CorruptIndex(message)) => assert!(message.contains("line 3")),
        other => panic!("Expected CorruptIndex, got {other:?}"),
    }
}

#[test]
fn test_tsv_export_example() {
    let mut writer = TsvWriter::new(Vec::new(), ["PPN", "021A"]).with_join("; ");
    writer.write_header().unwrap();
    let records = writer
        .write_all(read_maps(Cursor::new(WORKED_EXAMPLE)))
        .unwrap();
    assert_eq!(records, 2);

    let output = String::from_utf8(writer.into_inner().unwrap()).unwrap();
    let rows: Vec<&str> = output.lines().collect();
    assert_eq!(rows[1], "000000001\tƒavalue1; ƒbvalue2");
}

#[test]
fn test_gzip_dump_streams_like_plain() {
    use flate2::write::GzEncoder;
    use flate2::Compression;

    let plain = std::fs::read(SAMPLE_DUMP).unwrap();
    let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
    encoder.write_all(&plain).unwrap();
    let mut compressed = tempfile::NamedTempFile::new().unwrap();
    compressed.write_all(&encoder.finish().unwrap()).unwrap();
    compressed.flush().unwrap();

    let records: Vec<Record> = read_records(open_dump(compressed.path()).unwrap())
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(records, sample_records());
}

#[test]
fn test_triples_round_trip() {
    for record in sample_records() {
        let rows: Vec<(String, String, String)> = record
            .to_triples()
            .map(|(k, t, b)| (k.to_string(), t.to_string(), b.to_string()))
            .collect();
        let rebuilt = Record::from_raw_triples(&record.key, record.separator, rows).unwrap();
        assert_eq!(rebuilt, record);
    }
}

#[test]
fn test_triples_reject_foreign_key() {
    let rows = vec![("1", "021A", "ƒax"), ("2", "021A", "ƒay")];
    assert!(matches!(
        Record::from_raw_triples("1", 'ƒ', rows),
        Err(PicaError::InvalidRecord(_))
    ));
}

#[test]
fn test_fields_matching_tag() {
    let records = sample_records();
    let persons = Regex::new("^028").unwrap();
    let names: Vec<&str> = records[3]
        .fields_matching_tag(&persons)
        .map(|field| field.get('a').unwrap().unwrap())
        .collect();
    assert_eq!(names, vec!["Grass", "Richter"]);
}

#[test]
fn test_record_json() {
    let records = sample_records();
    let json: serde_json::Value =
        serde_json::from_str(&records[1].to_json_pretty().unwrap()).unwrap();
    assert_eq!(json["key"], "000000002");
    assert_eq!(json["fields"]["033A"][0]["p"][0], "Neuwied ");

    let raw: Record = serde_json::from_str(&records[1].to_json().unwrap()).unwrap();
    assert_eq!(raw, records[1]);
}

#[test]
fn test_large_synthetic_dump() {
    let dump = write_dump(&synthetic_dump(500));
    let index = OffsetIndex::build(dump.path()).unwrap();
    assert_eq!(index.len(), 500);

    let mut reader = IndexedReader::open(index).unwrap();
    let record = reader.fetch("000000300").unwrap();
    assert_eq!(record.get_all("044K").unwrap().len(), 2);
    let record = reader.fetch("000000301").unwrap();
    assert!(record.get_all("044K").is_err());
}
