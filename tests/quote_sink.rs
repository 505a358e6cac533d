// tests/quote_sink.rs
use chrono::{TimeZone, Utc};
use stockmine::ingest::providers::quote::{parse_chart, QUOTE_FIELDS};
use stockmine::sink::{output_file_name, CsvSink};

const BODY: &str = r#"{"chart":{"result":[{"meta":{"symbol":"AAPL"},
    "indicators":{"quote":[{"close":[189.5,190.25],"low":[188.0,189.75],
    "high":[190.0,191.0],"volume":[10,42]}]}}],"error":null}}"#;

#[test]
fn quotes_share_one_header() {
    let tmp = tempfile::tempdir().unwrap();
    let started = Utc.with_ymd_and_hms(2024, 6, 7, 8, 9, 10).unwrap();
    let sink = CsvSink::at_start(tmp.path(), &started);
    assert_eq!(
        sink.path().file_name().and_then(|n| n.to_str()),
        Some(output_file_name(&started).as_str())
    );
    assert!(sink.path().ends_with("stockmine_20240607-080910.csv"));

    let q = parse_chart(BODY, started).unwrap();
    sink.write_record(&QUOTE_FIELDS, &q.values()).unwrap();
    sink.write_record(&QUOTE_FIELDS, &q.values()).unwrap();

    let content = std::fs::read_to_string(sink.path()).unwrap();
    assert_eq!(
        content,
        "symbol,date,last price,low,high,volume\n\
         AAPL,2024-06-07T08:09:10,190.25,189.75,191,42\n\
         AAPL,2024-06-07T08:09:10,190.25,189.75,191,42\n"
    );
}
