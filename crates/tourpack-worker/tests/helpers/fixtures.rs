//! ZIP and trigger fixtures.

use serde_json::{json, Value};
use std::io::{Cursor, Write};
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

/// Build a ZIP in memory. Names ending in `/` become directory entries.
pub fn zip_bytes(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut buffer = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, data) in files {
            if name.ends_with('/') {
                zip.add_directory(*name, options).unwrap();
            } else {
                zip.start_file(*name, options).unwrap();
                zip.write_all(data).unwrap();
            }
        }
        zip.finish().unwrap();
    }
    buffer
}

/// A small but complete tour
pub fn tour_zip() -> Vec<u8> {
    zip_bytes(&[
        ("tour/", b""),
        ("tour/index.html", b"<html><body>tour</body></html>"),
        ("tour/css/style.css", b"body { margin: 0 }"),
        ("tour/data/tour.json", br#"{"scenes": 3}"#),
        ("tour/.DS_Store", b"junk"),
    ])
}

/// One storage upload record
pub fn record(bucket: &str, key: &str, size: usize) -> Value {
    json!({
        "eventSource": "aws:s3",
        "s3": {
            "bucket": {"name": bucket},
            "object": {"key": key, "size": size}
        }
    })
}

pub fn trigger(records: Vec<Value>) -> Value {
    json!({ "Records": records })
}
