//! Record loader
//!
//! Reads newline-delimited JSON records `{domain, title, text}`.
//! Malformed lines are skipped and counted rather than aborting the run.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::Deserialize;

use kgraph_core::{Record, Result, UNKNOWN};

/// Loader settings
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Keep records whose text is longer than this many characters
    pub min_text_length: usize,
    /// Stop after reading this many lines
    pub max_records: Option<usize>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            min_text_length: 100,
            max_records: None,
        }
    }
}

/// Records read from an input stream and what was skipped
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub records: Vec<Record>,
    /// Non-empty lines read
    pub lines_read: usize,
    /// Lines that were not valid UTF-8 JSON objects
    pub malformed: usize,
    /// Objects without a text field
    pub missing_text: usize,
    /// Records whose text was too short
    pub too_short: usize,
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    domain: Option<String>,
    title: Option<String>,
    text: Option<String>,
}

/// Load records from a JSONL file
pub fn load_records(path: impl AsRef<Path>, options: &LoadOptions) -> Result<LoadReport> {
    let file = File::open(path.as_ref())?;
    read_records(BufReader::new(file), options)
}

/// Load records from any buffered reader
pub fn read_records(reader: impl BufRead, options: &LoadOptions) -> Result<LoadReport> {
    let mut report = LoadReport::default();

    // the cap counts every raw line, blank ones included
    for (i, bytes) in reader.split(b'\n').enumerate() {
        if options.max_records.is_some_and(|max| i >= max) {
            break;
        }

        let bytes = bytes?;
        let line = match std::str::from_utf8(&bytes) {
            Ok(line) => line.trim(),
            Err(e) => {
                tracing::debug!("Skipping non UTF-8 line {}: {}", i + 1, e);
                report.lines_read += 1;
                report.malformed += 1;
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }
        report.lines_read += 1;

        let raw: RawRecord = match serde_json::from_str(line) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::debug!("Skipping malformed line {}: {}", i + 1, e);
                report.malformed += 1;
                continue;
            }
        };

        let Some(text) = raw.text else {
            report.missing_text += 1;
            continue;
        };

        if text.chars().count() <= options.min_text_length {
            report.too_short += 1;
            continue;
        }

        report.records.push(Record {
            domain: raw.domain.unwrap_or_else(|| UNKNOWN.to_string()),
            title: raw.title.unwrap_or_else(|| UNKNOWN.to_string()),
            text,
        });
    }

    Ok(report)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    fn long_text(word: &str) -> String {
        format!("{word} ").repeat(60)
    }

    #[test]
    fn test_read_records_skips_and_counts() {
        let input = format!(
            "{}\nnot json\n{}\n\n{}\n{}\n",
            serde_json::json!({"domain": "Tech", "title": "Apple", "text": long_text("apple")}),
            serde_json::json!({"title": "Short", "text": "too short"}),
            serde_json::json!({"domain": "Tech", "title": "No text"}),
            serde_json::json!({"domain": null, "text": long_text("ibm")}),
        );

        let report = read_records(Cursor::new(input), &LoadOptions::default()).unwrap();

        assert_eq!(report.lines_read, 5);
        assert_eq!(report.malformed, 1);
        assert_eq!(report.too_short, 1);
        assert_eq!(report.missing_text, 1);
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.records[0].domain, "Tech");
        assert_eq!(report.records[1].domain, UNKNOWN);
        assert_eq!(report.records[1].title, UNKNOWN);
    }

    #[test]
    fn test_max_records_counts_raw_lines() {
        let line = serde_json::json!({"text": long_text("x")}).to_string();
        let input = format!("garbage\n{line}\n{line}\n{line}\n");

        let options = LoadOptions {
            max_records: Some(2),
            ..Default::default()
        };
        let report = read_records(Cursor::new(input), &options).unwrap();

        assert_eq!(report.malformed, 1);
        assert_eq!(report.records.len(), 1);
    }

    #[test]
    fn test_invalid_utf8_line_is_skipped() {
        let line = serde_json::json!({"title": "Ok", "text": long_text("ok")}).to_string();
        let mut input = Vec::new();
        input.extend_from_slice(line.as_bytes());
        input.extend_from_slice(b"\n{\"text\":\"\xff\xfe bad\"}\n");
        input.extend_from_slice(line.as_bytes());
        input.push(b'\n');

        let report = read_records(Cursor::new(input), &LoadOptions::default()).unwrap();

        assert_eq!(report.records.len(), 2);
        assert_eq!(report.malformed, 1);
        assert_eq!(report.lines_read, 3);
    }

    #[test]
    fn test_blank_lines_count_toward_cap() {
        let line = serde_json::json!({"text": long_text("x")}).to_string();
        let input = format!("\n\n{line}\n{line}\n");

        let options = LoadOptions {
            max_records: Some(3),
            ..Default::default()
        };
        let report = read_records(Cursor::new(input), &options).unwrap();

        assert_eq!(report.lines_read, 1);
        assert_eq!(report.records.len(), 1);
    }

    #[test]
    fn test_min_length_is_exclusive() {
        let options = LoadOptions {
            min_text_length: 5,
            max_records: None,
        };
        let input = "{\"text\":\"12345\"}\n{\"text\":\"123456\"}\n";
        let report = read_records(Cursor::new(input), &options).unwrap();
        assert_eq!(report.too_short, 1);
        assert_eq!(report.records.len(), 1);
    }

    #[test]
    fn test_load_records_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "{}",
            serde_json::json!({"domain": "History", "title": "Rome", "text": long_text("rome")})
        )
        .unwrap();

        let report = load_records(file.path(), &LoadOptions::default()).unwrap();
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].title, "Rome");
    }

    #[test]
    fn test_load_records_missing_file() {
        assert!(load_records("/nonexistent/records.jsonl", &LoadOptions::default()).is_err());
    }
}
