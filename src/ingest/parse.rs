use std::str::FromStr;

use thiserror::Error;

use crate::model::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Tsv,
    Csv,
    Json,
    Other,
}

impl DataFormat {
    fn delimiter(&self) -> Option<char> {
        match self {
            DataFormat::Tsv => Some('\t'),
            DataFormat::Csv => Some(','),
            DataFormat::Json | DataFormat::Other => None,
        }
    }
}

impl FromStr for DataFormat {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tsv" => Ok(DataFormat::Tsv),
            "csv" => Ok(DataFormat::Csv),
            "json" => Ok(DataFormat::Json),
            "other" => Ok(DataFormat::Other),
            other => Err(ParseError::UnknownFormat(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unable to process data format '{0}' (valid: tsv, csv, json, other)")]
    UnknownFormat(String),
    #[error("data format 'other' requires an explicit delimiter")]
    MissingDelimiter,
    #[error("invalid JSON record on line {line}: {source}")]
    JsonLine {
        line: usize,
        source: serde_json::Error,
    },
    #[error("JSON record on line {line} is not an object")]
    JsonNotObject { line: usize },
}

/// Result of parsing one source file. `skipped_lines` counts lines the
/// delimited parser could not turn into records; the line totals are
/// diagnostic only and never feed the aggregation.
#[derive(Debug, Clone, Default)]
pub struct ParsedFile {
    pub header: Option<Vec<String>>,
    pub records: Vec<Record>,
    pub total_lines: usize,
    pub skipped_lines: usize,
}

/// Parse raw file content into field-keyed records.
///
/// Delimited formats treat the first delimiter-bearing line as the
/// header and zip every later delimiter-bearing line against it
/// positionally: short rows drop their trailing header keys, long rows
/// drop their extra fields. `json` parses each non-empty line as one
/// standalone object and fails the whole file on the first bad line.
pub fn parse_records(
    file_data: &str,
    format: DataFormat,
    custom_delimiter: Option<char>,
) -> Result<ParsedFile, ParseError> {
    let mut parsed = ParsedFile::default();
    parsed.total_lines = file_data.split('\n').count();

    match format {
        DataFormat::Json => parse_json_lines(file_data, &mut parsed)?,
        DataFormat::Tsv | DataFormat::Csv | DataFormat::Other => {
            let delimiter = match format.delimiter().or(custom_delimiter) {
                Some(d) => d,
                None => return Err(ParseError::MissingDelimiter),
            };
            parse_delimited(file_data, delimiter, &mut parsed);
        }
    }

    tracing::debug!(
        "{} lines in file, {} processed",
        parsed.total_lines,
        parsed.records.len()
    );
    Ok(parsed)
}

fn parse_json_lines(file_data: &str, parsed: &mut ParsedFile) -> Result<(), ParseError> {
    for (idx, line) in file_data.split('\n').enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let value: serde_json::Value =
            serde_json::from_str(line).map_err(|source| ParseError::JsonLine {
                line: idx + 1,
                source,
            })?;
        let object = value
            .as_object()
            .ok_or(ParseError::JsonNotObject { line: idx + 1 })?;
        let mut record = Record::new();
        for (key, value) in object {
            let rendered = match value.as_str() {
                Some(s) => s.to_string(),
                None => value.to_string(),
            };
            record.insert(key.clone(), rendered);
        }
        parsed.records.push(record);
    }
    Ok(())
}

fn parse_delimited(file_data: &str, delimiter: char, parsed: &mut ParsedFile) {
    for line in file_data.split('\n') {
        if !line.contains(delimiter) {
            parsed.skipped_lines += 1;
            continue;
        }
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(delimiter).collect();
        match &parsed.header {
            None => {
                parsed.header = Some(fields.iter().map(|f| f.to_string()).collect());
            }
            Some(header) => {
                let record: Record = header
                    .iter()
                    .zip(fields)
                    .map(|(key, value)| (key.clone(), value.to_string()))
                    .collect();
                parsed.records.push(record);
            }
        }
    }
}
