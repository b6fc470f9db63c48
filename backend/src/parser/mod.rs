//! CSV table parsing for roster uploads.
//!
//! Turns raw spreadsheet text into a header row plus typed [`ImportRow`]s.
//! The templates shipped to operators carry leading `#` instruction lines,
//! so the parser strips comment and blank lines before anything else.
//!
//! Splitting honors double-quoted fields: a quote toggles in-quotes state, a
//! delimiter inside quotes is part of the value, and quote characters are
//! stripped from the output. There is no escaped-quote support.
//!
//! A data row whose field count does not match the header is dropped rather
//! than failing the upload. Deliberate: operators paste half-deleted example
//! lines more often than they truncate real records, and a single stray line
//! must not block a 300-row roster.
//!
//! For operator files (CLI input) the module also auto-detects the character
//! encoding and the delimiter, since exports from spreadsheet tools arrive in
//! anything from UTF-8 to Windows-1252.

use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

/// Default delimiter for request-path CSV text (the shipped templates).
pub const DEFAULT_DELIMITER: char = ',';

/// One data row: column name -> trimmed value, plus its position in the file.
///
/// Row numbers are 1-based over the surviving (non-comment, non-blank) lines;
/// the header is row 1, so the first data row is row 2.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRow {
    row_number: usize,
    values: HashMap<String, String>,
}

impl ImportRow {
    pub fn new(row_number: usize, headers: &[String], fields: Vec<String>) -> Self {
        let values = headers.iter().cloned().zip(fields).collect();
        Self { row_number, values }
    }

    pub fn row_number(&self) -> usize {
        self.row_number
    }

    /// The trimmed value for a column, or `""` when the column is absent.
    pub fn get(&self, column: &str) -> &str {
        self.values.get(column).map(String::as_str).unwrap_or("")
    }

    /// True when the column is present with a non-empty value.
    pub fn has(&self, column: &str) -> bool {
        !self.get(column).is_empty()
    }
}

/// A parsed upload: headers plus data rows.
#[derive(Debug, Clone, Default)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<ImportRow>,
}

impl CsvTable {
    /// True when the upload carried no data rows. Callers treat this as
    /// "no data" (a bad request), distinct from a parse failure.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Parse CSV text into a table.
///
/// Blank lines and lines whose trimmed form starts with `#` are dropped
/// before parsing. With fewer than two surviving lines the result has empty
/// `rows` (and, when a header line exists, its parsed `headers`).
pub fn parse_table(text: &str, delimiter: char) -> CsvTable {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect();

    let Some(&header_line) = lines.first() else {
        return CsvTable::default();
    };
    let headers = split_fields(header_line, delimiter);

    let mut rows = Vec::new();
    for (i, line) in lines.iter().skip(1).copied().enumerate() {
        let fields = split_fields(line, delimiter);
        // Mismatched rows are dropped; the row number still advances.
        if fields.len() != headers.len() {
            continue;
        }
        rows.push(ImportRow::new(i + 2, &headers, fields));
    }

    CsvTable { headers, rows }
}

/// Split one line on the delimiter, honoring double-quoted fields.
pub fn split_fields(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in line.chars() {
        if ch == '"' {
            in_quotes = !in_quotes;
        } else if ch == delimiter && !in_quotes {
            fields.push(current.trim().to_string());
            current.clear();
        } else {
            current.push(ch);
        }
    }
    fields.push(current.trim().to_string());

    fields
}

// =============================================================================
// File input (CLI path): encoding and delimiter auto-detection
// =============================================================================

/// A parsed operator file with the detection metadata.
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub table: CsvTable,
    pub encoding: String,
    pub delimiter: char,
}

/// Decode raw bytes, detecting the charset with chardet.
///
/// Returns the decoded text and the normalized encoding name. Unknown
/// charsets fall back to lossy UTF-8.
pub fn decode_bytes(bytes: &[u8]) -> (String, String) {
    let charset = chardet::detect(bytes).0;
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => (
            String::from_utf8_lossy(bytes).into_owned(),
            "utf-8".to_string(),
        ),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => (
            encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
            "iso-8859-1".to_string(),
        ),
        "windows-1252" | "cp1252" => (
            encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
            "windows-1252".to_string(),
        ),
        other => (String::from_utf8_lossy(bytes).into_owned(), other.to_string()),
    }
}

/// Detect the delimiter by counting candidates in the first surviving line.
pub fn detect_delimiter(text: &str) -> char {
    let first_line = text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
        .unwrap_or("");

    let mut best = DEFAULT_DELIMITER;
    let mut best_count = 0;
    for sep in [',', ';', '\t', '|'] {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best = sep;
        }
    }
    best
}

/// Parse raw file bytes with encoding and delimiter auto-detection.
pub fn parse_bytes_auto(bytes: &[u8]) -> ParsedFile {
    let (text, encoding) = decode_bytes(bytes);
    let delimiter = detect_delimiter(&text);
    ParsedFile {
        table: parse_table(&text, delimiter),
        encoding,
        delimiter,
    }
}

/// Parse a CSV file from disk with auto-detection.
pub fn parse_file_auto<P: AsRef<Path>>(path: P) -> std::io::Result<ParsedFile> {
    let bytes = std::fs::read(path)?;
    Ok(parse_bytes_auto(&bytes))
}
