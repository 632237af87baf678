//! Import helpers: CSV files into sheet grids, plain text into template bodies.
//!
//! CSV input is decoded with encoding and delimiter auto-detection, then read
//! as a grid of display values with the header row first, the same shape a
//! [`crate::store::SheetStore`] returns.

use std::path::Path;

use crate::error::{CsvError, CsvResult};
use crate::models::{Body, Element};

/// A parsed CSV grid plus what was detected.
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Header row followed by data rows
    pub values: Vec<Vec<String>>,
    /// Detected encoding
    pub encoding: String,
    /// Detected delimiter
    pub delimiter: char,
}

impl ParseResult {
    pub fn headers(&self) -> &[String] {
        self.values.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of data rows (header excluded).
    pub fn row_count(&self) -> usize {
        self.values.len().saturating_sub(1)
    }
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let charset = chardet::detect(bytes).0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        "shift_jis" | "sjis" | "cp932" => "shift_jis".to_string(),
        _ => charset,
    }
}

/// Decode bytes to text. Unknown encodings fall back to lossy UTF-8.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15.decode(bytes).0.into_owned(),
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        "shift_jis" => encoding_rs::SHIFT_JIS.decode(bytes).0.into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse CSV text into a grid with an explicit delimiter.
///
/// Quoted fields may contain delimiters and newlines. Blank lines are
/// skipped; rows keep their own width.
pub fn parse_grid(content: &str, delimiter: char) -> CsvResult<Vec<Vec<String>>> {
    let delimiter = u8::try_from(delimiter).map_err(|_| CsvError::ParseError {
        line: 0,
        message: format!("Unsupported delimiter '{}'", delimiter),
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut values = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| CsvError::ParseError {
            line: e.position().map_or(0, |p| p.line() as usize),
            message: e.to_string(),
        })?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        values.push(record.iter().map(|cell| cell.trim().to_string()).collect());
    }

    if values.is_empty() {
        return Err(CsvError::EmptyFile);
    }
    Ok(values)
}

/// Parse CSV bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> CsvResult<ParseResult> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = detect_delimiter(&content);
    let values = parse_grid(&content, delimiter)?;

    Ok(ParseResult {
        values,
        encoding,
        delimiter,
    })
}

/// Parse a CSV file with auto-detection of encoding and delimiter.
pub fn parse_csv_file_auto<P: AsRef<Path>>(path: P) -> CsvResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes_auto(&bytes)
}

/// Build a template body from plain text.
///
/// Each line becomes a paragraph. Lines starting with `- ` or `* ` become
/// list items (two leading spaces per nesting level). Consecutive lines
/// containing `|` form one table, one row per line.
pub fn text_to_body(text: &str) -> Body {
    let mut children: Vec<Element> = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim_start();
        if line.contains('|') {
            let cells: Vec<String> = line
                .trim()
                .trim_matches('|')
                .split('|')
                .map(|c| c.trim().to_string())
                .collect();
            if let Some(Element::Table { rows }) = children.last_mut() {
                rows.push(cells);
            } else {
                children.push(Element::Table { rows: vec![cells] });
            }
        } else if let Some(item) = trimmed.strip_prefix("- ").or_else(|| trimmed.strip_prefix("* ")) {
            let depth = (line.len() - trimmed.len()) / 2;
            children.push(Element::ListItem {
                text: item.to_string(),
                nesting_level: u8::try_from(depth).unwrap_or(u8::MAX),
            });
        } else {
            children.push(Element::paragraph(line));
        }
    }
    Body::with_children(children)
}
