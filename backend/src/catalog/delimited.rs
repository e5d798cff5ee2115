//! Delimiter detection and row splitting for uploaded CSV files.
//!
//! Two dialects are understood. Comma files get quote-aware splitting with `""` escapes.
//! Semicolon files (European spreadsheet exports) are split on every semicolon and each cell
//! trimmed; quoted semicolons inside a cell are not supported there.

use common::model::csv::Delimiter;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("CSV file must have at least a header row and one data row")]
    TooFewLines,
    #[error("CSV file is not valid UTF-8")]
    NotUtf8,
    #[error("CSV header '{0}' appears more than once")]
    DuplicateHeader(String),
}

/// Picks the delimiter from the first line only: semicolon when it strictly outnumbers commas.
pub fn detect_delimiter(text: &str) -> Delimiter {
    let first_line = text.split('\n').next().unwrap_or("");
    let commas = first_line.matches(',').count();
    let semicolons = first_line.matches(';').count();
    if semicolons > commas {
        Delimiter::Semicolon
    } else {
        Delimiter::Comma
    }
}

/// Splits on `\r?\n` and drops empty lines.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split_inclusive('\n')
        .map(|piece| match piece.strip_suffix('\n') {
            Some(line) => line.strip_suffix('\r').unwrap_or(line),
            None => piece,
        })
        .filter(|line| !line.is_empty())
        .collect()
}

pub fn parse_row(line: &str, delimiter: Delimiter) -> Vec<String> {
    match delimiter {
        Delimiter::Comma => split_quoted(line).into_iter().map(unquote).collect(),
        Delimiter::Semicolon => line.split(';').map(|cell| cell.trim().to_string()).collect(),
    }
}

/// Splits on commas followed by an even number of quotes up to the end of the line.
fn split_quoted(line: &str) -> Vec<&str> {
    let total_quotes = line.matches('"').count();
    let mut seen = 0;
    let mut start = 0;
    let mut cells = Vec::new();
    for (idx, ch) in line.char_indices() {
        match ch {
            '"' => seen += 1,
            ',' if (total_quotes - seen) % 2 == 0 => {
                cells.push(&line[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    cells.push(&line[start..]);
    cells
}

/// Drops one leading and one trailing quote, then decodes `""`.
fn unquote(cell: &str) -> String {
    let cell = cell.strip_prefix('"').unwrap_or(cell);
    let cell = cell.strip_suffix('"').unwrap_or(cell);
    cell.replace("\"\"", "\"")
}

/// Written by spreadsheet tools at the start of UTF-8 exports.
const BYTE_ORDER_MARK: char = '\u{feff}';

/// A parsed upload: header names plus the raw text the data rows are read from.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceTable {
    pub source_text: String,
    pub delimiter: Delimiter,
    pub headers: Vec<String>,
    pub total_rows: usize,
}

impl SourceTable {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, SourceError> {
        let text = String::from_utf8(bytes).map_err(|_| SourceError::NotUtf8)?;
        SourceTable::parse(text)
    }

    pub fn parse(mut source_text: String) -> Result<Self, SourceError> {
        if source_text.starts_with(BYTE_ORDER_MARK) {
            source_text.drain(..BYTE_ORDER_MARK.len_utf8());
        }
        let lines = split_lines(&source_text);
        if lines.len() < 2 {
            return Err(SourceError::TooFewLines);
        }
        let delimiter = detect_delimiter(&source_text);
        let headers: Vec<String> = parse_row(lines[0], delimiter)
            .into_iter()
            .map(|cell| cell.trim().to_string())
            .collect();

        let mut seen = HashSet::new();
        if let Some(dup) = headers.iter().find(|h| !seen.insert(h.as_str())) {
            return Err(SourceError::DuplicateHeader(dup.clone()));
        }

        let total_rows = lines.len() - 1;
        Ok(SourceTable {
            source_text,
            delimiter,
            headers,
            total_rows,
        })
    }

    /// The first `limit` data rows, parsed but not padded.
    pub fn preview_rows(&self, limit: usize) -> Vec<Vec<String>> {
        split_lines(&self.source_text)
            .into_iter()
            .skip(1)
            .take(limit)
            .map(|line| parse_row(line, self.delimiter))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiter_depends_on_first_line_only() {
        let text = "a;b;c\n1,2,3,4,5\n";
        assert_eq!(detect_delimiter(text), Delimiter::Semicolon);
        let changed = "a;b;c\nx;y\n,,,,,,,,";
        assert_eq!(detect_delimiter(changed), Delimiter::Semicolon);
    }

    #[test]
    fn ties_and_plain_headers_fall_back_to_comma() {
        assert_eq!(detect_delimiter("a,b;c\n"), Delimiter::Comma);
        assert_eq!(detect_delimiter("single\nvalue"), Delimiter::Comma);
        assert_eq!(detect_delimiter(""), Delimiter::Comma);
    }

    #[test]
    fn quoted_commas_stay_inside_their_cell() {
        let cells = parse_row(r#"1,"Ram's head, gilded",Statue"#, Delimiter::Comma);
        assert_eq!(cells, vec!["1", "Ram's head, gilded", "Statue"]);
    }

    #[test]
    fn doubled_quotes_decode_to_one() {
        let cells = parse_row(r#""He said ""hi""",x"#, Delimiter::Comma);
        assert_eq!(cells, vec![r#"He said "hi""#, "x"]);
    }

    #[test]
    fn comma_cells_are_not_trimmed() {
        assert_eq!(parse_row(" a , b", Delimiter::Comma), vec![" a ", " b"]);
        assert_eq!(parse_row("a,,", Delimiter::Comma), vec!["a", "", ""]);
    }

    #[test]
    fn semicolon_mode_trims_and_ignores_quotes() {
        assert_eq!(
            parse_row(r#" x ; "y;z" ;w"#, Delimiter::Semicolon),
            vec!["x", "\"y", "z\"", "w"]
        );
    }

    #[test]
    fn empty_lines_are_dropped() {
        assert_eq!(split_lines("h\r\n\r\na\n\nb\r\n"), vec!["h", "a", "b"]);
    }

    #[test]
    fn semicolon_headers_are_split_and_trimmed() {
        let table = SourceTable::parse("A; B ;C\nX;Y;Z".to_string()).unwrap();
        assert_eq!(table.delimiter, Delimiter::Semicolon);
        assert_eq!(table.headers, vec!["A", "B", "C"]);
        assert_eq!(table.total_rows, 1);
        assert_eq!(table.preview_rows(5), vec![vec!["X", "Y", "Z"]]);
    }

    #[test]
    fn header_only_files_are_rejected() {
        assert_eq!(
            SourceTable::parse("No,Name\n\n".to_string()),
            Err(SourceError::TooFewLines)
        );
        assert_eq!(
            SourceTable::from_bytes(vec![0xff, 0xfe, b'\n', b'a']),
            Err(SourceError::NotUtf8)
        );
    }

    #[test]
    fn a_leading_byte_order_mark_is_dropped() {
        let table = SourceTable::from_bytes(b"\xEF\xBB\xBFNo,Name\n1,Ram".to_vec()).unwrap();
        assert_eq!(table.headers, vec!["No", "Name"]);
        assert_eq!(table.delimiter, Delimiter::Comma);
        assert!(table.source_text.starts_with("No,Name"));
    }

    #[test]
    fn duplicate_headers_are_rejected() {
        assert_eq!(
            SourceTable::parse("Name,Type,Name\n1,2,3".to_string()),
            Err(SourceError::DuplicateHeader("Name".to_string()))
        );
    }

    #[test]
    fn preview_is_limited() {
        let text = (0..10).fold("H\n".to_string(), |acc, i| format!("{}{}\n", acc, i));
        let table = SourceTable::parse(text).unwrap();
        assert_eq!(table.total_rows, 10);
        assert_eq!(table.preview_rows(5).len(), 5);
    }
}
