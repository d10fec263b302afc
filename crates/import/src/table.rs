//! Tabular input readers.
//!
//! CSV, spreadsheet and JSON files are all read into the same [`Table`]: a header list and
//! rows of trimmed string cells. Header lookup is case-insensitive; a missing cell reads as
//! the empty string.

use crate::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Data, Reader};
use chrono::Timelike;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Input formats recognised by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Spreadsheet,
    Json,
}

impl TableFormat {
    /// Picks the format from the file extension.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::UnsupportedFormat`] for any other extension.
    pub fn from_path(path: &Path) -> ImportResult<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match extension.as_str() {
            "csv" => Ok(TableFormat::Csv),
            "xlsx" | "xls" => Ok(TableFormat::Spreadsheet),
            "json" => Ok(TableFormat::Json),
            _ => Err(ImportError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension,
            }),
        }
    }
}

fn header_key(header: &str) -> String {
    header.trim_start_matches('\u{feff}').trim().to_lowercase()
}

/// One data row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRow {
    cells: HashMap<String, String>,
}

impl TableRow {
    pub fn get(&self, column: &str) -> &str {
        self.cells
            .get(&header_key(column))
            .map(String::as_str)
            .unwrap_or("")
    }

    fn insert(&mut self, column: &str, value: String) {
        self.cells.insert(header_key(column), value.trim().to_string());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<TableRow>,
}

impl Table {
    /// Builds a table from headers and positional rows. Short rows are padded with blanks.
    pub fn from_records(headers: Vec<String>, records: Vec<Vec<String>>) -> Self {
        let rows = records
            .into_iter()
            .map(|record| {
                let mut row = TableRow::default();
                for (i, header) in headers.iter().enumerate() {
                    row.insert(header, record.get(i).cloned().unwrap_or_default());
                }
                row
            })
            .collect();
        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Required columns absent from the header, in the order given.
    pub fn missing_columns(&self, required: &[&str]) -> Vec<String> {
        let present: Vec<String> = self.headers.iter().map(|h| header_key(h)).collect();
        required
            .iter()
            .filter(|column| !present.contains(&header_key(column)))
            .map(|column| column.to_string())
            .collect()
    }
}

/// Reads a table from `path`, choosing the reader by extension.
pub fn read_table(path: &Path) -> ImportResult<Table> {
    match TableFormat::from_path(path)? {
        TableFormat::Csv => read_csv(path),
        TableFormat::Spreadsheet => read_spreadsheet(path),
        TableFormat::Json => read_json(path),
    }
}

fn read_csv(path: &Path) -> ImportResult<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        records.push(record.iter().map(str::to_string).collect());
    }
    Ok(Table::from_records(headers, records))
}

/// Renders a spreadsheet cell the way it would have been typed.
pub(crate) fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) if value.num_seconds_from_midnight() == 0 => {
                value.date().format("%Y-%m-%d").to_string()
            }
            Some(value) => value.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => dt.as_f64().to_string(),
        },
    }
}

fn read_spreadsheet(path: &Path) -> ImportResult<Table> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ImportError::Malformed {
            path: path.to_path_buf(),
            reason: "workbook has no sheets".into(),
        })??;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header) => header.iter().map(cell_to_string).collect(),
        None => return Ok(Table::default()),
    };
    let records = rows
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect();
    Ok(Table::from_records(headers, records))
}

fn json_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items.iter().map(json_cell).collect::<Vec<_>>().join(";"),
        Value::Object(_) => value.to_string(),
    }
}

/// Parses JSON text: either a list of row objects or an object holding one under `rows`.
pub fn parse_json_rows(path: &Path, text: &str) -> ImportResult<Table> {
    let malformed = |reason: &str| ImportError::Malformed {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let value: Value = serde_json::from_str(text)?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("rows") {
            Some(Value::Array(items)) => items,
            _ => return Err(malformed("expected a list of rows or an object with a 'rows' list")),
        },
        _ => return Err(malformed("expected a list of rows or an object with a 'rows' list")),
    };

    let mut headers: Vec<String> = Vec::new();
    let mut rows = Vec::with_capacity(items.len());
    for item in items {
        let Value::Object(map) = item else {
            return Err(malformed("every row must be a JSON object"));
        };
        let mut row = TableRow::default();
        for (key, value) in &map {
            if !headers.iter().any(|h| header_key(h) == header_key(key)) {
                headers.push(key.clone());
            }
            row.insert(key, json_cell(value));
        }
        rows.push(row);
    }
    Ok(Table { headers, rows })
}

fn read_json(path: &Path) -> ImportResult<Table> {
    let text = std::fs::read_to_string(path)?;
    parse_json_rows(path, &text)
}
