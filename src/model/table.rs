use crate::errors::TableError;
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

static EMPTY_CELL: Cell = Cell::Empty;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    DateSerial(f64),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(_) | Self::DateSerial(_) => false,
        }
    }

    /// Numeric view of the cell. Text is coerced when it parses as a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) | Self::DateSerial(n) => Some(*n),
            Self::Text(s) => parse_number(s),
            Self::Empty => None,
        }
    }

    pub fn display_text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(n) | Self::DateSerial(n) => format_number(*n),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_text())
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

pub(crate) fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let cleaned: String = trimmed.chars().filter(|c| *c != ',').collect();
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

pub type Row = Vec<Cell>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Text,
    Numeric,
    DateSerial,
}

/// Ordered rows; row 0 is the header when present. Rows may be ragged, missing
/// trailing cells read as [`Cell::Empty`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Sheet {
    rows: Vec<Row>,
}

impl Sheet {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn from_parts(header: Row, data: Vec<Row>) -> Self {
        let mut rows = Vec::with_capacity(data.len() + 1);
        rows.push(header);
        rows.extend(data);
        Self { rows }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn header(&self) -> Option<&Row> {
        self.rows.first()
    }

    pub fn header_names(&self) -> Vec<String> {
        self.header()
            .map(|row| row.iter().map(Cell::display_text).collect())
            .unwrap_or_default()
    }

    pub fn data_rows(&self) -> &[Row] {
        self.rows.get(1..).unwrap_or(&[])
    }

    pub fn data_row_count(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }

    pub fn column_count(&self) -> usize {
        self.header().map(Vec::len).unwrap_or(0)
    }

    /// Position of the header cell named `name`; surrounding whitespace is ignored.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = name.trim();
        let header = self.header()?;
        header
            .iter()
            .position(|cell| cell.display_text() == name)
            .or_else(|| {
                header
                    .iter()
                    .position(|cell| cell.display_text().trim() == wanted)
            })
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }
}

/// One workbook: sheets keyed by unique name, insertion order is display order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct TableModel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    sheets: IndexMap<String, Sheet>,
}

impl TableModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn push_sheet(&mut self, name: impl Into<String>, sheet: Sheet) -> Result<(), TableError> {
        let name = name.into();
        if self.sheets.contains_key(&name) {
            return Err(TableError::DuplicateSheet(name));
        }
        self.sheets.insert(name, sheet);
        Ok(())
    }

    pub fn sheet(&self, name: &str) -> Result<&Sheet, TableError> {
        self.sheets
            .get(name)
            .ok_or_else(|| TableError::SheetNotFound(name.to_string()))
    }

    pub fn contains_sheet(&self, name: &str) -> bool {
        self.sheets.contains_key(name)
    }

    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.keys().map(String::as_str)
    }

    pub fn sheets(&self) -> impl Iterator<Item = (&str, &Sheet)> {
        self.sheets.iter().map(|(name, sheet)| (name.as_str(), sheet))
    }

    pub fn first_sheet(&self) -> Option<(&str, &Sheet)> {
        self.sheets.first().map(|(name, sheet)| (name.as_str(), sheet))
    }

    pub fn len(&self) -> usize {
        self.sheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    /// Returns a name not yet used in this workbook, clipped to the 31-character
    /// sheet name limit.
    pub fn unique_sheet_name(&self, base: &str) -> String {
        const MAX_SHEET_NAME_CHARS: usize = 31;
        let clipped: String = base.chars().take(MAX_SHEET_NAME_CHARS).collect();
        if !self.sheets.contains_key(&clipped) {
            return clipped;
        }
        for n in 2.. {
            let suffix = format!(" ({n})");
            let keep = MAX_SHEET_NAME_CHARS.saturating_sub(suffix.chars().count());
            let candidate: String = base.chars().take(keep).collect::<String>() + &suffix;
            if !self.sheets.contains_key(&candidate) {
                return candidate;
            }
        }
        unreachable!("sheet name space exhausted")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_rows_read_as_empty() {
        let sheet = Sheet::new(vec![vec!["A".into(), "B".into()], vec![Cell::from(1.0)]]);
        assert_eq!(sheet.cell(1, 1), &Cell::Empty);
        assert_eq!(sheet.cell(9, 0), &Cell::Empty);
    }

    #[test]
    fn unique_sheet_name_clips_and_suffixes() {
        let mut model = TableModel::new();
        let long = "A".repeat(40);
        let first = model.unique_sheet_name(&long);
        assert_eq!(first.chars().count(), 31);
        model.push_sheet(first.clone(), Sheet::default()).unwrap();
        let second = model.unique_sheet_name(&long);
        assert_ne!(first, second);
        assert!(second.ends_with(" (2)"));
        assert_eq!(second.chars().count(), 31);
    }

    #[test]
    fn numbers_display_without_trailing_zero() {
        assert_eq!(Cell::Number(12.0).display_text(), "12");
        assert_eq!(Cell::Number(12.5).display_text(), "12.5");
        assert_eq!(Cell::text(" 1,200 ").as_number(), Some(1200.0));
    }
}
