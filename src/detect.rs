//! Column type detection over a bounded sample of data rows.

use crate::config::EngineConfig;
use crate::model::{Cell, ColumnType, Sheet};
use indexmap::IndexMap;
use serde::Serialize;

/// A header that names a date-like column and holds date serials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateColumn {
    pub column: String,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Tally {
    date_like: usize,
    numeric: usize,
    other: usize,
}

impl Tally {
    fn total(&self) -> usize {
        self.date_like + self.numeric + self.other
    }
}

#[derive(Debug, Clone)]
pub struct ColumnTypeDetector {
    sample_rows: usize,
    threshold: f64,
    serial_min: f64,
    serial_max: f64,
    keywords: Vec<String>,
}

impl Default for ColumnTypeDetector {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl ColumnTypeDetector {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            sample_rows: config.sample_rows,
            threshold: config.type_threshold,
            serial_min: config.date_serial_min,
            serial_max: config.date_serial_max,
            keywords: config
                .date_keywords
                .iter()
                .map(|k| k.to_lowercase())
                .collect(),
        }
    }

    /// Type per header name. Columns without any non-empty sampled cell are
    /// absent; when a header name repeats, the first column wins.
    pub fn detect_types(&self, sheet: &Sheet) -> IndexMap<String, ColumnType> {
        let mut types = IndexMap::new();
        for (index, name) in sheet.header_names().into_iter().enumerate() {
            if let Some(column_type) = self.classify_column(sheet, index) {
                types.entry(name).or_insert(column_type);
            }
        }
        types
    }

    /// Columns whose header matches a date keyword and whose sample classifies
    /// as [`ColumnType::DateSerial`], in header order.
    pub fn detect_date_columns(&self, sheet: &Sheet) -> Vec<DateColumn> {
        let columns: Vec<DateColumn> = sheet
            .header_names()
            .into_iter()
            .enumerate()
            .filter(|(_, name)| self.is_date_header(name))
            .filter(|(index, _)| self.classify_column(sheet, *index) == Some(ColumnType::DateSerial))
            .map(|(index, column)| DateColumn { column, index })
            .collect();
        if !columns.is_empty() {
            tracing::debug!(
                columns = ?columns.iter().map(|c| c.column.as_str()).collect::<Vec<_>>(),
                "detected date-serial columns"
            );
        }
        columns
    }

    pub fn is_date_header(&self, name: &str) -> bool {
        let lowered = name.to_lowercase();
        self.keywords
            .iter()
            .any(|keyword| !keyword.is_empty() && lowered.contains(keyword.as_str()))
    }

    pub fn classify_column(&self, sheet: &Sheet, index: usize) -> Option<ColumnType> {
        let tally = sheet
            .data_rows()
            .iter()
            .take(self.sample_rows)
            .filter_map(|row| row.get(index))
            .filter(|cell| !cell.is_empty())
            .fold(Tally::default(), |mut tally, cell| {
                match self.classify_cell(cell) {
                    CellClass::DateLike => tally.date_like += 1,
                    CellClass::Numeric => tally.numeric += 1,
                    CellClass::Other => tally.other += 1,
                }
                tally
            });

        let total = tally.total();
        if total == 0 {
            return None;
        }
        let total = total as f64;
        let date_fraction = tally.date_like as f64 / total;
        let numeric_fraction = (tally.date_like + tally.numeric) as f64 / total;

        Some(if date_fraction > self.threshold {
            ColumnType::DateSerial
        } else if numeric_fraction > self.threshold {
            ColumnType::Numeric
        } else {
            ColumnType::Text
        })
    }

    fn classify_cell(&self, cell: &Cell) -> CellClass {
        if let Cell::DateSerial(_) = cell {
            return CellClass::DateLike;
        }
        match cell.as_number() {
            Some(n) if n > self.serial_min && n < self.serial_max => CellClass::DateLike,
            Some(_) => CellClass::Numeric,
            None => CellClass::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellClass {
    DateLike,
    Numeric,
    Other,
}
