//! One function per operation kind. Each reads the input sheet and builds a new
//! one; the input is never modified.

use super::dates;
use crate::config::EngineConfig;
use crate::errors::OperationError;
use crate::model::table::parse_number;
use crate::model::{
    Cell, Comparator, FilterColumns, FilterRows, OperationKind, RemoveRows, RenameColumns, Row,
    Sheet, Sort, SubOperationKind, TransformData,
};
use indexmap::IndexSet;
use std::cmp::Ordering;

/// New sheet state plus non-fatal notes about how it was produced.
#[derive(Debug)]
pub(crate) struct Applied {
    pub sheet: Sheet,
    pub warnings: Vec<String>,
}

impl Applied {
    fn new(sheet: Sheet) -> Self {
        Self {
            sheet,
            warnings: Vec::new(),
        }
    }

    fn warn(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }
}

pub(crate) fn apply_operation(
    kind: &OperationKind,
    sheet: &Sheet,
    config: &EngineConfig,
) -> Result<Applied, OperationError> {
    match kind {
        OperationKind::FilterColumns(params) => filter_columns(params, sheet),
        OperationKind::RemoveRows(params) => remove_rows(params, sheet),
        OperationKind::FilterRows(params) => filter_rows(params, sheet),
        OperationKind::Sort(params) => sort_rows(params, sheet),
        OperationKind::RenameColumns(params) => rename_columns(params, sheet),
        OperationKind::TransformData(params) => transform_data(params, sheet, config),
    }
}

fn require_header(sheet: &Sheet) -> Result<&Row, OperationError> {
    sheet.header().ok_or(OperationError::MissingHeader)
}

fn require_column(sheet: &Sheet, name: &str) -> Result<usize, OperationError> {
    require_header(sheet)?;
    sheet
        .column_index(name)
        .ok_or_else(|| OperationError::ColumnNotFound(name.to_string()))
}

fn project(sheet: &Sheet, keep: &[usize]) -> Sheet {
    let rows = sheet
        .rows()
        .iter()
        .map(|row| {
            keep.iter()
                .map(|&col| row.get(col).cloned().unwrap_or_default())
                .collect()
        })
        .collect();
    Sheet::new(rows)
}

fn trimmed_set(names: &IndexSet<String>) -> IndexSet<&str> {
    names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()).collect()
}

fn missing_names<'a>(wanted: &IndexSet<&'a str>, header: &[String]) -> Vec<&'a str> {
    wanted
        .iter()
        .copied()
        .filter(|name| !header.iter().any(|h| h.trim() == *name))
        .collect()
}

fn filter_columns(params: &FilterColumns, sheet: &Sheet) -> Result<Applied, OperationError> {
    require_header(sheet)?;
    let header = sheet.header_names();

    if let Some(include) = &params.include {
        let mut notes = Vec::new();
        if params.exclude.is_some() {
            notes.push("both include and exclude were given; exclude was ignored".to_string());
        }
        let wanted = trimmed_set(include);
        if wanted.is_empty() {
            notes.push("include list is empty; all columns kept".to_string());
            return Ok(Applied {
                sheet: sheet.clone(),
                warnings: notes,
            });
        }

        let keep: Vec<usize> = header
            .iter()
            .enumerate()
            .filter(|(_, name)| wanted.contains(name.trim()))
            .map(|(idx, _)| idx)
            .collect();
        if keep.is_empty() {
            return Err(OperationError::ColumnsNotFound(
                wanted.iter().map(|s| s.to_string()).collect(),
            ));
        }
        let missing = missing_names(&wanted, &header);
        if !missing.is_empty() {
            notes.push(format!("columns not found: {}", missing.join(", ")));
        }
        return Ok(Applied {
            sheet: project(sheet, &keep),
            warnings: notes,
        });
    }

    let Some(exclude) = &params.exclude else {
        return Err(OperationError::invalid_params(
            "filter_columns",
            "neither include nor exclude given",
        ));
    };
    let unwanted = trimmed_set(exclude);
    if unwanted.is_empty() {
        return Ok(Applied::new(sheet.clone()).warn("exclude list is empty; all columns kept"));
    }

    let keep: Vec<usize> = header
        .iter()
        .enumerate()
        .filter(|(_, name)| !unwanted.contains(name.trim()))
        .map(|(idx, _)| idx)
        .collect();
    if keep.len() == header.len() {
        return Err(OperationError::ColumnsNotFound(
            unwanted.iter().map(|s| s.to_string()).collect(),
        ));
    }
    if keep.is_empty() {
        return Err(OperationError::invalid_params(
            "filter_columns",
            "exclude would remove every column",
        ));
    }

    let mut applied = Applied::new(project(sheet, &keep));
    let missing = missing_names(&unwanted, &header);
    if !missing.is_empty() {
        applied = applied.warn(format!("columns not found: {}", missing.join(", ")));
    }
    Ok(applied)
}

/// All ranges mark rows in one pass over the original indices; compaction happens
/// once at the end, so ranges never shift one another.
fn remove_rows(params: &RemoveRows, sheet: &Sheet) -> Result<Applied, OperationError> {
    let header = require_header(sheet)?;
    if params.ranges.is_empty() {
        return Err(OperationError::invalid_params(
            "remove_rows",
            "no row ranges given",
        ));
    }

    let data = sheet.data_rows();
    let total = data.len();
    let mut marked = vec![false; total];
    let mut notes = Vec::new();
    let mut first_error = None;
    let mut usable = 0usize;

    for range in &params.ranges {
        let reason = if range.start == 0 {
            Some("rows are numbered from 1")
        } else if range.start > range.end {
            Some("start is after end")
        } else if range.start > total {
            Some("beyond the last data row")
        } else {
            None
        };
        if let Some(reason) = reason {
            notes.push(format!("skipped range {range}: {reason}"));
            first_error.get_or_insert(OperationError::InvalidRange {
                start: range.start,
                end: range.end,
                reason: reason.to_string(),
            });
            continue;
        }

        let end = range.end.min(total);
        if end < range.end {
            notes.push(format!(
                "range {range} clamped to {}-{end} ({total} data rows)",
                range.start
            ));
        }
        for flag in &mut marked[range.start - 1..end] {
            *flag = true;
        }
        usable += 1;
    }

    if usable == 0 {
        return Err(first_error.unwrap_or_else(|| {
            OperationError::invalid_params("remove_rows", "no usable row ranges")
        }));
    }

    let kept = data
        .iter()
        .zip(&marked)
        .filter(|(_, removed)| !**removed)
        .map(|(row, _)| row.clone())
        .collect();
    Ok(Applied {
        sheet: Sheet::from_parts(header.clone(), kept),
        warnings: notes,
    })
}

fn filter_rows(params: &FilterRows, sheet: &Sheet) -> Result<Applied, OperationError> {
    let header = require_header(sheet)?;
    let col = require_column(sheet, &params.column)?;
    if params.comparator.needs_value() && params.value.is_empty() {
        return Err(OperationError::invalid_params(
            "filter_rows",
            format!("comparator '{}' needs a value", params.comparator),
        ));
    }

    let kept = sheet
        .data_rows()
        .iter()
        .filter(|row| {
            let cell = row.get(col).unwrap_or(&Cell::Empty);
            cell_matches(cell, params.comparator, &params.value)
        })
        .cloned()
        .collect();
    Ok(Applied::new(Sheet::from_parts(header.clone(), kept)))
}

/// Numeric comparison when both sides parse as numbers, otherwise lexical.
pub(crate) fn cell_matches(cell: &Cell, comparator: Comparator, value: &str) -> bool {
    let text = cell.display_text();
    let text = text.trim();
    let value = value.trim();
    match comparator {
        Comparator::IsEmpty => cell.is_empty(),
        Comparator::NotEmpty => !cell.is_empty(),
        Comparator::Contains => text.contains(value),
        Comparator::NotContains => !text.contains(value),
        Comparator::StartsWith => text.starts_with(value),
        Comparator::EndsWith => text.ends_with(value),
        Comparator::Eq => compare_to_value(cell, text, value) == Ordering::Equal,
        Comparator::Ne => compare_to_value(cell, text, value) != Ordering::Equal,
        Comparator::Gt => compare_to_value(cell, text, value) == Ordering::Greater,
        Comparator::Gte => compare_to_value(cell, text, value) != Ordering::Less,
        Comparator::Lt => compare_to_value(cell, text, value) == Ordering::Less,
        Comparator::Lte => compare_to_value(cell, text, value) != Ordering::Greater,
    }
}

fn compare_to_value(cell: &Cell, text: &str, value: &str) -> Ordering {
    match (cell.as_number(), parse_number(value)) {
        (Some(lhs), Some(rhs)) => lhs.partial_cmp(&rhs).unwrap_or(Ordering::Equal),
        _ => text.cmp(value),
    }
}

fn sort_rows(params: &Sort, sheet: &Sheet) -> Result<Applied, OperationError> {
    let header = require_header(sheet)?;
    let col = require_column(sheet, &params.column)?;

    let mut data: Vec<Row> = sheet.data_rows().to_vec();
    data.sort_by(|a, b| {
        let lhs = a.get(col).unwrap_or(&Cell::Empty);
        let rhs = b.get(col).unwrap_or(&Cell::Empty);
        // empty cells sink to the bottom in either direction
        match (lhs.is_empty(), rhs.is_empty()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => {
                let ordering = compare_cells(lhs, rhs);
                if params.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            }
        }
    });
    Ok(Applied::new(Sheet::from_parts(header.clone(), data)))
}

/// Numbers order before text; numbers compare numerically, text lexically.
pub(crate) fn compare_cells(lhs: &Cell, rhs: &Cell) -> Ordering {
    match (lhs.as_number(), rhs.as_number()) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => lhs.display_text().trim().cmp(rhs.display_text().trim()),
    }
}

fn rename_columns(params: &RenameColumns, sheet: &Sheet) -> Result<Applied, OperationError> {
    let mut header = require_header(sheet)?.clone();
    if params.mapping.is_empty() {
        return Err(OperationError::invalid_params(
            "rename_columns",
            "mapping is empty",
        ));
    }

    // positions resolve against the incoming header so swaps and chains apply at once
    let original = header.clone();
    let mut unmatched = Vec::new();
    let mut replacements = Vec::with_capacity(params.mapping.len());
    for (old, new) in &params.mapping {
        let position = original
            .iter()
            .position(|cell| cell.display_text() == *old)
            .or_else(|| {
                original
                    .iter()
                    .position(|cell| cell.display_text().trim() == old.trim())
            });
        match position {
            Some(idx) => replacements.push((idx, new)),
            None => unmatched.push(old.as_str()),
        }
    }
    for (idx, new) in replacements {
        header[idx] = Cell::text(new.clone());
    }

    let mut applied = Applied::new(Sheet::from_parts(header, sheet.data_rows().to_vec()));
    if !unmatched.is_empty() {
        applied = applied.warn(format!(
            "rename ignored for missing columns: {}",
            unmatched.join(", ")
        ));
    }
    Ok(applied)
}

fn transform_data(
    params: &TransformData,
    sheet: &Sheet,
    config: &EngineConfig,
) -> Result<Applied, OperationError> {
    require_header(sheet)?;
    if params.operations.is_empty() {
        return Err(OperationError::invalid_params(
            "transform_data",
            "no sub-operations given",
        ));
    }

    let mut rows: Vec<Row> = sheet.rows().to_vec();
    let first_row = if params.skip_header { 1 } else { 0 };
    let mut notes = Vec::new();
    let mut missing = Vec::new();
    let mut resolved = 0usize;

    for sub in &params.operations {
        let Some(col) = sheet.column_index(&sub.column) else {
            missing.push(sub.column.clone());
            continue;
        };
        resolved += 1;

        let convert: fn(&Cell, &EngineConfig) -> Option<Cell> = match &sub.kind {
            SubOperationKind::FormatDate => format_date_cell,
            SubOperationKind::Trim => |cell, _| match cell {
                Cell::Text(s) if s.trim() != s => Some(Cell::text(s.trim())),
                _ => None,
            },
            SubOperationKind::Uppercase => |cell, _| match cell {
                Cell::Text(s) => Some(Cell::text(s.to_uppercase())),
                _ => None,
            },
            SubOperationKind::Lowercase => |cell, _| match cell {
                Cell::Text(s) => Some(Cell::text(s.to_lowercase())),
                _ => None,
            },
            SubOperationKind::Other(name) => {
                notes.push(format!("unsupported sub-operation '{name}' skipped"));
                continue;
            }
        };

        let mut changed = 0usize;
        for row in rows.iter_mut().skip(first_row) {
            if let Some(cell) = row.get_mut(col)
                && let Some(updated) = convert(cell, config)
            {
                *cell = updated;
                changed += 1;
            }
        }
        tracing::debug!(
            sub_operation = sub.kind.as_str(),
            column = %sub.column,
            changed,
            "transform applied"
        );
    }

    if resolved == 0 {
        return Err(OperationError::ColumnsNotFound(missing));
    }
    if !missing.is_empty() {
        notes.push(format!("columns not found: {}", missing.join(", ")));
    }
    Ok(Applied {
        sheet: Sheet::new(rows),
        warnings: notes,
    })
}

/// Numeric cells inside the plausible serial range become `YYYY-MM-DD` text;
/// anything else is left alone.
fn format_date_cell(cell: &Cell, config: &EngineConfig) -> Option<Cell> {
    let serial = cell.as_number()?;
    if !config.is_date_serial(serial) {
        return None;
    }
    dates::format_serial(serial).map(Cell::Text)
}
