use crate::model::OperationType;
use serde::Serialize;

/// What one operation did to the sheet. Counts are data rows and header width.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceEntry {
    pub operation_index: usize,
    pub op_type: OperationType,
    pub auto_generated: bool,
    /// Compact JSON of the operation's parameters.
    pub params: String,
    pub rows_before: usize,
    pub rows_after: usize,
    pub cols_before: usize,
    pub cols_after: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    /// Set when the operation was rejected and the prior sheet state was kept.
    pub failed: bool,
}

impl TraceEntry {
    pub fn changed_shape(&self) -> bool {
        self.rows_before != self.rows_after || self.cols_before != self.cols_after
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionTrace {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
    entries: Vec<TraceEntry>,
}

impl ExecutionTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_sheet(name: impl Into<String>) -> Self {
        Self {
            sheet: Some(name.into()),
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, entry: TraceEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|e| e.warning.as_deref())
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    pub fn failed_count(&self) -> usize {
        self.entries.iter().filter(|e| e.failed).count()
    }

    pub fn applied_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.failed).count()
    }

    /// True when the plan had user operations and every one of them failed.
    /// Auto-generated operations do not count either way.
    pub fn all_failed(&self) -> bool {
        let mut user_ops = self.entries.iter().filter(|e| !e.auto_generated).peekable();
        user_ops.peek().is_some() && user_ops.all(|e| e.failed)
    }

    pub fn summary(&self) -> String {
        let (rows_before, cols_before) = self
            .entries
            .first()
            .map(|e| (e.rows_before, e.cols_before))
            .unwrap_or_default();
        let (rows_after, cols_after) = self
            .entries
            .last()
            .map(|e| (e.rows_after, e.cols_after))
            .unwrap_or((rows_before, cols_before));
        format!(
            "{} of {} operations applied; rows {} -> {}, columns {} -> {}",
            self.applied_count(),
            self.len(),
            rows_before,
            rows_after,
            cols_before,
            cols_after
        )
    }
}
