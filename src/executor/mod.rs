//! Applies an [`OperationPlan`] to sheets.
//!
//! Operations run strictly in order against the output of the previous one. A
//! failing operation is recorded on its trace entry and the sheet state from
//! before it carries forward; nothing here returns an error.

pub mod dates;
mod ops;
pub mod trace;

pub use trace::{ExecutionTrace, TraceEntry};

use crate::config::EngineConfig;
use crate::detect::{ColumnTypeDetector, DateColumn};
use crate::model::{
    Operation, OperationKind, OperationPlan, Sheet, SubOperation, TableModel, TransformData,
};
use std::sync::Arc;

/// Result of running a plan against one named sheet.
#[derive(Debug, Clone)]
pub struct SheetRun {
    pub name: String,
    pub sheet: Sheet,
    pub trace: ExecutionTrace,
    /// Set when the sheet task itself died; `sheet` is then the input unchanged.
    pub error: Option<String>,
}

impl SheetRun {
    pub fn all_failed(&self) -> bool {
        self.error.is_some() || self.trace.all_failed()
    }
}

#[derive(Debug, Clone, Default)]
pub struct WorkbookRun {
    pub runs: Vec<SheetRun>,
    /// Requested sheet names that the workbook does not contain.
    pub missing_sheets: Vec<String>,
}

impl WorkbookRun {
    /// True when nothing ran, or every sheet's user operations failed.
    pub fn all_failed(&self) -> bool {
        self.runs.is_empty() || self.runs.iter().all(SheetRun::all_failed)
    }

    pub fn warning_count(&self) -> usize {
        self.runs.iter().map(|r| r.trace.warning_count()).sum()
    }
}

#[derive(Debug, Clone)]
pub struct PipelineExecutor {
    config: Arc<EngineConfig>,
    detector: ColumnTypeDetector,
}

impl Default for PipelineExecutor {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

/// Runs `plan` against `sheet` with default configuration.
pub fn execute(sheet: &Sheet, plan: &OperationPlan) -> (Sheet, ExecutionTrace) {
    PipelineExecutor::default().execute(sheet, plan)
}

impl PipelineExecutor {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_shared_config(Arc::new(config))
    }

    pub fn with_shared_config(config: Arc<EngineConfig>) -> Self {
        let detector = ColumnTypeDetector::from_config(&config);
        Self { config, detector }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn detector(&self) -> &ColumnTypeDetector {
        &self.detector
    }

    /// Prepends the auto date fix when it applies, then runs every operation.
    pub fn execute(&self, sheet: &Sheet, plan: &OperationPlan) -> (Sheet, ExecutionTrace) {
        let operations = self.prepare_operations(sheet, plan);
        self.run_operations(sheet, &operations, ExecutionTrace::new())
    }

    /// Runs exactly the given operations, with no auto-insertion.
    pub fn execute_operations(
        &self,
        sheet: &Sheet,
        operations: &[Operation],
    ) -> (Sheet, ExecutionTrace) {
        self.run_operations(sheet, operations, ExecutionTrace::new())
    }

    /// The plan's operations, preceded by a synthetic date fix when date columns
    /// are detected and no operation formats dates yet. An empty plan stays empty.
    pub fn prepare_operations(&self, sheet: &Sheet, plan: &OperationPlan) -> Vec<Operation> {
        let mut operations = Vec::with_capacity(plan.operations.len() + 1);
        if !plan.is_empty()
            && let Some(fix) = self.auto_date_fix(sheet, plan)
        {
            operations.push(fix);
        }
        operations.extend(plan.operations.iter().cloned());
        operations
    }

    pub fn auto_date_fix(&self, sheet: &Sheet, plan: &OperationPlan) -> Option<Operation> {
        if !self.config.auto_date_fix || plan.has_format_date() {
            return None;
        }
        let columns = self.detector.detect_date_columns(sheet);
        if columns.is_empty() {
            return None;
        }
        tracing::info!(
            columns = ?columns.iter().map(|c| c.column.as_str()).collect::<Vec<_>>(),
            "auto-inserting date format fix"
        );
        Some(date_fix_operation(&columns))
    }

    fn run_operations(
        &self,
        sheet: &Sheet,
        operations: &[Operation],
        mut trace: ExecutionTrace,
    ) -> (Sheet, ExecutionTrace) {
        let mut current = sheet.clone();

        for (idx, op) in operations.iter().enumerate() {
            let rows_before = current.data_row_count();
            let cols_before = current.column_count();
            let mut entry = TraceEntry {
                operation_index: idx,
                op_type: op.op_type(),
                auto_generated: op.is_auto_generated(),
                params: op.to_record().params.to_string(),
                rows_before,
                rows_after: rows_before,
                cols_before,
                cols_after: cols_before,
                warning: None,
                failed: false,
            };

            match ops::apply_operation(op.kind(), &current, &self.config) {
                Ok(applied) => {
                    entry.rows_after = applied.sheet.data_row_count();
                    entry.cols_after = applied.sheet.column_count();
                    if !applied.warnings.is_empty() {
                        entry.warning = Some(applied.warnings.join("; "));
                    }
                    current = applied.sheet;
                }
                Err(err) => {
                    tracing::warn!(
                        operation = idx + 1,
                        op_type = %op.op_type(),
                        error = %err,
                        "operation failed; keeping previous sheet state"
                    );
                    entry.warning = Some(format!("Operation {} ({}): {}", idx + 1, op.op_type(), err));
                    entry.failed = true;
                }
            }
            trace.push(entry);
        }

        if trace.all_failed() {
            tracing::warn!(
                operations = trace.len(),
                "every plan operation failed; returning the sheet unmodified"
            );
            return (sheet.clone(), trace);
        }
        (current, trace)
    }

    /// Runs the plan against each selected sheet (all sheets when `selection` is
    /// `None`) one after another, in workbook order.
    pub fn execute_workbook(
        &self,
        model: &TableModel,
        plan: &OperationPlan,
        selection: Option<&[String]>,
    ) -> WorkbookRun {
        let (targets, missing_sheets) = select_sheets(model, selection);
        let runs = targets
            .into_iter()
            .map(|(name, sheet)| self.run_sheet(name, sheet, plan))
            .collect();
        WorkbookRun {
            runs,
            missing_sheets,
        }
    }

    /// Same as [`execute_workbook`](Self::execute_workbook) with one blocking task
    /// per sheet. Waits for every task before returning; results keep workbook order.
    pub async fn execute_workbook_concurrent(
        &self,
        model: &TableModel,
        plan: &OperationPlan,
        selection: Option<&[String]>,
    ) -> WorkbookRun {
        let (targets, missing_sheets) = select_sheets(model, selection);
        let plan = Arc::new(plan.clone());

        let tasks: Vec<_> = targets
            .into_iter()
            .map(|(name, sheet)| {
                let executor = self.clone();
                let plan = Arc::clone(&plan);
                let task_name = name.to_string();
                let task_sheet = sheet.clone();
                let handle = tokio::task::spawn_blocking(move || {
                    executor.run_sheet(&task_name, &task_sheet, &plan)
                });
                (name.to_string(), sheet.clone(), handle)
            })
            .collect();

        let mut runs = Vec::with_capacity(tasks.len());
        for (name, sheet, handle) in tasks {
            match handle.await {
                Ok(run) => runs.push(run),
                Err(err) => {
                    tracing::error!(sheet = %name, error = %err, "sheet task failed");
                    runs.push(SheetRun {
                        trace: ExecutionTrace::for_sheet(name.clone()),
                        name,
                        sheet,
                        error: Some(format!("sheet execution aborted: {err}")),
                    });
                }
            }
        }
        WorkbookRun {
            runs,
            missing_sheets,
        }
    }

    fn run_sheet(&self, name: &str, sheet: &Sheet, plan: &OperationPlan) -> SheetRun {
        let operations = self.prepare_operations(sheet, plan);
        let (sheet, trace) =
            self.run_operations(sheet, &operations, ExecutionTrace::for_sheet(name));
        tracing::debug!(sheet = name, summary = %trace.summary(), "sheet executed");
        SheetRun {
            name: name.to_string(),
            sheet,
            trace,
            error: None,
        }
    }
}

fn date_fix_operation(columns: &[DateColumn]) -> Operation {
    Operation::auto_generated(OperationKind::TransformData(TransformData {
        operations: columns
            .iter()
            .map(|c| SubOperation::format_date(c.column.clone()))
            .collect(),
        skip_header: true,
    }))
}

fn select_sheets<'a>(
    model: &'a TableModel,
    selection: Option<&[String]>,
) -> (Vec<(&'a str, &'a Sheet)>, Vec<String>) {
    let Some(selection) = selection else {
        return (model.sheets().collect(), Vec::new());
    };

    let mut missing = Vec::new();
    for name in selection {
        if !model.contains_sheet(name) {
            tracing::warn!(sheet = %name, "selected sheet not in workbook");
            missing.push(name.clone());
        }
    }
    let targets = model
        .sheets()
        .filter(|(name, _)| selection.iter().any(|s| s == name))
        .collect();
    (targets, missing)
}
