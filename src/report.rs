//! Diagnostic report sheet and output workbook assembly.

use crate::config::EngineConfig;
use crate::executor::{ExecutionTrace, TraceEntry, WorkbookRun};
use crate::model::{Cell, OperationPlan, Row, Sheet, TableModel, Warning};
use crate::verify::VerificationResult;
use chrono::{DateTime, Utc};

pub const REPORT_TITLE: &str = "Transformation Report";

const FOOTER: &[&str] = &[
    "Notes",
    "Operations run in the order listed; each one sees only the output of the ones before it.",
    "A failed operation is skipped and the sheet keeps its state from before that operation.",
    "Operations marked 'auto' were added by the engine to format detected date columns.",
    "Sheets prefixed as originals are the unmodified input, kept for comparison.",
];

/// Everything a report documents. Borrowed so the engine can build one at any
/// stage, including before execution.
#[derive(Debug, Clone)]
pub struct ReportInput<'a> {
    pub generated_at: DateTime<Utc>,
    pub file_name: Option<&'a str>,
    pub original: Option<&'a Sheet>,
    pub instruction: &'a str,
    pub plan: Option<&'a OperationPlan>,
    pub traces: &'a [ExecutionTrace],
    pub verification: Option<&'a VerificationResult>,
    pub parse_status: Option<&'a str>,
    pub warnings: &'a [Warning],
    pub errors: &'a [String],
}

impl<'a> ReportInput<'a> {
    pub fn new(instruction: &'a str) -> Self {
        Self {
            generated_at: Utc::now(),
            file_name: None,
            original: None,
            instruction,
            plan: None,
            traces: &[],
            verification: None,
            parse_status: None,
            warnings: &[],
            errors: &[],
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReportBuilder {
    report_sheet_name: String,
    original_sheet_prefix: String,
    fallback_max_sheets: usize,
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

fn row<I, S>(cells: I) -> Row
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    cells.into_iter().map(|s| Cell::Text(s.into())).collect()
}

impl ReportBuilder {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            report_sheet_name: config.report_sheet_name.clone(),
            original_sheet_prefix: config.original_sheet_prefix.clone(),
            fallback_max_sheets: config.fallback_max_sheets,
        }
    }

    /// Text rows documenting what was asked, planned and done. Never fails.
    pub fn build_report(&self, input: &ReportInput<'_>) -> Sheet {
        let mut rows: Vec<Row> = Vec::new();
        rows.push(row([REPORT_TITLE]));
        rows.push(row([
            "Generated at".to_string(),
            input.generated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        ]));
        if let Some(file_name) = input.file_name {
            rows.push(row(["File", file_name]));
        }
        if let Some(original) = input.original {
            rows.push(row([
                "Original size".to_string(),
                format!(
                    "{} data rows x {} columns",
                    original.data_row_count(),
                    original.column_count()
                ),
            ]));
        }
        rows.push(row(["Instruction", input.instruction]));
        let summary = input.plan.map(|p| p.summary.as_str()).unwrap_or("(no plan)");
        rows.push(row(["Plan summary", summary]));
        if let Some(status) = input.parse_status {
            rows.push(row(["Plan parsing", status]));
        }

        if !input.errors.is_empty() {
            rows.push(Row::new());
            rows.push(row(["Errors"]));
            for error in input.errors {
                rows.push(row(["", error.as_str()]));
            }
        }

        rows.push(Row::new());
        self.push_operations(&mut rows, input);

        if let Some(verification) = input.verification {
            rows.push(Row::new());
            push_verification(&mut rows, verification);
        }

        let trace_warnings: Vec<String> = input
            .traces
            .iter()
            .flat_map(|trace| {
                let sheet = trace.sheet.clone();
                trace.warnings().map(move |w| match &sheet {
                    Some(name) => format!("[{name}] {w}"),
                    None => w.to_string(),
                })
            })
            .collect();
        if !input.warnings.is_empty() || !trace_warnings.is_empty() {
            rows.push(Row::new());
            rows.push(row(["Warnings"]));
            for warning in input.warnings {
                rows.push(row([
                    String::new(),
                    format!("{}: {}", warning.code, warning.message),
                ]));
            }
            for warning in &trace_warnings {
                rows.push(row(["", warning.as_str()]));
            }
        }

        rows.push(Row::new());
        for line in FOOTER {
            rows.push(row([*line]));
        }
        Sheet::new(rows)
    }

    fn push_operations(&self, rows: &mut Vec<Row>, input: &ReportInput<'_>) {
        rows.push(row(["Operations"]));
        rows.push(row([
            "#", "Type", "Parameters", "Source", "Rows", "Columns", "Status",
        ]));

        let executed: Vec<&ExecutionTrace> = input.traces.iter().filter(|t| !t.is_empty()).collect();
        if executed.is_empty() {
            let planned = input.plan.map(|p| p.operations.as_slice()).unwrap_or(&[]);
            if planned.is_empty() {
                rows.push(row(["", "(none)"]));
            }
            for (idx, op) in planned.iter().enumerate() {
                rows.push(row([
                    (idx + 1).to_string(),
                    op.op_type().to_string(),
                    op.to_record().params.to_string(),
                    source_label(op.is_auto_generated()).to_string(),
                    String::new(),
                    String::new(),
                    "not executed".to_string(),
                ]));
            }
            return;
        }

        let label_sheets = executed.len() > 1;
        for trace in executed {
            if label_sheets && let Some(name) = &trace.sheet {
                rows.push(row(["Sheet", name.as_str()]));
            }
            for entry in trace.entries() {
                rows.push(entry_row(entry));
            }
        }
    }

    /// Report sheet first, then up to `fallback_max_sheets` untouched originals.
    pub fn build_fallback_workbook(&self, original: &TableModel, report: Sheet) -> TableModel {
        let mut output = new_like(original);
        push_unique(&mut output, &self.report_sheet_name, report);
        for (name, sheet) in original.sheets().take(self.fallback_max_sheets) {
            push_unique(&mut output, name, sheet.clone());
        }
        output
    }

    /// Transformed sheets in workbook order, then the pre-transform originals
    /// under a prefix, then the report sheet.
    pub fn build_result_workbook(
        &self,
        original: &TableModel,
        run: &WorkbookRun,
        report: Sheet,
    ) -> TableModel {
        let mut output = new_like(original);
        for (name, sheet) in original.sheets() {
            let transformed = run.runs.iter().find(|r| r.name == name);
            let sheet = transformed.map(|r| r.sheet.clone()).unwrap_or_else(|| sheet.clone());
            push_unique(&mut output, name, sheet);
        }
        for sheet_run in &run.runs {
            if let Ok(sheet) = original.sheet(&sheet_run.name) {
                let name = format!("{}-{}", self.original_sheet_prefix, sheet_run.name);
                push_unique(&mut output, &name, sheet.clone());
            }
        }
        push_unique(&mut output, &self.report_sheet_name, report);
        output
    }
}

fn new_like(original: &TableModel) -> TableModel {
    match &original.file_name {
        Some(file_name) => TableModel::new().with_file_name(file_name.clone()),
        None => TableModel::new(),
    }
}

fn push_unique(model: &mut TableModel, base: &str, sheet: Sheet) {
    let name = model.unique_sheet_name(base);
    if let Err(err) = model.push_sheet(name, sheet) {
        tracing::warn!(error = %err, "could not add sheet to output workbook");
    }
}

fn source_label(auto_generated: bool) -> &'static str {
    if auto_generated { "auto" } else { "plan" }
}

fn entry_row(entry: &TraceEntry) -> Row {
    let status = match (&entry.warning, entry.failed) {
        (Some(warning), true) => format!("failed: {warning}"),
        (None, true) => "failed".to_string(),
        (Some(warning), false) => format!("applied with warning: {warning}"),
        (None, false) => "applied".to_string(),
    };
    row([
        (entry.operation_index + 1).to_string(),
        entry.op_type.to_string(),
        entry.params.clone(),
        source_label(entry.auto_generated).to_string(),
        format!("{} -> {}", entry.rows_before, entry.rows_after),
        format!("{} -> {}", entry.cols_before, entry.cols_after),
        status,
    ])
}

fn push_verification(rows: &mut Vec<Row>, verification: &VerificationResult) {
    let list = |names: &indexmap::IndexSet<String>| {
        if names.is_empty() {
            "(none)".to_string()
        } else {
            names.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
        }
    };
    rows.push(row(["Column check"]));
    rows.push(row(["Requested columns".to_string(), list(&verification.expected)]));
    rows.push(row([
        "All requested present".to_string(),
        yes_no(verification.required_columns_present).to_string(),
    ]));
    rows.push(row(["Missing".to_string(), list(&verification.missing)]));
    rows.push(row([
        "Extra columns present".to_string(),
        yes_no(verification.extra_columns_present).to_string(),
    ]));
    rows.push(row(["Unexpected".to_string(), list(&verification.unexpected)]));
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

/// Report for a single executed sheet with default settings.
pub fn build_report(
    original: &Sheet,
    instruction: &str,
    plan: &OperationPlan,
    trace: &ExecutionTrace,
    verification: Option<&VerificationResult>,
) -> Sheet {
    let traces = std::slice::from_ref(trace);
    let input = ReportInput {
        original: Some(original),
        plan: Some(plan),
        traces,
        verification,
        ..ReportInput::new(instruction)
    };
    ReportBuilder::default().build_report(&input)
}

/// Report-only workbook for a run that produced nothing trustworthy.
pub fn build_fallback_workbook(original: &TableModel, instruction: &str, error: &str) -> TableModel {
    let errors = [error.to_string()];
    let input = ReportInput {
        file_name: original.file_name.as_deref(),
        original: original.first_sheet().map(|(_, sheet)| sheet),
        errors: &errors,
        ..ReportInput::new(instruction)
    };
    let builder = ReportBuilder::default();
    let report = builder.build_report(&input);
    builder.build_fallback_workbook(original, report)
}
