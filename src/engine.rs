//! End-to-end pipeline: sanitize, execute, verify, report.
//!
//! Every entry point returns an [`EngineOutput`] carrying a usable workbook,
//! either the transformed one or a report-only fallback.

use crate::config::EngineConfig;
use crate::executor::{ExecutionTrace, PipelineExecutor, WorkbookRun};
use crate::model::{OperationPlan, TableModel, Warning};
use crate::report::{ReportBuilder, ReportInput};
use crate::sanitize::{ContentSanitizer, PlanOutcome, RecoveryStage};
use crate::verify::{ResultVerifier, VerificationResult};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

pub const WARN_SHEET_NOT_FOUND: &str = "WARN_SHEET_NOT_FOUND";
pub const WARN_VERIFICATION_MISMATCH: &str = "WARN_VERIFICATION_MISMATCH";

#[derive(Debug, Clone)]
pub struct EngineRequest {
    pub workbook: TableModel,
    /// The user's natural-language instruction, kept verbatim for the report.
    pub instruction: String,
    /// Raw model response that should hold the operation plan.
    pub response: String,
    /// Sheets to transform; `None` means every sheet.
    pub sheets: Option<Vec<String>>,
}

impl EngineRequest {
    pub fn new(
        workbook: TableModel,
        instruction: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        Self {
            workbook,
            instruction: instruction.into(),
            response: response.into(),
            sheets: None,
        }
    }

    pub fn with_sheets<I, S>(mut self, sheets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sheets = Some(sheets.into_iter().map(Into::into).collect());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Transformed,
    Fallback { reason: String },
}

#[derive(Debug, Clone)]
pub struct EngineOutput {
    pub workbook: TableModel,
    pub outcome: Outcome,
    pub plan: OperationPlan,
    pub parse_stage: RecoveryStage,
    pub traces: Vec<ExecutionTrace>,
    pub verification: Option<VerificationResult>,
    pub warnings: Vec<Warning>,
}

impl EngineOutput {
    pub fn is_fallback(&self) -> bool {
        matches!(self.outcome, Outcome::Fallback { .. })
    }
}

/// State carried from plan recovery into execution.
struct Planned {
    plan: OperationPlan,
    stage: RecoveryStage,
    clean: bool,
    warnings: Vec<Warning>,
}

#[derive(Debug, Clone)]
pub struct Engine {
    config: Arc<EngineConfig>,
    sanitizer: ContentSanitizer,
    executor: PipelineExecutor,
    verifier: ResultVerifier,
    reporter: ReportBuilder,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let config = Arc::new(config);
        Self {
            sanitizer: ContentSanitizer::new(config.max_unwrap_depth),
            executor: PipelineExecutor::with_shared_config(Arc::clone(&config)),
            verifier: ResultVerifier::from_config(&config),
            reporter: ReportBuilder::from_config(&config),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn executor(&self) -> &PipelineExecutor {
        &self.executor
    }

    pub fn run(&self, request: EngineRequest) -> EngineOutput {
        let planned = match self.plan(&request) {
            Ok(planned) => planned,
            Err(output) => return *output,
        };
        let run = self.executor.execute_workbook(
            &request.workbook,
            &planned.plan,
            request.sheets.as_deref(),
        );
        self.finish(&request, planned, run)
    }

    /// Like [`run`](Self::run), executing sheets on blocking tasks. The report is
    /// built only after every sheet task has finished.
    pub async fn run_concurrent(&self, request: EngineRequest) -> EngineOutput {
        let planned = match self.plan(&request) {
            Ok(planned) => planned,
            Err(output) => return *output,
        };
        let run = self
            .executor
            .execute_workbook_concurrent(&request.workbook, &planned.plan, request.sheets.as_deref())
            .await;
        self.finish(&request, planned, run)
    }

    fn plan(&self, request: &EngineRequest) -> Result<Planned, Box<EngineOutput>> {
        let sanitized = self.sanitizer.sanitize(&request.response);
        let stage = sanitized.stage();
        let clean = sanitized.is_clean();
        let warnings = sanitized.warnings().to_vec();
        let plan = sanitized.into_plan();
        let planned = Planned {
            plan,
            stage,
            clean,
            warnings,
        };

        let reason = if request.workbook.is_empty() {
            Some("workbook has no sheets")
        } else if stage == RecoveryStage::Unrecoverable {
            Some("model response held no recoverable plan")
        } else if !clean && planned.plan.is_empty() {
            Some("no operations could be recovered from the model response")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(Box::new(self.fallback(request, planned, Vec::new(), reason))),
            None => Ok(planned),
        }
    }

    fn finish(&self, request: &EngineRequest, mut planned: Planned, run: WorkbookRun) -> EngineOutput {
        for name in &run.missing_sheets {
            planned.warnings.push(Warning::new(
                WARN_SHEET_NOT_FOUND,
                format!("Selected sheet '{name}' is not in the workbook"),
            ));
        }

        let traces: Vec<ExecutionTrace> = run.runs.iter().map(|r| r.trace.clone()).collect();
        if run.runs.is_empty() {
            return self.fallback(request, planned, traces, "none of the selected sheets exist");
        }
        if !planned.plan.is_empty() && run.all_failed() {
            return self.fallback(request, planned, traces, "every operation in the plan failed");
        }

        let instruction = planned
            .plan
            .column_filter_instruction()
            .unwrap_or(request.instruction.as_str())
            .to_string();
        let verification = run
            .runs
            .first()
            .and_then(|primary| self.verifier.verify(&instruction, &primary.sheet.header_names()));
        if let Some(result) = &verification {
            for message in result.warnings() {
                planned
                    .warnings
                    .push(Warning::new(WARN_VERIFICATION_MISMATCH, message));
            }
        }

        let parse_status = parse_status(&planned);
        let report = self.reporter.build_report(&ReportInput {
            generated_at: Utc::now(),
            file_name: request.workbook.file_name.as_deref(),
            original: request.workbook.first_sheet().map(|(_, sheet)| sheet),
            instruction: &request.instruction,
            plan: Some(&planned.plan),
            traces: &traces,
            verification: verification.as_ref(),
            parse_status: Some(&parse_status),
            warnings: &planned.warnings,
            errors: &[],
        });
        let workbook = self
            .reporter
            .build_result_workbook(&request.workbook, &run, report);

        tracing::info!(
            sheets = run.runs.len(),
            warnings = run.warning_count() + planned.warnings.len(),
            "plan applied"
        );
        EngineOutput {
            workbook,
            outcome: Outcome::Transformed,
            plan: planned.plan,
            parse_stage: planned.stage,
            traces,
            verification,
            warnings: planned.warnings,
        }
    }

    fn fallback(
        &self,
        request: &EngineRequest,
        planned: Planned,
        traces: Vec<ExecutionTrace>,
        reason: &str,
    ) -> EngineOutput {
        tracing::warn!(reason, "returning fallback report workbook");
        let errors = [reason.to_string()];
        let parse_status = parse_status(&planned);
        let report = self.reporter.build_report(&ReportInput {
            generated_at: Utc::now(),
            file_name: request.workbook.file_name.as_deref(),
            original: request.workbook.first_sheet().map(|(_, sheet)| sheet),
            instruction: &request.instruction,
            plan: Some(&planned.plan),
            traces: &traces,
            verification: None,
            parse_status: Some(&parse_status),
            warnings: &planned.warnings,
            errors: &errors,
        });
        EngineOutput {
            workbook: self
                .reporter
                .build_fallback_workbook(&request.workbook, report),
            outcome: Outcome::Fallback {
                reason: reason.to_string(),
            },
            plan: planned.plan,
            parse_stage: planned.stage,
            traces,
            verification: None,
            warnings: planned.warnings,
        }
    }
}

fn parse_status(planned: &Planned) -> String {
    if planned.clean {
        "clean".to_string()
    } else {
        format!("recovered ({})", planned.stage)
    }
}
