//! Guided tabular transformation engine.
//!
//! Model output that should describe a plan of table edits is recovered into a
//! typed [`OperationPlan`], applied to an in-memory [`TableModel`], checked
//! against the user's instruction and documented in a report sheet. Every
//! public entry point returns a usable result; failures become warnings or a
//! report-only fallback workbook.

pub mod config;
pub mod detect;
pub mod engine;
pub mod errors;
pub mod executor;
pub mod logging;
pub mod model;
pub mod report;
pub mod sanitize;
pub mod verify;

pub use config::{EngineArgs, EngineConfig};
pub use detect::{ColumnTypeDetector, DateColumn};
pub use engine::{Engine, EngineOutput, EngineRequest, Outcome};
pub use errors::{OperationError, PlanParseError, TableError};
pub use executor::{ExecutionTrace, PipelineExecutor, SheetRun, TraceEntry, WorkbookRun};
pub use model::{
    Cell, ColumnType, Operation, OperationKind, OperationPlan, OperationType, Row, Sheet,
    TableModel, Warning,
};
pub use report::{ReportBuilder, ReportInput};
pub use sanitize::{
    AnalysisResponse, ContentSanitizer, PlanOutcome, RecoveredPlan, RecoveryStage, sanitize,
    sanitize_analysis,
};
pub use verify::{ResultVerifier, VerificationResult};
