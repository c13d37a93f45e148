use thiserror::Error;

/// Failure of a single operation against a sheet. The executor never lets one of
/// these escape: it is folded into the trace entry of the failing operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    #[error("sheet has no header row")]
    MissingHeader,
    #[error("column '{0}' not found")]
    ColumnNotFound(String),
    #[error("none of the columns {0:?} were found")]
    ColumnsNotFound(Vec<String>),
    #[error("invalid row range {start}-{end} ({reason})")]
    InvalidRange {
        start: usize,
        end: usize,
        reason: String,
    },
    #[error("invalid parameters for {operation}: {message}")]
    InvalidParams {
        operation: &'static str,
        message: String,
    },
}

impl OperationError {
    pub fn invalid_params(operation: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidParams {
            operation,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("sheet '{0}' already exists")]
    DuplicateSheet(String),
    #[error("sheet '{0}' not found")]
    SheetNotFound(String),
}

/// Raised while converting a wire record into a typed operation.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct PlanParseError {
    kind: Option<String>,
    message: String,
}

impl PlanParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            kind: None,
            message: message.into(),
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
