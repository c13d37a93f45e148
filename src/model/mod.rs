pub mod plan;
pub mod table;
pub mod wire;

pub use plan::{
    Comparator, FilterColumns, FilterRows, Operation, OperationKind, OperationPlan,
    OperationType, RemoveRows, RenameColumns, RowRange, Sort, SubOperation, SubOperationKind,
    TransformData,
};
pub use table::{Cell, ColumnType, Row, Sheet, TableModel};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Warning {
    pub code: String,
    pub message: String,
}

impl Warning {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}
