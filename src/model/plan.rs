use indexmap::IndexSet;
use serde::Serialize;
use std::fmt;
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};

/// Wire names of the six operation kinds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString, AsRefStr, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OperationType {
    FilterColumns,
    RemoveRows,
    FilterRows,
    Sort,
    RenameColumns,
    TransformData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    kind: OperationKind,
    auto_generated: bool,
    original_instruction: Option<String>,
}

impl Operation {
    pub fn new(kind: OperationKind) -> Self {
        Self {
            kind,
            auto_generated: false,
            original_instruction: None,
        }
    }

    /// An operation inserted by the engine rather than requested by the plan.
    pub fn auto_generated(kind: OperationKind) -> Self {
        Self {
            kind,
            auto_generated: true,
            original_instruction: None,
        }
    }

    pub fn with_original_instruction(mut self, text: impl Into<String>) -> Self {
        self.original_instruction = Some(text.into());
        self
    }

    pub(crate) fn from_parts(
        kind: OperationKind,
        auto_generated: bool,
        original_instruction: Option<String>,
    ) -> Self {
        Self {
            kind,
            auto_generated,
            original_instruction,
        }
    }

    pub fn kind(&self) -> &OperationKind {
        &self.kind
    }

    pub fn op_type(&self) -> OperationType {
        self.kind.op_type()
    }

    pub fn is_auto_generated(&self) -> bool {
        self.auto_generated
    }

    pub fn original_instruction(&self) -> Option<&str> {
        self.original_instruction.as_deref()
    }

    pub fn formats_dates(&self) -> bool {
        match &self.kind {
            OperationKind::TransformData(params) => params
                .operations
                .iter()
                .any(|sub| sub.kind == SubOperationKind::FormatDate),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OperationKind {
    FilterColumns(FilterColumns),
    RemoveRows(RemoveRows),
    FilterRows(FilterRows),
    Sort(Sort),
    RenameColumns(RenameColumns),
    TransformData(TransformData),
}

impl OperationKind {
    pub fn op_type(&self) -> OperationType {
        match self {
            Self::FilterColumns(_) => OperationType::FilterColumns,
            Self::RemoveRows(_) => OperationType::RemoveRows,
            Self::FilterRows(_) => OperationType::FilterRows,
            Self::Sort(_) => OperationType::Sort,
            Self::RenameColumns(_) => OperationType::RenameColumns,
            Self::TransformData(_) => OperationType::TransformData,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterColumns {
    pub include: Option<IndexSet<String>>,
    pub exclude: Option<IndexSet<String>>,
}

impl FilterColumns {
    pub fn include<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            include: Some(names.into_iter().map(Into::into).collect()),
            exclude: None,
        }
    }

    pub fn exclude<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            include: None,
            exclude: Some(names.into_iter().map(Into::into).collect()),
        }
    }
}

/// 1-indexed, inclusive, counted over data rows only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RowRange {
    pub start: usize,
    pub end: usize,
}

impl RowRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn single(row: usize) -> Self {
        Self { start: row, end: row }
    }
}

impl fmt::Display for RowRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RemoveRows {
    pub ranges: Vec<RowRange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Comparator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    IsEmpty,
    NotEmpty,
}

impl Comparator {
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        let parsed = match normalized.as_str() {
            "eq" | "=" | "==" | "equals" | "equal" | "is" | "等于" => Self::Eq,
            "ne" | "!=" | "<>" | "not_equals" | "not_equal" | "neq" | "不等于" => Self::Ne,
            "gt" | ">" | "greater_than" | "greaterthan" | "大于" => Self::Gt,
            "gte" | ">=" | "ge" | "greater_than_or_equal" | "大于等于" => Self::Gte,
            "lt" | "<" | "less_than" | "lessthan" | "小于" => Self::Lt,
            "lte" | "<=" | "le" | "less_than_or_equal" | "小于等于" => Self::Lte,
            "contains" | "includes" | "like" | "包含" => Self::Contains,
            "not_contains" | "notcontains" | "excludes" | "不包含" => Self::NotContains,
            "starts_with" | "startswith" | "begins_with" => Self::StartsWith,
            "ends_with" | "endswith" => Self::EndsWith,
            "is_empty" | "empty" | "blank" | "为空" => Self::IsEmpty,
            "not_empty" | "notempty" | "non_empty" | "not_blank" | "不为空" => Self::NotEmpty,
            _ => return None,
        };
        Some(parsed)
    }

    pub fn needs_value(self) -> bool {
        !matches!(self, Self::IsEmpty | Self::NotEmpty)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterRows {
    pub column: String,
    pub comparator: Comparator,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    pub column: String,
    pub ascending: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenameColumns {
    pub mapping: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubOperationKind {
    FormatDate,
    Trim,
    Uppercase,
    Lowercase,
    Other(String),
}

impl SubOperationKind {
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "format_date" | "formatdate" | "date_format" | "convert_date" | "to_date" => {
                Self::FormatDate
            }
            "trim" | "trim_whitespace" | "strip" => Self::Trim,
            "uppercase" | "upper" | "to_upper" => Self::Uppercase,
            "lowercase" | "lower" | "to_lower" => Self::Lowercase,
            _ => Self::Other(raw.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::FormatDate => "format_date",
            Self::Trim => "trim",
            Self::Uppercase => "uppercase",
            Self::Lowercase => "lowercase",
            Self::Other(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubOperation {
    pub kind: SubOperationKind,
    pub column: String,
}

impl SubOperation {
    pub fn format_date(column: impl Into<String>) -> Self {
        Self {
            kind: SubOperationKind::FormatDate,
            column: column.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformData {
    pub operations: Vec<SubOperation>,
    pub skip_header: bool,
}

/// A summary plus operations applied strictly in listed order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OperationPlan {
    pub summary: String,
    pub operations: Vec<Operation>,
}

impl OperationPlan {
    pub fn new(summary: impl Into<String>, operations: Vec<Operation>) -> Self {
        Self {
            summary: summary.into(),
            operations,
        }
    }

    pub fn empty(summary: impl Into<String>) -> Self {
        Self::new(summary, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn has_format_date(&self) -> bool {
        self.operations.iter().any(Operation::formats_dates)
    }

    /// Instruction text carried by the first column filter, if any.
    pub fn column_filter_instruction(&self) -> Option<&str> {
        self.operations.iter().find_map(|op| match op.kind() {
            OperationKind::FilterColumns(_) => op.original_instruction(),
            _ => None,
        })
    }
}
