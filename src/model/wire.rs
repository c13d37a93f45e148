//! The JSON shape exchanged with the model-calling collaborator:
//!
//! ```json
//! { "summary": "...", "operations": [ { "type": "sort", "params": { ... } } ] }
//! ```
//!
//! `steps` is accepted as a legacy alias of `operations`. Parsing is lenient about
//! spelling and parameter shapes; each normalization is reported as a [`Warning`].

use crate::errors::PlanParseError;
use crate::model::Warning;
use crate::model::plan::{
    Comparator, FilterColumns, FilterRows, Operation, OperationKind, OperationPlan,
    OperationType, RemoveRows, RenameColumns, RowRange, Sort, SubOperation, SubOperationKind,
    TransformData,
};
use crate::model::table::format_number;
use indexmap::{IndexMap, IndexSet};
use schemars::{JsonSchema, Schema, schema_for};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value, json};
use std::str::FromStr;

pub const WARN_ALIAS_TYPE: &str = "WARN_ALIAS_TYPE";
pub const WARN_OPERATION_SKIPPED: &str = "WARN_OPERATION_SKIPPED";
pub const WARN_MISSING_SUMMARY: &str = "WARN_MISSING_SUMMARY";
pub const WARN_INLINE_PARAMS: &str = "WARN_INLINE_PARAMS";
pub const WARN_LEGACY_STEPS: &str = "WARN_LEGACY_STEPS";

pub const MISSING_SUMMARY_PLACEHOLDER: &str = "(summary missing from model response)";

/// Wire form of a plan.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PlanRecord {
    /// One-paragraph description of what the plan does.
    pub summary: String,
    /// Operations applied strictly in order. `steps` is accepted as an alias.
    #[serde(alias = "steps")]
    pub operations: Vec<OperationRecord>,
}

/// Wire form of one operation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OperationRecord {
    /// One of `filter_columns`, `remove_rows`, `filter_rows`, `sort`,
    /// `rename_columns`, `transform_data`.
    #[serde(rename = "type")]
    pub op_type: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default, skip_serializing_if = "is_false")]
    pub auto_generated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_instruction: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// JSON Schema of [`PlanRecord`], suitable for embedding in a model prompt.
pub fn plan_json_schema() -> Schema {
    schema_for!(PlanRecord)
}

#[derive(Debug, Clone)]
pub struct ParsedPlan {
    pub plan: OperationPlan,
    pub warnings: Vec<Warning>,
    /// Operation records that could not be converted.
    pub skipped: usize,
    pub summary_present: bool,
}

impl ParsedPlan {
    pub fn is_clean(&self) -> bool {
        self.skipped == 0 && self.summary_present
    }
}

/// Converts a parsed JSON object into a plan, salvaging every operation record
/// that converts cleanly. Fails only when the value is not a plan-shaped object.
pub fn plan_from_value(value: &Value) -> Result<ParsedPlan, PlanParseError> {
    let Some(obj) = value.as_object() else {
        return Err(PlanParseError::new("plan must be a JSON object"));
    };

    let mut warnings = Vec::new();
    let ops_value = if let Some(ops) = obj.get("operations") {
        ops
    } else if let Some(steps) = obj.get("steps") {
        warnings.push(Warning::new(
            WARN_LEGACY_STEPS,
            "Read operations from legacy 'steps' field",
        ));
        steps
    } else {
        return Err(PlanParseError::new(
            "plan object has neither 'operations' nor 'steps'",
        ));
    };

    let records: Vec<&Value> = match ops_value {
        Value::Array(items) => items.iter().collect(),
        Value::Null => Vec::new(),
        Value::Object(_) => vec![ops_value],
        _ => {
            return Err(PlanParseError::new(
                "'operations' must be an array of objects",
            ));
        }
    };

    let summary = obj
        .get("summary")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    let summary_present = summary.is_some();
    if !summary_present {
        warnings.push(Warning::new(
            WARN_MISSING_SUMMARY,
            "Plan has no summary; using placeholder",
        ));
    }

    let mut operations = Vec::with_capacity(records.len());
    let mut skipped = 0;
    for (idx, record) in records.into_iter().enumerate() {
        match operation_from_value(record, &mut warnings) {
            Ok(op) => operations.push(op),
            Err(err) => {
                skipped += 1;
                warnings.push(Warning::new(
                    WARN_OPERATION_SKIPPED,
                    format!("Skipped operation {}: {}", idx + 1, err),
                ));
            }
        }
    }

    Ok(ParsedPlan {
        plan: OperationPlan::new(
            summary.unwrap_or_else(|| MISSING_SUMMARY_PLACEHOLDER.to_string()),
            operations,
        ),
        warnings,
        skipped,
        summary_present,
    })
}

/// Converts one operation record, accepting params either under `params` or
/// inline next to `type`.
pub fn operation_from_value(
    value: &Value,
    warnings: &mut Vec<Warning>,
) -> Result<Operation, PlanParseError> {
    let Some(obj) = value.as_object() else {
        return Err(PlanParseError::new("operation must be an object"));
    };

    let raw_type = obj
        .get("type")
        .or_else(|| obj.get("op"))
        .or_else(|| obj.get("kind"))
        .or_else(|| obj.get("action"))
        .and_then(Value::as_str)
        .ok_or_else(|| PlanParseError::new("operation requires a string 'type'"))?;

    let (op_type, alias_used) = resolve_operation_type(raw_type)
        .ok_or_else(|| PlanParseError::new(format!("unknown operation type '{raw_type}'")))?;
    if alias_used {
        warnings.push(Warning::new(
            WARN_ALIAS_TYPE,
            format!("Normalized operation type '{raw_type}' to '{op_type}'"),
        ));
    }

    let params = match obj.get("params").or_else(|| obj.get("parameters")) {
        Some(Value::Object(map)) => Value::Object(map.clone()),
        Some(Value::String(text)) => serde_json::from_str::<Value>(text).map_err(|e| {
            PlanParseError::new(format!("params string is not JSON: {e}")).with_kind(op_type.to_string())
        })?,
        Some(Value::Null) | None => {
            let inline: Map<String, Value> = obj
                .iter()
                .filter(|(k, _)| !RECORD_KEYS.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            if !inline.is_empty() {
                warnings.push(Warning::new(
                    WARN_INLINE_PARAMS,
                    format!("Read {op_type} parameters inline from the operation record"),
                ));
            }
            Value::Object(inline)
        }
        Some(Value::Array(columns)) if op_type == OperationType::FilterColumns => {
            json!({ "columns": columns })
        }
        Some(other) => {
            return Err(
                PlanParseError::new(format!("params must be an object, got {other}"))
                    .with_kind(op_type.to_string()),
            );
        }
    };

    let auto_generated = obj
        .get("auto_generated")
        .or_else(|| obj.get("autoGenerated"))
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let original_instruction = obj
        .get("original_instruction")
        .or_else(|| obj.get("originalInstruction"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let params = if op_type == OperationType::FilterColumns
        && is_drop_columns_alias(&to_snake_case(raw_type.trim()))
    {
        route_dropped_columns(params)
    } else {
        params
    };

    let kind = kind_from_params(op_type, params)?;
    Ok(Operation::from_parts(
        kind,
        auto_generated,
        original_instruction,
    ))
}

const RECORD_KEYS: &[&str] = &[
    "type",
    "op",
    "kind",
    "action",
    "params",
    "parameters",
    "auto_generated",
    "autoGenerated",
    "original_instruction",
    "originalInstruction",
    "description",
];

/// Maps a spelled operation type onto its canonical kind. The flag is set when the
/// spelling was not already canonical snake_case.
pub fn resolve_operation_type(raw: &str) -> Option<(OperationType, bool)> {
    let trimmed = raw.trim();
    if let Ok(op_type) = OperationType::from_str(trimmed) {
        return Some((op_type, false));
    }
    let snake = to_snake_case(trimmed);
    let op_type = match snake.as_str() {
        "filter_columns" | "select_columns" | "keep_columns" | "column_filter" => {
            OperationType::FilterColumns
        }
        name if is_drop_columns_alias(name) => OperationType::FilterColumns,
        "remove_rows" | "delete_rows" | "drop_rows" => OperationType::RemoveRows,
        "filter_rows" | "row_filter" | "filter" | "where" => OperationType::FilterRows,
        "sort" | "sort_rows" | "order_by" | "sort_by" => OperationType::Sort,
        "rename_columns" | "rename" | "rename_column" => OperationType::RenameColumns,
        "transform_data" | "transform" | "format_data" | "convert" => OperationType::TransformData,
        _ => return None,
    };
    Some((op_type, true))
}

/// Spellings whose column list names the columns to remove rather than keep.
fn is_drop_columns_alias(snake: &str) -> bool {
    matches!(
        snake,
        "drop_columns" | "remove_columns" | "delete_columns" | "exclude_columns"
    )
}

/// Moves the generic `columns` list of a drop-style filter into `exclude`.
fn route_dropped_columns(params: Value) -> Value {
    let Value::Object(mut map) = params else {
        return params;
    };
    if !map.contains_key("exclude")
        && let Some(columns) = map.remove("columns")
    {
        map.insert("exclude".to_string(), columns);
    }
    Value::Object(map)
}

fn to_snake_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 4);
    for (i, ch) in raw.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 && !out.ends_with('_') {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else if ch == '-' || ch == ' ' {
            out.push('_');
        } else {
            out.push(ch);
        }
    }
    out
}

fn kind_from_params(op_type: OperationType, params: Value) -> Result<OperationKind, PlanParseError> {
    let invalid = |e: serde_json::Error| {
        PlanParseError::new(format!("invalid {op_type} params: {e}")).with_kind(op_type.to_string())
    };

    let kind = match op_type {
        OperationType::FilterColumns => {
            let p: FilterColumnsParams = serde_json::from_value(params).map_err(invalid)?;
            let params = FilterColumns {
                include: p.include.map(|names| names.into_iter().collect()),
                exclude: p.exclude.map(|names| names.into_iter().collect()),
            };
            if params.include.is_none() && params.exclude.is_none() {
                return Err(PlanParseError::new(
                    "filter_columns requires 'include' or 'exclude'",
                )
                .with_kind(op_type.to_string()));
            }
            OperationKind::FilterColumns(params)
        }
        OperationType::RemoveRows => {
            let p: RemoveRowsParams = serde_json::from_value(params).map_err(invalid)?;
            let ranges: Vec<RowRange> = p
                .ranges
                .into_iter()
                .chain(p.rows)
                .map(|r| RowRange::new(r.start, r.end))
                .collect();
            if ranges.is_empty() {
                return Err(
                    PlanParseError::new("remove_rows requires at least one range")
                        .with_kind(op_type.to_string()),
                );
            }
            OperationKind::RemoveRows(RemoveRows { ranges })
        }
        OperationType::FilterRows => {
            let p: FilterRowsParams = serde_json::from_value(params).map_err(invalid)?;
            let comparator = match p.comparator.as_deref() {
                None => Comparator::Eq,
                Some(raw) => Comparator::parse(raw).ok_or_else(|| {
                    PlanParseError::new(format!("unknown comparator '{raw}'")).with_kind(op_type.to_string())
                })?,
            };
            let value = scalar_to_string(&p.value);
            if comparator.needs_value() && p.value.is_null() {
                return Err(PlanParseError::new(format!(
                    "filter_rows comparator '{comparator}' requires a value"
                ))
                .with_kind(op_type.to_string()));
            }
            OperationKind::FilterRows(FilterRows {
                column: p.column,
                comparator,
                value,
            })
        }
        OperationType::Sort => {
            let p: SortParams = serde_json::from_value(params).map_err(invalid)?;
            let ascending = match (p.ascending, p.descending, p.order.as_deref()) {
                (Some(asc), _, _) => asc,
                (None, Some(desc), _) => !desc,
                (None, None, Some(order)) => parse_sort_order(order).ok_or_else(|| {
                    PlanParseError::new(format!("unknown sort order '{order}'")).with_kind(op_type.to_string())
                })?,
                (None, None, None) => true,
            };
            OperationKind::Sort(Sort {
                column: p.column,
                ascending,
            })
        }
        OperationType::RenameColumns => {
            let p: RenameColumnsParams = serde_json::from_value(params).map_err(invalid)?;
            let mapping = match p.mapping {
                MappingInput::Object(map) => map.into_iter().collect(),
                MappingInput::List(pairs) => pairs.into_iter().map(|p| (p.old, p.new)).collect(),
            };
            OperationKind::RenameColumns(RenameColumns { mapping })
        }
        OperationType::TransformData => {
            let p: TransformDataParams = serde_json::from_value(params).map_err(invalid)?;
            let mut operations = Vec::new();
            for sub in p.operations {
                let kind = SubOperationKind::parse(&sub.kind);
                let columns = sub.column.into_iter().chain(sub.columns.unwrap_or_default());
                for column in columns {
                    operations.push(SubOperation {
                        kind: kind.clone(),
                        column,
                    });
                }
            }
            if operations.is_empty() {
                return Err(PlanParseError::new(
                    "transform_data requires at least one sub-operation with a column",
                )
                .with_kind(op_type.to_string()));
            }
            OperationKind::TransformData(TransformData {
                operations,
                skip_header: p.skip_header,
            })
        }
    };
    Ok(kind)
}

fn parse_sort_order(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "asc" | "ascending" | "up" | "升序" => Some(true),
        "desc" | "descending" | "down" | "降序" => Some(false),
        _ => None,
    }
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.as_f64().map(format_number).unwrap_or_else(|| n.to_string()),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct FilterColumnsParams {
    #[serde(
        default,
        alias = "columns",
        alias = "keep",
        alias = "keep_columns",
        alias = "include_columns",
        deserialize_with = "string_list"
    )]
    include: Option<Vec<String>>,
    #[serde(
        default,
        alias = "exclude_columns",
        alias = "drop",
        alias = "drop_columns",
        alias = "remove_columns",
        deserialize_with = "string_list"
    )]
    exclude: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RemoveRowsParams {
    #[serde(default, alias = "range")]
    ranges: Vec<RangeInput>,
    #[serde(default, alias = "row_numbers", alias = "indices")]
    rows: Vec<RangeInput>,
}

#[derive(Debug, Deserialize)]
struct FilterRowsParams {
    #[serde(alias = "field", alias = "col")]
    column: String,
    #[serde(default, alias = "operator", alias = "op", alias = "condition")]
    comparator: Option<String>,
    #[serde(default)]
    value: Value,
}

#[derive(Debug, Deserialize)]
struct SortParams {
    #[serde(alias = "by", alias = "field", alias = "sort_by")]
    column: String,
    #[serde(default)]
    ascending: Option<bool>,
    #[serde(default)]
    descending: Option<bool>,
    #[serde(default, alias = "direction")]
    order: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RenameColumnsParams {
    #[serde(alias = "columns", alias = "renames", alias = "rename")]
    mapping: MappingInput,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MappingInput {
    Object(IndexMap<String, String>),
    List(Vec<RenamePair>),
}

#[derive(Debug, Deserialize)]
struct RenamePair {
    #[serde(alias = "from", alias = "old_name")]
    old: String,
    #[serde(alias = "to", alias = "new_name")]
    new: String,
}

#[derive(Debug, Deserialize)]
struct TransformDataParams {
    #[serde(
        alias = "sub_operations",
        alias = "subOperations",
        alias = "transforms",
        alias = "steps"
    )]
    operations: Vec<SubOperationInput>,
    #[serde(default = "default_true", alias = "skipHeader")]
    skip_header: bool,
}

#[derive(Debug, Deserialize)]
struct SubOperationInput {
    #[serde(rename = "type", alias = "kind", alias = "operation")]
    kind: String,
    #[serde(default, alias = "field")]
    column: Option<String>,
    #[serde(default, deserialize_with = "string_list")]
    columns: Option<Vec<String>>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy)]
struct RangeInput {
    start: usize,
    end: usize,
}

impl<'de> Deserialize<'de> for RangeInput {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        parse_range(&value).map_err(de::Error::custom)
    }
}

fn parse_range(value: &Value) -> Result<RangeInput, String> {
    match value {
        Value::String(text) => {
            let text = text.trim();
            if text.starts_with('-') {
                return Err(format!("row index must be a positive integer, got '{text}'"));
            }
            let parts: Vec<&str> = text
                .split(['-', '~', '到', '至', ':'])
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .collect();
            match parts.as_slice() {
                [single] => {
                    let row = parse_index(single)?;
                    Ok(RangeInput {
                        start: row,
                        end: row,
                    })
                }
                [start, end] => Ok(RangeInput {
                    start: parse_index(start)?,
                    end: parse_index(end)?,
                }),
                _ => Err(format!("cannot read row range from '{text}'")),
            }
        }
        Value::Number(n) => {
            let row = n
                .as_u64()
                .ok_or_else(|| format!("row index must be a positive integer, got {n}"))?
                as usize;
            Ok(RangeInput {
                start: row,
                end: row,
            })
        }
        Value::Array(items) => match items.as_slice() {
            [single] => parse_range(single),
            [start, end] => Ok(RangeInput {
                start: parse_range(start)?.start,
                end: parse_range(end)?.start,
            }),
            _ => Err(format!(
                "row range array must have 1 or 2 items, got {}",
                items.len()
            )),
        },
        Value::Object(map) => {
            let start = map
                .get("start")
                .or_else(|| map.get("from"))
                .ok_or_else(|| "row range object requires 'start'".to_string())?;
            let start = parse_range(start)?.start;
            let end = match map.get("end").or_else(|| map.get("to")) {
                Some(end) => parse_range(end)?.start,
                None => start,
            };
            Ok(RangeInput { start, end })
        }
        other => Err(format!("cannot read row range from {other}")),
    }
}

fn parse_index(raw: &str) -> Result<usize, String> {
    let digits = raw.trim_matches(|c: char| !c.is_ascii_digit());
    digits
        .parse::<usize>()
        .map_err(|_| format!("row index must be a positive integer, got '{raw}'"))
}

fn string_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let Some(value) = value else {
        return Ok(None);
    };
    match value {
        Value::Null => Ok(None),
        Value::String(text) => Ok(Some(
            text.split([',', '，', '、'])
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                Value::Number(n) => Ok(n.to_string()),
                other => Err(de::Error::custom(format!(
                    "column names must be strings, got {other}"
                ))),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        other => Err(de::Error::custom(format!(
            "expected a list of column names, got {other}"
        ))),
    }
}

impl Operation {
    pub fn to_record(&self) -> OperationRecord {
        OperationRecord {
            op_type: self.op_type().to_string(),
            params: params_to_value(self.kind()),
            auto_generated: self.is_auto_generated(),
            original_instruction: self.original_instruction().map(str::to_string),
        }
    }
}

fn params_to_value(kind: &OperationKind) -> Value {
    match kind {
        OperationKind::FilterColumns(p) => {
            let mut map = Map::new();
            if let Some(include) = &p.include {
                map.insert("include".to_string(), set_to_value(include));
            }
            if let Some(exclude) = &p.exclude {
                map.insert("exclude".to_string(), set_to_value(exclude));
            }
            Value::Object(map)
        }
        OperationKind::RemoveRows(p) => json!({
            "ranges": p.ranges.iter().map(|r| json!([r.start, r.end])).collect::<Vec<_>>()
        }),
        OperationKind::FilterRows(p) => json!({
            "column": p.column,
            "comparator": p.comparator.to_string(),
            "value": p.value,
        }),
        OperationKind::Sort(p) => json!({
            "column": p.column,
            "ascending": p.ascending,
        }),
        OperationKind::RenameColumns(p) => json!({
            "mapping": p
                .mapping
                .iter()
                .map(|(old, new)| json!({ "old": old, "new": new }))
                .collect::<Vec<_>>()
        }),
        OperationKind::TransformData(p) => json!({
            "operations": p
                .operations
                .iter()
                .map(|sub| json!({ "type": sub.kind.as_str(), "column": sub.column }))
                .collect::<Vec<_>>(),
            "skip_header": p.skip_header,
        }),
    }
}

fn set_to_value(set: &IndexSet<String>) -> Value {
    Value::Array(set.iter().cloned().map(Value::String).collect())
}

impl Serialize for Operation {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_record().serialize(serializer)
    }
}

impl OperationPlan {
    pub fn to_record(&self) -> PlanRecord {
        PlanRecord {
            summary: self.summary.clone(),
            operations: self.operations.iter().map(Operation::to_record).collect(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.to_record())
    }
}

impl Serialize for OperationPlan {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_record().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_spelling_variants() {
        assert_eq!(
            resolve_operation_type("filter_columns"),
            Some((OperationType::FilterColumns, false))
        );
        assert_eq!(
            resolve_operation_type("FilterColumns"),
            Some((OperationType::FilterColumns, true))
        );
        assert_eq!(
            resolve_operation_type("deleteRows"),
            Some((OperationType::RemoveRows, true))
        );
        assert_eq!(resolve_operation_type("pivot"), None);
    }

    #[test]
    fn range_shapes_are_accepted() {
        let cases = [
            (json!([2, 3]), (2, 3)),
            (json!({"start": 4, "end": 6}), (4, 6)),
            (json!("7-9"), (7, 9)),
            (json!(5), (5, 5)),
            (json!("第3行"), (3, 3)),
        ];
        for (value, (start, end)) in cases {
            let range = parse_range(&value).unwrap();
            assert_eq!((range.start, range.end), (start, end), "{value}");
        }
        assert!(parse_range(&json!(-1)).is_err());
    }

    #[test]
    fn negative_row_strings_are_rejected() {
        assert!(parse_range(&json!("-3")).is_err());
        assert!(parse_range(&json!(" -3 ")).is_err());
        assert!(parse_range(&json!(["-3", 5])).is_err());
        assert!(parse_range(&json!({"start": "-2", "end": 4})).is_err());
    }

    #[test]
    fn drop_style_aliases_resolve_to_column_filter() {
        for raw in ["drop_columns", "removeColumns", "delete-columns"] {
            assert_eq!(
                resolve_operation_type(raw),
                Some((OperationType::FilterColumns, true)),
                "{raw}"
            );
        }
        let routed = route_dropped_columns(json!({"columns": ["B"]}));
        assert_eq!(routed, json!({"exclude": ["B"]}));
        let explicit = route_dropped_columns(json!({"columns": ["A"], "exclude": ["B"]}));
        assert_eq!(explicit, json!({"columns": ["A"], "exclude": ["B"]}));
    }
}
