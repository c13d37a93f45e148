//! Turns untrusted model text into an [`OperationPlan`].
//!
//! Strategies run in order, each only when the previous one produced nothing:
//! fence stripping, direct parse, textual repair, function-call unwrapping and
//! finally regex field extraction. Nothing here returns an error to the caller.

pub mod extract;
pub mod fence;
pub mod repair;

use crate::model::wire::{self, ParsedPlan};
use crate::model::{OperationPlan, Warning};
use serde::Serialize;
use serde_json::Value;
use strum::Display;

pub const PLAN_UNRECOVERABLE_SUMMARY: &str = "plan could not be recovered";
pub const SUMMARY_PLACEHOLDER: &str = "could not parse summary from model response";
pub const ANALYSIS_PLACEHOLDER: &str = "could not parse analysis from model response";

pub const WARN_RECOVERED_PLAN: &str = "WARN_RECOVERED_PLAN";
pub const WARN_UNRECOVERABLE_PLAN: &str = "WARN_UNRECOVERABLE_PLAN";

const DEFAULT_MAX_UNWRAP_DEPTH: usize = 3;

/// JSON pointers at which tool/function-call wrappers carry the real payload.
const CALL_PAYLOAD_POINTERS: &[&str] = &[
    "/function_call/arguments",
    "/tool_calls/0/function/arguments",
    "/function/arguments",
    "/arguments",
    "/choices/0/message/tool_calls/0/function/arguments",
    "/choices/0/message/function_call/arguments",
    "/choices/0/message/content",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecoveryStage {
    Direct,
    Repaired,
    Unwrapped,
    Extracted,
    Unrecoverable,
}

/// A plan obtained by anything other than a clean parse.
#[derive(Debug, Clone)]
pub struct RecoveredPlan {
    pub plan: OperationPlan,
    pub stage: RecoveryStage,
    pub warnings: Vec<Warning>,
}

impl RecoveredPlan {
    pub fn is_unrecoverable(&self) -> bool {
        self.stage == RecoveryStage::Unrecoverable
    }
}

/// `Ok` for a clean parse, `Err` for a recovered one. Both carry a plan.
pub type SanitizeResult = Result<OperationPlan, RecoveredPlan>;

pub trait PlanOutcome {
    fn plan(&self) -> &OperationPlan;
    fn into_plan(self) -> OperationPlan;
    fn is_clean(&self) -> bool;
    fn stage(&self) -> RecoveryStage;
    fn warnings(&self) -> &[Warning];
}

impl PlanOutcome for SanitizeResult {
    fn plan(&self) -> &OperationPlan {
        match self {
            Ok(plan) => plan,
            Err(recovered) => &recovered.plan,
        }
    }

    fn into_plan(self) -> OperationPlan {
        match self {
            Ok(plan) => plan,
            Err(recovered) => recovered.plan,
        }
    }

    fn is_clean(&self) -> bool {
        self.is_ok()
    }

    fn stage(&self) -> RecoveryStage {
        match self {
            Ok(_) => RecoveryStage::Direct,
            Err(recovered) => recovered.stage,
        }
    }

    fn warnings(&self) -> &[Warning] {
        match self {
            Ok(_) => &[],
            Err(recovered) => &recovered.warnings,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisResponse {
    pub analysis: String,
    pub highlights: Vec<String>,
    pub recommendations: Vec<String>,
    pub recovered: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct ContentSanitizer {
    max_unwrap_depth: usize,
}

impl Default for ContentSanitizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_UNWRAP_DEPTH)
    }
}

pub fn sanitize(raw: &str) -> SanitizeResult {
    ContentSanitizer::default().sanitize(raw)
}

pub fn sanitize_analysis(raw: &str) -> AnalysisResponse {
    ContentSanitizer::default().sanitize_analysis(raw)
}

impl ContentSanitizer {
    pub fn new(max_unwrap_depth: usize) -> Self {
        Self { max_unwrap_depth }
    }

    pub fn sanitize(&self, raw: &str) -> SanitizeResult {
        let text = fence::strip_fences(raw);

        if let Some((value, stage)) = self.locate(text, is_plan_document, 0) {
            match wire::plan_from_value(&value) {
                Ok(parsed) => return finish(parsed, stage),
                Err(err) => {
                    tracing::debug!(error = %err, "plan-shaped document did not convert");
                }
            }
        }

        let recovered = extract_plan(text);
        if recovered.is_unrecoverable() {
            tracing::warn!(
                chars = raw.chars().count(),
                "model response held no recoverable plan"
            );
        } else {
            tracing::info!(
                operations = recovered.plan.operations.len(),
                "plan recovered by field extraction"
            );
        }
        Err(recovered)
    }

    pub fn sanitize_analysis(&self, raw: &str) -> AnalysisResponse {
        let text = fence::strip_fences(raw);

        if let Some((value, stage)) = self.locate(text, is_analysis_document, 0) {
            let analysis = value
                .get("analysis")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .trim()
                .to_string();
            return AnalysisResponse {
                analysis,
                highlights: string_items(&value, &["highlights", "insights"]),
                recommendations: string_items(&value, &["recommendations", "suggestions"]),
                recovered: stage != RecoveryStage::Direct,
            };
        }

        if let Some(analysis) = extract::string_field(text, "analysis") {
            let highlights = first_non_empty(text, &["highlights", "insights"]);
            let recommendations = first_non_empty(text, &["recommendations", "suggestions"]);
            return AnalysisResponse {
                analysis,
                highlights,
                recommendations,
                recovered: true,
            };
        }

        let plain = text.trim();
        let analysis = if !plain.is_empty() && !plain.contains('{') {
            plain.to_string()
        } else {
            ANALYSIS_PLACEHOLDER.to_string()
        };
        AnalysisResponse {
            analysis,
            highlights: Vec::new(),
            recommendations: Vec::new(),
            recovered: true,
        }
    }

    /// Direct parse, then repaired parse, unwrapping call payloads after either.
    fn locate(
        &self,
        text: &str,
        accept: fn(&Value) -> bool,
        depth: usize,
    ) -> Option<(Value, RecoveryStage)> {
        if let Some(value) = parse_json_value(text) {
            if accept(&value) {
                return Some((value, RecoveryStage::Direct));
            }
            if let Some(inner) = self.unwrap_payload(&value, accept, depth) {
                return Some((inner, RecoveryStage::Unwrapped));
            }
        }

        let repaired = repair::repair(text);
        if let Some(value) = parse_json_value(&repaired) {
            if accept(&value) {
                return Some((value, RecoveryStage::Repaired));
            }
            if let Some(inner) = self.unwrap_payload(&value, accept, depth) {
                return Some((inner, RecoveryStage::Unwrapped));
            }
        }
        None
    }

    fn unwrap_payload(&self, value: &Value, accept: fn(&Value) -> bool, depth: usize) -> Option<Value> {
        if depth >= self.max_unwrap_depth {
            return None;
        }
        let payload = call_payload(value)?;
        match payload {
            Value::String(text) => self
                .locate(fence::strip_fences(text), accept, depth + 1)
                .map(|(inner, _)| inner),
            Value::Object(_) if accept(payload) => Some(payload.clone()),
            Value::Object(_) => self.unwrap_payload(payload, accept, depth + 1),
            _ => None,
        }
    }
}

fn finish(parsed: ParsedPlan, stage: RecoveryStage) -> SanitizeResult {
    // normalization notes count as recovery
    if stage == RecoveryStage::Direct && parsed.is_clean() && parsed.warnings.is_empty() {
        tracing::debug!(operations = parsed.plan.operations.len(), "plan parsed cleanly");
        return Ok(parsed.plan);
    }
    tracing::info!(
        stage = %stage,
        skipped = parsed.skipped,
        operations = parsed.plan.operations.len(),
        "plan recovered"
    );
    let mut warnings = parsed.warnings;
    warnings.push(Warning::new(
        WARN_RECOVERED_PLAN,
        format!("Model response needed recovery (stage: {stage})"),
    ));
    Err(RecoveredPlan {
        plan: parsed.plan,
        stage,
        warnings,
    })
}

fn extract_plan(text: &str) -> RecoveredPlan {
    let summary = extract::string_field(text, "summary");
    let mut objects = extract::array_objects(text, "operations");
    if objects.is_empty() {
        objects = extract::array_objects(text, "steps");
    }

    let mut warnings = Vec::new();
    let mut operations = Vec::new();
    for (idx, object) in objects.iter().enumerate() {
        let value = parse_json_value(object).or_else(|| parse_json_value(&repair::repair(object)));
        let converted = value
            .ok_or_else(|| "record is not valid JSON".to_string())
            .and_then(|value| {
                wire::operation_from_value(&value, &mut warnings).map_err(|e| e.to_string())
            });
        match converted {
            Ok(op) => operations.push(op),
            Err(reason) => warnings.push(Warning::new(
                wire::WARN_OPERATION_SKIPPED,
                format!("Skipped operation {}: {}", idx + 1, reason),
            )),
        }
    }

    if summary.is_none() && objects.is_empty() {
        warnings.push(Warning::new(
            WARN_UNRECOVERABLE_PLAN,
            "No summary or operations could be recovered from the model response",
        ));
        return RecoveredPlan {
            plan: OperationPlan::empty(PLAN_UNRECOVERABLE_SUMMARY),
            stage: RecoveryStage::Unrecoverable,
            warnings,
        };
    }

    warnings.push(Warning::new(
        WARN_RECOVERED_PLAN,
        "Model response was not valid JSON; fields were extracted individually",
    ));
    RecoveredPlan {
        plan: OperationPlan::new(
            summary.unwrap_or_else(|| SUMMARY_PLACEHOLDER.to_string()),
            operations,
        ),
        stage: RecoveryStage::Extracted,
        warnings,
    }
}

/// Whole text first, then the first balanced object embedded in prose.
fn parse_json_value(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Some(value);
    }
    let span = fence::first_object_span(text)?;
    serde_json::from_str::<Value>(span).ok()
}

fn is_plan_document(value: &Value) -> bool {
    value.get("operations").is_some() || value.get("steps").is_some()
}

fn is_analysis_document(value: &Value) -> bool {
    value.get("analysis").and_then(Value::as_str).is_some()
}

fn call_payload(value: &Value) -> Option<&Value> {
    if value.is_string() {
        return Some(value);
    }
    CALL_PAYLOAD_POINTERS
        .iter()
        .find_map(|pointer| value.pointer(pointer))
        .filter(|payload| payload.is_string() || payload.is_object())
}

fn string_items(value: &Value, keys: &[&str]) -> Vec<String> {
    keys.iter()
        .find_map(|key| value.get(*key).and_then(Value::as_array))
        .map(|items| {
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.trim().to_string()),
                    Value::Null => None,
                    other => Some(other.to_string()),
                })
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn first_non_empty(text: &str, keys: &[&str]) -> Vec<String> {
    keys.iter()
        .map(|key| extract::array_strings(text, key))
        .find(|items| !items.is_empty())
        .unwrap_or_default()
}
