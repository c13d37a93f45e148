mod support;

use anyhow::Result;
use assert_matches::assert_matches;
use serde_json::json;
use sheetplan::model::wire::{
    WARN_ALIAS_TYPE, WARN_INLINE_PARAMS, WARN_LEGACY_STEPS, WARN_OPERATION_SKIPPED,
    plan_from_value,
    plan_json_schema,
};
use sheetplan::model::{Comparator, OperationKind, OperationType, RowRange};
use sheetplan::sanitize::{
    ANALYSIS_PLACEHOLDER, ContentSanitizer, PLAN_UNRECOVERABLE_SUMMARY, PlanOutcome,
    RecoveryStage, sanitize, sanitize_analysis,
};
use sheetplan::executor::execute;
use support::sheet_from;

fn full_plan_json() -> serde_json::Value {
    json!({
        "summary": "Keep the key columns, drop test rows and sort by amount",
        "operations": [
            {
                "type": "filter_columns",
                "params": {"include": ["订单号", "金额", "订单提交时间"]},
                "original_instruction": "只保留订单号、金额、订单提交时间"
            },
            {"type": "remove_rows", "params": {"ranges": [[2, 3], [7, 7]]}},
            {"type": "filter_rows", "params": {"column": "金额", "comparator": "gte", "value": 100}},
            {"type": "sort", "params": {"column": "金额", "ascending": false}},
            {"type": "rename_columns", "params": {"mapping": {"金额": "Amount"}}},
            {
                "type": "transform_data",
                "params": {
                    "operations": [{"type": "format_date", "column": "订单提交时间"}],
                    "skip_header": true
                }
            }
        ]
    })
}

#[test]
fn well_formed_plan_parses_cleanly_and_round_trips() -> Result<()> {
    let raw = serde_json::to_string(&full_plan_json())?;
    let parsed = sanitize(&raw);
    assert!(parsed.is_clean());
    let plan = parsed.into_plan();
    assert_eq!(plan.operations.len(), 6);

    let types: Vec<OperationType> = plan.operations.iter().map(|op| op.op_type()).collect();
    assert_eq!(
        types,
        vec![
            OperationType::FilterColumns,
            OperationType::RemoveRows,
            OperationType::FilterRows,
            OperationType::Sort,
            OperationType::RenameColumns,
            OperationType::TransformData,
        ]
    );
    assert_eq!(
        plan.column_filter_instruction(),
        Some("只保留订单号、金额、订单提交时间")
    );

    let reserialized = plan.to_json()?;
    let again = sanitize(&reserialized);
    assert!(again.is_clean());
    assert_eq!(again.into_plan(), plan);
    Ok(())
}

#[test]
fn typed_params_are_read_from_wire_shapes() {
    let raw = serde_json::to_string(&full_plan_json()).unwrap();
    let plan = sanitize(&raw).into_plan();

    assert_matches!(plan.operations[1].kind(), OperationKind::RemoveRows(p) => {
        assert_eq!(p.ranges, vec![RowRange::new(2, 3), RowRange::single(7)]);
    });
    assert_matches!(plan.operations[2].kind(), OperationKind::FilterRows(p) => {
        assert_eq!(p.comparator, Comparator::Gte);
        assert_eq!(p.value, "100");
    });
    assert_matches!(plan.operations[3].kind(), OperationKind::Sort(p) => {
        assert!(!p.ascending);
    });
    assert!(plan.has_format_date());
}

#[test]
fn fenced_plan_is_unwrapped_without_recovery() {
    let raw = "```json\n{\"summary\": \"Sort\", \"operations\": [{\"type\": \"sort\", \"params\": {\"column\": \"A\"}}]}\n```";
    let parsed = sanitize(raw);
    assert!(parsed.is_clean());
    assert_eq!(parsed.plan().summary, "Sort");
}

#[test]
fn prose_around_the_object_is_ignored() {
    let raw = "Sure! Here is the plan you asked for:\n{\"summary\": \"Sort\", \"operations\": []}\nLet me know if you need more.";
    let parsed = sanitize(raw);
    assert!(parsed.is_clean());
    assert!(parsed.plan().is_empty());
}

#[test]
fn stray_quotes_inside_a_fenced_plan_are_repaired() {
    let raw = "```json\n{\"summary\": \"Keep the \"VIP\" customers\", \"operations\": [{\"type\": \"filter_rows\", \"params\": {\"column\": \"等级\", \"comparator\": \"eq\", \"value\": \"VIP\"}}]}\n```";
    let parsed = sanitize(raw);
    assert!(!parsed.is_clean());
    assert_eq!(parsed.stage(), RecoveryStage::Repaired);
    let plan = parsed.into_plan();
    assert_eq!(plan.summary, "Keep the \"VIP\" customers");
    assert_eq!(plan.operations.len(), 1);
}

#[test]
fn bare_keys_and_trailing_commas_are_repaired() {
    let raw = "{summary: \"Drop rows\", operations: [{type: \"remove_rows\", params: {ranges: [[1, 2]],},},],}";
    let parsed = sanitize(raw);
    assert_eq!(parsed.stage(), RecoveryStage::Repaired);
    assert_eq!(parsed.plan().operations.len(), 1);
}

#[test]
fn function_call_arguments_are_the_real_payload() {
    let wrapper = json!({
        "function_call": {
            "name": "propose_plan",
            "arguments": "{\"summary\": \"Rename\", \"operations\": [{\"type\": \"rename_columns\", \"params\": {\"mapping\": {\"a\": \"b\"}}}]}"
        }
    });
    let parsed = sanitize(&wrapper.to_string());
    assert_eq!(parsed.stage(), RecoveryStage::Unwrapped);
    assert_eq!(parsed.plan().summary, "Rename");
    assert_eq!(parsed.plan().operations.len(), 1);

    let tool_call = json!({
        "tool_calls": [{
            "type": "function",
            "function": {"name": "plan", "arguments": {"summary": "Obj", "operations": []}}
        }]
    });
    let parsed = sanitize(&tool_call.to_string());
    assert_eq!(parsed.stage(), RecoveryStage::Unwrapped);
    assert_eq!(parsed.plan().summary, "Obj");
}

#[test]
fn unwrapping_stops_at_the_depth_bound() {
    let inner = json!({"summary": "deep", "operations": []}).to_string();
    let level1 = json!({"arguments": inner}).to_string();
    let level2 = json!({"arguments": level1}).to_string();
    let level3 = json!({"arguments": level2}).to_string();

    let shallow = ContentSanitizer::new(2).sanitize(&level3);
    assert!(shallow.plan().summary != "deep");

    let deep = ContentSanitizer::new(3).sanitize(&level3);
    assert_eq!(deep.plan().summary, "deep");
}

#[test]
fn truncated_response_falls_back_to_field_extraction() {
    let raw = r#"Here you go: {"summary": "Sort by amount", "operations": [{"type": "sort", "params": {"column": "金额", "order": "desc"}}, {"type": "sort", "params": {"column": }]"#;
    let parsed = sanitize(raw);
    assert_eq!(parsed.stage(), RecoveryStage::Extracted);
    let plan = parsed.into_plan();
    assert_eq!(plan.summary, "Sort by amount");
    assert_eq!(plan.operations.len(), 1);
    assert_matches!(plan.operations[0].kind(), OperationKind::Sort(p) => {
        assert_eq!(p.column, "金额");
        assert!(!p.ascending);
    });
}

#[test]
fn unrecoverable_text_yields_placeholder_plan() {
    let parsed = sanitize("I'm sorry, I can't help with that spreadsheet.");
    assert_eq!(parsed.stage(), RecoveryStage::Unrecoverable);
    assert_matches!(&parsed, Err(recovered) if recovered.is_unrecoverable());
    let plan = parsed.into_plan();
    assert_eq!(plan.summary, PLAN_UNRECOVERABLE_SUMMARY);
    assert!(plan.is_empty());
}

#[test]
fn bad_records_are_skipped_and_reported() {
    let raw = json!({
        "summary": "Mixed",
        "operations": [
            {"type": "sort", "params": {"column": "A"}},
            {"type": "pivot", "params": {}},
            {"type": "remove_rows", "params": {"ranges": ["x-y"]}}
        ]
    })
    .to_string();
    let parsed = sanitize(&raw);
    assert!(!parsed.is_clean());
    assert_eq!(parsed.stage(), RecoveryStage::Direct);
    let skipped = parsed
        .warnings()
        .iter()
        .filter(|w| w.code == WARN_OPERATION_SKIPPED)
        .count();
    assert_eq!(skipped, 2);
    assert_eq!(parsed.plan().operations.len(), 1);
}

#[test]
fn aliases_and_lenient_shapes_are_normalized_with_warnings() -> Result<()> {
    let value = json!({
        "summary": "legacy",
        "steps": [
            {"type": "deleteRows", "params": {"rows": [2, "4-5"]}},
            {"type": "RenameColumns", "params": {"mapping": [{"old": "a", "new": "b"}]}},
            {"type": "filter_columns", "params": {"columns": "A, B、C"}}
        ]
    });
    let parsed = plan_from_value(&value)?;
    assert!(parsed.is_clean());
    assert!(parsed.warnings.iter().any(|w| w.code == WARN_LEGACY_STEPS));
    assert_eq!(
        parsed
            .warnings
            .iter()
            .filter(|w| w.code == WARN_ALIAS_TYPE)
            .count(),
        2
    );

    let ops = &parsed.plan.operations;
    assert_matches!(ops[0].kind(), OperationKind::RemoveRows(p) => {
        assert_eq!(p.ranges, vec![RowRange::single(2), RowRange::new(4, 5)]);
    });
    assert_matches!(ops[1].kind(), OperationKind::RenameColumns(p) => {
        assert_eq!(p.mapping, vec![("a".to_string(), "b".to_string())]);
    });
    assert_matches!(ops[2].kind(), OperationKind::FilterColumns(p) => {
        let include: Vec<&str> = p.include.as_ref().unwrap().iter().map(String::as_str).collect();
        assert_eq!(include, vec!["A", "B", "C"]);
    });
    Ok(())
}

#[test]
fn drop_style_alias_excludes_its_columns() {
    let raw = json!({
        "summary": "Drop B",
        "operations": [{"type": "drop_columns", "params": {"columns": ["B"]}}]
    })
    .to_string();
    let parsed = sanitize(&raw);
    assert!(parsed.warnings().iter().any(|w| w.code == WARN_ALIAS_TYPE));
    let plan = parsed.into_plan();
    assert_matches!(plan.operations[0].kind(), OperationKind::FilterColumns(p) => {
        assert!(p.include.is_none());
        let exclude: Vec<&str> = p.exclude.as_ref().unwrap().iter().map(String::as_str).collect();
        assert_eq!(exclude, vec!["B"]);
    });

    let sheet = sheet_from(&["A", "B", "C"], &[[1, 2, 3]]);
    let (out, _) = execute(&sheet, &plan);
    assert_eq!(out.header_names(), vec!["A", "C"]);

    let bare = json!({
        "summary": "Remove B",
        "operations": [{"type": "remove_columns", "params": ["B"]}]
    })
    .to_string();
    let (out, _) = execute(&sheet, sanitize(&bare).plan());
    assert_eq!(out.header_names(), vec!["A", "C"]);
}

#[test]
fn normalization_notes_keep_the_plan_on_the_recovered_arm() {
    let raw = json!({
        "summary": "legacy",
        "steps": [{"type": "sort", "column": "A"}]
    })
    .to_string();
    let parsed = sanitize(&raw);
    assert!(!parsed.is_clean());
    assert_eq!(parsed.stage(), RecoveryStage::Direct);
    let codes: Vec<&str> = parsed.warnings().iter().map(|w| w.code.as_str()).collect();
    assert!(codes.contains(&WARN_LEGACY_STEPS));
    assert!(codes.contains(&WARN_INLINE_PARAMS));
    assert_eq!(parsed.plan().operations.len(), 1);
}

#[test]
fn rename_with_repeated_sources_round_trips() -> Result<()> {
    let raw = json!({
        "summary": "Rename twice",
        "operations": [{
            "type": "rename_columns",
            "params": {"mapping": [{"old": "a", "new": "b"}, {"old": "a", "new": "c"}]}
        }]
    })
    .to_string();
    let plan = sanitize(&raw).into_plan();
    let again = sanitize(&plan.to_json()?);
    assert!(again.is_clean());
    assert_eq!(again.into_plan(), plan);
    assert_matches!(plan.operations[0].kind(), OperationKind::RenameColumns(p) => {
        assert_eq!(p.mapping.len(), 2);
    });
    Ok(())
}

#[test]
fn schema_describes_the_wire_shape() -> Result<()> {
    let schema = serde_json::to_value(plan_json_schema())?;
    let properties = &schema["properties"];
    assert!(properties.get("summary").is_some());
    assert!(properties.get("operations").is_some());
    Ok(())
}

#[test]
fn analysis_response_parses_cleanly() {
    let raw = r#"{"analysis": "Revenue grew 12% month over month.", "highlights": ["Brand A leads"], "recommendations": ["Restock SKU 12"]}"#;
    let parsed = sanitize_analysis(raw);
    assert!(!parsed.recovered);
    assert_eq!(parsed.analysis, "Revenue grew 12% month over month.");
    assert_eq!(parsed.highlights, vec!["Brand A leads"]);
    assert_eq!(parsed.recommendations, vec!["Restock SKU 12"]);
}

#[test]
fn broken_analysis_response_is_recovered() {
    let raw = "```json\n{\"analysis\": \"Sales of \"X\" doubled\", \"insights\": [\"weekend peak\"]}\n```";
    let parsed = sanitize_analysis(raw);
    assert!(parsed.recovered);
    assert_eq!(parsed.analysis, "Sales of \"X\" doubled");
    assert_eq!(parsed.highlights, vec!["weekend peak"]);
}

#[test]
fn analysis_placeholder_when_nothing_is_usable() {
    let parsed = sanitize_analysis("{\"score\": ");
    assert!(parsed.recovered);
    assert_eq!(parsed.analysis, ANALYSIS_PLACEHOLDER);

    let prose = sanitize_analysis("Sales look stable this month.");
    assert_eq!(prose.analysis, "Sales look stable this month.");
}
