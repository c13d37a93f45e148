//! Post-execution check of strict "keep only these columns" instructions.

use crate::config::EngineConfig;
use indexmap::IndexSet;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Five quoted names, optionally separated, followed by a count word such as
/// `这5列` or `5 columns`.
static FIVE_COLUMNS_RE: Lazy<Regex> = Lazy::new(|| {
    let name = r#"["“”]([^"“”]+)["“”]"#;
    let sep = r"\s*[,，、]?\s*";
    let pattern = format!(
        r"(?i){name}{sep}{name}{sep}{name}{sep}{name}{sep}{name}\s*(?:这些|这)?\s*(?:5|五)\s*个?\s*(?:列|字段|columns?|fields?)"
    );
    Regex::new(&pattern).expect("regex")
});

static QUOTED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""([^"]+)"|“([^”]+)”|「([^」]+)」"#).expect("regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationResult {
    pub required_columns_present: bool,
    pub extra_columns_present: bool,
    pub missing: IndexSet<String>,
    pub unexpected: IndexSet<String>,
    /// Names the instruction asked to keep, in instruction order.
    pub expected: IndexSet<String>,
}

impl VerificationResult {
    pub fn is_match(&self) -> bool {
        self.required_columns_present && !self.extra_columns_present
    }

    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !self.missing.is_empty() {
            warnings.push(format!(
                "required columns missing from result: {}",
                join(&self.missing)
            ));
        }
        if self.extra_columns_present {
            warnings.push(format!(
                "result has columns the instruction did not ask for: {}",
                join(&self.unexpected)
            ));
        }
        warnings
    }
}

fn join(names: &IndexSet<String>) -> String {
    names.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

#[derive(Debug, Clone)]
pub struct ResultVerifier {
    inclusion_phrases: Vec<String>,
}

impl Default for ResultVerifier {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl ResultVerifier {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            inclusion_phrases: config
                .inclusion_phrases
                .iter()
                .map(|p| p.to_lowercase())
                .collect(),
        }
    }

    pub fn is_strict_inclusion(&self, instruction: &str) -> bool {
        let lowered = instruction.to_lowercase();
        self.inclusion_phrases
            .iter()
            .any(|phrase| !phrase.is_empty() && lowered.contains(phrase.as_str()))
    }

    /// `None` unless the instruction is a strict inclusion request.
    pub fn verify(&self, instruction: &str, executed_header: &[String]) -> Option<VerificationResult> {
        if !self.is_strict_inclusion(instruction) {
            return None;
        }
        let expected = required_columns(instruction);
        let result = compare(expected, executed_header);
        if !result.is_match() {
            tracing::warn!(
                missing = result.missing.len(),
                unexpected = result.unexpected.len(),
                "result columns do not match the instruction"
            );
        }
        Some(result)
    }
}

/// Column names the instruction asserts. The five-name pattern wins; otherwise
/// every quoted substring counts.
pub fn required_columns(instruction: &str) -> IndexSet<String> {
    if let Some(caps) = FIVE_COLUMNS_RE.captures(instruction) {
        return (1..=5)
            .filter_map(|i| caps.get(i))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }
    QUOTED_RE
        .captures_iter(instruction)
        .filter_map(|caps| caps.iter().skip(1).flatten().next())
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn compare(expected: IndexSet<String>, executed_header: &[String]) -> VerificationResult {
    let header: IndexSet<&str> = executed_header.iter().map(|h| h.trim()).collect();
    let missing: IndexSet<String> = expected
        .iter()
        .filter(|name| !header.contains(name.as_str()))
        .cloned()
        .collect();
    let unexpected: IndexSet<String> = if expected.is_empty() {
        IndexSet::new()
    } else {
        header
            .iter()
            .filter(|h| !h.is_empty() && !expected.contains(**h))
            .map(|h| h.to_string())
            .collect()
    };
    VerificationResult {
        required_columns_present: missing.is_empty(),
        extra_columns_present: !unexpected.is_empty(),
        missing,
        unexpected,
        expected,
    }
}

/// Verifies with the default inclusion vocabulary.
pub fn verify(instruction: &str, executed_header: &[String]) -> Option<VerificationResult> {
    ResultVerifier::default().verify(instruction, executed_header)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_name_pattern_with_ideographic_commas() {
        let names = required_columns("只保留“订单号”、“客户”、“金额”、“日期”、“状态”这5列");
        assert_eq!(
            names.into_iter().collect::<Vec<_>>(),
            vec!["订单号", "客户", "金额", "日期", "状态"]
        );
    }

    #[test]
    fn other_counts_use_quoted_fallback() {
        let names = required_columns(r#"keep only "A", "B" and "C""#);
        assert_eq!(names.into_iter().collect::<Vec<_>>(), vec!["A", "B", "C"]);
    }
}
