//! Bounded textual repairs for almost-JSON. Every pass except the first is aware
//! of string literals so it never rewrites text inside a value.

pub type RepairPass = fn(&str) -> String;

/// Repairs in the order they are applied.
pub const REPAIR_PASSES: &[(&str, RepairPass)] = &[
    ("collapse_escapes", collapse_escapes),
    ("escape_inner_quotes", escape_inner_quotes),
    ("strip_control_chars", strip_control_chars),
    ("quote_bare_keys", quote_bare_keys),
    ("drop_trailing_commas", drop_trailing_commas),
];

pub fn repair(text: &str) -> String {
    REPAIR_PASSES
        .iter()
        .fold(text.to_string(), |acc, (_, pass)| pass(&acc))
}

/// Undoes one level of escaping when the whole payload arrived as an escaped
/// string (`{\"summary\": ...}`), then collapses doubled backslashes.
pub fn collapse_escapes(text: &str) -> String {
    let trimmed = text.trim();
    let looks_escaped = trimmed.starts_with("{\\\"")
        || trimmed.starts_with("\"{")
        || (trimmed.contains("\\\"summary\\\"") && !trimmed.contains("\"summary\""));
    let mut out = if looks_escaped {
        let inner = trimmed
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .unwrap_or(trimmed);
        inner.replace("\\\"", "\"")
    } else {
        text.to_string()
    };
    while out.contains("\\\\\\\\") {
        out = out.replace("\\\\\\\\", "\\\\");
    }
    out
}

/// A quote inside a string closes it only when the next non-blank character is
/// structural (`,` `}` `]` `:`) or the input ends; any other quote is escaped.
/// Raw newlines and tabs inside strings become escapes.
pub fn escape_inner_quotes(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 8);
    let mut in_string = false;
    let mut escaped = false;

    for (i, &ch) in chars.iter().enumerate() {
        if !in_string {
            if ch == '"' {
                in_string = true;
            }
            out.push(ch);
            continue;
        }
        if escaped {
            escaped = false;
            out.push(ch);
            continue;
        }
        match ch {
            '\\' => {
                escaped = true;
                out.push(ch);
            }
            '"' => {
                let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                if matches!(next, None | Some(',' | '}' | ']' | ':')) {
                    in_string = false;
                    out.push('"');
                } else {
                    out.push_str("\\\"");
                }
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

/// Drops code points 0-31 (except tab, newline, carriage return) and 127.
pub fn strip_control_chars(text: &str) -> String {
    text.chars()
        .filter(|&c| {
            let code = c as u32;
            !(code < 32 && !matches!(c, '\t' | '\n' | '\r')) && code != 127
        })
        .collect()
}

/// Quotes identifier-like object keys: `{summary: "x"}` becomes `{"summary": "x"}`.
pub fn quote_bare_keys(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 16);
    let mut in_string = false;
    let mut escaped = false;
    let mut expect_key = false;
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            out.push(ch);
            i += 1;
            continue;
        }

        if expect_key && (ch.is_alphabetic() || ch == '_') {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let ident: String = chars[start..i].iter().collect();
            let mut j = i;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            if chars.get(j) == Some(&':') {
                out.push('"');
                out.push_str(&ident);
                out.push('"');
            } else {
                out.push_str(&ident);
            }
            expect_key = false;
            continue;
        }

        match ch {
            '"' => {
                in_string = true;
                expect_key = false;
            }
            '{' | ',' => expect_key = true,
            c if c.is_whitespace() => {}
            _ => expect_key = false,
        }
        out.push(ch);
        i += 1;
    }
    out
}

/// Removes a comma that directly precedes `}` or `]`.
pub fn drop_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &ch) in chars.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            out.push(ch);
            continue;
        }
        if ch == '"' {
            in_string = true;
        } else if ch == ',' {
            let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
            if matches!(next, Some('}' | ']')) {
                continue;
            }
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_quotes_inside_values() {
        let raw = r#"{"summary": "keep the "VIP" rows", "operations": []}"#;
        let fixed = escape_inner_quotes(raw);
        let value: serde_json::Value = serde_json::from_str(&fixed).unwrap();
        assert_eq!(value["summary"], "keep the \"VIP\" rows");
    }

    #[test]
    fn quotes_bare_keys_outside_strings() {
        let raw = r#"{summary: "a, b: c", operations: []}"#;
        let fixed = quote_bare_keys(raw);
        assert_eq!(fixed, r#"{"summary": "a, b: c", "operations": []}"#);
    }

    #[test]
    fn unescapes_stringified_payload() {
        let raw = r#"{\"summary\": \"x\", \"operations\": []}"#;
        let value: serde_json::Value = serde_json::from_str(&collapse_escapes(raw)).unwrap();
        assert_eq!(value["summary"], "x");
    }

    #[test]
    fn strips_control_characters_but_keeps_newlines() {
        assert_eq!(strip_control_chars("a\u{0001}b\nc\u{007f}"), "ab\nc");
    }

    #[test]
    fn full_repair_handles_combined_damage() {
        let raw = "{summary: \"line one\nline two\", operations: [{\"type\": \"sort\", \"params\": {\"column\": \"A\",},},],}";
        let value: serde_json::Value = serde_json::from_str(&repair(raw)).unwrap();
        assert_eq!(value["summary"], "line one\nline two");
        assert_eq!(value["operations"][0]["type"], "sort");
    }
}
