//! Last-resort field extraction straight from the raw text, used when no
//! strategy produced a parseable document.

use once_cell::sync::Lazy;
use regex::Regex;

static STRING_FIELD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""(summary|analysis)"\s*:\s*"((?:[^"\\]|\\.)*)"\s*(?:[,}\]]|$)"#)
        .expect("regex")
});

static LOOSE_STRING_FIELD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)"(summary|analysis)"\s*:\s*"(.*?)"\s*(?:,\s*"[A-Za-z_]+"\s*:|\}\s*$)"#)
        .expect("regex")
});

static ARRAY_FIELD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""(operations|steps|highlights|insights|recommendations|suggestions)"\s*:\s*\["#)
        .expect("regex")
});

/// Value of a string field such as `summary` or `analysis`, unescaped.
///
/// A strict pattern is tried first; the loose one tolerates unescaped quotes by
/// running to the quote that precedes the next key or the closing brace.
pub fn string_field(raw: &str, field: &str) -> Option<String> {
    let strict = STRING_FIELD_RE
        .captures_iter(raw)
        .find(|caps| &caps[1] == field)
        .map(|caps| unescape(&caps[2]));
    let value = strict.or_else(|| {
        LOOSE_STRING_FIELD_RE
            .captures_iter(raw)
            .find(|caps| &caps[1] == field)
            .map(|caps| unescape(&caps[2]))
    })?;
    let value = value.trim().to_string();
    if value.is_empty() { None } else { Some(value) }
}

/// Text of each top-level `{...}` element inside the named array field.
pub fn array_objects<'a>(raw: &'a str, field: &str) -> Vec<&'a str> {
    let Some(open) = ARRAY_FIELD_RE
        .captures_iter(raw)
        .find(|caps| &caps[1] == field)
        .and_then(|caps| caps.get(0))
    else {
        return Vec::new();
    };

    let body = &raw[open.end()..];
    let mut objects = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in body.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(offset);
                }
                depth += 1;
            }
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0
                    && let Some(s) = start.take()
                {
                    objects.push(&body[s..=offset]);
                }
            }
            ']' if depth == 0 => break,
            _ => {}
        }
    }
    objects
}

/// String items of the named array field, in order.
pub fn array_strings(raw: &str, field: &str) -> Vec<String> {
    static ITEM_RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r#""((?:[^"\\]|\\.)*)""#).expect("regex"));

    let Some(open) = ARRAY_FIELD_RE
        .captures_iter(raw)
        .find(|caps| &caps[1] == field)
        .and_then(|caps| caps.get(0))
    else {
        return Vec::new();
    };
    let body = &raw[open.end()..];
    let Some(close) = body.find(']') else {
        return Vec::new();
    };
    ITEM_RE
        .captures_iter(&body[..close])
        .map(|caps| unescape(&caps[1]))
        .filter(|s| !s.trim().is_empty())
        .collect()
}

/// Resolves the escapes JSON allows inside a string literal; unknown escapes are
/// kept verbatim.
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_escaped_summary() {
        let raw = r#"garbage {"summary": "say \"hi\"\nthen go", "operations": [oops"#;
        assert_eq!(
            string_field(raw, "summary").as_deref(),
            Some("say \"hi\"\nthen go")
        );
    }

    #[test]
    fn loose_pattern_tolerates_bare_quotes() {
        let raw = r#"{"analysis": "sales of "A" rose", "score": 3"#;
        assert_eq!(
            string_field(raw, "analysis").as_deref(),
            Some("sales of \"A\" rose")
        );
    }

    #[test]
    fn splits_operation_objects() {
        let raw = r#"{"summary": "x", "operations": [{"type": "sort", "params": {"column": "A"}}, {"type": broken}, {"type": "remove_rows", "params": {"ranges": [[1, 2]]}}]}"#;
        let objects = array_objects(raw, "operations");
        assert_eq!(objects.len(), 3);
        assert!(objects[0].contains("\"sort\""));
        assert!(objects[2].contains("remove_rows"));
    }
}
