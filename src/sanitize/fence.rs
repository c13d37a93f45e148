const BOM: char = '\u{feff}';

/// Strips a byte-order mark, surrounding whitespace and one fenced code block
/// marker pair. When prose surrounds a fenced block, the block body is returned.
pub fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim_start_matches(BOM).trim();

    if let Some(rest) = trimmed.strip_prefix("```") {
        let body = match rest.find('\n') {
            Some(newline) if is_fence_label(&rest[..newline]) => &rest[newline + 1..],
            _ => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
        };
        let body = body.trim_end();
        let body = body.strip_suffix("```").unwrap_or(body);
        return body.trim();
    }

    if let Some(open) = trimmed.find("```") {
        let after = &trimmed[open + 3..];
        let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after[body_start..];
        if let Some(close) = body.find("```") {
            let inner = body[..close].trim();
            if inner.starts_with('{') || inner.starts_with('[') {
                return inner;
            }
        }
    }

    trimmed
}

fn is_fence_label(line: &str) -> bool {
    let label = line.trim();
    label.is_empty() || label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Slice from the first `{` through its balanced `}`, honoring string literals.
pub fn first_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in text[start..].char_indices() {
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
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fence() {
        let raw = "```json\n{\"summary\": \"x\"}\n```";
        assert_eq!(strip_fences(raw), "{\"summary\": \"x\"}");
    }

    #[test]
    fn strips_bom_and_bare_fence() {
        let raw = "\u{feff}  ```\n{\"a\": 1}\n```  ";
        assert_eq!(strip_fences(raw), "{\"a\": 1}");
    }

    #[test]
    fn takes_fenced_block_out_of_prose() {
        let raw = "Here is the plan:\n```json\n{\"a\": 1}\n```\nLet me know.";
        assert_eq!(strip_fences(raw), "{\"a\": 1}");
    }

    #[test]
    fn leaves_plain_text_alone() {
        assert_eq!(strip_fences("  {\"a\": 1} "), "{\"a\": 1}");
    }

    #[test]
    fn finds_balanced_object_in_prose() {
        let text = "Sure! {\"a\": \"}\", \"b\": {\"c\": 1}} trailing";
        assert_eq!(
            first_object_span(text),
            Some("{\"a\": \"}\", \"b\": {\"c\": 1}}")
        );
    }
}
