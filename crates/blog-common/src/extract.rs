/// Locating a JSON object inside free-form model output.
///
/// Models asked to "return only JSON" still wrap it in prose or code fences. A fenced
/// block tagged `json` is preferred; otherwise the first balanced `{...}` span is taken.
use regex::Regex;

/// Returns the candidate JSON text, or `None` if nothing object-like was found.
///
/// The result is not validated; callers parse it and treat a parse failure as terminal.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let fenced_re = Regex::new(r"(?is)```json\s*(.+?)```").expect("valid regex");
    if let Some(caps) = fenced_re.captures(text) {
        return caps.get(1).map(|m| m.as_str().trim());
    }
    balanced_object(text)
}

/// First balanced `{...}` span, found with a depth scan that skips braces inside
/// JSON string literals.
pub fn balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth: usize = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + ch.len_utf8();
                    return Some(&text[start..end]);
                }
            }
            _ => {}
        }
    }
    None
}
