/// Turn arbitrary text into a lowercase URL slug.
///
/// Whitespace runs become a single hyphen, anything outside `[a-z0-9-]` is dropped,
/// repeated hyphens collapse and leading/trailing hyphens are removed. Empty input
/// (or input with nothing sluggable in it) yields an empty string.
pub fn slugify(s: &str) -> String {
    let lowered = s.trim().to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut pending_dash = false;
    for ch in lowered.chars() {
        if ch.is_whitespace() || ch == '-' {
            pending_dash = true;
        } else if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(ch);
        }
        // Stripped characters leave any pending hyphen untouched, so "a - ! - b" is "a-b".
    }
    out
}
