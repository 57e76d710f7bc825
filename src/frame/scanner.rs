//! Boundary scanner for objects concatenated without a separator
//!
//! Upstream sometimes emits `{...}{...}` on a single line. The scanner walks
//! the line once, tracking brace depth and JSON string state, and cuts only
//! where a top-level object closes and the next one opens. A `}{` inside a
//! string value, or in plain text that never opened an object, is left alone.

/// Split a line into candidate fragments at top-level `}{` boundaries.
///
/// Concatenating the returned fragments always reproduces `line` exactly,
/// including any whitespace between objects.
#[must_use]
pub fn split_concatenated(line: &str) -> Vec<&str> {
    let mut fragments = Vec::new();
    let mut rest = line;

    while let Some(cut) = next_boundary(rest) {
        let (head, tail) = rest.split_at(cut);
        fragments.push(head);
        rest = tail;
    }
    fragments.push(rest);
    fragments
}

/// Byte offset just past the first top-level object in `text`, if another
/// object follows it.
fn next_boundary(text: &str) -> Option<usize> {
    let mut depth: usize = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in text.char_indices() {
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
            '"' if depth > 0 => in_string = true,
            '{' => depth += 1,
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    let end = idx + ch.len_utf8();
                    let (_, after) = text.split_at(end);
                    if after.trim_start().starts_with('{') {
                        return Some(end);
                    }
                    // A complete object with trailing non-object text stays whole.
                    return None;
                }
            }
            _ => {}
        }
    }
    None
}
