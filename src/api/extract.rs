//! Prompt text extraction
//!
//! Clients embed diagram and plot sources inside a free-form prompt, usually
//! as a Markdown code block. These helpers cut the source back out.

/// Text between the first `start` marker and the next `end` marker after it
///
/// Returns `None` when either marker is missing.
pub(super) fn between_markers<'a>(text: &'a str, start: &str, end: &str) -> Option<&'a str> {
    if start.is_empty() || end.is_empty() {
        return None;
    }
    let begin = text.find(start)? + start.len();
    let rest = &text[begin..];
    let stop = rest.find(end)?;
    Some(&rest[..stop])
}

/// Marker-delimited text, or the whole prompt when the markers are absent
pub fn between_markers_or_all<'a>(text: &'a str, start: &str, end: &str) -> &'a str {
    between_markers(text, start, end).unwrap_or(text)
}

/// Strip a surrounding Markdown code fence
///
/// A leading fence line (with an optional language tag) and a trailing
/// fence are removed; text without fences comes back trimmed.
pub fn strip_code_fences(text: &str) -> &str {
    let mut body = text.trim();

    if let Some(rest) = body.strip_prefix("```") {
        body = match rest.find('\n') {
            Some(newline) => &rest[newline + 1..],
            // A single line like "```r = 1```" has no language tag
            None => rest,
        };
    }
    if let Some(rest) = body.trim_end().strip_suffix("```") {
        body = rest;
    }

    body.trim()
}
