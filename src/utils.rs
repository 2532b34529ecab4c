// Text helpers for the loosely formatted numbers on the results page

/// Parses the leading run of ASCII digits after any leading whitespace.
///
/// Trailing text is ignored, so `" 270 votes"` reads as `270`. Returns `None`
/// when there are no leading digits or the value overflows.
pub fn parse_leading_int(text: &str) -> Option<u64> {
    let trimmed = text.trim_start();
    let end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    if end == 0 {
        return None;
    }
    trimmed[..end].parse().ok()
}

/// Drops the first `count` characters (not bytes).
pub fn strip_label(text: &str, count: usize) -> &str {
    match text.char_indices().nth(count) {
        Some((idx, _)) => &text[idx..],
        None => "",
    }
}

/// Removes thousands separators.
pub fn strip_separators(text: &str) -> String {
    text.replace(',', "")
}

/// Returns the second line of a multi-line text block.
pub fn second_line(text: &str) -> Option<&str> {
    text.split('\n').nth(1)
}
