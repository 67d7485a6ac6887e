//! Helpers for parsing free-text service replies.
//!
//! Generated replies arrive with arbitrary emphasis markup and mix
//! numbered and bulleted list styles. This module is the only place that
//! knows how to read them; the stage parsers are built on top of it so the
//! brittle logic stays unit-testable away from the service.

/// Strip emphasis markup and heading markers from a single line so prefix
/// matching sees plain text.
pub fn strip_markup(line: &str) -> String {
    let mut s = line.trim();
    while let Some(rest) = s.strip_prefix('#') {
        s = rest.trim_start();
    }
    s.replace("**", "")
        .replace("__", "")
        .replace('`', "")
        .trim()
        .to_string()
}

/// Extract the content of a bulleted (`-`, `•`, `*`) or numbered
/// (`1.` / `1)`) list item, if the line is one.
pub fn list_item(line: &str) -> Option<String> {
    let s = strip_markup(line);

    for marker in ["- ", "• ", "* "] {
        if let Some(rest) = s.strip_prefix(marker) {
            return Some(rest.trim().to_string());
        }
    }
    // A bare marker with no space still counts when followed by content.
    if let Some(rest) = s.strip_prefix('•') {
        let rest = rest.trim();
        if !rest.is_empty() {
            return Some(rest.to_string());
        }
    }

    // Numbered style: digits then '.' or ')'.
    let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
    if !digits.is_empty() {
        let rest = &s[digits.len()..];
        if let Some(rest) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            let rest = rest.trim();
            if !rest.is_empty() {
                return Some(rest.to_string());
            }
        }
    }

    None
}

/// Split a `Key: value` line, trimming list markers off the key. Returns
/// `None` when there is no colon or the value is empty.
pub fn key_value(line: &str) -> Option<(String, String)> {
    let s = strip_markup(line);
    let (key, value) = s.split_once(':')?;
    let key = key.trim_matches(|c: char| c == '-' || c == '•' || c == '*' || c.is_whitespace());
    let value = value.trim();
    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some((key.to_string(), value.to_string()))
}

/// True when the line is one of the section headers the prompts ask for:
/// it mentions a keyword and is dominated by uppercase letters. The caps
/// requirement keeps content lines that merely mention a header keyword
/// (e.g. "Author Confidence Level: high") from being eaten as headers.
pub fn is_header(line: &str, keywords: &[&str]) -> bool {
    let stripped = strip_markup(line);
    let upper = stripped.to_uppercase();
    if !keywords.iter().any(|k| upper.contains(k)) {
        return false;
    }
    let alpha: Vec<char> = stripped.chars().filter(|c| c.is_alphabetic()).collect();
    if alpha.len() < 3 {
        return false;
    }
    let upper_count = alpha.iter().filter(|c| c.is_uppercase()).count();
    upper_count * 5 >= alpha.len() * 4
}
