//! INI line tokenizer
//!
//! Splits a document into section headers and `key = value` pairs. It knows
//! nothing about which sections or keys exist; that is the codec's job.

/// UTF-8 byte order mark
const BOM: &str = "\u{feff}";

/// One meaningful line of an INI document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    /// Blank line or comment
    Blank,
    /// `[name]`
    Section(&'a str),
    /// `key = value` or `key: value`, both sides trimmed
    Pair {
        /// Key text
        key: &'a str,
        /// Value text, possibly empty
        value: &'a str,
    },
}

/// Cut an inline `;` comment that follows whitespace
fn strip_inline_comment(text: &str) -> &str {
    let bytes = text.as_bytes();
    for i in 1..bytes.len() {
        if bytes[i] == b';' && bytes[i - 1].is_ascii_whitespace() {
            return &text[..i];
        }
    }
    text
}

/// Classify one line. `None` means the line is malformed.
pub fn parse_line(raw: &str) -> Option<Line<'_>> {
    let line = raw.trim();
    if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
        return Some(Line::Blank);
    }

    let line = strip_inline_comment(line).trim_end();

    if let Some(rest) = line.strip_prefix('[') {
        let name = rest.strip_suffix(']')?.trim();
        if name.is_empty() || name.contains(']') {
            return None;
        }
        return Some(Line::Section(name));
    }

    let split = line.find(['=', ':'])?;
    let key = line[..split].trim();
    if key.is_empty() {
        return None;
    }
    let value = line[split + 1..].trim();
    Some(Line::Pair { key, value })
}

/// Iterate lines with their 1-based numbers, skipping a leading BOM
pub fn numbered_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    let text = text.strip_prefix(BOM).unwrap_or(text);
    text.lines().enumerate().map(|(i, line)| (i + 1, line))
}
