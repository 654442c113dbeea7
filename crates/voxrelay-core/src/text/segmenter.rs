//! Sentence segmentation for synthesis.

/// Split a ready chunk into sentence units.
///
/// A sentence ends at `.`, `!` or `?` when the next character is
/// whitespace. Units are trimmed and empty ones dropped, so an empty or
/// whitespace-only chunk yields no units.
#[must_use]
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut units = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        if !matches!(ch, '.' | '!' | '?') {
            continue;
        }
        if let Some(&(next_idx, next)) = chars.peek() {
            if next.is_whitespace() {
                push_unit(&mut units, &text[start..next_idx]);
                start = next_idx;
            }
        } else {
            push_unit(&mut units, &text[start..=idx]);
            start = text.len();
        }
    }

    if start < text.len() {
        push_unit(&mut units, &text[start..]);
    }

    units
}

fn push_unit(units: &mut Vec<String>, raw: &str) {
    let unit = raw.trim();
    if !unit.is_empty() {
        units.push(unit.to_string());
    }
}
