use time::OffsetDateTime;
use time::macros::format_description;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const ELLIPSIS: &str = "...";

/// Greedy word wrap per paragraph. Words wider than `width` are cut and marked with `...`.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(ELLIPSIS.len() + 1);
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        if paragraph.width() <= width {
            lines.push(paragraph.to_string());
            continue;
        }

        let mut line = String::new();
        for word in paragraph.split(' ').filter(|word| !word.is_empty()) {
            if line.width() + word.width() + 1 <= width {
                if !line.is_empty() {
                    line.push(' ');
                }
                line.push_str(word);
                continue;
            }

            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            if word.width() > width {
                line = take_prefix_width(word, width - ELLIPSIS.len()).to_string();
                line.push_str(ELLIPSIS);
            } else {
                line = word.to_string();
            }
        }
        if !line.is_empty() {
            lines.push(line);
        }
    }

    lines
}

pub fn take_prefix_width(text: &str, max_width: usize) -> &str {
    let mut width = 0usize;
    for (idx, ch) in text.char_indices() {
        let w = ch.width().unwrap_or(0);
        if width + w > max_width {
            return &text[..idx];
        }
        width += w;
    }
    text
}

pub fn truncate_words(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        return text.to_string();
    }
    let mut out = words[..max_words].join(" ");
    out.push_str(ELLIPSIS);
    out
}

/// First `max_chars` characters with newlines flattened to spaces.
pub fn flatten_prefix(text: &str, max_chars: usize) -> String {
    text.chars()
        .take(max_chars)
        .map(|ch| if ch == '\n' || ch == '\r' { ' ' } else { ch })
        .collect()
}

pub fn relative_time(at: OffsetDateTime, now: OffsetDateTime) -> String {
    let minutes = (now - at).whole_minutes().max(0);
    let hours = minutes / 60;
    let days = hours / 24;

    if minutes < 60 {
        format!("{minutes}m ago")
    } else if hours < 24 {
        format!("{hours}h ago")
    } else if days < 7 {
        format!("{days}d ago")
    } else {
        at.format(format_description!("[year]-[month]-[day]"))
            .unwrap_or_default()
    }
}
