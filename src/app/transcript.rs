use crate::domain::{Message, MessageKind, flatten_prefix, wrap_text};
use crate::infra::local_time_of_day;

const THINKING_PREVIEW_CHARS: usize = 80;
const BODY_INDENT: &str = "  ";
/// Columns taken by the fixed part of a `═══ USER [hh:mm:ss] ` style header.
const HEADER_PREFIX_WIDTH: usize = 25;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LineRole {
    UserHeader,
    AssistantHeader,
    OtherHeader,
    Thinking,
    Tool,
    Body,
    Blank,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TranscriptLine {
    pub role: LineRole,
    pub text: String,
}

impl TranscriptLine {
    fn new(role: LineRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }
}

/// Renders one message as a block of display lines, always ending in a blank line.
pub fn format_message(message: &Message, width: usize) -> Vec<TranscriptLine> {
    let mut lines = vec![header_line(message, width)];

    if let Some(thinking) = message.thinking() {
        lines.push(TranscriptLine::new(
            LineRole::Thinking,
            format!(
                "[thinking: {}...]",
                flatten_prefix(thinking, THINKING_PREVIEW_CHARS)
            ),
        ));
    }

    for tool in message.tool_calls() {
        lines.push(TranscriptLine::new(
            LineRole::Tool,
            format!("{BODY_INDENT}[Tool: {}]", tool.name),
        ));
    }

    if !message.text().is_empty() {
        for line in wrap_text(message.text(), width) {
            lines.push(TranscriptLine::new(
                LineRole::Body,
                format!("{BODY_INDENT}{line}"),
            ));
        }
    }

    lines.push(TranscriptLine::new(LineRole::Blank, ""));
    lines
}

fn header_line(message: &Message, width: usize) -> TranscriptLine {
    let time = message
        .timestamp()
        .map(|at| format!("[{}]", local_time_of_day(at)))
        .unwrap_or_default();
    let rule_width = width.saturating_sub(HEADER_PREFIX_WIDTH);

    match message.kind() {
        MessageKind::User => TranscriptLine::new(
            LineRole::UserHeader,
            format!("═══ USER {time} {}", "═".repeat(rule_width)),
        ),
        MessageKind::Assistant => TranscriptLine::new(
            LineRole::AssistantHeader,
            format!("─── ASSISTANT {time} {}", "─".repeat(rule_width)),
        ),
        kind => TranscriptLine::new(LineRole::OtherHeader, format!("### {}", kind.label())),
    }
}
