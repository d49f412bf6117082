use crate::domain::{Message, SessionMetadata, ToolCall};
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Epoch values above this are read as milliseconds.
const EPOCH_MILLIS_THRESHOLD: i64 = 100_000_000_000;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordEnvelope {
    pub timestamp: Option<OffsetDateTime>,
    pub session_id: Option<String>,
    pub cwd: Option<PathBuf>,
    pub git_branch: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RecordPayload {
    User {
        text: String,
    },
    Assistant {
        text: String,
        thinking: Option<String>,
        tool_calls: Vec<ToolCall>,
    },
    Summary {
        text: String,
    },
    Other {
        kind: String,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct LogRecord {
    pub envelope: RecordEnvelope,
    pub payload: RecordPayload,
}

impl LogRecord {
    /// Converts the record into a transcript message, if it carries any content.
    pub fn to_message(&self) -> Option<Message> {
        let timestamp = self.envelope.timestamp;
        match &self.payload {
            RecordPayload::User { text } => {
                if text.trim().is_empty() {
                    return None;
                }
                Some(Message::User {
                    timestamp,
                    text: text.clone(),
                })
            }
            RecordPayload::Assistant {
                text,
                thinking,
                tool_calls,
            } => {
                if text.is_empty() && thinking.is_none() && tool_calls.is_empty() {
                    return None;
                }
                Some(Message::Assistant {
                    timestamp,
                    text: text.clone(),
                    thinking: thinking.clone(),
                    tool_calls: tool_calls.clone(),
                })
            }
            RecordPayload::Summary { text } => {
                if text.is_empty() {
                    return None;
                }
                Some(Message::Summary {
                    timestamp,
                    text: text.clone(),
                })
            }
            RecordPayload::Other { .. } => None,
        }
    }
}

/// Envelope fields stay untyped so one oddly shaped field never costs the whole line.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRecord {
    #[serde(rename = "type")]
    record_type: Option<Value>,
    timestamp: Option<Value>,
    #[serde(rename = "sessionId")]
    session_id: Option<Value>,
    cwd: Option<Value>,
    #[serde(rename = "gitBranch")]
    git_branch: Option<Value>,
    message: Option<Value>,
    summary: Option<Value>,
}

pub fn parse_log_line(line: &str) -> Result<LogRecord, ParseError> {
    let raw: RawRecord = serde_json::from_str(line)?;

    let envelope = RecordEnvelope {
        timestamp: raw.timestamp.as_ref().and_then(parse_timestamp_value),
        session_id: non_empty_str(raw.session_id.as_ref()),
        cwd: non_empty_str(raw.cwd.as_ref()).map(PathBuf::from),
        git_branch: non_empty_str(raw.git_branch.as_ref()),
    };

    let content = raw.message.as_ref().and_then(|message| message.get("content"));
    let payload = match raw.record_type.as_ref().and_then(Value::as_str) {
        Some("user") => RecordPayload::User {
            text: content.map(user_text).unwrap_or_default(),
        },
        Some("assistant") => assistant_payload(content),
        Some("summary") => RecordPayload::Summary {
            text: raw
                .summary
                .as_ref()
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        },
        other => RecordPayload::Other {
            kind: other.unwrap_or_default().to_string(),
        },
    };

    Ok(LogRecord { envelope, payload })
}

fn part_type(part: &Value) -> Option<&str> {
    part.get("type").and_then(Value::as_str)
}

fn str_field<'a>(part: &'a Value, key: &str) -> Option<&'a str> {
    part.get(key).and_then(Value::as_str)
}

fn user_text(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        Value::Array(parts) => parts
            .iter()
            .filter(|part| part_type(part) == Some("text"))
            .filter_map(|part| str_field(part, "text"))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

fn assistant_payload(content: Option<&Value>) -> RecordPayload {
    let mut texts: Vec<&str> = Vec::new();
    let mut thinking: Option<String> = None;
    let mut tool_calls: Vec<ToolCall> = Vec::new();

    match content {
        Some(Value::String(text)) => texts.push(text.as_str()),
        Some(Value::Array(parts)) => {
            for part in parts {
                match part_type(part) {
                    Some("text") => texts.extend(str_field(part, "text")),
                    Some("thinking") => {
                        let value = str_field(part, "thinking").unwrap_or_default();
                        if !value.is_empty() {
                            thinking = Some(value.to_string());
                        }
                    }
                    Some("tool_use") => tool_calls.push(ToolCall {
                        name: str_field(part, "name").unwrap_or_default().to_string(),
                        input: part.get("input").cloned().unwrap_or(Value::Null),
                    }),
                    _ => {}
                }
            }
        }
        _ => {}
    }

    RecordPayload::Assistant {
        text: texts.join("\n"),
        thinking,
        tool_calls,
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

pub fn parse_timestamp_value(value: &Value) -> Option<OffsetDateTime> {
    match value {
        Value::String(text) => OffsetDateTime::parse(text, &Rfc3339).ok(),
        Value::Number(number) => {
            let raw = number
                .as_i64()
                .or_else(|| number.as_f64().map(|value| value as i64))?;
            let nanos = if raw.abs() > EPOCH_MILLIS_THRESHOLD {
                i128::from(raw) * 1_000_000
            } else {
                i128::from(raw) * 1_000_000_000
            };
            OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()
        }
        _ => None,
    }
}

/// Result of folding every line of one log file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParsedSession {
    pub metadata: SessionMetadata,
    pub messages: Vec<Message>,
    pub skipped_lines: usize,
}

impl ParsedSession {
    pub fn push(&mut self, record: &LogRecord) {
        let envelope = &record.envelope;
        let metadata = &mut self.metadata;
        if metadata.project_path.is_none() {
            metadata.project_path = envelope.cwd.clone();
        }
        if metadata.branch.is_none() {
            metadata.branch = envelope.git_branch.clone();
        }
        if metadata.session_id.is_none() {
            metadata.session_id = envelope.session_id.clone();
        }
        if let Some(timestamp) = envelope.timestamp {
            if metadata.start.is_none() {
                metadata.start = Some(timestamp);
            }
            metadata.end = Some(timestamp);
        }

        if let Some(message) = record.to_message() {
            if !matches!(message, Message::Summary { .. }) {
                metadata.message_count += 1;
            }
            self.messages.push(message);
        }
    }
}

/// Parses newline-delimited records, dropping blank and malformed lines.
pub fn parse_log_records(content: &str) -> (Vec<LogRecord>, usize) {
    let mut records = Vec::new();
    let mut skipped = 0usize;
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_log_line(line) {
            Ok(record) => records.push(record),
            Err(_) => skipped += 1,
        }
    }
    (records, skipped)
}

pub fn parse_session_content(content: &str) -> ParsedSession {
    let (records, skipped_lines) = parse_log_records(content);
    let mut parsed = ParsedSession {
        skipped_lines,
        ..ParsedSession::default()
    };
    for record in &records {
        parsed.push(record);
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn line(value: Value) -> String {
        value.to_string()
    }

    #[test]
    fn assistant_parts_split_into_text_thinking_and_tools() {
        let record = parse_log_line(&line(json!({
            "type": "assistant",
            "timestamp": "2026-02-18T21:45:57.762Z",
            "message": {"content": [
                {"type": "thinking", "thinking": "first idea"},
                {"type": "text", "text": "Hello"},
                {"type": "tool_use", "name": "Read", "input": {"path": "a.rs"}},
                {"type": "thinking", "thinking": ""},
                {"type": "thinking", "thinking": "second idea"},
                {"type": "text", "text": "World"}
            ]}
        })))
        .expect("parse");

        assert_eq!(
            record.payload,
            RecordPayload::Assistant {
                text: "Hello\nWorld".to_string(),
                thinking: Some("second idea".to_string()),
                tool_calls: vec![ToolCall {
                    name: "Read".to_string(),
                    input: json!({"path": "a.rs"}),
                }],
            }
        );
        assert!(record.envelope.timestamp.is_some());
    }

    #[test]
    fn user_parts_keep_only_text() {
        let record = parse_log_line(&line(json!({
            "type": "user",
            "message": {"content": [
                {"type": "tool_result", "tool_use_id": "t1", "content": "ok"},
                {"type": "text", "text": "next"}
            ]}
        })))
        .expect("parse");
        assert_eq!(
            record.payload,
            RecordPayload::User {
                text: "next".to_string()
            }
        );

        let plain = parse_log_line(&line(json!({
            "type": "user",
            "message": {"content": "plain text"}
        })))
        .expect("parse");
        assert_eq!(
            plain.payload,
            RecordPayload::User {
                text: "plain text".to_string()
            }
        );
    }

    #[test]
    fn odd_part_shapes_keep_the_line() {
        let content = [
            line(json!({"type": "assistant", "sessionId": 42, "cwd": "/w/acme",
                "timestamp": "2026-01-01T10:00:00Z",
                "message": {"content": [
                    {"text": "no type"},
                    {"type": "text", "text": null},
                    {"type": "tool_use", "input": {"q": 1}},
                    {"type": "text", "text": "kept"}
                ]}})),
            line(json!({"type": "user", "gitBranch": ["main"],
                "message": {"content": [{"type": "text"}, {"type": "text", "text": "hi"}]}})),
            line(json!({"type": "assistant", "message": {"content": {"text": "object"}}})),
        ]
        .join("\n");

        let parsed = parse_session_content(&content);
        assert_eq!(parsed.skipped_lines, 0);
        assert_eq!(parsed.metadata.message_count, 2);
        assert_eq!(parsed.messages[0].text(), "kept");
        assert_eq!(parsed.messages[0].tool_calls()[0].name, "");
        assert_eq!(parsed.messages[1].text(), "hi");
        assert_eq!(parsed.metadata.session_id, None);
        assert_eq!(parsed.metadata.branch, None);
        assert_eq!(parsed.metadata.project_path, Some(PathBuf::from("/w/acme")));
    }

    #[test]
    fn unknown_kinds_are_other() {
        let record = parse_log_line(r#"{"type":"file-history-snapshot","cwd":"/x"}"#)
            .expect("parse");
        assert_eq!(
            record.payload,
            RecordPayload::Other {
                kind: "file-history-snapshot".to_string()
            }
        );
        assert_eq!(record.envelope.cwd, Some(PathBuf::from("/x")));
        assert!(record.to_message().is_none());
    }

    #[test]
    fn epoch_timestamps_accept_seconds_and_millis() {
        let seconds = parse_timestamp_value(&json!(1_700_000_000)).expect("seconds");
        let millis = parse_timestamp_value(&json!(1_700_000_000_000i64)).expect("millis");
        assert_eq!(seconds, millis);
        assert!(parse_timestamp_value(&json!("not a date")).is_none());
        assert!(parse_timestamp_value(&json!(null)).is_none());
    }

    #[test]
    fn corrupt_lines_do_not_discard_the_rest() {
        let content = [
            line(json!({"type": "user", "sessionId": "s1", "cwd": "/w/acme", "gitBranch": "main",
                "timestamp": "2026-01-01T10:00:00Z", "message": {"content": "hi"}})),
            "{not json".to_string(),
            String::new(),
            line(json!({"type": "assistant", "timestamp": "2026-01-01T10:01:00Z",
                "message": {"content": [{"type": "text", "text": "hello"}]}})),
            line(json!({"type": "user", "message": {"content": [{"type": "tool_result"}]}})),
            line(json!({"type": "summary", "summary": "Greeting"})),
            line(json!({"type": "user", "cwd": "/other", "timestamp": "2026-01-01T10:05:00Z",
                "message": {"content": "   "}})),
        ]
        .join("\n");

        let parsed = parse_session_content(&content);
        assert_eq!(parsed.skipped_lines, 1);
        assert_eq!(parsed.metadata.message_count, 2);
        assert_eq!(parsed.messages.len(), 3);
        assert_eq!(parsed.metadata.session_id.as_deref(), Some("s1"));
        assert_eq!(parsed.metadata.branch.as_deref(), Some("main"));
        assert_eq!(parsed.metadata.project_path, Some(PathBuf::from("/w/acme")));
        assert!(parsed.metadata.start < parsed.metadata.end);
        assert_eq!(parsed.messages[2].text(), "Greeting");
    }
}
