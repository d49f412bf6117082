use serde_json::Value;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

pub const AGENT_FILE_PREFIX: &str = "agent-";

#[derive(Clone, Debug, PartialEq)]
pub struct ToolCall {
    pub name: String,
    pub input: Value,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MessageKind {
    User,
    Assistant,
    Summary,
}

impl MessageKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Assistant => "ASSISTANT",
            Self::Summary => "SUMMARY",
        }
    }
}

/// One conversational turn lifted out of a session log.
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    User {
        timestamp: Option<OffsetDateTime>,
        text: String,
    },
    Assistant {
        timestamp: Option<OffsetDateTime>,
        text: String,
        thinking: Option<String>,
        tool_calls: Vec<ToolCall>,
    },
    Summary {
        timestamp: Option<OffsetDateTime>,
        text: String,
    },
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::User { .. } => MessageKind::User,
            Self::Assistant { .. } => MessageKind::Assistant,
            Self::Summary { .. } => MessageKind::Summary,
        }
    }

    pub fn timestamp(&self) -> Option<OffsetDateTime> {
        match self {
            Self::User { timestamp, .. }
            | Self::Assistant { timestamp, .. }
            | Self::Summary { timestamp, .. } => *timestamp,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::User { text, .. } | Self::Assistant { text, .. } | Self::Summary { text, .. } => {
                text
            }
        }
    }

    pub fn thinking(&self) -> Option<&str> {
        match self {
            Self::Assistant { thinking, .. } => thinking.as_deref(),
            _ => None,
        }
    }

    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Self::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionMetadata {
    pub project_path: Option<PathBuf>,
    pub branch: Option<String>,
    pub session_id: Option<String>,
    pub start: Option<OffsetDateTime>,
    pub end: Option<OffsetDateTime>,
    pub message_count: usize,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SessionKind {
    Main,
    Agent { agent_id: String },
}

impl SessionKind {
    pub fn from_file_stem(stem: &str) -> Self {
        match stem.strip_prefix(AGENT_FILE_PREFIX) {
            Some(agent_id) => Self::Agent {
                agent_id: agent_id.to_string(),
            },
            None => Self::Main,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SessionRecord {
    pub log_path: PathBuf,
    pub id: String,
    pub kind: SessionKind,
    pub metadata: SessionMetadata,
    pub messages: Vec<Message>,
    pub file_size_bytes: u64,
}

impl SessionRecord {
    pub fn new(
        log_path: PathBuf,
        metadata: SessionMetadata,
        messages: Vec<Message>,
        file_size_bytes: u64,
    ) -> Self {
        let id = file_stem(&log_path);
        let kind = SessionKind::from_file_stem(&id);
        Self {
            log_path,
            id,
            kind,
            metadata,
            messages,
            file_size_bytes,
        }
    }

    pub fn is_agent(&self) -> bool {
        matches!(self.kind, SessionKind::Agent { .. })
    }

    /// Agent id for agent logs, file stem otherwise.
    pub fn display_id(&self) -> &str {
        match &self.kind {
            SessionKind::Agent { agent_id } => agent_id,
            SessionKind::Main => &self.id,
        }
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_kind_comes_from_file_prefix() {
        let record = SessionRecord::new(
            PathBuf::from("/p/agent-xy12.jsonl"),
            SessionMetadata::default(),
            Vec::new(),
            0,
        );
        assert_eq!(record.id, "agent-xy12");
        assert!(record.is_agent());
        assert_eq!(record.display_id(), "xy12");

        let main = SessionRecord::new(
            PathBuf::from("/p/5f1c2d3e-aaaa.jsonl"),
            SessionMetadata::default(),
            Vec::new(),
            0,
        );
        assert_eq!(main.kind, SessionKind::Main);
        assert_eq!(main.display_id(), "5f1c2d3e-aaaa");
    }
}
