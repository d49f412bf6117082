use crate::app::transcript::{TranscriptLine, format_message};
use crate::domain::{Message, SessionRecord};
use std::sync::Arc;
use std::time::Duration;

/// Messages shown immediately when a session opens; older ones stream in.
pub const IMMEDIATE_MESSAGES: usize = 5;
pub const PLAYBACK_INTERVAL: Duration = Duration::from_millis(50);
pub const TAIL_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct Playback {
    /// Older messages not yet revealed; the next one is `messages[remaining - 1]`.
    remaining: usize,
}

#[derive(Clone, Debug)]
pub struct ViewerState {
    session: Arc<SessionRecord>,
    lines: Vec<TranscriptLine>,
    blocks: usize,
    scroll: usize,
    playback: Option<Playback>,
    generation: u64,
    width: usize,
}

impl ViewerState {
    pub fn open(session: Arc<SessionRecord>, generation: u64, width: usize, viewport: usize) -> Self {
        let split = session.messages.len().saturating_sub(IMMEDIATE_MESSAGES);
        let mut viewer = Self {
            session: Arc::clone(&session),
            lines: Vec::new(),
            blocks: 0,
            scroll: 0,
            playback: None,
            generation,
            width,
        };

        for message in &session.messages[split..] {
            viewer.append_message(message, viewport);
        }
        if split > 0 {
            viewer.playback = Some(Playback { remaining: split });
        }
        viewer
    }

    pub fn session(&self) -> &Arc<SessionRecord> {
        &self.session
    }

    pub fn lines(&self) -> &[TranscriptLine] {
        &self.lines
    }

    /// Number of message blocks currently in the transcript.
    pub fn blocks(&self) -> usize {
        self.blocks
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn known_size(&self) -> u64 {
        self.session.file_size_bytes
    }

    pub fn is_streaming(&self) -> bool {
        self.playback.is_some()
    }

    /// Prepends the next older message. Returns whether playback is still running.
    pub fn advance_playback(&mut self) -> bool {
        let Some(playback) = self.playback else {
            return false;
        };
        if playback.remaining == 0 {
            self.playback = None;
            return false;
        }

        let index = playback.remaining - 1;
        let session = Arc::clone(&self.session);
        if let Some(message) = session.messages.get(index) {
            self.prepend_message(message);
        }

        if index == 0 {
            self.playback = None;
            return false;
        }
        self.playback = Some(Playback { remaining: index });
        true
    }

    /// Cancels playback and redisplays the full transcript. Returns false when idle.
    pub fn skip_playback(&mut self, viewport: usize) -> bool {
        if self.playback.take().is_none() {
            return false;
        }

        self.lines.clear();
        self.blocks = 0;
        let session = Arc::clone(&self.session);
        for message in &session.messages {
            self.push_block(message);
        }
        self.scroll_to_bottom(viewport);
        true
    }

    /// Appends messages beyond the known count and adopts `updated` for future diffs.
    pub fn apply_reload(&mut self, updated: SessionRecord, viewport: usize) -> usize {
        let known = self.session.messages.len();
        let updated = Arc::new(updated);
        let appended = updated.messages.len().saturating_sub(known);
        for message in updated.messages.iter().skip(known) {
            self.append_message(message, viewport);
        }
        self.session = updated;
        appended
    }

    fn push_block(&mut self, message: &Message) {
        self.lines.extend(format_message(message, self.width));
        self.blocks += 1;
    }

    fn append_message(&mut self, message: &Message, viewport: usize) {
        self.push_block(message);
        self.scroll_to_bottom(viewport);
    }

    fn prepend_message(&mut self, message: &Message) {
        let block = format_message(message, self.width);
        self.lines.splice(0..0, block);
        self.blocks += 1;
    }

    pub fn max_scroll(&self, viewport: usize) -> usize {
        self.lines.len().saturating_sub(viewport)
    }

    pub fn scroll_up(&mut self, amount: usize) {
        self.scroll = self.scroll.saturating_sub(amount);
    }

    pub fn scroll_down(&mut self, amount: usize, viewport: usize) {
        self.scroll = (self.scroll + amount).min(self.max_scroll(viewport));
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll = 0;
    }

    pub fn scroll_to_bottom(&mut self, viewport: usize) {
        self.scroll = self.max_scroll(viewport);
    }

    pub fn clamp_scroll(&mut self, viewport: usize) {
        self.scroll = self.scroll.min(self.max_scroll(viewport));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::transcript::LineRole;
    use crate::domain::SessionMetadata;
    use std::path::PathBuf;

    fn user(text: &str) -> Message {
        Message::User {
            timestamp: None,
            text: text.to_string(),
        }
    }

    fn session(count: usize) -> SessionRecord {
        let messages = (0..count).map(|idx| user(&format!("message {idx}"))).collect();
        SessionRecord::new(
            PathBuf::from("/logs/s1.jsonl"),
            SessionMetadata {
                message_count: count,
                ..SessionMetadata::default()
            },
            messages,
            100,
        )
    }

    fn bodies(viewer: &ViewerState) -> Vec<String> {
        viewer
            .lines()
            .iter()
            .filter(|line| line.role == LineRole::Body)
            .map(|line| line.text.trim().to_string())
            .collect()
    }

    fn expected(count: usize) -> Vec<String> {
        (0..count).map(|idx| format!("message {idx}")).collect()
    }

    #[test]
    fn short_sessions_open_without_playback() {
        let viewer = ViewerState::open(Arc::new(session(3)), 1, 60, 10);
        assert!(!viewer.is_streaming());
        assert_eq!(viewer.blocks(), 3);
        assert_eq!(bodies(&viewer), expected(3));
    }

    #[test]
    fn playback_reveals_older_messages_in_order() {
        let mut viewer = ViewerState::open(Arc::new(session(8)), 1, 60, 10);
        assert!(viewer.is_streaming());
        assert_eq!(viewer.blocks(), IMMEDIATE_MESSAGES);
        assert_eq!(bodies(&viewer), (3..8).map(|idx| format!("message {idx}")).collect::<Vec<_>>());

        assert!(viewer.advance_playback());
        assert_eq!(bodies(&viewer)[0], "message 2");
        assert!(viewer.advance_playback());
        assert!(!viewer.advance_playback());
        assert!(!viewer.is_streaming());
        assert_eq!(viewer.blocks(), 8);
        assert_eq!(bodies(&viewer), expected(8));
        assert!(!viewer.advance_playback());
    }

    #[test]
    fn skip_shows_everything_once() {
        let mut viewer = ViewerState::open(Arc::new(session(9)), 1, 60, 10);
        viewer.advance_playback();
        assert!(viewer.skip_playback(10));
        assert_eq!(viewer.blocks(), 9);
        assert_eq!(bodies(&viewer), expected(9));
        assert_eq!(viewer.scroll(), viewer.max_scroll(10));
        assert!(!viewer.skip_playback(10));
    }

    #[test]
    fn reload_appends_only_new_messages() {
        let mut viewer = ViewerState::open(Arc::new(session(2)), 1, 60, 4);
        let before = viewer.lines().to_vec();
        assert_eq!(viewer.apply_reload(session(2), 4), 0);
        assert_eq!(viewer.lines(), before.as_slice());

        let mut grown = session(4);
        grown.file_size_bytes = 250;
        assert_eq!(viewer.apply_reload(grown, 4), 2);
        assert_eq!(bodies(&viewer), expected(4));
        assert_eq!(viewer.known_size(), 250);
        assert_eq!(viewer.scroll(), viewer.max_scroll(4));
    }

    #[test]
    fn scrolling_clamps_to_content() {
        let mut viewer = ViewerState::open(Arc::new(session(3)), 1, 60, 4);
        viewer.scroll_to_top();
        viewer.scroll_up(5);
        assert_eq!(viewer.scroll(), 0);
        viewer.scroll_down(100, 4);
        assert_eq!(viewer.scroll(), viewer.lines().len() - 4);
        viewer.clamp_scroll(100);
        assert_eq!(viewer.scroll(), 0);
    }
}
