mod transcript;
mod tree;
mod viewer;

use crate::domain::{Hierarchy, SessionRecord};
use crate::infra::{DiscoverOutput, ScanWarningCount};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use time::OffsetDateTime;

pub use transcript::{LineRole, TranscriptLine};
pub use tree::TreeView;
pub use viewer::{PLAYBACK_INTERVAL, TAIL_POLL_INTERVAL, ViewerState};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("terminal I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    ResolveProjectsDir(#[from] crate::infra::ResolveProjectsDirError),
}

#[derive(Clone, Debug)]
pub struct AppData {
    pub projects_dir: PathBuf,
    pub warnings: ScanWarningCount,
}

#[derive(Clone, Debug)]
pub enum View {
    Tree,
    Viewer(ViewerState),
}

#[derive(Clone, Debug)]
pub struct AppModel {
    pub data: AppData,
    pub tree: TreeView,
    pub view: View,
    pub terminal_size: (u16, u16),
    pub notice: Option<String>,
    next_generation: u64,
}

impl AppModel {
    pub fn new(data: AppData, hierarchy: Hierarchy) -> Self {
        Self {
            data,
            tree: TreeView::new(hierarchy),
            view: View::Tree,
            terminal_size: (0, 0),
            notice: None,
            next_generation: 1,
        }
    }

    /// Replaces the tree with a fresh discovery; expand state and selection start over.
    pub fn with_discovery(self, output: DiscoverOutput) -> Self {
        let tree = TreeView::new(output.hierarchy);
        let notice = format!("Refreshed: {} sessions", tree.hierarchy().leaf_count());
        Self {
            data: AppData {
                projects_dir: self.data.projects_dir,
                warnings: output.warnings,
            },
            tree,
            view: View::Tree,
            terminal_size: self.terminal_size,
            notice: Some(notice),
            next_generation: self.next_generation,
        }
    }

    pub fn with_terminal_size(self, width: u16, height: u16) -> Self {
        Self {
            terminal_size: (width, height),
            ..self
        }
    }

    pub fn viewer(&self) -> Option<&ViewerState> {
        match &self.view {
            View::Viewer(viewer) => Some(viewer),
            View::Tree => None,
        }
    }
}

#[derive(Clone, Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Resize(u16, u16),
    PlaybackTick {
        generation: u64,
    },
    SessionGrew {
        generation: u64,
        record: Box<SessionRecord>,
    },
    TailFailed {
        generation: u64,
        message: String,
    },
    Interrupted,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AppCommand {
    None,
    Quit,
    Rescan,
    StartStreaming {
        generation: u64,
        log_path: PathBuf,
        playback: bool,
    },
    StopPlayback,
    StopStreaming,
}

/// Rows available to the tree or transcript: the terminal minus title, pane header and status bar.
pub fn content_viewport_height(terminal_size: (u16, u16)) -> usize {
    usize::from(terminal_size.1.saturating_sub(3))
}

pub fn left_pane_width(width: u16) -> u16 {
    let forty_percent = u16::try_from(u32::from(width) * 2 / 5).unwrap_or(u16::MAX);
    forty_percent.min(45)
}

pub fn transcript_width(terminal_size: (u16, u16)) -> usize {
    usize::from(terminal_size.0.saturating_sub(4))
}

fn page_step(viewport: usize) -> usize {
    viewport.saturating_sub(2).max(1)
}

pub fn update(model: AppModel, event: AppEvent) -> (AppModel, AppCommand) {
    match event {
        AppEvent::Key(key) => update_on_key(model, key),
        AppEvent::Resize(width, height) => {
            let mut model = model.with_terminal_size(width, height);
            clamp_scroll_state(&mut model);
            (model, AppCommand::None)
        }
        AppEvent::PlaybackTick { generation } => update_on_tick(model, generation),
        AppEvent::SessionGrew { generation, record } => {
            let mut model = model;
            let viewport = content_viewport_height(model.terminal_size);
            if let View::Viewer(viewer) = &mut model.view {
                if viewer.generation() == generation {
                    let appended = viewer.apply_reload(*record, viewport);
                    if appended > 0 {
                        log::debug!("appended {appended} message(s) from live tail");
                    }
                    // The tree keeps the grown record so reopening starts from it.
                    model
                        .tree
                        .replace_session(viewer.session(), OffsetDateTime::now_utc());
                }
            }
            (model, AppCommand::None)
        }
        AppEvent::TailFailed {
            generation,
            message,
        } => {
            let mut model = model;
            if model
                .viewer()
                .is_some_and(|viewer| viewer.generation() == generation)
            {
                model.notice = Some(format!("Live tail stopped: {message}"));
            }
            (model, AppCommand::None)
        }
        AppEvent::Interrupted => (model, AppCommand::Quit),
    }
}

/// Keeps tree and transcript scroll offsets valid for the current terminal size.
pub fn clamp_scroll_state(model: &mut AppModel) {
    let viewport = content_viewport_height(model.terminal_size);
    model.tree.ensure_visible(viewport);
    if let View::Viewer(viewer) = &mut model.view {
        viewer.clamp_scroll(viewport);
    }
}

fn update_on_tick(model: AppModel, generation: u64) -> (AppModel, AppCommand) {
    let mut model = model;
    let View::Viewer(viewer) = &mut model.view else {
        return (model, AppCommand::None);
    };
    if viewer.generation() != generation || !viewer.is_streaming() {
        return (model, AppCommand::None);
    }
    if viewer.advance_playback() {
        return (model, AppCommand::None);
    }
    (model, AppCommand::StopPlayback)
}

fn update_on_key(model: AppModel, key: KeyEvent) -> (AppModel, AppCommand) {
    let mut model = model;
    model.notice = None;

    match std::mem::replace(&mut model.view, View::Tree) {
        View::Tree => update_tree(model, key),
        View::Viewer(viewer) => update_viewer(model, viewer, key),
    }
}

fn is_ctrl_c(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c')
}

fn update_tree(model: AppModel, key: KeyEvent) -> (AppModel, AppCommand) {
    let mut model = model;
    if is_ctrl_c(&key) {
        return (model, AppCommand::Quit);
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return (model, AppCommand::Quit),
        KeyCode::Char('r') => return (model, AppCommand::Rescan),
        KeyCode::Up | KeyCode::Char('k') => model.tree.move_up(),
        KeyCode::Down | KeyCode::Char('j') => model.tree.move_down(),
        KeyCode::Char('g') => model.tree.select_first(),
        KeyCode::Char('G') => model.tree.select_last(),
        KeyCode::Enter | KeyCode::Right | KeyCode::Char('l') => {
            if let Some(session) = model.tree.expand_or_open() {
                return open_viewer(model, session);
            }
        }
        KeyCode::Char(' ') => {
            if let Some(session) = model.tree.toggle_expand() {
                return open_viewer(model, session);
            }
        }
        KeyCode::Left | KeyCode::Backspace | KeyCode::Char('h') | KeyCode::Char('b') => {
            model.tree.collapse_or_ascend()
        }
        _ => {}
    }

    let viewport = content_viewport_height(model.terminal_size);
    model.tree.ensure_visible(viewport);
    (model, AppCommand::None)
}

fn open_viewer(model: AppModel, session: Arc<SessionRecord>) -> (AppModel, AppCommand) {
    let mut model = model;
    let generation = model.next_generation;
    model.next_generation += 1;

    let viewer = ViewerState::open(
        session,
        generation,
        transcript_width(model.terminal_size),
        content_viewport_height(model.terminal_size),
    );
    log::info!(
        "opened {} ({} messages)",
        viewer.session().log_path.display(),
        viewer.session().messages.len()
    );

    let command = AppCommand::StartStreaming {
        generation,
        log_path: viewer.session().log_path.clone(),
        playback: viewer.is_streaming(),
    };
    model.view = View::Viewer(viewer);
    (model, command)
}

fn update_viewer(model: AppModel, viewer: ViewerState, key: KeyEvent) -> (AppModel, AppCommand) {
    let mut model = model;
    let mut viewer = viewer;
    let viewport = content_viewport_height(model.terminal_size);

    let closes = is_ctrl_c(&key)
        || matches!(
            key.code,
            KeyCode::Char('q')
                | KeyCode::Esc
                | KeyCode::Char('h')
                | KeyCode::Char('b')
                | KeyCode::Left
                | KeyCode::Backspace
        );
    if closes {
        log::info!("closed {}", viewer.session().log_path.display());
        model.view = View::Tree;
        return (model, AppCommand::StopStreaming);
    }

    let mut command = AppCommand::None;
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => viewer.scroll_up(1),
        KeyCode::Down | KeyCode::Char('j') => viewer.scroll_down(1, viewport),
        KeyCode::PageUp => viewer.scroll_up(page_step(viewport)),
        KeyCode::PageDown => viewer.scroll_down(page_step(viewport), viewport),
        KeyCode::Char('g') => viewer.scroll_to_top(),
        KeyCode::Char('G') => viewer.scroll_to_bottom(viewport),
        KeyCode::Char('s') => {
            if viewer.skip_playback(viewport) {
                command = AppCommand::StopPlayback;
            }
        }
        _ => {}
    }

    model.view = View::Viewer(viewer);
    (model, command)
}
