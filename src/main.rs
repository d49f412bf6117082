mod app;
mod cli;
mod domain;
mod infra;
mod ui;

use crate::app::{
    AppCommand, AppData, AppError, AppEvent, AppModel, PLAYBACK_INTERVAL, TAIL_POLL_INTERVAL,
};
use crate::cli::CliInvocation;
use crate::infra::{
    Config, DiscoverError, LoggingError, SessionFileWatcher, TerminalSession, Ticker,
    TuiTerminal, WatchError, WatchSignal, discover_sessions, ensure_projects_dir, init_logging,
    install_panic_hook, install_signal_handlers, reload_if_grown, take_termination_request,
    watch_session_file,
};
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::terminal::size as terminal_size;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use thiserror::Error;

const INPUT_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
enum MainError {
    #[error(transparent)]
    App(#[from] AppError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error(
        "{0}\nRun Claude Code at least once to create it, or point CLAUDE_PROJECTS_DIR at an existing directory."
    )]
    ProjectsDir(#[from] DiscoverError),
}

/// Everything the event loop can wake up for.
#[derive(Debug)]
enum LoopEvent {
    Terminal(Event),
    InputFailed(String),
    Interrupted,
    PlaybackTick { generation: u64 },
    SessionFileChanged { generation: u64 },
    SessionWatchFailed { generation: u64, message: String },
}

/// Background work attached to the open viewer. The tail ticker asks for a
/// size check every second; the watcher only makes that check happen sooner.
#[derive(Debug, Default)]
struct Streams {
    playback: Option<Ticker>,
    tail: Option<Ticker>,
    watcher: Option<SessionFileWatcher>,
}

impl Streams {
    fn start(
        &mut self,
        tx: &Sender<LoopEvent>,
        generation: u64,
        log_path: &Path,
        playback: bool,
    ) -> Result<(), WatchError> {
        self.cancel_all();

        if playback {
            let tx = tx.clone();
            self.playback = Some(Ticker::spawn(PLAYBACK_INTERVAL, move || {
                tx.send(LoopEvent::PlaybackTick { generation }).is_ok()
            }));
        }

        let tail_tx = tx.clone();
        self.tail = Some(Ticker::spawn(TAIL_POLL_INTERVAL, move || {
            tail_tx
                .send(LoopEvent::SessionFileChanged { generation })
                .is_ok()
        }));

        let tx = tx.clone();
        let watcher = watch_session_file(log_path, move |signal| {
            let event = match signal {
                WatchSignal::Changed => LoopEvent::SessionFileChanged { generation },
                WatchSignal::Error(message) => {
                    LoopEvent::SessionWatchFailed { generation, message }
                }
            };
            let _ = tx.send(event);
        })?;
        self.watcher = Some(watcher);
        Ok(())
    }

    fn stop_playback(&mut self) {
        if let Some(mut ticker) = self.playback.take() {
            ticker.cancel();
        }
    }

    fn cancel_all(&mut self) {
        self.stop_playback();
        if let Some(mut ticker) = self.tail.take() {
            ticker.cancel();
        }
        self.watcher = None;
    }
}

fn main() {
    if let Err(error) = run_main() {
        let mut err = io::stderr().lock();
        let _ = writeln!(err, "{error}");
        std::process::exit(1);
    }
}

fn run_main() -> Result<(), MainError> {
    let args = std::env::args().collect::<Vec<_>>();
    let invocation = match crate::cli::parse_invocation(&args) {
        Ok(invocation) => invocation,
        Err(error) => {
            let mut err = io::stderr().lock();
            let _ = writeln!(err, "{error}");
            let _ = writeln!(err);
            print_help();
            std::process::exit(2);
        }
    };

    match invocation {
        CliInvocation::PrintHelp => {
            print_help();
            Ok(())
        }
        CliInvocation::PrintVersion => {
            let mut out = io::stdout().lock();
            let _ = writeln!(out, "{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        CliInvocation::Tui => run_tui(),
    }
}

fn print_help() {
    let mut out = io::stdout().lock();
    let _ = write!(out, "{}", crate::cli::help_text());
}

fn run_tui() -> Result<(), MainError> {
    let config = Config::from_env().map_err(AppError::from)?;
    if init_logging(&config)? {
        log::info!("claude-stream {} starting", env!("CARGO_PKG_VERSION"));
    }
    ensure_projects_dir(&config.projects_dir)?;

    let discovery = discover_sessions(&config.projects_dir, &config.anchor);
    let data = AppData {
        projects_dir: config.projects_dir.clone(),
        warnings: discovery.warnings,
    };
    let mut model = AppModel::new(data, discovery.hierarchy);

    install_panic_hook();
    install_signal_handlers();
    let mut session = TerminalSession::setup().map_err(AppError::from)?;
    if let Ok((width, height)) = terminal_size() {
        model = model.with_terminal_size(width, height);
    }

    let result = run(session.terminal_mut(), model, &config);
    let restored = session.teardown();
    result?;
    restored.map_err(AppError::from)?;
    log::info!("exiting");
    Ok(())
}

fn run(terminal: &mut TuiTerminal, model: AppModel, config: &Config) -> Result<(), AppError> {
    let (tx, rx) = channel::<LoopEvent>();
    let stop_input = Arc::new(AtomicBool::new(false));
    let input = spawn_input_reader(tx.clone(), Arc::clone(&stop_input));
    let mut streams = Streams::default();

    let result = event_loop(terminal, model, config, &tx, &rx, &mut streams);

    streams.cancel_all();
    stop_input.store(true, Ordering::SeqCst);
    let _ = input.join();
    result
}

fn spawn_input_reader(tx: Sender<LoopEvent>, stop: Arc<AtomicBool>) -> JoinHandle<()> {
    thread::spawn(move || {
        while !stop.load(Ordering::SeqCst) {
            if take_termination_request() && tx.send(LoopEvent::Interrupted).is_err() {
                return;
            }

            let ready = match event::poll(INPUT_POLL_INTERVAL) {
                Ok(ready) => ready,
                Err(error) => {
                    let _ = tx.send(LoopEvent::InputFailed(error.to_string()));
                    return;
                }
            };
            if !ready {
                continue;
            }

            match event::read() {
                Ok(event) => {
                    if tx.send(LoopEvent::Terminal(event)).is_err() {
                        return;
                    }
                }
                Err(error) => {
                    let _ = tx.send(LoopEvent::InputFailed(error.to_string()));
                    return;
                }
            }
        }
    })
}

fn event_loop(
    terminal: &mut TuiTerminal,
    model: AppModel,
    config: &Config,
    tx: &Sender<LoopEvent>,
    rx: &Receiver<LoopEvent>,
    streams: &mut Streams,
) -> Result<(), AppError> {
    let mut model = model;
    loop {
        app::clamp_scroll_state(&mut model);
        terminal.draw(|frame| ui::render(frame, &model))?;

        let Ok(event) = rx.recv() else {
            return Ok(());
        };
        let Some(event) = to_app_event(event, &model)? else {
            continue;
        };

        let (next, command) = app::update(model, event);
        model = next;

        match command {
            AppCommand::None => {}
            AppCommand::Quit => return Ok(()),
            AppCommand::Rescan => model = rescan(model, config),
            AppCommand::StartStreaming {
                generation,
                log_path,
                playback,
            } => {
                log::info!("opened {} (generation {generation})", log_path.display());
                if let Err(error) = streams.start(tx, generation, &log_path, playback) {
                    log::warn!("no change notifications for {}: {error}", log_path.display());
                    model.notice = Some(format!("Polling for changes only: {error}"));
                }
            }
            AppCommand::StopPlayback => streams.stop_playback(),
            AppCommand::StopStreaming => {
                log::debug!("viewer closed");
                streams.cancel_all();
            }
        }
    }
}

fn to_app_event(event: LoopEvent, model: &AppModel) -> Result<Option<AppEvent>, AppError> {
    let event = match event {
        LoopEvent::Terminal(Event::Key(key)) => {
            if key.kind == KeyEventKind::Release {
                return Ok(None);
            }
            AppEvent::Key(key)
        }
        LoopEvent::Terminal(Event::Resize(width, height)) => AppEvent::Resize(width, height),
        LoopEvent::Terminal(_) => return Ok(None),
        LoopEvent::InputFailed(message) => return Err(AppError::Io(io::Error::other(message))),
        LoopEvent::Interrupted => AppEvent::Interrupted,
        LoopEvent::PlaybackTick { generation } => AppEvent::PlaybackTick { generation },
        LoopEvent::SessionFileChanged { generation } => {
            return Ok(reload_open_session(model, generation));
        }
        LoopEvent::SessionWatchFailed {
            generation,
            message,
        } => {
            log::warn!("session watch failed: {message}");
            AppEvent::TailFailed {
                generation,
                message,
            }
        }
    };
    Ok(Some(event))
}

/// Re-reads the open session when its file grew since the last load.
fn reload_open_session(model: &AppModel, generation: u64) -> Option<AppEvent> {
    let viewer = model
        .viewer()
        .filter(|viewer| viewer.generation() == generation)?;
    let log_path = &viewer.session().log_path;

    match reload_if_grown(log_path, viewer.known_size()) {
        Ok(Some(record)) => {
            log::debug!(
                "{} grew to {} bytes",
                log_path.display(),
                record.file_size_bytes
            );
            Some(AppEvent::SessionGrew {
                generation,
                record: Box::new(record),
            })
        }
        Ok(None) => None,
        Err(error) => {
            log::warn!("failed to reload {}: {error}", log_path.display());
            None
        }
    }
}

fn rescan(model: AppModel, config: &Config) -> AppModel {
    let discovery = discover_sessions(&config.projects_dir, &config.anchor);
    let mut model = model.with_discovery(discovery);
    if let Err(error) = ensure_projects_dir(&config.projects_dir) {
        log::warn!("{error}");
        model.notice = Some(error.to_string());
    }
    model
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DEFAULT_ANCHOR;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use serde_json::json;
    use std::fs;
    use std::time::Instant;

    fn press(model: AppModel, code: KeyCode) -> (AppModel, AppCommand) {
        app::update(model, AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE)))
    }

    fn append_line(path: &Path, value: serde_json::Value) {
        let mut file = fs::OpenOptions::new()
            .append(true)
            .open(path)
            .expect("open");
        writeln!(file, "{value}").expect("write");
    }

    #[test]
    fn tail_ticker_reports_changes_for_its_generation() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("s1.jsonl");
        fs::write(&path, "").expect("write");

        let (tx, rx) = channel::<LoopEvent>();
        let mut streams = Streams::default();
        // The size poll runs even when change notifications are unavailable.
        let _ = streams.start(&tx, 7, &path, false);
        assert!(streams.playback.is_none());

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut seen = false;
        while Instant::now() < deadline {
            match rx.recv_timeout(Duration::from_millis(200)) {
                Ok(LoopEvent::SessionFileChanged { generation }) => {
                    assert_eq!(generation, 7);
                    seen = true;
                    break;
                }
                Ok(_) | Err(_) => {}
            }
        }
        assert!(seen, "no change check within the deadline");

        streams.cancel_all();
        assert!(streams.tail.is_none());
        assert!(streams.watcher.is_none());
    }

    #[test]
    fn reload_appends_only_new_messages_of_the_open_session() {
        let dir = tempfile::tempdir().expect("tempdir");
        let project = dir.path().join("-home-u-Git-acme-widget");
        fs::create_dir(&project).expect("mkdir");
        let path = project.join("abcdef123456.jsonl");
        fs::write(&path, "").expect("write");
        append_line(
            &path,
            json!({"type": "user", "cwd": "/home/u/Git/acme/widget", "gitBranch": "main",
                "sessionId": "abcdef123456", "timestamp": "2026-03-01T09:00:00Z",
                "message": {"content": "Add a flag"}}),
        );
        append_line(
            &path,
            json!({"type": "assistant", "timestamp": "2026-03-01T09:00:10Z",
                "message": {"content": [{"type": "text", "text": "Sure"}]}}),
        );

        let output = discover_sessions(dir.path(), DEFAULT_ANCHOR);
        let data = AppData {
            projects_dir: dir.path().to_path_buf(),
            warnings: output.warnings,
        };
        let mut model = AppModel::new(data, output.hierarchy).with_terminal_size(100, 30);
        for code in [
            KeyCode::Enter,
            KeyCode::Down,
            KeyCode::Enter,
            KeyCode::Down,
            KeyCode::Enter,
            KeyCode::Down,
        ] {
            model = press(model, code).0;
        }
        let (model, command) = press(model, KeyCode::Enter);
        let AppCommand::StartStreaming { generation, .. } = command else {
            panic!("expected StartStreaming");
        };
        assert_eq!(model.viewer().map(|viewer| viewer.blocks()), Some(2));
        assert!(reload_open_session(&model, generation).is_none());

        append_line(
            &path,
            json!({"type": "user", "timestamp": "2026-03-01T09:01:00Z",
                "message": {"content": "Thanks"}}),
        );
        append_line(
            &path,
            json!({"type": "assistant", "timestamp": "2026-03-01T09:01:05Z",
                "message": {"content": [{"type": "text", "text": "Done"}]}}),
        );

        assert!(reload_open_session(&model, generation + 1).is_none());
        let event = reload_open_session(&model, generation).expect("grown session");
        let (model, command) = app::update(model, event);
        assert_eq!(command, AppCommand::None);

        let viewer = model.viewer().expect("viewer");
        assert_eq!(viewer.blocks(), 4);
        assert_eq!(viewer.known_size(), fs::metadata(&path).expect("meta").len());
        assert!(reload_open_session(&model, generation).is_none());
    }
}
