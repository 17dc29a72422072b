use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event as CEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use wav_player::session::PlaybackSession;
use wav_player::status::{PlaybackEndReason, PlayerStatus};

use super::render;

/// Opens a file on the output device. Boxed so tests can load onto a fake sink.
pub(crate) type Loader = Box<dyn FnMut(&Path) -> wav_player::Result<PlaybackSession>>;

/// Launch the TUI and drive the event loop until the user quits.
pub(crate) fn run_tui(files: Vec<PathBuf>, loader: Loader, stop: Arc<AtomicBool>) -> Result<()> {
    let mut app = App::new(files, loader);
    app.load_selected();

    let mut term = init_terminal()?;
    let result = ui_loop(&mut term, &mut app, &stop);

    restore_terminal(&mut term)?;
    app.unload();
    result
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Action {
    TogglePause,
    Rewind,
    FastForward,
    Next,
    Previous,
    Quit,
}

pub(crate) fn action_for(key: KeyEvent) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(Action::Quit);
    }
    match key.code {
        KeyCode::Char(' ') => Some(Action::TogglePause),
        KeyCode::Left | KeyCode::Char('r') => Some(Action::Rewind),
        KeyCode::Right | KeyCode::Char('f') => Some(Action::FastForward),
        KeyCode::Char('n') => Some(Action::Next),
        KeyCode::Char('p') => Some(Action::Previous),
        KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
        _ => None,
    }
}

/// In-memory UI state for rendering + interaction.
pub(crate) struct App {
    pub(crate) playlist: Vec<PathBuf>,
    pub(crate) selected: usize,
    pub(crate) session: Option<PlaybackSession>,
    /// One-line message under the transport buttons.
    pub(crate) status: String,
    pub(crate) quit: bool,
    loader: Loader,
}

impl App {
    pub(crate) fn new(playlist: Vec<PathBuf>, loader: Loader) -> Self {
        let status = if playlist.is_empty() {
            "No files given".to_string()
        } else {
            "Idle".to_string()
        };
        Self {
            playlist,
            selected: 0,
            session: None,
            status,
            quit: false,
            loader,
        }
    }

    pub(crate) fn transport_label(&self) -> &'static str {
        self.session
            .as_ref()
            .map_or("Play", PlaybackSession::transport_label)
    }

    pub(crate) fn player_status(&self) -> Option<PlayerStatus> {
        self.session.as_ref().map(PlaybackSession::status)
    }

    pub(crate) fn selected_path(&self) -> Option<&Path> {
        self.playlist.get(self.selected).map(PathBuf::as_path)
    }

    pub(crate) fn apply(&mut self, action: Action) {
        match action {
            Action::TogglePause => self.toggle_pause(),
            Action::Rewind => {
                if let Some(session) = &self.session {
                    let cursor = session.rewind();
                    self.status = format!("Rewind to byte {cursor}");
                }
            }
            Action::FastForward => {
                if let Some(session) = &self.session {
                    let cursor = session.fast_forward();
                    self.status = format!("Fast-forward to byte {cursor}");
                }
            }
            Action::Next => {
                if self.selected + 1 < self.playlist.len() {
                    self.selected += 1;
                    self.load_selected();
                }
            }
            Action::Previous => {
                if self.selected > 0 {
                    self.selected -= 1;
                    self.load_selected();
                }
            }
            Action::Quit => self.quit = true,
        }
    }

    /// Pump end-of-stream notices from the sink.
    pub(crate) fn tick(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let was_eof = session.end_reason() == Some(PlaybackEndReason::Eof);
        if session.poll() && !was_eof && session.end_reason() == Some(PlaybackEndReason::Eof) {
            self.status = "Playback completed.".to_string();
        }
    }

    /// Replace the current session with the selected file. A failed load leaves no file loaded.
    pub(crate) fn load_selected(&mut self) {
        self.unload();
        let Some(path) = self.playlist.get(self.selected).cloned() else {
            return;
        };
        match (self.loader)(&path) {
            Ok(session) => {
                self.status = format!("Playing {}", display_name(&path));
                self.session = Some(session);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), kind = e.kind(), "load failed: {e}");
                self.status = e.to_string();
            }
        }
    }

    pub(crate) fn unload(&mut self) {
        if let Some(session) = self.session.take() {
            session.stop();
        }
    }

    fn toggle_pause(&mut self) {
        let Some(session) = self.session.as_mut() else {
            if !self.playlist.is_empty() {
                self.load_selected();
            }
            return;
        };
        match session.toggle_pause() {
            Ok(true) => self.status = "Playing".to_string(),
            Ok(false) => self.status = "Paused".to_string(),
            Err(e) => {
                tracing::warn!(kind = e.kind(), "transport failed: {e}");
                self.status = e.to_string();
                self.session = None;
            }
        }
    }
}

pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn ui_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    stop: &AtomicBool,
) -> Result<()> {
    let tick = Duration::from_millis(33);
    let mut last_tick = Instant::now();

    while !app.quit {
        if stop.load(Ordering::SeqCst) {
            break;
        }
        app.tick();
        terminal.draw(|f| render::draw(f, app))?;

        let timeout = tick.saturating_sub(last_tick.elapsed());
        if event::poll(timeout).context("poll terminal events")? {
            if let CEvent::Key(k) = event::read().context("read terminal event")? {
                if k.kind == KeyEventKind::Press {
                    if let Some(action) = action_for(k) {
                        app.apply(action);
                    }
                }
            }
        }
        if last_tick.elapsed() >= tick {
            last_tick = Instant::now();
        }
    }
    Ok(())
}

fn init_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).context("create terminal")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();
    Ok(())
}
