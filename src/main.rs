pub mod analysis;
pub mod app_dirs;
pub mod config;
pub mod feedback;
pub mod player;
pub mod remote;
pub mod runtime;
pub mod selection;
pub mod session;
pub mod timestamp;
pub mod ui;

use crate::analysis::{ContentAnalysis, DeliveryAnalysis};
use crate::app_dirs::AppDirs;
use crate::config::{ConfigStore, FileConfigStore};
use crate::feedback::{Block, FeedbackTree};
use crate::player::{MpvPlayer, PlaybackController};
use crate::remote::{HttpApi, RemoteServices};
use crate::runtime::{CrosstermEventSource, FixedTicker, Runner, UiEvent};
use crate::selection::{AnalysisKind, Route, Selection};
use crate::session::{KvStore, SessionStore, SqliteKvStore};
use crate::ui::{HitMap, Target};
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{
        DisableMouseCapture, EnableMouseCapture, KeyCode, KeyEvent, KeyModifiers, MouseButton,
        MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use std::{
    error::Error,
    io::{self, stdin},
};
use tracing::{debug, info, warn};

const TICK_RATE_MS: u64 = 100;

/// terminal rehearsal coach
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Browse delivery and content feedback for a rehearsal and jump the recording straight to the moment an annotation points at. Feedback comes from the analysis service or from local JSON documents."
)]
pub struct Cli {
    /// rehearsal to work with (recorded as the active rehearsal)
    #[clap(short = 'r', long)]
    rehearsal: Option<String>,

    /// speech the rehearsal belongs to (appended to the speech history)
    #[clap(long)]
    speech: Option<String>,

    /// read the delivery analysis from a local JSON file and review offline
    #[clap(long, value_name = "FILE")]
    delivery_file: Option<PathBuf>,

    /// read the content analysis from a local JSON file and review offline
    #[clap(long, value_name = "FILE")]
    content_file: Option<PathBuf>,

    /// analysis service base url (overrides the config file)
    #[clap(long)]
    server: Option<String>,

    /// mpv JSON IPC socket driving playback (overrides the config file)
    #[clap(long, value_name = "PATH")]
    player_socket: Option<PathBuf>,

    /// session database path (defaults to the per-user state dir)
    #[clap(long, value_name = "FILE")]
    session_db: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppState {
    Selecting,
    Reviewing,
}

/// Review-screen cursor: which timestamp control has focus and which
/// groups are folded shut. Indices follow the tree's traversal order.
#[derive(Debug, Default)]
pub struct ReviewState {
    pub focused: usize,
    pub collapsed: HashSet<usize>,
}

pub struct App<S: KvStore> {
    pub state: AppState,
    pub selection: Selection,
    pub focused_card: AnalysisKind,
    pub tree: FeedbackTree,
    pub review: ReviewState,
    pub controller: PlaybackController,
    pub session: SessionStore<S>,
    pub remote: Option<Box<dyn RemoteServices>>,
    pub route: Option<Route>,
    pub status: Option<String>,
    pub hits: HitMap,
    player_socket: Option<PathBuf>,
    control_count: usize,
    control_groups: Vec<usize>,
}

impl<S: KvStore> App<S> {
    /// Start at the selection step; documents are fetched after a
    /// confirmed selection.
    pub fn new(
        session: SessionStore<S>,
        remote: Option<Box<dyn RemoteServices>>,
        player_socket: Option<PathBuf>,
    ) -> Self {
        Self {
            state: AppState::Selecting,
            selection: Selection::new(),
            focused_card: AnalysisKind::Content,
            tree: FeedbackTree::default(),
            review: ReviewState::default(),
            controller: PlaybackController::new(),
            session,
            remote,
            route: None,
            status: None,
            hits: HitMap::default(),
            player_socket,
            control_count: 0,
            control_groups: Vec::new(),
        }
    }

    /// Jump straight to review with locally supplied documents.
    pub fn with_documents(
        session: SessionStore<S>,
        delivery: Option<DeliveryAnalysis>,
        content: Option<ContentAnalysis>,
        player_socket: Option<PathBuf>,
    ) -> Self {
        let mut app = Self::new(session, None, player_socket);
        app.set_documents(delivery, content);
        app.state = AppState::Reviewing;
        app
    }

    pub fn set_documents(
        &mut self,
        delivery: Option<DeliveryAnalysis>,
        content: Option<ContentAnalysis>,
    ) {
        self.tree = FeedbackTree::project(delivery.as_ref(), content.as_ref());
        self.review = ReviewState::default();
        self.control_count = self.tree.controls().len();
        self.control_groups = control_group_index(&self.tree);
    }

    pub fn toggle_selection(&mut self, kind: AnalysisKind) {
        self.selection.toggle(kind);
        self.status = None;
    }

    /// Confirm the selection: push it into the rehearsal's workflow
    /// record, then fetch whatever documents exist and move to review.
    /// Not invocable while the selection is empty.
    pub fn confirm(&mut self) {
        if self.selection.is_empty() {
            return;
        }
        let Some(remote) = &self.remote else {
            return;
        };
        match self.selection.confirm(&self.session, remote.as_workflow()) {
            Ok(route) => {
                self.route = Some(route);
                self.status = None;
                info!(?route, "selection confirmed");
                self.load_documents();
            }
            Err(err) => {
                warn!(%err, "confirmation failed, staying on selection step");
                self.status = Some("failed to update rehearsal, try again".into());
            }
        }
    }

    fn load_documents(&mut self) {
        let Some(remote) = &self.remote else {
            return;
        };
        let Some(rehearsal) = self.session.get_current_rehearsal() else {
            self.status = Some("no active rehearsal".into());
            return;
        };
        let analysis = remote.as_analysis();
        let fetched = analysis
            .fetch_delivery(&rehearsal)
            .and_then(|delivery| Ok((delivery, analysis.fetch_content(&rehearsal)?)));
        match fetched {
            Ok((delivery, content)) => {
                self.set_documents(delivery, content);
                self.state = AppState::Reviewing;
            }
            Err(err) => {
                warn!(%err, rehearsal, "could not fetch analysis documents");
                self.status = Some("could not fetch analysis, try again".into());
            }
        }
    }

    pub fn focus_next(&mut self) {
        if self.control_count > 0 && self.review.focused + 1 < self.control_count {
            self.review.focused += 1;
        }
    }

    pub fn focus_prev(&mut self) {
        self.review.focused = self.review.focused.saturating_sub(1);
    }

    /// Seek the player to the focused timestamp. Inert controls (failed
    /// normalization) do nothing beyond a log line.
    pub fn activate_focused(&mut self) {
        let seconds = self
            .tree
            .controls()
            .get(self.review.focused)
            .and_then(|control| control.seconds);
        match seconds {
            Some(seconds) => self.controller.seek_and_play(seconds),
            None => debug!("inert timestamp control activated"),
        }
    }

    pub fn collapse_focused_group(&mut self) {
        if let Some(&group) = self.control_groups.get(self.review.focused) {
            self.review.collapsed.insert(group);
        }
    }

    pub fn expand_focused_group(&mut self) {
        if let Some(&group) = self.control_groups.get(self.review.focused) {
            self.review.collapsed.remove(&group);
        }
    }

    pub fn toggle_group(&mut self, group: usize) {
        if !self.review.collapsed.remove(&group) {
            self.review.collapsed.insert(group);
        }
    }

    /// Late-bound player attach: keep trying the configured socket until
    /// the player shows up. Returns true when the attach state changed.
    pub fn try_attach_player(&mut self) -> bool {
        if self.controller.is_attached() {
            return false;
        }
        let Some(socket) = &self.player_socket else {
            return false;
        };
        match MpvPlayer::connect(socket) {
            Ok(player) => {
                info!(socket = %socket.display(), "player ready, attaching");
                self.controller.attach(Box::new(player));
                true
            }
            Err(_) => false,
        }
    }

    pub fn handle_click(&mut self, x: u16, y: u16) {
        let Some(target) = self.hits.hit(x, y).cloned() else {
            return;
        };
        match target {
            Target::Card(kind) => {
                self.focused_card = kind;
                self.toggle_selection(kind);
            }
            Target::NextButton => self.confirm(),
            Target::Control(idx) => {
                self.review.focused = idx;
                self.activate_focused();
            }
            Target::GroupHeader(group) => self.toggle_group(group),
        }
    }
}

/// Map each control index to the index of the group containing it, in the
/// same traversal order the UI uses.
fn control_group_index(tree: &FeedbackTree) -> Vec<usize> {
    let mut index = Vec::new();
    let mut group = 0usize;
    for section in &tree.sections {
        for block in &section.blocks {
            if let Block::Groups(groups) = block {
                for g in groups {
                    for entry in &g.entries {
                        index.extend(std::iter::repeat(group).take(entry.controls.len()));
                    }
                    group += 1;
                }
            }
        }
    }
    index
}

fn init_logging() {
    let Some(path) = AppDirs::log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let Ok(file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
    else {
        return;
    };
    let filter = tracing_subscriber::EnvFilter::try_from_env("PODIUM_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Arc::new(file))
        .with_ansi(false)
        .try_init();
}

/// Load config, fold in CLI overrides, and write the result back so an
/// override given once sticks for later runs.
fn effective_config(store: &impl ConfigStore, cli: &Cli) -> crate::config::Config {
    let mut config = store.load();
    if let Some(server) = &cli.server {
        config.server_url = server.clone();
    }
    if let Some(socket) = &cli.player_socket {
        config.player_socket = Some(socket.clone());
    }
    if cli.server.is_some() || cli.player_socket.is_some() {
        if let Err(err) = store.save(&config) {
            warn!(%err, "could not persist config overrides");
        }
    }
    config
}

fn load_document<T: serde::de::DeserializeOwned>(
    path: &PathBuf,
) -> Result<T, Box<dyn Error>> {
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let config = effective_config(&FileConfigStore::new(), &cli);

    let kv = match &cli.session_db {
        Some(path) => SqliteKvStore::open(path)?,
        None => SqliteKvStore::open_default()?,
    };
    let mut session = SessionStore::new(kv);
    let user_id = session.get_or_create_user_id();
    debug!(user_id, "session ready");
    if let Some(speech) = &cli.speech {
        session.add_speech(speech);
    }
    if let Some(rehearsal) = &cli.rehearsal {
        session.add_rehearsal(rehearsal);
    }

    let offline = cli.delivery_file.is_some() || cli.content_file.is_some();
    let mut app = if offline {
        let delivery = cli
            .delivery_file
            .as_ref()
            .map(load_document::<DeliveryAnalysis>)
            .transpose()?;
        let content = cli
            .content_file
            .as_ref()
            .map(load_document::<ContentAnalysis>)
            .transpose()?;
        App::with_documents(session, delivery, content, config.player_socket.clone())
    } else {
        let api = HttpApi::new(
            &config.server_url,
            Duration::from_secs(config.request_timeout_secs),
        )?;
        App::new(session, Some(Box::new(api)), config.player_socket.clone())
    };
    app.try_attach_player();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend, S: KvStore>(
    terminal: &mut Terminal<B>,
    app: &mut App<S>,
) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );

    redraw(terminal, app)?;

    loop {
        match runner.step() {
            UiEvent::Tick => {
                if app.try_attach_player() {
                    redraw(terminal, app)?;
                }
            }
            UiEvent::Resize => {
                redraw(terminal, app)?;
            }
            UiEvent::Mouse(mouse) => {
                if let MouseEventKind::Down(MouseButton::Left) = mouse.kind {
                    app.handle_click(mouse.column, mouse.row);
                    redraw(terminal, app)?;
                }
            }
            UiEvent::Key(key) => {
                if handle_key(app, key) {
                    break;
                }
                redraw(terminal, app)?;
            }
        }
    }

    Ok(())
}

fn redraw<B: Backend, S: KvStore>(
    terminal: &mut Terminal<B>,
    app: &mut App<S>,
) -> Result<(), Box<dyn Error>> {
    terminal.draw(|f| {
        let hits = ui::draw(f, &*app);
        app.hits = hits;
    })?;
    Ok(())
}

/// Returns true when the app should quit.
fn handle_key<S: KvStore>(app: &mut App<S>, key: KeyEvent) -> bool {
    if key.code == KeyCode::Esc {
        return true;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return true;
    }

    match app.state {
        AppState::Selecting => match key.code {
            KeyCode::Char('c') => app.toggle_selection(AnalysisKind::Content),
            KeyCode::Char('d') => app.toggle_selection(AnalysisKind::Delivery),
            KeyCode::Tab | KeyCode::Left | KeyCode::Right => {
                app.focused_card = match app.focused_card {
                    AnalysisKind::Content => AnalysisKind::Delivery,
                    AnalysisKind::Delivery => AnalysisKind::Content,
                };
            }
            KeyCode::Char(' ') => {
                let kind = app.focused_card;
                app.toggle_selection(kind);
            }
            KeyCode::Enter => app.confirm(),
            _ => {}
        },
        AppState::Reviewing => match key.code {
            KeyCode::Down | KeyCode::Char('j') => app.focus_next(),
            KeyCode::Up | KeyCode::Char('k') => app.focus_prev(),
            KeyCode::Enter => app.activate_focused(),
            KeyCode::Left | KeyCode::Char('h') => app.collapse_focused_group(),
            KeyCode::Right | KeyCode::Char('l') => app.expand_focused_group(),
            KeyCode::Char('b') | KeyCode::Backspace => {
                if app.remote.is_some() {
                    app.state = AppState::Selecting;
                }
            }
            _ => {}
        },
    }
    false
}
