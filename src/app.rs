use crate::config::Config;
use crate::event::AppEvent;
use crate::notify::{MANUAL_REFRESH_MESSAGE, NotificationLog, Notifier};
use crate::presenter::{DisplayFilter, TableRow, build_rows};
use crate::scheduler::{RefreshQuery, RefreshScheduler, RefreshState, spawn_refresh};
use crate::video_client::VideoSourceClient;
use anyhow::Result;
use chrono::{DateTime, Local};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::{error, info, warn};
use ratatui::{Terminal, backend::Backend, widgets::TableState};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, error::TryRecvError};
use tui_input::{Input, InputRequest};

/// Config values that can be edited from inside the TUI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingField {
    ApiKey,
    Channels,
    Organizations,
}

impl SettingField {
    pub fn label(self) -> &'static str {
        match self {
            SettingField::ApiKey => "API key",
            SettingField::Channels => "Channels",
            SettingField::Organizations => "Organizations",
        }
    }

    fn value(self, config: &Config) -> &str {
        match self {
            SettingField::ApiKey => &config.api_key,
            SettingField::Channels => &config.channels,
            SettingField::Organizations => &config.organizations,
        }
    }

    fn assign(self, config: &mut Config, value: String) {
        match self {
            SettingField::ApiKey => config.api_key = value,
            SettingField::Channels => config.channels = value,
            SettingField::Organizations => config.organizations = value,
        }
    }
}

pub struct App {
    pub should_quit: bool,
    pub config: Config,
    /// Where settings changes are written back; `None` keeps them in memory.
    config_path: Option<PathBuf>,
    pub scheduler: RefreshScheduler,
    client: Arc<VideoSourceClient>,
    runtime: Handle,
    events_tx: UnboundedSender<AppEvent>,
    events_rx: UnboundedReceiver<AppEvent>,
    pub notifications: NotificationLog,
    pub table_state: TableState,
    pub last_refresh_at: Option<DateTime<Local>>,
    pub status_message: Option<String>,
    /// Field being edited; keys go to `input` while set.
    pub editing: Option<SettingField>,
    pub input: Input,
}

impl App {
    pub fn new(
        config: Config,
        config_path: Option<PathBuf>,
        client: Arc<VideoSourceClient>,
        runtime: Handle,
    ) -> App {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        App {
            should_quit: false,
            scheduler: RefreshScheduler::new(config.refresh_interval()),
            config,
            config_path,
            client,
            runtime,
            events_tx,
            events_rx,
            notifications: NotificationLog::default(),
            table_state: TableState::default(),
            last_refresh_at: None,
            status_message: None,
            editing: None,
            input: Input::default(),
        }
    }

    // ================================ Refresh plumbing ===========================================

    /// One frame's worth of non-render work: apply finished refreshes, then
    /// start a new one if the scheduler says so.
    pub fn tick(&mut self, now: Instant) {
        loop {
            match self.events_rx.try_recv() {
                Ok(event) => self.handle_event(event, now),
                Err(TryRecvError::Empty) => break,
                // We hold a sender ourselves, so this only happens on teardown.
                Err(TryRecvError::Disconnected) => break,
            }
        }

        if let Some(trigger) = self.scheduler.poll(now) {
            spawn_refresh(
                &self.runtime,
                Arc::clone(&self.client),
                RefreshQuery::from_config(&self.config),
                trigger,
                self.events_tx.clone(),
            );
        }
    }

    pub fn handle_event(&mut self, event: AppEvent, now: Instant) {
        match event {
            AppEvent::RefreshCompleted { outcome, trigger, timestamp } => {
                info!("{:?} refresh finished at {}", trigger, timestamp);
                let selected = self.selected_row();
                self.scheduler.complete(outcome, &mut self.notifications, now);
                self.last_refresh_at = Some(timestamp.with_timezone(&Local));
                self.restore_selection(selected);
            }
        }
    }

    pub fn request_manual_refresh(&mut self) {
        self.notifications.notify(MANUAL_REFRESH_MESSAGE);
        if self.scheduler.state() == RefreshState::Refreshing {
            self.status_message = Some("Refresh in progress, queued another".to_string());
        }
        self.scheduler.request_manual();
    }

    pub fn seconds_since_refresh(&self, now: Instant) -> Option<u64> {
        self.scheduler.last_completed().map(|at| now.saturating_duration_since(at).as_secs())
    }

    // ================================== Table view ===============================================

    pub fn display_filter(&self) -> DisplayFilter {
        DisplayFilter::from_config(&self.config)
    }

    pub fn visible_rows(&self) -> Vec<TableRow> {
        build_rows(&self.scheduler.snapshot(), self.display_filter(), &Local)
    }

    pub fn selected_row(&self) -> Option<TableRow> {
        let index = self.table_state.selected()?;
        self.visible_rows().into_iter().nth(index)
    }

    pub fn select_next_row(&mut self) {
        let len = self.visible_rows().len();
        if len == 0 {
            self.table_state.select(None);
            return;
        }
        let next = self.table_state.selected().map_or(0, |i| (i + 1) % len);
        self.table_state.select(Some(next));
    }

    pub fn select_prev_row(&mut self) {
        let len = self.visible_rows().len();
        if len == 0 {
            self.table_state.select(None);
            return;
        }
        let prev = self.table_state.selected().map_or(len - 1, |i| (i + len - 1) % len);
        self.table_state.select(Some(prev));
    }

    /// Follows `previous` to its new position by watch URL. When it is gone,
    /// the old index is clamped into the visible rows.
    fn restore_selection(&mut self, previous: Option<TableRow>) {
        let rows = self.visible_rows();
        if let Some(index) = previous.and_then(|p| rows.iter().position(|r| r.url == p.url)) {
            self.table_state.select(Some(index));
            return;
        }
        match self.table_state.selected() {
            Some(_) if rows.is_empty() => self.table_state.select(None),
            Some(i) if i >= rows.len() => self.table_state.select(Some(rows.len() - 1)),
            _ => {}
        }
    }

    pub fn open_selected_link(&mut self) {
        let Some(row) = self.selected_row() else {
            self.status_message = Some("No broadcast selected.".to_string());
            return;
        };
        match webbrowser::open(&row.url) {
            Ok(_) => {
                info!("Opened {}", row.url);
                self.status_message = Some(format!("Opened {}", row.url));
            }
            Err(err) => {
                warn!("Failed to open {}: {}", row.url, err);
                self.status_message = Some(format!("Failed to open {}: {}", row.url, err));
            }
        }
    }

    // ================================== Settings =================================================

    // The snapshot holds hidden rows too, so a toggle only re-filters.
    pub fn toggle_show_live(&mut self) {
        let selected = self.selected_row();
        self.config.show_live = !self.config.show_live;
        self.restore_selection(selected);
        self.save_config();
    }

    pub fn toggle_show_upcoming(&mut self) {
        let selected = self.selected_row();
        self.config.show_upcoming = !self.config.show_upcoming;
        self.restore_selection(selected);
        self.save_config();
    }

    pub fn begin_edit(&mut self, field: SettingField) {
        self.input = Input::new(field.value(&self.config).to_string());
        self.editing = Some(field);
    }

    pub fn cancel_edit(&mut self) {
        if let Some(field) = self.editing.take() {
            self.status_message = Some(format!("{} left unchanged", field.label()));
        }
        self.input.reset();
    }

    /// Applies the edited value, saves it and queues a refresh with the new
    /// query. The refresh is silent: no "Manually Refreshed" line.
    pub fn commit_edit(&mut self) {
        let Some(field) = self.editing.take() else {
            return;
        };
        let value = self.input.value().trim().to_string();
        self.input.reset();
        if field.value(&self.config) == value {
            self.status_message = Some(format!("{} left unchanged", field.label()));
            return;
        }

        field.assign(&mut self.config, value);
        if field == SettingField::ApiKey {
            self.client.set_api_key(&self.config.api_key);
        }
        info!("{} changed from the settings editor", field.label());
        self.status_message = Some(format!("{} updated, refreshing", field.label()));
        self.save_config();
        self.scheduler.request_manual();
    }

    fn save_config(&mut self) {
        let Some(path) = &self.config_path else {
            return;
        };
        if let Err(e) = self.config.save(path) {
            error!("Failed to save config: {:#}", e);
            self.status_message = Some(format!("Failed to save config: {}", e));
        }
    }

    fn on_edit_key(&mut self, key: KeyCode) {
        let request = match key {
            KeyCode::Enter => {
                self.commit_edit();
                return;
            }
            KeyCode::Esc => {
                self.cancel_edit();
                return;
            }
            KeyCode::Char(c) => InputRequest::InsertChar(c),
            KeyCode::Backspace => InputRequest::DeletePrevChar,
            KeyCode::Delete => InputRequest::DeleteNextChar,
            KeyCode::Left => InputRequest::GoToPrevChar,
            KeyCode::Right => InputRequest::GoToNextChar,
            KeyCode::Home => InputRequest::GoToStart,
            KeyCode::End => InputRequest::GoToEnd,
            _ => return,
        };
        self.input.handle(request);
    }

    // --- Key Handler ---
    pub fn on_key(&mut self, key: KeyCode) {
        if self.editing.is_some() {
            self.on_edit_key(key);
            return;
        }
        match key {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('r') => self.request_manual_refresh(),
            KeyCode::Char('l') => self.toggle_show_live(),
            KeyCode::Char('u') => self.toggle_show_upcoming(),
            KeyCode::Char('a') => self.begin_edit(SettingField::ApiKey),
            KeyCode::Char('c') => self.begin_edit(SettingField::Channels),
            KeyCode::Char('g') => self.begin_edit(SettingField::Organizations),
            KeyCode::Down | KeyCode::Char('j') => self.select_next_row(),
            KeyCode::Up | KeyCode::Char('k') => self.select_prev_row(),
            KeyCode::Enter | KeyCode::Char('o') => self.open_selected_link(),
            KeyCode::PageDown => self.notifications.scroll_down(3),
            KeyCode::PageUp => self.notifications.scroll_up(3),
            _ => {}
        }
    }
}

pub fn start_ui(mut app: App) -> Result<()> {
    // Set up the terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app_loop(&mut terminal, &mut app);

    // Restore the terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    if let Err(e) = &res {
        error!("UI loop failed: {:#}", e);
    }
    res
}

pub fn run_app_loop<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    while !app.should_quit {
        app.tick(Instant::now());
        terminal.draw(|f| crate::ui::ui(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key_event) = event::read()? {
                if key_event.kind == KeyEventKind::Press {
                    app.on_key(key_event.code);
                }
            }
        }
    }

    Ok(())
}
