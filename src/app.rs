use std::path::PathBuf;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{error, info, warn};

use crate::alarm::{AlarmLoop, NotifierChain};
use crate::config::{Config, MAX_BREAK_MINUTES};
use crate::errors::FlowError;
use crate::record::SessionRecord;
use crate::session::{SessionController, SessionEvent, TimerState};
use crate::store::RecordStore;
use crate::util::{format_hms, parse_break_minutes};

const EXPORT_FILE_NAME: &str = "flowtime_export.tsv";
const MAX_TASK_NAME_CHARS: usize = 80;

/// Popups drawn over the main timer screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay {
    None,
    BreakPrompt,
    Stats,
    ConfirmClear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub kind: StatusKind,
    pub text: String,
}

pub type NotifierFactory = Box<dyn Fn() -> NotifierChain>;

pub struct App {
    pub session: SessionController,
    pub store: RecordStore,
    pub config: Config,
    pub task_input: String,
    pub break_input: String,
    pub overlay: Overlay,
    pub status: Option<Status>,
    ticks: u64,
    alarm: Option<AlarmLoop>,
    notifiers: NotifierFactory,
    should_quit: bool,
}

impl App {
    pub fn new(config: Config, session: SessionController, store: RecordStore) -> Self {
        let chain_config = config.clone();
        Self {
            session,
            store,
            config,
            task_input: String::new(),
            break_input: String::new(),
            overlay: Overlay::None,
            status: None,
            ticks: 0,
            alarm: None,
            notifiers: Box::new(move || NotifierChain::from_config(&chain_config)),
            should_quit: false,
        }
    }

    /// Replace how the break-over alarm notifies
    pub fn with_notifiers(mut self, factory: NotifierFactory) -> Self {
        self.notifiers = factory;
        self
    }

    pub fn state(&self) -> TimerState {
        self.session.state()
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn alarm_ringing(&self) -> bool {
        self.alarm.as_ref().is_some_and(|a| a.is_running())
    }

    /// Alternates every tick while the alarm rings
    pub fn flash_on(&self) -> bool {
        self.state() == TimerState::Alarm && self.ticks % 2 == 0
    }

    pub fn export_path(&self) -> PathBuf {
        self.store
            .path()
            .parent()
            .map(|dir| dir.join(EXPORT_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(EXPORT_FILE_NAME))
    }

    pub fn on_tick(&mut self) {
        self.ticks = self.ticks.wrapping_add(1);
        self.session.tick();
        self.process_events();
    }

    pub fn on_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.quit();
            return;
        }

        match self.overlay {
            Overlay::BreakPrompt => self.on_break_prompt_key(key),
            Overlay::Stats => self.on_stats_key(key),
            Overlay::ConfirmClear => self.on_confirm_clear_key(key),
            Overlay::None => match self.state() {
                TimerState::Idle => self.on_idle_key(key),
                TimerState::Working => {
                    if matches!(key.code, KeyCode::Enter | KeyCode::Char(' ')) {
                        self.stop_focus();
                    }
                }
                TimerState::BreakSetup => self.overlay = Overlay::BreakPrompt,
                TimerState::Break => {
                    if matches!(key.code, KeyCode::Enter | KeyCode::Char('s')) {
                        self.skip_break();
                    }
                }
                TimerState::Alarm => {
                    if matches!(key.code, KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Esc) {
                        self.dismiss_alarm();
                    }
                }
            },
        }
        self.process_events();
    }

    /// Record whatever session is unfinished and silence the alarm
    pub fn shutdown(&mut self) {
        match self.state() {
            TimerState::Working => {
                if self.session.stop().is_ok() {
                    self.skip_break();
                }
            }
            TimerState::BreakSetup => self.skip_break(),
            _ => {}
        }
        self.stop_alarm();
    }

    fn quit(&mut self) {
        info!("quit requested");
        self.shutdown();
        self.should_quit = true;
    }

    fn on_idle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.quit(),
            KeyCode::Enter => self.start_focus(),
            KeyCode::Tab => self.overlay = Overlay::Stats,
            KeyCode::Backspace => {
                self.task_input.pop();
            }
            KeyCode::Char(c) => {
                if self.task_input.chars().count() < MAX_TASK_NAME_CHARS {
                    self.task_input.push(c);
                }
            }
            _ => {}
        }
    }

    fn on_break_prompt_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.confirm_break(),
            KeyCode::Esc => {
                self.overlay = Overlay::None;
                self.skip_break();
            }
            KeyCode::Backspace => {
                self.break_input.pop();
            }
            KeyCode::Char(c) if c.is_ascii_digit() && self.break_input.len() < 4 => {
                self.break_input.push(c);
            }
            _ => {}
        }
    }

    fn on_stats_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Tab => self.overlay = Overlay::None,
            KeyCode::Char('c') => self.overlay = Overlay::ConfirmClear,
            KeyCode::Char('e') => self.export(),
            _ => {}
        }
    }

    fn on_confirm_clear_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('y') {
            self.clear_history();
            self.overlay = Overlay::None;
        } else {
            self.overlay = Overlay::Stats;
        }
    }

    fn start_focus(&mut self) {
        match self.session.start(&self.task_input) {
            Ok(()) => self.info("Focus mode: on"),
            Err(e) => self.report(e),
        }
    }

    fn stop_focus(&mut self) {
        match self.session.stop() {
            Ok(suggested) => {
                self.break_input = suggested.to_string();
                self.overlay = Overlay::BreakPrompt;
            }
            Err(e) => self.report(e),
        }
    }

    fn confirm_break(&mut self) {
        let minutes = match parse_break_minutes(&self.break_input) {
            Ok(minutes) => minutes,
            Err(e) => {
                let fallback = self.config.default_break_minutes.clamp(1, MAX_BREAK_MINUTES);
                warn!("{}; using {} min", e, fallback);
                self.error(format!("{}; using {} min", e, fallback));
                fallback
            }
        };

        match self.session.begin_break(minutes) {
            Ok(record) => {
                self.overlay = Overlay::None;
                self.persist(record);
            }
            Err(e) => self.report(e),
        }
    }

    fn skip_break(&mut self) {
        match self.session.skip_break() {
            Ok(Some(record)) => self.persist(record),
            Ok(None) => {}
            Err(e) => self.report(e),
        }
    }

    fn dismiss_alarm(&mut self) {
        if let Err(e) = self.session.dismiss_alarm() {
            self.report(e);
        }
    }

    fn persist(&mut self, record: SessionRecord) {
        if let Err(e) = self.store.append(record) {
            error!("failed to save history: {}", e);
            self.error(format!("Could not save history: {}", e));
        }
    }

    fn clear_history(&mut self) {
        match self.store.clear() {
            Ok(()) => self.info("Data cleared"),
            Err(e) => {
                error!("failed to clear history: {}", e);
                self.error(e.to_string());
            }
        }
    }

    fn export(&mut self) {
        let path = self.export_path();
        match self.store.export_to_file(&path) {
            Ok(()) => self.info(format!("Exported to {}", path.display())),
            Err(e) => {
                error!("export failed: {}", e);
                self.error(format!("Export failed: {}", e));
            }
        }
    }

    fn process_events(&mut self) {
        for event in self.session.drain_events() {
            match event {
                SessionEvent::AlarmStarted => {
                    self.info("BREAK OVER!");
                    self.start_alarm();
                }
                SessionEvent::AlarmDismissed => {
                    self.stop_alarm();
                    self.task_input.clear();
                    self.info("Ready");
                }
                SessionEvent::BreakSkipped => {
                    self.stop_alarm();
                    self.task_input.clear();
                    self.info("Ready");
                }
                SessionEvent::Stopped { work_seconds, .. } => {
                    self.info(format!("Work done: {}", format_hms(work_seconds)));
                }
                SessionEvent::BreakStarted { .. } => {
                    if self.status.as_ref().map_or(true, |s| s.kind != StatusKind::Error) {
                        self.info("Relaxing...");
                    }
                }
                SessionEvent::Started { .. } => {}
            }
        }
    }

    fn start_alarm(&mut self) {
        self.stop_alarm();
        let interval = Duration::from_secs(self.config.alarm_interval_secs.max(1));
        self.alarm = Some(AlarmLoop::spawn((self.notifiers)(), interval));
    }

    fn stop_alarm(&mut self) {
        if let Some(alarm) = self.alarm.take() {
            let rings = alarm.stop();
            info!("alarm silenced after {} rings", rings);
        }
    }

    fn report(&mut self, e: FlowError) {
        if !e.is_validation() {
            error!("{}", e);
        }
        self.error(e.to_string());
    }

    fn info(&mut self, text: impl Into<String>) {
        self.status = Some(Status {
            kind: StatusKind::Info,
            text: text.into(),
        });
    }

    fn error(&mut self, text: impl Into<String>) {
        self.status = Some(Status {
            kind: StatusKind::Error,
            text: text.into(),
        });
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.stop_alarm();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ManualClock;
    use chrono::NaiveDate;
    use tempfile::{tempdir, TempDir};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_str(app: &mut App, s: &str) {
        for c in s.chars() {
            app.on_key(key(KeyCode::Char(c)));
        }
    }

    fn setup() -> (TempDir, ManualClock, App) {
        let dir = tempdir().unwrap();
        let clock = ManualClock::new(
            NaiveDate::from_ymd_opt(2024, 2, 1)
                .unwrap()
                .and_hms_opt(14, 0, 0)
                .unwrap(),
        );
        let app = App::new(
            Config::default(),
            SessionController::new(Box::new(clock.clone())),
            RecordStore::new(dir.path().join("sessions.json")),
        )
        .with_notifiers(Box::new(NotifierChain::new));
        (dir, clock, app)
    }

    #[test]
    fn test_enter_without_task_shows_error() {
        let (_dir, _clock, mut app) = setup();
        app.on_key(key(KeyCode::Enter));
        assert_eq!(app.state(), TimerState::Idle);
        let status = app.status.clone().unwrap();
        assert_eq!(status.kind, StatusKind::Error);
        assert_eq!(status.text, "Enter a task name first!");
    }

    #[test]
    fn test_typing_and_backspace() {
        let (_dir, _clock, mut app) = setup();
        type_str(&mut app, "abc");
        app.on_key(key(KeyCode::Backspace));
        assert_eq!(app.task_input, "ab");
    }

    #[test]
    fn test_full_cycle_records_session() {
        let (_dir, clock, mut app) = setup();
        type_str(&mut app, "essay");
        app.on_key(key(KeyCode::Enter));
        assert_eq!(app.state(), TimerState::Working);

        clock.advance(30 * 60);
        app.on_tick();
        app.on_key(key(KeyCode::Enter));
        assert_eq!(app.state(), TimerState::BreakSetup);
        assert_eq!(app.overlay, Overlay::BreakPrompt);
        assert_eq!(app.break_input, "6");

        app.on_key(key(KeyCode::Backspace));
        app.on_key(key(KeyCode::Char('1')));
        app.on_key(key(KeyCode::Enter));
        assert_eq!(app.state(), TimerState::Break);
        assert_eq!(app.overlay, Overlay::None);

        assert_eq!(app.store.len(), 1);
        let rec = &app.store.records()[0];
        assert_eq!(rec.task_name, "essay");
        assert_eq!(rec.work_duration, 1800);
        assert_eq!(rec.break_duration, 60);

        for _ in 0..60 {
            app.on_tick();
        }
        assert_eq!(app.state(), TimerState::Alarm);
        assert!(app.alarm_ringing());

        app.on_key(key(KeyCode::Enter));
        assert_eq!(app.state(), TimerState::Idle);
        assert!(!app.alarm_ringing());
        assert!(app.task_input.is_empty());
    }

    #[test]
    fn test_empty_break_input_uses_default() {
        let (_dir, _clock, mut app) = setup();
        type_str(&mut app, "t");
        app.on_key(key(KeyCode::Enter));
        app.on_key(key(KeyCode::Enter));
        app.break_input.clear();
        app.on_key(key(KeyCode::Enter));
        assert_eq!(app.state(), TimerState::Break);
        assert_eq!(app.session.break_total(), 3 * 60);
        assert_eq!(app.status.clone().unwrap().kind, StatusKind::Error);
    }

    #[test]
    fn test_oversized_default_break_is_capped() {
        let (dir, clock, _) = setup();
        let mut app = App::new(
            Config {
                default_break_minutes: u64::MAX,
                ..Config::default()
            },
            SessionController::new(Box::new(clock.clone())),
            RecordStore::new(dir.path().join("sessions.json")),
        )
        .with_notifiers(Box::new(NotifierChain::new));

        type_str(&mut app, "t");
        app.on_key(key(KeyCode::Enter));
        app.on_key(key(KeyCode::Enter));
        app.break_input = "9999".to_string();
        app.on_key(key(KeyCode::Enter));
        assert_eq!(app.state(), TimerState::Break);
        assert_eq!(app.session.break_total(), MAX_BREAK_MINUTES * 60);
        assert_eq!(app.store.records()[0].break_duration, MAX_BREAK_MINUTES * 60);
    }

    #[test]
    fn test_escape_in_prompt_skips_break_but_records() {
        let (_dir, clock, mut app) = setup();
        type_str(&mut app, "t");
        app.on_key(key(KeyCode::Enter));
        clock.advance(120);
        app.on_key(key(KeyCode::Char(' ')));
        app.on_key(key(KeyCode::Esc));
        assert_eq!(app.state(), TimerState::Idle);
        assert_eq!(app.store.len(), 1);
        assert_eq!(app.store.records()[0].break_duration, 0);
    }

    #[test]
    fn test_skip_running_break() {
        let (_dir, _clock, mut app) = setup();
        type_str(&mut app, "t");
        app.on_key(key(KeyCode::Enter));
        app.on_key(key(KeyCode::Enter));
        app.on_key(key(KeyCode::Enter));
        assert_eq!(app.state(), TimerState::Break);
        app.on_key(key(KeyCode::Char('s')));
        assert_eq!(app.state(), TimerState::Idle);
        assert_eq!(app.store.len(), 1);
    }

    #[test]
    fn test_stats_clear_flow() {
        let (_dir, _clock, mut app) = setup();
        type_str(&mut app, "t");
        app.on_key(key(KeyCode::Enter));
        app.on_key(key(KeyCode::Enter));
        app.on_key(key(KeyCode::Esc));
        assert_eq!(app.store.len(), 1);
        assert!(app.store.path().exists());

        app.on_key(key(KeyCode::Tab));
        assert_eq!(app.overlay, Overlay::Stats);
        app.on_key(key(KeyCode::Char('c')));
        assert_eq!(app.overlay, Overlay::ConfirmClear);
        app.on_key(key(KeyCode::Char('n')));
        assert_eq!(app.overlay, Overlay::Stats);
        assert_eq!(app.store.len(), 1);

        app.on_key(key(KeyCode::Char('c')));
        app.on_key(key(KeyCode::Char('y')));
        assert_eq!(app.overlay, Overlay::None);
        assert!(app.store.is_empty());
        assert!(!app.store.path().exists());
    }

    #[test]
    fn test_export_writes_next_to_data() {
        let (dir, _clock, mut app) = setup();
        type_str(&mut app, "t");
        app.on_key(key(KeyCode::Enter));
        app.on_key(key(KeyCode::Enter));
        app.on_key(key(KeyCode::Esc));

        app.on_key(key(KeyCode::Tab));
        app.on_key(key(KeyCode::Char('e')));
        let exported = std::fs::read_to_string(dir.path().join(EXPORT_FILE_NAME)).unwrap();
        assert!(exported.starts_with("Task\tStart\tEnd\tWork\tBreak"));
        assert_eq!(exported.lines().count(), 2);
    }

    #[test]
    fn test_quit_while_working_records_session() {
        let (_dir, clock, mut app) = setup();
        type_str(&mut app, "late night");
        app.on_key(key(KeyCode::Enter));
        clock.advance(42);
        app.on_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit());
        assert_eq!(app.store.len(), 1);
        assert_eq!(app.store.records()[0].work_duration, 42);
    }

    #[test]
    fn test_escape_when_idle_quits() {
        let (_dir, _clock, mut app) = setup();
        app.on_key(key(KeyCode::Esc));
        assert!(app.should_quit());
        assert!(app.store.is_empty());
    }

    #[test]
    fn test_flash_alternates_during_alarm() {
        let (_dir, _clock, mut app) = setup();
        type_str(&mut app, "t");
        app.on_key(key(KeyCode::Enter));
        app.on_key(key(KeyCode::Enter));
        app.break_input = "1".to_string();
        app.on_key(key(KeyCode::Enter));
        assert!(!app.flash_on());
        for _ in 0..60 {
            app.on_tick();
        }
        let first = app.flash_on();
        app.on_tick();
        assert_ne!(first, app.flash_on());
    }
}
