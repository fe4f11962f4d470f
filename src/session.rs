use std::sync::{Arc, Mutex};

use chrono::{Duration, Local, NaiveDateTime, Timelike};
use tracing::{debug, info};

use crate::config::MAX_BREAK_MINUTES;
use crate::errors::{FlowError, FlowResult};
use crate::record::SessionRecord;
use crate::util::suggested_break_minutes;

/// Source of wall-clock time, truncated to whole seconds
pub trait Clock: Send {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        let now = Local::now().naive_local();
        now.with_nanosecond(0).unwrap_or(now)
    }
}

/// Hand-driven clock for headless runs and tests. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<NaiveDateTime>>,
}

impl ManualClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, secs: i64) {
        if let Ok(mut now) = self.now.lock() {
            *now += Duration::seconds(secs);
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        match self.now.lock() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum TimerState {
    #[strum(serialize = "Ready to focus")]
    Idle,
    #[strum(serialize = "Focus mode: on")]
    Working,
    #[strum(serialize = "Work done, choose a break")]
    BreakSetup,
    #[strum(serialize = "Relaxing...")]
    Break,
    #[strum(serialize = "BREAK OVER!")]
    Alarm,
}

/// Transition notifications for whoever renders the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Started { task_name: String },
    Stopped { work_seconds: u64, suggested_minutes: u64 },
    BreakStarted { seconds: u64 },
    AlarmStarted,
    AlarmDismissed,
    BreakSkipped,
}

/// Where the controller is, with the data that only exists in that phase
#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Idle,
    Working {
        task_name: String,
        started_at: NaiveDateTime,
        elapsed_secs: u64,
    },
    BreakSetup {
        record: SessionRecord,
    },
    Break {
        task_name: String,
        remaining: u64,
        total: u64,
    },
    Alarm {
        task_name: String,
        total: u64,
    },
}

/// The focus/break state machine. Owns the only mutable timer state.
pub struct SessionController {
    clock: Box<dyn Clock>,
    phase: Phase,
    events: Vec<SessionEvent>,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("phase", &self.phase)
            .finish()
    }
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new(Box::new(SystemClock))
    }
}

impl SessionController {
    pub fn new(clock: Box<dyn Clock>) -> Self {
        Self {
            clock,
            phase: Phase::Idle,
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> TimerState {
        match self.phase {
            Phase::Idle => TimerState::Idle,
            Phase::Working { .. } => TimerState::Working,
            Phase::BreakSetup { .. } => TimerState::BreakSetup,
            Phase::Break { .. } => TimerState::Break,
            Phase::Alarm { .. } => TimerState::Alarm,
        }
    }

    pub fn task_name(&self) -> Option<&str> {
        match &self.phase {
            Phase::Idle => None,
            Phase::BreakSetup { record } => Some(&record.task_name),
            Phase::Working { task_name, .. }
            | Phase::Break { task_name, .. }
            | Phase::Alarm { task_name, .. } => Some(task_name),
        }
    }

    /// The finished focus session waiting for a break length
    pub fn pending(&self) -> Option<&SessionRecord> {
        match &self.phase {
            Phase::BreakSetup { record } => Some(record),
            _ => None,
        }
    }

    pub fn break_remaining(&self) -> u64 {
        match self.phase {
            Phase::Break { remaining, .. } => remaining,
            _ => 0,
        }
    }

    pub fn break_total(&self) -> u64 {
        match self.phase {
            Phase::Break { total, .. } | Phase::Alarm { total, .. } => total,
            _ => 0,
        }
    }

    /// Seconds to show on the big timer: elapsed while working,
    /// remaining while on break
    pub fn display_seconds(&self) -> u64 {
        match &self.phase {
            Phase::Working { elapsed_secs, .. } => *elapsed_secs,
            Phase::BreakSetup { record } => record.work_duration,
            Phase::Break { remaining, .. } => *remaining,
            Phase::Alarm { .. } | Phase::Idle => 0,
        }
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn start(&mut self, task_name: &str) -> FlowResult<()> {
        if self.phase != Phase::Idle {
            return Err(wrong_state(self.state(), "start a session"));
        }
        let task = task_name.trim();
        if task.is_empty() {
            return Err(FlowError::Validation("Enter a task name first!".to_string()));
        }

        info!("focus started on '{}'", task);
        self.phase = Phase::Working {
            task_name: task.to_string(),
            started_at: self.clock.now(),
            elapsed_secs: 0,
        };
        self.events.push(SessionEvent::Started {
            task_name: task.to_string(),
        });
        Ok(())
    }

    /// End the focus block. Returns the suggested break length in minutes.
    pub fn stop(&mut self) -> FlowResult<u64> {
        let Phase::Working {
            task_name,
            started_at,
            ..
        } = &self.phase
        else {
            return Err(wrong_state(self.state(), "stop"));
        };

        let record = SessionRecord::new(task_name.clone(), *started_at, self.clock.now());
        let suggested = suggested_break_minutes(record.work_duration);
        info!(
            "focus stopped after {}s, suggesting {} min break",
            record.work_duration, suggested
        );

        self.events.push(SessionEvent::Stopped {
            work_seconds: record.work_duration,
            suggested_minutes: suggested,
        });
        self.phase = Phase::BreakSetup { record };
        Ok(suggested)
    }

    /// Start the break countdown. Returns the finished record to persist.
    pub fn begin_break(&mut self, minutes: u64) -> FlowResult<SessionRecord> {
        if !matches!(self.phase, Phase::BreakSetup { .. }) {
            return Err(wrong_state(self.state(), "begin a break"));
        }
        if !(1..=MAX_BREAK_MINUTES).contains(&minutes) {
            return Err(FlowError::Validation(format!(
                "Break length must be between 1 and {} minutes",
                MAX_BREAK_MINUTES
            )));
        }
        let Phase::BreakSetup { record } = std::mem::replace(&mut self.phase, Phase::Idle) else {
            unreachable!("phase checked above");
        };

        let seconds = minutes * 60;
        info!("break started: {} min", minutes);
        self.phase = Phase::Break {
            task_name: record.task_name.clone(),
            remaining: seconds,
            total: seconds,
        };
        self.events.push(SessionEvent::BreakStarted { seconds });
        Ok(record.with_break(seconds))
    }

    /// Leave the break flow early. When the break was never started the
    /// finished session is returned so it can still be recorded.
    pub fn skip_break(&mut self) -> FlowResult<Option<SessionRecord>> {
        let record = match &self.phase {
            Phase::BreakSetup { record } => Some(record.clone()),
            Phase::Break { .. } => None,
            _ => return Err(wrong_state(self.state(), "skip a break")),
        };
        info!("break skipped");
        self.reset();
        self.events.push(SessionEvent::BreakSkipped);
        Ok(record)
    }

    pub fn dismiss_alarm(&mut self) -> FlowResult<()> {
        if !matches!(self.phase, Phase::Alarm { .. }) {
            return Err(wrong_state(self.state(), "dismiss the alarm"));
        }
        info!("alarm dismissed");
        self.reset();
        self.events.push(SessionEvent::AlarmDismissed);
        Ok(())
    }

    /// Advance one second
    pub fn tick(&mut self) {
        let now = self.clock.now();
        match &mut self.phase {
            Phase::Working {
                started_at,
                elapsed_secs,
                ..
            } => {
                *elapsed_secs = (now - *started_at).num_seconds().max(0) as u64;
            }
            Phase::Break { remaining, .. } => {
                *remaining = remaining.saturating_sub(1);
            }
            Phase::Idle | Phase::BreakSetup { .. } | Phase::Alarm { .. } => {}
        }

        if matches!(self.phase, Phase::Break { remaining: 0, .. }) {
            if let Phase::Break {
                task_name, total, ..
            } = std::mem::replace(&mut self.phase, Phase::Idle)
            {
                info!("break over");
                self.phase = Phase::Alarm { task_name, total };
                self.events.push(SessionEvent::AlarmStarted);
            }
        }
    }

    fn reset(&mut self) {
        debug!("session reset to idle");
        self.phase = Phase::Idle;
    }
}

fn wrong_state(state: TimerState, action: &str) -> FlowError {
    FlowError::Validation(format!("Cannot {} while {:?}", action, state))
}
