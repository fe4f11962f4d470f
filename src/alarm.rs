//! Break-over notification: an ordered chain of notifiers and a
//! background loop that repeats the chain until cancelled.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::Config;
use crate::errors::{FlowError, FlowResult};

const POLL_SLICE: Duration = Duration::from_millis(50);

pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;
    fn notify(&self, title: &str, body: &str) -> FlowResult<()>;
}

/// Plays a sound file with the first available command-line player
pub struct SoundCommandNotifier {
    sound_file: PathBuf,
    players: Vec<&'static str>,
}

impl SoundCommandNotifier {
    pub fn new(sound_file: PathBuf) -> Self {
        Self::with_players(sound_file, vec!["paplay", "aplay", "afplay"])
    }

    pub fn with_players(sound_file: PathBuf, players: Vec<&'static str>) -> Self {
        Self {
            sound_file,
            players,
        }
    }
}

impl Notifier for SoundCommandNotifier {
    fn name(&self) -> &str {
        "sound"
    }

    /// Blocks until the player exits; only a zero exit status counts.
    fn notify(&self, _title: &str, _body: &str) -> FlowResult<()> {
        if !self.sound_file.exists() {
            return Err(FlowError::Playback(format!(
                "sound file {} not found",
                self.sound_file.display()
            )));
        }

        let mut last_err = FlowError::Playback("no sound player available".to_string());
        for player in &self.players {
            let status = Command::new(player)
                .arg(&self.sound_file)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status();
            match status {
                Ok(status) if status.success() => return Ok(()),
                Ok(status) => {
                    debug!("{} failed: {}", player, status);
                    last_err = FlowError::Playback(format!("{} exited with {}", player, status));
                }
                Err(e) => debug!("{} unavailable: {}", player, e),
            }
        }
        Err(last_err)
    }
}

/// Desktop notification via the platform notification service
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn name(&self) -> &str {
        "desktop"
    }

    fn notify(&self, title: &str, body: &str) -> FlowResult<()> {
        notify_rust::Notification::new()
            .summary(title)
            .body(body)
            .appname("flowtime")
            .icon("alarm-clock")
            .show()
            .map(|_| ())
            .map_err(|e| FlowError::Playback(e.to_string()))
    }
}

/// Terminal bell; the last resort
pub struct BellNotifier;

impl Notifier for BellNotifier {
    fn name(&self) -> &str {
        "bell"
    }

    fn notify(&self, _title: &str, _body: &str) -> FlowResult<()> {
        let mut stdout = std::io::stdout();
        stdout.write_all(b"\x07")?;
        stdout.flush()?;
        Ok(())
    }
}

/// Notifiers tried in priority order until one succeeds
#[derive(Default)]
pub struct NotifierChain {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotifierChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    /// Sound (when enabled and configured), then desktop, then bell
    pub fn from_config(cfg: &Config) -> Self {
        let mut chain = Self::new();
        if cfg.sound_enabled {
            if let Some(path) = &cfg.sound_file {
                chain = chain.with(Box::new(SoundCommandNotifier::new(path.clone())));
            }
        }
        chain
            .with(Box::new(DesktopNotifier))
            .with(Box::new(BellNotifier))
    }

    pub fn len(&self) -> usize {
        self.notifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }

    /// Name of the notifier that succeeded
    pub fn notify(&self, title: &str, body: &str) -> FlowResult<&str> {
        let mut last_err = FlowError::Playback("no notifiers configured".to_string());
        for notifier in &self.notifiers {
            match notifier.notify(title, body) {
                Ok(()) => return Ok(notifier.name()),
                Err(e) => {
                    debug!("notifier {} failed: {}", notifier.name(), e);
                    last_err = e;
                }
            }
        }
        warn!("all notifiers failed: {}", last_err);
        Err(last_err)
    }
}

/// Cancellation flag with a single writer. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Background thread that rings the chain every `interval` until stopped
pub struct AlarmLoop {
    token: CancelToken,
    handle: Option<JoinHandle<u32>>,
}

impl AlarmLoop {
    pub fn spawn(chain: NotifierChain, interval: Duration) -> Self {
        let token = CancelToken::new();
        let observer = token.clone();

        let handle = thread::spawn(move || {
            let mut rings = 0u32;
            while !observer.is_cancelled() {
                let _ = chain.notify("Break is over", "Back to work!");
                rings += 1;

                let deadline = Instant::now() + interval;
                while Instant::now() < deadline {
                    if observer.is_cancelled() {
                        return rings;
                    }
                    thread::sleep(POLL_SLICE.min(interval));
                }
            }
            rings
        });

        Self {
            token,
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Cancel and wait for the thread. Returns how many times it rang.
    pub fn stop(mut self) -> u32 {
        self.shutdown()
    }

    fn shutdown(&mut self) -> u32 {
        self.token.cancel();
        match self.handle.take() {
            Some(handle) => handle.join().unwrap_or(0),
            None => 0,
        }
    }
}

impl Drop for AlarmLoop {
    fn drop(&mut self) {
        self.shutdown();
    }
}
