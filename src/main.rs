use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use flowtime::{
    app::App,
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore, MAX_BREAK_MINUTES},
    runtime::{CrosstermEventSource, FixedTicker, FlowEvent, Runner},
    session::SessionController,
    store::RecordStore,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin},
    path::{Path, PathBuf},
    sync::Mutex,
};
use tracing_subscriber::EnvFilter;

/// focus timer tui: work until you stop, then take a break sized to the work
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A flowtime focus timer. Start a focus session on a task, stop when you lose focus, and take a break proportional to the work you did. Sessions are kept in a local history."
)]
pub struct Cli {
    /// session history file (JSON)
    #[clap(short = 'd', long)]
    data_file: Option<PathBuf>,

    /// break length used when the break prompt input is not a number
    #[clap(short = 'b', long)]
    break_minutes: Option<u64>,

    /// sound file played when a break ends
    #[clap(long)]
    sound_file: Option<PathBuf>,

    /// never play a sound; use desktop notifications and the terminal bell
    #[clap(long)]
    no_sound: bool,

    /// print the session history as tab separated values and exit
    #[clap(long, conflicts_with = "clear")]
    export: bool,

    /// delete the session history and exit
    #[clap(long)]
    clear: bool,
}

impl Cli {
    /// Layer command-line overrides over the stored config
    fn apply(&self, mut cfg: Config) -> Config {
        if let Some(path) = &self.data_file {
            cfg.data_file = Some(path.clone());
        }
        if let Some(minutes) = self.break_minutes {
            cfg.default_break_minutes = minutes.clamp(1, MAX_BREAK_MINUTES);
        }
        if let Some(path) = &self.sound_file {
            cfg.sound_file = Some(path.clone());
        }
        if self.no_sound {
            cfg.sound_enabled = false;
        }
        cfg
    }
}

fn init_logging(path: &Path) {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(path) else {
        return;
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(&AppDirs::log_path());

    let config = cli.apply(FileConfigStore::new().load());
    let data_path = config.data_path();
    tracing::info!("using history at {}", data_path.display());

    if cli.export {
        let store = RecordStore::open(&data_path);
        store.export_tsv(io::stdout().lock())?;
        return Ok(());
    }

    if cli.clear {
        let mut store = RecordStore::open(&data_path);
        let count = store.len();
        store.clear()?;
        println!("Cleared {} sessions from {}", count, data_path.display());
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let store = RecordStore::open(&data_path);
    let mut app = App::new(config, SessionController::default(), store);

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app);
    app.shutdown();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(CrosstermEventSource::new(), FixedTicker::every_second());

    terminal.draw(|f| f.render_widget(&*app, f.area()))?;

    while !app.should_quit() {
        match runner.step() {
            FlowEvent::Tick => app.on_tick(),
            FlowEvent::Resize => {}
            FlowEvent::Key(key) => app.on_key(key),
        }
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;
    }

    Ok(())
}
