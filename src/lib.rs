pub mod app;
pub mod db;
pub mod event;
pub mod history;
pub mod models;
pub mod notify;
pub mod paths;
pub mod settings;
pub mod timer;
pub mod tui;
pub mod ui;

use std::{fs::OpenOptions, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use app::{Action, UiState};
use db::{Database, SessionStore};
use event::{AppEvent, EventHandler};
use notify::{DesktopNotifier, Notifier};
use settings::Settings;
use timer::TimerController;
use tui::Tui;

/// A minimal Pomodoro timer widget with per-date session history.
#[derive(Debug, Parser)]
#[command(name = "pmo", version, about)]
pub struct Args {
    /// Work period length in minutes
    #[arg(long)]
    pub work: Option<u32>,
    /// Short break length in minutes
    #[arg(long)]
    pub short_break: Option<u32>,
    /// Long break length in minutes
    #[arg(long)]
    pub long_break: Option<u32>,
    /// Start a cycle for this task right away
    #[arg(long)]
    pub task: Option<String>,
    /// Disable the audio cue
    #[arg(long)]
    pub no_sound: bool,
    /// Database file location (defaults to the per-OS data directory)
    #[arg(long)]
    pub db_path: Option<PathBuf>,
}

pub async fn run(args: Args) -> Result<()> {
    let data_dir = paths::data_dir()?;

    // Raw mode owns the terminal, so logging goes to a file instead.
    let log_path = data_dir.join("pmo.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open log file {}", log_path.display()))?;
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();

    info!("pmo starting up...");

    let mut settings = Settings::load_or_init(&data_dir.join("pmo.json"))?;
    if let Some(minutes) = args.work {
        settings.durations.work_secs = minutes.max(1) * 60;
    }
    if let Some(minutes) = args.short_break {
        settings.durations.short_break_secs = minutes.max(1) * 60;
    }
    if let Some(minutes) = args.long_break {
        settings.durations.long_break_secs = minutes.max(1) * 60;
    }
    if args.no_sound {
        settings.sound_enabled = false;
    }

    let db_path = args.db_path.unwrap_or_else(|| data_dir.join("pmo.db"));
    let database = Database::new(db_path)?;
    let store: Arc<dyn SessionStore> = Arc::new(database);

    let notifier: Arc<dyn Notifier> = Arc::new(DesktopNotifier::new(settings.sound_enabled));
    let controller = TimerController::new(settings.durations, store.clone(), notifier);

    let mut ui_state = UiState::new(settings.durations);
    if let Some(task) = &args.task {
        ui_state.task_input = task.clone();
        ui_state.timer = controller.start(task).await;
    }

    tui::install_panic_hook();
    let mut terminal = tui::init_tui().context("failed to initialize terminal")?;
    let mut events = EventHandler::new();
    event::spawn_event_task(events.tx.clone());

    let loop_result =
        run_event_loop(&mut terminal, &mut events, &mut ui_state, &controller, &store).await;

    tui::restore_tui().context("failed to restore terminal")?;
    info!("pmo shutting down");
    loop_result
}

async fn run_event_loop(
    terminal: &mut Tui,
    events: &mut EventHandler,
    ui_state: &mut UiState,
    controller: &TimerController,
    store: &Arc<dyn SessionStore>,
) -> Result<()> {
    while let Some(event) = events.rx.recv().await {
        match event {
            AppEvent::Tick => {
                ui_state.timer = controller.snapshot().await;
            }
            AppEvent::Render => {
                terminal.draw(|frame| ui::render(frame, ui_state))?;
            }
            AppEvent::Resize(..) => {}
            AppEvent::Key(key) => match ui_state.handle_key(key) {
                Action::Quit => break,
                Action::Start => {
                    let task = ui_state.task_input.clone();
                    ui_state.timer = controller.start(&task).await;
                }
                Action::Pause => {
                    ui_state.timer = controller.pause().await;
                }
                Action::Reset => {
                    ui_state.timer = controller.reset().await;
                }
                Action::Fetch(query) => {
                    history::spawn_fetch(store.clone(), events.tx.clone(), query);
                }
                Action::None => {}
            },
            AppEvent::HistoryLoaded { query, result } => {
                ui_state.history.apply_fetch(query, result);
            }
        }
    }

    Ok(())
}
