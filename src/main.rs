use std::path::PathBuf;
use std::{io, process, thread};

use chrono::Local;
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use deadline_tracker::config::{CliArgs, Command, TaskArgs, TrackerConfig};
use deadline_tracker::deadline;
use deadline_tracker::notify::{NotificationSink, StdoutSink};
use deadline_tracker::reminder;
use deadline_tracker::store::TaskStore;
use deadline_tracker::task::{TaskError, TaskRecord};
use deadline_tracker::task_board::TaskBoard;
use deadline_tracker::ui::{self, App};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliArgs::parse();
    // Config errors are fatal; never fall back to another task file.
    let config = match TrackerConfig::load(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err}");
            process::exit(2);
        }
    };
    let _log_guard = init_logging(&cli.log_level, cli.log_file.clone());
    tracing::info!(store = %config.store_path.display(), "deadline-tracker starting");

    let store = TaskStore::new(config.store_path.clone());
    let now = Local::now().naive_local();
    let mut board = TaskBoard::from_records(store.load(), config.reminder_interval, now);

    match cli.command {
        None => run_tui(board, store, &config)?,
        Some(Command::Add(args)) => {
            let record = parse_task(&args)?;
            println!("Added: {}", record.display_line());
            board.add(record, now);
            store.save(&board.to_records())?;
        }
        Some(Command::List) => list(&board),
        Some(Command::Done { position }) => {
            let id = board
                .id_at(position.wrapping_sub(1))
                .ok_or(TaskError::NotFound(position))?;
            let completed = board.toggle_completed(id, now).unwrap_or_default();
            println!(
                "Task {position} marked {}",
                if completed { "completed" } else { "not completed" }
            );
            store.save(&board.to_records())?;
        }
        Some(Command::Rm { position }) => {
            let id = board
                .id_at(position.wrapping_sub(1))
                .ok_or(TaskError::NotFound(position))?;
            if let Some(record) = board.delete(id) {
                println!("Deleted: {}", record.display_line());
            }
            store.save(&board.to_records())?;
        }
        Some(Command::Edit { position, task }) => {
            let id = board
                .id_at(position.wrapping_sub(1))
                .ok_or(TaskError::NotFound(position))?;
            let record = parse_task(&task)?;
            println!("Updated: {}", record.display_line());
            board.edit(id, record, now);
            store.save(&board.to_records())?;
        }
        Some(Command::Check) => {
            let mut sink = StdoutSink;
            for message in reminder::sweep_overdue(board.records(), now) {
                sink.notify(&message);
            }
            println!("There are {} delayed tasks.", board.overdue_count(now));
        }
        Some(Command::Watch) => watch(board, &config),
    }

    tracing::info!("deadline-tracker exiting");
    Ok(())
}

fn parse_task(args: &TaskArgs) -> Result<TaskRecord, TaskError> {
    TaskRecord::from_input(&args.text, &args.date, &args.time, &args.meridiem)
}

fn list(board: &TaskBoard) {
    let now = Local::now().naive_local();
    for (position, record) in board.records().enumerate() {
        let marker = if record.completed {
            "[x]"
        } else if deadline::evaluate(record, now).is_overdue {
            "[!]"
        } else {
            "[ ]"
        };
        println!("{:>3}. {marker} {}", position + 1, record.display_line());
    }
}

/// Headless reminder loop. Reloads nothing; edits made elsewhere are not
/// picked up until restart.
fn watch(mut board: TaskBoard, config: &TrackerConfig) {
    let mut sink = StdoutSink;
    let now = Local::now().naive_local();
    for message in reminder::sweep_overdue(board.records(), now) {
        sink.notify(&message);
    }
    while board.active_reminders() > 0 {
        thread::sleep(config.poll_timeout);
        board.tick(Local::now().naive_local(), &mut sink);
    }
    tracing::info!("no active reminders left");
}

fn run_tui(
    board: TaskBoard,
    store: TaskStore,
    config: &TrackerConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(board, store);
    let result = ui::run_app(&mut terminal, &mut app, config.poll_timeout);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        tracing::error!(%err, "ui loop failed");
        eprintln!("{:?}", err);
    }
    Ok(())
}

const DEFAULT_LOG_FILE: &str = "deadline-tracker.log";

/// Logs go to a file because the UI owns the terminal. Keep the guard alive
/// until exit or buffered lines are lost.
fn init_logging(level: &str, log_file: Option<PathBuf>) -> Option<WorkerGuard> {
    let log_file = log_file.unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_LOG_FILE));
    let (Some(dir), Some(name)) = (log_file.parent(), log_file.file_name()) else {
        eprintln!("Warning: not logging, bad log file path {}", log_file.display());
        return None;
    };

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_env_filter(filter)
        .with_ansi(false)
        .init();
    Some(guard)
}
