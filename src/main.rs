//! Pomodrive - a pomodoro timer with local persistence and folder backup.
//!
//! Every invocation runs one command against the stored timer document.
//! `pomodrive watch` stays in the foreground and ticks the timer every
//! second, delivering completion notifications.

use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

use chrono::Local;
use clap::Parser;

mod app;
mod engine;
mod event;
mod models;
mod notifications;
mod persistence;
mod sync;
mod timer;

use app::App;
use event::{Command, EventResult, View};
use models::{DailyStats, PomodoroData};
use notifications::DesktopNotifier;
use persistence::Database;
use sync::{FolderSync, StaticToken};
use timer::TimerMessage;

#[derive(Parser)]
#[command(name = "pomodrive", version, about = "Pomodoro timer with folder backup")]
struct Cli {
    /// Database file
    #[arg(long, env = "POMODRIVE_DB")]
    db: Option<PathBuf>,

    /// Directory that backups are written below
    #[arg(long, env = "POMODRIVE_SYNC_ROOT")]
    sync_root: Option<PathBuf>,

    /// Access token handed to the sync target
    #[arg(long, env = "POMODRIVE_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Print the whole document as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

fn default_sync_root() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join("PomodriveBackups"))
        .unwrap_or_else(|| PathBuf::from("PomodriveBackups"))
}

fn render(data: &PomodoroData, view: View) -> String {
    match view {
        View::Status => {
            let state = timer::live_state(&data.state, timer::now_ms());
            let stats = DailyStats::for_date(&data.sessions, Local::now().date_naive());
            let mut out = format!(
                "{}  {}  cycle {}\ntoday: {} pomodoros, {} min",
                timer::format_status(&state),
                state.current_phase.label(),
                state.cycle_count,
                stats.completed_pomodoros,
                stats.total_focus_minutes,
            );
            if let Some(group) = data
                .state
                .active_group_id
                .as_ref()
                .and_then(|id| data.groups.iter().find(|g| &g.id == id))
            {
                out.push_str(&format!("\ngroup: {}", group.name));
            }
            let tags: Vec<&str> = data
                .state
                .active_tag_ids
                .iter()
                .filter_map(|id| data.tags.iter().find(|t| &t.id == id))
                .map(|t| t.name.as_str())
                .collect();
            if !tags.is_empty() {
                out.push_str(&format!("\ntags: {}", tags.join(", ")));
            }
            if let Some(todo) = data
                .state
                .active_todo_id
                .as_ref()
                .and_then(|id| data.todos.iter().find(|t| &t.id == id))
            {
                out.push_str(&format!(
                    "\ntodo: {} ({}/{})",
                    todo.title, todo.completed_pomodoros, todo.planned_pomodoros
                ));
            }
            out
        }
        View::Groups => data
            .groups
            .iter()
            .map(|g| format!("{}  {}  {}", g.id, g.name, g.color))
            .collect::<Vec<_>>()
            .join("\n"),
        View::Tags => data
            .tags
            .iter()
            .map(|t| format!("{}  {}  {}", t.id, t.name, t.color))
            .collect::<Vec<_>>()
            .join("\n"),
        View::Todos => data
            .todos
            .iter()
            .map(|t| {
                let mark = if t.is_completed { "x" } else { " " };
                format!(
                    "[{}] {}  {} ({}/{})",
                    mark, t.id, t.title, t.completed_pomodoros, t.planned_pomodoros
                )
            })
            .collect::<Vec<_>>()
            .join("\n"),
        View::Sync => {
            let last = data
                .sync
                .last_sync_at
                .map(|at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "never".to_string());
            format!(
                "{}/{}  last sync: {}",
                data.sync.folder_path, data.sync.file_name, last
            )
        }
    }
}

/// Ticks the timer on a background thread and prints updates until killed.
fn watch(app: Arc<Mutex<App>>) {
    let (tx, rx) = mpsc::channel();

    let app_clone = Arc::clone(&app);
    thread::spawn(move || {
        timer::run_timer_loop(app_clone, tx);
    });

    for msg in rx {
        match msg {
            TimerMessage::StateChanged { title } => println!("{}", title),
            TimerMessage::Completed(event) => {
                let (summary, body) = notifications::message_for(&event);
                println!("{}\n{}", summary, body);
            }
            TimerMessage::Failed(error) => log::error!("Timer check failed: {}", error),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let db_path = cli.db.unwrap_or_else(Database::default_path);
    let sync_root = cli.sync_root.unwrap_or_else(default_sync_root);
    log::info!("Using database {}", db_path.display());

    let app = App::new(
        Box::new(Database::open(&db_path)?),
        Box::new(DesktopNotifier::new()),
        Box::new(FolderSync::new(sync_root)),
        Box::new(StaticToken(cli.token)),
    );
    let app = Arc::new(Mutex::new(app));

    let (result, completions) = {
        let mut app = app.lock().unwrap();
        let result = event::handle_command(&mut app, cli.command, timer::now_ms());
        (result, app.take_completions())
    };

    for event in &completions {
        let (summary, body) = notifications::message_for(event);
        if cli.json {
            eprintln!("{}\n{}", summary, body);
        } else {
            println!("{}\n{}\n", summary, body);
        }
    }
    let result = result?;

    match result {
        EventResult::Watch => watch(app),
        EventResult::Data { data, view } => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else {
                println!("{}", render(&data, view));
            }
        }
    }

    Ok(())
}
