//! Command line command handling.

use crate::app::{App, AppError, Request};
use crate::models::{Group, PomodoroData, SyncConfig, Tag, Todo};
use clap::Subcommand;
use uuid::Uuid;

const DEFAULT_COLOR: &str = "#e74c3c";

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Show the timer and today's stats
    Status,
    /// Start or resume the current phase
    Start,
    /// Pause the running phase
    Pause,
    /// Stop and return to a fresh focus phase
    Reset,
    /// Jump to the next phase without completing this one
    Skip,
    /// Keep running, ticking the timer every second
    Watch,
    /// Change timer settings
    Settings {
        /// Focus length in minutes
        #[arg(long)]
        focus: Option<u32>,
        /// Short break length in minutes
        #[arg(long)]
        short: Option<u32>,
        /// Long break length in minutes
        #[arg(long)]
        long: Option<u32>,
        /// Take a long break after this many focus phases
        #[arg(long)]
        long_every: Option<u32>,
        /// Start breaks automatically
        #[arg(long)]
        auto_breaks: Option<bool>,
        /// Start focus automatically after a break
        #[arg(long)]
        auto_focus: Option<bool>,
        /// Show desktop notifications
        #[arg(long)]
        notifications: Option<bool>,
    },
    /// Manage groups
    Group {
        #[command(subcommand)]
        action: LabelAction,
    },
    /// Manage tags
    Tag {
        #[command(subcommand)]
        action: LabelAction,
    },
    /// Manage todos
    Todo {
        #[command(subcommand)]
        action: TodoAction,
    },
    /// Choose what the current focus session counts towards
    Select {
        #[arg(long, conflicts_with = "no_group")]
        group: Option<String>,
        /// Clear the active group
        #[arg(long)]
        no_group: bool,
        /// Active tags, in order (replaces the current selection)
        #[arg(long = "tag")]
        tags: Option<Vec<String>>,
        #[arg(long, conflicts_with = "no_todo")]
        todo: Option<String>,
        /// Clear the active todo
        #[arg(long)]
        no_todo: bool,
    },
    /// Change where backups go
    SyncConfig {
        /// Folder path below the sync root, `/`-separated
        #[arg(long)]
        folder: Option<String>,
        /// Backup file name
        #[arg(long)]
        file: Option<String>,
    },
    /// Upload the local data to the backup folder
    Push,
    /// Replace the local data with the backup
    Pull,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum LabelAction {
    /// List entries
    List,
    /// Add an entry
    Add {
        name: String,
        #[arg(long, default_value = DEFAULT_COLOR)]
        color: String,
    },
    /// Remove an entry by id
    Remove { id: String },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum TodoAction {
    /// List todos
    List,
    /// Add a todo
    Add {
        title: String,
        /// Planned number of pomodoros
        #[arg(long, default_value_t = 1)]
        planned: u32,
    },
    /// Remove a todo by id
    Remove { id: String },
}

/// Which part of the document the caller wants to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Status,
    Groups,
    Tags,
    Todos,
    Sync,
}

/// Result of handling a command.
#[derive(Debug, Clone, PartialEq)]
pub enum EventResult {
    /// Command applied, show `view` of the new document.
    Data { data: PomodoroData, view: View },
    /// User asked to keep the timer running in the foreground.
    Watch,
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Applies `command` at time `now` and returns what to display.
pub fn handle_command(app: &mut App, command: Command, now: i64) -> Result<EventResult, AppError> {
    let (requests, view) = match command {
        Command::Watch => return Ok(EventResult::Watch),
        Command::Status => (vec![Request::GetData], View::Status),
        Command::Start => (vec![Request::TimerStart], View::Status),
        Command::Pause => (vec![Request::TimerPause], View::Status),
        Command::Reset => (vec![Request::TimerReset], View::Status),
        Command::Skip => (vec![Request::TimerSkip], View::Status),
        Command::Settings {
            focus,
            short,
            long,
            long_every,
            auto_breaks,
            auto_focus,
            notifications,
        } => {
            let mut settings = app.handle(Request::GetData, now)?.settings;
            settings.focus_minutes = focus.unwrap_or(settings.focus_minutes);
            settings.short_break_minutes = short.unwrap_or(settings.short_break_minutes);
            settings.long_break_minutes = long.unwrap_or(settings.long_break_minutes);
            settings.long_break_every = long_every.unwrap_or(settings.long_break_every);
            settings.auto_start_breaks = auto_breaks.unwrap_or(settings.auto_start_breaks);
            settings.auto_start_focus = auto_focus.unwrap_or(settings.auto_start_focus);
            settings.notifications_enabled =
                notifications.unwrap_or(settings.notifications_enabled);
            (vec![Request::UpdateSettings(settings)], View::Status)
        }
        Command::Group { action } => {
            let mut groups = app.handle(Request::GetData, now)?.groups;
            match action {
                LabelAction::List => {}
                LabelAction::Add { name, color } => groups.push(Group {
                    id: new_id(),
                    name,
                    color,
                }),
                LabelAction::Remove { id } => groups.retain(|g| g.id != id),
            }
            (vec![Request::UpdateGroups(groups)], View::Groups)
        }
        Command::Tag { action } => {
            let mut tags = app.handle(Request::GetData, now)?.tags;
            match action {
                LabelAction::List => {}
                LabelAction::Add { name, color } => tags.push(Tag {
                    id: new_id(),
                    name,
                    color,
                }),
                LabelAction::Remove { id } => tags.retain(|t| t.id != id),
            }
            (vec![Request::UpdateTags(tags)], View::Tags)
        }
        Command::Todo { action } => {
            let mut todos = app.handle(Request::GetData, now)?.todos;
            match action {
                TodoAction::List => {}
                TodoAction::Add { title, planned } => todos.push(Todo::new(new_id(), title, planned)),
                TodoAction::Remove { id } => todos.retain(|t| t.id != id),
            }
            (vec![Request::UpdateTodos(todos)], View::Todos)
        }
        Command::Select {
            group,
            no_group,
            tags,
            todo,
            no_todo,
        } => {
            let mut requests = Vec::new();
            if group.is_some() || no_group {
                requests.push(Request::SetActiveGroup(group));
            }
            if let Some(tags) = tags {
                requests.push(Request::SetActiveTags(tags));
            }
            if todo.is_some() || no_todo {
                requests.push(Request::SetActiveTodo(todo));
            }
            if requests.is_empty() {
                requests.push(Request::GetData);
            }
            (requests, View::Status)
        }
        Command::SyncConfig { folder, file } => {
            let current = app.handle(Request::GetData, now)?.sync;
            let config = SyncConfig {
                folder_path: folder.unwrap_or_else(|| current.folder_path.clone()),
                file_name: file.unwrap_or_else(|| current.file_name.clone()),
                ..current
            };
            (vec![Request::UpdateSyncConfig(config)], View::Sync)
        }
        Command::Push => (vec![Request::SyncTo], View::Sync),
        Command::Pull => (vec![Request::SyncFrom], View::Sync),
    };

    let mut data = None;
    for request in requests {
        data = Some(app.handle(request, now)?);
    }
    match data {
        Some(data) => Ok(EventResult::Data { data, view }),
        None => Ok(EventResult::Data {
            data: app.handle(Request::GetData, now)?,
            view,
        }),
    }
}
