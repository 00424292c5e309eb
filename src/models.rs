//! Data models for the Pomodrive application.

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound for any phase length, in minutes.
pub const MAX_PHASE_MINUTES: u32 = 24 * 60;

/// Key under which the whole document is stored.
pub const STORAGE_KEY: &str = "pomodoro-data";

/// Number of focus sessions kept in the history.
pub const MAX_SESSIONS: usize = 200;

/// One segment of the pomodoro cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimerPhase {
    #[default]
    Focus,
    ShortBreak,
    LongBreak,
    /// Bootstrap marker. Always resolves to `Focus`.
    Idle,
}

impl TimerPhase {
    /// Resolves `Idle` to `Focus`, leaving every other phase alone.
    pub fn resolve(self) -> Self {
        match self {
            Self::Idle => Self::Focus,
            other => other,
        }
    }

    /// Returns true for focus (and idle, which resolves to focus).
    pub fn is_focus(self) -> bool {
        self.resolve() == Self::Focus
    }

    /// Human readable name.
    pub fn label(self) -> &'static str {
        match self.resolve() {
            Self::ShortBreak => "short break",
            Self::LongBreak => "long break",
            _ => "focus",
        }
    }
}

/// User-configurable settings for the pomodoro timer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct PomodoroSettings {
    /// Duration of a focus phase in minutes.
    pub focus_minutes: u32,
    /// Duration of a short break in minutes.
    pub short_break_minutes: u32,
    /// Duration of a long break in minutes.
    pub long_break_minutes: u32,
    /// Every n-th completed focus phase is followed by a long break.
    pub long_break_every: u32,
    /// Start breaks automatically when a focus phase ends.
    pub auto_start_breaks: bool,
    /// Start focus automatically when a break ends.
    pub auto_start_focus: bool,
    /// Whether to show system notifications.
    pub notifications_enabled: bool,
}

impl Default for PomodoroSettings {
    fn default() -> Self {
        Self {
            focus_minutes: 25,
            short_break_minutes: 5,
            long_break_minutes: 15,
            long_break_every: 4,
            auto_start_breaks: true,
            auto_start_focus: false,
            notifications_enabled: true,
        }
    }
}

impl PomodoroSettings {
    /// Clamps every duration to `1..=MAX_PHASE_MINUTES` and the long break
    /// cadence to at least 1.
    pub fn normalized(self) -> Self {
        Self {
            focus_minutes: self.focus_minutes.clamp(1, MAX_PHASE_MINUTES),
            short_break_minutes: self.short_break_minutes.clamp(1, MAX_PHASE_MINUTES),
            long_break_minutes: self.long_break_minutes.clamp(1, MAX_PHASE_MINUTES),
            long_break_every: self.long_break_every.max(1),
            ..self
        }
    }
}

/// The authoritative timer record. Owned by the caller and passed by value
/// through every engine operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimerState {
    pub current_phase: TimerPhase,
    pub is_running: bool,
    pub seconds_remaining: u32,
    /// Absolute deadline in ms since epoch. Set iff `is_running`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_end_at: Option<i64>,
    /// Completed focus phases.
    pub cycle_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_group_id: Option<String>,
    pub active_tag_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_todo_id: Option<String>,
    /// When the current focus session first started running (ms epoch).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_session_start_at: Option<i64>,
}

impl Default for TimerState {
    fn default() -> Self {
        Self {
            current_phase: TimerPhase::Focus,
            is_running: false,
            seconds_remaining: 0,
            target_end_at: None,
            cycle_count: 0,
            active_group_id: None,
            active_tag_ids: Vec::new(),
            active_todo_id: None,
            current_session_start_at: None,
        }
    }
}

impl TimerState {
    /// A fresh, stopped focus phase.
    pub fn new(settings: &PomodoroSettings) -> Self {
        Self {
            seconds_remaining: settings.focus_minutes.saturating_mul(60),
            ..Self::default()
        }
    }
}

/// A focus phase that ran to completion. Emitted by the engine, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedFocus {
    pub start_at: i64,
    pub end_at: i64,
    pub duration_seconds: u64,
    pub group_id: Option<String>,
    pub tag_ids: Vec<String>,
    pub todo_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub color: String,
}

/// A task that focus sessions can be linked to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "TodoRecord")]
pub struct Todo {
    pub id: String,
    pub title: String,
    pub planned_pomodoros: u32,
    pub completed_pomodoros: u32,
    pub is_completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Todo {
    pub fn new(id: impl Into<String>, title: impl Into<String>, planned: u32) -> Self {
        TodoRecord {
            id: id.into(),
            title: Some(title.into()),
            planned_pomodoros: Some(i64::from(planned)),
            ..TodoRecord::default()
        }
        .into()
    }

    /// Counts one completed focus session towards this todo.
    pub fn record_pomodoro(&mut self, at: DateTime<Utc>) {
        self.completed_pomodoros += 1;
        if self.completed_pomodoros >= self.planned_pomodoros {
            self.is_completed = true;
        }
        self.updated_at = Some(at);
    }
}

/// Loosely typed todo as found in stored or imported documents.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct TodoRecord {
    id: String,
    title: Option<String>,
    planned_pomodoros: Option<i64>,
    completed_pomodoros: Option<i64>,
    is_completed: Option<bool>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<TodoRecord> for Todo {
    fn from(record: TodoRecord) -> Self {
        let now = Utc::now();
        let clamp = |value: Option<i64>, fallback: u32| {
            value.map_or(fallback, |v| v.clamp(0, i64::from(u32::MAX)) as u32)
        };
        let planned = clamp(record.planned_pomodoros, 1).max(1);
        let completed = clamp(record.completed_pomodoros, 0);
        let title = record
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or("Untitled")
            .to_string();

        Self {
            id: record.id,
            title,
            planned_pomodoros: planned,
            completed_pomodoros: completed,
            is_completed: record.is_completed.unwrap_or(completed >= planned),
            created_at: record.created_at.unwrap_or(now),
            updated_at: Some(record.updated_at.unwrap_or(now)),
        }
    }
}

/// Kind of a recorded session. Only focus sessions are recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    #[default]
    Focus,
}

/// History entry for a completed focus phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusSession {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: SessionKind,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub duration_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default)]
    pub tag_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub todo_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Where the backup copy lives and what was resolved on the last sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncConfig {
    pub folder_path: String,
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync_at: Option<DateTime<Utc>>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            folder_path: "Pomodoro".to_string(),
            file_name: "pomodoro-data.json".to_string(),
            folder_id: None,
            file_id: None,
            last_sync_at: None,
        }
    }
}

impl SyncConfig {
    /// True when `other` points at a different folder or file.
    pub fn location_differs(&self, other: &SyncConfig) -> bool {
        self.folder_path != other.folder_path || self.file_name != other.file_name
    }
}

/// The whole persisted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PomodoroData {
    pub version: u32,
    pub settings: PomodoroSettings,
    pub groups: Vec<Group>,
    pub tags: Vec<Tag>,
    pub todos: Vec<Todo>,
    pub sessions: Vec<FocusSession>,
    pub state: TimerState,
    pub sync: SyncConfig,
    pub updated_at: DateTime<Utc>,
}

impl Default for PomodoroData {
    fn default() -> Self {
        let settings = PomodoroSettings::default();
        Self {
            version: 1,
            state: TimerState::new(&settings),
            settings,
            groups: Vec::new(),
            tags: Vec::new(),
            todos: Vec::new(),
            sessions: Vec::new(),
            sync: SyncConfig::default(),
            updated_at: Utc::now(),
        }
    }
}

impl PomodoroData {
    /// Repairs a loaded document so the engine can trust it.
    pub fn normalized(mut self) -> Self {
        self.version = 1;
        self.settings = self.settings.normalized();
        self.state.current_phase = self.state.current_phase.resolve();
        if self.state.seconds_remaining == 0 {
            self.state.seconds_remaining = self.settings.focus_minutes.saturating_mul(60);
        }
        if !self.state.is_running {
            self.state.target_end_at = None;
        } else if self.state.target_end_at.is_none() {
            self.state.is_running = false;
        }
        let todo_exists = |id: &String| self.todos.iter().any(|t| &t.id == id);
        if !self.state.active_todo_id.as_ref().is_some_and(todo_exists) {
            self.state.active_todo_id = None;
        }
        self
    }

    pub fn todo_mut(&mut self, id: &str) -> Option<&mut Todo> {
        self.todos.iter_mut().find(|t| t.id == id)
    }
}

/// Daily statistics derived from the session history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub completed_pomodoros: u32,
    pub total_focus_minutes: u32,
}

impl DailyStats {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            completed_pomodoros: 0,
            total_focus_minutes: 0,
        }
    }

    /// Sums the sessions that ended on `date` (local time).
    pub fn for_date(sessions: &[FocusSession], date: NaiveDate) -> Self {
        sessions
            .iter()
            .filter(|s| s.end_at.with_timezone(&Local).date_naive() == date)
            .fold(Self::new(date), |mut stats, s| {
                stats.completed_pomodoros += 1;
                stats.total_focus_minutes += s.duration_minutes;
                stats
            })
    }
}
