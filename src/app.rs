//! Main application state and command dispatch.
//!
//! Every request loads the stored document, applies one change and saves it
//! again. Timer changes go through the pure functions in [`crate::engine`].

use crate::engine::{self, TickResult};
use crate::models::{
    CompletedFocus, FocusSession, Group, PomodoroData, PomodoroSettings, SessionKind, SyncConfig,
    Tag, TimerPhase, Todo, MAX_SESSIONS,
};
use crate::notifications::Notifier;
use crate::persistence::{DataStore, DatabaseError};
use crate::sync::{RemoteSync, SyncError, TokenProvider};
use chrono::{DateTime, TimeZone, Utc};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),
    #[error("Unknown group: {0}")]
    UnknownGroup(String),
    #[error("Unknown todo: {0}")]
    UnknownTodo(String),
}

/// A single command against the stored document.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    GetData,
    UpdateSettings(PomodoroSettings),
    UpdateGroups(Vec<Group>),
    UpdateTags(Vec<Tag>),
    UpdateTodos(Vec<Todo>),
    SetActiveGroup(Option<String>),
    SetActiveTags(Vec<String>),
    SetActiveTodo(Option<String>),
    TimerStart,
    TimerPause,
    TimerReset,
    TimerSkip,
    UpdateSyncConfig(SyncConfig),
    SyncTo,
    SyncFrom,
}

/// A phase ran out. Used for notifications.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionEvent {
    pub completed_phase: TimerPhase,
    pub next_phase: TimerPhase,
    pub auto_started: bool,
    pub completed_focus: Option<CompletedFocus>,
}

impl CompletionEvent {
    /// Length of the completed focus session in whole minutes, rounded.
    pub fn focus_minutes(&self) -> Option<u32> {
        self.completed_focus
            .as_ref()
            .map(|focus| focus_minutes(focus.duration_seconds))
    }
}

fn focus_minutes(seconds: u64) -> u32 {
    u32::try_from((seconds + 30) / 60).unwrap_or(u32::MAX)
}

fn timestamp(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
}

/// Main application state: the store plus the collaborators the commands use.
pub struct App {
    pub store: Box<dyn DataStore + Send>,
    notifier: Box<dyn Notifier>,
    remote: Box<dyn RemoteSync + Send>,
    tokens: Box<dyn TokenProvider + Send>,
    /// Completions delivered while handling requests, not yet shown.
    caught_up: Vec<CompletionEvent>,
}

impl App {
    pub fn new(
        store: Box<dyn DataStore + Send>,
        notifier: Box<dyn Notifier>,
        remote: Box<dyn RemoteSync + Send>,
        tokens: Box<dyn TokenProvider + Send>,
    ) -> Self {
        Self {
            store,
            notifier,
            remote,
            tokens,
            caught_up: Vec::new(),
        }
    }

    /// Drains the completions that requests caught up on since the last call.
    pub fn take_completions(&mut self) -> Vec<CompletionEvent> {
        std::mem::take(&mut self.caught_up)
    }

    /// Loads, applies `updater`, saves and returns the new document.
    fn update<F>(&self, updater: F) -> Result<PomodoroData, AppError>
    where
        F: FnOnce(PomodoroData) -> Result<PomodoroData, AppError>,
    {
        let current = self.store.load()?;
        let next = updater(current)?;
        self.store.save(&next)?;
        Ok(next)
    }

    /// Handles one request at time `now` (ms since epoch).
    pub fn handle(&mut self, request: Request, now: i64) -> Result<PomodoroData, AppError> {
        // Deliver any completion that is due before acting on the state.
        if matches!(
            request,
            Request::GetData
                | Request::TimerStart
                | Request::TimerPause
                | Request::TimerReset
                | Request::TimerSkip
                | Request::UpdateSettings(_)
        ) {
            if let Some(event) = self.check_timer(now)? {
                self.caught_up.push(event);
            }
        }

        match request {
            Request::GetData => Ok(self.store.load()?),
            Request::UpdateSettings(settings) => self.update(|mut data| {
                let settings = settings.normalized();
                if !data.state.is_running {
                    data.state.seconds_remaining =
                        engine::phase_duration_seconds(data.state.current_phase, &settings);
                    data.state.current_session_start_at = None;
                }
                data.settings = settings;
                Ok(data)
            }),
            Request::UpdateGroups(groups) => self.update(|mut data| {
                let still_there = |id: &String| groups.iter().any(|g| &g.id == id);
                if !data.state.active_group_id.as_ref().is_some_and(still_there) {
                    data.state.active_group_id = None;
                }
                data.groups = groups;
                Ok(data)
            }),
            Request::UpdateTags(tags) => self.update(|mut data| {
                data.state
                    .active_tag_ids
                    .retain(|id| tags.iter().any(|t| &t.id == id));
                data.tags = tags;
                Ok(data)
            }),
            Request::UpdateTodos(todos) => self.update(|mut data| {
                data.todos = todos;
                Ok(data.normalized())
            }),
            Request::SetActiveGroup(group_id) => self.update(|mut data| {
                if let Some(id) = &group_id {
                    if !data.groups.iter().any(|g| &g.id == id) {
                        return Err(AppError::UnknownGroup(id.clone()));
                    }
                }
                data.state.active_group_id = group_id;
                Ok(data)
            }),
            Request::SetActiveTags(tag_ids) => self.update(|mut data| {
                data.state.active_tag_ids = tag_ids
                    .into_iter()
                    .filter(|id| data.tags.iter().any(|t| &t.id == id))
                    .collect();
                Ok(data)
            }),
            Request::SetActiveTodo(todo_id) => self.update(|mut data| {
                if let Some(id) = &todo_id {
                    if !data.todos.iter().any(|t| &t.id == id) {
                        return Err(AppError::UnknownTodo(id.clone()));
                    }
                }
                data.state.active_todo_id = todo_id;
                Ok(data)
            }),
            Request::TimerStart => self.update(|mut data| {
                data.state = engine::start_timer(&data.state, &data.settings, now);
                Ok(data)
            }),
            Request::TimerPause => self.update(|mut data| {
                data.state = engine::pause_timer(&data.state, now);
                Ok(data)
            }),
            Request::TimerReset => self.update(|mut data| {
                data.state = engine::reset_timer(&data.state, &data.settings);
                Ok(data)
            }),
            Request::TimerSkip => self.update(|mut data| {
                data.state = engine::skip_phase(&data.state, &data.settings);
                Ok(data)
            }),
            Request::UpdateSyncConfig(config) => self.update(|mut data| {
                data.sync = if data.sync.location_differs(&config) {
                    SyncConfig {
                        folder_id: None,
                        file_id: None,
                        last_sync_at: None,
                        ..config
                    }
                } else {
                    config
                };
                Ok(data)
            }),
            Request::SyncTo => {
                let token = self.tokens.token(true)?;
                let data = self.store.load()?;
                let config = self.remote.push(&token, &data, &data.sync, timestamp(now))?;
                self.update(|mut data| {
                    data.sync = config;
                    Ok(data)
                })
            }
            Request::SyncFrom => {
                let token = self.tokens.token(true)?;
                let current = self.store.load()?;
                let (pulled, config) = self.remote.pull(&token, &current.sync, timestamp(now))?;
                let merged = PomodoroData {
                    sync: config,
                    ..pulled
                };
                self.store.save(&merged)?;
                Ok(merged)
            }
        }
    }

    /// Checks whether the running phase has ended. On completion the focus
    /// session is recorded, the linked todo advanced, the document saved and
    /// the notifier called.
    pub fn check_timer(&self, now: i64) -> Result<Option<CompletionEvent>, AppError> {
        let mut data = self.store.load()?;
        let TickResult {
            state,
            completed_phase,
            completed_focus,
        } = engine::tick_timer(&data.state, &data.settings, now);

        let Some(completed_phase) = completed_phase else {
            return Ok(None);
        };

        data.state = state;
        if let Some(focus) = &completed_focus {
            record_focus(&mut data, focus);
        }
        self.store.save(&data)?;

        let event = CompletionEvent {
            completed_phase,
            next_phase: data.state.current_phase,
            auto_started: data.state.is_running,
            completed_focus,
        };
        log::info!(
            "Completed {}, next up {}",
            completed_phase.label(),
            event.next_phase.label()
        );

        if data.settings.notifications_enabled {
            self.notifier.phase_complete(&event);
        }
        Ok(Some(event))
    }
}

/// Appends the completed focus to the history and credits its todo.
fn record_focus(data: &mut PomodoroData, focus: &CompletedFocus) {
    let end_at = timestamp(focus.end_at);
    data.sessions.insert(
        0,
        FocusSession {
            id: Uuid::new_v4().to_string(),
            kind: SessionKind::Focus,
            start_at: timestamp(focus.start_at),
            end_at,
            duration_minutes: focus_minutes(focus.duration_seconds),
            group_id: focus.group_id.clone(),
            tag_ids: focus.tag_ids.clone(),
            todo_id: focus.todo_id.clone(),
            note: None,
        },
    );
    data.sessions.truncate(MAX_SESSIONS);

    if let Some(todo) = focus.todo_id.as_deref().and_then(|id| data.todo_mut(id)) {
        todo.record_pomodoro(end_at);
    }
}
