//! Timer tick loop and status line formatting.

use crate::app::{App, CompletionEvent};
use crate::models::{TimerPhase, TimerState};
use crate::persistence::DataStore;
use chrono::Utc;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Message sent from the timer thread to the main thread.
#[derive(Debug, Clone)]
pub enum TimerMessage {
    /// Timer state has changed, display needs update.
    StateChanged { title: String },
    /// A phase completed.
    Completed(CompletionEvent),
    /// Checking the timer failed.
    Failed(String),
}

/// Current wall clock time in ms since epoch.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Runs the timer loop, ticking every second, until the receiver hangs up.
/// Sends messages to the main thread via the provided channel.
pub fn run_timer_loop(app: Arc<Mutex<App>>, tx: Sender<TimerMessage>) {
    let mut last_title = String::new();
    loop {
        let messages = {
            let app = app.lock().unwrap();
            let now = now_ms();
            let mut messages = Vec::new();

            match app.check_timer(now) {
                Ok(Some(event)) => messages.push(TimerMessage::Completed(event)),
                Ok(None) => {}
                Err(e) => messages.push(TimerMessage::Failed(e.to_string())),
            }

            match app.store.load() {
                Ok(data) => {
                    let state = live_state(&data.state, now);
                    let title = format_status(&state);
                    if title != last_title {
                        last_title = title.clone();
                        messages.push(TimerMessage::StateChanged { title });
                    }
                }
                Err(e) => messages.push(TimerMessage::Failed(e.to_string())),
            }
            messages
        };

        for msg in messages {
            if tx.send(msg).is_err() {
                return;
            }
        }

        thread::sleep(Duration::from_secs(1));
    }
}

/// `state` with `seconds_remaining` counted down to `now`. Never completes a
/// phase.
pub fn live_state(state: &TimerState, now: i64) -> TimerState {
    match state.target_end_at.filter(|_| state.is_running) {
        Some(target) => TimerState {
            seconds_remaining: ((target - now).max(0) / 1000) as u32,
            ..state.clone()
        },
        None => state.clone(),
    }
}

fn phase_icon(phase: TimerPhase) -> &'static str {
    match phase.resolve() {
        TimerPhase::ShortBreak => "☕",
        TimerPhase::LongBreak => "🌴",
        _ => "🍅",
    }
}

/// Formats the status line for the current timer state.
pub fn format_status(state: &TimerState) -> String {
    let icon = phase_icon(state.current_phase);
    let time = format_time(state.seconds_remaining);
    if state.is_running {
        format!("{} {}", icon, time)
    } else {
        format!("⏸ {} {}", icon, time)
    }
}

/// Formats time in MM:SS format.
pub fn format_time(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
