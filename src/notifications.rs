//! System notifications for phase completions.

use crate::app::CompletionEvent;
use crate::models::TimerPhase;
use notify_rust::Notification;
use std::sync::Mutex;
use std::thread::{self, JoinHandle};

/// Sink for completion notices.
pub trait Notifier: Send {
    fn phase_complete(&self, event: &CompletionEvent);
}

/// Shows desktop notifications with the default alert sound.
///
/// Each notice is shown from a background thread. Dropping the notifier
/// waits for the ones still in flight.
#[derive(Default)]
pub struct DesktopNotifier {
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl DesktopNotifier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Notifier for DesktopNotifier {
    fn phase_complete(&self, event: &CompletionEvent) {
        let (summary, body) = message_for(event);
        let handle = thread::spawn(move || {
            if let Err(e) = Notification::new()
                .summary(&summary)
                .body(&body)
                .sound_name("default")
                .show()
            {
                log::warn!("Failed to show notification: {}", e);
            }
        });

        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }
}

impl Drop for DesktopNotifier {
    fn drop(&mut self) {
        let pending = self.pending.get_mut().unwrap_or_else(|e| e.into_inner());
        for handle in pending.drain(..) {
            if handle.join().is_err() {
                log::warn!("Notification thread panicked");
            }
        }
    }
}

/// Title and body for a completion notice.
pub fn message_for(event: &CompletionEvent) -> (String, String) {
    let summary = match event.completed_phase {
        TimerPhase::ShortBreak | TimerPhase::LongBreak => "Break Over! ☕".to_string(),
        _ => "Focus Complete! 🍅".to_string(),
    };

    let next = match event.next_phase {
        TimerPhase::LongBreak => "a long break".to_string(),
        TimerPhase::ShortBreak => "a short break".to_string(),
        _ => "the next focus session".to_string(),
    };
    let mut body = if event.auto_started {
        format!("Finished {}. Starting {}.", event.completed_phase.label(), next)
    } else {
        format!("Finished {}. Ready for {}?", event.completed_phase.label(), next)
    };

    if let Some(minutes) = event.focus_minutes() {
        if minutes == 1 {
            body.push_str("\nYou stayed focused for 1 minute.");
        } else {
            body.push_str(&format!("\nYou stayed focused for {} minutes.", minutes));
        }
    }

    (summary, body)
}
