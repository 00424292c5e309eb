//! Pure phase-transition engine for the pomodoro timer.
//!
//! Every function takes the current [`TimerState`] by reference and returns a
//! new value. Nothing here reads the clock: `now` is always milliseconds since
//! the epoch, supplied by the caller.

use crate::models::{CompletedFocus, PomodoroSettings, TimerPhase, TimerState};

/// Outcome of a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickResult {
    pub state: TimerState,
    /// The phase that just ended, if the deadline was reached.
    pub completed_phase: Option<TimerPhase>,
    /// Set only when the completed phase was focus.
    pub completed_focus: Option<CompletedFocus>,
}

impl TickResult {
    fn unchanged(state: TimerState) -> Self {
        Self {
            state,
            completed_phase: None,
            completed_focus: None,
        }
    }
}

/// Full length of `phase` in seconds. `Idle` counts as focus.
pub fn phase_duration_seconds(phase: TimerPhase, settings: &PomodoroSettings) -> u32 {
    let minutes = match phase.resolve() {
        TimerPhase::ShortBreak => settings.short_break_minutes,
        TimerPhase::LongBreak => settings.long_break_minutes,
        _ => settings.focus_minutes,
    };
    minutes.saturating_mul(60)
}

/// Phase and cycle count that follow `phase`.
fn next_phase(phase: TimerPhase, cycle_count: u32, settings: &PomodoroSettings) -> (TimerPhase, u32) {
    if phase.is_focus() {
        let next_cycle = cycle_count.saturating_add(1);
        if next_cycle % settings.long_break_every.max(1) == 0 {
            (TimerPhase::LongBreak, next_cycle)
        } else {
            (TimerPhase::ShortBreak, next_cycle)
        }
    } else {
        (TimerPhase::Focus, cycle_count)
    }
}

/// Whole seconds from `now` until `deadline`, rounded half up, never negative.
fn seconds_until_rounded(deadline: i64, now: i64) -> u32 {
    to_seconds((deadline - now + 500).div_euclid(1000))
}

/// Whole seconds from `now` until `deadline`, rounded down, never negative.
fn seconds_until_floored(deadline: i64, now: i64) -> u32 {
    to_seconds((deadline - now).div_euclid(1000))
}

fn to_seconds(secs: i64) -> u32 {
    secs.clamp(0, i64::from(u32::MAX)) as u32
}

fn deadline(now: i64, seconds: u32) -> i64 {
    now + i64::from(seconds) * 1000
}

/// Starts (or resumes) the timer. Idempotent while running.
pub fn start_timer(state: &TimerState, settings: &PomodoroSettings, now: i64) -> TimerState {
    if state.is_running {
        return state.clone();
    }

    let phase = state.current_phase.resolve();
    let duration = if state.seconds_remaining > 0 {
        state.seconds_remaining
    } else {
        phase_duration_seconds(phase, settings)
    };

    // The session start survives pause/resume so the completed focus
    // covers the whole session.
    let session_start = if phase == TimerPhase::Focus {
        Some(state.current_session_start_at.unwrap_or(now))
    } else {
        None
    };

    TimerState {
        current_phase: phase,
        is_running: true,
        seconds_remaining: duration,
        target_end_at: Some(deadline(now, duration)),
        current_session_start_at: session_start,
        ..state.clone()
    }
}

/// Stops the countdown, keeping what is left of the phase.
pub fn pause_timer(state: &TimerState, now: i64) -> TimerState {
    let Some(target) = state.target_end_at.filter(|_| state.is_running) else {
        return state.clone();
    };

    TimerState {
        is_running: false,
        seconds_remaining: seconds_until_rounded(target, now),
        target_end_at: None,
        ..state.clone()
    }
}

/// Back to a stopped, full-length focus phase. Cycle count and the active
/// group/tags/todo are kept.
pub fn reset_timer(state: &TimerState, settings: &PomodoroSettings) -> TimerState {
    TimerState {
        current_phase: TimerPhase::Focus,
        is_running: false,
        seconds_remaining: phase_duration_seconds(TimerPhase::Focus, settings),
        target_end_at: None,
        current_session_start_at: None,
        ..state.clone()
    }
}

/// Jumps to the next phase without completing the current one.
pub fn skip_phase(state: &TimerState, settings: &PomodoroSettings) -> TimerState {
    let (phase, cycle_count) = next_phase(state.current_phase, state.cycle_count, settings);

    TimerState {
        current_phase: phase,
        cycle_count,
        is_running: false,
        seconds_remaining: phase_duration_seconds(phase, settings),
        target_end_at: None,
        current_session_start_at: None,
        ..state.clone()
    }
}

/// Advances the timer to `now`, completing the phase if its deadline passed.
pub fn tick_timer(state: &TimerState, settings: &PomodoroSettings, now: i64) -> TickResult {
    let Some(target) = state.target_end_at.filter(|_| state.is_running) else {
        return TickResult::unchanged(state.clone());
    };

    let remaining = seconds_until_floored(target, now);
    if remaining > 0 {
        return TickResult::unchanged(TimerState {
            seconds_remaining: remaining,
            ..state.clone()
        });
    }

    let completed_phase = state.current_phase.resolve();
    let completed_focus = (completed_phase == TimerPhase::Focus).then(|| {
        let start_at = state.current_session_start_at.unwrap_or(now);
        CompletedFocus {
            start_at,
            end_at: now,
            duration_seconds: u64::from(seconds_until_rounded(now, start_at)),
            group_id: state.active_group_id.clone(),
            tag_ids: state.active_tag_ids.clone(),
            todo_id: state.active_todo_id.clone(),
        }
    });

    let (phase, cycle_count) = next_phase(completed_phase, state.cycle_count, settings);
    let duration = phase_duration_seconds(phase, settings);
    let auto_start = if completed_phase == TimerPhase::Focus {
        settings.auto_start_breaks
    } else {
        settings.auto_start_focus
    };

    let next = TimerState {
        current_phase: phase,
        cycle_count,
        is_running: auto_start,
        seconds_remaining: duration,
        target_end_at: auto_start.then(|| deadline(now, duration)),
        current_session_start_at: (auto_start && phase == TimerPhase::Focus).then_some(now),
        ..state.clone()
    };

    TickResult {
        state: next,
        completed_phase: Some(completed_phase),
        completed_focus,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_000_000;

    fn settings() -> PomodoroSettings {
        PomodoroSettings {
            long_break_every: 2,
            auto_start_breaks: true,
            auto_start_focus: true,
            ..PomodoroSettings::default()
        }
    }

    fn classic() -> PomodoroSettings {
        PomodoroSettings {
            focus_minutes: 25,
            short_break_minutes: 5,
            long_break_minutes: 15,
            long_break_every: 4,
            ..PomodoroSettings::default()
        }
    }

    fn focus_end(start: i64, settings: &PomodoroSettings) -> i64 {
        start + i64::from(phase_duration_seconds(TimerPhase::Focus, settings)) * 1000
    }

    #[test]
    fn test_phase_durations() {
        let s = classic();
        assert_eq!(phase_duration_seconds(TimerPhase::Focus, &s), 1500);
        assert_eq!(phase_duration_seconds(TimerPhase::Idle, &s), 1500);
        assert_eq!(phase_duration_seconds(TimerPhase::ShortBreak, &s), 300);
        assert_eq!(phase_duration_seconds(TimerPhase::LongBreak, &s), 900);
    }

    #[test]
    fn test_start_sets_deadline() {
        let s = settings();
        let next = start_timer(&TimerState::new(&s), &s, NOW);
        assert!(next.is_running);
        assert_eq!(
            next.target_end_at,
            Some(NOW + i64::from(next.seconds_remaining) * 1000)
        );
        assert_eq!(next.current_session_start_at, Some(NOW));
    }

    #[test]
    fn test_start_is_idempotent_while_running() {
        let s = settings();
        let running = start_timer(&TimerState::new(&s), &s, NOW);
        assert_eq!(start_timer(&running, &s, NOW + 60_000), running);
    }

    #[test]
    fn test_start_normalizes_idle() {
        let s = settings();
        let state = TimerState {
            current_phase: TimerPhase::Idle,
            seconds_remaining: 0,
            ..TimerState::default()
        };
        let next = start_timer(&state, &s, NOW);
        assert_eq!(next.current_phase, TimerPhase::Focus);
        assert_eq!(next.seconds_remaining, s.focus_minutes * 60);
    }

    #[test]
    fn test_start_break_clears_session_start() {
        let s = settings();
        let state = TimerState {
            current_phase: TimerPhase::ShortBreak,
            seconds_remaining: 300,
            current_session_start_at: Some(1),
            ..TimerState::default()
        };
        let next = start_timer(&state, &s, NOW);
        assert_eq!(next.current_session_start_at, None);
    }

    #[test]
    fn test_tick_counts_down() {
        let s = settings();
        let running = start_timer(&TimerState::new(&s), &s, NOW);
        let later = NOW + 3_000;
        let result = tick_timer(&running, &s, later);
        let expected = (running.target_end_at.unwrap() - later) / 1000;
        assert_eq!(i64::from(result.state.seconds_remaining), expected);
        assert_eq!(result.completed_phase, None);
    }

    #[test]
    fn test_tick_floors_partial_seconds() {
        let s = settings();
        let running = start_timer(&TimerState::new(&s), &s, NOW);
        let result = tick_timer(&running, &s, NOW + 1_999);
        assert_eq!(result.state.seconds_remaining, 1500 - 2);
    }

    #[test]
    fn test_tick_before_deadline_keeps_phase_and_cycle() {
        let s = settings();
        let running = start_timer(&TimerState::new(&s), &s, NOW);
        let halfway = NOW + i64::from(phase_duration_seconds(TimerPhase::Focus, &s)) * 500;
        let result = tick_timer(&running, &s, halfway);
        assert_eq!(result.completed_phase, None);
        assert_eq!(result.state.current_phase, TimerPhase::Focus);
        assert_eq!(result.state.cycle_count, 0);
    }

    #[test]
    fn test_tick_when_stopped_is_noop() {
        let s = settings();
        let state = TimerState::new(&s);
        let result = tick_timer(&state, &s, NOW);
        assert_eq!(result, TickResult::unchanged(state));
    }

    #[test]
    fn test_focus_completes_to_short_break() {
        let s = settings();
        let running = start_timer(&TimerState::new(&s), &s, NOW);
        let result = tick_timer(&running, &s, focus_end(NOW, &s));
        assert_eq!(result.completed_phase, Some(TimerPhase::Focus));
        assert_eq!(result.state.current_phase, TimerPhase::ShortBreak);
        assert_eq!(result.state.cycle_count, 1);
    }

    #[test]
    fn test_long_break_on_cadence() {
        let s = settings();
        let state = TimerState {
            cycle_count: 1,
            ..TimerState::new(&s)
        };
        let running = start_timer(&state, &s, NOW);
        let result = tick_timer(&running, &s, focus_end(NOW, &s));
        assert_eq!(result.state.current_phase, TimerPhase::LongBreak);
        assert_eq!(result.state.cycle_count, 2);
    }

    #[test]
    fn test_classic_scenario_fresh_start() {
        let s = classic();
        let running = start_timer(&TimerState::new(&s), &s, 0);
        assert_eq!(running.target_end_at, Some(1_500_000));

        let result = tick_timer(&running, &s, 1_500_000);
        assert_eq!(result.completed_phase, Some(TimerPhase::Focus));
        assert_eq!(result.state.current_phase, TimerPhase::ShortBreak);
        assert_eq!(result.state.cycle_count, 1);
    }

    #[test]
    fn test_cycle_count_saturates() {
        let s = classic();
        let state = TimerState {
            cycle_count: u32::MAX,
            ..TimerState::new(&s)
        };
        let skipped = skip_phase(&state, &s);
        assert_eq!(skipped.cycle_count, u32::MAX);
        assert_eq!(skipped.current_phase, TimerPhase::ShortBreak);
    }

    #[test]
    fn test_unclamped_durations_saturate() {
        let s = PomodoroSettings {
            focus_minutes: 80_000_000,
            ..classic()
        };
        assert_eq!(phase_duration_seconds(TimerPhase::Focus, &s), u32::MAX);
        assert_eq!(reset_timer(&TimerState::default(), &s).seconds_remaining, u32::MAX);
    }

    #[test]
    fn test_classic_scenario_fourth_focus_is_long_break() {
        let s = classic();
        let state = TimerState {
            cycle_count: 3,
            ..TimerState::new(&s)
        };
        let running = start_timer(&state, &s, 0);
        let result = tick_timer(&running, &s, 1_500_000);
        assert_eq!(result.state.cycle_count, 4);
        assert_eq!(result.state.current_phase, TimerPhase::LongBreak);
    }

    #[test]
    fn test_long_break_every_n_completions() {
        let s = PomodoroSettings {
            long_break_every: 3,
            auto_start_breaks: false,
            auto_start_focus: false,
            ..classic()
        };
        let mut state = TimerState::new(&s);
        let mut now = 0;
        for n in 1..=9u32 {
            state = start_timer(&state, &s, now);
            now = state.target_end_at.unwrap();
            let result = tick_timer(&state, &s, now);
            let expected = if n % 3 == 0 {
                TimerPhase::LongBreak
            } else {
                TimerPhase::ShortBreak
            };
            assert_eq!(result.state.current_phase, expected, "completion {n}");
            assert_eq!(result.state.cycle_count, n);
            state = skip_phase(&result.state, &s);
            assert_eq!(state.current_phase, TimerPhase::Focus);
        }
    }

    #[test]
    fn test_focus_completion_records_session() {
        let s = settings();
        let state = TimerState {
            active_group_id: Some("group1".to_string()),
            active_tag_ids: vec!["tag1".to_string(), "tag2".to_string()],
            active_todo_id: Some("todo1".to_string()),
            ..TimerState::new(&s)
        };
        let running = start_timer(&state, &s, NOW);
        let end = focus_end(NOW, &s);
        let result = tick_timer(&running, &s, end);

        let focus = result.completed_focus.expect("focus completion");
        assert_eq!(focus.start_at, NOW);
        assert_eq!(focus.end_at, end);
        assert_eq!(focus.duration_seconds, 1500);
        assert_eq!(focus.group_id.as_deref(), Some("group1"));
        assert_eq!(focus.tag_ids, vec!["tag1", "tag2"]);
        assert_eq!(focus.todo_id.as_deref(), Some("todo1"));
    }

    #[test]
    fn test_focus_completion_without_session_start_uses_now() {
        let s = settings();
        let state = TimerState {
            is_running: true,
            target_end_at: Some(NOW),
            current_session_start_at: None,
            ..TimerState::new(&s)
        };
        let focus = tick_timer(&state, &s, NOW).completed_focus.unwrap();
        assert_eq!(focus.start_at, NOW);
        assert_eq!(focus.duration_seconds, 0);
    }

    #[test]
    fn test_break_completion_has_no_session() {
        let s = settings();
        let state = TimerState {
            current_phase: TimerPhase::ShortBreak,
            seconds_remaining: s.short_break_minutes * 60,
            ..TimerState::new(&s)
        };
        let running = start_timer(&state, &s, NOW);
        let result = tick_timer(&running, &s, running.target_end_at.unwrap());
        assert_eq!(result.completed_phase, Some(TimerPhase::ShortBreak));
        assert_eq!(result.completed_focus, None);
        assert_eq!(result.state.current_phase, TimerPhase::Focus);
        assert_eq!(result.state.cycle_count, 0);
    }

    #[test]
    fn test_auto_start_break() {
        let s = settings();
        let running = start_timer(&TimerState::new(&s), &s, NOW);
        let end = focus_end(NOW, &s);
        let next = tick_timer(&running, &s, end).state;
        assert!(next.is_running);
        assert_eq!(next.seconds_remaining, 300);
        assert_eq!(next.target_end_at, Some(end + 300_000));
        assert_eq!(next.current_session_start_at, None);
    }

    #[test]
    fn test_auto_start_focus_sets_session_start() {
        let s = settings();
        let state = TimerState {
            current_phase: TimerPhase::LongBreak,
            seconds_remaining: 900,
            ..TimerState::new(&s)
        };
        let running = start_timer(&state, &s, NOW);
        let end = running.target_end_at.unwrap();
        let next = tick_timer(&running, &s, end).state;
        assert_eq!(next.current_phase, TimerPhase::Focus);
        assert!(next.is_running);
        assert_eq!(next.current_session_start_at, Some(end));
    }

    #[test]
    fn test_no_auto_start_leaves_timer_stopped() {
        let s = PomodoroSettings {
            auto_start_breaks: false,
            ..settings()
        };
        let running = start_timer(&TimerState::new(&s), &s, NOW);
        let next = tick_timer(&running, &s, focus_end(NOW, &s) + 5_000).state;
        assert!(!next.is_running);
        assert_eq!(next.target_end_at, None);
        assert_eq!(next.current_session_start_at, None);
        assert_eq!(next.seconds_remaining, 300);
    }

    #[test]
    fn test_pause_keeps_remaining() {
        let s = settings();
        let running = start_timer(&TimerState::new(&s), &s, NOW);
        let paused = pause_timer(&running, NOW + 5_000);
        assert!(!paused.is_running);
        assert_eq!(paused.target_end_at, None);
        assert_eq!(paused.seconds_remaining, 1495);
        assert_eq!(paused.current_session_start_at, Some(NOW));
    }

    #[test]
    fn test_pause_rounds_half_up() {
        let s = settings();
        let running = start_timer(&TimerState::new(&s), &s, NOW);
        assert_eq!(pause_timer(&running, NOW + 4_500).seconds_remaining, 1496);
        assert_eq!(pause_timer(&running, NOW + 4_501).seconds_remaining, 1495);
    }

    #[test]
    fn test_pause_past_deadline_clamps_to_zero() {
        let s = settings();
        let running = start_timer(&TimerState::new(&s), &s, NOW);
        let paused = pause_timer(&running, NOW + 10_000_000);
        assert_eq!(paused.seconds_remaining, 0);
    }

    #[test]
    fn test_pause_when_stopped_is_noop() {
        let s = settings();
        let state = TimerState::new(&s);
        assert_eq!(pause_timer(&state, NOW), state);
    }

    #[test]
    fn test_pause_resume_is_lossless() {
        let s = settings();
        for elapsed in [0, 1_234, 60_000, 1_499_000] {
            let running = start_timer(&TimerState::new(&s), &s, NOW);
            let before = tick_timer(&running, &s, NOW + elapsed).state;
            let paused = pause_timer(&running, NOW + elapsed);
            let resumed = start_timer(&paused, &s, NOW + elapsed + 30_000);
            assert_eq!(resumed.current_phase, before.current_phase);
            assert!(resumed.seconds_remaining.abs_diff(before.seconds_remaining) <= 1);
            assert_eq!(resumed.current_session_start_at, Some(NOW));
        }
    }

    #[test]
    fn test_reset_returns_to_focus() {
        let s = settings();
        let state = TimerState {
            current_phase: TimerPhase::LongBreak,
            is_running: true,
            target_end_at: Some(NOW),
            seconds_remaining: 12,
            cycle_count: 7,
            active_group_id: Some("g".to_string()),
            current_session_start_at: Some(NOW),
            ..TimerState::default()
        };
        let reset = reset_timer(&state, &s);
        assert_eq!(reset.current_phase, TimerPhase::Focus);
        assert!(!reset.is_running);
        assert_eq!(reset.seconds_remaining, s.focus_minutes * 60);
        assert_eq!(reset.target_end_at, None);
        assert_eq!(reset.current_session_start_at, None);
        assert_eq!(reset.cycle_count, 7);
        assert_eq!(reset.active_group_id.as_deref(), Some("g"));
    }

    #[test]
    fn test_skip_stops_and_advances() {
        let s = settings();
        let skipped = skip_phase(&TimerState::new(&s), &s);
        assert!(!skipped.is_running);
        assert_eq!(skipped.current_phase, TimerPhase::ShortBreak);
        assert_eq!(skipped.cycle_count, 1);
        assert_eq!(skipped.seconds_remaining, 300);
    }

    #[test]
    fn test_skip_running_focus_clears_session() {
        let s = settings();
        let running = start_timer(&TimerState::new(&s), &s, NOW);
        let skipped = skip_phase(&running, &s);
        assert_eq!(skipped.target_end_at, None);
        assert_eq!(skipped.current_session_start_at, None);
    }

    #[test]
    fn test_skip_idle_counts_as_focus() {
        let s = settings();
        let state = TimerState {
            current_phase: TimerPhase::Idle,
            ..TimerState::new(&s)
        };
        assert_eq!(skip_phase(&state, &s).current_phase, TimerPhase::ShortBreak);
    }

    #[test]
    fn test_zero_long_break_every_does_not_panic() {
        let s = PomodoroSettings {
            long_break_every: 0,
            ..settings()
        };
        let skipped = skip_phase(&TimerState::new(&s), &s);
        assert_eq!(skipped.current_phase, TimerPhase::LongBreak);
    }
}
