//! Breathing exercise timer and daily slot tracking.
//!
//! The session is driven by one-second ticks from whoever owns the clock, so
//! it carries no timer of its own and is trivially testable.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const BREATHING_DAILY_GOAL: usize = 6;
pub const WATER_DAILY_GOAL: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreathPhase {
    Inhale,
    Hold,
    Exhale,
    Rest,
}

impl BreathPhase {
    fn following(self) -> Self {
        match self {
            Self::Inhale => Self::Hold,
            Self::Hold => Self::Exhale,
            Self::Exhale => Self::Rest,
            Self::Rest => Self::Inhale,
        }
    }

    #[must_use]
    pub fn instruction(self) -> &'static str {
        match self {
            Self::Inhale => "Breathe in",
            Self::Hold => "Hold",
            Self::Exhale => "Breathe out",
            Self::Rest => "Rest",
        }
    }
}

/// How a session ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionLimit {
    /// Stop when a fixed countdown reaches zero, wherever the cycle is.
    Duration { secs: u32 },
    /// Run whole cycles, then rest `settle_secs` before completing.
    Cycles { count: u32, settle_secs: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreathingPattern {
    pub name: &'static str,
    pub inhale_secs: u32,
    pub hold_secs: u32,
    pub exhale_secs: u32,
    pub rest_secs: u32,
    pub limit: SessionLimit,
}

impl BreathingPattern {
    /// 4-7-8 breathing with a one second rest, inside a 30 second session.
    #[must_use]
    pub fn four_seven_eight() -> Self {
        Self {
            name: "4-7-8",
            inhale_secs: 4,
            hold_secs: 7,
            exhale_secs: 8,
            rest_secs: 1,
            limit: SessionLimit::Duration { secs: 30 },
        }
    }

    /// Shorter 4-2-4 variant: five cycles then a one second settle.
    #[must_use]
    pub fn four_two_four() -> Self {
        Self {
            name: "4-2-4",
            inhale_secs: 4,
            hold_secs: 2,
            exhale_secs: 4,
            rest_secs: 0,
            limit: SessionLimit::Cycles {
                count: 5,
                settle_secs: 1,
            },
        }
    }

    #[must_use]
    pub fn phase_secs(&self, phase: BreathPhase) -> u32 {
        match phase {
            BreathPhase::Inhale => self.inhale_secs,
            BreathPhase::Hold => self.hold_secs,
            BreathPhase::Exhale => self.exhale_secs,
            BreathPhase::Rest => self.rest_secs,
        }
    }

    #[must_use]
    pub fn cycle_secs(&self) -> u32 {
        self.inhale_secs + self.hold_secs + self.exhale_secs + self.rest_secs
    }

    #[must_use]
    pub fn total_secs(&self) -> u32 {
        match self.limit {
            SessionLimit::Duration { secs } => secs,
            SessionLimit::Cycles { count, settle_secs } => count * self.cycle_secs() + settle_secs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionEvent {
    PhaseChanged(BreathPhase),
    CycleCompleted(u32),
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Running,
    Stopped,
    Completed,
}

#[derive(Debug, Clone)]
pub struct BreathingSession {
    pattern: BreathingPattern,
    phase: BreathPhase,
    phase_remaining: u32,
    elapsed: u32,
    cycles_completed: u32,
    settling: bool,
    status: SessionStatus,
}

impl BreathingSession {
    #[must_use]
    pub fn start(pattern: BreathingPattern) -> Self {
        Self {
            phase: BreathPhase::Inhale,
            phase_remaining: pattern.inhale_secs,
            elapsed: 0,
            cycles_completed: 0,
            settling: false,
            status: SessionStatus::Running,
            pattern,
        }
    }

    #[must_use]
    pub fn pattern(&self) -> &BreathingPattern {
        &self.pattern
    }

    #[must_use]
    pub fn phase(&self) -> BreathPhase {
        self.phase
    }

    #[must_use]
    pub fn phase_remaining(&self) -> u32 {
        self.phase_remaining
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.pattern.total_secs().saturating_sub(self.elapsed)
    }

    #[must_use]
    pub fn cycles_completed(&self) -> u32 {
        self.cycles_completed
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Cancel the session. Later ticks are ignored.
    pub fn stop(&mut self) {
        if self.status == SessionStatus::Running {
            self.status = SessionStatus::Stopped;
        }
    }

    /// Advance one second. Returns what happened during that second;
    /// empty once the session is stopped or completed.
    pub fn tick(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if self.status != SessionStatus::Running {
            return events;
        }

        self.elapsed += 1;
        self.phase_remaining = self.phase_remaining.saturating_sub(1);

        if let SessionLimit::Duration { secs } = self.pattern.limit {
            if self.elapsed >= secs {
                self.complete(&mut events);
                return events;
            }
        }

        if self.phase_remaining == 0 {
            self.advance(&mut events);
        }
        events
    }

    fn complete(&mut self, events: &mut Vec<SessionEvent>) {
        self.status = SessionStatus::Completed;
        self.phase_remaining = 0;
        events.push(SessionEvent::Completed);
    }

    fn advance(&mut self, events: &mut Vec<SessionEvent>) {
        if self.settling {
            self.complete(events);
            return;
        }

        let mut next = self.phase;
        // At most one full lap of phases; an all-zero pattern simply completes.
        for _ in 0..4 {
            let wrapping = next == BreathPhase::Rest;
            next = next.following();
            if wrapping {
                self.cycles_completed += 1;
                events.push(SessionEvent::CycleCompleted(self.cycles_completed));
                if let SessionLimit::Cycles { count, settle_secs } = self.pattern.limit {
                    if self.cycles_completed >= count {
                        if settle_secs == 0 {
                            self.complete(events);
                        } else {
                            self.settling = true;
                            self.phase = BreathPhase::Rest;
                            self.phase_remaining = settle_secs;
                            events.push(SessionEvent::PhaseChanged(BreathPhase::Rest));
                        }
                        return;
                    }
                }
            }
            let secs = self.pattern.phase_secs(next);
            if secs > 0 {
                self.phase = next;
                self.phase_remaining = secs;
                events.push(SessionEvent::PhaseChanged(next));
                return;
            }
        }
        self.complete(events);
    }
}

/// The two daily checklists kept per user and date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tracker {
    Breathing,
    Water,
}

impl Tracker {
    #[must_use]
    pub fn daily_goal(self) -> usize {
        match self {
            Self::Breathing => BREATHING_DAILY_GOAL,
            Self::Water => WATER_DAILY_GOAL,
        }
    }

    #[must_use]
    pub fn empty(self) -> DailyProgress {
        DailyProgress::new(self.daily_goal())
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Breathing => "breathing",
            Self::Water => "water",
        }
    }
}

/// One day of a tracker as stored locally. `synced` is false when the last
/// change could not be pushed to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRecord {
    pub tracker: Tracker,
    pub date: NaiveDate,
    #[serde(flatten)]
    pub progress: DailyProgress,
    pub completed: usize,
    pub synced: bool,
}

impl DailyRecord {
    #[must_use]
    pub fn new(tracker: Tracker, date: NaiveDate, progress: DailyProgress, synced: bool) -> Self {
        Self {
            tracker,
            date,
            completed: progress.completed(),
            progress,
            synced,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgressError {
    #[error("Slot {index} is out of range (0-{max})")]
    OutOfRange { index: usize, max: usize },
}

/// A day's checklist of slots, e.g. six breathing sessions or eight glasses of water.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyProgress {
    pub slots: Vec<bool>,
    pub daily_goal: usize,
}

impl DailyProgress {
    #[must_use]
    pub fn new(daily_goal: usize) -> Self {
        Self {
            slots: vec![false; daily_goal],
            daily_goal,
        }
    }

    #[must_use]
    pub fn breathing() -> Self {
        Self::new(BREATHING_DAILY_GOAL)
    }

    #[must_use]
    pub fn water() -> Self {
        Self::new(WATER_DAILY_GOAL)
    }

    /// Rebuild from stored slots, padding or truncating to `daily_goal`.
    #[must_use]
    pub fn from_slots(mut slots: Vec<bool>, daily_goal: usize) -> Self {
        slots.resize(daily_goal, false);
        Self { slots, daily_goal }
    }

    /// Mark the first empty slot. Returns its index, or `None` when the day is full.
    pub fn add_next(&mut self) -> Option<usize> {
        let idx = self.slots.iter().position(|done| !done)?;
        self.slots[idx] = true;
        Some(idx)
    }

    /// Flip one slot and return its new value.
    pub fn toggle(&mut self, index: usize) -> Result<bool, ProgressError> {
        let len = self.slots.len();
        let slot = self.slots.get_mut(index).ok_or(ProgressError::OutOfRange {
            index,
            max: len.saturating_sub(1),
        })?;
        *slot = !*slot;
        Ok(*slot)
    }

    #[must_use]
    pub fn completed(&self) -> usize {
        self.slots.iter().filter(|done| **done).count()
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> f64 {
        if self.daily_goal == 0 {
            return 0.0;
        }
        self.completed() as f64 / self.daily_goal as f64
    }

    #[must_use]
    pub fn is_goal_met(&self) -> bool {
        self.completed() >= self.daily_goal
    }
}
