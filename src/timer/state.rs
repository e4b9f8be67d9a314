use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const WORK_PERIODS_PER_SESSION: u32 = 4;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CyclePhase {
    Work,
    ShortBreak,
    LongBreak,
}

impl Default for CyclePhase {
    fn default() -> Self {
        CyclePhase::Work
    }
}

impl CyclePhase {
    pub fn label(&self) -> &'static str {
        match self {
            CyclePhase::Work => "Work",
            CyclePhase::ShortBreak => "Short Break",
            CyclePhase::LongBreak => "Long Break",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CycleDurations {
    pub work_secs: u32,
    pub short_break_secs: u32,
    pub long_break_secs: u32,
}

impl Default for CycleDurations {
    fn default() -> Self {
        Self {
            work_secs: 25 * 60,
            short_break_secs: 5 * 60,
            long_break_secs: 15 * 60,
        }
    }
}

impl CycleDurations {
    pub fn for_phase(&self, phase: CyclePhase) -> u32 {
        match phase {
            CyclePhase::Work => self.work_secs,
            CyclePhase::ShortBreak => self.short_break_secs,
            CyclePhase::LongBreak => self.long_break_secs,
        }
    }
}

/// Side effects requested by a transition. The state change is already in
/// place when these are returned; the controller executes them afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    SaveCompleted {
        task_name: String,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
    },
    SavePartial {
        task_name: String,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        completed_cycles: u32,
    },
    Notify {
        from: CyclePhase,
        to: CyclePhase,
        task_name: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub phase: CyclePhase,
    pub remaining_secs: u32,
    pub is_running: bool,
    pub task_name: String,
    pub completed_work_periods: u32,
    /// Set on the first start of a cycle, cleared on reset/completion. A
    /// `None` here is what makes the next start a fresh cycle.
    pub cycle_started_at: Option<DateTime<Utc>>,
    pub durations: CycleDurations,
}

impl TimerState {
    pub fn new(durations: CycleDurations) -> Self {
        Self {
            phase: CyclePhase::Work,
            remaining_secs: durations.work_secs,
            is_running: false,
            task_name: String::new(),
            completed_work_periods: 0,
            cycle_started_at: None,
            durations,
        }
    }

    pub fn phase_duration_secs(&self) -> u32 {
        self.durations.for_phase(self.phase)
    }

    /// Fraction of the current phase already elapsed, clamped to [0, 1].
    pub fn progress(&self) -> f64 {
        let total = self.phase_duration_secs();
        if total == 0 {
            return 0.0;
        }
        (1.0 - self.remaining_secs as f64 / total as f64).clamp(0.0, 1.0)
    }

    fn cycle_underway(&self) -> bool {
        self.cycle_started_at.is_some()
    }

    /// Begin or resume the countdown. A fresh cycle requires a non-empty
    /// task name; silently refused otherwise. Resuming never does, though a
    /// non-empty name passed here replaces the stored one. Returns whether
    /// the timer went from stopped to running.
    pub fn start(&mut self, task_name: &str, now: DateTime<Utc>) -> bool {
        if self.is_running {
            return false;
        }
        let task = task_name.trim();
        if !self.cycle_underway() && task.is_empty() {
            return false;
        }
        if !task.is_empty() {
            self.task_name = task.to_string();
        }
        if self.cycle_started_at.is_none() {
            self.cycle_started_at = Some(now);
        }
        self.is_running = true;
        true
    }

    pub fn pause(&mut self) {
        if !self.is_running {
            return;
        }
        self.is_running = false;
    }

    /// Abandon the cycle. Work already completed is recorded as a partial
    /// session; the state unconditionally returns to its initial values.
    pub fn reset(&mut self, now: DateTime<Utc>) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.completed_work_periods > 0 {
            effects.push(Effect::SavePartial {
                task_name: self.task_name.clone(),
                started_at: self.cycle_started_at.unwrap_or(now),
                ended_at: now,
                completed_cycles: self.completed_work_periods,
            });
        }
        *self = Self::new(self.durations);
        effects
    }

    /// Advance the countdown by one second. Reaching zero performs the phase
    /// transition in the same call, so `remaining_secs` is never observed at
    /// zero while running.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<Effect> {
        if !self.is_running {
            return Vec::new();
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs > 0 {
            return Vec::new();
        }
        self.advance_phase(now)
    }

    fn advance_phase(&mut self, now: DateTime<Utc>) -> Vec<Effect> {
        let from = self.phase;
        let task = self.task_name.clone();
        let mut effects = Vec::new();
        match from {
            CyclePhase::Work => {
                self.completed_work_periods += 1;
                let next = if self.completed_work_periods < WORK_PERIODS_PER_SESSION {
                    CyclePhase::ShortBreak
                } else {
                    CyclePhase::LongBreak
                };
                self.enter(next);
            }
            CyclePhase::ShortBreak => {
                self.enter(CyclePhase::Work);
            }
            CyclePhase::LongBreak => {
                // The session only counts once the long break has elapsed.
                effects.push(Effect::SaveCompleted {
                    task_name: task.clone(),
                    started_at: self.cycle_started_at.unwrap_or(now),
                    ended_at: now,
                });
                *self = Self::new(self.durations);
            }
        }
        effects.push(Effect::Notify {
            from,
            to: self.phase,
            task_name: task,
        });
        effects
    }

    fn enter(&mut self, phase: CyclePhase) {
        self.phase = phase;
        self.remaining_secs = self.durations.for_phase(phase);
    }
}
