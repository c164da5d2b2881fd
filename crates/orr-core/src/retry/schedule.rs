//! The burst/cycle schedule as a flat sequence of steps.
//!
//! Attempts are grouped into bursts and bursts into cycles. Between two
//! attempts of one burst there is a short pause, between bursts of one cycle a
//! burst pause, and between cycles a long pause. Nothing follows the last
//! attempt.

use crate::config::RetryConfig;

/// Position of one attempt in the schedule. All indices are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptSlot {
    /// Global attempt number; never resets across bursts or cycles.
    pub index: u32,
    pub burst: u32,
    pub cycle: u32,
}

/// Wait between two attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pause {
    /// Between attempts of one burst.
    Attempt,
    /// After burst `burst` of cycle `cycle`, before the next burst.
    Burst { burst: u32, cycle: u32 },
    /// After cycle `cycle`, before the next one.
    Cycle { cycle: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Attempt(AttemptSlot),
    Pause(Pause),
}

/// Iterator over the steps of one session's schedule.
#[derive(Debug, Clone)]
pub struct Schedule {
    per_burst: u32,
    bursts: u32,
    cycles: u32,
    next: Option<AttemptSlot>,
    slot: u32,
    pending_pause: Option<Pause>,
}

impl Schedule {
    pub fn new(cfg: &RetryConfig) -> Self {
        let per_burst = cfg.attempts_per_burst;
        let bursts = cfg.bursts_before_long_pause;
        let cycles = cfg.cycles;
        let next = (per_burst > 0 && bursts > 0 && cycles > 0).then_some(AttemptSlot {
            index: 1,
            burst: 1,
            cycle: 1,
        });
        Self {
            per_burst,
            bursts,
            cycles,
            next,
            slot: 1,
            pending_pause: None,
        }
    }
}

impl Iterator for Schedule {
    type Item = Step;

    fn next(&mut self) -> Option<Step> {
        if let Some(pause) = self.pending_pause.take() {
            return Some(Step::Pause(pause));
        }
        let current = self.next?;

        let following = AttemptSlot {
            index: current.index + 1,
            ..current
        };
        if self.slot < self.per_burst {
            self.slot += 1;
            self.pending_pause = Some(Pause::Attempt);
            self.next = Some(following);
        } else if current.burst < self.bursts {
            self.slot = 1;
            self.pending_pause = Some(Pause::Burst {
                burst: current.burst,
                cycle: current.cycle,
            });
            self.next = Some(AttemptSlot {
                burst: current.burst + 1,
                ..following
            });
        } else if current.cycle < self.cycles {
            self.slot = 1;
            self.pending_pause = Some(Pause::Cycle {
                cycle: current.cycle,
            });
            self.next = Some(AttemptSlot {
                burst: 1,
                cycle: current.cycle + 1,
                ..following
            });
        } else {
            self.next = None;
        }

        Some(Step::Attempt(current))
    }
}
