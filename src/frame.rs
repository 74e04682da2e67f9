//! Frame scheduling for the terminal host.
//!
//! Stands in for a display's per-frame callback: at most one frame request
//! is pending at a time, and cancelling it is always safe. Simulation steps
//! are fixed-size; a late frame catches up with a few extra steps.

use std::time::{Duration, Instant};

/// Most fixed steps run for one presented frame.
pub const MAX_CATCH_UP_STEPS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRequest {
    pub id: u64,
    pub due: Instant,
}

pub struct FrameClock {
    step: Duration,
    next_id: u64,
    pending: Option<FrameRequest>,
    last_frame: Option<Instant>,
    accumulator: Duration,
}

impl FrameClock {
    pub fn new(fps: u32) -> Self {
        Self {
            step: Duration::from_secs_f64(1.0 / fps.max(1) as f64),
            next_id: 0,
            pending: None,
            last_frame: None,
            accumulator: Duration::ZERO,
        }
    }

    pub fn step(&self) -> Duration {
        self.step
    }

    pub fn pending(&self) -> Option<FrameRequest> {
        self.pending
    }

    /// Ask for the next frame one step from `now`, replacing any earlier request.
    pub fn request(&mut self, now: Instant) -> u64 {
        self.next_id += 1;
        self.pending = Some(FrameRequest {
            id: self.next_id,
            due: now + self.step,
        });
        self.next_id
    }

    /// Drop the pending request, if any.
    pub fn cancel(&mut self) -> Option<FrameRequest> {
        self.last_frame = None;
        self.accumulator = Duration::ZERO;
        self.pending.take()
    }

    /// How long until the pending frame is due. `None` when nothing is pending.
    pub fn timeout(&self, now: Instant) -> Option<Duration> {
        self.pending.map(|req| req.due.saturating_duration_since(now))
    }

    /// Consume the pending request if it is due and return how many fixed
    /// steps to simulate for it.
    pub fn fire(&mut self, now: Instant) -> Option<u32> {
        let request = self.pending?;
        if now < request.due {
            return None;
        }
        self.pending = None;

        let Some(last) = self.last_frame.replace(now) else {
            return Some(1);
        };

        self.accumulator += now.saturating_duration_since(last);
        let cap = self.step * MAX_CATCH_UP_STEPS;
        if self.accumulator > cap {
            self.accumulator = cap;
        }

        let mut steps = 0;
        while self.accumulator >= self.step {
            self.accumulator -= self.step;
            steps += 1;
        }
        Some(steps)
    }
}
