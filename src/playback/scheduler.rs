//! Polling task scheduling
//!
//! The cursor is driven by a repeating per-frame task. A `Scheduler` only
//! hands out and revokes task handles; whoever owns the event loop calls
//! the transport's `tick` while the handle is live.

use std::collections::HashSet;

use log::debug;
use serde::{Deserialize, Serialize};

/// How often the polling task runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalPolicy {
    /// Once per display frame
    #[default]
    EveryFrame,
    /// A fixed period in milliseconds
    FixedMs(u64),
}

impl IntervalPolicy {
    /// One frame at 60 Hz
    pub const FRAME_MS: f64 = 1000.0 / 60.0;

    pub fn period_ms(&self) -> f64 {
        match self {
            IntervalPolicy::EveryFrame => Self::FRAME_MS,
            IntervalPolicy::FixedMs(ms) => *ms as f64,
        }
    }
}

/// Identifies one scheduled polling task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(u64);

impl TaskHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Starts and cancels repeating tasks
pub trait Scheduler {
    fn start(&mut self, policy: IntervalPolicy) -> TaskHandle;

    /// Cancelling an unknown or finished handle is a no-op
    fn cancel(&mut self, handle: TaskHandle);

    fn is_live(&self, handle: TaskHandle) -> bool;
}

/// In-process scheduler that only tracks which handles are live
#[derive(Debug, Clone, Default)]
pub struct FrameScheduler {
    next_id: u64,
    live: HashSet<u64>,
    started: usize,
    cancelled: usize,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks that have been started and not cancelled
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn started_count(&self) -> usize {
        self.started
    }

    pub fn cancelled_count(&self) -> usize {
        self.cancelled
    }
}

impl Scheduler for FrameScheduler {
    fn start(&mut self, policy: IntervalPolicy) -> TaskHandle {
        self.next_id += 1;
        self.live.insert(self.next_id);
        self.started += 1;
        debug!(
            "[SCHED] Task {} started every {:.1} ms",
            self.next_id,
            policy.period_ms()
        );
        TaskHandle(self.next_id)
    }

    fn cancel(&mut self, handle: TaskHandle) {
        if self.live.remove(&handle.0) {
            self.cancelled += 1;
            debug!("[SCHED] Task {} cancelled", handle.0);
        }
    }

    fn is_live(&self, handle: TaskHandle) -> bool {
        self.live.contains(&handle.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_period() {
        assert_relative_eq!(IntervalPolicy::EveryFrame.period_ms(), 16.666, epsilon = 0.001);
        assert_relative_eq!(IntervalPolicy::FixedMs(25).period_ms(), 25.0);
    }

    #[test]
    fn test_policy_json() {
        let json = serde_json::to_string(&IntervalPolicy::FixedMs(10)).unwrap();
        assert_eq!(json, r#"{"fixed_ms":10}"#);
        let policy: IntervalPolicy = serde_json::from_str(r#""every_frame""#).unwrap();
        assert_eq!(policy, IntervalPolicy::EveryFrame);
    }

    #[test]
    fn test_start_and_cancel() {
        let mut scheduler = FrameScheduler::new();
        let a = scheduler.start(IntervalPolicy::EveryFrame);
        let b = scheduler.start(IntervalPolicy::EveryFrame);
        assert_ne!(a, b);
        assert_eq!(scheduler.live_count(), 2);

        scheduler.cancel(a);
        assert!(!scheduler.is_live(a));
        assert!(scheduler.is_live(b));
    }

    #[test]
    fn test_double_cancel_is_noop() {
        let mut scheduler = FrameScheduler::new();
        let handle = scheduler.start(IntervalPolicy::EveryFrame);
        scheduler.cancel(handle);
        scheduler.cancel(handle);
        assert_eq!(scheduler.cancelled_count(), 1);
        assert_eq!(scheduler.live_count(), 0);
    }
}
