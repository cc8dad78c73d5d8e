//! Repeating tasks driven by the host's frame clock.
//!
//! Tasks never run themselves: `advance` reports which ids are due and the
//! caller performs the work. Cancellation goes through a [`TaskHandle`]
//! captured at schedule time, so a cancelled task cannot fire again even if
//! its handle outlives the scheduler.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Most firings one task may report per `advance`, however long the gap.
pub const MAX_CATCH_UP: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

/// Cancels its task. Clones share the same flag.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: TaskId,
    cancelled: Arc<AtomicBool>,
}

impl TaskHandle {
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// A task that came due during one `advance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Firing {
    pub id: TaskId,
    /// Number of whole intervals elapsed, capped at [`MAX_CATCH_UP`].
    pub times: u32,
}

#[derive(Debug)]
struct Task {
    id: TaskId,
    interval: f64,
    until_next: f64,
    cancelled: Arc<AtomicBool>,
}

#[derive(Debug, Default)]
pub struct TaskScheduler {
    tasks: Vec<Task>,
    next_id: u64,
}

impl TaskScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire every `interval`, first after one full interval. Zero intervals
    /// are bumped to one microsecond.
    pub fn schedule_repeating(&mut self, interval: Duration) -> TaskHandle {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        let interval = interval.as_secs_f64().max(1e-6);
        let cancelled = Arc::new(AtomicBool::new(false));
        self.tasks.push(Task {
            id,
            interval,
            until_next: interval,
            cancelled: Arc::clone(&cancelled),
        });
        tracing::debug!(?id, interval, "task scheduled");
        TaskHandle { id, cancelled }
    }

    pub fn advance(&mut self, dt: Duration) -> Vec<Firing> {
        self.tasks.retain(|t| !t.cancelled.load(Ordering::Acquire));
        let dt = dt.as_secs_f64();
        let mut fired = Vec::new();
        for task in &mut self.tasks {
            task.until_next -= dt;
            if task.until_next > 0.0 {
                continue;
            }
            let due = 1 + (-task.until_next / task.interval).floor() as u64;
            let times = due.min(MAX_CATCH_UP as u64) as u32;
            if due > MAX_CATCH_UP as u64 {
                // Backlog beyond the cap is dropped; restart the phase.
                task.until_next = task.interval;
            } else {
                task.until_next += due as f64 * task.interval;
            }
            fired.push(Firing { id: task.id, times });
        }
        fired
    }

    /// Live (uncancelled) task count.
    pub fn len(&self) -> usize {
        self.tasks
            .iter()
            .filter(|t| !t.cancelled.load(Ordering::Acquire))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn fires_on_interval() {
        let mut s = TaskScheduler::new();
        let h = s.schedule_repeating(ms(100));
        assert!(s.advance(ms(50)).is_empty());
        assert_eq!(s.advance(ms(60)), vec![Firing { id: h.id(), times: 1 }]);
        assert!(s.advance(ms(50)).is_empty());
        assert_eq!(s.advance(ms(50)).len(), 1);
    }

    #[test]
    fn catch_up_is_capped() {
        let mut s = TaskScheduler::new();
        let h = s.schedule_repeating(ms(10));
        let fired = s.advance(Duration::from_secs(1));
        assert_eq!(fired, vec![Firing { id: h.id(), times: MAX_CATCH_UP }]);
        assert!(s.advance(ms(5)).is_empty());
    }

    #[test]
    fn cancelled_task_never_fires() {
        let mut s = TaskScheduler::new();
        let keep = s.schedule_repeating(ms(10));
        let gone = s.schedule_repeating(ms(10));
        gone.cancel();
        gone.cancel();
        let fired = s.advance(ms(15));
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].id, keep.id());
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn cancel_after_scheduler_dropped_is_harmless() {
        let handle = {
            let mut s = TaskScheduler::new();
            s.schedule_repeating(ms(10))
        };
        handle.cancel();
        assert!(handle.is_cancelled());
    }
}
