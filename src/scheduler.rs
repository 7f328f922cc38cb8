//! # Cooperative Scheduler
//!
//! Everything in the engine runs on one thread. Deferred work (the
//! self-healing repair, the scroll debounce, the settle delay before a zone
//! accepts dropped images) is queued here instead of blocking, and handed
//! back to the owner when its moment comes.
//!
//! Time is virtual: the host calls [`Scheduler::next_frame`] once per
//! animation frame and [`Scheduler::advance`] as wall-clock time passes.
//! Tasks are plain values, so the owner decides how to run them with full
//! access to its own state.

use std::time::Duration;

/// When a task should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deferral {
    /// On the next animation frame.
    NextFrame,
    /// Once this much virtual time has passed.
    After(Duration),
}

/// Handle for cancelling a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(u64);

#[derive(Debug)]
struct Pending<T> {
    handle: TaskHandle,
    due: Option<Duration>,
    task: T,
}

#[derive(Debug)]
pub struct Scheduler<T> {
    now: Duration,
    next_id: u64,
    pending: Vec<Pending<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_id: 0,
            pending: Vec::new(),
        }
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn schedule(&mut self, when: Deferral, task: T) -> TaskHandle {
        let handle = TaskHandle(self.next_id);
        self.next_id += 1;
        let due = match when {
            Deferral::NextFrame => None,
            Deferral::After(delay) => Some(self.now + delay),
        };
        self.pending.push(Pending { handle, due, task });
        handle
    }

    /// Cancel `previous` (if still pending) and schedule `task` in its place.
    pub fn reschedule(
        &mut self,
        previous: Option<TaskHandle>,
        when: Deferral,
        task: T,
    ) -> TaskHandle {
        if let Some(handle) = previous {
            self.cancel(handle);
        }
        self.schedule(when, task)
    }

    /// Returns the task if it had not run yet.
    pub fn cancel(&mut self, handle: TaskHandle) -> Option<T> {
        let index = self.pending.iter().position(|p| p.handle == handle)?;
        Some(self.pending.remove(index).task)
    }

    pub fn cancel_all(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }

    pub fn is_pending(&self, handle: TaskHandle) -> bool {
        self.pending.iter().any(|p| p.handle == handle)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Take every frame task, in scheduling order. Tasks scheduled while
    /// running these wait for the following frame.
    pub fn next_frame(&mut self) -> Vec<(TaskHandle, T)> {
        self.take_where(|p| p.due.is_none())
    }

    /// Move virtual time forward and take every timer that came due, ordered
    /// by due time then scheduling order.
    pub fn advance(&mut self, by: Duration) -> Vec<(TaskHandle, T)> {
        self.now += by;
        let now = self.now;
        self.take_where(|p| p.due.is_some_and(|d| d <= now))
    }

    fn take_where(&mut self, pred: impl Fn(&Pending<T>) -> bool) -> Vec<(TaskHandle, T)> {
        let (ready, waiting): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.pending).into_iter().partition(|p| pred(p));
        self.pending = waiting;
        let mut ready: Vec<_> = ready.into_iter().map(|p| (p.due, p.handle, p.task)).collect();
        ready.sort_by(|a, b| a.0.cmp(&b.0).then(a.1 .0.cmp(&b.1 .0)));
        ready.into_iter().map(|(_, h, t)| (h, t)).collect()
    }
}
