//! Injectable clock and the runtime timer queue.
//!
//! Debounce, throttle, delayed redirects, and socket reconnects all go
//! through one queue owned by the runtime. Nothing here touches the wall
//! clock directly: production injects [`SystemClock`], tests advance a
//! [`ManualClock`] and pump [`Runtime::run_due`](crate::Runtime::run_due).

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

use dom::NodeId;

use crate::socket::SocketId;

pub trait Clock {
    fn now_ms(&self) -> u64;
}

pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Deterministic clock for tests; shared via `Rc` and advanced in place.
pub struct ManualClock {
    ms: Cell<u64>,
}

impl ManualClock {
    pub fn new() -> Self {
        ManualClock { ms: Cell::new(0) }
    }

    pub fn advance(&self, ms: u64) {
        self.ms.set(self.ms.get() + ms);
    }

    pub fn set(&self, ms: u64) {
        self.ms.set(ms);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.ms.get()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum TimerTask {
    TriggerFire {
        element: NodeId,
        definition: usize,
        event_type: String,
    },
    Redirect {
        url: String,
    },
    SocketReconnect {
        socket: SocketId,
    },
}

struct Entry {
    id: TimerId,
    due_ms: u64,
    task: TimerTask,
}

pub(crate) struct Timers {
    clock: Rc<dyn Clock>,
    entries: Vec<Entry>,
    next_id: u64,
}

impl Timers {
    pub(crate) fn new(clock: Rc<dyn Clock>) -> Self {
        Timers {
            clock,
            entries: Vec::new(),
            next_id: 0,
        }
    }

    pub(crate) fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub(crate) fn schedule(&mut self, delay_ms: u64, task: TimerTask) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry {
            id,
            due_ms: self.clock.now_ms().saturating_add(delay_ms),
            task,
        });
        id
    }

    pub(crate) fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        before != self.entries.len()
    }

    /// Removes and returns expired entries ordered by due time, then by
    /// scheduling order for equal deadlines.
    pub(crate) fn take_due(&mut self) -> Vec<(TimerId, TimerTask)> {
        let now = self.clock.now_ms();
        let mut due: Vec<Entry> = Vec::new();
        let mut keep: Vec<Entry> = Vec::new();
        for entry in self.entries.drain(..) {
            if entry.due_ms <= now {
                due.push(entry);
            } else {
                keep.push(entry);
            }
        }
        self.entries = keep;
        due.sort_by_key(|e| (e.due_ms, e.id.0));
        due.into_iter().map(|e| (e.id, e.task)).collect()
    }

    #[cfg(test)]
    pub(crate) fn pending(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_entries_come_back_in_deadline_order() {
        let clock = Rc::new(ManualClock::new());
        let mut timers = Timers::new(clock.clone());
        timers.schedule(
            300,
            TimerTask::Redirect {
                url: "/b".into(),
            },
        );
        timers.schedule(
            100,
            TimerTask::Redirect {
                url: "/a".into(),
            },
        );
        assert!(timers.take_due().is_empty());

        clock.advance(300);
        let due = timers.take_due();
        assert_eq!(due.len(), 2);
        assert_eq!(
            due[0].1,
            TimerTask::Redirect {
                url: "/a".into()
            }
        );
        assert_eq!(timers.pending(), 0);
    }

    #[test]
    fn cancel_removes_a_pending_entry() {
        let clock = Rc::new(ManualClock::new());
        let mut timers = Timers::new(clock.clone());
        let id = timers.schedule(
            50,
            TimerTask::Redirect {
                url: "/x".into(),
            },
        );
        assert!(timers.cancel(id));
        assert!(!timers.cancel(id));
        clock.advance(100);
        assert!(timers.take_due().is_empty());
    }
}
