// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Host timer facility.
//!
//! A scheduler runs a `TimerTask` after a delay and hands it back as a
//! `Fired` value. `QueueScheduler` keeps a min-heap ordered by due time and
//! is polled against a clock; `TokioScheduler` sleeps on the tokio runtime
//! and delivers through a channel. Firing order for equal due times follows
//! scheduling order in the queue implementation and is best-effort on tokio.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{Fired, TaskHandle, TimerTask};
use crate::timing::Clock;

/// Deferred callback registry
pub trait Scheduler {
    /// Run `task` after `delay`
    fn schedule(&mut self, delay: Duration, task: TimerTask) -> TaskHandle;

    /// Prevent a task from firing.
    ///
    /// Cancelling a handle that already fired (or never existed) is a no-op.
    fn cancel(&mut self, handle: TaskHandle);

    /// Number of tasks scheduled and not yet fired or cancelled
    fn pending(&self) -> usize;
}

/// A task waiting in the queue
#[derive(Debug, Clone)]
struct QueuedTask {
    /// Absolute due time in ms
    due_ms: u64,
    /// Scheduling order, for ties
    seq: u64,
    handle: TaskHandle,
    task: TimerTask,
}

// For BinaryHeap - we want earliest due (then earliest scheduled) first
impl Eq for QueuedTask {}

impl PartialEq for QueuedTask {
    fn eq(&self, other: &Self) -> bool {
        self.due_ms == other.due_ms && self.seq == other.seq
    }
}

impl Ord for QueuedTask {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap behavior
        other
            .due_ms
            .cmp(&self.due_ms)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueuedTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Polled scheduler over a clock.
///
/// Cancellation is lazy: cancelled handles are remembered and skipped when
/// they reach the top of the heap, so the head of the queue is always live.
pub struct QueueScheduler<C: Clock> {
    clock: C,
    queue: BinaryHeap<QueuedTask>,
    /// Handles queued and neither fired nor cancelled
    live: HashSet<TaskHandle>,
    /// Handles cancelled but still somewhere in the heap
    cancelled: HashSet<TaskHandle>,
    next_seq: u64,
}

impl<C: Clock> QueueScheduler<C> {
    /// Create a scheduler reading time from `clock`
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            queue: BinaryHeap::with_capacity(256),
            live: HashSet::new(),
            cancelled: HashSet::new(),
            next_seq: 0,
        }
    }

    /// The clock due times are measured against
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Due time of the earliest task
    pub fn next_due(&self) -> Option<u64> {
        self.queue.peek().map(|t| t.due_ms)
    }

    /// Time until the earliest task, zero if already due
    pub fn time_to_next(&self) -> Option<Duration> {
        let now = self.clock.now_ms();
        self.next_due()
            .map(|due| Duration::from_millis(due.saturating_sub(now)))
    }

    /// Pop every task due at the current clock reading, in order
    pub fn poll(&mut self) -> Vec<Fired> {
        let now = self.clock.now_ms();
        let mut fired = Vec::new();

        while let Some(next) = self.queue.peek() {
            if next.due_ms > now {
                break;
            }
            if let Some(task) = self.queue.pop() {
                self.live.remove(&task.handle);
                fired.push(Fired {
                    handle: task.handle,
                    task: task.task,
                });
            }
            self.discard_cancelled();
        }

        fired
    }

    /// Drop every queued task
    pub fn clear(&mut self) {
        self.queue.clear();
        self.live.clear();
        self.cancelled.clear();
    }

    fn discard_cancelled(&mut self) {
        while let Some(top) = self.queue.peek() {
            if !self.cancelled.remove(&top.handle) {
                break;
            }
            self.queue.pop();
        }
    }
}

impl<C: Clock> Scheduler for QueueScheduler<C> {
    fn schedule(&mut self, delay: Duration, task: TimerTask) -> TaskHandle {
        let seq = self.next_seq;
        self.next_seq += 1;
        let handle = TaskHandle(seq);

        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.queue.push(QueuedTask {
            due_ms: self.clock.now_ms().saturating_add(delay_ms),
            seq,
            handle,
            task,
        });
        self.live.insert(handle);
        handle
    }

    fn cancel(&mut self, handle: TaskHandle) {
        if self.live.remove(&handle) {
            self.cancelled.insert(handle);
            self.discard_cancelled();
        }
    }

    fn pending(&self) -> usize {
        self.live.len()
    }
}

/// Scheduler backed by tokio timers.
///
/// Must be used from within a tokio runtime. Fired tasks arrive on the
/// receiver returned by `new`; a task cancelled after its timer elapsed may
/// still be in the channel, so consumers must check handle ownership.
pub struct TokioScheduler {
    tx: mpsc::UnboundedSender<Fired>,
    tasks: HashMap<TaskHandle, JoinHandle<()>>,
    next_id: u64,
}

impl TokioScheduler {
    /// Create a scheduler and the receiver its fired tasks arrive on
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Fired>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            tx,
            tasks: HashMap::new(),
            next_id: 0,
        };
        (scheduler, rx)
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&mut self, delay: Duration, task: TimerTask) -> TaskHandle {
        self.tasks.retain(|_, join| !join.is_finished());

        let handle = TaskHandle(self.next_id);
        self.next_id += 1;

        let tx = self.tx.clone();
        let join = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Fired { handle, task });
        });
        self.tasks.insert(handle, join);
        handle
    }

    fn cancel(&mut self, handle: TaskHandle) {
        if let Some(join) = self.tasks.remove(&handle) {
            join.abort();
        }
    }

    fn pending(&self) -> usize {
        self.tasks.values().filter(|join| !join.is_finished()).count()
    }
}
