//! The inbound [`ActionMessage`] queue every Core/Broker worker thread
//! services: a priority channel that bypasses ordered delivery (§4.1) plus
//! an ordered channel preserving per-(src,dest) delivery order (§5).
//!
//! Many producers (federate threads, peer connections) feed one consumer
//! (the owning node's worker thread), matching the "many-producer,
//! single-consumer per node" resource rule. Multiple [`ActionBus`] clones
//! share the same underlying queue and can be hung off any number of
//! sender threads.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};

use helics_message::ActionMessage;

#[derive(Default)]
struct Queues {
    priority: VecDeque<ActionMessage>,
    ordered: VecDeque<ActionMessage>,
    closed: bool,
}

/// A shared, priority-aware inbound queue. Clone to hand a sending handle
/// to another thread; the queue itself is reference-counted.
#[derive(Clone)]
pub struct ActionBus {
    inner: Arc<(Mutex<Queues>, Condvar)>,
}

impl Default for ActionBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionBus {
    pub fn new() -> Self {
        ActionBus {
            inner: Arc::new((Mutex::new(Queues::default()), Condvar::new())),
        }
    }

    /// Enqueues a priority message: setup/teardown, query traffic. Delivered
    /// ahead of every non-priority message already queued.
    pub fn send_priority(&self, msg: ActionMessage) {
        let (lock, cvar) = &*self.inner;
        let mut q = lock.lock().unwrap();
        q.priority.push_back(msg);
        cvar.notify_one();
    }

    /// Enqueues a non-priority message: timing, data/routing,
    /// configuration. FIFO within this queue, preserving per-(src,dest)
    /// ordering for the caller.
    pub fn send_ordered(&self, msg: ActionMessage) {
        let (lock, cvar) = &*self.inner;
        let mut q = lock.lock().unwrap();
        q.ordered.push_back(msg);
        cvar.notify_one();
    }

    /// Routes by the message's own action class, matching §4.1's
    /// partition: priority actions go on the bypass channel, everything
    /// else goes through ordered delivery.
    pub fn send(&self, msg: ActionMessage) {
        if msg.is_priority() {
            self.send_priority(msg);
        } else {
            self.send_ordered(msg);
        }
    }

    /// Re-enqueues a message a handler returned `delay_processing` for.
    /// Goes to the back of whichever queue it originally belonged to, so a
    /// message that cannot yet be processed doesn't head-of-line block its
    /// class.
    pub fn requeue(&self, msg: ActionMessage) {
        self.send(msg);
    }

    /// Blocks until a message is available or the bus is closed, returning
    /// `None` only once closed with nothing left to drain.
    pub fn recv(&self) -> Option<ActionMessage> {
        let (lock, cvar) = &*self.inner;
        let mut q = lock.lock().unwrap();
        loop {
            if let Some(msg) = q.priority.pop_front() {
                return Some(msg);
            }
            if let Some(msg) = q.ordered.pop_front() {
                return Some(msg);
            }
            if q.closed {
                return None;
            }
            q = cvar.wait(q).unwrap();
        }
    }

    /// Non-blocking variant of [`ActionBus::recv`], for a worker loop that
    /// also has other wake sources (wall-clock timers, etc.) to poll.
    pub fn try_recv(&self) -> Option<ActionMessage> {
        let (lock, _) = &*self.inner;
        let mut q = lock.lock().unwrap();
        q.priority.pop_front().or_else(|| q.ordered.pop_front())
    }

    /// Wakes every blocked receiver with no message, so the worker loop can
    /// observe `closed` and exit cleanly (used on federation disconnect).
    pub fn close(&self) {
        let (lock, cvar) = &*self.inner;
        lock.lock().unwrap().closed = true;
        cvar.notify_all();
    }

    pub fn is_empty(&self) -> bool {
        let (lock, _) = &*self.inner;
        let q = lock.lock().unwrap();
        q.priority.is_empty() && q.ordered.is_empty()
    }
}
