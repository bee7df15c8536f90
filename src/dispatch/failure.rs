// Failure observation for asynchronously dispatched commands
//
// Errors raised on a worker never travel back to the submitter. They are
// logged where they are caught and, for callers that subscribed, copied into
// an mpsc channel.

use crate::command::trait_def::{CommandError, Operation};
use crate::dispatch::handle::TaskId;
use parking_lot::Mutex;
use std::ops::Deref;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Weak};

/// A failure caught at the boundary of an asynchronous task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsyncFailure {
    pub task_id: TaskId,
    pub operation: Operation,
    /// Description of the command that failed
    pub description: String,
    pub error: CommandError,
}

/// Receiving end of a failure subscription
///
/// Derefs to the underlying [`Receiver`]. Dropping it unsubscribes.
#[derive(Debug)]
pub struct FailureReceiver {
    rx: Receiver<AsyncFailure>,
    _alive: Arc<()>,
}

impl Deref for FailureReceiver {
    type Target = Receiver<AsyncFailure>;

    fn deref(&self) -> &Self::Target {
        &self.rx
    }
}

struct Subscriber {
    tx: Sender<AsyncFailure>,
    alive: Weak<()>,
}

impl Subscriber {
    fn is_connected(&self) -> bool {
        self.alive.strong_count() > 0
    }
}

/// Fan-out of failure records to every live subscriber
#[derive(Default)]
pub(crate) struct FailureHub {
    subscribers: Mutex<Vec<Subscriber>>,
}

impl FailureHub {
    /// Register a new subscriber, forgetting any whose receiver was dropped
    pub(crate) fn subscribe(&self) -> FailureReceiver {
        let (tx, rx) = mpsc::channel();
        let alive = Arc::new(());

        let mut subscribers = self.subscribers.lock();
        subscribers.retain(Subscriber::is_connected);
        subscribers.push(Subscriber {
            tx,
            alive: Arc::downgrade(&alive),
        });

        FailureReceiver { rx, _alive: alive }
    }

    /// Send to all subscribers, forgetting those whose receiver was dropped
    pub(crate) fn publish(&self, failure: &AsyncFailure) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|s| s.is_connected() && s.tx.send(failure.clone()).is_ok());
    }

    #[cfg(test)]
    fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}
