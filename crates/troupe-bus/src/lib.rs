//! Named-topic publish/subscribe bus.
//!
//! The bus decouples every other engine component: producers publish
//! tagged [`Event`]s from any thread (including from inside a handler),
//! and the scheduling thread delivers them at its message cadence.
//!
//! Delivery is a *bounded snapshot*: one [`dispatch`](MessageBus::dispatch)
//! call delivers only the messages enqueued before it began, so handlers
//! that publish during dispatch cannot recurse unboundedly — their
//! messages wait for the next dispatch.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

use std::sync::{Arc, Mutex};

use crossbeam_channel::{Receiver, Sender};
use indexmap::IndexMap;

use troupe_core::{Event, Topic};

/// A subscribed handler.
///
/// Handlers receive the bus itself so they can publish follow-up
/// events; those land on the next dispatch. Stored behind
/// `Arc<Mutex<..>>` so the subscription table lock is not held while a
/// handler runs — handlers may subscribe or publish re-entrantly.
pub type Handler = Arc<Mutex<dyn FnMut(&MessageBus, &Event) + Send>>;

/// Named-topic publish/subscribe bus.
///
/// `publish` is callable from any thread; `dispatch`/`drain`/`deliver`
/// are meant for the single scheduling thread.
pub struct MessageBus {
    tx: Sender<Event>,
    rx: Receiver<Event>,
    table: Mutex<IndexMap<Topic, Vec<Handler>>>,
}

impl MessageBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            tx,
            rx,
            table: Mutex::new(IndexMap::new()),
        }
    }

    /// Declare that a topic exists, without subscribing anything.
    pub fn register(&self, topic: Topic) {
        let mut table = self.table.lock().unwrap();
        table.entry(topic).or_default();
    }

    /// Add a handler for a topic. Registers the topic if needed.
    pub fn subscribe<F>(&self, topic: Topic, handler: F)
    where
        F: FnMut(&MessageBus, &Event) + Send + 'static,
    {
        let mut table = self.table.lock().unwrap();
        table
            .entry(topic)
            .or_default()
            .push(Arc::new(Mutex::new(handler)));
    }

    /// Enqueue an event. Thread-safe and non-blocking; publishing to a
    /// topic with no subscribers is a silent no-op at delivery time.
    pub fn publish(&self, event: Event) {
        // Send only fails if the bus itself is gone.
        let _ = self.tx.send(event);
    }

    /// Take a bounded snapshot of the pending queue: every event
    /// enqueued up to this moment, and nothing published after.
    pub fn drain(&self) -> Vec<Event> {
        let pending = self.rx.len();
        let mut events = Vec::with_capacity(pending);
        for _ in 0..pending {
            match self.rx.try_recv() {
                Ok(ev) => events.push(ev),
                Err(_) => break,
            }
        }
        events
    }

    /// Deliver one event to its topic's subscribers.
    ///
    /// The subscription table lock is released before any handler runs,
    /// so handlers may publish or subscribe without deadlocking.
    pub fn deliver(&self, event: &Event) {
        let handlers: Vec<Handler> = {
            let table = self.table.lock().unwrap();
            match table.get(&event.topic()) {
                Some(list) => list.clone(),
                None => return,
            }
        };
        for handler in handlers {
            (handler.lock().unwrap())(self, event);
        }
    }

    /// Drain and deliver in one step. Returns the number of events
    /// delivered (subscribed or not).
    pub fn dispatch(&self) -> usize {
        let events = self.drain();
        let count = events.len();
        for event in &events {
            self.deliver(event);
        }
        count
    }

    /// Empty every subscription while keeping registered topics.
    /// Used only during a full soft reset.
    pub fn clear_all_handlers(&self) {
        let mut table = self.table.lock().unwrap();
        for handlers in table.values_mut() {
            handlers.clear();
        }
    }

    /// Number of handlers subscribed to a topic.
    pub fn handler_count(&self, topic: Topic) -> usize {
        let table = self.table.lock().unwrap();
        table.get(&topic).map_or(0, Vec::len)
    }

    /// Number of events waiting for the next dispatch.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}
