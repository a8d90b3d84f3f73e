//! Typed observer lists for fire-and-forget notifications.

use std::collections::VecDeque;
use std::fmt;

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler<E> = Box<dyn FnMut(&E)>;

/// Delivers each emitted event to every subscriber, in subscription order.
///
/// Also keeps the last `history_limit` events so a late observer (or a test)
/// can inspect what happened without subscribing up front.
pub struct EventBus<E> {
    subscribers: Vec<(SubscriptionId, Handler<E>)>,
    next_id: u64,
    history: VecDeque<E>,
    history_limit: usize,
}

impl<E> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .field("history", &self.history.len())
            .finish()
    }
}

impl<E: Clone> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Clone> EventBus<E> {
    pub fn new() -> Self {
        Self::with_history(64)
    }

    pub fn with_history(history_limit: usize) -> Self {
        Self {
            subscribers: Vec::new(),
            next_id: 0,
            history: VecDeque::with_capacity(history_limit),
            history_limit,
        }
    }

    pub fn subscribe(&mut self, handler: impl FnMut(&E) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(handler)));
        id
    }

    /// Returns false if the id was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    pub fn emit(&mut self, event: E) {
        for (_, handler) in self.subscribers.iter_mut() {
            handler(&event);
        }
        if self.history_limit == 0 {
            return;
        }
        if self.history.len() == self.history_limit {
            self.history.pop_front();
        }
        self.history.push_back(event);
    }

    /// Most recent events, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &E> {
        self.history.iter()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
