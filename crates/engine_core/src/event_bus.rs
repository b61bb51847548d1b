//! In-process publish/subscribe channel keyed by an event-kind enum.
//!
//! Dispatch is synchronous and runs handlers in registration order. Every
//! published event is also queued so that consumers which poll once per frame
//! can `drain` what happened since their last look.

use std::collections::VecDeque;
use std::hash::Hash;

/// An event that can travel on an [`EventBus`].
pub trait BusEvent: Clone {
    /// Field-less discriminant used as the subscription key.
    type Kind: Copy + Eq + Hash + std::fmt::Debug;

    fn kind(&self) -> Self::Kind;
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler<E> = Box<dyn FnMut(&E)>;

struct Subscription<E: BusEvent> {
    id: SubscriptionId,
    /// `None` listens to every kind.
    kind: Option<E::Kind>,
    handler: Handler<E>,
}

/// Default bound on undrained events.
pub const DEFAULT_PENDING_CAPACITY: usize = 1024;

pub struct EventBus<E: BusEvent> {
    subscriptions: Vec<Subscription<E>>,
    next_id: u64,
    pending: VecDeque<E>,
    capacity: usize,
    dropped: u64,
}

impl<E: BusEvent> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: BusEvent> EventBus<E> {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_PENDING_CAPACITY)
    }

    /// Bus whose pending queue keeps at most `capacity` events; the oldest
    /// are dropped first.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            subscriptions: Vec::new(),
            next_id: 0,
            pending: VecDeque::new(),
            capacity: capacity.max(1),
            dropped: 0,
        }
    }

    /// Listen to one kind of event.
    pub fn subscribe(&mut self, kind: E::Kind, handler: impl FnMut(&E) + 'static) -> SubscriptionId {
        self.add(Some(kind), Box::new(handler))
    }

    /// Listen to every event.
    pub fn subscribe_all(&mut self, handler: impl FnMut(&E) + 'static) -> SubscriptionId {
        self.add(None, Box::new(handler))
    }

    fn add(&mut self, kind: Option<E::Kind>, handler: Handler<E>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscriptions.push(Subscription { id, kind, handler });
        id
    }

    /// Returns false if the id was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        self.subscriptions.len() != before
    }

    pub fn publish(&mut self, event: E) {
        let kind = event.kind();
        for sub in &mut self.subscriptions {
            if sub.kind.is_none_or(|k| k == kind) {
                (sub.handler)(&event);
            }
        }
        if self.pending.len() >= self.capacity {
            self.pending.pop_front();
            self.dropped += 1;
            if self.dropped == 1 || self.dropped % 100 == 0 {
                log::warn!("Event queue full, dropped {} undrained events", self.dropped);
            }
        }
        self.pending.push_back(event);
    }

    /// Take every event published since the last drain, oldest first.
    pub fn drain(&mut self) -> Vec<E> {
        self.pending.drain(..).collect()
    }

    /// Take the oldest undrained event.
    pub fn pop(&mut self) -> Option<E> {
        self.pending.pop_front()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    enum Ping {
        A(u32),
        B,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum PingKind {
        A,
        B,
    }

    impl BusEvent for Ping {
        type Kind = PingKind;

        fn kind(&self) -> PingKind {
            match self {
                Ping::A(_) => PingKind::A,
                Ping::B => PingKind::B,
            }
        }
    }

    #[test]
    fn handlers_only_see_their_kind() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        let sink = seen.clone();
        bus.subscribe(PingKind::A, move |e: &Ping| sink.borrow_mut().push(e.clone()));

        bus.publish(Ping::B);
        bus.publish(Ping::A(7));

        assert_eq!(*seen.borrow(), vec![Ping::A(7)]);
    }

    #[test]
    fn dispatch_runs_in_registration_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        for n in 0..3 {
            let order = order.clone();
            bus.subscribe_all(move |_: &Ping| order.borrow_mut().push(n));
        }
        bus.publish(Ping::B);
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let count = Rc::new(RefCell::new(0));
        let mut bus = EventBus::new();
        let c = count.clone();
        let id = bus.subscribe_all(move |_: &Ping| *c.borrow_mut() += 1);
        bus.publish(Ping::B);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(Ping::B);
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn drain_returns_events_in_order_and_empties_queue() {
        let mut bus = EventBus::new();
        bus.publish(Ping::A(1));
        bus.publish(Ping::A(2));
        assert_eq!(bus.drain(), vec![Ping::A(1), Ping::A(2)]);
        assert_eq!(bus.pending_len(), 0);
    }

    #[test]
    fn full_queue_drops_oldest() {
        let mut bus = EventBus::with_capacity(2);
        bus.publish(Ping::A(1));
        bus.publish(Ping::A(2));
        bus.publish(Ping::A(3));
        assert_eq!(bus.drain(), vec![Ping::A(2), Ping::A(3)]);
    }
}
