// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Fan-out of decoded device events to registered listeners.
//!
//! The backend delivers all inbound traffic through one callback. The bus
//! turns that into per-event-type listener lists so several logical callers
//! (preset queries, monitors) can wait on the same input port.
//!
//! Dispatch takes a snapshot of the listener list and releases the lock
//! before invoking anything, so listeners are free to subscribe or
//! unsubscribe from inside a callback. A listener removed mid-dispatch is
//! not invoked afterwards; the others are each invoked exactly once.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::device::{DeviceEvent, EventType};

/// Identifier handed out for every registration
pub type ListenerId = u64;

/// What a listener wants after seeing an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Stay registered
    Keep,
    /// Remove this listener once the current dispatch finishes
    Done,
}

type Listener = Arc<dyn Fn(&DeviceEvent) -> Delivery + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: ListenerId,
    listeners: HashMap<EventType, Vec<(ListenerId, Listener)>>,
}

impl Registry {
    fn contains(&self, event_type: EventType, id: ListenerId) -> bool {
        self.listeners
            .get(&event_type)
            .is_some_and(|list| list.iter().any(|(existing, _)| *existing == id))
    }

    fn remove(&mut self, event_type: EventType, id: ListenerId) -> bool {
        let Some(list) = self.listeners.get_mut(&event_type) else {
            return false;
        };
        let before = list.len();
        list.retain(|(existing, _)| *existing != id);
        let removed = list.len() != before;
        if list.is_empty() {
            self.listeners.remove(&event_type);
        }
        removed
    }
}

/// Event bus owned by one connection
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a listener for one event type.
    ///
    /// The listener stays registered until it returns [`Delivery::Done`] or
    /// the returned [`Subscription`] is dropped.
    pub fn subscribe<F>(&self, event_type: EventType, listener: F) -> Subscription
    where
        F: Fn(&DeviceEvent) -> Delivery + Send + Sync + 'static,
    {
        let mut registry = self.registry();
        registry.next_id += 1;
        let id = registry.next_id;
        registry
            .listeners
            .entry(event_type)
            .or_default()
            .push((id, Arc::new(listener)));

        Subscription {
            registry: Arc::downgrade(&self.registry),
            event_type,
            id,
            detached: false,
        }
    }

    /// Remove a listener. Returns false if it was already gone.
    pub fn unsubscribe(&self, event_type: EventType, id: ListenerId) -> bool {
        self.registry().remove(event_type, id)
    }

    /// Deliver an event to every listener of its type, in registration order.
    ///
    /// Returns the number of listeners invoked.
    pub fn dispatch(&self, event: &DeviceEvent) -> usize {
        let event_type = event.event_type();
        let snapshot: Vec<(ListenerId, Listener)> = match self.registry().listeners.get(&event_type) {
            Some(list) => list.clone(),
            None => return 0,
        };

        let mut invoked = 0;
        let mut finished = Vec::new();
        for (id, listener) in snapshot {
            if !self.registry().contains(event_type, id) {
                continue;
            }
            invoked += 1;
            if listener(event) == Delivery::Done {
                finished.push(id);
            }
        }

        if !finished.is_empty() {
            let mut registry = self.registry();
            for id in finished {
                registry.remove(event_type, id);
            }
        }

        invoked
    }

    /// Number of listeners registered for an event type
    pub fn listener_count(&self, event_type: EventType) -> usize {
        self.registry()
            .listeners
            .get(&event_type)
            .map_or(0, Vec::len)
    }

    /// Drop every listener
    pub fn clear(&self) {
        self.registry().listeners.clear();
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus").finish_non_exhaustive()
    }
}

/// Registration guard returned by [`EventBus::subscribe`].
///
/// Dropping it removes the listener, which is how a timed-out or cancelled
/// query deregisters itself.
#[must_use = "dropping a Subscription removes the listener"]
pub struct Subscription {
    registry: Weak<Mutex<Registry>>,
    event_type: EventType,
    id: ListenerId,
    detached: bool,
}

impl Subscription {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    /// Keep the listener registered for the lifetime of the bus
    pub fn detach(mut self) {
        self.detached = true;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.detached {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(self.event_type, self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn name_event(preset: u16) -> DeviceEvent {
        DeviceEvent::PresetName {
            preset,
            name: format!("Preset {}", preset),
        }
    }

    #[test]
    fn test_dispatch_in_registration_order() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let mut subs = Vec::new();
        for tag in ["first", "second", "third"] {
            let order = order.clone();
            subs.push(bus.subscribe(EventType::PresetName, move |_| {
                order.lock().unwrap().push(tag);
                Delivery::Keep
            }));
        }

        assert_eq!(bus.dispatch(&name_event(1)), 3);
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_dispatch_only_matching_type() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let _sub = bus.subscribe(EventType::PresetName, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Delivery::Keep
        });

        assert_eq!(bus.dispatch(&DeviceEvent::TempoBeat), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_done_listener_removed_after_firing() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        bus.subscribe(EventType::PresetName, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Delivery::Done
        })
        .detach();

        bus.dispatch(&name_event(1));
        bus.dispatch(&name_event(2));

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(bus.listener_count(EventType::PresetName), 0);
    }

    #[test]
    fn test_self_removal_during_dispatch_skips_nobody() {
        let bus = EventBus::new();
        let calls = Arc::new(Mutex::new(Vec::new()));

        let log = calls.clone();
        bus.subscribe(EventType::PresetName, move |_| {
            log.lock().unwrap().push("a");
            Delivery::Keep
        })
        .detach();

        // "b" removes itself synchronously through the bus while the
        // dispatch loop is still iterating.
        let log = calls.clone();
        let inner_bus = bus.clone();
        let own_id = Arc::new(Mutex::new(None::<ListenerId>));
        let own_id_inner = own_id.clone();
        let sub_b = bus.subscribe(EventType::PresetName, move |_| {
            log.lock().unwrap().push("b");
            if let Some(id) = *own_id_inner.lock().unwrap() {
                inner_bus.unsubscribe(EventType::PresetName, id);
            }
            Delivery::Keep
        });
        *own_id.lock().unwrap() = Some(sub_b.id());
        sub_b.detach();

        let log = calls.clone();
        bus.subscribe(EventType::PresetName, move |_| {
            log.lock().unwrap().push("c");
            Delivery::Keep
        })
        .detach();

        assert_eq!(bus.dispatch(&name_event(1)), 3);
        assert_eq!(*calls.lock().unwrap(), vec!["a", "b", "c"]);

        calls.lock().unwrap().clear();
        assert_eq!(bus.dispatch(&name_event(2)), 2);
        assert_eq!(*calls.lock().unwrap(), vec!["a", "c"]);
    }

    #[test]
    fn test_listener_removed_by_earlier_listener_is_not_invoked() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let victim_id = Arc::new(Mutex::new(None::<ListenerId>));
        let victim_for_first = victim_id.clone();
        let inner_bus = bus.clone();
        bus.subscribe(EventType::TempoBeat, move |_| {
            if let Some(id) = *victim_for_first.lock().unwrap() {
                inner_bus.unsubscribe(EventType::TempoBeat, id);
            }
            Delivery::Keep
        })
        .detach();

        let counter = hits.clone();
        let victim = bus.subscribe(EventType::TempoBeat, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Delivery::Keep
        });
        *victim_id.lock().unwrap() = Some(victim.id());
        victim.detach();

        assert_eq!(bus.dispatch(&DeviceEvent::TempoBeat), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_subscribe_during_dispatch_waits_for_next_event() {
        let bus = EventBus::new();
        let late_hits = Arc::new(AtomicUsize::new(0));

        let inner_bus = bus.clone();
        let counter = late_hits.clone();
        bus.subscribe(EventType::TempoBeat, move |_| {
            let counter = counter.clone();
            inner_bus
                .subscribe(EventType::TempoBeat, move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Delivery::Keep
                })
                .detach();
            Delivery::Done
        })
        .detach();

        assert_eq!(bus.dispatch(&DeviceEvent::TempoBeat), 1);
        assert_eq!(late_hits.load(Ordering::SeqCst), 0);
        assert_eq!(bus.dispatch(&DeviceEvent::TempoBeat), 1);
        assert_eq!(late_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dropping_subscription_unregisters() {
        let bus = EventBus::new();
        let sub = bus.subscribe(EventType::PresetName, |_| Delivery::Keep);
        assert_eq!(bus.listener_count(EventType::PresetName), 1);
        drop(sub);
        assert_eq!(bus.listener_count(EventType::PresetName), 0);
        assert!(!bus.unsubscribe(EventType::PresetName, 1));
    }
}
