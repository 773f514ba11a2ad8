//! In-page pub/sub between the map layer and the panels.

use std::cell::RefCell;
use std::rc::Rc;

use crate::station::Station;

#[derive(Clone, Debug, PartialEq)]
pub enum AppEvent {
    /// A station card or marker was clicked.
    StationSelected(Station),
    /// Empty map area was clicked.
    MapClicked,
}

type Listener = Rc<dyn Fn(&AppEvent)>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Subscription(u64);

#[derive(Default)]
struct Listeners {
    next: u64,
    entries: Vec<(u64, Listener)>,
}

/// Cheap to clone; every clone talks to the same listener list.
#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Rc<RefCell<Listeners>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: impl Fn(&AppEvent) + 'static) -> Subscription {
        let mut listeners = self.listeners.borrow_mut();
        listeners.next += 1;
        let id = listeners.next;
        listeners.entries.push((id, Rc::new(listener)));
        Subscription(id)
    }

    pub fn unsubscribe(&self, subscription: Subscription) {
        self.listeners
            .borrow_mut()
            .entries
            .retain(|(id, _)| *id != subscription.0);
    }

    /// Listeners may emit or subscribe again while being notified.
    pub fn emit(&self, event: AppEvent) {
        let snapshot: Vec<Listener> = self
            .listeners
            .borrow()
            .entries
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in snapshot {
            listener(&event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn every_listener_sees_the_event() {
        let bus = EventBus::new();
        let hits = Rc::new(Cell::new(0));
        for _ in 0..3 {
            let hits = hits.clone();
            bus.subscribe(move |event| {
                if *event == AppEvent::MapClicked {
                    hits.set(hits.get() + 1);
                }
            });
        }
        bus.emit(AppEvent::MapClicked);
        assert_eq!(hits.get(), 3);
    }

    #[test]
    fn unsubscribed_listener_is_silent() {
        let bus = EventBus::new();
        let hits = Rc::new(Cell::new(0));
        let subscription = {
            let hits = hits.clone();
            bus.subscribe(move |_| hits.set(hits.get() + 1))
        };
        bus.unsubscribe(subscription);
        bus.emit(AppEvent::MapClicked);
        assert_eq!(hits.get(), 0);
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn listener_can_emit_while_notified() {
        let bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        {
            let bus_inner = bus.clone();
            let seen = seen.clone();
            bus.subscribe(move |event| {
                seen.borrow_mut().push(event.clone());
                if matches!(event, AppEvent::StationSelected(_)) {
                    bus_inner.emit(AppEvent::MapClicked);
                }
            });
        }
        let station = crate::station::Station::from_record(&serde_json::json!({"lat": 36.0, "lng": 127.0})).unwrap();
        bus.emit(AppEvent::StationSelected(station));
        assert_eq!(seen.borrow().len(), 2);
        assert_eq!(seen.borrow()[1], AppEvent::MapClicked);
    }
}
