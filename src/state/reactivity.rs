// ============================================================================
// REACTIVITY - Value + subscriber list for re-rendering views
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::Rc;

type Callback = Rc<dyn Fn()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Reactive state with change notifications
pub struct ReactiveState<T> {
    value: RefCell<T>,
    subscribers: RefCell<Vec<(SubscriptionId, Callback)>>,
    next_id: Cell<u64>,
}

impl<T> ReactiveState<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: RefCell::new(value),
            subscribers: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.value.borrow().clone()
    }

    /// Read without cloning
    pub fn with<R>(&self, reader: impl FnOnce(&T) -> R) -> R {
        reader(&self.value.borrow())
    }

    /// Replace the value and notify subscribers
    pub fn set(&self, new_value: T) {
        *self.value.borrow_mut() = new_value;
        self.notify();
    }

    /// Mutate in place and notify subscribers
    pub fn update<F>(&self, updater: F)
    where
        F: FnOnce(&mut T),
    {
        updater(&mut self.value.borrow_mut());
        self.notify();
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn() + 'static,
    {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.subscribers.borrow_mut().push((id, Rc::new(callback)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers.borrow_mut().retain(|(existing, _)| *existing != id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    // Callbacks run on a snapshot so they may read the value or (un)subscribe
    fn notify(&self) {
        let callbacks: Vec<Callback> = self
            .subscribers
            .borrow()
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();
        for callback in callbacks {
            callback();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_update_notify_subscribers() {
        let state = Rc::new(ReactiveState::new(1));
        let hits = Rc::new(Cell::new(0));

        let counter = hits.clone();
        state.subscribe(move || counter.set(counter.get() + 1));

        state.set(5);
        state.update(|value| *value += 1);

        assert_eq!(state.get(), 6);
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn callbacks_can_read_state_and_unsubscribe() {
        let state = Rc::new(ReactiveState::new(String::from("a")));
        let seen = Rc::new(RefCell::new(Vec::new()));

        let reader = state.clone();
        let log = seen.clone();
        let id = state.subscribe(move || log.borrow_mut().push(reader.get()));

        state.set("b".to_string());
        state.unsubscribe(id);
        state.set("c".to_string());

        assert_eq!(*seen.borrow(), vec!["b".to_string()]);
        assert_eq!(state.subscriber_count(), 0);
    }
}
