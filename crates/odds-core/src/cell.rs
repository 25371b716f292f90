//! Observable state cells.
//!
//! A [`StateCell`] holds the current value and wakes subscribers when it
//! changes. Setting an equal value is a no-op, so effects only rerun on real
//! changes. Clones share the same value.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

pub struct StateCell<T> {
    tx: Arc<watch::Sender<T>>,
}

impl<T> Clone for StateCell<T> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for StateCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StateCell").field(&*self.tx.borrow()).finish()
    }
}

impl<T: Default> Default for StateCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> StateCell<T> {
    pub fn new(value: T) -> Self {
        let (tx, _rx) = watch::channel(value);
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }

    /// Runs `f` against the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.tx.borrow())
    }

    /// Mutates in place; subscribers are woken only when `f` returns true.
    pub fn update(&self, f: impl FnOnce(&mut T) -> bool) -> bool {
        self.tx.send_if_modified(f)
    }
}

impl<T: Clone> StateCell<T> {
    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }
}

impl<T: PartialEq> StateCell<T> {
    /// Publishes `value`. Returns whether it differed from the current one.
    pub fn set(&self, value: T) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_reports_real_changes_only() {
        let cell = StateCell::new(1);
        assert!(!cell.set(1));
        assert!(cell.set(2));
        assert_eq!(cell.get(), 2);
    }

    #[test]
    fn clones_share_value() {
        let cell = StateCell::new(String::from("a"));
        let other = cell.clone();
        other.set("b".to_string());
        assert_eq!(cell.get(), "b");
        assert_eq!(cell.with(|v| v.len()), 1);
    }

    #[tokio::test]
    async fn equal_value_does_not_wake_subscribers() {
        let cell = StateCell::new(Some(3));
        let mut rx = cell.subscribe();
        cell.set(Some(3));
        assert!(!rx.has_changed().unwrap());
        cell.set(None);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), None);
    }

    #[test]
    fn update_controls_notification() {
        let cell = StateCell::new(vec![1]);
        let mut rx = cell.subscribe();
        assert!(!cell.update(|_| false));
        assert!(!rx.has_changed().unwrap());
        assert!(cell.update(|v| {
            v.push(2);
            true
        }));
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), vec![1, 2]);
    }
}
