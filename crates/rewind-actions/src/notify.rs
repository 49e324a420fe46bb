use indexmap::IndexMap;
use rewind_core::Action;
use serde_json::Value;

/// Message delivered to observers after a coordinator operation completes.
#[derive(Debug, Clone, Copy, PartialEq)]
#[non_exhaustive]
pub enum Notification<'a> {
    /// An action was applied, either fresh or as part of a redo.
    Applied { action: &'a Action, result: &'a Value },
    /// `count` actions were undone; `action` is the oldest of them.
    Undone { action: &'a Action, count: usize },
    /// `count` actions were redone; `action` is the last one re-applied.
    Redone {
        action: &'a Action,
        result: &'a Value,
        count: usize,
    },
    AppliedCleared { count: usize },
    UndoneCleared { count: usize },
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Observer = Box<dyn Fn(&Notification<'_>) + Send + Sync>;

#[derive(Default)]
pub(crate) struct Observers {
    next_id: u64,
    observers: IndexMap<SubscriptionId, Observer>,
}

impl Observers {
    pub(crate) fn subscribe(&mut self, observer: Observer) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.observers.insert(id, observer);
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.shift_remove(&id).is_some()
    }

    pub(crate) fn notify(&self, notification: &Notification<'_>) {
        for observer in self.observers.values() {
            observer(notification);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn observers_run_in_subscription_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut observers = Observers::default();
        for label in ["first", "second"] {
            let seen = Arc::clone(&seen);
            observers.subscribe(Box::new(move |_: &Notification<'_>| {
                seen.lock().expect("observer log").push(label);
            }));
        }

        observers.notify(&Notification::UndoneCleared { count: 1 });

        assert_eq!(*seen.lock().expect("observer log"), vec!["first", "second"]);
    }

    #[test]
    fn unsubscribed_observer_is_not_called() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut observers = Observers::default();
        let id = {
            let calls = Arc::clone(&calls);
            observers.subscribe(Box::new(move |_: &Notification<'_>| {
                calls.fetch_add(1, Ordering::Relaxed);
            }))
        };

        assert!(observers.unsubscribe(id));
        assert!(!observers.unsubscribe(id));
        observers.notify(&Notification::AppliedCleared { count: 2 });

        assert_eq!(calls.load(Ordering::Relaxed), 0);
        assert_eq!(observers.len(), 0);
    }
}
