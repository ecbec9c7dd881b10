use cbl_store::Namespace;
use parking_lot::{Mutex, RwLock};

/// Callback invoked with the namespace that changed.
pub type ChangeListener = Box<dyn Fn(&Namespace) + Send + Sync>;

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Fan-out for "this namespace changed" signals.
///
/// Fired after every mutating operation. Strictly a re-render hint for the
/// layer above: delivery says nothing about what changed, and correctness
/// never depends on anyone listening.
#[derive(Default)]
pub struct ChangeHub {
    listeners: RwLock<Vec<(SubscriptionId, ChangeListener)>>,
    next_seq: Mutex<u64>,
}

impl ChangeHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: ChangeListener) -> SubscriptionId {
        let mut seq = self.next_seq.lock();
        let id = SubscriptionId(*seq);
        *seq += 1;
        drop(seq);

        self.listeners.write().push((id, listener));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.listeners.write().retain(|(sid, _)| *sid != id);
    }

    pub fn notify(&self, namespace: &Namespace) {
        for (_, listener) in self.listeners.read().iter() {
            listener(namespace);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }
}
