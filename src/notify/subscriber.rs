//! Subscriber-based dispatch of keyspace events.

use crate::core::KeyspaceEvent;

type EventCallback = Box<dyn FnMut(&KeyspaceEvent) + Send>;

/// Identifies a registered callback; pass it to
/// [`SubscriberRegistry::unsubscribe`] to remove it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(usize);

/// Registry of callbacks receiving every drained keyspace event.
///
/// Owned by a single watcher loop, so registration and dispatch need no
/// locking.
///
/// # Examples
///
/// ```rust
/// use keyspace_watcher::core::KeyspaceEvent;
/// use keyspace_watcher::notify::SubscriberRegistry;
///
/// let mut registry = SubscriberRegistry::new();
/// let id = registry.subscribe(|event| println!("{}", event));
///
/// registry.notify_all(&KeyspaceEvent::new(
///     "__keyspace@4__:PORT|*",
///     "__keyspace@4__:PORT|Ethernet0",
///     "hset",
/// ));
/// assert!(registry.unsubscribe(id));
/// ```
#[derive(Default)]
pub struct SubscriberRegistry {
    subscribers: Vec<(SubscriberId, EventCallback)>,
    next_id: usize,
}

impl SubscriberRegistry {
    /// Create a new subscriber registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for every event.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriberId
    where
        F: FnMut(&KeyspaceEvent) + Send + 'static,
    {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Remove a callback. Returns `false` if `id` was not registered.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub_id, _)| *sub_id != id);
        self.subscribers.len() != before
    }

    /// Pass `event` to all subscribers in the order they subscribed.
    pub fn notify_all(&mut self, event: &KeyspaceEvent) {
        for (_id, callback) in &mut self.subscribers {
            callback(event);
        }
    }

    /// Number of registered callbacks.
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Whether no callback is registered.
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

impl std::fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("subscribers", &self.subscribers.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}
