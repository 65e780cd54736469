//! Key namespacing for one logical queue.

/// Prefix shared by every key this crate writes.
pub const KEY_PREFIX: &str = "ackq";

/// Store keys for the structures of one queue.
///
/// Distinct queue names never produce overlapping keys, so several queues can
/// share one backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueueKeys {
    name: String,
    /// Ready queue (ordered list of uids).
    pub queue: String,
    /// Item store (uid -> encoded payload).
    pub items: String,
    /// Checkout ledger (scored set of uid -> checkout time).
    pub checkouts: String,
}

impl QueueKeys {
    /// Derive the keys for a queue name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let prefix = format!("{}:{}", KEY_PREFIX, name);
        Self {
            queue: format!("{}:queue", prefix),
            items: format!("{}:items", prefix),
            checkouts: format!("{}:checkouts", prefix),
            name,
        }
    }

    /// Queue name the keys were derived from.
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_share_prefix() {
        let keys = QueueKeys::new("orders");
        assert_eq!(keys.queue, "ackq:orders:queue");
        assert_eq!(keys.items, "ackq:orders:items");
        assert_eq!(keys.checkouts, "ackq:orders:checkouts");
        assert_eq!(keys.name(), "orders");
    }

    #[test]
    fn test_distinct_names_do_not_collide() {
        let a = QueueKeys::new("a");
        let b = QueueKeys::new("b");
        assert_ne!(a.queue, b.queue);
        assert_ne!(a.items, b.items);
        assert_ne!(a.checkouts, b.checkouts);
    }
}
