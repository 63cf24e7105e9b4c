use std::collections::HashMap;

use alloy::primitives::Address;
use tokio::sync::Mutex;

/// Contract handles keyed by address, built on first use.
/// Lives for a single aggregation run and is never evicted.
pub struct ContractCache<C> {
    handles: Mutex<HashMap<Address, C>>,
}

impl<C: Clone> Default for ContractCache<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clone> ContractCache<C> {
    pub fn new() -> Self {
        Self {
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the handle for `address`, calling `construct` only if none is stored yet.
    /// Insertion happens under the lock so racing callers construct once.
    pub async fn get<F>(&self, address: Address, construct: F) -> C
    where
        F: FnOnce() -> C,
    {
        let mut handles = self.handles.lock().await;
        handles.entry(address).or_insert_with(construct).clone()
    }

    pub async fn len(&self) -> usize {
        self.handles.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::future::join_all;

    use super::*;

    #[tokio::test]
    async fn test_constructs_once_per_address() {
        let cache = ContractCache::new();
        let built = AtomicUsize::new(0);
        let a = Address::repeat_byte(0xaa);
        let b = Address::repeat_byte(0xbb);

        let build = |addr: Address| {
            built.fetch_add(1, Ordering::SeqCst);
            addr
        };

        assert_eq!(cache.get(a, || build(a)).await, a);
        assert_eq!(cache.get(a, || build(a)).await, a);
        assert_eq!(cache.get(b, || build(b)).await, b);

        assert_eq!(built.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn test_concurrent_first_insertion() {
        let cache = ContractCache::new();
        let built = AtomicUsize::new(0);
        let a = Address::repeat_byte(0x01);

        let handles = join_all((0..16).map(|_| {
            cache.get(a, || {
                built.fetch_add(1, Ordering::SeqCst);
                "handle"
            })
        }))
        .await;

        assert!(handles.iter().all(|h| *h == "handle"));
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }
}
