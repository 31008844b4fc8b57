// SPDX-License-Identifier: Apache-2.0

//! The size-bounded LRU cache core: an intrusive doubly linked list over a slab, guarded by a
//! single lock, with deduplicated concurrent computation ("singleflight").

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::Notify;

enum EntryState<V> {
    /// A computation for this key is in flight; waiters park on the `Notify`.
    Pending(Arc<Notify>),
    /// A computed value, ready to be served.
    Ready {
        value: Arc<V>,
        expires_at: Option<Instant>,
    },
}

struct Node<K, V> {
    key: K,
    state: EntryState<V>,
    size: usize,
    prev: Option<usize>,
    next: Option<usize>,
}

struct Inner<K, V> {
    slab: Vec<Option<Node<K, V>>>,
    free: Vec<usize>,
    index: HashMap<K, usize>,
    /// Most-recently-used end of the list.
    head: Option<usize>,
    /// Least-recently-used end of the list.
    tail: Option<usize>,
    total_size: usize,
}

impl<K, V> Inner<K, V> {
    fn new() -> Self {
        Inner {
            slab: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            head: None,
            tail: None,
            total_size: 0,
        }
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = {
            let node = self.slab[idx].as_ref().expect("unlink of missing node");
            (node.prev, node.next)
        };
        match prev {
            Some(p) => self.slab[p].as_mut().expect("prev node missing").next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slab[n].as_mut().expect("next node missing").prev = prev,
            None => self.tail = prev,
        }
    }

    fn push_front(&mut self, idx: usize) {
        let old_head = self.head;
        {
            let node = self.slab[idx].as_mut().expect("push_front of missing node");
            node.prev = None;
            node.next = old_head;
        }
        if let Some(h) = old_head {
            self.slab[h].as_mut().expect("old head missing").prev = Some(idx);
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    fn promote(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }
        self.unlink(idx);
        self.push_front(idx);
    }

    fn alloc(&mut self, node: Node<K, V>) -> usize {
        if let Some(idx) = self.free.pop() {
            self.slab[idx] = Some(node);
            idx
        } else {
            self.slab.push(Some(node));
            self.slab.len() - 1
        }
    }

    fn remove(&mut self, idx: usize) {
        self.unlink(idx);
        let node = self.slab[idx].take().expect("remove of missing node");
        let _ = self.index.remove(&node.key);
        self.total_size -= node.size;
        self.free.push(idx);
    }

    /// Evicts least-recently-used, non-pending, non-expired-priority entries until the total
    /// size is within `budget`, or until only pending entries remain on the LRU side.
    fn evict_to_budget(&mut self, budget: usize) {
        let mut cursor = self.tail;
        while self.total_size > budget {
            let Some(idx) = cursor else { break };
            let prev = self.slab[idx].as_ref().expect("cursor node missing").prev;
            let is_pending = matches!(
                self.slab[idx].as_ref().expect("cursor node missing").state,
                EntryState::Pending(_)
            );
            if is_pending {
                cursor = prev;
                continue;
            }
            self.remove(idx);
            cursor = prev;
        }
    }

    fn sweep_expired(&mut self, now: Instant) {
        let mut cursor = self.tail;
        while let Some(idx) = cursor {
            let prev = self.slab[idx].as_ref().expect("cursor node missing").prev;
            let expired = matches!(
                self.slab[idx].as_ref().expect("cursor node missing").state,
                EntryState::Ready { expires_at: Some(t), .. } if t <= now
            );
            if expired {
                self.remove(idx);
            }
            cursor = prev;
        }
    }

    /// Debug/development invariant check: list pointers are consistent in both directions and
    /// the reported total size equals the sum of live entries. A violation here indicates a bug
    /// in this cache's own bookkeeping, not a caller error, so it aborts the process per this
    /// system's invariant-violation error kind.
    fn assert_invariants(&self)
    where
        K: Eq + Hash,
    {
        let mut forward = Vec::new();
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            forward.push(idx);
            cursor = self.slab[idx].as_ref().expect("forward walk: missing node").next;
        }
        let mut backward = Vec::new();
        let mut cursor = self.tail;
        while let Some(idx) = cursor {
            backward.push(idx);
            cursor = self.slab[idx].as_ref().expect("backward walk: missing node").prev;
        }
        backward.reverse();
        assert_eq!(
            forward, backward,
            "LRU cache invariant violation: forward and backward traversals disagree"
        );
        assert_eq!(
            forward.len(),
            self.index.len(),
            "LRU cache invariant violation: list length does not match index size"
        );
        let computed_size: usize = forward
            .iter()
            .map(|idx| self.slab[*idx].as_ref().expect("size walk: missing node").size)
            .sum();
        assert_eq!(
            computed_size, self.total_size,
            "LRU cache invariant violation: total_size does not match sum of entry sizes"
        );
    }
}

/// A single-process, size-bounded associative cache with deduplicated concurrent computation.
///
/// `compute` closures passed to [`Cache::get_or_compute`] run without the internal lock held, so
/// they may themselves call back into the cache (for a different key) without deadlocking.
pub struct Cache<K, V> {
    inner: Mutex<Inner<K, V>>,
    /// Soft byte budget; eviction runs after every insertion while total size exceeds this.
    budget: usize,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Creates a new cache with the given soft byte budget.
    #[must_use]
    pub fn new(budget: usize) -> Self {
        Cache {
            inner: Mutex::new(Inner::new()),
            budget,
        }
    }

    /// Returns the live entry for `key`, if present and not yet computed into the cache, else
    /// invokes `compute` exactly once among all concurrent callers for this key and returns its
    /// result to everyone waiting.
    ///
    /// If `compute` returns `Err`, the placeholder entry is removed and the error is returned
    /// only to the caller that ran `compute`; concurrent waiters retry as if the key had never
    /// been requested.
    pub async fn get_or_compute<F, Fut, E>(&self, key: K, compute: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<(V, Option<Duration>, usize), E>>,
    {
        loop {
            let notify = {
                let mut inner = self.inner.lock();
                if let Some(&idx) = inner.index.get(&key) {
                    let expired = matches!(
                        inner.slab[idx].as_ref().expect("indexed node missing").state,
                        EntryState::Ready { expires_at: Some(t), .. } if t <= Instant::now()
                    );
                    if expired {
                        inner.remove(idx);
                    } else {
                        match &inner.slab[idx].as_ref().expect("indexed node missing").state {
                            EntryState::Ready { value, .. } => {
                                let value = Arc::clone(value);
                                inner.promote(idx);
                                return Ok(value);
                            }
                            EntryState::Pending(notify) => Some(Arc::clone(notify)),
                        }
                    }
                } else {
                    None
                }
            };

            if let Some(notify) = notify {
                notify.notified().await;
                continue;
            }

            // No entry and no pending computation: claim the slot ourselves.
            let notify = Arc::new(Notify::new());
            {
                let mut inner = self.inner.lock();
                // Someone may have raced us between the unlock above and this lock; re-check.
                if inner.index.contains_key(&key) {
                    continue;
                }
                let idx = inner.alloc(Node {
                    key: key.clone(),
                    state: EntryState::Pending(Arc::clone(&notify)),
                    size: 0,
                    prev: None,
                    next: None,
                });
                let _ = inner.index.insert(key.clone(), idx);
                inner.push_front(idx);
            }

            return match compute().await {
                Ok((value, ttl, size)) => {
                    let value = Arc::new(value);
                    let mut inner = self.inner.lock();
                    if let Some(&idx) = inner.index.get(&key) {
                        inner.total_size += size;
                        {
                            let node = inner.slab[idx].as_mut().expect("computed node missing");
                            node.size = size;
                            node.state = EntryState::Ready {
                                value: Arc::clone(&value),
                                expires_at: ttl.map(|d| Instant::now() + d),
                            };
                        }
                        inner.evict_to_budget(self.budget);
                    }
                    notify.notify_waiters();
                    Ok(value)
                }
                Err(e) => {
                    let mut inner = self.inner.lock();
                    if let Some(&idx) = inner.index.get(&key) {
                        inner.remove(idx);
                    }
                    notify.notify_waiters();
                    Err(e)
                }
            };
        }
    }

    /// Inserts a value directly, without invoking a compute closure. Replaces any existing
    /// entry, including one that is currently pending (its waiters are woken with the new
    /// value instead of an error, since the key now resolves).
    pub fn put(&self, key: K, value: V, ttl: Option<Duration>, size: usize) {
        let mut inner = self.inner.lock();
        let value = Arc::new(value);
        let expires_at = ttl.map(|d| Instant::now() + d);
        if let Some(&idx) = inner.index.get(&key) {
            let waiters = {
                let node = inner.slab[idx].as_mut().expect("put: indexed node missing");
                inner.total_size -= node.size;
                node.size = size;
                let old = std::mem::replace(
                    &mut node.state,
                    EntryState::Ready {
                        value,
                        expires_at,
                    },
                );
                match old {
                    EntryState::Pending(n) => Some(n),
                    EntryState::Ready { .. } => None,
                }
            };
            inner.total_size += size;
            inner.promote(idx);
            if let Some(n) = waiters {
                n.notify_waiters();
            }
        } else {
            let idx = inner.alloc(Node {
                key: key.clone(),
                state: EntryState::Ready { value, expires_at },
                size,
                prev: None,
                next: None,
            });
            let _ = inner.index.insert(key, idx);
            inner.push_front(idx);
            inner.total_size += size;
        }
        inner.evict_to_budget(self.budget);
    }

    /// Removes `key` unconditionally, without invoking `compute`. A pending computation's
    /// waiters are notified with no value; they will observe the key absent on retry.
    pub fn del(&self, key: &K) {
        let mut inner = self.inner.lock();
        if let Some(&idx) = inner.index.get(key) {
            let notify = match &inner.slab[idx].as_ref().expect("del: indexed node missing").state
            {
                EntryState::Pending(n) => Some(Arc::clone(n)),
                EntryState::Ready { .. } => None,
            };
            inner.remove(idx);
            if let Some(n) = notify {
                n.notify_waiters();
            }
        }
    }

    /// Full-lock iteration over every ready (non-pending) entry, most-recently-used first.
    /// Sweeps expired entries first and asserts structural invariants before and after.
    pub fn keys_for_each(&self, mut visitor: impl FnMut(&K, &V)) {
        let mut inner = self.inner.lock();
        inner.assert_invariants();
        inner.sweep_expired(Instant::now());
        inner.assert_invariants();
        let mut cursor = inner.head;
        while let Some(idx) = cursor {
            let node = inner.slab[idx].as_ref().expect("keys_for_each: missing node");
            if let EntryState::Ready { value, .. } = &node.state {
                visitor(&node.key, value);
            }
            cursor = node.next;
        }
    }

    /// Total reported size across all entries (for tests asserting the eviction bound).
    #[must_use]
    pub fn total_size(&self) -> usize {
        self.inner.lock().total_size
    }

    /// Number of live entries, including any pending computation.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().index.len()
    }

    /// Returns `true` if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn eviction_drops_lru_entry_under_budget() {
        let cache: Cache<&'static str, &'static str> = Cache::new(100);
        cache.put("A", "a", None, 50);
        cache.put("B", "b", None, 50);
        cache.put("C", "c", None, 50);

        assert_eq!(cache.len(), 2);
        assert!(cache.total_size() <= 100);

        let calls = AtomicUsize::new(0);
        let value = cache
            .get_or_compute("A", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, std::convert::Infallible>(("recomputed-a", None, 50)) }
            })
            .await
            .unwrap();
        assert_eq!(*value, "recomputed-a");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_get_or_compute_deduplicates() {
        let cache: Arc<Cache<&'static str, u64>> = Arc::new(Cache::new(1_000));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_compute("k", || async {
                        let n = calls.fetch_add(1, Ordering::SeqCst);
                        assert_eq!(n, 0, "compute invoked more than once");
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        Ok::<_, std::convert::Infallible>((42u64, None, 8))
                    })
                    .await
                    .unwrap()
            }));
        }

        for h in handles {
            let v = h.await.unwrap();
            assert_eq!(*v, 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn compute_error_removes_placeholder_and_allows_retry() {
        let cache: Cache<&'static str, u64> = Cache::new(1_000);
        let first = cache
            .get_or_compute("k", || async { Err::<(u64, Option<Duration>, usize), &str>("boom") })
            .await;
        assert_eq!(first, Err("boom"));
        assert_eq!(cache.len(), 0);

        let second = cache
            .get_or_compute("k", || async {
                Ok::<_, &str>((7u64, None, 8))
            })
            .await
            .unwrap();
        assert_eq!(*second, 7);
    }

    #[test]
    fn keys_for_each_sweeps_expired_and_checks_invariants() {
        let cache: Cache<&'static str, u64> = Cache::new(1_000);
        cache.put("stale", 1, Some(Duration::from_millis(0)), 8);
        std::thread::sleep(Duration::from_millis(5));
        cache.put("fresh", 2, None, 8);

        let mut seen = Vec::new();
        cache.keys_for_each(|k, v| seen.push((*k, *v)));
        assert_eq!(seen, vec![("fresh", 2)]);
    }

    #[test]
    fn eviction_bound_never_exceeds_budget_plus_largest_entry() {
        let budget = 100;
        let cache: Cache<u32, u32> = Cache::new(budget);
        for i in 0..50u32 {
            cache.put(i, i, None, 10);
            assert!(cache.total_size() <= budget + 10);
        }
    }
}
