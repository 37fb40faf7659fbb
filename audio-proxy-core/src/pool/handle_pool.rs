use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use crate::models::error::BackendError;
use crate::models::migration::MigrationMapping;
use crate::traits::handle_backend::{Handle, HandleBackend};

/// Arena of backend handles with a per-handle record of type `T`.
///
/// Handles are generated in batches and recycled through a FIFO free list:
/// a reclaimed handle goes to the back of `available`, behind anything a
/// previous batch left there.
///
/// Every handle the pool has generated is in exactly one of `used`,
/// `available` or deleted; `objects` holds a record only for used handles.
///
/// The pool also keeps the forwarding lineage of every migration it
/// inherited: `lineage[e]` maps the handles of epoch `e` to those of epoch
/// `e + 1`, which lets proxies created before a migration find their
/// current handle.
pub struct HandlePool<T, B: ?Sized + HandleBackend> {
    backend: Arc<B>,
    batch_size: u32,
    objects: HashMap<Handle, T>,
    /// Live handles in acquisition order; `live` mirrors it for lookups.
    used: Vec<Handle>,
    live: HashSet<Handle>,
    available: VecDeque<Handle>,
    lineage: Vec<MigrationMapping>,
}

impl<T: Default, B: ?Sized + HandleBackend> HandlePool<T, B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            batch_size: 1,
            objects: HashMap::new(),
            used: Vec::new(),
            live: HashSet::new(),
            available: VecDeque::new(),
            lineage: Vec::new(),
        }
    }

    /// Set the generation increment and make sure at least that many handles
    /// are available. Calling it again with a larger size grows the pool.
    pub fn initialize(&mut self, batch_size: u32) -> Result<(), BackendError> {
        debug_assert!(batch_size > 0, "batch size must be positive");
        self.batch_size = batch_size.max(1);
        if self.available.len() < self.batch_size as usize {
            self.generate(self.batch_size)?;
        }
        Ok(())
    }

    /// Take the next available handle and create its record.
    pub fn spawn(&mut self) -> Result<Handle, BackendError> {
        if self.available.is_empty() {
            self.generate(self.batch_size)?;
        }
        let handle = self
            .available
            .pop_front()
            .ok_or_else(|| BackendError::exhausted("generate"))?;
        self.used.push(handle);
        self.live.insert(handle);
        self.objects.insert(handle, T::default());
        Ok(handle)
    }

    /// Take `size` fresh handles at once, in the order they will be returned,
    /// generating whatever the free list cannot cover.
    pub(crate) fn prepare_batch(&mut self, size: usize) -> Result<Vec<Handle>, BackendError> {
        let missing = size.saturating_sub(self.available.len());
        if missing > 0 {
            let count = (missing as u32).max(self.batch_size);
            self.generate(count)?;
        }
        if self.available.len() < size {
            return Err(BackendError::exhausted("generate"));
        }
        let handles: Vec<Handle> = self.available.drain(..size).collect();
        for &handle in &handles {
            self.used.push(handle);
            self.live.insert(handle);
            self.objects.insert(handle, T::default());
        }
        Ok(handles)
    }

    fn generate(&mut self, count: u32) -> Result<(), BackendError> {
        let handles = self.backend.generate(count)?;
        if handles.is_empty() && count > 0 {
            return Err(BackendError::exhausted("generate"));
        }
        log::trace!("generated {} handles: {:?}", handles.len(), handles);
        self.available.extend(handles);
        Ok(())
    }
}

impl<T, B: ?Sized + HandleBackend> HandlePool<T, B> {
    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.objects.get(&handle)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.objects.get_mut(&handle)
    }

    pub fn is_valid(&self, handle: Handle) -> bool {
        self.live.contains(&handle)
    }

    /// Return a used handle to the back of the free list, dropping its record.
    pub(crate) fn reclaim(&mut self, handle: Handle) -> Option<T> {
        if !self.live.remove(&handle) {
            debug_assert!(false, "reclaiming handle {handle} that is not in use");
            return None;
        }
        self.backend.reclaim(handle);
        self.used.retain(|&h| h != handle);
        self.available.push_back(handle);
        self.objects.remove(&handle)
    }

    /// Follow the forwarding lineage from `epoch` to the current epoch.
    ///
    /// Returns `None` when the handle was not live at some migration along
    /// the way.
    pub fn resolve(&self, handle: Handle, epoch: usize) -> Option<Handle> {
        if epoch > self.lineage.len() {
            return None;
        }
        self.lineage[epoch..]
            .iter()
            .try_fold(handle, |current, mapping| mapping.get(&current).copied())
    }

    /// Continue `predecessor`'s lineage with the mapping of the migration
    /// that produced this pool.
    pub(crate) fn adopt_lineage(&mut self, predecessor: &[MigrationMapping], mapping: MigrationMapping) {
        self.lineage = predecessor.to_vec();
        self.lineage.push(mapping);
    }

    pub fn lineage(&self) -> &[MigrationMapping] {
        &self.lineage
    }

    /// Live handles in acquisition order.
    pub fn used(&self) -> &[Handle] {
        &self.used
    }

    pub fn available_len(&self) -> usize {
        self.available.len()
    }

    pub fn batch_size(&self) -> u32 {
        self.batch_size
    }

    /// Number of migrations this pool's lineage has gone through.
    pub fn epoch(&self) -> usize {
        self.lineage.len()
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }
}

impl<T, B: ?Sized + HandleBackend> Drop for HandlePool<T, B> {
    fn drop(&mut self) {
        let handles: Vec<Handle> = self.used.iter().chain(self.available.iter()).copied().collect();
        if !handles.is_empty() {
            log::trace!("deleting {} handles", handles.len());
            self.backend.delete(&handles);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeBackend;

    fn pool(batch: u32) -> (Arc<FakeBackend>, HandlePool<u8, FakeBackend>) {
        let backend = Arc::new(FakeBackend::new());
        let mut pool = HandlePool::new(backend.clone());
        pool.initialize(batch).unwrap();
        (backend, pool)
    }

    #[test]
    fn spawned_handles_are_distinct_and_valid() {
        let (_, mut pool) = pool(4);
        let handles: Vec<Handle> = (0..10).map(|_| pool.spawn().unwrap()).collect();
        let mut sorted = handles.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 10);
        assert!(handles.iter().all(|&h| pool.is_valid(h)));
    }

    #[test]
    fn batch_of_one_reuses_the_same_handle() {
        let (backend, mut pool) = pool(1);
        for _ in 0..5 {
            let handle = pool.spawn().unwrap();
            assert_eq!(handle, 0);
            pool.reclaim(handle);
        }
        assert_eq!(backend.generated_count(), 1);
    }

    #[test]
    fn reclaimed_handles_queue_behind_batch_tail() {
        let (_, mut pool) = pool(2);
        assert_eq!(pool.spawn().unwrap(), 0);
        assert_eq!(pool.spawn().unwrap(), 1);
        assert_eq!(pool.spawn().unwrap(), 2);
        pool.reclaim(0);
        pool.reclaim(2);
        pool.reclaim(1);
        let next: Vec<Handle> = (0..4).map(|_| pool.spawn().unwrap()).collect();
        assert_eq!(next, vec![3, 0, 2, 1]);
    }

    #[test]
    fn reclaim_invalidates_and_calls_backend() {
        let (backend, mut pool) = pool(2);
        let handle = pool.spawn().unwrap();
        assert!(pool.get(handle).is_some());
        pool.reclaim(handle);
        assert!(!pool.is_valid(handle));
        assert!(pool.get(handle).is_none());
        assert_eq!(backend.reclaimed(), vec![handle]);
    }

    #[test]
    fn initialize_grows_only_when_short() {
        let (backend, mut pool) = pool(2);
        pool.initialize(2).unwrap();
        assert_eq!(backend.generated_count(), 2);
        pool.initialize(8).unwrap();
        assert_eq!(pool.available_len(), 10);
        assert_eq!(pool.batch_size(), 8);
    }

    #[test]
    fn generator_failure_propagates() {
        let backend = Arc::new(FakeBackend::new());
        backend.fail_generate(true);
        let mut pool: HandlePool<u8, FakeBackend> = HandlePool::new(backend);
        assert!(pool.spawn().is_err());
        assert!(pool.used().is_empty());
    }

    #[test]
    fn prepare_batch_keeps_request_order() {
        let (_, mut pool) = pool(2);
        let handles = pool.prepare_batch(5).unwrap();
        assert_eq!(handles, vec![0, 1, 2, 3, 4]);
        assert_eq!(pool.used(), &[0, 1, 2, 3, 4]);
        assert!(handles.iter().all(|h| pool.get(*h).is_some()));
    }

    #[test]
    fn reclaim_keeps_acquisition_order_of_the_rest() {
        let (_, mut pool) = pool(4);
        let handles: Vec<Handle> = (0..4).map(|_| pool.spawn().unwrap()).collect();
        pool.reclaim(handles[1]);

        assert_eq!(pool.used(), &[0, 2, 3]);
        assert!(!pool.is_valid(1));
        assert!(pool.is_valid(2));
        assert_eq!(pool.spawn().unwrap(), 1);
        assert_eq!(pool.used(), &[0, 2, 3, 1]);
    }

    #[test]
    fn drop_deletes_used_and_available() {
        let (backend, mut pool) = pool(3);
        pool.spawn().unwrap();
        drop(pool);
        let mut deleted = backend.deleted();
        deleted.sort_unstable();
        assert_eq!(deleted, vec![0, 1, 2]);
    }

    #[test]
    fn resolve_follows_lineage() {
        let (_, mut pool) = pool(1);
        assert_eq!(pool.resolve(7, 0), Some(7));

        let first = MigrationMapping::from([(0, 10), (1, 11)]);
        let second = MigrationMapping::from([(10, 20)]);
        pool.adopt_lineage(&[first], second);

        assert_eq!(pool.epoch(), 2);
        assert_eq!(pool.resolve(0, 0), Some(20));
        assert_eq!(pool.resolve(1, 0), None);
        assert_eq!(pool.resolve(10, 1), Some(20));
        assert_eq!(pool.resolve(20, 2), Some(20));
        assert_eq!(pool.resolve(20, 3), None);
    }
}
