//! State shared between the main thread and the skylight worker.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::affector::AffectorGrids;
use crate::chunk::ChunkBuffers;
use crate::coords::GridDims;
use crate::queue_set::QueueSet;
use crate::value::{AtomicLightingValue, LightingValue};

/// Locks a queue, recovering it if the other thread panicked while holding it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Grids, chunk buffers, and work queues reachable from both threads.
///
/// `outdated_skylight` and `outdated_gpu` each sit behind their own mutex and
/// are held only for a push or pop. Voxel and affector cells are relaxed
/// atomics (see [`ChunkBuffers`]).
pub struct LightingShared {
    pub dims: GridDims,
    pub affectors: AffectorGrids,
    pub chunks: Vec<ChunkBuffers>,
    outdated_skylight: Mutex<QueueSet<usize>>,
    outdated_gpu: Mutex<QueueSet<usize>>,
    pending_skylight: AtomicUsize,
    /// Set by the main thread when world changes require a full skylight cycle.
    skylight_dirty: AtomicBool,
    skylight_idle: AtomicBool,
    direction: Mutex<[f32; 3]>,
    direction_generation: AtomicU64,
    ambient: AtomicLightingValue,
    running: AtomicBool,
}

impl LightingShared {
    pub fn new(dims: GridDims, ambient: LightingValue, direction: [f32; 3]) -> Self {
        Self {
            affectors: AffectorGrids::new(&dims),
            chunks: (0..dims.chunk_count()).map(|_| ChunkBuffers::new()).collect(),
            dims,
            outdated_skylight: Mutex::new(QueueSet::new()),
            outdated_gpu: Mutex::new(QueueSet::new()),
            pending_skylight: AtomicUsize::new(0),
            skylight_dirty: AtomicBool::new(true),
            skylight_idle: AtomicBool::new(false),
            direction: Mutex::new(direction),
            direction_generation: AtomicU64::new(0),
            ambient: AtomicLightingValue::new(ambient),
            running: AtomicBool::new(true),
        }
    }

    // --- skylight queue (the pending counter only changes under its lock) ---

    /// Queues a chunk for skylight recompute. Returns `true` if it was not queued yet.
    ///
    /// A new chunk clears the idle flag before the lock is released, so the
    /// chunk cannot be popped while the propagator still reads as idle.
    pub fn push_skylight(&self, chunk: usize) -> bool {
        let mut queue = lock(&self.outdated_skylight);
        let added = queue.push(chunk);
        if added {
            self.skylight_idle.store(false, Ordering::Release);
            self.pending_skylight.fetch_add(1, Ordering::AcqRel);
        }
        added
    }

    /// Queues every chunk in `chunks`, clearing the idle flag if any was new.
    pub fn push_skylight_many(&self, chunks: impl IntoIterator<Item = usize>) {
        let mut queue = lock(&self.outdated_skylight);
        let added = chunks.into_iter().filter(|&c| queue.push(c)).count();
        if added > 0 {
            self.skylight_idle.store(false, Ordering::Release);
            self.pending_skylight.fetch_add(added, Ordering::AcqRel);
        }
    }

    pub fn pop_skylight(&self) -> Option<usize> {
        let mut queue = lock(&self.outdated_skylight);
        let chunk = queue.pop()?;
        self.pending_skylight.fetch_sub(1, Ordering::AcqRel);
        Some(chunk)
    }

    /// Chunks queued for skylight recompute and not yet processed.
    pub fn pending_skylight(&self) -> usize {
        self.pending_skylight.load(Ordering::Acquire)
    }

    /// Asks the propagator for at least one more full cycle.
    pub fn request_skylight_pass(&self) {
        self.skylight_dirty.store(true, Ordering::Release);
        self.skylight_idle.store(false, Ordering::Release);
    }

    pub fn take_skylight_request(&self) -> bool {
        self.skylight_dirty.swap(false, Ordering::AcqRel)
    }

    pub fn set_skylight_idle(&self, idle: bool) {
        self.skylight_idle.store(idle, Ordering::Release);
    }

    /// `true` once the propagator has finished a full cycle without changes
    /// and no work has arrived since.
    pub fn is_skylight_idle(&self) -> bool {
        self.skylight_idle.load(Ordering::Acquire)
            && !self.skylight_dirty.load(Ordering::Acquire)
            && self.pending_skylight() == 0
    }

    // --- GPU queue ---

    pub fn push_gpu(&self, chunk: usize) -> bool {
        lock(&self.outdated_gpu).push(chunk)
    }

    pub fn push_gpu_many(&self, chunks: impl IntoIterator<Item = usize>) {
        let mut queue = lock(&self.outdated_gpu);
        for chunk in chunks {
            queue.push(chunk);
        }
    }

    /// Pops up to `max` GPU-dirty chunks in FIFO order.
    pub fn drain_gpu(&self, max: usize) -> Vec<usize> {
        lock(&self.outdated_gpu).pop_up_to(max)
    }

    pub fn outdated_gpu_len(&self) -> usize {
        lock(&self.outdated_gpu).len()
    }

    // --- skylight parameters ---

    /// Publishes a new skylight direction to the propagator.
    pub fn set_direction(&self, direction: [f32; 3]) {
        *lock(&self.direction) = direction;
        self.direction_generation.fetch_add(1, Ordering::AcqRel);
    }

    pub fn direction(&self) -> [f32; 3] {
        *lock(&self.direction)
    }

    /// Incremented on every [`set_direction`](Self::set_direction).
    pub fn direction_generation(&self) -> u64 {
        self.direction_generation.load(Ordering::Acquire)
    }

    pub fn ambient(&self) -> LightingValue {
        self.ambient.load()
    }

    pub fn set_ambient(&self, ambient: LightingValue) {
        self.ambient.store(ambient);
    }

    // --- lifecycle ---

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared() -> LightingShared {
        let dims = GridDims::from_cells([32, 32, 16]).unwrap();
        LightingShared::new(dims, LightingValue::new(1, 2, 3), [0.0, 0.0, -1.0])
    }

    #[test]
    fn test_pending_tracks_skylight_queue() {
        let s = shared();
        assert!(s.push_skylight(3));
        assert!(!s.push_skylight(3));
        s.push_skylight_many([1, 3, 2]);
        assert_eq!(s.pending_skylight(), 3);
        assert_eq!(s.pop_skylight(), Some(3));
        assert_eq!(s.pop_skylight(), Some(1));
        assert_eq!(s.pending_skylight(), 1);
        assert_eq!(s.pop_skylight(), Some(2));
        assert_eq!(s.pop_skylight(), None);
        assert_eq!(s.pending_skylight(), 0);
    }

    #[test]
    fn test_gpu_drain_is_bounded() {
        let s = shared();
        s.push_gpu_many(0..4);
        s.push_gpu(2);
        assert_eq!(s.drain_gpu(3), vec![0, 1, 2]);
        assert_eq!(s.outdated_gpu_len(), 1);
        assert_eq!(s.drain_gpu(3), vec![3]);
    }

    #[test]
    fn test_direction_mailbox() {
        let s = shared();
        let g = s.direction_generation();
        s.set_direction([1.0, 0.0, -1.0]);
        assert_eq!(s.direction(), [1.0, 0.0, -1.0]);
        assert_eq!(s.direction_generation(), g + 1);
    }

    #[test]
    fn test_idle_requires_no_pending_work() {
        let s = shared();
        assert!(s.take_skylight_request());
        s.set_skylight_idle(true);
        assert!(s.is_skylight_idle());
        s.push_skylight(0);
        assert!(!s.is_skylight_idle());
        s.pop_skylight();
        s.request_skylight_pass();
        assert!(!s.is_skylight_idle());
    }

    #[test]
    fn test_push_clears_idle_before_pop() {
        let s = shared();
        s.take_skylight_request();
        s.set_skylight_idle(true);

        s.push_skylight_many([4, 5]);
        // Both chunks popped, but nothing has reported idle again yet.
        s.pop_skylight();
        s.pop_skylight();
        assert_eq!(s.pending_skylight(), 0);
        assert!(!s.is_skylight_idle());

        s.set_skylight_idle(true);
        s.push_skylight_many(std::iter::empty());
        assert!(s.is_skylight_idle());
        assert!(s.push_skylight(4));
        s.pop_skylight();
        assert!(!s.is_skylight_idle());
    }
}
