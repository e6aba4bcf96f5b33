//! Worker pool, missions, and the phase barrier.
//!
//! The conductor splits the grid into contiguous index ranges, one per
//! worker, and runs the simulation as a sequence of *phases*: every worker
//! executes the same mission over its own range, and the conductor waits
//! until all of them report done before moving on. Workers are long-lived
//! OS threads that park on a start condition between phases.
//!
//! One phase is published as a [`PhaseView`]: a set of raw slices over the
//! pool arrays, valid only between the start broadcast and barrier
//! completion. Within a phase each worker writes exclusively to its own
//! range of the height/velocity/pixel arrays and shares read-only views of
//! everything else (the stencil reads neighbor heights from the snapshot
//! buffer), so phases are free of data races by partitioning.

use crate::color::{self, RenderOptions, Rgb};
use crate::kernel;
use crate::pool::Pool;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Hard cap on the worker count.
pub(crate) const MAX_WORKERS: usize = 32;

/// Timed-wait interval while parked, so shutdown is never missed for long.
const START_WAIT: Duration = Duration::from_secs(1);

/// Timed-wait interval on the end barrier; expiry is logged, not fatal.
const END_WAIT: Duration = Duration::from_secs(3);

/// Lock a mutex, riding through poisoning from a panicked peer.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// What every worker does during one barrier cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Mission {
    /// Park on the start condition.
    Pause,
    /// Exit the worker loop.
    Destroy,
    /// Run the force stencil over the partition.
    CalculateForces,
    /// Add velocity to height over the partition.
    MoveParticles,
    /// Paint the partition into the frame buffer.
    CalculateColors,
}

/// One worker's slice of the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct WorkerRange {
    pub id: usize,
    pub first: usize,
    pub count: usize,
}

/// Split `cells` into contiguous per-worker ranges.
///
/// Workers `0..n-1` take `cells / n` each; the last worker absorbs the
/// remainder. The ranges are disjoint and cover `[0, cells)` exactly.
pub(crate) fn partition(cells: usize, workers: usize) -> Vec<WorkerRange> {
    let workers = workers.max(1);
    let base = cells / workers;
    (0..workers)
        .map(|id| WorkerRange {
            id,
            first: id * base,
            count: if id + 1 == workers { cells - id * base } else { base },
        })
        .collect()
}

/// Raw slices over the pool arrays for the duration of one phase.
///
/// Only the conductor constructs these, from an exclusive borrow of the
/// pool, and it keeps that exclusivity until the barrier completes; the
/// pointers must not be used outside that window. Workers touch disjoint
/// mutable ranges plus shared read-only arrays, so concurrent execution
/// over a published view is race-free.
#[derive(Clone, Copy)]
pub(crate) struct PhaseView {
    height: *mut f32,
    velocity: *mut f32,
    rgb: *mut Rgb,
    prev: *const f32,
    mass: *const f32,
    loss: *const f32,
    fixity: *const f32,
    cells: usize,
    size: usize,
    visuals: RenderOptions,
}

unsafe impl Send for PhaseView {}
unsafe impl Sync for PhaseView {}

impl PhaseView {
    pub fn new(pool: &mut Pool, visuals: RenderOptions) -> Self {
        Self {
            height: pool.height.as_mut_ptr(),
            velocity: pool.velocity.as_mut_ptr(),
            rgb: pool.rgb.as_mut_ptr(),
            prev: pool.prev.as_ptr(),
            mass: pool.mass.as_ptr(),
            loss: pool.loss.as_ptr(),
            fixity: pool.fixity.as_ptr(),
            cells: pool.cells(),
            size: pool.size(),
            visuals,
        }
    }

    /// Execute a mission over one range of this view.
    ///
    /// # Safety
    ///
    /// The view must still be published (the backing pool borrow is held
    /// by the conductor) and no other worker may hold an overlapping
    /// range.
    pub unsafe fn execute(&self, mission: Mission, range: WorkerRange) {
        let first = range.first.min(self.cells);
        let count = range.count.min(self.cells - first);
        if count == 0 {
            return;
        }
        use std::slice::{from_raw_parts, from_raw_parts_mut};
        match mission {
            Mission::CalculateForces => kernel::step_range(
                from_raw_parts(self.prev, self.cells),
                from_raw_parts(self.mass, self.cells),
                from_raw_parts(self.loss, self.cells),
                from_raw_parts(self.fixity, self.cells),
                from_raw_parts_mut(self.height.add(first), count),
                from_raw_parts_mut(self.velocity.add(first), count),
                self.size,
                first,
            ),
            Mission::MoveParticles => kernel::advance_range(
                from_raw_parts_mut(self.height.add(first), count),
                from_raw_parts(self.velocity.add(first), count),
            ),
            Mission::CalculateColors => color::colorize_range(
                from_raw_parts(self.height.add(first), count),
                from_raw_parts(self.mass.add(first), count),
                from_raw_parts(self.fixity.add(first), count),
                from_raw_parts_mut(self.rgb.add(first), count),
                &self.visuals,
            ),
            Mission::Pause | Mission::Destroy => {}
        }
    }
}

/// Orders shared between the conductor and the workers.
struct OrderBoard {
    mission: Mission,
    /// Bumped once per published phase so a worker never re-runs one.
    cycle: u64,
    ranges: Vec<WorkerRange>,
    view: Option<PhaseView>,
}

struct PoolShared {
    board: Mutex<OrderBoard>,
    start: Condvar,
}

/// Per-worker completion flag and its end condition.
struct WorkerSync {
    done: Mutex<bool>,
    end: Condvar,
}

struct Member {
    sync: Arc<WorkerSync>,
    handle: JoinHandle<()>,
}

/// The fixed-size pool of worker threads and its barrier state.
///
/// Owned by the conductor thread; nothing here is reachable from the
/// public API.
pub(crate) struct WorkerPool {
    shared: Arc<PoolShared>,
    members: Vec<Member>,
    cells: usize,
}

impl WorkerPool {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(PoolShared {
                board: Mutex::new(OrderBoard {
                    mission: Mission::Pause,
                    cycle: 0,
                    ranges: Vec::new(),
                    view: None,
                }),
                start: Condvar::new(),
            }),
            members: Vec::new(),
            cells: 0,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.members.len()
    }

    /// Bring the pool to the requested worker count and grid size,
    /// repartitioning as needed. Changing the count destroys and respawns
    /// the threads; changing only the size just recuts the ranges.
    pub fn ensure(&mut self, workers: usize, cells: usize) {
        let workers = workers.clamp(1, MAX_WORKERS);
        if workers == self.members.len() && cells == self.cells {
            return;
        }
        if workers != self.members.len() {
            self.halt_members();
            lock(&self.shared.board).ranges = partition(cells, workers);
            self.cells = cells;
            for id in 0..workers {
                self.spawn_member(id);
            }
        } else {
            lock(&self.shared.board).ranges = partition(cells, workers);
            self.cells = cells;
        }
    }

    fn spawn_member(&mut self, id: usize) {
        let sync = Arc::new(WorkerSync {
            done: Mutex::new(false),
            end: Condvar::new(),
        });
        let shared = Arc::clone(&self.shared);
        let worker_sync = Arc::clone(&sync);
        let spawned = thread::Builder::new()
            .name(format!("wavepool-worker-{}", id))
            .spawn(move || worker_main(id, shared, worker_sync));
        match spawned {
            Ok(handle) => self.members.push(Member { sync, handle }),
            // A missing worker costs throughput, not correctness: its
            // range falls back to the conductor in run_phase.
            Err(e) => log::error!("failed to spawn worker {}: {}", id, e),
        }
    }

    /// Publish one phase and wait until every worker has finished it.
    pub fn run_phase(&self, mission: Mission, view: PhaseView) {
        if self.members.is_empty() {
            // Nothing spawned (or every spawn failed): do the work inline.
            let range = WorkerRange { id: 0, first: 0, count: view.cells };
            unsafe { view.execute(mission, range) };
            return;
        }
        let uncovered: Vec<WorkerRange> = {
            let mut board = lock(&self.shared.board);
            board.mission = mission;
            board.cycle = board.cycle.wrapping_add(1);
            board.view = Some(view);
            for member in &self.members {
                *lock(&member.sync.done) = false;
            }
            self.shared.start.notify_all();
            // Ranges with no live worker (spawn failures) run inline below.
            board.ranges[self.members.len()..].to_vec()
        };
        for range in uncovered {
            unsafe { view.execute(mission, range) };
        }
        for member in &self.members {
            let mut done = lock(&member.sync.done);
            while !*done {
                let (guard, timeout) = member
                    .sync
                    .end
                    .wait_timeout(done, END_WAIT)
                    .unwrap_or_else(PoisonError::into_inner);
                done = guard;
                if timeout.timed_out() && !*done {
                    log::warn!("worker {:?} slow to finish {:?} phase", member.handle.thread().name(), mission);
                }
            }
        }
        lock(&self.shared.board).view = None;
    }

    /// Park the workers until the next phase.
    pub fn park(&self) {
        lock(&self.shared.board).mission = Mission::Pause;
    }

    /// Destroy every worker and join it.
    pub fn shutdown(&mut self) {
        self.halt_members();
    }

    fn halt_members(&mut self) {
        if self.members.is_empty() {
            return;
        }
        {
            let mut board = lock(&self.shared.board);
            board.mission = Mission::Destroy;
            board.view = None;
            self.shared.start.notify_all();
        }
        for member in self.members.drain(..) {
            if member.handle.join().is_err() {
                log::error!("a worker thread panicked");
            }
        }
        let mut board = lock(&self.shared.board);
        board.mission = Mission::Pause;
        board.cycle = 0;
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.halt_members();
    }
}

fn worker_main(id: usize, shared: Arc<PoolShared>, sync: Arc<WorkerSync>) {
    log::debug!("worker {} online", id);
    let mut last_cycle = 0u64;
    loop {
        let order = {
            let mut board = lock(&shared.board);
            loop {
                if board.mission == Mission::Destroy {
                    log::debug!("worker {} exiting", id);
                    return;
                }
                if board.mission != Mission::Pause
                    && board.cycle != last_cycle
                    && id < board.ranges.len()
                {
                    if let Some(view) = board.view {
                        last_cycle = board.cycle;
                        let range = board.ranges[id];
                        debug_assert_eq!(range.id, id);
                        break (board.mission, range, view);
                    }
                }
                let (guard, _timeout) = shared
                    .start
                    .wait_timeout(board, START_WAIT)
                    .unwrap_or_else(PoisonError::into_inner);
                board = guard;
            }
        };
        let (mission, range, view) = order;
        unsafe { view.execute(mission, range) };
        *lock(&sync.done) = true;
        sync.end.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::RenderOptions;
    use crate::pool::Pool;

    // ========== Partition Tests ==========

    #[test]
    fn test_partition_covers_grid_exactly() {
        for (cells, workers) in [(300 * 300, 7), (16, 16), (100, 1), (9, 4)] {
            let ranges = partition(cells, workers);
            assert_eq!(ranges.len(), workers);
            let mut covered = 0;
            for (i, r) in ranges.iter().enumerate() {
                assert_eq!(r.id, i);
                assert_eq!(r.first, covered, "ranges must be contiguous");
                covered += r.count;
            }
            assert_eq!(covered, cells);
        }
    }

    #[test]
    fn test_partition_last_worker_absorbs_remainder() {
        let cells = 32 * 32;
        let ranges = partition(cells, 32);
        let base = cells / 32;
        for r in &ranges[..31] {
            assert_eq!(r.count, base);
        }
        assert_eq!(ranges[31].count, base + cells % 32);
    }

    #[test]
    fn test_partition_more_workers_than_cells() {
        let ranges = partition(2, 8);
        let total: usize = ranges.iter().map(|r| r.count).sum();
        assert_eq!(total, 2);
        assert!(ranges.iter().all(|r| r.first + r.count <= 2));
    }

    // ========== Pool Tests ==========

    fn seeded_pool(n: usize) -> Pool {
        let mut pool = Pool::new(n);
        for i in 0..pool.cells() {
            pool.height[i] = ((i * 31 % 17) as f32 - 8.0) / 8.0;
            if i % 53 == 0 {
                pool.fixity[i] = 1.0;
            }
        }
        pool
    }

    #[test]
    fn test_threaded_force_phase_matches_inline() {
        let n = 24;
        let mut expected = seeded_pool(n);
        let mut threaded = expected.clone();

        expected.snapshot_heights();
        kernel::step_range(
            &expected.prev.clone(),
            &expected.mass,
            &expected.loss,
            &expected.fixity,
            &mut expected.height,
            &mut expected.velocity,
            n,
            0,
        );

        let mut pool = WorkerPool::new();
        pool.ensure(5, threaded.cells());
        assert_eq!(pool.worker_count(), 5);
        threaded.snapshot_heights();
        let view = PhaseView::new(&mut threaded, RenderOptions::default());
        pool.run_phase(Mission::CalculateForces, view);
        pool.shutdown();

        assert_eq!(expected.height, threaded.height);
        assert_eq!(expected.velocity, threaded.velocity);
    }

    #[test]
    fn test_threaded_color_phase_paints_whole_frame() {
        let n = 16;
        let mut grid = Pool::new(n);
        for i in 0..grid.cells() {
            grid.height[i] = 1.0; // saturates to the crest color
        }
        let mut pool = WorkerPool::new();
        pool.ensure(3, grid.cells());
        let view = PhaseView::new(&mut grid, RenderOptions::default());
        pool.run_phase(Mission::CalculateColors, view);
        pool.shutdown();

        assert!(grid.rgb.iter().all(|&px| px == crate::color::Rgb::WHITE));
    }

    #[test]
    fn test_consecutive_phases_run_once_each() {
        let n = 8;
        let mut grid = Pool::new(n);
        grid.velocity.fill(1.0);

        let mut pool = WorkerPool::new();
        pool.ensure(2, grid.cells());
        for _ in 0..3 {
            let view = PhaseView::new(&mut grid, RenderOptions::default());
            pool.run_phase(Mission::MoveParticles, view);
        }
        pool.shutdown();
        // Three move phases, each adding velocity exactly once.
        assert!(grid.height.iter().all(|&h| (h - 3.0).abs() < 1e-6));
    }

    #[test]
    fn test_ensure_repartitions_on_resize() {
        let mut pool = WorkerPool::new();
        pool.ensure(4, 100);
        pool.ensure(4, 64);
        {
            let board = lock(&pool.shared.board);
            let total: usize = board.ranges.iter().map(|r| r.count).sum();
            assert_eq!(total, 64);
        }
        pool.shutdown();
    }

    #[test]
    fn test_ensure_clamps_worker_count() {
        let mut pool = WorkerPool::new();
        pool.ensure(500, 64);
        assert_eq!(pool.worker_count(), MAX_WORKERS);
        pool.ensure(0, 64);
        assert_eq!(pool.worker_count(), 1);
        pool.shutdown();
        assert_eq!(pool.worker_count(), 0);
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let mut pool = WorkerPool::new();
        pool.ensure(2, 16);
        pool.shutdown();
        pool.shutdown();
    }
}
