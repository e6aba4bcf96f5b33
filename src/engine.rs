//! The engine: conductor thread, rate control, and the public surface.
//!
//! [`Engine`] owns one *conductor* thread that runs the show: it paces
//! simulation steps against the IPS target and frame paints against the
//! FPS target, fans each phase out to the worker pool, fires the render
//! callback after every painted frame, and emits a periodic throughput
//! line. Workers never touch the engine state directly; every phase is
//! issued while the conductor holds the state mutex, so configuration
//! setters and the external data lock are strictly interleaved with
//! phases and never race them.
//!
//! # Example
//!
//! ```no_run
//! use wavepool::{Engine, Vec2};
//!
//! let engine = Engine::builder()
//!     .with_size(300)
//!     .with_threads(4)
//!     .with_oscillator(0, |o| {
//!         o.active(true)
//!             .anchors(Vec2::new(150.0, 150.0), Vec2::ZERO)
//!             .amplitude(6.0);
//!     })
//!     .on_frame(|rgb| {
//!         // Hand the R,G,B byte triples to the host UI.
//!         let _ = rgb;
//!     })
//!     .build()
//!     .expect("spawn engine threads");
//!
//! engine.start();
//! // ... the conductor steps and paints in the background ...
//! engine.stop();
//! ```

use crate::absorber::AbsorberConfig;
use crate::color::RenderOptions;
use crate::error::EngineError;
use crate::kernel;
use crate::oscillator::{Oscillator, OSCILLATOR_SLOTS};
use crate::pacing::{RateLimiter, Throughput};
use crate::pool::ParticleAttribute;
use crate::sim::Simulation;
use crate::workers::{lock, Mission, PhaseView, WorkerPool, MAX_WORKERS};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Receives the finished frame as raw `R,G,B` byte triples, row-major.
///
/// Called on the conductor thread after every paint phase; it must return
/// promptly and must not call back into the engine.
pub type FrameCallback = Box<dyn FnMut(&[u8]) + Send + 'static>;

/// Scheduling configuration read by the conductor every iteration.
#[derive(Clone, Copy, Debug, PartialEq)]
struct SchedConfig {
    /// Target iterations per second; 0 = unlimited.
    ips: u32,
    /// Target frames per second; 0 = unlimited.
    fps: u32,
    /// Conductor sleep quantum in milliseconds.
    thread_delay_ms: u64,
    /// Throughput log interval in milliseconds; 0 disables the log.
    perf_log_interval_ms: u64,
    /// Prefer sleeping over yielding when idle.
    power_save: bool,
    /// Run simulation steps at all.
    calculation: bool,
    /// Paint frames at all.
    rendering: bool,
    /// Requested worker count.
    workers: usize,
}

impl Default for SchedConfig {
    fn default() -> Self {
        Self {
            ips: 100,
            fps: 25,
            thread_delay_ms: 5,
            perf_log_interval_ms: 1000,
            power_save: false,
            calculation: true,
            rendering: true,
            workers: 1,
        }
    }
}

struct EngineState {
    sim: Simulation,
    sched: SchedConfig,
}

struct EngineShared {
    state: Mutex<EngineState>,
    work_now: AtomicBool,
    disposing: AtomicBool,
}

/// Handle to a running wave engine.
///
/// All methods are safe to call from any thread; configuration setters
/// clamp their arguments and take effect on the next conductor iteration.
/// Dropping the handle stops and joins every engine thread.
pub struct Engine {
    shared: Arc<EngineShared>,
    conductor: Option<JoinHandle<()>>,
}

impl Engine {
    /// Start building an engine.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    fn state(&self) -> MutexGuard<'_, EngineState> {
        lock(&self.shared.state)
    }

    /// Begin stepping and painting.
    pub fn start(&self) {
        self.shared.work_now.store(true, Ordering::Release);
    }

    /// Pause stepping and painting; workers park at the next barrier.
    pub fn stop(&self) {
        self.shared.work_now.store(false, Ordering::Release);
    }

    /// Whether the conductor is currently asked to work.
    pub fn is_running(&self) -> bool {
        self.shared.work_now.load(Ordering::Acquire)
    }

    /// Stop everything and join all engine threads. Equivalent to drop.
    pub fn dispose(self) {}

    /// Completed simulation steps since creation.
    pub fn tick(&self) -> u64 {
        self.state().sim.tick
    }

    /// Grid edge length.
    pub fn size(&self) -> usize {
        self.state().sim.pool.size()
    }

    /// Resize the grid. Mass and fixity are rescaled, the wave is reset,
    /// oscillator anchors scale with the grid. Sizes below 1 are raised
    /// to 1.
    pub fn set_size(&self, size: usize) {
        self.state().sim.resize(size.max(1));
    }

    /// Requested worker count.
    pub fn thread_count(&self) -> usize {
        self.state().sched.workers
    }

    /// Set the worker count; clamped to `[1, 32]`. The pool is rebuilt by
    /// the conductor before its next phase.
    pub fn set_thread_count(&self, workers: usize) {
        self.state().sched.workers = workers.clamp(1, MAX_WORKERS);
    }

    /// Target iterations per second; 0 = unlimited.
    pub fn ips(&self) -> u32 {
        self.state().sched.ips
    }

    /// Set the iteration rate target; 0 = unlimited.
    pub fn set_ips(&self, ips: u32) {
        self.state().sched.ips = ips;
    }

    /// Target frames per second; 0 = unlimited.
    pub fn fps(&self) -> u32 {
        self.state().sched.fps
    }

    /// Set the frame rate target; 0 = unlimited.
    pub fn set_fps(&self, fps: u32) {
        self.state().sched.fps = fps;
    }

    /// Conductor sleep quantum in milliseconds.
    pub fn thread_delay_ms(&self) -> u64 {
        self.state().sched.thread_delay_ms
    }

    /// Set the conductor sleep quantum; clamped to `[0, 1000]`.
    pub fn set_thread_delay_ms(&self, ms: u64) {
        self.state().sched.thread_delay_ms = ms.min(1000);
    }

    /// Throughput log interval in milliseconds; 0 disables the log.
    pub fn performance_log_interval_ms(&self) -> u64 {
        self.state().sched.perf_log_interval_ms
    }

    /// Set the throughput log interval; 0 disables the log.
    pub fn set_performance_log_interval_ms(&self, ms: u64) {
        self.state().sched.perf_log_interval_ms = ms;
    }

    /// Whether the conductor prefers sleeping over yielding when idle.
    pub fn power_save(&self) -> bool {
        self.state().sched.power_save
    }

    pub fn set_power_save(&self, on: bool) {
        self.state().sched.power_save = on;
    }

    /// Whether DC drift removal runs after each step.
    pub fn shifting(&self) -> bool {
        self.state().sim.shifting
    }

    pub fn set_shifting(&self, on: bool) {
        self.state().sim.shifting = on;
    }

    /// Whether simulation steps run at all.
    pub fn calculation_enabled(&self) -> bool {
        self.state().sched.calculation
    }

    pub fn set_calculation_enabled(&self, on: bool) {
        self.state().sched.calculation = on;
    }

    /// Whether frames are painted at all.
    pub fn render_enabled(&self) -> bool {
        self.state().sched.rendering
    }

    pub fn set_render_enabled(&self, on: bool) {
        self.state().sched.rendering = on;
    }

    /// Pool-wide base loss.
    pub fn base_loss(&self) -> f32 {
        self.state().sim.base_loss
    }

    /// Set the pool-wide base loss; clamped to `[0, 1]`. Rebuilds the
    /// loss field.
    pub fn set_base_loss(&self, loss: f32) {
        let mut st = self.state();
        st.sim.base_loss = loss.clamp(0.0, 1.0);
        st.sim.rebuild_loss();
    }

    /// Current absorber configuration.
    pub fn absorber(&self) -> AbsorberConfig {
        self.state().sim.absorber
    }

    /// Edit the absorber in place; thickness is capped at half the grid
    /// size and the loss field is rebuilt afterwards.
    pub fn edit_absorber(&self, edit: impl FnOnce(&mut AbsorberConfig)) {
        let mut st = self.state();
        edit(&mut st.sim.absorber);
        let size = st.sim.pool.size();
        st.sim.absorber.sanitize(size);
        st.sim.rebuild_loss();
    }

    /// Current display options.
    pub fn visuals(&self) -> RenderOptions {
        self.state().sim.visuals
    }

    /// Edit the display options in place. Never affects the physics.
    pub fn edit_visuals(&self, edit: impl FnOnce(&mut RenderOptions)) {
        let mut st = self.state();
        edit(&mut st.sim.visuals);
        st.sim.visuals.sanitize();
    }

    /// Snapshot of one oscillator slot, or `None` for ids outside `[0, 9)`.
    pub fn oscillator(&self, slot: usize) -> Option<Oscillator> {
        self.state().sim.oscillators.get(slot).cloned()
    }

    /// Edit one oscillator slot in place; ids outside `[0, 9)` are a
    /// no-op. Target indices are recomputed afterwards.
    pub fn edit_oscillator(&self, slot: usize, edit: impl FnOnce(&mut Oscillator)) {
        if slot >= OSCILLATOR_SLOTS {
            return;
        }
        let mut st = self.state();
        let size = st.sim.pool.size();
        let osc = &mut st.sim.oscillators[slot];
        edit(osc);
        osc.sanitize();
        osc.recompute(size);
    }

    /// Acquire exclusive access to the raw particle arrays.
    ///
    /// While the guard lives the conductor cannot enter a phase and every
    /// configuration setter blocks, so reads and writes through the guard
    /// are race-free. Release it promptly; do not call other engine
    /// methods from the same thread while holding it.
    pub fn lock(&self) -> PoolAccess<'_> {
        PoolAccess {
            guard: self.state(),
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shared.disposing.store(true, Ordering::Release);
        self.shared.work_now.store(false, Ordering::Release);
        if let Some(handle) = self.conductor.take() {
            if handle.join().is_err() {
                log::error!("conductor thread panicked during dispose");
            }
        }
    }
}

/// Scoped access to the raw particle arrays of a paused or running engine.
///
/// Obtained from [`Engine::lock`]; the underlying lock is released when
/// the guard drops, on every exit path.
pub struct PoolAccess<'a> {
    guard: MutexGuard<'a, EngineState>,
}

impl PoolAccess<'_> {
    /// Grid edge length.
    pub fn size(&self) -> usize {
        self.guard.sim.pool.size()
    }

    /// Total number of cells.
    pub fn cells(&self) -> usize {
        self.guard.sim.pool.cells()
    }

    /// Row-major index of the cell at `(x, y)`.
    pub fn index(&self, x: usize, y: usize) -> usize {
        self.guard.sim.pool.index(x, y)
    }

    /// Shared view of one attribute array.
    pub fn attribute(&self, attr: ParticleAttribute) -> &[f32] {
        self.guard.sim.pool.attribute(attr)
    }

    /// Exclusive view of one attribute array. Writes take effect on the
    /// next simulation step.
    pub fn attribute_mut(&mut self, attr: ParticleAttribute) -> &mut [f32] {
        self.guard.sim.pool.attribute_mut(attr)
    }
}

/// Configures and spawns an [`Engine`].
pub struct EngineBuilder {
    size: usize,
    sched: SchedConfig,
    base_loss: f32,
    shifting: bool,
    absorber: AbsorberConfig,
    visuals: RenderOptions,
    oscillators: [Oscillator; OSCILLATOR_SLOTS],
    on_frame: Option<FrameCallback>,
}

impl EngineBuilder {
    /// Create a builder with the documented defaults.
    pub fn new() -> Self {
        Self {
            size: crate::pool::DEFAULT_SIZE,
            sched: SchedConfig::default(),
            base_loss: 0.0,
            shifting: true,
            absorber: AbsorberConfig::default(),
            visuals: RenderOptions::default(),
            oscillators: Default::default(),
            on_frame: None,
        }
    }

    /// Set the grid edge length; values below 1 are raised to 1.
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size.max(1);
        self
    }

    /// Set the worker count; clamped to `[1, 32]`.
    pub fn with_threads(mut self, workers: usize) -> Self {
        self.sched.workers = workers.clamp(1, MAX_WORKERS);
        self
    }

    /// Set the iteration rate target; 0 = unlimited.
    pub fn with_ips(mut self, ips: u32) -> Self {
        self.sched.ips = ips;
        self
    }

    /// Set the frame rate target; 0 = unlimited.
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.sched.fps = fps;
        self
    }

    /// Set the conductor sleep quantum; clamped to `[0, 1000]` ms.
    pub fn with_thread_delay_ms(mut self, ms: u64) -> Self {
        self.sched.thread_delay_ms = ms.min(1000);
        self
    }

    /// Set the throughput log interval; 0 disables the log.
    pub fn with_performance_log_interval_ms(mut self, ms: u64) -> Self {
        self.sched.perf_log_interval_ms = ms;
        self
    }

    /// Prefer sleeping over yielding when idle.
    pub fn with_power_save(mut self, on: bool) -> Self {
        self.sched.power_save = on;
        self
    }

    /// Enable or disable DC drift removal.
    pub fn with_shifting(mut self, on: bool) -> Self {
        self.shifting = on;
        self
    }

    /// Set the pool-wide base loss; clamped to `[0, 1]`.
    pub fn with_base_loss(mut self, loss: f32) -> Self {
        self.base_loss = loss.clamp(0.0, 1.0);
        self
    }

    /// Edit the absorber configuration.
    pub fn with_absorber(mut self, edit: impl FnOnce(&mut AbsorberConfig)) -> Self {
        edit(&mut self.absorber);
        self
    }

    /// Edit the display options.
    pub fn with_visuals(mut self, edit: impl FnOnce(&mut RenderOptions)) -> Self {
        edit(&mut self.visuals);
        self
    }

    /// Edit one oscillator slot; ids outside `[0, 9)` are a no-op.
    pub fn with_oscillator(mut self, slot: usize, edit: impl FnOnce(&mut Oscillator)) -> Self {
        if let Some(osc) = self.oscillators.get_mut(slot) {
            edit(osc);
        }
        self
    }

    /// Install the render callback receiving each finished frame.
    pub fn on_frame(mut self, callback: impl FnMut(&[u8]) + Send + 'static) -> Self {
        self.on_frame = Some(Box::new(callback));
        self
    }

    /// Spawn the conductor thread and return the engine handle, paused.
    pub fn build(self) -> Result<Engine, EngineError> {
        let mut sim = Simulation::new(self.size);
        sim.base_loss = self.base_loss;
        sim.shifting = self.shifting;
        sim.visuals = self.visuals;
        sim.visuals.sanitize();
        sim.absorber = self.absorber;
        sim.absorber.sanitize(self.size);
        sim.oscillators = self.oscillators;
        for osc in &mut sim.oscillators {
            osc.sanitize();
            osc.recompute(self.size);
        }
        sim.rebuild_loss();

        let shared = Arc::new(EngineShared {
            state: Mutex::new(EngineState {
                sim,
                sched: self.sched,
            }),
            work_now: AtomicBool::new(false),
            disposing: AtomicBool::new(false),
        });
        let conductor_shared = Arc::clone(&shared);
        let on_frame = self.on_frame;
        let handle = thread::Builder::new()
            .name("wavepool-conductor".into())
            .spawn(move || conductor_main(conductor_shared, on_frame))?;
        Ok(Engine {
            shared,
            conductor: Some(handle),
        })
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// One complete calculation cycle: snapshot, forces, oscillators, moves,
/// optional drift removal.
fn run_cycle(pool: &WorkerPool, sim: &mut Simulation) {
    sim.pool.snapshot_heights();
    let view = PhaseView::new(&mut sim.pool, sim.visuals);
    pool.run_phase(Mission::CalculateForces, view);
    sim.drive_oscillators();
    let view = PhaseView::new(&mut sim.pool, sim.visuals);
    pool.run_phase(Mission::MoveParticles, view);
    if sim.shifting {
        kernel::shift_to_origin(&mut sim.pool.height);
    }
    sim.tick += 1;
}

fn conductor_main(shared: Arc<EngineShared>, mut on_frame: Option<FrameCallback>) {
    log::debug!("conductor online");
    let mut pool = WorkerPool::new();
    let started = Instant::now();
    let mut steps = RateLimiter::new(0);
    let mut frames = RateLimiter::new(0);
    let mut throughput = Throughput::new();
    let mut first_iteration = true;

    while !shared.disposing.load(Ordering::Acquire) {
        let sched = lock(&shared.state).sched;
        let elapsed = started.elapsed().as_secs_f64();
        if steps.set_target(sched.ips) && !first_iteration {
            steps.resync(elapsed);
        }
        if frames.set_target(sched.fps) && !first_iteration {
            frames.resync(elapsed);
        }
        first_iteration = false;

        if !shared.work_now.load(Ordering::Acquire) {
            pool.park();
            thread::sleep(Duration::from_millis(sched.thread_delay_ms));
            continue;
        }

        let step_quota = steps.needed(elapsed);
        let frame_quota = frames.needed(elapsed);

        if sched.calculation && step_quota > steps.done() {
            let mut st = lock(&shared.state);
            pool.ensure(st.sched.workers, st.sim.pool.cells());
            run_cycle(&pool, &mut st.sim);
            drop(st);
            steps.record();
            steps.catch_up(step_quota);
            throughput.record_step();
        }

        if sched.rendering && frame_quota > frames.done() {
            let mut st = lock(&shared.state);
            pool.ensure(st.sched.workers, st.sim.pool.cells());
            let visuals = st.sim.visuals;
            let view = PhaseView::new(&mut st.sim.pool, visuals);
            pool.run_phase(Mission::CalculateColors, view);
            if let Some(callback) = on_frame.as_mut() {
                callback(st.sim.pool.frame());
            }
            drop(st);
            frames.record();
            frames.catch_up(frame_quota);
            throughput.record_frame();
        }

        if let Some(report) = throughput.poll(Duration::from_millis(sched.perf_log_interval_ms)) {
            log::info!(
                "throughput: {:.1} steps/s, {:.1} frames/s ({} workers)",
                report.steps_per_sec,
                report.frames_per_sec,
                pool.worker_count()
            );
        }

        let elapsed = started.elapsed().as_secs_f64();
        let behind = (sched.calculation && steps.is_behind(elapsed))
            || (sched.rendering && frames.is_behind(elapsed));
        let unlimited = sched.ips == 0 && sched.fps == 0;
        if (unlimited && !sched.power_save) || behind {
            thread::yield_now();
        } else {
            pool.park();
            if sched.power_save {
                thread::sleep(Duration::from_millis(sched.thread_delay_ms));
            } else {
                thread::yield_now();
            }
        }
    }
    pool.shutdown();
    log::debug!("conductor exiting");
}
