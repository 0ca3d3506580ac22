//! Lifecycle controller
//!
//! Owns everything for one card: simulation state, geometry resolver, surfaces,
//! scheduler and status flags. The host feeds it input flags and calls
//! [`ConfettiController::on_frame`] whenever a requested frame fires.
//!
//! Phases: `Idle -> Active -> FadingOut -> Idle`, with pause as a sub-state of
//! `Active`. Deterministic replay (`render_frame`) runs the same tick loop
//! synchronously and stays paused on the requested frame.

use std::sync::Arc;

use serde::Serialize;

use crate::config::SimulationConfig;
use crate::platform::{FrameHandle, FrameScheduler, GeometryProvider, TiltSource};
use crate::renderer::{SurfaceSet, composite};
use crate::sim::{self, GeometryResolver, ParticleArena, SceneGeometry, SimState, TickInput};
use crate::status::{StatusFlags, StatusSnapshot};

/// Controller lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Phase {
    #[default]
    Idle,
    Active,
    FadingOut,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Active => "active",
            Phase::FadingOut => "fading_out",
        }
    }
}

/// Flags supplied by the surrounding component
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerInputs {
    /// Card is activated (hovered, selected...)
    pub active: bool,
    /// Whatever the confetti celebrates has completed
    pub complete: bool,
    pub paused: bool,
    /// Pause automatically once this many ticks have run
    pub pause_at_frame: Option<u64>,
    /// Deterministic replay to this frame
    pub render_frame: Option<u64>,
}

impl ControllerInputs {
    fn wants_confetti(&self) -> bool {
        self.active && self.complete
    }
}

/// Point-in-time view of a controller
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ControllerSnapshot {
    pub phase: Phase,
    pub paused: bool,
    pub tick: u64,
    pub live_particles: usize,
    pub spawned_total: u64,
    pub status: StatusSnapshot,
}

/// Confetti engine for one card
pub struct ConfettiController {
    config: SimulationConfig,
    surfaces: SurfaceSet,
    resolver: GeometryResolver,
    scheduler: Box<dyn FrameScheduler>,
    tilt: Option<Box<dyn TiltSource>>,
    status: Arc<StatusFlags>,
    state: SimState,
    inputs: ControllerInputs,
    phase: Phase,
    paused: bool,
    pause_at_hit: bool,
    pending: Option<FrameHandle>,
    fade_started: Option<f64>,
}

impl ConfettiController {
    pub fn new(
        config: SimulationConfig,
        surfaces: SurfaceSet,
        geometry: Option<Box<dyn GeometryProvider>>,
        scheduler: Box<dyn FrameScheduler>,
    ) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(e) => {
                log::warn!("Rejected confetti config, using defaults: {}", e);
                SimulationConfig::default()
            }
        };
        let resolver = GeometryResolver::new(geometry, config.profile.cutout);
        let state = SimState::new(&config);
        Self {
            config,
            surfaces,
            resolver,
            scheduler,
            tilt: None,
            status: StatusFlags::global(),
            state,
            inputs: ControllerInputs::default(),
            phase: Phase::Idle,
            paused: false,
            pause_at_hit: false,
            pending: None,
            fade_started: None,
        }
    }

    pub fn with_tilt(mut self, tilt: impl TiltSource + 'static) -> Self {
        self.tilt = Some(Box::new(tilt));
        self
    }

    /// Publish to these flags instead of the process-wide ones
    pub fn with_status(mut self, status: Arc<StatusFlags>) -> Self {
        self.status = status;
        self
    }

    /// Apply new input flags, starting, stopping, pausing or replaying as needed
    pub fn set_inputs(&mut self, inputs: ControllerInputs) {
        let previous = self.inputs;
        self.inputs = inputs;

        // Moving or clearing the pause frame lets an automatic pause go
        let released = previous.pause_at_frame != inputs.pause_at_frame && self.pause_at_hit;
        if previous.pause_at_frame != inputs.pause_at_frame {
            self.pause_at_hit = false;
        }

        if let Some(frame) = inputs.render_frame {
            if previous.render_frame != Some(frame) {
                self.render_frame(frame);
            }
            return;
        }

        if previous.render_frame.is_some() {
            // Leaving replay: start a live run from scratch or fade the frozen one
            if inputs.wants_confetti() {
                self.start();
            } else {
                self.stop();
            }
        } else {
            match (self.phase, inputs.wants_confetti()) {
                (Phase::Idle | Phase::FadingOut, true) => self.start(),
                (Phase::Active, false) => self.stop(),
                _ => {}
            }
        }

        if released && !inputs.paused {
            self.resume();
        }

        if inputs.paused && !previous.paused {
            self.pause();
        } else if !inputs.paused && previous.paused {
            self.resume();
        }
    }

    /// Begin a fresh run. Without a geometry provider or primary surface this
    /// does nothing.
    pub fn start(&mut self) {
        if !self.can_run() {
            log::debug!("Confetti start ignored: missing geometry provider or primary surface");
            return;
        }
        self.reset();
        self.phase = Phase::Active;
        log::info!(
            "Confetti started ({} profile, seed {:#x}, target {})",
            self.config.profile.kind.as_str(),
            self.config.seed,
            self.config.target_count
        );

        if self.inputs.paused {
            self.paused = true;
            self.status.set_paused(true);
            self.render();
        } else {
            self.schedule();
        }
    }

    /// Stop spawning and fade out what's left
    pub fn stop(&mut self) {
        if self.phase != Phase::Active {
            return;
        }
        self.phase = Phase::FadingOut;
        self.fade_started = None;
        // Freeze fade-in so opacity only goes down from here
        sim::fade_out(&mut self.state, 0.0);
        self.paused = false;
        self.status.set_paused(false);
        log::info!("Confetti fading out ({} live)", self.state.particles.len());
        self.schedule();
    }

    /// Freeze on the current state. The next frame draws it and schedules nothing.
    pub fn pause(&mut self) {
        if self.phase != Phase::Active || self.paused {
            return;
        }
        self.paused = true;
        self.status.set_paused(true);
        log::debug!("Confetti paused at tick {}", self.state.tick);
        if self.pending.is_none() {
            self.render();
        }
    }

    pub fn resume(&mut self) {
        if !self.paused {
            return;
        }
        self.paused = false;
        self.status.set_paused(false);
        if self.phase != Phase::Idle {
            log::debug!("Confetti resumed at tick {}", self.state.tick);
            self.schedule();
        }
    }

    /// Deterministic replay: run `frame` ticks synchronously from a clean
    /// state, render once and stay paused. Tilt input is ignored.
    pub fn render_frame(&mut self, frame: u64) {
        if !self.can_run() {
            log::debug!("Replay ignored: missing geometry provider or primary surface");
            return;
        }
        self.reset();
        self.phase = Phase::Active;
        self.paused = true;

        let input = TickInput {
            tilt: None,
            spawning: true,
        };
        while self.state.tick < frame {
            if !sim::advance(&mut self.state, &mut self.resolver, &self.config, &input) {
                log::debug!("Replay stopped at tick {}: layout not measurable", self.state.tick);
                break;
            }
        }

        self.render();
        self.status.set_paused(true);
        let reached = self.state.tick == frame;
        self.status.set_ready(reached);
        if reached {
            log::info!(
                "Replayed {} frames ({} particles)",
                frame,
                self.state.particles.len()
            );
        }
    }

    /// Host callback for a fired frame at `now_ms` (monotonic milliseconds)
    pub fn on_frame(&mut self, now_ms: f64) {
        self.pending = None;
        if self.phase == Phase::Idle {
            return;
        }
        if self.paused {
            self.render();
            return;
        }

        let input = TickInput {
            tilt: self.tilt.as_mut().and_then(|t| t.sample()),
            spawning: self.phase == Phase::Active,
        };
        sim::advance(&mut self.state, &mut self.resolver, &self.config, &input);

        if self.phase == Phase::FadingOut {
            let started = *self.fade_started.get_or_insert(now_ms);
            let elapsed = now_ms - started;
            let progress = if self.config.fade_out_ms > 0.0 {
                (elapsed / self.config.fade_out_ms) as f32
            } else {
                1.0
            };
            let live = sim::fade_out(&mut self.state, progress);
            if elapsed >= self.config.fade_out_ms && live == 0 {
                self.finish();
                return;
            }
        }

        self.render();

        if self.phase == Phase::Active
            && !self.pause_at_hit
            && let Some(at) = self.inputs.pause_at_frame
            && self.state.tick >= at
        {
            self.pause_at_hit = true;
            self.paused = true;
            self.status.set_paused(true);
            self.status.set_ready(true);
            log::info!("Confetti paused at requested frame {}", at);
            return;
        }

        self.schedule();
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Ticks simulated in the current run
    pub fn frame(&self) -> u64 {
        self.state.tick
    }

    pub fn particle_count(&self) -> usize {
        self.state.particles.len()
    }

    pub fn particles(&self) -> &ParticleArena {
        &self.state.particles
    }

    pub fn geometry(&self) -> Option<&SceneGeometry> {
        self.resolver.current()
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn inputs(&self) -> ControllerInputs {
        self.inputs
    }

    pub fn status(&self) -> &Arc<StatusFlags> {
        &self.status
    }

    pub fn has_pending_frame(&self) -> bool {
        self.pending.is_some()
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            phase: self.phase,
            paused: self.paused,
            tick: self.state.tick,
            live_particles: self.state.particles.len(),
            spawned_total: self.state.spawned_total,
            status: self.status.snapshot(),
        }
    }

    fn can_run(&self) -> bool {
        self.resolver.has_provider() && self.surfaces.has_primary()
    }

    /// Back to tick 0: particles, counters, RNG, geometry and status
    fn reset(&mut self) {
        self.cancel_pending();
        self.state.reset();
        self.resolver.reset();
        self.paused = false;
        self.pause_at_hit = false;
        self.fade_started = None;
        self.status.reset();
    }

    /// Fade-out complete
    fn finish(&mut self) {
        self.cancel_pending();
        self.state.particles.clear();
        self.surfaces.clear_all();
        self.phase = Phase::Idle;
        log::info!("Confetti finished after {} ticks", self.state.tick);
    }

    fn render(&mut self) {
        composite(
            &mut self.surfaces,
            &self.state.particles,
            self.resolver.current(),
            &self.config.colors,
        );
        self.status.set_frame(self.state.tick);
    }

    fn schedule(&mut self) {
        if self.pending.is_none() {
            self.pending = Some(self.scheduler.request_frame());
        }
    }

    fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            self.scheduler.cancel_frame(handle);
        }
    }
}

impl Drop for ConfettiController {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
