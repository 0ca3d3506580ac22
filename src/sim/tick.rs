//! Fixed timestep simulation tick
//!
//! One tick = fade-in, spawn, integrate, collide, re-layer. Geometry refresh is
//! done by [`advance`] before anything else so every rule sees the same scene.

use super::collision::{self, CollisionParams};
use super::geometry::{GeometryResolver, SceneGeometry};
use super::layers;
use super::physics::{self, Forces};
use super::spawn;
use super::state::SimState;
use crate::config::SimulationConfig;

/// Per-tick host input
#[derive(Debug, Clone, Copy, Default)]
pub struct TickInput {
    /// Tilt sample in [-1, 1]; `None` when the host has no sensor (or in replay)
    pub tilt: Option<f32>,
    /// False while fading out
    pub spawning: bool,
}

/// Refresh geometry if due, then step. Returns false when the tick was skipped
/// because no geometry could be measured yet.
pub fn advance(
    state: &mut SimState,
    resolver: &mut GeometryResolver,
    config: &SimulationConfig,
    input: &TickInput,
) -> bool {
    match resolver.refresh_if_due(state.tick) {
        Some(geometry) => {
            step(state, geometry, config, input);
            true
        }
        None => false,
    }
}

/// Advance the simulation by one fixed timestep
pub fn step(
    state: &mut SimState,
    geometry: &SceneGeometry,
    config: &SimulationConfig,
    input: &TickInput,
) {
    // Existing particles fade in before new ones appear, so a fresh spawn is
    // drawn once at zero opacity
    for (_, particle) in state.particles.iter_mut() {
        particle.advance_fade_in();
    }

    if input.spawning {
        spawn::spawn(state, geometry, config);
    }

    let profile = &config.profile;
    let settled = state.tick >= config.tilt_settle_ticks;
    let forces = Forces::new(
        config.gravity,
        profile.gravity_scale,
        geometry.dpr,
        input.tilt,
        config.tilt_force,
        settled,
    );
    let params = CollisionParams::new(profile, forces.gravity, geometry.dpr);

    let rng = &mut state.rng;
    for (_, particle) in state.particles.iter_mut() {
        physics::integrate(particle, &forces);
        collision::resolve(particle, geometry, &params, rng);
        layers::update_layer(&profile.layer_policy, particle, geometry);
    }

    state.tick += 1;
}

/// Scale every particle's opacity by fade-out progress in [0, 1] and drop the
/// ones that are fully transparent. Returns the live count.
pub fn fade_out(state: &mut SimState, progress: f32) -> usize {
    for (_, particle) in state.particles.iter_mut() {
        particle.apply_fade_out(progress);
    }
    state.particles.retain(|p| p.fade_out < 1.0);
    state.particles.len()
}
