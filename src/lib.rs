//! Card Confetti - deterministic confetti for card surfaces
//!
//! Core modules:
//! - `sim`: Deterministic simulation (geometry, spawning, physics, collisions)
//! - `renderer`: Layer compositing and render surface abstraction
//! - `controller`: Lifecycle controller (activation, fade, pause, replay)
//! - `platform`: Host abstraction (layout measurement, frame scheduling, tilt)
//! - `config`: Data-driven simulation config and variant profiles

pub mod config;
pub mod controller;
pub mod error;
pub mod platform;
pub mod renderer;
pub mod sim;
pub mod status;

pub use config::{ProfileKind, SimulationConfig, VariantProfile};
pub use controller::{ConfettiController, ControllerInputs, Phase};
pub use error::{ConfigError, ConfigResult};
pub use status::StatusFlags;

/// Engine constants
pub mod consts {
    /// Nominal tick duration in milliseconds (one tick per display refresh at 60 Hz)
    pub const TICK_MS: f64 = 1000.0 / 60.0;

    /// Hard cap on arena capacity regardless of configured target count
    pub const MAX_PARTICLES: usize = 512;

    /// Geometry is re-measured every this many ticks
    pub const GEOMETRY_REFRESH_TICKS: u64 = 60;

    /// Default fade-out duration after deactivation
    pub const FADE_OUT_MS: f64 = 800.0;

    /// Vertical speed (px/tick) below which floor contact becomes a landing
    pub const LANDING_THRESHOLD: f32 = 1.5;
    /// Horizontal velocity retained per tick while rolling on a floor
    pub const FLOOR_FRICTION: f32 = 0.96;
    /// Horizontal velocity retained on a floor bounce
    pub const FLOOR_BOUNCE_FRICTION: f32 = 0.95;
    /// Angular velocity retained per tick while landed
    pub const LANDED_SPIN_DAMPING: f32 = 0.9;

    /// Vertical tolerance (px) around the box top that counts as contact
    pub const BOX_LANDING_BAND: f32 = 8.0;
    /// Horizontal velocity retained per tick while resting on the box
    pub const BOX_FRICTION: f32 = 0.92;
    /// Fraction of gravity kept as a downward nudge on the box
    pub const BOX_GRAVITY_NUDGE: f32 = 0.2;

    /// Max relative perturbation applied to envelope bounces
    pub const ENVELOPE_JITTER: f32 = 0.1;

    /// Max deviation from straight up at spawn (radians, ~12 degrees)
    pub const SPAWN_ANGLE_DEVIATION: f32 = 0.21;
    /// Spawn band width (layout px) when there is no cutout
    pub const SPAWN_BAND_WIDTH: f32 = 60.0;

    /// Reflection size multiplier
    pub const MIRROR_SCALE: f32 = 1.5;

    /// Confetti rectangle height as a fraction of its width
    pub const CONFETTI_ASPECT: f32 = 0.6;
}

/// Ease-out quadratic on [0, 1]
#[inline]
pub fn ease_out_quad(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t) * (1.0 - t)
}

/// Ease-out cubic on [0, 1]
#[inline]
pub fn ease_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    let inv = 1.0 - t;
    1.0 - inv * inv * inv
}
