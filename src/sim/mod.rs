//! Deterministic simulation module
//!
//! Everything that decides where confetti goes lives here. This module must be
//! pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by arena slot)
//! - No rendering or platform dependencies beyond the geometry provider trait

pub mod collision;
pub mod geometry;
pub mod layers;
pub mod physics;
pub mod spawn;
pub mod state;
pub mod tick;

pub use collision::{Claimed, CollisionParams};
pub use geometry::{Floor, FloorKind, GeometryResolver, Rect, SceneGeometry};
pub use physics::Forces;
pub use state::{LayerKind, Particle, ParticleArena, SimState};
pub use tick::{TickInput, advance, fade_out, step};
