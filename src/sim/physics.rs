//! Point-mass integration
//!
//! Explicit Euler at the nominal tick, no substepping.

use super::state::Particle;

/// Per-tick forces shared by every particle
#[derive(Debug, Clone, Copy, Default)]
pub struct Forces {
    /// Vertical acceleration (device px per tick squared)
    pub gravity: f32,
    /// Horizontal acceleration from tilt, already gated on the settle ticks
    pub tilt: f32,
}

impl Forces {
    /// Gravity scaled by the profile and DPR; tilt only after settling
    pub fn new(
        gravity: f32,
        gravity_scale: f32,
        dpr: f32,
        tilt_sample: Option<f32>,
        tilt_force: f32,
        settled: bool,
    ) -> Self {
        let tilt = match tilt_sample {
            Some(t) if settled => t.clamp(-1.0, 1.0) * tilt_force * dpr,
            _ => 0.0,
        };
        Self {
            gravity: gravity * gravity_scale * dpr,
            tilt,
        }
    }
}

/// Advance one particle by one tick
pub fn integrate(particle: &mut Particle, forces: &Forces) {
    particle.prev_bottom = particle.bottom();

    particle.vel *= particle.air_resistance;
    particle.vel.y += forces.gravity;
    particle.vel.x += forces.tilt;

    particle.pos += particle.vel;
    particle.rotation += particle.angular_vel;
}
