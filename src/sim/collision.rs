//! Collision detection and response for card geometry
//!
//! Rules run in a fixed order: box, envelope, floor, outer bounds. A rule that
//! resolves an axis claims it, and later rules leave that axis alone.

use glam::Vec2;
use rand::Rng;

use super::geometry::{FloorKind, SceneGeometry};
use super::state::Particle;
use crate::config::VariantProfile;
use crate::consts::*;

/// Axes already resolved this tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Claimed {
    pub x: bool,
    pub y: bool,
}

/// Collision tuning for one tick, in device pixels
#[derive(Debug, Clone, Copy)]
pub struct CollisionParams {
    pub landing_threshold: f32,
    pub box_collision: bool,
    pub box_landing_fraction: f32,
    pub box_band: f32,
    /// Downward speed kept by particles resting on the box
    pub box_nudge: f32,
}

impl CollisionParams {
    pub fn new(profile: &VariantProfile, gravity: f32, dpr: f32) -> Self {
        Self {
            landing_threshold: LANDING_THRESHOLD * dpr,
            box_collision: profile.box_collision,
            box_landing_fraction: profile.box_landing_fraction,
            box_band: BOX_LANDING_BAND * dpr,
            box_nudge: gravity * BOX_GRAVITY_NUDGE,
        }
    }
}

/// Run every rule for one particle
pub fn resolve<R: Rng>(
    particle: &mut Particle,
    geometry: &SceneGeometry,
    params: &CollisionParams,
    rng: &mut R,
) -> Claimed {
    let mut claimed = Claimed::default();
    if params.box_collision {
        box_collision(particle, geometry, params, &mut claimed);
    }
    envelope_collision(particle, geometry, rng, &mut claimed);
    floor_collision(particle, geometry, params, &mut claimed);
    bounds_collision(particle, geometry, &mut claimed);
    clamp_to_card(particle, geometry);
    claimed
}

/// Reflect one velocity component so it points along `sign`, keeping `energy`
#[inline]
fn bounce_component(v: f32, sign: f32, energy: f32) -> f32 {
    v.abs() * energy * sign
}

/// Land on (or roll along) the centered top band of the box
pub fn box_collision(
    particle: &mut Particle,
    geometry: &SceneGeometry,
    params: &CollisionParams,
    claimed: &mut Claimed,
) {
    let (Some(b), Some((lo, hi))) = (
        geometry.box_rect,
        geometry.box_landing_span(params.box_landing_fraction),
    ) else {
        particle.on_box = false;
        return;
    };
    let top = b.min.y;
    let in_span = particle.pos.x >= lo && particle.pos.x <= hi;

    if particle.on_box && !in_span {
        // Rolled off the edge: free fall again
        particle.on_box = false;
        return;
    }

    let bottom = particle.bottom();
    let touching = particle.on_box
        || (particle.vel.y >= 0.0
            && in_span
            && particle.prev_bottom <= top + params.box_band
            && bottom >= top - params.box_band);
    if !touching {
        return;
    }

    particle.pos.y = top - particle.radius();
    particle.vel.y = (particle.vel.y * BOX_GRAVITY_NUDGE).clamp(0.0, params.box_nudge);
    particle.vel.x *= BOX_FRICTION;
    particle.angular_vel *= LANDED_SPIN_DAMPING;
    particle.on_box = true;
    claimed.y = true;
}

/// Keep particles that were inside the envelope bouncing off its inner walls
pub fn envelope_collision<R: Rng>(
    particle: &mut Particle,
    geometry: &SceneGeometry,
    rng: &mut R,
    claimed: &mut Claimed,
) {
    let Some(env) = geometry.envelope else {
        return;
    };
    let previous = particle.pos - particle.vel;
    if !env.contains(previous) {
        return;
    }
    let r = particle.radius();
    let base = particle.bounce_energy;
    let mut energy = || base * (1.0 + (rng.random::<f32>() * 2.0 - 1.0) * ENVELOPE_JITTER);

    let mut vel = particle.vel;
    let mut pos = particle.pos;
    if !claimed.x {
        if pos.x < env.min.x + r {
            pos.x = env.min.x + r;
            vel.x = bounce_component(vel.x, 1.0, energy());
            claimed.x = true;
        } else if pos.x > env.max.x - r {
            pos.x = env.max.x - r;
            vel.x = bounce_component(vel.x, -1.0, energy());
            claimed.x = true;
        }
    }
    if !claimed.y {
        if pos.y < env.min.y + r {
            pos.y = env.min.y + r;
            vel.y = bounce_component(vel.y, 1.0, energy());
            claimed.y = true;
        } else if pos.y > env.max.y - r {
            pos.y = env.max.y - r;
            vel.y = bounce_component(vel.y, -1.0, energy());
            claimed.y = true;
        }
    }
    particle.pos = pos;
    particle.vel = vel;
}

/// Bounce off or land on the floor under the particle
pub fn floor_collision(
    particle: &mut Particle,
    geometry: &SceneGeometry,
    params: &CollisionParams,
    claimed: &mut Claimed,
) {
    let r = particle.radius();
    let main_y = geometry.main_floor.y;

    // Inside the notch the cutout band acts as walls
    if let Some(cutout) = geometry.cutout
        && !claimed.x
        && particle.bottom() > main_y
        && particle.prev_bottom > main_y
    {
        let lo = cutout.min_x + r;
        let hi = (cutout.max_x - r).max(lo);
        if particle.pos.x < lo {
            particle.pos.x = lo;
            particle.vel.x = bounce_component(particle.vel.x, 1.0, particle.bounce_energy);
            claimed.x = true;
        } else if particle.pos.x > hi {
            particle.pos.x = hi;
            particle.vel.x = bounce_component(particle.vel.x, -1.0, particle.bounce_energy);
            claimed.x = true;
        }
    }

    if claimed.y {
        // Something else is holding it up
        particle.clear_landed();
        return;
    }

    let floor = *geometry.floor_at(particle.pos.x, particle.prev_bottom);

    // Rolled off whatever floor it was resting on
    for kind in [FloorKind::Main, FloorKind::Cutout, FloorKind::Ledge] {
        if kind != floor.kind {
            particle.landed[kind.index()] = false;
        }
    }

    if !particle.armed {
        if particle.bottom() <= floor.y {
            particle.armed = true;
        } else {
            return;
        }
    }

    if particle.is_landed(floor.kind) {
        particle.pos.y = floor.y - r;
        particle.vel.y = 0.0;
        particle.vel.x *= FLOOR_FRICTION;
        particle.angular_vel *= LANDED_SPIN_DAMPING;
        claimed.y = true;
        return;
    }

    if particle.bottom() < floor.y {
        return;
    }

    particle.pos.y = floor.y - r;
    if particle.vel.y >= 0.0 {
        if particle.vel.y < params.landing_threshold {
            particle.landed[floor.kind.index()] = true;
            particle.vel.y = 0.0;
            particle.vel.x *= FLOOR_FRICTION;
        } else {
            particle.vel.y = -particle.vel.y * particle.bounce_energy;
            particle.vel.x *= FLOOR_BOUNCE_FRICTION;
        }
    }
    claimed.y = true;
}

/// Bounce off the card's own edges
pub fn bounds_collision(particle: &mut Particle, geometry: &SceneGeometry, claimed: &mut Claimed) {
    let card = &geometry.card;
    let r = particle.radius();
    let energy = particle.bounce_energy;

    if !claimed.x {
        if particle.pos.x < card.min.x + r {
            particle.pos.x = card.min.x + r;
            particle.vel.x = bounce_component(particle.vel.x, 1.0, energy);
            claimed.x = true;
        } else if particle.pos.x > card.max.x - r {
            particle.pos.x = card.max.x - r;
            particle.vel.x = bounce_component(particle.vel.x, -1.0, energy);
            claimed.x = true;
        }
    }
    if !claimed.y {
        if particle.pos.y < card.min.y + r {
            particle.pos.y = card.min.y + r;
            particle.vel.y = bounce_component(particle.vel.y, 1.0, energy);
            claimed.y = true;
        } else if particle.pos.y > card.max.y - r {
            particle.pos.y = card.max.y - r;
            particle.vel.y = bounce_component(particle.vel.y, -1.0, energy);
            claimed.y = true;
        }
    }
}

/// Hard clamp so every particle ends the tick inside the card and above its floor
pub fn clamp_to_card(particle: &mut Particle, geometry: &SceneGeometry) {
    let card = &geometry.card;
    let r = particle.radius();
    let x_lo = card.min.x + r;
    let x_hi = (card.max.x - r).max(x_lo);
    let y_lo = card.min.y + r;
    let y_hi = if particle.armed {
        geometry.floor_at(particle.pos.x, particle.prev_bottom).y - r
    } else {
        card.max.y - r
    };
    particle.pos = Vec2::new(
        particle.pos.x.clamp(x_lo, x_hi),
        particle.pos.y.clamp(y_lo, y_hi.max(y_lo)),
    );
}
