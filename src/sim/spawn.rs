//! Particle spawner
//!
//! Spawns along an ease-out rate ramp, launching pieces from the floor with an
//! eruption speed boost that decays over the first ticks.

use glam::Vec2;
use rand::Rng;
use std::f32::consts::TAU;

use super::geometry::SceneGeometry;
use super::layers;
use super::state::{Particle, SimState};
use crate::config::{Eruption, SimulationConfig, SpawnRamp};
use crate::consts::{SPAWN_ANGLE_DEVIATION, SPAWN_BAND_WIDTH};
use crate::ease_out_quad;

/// Expected spawns per tick at `tick`:
/// `initial + (max - initial) * (1 - (1 - t/window)^2)`, t clamped to the window
pub fn spawn_rate(tick: u64, ramp: &SpawnRamp) -> f32 {
    if ramp.window_ticks == 0 {
        return ramp.max_rate;
    }
    let t = (tick as f32 / ramp.window_ticks as f32).min(1.0);
    ramp.initial_rate + (ramp.max_rate - ramp.initial_rate) * ease_out_quad(t)
}

/// Launch speed multiplier, decaying linearly from `max_boost` to 1.0
pub fn eruption_boost(tick: u64, eruption: &Eruption) -> f32 {
    if tick >= eruption.window_ticks as u64 {
        return 1.0;
    }
    let remaining = 1.0 - tick as f32 / eruption.window_ticks as f32;
    1.0 + (eruption.max_boost - 1.0) * remaining
}

/// Whole part of the rate always spawns, the fraction is a coin flip
fn spawns_this_tick<R: Rng>(rate: f32, rng: &mut R) -> usize {
    let rate = rate.max(0.0);
    let whole = rate.floor();
    let extra = rng.random::<f32>() < rate - whole;
    whole as usize + usize::from(extra)
}

/// Spawn this tick's particles. Returns how many were created.
pub fn spawn(state: &mut SimState, geometry: &SceneGeometry, config: &SimulationConfig) -> usize {
    let target = config.target_count.min(state.particles.capacity());
    if geometry.is_degenerate() || state.particles.len() >= target {
        return 0;
    }

    let wanted = spawns_this_tick(spawn_rate(state.tick, &config.spawn_ramp), &mut state.rng);
    let room = target - state.particles.len();
    let mut spawned = 0;
    for _ in 0..wanted.min(room) {
        let particle = launch(&mut state.rng, state.tick, geometry, config);
        if state.particles.insert(particle).is_none() {
            break;
        }
        state.spawned_total += 1;
        spawned += 1;
    }
    spawned
}

/// Build one particle on the spawn floor
fn launch<R: Rng>(
    rng: &mut R,
    tick: u64,
    geometry: &SceneGeometry,
    config: &SimulationConfig,
) -> Particle {
    let profile = &config.profile;
    let dpr = geometry.dpr;
    let floor = geometry.spawn_floor();
    let (band_lo, band_hi) = geometry.spawn_band(SPAWN_BAND_WIDTH);

    let size = config.size.sample(rng) * dpr;
    let radius = size * 0.5;
    let card = &geometry.card;
    let x = band_lo + (band_hi - band_lo) * rng.random::<f32>();
    let x = x.clamp(card.min.x + radius, (card.max.x - radius).max(card.min.x + radius));
    let pos = Vec2::new(x, floor.y - radius);

    let speed = config.speed.sample(rng) * dpr * eruption_boost(tick, &profile.eruption);
    let deviation = (rng.random::<f32>() * 2.0 - 1.0) * SPAWN_ANGLE_DEVIATION;
    let mut vel = Vec2::new(deviation.sin(), -deviation.cos()) * speed;
    vel.x += config.drift * speed * (rng.random::<f32>() * 2.0 - 1.0);

    let mut particle = Particle::new(pos, vel, size, tick);
    // Starts on its floor, so the floor holds it from the first tick
    particle.armed = true;
    particle.rotation = rng.random::<f32>() * TAU;
    particle.angular_vel = config.rotation.sample(rng);
    particle.color = if config.colors.is_empty() {
        0
    } else {
        rng.random_range(0..config.colors.len()) as u16
    };
    particle.bounce_energy = profile.bounce_energy.sample(rng);
    particle.air_resistance = profile.air_resistance.sample(rng);
    particle.fade_in_ticks = config.fade_in_ticks.sample(rng).max(1);
    particle.layer = layers::initial_layer(&profile.layer_policy, &particle, geometry, rng);
    particle.blur_tier = layers::blur_tier(profile, rng);
    particle
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProfileKind, SpawnRamp};
    use crate::platform::LayoutSnapshot;
    use proptest::prelude::*;

    fn ramp() -> SpawnRamp {
        SpawnRamp {
            initial_rate: 0.2,
            max_rate: 1.5,
            window_ticks: 90,
        }
    }

    #[test]
    fn test_rate_starts_at_initial_and_reaches_max() {
        let ramp = ramp();
        assert_eq!(spawn_rate(0, &ramp), 0.2);
        assert!((spawn_rate(90, &ramp) - 1.5).abs() < 1e-6);
        assert!((spawn_rate(1_000, &ramp) - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_zero_window_is_max_rate() {
        let ramp = SpawnRamp {
            window_ticks: 0,
            ..ramp()
        };
        assert_eq!(spawn_rate(0, &ramp), 1.5);
    }

    #[test]
    fn test_eruption_decays_to_one() {
        let eruption = Eruption {
            max_boost: 3.0,
            window_ticks: 30,
        };
        assert_eq!(eruption_boost(0, &eruption), 3.0);
        assert!((eruption_boost(15, &eruption) - 2.0).abs() < 1e-6);
        assert_eq!(eruption_boost(30, &eruption), 1.0);
        assert_eq!(eruption_boost(500, &eruption), 1.0);
    }

    proptest! {
        #[test]
        fn prop_rate_is_non_decreasing(
            initial in 0.0f32..2.0,
            extra in 0.0f32..3.0,
            window in 1u32..500,
            t in 0u64..1_000,
        ) {
            let ramp = SpawnRamp { initial_rate: initial, max_rate: initial + extra, window_ticks: window };
            let a = spawn_rate(t, &ramp);
            let b = spawn_rate(t + 1, &ramp);
            prop_assert!(b >= a);
            prop_assert!(a >= initial && a <= initial + extra + 1e-4);
        }

        #[test]
        fn prop_boost_is_non_increasing(max in 1.0f32..5.0, window in 1u32..200, t in 0u64..400) {
            let eruption = Eruption { max_boost: max, window_ticks: window };
            prop_assert!(eruption_boost(t + 1, &eruption) <= eruption_boost(t, &eruption));
            prop_assert!(eruption_boost(t, &eruption) >= 1.0);
        }
    }

    fn geometry() -> SceneGeometry {
        let mut snap = LayoutSnapshot::container(300.0, 540.0);
        snap.floor_marker = Some(crate::platform::LayoutRect::new(0.0, 500.0, 300.0, 2.0));
        SceneGeometry::from_layout(&snap, ProfileKind::Boxed.profile().cutout)
    }

    #[test]
    fn test_spawned_particles_sit_on_spawn_floor() {
        let config = SimulationConfig::default();
        let geo = geometry();
        let mut state = SimState::new(&config);
        for _ in 0..60 {
            spawn(&mut state, &geo, &config);
            state.tick += 1;
        }
        assert!(!state.particles.is_empty());
        let floor = geo.spawn_floor();
        let (lo, hi) = geo.spawn_band(SPAWN_BAND_WIDTH);
        for (_, p) in state.particles.iter() {
            assert!((p.bottom() - floor.y).abs() < 1e-3);
            assert!(p.pos.x >= lo - p.radius() && p.pos.x <= hi + p.radius());
            assert!(p.vel.y < 0.0, "launched upward");
            assert_eq!(p.opacity, 0.0);
            assert!(p.armed);
            assert!((p.color as usize) < config.colors.len());
        }
    }

    #[test]
    fn test_spawn_stops_at_target() {
        let config = SimulationConfig {
            target_count: 10,
            spawn_ramp: SpawnRamp {
                initial_rate: 4.0,
                max_rate: 4.0,
                window_ticks: 0,
            },
            ..SimulationConfig::default()
        };
        let geo = geometry();
        let mut state = SimState::new(&config);
        for _ in 0..20 {
            spawn(&mut state, &geo, &config);
            state.tick += 1;
        }
        assert_eq!(state.particles.len(), 10);
        assert_eq!(state.spawned_total, 10);
    }

    #[test]
    fn test_degenerate_geometry_spawns_nothing() {
        let config = SimulationConfig::default();
        let geo = SceneGeometry::from_layout(&LayoutSnapshot::container(0.0, 0.0), None);
        let mut state = SimState::new(&config);
        assert_eq!(spawn(&mut state, &geo, &config), 0);

        let zero = SimulationConfig {
            target_count: 0,
            ..SimulationConfig::default()
        };
        let mut state = SimState::new(&zero);
        assert_eq!(spawn(&mut state, &geometry(), &zero), 0);
    }

    #[test]
    fn test_early_particles_are_faster() {
        let config = SimulationConfig {
            speed: crate::config::FloatRange::new(10.0, 10.0),
            drift: 0.0,
            ..SimulationConfig::default()
        };
        let geo = geometry();
        let mut rng = rand_pcg::Pcg32::new(1, 1);
        let early = launch(&mut rng, 0, &geo, &config).vel.length();
        let late = launch(&mut rng, 1_000, &geo, &config).vel.length();
        assert!((early - 25.0).abs() < 1e-3);
        assert!((late - 10.0).abs() < 1e-3);
    }
}
