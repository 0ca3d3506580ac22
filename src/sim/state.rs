//! Particle and simulation state
//!
//! Everything a replay needs to be reproducible lives here: the seeded RNG,
//! the tick counter and the particle arena.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::Serialize;

use super::geometry::FloorKind;
use crate::config::SimulationConfig;
use crate::consts::MAX_PARTICLES;
use crate::ease_out_cubic;

/// Render layer picked for a particle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LayerKind {
    /// Behind the card
    Back,
    /// In front of the card
    Front,
}

/// A single confetti piece
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    pub rotation: f32,
    pub angular_vel: f32,
    /// Edge length in device pixels; collision radius is half of it
    pub size: f32,
    /// Index into the config palette
    pub color: u16,
    pub layer: LayerKind,
    pub blur_tier: Option<u8>,
    pub opacity: f32,
    pub fade_in_ticks: u32,
    pub fade_in_elapsed: u32,
    /// Fade-out progress in [0, 1]
    pub fade_out: f32,
    /// Opacity captured when the fade-out started
    pub fade_out_from: Option<f32>,
    /// Fraction of velocity kept on a bounce
    pub bounce_energy: f32,
    /// Per-tick velocity multiplier
    pub air_resistance: f32,
    /// Resting flags, indexed by `FloorKind::index`
    pub landed: [bool; FloorKind::COUNT],
    pub on_box: bool,
    /// Has been at or above its floor; floors ignore particles rising from below
    pub armed: bool,
    /// Bottom edge before the current tick's integration
    pub prev_bottom: f32,
    pub spawn_tick: u64,
}

impl Particle {
    pub fn new(pos: Vec2, vel: Vec2, size: f32, spawn_tick: u64) -> Self {
        Self {
            pos,
            vel,
            rotation: 0.0,
            angular_vel: 0.0,
            size,
            color: 0,
            layer: LayerKind::Back,
            blur_tier: None,
            opacity: 0.0,
            fade_in_ticks: 1,
            fade_in_elapsed: 0,
            fade_out: 0.0,
            fade_out_from: None,
            bounce_energy: 0.4,
            air_resistance: 0.99,
            landed: [false; FloorKind::COUNT],
            on_box: false,
            armed: false,
            prev_bottom: pos.y + size * 0.5,
            spawn_tick,
        }
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.size * 0.5
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.pos.y + self.radius()
    }

    pub fn is_landed(&self, kind: FloorKind) -> bool {
        self.landed[kind.index()]
    }

    pub fn is_resting(&self) -> bool {
        self.on_box || self.landed.iter().any(|&l| l)
    }

    pub fn clear_landed(&mut self) {
        self.landed = [false; FloorKind::COUNT];
    }

    pub fn is_fading_out(&self) -> bool {
        self.fade_out_from.is_some()
    }

    /// Step the fade-in ramp (ease-out cubic). Frozen once fading out.
    pub fn advance_fade_in(&mut self) {
        if self.is_fading_out() || self.fade_in_elapsed >= self.fade_in_ticks {
            return;
        }
        self.fade_in_elapsed += 1;
        let t = self.fade_in_elapsed as f32 / self.fade_in_ticks.max(1) as f32;
        self.opacity = ease_out_cubic(t).clamp(0.0, 1.0);
    }

    /// Scale opacity toward zero; progress never moves backwards
    pub fn apply_fade_out(&mut self, progress: f32) {
        let from = *self.fade_out_from.get_or_insert(self.opacity);
        self.fade_out = self.fade_out.max(progress.clamp(0.0, 1.0));
        self.opacity = (from * (1.0 - self.fade_out)).clamp(0.0, 1.0);
    }
}

/// Fixed-capacity particle pool addressed by slot index
#[derive(Debug, Clone)]
pub struct ParticleArena {
    slots: Vec<Option<Particle>>,
    live: usize,
}

impl ParticleArena {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
            live: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn is_full(&self) -> bool {
        self.live >= self.slots.len()
    }

    /// Place a particle in the first free slot
    pub fn insert(&mut self, particle: Particle) -> Option<usize> {
        let index = self.slots.iter().position(Option::is_none)?;
        self.slots[index] = Some(particle);
        self.live += 1;
        Some(index)
    }

    pub fn remove(&mut self, index: usize) -> Option<Particle> {
        let particle = self.slots.get_mut(index)?.take()?;
        self.live -= 1;
        Some(particle)
    }

    pub fn get(&self, index: usize) -> Option<&Particle> {
        self.slots.get(index)?.as_ref()
    }

    /// Live particles in slot order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Particle)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|p| (i, p)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut Particle)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_mut().map(|p| (i, p)))
    }

    /// Free every slot whose particle fails the predicate
    pub fn retain<F: FnMut(&Particle) -> bool>(&mut self, mut keep: F) {
        for slot in self.slots.iter_mut() {
            if slot.as_ref().is_some_and(|p| !keep(p)) {
                *slot = None;
                self.live -= 1;
            }
        }
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.live = 0;
    }
}

/// Complete simulation state for one activation
#[derive(Debug, Clone)]
pub struct SimState {
    pub seed: u64,
    pub rng: Pcg32,
    /// Ticks simulated since activation
    pub tick: u64,
    pub particles: ParticleArena,
    /// Particles created since activation
    pub spawned_total: u64,
}

impl SimState {
    pub fn new(config: &SimulationConfig) -> Self {
        let capacity = config.target_count.min(MAX_PARTICLES);
        Self {
            seed: config.seed,
            rng: Pcg32::seed_from_u64(config.seed),
            tick: 0,
            particles: ParticleArena::with_capacity(capacity),
            spawned_total: 0,
        }
    }

    /// Back to tick 0 with a freshly seeded RNG
    pub fn reset(&mut self) {
        self.rng = Pcg32::seed_from_u64(self.seed);
        self.tick = 0;
        self.particles.clear();
        self.spawned_total = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn particle() -> Particle {
        Particle::new(Vec2::new(10.0, 10.0), Vec2::ZERO, 8.0, 0)
    }

    #[test]
    fn test_arena_reuses_freed_slots() {
        let mut arena = ParticleArena::with_capacity(2);
        assert_eq!(arena.insert(particle()), Some(0));
        assert_eq!(arena.insert(particle()), Some(1));
        assert!(arena.is_full());
        assert_eq!(arena.insert(particle()), None);

        assert!(arena.remove(0).is_some());
        assert_eq!(arena.len(), 1);
        assert_eq!(arena.insert(particle()), Some(0));
        assert_eq!(arena.capacity(), 2);
    }

    #[test]
    fn test_arena_retain_and_clear() {
        let mut arena = ParticleArena::with_capacity(4);
        for i in 0..4 {
            let mut p = particle();
            p.spawn_tick = i;
            arena.insert(p);
        }
        arena.retain(|p| p.spawn_tick % 2 == 0);
        assert_eq!(arena.len(), 2);
        let slots: Vec<usize> = arena.iter().map(|(i, _)| i).collect();
        assert_eq!(slots, vec![0, 2]);

        arena.clear();
        assert!(arena.is_empty());
        assert!(arena.get(0).is_none());
    }

    #[test]
    fn test_fade_in_ramps_to_one() {
        let mut p = particle();
        p.fade_in_ticks = 10;
        let mut last = p.opacity;
        for _ in 0..15 {
            p.advance_fade_in();
            assert!(p.opacity >= last);
            last = p.opacity;
        }
        assert_eq!(p.opacity, 1.0);
    }

    #[test]
    fn test_fade_out_is_monotonic_and_freezes_fade_in() {
        let mut p = particle();
        p.fade_in_ticks = 10;
        p.advance_fade_in();
        let start = p.opacity;

        p.apply_fade_out(0.0);
        p.advance_fade_in();
        assert_eq!(p.opacity, start);

        p.apply_fade_out(0.5);
        assert!((p.opacity - start * 0.5).abs() < 1e-6);
        // Progress can't go backwards
        p.apply_fade_out(0.25);
        assert!((p.opacity - start * 0.5).abs() < 1e-6);
        p.apply_fade_out(1.0);
        assert_eq!(p.opacity, 0.0);
    }

    #[test]
    fn test_reset_reseeds_rng() {
        use rand::Rng;
        let config = SimulationConfig::default();
        let mut state = SimState::new(&config);
        let first: u32 = state.rng.random();
        state.tick = 50;
        state.reset();
        let again: u32 = state.rng.random();
        assert_eq!(first, again);
        assert_eq!(state.tick, 0);
    }
}
