//! Render layer assignment
//!
//! Decided inside the simulation so layers are part of the reproducible state.
//! The compositor only routes particles to surfaces.

use rand::Rng;

use super::geometry::SceneGeometry;
use super::state::{LayerKind, Particle};
use crate::config::{LayerPolicy, VariantProfile};

/// Layer chosen at spawn
pub fn initial_layer<R: Rng>(
    policy: &LayerPolicy,
    particle: &Particle,
    geometry: &SceneGeometry,
    rng: &mut R,
) -> LayerKind {
    match policy {
        LayerPolicy::Split { front_probability } => {
            if rng.random::<f32>() < *front_probability {
                LayerKind::Front
            } else {
                LayerKind::Back
            }
        }
        LayerPolicy::BoxRelative => box_relative_layer(particle, geometry),
    }
}

/// Above the box top renders behind the card, at or below renders in front.
/// Without a box everything stays in front.
pub fn box_relative_layer(particle: &Particle, geometry: &SceneGeometry) -> LayerKind {
    match &geometry.box_rect {
        Some(b) if particle.bottom() < b.min.y => LayerKind::Back,
        _ => LayerKind::Front,
    }
}

/// Re-evaluate dynamic layers after the particle moved
pub fn update_layer(policy: &LayerPolicy, particle: &mut Particle, geometry: &SceneGeometry) {
    if matches!(policy, LayerPolicy::BoxRelative) {
        particle.layer = box_relative_layer(particle, geometry);
    }
}

/// Random blur tier for depth-of-field profiles
pub fn blur_tier<R: Rng>(profile: &VariantProfile, rng: &mut R) -> Option<u8> {
    (profile.blur_tiers > 0).then(|| rng.random_range(0..profile.blur_tiers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{LayoutRect, LayoutSnapshot};
    use glam::Vec2;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn boxed_geometry() -> SceneGeometry {
        let mut snap = LayoutSnapshot::container(300.0, 540.0);
        snap.box_rect = Some(LayoutRect::new(50.0, 300.0, 200.0, 200.0));
        SceneGeometry::from_layout(&snap, None)
    }

    #[test]
    fn test_box_relative_layer() {
        let geo = boxed_geometry();
        let above = Particle::new(Vec2::new(150.0, 100.0), Vec2::ZERO, 8.0, 0);
        let below = Particle::new(Vec2::new(150.0, 400.0), Vec2::ZERO, 8.0, 0);
        assert_eq!(box_relative_layer(&above, &geo), LayerKind::Back);
        assert_eq!(box_relative_layer(&below, &geo), LayerKind::Front);
    }

    #[test]
    fn test_update_layer_follows_motion() {
        let geo = boxed_geometry();
        let mut p = Particle::new(Vec2::new(150.0, 400.0), Vec2::ZERO, 8.0, 0);
        update_layer(&LayerPolicy::BoxRelative, &mut p, &geo);
        assert_eq!(p.layer, LayerKind::Front);
        p.pos.y = 50.0;
        update_layer(&LayerPolicy::BoxRelative, &mut p, &geo);
        assert_eq!(p.layer, LayerKind::Back);

        // Split layers are fixed at spawn
        let split = LayerPolicy::Split {
            front_probability: 1.0,
        };
        p.layer = LayerKind::Front;
        update_layer(&split, &mut p, &geo);
        assert_eq!(p.layer, LayerKind::Front);
    }

    #[test]
    fn test_split_extremes() {
        let geo = boxed_geometry();
        let p = Particle::new(Vec2::new(150.0, 100.0), Vec2::ZERO, 8.0, 0);
        let mut rng = Pcg32::seed_from_u64(1);
        let all_front = LayerPolicy::Split {
            front_probability: 1.0,
        };
        let all_back = LayerPolicy::Split {
            front_probability: 0.0,
        };
        for _ in 0..20 {
            assert_eq!(initial_layer(&all_front, &p, &geo, &mut rng), LayerKind::Front);
            assert_eq!(initial_layer(&all_back, &p, &geo, &mut rng), LayerKind::Back);
        }
    }

    #[test]
    fn test_blur_tier_range() {
        let mut rng = Pcg32::seed_from_u64(3);
        let depth = VariantProfile::depth();
        for _ in 0..50 {
            let tier = blur_tier(&depth, &mut rng).unwrap();
            assert!(tier < depth.blur_tiers);
        }
        assert_eq!(blur_tier(&VariantProfile::boxed(), &mut rng), None);
    }
}
