//! Layer compositor
//!
//! Routes every live particle to its surface each frame:
//! - back layer to the primary surface
//! - front layer to the front surface (primary when there is none)
//! - blur-tier particles to their tier surface when the host supplied one
//! - every particle again, reflected about the floor, to the mirror surface

use super::surface::{RenderSurface, Sprite};
use crate::config::Color;
use crate::consts::MIRROR_SCALE;
use crate::sim::{LayerKind, Particle, ParticleArena, SceneGeometry};

const FALLBACK_COLOR: Color = Color::new(0xff, 0xff, 0xff);

/// Surfaces owned by one controller
#[derive(Default)]
pub struct SurfaceSet {
    /// Back layer; without it nothing is drawn
    pub primary: Option<Box<dyn RenderSurface>>,
    pub front: Option<Box<dyn RenderSurface>>,
    pub mirror: Option<Box<dyn RenderSurface>>,
    /// One surface per blur tier, index = tier
    pub blur: Vec<Box<dyn RenderSurface>>,
}

impl SurfaceSet {
    pub fn new(primary: impl RenderSurface + 'static) -> Self {
        Self {
            primary: Some(Box::new(primary)),
            ..Self::default()
        }
    }

    pub fn with_front(mut self, front: impl RenderSurface + 'static) -> Self {
        self.front = Some(Box::new(front));
        self
    }

    pub fn with_mirror(mut self, mirror: impl RenderSurface + 'static) -> Self {
        self.mirror = Some(Box::new(mirror));
        self
    }

    pub fn with_blur_tier(mut self, tier: impl RenderSurface + 'static) -> Self {
        self.blur.push(Box::new(tier));
        self
    }

    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    /// Size every surface to `width x height` device pixels
    pub fn resize_all(&mut self, width: u32, height: u32) {
        for surface in self.iter_mut() {
            surface.resize(width, height);
        }
    }

    pub fn clear_all(&mut self) {
        for surface in self.iter_mut() {
            surface.clear();
        }
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn RenderSurface>> {
        self.primary
            .iter_mut()
            .chain(self.front.iter_mut())
            .chain(self.mirror.iter_mut())
            .chain(self.blur.iter_mut())
    }

    /// Surface a particle draws to
    fn target(&mut self, particle: &Particle) -> Option<&mut Box<dyn RenderSurface>> {
        if let Some(tier) = particle.blur_tier
            && (tier as usize) < self.blur.len()
        {
            return self.blur.get_mut(tier as usize);
        }
        match particle.layer {
            LayerKind::Front if self.front.is_some() => self.front.as_mut(),
            _ => self.primary.as_mut(),
        }
    }
}

/// Sprite for a particle, colored from the palette
pub fn sprite_for(particle: &Particle, palette: &[Color]) -> Sprite {
    Sprite {
        center: particle.pos,
        size: particle.size,
        rotation: particle.rotation,
        color: palette
            .get(particle.color as usize)
            .copied()
            .unwrap_or(FALLBACK_COLOR),
        opacity: particle.opacity,
    }
}

/// Reflection about the horizontal line `y = mirror_line`
pub fn mirrored(sprite: &Sprite, mirror_line: f32) -> Sprite {
    let mut reflected = *sprite;
    reflected.center.y = mirror_line + (mirror_line - sprite.center.y);
    reflected.size = sprite.size * MIRROR_SCALE;
    reflected.rotation = -sprite.rotation;
    reflected.opacity = 1.0;
    reflected
}

/// Clear every surface and draw all live particles in slot order
pub fn composite(
    surfaces: &mut SurfaceSet,
    particles: &ParticleArena,
    geometry: Option<&SceneGeometry>,
    palette: &[Color],
) {
    if !surfaces.has_primary() {
        return;
    }
    if let Some(geometry) = geometry {
        let card = &geometry.card;
        surfaces.resize_all(card.width().round() as u32, card.height().round() as u32);
    }
    surfaces.clear_all();

    let mirror_line = geometry.map(SceneGeometry::mirror_line);
    for (_, particle) in particles.iter() {
        let sprite = sprite_for(particle, palette);
        if let Some(surface) = surfaces.target(particle) {
            surface.draw(&sprite);
        }
        if let (Some(mirror), Some(line)) = (surfaces.mirror.as_mut(), mirror_line) {
            mirror.draw(&mirrored(&sprite, line));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{LayoutRect, LayoutSnapshot};
    use crate::renderer::RecordingSurface;
    use glam::Vec2;

    fn particle(layer: LayerKind, blur_tier: Option<u8>) -> Particle {
        let mut p = Particle::new(Vec2::new(100.0, 400.0), Vec2::ZERO, 8.0, 0);
        p.layer = layer;
        p.blur_tier = blur_tier;
        p.opacity = 0.5;
        p.rotation = 0.3;
        p
    }

    fn geometry() -> SceneGeometry {
        let mut snap = LayoutSnapshot::container(300.0, 540.0);
        snap.floor_marker = Some(LayoutRect::new(0.0, 500.0, 300.0, 2.0));
        SceneGeometry::from_layout(&snap, None)
    }

    #[test]
    fn test_layers_route_to_their_surfaces() {
        let back = RecordingSurface::new();
        let front = RecordingSurface::new();
        let mut surfaces = SurfaceSet::new(back.clone()).with_front(front.clone());

        let mut arena = ParticleArena::with_capacity(4);
        arena.insert(particle(LayerKind::Back, None));
        arena.insert(particle(LayerKind::Front, None));
        arena.insert(particle(LayerKind::Front, None));

        composite(&mut surfaces, &arena, Some(&geometry()), &[]);
        assert_eq!(back.sprites().len(), 1);
        assert_eq!(front.sprites().len(), 2);
        assert_eq!(front.sprites()[0].color, FALLBACK_COLOR);
    }

    #[test]
    fn test_front_falls_back_to_primary() {
        let back = RecordingSurface::new();
        let mut surfaces = SurfaceSet::new(back.clone());
        let mut arena = ParticleArena::with_capacity(2);
        arena.insert(particle(LayerKind::Front, None));
        composite(&mut surfaces, &arena, None, &[]);
        assert_eq!(back.sprites().len(), 1);
    }

    #[test]
    fn test_blur_tier_routing() {
        let back = RecordingSurface::new();
        let tier0 = RecordingSurface::new();
        let mut surfaces = SurfaceSet::new(back.clone()).with_blur_tier(tier0.clone());
        let mut arena = ParticleArena::with_capacity(2);
        arena.insert(particle(LayerKind::Back, Some(0)));
        // No surface for tier 2, draws on its layer instead
        arena.insert(particle(LayerKind::Back, Some(2)));
        composite(&mut surfaces, &arena, None, &[]);
        assert_eq!(tier0.sprites().len(), 1);
        assert_eq!(back.sprites().len(), 1);
    }

    #[test]
    fn test_mirror_reflects_about_floor() {
        let back = RecordingSurface::new();
        let mirror = RecordingSurface::new();
        let mut surfaces = SurfaceSet::new(back.clone()).with_mirror(mirror.clone());
        let mut arena = ParticleArena::with_capacity(1);
        arena.insert(particle(LayerKind::Back, None));
        composite(&mut surfaces, &arena, Some(&geometry()), &[]);

        let m = mirror.sprites()[0];
        assert_eq!(m.center.y, 600.0);
        assert_eq!(m.size, 12.0);
        assert_eq!(m.opacity, 1.0);
        assert_eq!(m.rotation, -0.3);
    }

    #[test]
    fn test_each_frame_clears_first() {
        let back = RecordingSurface::new();
        let mirror = RecordingSurface::new();
        let mut surfaces = SurfaceSet::new(back.clone()).with_mirror(mirror.clone());
        let mut arena = ParticleArena::with_capacity(1);
        arena.insert(particle(LayerKind::Back, None));
        composite(&mut surfaces, &arena, None, &[]);
        composite(&mut surfaces, &arena, None, &[]);
        assert_eq!(back.sprites().len(), 1);
        assert_eq!(back.clears(), 2);
        assert_eq!(mirror.clears(), 2);
    }

    #[test]
    fn test_surfaces_sized_to_card_in_device_pixels() {
        let back = RecordingSurface::new();
        let tier0 = RecordingSurface::new();
        let mut surfaces = SurfaceSet::new(back.clone()).with_blur_tier(tier0.clone());
        let arena = ParticleArena::with_capacity(1);

        composite(&mut surfaces, &arena, None, &[]);
        assert_eq!(back.recording().size, None);

        let mut snap = LayoutSnapshot::container(300.0, 540.0);
        snap.device_pixel_ratio = 2.0;
        let retina = SceneGeometry::from_layout(&snap, None);
        composite(&mut surfaces, &arena, Some(&retina), &[]);
        assert_eq!(back.recording().size, Some((600, 1080)));
        assert_eq!(tier0.recording().size, Some((600, 1080)));
    }

    #[test]
    fn test_no_primary_draws_nothing() {
        let mirror = RecordingSurface::new();
        let mut surfaces = SurfaceSet::default().with_mirror(mirror.clone());
        let mut arena = ParticleArena::with_capacity(1);
        arena.insert(particle(LayerKind::Back, None));
        composite(&mut surfaces, &arena, Some(&geometry()), &[]);
        assert_eq!(mirror.clears(), 0);
    }
}
