//! Shape generation for confetti quads

use glam::Vec2;

use super::surface::{RenderSurface, Sprite};
use super::vertex::Vertex;
use crate::consts::CONFETTI_ASPECT;

/// Two triangles for a rotated confetti rectangle
pub fn confetti_quad(sprite: &Sprite) -> [Vertex; 6] {
    let half = Vec2::new(sprite.size, sprite.size * CONFETTI_ASPECT) * 0.5;
    let rot = Vec2::from_angle(sprite.rotation);
    let corner = |x: f32, y: f32| {
        let p = sprite.center + rot.rotate(Vec2::new(x, y));
        Vertex::new(p.x, p.y, sprite.color.to_rgba(sprite.opacity))
    };

    let tl = corner(-half.x, -half.y);
    let tr = corner(half.x, -half.y);
    let br = corner(half.x, half.y);
    let bl = corner(-half.x, half.y);

    [tl, bl, tr, tr, bl, br]
}

/// Surface that tessellates sprites into a vertex list for GPU hosts
#[derive(Debug, Clone, Default)]
pub struct QuadBatch {
    vertices: Vec<Vertex>,
}

impl QuadBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn quad_count(&self) -> usize {
        self.vertices.len() / 6
    }

    /// Raw bytes ready for a vertex buffer upload
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }
}

impl RenderSurface for QuadBatch {
    fn clear(&mut self) {
        self.vertices.clear();
    }

    fn draw(&mut self, sprite: &Sprite) {
        // Fully transparent pieces add nothing to the frame
        if sprite.opacity <= 0.0 {
            return;
        }
        self.vertices.extend_from_slice(&confetti_quad(sprite));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Color;

    fn sprite(rotation: f32, opacity: f32) -> Sprite {
        Sprite {
            center: Vec2::new(50.0, 50.0),
            size: 10.0,
            rotation,
            color: Color::new(255, 255, 255),
            opacity,
        }
    }

    fn extent(quad: &[Vertex; 6], axis: usize) -> f32 {
        let values = quad.iter().map(|v| v.position[axis]);
        let max = values.clone().fold(f32::MIN, f32::max);
        let min = values.fold(f32::MAX, f32::min);
        max - min
    }

    #[test]
    fn test_unrotated_quad_extents() {
        let quad = confetti_quad(&sprite(0.0, 1.0));
        assert!((extent(&quad, 0) - 10.0).abs() < 1e-4);
        assert!((extent(&quad, 1) - 6.0).abs() < 1e-4);
    }

    #[test]
    fn test_quarter_turn_swaps_extents() {
        let quad = confetti_quad(&sprite(std::f32::consts::FRAC_PI_2, 1.0));
        assert!((extent(&quad, 0) - 6.0).abs() < 1e-3);
        assert!((extent(&quad, 1) - 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_batch_skips_invisible_and_clears() {
        let mut batch = QuadBatch::new();
        batch.draw(&sprite(0.0, 0.5));
        batch.draw(&sprite(0.0, 0.0));
        assert_eq!(batch.quad_count(), 1);
        assert_eq!(batch.as_bytes().len(), 6 * Vertex::STRIDE);
        assert_eq!(batch.vertices()[0].color[3], 0.5);

        batch.clear();
        assert!(batch.vertices().is_empty());
    }
}
