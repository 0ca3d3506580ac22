//! Render surface abstraction
//!
//! The compositor only talks to [`RenderSurface`]. Hosts implement it over
//! whatever they draw with; [`RecordingSurface`] keeps the draw calls for
//! headless capture and tests.

use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec2;
use serde::Serialize;

use crate::config::Color;

/// One confetti piece as drawn, in device pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sprite {
    pub center: Vec2,
    /// Edge length; hosts draw a rectangle of `size x size * CONFETTI_ASPECT`
    pub size: f32,
    pub rotation: f32,
    pub color: Color,
    pub opacity: f32,
}

/// Something confetti can be drawn onto
pub trait RenderSurface {
    /// Erase everything drawn so far
    fn clear(&mut self);
    fn draw(&mut self, sprite: &Sprite);

    /// Match the drawing area to the card, in device pixels. Called before
    /// every frame; surfaces without a backing store ignore it.
    fn resize(&mut self, _width: u32, _height: u32) {}
}

/// What a [`RecordingSurface`] has seen since its last clear
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Recording {
    pub clears: u32,
    pub sprites: Vec<Sprite>,
    /// Last size requested by the compositor
    pub size: Option<(u32, u32)>,
}

/// Headless surface that records draw calls.
///
/// Clones share the same recording, so a host can hand one clone to the
/// controller and read the other back.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    inner: Rc<RefCell<Recording>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recording(&self) -> Recording {
        self.inner.borrow().clone()
    }

    pub fn sprites(&self) -> Vec<Sprite> {
        self.inner.borrow().sprites.clone()
    }

    pub fn clears(&self) -> u32 {
        self.inner.borrow().clears
    }

    /// Cleared and nothing drawn since
    pub fn is_blank(&self) -> bool {
        self.inner.borrow().sprites.is_empty()
    }
}

impl RenderSurface for RecordingSurface {
    fn clear(&mut self) {
        let mut inner = self.inner.borrow_mut();
        inner.clears += 1;
        inner.sprites.clear();
    }

    fn draw(&mut self, sprite: &Sprite) {
        self.inner.borrow_mut().sprites.push(*sprite);
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.inner.borrow_mut().size = Some((width, height));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sprite() -> Sprite {
        Sprite {
            center: Vec2::new(10.0, 20.0),
            size: 8.0,
            rotation: 0.5,
            color: Color::new(255, 0, 0),
            opacity: 1.0,
        }
    }

    #[test]
    fn test_clones_share_recording() {
        let handle = RecordingSurface::new();
        let mut surface = handle.clone();
        surface.draw(&sprite());
        surface.draw(&sprite());
        assert_eq!(handle.sprites().len(), 2);

        surface.clear();
        assert!(handle.is_blank());
        assert_eq!(handle.clears(), 1);
    }

    #[test]
    fn test_recording_serializes() {
        let mut surface = RecordingSurface::new();
        surface.draw(&sprite());
        let json = serde_json::to_string(&surface.recording()).unwrap();
        assert!(json.contains("#ff0000"));
    }
}
