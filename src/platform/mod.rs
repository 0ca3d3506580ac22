//! Platform abstraction layer
//!
//! The engine never reaches into a UI toolkit. Hosts supply:
//! - Layout measurement (`GeometryProvider`)
//! - Frame scheduling (`FrameScheduler`)
//! - Ambient tilt input (`TiltSource`)
//!
//! `web` implements all three for a browser page with 2D canvases.

#[cfg(target_arch = "wasm32")]
pub mod web;

use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in layout units (CSS px on the web)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LayoutRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl LayoutRect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// One measurement of the collaborating elements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutSnapshot {
    /// Scene container; defines the card bounds
    pub container: LayoutRect,
    /// Box the card sits in (particles can land on its top edge)
    #[serde(default)]
    pub box_rect: Option<LayoutRect>,
    /// Main floor marker (its top edge is the floor)
    #[serde(default)]
    pub floor_marker: Option<LayoutRect>,
    /// Alternate ledge floor marker
    #[serde(default)]
    pub ledge_marker: Option<LayoutRect>,
    /// Envelope particles bounce around inside
    #[serde(default)]
    pub envelope: Option<LayoutRect>,
    pub device_pixel_ratio: f32,
}

impl LayoutSnapshot {
    /// Container only, DPR 1
    pub fn container(width: f32, height: f32) -> Self {
        Self {
            container: LayoutRect::new(0.0, 0.0, width, height),
            box_rect: None,
            floor_marker: None,
            ledge_marker: None,
            envelope: None,
            device_pixel_ratio: 1.0,
        }
    }
}

/// Source of layout measurements, polled by the geometry resolver
pub trait GeometryProvider {
    /// Measure current layout; `None` while elements aren't attached yet
    fn measure(&mut self) -> Option<LayoutSnapshot>;
}

/// Provider returning the same layout every time (headless capture, tests)
#[derive(Debug, Clone)]
pub struct FixedLayout(pub LayoutSnapshot);

impl GeometryProvider for FixedLayout {
    fn measure(&mut self) -> Option<LayoutSnapshot> {
        Some(self.0.clone())
    }
}

/// Opaque id of a scheduled frame callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub i32);

/// Schedules one callback per display refresh
///
/// The host calls `ConfettiController::on_frame` when a requested frame fires.
pub trait FrameScheduler {
    fn request_frame(&mut self) -> FrameHandle;
    fn cancel_frame(&mut self, handle: FrameHandle);
}

/// Ambient tilt sampled once per tick
pub trait TiltSource {
    /// Horizontal tilt in [-1, 1], `None` when unavailable
    fn sample(&mut self) -> Option<f32>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_rect_edges() {
        let r = LayoutRect::new(10.0, 20.0, 30.0, 40.0);
        assert_eq!(r.right(), 40.0);
        assert_eq!(r.bottom(), 60.0);
        assert!(!r.is_empty());
        assert!(LayoutRect::new(0.0, 0.0, 0.0, 10.0).is_empty());
    }

    #[test]
    fn test_fixed_layout_always_measures() {
        let mut provider = FixedLayout(LayoutSnapshot::container(300.0, 540.0));
        assert_eq!(provider.measure().unwrap().container.height, 540.0);
        assert!(provider.measure().is_some());
    }

    #[test]
    fn test_snapshot_json_optional_fields() {
        let snap: LayoutSnapshot = serde_json::from_str(
            r#"{ "container": { "x": 0, "y": 0, "width": 300, "height": 540 }, "device_pixel_ratio": 2 }"#,
        )
        .unwrap();
        assert!(snap.box_rect.is_none());
        assert_eq!(snap.device_pixel_ratio, 2.0);
    }
}
