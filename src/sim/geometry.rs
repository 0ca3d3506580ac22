//! Scene geometry in simulation space
//!
//! Converts measured layout (container-relative, layout units) into device-pixel
//! collision surfaces: card bounds, box, envelope and the floor tiers.

use glam::Vec2;
use serde::Serialize;

use crate::config::Cutout;
use crate::consts::GEOMETRY_REFRESH_TICKS;
use crate::platform::{GeometryProvider, LayoutRect, LayoutSnapshot};

/// Slack when comparing a previous bottom edge against a floor
const FLOOR_EPSILON: f32 = 0.5;

/// Axis-aligned rectangle in simulation space
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Convert a layout rect into container-relative device pixels
    pub fn from_layout(rect: &LayoutRect, origin: &LayoutRect, dpr: f32) -> Self {
        let min = Vec2::new(rect.x - origin.x, rect.y - origin.y) * dpr;
        let max = Vec2::new(rect.right() - origin.x, rect.bottom() - origin.y) * dpr;
        Self { min, max }
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    #[inline]
    pub fn center_x(&self) -> f32 {
        (self.min.x + self.max.x) * 0.5
    }

    #[inline]
    pub fn contains_x(&self, x: f32) -> bool {
        x >= self.min.x && x <= self.max.x
    }

    pub fn contains(&self, p: Vec2) -> bool {
        self.contains_x(p.x) && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }
}

/// Floor tiers, in the order their landed flags are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FloorKind {
    Main,
    Cutout,
    Ledge,
}

impl FloorKind {
    pub const COUNT: usize = 3;

    #[inline]
    pub fn index(self) -> usize {
        match self {
            FloorKind::Main => 0,
            FloorKind::Cutout => 1,
            FloorKind::Ledge => 2,
        }
    }
}

/// A horizontal surface spanning `[min_x, max_x]` at height `y`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Floor {
    pub kind: FloorKind,
    pub y: f32,
    pub min_x: f32,
    pub max_x: f32,
}

impl Floor {
    #[inline]
    pub fn contains_x(&self, x: f32) -> bool {
        x >= self.min_x && x <= self.max_x
    }
}

/// Collision surfaces for one card
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneGeometry {
    pub card: Rect,
    pub box_rect: Option<Rect>,
    pub envelope: Option<Rect>,
    pub main_floor: Floor,
    /// Deeper floor inside a centered band
    pub cutout: Option<Floor>,
    pub ledge: Option<Floor>,
    pub dpr: f32,
}

impl SceneGeometry {
    /// Build geometry from a layout measurement
    pub fn from_layout(snapshot: &LayoutSnapshot, cutout: Option<Cutout>) -> Self {
        let dpr = if snapshot.device_pixel_ratio.is_finite() && snapshot.device_pixel_ratio > 0.0 {
            snapshot.device_pixel_ratio
        } else {
            1.0
        };
        let origin = &snapshot.container;
        let card = Rect::from_layout(origin, origin, dpr);
        let to_sim = |r: &LayoutRect| Rect::from_layout(r, origin, dpr);

        let main_y = snapshot
            .floor_marker
            .as_ref()
            .map(|m| to_sim(m).min.y.clamp(card.min.y, card.max.y))
            .unwrap_or(card.max.y);
        let main_floor = Floor {
            kind: FloorKind::Main,
            y: main_y,
            min_x: card.min.x,
            max_x: card.max.x,
        };

        let cutout = cutout.and_then(|c| {
            let half = (c.width * dpr * 0.5).min(card.width() * 0.5);
            let y = (main_y + c.depth * dpr).min(card.max.y);
            (half > 0.0 && y > main_y).then(|| Floor {
                kind: FloorKind::Cutout,
                y,
                min_x: card.center_x() - half,
                max_x: card.center_x() + half,
            })
        });

        let ledge = snapshot.ledge_marker.as_ref().map(|m| {
            let r = to_sim(m);
            Floor {
                kind: FloorKind::Ledge,
                y: r.min.y.clamp(card.min.y, main_y),
                min_x: r.min.x.max(card.min.x),
                max_x: r.max.x.min(card.max.x),
            }
        });

        Self {
            card,
            box_rect: snapshot.box_rect.as_ref().map(to_sim),
            envelope: snapshot.envelope.as_ref().map(to_sim),
            main_floor,
            cutout,
            ledge,
            dpr,
        }
    }

    /// Zero-area cards produce no particles
    pub fn is_degenerate(&self) -> bool {
        self.card.is_empty()
    }

    pub fn floor(&self, kind: FloorKind) -> Option<&Floor> {
        match kind {
            FloorKind::Main => Some(&self.main_floor),
            FloorKind::Cutout => self.cutout.as_ref(),
            FloorKind::Ledge => self.ledge.as_ref(),
        }
    }

    /// All floors, highest (smallest y) first
    pub fn floors(&self) -> Vec<Floor> {
        let mut floors: Vec<Floor> = [Some(self.main_floor), self.cutout, self.ledge]
            .into_iter()
            .flatten()
            .collect();
        floors.sort_by(|a, b| a.y.total_cmp(&b.y));
        floors
    }

    /// True when `x` lies in the cutout band
    pub fn in_cutout(&self, x: f32) -> bool {
        self.cutout.is_some_and(|c| c.contains_x(x))
    }

    /// Floor that applies at `x` for a particle whose bottom edge was at
    /// `prev_bottom` before this tick.
    ///
    /// A ledge only catches particles that were above it; inside the cutout
    /// band the deeper sub-floor replaces the main floor.
    pub fn floor_at(&self, x: f32, prev_bottom: f32) -> &Floor {
        if let Some(ledge) = &self.ledge
            && ledge.contains_x(x)
            && prev_bottom <= ledge.y + FLOOR_EPSILON
        {
            return ledge;
        }
        match &self.cutout {
            Some(cutout) if cutout.contains_x(x) => cutout,
            _ => &self.main_floor,
        }
    }

    /// Reflection axis for the mirrored layer
    pub fn mirror_line(&self) -> f32 {
        self.main_floor.y
    }

    /// Floor new particles are launched from
    pub fn spawn_floor(&self) -> &Floor {
        self.cutout.as_ref().unwrap_or(&self.main_floor)
    }

    /// Horizontal band new particles are launched from
    pub fn spawn_band(&self, band_width: f32) -> (f32, f32) {
        match &self.cutout {
            Some(c) => (c.min_x, c.max_x),
            None => {
                let half = (band_width * self.dpr * 0.5).min(self.card.width() * 0.5);
                (self.card.center_x() - half, self.card.center_x() + half)
            }
        }
    }

    /// Centered part of the box top that particles can land on
    pub fn box_landing_span(&self, fraction: f32) -> Option<(f32, f32)> {
        self.box_rect.map(|b| {
            let half = b.width() * fraction.clamp(0.0, 1.0) * 0.5;
            (b.center_x() - half, b.center_x() + half)
        })
    }
}

/// Polls a `GeometryProvider` and keeps the last good geometry
pub struct GeometryResolver {
    provider: Option<Box<dyn GeometryProvider>>,
    cutout: Option<Cutout>,
    current: Option<SceneGeometry>,
    last_refresh: Option<u64>,
    interval: u64,
}

impl GeometryResolver {
    pub fn new(provider: Option<Box<dyn GeometryProvider>>, cutout: Option<Cutout>) -> Self {
        Self {
            provider,
            cutout,
            current: None,
            last_refresh: None,
            interval: GEOMETRY_REFRESH_TICKS,
        }
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    pub fn current(&self) -> Option<&SceneGeometry> {
        self.current.as_ref()
    }

    /// Forget measured geometry (new activation)
    pub fn reset(&mut self) {
        self.current = None;
        self.last_refresh = None;
    }

    /// Refresh when `tick` is on the interval, or every tick until a first
    /// measurement succeeds. Returns the geometry to simulate against.
    pub fn refresh_if_due(&mut self, tick: u64) -> Option<&SceneGeometry> {
        let due = self.current.is_none() || tick % self.interval == 0;
        if due && self.last_refresh != Some(tick) {
            self.last_refresh = Some(tick);
            self.refresh();
        }
        self.current.as_ref()
    }

    /// Measure now; on failure the previous geometry stays in place
    pub fn refresh(&mut self) -> bool {
        let Some(provider) = self.provider.as_mut() else {
            return false;
        };
        match provider.measure() {
            Some(snapshot) => {
                let geometry = SceneGeometry::from_layout(&snapshot, self.cutout);
                log::debug!(
                    "Geometry refreshed: card {}x{} dpr {}",
                    geometry.card.width(),
                    geometry.card.height(),
                    geometry.dpr
                );
                self.current = Some(geometry);
                true
            }
            None => {
                log::debug!("Geometry unavailable, keeping last known");
                false
            }
        }
    }
}
