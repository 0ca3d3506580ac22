//! Simulation config and variant profiles
//!
//! Supplied once at activation and read-only for the rest of the run.
//! Deserializable from JSON so hosts can ship tuned presets.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// An sRGB color parsed from `#rrggbb`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn parse_hex(s: &str) -> ConfigResult<Self> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(ConfigError::BadColor(s.to_string()));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| ConfigError::BadColor(s.to_string()))
        };
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// CSS `rgba()` string for 2D canvas hosts
    pub fn to_css(&self, alpha: f32) -> String {
        format!("rgba({}, {}, {}, {:.3})", self.r, self.g, self.b, alpha)
    }

    /// Normalized RGBA for vertex colors
    pub fn to_rgba(&self, alpha: f32) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            alpha,
        ]
    }
}

impl TryFrom<String> for Color {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse_hex(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

/// Inclusive float range sampled uniformly
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FloatRange {
    pub min: f32,
    pub max: f32,
}

impl FloatRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Uniform sample; a collapsed range returns `min`
    pub fn sample<R: Rng>(&self, rng: &mut R) -> f32 {
        self.min + (self.max - self.min) * rng.random::<f32>()
    }

    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }

    fn check(&self, field: &'static str) -> ConfigResult<()> {
        if !self.min.is_finite() || !self.max.is_finite() || self.min > self.max {
            return Err(ConfigError::Invalid {
                field,
                reason: format!("expected min <= max, got {}..{}", self.min, self.max),
            });
        }
        Ok(())
    }
}

/// Inclusive tick range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickRange {
    pub min: u32,
    pub max: u32,
}

impl TickRange {
    pub fn sample<R: Rng>(&self, rng: &mut R) -> u32 {
        if self.max <= self.min {
            self.min
        } else {
            rng.random_range(self.min..=self.max)
        }
    }
}

/// Spawn-rate ramp (spawns per tick)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnRamp {
    pub initial_rate: f32,
    pub max_rate: f32,
    /// Ticks until the rate reaches `max_rate`
    pub window_ticks: u32,
}

/// Initial velocity burst
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Eruption {
    /// Speed multiplier at tick 0
    pub max_boost: f32,
    /// Ticks over which the multiplier decays linearly to 1.0
    pub window_ticks: u32,
}

/// Notch below the main floor, centered on the container (layout px)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cutout {
    pub width: f32,
    pub depth: f32,
}

/// How particles pick their render layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayerPolicy {
    /// Fixed random split decided at spawn
    Split { front_probability: f32 },
    /// Above the box top renders to back, at or below renders to front
    BoxRelative,
}

/// Named variant profiles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    /// Card sitting in a box: box landing, cutout floor, box-relative layers
    #[default]
    Boxed,
    /// Open card with depth of field: blur tiers, random layer split
    Depth,
}

impl ProfileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileKind::Boxed => "boxed",
            ProfileKind::Depth => "depth",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "boxed" | "box" => Some(ProfileKind::Boxed),
            "depth" | "dof" => Some(ProfileKind::Depth),
            _ => None,
        }
    }

    pub fn profile(&self) -> VariantProfile {
        match self {
            ProfileKind::Boxed => VariantProfile::boxed(),
            ProfileKind::Depth => VariantProfile::depth(),
        }
    }
}

/// Per-variant tuning. The two presets intentionally keep different
/// bounce, drag and eruption bands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantProfile {
    pub kind: ProfileKind,
    pub eruption: Eruption,
    /// Fraction of velocity kept on a bounce
    pub bounce_energy: FloatRange,
    /// Per-tick velocity multiplier
    pub air_resistance: FloatRange,
    /// Multiplier on the config gravity (<1 floatier, >1 heavier)
    pub gravity_scale: f32,
    pub box_collision: bool,
    /// Centered fraction of the box width particles can land on
    pub box_landing_fraction: f32,
    pub cutout: Option<Cutout>,
    pub blur_tiers: u8,
    pub layer_policy: LayerPolicy,
}

impl VariantProfile {
    pub fn boxed() -> Self {
        Self {
            kind: ProfileKind::Boxed,
            eruption: Eruption {
                max_boost: 2.5,
                window_ticks: 45,
            },
            bounce_energy: FloatRange::new(0.3, 0.5),
            air_resistance: FloatRange::new(0.985, 0.992),
            gravity_scale: 1.0,
            box_collision: true,
            box_landing_fraction: 0.7,
            cutout: Some(Cutout {
                width: 60.0,
                depth: 24.0,
            }),
            blur_tiers: 0,
            layer_policy: LayerPolicy::BoxRelative,
        }
    }

    pub fn depth() -> Self {
        Self {
            kind: ProfileKind::Depth,
            eruption: Eruption {
                max_boost: 3.2,
                window_ticks: 30,
            },
            bounce_energy: FloatRange::new(0.4, 0.6),
            air_resistance: FloatRange::new(0.98, 0.99),
            gravity_scale: 0.8,
            box_collision: false,
            box_landing_fraction: 0.7,
            cutout: None,
            blur_tiers: 3,
            layer_policy: LayerPolicy::Split {
                front_probability: 0.5,
            },
        }
    }
}

impl Default for VariantProfile {
    fn default() -> Self {
        Self::boxed()
    }
}

/// Immutable per-run simulation config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub colors: Vec<Color>,
    /// RNG seed; identical seeds replay identically
    pub seed: u64,
    pub target_count: usize,
    /// Launch speed (layout px per tick)
    pub speed: FloatRange,
    /// Horizontal drift as a fraction of launch speed
    pub drift: f32,
    /// Gravity (layout px per tick squared)
    pub gravity: f32,
    /// Confetti edge length (layout px)
    pub size: FloatRange,
    /// Angular velocity (radians per tick)
    pub rotation: FloatRange,
    pub spawn_ramp: SpawnRamp,
    pub fade_in_ticks: TickRange,
    pub fade_out_ms: f64,
    /// Tilt input is ignored before this tick
    pub tilt_settle_ticks: u64,
    /// Horizontal acceleration per unit of tilt
    pub tilt_force: f32,
    pub profile: VariantProfile,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            colors: vec![
                Color::new(0xff, 0x5c, 0x8a),
                Color::new(0xff, 0xc8, 0x3d),
                Color::new(0x4d, 0xd4, 0xac),
                Color::new(0x5b, 0x8d, 0xef),
                Color::new(0xb0, 0x7c, 0xf2),
            ],
            seed: 0x5eed,
            target_count: 120,
            speed: FloatRange::new(8.0, 14.0),
            drift: 0.25,
            gravity: 0.35,
            size: FloatRange::new(6.0, 12.0),
            rotation: FloatRange::new(-0.2, 0.2),
            spawn_ramp: SpawnRamp {
                initial_rate: 0.2,
                max_rate: 1.5,
                window_ticks: 90,
            },
            fade_in_ticks: TickRange { min: 10, max: 30 },
            fade_out_ms: crate::consts::FADE_OUT_MS,
            tilt_settle_ticks: 120,
            tilt_force: 0.05,
            profile: VariantProfile::default(),
        }
    }
}

impl SimulationConfig {
    /// Default config carrying a named profile
    pub fn for_profile(kind: ProfileKind) -> Self {
        Self {
            profile: kind.profile(),
            ..Self::default()
        }
    }

    /// Parse and validate a JSON config
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.colors.is_empty() {
            return Err(ConfigError::Invalid {
                field: "colors",
                reason: "palette is empty".into(),
            });
        }
        for (field, value) in [
            ("drift", self.drift),
            ("gravity", self.gravity),
            ("tilt_force", self.tilt_force),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be finite, got {value}"),
                });
            }
        }
        self.speed.check("speed")?;
        self.size.check("size")?;
        self.rotation.check("rotation")?;
        self.profile.bounce_energy.check("profile.bounce_energy")?;
        self.profile.air_resistance.check("profile.air_resistance")?;

        if self.size.min <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "size",
                reason: "sizes must be positive".into(),
            });
        }
        let ramp = &self.spawn_ramp;
        if ramp.initial_rate < 0.0 || ramp.max_rate < ramp.initial_rate {
            return Err(ConfigError::Invalid {
                field: "spawn_ramp",
                reason: format!(
                    "expected 0 <= initial_rate <= max_rate, got {} and {}",
                    ramp.initial_rate, ramp.max_rate
                ),
            });
        }
        if self.fade_in_ticks.min == 0 || self.fade_in_ticks.min > self.fade_in_ticks.max {
            return Err(ConfigError::Invalid {
                field: "fade_in_ticks",
                reason: "expected 1 <= min <= max".into(),
            });
        }
        if self.fade_out_ms.is_nan() || self.fade_out_ms < 0.0 {
            return Err(ConfigError::Invalid {
                field: "fade_out_ms",
                reason: "must be non-negative".into(),
            });
        }
        let profile = &self.profile;
        if profile.bounce_energy.min < 0.0 || profile.bounce_energy.max > 1.0 {
            return Err(ConfigError::Invalid {
                field: "profile.bounce_energy",
                reason: "must lie within [0, 1]".into(),
            });
        }
        if profile.air_resistance.min <= 0.0 || profile.air_resistance.max > 1.0 {
            return Err(ConfigError::Invalid {
                field: "profile.air_resistance",
                reason: "must lie within (0, 1]".into(),
            });
        }
        if profile.eruption.max_boost < 1.0 {
            return Err(ConfigError::Invalid {
                field: "profile.eruption.max_boost",
                reason: "boost below 1.0 would slow the eruption".into(),
            });
        }
        if !(0.0..=1.0).contains(&profile.box_landing_fraction) {
            return Err(ConfigError::Invalid {
                field: "profile.box_landing_fraction",
                reason: "must lie within [0, 1]".into(),
            });
        }
        if let LayerPolicy::Split { front_probability } = profile.layer_policy
            && !(0.0..=1.0).contains(&front_probability)
        {
            return Err(ConfigError::Invalid {
                field: "profile.layer_policy.front_probability",
                reason: "must lie within [0, 1]".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_hex_parsing() {
        let c = Color::parse_hex("#FF5c8a").unwrap();
        assert_eq!(c, Color::new(0xff, 0x5c, 0x8a));
        assert_eq!(c.to_hex(), "#ff5c8a");
        assert!(Color::parse_hex("#12345").is_err());
        assert!(Color::parse_hex("#zzzzzz").is_err());
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
        assert!(SimulationConfig::for_profile(ProfileKind::Depth).validate().is_ok());
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = SimulationConfig::from_json(
            r##"{ "seed": 7, "target_count": 50, "colors": ["#ffffff"] }"##,
        )
        .unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.target_count, 50);
        assert_eq!(config.colors, vec![Color::new(255, 255, 255)]);
        assert_eq!(config.profile.kind, ProfileKind::Boxed);
    }

    #[test]
    fn test_from_json_rejects_bad_ranges() {
        let err = SimulationConfig::from_json(r#"{ "speed": { "min": 5.0, "max": 1.0 } }"#);
        assert!(matches!(err, Err(ConfigError::Invalid { field: "speed", .. })));

        let err = SimulationConfig::from_json(r#"{ "colors": ["red"] }"#);
        assert!(matches!(err, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_validate_rejects_non_finite_values() {
        let config = SimulationConfig {
            gravity: f32::NAN,
            ..SimulationConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field: "gravity", .. })));

        let config = SimulationConfig {
            size: FloatRange::new(f32::NAN, 8.0),
            ..SimulationConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field: "size", .. })));
    }

    #[test]
    fn test_json_round_trip_keeps_profile() {
        let config = SimulationConfig::for_profile(ProfileKind::Depth);
        let json = config.to_json().unwrap();
        let back = SimulationConfig::from_json(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_profile_lookup() {
        assert_eq!(ProfileKind::from_str("DOF"), Some(ProfileKind::Depth));
        assert_eq!(ProfileKind::from_str("boxed"), Some(ProfileKind::Boxed));
        assert_eq!(ProfileKind::from_str("nope"), None);
        assert_eq!(ProfileKind::Depth.profile().blur_tiers, 3);
        assert!(ProfileKind::Boxed.profile().box_collision);
    }

    #[test]
    fn test_profiles_keep_distinct_bands() {
        let boxed = VariantProfile::boxed();
        let depth = VariantProfile::depth();
        assert_ne!(boxed.bounce_energy, depth.bounce_energy);
        assert_ne!(boxed.air_resistance, depth.air_resistance);
        assert_ne!(boxed.eruption.window_ticks, depth.eruption.window_ticks);
    }
}
