use serde::{Deserialize, Serialize};

use crate::error::DriveError;
use crate::terrain::HazardRule;

/// Data-driven tuning for the driving simulation.
///
/// All rates are per nominal tick; `advance` scales them when a step covers
/// more or less than one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// Speed ceiling (units/tick).
    pub max_speed: f32,
    /// Unconditional throttle added every tick.
    pub acceleration: f32,
    /// Fraction of speed lost to sliding friction every tick.
    pub friction: f32,
    /// Heading change (radians/tick) at full steer lean.
    pub turn_rate: f32,
    /// Steer lean added per tick while a steering key is held.
    pub steer_step: f32,
    /// Steer lean removed per tick while no steering key is held.
    pub steer_decay: f32,
    /// Speed below (or at) which steering does not rotate the vehicle.
    pub steer_movement_threshold: f32,
    /// Turning gain added on top of `speed / max_speed`.
    pub steering_base_gain: f32,
    /// Whether the brake key decelerates the vehicle.
    pub brake_enabled: bool,
    /// Linear deceleration while braking.
    pub brake_deceleration: f32,
    /// Whether steering lean bleeds off speed.
    pub steer_drag_enabled: bool,
    /// Speed lost per tick at full steer lean when `steer_drag_enabled`.
    pub steer_drag: f32,
    /// Drivable world width.
    pub world_width: f32,
    /// Drivable world height.
    pub world_height: f32,
    /// Respawn position.
    pub start_x: f32,
    pub start_y: f32,
    /// Respawn heading (radians).
    pub start_heading: f32,
    /// Zero the steer lean on respawn.
    pub reset_steer_on_respawn: bool,
    /// Restart the flicker timer when a violation happens mid-flicker.
    pub rearm_flicker_on_violation: bool,
    /// How long the vehicle flickers after a reset (ms).
    pub flicker_duration_ms: u64,
    /// Length of one dim/bright flicker cycle (ms).
    pub flicker_period_ms: u64,
    /// Opacity for the first half of each flicker period.
    pub flicker_low_opacity: f32,
    /// Opacity for the second half, and outside of flicker.
    pub flicker_high_opacity: f32,
    /// Pixel rule that marks hazard terrain.
    pub hazard: HazardRule,
    /// Nominal tick rate the per-tick constants were tuned for.
    pub tick_rate_hz: f32,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            max_speed: 14.0,
            acceleration: 0.2,
            friction: 0.02,
            turn_rate: 0.05,
            steer_step: 0.1,
            steer_decay: 0.05,
            steer_movement_threshold: 0.1,
            steering_base_gain: 0.25,
            brake_enabled: true,
            brake_deceleration: 0.2,
            steer_drag_enabled: false,
            steer_drag: 0.05,
            world_width: 1280.0,
            world_height: 720.0,
            start_x: 640.0,
            start_y: 600.0,
            start_heading: 0.0,
            reset_steer_on_respawn: false,
            rearm_flicker_on_violation: true,
            flicker_duration_ms: 1500,
            flicker_period_ms: 200,
            flicker_low_opacity: 0.3,
            flicker_high_opacity: 1.0,
            hazard: HazardRule::default(),
            tick_rate_hz: 60.0,
        }
    }
}

impl DriveConfig {
    /// Tuning of the first, brake-only iteration of the game: instant
    /// steering, no threshold, no drag.
    pub fn classic() -> Self {
        Self {
            max_speed: 6.0,
            acceleration: 0.05,
            friction: 0.02,
            turn_rate: 0.04,
            steer_step: 1.0,
            steer_decay: 1.0,
            steer_movement_threshold: 0.0,
            steering_base_gain: 0.3,
            brake_enabled: true,
            brake_deceleration: 0.2,
            steer_drag_enabled: false,
            ..Self::default()
        }
    }

    /// Load config from environment or TOML file, falling back to defaults.
    pub fn load() -> Self {
        let path = std::env::var("SKIDPAN_DRIVE_CONFIG")
            .unwrap_or_else(|_| "config/drive.toml".to_string());
        match std::fs::read_to_string(&path) {
            Ok(content) => match Self::from_toml_str(&content) {
                Ok(cfg) => cfg,
                Err(e) => {
                    tracing::warn!("Failed to load {path}: {e}, using defaults");
                    Self::default()
                },
            },
            Err(_) => Self::default(),
        }
    }

    /// Parse and validate a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, DriveError> {
        let cfg: Self =
            toml::from_str(content).map_err(|e| DriveError::ConfigParse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject parameter combinations that would break the tick invariants.
    pub fn validate(&self) -> Result<(), DriveError> {
        fn check(ok: bool, what: &str) -> Result<(), DriveError> {
            if ok {
                Ok(())
            } else {
                Err(DriveError::InvalidConfig(what.to_string()))
            }
        }

        check(
            self.max_speed.is_finite() && self.max_speed > 0.0,
            "max_speed must be positive",
        )?;
        check(self.acceleration >= 0.0, "acceleration must be non-negative")?;
        check(
            (0.0..1.0).contains(&self.friction),
            "friction must be in [0, 1)",
        )?;
        check(self.turn_rate >= 0.0, "turn_rate must be non-negative")?;
        check(
            (0.0..=1.0).contains(&self.steer_step),
            "steer_step must be in [0, 1]",
        )?;
        check(
            (0.0..=1.0).contains(&self.steer_decay),
            "steer_decay must be in [0, 1]",
        )?;
        check(
            self.steer_movement_threshold >= 0.0,
            "steer_movement_threshold must be non-negative",
        )?;
        check(
            self.steering_base_gain >= 0.0,
            "steering_base_gain must be non-negative",
        )?;
        check(
            self.brake_deceleration >= 0.0,
            "brake_deceleration must be non-negative",
        )?;
        check(self.steer_drag >= 0.0, "steer_drag must be non-negative")?;
        check(
            self.world_width.is_finite()
                && self.world_width > 0.0
                && self.world_height.is_finite()
                && self.world_height > 0.0,
            "world dimensions must be positive",
        )?;
        check(
            (0.0..=self.world_width).contains(&self.start_x)
                && (0.0..=self.world_height).contains(&self.start_y),
            "start position must lie inside the world",
        )?;
        check(
            self.start_heading.is_finite(),
            "start_heading must be finite",
        )?;
        check(
            (0.0..=1.0).contains(&self.flicker_low_opacity)
                && (0.0..=1.0).contains(&self.flicker_high_opacity),
            "flicker opacities must be in [0, 1]",
        )?;
        check(self.tick_rate_hz > 0.0, "tick_rate_hz must be positive")?;
        Ok(())
    }
}
