pub mod config;
pub mod error;
pub mod physics;
pub mod reset;
pub mod terrain;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use skidpan_core::input::InputSnapshot;
use skidpan_core::render::{Frame, Point, Pose};
use skidpan_core::sim_trait::{SimEvent, SimMetadata, Simulation};
use skidpan_core::simulation_boilerplate;

use config::DriveConfig;
use error::DriveError;
use terrain::{Surface, SurfaceQuery, TerrainMask, Verdict};

pub use reset::VisualState;

/// The player's vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub x: f32,
    pub y: f32,
    /// Radians; never normalized.
    pub heading: f32,
    /// In `[0, max_speed]` after every tick.
    pub speed: f32,
    /// Normalized steering lean in `[-1, 1]`.
    pub steer_input: f32,
    pub visual: VisualState,
}

impl Vehicle {
    /// A stationary vehicle at the configured start pose.
    pub fn at_start(config: &DriveConfig) -> Self {
        Self {
            x: config.start_x,
            y: config.start_y,
            heading: config.start_heading,
            speed: 0.0,
            steer_input: 0.0,
            visual: VisualState::Normal,
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn pose(&self) -> Pose {
        Pose {
            position: self.position(),
            heading: self.heading,
        }
    }
}

/// Serializable simulation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveState {
    pub vehicle: Vehicle,
    /// Ticks simulated since start.
    pub tick: u64,
    /// Number of terrain resets so far.
    pub resets: u32,
    /// Surface the vehicle was on at the end of the last tick, before any
    /// reset.
    pub last_surface: Surface,
}

impl DriveState {
    fn at_start(config: &DriveConfig) -> Self {
        Self {
            vehicle: Vehicle::at_start(config),
            tick: 0,
            resets: 0,
            last_surface: Surface::Drivable,
        }
    }
}

/// Single-vehicle driving simulation: motion, then terrain check, then
/// reset on violation.
pub struct DriveSim {
    state: DriveState,
    terrain: Arc<TerrainMask>,
    paused: bool,
    config: DriveConfig,
}

impl DriveSim {
    /// Simulation with config loaded from the environment or
    /// `config/drive.toml`.
    pub fn new(terrain: Arc<TerrainMask>) -> Self {
        Self::with_config(DriveConfig::load(), terrain)
    }

    /// Expects a config that passes `DriveConfig::validate`. Use
    /// `try_with_config` for tuning from an untrusted source.
    pub fn with_config(config: DriveConfig, terrain: Arc<TerrainMask>) -> Self {
        Self {
            state: DriveState::at_start(&config),
            terrain,
            paused: false,
            config,
        }
    }

    /// Like `with_config`, but rejects tuning that would break the tick
    /// invariants.
    pub fn try_with_config(
        config: DriveConfig,
        terrain: Arc<TerrainMask>,
    ) -> Result<Self, DriveError> {
        config.validate()?;
        Ok(Self::with_config(config, terrain))
    }

    /// Bake RGBA8 terrain pixels with the config's hazard rule.
    pub fn from_rgba(
        config: DriveConfig,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> Result<Self, DriveError> {
        let mask = TerrainMask::from_rgba(width, height, pixels, &config.hazard)?;
        Self::try_with_config(config, Arc::new(mask))
    }

    /// Load a terrain image and bake it with the config's hazard rule.
    #[cfg(feature = "image")]
    pub fn open_terrain<P: AsRef<std::path::Path>>(
        config: DriveConfig,
        path: P,
    ) -> Result<Self, DriveError> {
        let mask = TerrainMask::open(path, &config.hazard)?;
        Self::try_with_config(config, Arc::new(mask))
    }

    pub fn state(&self) -> &DriveState {
        &self.state
    }

    pub fn vehicle(&self) -> &Vehicle {
        &self.state.vehicle
    }

    pub fn config(&self) -> &DriveConfig {
        &self.config
    }

    pub fn terrain(&self) -> &Arc<TerrainMask> {
        &self.terrain
    }

    /// Put the vehicle back at the start with fresh counters.
    pub fn restart(&mut self) {
        self.state = DriveState::at_start(&self.config);
        self.paused = false;
    }

    pub fn is_flickering(&self, now_ms: u64) -> bool {
        self.state.vehicle.visual.is_flickering(now_ms)
    }

    pub fn flicker_opacity(&self, now_ms: u64) -> f32 {
        reset::flicker_opacity(&self.state.vehicle.visual, now_ms, &self.config)
    }

    /// Classify the committed position and reset on violation.
    fn check_terrain(&mut self, now_ms: u64) -> Option<SimEvent> {
        let vehicle = &mut self.state.vehicle;
        let surface = self.terrain.surface_at(vehicle.x, vehicle.y);
        self.state.last_surface = surface;
        if terrain::classify(vehicle.x, vehicle.y, self.terrain.as_ref()) == Verdict::Drivable {
            return None;
        }

        let reason = surface.reset_reason()?;
        tracing::debug!(
            ?reason,
            x = vehicle.x,
            y = vehicle.y,
            tick = self.state.tick,
            "Vehicle left the track, resetting"
        );
        reset::respawn(vehicle, &self.config);
        reset::arm_flicker(&mut vehicle.visual, now_ms, &self.config);
        self.state.resets = self.state.resets.saturating_add(1);

        Some(SimEvent::Reset {
            reason,
            at_ms: now_ms,
        })
    }
}

impl Default for DriveSim {
    /// Default tuning on an all-drivable mask covering the world.
    fn default() -> Self {
        let config = DriveConfig::default();
        let terrain = TerrainMask::uniform(
            config.world_width as u32,
            config.world_height as u32,
            Surface::Drivable,
        );
        Self::with_config(config, Arc::new(terrain))
    }
}

impl Simulation for DriveSim {
    fn metadata(&self) -> SimMetadata {
        SimMetadata {
            name: "Skidpan".to_string(),
            description: "Keep the car on the gravel. Leave the track and you start over."
                .to_string(),
        }
    }

    fn tick_rate(&self) -> f32 {
        self.config.tick_rate_hz
    }

    fn update(&mut self, now_ms: u64, dt_ticks: f32, input: &InputSnapshot) -> Vec<SimEvent> {
        if self.paused {
            return Vec::new();
        }

        let mut events = Vec::new();

        self.state.vehicle = physics::advance(&self.state.vehicle, input, &self.config, dt_ticks);

        if reset::expire_flicker(&mut self.state.vehicle.visual, now_ms) {
            tracing::trace!(now_ms, "Flicker ended");
            events.push(SimEvent::FlickerEnded { at_ms: now_ms });
        }

        events.extend(self.check_terrain(now_ms));
        self.state.tick += 1;
        events
    }

    fn frame(&self, now_ms: u64) -> Frame {
        Frame {
            pose: self.state.vehicle.pose(),
            flickering: self.is_flickering(now_ms),
            opacity: self.flicker_opacity(now_ms),
        }
    }

    simulation_boilerplate!(state_type: DriveState);
}

#[cfg(test)]
mod tests {
    use super::*;
    use skidpan_core::host::run_frame;
    use skidpan_core::sim_trait::ResetReason;
    use skidpan_core::test_helpers::{RecordingRenderer, ScriptedInput, run_ticks};
    use skidpan_core::time::{Clock, ManualClock};
    use terrain::HazardRule;

    const ROAD: [u8; 4] = [110, 105, 100, 255];
    const GRASS: [u8; 4] = [30, 190, 40, 255];

    fn half_grass_config() -> DriveConfig {
        DriveConfig {
            world_width: 200.0,
            world_height: 100.0,
            start_x: 20.0,
            start_y: 50.0,
            flicker_duration_ms: 1_000,
            ..DriveConfig::default()
        }
    }

    /// Road for x < 100, grass from x = 100.
    fn half_grass_pixels() -> Vec<u8> {
        let mut pixels = Vec::with_capacity(200 * 100 * 4);
        for _y in 0..100 {
            for x in 0..200 {
                pixels.extend_from_slice(if x < 100 { &ROAD } else { &GRASS });
            }
        }
        pixels
    }

    /// 200x100 world over the half-grass mask.
    fn half_grass_sim() -> DriveSim {
        DriveSim::from_rgba(half_grass_config(), 200, 100, &half_grass_pixels()).unwrap()
    }

    #[test]
    fn first_tick_from_rest() {
        let mut sim = half_grass_sim();
        let events = sim.update(0, 1.0, &InputSnapshot::NONE);

        assert!(events.is_empty());
        let v = sim.vehicle();
        assert!((v.speed - 0.196).abs() < 1e-6, "speed = {}", v.speed);
        assert!((v.x - 20.196).abs() < 1e-4, "x = {}", v.x);
        assert!((v.y - 50.0).abs() < 1e-6);
        assert_eq!(sim.state().tick, 1);
        assert_eq!(sim.state().last_surface, Surface::Drivable);
    }

    #[test]
    fn hazard_contact_resets_vehicle() {
        let mut sim = half_grass_sim();
        sim.state.vehicle.x = 99.5;
        sim.state.vehicle.speed = 5.0;

        let events = sim.update(10_000, 1.0, &InputSnapshot::NONE);

        assert_eq!(
            events,
            vec![SimEvent::Reset {
                reason: ResetReason::Hazard,
                at_ms: 10_000
            }]
        );
        let v = sim.vehicle();
        assert_eq!((v.x, v.y), (20.0, 50.0));
        assert_eq!(v.speed, 0.0);
        assert_eq!(v.heading, 0.0);
        assert!(sim.is_flickering(10_000));
        assert_eq!(sim.state().resets, 1);
        assert_eq!(sim.state().last_surface, Surface::Hazard);
    }

    #[test]
    fn hazard_rule_comes_from_config() {
        let config = DriveConfig {
            hazard: HazardRule {
                green_min: 255,
                ..HazardRule::default()
            },
            ..half_grass_config()
        };
        let mut sim = DriveSim::from_rgba(config, 200, 100, &half_grass_pixels()).unwrap();
        assert_eq!(sim.terrain().count(Surface::Hazard), 0);

        sim.state.vehicle.x = 99.5;
        sim.state.vehicle.speed = 5.0;
        let events = run_ticks(&mut sim, InputSnapshot::NONE, 10, 0, 16);
        assert!(events.is_empty(), "got {events:?}");
        assert_eq!(sim.state().last_surface, Surface::Drivable);
        assert!(sim.vehicle().x > 100.0);
    }

    #[test]
    fn from_rgba_rejects_bad_input() {
        let err = DriveSim::from_rgba(half_grass_config(), 200, 100, &[0; 16]).err();
        assert!(matches!(err, Some(DriveError::MaskSize { .. })), "got {err:?}");

        let config = DriveConfig {
            max_speed: 0.0,
            ..half_grass_config()
        };
        let err = DriveSim::from_rgba(config, 200, 100, &half_grass_pixels()).err();
        assert!(matches!(err, Some(DriveError::InvalidConfig(_))), "got {err:?}");
    }

    #[test]
    fn unvalidated_config_does_not_panic() {
        let config = DriveConfig {
            max_speed: -1.0,
            world_width: -5.0,
            world_height: f32::NAN,
            ..DriveConfig::default()
        };
        let terrain = Arc::new(TerrainMask::uniform(10, 10, Surface::Drivable));
        let mut sim = DriveSim::with_config(config, terrain);
        run_ticks(&mut sim, InputSnapshot::NONE, 5, 0, 16);
        assert_eq!(sim.state().tick, 5);
    }

    #[test]
    fn only_the_committed_position_is_checked() {
        // Starting on grass and driving off it in one tick is legal.
        let mut sim = half_grass_sim();
        sim.state.vehicle.x = 100.5;
        sim.state.vehicle.heading = std::f32::consts::PI;
        sim.state.vehicle.speed = 5.0;

        let events = sim.update(0, 1.0, &InputSnapshot::NONE);
        assert!(events.is_empty(), "got {events:?}");
        assert!(sim.vehicle().x < 100.0);
    }

    #[test]
    fn leaving_the_mask_is_out_of_bounds() {
        let config = DriveConfig {
            world_width: 300.0,
            world_height: 100.0,
            start_x: 10.0,
            start_y: 50.0,
            ..DriveConfig::default()
        };
        let mask = TerrainMask::uniform(200, 100, Surface::Drivable);
        let mut sim = DriveSim::with_config(config, Arc::new(mask));
        sim.state.vehicle.x = 199.5;
        sim.state.vehicle.speed = 5.0;

        let events = sim.update(0, 1.0, &InputSnapshot::NONE);
        assert_eq!(
            events,
            vec![SimEvent::Reset {
                reason: ResetReason::OutOfBounds,
                at_ms: 0
            }]
        );
        assert_eq!(sim.vehicle().x, 10.0);
    }

    #[test]
    fn flicker_ends_after_duration() {
        let mut sim = half_grass_sim();
        sim.state.vehicle.x = 99.5;
        sim.state.vehicle.speed = 5.0;
        sim.update(0, 1.0, &InputSnapshot::NONE);
        assert!(sim.is_flickering(0));

        let events = sim.update(500, 1.0, &InputSnapshot::NONE);
        assert!(events.is_empty());
        assert!(sim.is_flickering(500));

        let events = sim.update(1_000, 1.0, &InputSnapshot::NONE);
        assert_eq!(events, vec![SimEvent::FlickerEnded { at_ms: 1_000 }]);
        assert_eq!(sim.vehicle().visual, VisualState::Normal);
        assert!(!sim.is_flickering(1_000));
    }

    #[test]
    fn steer_lean_survives_reset_by_default() {
        let mut sim = half_grass_sim();
        sim.state.vehicle.x = 99.5;
        sim.state.vehicle.speed = 5.0;
        sim.state.vehicle.steer_input = 0.5;

        let right = InputSnapshot {
            right: true,
            ..InputSnapshot::NONE
        };
        sim.update(0, 1.0, &right);
        assert!((sim.vehicle().steer_input - 0.6).abs() < 1e-6);
    }

    #[test]
    fn frame_reports_pose_and_opacity() {
        let mut sim = half_grass_sim();
        sim.state.vehicle.x = 99.5;
        sim.state.vehicle.speed = 5.0;
        sim.update(1_000, 1.0, &InputSnapshot::NONE);

        let frame = sim.frame(1_000);
        assert_eq!(frame.pose.position, Point::new(20.0, 50.0));
        assert!(frame.flickering);
        assert_eq!(frame.opacity, sim.config().flicker_low_opacity);

        let later = sim.frame(5_000);
        assert!(!later.flickering);
        assert_eq!(later.opacity, sim.config().flicker_high_opacity);
    }

    #[test]
    fn restart_clears_progress() {
        let mut sim = half_grass_sim();
        run_ticks(&mut sim, InputSnapshot::NONE, 10, 0, 16);
        sim.pause();
        sim.restart();
        assert_eq!(sim.state(), &DriveState::at_start(sim.config()));
        assert!(!sim.is_paused());
    }

    #[test]
    fn long_drive_keeps_invariants() {
        let mut sim = half_grass_sim();
        let mut clock = ManualClock::new(0);
        let mut renderer = RecordingRenderer::default();
        let script = (0..600).map(|i| InputSnapshot {
            left: i % 90 < 30,
            right: i % 70 > 50,
            brake: i % 200 > 190,
        });
        let mut input = ScriptedInput::new(script);

        let mut resets = 0;
        for _ in 0..600 {
            let events = run_frame(&mut sim, &mut input, &clock, &mut renderer);
            resets += events
                .iter()
                .filter(|e| matches!(e, SimEvent::Reset { .. }))
                .count();

            let now = clock.now_ms();
            let v = sim.vehicle();
            let cfg = sim.config();
            assert!((0.0..=cfg.max_speed).contains(&v.speed));
            assert!((-1.0..=1.0).contains(&v.steer_input));
            assert!((0.0..=cfg.world_width).contains(&v.x));
            assert!((0.0..=cfg.world_height).contains(&v.y));
            if let VisualState::Flickering { expires_at_ms } = v.visual {
                assert!(now < expires_at_ms, "stale flicker at {now}");
            }
            clock.advance(16);
        }

        assert_eq!(renderer.frames.len(), 600);
        assert_eq!(resets as u32, sim.state().resets);
        assert!(resets > 0, "Driving straight must eventually hit the grass");
    }

    #[test]
    fn held_brake_stops_short_of_the_grass() {
        let mut sim = half_grass_sim();
        let brake = InputSnapshot {
            brake: true,
            ..InputSnapshot::NONE
        };
        let mut input = ScriptedInput::repeat(brake, 120);
        let clock = ManualClock::new(0);
        let mut renderer = RecordingRenderer::default();
        for _ in 0..120 {
            run_frame(&mut sim, &mut input, &clock, &mut renderer);
        }
        assert_eq!(sim.state().resets, 0);
        assert_eq!(sim.vehicle().x, 20.0, "Brake cancels throttle from rest");
    }

    #[test]
    fn dt_ticks_zero_only_counts_tick() {
        let mut sim = half_grass_sim();
        let before = sim.vehicle().clone();
        sim.update(0, 0.0, &InputSnapshot::NONE);
        assert_eq!(sim.vehicle(), &before);
        assert_eq!(sim.state().tick, 1);
    }

    #[test]
    fn invalid_config_rejected_up_front() {
        let config = DriveConfig {
            max_speed: -1.0,
            ..DriveConfig::default()
        };
        let terrain = Arc::new(TerrainMask::uniform(10, 10, Surface::Drivable));
        let err = DriveSim::try_with_config(config, terrain).err();
        assert!(matches!(err, Some(DriveError::InvalidConfig(_))));
    }

    #[test]
    fn tick_rate_follows_config() {
        let sim = DriveSim::default();
        assert_eq!(sim.tick_rate(), 60.0);
    }

    // ================================================================
    // Simulation Trait Contract Tests
    // ================================================================

    #[test]
    fn contract_update_advances_state() {
        let mut sim = DriveSim::default();
        skidpan_core::test_helpers::contract_update_advances_state(&mut sim);
    }

    #[test]
    fn contract_frame_is_read_only() {
        let mut sim = half_grass_sim();
        run_ticks(&mut sim, InputSnapshot::NONE, 5, 0, 16);
        skidpan_core::test_helpers::contract_frame_is_read_only(&mut sim);
    }

    #[test]
    fn contract_state_roundtrip_preserves() {
        let mut sim = half_grass_sim();
        run_ticks(&mut sim, InputSnapshot::NONE, 5, 0, 16);
        skidpan_core::test_helpers::contract_state_roundtrip_preserves(&mut sim);
    }

    #[test]
    fn contract_garbage_state_ignored() {
        let mut sim = DriveSim::default();
        skidpan_core::test_helpers::contract_garbage_state_ignored(&mut sim);
    }

    #[test]
    fn contract_pause_stops_updates() {
        let mut sim = DriveSim::default();
        skidpan_core::test_helpers::contract_pause_stops_updates(&mut sim);
    }

    #[test]
    fn state_snapshot_restores_vehicle() {
        let mut sim = half_grass_sim();
        run_ticks(&mut sim, InputSnapshot::NONE, 20, 0, 16);
        let snapshot = sim.serialize_state();

        let mut other = half_grass_sim();
        other.apply_state(&snapshot);
        assert_eq!(other.state(), sim.state());
    }

    #[test]
    fn truncated_snapshot_keeps_state() {
        let mut sim = half_grass_sim();
        run_ticks(&mut sim, InputSnapshot::NONE, 3, 0, 16);
        let state = sim.serialize_state();
        let before = sim.state().clone();
        sim.apply_state(&state[..state.len() / 2]);
        assert_eq!(sim.state(), &before);
    }
}
