use serde::{Deserialize, Serialize};

use super::Vehicle;
use crate::config::DriveConfig;

/// Visual-only state after a reset. Has no effect on motion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum VisualState {
    #[default]
    Normal,
    Flickering {
        /// Wall-clock time (ms) at which the flicker ends.
        expires_at_ms: u64,
    },
}

impl VisualState {
    /// Whether the vehicle is flickering at `now_ms`. Derived purely from
    /// the stored expiry, so it never flaps once the window has passed.
    pub fn is_flickering(&self, now_ms: u64) -> bool {
        match *self {
            VisualState::Normal => false,
            VisualState::Flickering { expires_at_ms } => now_ms < expires_at_ms,
        }
    }

    pub fn expires_at_ms(&self) -> Option<u64> {
        match *self {
            VisualState::Normal => None,
            VisualState::Flickering { expires_at_ms } => Some(expires_at_ms),
        }
    }
}

/// Send the vehicle back to the start pose with zero speed.
///
/// Steer lean is kept unless `reset_steer_on_respawn` is set. Applying it
/// twice is the same as applying it once.
pub fn respawn(vehicle: &mut Vehicle, config: &DriveConfig) {
    vehicle.x = config.start_x;
    vehicle.y = config.start_y;
    vehicle.heading = config.start_heading;
    vehicle.speed = 0.0;
    if config.reset_steer_on_respawn {
        vehicle.steer_input = 0.0;
    }
}

/// Enter (or re-enter) the flicker state after a violation at `now_ms`.
pub fn arm_flicker(visual: &mut VisualState, now_ms: u64, config: &DriveConfig) {
    if visual.is_flickering(now_ms) && !config.rearm_flicker_on_violation {
        return;
    }
    *visual = if config.flicker_duration_ms == 0 {
        VisualState::Normal
    } else {
        VisualState::Flickering {
            expires_at_ms: now_ms.saturating_add(config.flicker_duration_ms),
        }
    };
}

/// Drop back to `Normal` once `now_ms` reaches the expiry.
/// Returns true when a transition happened.
pub fn expire_flicker(visual: &mut VisualState, now_ms: u64) -> bool {
    match *visual {
        VisualState::Flickering { expires_at_ms } if now_ms >= expires_at_ms => {
            *visual = VisualState::Normal;
            true
        },
        _ => false,
    }
}

/// Sprite opacity at `now_ms`: dim for the first half of each flicker
/// period, bright for the second half and whenever not flickering.
pub fn flicker_opacity(visual: &VisualState, now_ms: u64, config: &DriveConfig) -> f32 {
    if !visual.is_flickering(now_ms) || config.flicker_period_ms == 0 {
        return config.flicker_high_opacity;
    }
    let period = config.flicker_period_ms;
    if now_ms % period < period - period / 2 {
        config.flicker_low_opacity
    } else {
        config.flicker_high_opacity
    }
}
