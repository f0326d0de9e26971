use serde::{Deserialize, Serialize};

use crate::input::InputSnapshot;
use crate::render::Frame;

/// Core trait the host frame loop drives.
///
/// The host owns scheduling, input collection and presentation; the
/// simulation only advances its own state and exposes a read-only frame.
pub trait Simulation: Send + Sync {
    /// Simulation metadata for diagnostics and title screens.
    fn metadata(&self) -> SimMetadata;

    /// Advance one tick. `now_ms` is the host's wall clock, `dt_ticks` the
    /// number of nominal ticks this step covers (1.0 for a fixed-rate loop).
    fn update(&mut self, now_ms: u64, dt_ticks: f32, input: &InputSnapshot) -> Vec<SimEvent>;

    /// Read-only view for the renderer at the given wall-clock time.
    fn frame(&self, now_ms: u64) -> Frame;

    /// Serialize the full simulation state.
    fn serialize_state(&self) -> Vec<u8>;

    /// Replace the simulation state with a previously serialized snapshot.
    /// Malformed snapshots leave the current state untouched.
    fn apply_state(&mut self, state: &[u8]);

    /// Nominal tick rate in Hz that the per-tick tuning constants assume.
    fn tick_rate(&self) -> f32 {
        60.0
    }

    /// Stop advancing state until `resume` is called.
    fn pause(&mut self);

    /// Resume after a pause.
    fn resume(&mut self);

    /// Whether updates are currently suspended.
    fn is_paused(&self) -> bool;
}

/// Simulation metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimMetadata {
    pub name: String,
    pub description: String,
}

/// Why a vehicle was sent back to its start position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResetReason {
    /// The vehicle landed on a hazard surface.
    Hazard,
    /// The vehicle left the terrain mask's defined extent.
    OutOfBounds,
}

/// Events emitted by a simulation during `update`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    Reset { reason: ResetReason, at_ms: u64 },
    FlickerEnded { at_ms: u64 },
}

/// Generates the `Simulation` methods that only touch `state` and `paused`:
/// `serialize_state`, `apply_state`, `pause`, `resume`, `is_paused`.
///
/// Requires the implementing struct to have `state: $StateType` and
/// `paused: bool` fields, and the calling crate to depend on `rmp-serde`
/// and `tracing`.
#[macro_export]
macro_rules! simulation_boilerplate {
    (state_type: $StateType:ty) => {
        fn serialize_state(&self) -> Vec<u8> {
            rmp_serde::to_vec(&self.state).expect("simulation state serialization must succeed")
        }

        fn apply_state(&mut self, state: &[u8]) {
            match rmp_serde::from_slice::<$StateType>(state) {
                Ok(s) => self.state = s,
                Err(e) => {
                    tracing::debug!(error = %e, len = state.len(), "Dropped malformed state snapshot");
                },
            }
        }

        fn pause(&mut self) {
            self.paused = true;
        }

        fn resume(&mut self) {
            self.paused = false;
        }

        fn is_paused(&self) -> bool {
            self.paused
        }
    };
}
