pub mod host;
pub mod input;
pub mod render;
pub mod sim_trait;
pub mod time;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use std::collections::VecDeque;

    use crate::input::{InputProvider, InputSnapshot};
    use crate::render::{Frame, Renderer};
    use crate::sim_trait::{SimEvent, Simulation};

    /// Replays a fixed sequence of snapshots, then reports no keys held.
    #[derive(Debug, Clone, Default)]
    pub struct ScriptedInput {
        script: VecDeque<InputSnapshot>,
    }

    impl ScriptedInput {
        pub fn new(script: impl IntoIterator<Item = InputSnapshot>) -> Self {
            Self {
                script: script.into_iter().collect(),
            }
        }

        /// Hold the same snapshot for `ticks` polls.
        pub fn repeat(snapshot: InputSnapshot, ticks: usize) -> Self {
            Self::new(std::iter::repeat_n(snapshot, ticks))
        }
    }

    impl InputProvider for ScriptedInput {
        fn poll(&mut self) -> InputSnapshot {
            self.script.pop_front().unwrap_or_default()
        }
    }

    /// Keeps every frame it was asked to draw.
    #[derive(Debug, Clone, Default)]
    pub struct RecordingRenderer {
        pub frames: Vec<Frame>,
    }

    impl Renderer for RecordingRenderer {
        fn render(&mut self, frame: &Frame) {
            self.frames.push(*frame);
        }
    }

    /// Run N ticks with the same input, one `ms_per_tick` apart starting at
    /// `start_ms`, returning all accumulated events.
    pub fn run_ticks(
        sim: &mut dyn Simulation,
        input: InputSnapshot,
        n: usize,
        start_ms: u64,
        ms_per_tick: u64,
    ) -> Vec<SimEvent> {
        let mut all_events = Vec::new();
        for i in 0..n {
            let now = start_ms + i as u64 * ms_per_tick;
            all_events.extend(sim.update(now, 1.0, &input));
        }
        all_events
    }

    // ================================================================
    // Simulation Trait Contract Tests
    // ================================================================
    // Every Simulation implementation must pass these. Simulation crates
    // call them from their own #[cfg(test)] modules with a concrete,
    // freshly initialised instance.

    /// update() must change the serialized state.
    pub fn contract_update_advances_state(sim: &mut dyn Simulation) {
        let before = sim.serialize_state();
        sim.update(0, 1.0, &InputSnapshot::NONE);
        let after = sim.serialize_state();
        assert_ne!(before, after, "update() must advance simulation state");
    }

    /// frame() is a pure read.
    pub fn contract_frame_is_read_only(sim: &mut dyn Simulation) {
        let before = sim.serialize_state();
        let _ = sim.frame(0);
        let _ = sim.frame(123_456);
        assert_eq!(
            before,
            sim.serialize_state(),
            "frame() must not mutate state"
        );
    }

    /// serialize_state → apply_state must be stable after one roundtrip.
    pub fn contract_state_roundtrip_preserves(sim: &mut dyn Simulation) {
        let state_a = sim.serialize_state();
        sim.apply_state(&state_a);
        let state_b = sim.serialize_state();
        sim.apply_state(&state_b);
        let state_c = sim.serialize_state();
        assert_eq!(
            state_b, state_c,
            "State must be stable after serialize→apply→serialize roundtrip"
        );
    }

    /// apply_state() with garbage must keep the current state.
    pub fn contract_garbage_state_ignored(sim: &mut dyn Simulation) {
        let before = sim.serialize_state();
        sim.apply_state(&[0xFF, 0xFE, 0x00, 0x01, 0xAB, 0xCD]);
        assert_eq!(
            before,
            sim.serialize_state(),
            "Malformed snapshot must not replace state"
        );
    }

    /// pause() must freeze updates, resume() must unfreeze them.
    pub fn contract_pause_stops_updates(sim: &mut dyn Simulation) {
        sim.pause();
        assert!(sim.is_paused());
        let before = sim.serialize_state();
        sim.update(0, 1.0, &InputSnapshot::NONE);
        let during_pause = sim.serialize_state();
        assert_eq!(before, during_pause, "State must not change while paused");

        sim.resume();
        assert!(!sim.is_paused());
        sim.update(0, 1.0, &InputSnapshot::NONE);
        let after_resume = sim.serialize_state();
        assert_ne!(during_pause, after_resume, "State must change after resume");
    }
}
