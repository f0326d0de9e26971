use crate::input::InputProvider;
use crate::render::Renderer;
use crate::sim_trait::{SimEvent, Simulation};
use crate::time::Clock;

/// Run one host frame: poll input, advance one tick, then render.
///
/// The clock is sampled once so the update and the rendered frame agree on
/// the time.
pub fn run_frame(
    sim: &mut dyn Simulation,
    input: &mut dyn InputProvider,
    clock: &dyn Clock,
    renderer: &mut dyn Renderer,
) -> Vec<SimEvent> {
    let now = clock.now_ms();
    let snapshot = input.poll();
    let events = sim.update(now, 1.0, &snapshot);
    if !events.is_empty() {
        tracing::trace!(now, count = events.len(), "Simulation emitted events");
    }
    renderer.render(&sim.frame(now));
    events
}
