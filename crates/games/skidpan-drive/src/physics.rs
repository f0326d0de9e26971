use skidpan_core::input::InputSnapshot;

use super::Vehicle;
use crate::config::DriveConfig;

/// Steer lean within this distance of the decay step snaps to zero, so
/// accumulated rounding never leaves a residue that takes an extra tick.
const STEER_SNAP: f32 = 1e-4;

/// Advance a vehicle by `dt_ticks` nominal ticks.
///
/// Pure: returns the candidate state and leaves `vehicle` untouched. The
/// result is clamped to the world but not yet checked against terrain.
pub fn advance(
    vehicle: &Vehicle,
    input: &InputSnapshot,
    config: &DriveConfig,
    dt_ticks: f32,
) -> Vehicle {
    let dt = dt_ticks.max(0.0);
    let mut next = vehicle.clone();

    apply_throttle(&mut next, dt, config);
    apply_brake(&mut next, input, dt, config);
    integrate_steering(&mut next, input, dt, config);
    apply_steer_drag(&mut next, dt, config);
    update_heading(&mut next, dt, config);
    apply_friction(&mut next, dt, config);
    translate(&mut next, dt);
    clamp_to_world(&mut next, config.world_width, config.world_height);

    next
}

/// Unconditional throttle, clamped to `[0, max_speed]`.
pub fn apply_throttle(vehicle: &mut Vehicle, dt: f32, config: &DriveConfig) {
    vehicle.speed = (vehicle.speed + config.acceleration * dt)
        .max(0.0)
        .min(config.max_speed);
}

/// Linear braking, floored at zero. No-op when braking is disabled.
pub fn apply_brake(vehicle: &mut Vehicle, input: &InputSnapshot, dt: f32, config: &DriveConfig) {
    if config.brake_enabled && input.brake {
        vehicle.speed = (vehicle.speed - config.brake_deceleration * dt).max(0.0);
    }
}

/// Lean the steering toward held keys, or let it return to center.
pub fn integrate_steering(
    vehicle: &mut Vehicle,
    input: &InputSnapshot,
    dt: f32,
    config: &DriveConfig,
) {
    let direction = f32::from(i8::from(input.right) - i8::from(input.left));
    if direction != 0.0 {
        let step = config.steer_step * dt;
        vehicle.steer_input = (vehicle.steer_input + direction * step).clamp(-1.0, 1.0);
    }
    if !input.steering() {
        vehicle.steer_input = decay_toward_zero(vehicle.steer_input, config.steer_decay * dt);
    }
}

/// Move `value` toward zero by `amount` without crossing it.
pub fn decay_toward_zero(value: f32, amount: f32) -> f32 {
    if value.abs() <= amount + STEER_SNAP {
        0.0
    } else {
        value - amount * value.signum()
    }
}

/// Speed bled off by steering lean. No-op unless enabled.
pub fn apply_steer_drag(vehicle: &mut Vehicle, dt: f32, config: &DriveConfig) {
    if config.steer_drag_enabled {
        let drag = vehicle.steer_input.abs() * config.steer_drag * dt;
        vehicle.speed = (vehicle.speed - drag).max(0.0);
    }
}

/// Rotate by the current steer lean, stronger at higher speed.
///
/// Skipped at or below `steer_movement_threshold` so the vehicle cannot
/// spin in place.
pub fn update_heading(vehicle: &mut Vehicle, dt: f32, config: &DriveConfig) {
    if vehicle.speed <= config.steer_movement_threshold {
        return;
    }
    let gain = vehicle.speed / config.max_speed + config.steering_base_gain;
    vehicle.heading += vehicle.steer_input * config.turn_rate * gain * dt;
}

/// Multiplicative sliding friction.
pub fn apply_friction(vehicle: &mut Vehicle, dt: f32, config: &DriveConfig) {
    vehicle.speed *= (1.0 - config.friction).powf(dt);
}

/// Move along the heading.
pub fn translate(vehicle: &mut Vehicle, dt: f32) {
    let distance = vehicle.speed * dt;
    vehicle.x += vehicle.heading.cos() * distance;
    vehicle.y += vehicle.heading.sin() * distance;
}

/// Clamp the position componentwise into `[0, width] × [0, height]`.
pub fn clamp_to_world(vehicle: &mut Vehicle, width: f32, height: f32) {
    vehicle.x = vehicle.x.min(width).max(0.0);
    vehicle.y = vehicle.y.min(height).max(0.0);
}
