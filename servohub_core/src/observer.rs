//! Discrete-time state observer: estimates (angle, speed, current) from
//! measured encoder position and applied voltage, and detects stall.
//!
//! All state-space arithmetic is integer-only with 64-bit intermediates, so
//! the estimate is bit-exact and reproducible across platforms regardless
//! of floating-point unit availability.

use servohub_common::actuation::ActuationKind;
use servohub_common::consts::{
    COUNTS_PER_DEG, MDEG_MAX, MDEG_PER_DEG, PRESCALE_CURRENT, PRESCALE_SPEED, PRESCALE_TORQUE,
    PRESCALE_VOLTAGE,
};
use servohub_common::model::ObserverModel;

use crate::math::sign64;

/// Mutable observer state for one servo. Borrows its model rather than
/// owning a copy, since the model is a compile-time constant shared by
/// every servo of the same motor type.
#[derive(Debug)]
pub struct Observer {
    model: &'static ObserverModel,
    angle_offset: i32,
    /// Millidegrees, kept within `[-MDEG_MAX, MDEG_MAX]`.
    angle: i64,
    /// Millidegrees per second.
    speed: i64,
    /// Model-internal current units.
    current: i64,
    stalled: bool,
    stall_start: i64,
}

impl Observer {
    /// Builds an observer at rest, with the angle origin at `measured_count`.
    pub fn new(model: &'static ObserverModel, measured_count: i32) -> Self {
        let mut observer = Observer {
            model,
            angle_offset: 0,
            angle: 0,
            speed: 0,
            current: 0,
            stalled: false,
            stall_start: 0,
        };
        observer.reset(measured_count);
        observer
    }

    /// Re-establishes the angle origin at `measured_count` and zeroes the
    /// rest of the state, including the stall flag.
    pub fn reset(&mut self, measured_count: i32) {
        self.angle_offset = measured_count / COUNTS_PER_DEG;
        self.angle = 0;
        self.speed = 0;
        self.current = 0;
        self.stalled = false;
        self.stall_start = 0;
    }

    /// Current best estimate as `(count, rate)` in the caller's units
    /// (counts, counts/sec at `COUNTS_PER_DEG == 1`).
    pub fn estimated_state(&self) -> (i32, i32) {
        let count = self.angle_offset + (self.angle / MDEG_PER_DEG) as i32;
        let rate = (self.speed / MDEG_PER_DEG) as i32;
        (count, rate)
    }

    /// True once the internal stall condition has held continuously for
    /// more than `stall_time` microseconds; the second element is how long,
    /// in milliseconds.
    pub fn is_stalled(&self, time_us: i64, stall_time_us: i32) -> (bool, i32) {
        if !self.stalled {
            return (false, 0);
        }
        let duration_us = time_us - self.stall_start;
        if duration_us > stall_time_us as i64 {
            (true, (duration_us / 1000) as i32)
        } else {
            (false, 0)
        }
    }

    /// Advances the observer by one tick. Must be called at the scheduler's
    /// fixed cadence; the discrete model assumes a constant tick period.
    pub fn update(
        &mut self,
        time_us: i64,
        measured_count: i32,
        actuation: ActuationKind,
        applied_voltage: i32,
        stall_time_us: i32,
    ) {
        let measured =
            (measured_count / COUNTS_PER_DEG - self.angle_offset) as i64 * MDEG_PER_DEG;
        let residual_deg = (measured - self.angle) / MDEG_PER_DEG;
        let feedback_torque = self.model.gain as i64 * residual_deg;
        let v_fb = self.model.torque_to_voltage(feedback_torque as i32);

        self.update_stall_state(time_us, applied_voltage, v_fb);

        // A COAST tick applies zero voltage; the feedback term still pulls
        // the model toward the measured angle.
        let applied_voltage = match actuation {
            ActuationKind::Coast => 0,
            _ => applied_voltage,
        };
        let v_total = applied_voltage as i64 + v_fb as i64;

        let friction_torque = sign64(self.speed) * self.model.torque_friction as i64;
        let m = self.model;

        let angle_next = self.angle
            + PRESCALE_SPEED * self.speed / m.d_angle_d_speed as i64
            + PRESCALE_CURRENT * self.current / m.d_angle_d_current as i64
            + PRESCALE_VOLTAGE * v_total / m.d_angle_d_voltage as i64
            + PRESCALE_TORQUE * friction_torque / m.d_angle_d_torque as i64;

        let speed_with_friction = PRESCALE_SPEED * self.speed / m.d_speed_d_speed as i64
            + PRESCALE_CURRENT * self.current / m.d_speed_d_current as i64
            + PRESCALE_VOLTAGE * v_total / m.d_speed_d_voltage as i64
            + PRESCALE_TORQUE * friction_torque / m.d_speed_d_torque as i64;
        let friction_contribution = PRESCALE_TORQUE * friction_torque / m.d_speed_d_torque as i64;
        let speed_without_friction = speed_with_friction - friction_contribution;

        // Stiction: if friction alone is what carries speed across zero,
        // clamp instead of letting it overshoot into the opposite direction.
        let speed_next = if (speed_with_friction >= 0) != (speed_without_friction >= 0) {
            0
        } else {
            speed_with_friction
        };

        let current_next = PRESCALE_SPEED * self.speed / m.d_current_d_speed as i64
            + PRESCALE_CURRENT * self.current / m.d_current_d_current as i64
            + PRESCALE_VOLTAGE * v_total / m.d_current_d_voltage as i64
            + PRESCALE_TORQUE * friction_torque / m.d_current_d_torque as i64;

        self.angle = angle_next;
        self.speed = speed_next;
        self.current = current_next;

        if self.angle > MDEG_MAX {
            self.angle -= MDEG_MAX;
            self.angle_offset += (MDEG_MAX / MDEG_PER_DEG) as i32;
        } else if self.angle < -MDEG_MAX {
            self.angle += MDEG_MAX;
            self.angle_offset -= (MDEG_MAX / MDEG_PER_DEG) as i32;
        }
    }

    fn update_stall_state(&mut self, time_us: i64, applied_voltage: i32, v_fb: i32) {
        // Flip to a forward-motion frame so the predicate reads the same
        // regardless of commanded direction.
        let direction = if applied_voltage < 0 { -1i64 } else { 1i64 };
        let speed_fwd = direction * self.speed;
        let v_fb_fwd = direction * v_fb as i64;
        let applied_fwd = direction * applied_voltage as i64;

        // Motor going slow/backward, model pushing back against an
        // unmodelled load, and that feedback voltage already past half of
        // what full stall would produce.
        let predicate =
            speed_fwd < 50 * MDEG_PER_DEG && v_fb_fwd < 0 && -v_fb_fwd > applied_fwd / 2;

        if predicate {
            if !self.stalled {
                self.stall_start = time_us;
            }
            self.stalled = true;
        } else {
            self.stalled = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use servohub_common::model::MODEL_TECHNIC_L;

    #[test]
    fn reset_is_idempotent() {
        let mut observer = Observer::new(&MODEL_TECHNIC_L, 360);
        observer.update(1000, 360, ActuationKind::Duty, 0, 200_000);
        observer.reset(360);
        let (count, rate) = observer.estimated_state();
        assert_eq!(count, 360);
        assert_eq!(rate, 0);
        assert_eq!(observer.is_stalled(1_000_000, 200_000), (false, 0));
    }

    #[test]
    fn angle_normalization_keeps_angle_within_bounds() {
        let mut observer = Observer::new(&MODEL_TECHNIC_L, 0);
        let mut time = 0i64;
        for _ in 0..200_000 {
            time += 1000;
            observer.update(time, 0, ActuationKind::Duty, 9000, 200_000);
            assert!(observer.angle.abs() <= MDEG_MAX);
        }
    }

    #[test]
    fn zero_input_decays_speed_toward_zero() {
        let mut observer = Observer::new(&MODEL_TECHNIC_L, 0);
        observer.speed = 50_000;
        let mut time = 0i64;
        let mut last_abs_speed = observer.speed.abs();
        for _ in 0..500 {
            time += 1000;
            observer.update(time, 0, ActuationKind::Duty, 0, 200_000);
            let abs_speed = observer.speed.abs();
            assert!(abs_speed <= last_abs_speed + 1);
            last_abs_speed = abs_speed;
        }
        assert!(last_abs_speed < 5000);
    }

    #[test]
    fn stall_requires_sustained_predicate() {
        let mut observer = Observer::new(&MODEL_TECHNIC_L, 0);
        // Held measurement plus commanded voltage keeps the feedback
        // voltage pinned against the stall predicate.
        let mut time = 0i64;
        for _ in 0..10 {
            time += 1000;
            observer.update(time, 0, ActuationKind::Duty, 9000, 200_000);
        }
        assert_eq!(observer.is_stalled(time, 200_000), (false, 0));

        for _ in 0..400 {
            time += 1000;
            observer.update(time, 0, ActuationKind::Duty, 9000, 200_000);
        }
        let (stalled, _) = observer.is_stalled(time, 200_000);
        assert!(stalled);
    }
}
