//! Stateless PID combination: proportional, integral, and rate terms plus
//! feedforward, all in integer torque units.
//!
//! Unlike a classic PID loop, the integral term is not accumulated here —
//! [`CountIntegrator`](crate::integrator::CountIntegrator) and
//! [`RateIntegrator`](crate::integrator::RateIntegrator) own that state and
//! implement anti-windup themselves by pausing accumulation while the
//! control law reports saturation, so this module has nothing left to
//! reset between commands.

/// Proportional/integral/derivative gains copied from
/// [`ControlSettings`](servohub_common::settings::ControlSettings) at setup.
#[derive(Debug, Clone, Copy)]
pub struct PidGains {
    pub kp: i32,
    pub ki: i32,
    pub kd: i32,
}

/// Combines the position error, its integral, and the rate error into a
/// torque command, before feedforward and saturation.
///
/// `error_integral` and `feedforward` are pre-scaled to the same units as
/// `kp * error`; the caller is responsible for keeping those units
/// consistent (this crate uses millidegrees and millidegrees/sec
/// throughout).
#[inline]
pub fn pid_compute(gains: &PidGains, error: i32, error_integral: i64, rate_error: i32) -> i64 {
    let p_term = gains.kp as i64 * error as i64;
    let i_term = gains.ki as i64 * error_integral;
    let d_term = gains.kd as i64 * rate_error as i64;
    p_term + i_term + d_term
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pure_proportional() {
        let gains = PidGains { kp: 10, ki: 0, kd: 0 };
        assert_eq!(pid_compute(&gains, 5, 0, 0), 50);
    }

    #[test]
    fn integral_term_scales_with_gain() {
        let gains = PidGains { kp: 0, ki: 4, kd: 0 };
        assert_eq!(pid_compute(&gains, 0, 1000, 0), 4000);
    }

    #[test]
    fn rate_term_scales_with_gain() {
        let gains = PidGains { kp: 0, ki: 0, kd: 3 };
        assert_eq!(pid_compute(&gains, 0, 0, 200), 600);
    }

    #[test]
    fn zero_gains_produce_zero() {
        let gains = PidGains { kp: 0, ki: 0, kd: 0 };
        assert_eq!(pid_compute(&gains, 1000, 1000, 1000), 0);
    }
}
