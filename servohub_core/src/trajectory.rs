//! Time-parameterized motion reference: a piecewise ramp-cruise-ramp (or
//! ramp-cruise-forever) profile sampled by the control law each tick.
//!
//! Phase boundaries are solved with floating point — permitted here, unlike
//! the observer update, since the planner runs once per command rather than
//! every tick and has no bit-exact compatibility requirement.

use servohub_common::consts::DURATION_FOREVER;

/// One ramp segment: a constant acceleration held for `duration_us`
/// microseconds. `duration_us == DURATION_FOREVER` marks an unbounded
/// cruise that the sampler never advances past.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Phase {
    duration_us: i64,
    /// Millidegrees per second squared, signed.
    accel: i32,
}

/// A three-phase reference trajectory (ramp, cruise, ramp), sampled by
/// absolute time. All positions are in millidegrees on an unbounded
/// ("extended") axis — they never wrap, unlike the observer's internal
/// angle — so the count integrator can track error continuously across an
/// observer angle-wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trajectory {
    t0: i64,
    start_pos_ext: i64,
    start_rate: i32,
    phases: [Phase; 3],
}

/// A trajectory reference sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    /// Millidegrees, extended (unbounded) axis.
    pub pos_ext: i64,
    /// Millidegrees per second.
    pub rate: i32,
    /// Millidegrees per second squared.
    pub accel: i32,
}

impl Trajectory {
    /// A trajectory that never moves: used to represent HOLD, which pins
    /// the reference at the position captured at the moment control
    /// switched into it.
    pub fn hold(t0: i64, pos_ext: i64) -> Self {
        Trajectory {
            t0,
            start_pos_ext: pos_ext,
            start_rate: 0,
            phases: [
                Phase { duration_us: DURATION_FOREVER, accel: 0 },
                Phase { duration_us: 0, accel: 0 },
                Phase { duration_us: 0, accel: 0 },
            ],
        }
    }

    /// Builds a trajectory that ramps from `start_rate` to `cruise_rate`
    /// (signed, millidegrees/sec) and then holds it for `duration_us`
    /// microseconds, or forever if `duration_us == DURATION_FOREVER`.
    ///
    /// Used for `run`/`run_time`/`run_until_stalled`: there is no built-in
    /// ramp back to zero, since those commands end via `stop`, which builds
    /// a fresh trajectory of its own.
    pub fn for_rate(
        t0: i64,
        start_pos_ext: i64,
        start_rate: i32,
        cruise_rate: i32,
        accel: i32,
        decel: i32,
    ) -> Self {
        let accel = accel.max(1);
        let decel = decel.max(1);

        // If already moving past the cruise rate in the same rotational
        // sense, ramp down at `decel` instead of `accel`.
        let same_direction = start_rate.signum() == cruise_rate.signum() && start_rate != 0;
        let ramp_magnitude = if same_direction && start_rate.abs() > cruise_rate.abs() {
            decel
        } else {
            accel
        };
        let a1 = ramp_magnitude as f64 * (cruise_rate - start_rate).signum() as f64;
        let t1_dur = if a1 != 0.0 {
            ((cruise_rate - start_rate) as f64 / a1).max(0.0)
        } else {
            0.0
        };
        let t1_us = (t1_dur * 1_000_000.0).round() as i64;

        Trajectory {
            t0,
            start_pos_ext,
            start_rate,
            phases: [
                Phase { duration_us: t1_us, accel: a1.round() as i32 },
                Phase { duration_us: DURATION_FOREVER, accel: 0 },
                Phase { duration_us: 0, accel: 0 },
            ],
        }
    }

    /// As [`Self::for_rate`], but the cruise phase ends after `duration_us`
    /// microseconds instead of running forever (`run_time`).
    pub fn for_rate_timed(
        t0: i64,
        start_pos_ext: i64,
        start_rate: i32,
        cruise_rate: i32,
        accel: i32,
        decel: i32,
        duration_us: i64,
    ) -> Self {
        let mut t = Self::for_rate(t0, start_pos_ext, start_rate, cruise_rate, accel, decel);
        let t1_us = t.phases[0].duration_us;
        let cruise_us = (duration_us - t1_us).max(0);
        t.phases[1].duration_us = cruise_us;
        t
    }

    /// Builds a trapezoidal (or, if there is not enough room, triangular)
    /// profile from `start_rate` at `start_pos_ext` to `target_pos_ext`,
    /// cruising at up to `cruise_rate` (magnitude) and decelerating to rest
    /// exactly at the target (`run_target`/`run_angle`).
    pub fn for_target(
        t0: i64,
        start_pos_ext: i64,
        start_rate: i32,
        target_pos_ext: i64,
        cruise_rate: i32,
        accel: i32,
        decel: i32,
    ) -> Self {
        let delta = (target_pos_ext - start_pos_ext) as f64;
        let dir = if delta >= 0.0 { 1.0 } else { -1.0 };
        let v_cruise = dir * cruise_rate.unsigned_abs() as f64;
        let v0 = start_rate as f64;
        let a = accel.max(1) as f64;
        let d = decel.max(1) as f64;

        let a1 = a * (v_cruise - v0).signum();
        let t1_dur = if a1 != 0.0 { ((v_cruise - v0) / a1).max(0.0) } else { 0.0 };
        let x1 = v0 * t1_dur + 0.5 * a1 * t1_dur * t1_dur;

        let a3 = -d * v_cruise.signum();
        let t3_dur = if a3 != 0.0 { ((0.0 - v_cruise) / a3).max(0.0) } else { 0.0 };
        let x3 = v_cruise * t3_dur + 0.5 * a3 * t3_dur * t3_dur;

        let x_cruise = delta - x1 - x3;
        let reaches_cruise = x_cruise.abs() < f64::EPSILON || x_cruise.signum() == dir || v_cruise == 0.0;

        let (t1_dur, t2_dur, a1, t3_dur, a3) = if reaches_cruise {
            let t2_dur = if v_cruise != 0.0 { (x_cruise / v_cruise).max(0.0) } else { 0.0 };
            (t1_dur, t2_dur, a1, t3_dur, a3)
        } else {
            // Not enough distance to reach cruise speed: solve for the
            // peak velocity of a triangular profile that covers exactly
            // `delta` ramping at `a` then `d`.
            let v_peak_sq = (2.0 * delta.abs() * a * d + d * v0 * v0) / (a + d);
            let v_peak = dir * v_peak_sq.max(0.0).sqrt();
            let a1 = a * (v_peak - v0).signum();
            let t1_dur = if a1 != 0.0 { ((v_peak - v0) / a1).max(0.0) } else { 0.0 };
            let a3 = -d * v_peak.signum();
            let t3_dur = if a3 != 0.0 { ((0.0 - v_peak) / a3).max(0.0) } else { 0.0 };
            (t1_dur, 0.0, a1, t3_dur, a3)
        };

        let t1_us = (t1_dur * 1_000_000.0).round() as i64;
        let t2_us = (t2_dur * 1_000_000.0).round() as i64;
        let t3_us = (t3_dur * 1_000_000.0).round() as i64;

        Trajectory {
            t0,
            start_pos_ext,
            start_rate,
            phases: [
                Phase { duration_us: t1_us, accel: a1.round() as i32 },
                Phase { duration_us: t2_us, accel: 0 },
                Phase { duration_us: t3_us, accel: a3.round() as i32 },
            ],
        }
    }

    /// Absolute time at which the trajectory is complete, or `None` if it
    /// runs forever (a `run`/`track_target`/`hold` trajectory).
    pub fn end_time(&self) -> Option<i64> {
        let mut t = self.t0;
        for phase in &self.phases {
            if phase.duration_us == DURATION_FOREVER {
                return None;
            }
            t += phase.duration_us;
        }
        Some(t)
    }

    /// Samples the reference at time `t`. Before `t0`, returns the initial
    /// state; after the trajectory's end time (if any), returns the final
    /// state held constant.
    pub fn sample(&self, t: i64) -> Reference {
        let mut remaining_us = (t - self.t0).max(0);
        let mut pos = self.start_pos_ext as f64;
        let mut rate = self.start_rate as f64;
        let mut accel = 0i32;

        for phase in &self.phases {
            if phase.duration_us == DURATION_FOREVER {
                let dt = remaining_us as f64 / 1_000_000.0;
                pos += rate * dt + 0.5 * phase.accel as f64 * dt * dt;
                rate += phase.accel as f64 * dt;
                accel = phase.accel;
                remaining_us = 0;
                break;
            }
            let dt_us = remaining_us.min(phase.duration_us);
            let dt = dt_us as f64 / 1_000_000.0;
            pos += rate * dt + 0.5 * phase.accel as f64 * dt * dt;
            rate += phase.accel as f64 * dt;
            accel = phase.accel;
            remaining_us -= dt_us;
            if remaining_us <= 0 {
                break;
            }
        }

        Reference {
            pos_ext: pos.round() as i64,
            rate: rate.round() as i32,
            accel,
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampling_is_deterministic() {
        let traj = Trajectory::for_target(0, 0, 0, 180_000, 500_000, 2_000_000, 2_000_000);
        let a = traj.sample(250_000);
        let b = traj.sample(250_000);
        assert_eq!(a, b);
    }

    #[test]
    fn target_trajectory_ends_at_target_with_zero_rate() {
        let traj = Trajectory::for_target(0, 0, 0, 180_000, 500_000, 2_000_000, 2_000_000);
        let end = traj.end_time().expect("angle trajectories are finite");
        let sample = traj.sample(end);
        assert_eq!(sample.pos_ext, 180_000);
        assert_eq!(sample.rate, 0);
    }

    #[test]
    fn before_t0_returns_initial_state() {
        let traj = Trajectory::for_target(1_000_000, 0, 0, 180_000, 500_000, 2_000_000, 2_000_000);
        let sample = traj.sample(0);
        assert_eq!(sample.pos_ext, 0);
        assert_eq!(sample.rate, 0);
    }

    #[test]
    fn short_move_collapses_to_triangular_profile() {
        // 1 degree of travel cannot reach 500 deg/s at 2000 deg/s^2 accel.
        let traj = Trajectory::for_target(0, 0, 0, 1_000, 500_000, 2_000_000, 2_000_000);
        let end = traj.end_time().unwrap();
        let sample = traj.sample(end);
        assert_eq!(sample.pos_ext, 1_000);
        assert_eq!(sample.rate, 0);
    }

    #[test]
    fn hold_never_advances() {
        let traj = Trajectory::hold(0, 45_000);
        assert!(traj.end_time().is_none());
        let sample = traj.sample(10_000_000);
        assert_eq!(sample.pos_ext, 45_000);
        assert_eq!(sample.rate, 0);
    }

    #[test]
    fn run_cruises_forever_after_ramp() {
        let traj = Trajectory::for_rate(0, 0, 0, 500_000, 2_000_000, 2_000_000);
        assert!(traj.end_time().is_none());
        let sample = traj.sample(5_000_000);
        assert_eq!(sample.rate, 500_000);
    }
}
