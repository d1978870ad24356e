//! Combines a sampled trajectory reference, the observed state, PID,
//! feedforward torque, and saturation into a per-tick actuation command,
//! and evaluates whether the active command has completed.

use servohub_common::actuation::ActuationKind;
use servohub_common::consts::MDEG_PER_DEG;
use servohub_common::model::ObserverModel;
use servohub_common::settings::ControlSettings;

use crate::integrator::{CountIntegrator, RateIntegrator};
use crate::trajectory::Trajectory;

use super::pid::{pid_compute, PidGains};

/// Which kind of motion command is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlType {
    /// No command active; the servo is coasting, braking, or under direct
    /// duty control outside the control law.
    None,
    /// Absolute/relative position targeting (`run_target`, `run_angle`,
    /// `track_target`, and the post-stop HOLD state).
    Angle,
    /// Speed-over-time targeting (`run`, `run_time`, `run_until_stalled`).
    Timed,
}

/// How the active command decides it is complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Runs until explicitly stopped (`run`, `track_target`).
    Never,
    /// Complete once the trajectory's end time has passed (`run_time`).
    Time,
    /// Complete once the observer reports a sustained stall.
    Stalled,
    /// Complete once position and speed are both within tolerance.
    Position,
    /// Never completes on its own; only `stop`/a new command ends it.
    Hold,
}

/// One tick's actuation decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlOutput {
    pub actuation: ActuationKind,
    /// A signed voltage (DUTY) or an absolute count (HOLD); unused (0) for
    /// COAST/BRAKE.
    pub value: i32,
    /// True the tick the active command completed (the tick the reported
    /// `actuation` is the `after_stop` transition, not the steady-state
    /// tracking command).
    pub done: bool,
}

/// Per-servo control state: which command is active, its trajectory, its
/// completion predicate, and its integrator.
pub struct ControlLaw {
    control_type: ControlType,
    trajectory: Trajectory,
    completion: Completion,
    after_stop: ActuationKind,
    count_integrator: CountIntegrator,
    rate_integrator: RateIntegrator,
    saturated_direction: i32,
}

impl ControlLaw {
    /// No command active.
    pub fn idle() -> Self {
        ControlLaw {
            control_type: ControlType::None,
            trajectory: Trajectory::hold(0, 0),
            completion: Completion::Never,
            after_stop: ActuationKind::Coast,
            count_integrator: CountIntegrator::default(),
            rate_integrator: RateIntegrator::default(),
            saturated_direction: 0,
        }
    }

    pub fn control_type(&self) -> ControlType {
        self.control_type
    }

    /// Switches to angle (position) control with a freshly built
    /// trajectory. Cancels whatever command was previously active.
    pub fn start_angle(&mut self, trajectory: Trajectory, completion: Completion, after_stop: ActuationKind) {
        self.trajectory = trajectory;
        self.completion = completion;
        self.after_stop = after_stop;
        self.control_type = ControlType::Angle;
        self.count_integrator.reset();
        self.saturated_direction = 0;
    }

    /// Switches to timed (speed) control with a freshly built trajectory.
    pub fn start_timed(&mut self, trajectory: Trajectory, completion: Completion, after_stop: ActuationKind) {
        self.trajectory = trajectory;
        self.completion = completion;
        self.after_stop = after_stop;
        self.control_type = ControlType::Timed;
        self.rate_integrator.reset();
        self.saturated_direction = 0;
    }

    /// Stops control immediately; the caller is responsible for dispatching
    /// `kind` to the DC driver this same tick.
    pub fn stop(&mut self) {
        self.control_type = ControlType::None;
    }

    /// Advances control by one tick and returns the actuation decision.
    pub fn update(
        &mut self,
        time_now: i64,
        count_now: i32,
        rate_now: i32,
        settings: &ControlSettings,
        model: &ObserverModel,
        gains: &PidGains,
        stalled: bool,
    ) -> ControlOutput {
        if self.control_type == ControlType::None {
            return ControlOutput { actuation: ActuationKind::Coast, value: 0, done: false };
        }

        let count_now_mdeg = count_now as i64 * MDEG_PER_DEG;
        let rate_now_mdeg = rate_now as i64 * MDEG_PER_DEG;
        let reference = self.trajectory.sample(time_now);

        if self.evaluate_completion(time_now, count_now_mdeg, rate_now_mdeg, reference.pos_ext, settings, stalled) {
            return self.transition_after_stop(time_now, count_now_mdeg);
        }

        let feedforward = model.feedforward_torque(reference.rate, reference.accel) as i64;
        let e_v = (reference.rate as i64 - rate_now_mdeg) as i32;

        let raw = match self.control_type {
            ControlType::Angle => {
                let e_p = (reference.pos_ext - count_now_mdeg) as i32;
                self.count_integrator.update(e_p, self.saturated_direction, settings.integral_change_max);
                pid_compute(gains, e_p, self.count_integrator.value(), e_v) + feedforward
            }
            ControlType::Timed => {
                let pos_err = (reference.pos_ext - count_now_mdeg) as i32;
                self.rate_integrator.update(
                    pos_err,
                    reference.rate,
                    self.saturated_direction,
                    settings.integral_change_max,
                );
                // For timed control there is no absolute position to track,
                // so e_p is replaced with the rate error e_v.
                pid_compute(gains, e_v, self.rate_integrator.value(), e_v) + feedforward
            }
            ControlType::None => unreachable!("handled above"),
        };

        let actuation_max = settings.actuation_max as i64;
        let saturated = raw > actuation_max || raw < -actuation_max;
        let u = raw.clamp(-actuation_max, actuation_max) as i32;
        self.saturated_direction = if saturated { u.signum() } else { 0 };

        let voltage = model.torque_to_voltage(u);
        ControlOutput { actuation: ActuationKind::Duty, value: voltage, done: false }
    }

    fn evaluate_completion(
        &self,
        time_now: i64,
        count_now_mdeg: i64,
        rate_now_mdeg: i64,
        pos_ref_ext: i64,
        settings: &ControlSettings,
        stalled: bool,
    ) -> bool {
        match self.completion {
            Completion::Never | Completion::Hold => false,
            Completion::Stalled => stalled,
            Completion::Time => self.trajectory.end_time().is_some_and(|end| time_now >= end),
            Completion::Position => {
                let position_error = pos_ref_ext - count_now_mdeg;
                position_error.unsigned_abs() <= settings.position_tolerance as u64
                    && rate_now_mdeg.unsigned_abs() <= settings.speed_tolerance as u64
            }
        }
    }

    fn transition_after_stop(&mut self, time_now: i64, count_now_mdeg: i64) -> ControlOutput {
        match self.after_stop {
            ActuationKind::Hold => {
                self.trajectory = Trajectory::hold(time_now, count_now_mdeg);
                self.completion = Completion::Hold;
                self.control_type = ControlType::Angle;
                self.count_integrator.reset();
                self.saturated_direction = 0;
                ControlOutput {
                    actuation: ActuationKind::Hold,
                    value: (count_now_mdeg / MDEG_PER_DEG) as i32,
                    done: true,
                }
            }
            ActuationKind::Brake => {
                self.control_type = ControlType::None;
                ControlOutput { actuation: ActuationKind::Brake, value: 0, done: true }
            }
            ActuationKind::Coast | ActuationKind::Duty => {
                self.control_type = ControlType::None;
                ControlOutput { actuation: ActuationKind::Coast, value: 0, done: true }
            }
        }
    }
}
