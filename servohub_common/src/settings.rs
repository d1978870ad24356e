//! Per-motor-type control settings, derived the way the reference
//! firmware's settings loader derives them: a base block shared by every
//! type, per-type speed/acceleration/PD constants transcribed verbatim
//! from `pbio_servo_load_settings()`, and a handful of values computed
//! from the observer model rather than hardcoded.

use crate::consts::{deg_to_mdeg, DEFAULT_STALL_TIME_US, MDEG_PER_DEG};
use crate::model::{
    ObserverModel, MODEL_EV3_LARGE, MODEL_EV3_MEDIUM, MODEL_INTERACTIVE, MODEL_MOVE_HUB,
    MODEL_TECHNIC_L, MODEL_TECHNIC_L_ANGULAR, MODEL_TECHNIC_M_ANGULAR, MODEL_TECHNIC_S_ANGULAR,
    MODEL_TECHNIC_XL,
};
use crate::motor::MotorType;

/// Control settings copied into a servo at setup time.
///
/// All speed/acceleration fields are in millidegrees (per second, or per
/// second squared), matching the observer's internal units; tolerances
/// follow the same convention so comparisons against observer state need
/// no unit conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlSettings {
    pub speed_max: i32,
    pub speed_default: i32,
    pub acceleration: i32,
    pub deceleration: i32,
    pub speed_tolerance: i32,
    pub position_tolerance: i32,
    pub stall_speed_limit: i32,
    /// Duration the stall predicate must hold continuously, in microseconds.
    pub stall_time: i32,
    pub pid_kp: i32,
    pub pid_ki: i32,
    pub pid_kd: i32,
    pub integral_change_max: i32,
    /// Torque ceiling on the PID output, in model torque units.
    pub actuation_max: i32,
}

/// Base values shared by every motor type, transcribed verbatim from
/// `pbio_servo_load_settings()`'s base block.
struct BaseSettings {
    speed_tolerance: i32,
    position_tolerance: i32,
    stall_speed_limit: i32,
    integral_change_max: i32,
}

const BASE: BaseSettings = BaseSettings {
    speed_tolerance: deg_to_mdeg(50),
    position_tolerance: deg_to_mdeg(10),
    stall_speed_limit: deg_to_mdeg(20),
    integral_change_max: deg_to_mdeg(15),
};

/// Returns the static observer model and derived control settings for a
/// motor type, mirroring the reference firmware's settings-load sequence:
/// shared base values, the type's own speed/acceleration/PD constants,
/// then the fields computed from the observer model rather than being
/// literal per-type constants.
pub fn settings_for(motor_type: MotorType) -> (ControlSettings, &'static ObserverModel) {
    let (model, type_settings) = model_and_type_settings(motor_type);

    let mut settings = ControlSettings {
        speed_max: type_settings.speed_max,
        // Defaults to speed_max absent an explicit "run at" speed.
        speed_default: type_settings.speed_max,
        acceleration: type_settings.acceleration,
        // Defaults to the acceleration limit; no motor type in this table
        // currently asks for an asymmetric ramp-down.
        deceleration: type_settings.acceleration,
        speed_tolerance: BASE.speed_tolerance,
        position_tolerance: BASE.position_tolerance,
        stall_speed_limit: BASE.stall_speed_limit,
        stall_time: DEFAULT_STALL_TIME_US,
        pid_kp: type_settings.pid_kp,
        pid_ki: 0,
        pid_kd: type_settings.pid_kd,
        integral_change_max: BASE.integral_change_max,
        actuation_max: 0,
    };

    // pid_ki: chosen so that, driven at the full position tolerance error
    // with no other contribution, the integral term alone reaches
    // actuation_max in about two seconds of ticks-at-the-tolerance.
    // actuation_max must be known first since ki is expressed relative to it.
    settings.actuation_max = model.voltage_to_torque(motor_type.max_voltage_mv());
    let position_tolerance_mdeg = settings.position_tolerance.max(1) as i64;
    const SATURATION_WINDOW_US: i64 = 2_000_000;
    settings.pid_ki = ((settings.actuation_max as i64 * MDEG_PER_DEG)
        / (position_tolerance_mdeg * SATURATION_WINDOW_US / 1_000_000).max(1))
        as i32;

    (settings, model)
}

/// Per-type speed/acceleration/PD constants, transcribed verbatim from
/// `pbio_servo_load_settings()`'s device-type switch.
struct TypeSettings {
    speed_max: i32,
    acceleration: i32,
    pid_kp: i32,
    pid_kd: i32,
}

fn model_and_type_settings(motor_type: MotorType) -> (&'static ObserverModel, TypeSettings) {
    match motor_type {
        MotorType::Ev3Medium => (
            &MODEL_EV3_MEDIUM,
            TypeSettings {
                speed_max: deg_to_mdeg(2000),
                acceleration: deg_to_mdeg(8000),
                pid_kp: 3000,
                pid_kd: 30,
            },
        ),
        MotorType::Ev3Large => (
            &MODEL_EV3_LARGE,
            TypeSettings {
                speed_max: deg_to_mdeg(1600),
                acceleration: deg_to_mdeg(3200),
                pid_kp: 15000,
                pid_kd: 250,
            },
        ),
        MotorType::Interactive => (
            &MODEL_INTERACTIVE,
            TypeSettings {
                speed_max: deg_to_mdeg(1000),
                acceleration: deg_to_mdeg(2000),
                pid_kp: 13500,
                pid_kd: 1350,
            },
        ),
        MotorType::MoveHub => (
            &MODEL_MOVE_HUB,
            TypeSettings {
                speed_max: deg_to_mdeg(1500),
                acceleration: deg_to_mdeg(5000),
                pid_kp: 15000,
                pid_kd: 500,
            },
        ),
        MotorType::TechnicL => (
            &MODEL_TECHNIC_L,
            TypeSettings {
                speed_max: deg_to_mdeg(1470),
                acceleration: deg_to_mdeg(2000),
                pid_kp: 17500,
                pid_kd: 2500,
            },
        ),
        MotorType::TechnicXl => (
            &MODEL_TECHNIC_XL,
            TypeSettings {
                speed_max: deg_to_mdeg(1525),
                acceleration: deg_to_mdeg(2500),
                pid_kp: 17500,
                pid_kd: 2500,
            },
        ),
        MotorType::SpikeS => (
            &MODEL_TECHNIC_S_ANGULAR,
            TypeSettings {
                speed_max: deg_to_mdeg(620),
                acceleration: deg_to_mdeg(2000),
                pid_kp: 7500,
                pid_kd: 1000,
            },
        ),
        MotorType::TechnicMAngular | MotorType::SpikeM => (
            &MODEL_TECHNIC_M_ANGULAR,
            TypeSettings {
                speed_max: deg_to_mdeg(1080),
                acceleration: deg_to_mdeg(2000),
                pid_kp: 15000,
                pid_kd: 1800,
            },
        ),
        MotorType::TechnicLAngular | MotorType::SpikeL => (
            &MODEL_TECHNIC_L_ANGULAR,
            TypeSettings {
                speed_max: deg_to_mdeg(970),
                acceleration: deg_to_mdeg(1500),
                pid_kp: 35000,
                pid_kd: 6000,
            },
        ),
    }
}
