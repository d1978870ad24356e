//! Motor type identifiers.
//!
//! Each variant is a servo-capable device the control core can drive; the
//! identifier is reported by the DC motor driver at `Servo::get` time and
//! used to look up the device's [`ObserverModel`](crate::model::ObserverModel)
//! and [`ControlSettings`](crate::settings::ControlSettings).
//!
//! NXT/EV3 non-servo sensors (color, ultrasonic, touch, ...) report their own
//! device IDs through the same driver interface but are never passed here —
//! they are not drivable as servos and are out of scope for this crate.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MotorType {
    /// EV3 medium motor.
    Ev3Medium,
    /// EV3 large motor.
    Ev3Large,
    /// Powered Up "Interactive" motor.
    Interactive,
    /// BOOST Move Hub internal motor.
    MoveHub,
    /// Technic Large motor.
    TechnicL,
    /// Technic Extra Large motor.
    TechnicXl,
    /// Technic Small angular motor (SPIKE Prime short motor).
    SpikeS,
    /// Technic Medium angular motor.
    TechnicMAngular,
    /// SPIKE Prime medium motor (shares a model with [`TechnicMAngular`](Self::TechnicMAngular)).
    SpikeM,
    /// Technic Large angular motor.
    TechnicLAngular,
    /// SPIKE Prime large motor (shares a model with [`TechnicLAngular`](Self::TechnicLAngular)).
    SpikeL,
}

impl MotorType {
    /// Maximum rated supply voltage for this motor, in millivolts.
    ///
    /// Used to derive `actuation_max` at settings-load time. Every servo
    /// type is rated for 9 V except the SPIKE Prime short motor, which is
    /// rated for 6 V.
    #[inline]
    pub const fn max_voltage_mv(self) -> i32 {
        match self {
            MotorType::SpikeS => 6000,
            _ => 9000,
        }
    }
}
