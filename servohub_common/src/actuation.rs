//! Actuation commands the control law hands to the DC motor driver.

/// How the motor should respond to the control law's output this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuationKind {
    /// Let the motor freewheel; no braking force.
    Coast,
    /// Short the motor terminals for passive braking.
    Brake,
    /// Closed-loop position hold at the value carried alongside this kind.
    Hold,
    /// Open-loop duty/voltage command carried alongside this kind.
    Duty,
}
