//! Error kinds shared across the driver boundary.
//!
//! The control core never invents kinds beyond this set: it forwards what a
//! driver reports, and raises `InvalidPort`/`NotSupported` itself at its own
//! boundary.

/// Classification of a failure at the DC motor / tacho driver boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Driver is not ready; the caller should retry after a short delay.
    Again,
    /// The requested port does not exist or is not configured as a servo.
    InvalidPort,
    /// An argument was out of the operation's valid range.
    InvalidArg,
    /// A device-level I/O failure; the control loop must stop and coast.
    Io,
    /// The device attached to the port does not support the operation
    /// (e.g. an unrecognized motor type).
    NotSupported,
}
