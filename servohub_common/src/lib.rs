//! Motor model tables and control settings shared by the servo control core.
//!
//! This crate holds everything about a motor type that is fixed at compile
//! time: the scaling constants the observer arithmetic runs on, the motor
//! type enumeration, the per-type observer model coefficients, and the
//! control settings derived from them. It has no runtime state of its own;
//! `servohub_core` owns the mutable observer/trajectory/servo state that is
//! built from these tables.
//!
//! # Module structure
//!
//! - [`consts`] - scaling and timing constants shared by the observer and trajectory planner.
//! - [`motor`] - the `MotorType` enumeration.
//! - [`model`] - per-type `ObserverModel` coefficient tables.
//! - [`settings`] - per-type `ControlSettings` derivation.
//! - [`actuation`] - the `ActuationKind` enum exposed at the driver boundary.
//! - [`error`] - the `ErrorKind` enum exposed at the driver boundary.

pub mod actuation;
pub mod consts;
pub mod error;
pub mod model;
pub mod motor;
pub mod settings;
