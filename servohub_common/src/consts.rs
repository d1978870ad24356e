//! Scaling constants shared between the observer, trajectory planner, and
//! control law.
//!
//! All values are transcribed from the reference firmware's fixed-point
//! convention: positions are tracked in millidegrees internally and exposed
//! to callers in degrees, and every observer-model coefficient is scaled by
//! one of the `PRESCALE_*` constants so that the discrete state update can
//! run with plain integer division.

/// Millidegrees per degree. Internal angle/speed state is tracked in this
/// unit; user-facing angles and speeds are in whole degrees.
pub const MDEG_PER_DEG: i64 = 1000;

/// Maximum magnitude of the observer's internal `angle` value before it
/// wraps and `angle_offset` absorbs the difference.
pub const MDEG_MAX: i64 = 1_000_000 * MDEG_PER_DEG;

/// Microseconds per millisecond, used to convert `stall_time` and similar
/// duration settings into the microsecond clock domain the observer runs on.
pub const US_PER_MS: i64 = 1000;

/// Encoder counts per degree at the tacho boundary. The reference firmware
/// reads this from a platform config (`PBDRV_CONFIG_COUNTER_COUNTS_PER_DEGREE`)
/// which defaults to 1 on every shipped platform; gearing is folded into the
/// tacho's gear ratio instead; this core normalizes on that same default.
pub const COUNTS_PER_DEG: i32 = 1;

/// Fixed scale applied to the speed term of the observer's state-transition
/// coefficients.
pub const PRESCALE_SPEED: i64 = 1000;
/// Fixed scale applied to the current term of the observer's state-transition
/// coefficients.
pub const PRESCALE_CURRENT: i64 = 1000;
/// Fixed scale applied to the voltage input term of the observer's
/// state-transition coefficients, and to `torque_to_voltage`/`voltage_to_torque`.
pub const PRESCALE_VOLTAGE: i64 = 1000;
/// Fixed scale applied to the modeled friction torque term.
pub const PRESCALE_TORQUE: i64 = 1000;
/// Fixed scale applied to the acceleration-feedforward term.
pub const PRESCALE_ACCELERATION: i64 = 1000;

/// Converts whole degrees to millidegrees.
#[inline]
pub const fn deg_to_mdeg(deg: i32) -> i32 {
    deg * MDEG_PER_DEG as i32
}

/// Default stall duration before `is_stalled` reports true, in microseconds.
///
/// The reference firmware's per-type settings blocks write
/// `stall_time = 200 * US_PER_MS`, but the function that actually wins at
/// setup time overwrites it with `pbio_control_time_ms_to_ticks(200)` —
/// the same 200 ms, expressed directly in this crate's microsecond domain.
pub const DEFAULT_STALL_TIME_US: i32 = 200 * US_PER_MS as i32;

/// A motion command with no finite end time (`run`, `run_until_stalled`).
pub const DURATION_FOREVER: i64 = i64::MAX;
