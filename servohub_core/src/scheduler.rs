//! Periodic scheduler: owns a fixed-size table of servo slots and services
//! them all once per tick.
//!
//! The reference firmware keeps a static `servo[PBDRV_CONFIG_NUM_MOTOR_CONTROLLER]`
//! array; this crate models that as a bounded [`heapless::Vec`] inside
//! [`Controller`], created once at startup and owned by the caller rather
//! than hidden behind a global.

use heapless::Vec;
use tracing::warn;

use crate::error::ServoError;
use crate::servo::{DcMotor, Servo, Tacho};

/// O(1) per-tick timing statistics, used by the demo binary to detect
/// overruns of the configured tick period.
#[derive(Debug, Clone, Copy)]
pub struct PollStats {
    pub tick_count: u64,
    pub last_tick_ns: i64,
    pub max_tick_ns: i64,
    pub overruns: u64,
}

impl PollStats {
    pub const fn new() -> Self {
        PollStats { tick_count: 0, last_tick_ns: 0, max_tick_ns: 0, overruns: 0 }
    }

    /// Records one tick's measured duration against `budget_ns`.
    pub fn record(&mut self, duration_ns: i64, budget_ns: i64) {
        self.tick_count += 1;
        self.last_tick_ns = duration_ns;
        if duration_ns > self.max_tick_ns {
            self.max_tick_ns = duration_ns;
        }
        if duration_ns > budget_ns {
            self.overruns += 1;
        }
    }
}

impl Default for PollStats {
    fn default() -> Self {
        Self::new()
    }
}

/// A fixed-size table of bound servos, indexed by port.
///
/// `N` is the table's capacity (the platform's motor controller count);
/// binding past capacity fails rather than growing the heap, matching the
/// control loop's no-allocation-per-tick requirement.
pub struct Controller<D, T, const N: usize> {
    servos: Vec<Servo<D, T>, N>,
    stats: PollStats,
}

impl<D: DcMotor, T: Tacho, const N: usize> Controller<D, T, N> {
    pub fn new() -> Self {
        Controller { servos: Vec::new(), stats: PollStats::new() }
    }

    pub fn stats(&self) -> PollStats {
        self.stats
    }

    /// Binds a newly-acquired servo into the table. Fails if a servo is
    /// already bound at the same port or the table is full.
    pub fn bind(&mut self, servo: Servo<D, T>) -> Result<(), ServoError> {
        if self.servos.iter().any(|s| s.port() == servo.port()) {
            return Err(ServoError::invalid_port(servo.port()));
        }
        self.servos
            .push(servo)
            .map_err(|_| ServoError::invalid_port("controller table full"))
    }

    pub fn get_mut(&mut self, port: u8) -> Option<&mut Servo<D, T>> {
        self.servos.iter_mut().find(|s| s.port() == port)
    }

    /// Services every bound, connected servo once. A servo whose update
    /// fails is left disconnected by `Servo::control_update` itself; this
    /// loop only logs the failure and moves on, so one faulty servo never
    /// blocks the others' ticks.
    pub fn poll(&mut self, time_now: i64) {
        for servo in self.servos.iter_mut() {
            if !servo.is_connected() {
                continue;
            }
            if let Err(err) = servo.control_update(time_now) {
                warn!(port = servo.port(), %err, "servo tick failed, disconnected");
            }
        }
    }

    /// Records one scheduler tick's wall-clock duration for overrun
    /// detection; `poll` itself does not time its own call so the caller
    /// (which also owns the clock) can bracket exactly what it measures.
    pub fn record_tick(&mut self, duration_ns: i64, budget_ns: i64) {
        self.stats.record(duration_ns, budget_ns);
    }
}

impl<D: DcMotor, T: Tacho, const N: usize> Default for Controller<D, T, N> {
    fn default() -> Self {
        Self::new()
    }
}
