//! TOML configuration for the scheduler's demo binary: tick period and the
//! set of enabled ports with their motor type and gear ratio.

use std::path::Path;

use fixed::types::I16F16;
use serde::Deserialize;
use thiserror::Error;

use servohub_common::motor::MotorType;

/// Configuration loading/validation error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io { path: String, source: std::io::Error },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config validation: {0}")]
    Validation(String),
}

/// One enabled port's static configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PortConfig {
    pub port: u8,
    pub motor_type: MotorType,
    /// Output-shaft to motor-shaft gear ratio, e.g. `5.0` for a 5:1
    /// reduction. Parsed into `I16F16` after validation.
    pub gear_ratio: f64,
}

/// Raw, as-parsed scheduler configuration.
#[derive(Debug, Deserialize)]
struct RawSchedulerConfig {
    tick_period_us: i64,
    ports: Vec<PortConfig>,
}

/// Validated scheduler configuration, ready for runtime use.
#[derive(Debug)]
pub struct SchedulerConfig {
    pub tick_period_us: i64,
    pub ports: Vec<PortConfig>,
}

const MIN_TICK_PERIOD_US: i64 = 1_000;
const MAX_TICK_PERIOD_US: i64 = 50_000;

/// Loads and validates a [`SchedulerConfig`] from a TOML file.
///
/// Bounds: `tick_period_us` within `[1_000, 50_000]` (1-50 ms, matching the
/// 5-10 ms typical range from §4.6 with headroom for demo/test use), at
/// least one port, no duplicate ports, and every gear ratio representable
/// in `I16F16` without overflow.
pub fn load_config(path: &Path) -> Result<SchedulerConfig, ConfigError> {
    let raw_toml = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let raw: RawSchedulerConfig = toml::from_str(&raw_toml)?;
    validate(raw)
}

fn validate(raw: RawSchedulerConfig) -> Result<SchedulerConfig, ConfigError> {
    if !(MIN_TICK_PERIOD_US..=MAX_TICK_PERIOD_US).contains(&raw.tick_period_us) {
        return Err(ConfigError::Validation(format!(
            "tick_period_us={} out of range [{MIN_TICK_PERIOD_US}, {MAX_TICK_PERIOD_US}]",
            raw.tick_period_us
        )));
    }
    if raw.ports.is_empty() {
        return Err(ConfigError::Validation("no ports configured".to_string()));
    }

    let mut seen = std::collections::HashSet::new();
    for port in &raw.ports {
        if !seen.insert(port.port) {
            return Err(ConfigError::Validation(format!("duplicate port {}", port.port)));
        }
        if !I16F16::checked_from_num(port.gear_ratio).is_some_and(|r| r > I16F16::from_num(0)) {
            return Err(ConfigError::Validation(format!(
                "port {}: gear_ratio {} is not a valid positive Q16.16 value",
                port.port, port.gear_ratio
            )));
        }
    }

    Ok(SchedulerConfig { tick_period_us: raw.tick_period_us, ports: raw.ports })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> Result<SchedulerConfig, ConfigError> {
        let raw: RawSchedulerConfig = toml::from_str(toml_str).unwrap();
        validate(raw)
    }

    #[test]
    fn accepts_well_formed_config() {
        let cfg = parse(
            r#"
            tick_period_us = 5000
            [[ports]]
            port = 0
            motor_type = "TechnicL"
            gear_ratio = 1.0
            "#,
        )
        .unwrap();
        assert_eq!(cfg.tick_period_us, 5000);
        assert_eq!(cfg.ports.len(), 1);
    }

    #[test]
    fn rejects_tick_period_out_of_range() {
        let err = parse(
            r#"
            tick_period_us = 100
            [[ports]]
            port = 0
            motor_type = "TechnicL"
            gear_ratio = 1.0
            "#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn rejects_duplicate_ports() {
        let err = parse(
            r#"
            tick_period_us = 5000
            [[ports]]
            port = 0
            motor_type = "TechnicL"
            gear_ratio = 1.0
            [[ports]]
            port = 0
            motor_type = "Interactive"
            gear_ratio = 2.0
            "#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn rejects_empty_port_list() {
        let err = parse("tick_period_us = 5000\nports = []\n");
        assert!(err.is_err());
    }
}
