use aurus_ultrasonic::UltrasonicConfig;
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use tracing::{error, info};

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
const ENV_PREFIX: &str = "AURUS";

/// Everything the rangefinder binary reads from configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub sensor: UltrasonicConfig,
    pub sampling: SamplingConfig,
    pub simulation: SimulationConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Time between trigger pulses. HC-SR04 wants at least 60 ms.
    pub period_ms: u64,
    /// Stop after this many readings; run forever when unset.
    pub max_readings: Option<u64>,
    /// Raise a fault when no reading or timeout is recorded for this long.
    pub stale_after_ms: u64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        SamplingConfig { period_ms: 100, max_readings: None, stale_after_ms: 500 }
    }
}

/// The simulated obstacle the host-side rig echoes back.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub obstacle_cm: u16,
    pub jitter_cm: u16,
    /// Chance that a trigger gets no echo at all.
    pub dropout_probability: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig { obstacle_cm: 17, jitter_cm: 0, dropout_probability: 0.0 }
    }
}

pub fn load_config() -> Result<AppConfig, ConfigError> {
    info!("Attempting to load configuration from {}", DEFAULT_CONFIG_PATH);

    let settings = Config::builder()
        .add_source(File::new(DEFAULT_CONFIG_PATH, FileFormat::Toml).required(true))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .and_then(|c| c.try_deserialize::<AppConfig>());

    match settings {
        Ok(config) => {
            info!("Successfully loaded configuration: {:?}", config);
            Ok(config)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            Err(e)
        }
    }
}

#[cfg(test)]
fn parse_toml(source: &str) -> Result<AppConfig, ConfigError> {
    Config::builder()
        .add_source(File::from_str(source, FileFormat::Toml))
        .build()?
        .try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use aurus_capture::ClockPrescaler;
    use aurus_ultrasonic::GlitchPolicy;
    use std::time::Duration;

    #[test]
    fn test_empty_source_uses_defaults() {
        let config = parse_toml("").unwrap();
        assert_eq!(config.sensor, UltrasonicConfig::default());
        assert_eq!(config.sampling.period_ms, 100);
        assert_eq!(config.sampling.max_readings, None);
        assert_eq!(config.simulation.obstacle_cm, 17);
    }

    #[test]
    fn test_full_source() {
        let config = parse_toml(
            r#"
            [sensor]
            prescaler = "div64"
            system_clock_hz = 16000000
            echo_timeout_ms = 60

            [sensor.glitch_policy]
            mode = "reject_below"
            min_ticks = 30

            [sampling]
            period_ms = 80
            max_readings = 5

            [simulation]
            obstacle_cm = 120
            jitter_cm = 2
            dropout_probability = 0.1
            "#,
        )
        .unwrap();

        assert_eq!(config.sensor.prescaler, ClockPrescaler::Div64);
        assert_eq!(config.sensor.system_clock_hz, 16_000_000);
        assert_eq!(config.sensor.speed_of_sound_cm_s, 34_000);
        assert_eq!(config.sensor.echo_timeout(), Some(Duration::from_millis(60)));
        assert_eq!(config.sensor.glitch_policy, GlitchPolicy::RejectBelow { min_ticks: 30 });
        assert_eq!(config.sampling.period_ms, 80);
        assert_eq!(config.sampling.max_readings, Some(5));
        assert_eq!(config.simulation.obstacle_cm, 120);
        assert_eq!(config.simulation.jitter_cm, 2);
    }

    #[test]
    fn test_unknown_prescaler_is_rejected() {
        assert!(parse_toml("[sensor]\nprescaler = \"div3\"\n").is_err());
    }

    #[test]
    fn test_shipped_default_file_parses() {
        let config = parse_toml(include_str!("../config/default.toml")).unwrap();
        assert!(config.sensor.validate().is_ok());
        assert!(config.sensor.echo_timeout().is_some());
    }
}
