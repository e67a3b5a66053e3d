//! PWM output configuration types.
//!
//! This module contains the configuration loaded from `outputs.toml`:
//! - `PwmConfig` - Top-level file: shared settings, driver, outputs
//! - `OutputConfig` - One `[[outputs]]` table per logical PWM output
//!
//! # TOML Example
//!
//! ```toml
//! driver = "simulation"
//!
//! [shared]
//! service_name = "pwm-bench-01"
//!
//! [[outputs]]
//! id = "fan"
//! pin = 18
//! frequency = 25000.0
//! driver = "ledc"
//! channel = 2
//!
//! [[outputs]]
//! id = "valve"
//! pin = 19
//! frequency = 1000.0
//! driver = "mcpwm"
//! mcpwm_unit = 1
//! mcpwm_timer = 2
//! mcpwm_operator = "B"
//! inverted = true
//! ```

use crate::config::{ConfigError, SharedConfig};
use crate::pwm::consts::{
    DEFAULT_FREQUENCY_HZ, FAST_CHANNEL_COUNT, MAX_CONFIG_CHANNEL, MAX_GPIO, MAX_OUTPUTS,
    SLOW_TIMER_COUNT, SLOW_UNIT_COUNT,
};
use crate::pwm::types::{DriverPreference, Operator, SlowSlot};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Default function for frequency
fn default_frequency() -> f64 {
    DEFAULT_FREQUENCY_HZ
}

/// Configuration of a single PWM output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Unique output identifier.
    pub id: String,

    /// GPIO driven by this output. Missing pins are reported at setup.
    #[serde(default)]
    pub pin: Option<u8>,

    /// PWM frequency in Hz.
    #[serde(default = "default_frequency")]
    pub frequency: f64,

    /// Subsystem preference.
    #[serde(default)]
    pub driver: DriverPreference,

    /// Preferred channel number (0–19). Only 0–7 address an LEDC channel.
    #[serde(default)]
    pub channel: Option<u8>,

    /// Preferred MCPWM unit (0–1).
    #[serde(default)]
    pub mcpwm_unit: Option<u8>,

    /// Preferred MCPWM timer (0–2).
    #[serde(default)]
    pub mcpwm_timer: Option<u8>,

    /// Preferred MCPWM operator. Default: A.
    #[serde(default)]
    pub mcpwm_operator: Option<Operator>,

    /// Invert the written state (`1.0 - state`).
    #[serde(default)]
    pub inverted: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            pin: None,
            frequency: DEFAULT_FREQUENCY_HZ,
            driver: DriverPreference::Auto,
            channel: None,
            mcpwm_unit: None,
            mcpwm_timer: None,
            mcpwm_operator: None,
            inverted: false,
        }
    }
}

impl OutputConfig {
    /// Preferred LEDC channel, if `channel` addresses one.
    pub fn preferred_fast_channel(&self) -> Option<u8> {
        self.channel
            .filter(|&channel| (channel as usize) < FAST_CHANNEL_COUNT)
    }

    /// Preferred MCPWM slot, if any `mcpwm_*` key is present.
    ///
    /// Missing coordinates default to unit 0, timer 0, operator A.
    pub fn preferred_slow_slot(&self) -> Option<SlowSlot> {
        if self.mcpwm_unit.is_none() && self.mcpwm_timer.is_none() && self.mcpwm_operator.is_none()
        {
            return None;
        }
        Some(SlowSlot::new(
            self.mcpwm_unit.unwrap_or(0),
            self.mcpwm_timer.unwrap_or(0),
            self.mcpwm_operator.unwrap_or_default(),
        ))
    }

    /// Validate the output configuration.
    ///
    /// # Validation Rules
    /// 1. `id` is not empty
    /// 2. `frequency` is finite and > 0
    /// 3. `pin` (if set) <= MAX_GPIO
    /// 4. `channel` (if set) <= MAX_CONFIG_CHANNEL
    /// 5. `mcpwm_unit` / `mcpwm_timer` (if set) within hardware range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id.is_empty() {
            return Err(ConfigError::ValidationError(
                "output id cannot be empty".to_string(),
            ));
        }

        if !self.frequency.is_finite() || self.frequency <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "output '{}': frequency must be a positive number of Hz, got {}",
                self.id, self.frequency
            )));
        }

        if let Some(pin) = self.pin {
            if pin > MAX_GPIO {
                return Err(ConfigError::ValidationError(format!(
                    "output '{}': GPIO {} out of range (max {})",
                    self.id, pin, MAX_GPIO
                )));
            }
        }

        if let Some(channel) = self.channel {
            if channel > MAX_CONFIG_CHANNEL {
                return Err(ConfigError::ValidationError(format!(
                    "output '{}': channel {} out of range (0-{})",
                    self.id, channel, MAX_CONFIG_CHANNEL
                )));
            }
        }

        if let Some(unit) = self.mcpwm_unit {
            if unit as usize >= SLOW_UNIT_COUNT {
                return Err(ConfigError::ValidationError(format!(
                    "output '{}': mcpwm_unit {} out of range (0-{})",
                    self.id,
                    unit,
                    SLOW_UNIT_COUNT - 1
                )));
            }
        }

        if let Some(timer) = self.mcpwm_timer {
            if timer as usize >= SLOW_TIMER_COUNT {
                return Err(ConfigError::ValidationError(format!(
                    "output '{}': mcpwm_timer {} out of range (0-{})",
                    self.id,
                    timer,
                    SLOW_TIMER_COUNT - 1
                )));
            }
        }

        Ok(())
    }
}

/// Main configuration loaded from `outputs.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PwmConfig {
    /// Shared service settings.
    pub shared: SharedConfig,

    /// Driver set to load (e.g. "simulation"). CLI `--driver` overrides it.
    #[serde(default)]
    pub driver: Option<String>,

    /// Outputs, set up in file order.
    #[serde(default)]
    pub outputs: Vec<OutputConfig>,
}

impl PwmConfig {
    /// Validate the whole file.
    ///
    /// Duplicate pins are deliberately not rejected here: they are detected
    /// by the allocator at setup and reported as a GPIO conflict.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        if self.outputs.len() > MAX_OUTPUTS {
            return Err(ConfigError::ValidationError(format!(
                "Too many outputs: {} (max {})",
                self.outputs.len(),
                MAX_OUTPUTS
            )));
        }

        let mut ids = HashSet::new();
        for output in &self.outputs {
            output.validate()?;
            if !ids.insert(output.id.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "Duplicate output id: {}",
                    output.id
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigLoader;

    fn output(id: &str, pin: u8) -> OutputConfig {
        OutputConfig {
            id: id.to_string(),
            pin: Some(pin),
            ..Default::default()
        }
    }

    #[test]
    fn test_output_defaults_from_toml() {
        let config = PwmConfig::from_toml(
            r#"
[shared]
service_name = "t"

[[outputs]]
id = "led"
pin = 2
"#,
        )
        .unwrap();

        let out = &config.outputs[0];
        assert_eq!(out.frequency, 50_000.0);
        assert_eq!(out.driver, DriverPreference::Auto);
        assert!(!out.inverted);
        assert_eq!(out.preferred_fast_channel(), None);
        assert_eq!(out.preferred_slow_slot(), None);
        assert!(config.driver.is_none());
    }

    #[test]
    fn test_preferred_fast_channel_ignores_mcpwm_range() {
        let mut out = output("a", 4);
        out.channel = Some(7);
        assert_eq!(out.preferred_fast_channel(), Some(7));
        out.channel = Some(8);
        assert_eq!(out.preferred_fast_channel(), None);
        assert!(out.validate().is_ok());
        out.channel = Some(20);
        assert!(out.validate().is_err());
    }

    #[test]
    fn test_preferred_slow_slot_defaults() {
        let mut out = output("a", 4);
        out.mcpwm_operator = Some(Operator::B);
        assert_eq!(
            out.preferred_slow_slot(),
            Some(SlowSlot::new(0, 0, Operator::B))
        );
        out.mcpwm_unit = Some(1);
        out.mcpwm_timer = Some(2);
        assert_eq!(
            out.preferred_slow_slot(),
            Some(SlowSlot::new(1, 2, Operator::B))
        );
    }

    #[test]
    fn test_validate_frequency() {
        let mut out = output("a", 4);
        out.frequency = 0.0;
        assert!(matches!(
            out.validate(),
            Err(ConfigError::ValidationError(_))
        ));
        out.frequency = f64::NAN;
        assert!(out.validate().is_err());
        out.frequency = 1.0;
        assert!(out.validate().is_ok());
    }

    #[test]
    fn test_validate_mcpwm_ranges() {
        let mut out = output("a", 4);
        out.mcpwm_unit = Some(2);
        assert!(out.validate().is_err());
        out.mcpwm_unit = Some(1);
        out.mcpwm_timer = Some(3);
        assert!(out.validate().is_err());
        out.mcpwm_timer = Some(2);
        assert!(out.validate().is_ok());
    }

    #[test]
    fn test_validate_duplicate_ids() {
        let config = PwmConfig {
            shared: SharedConfig {
                log_level: Default::default(),
                service_name: "t".to_string(),
            },
            driver: None,
            outputs: vec![output("a", 4), output("a", 5)],
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Duplicate output id"));
    }

    #[test]
    fn test_duplicate_pins_pass_validation() {
        let config = PwmConfig {
            shared: SharedConfig {
                log_level: Default::default(),
                service_name: "t".to_string(),
            },
            driver: None,
            outputs: vec![output("a", 4), output("b", 4)],
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_driver_is_parse_error() {
        let result = PwmConfig::from_toml(
            r#"
[shared]
service_name = "t"

[[outputs]]
id = "led"
pin = 2
driver = "rmt"
"#,
        );
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }
}
