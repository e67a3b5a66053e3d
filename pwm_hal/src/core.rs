//! PWM Core struct and setup orchestration.
//!
//! The `PwmCore` struct is the main entry point for PWM operations.
//! It owns the allocator, one [`OutputUnit`] per configured output, and runs
//! the sequential setup pass.

use crate::allocator::{AllocatorState, SharedAllocator};
use crate::backend::DriverSet;
use crate::diagnostics::UsageReport;
use crate::driver_registry::DriverRegistry;
use crate::error::{AllocationError, CoreError};
use crate::output::OutputUnit;
use pwm_common::config::ConfigLoader;
use pwm_common::pwm::config::PwmConfig;
use pwm_common::pwm::consts::DEFAULT_DRIVER;
use std::path::Path;
use tracing::{error, info, warn};

/// What the host does when an output fails to set up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SetupPolicy {
    /// Keep going; failed outputs stay non-operational.
    #[default]
    ContinueDegraded,
    /// Stop at the first failed output.
    AbortOnFailure,
}

/// Outcome of [`PwmCore::setup_all`].
#[derive(Debug, Default)]
pub struct SetupSummary {
    /// Outputs that became operational, in setup order.
    pub operational: Vec<String>,
    /// Outputs that failed, with the error each one reported.
    pub failed: Vec<(String, AllocationError)>,
    /// Outputs never attempted because setup aborted.
    pub skipped: Vec<String>,
    /// True if [`SetupPolicy::AbortOnFailure`] stopped the pass.
    pub aborted: bool,
}

impl SetupSummary {
    /// True if every output is operational.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }

    /// First failure as a [`CoreError`], if any.
    pub fn first_error(&self) -> Option<CoreError> {
        self.failed.first().map(|(id, err)| CoreError::Output {
            id: id.clone(),
            source: err.clone(),
        })
    }
}

/// PWM Core manages the allocator and all outputs.
pub struct PwmCore {
    /// Loaded configuration
    config: PwmConfig,
    /// Allocator shared by every output
    allocator: SharedAllocator,
    /// Outputs in configuration order
    outputs: Vec<OutputUnit>,
}

impl PwmCore {
    /// Create a PwmCore with a fresh allocator and one unit per output.
    ///
    /// # Errors
    /// Returns error if configuration validation fails.
    pub fn from_config(config: PwmConfig, drivers: DriverSet) -> Result<Self, CoreError> {
        config.validate()?;

        let allocator = AllocatorState::shared();
        let outputs = config
            .outputs
            .iter()
            .map(|output| OutputUnit::new(output.clone(), allocator.clone(), drivers.clone()))
            .collect();

        info!(
            service = %config.shared.service_name,
            outputs = config.outputs.len(),
            drivers = ?drivers,
            "PwmCore created"
        );

        Ok(Self {
            config,
            allocator,
            outputs,
        })
    }

    /// Create a PwmCore with drivers looked up in `registry`.
    ///
    /// `driver_override` wins over the config's `driver`, which wins over
    /// the default simulation driver.
    pub fn with_registry(
        config: PwmConfig,
        registry: &DriverRegistry,
        driver_override: Option<&str>,
    ) -> Result<Self, CoreError> {
        let name = driver_override
            .or(config.driver.as_deref())
            .unwrap_or(DEFAULT_DRIVER)
            .to_string();
        info!("Using driver '{}'", name);
        let drivers = registry.create_drivers(&name)?;
        Self::from_config(config, drivers)
    }

    /// Load and validate a PWM configuration file.
    pub fn load_config(path: &Path) -> Result<PwmConfig, CoreError> {
        info!("Loading configuration from {:?}", path);
        let config = PwmConfig::load(path)?;
        config.validate()?;
        info!(
            "Loaded config: driver={:?}, {} outputs",
            config.driver,
            config.outputs.len()
        );
        Ok(config)
    }

    /// Set up every output in configuration order.
    pub fn setup_all(&mut self, policy: SetupPolicy) -> SetupSummary {
        info!("Setting up {} PWM outputs", self.outputs.len());
        let mut summary = SetupSummary::default();

        for unit in &mut self.outputs {
            if summary.aborted {
                summary.skipped.push(unit.id().to_string());
                continue;
            }
            match unit.allocate_and_configure() {
                Ok(()) => summary.operational.push(unit.id().to_string()),
                Err(err) => {
                    error!(id = unit.id(), error = %err, "PWM output setup failed");
                    summary.failed.push((unit.id().to_string(), err));
                    if policy == SetupPolicy::AbortOnFailure {
                        summary.aborted = true;
                    }
                }
            }
        }

        if summary.is_complete() {
            info!("All {} PWM outputs operational", summary.operational.len());
        } else {
            warn!(
                operational = summary.operational.len(),
                failed = summary.failed.len(),
                skipped = summary.skipped.len(),
                "PWM setup incomplete"
            );
        }
        summary
    }

    /// Write a state to an output by id.
    pub fn write(&mut self, id: &str, value: f64) -> Result<(), CoreError> {
        let unit = self
            .outputs
            .iter_mut()
            .find(|unit| unit.id() == id)
            .ok_or_else(|| CoreError::UnknownOutput(id.to_string()))?;
        unit.write_state(value).map_err(|source| CoreError::Output {
            id: id.to_string(),
            source,
        })
    }

    /// Output by id.
    pub fn output(&self, id: &str) -> Option<&OutputUnit> {
        self.outputs.iter().find(|unit| unit.id() == id)
    }

    /// All outputs in configuration order.
    pub fn outputs(&self) -> &[OutputUnit] {
        &self.outputs
    }

    /// Current allocator usage.
    pub fn report(&self) -> UsageReport {
        self.allocator.borrow().snapshot()
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &PwmConfig {
        &self.config
    }

    /// Log every output's configuration.
    pub fn dump_config(&self) {
        for unit in &self.outputs {
            unit.dump_config();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::simulation;
    use pwm_common::config::SharedConfig;
    use pwm_common::pwm::config::OutputConfig;

    fn config(pins: &[u8]) -> PwmConfig {
        PwmConfig {
            shared: SharedConfig {
                log_level: Default::default(),
                service_name: "test".to_string(),
            },
            driver: None,
            outputs: pins
                .iter()
                .enumerate()
                .map(|(idx, &pin)| OutputConfig {
                    id: format!("out{idx}"),
                    pin: Some(pin),
                    ..Default::default()
                })
                .collect(),
        }
    }

    #[test]
    fn test_setup_all_continue() {
        let mut core = PwmCore::from_config(config(&[4, 4, 5]), simulation::create_drivers()).unwrap();
        let summary = core.setup_all(SetupPolicy::ContinueDegraded);
        assert_eq!(summary.operational, vec!["out0", "out2"]);
        assert_eq!(summary.failed.len(), 1);
        assert!(!summary.aborted);
        assert!(summary.skipped.is_empty());
    }

    #[test]
    fn test_setup_all_abort() {
        let mut core = PwmCore::from_config(config(&[4, 4, 5]), simulation::create_drivers()).unwrap();
        let summary = core.setup_all(SetupPolicy::AbortOnFailure);
        assert!(summary.aborted);
        assert_eq!(summary.skipped, vec!["out2"]);
        assert!(matches!(
            summary.first_error(),
            Some(CoreError::Output { ref id, .. }) if id == "out1"
        ));
    }

    #[test]
    fn test_write_unknown_output() {
        let mut core = PwmCore::from_config(config(&[4]), simulation::create_drivers()).unwrap();
        core.setup_all(SetupPolicy::default());
        assert!(matches!(core.write("nope", 0.5), Err(CoreError::UnknownOutput(_))));
        assert!(core.write("out0", 0.5).is_ok());
    }

    #[test]
    fn test_with_registry_unknown_driver() {
        let registry = DriverRegistry::with_builtin();
        let result = PwmCore::with_registry(config(&[4]), &registry, Some("esp-idf"));
        assert!(matches!(result, Err(CoreError::DriverNotFound(_))));
    }
}
