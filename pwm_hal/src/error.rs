//! Error types for allocation, output lifecycle and the core.
//!
//! `AllocationError` is what a single output's setup or state write fails
//! with. `CoreError` wraps everything the host-facing `PwmCore` and the
//! binary can fail with.

use crate::diagnostics::UsageReport;
use pwm_common::config::ConfigError;
use pwm_common::pwm::consts::{FAST_CHANNEL_COUNT, SLOW_SLOT_COUNT, TOTAL_CHANNEL_COUNT};
use pwm_common::pwm::driver::DriverError;
use pwm_common::pwm::types::Subsystems;
use thiserror::Error;

/// Why an output could not be allocated, configured or written.
///
/// Conflict and exhaustion carry the allocator snapshot taken at the moment
/// of failure, so the caller can explain it without re-reading state.
#[derive(Debug, Clone, Error)]
pub enum AllocationError {
    /// Missing or invalid output parameters.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The GPIO is already driven by another output.
    #[error("GPIO {pin} already in use by another PWM output")]
    Conflict {
        /// Contested GPIO.
        pin: u8,
        /// Allocator state at the time of the conflict.
        report: Box<UsageReport>,
    },

    /// No free channel in the subsystem(s) the output may use.
    #[error("{}", exhaustion_reason(.subsystems))]
    Exhaustion {
        /// Subsystems that were tried and found full.
        subsystems: Subsystems,
        /// Allocator state at the time of the failure.
        report: Box<UsageReport>,
    },

    /// A hardware driver call failed.
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// `allocate()` was called a second time on the same output.
    #[error("Output has already been allocated")]
    AlreadyAllocated,

    /// A state write on an output that never became operational.
    #[error("Output is not operational")]
    NotOperational,
}

impl AllocationError {
    /// Allocator snapshot attached to conflict and exhaustion errors.
    pub fn report(&self) -> Option<&UsageReport> {
        match self {
            Self::Conflict { report, .. } | Self::Exhaustion { report, .. } => Some(report.as_ref()),
            _ => None,
        }
    }
}

fn exhaustion_reason(subsystems: &Subsystems) -> String {
    if *subsystems == Subsystems::BOTH {
        format!(
            "All {TOTAL_CHANNEL_COUNT} PWM channels exhausted ({FAST_CHANNEL_COUNT} LEDC + {SLOW_SLOT_COUNT} MCPWM)"
        )
    } else if *subsystems == Subsystems::FAST {
        format!("All {FAST_CHANNEL_COUNT} LEDC channels exhausted")
    } else {
        format!("All {SLOW_SLOT_COUNT} MCPWM channels exhausted")
    }
}

/// Errors surfaced by `PwmCore` and the binary.
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    /// Configuration could not be loaded or validated.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// No driver set registered under this name.
    #[error("Driver not found: {0}")]
    DriverNotFound(String),

    /// No output with this id.
    #[error("Unknown output: {0}")]
    UnknownOutput(String),

    /// An output failed.
    #[error("Output '{id}': {source}")]
    Output {
        /// Output id.
        id: String,
        /// Underlying failure.
        #[source]
        source: AllocationError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::AllocatorState;

    #[test]
    fn test_exhaustion_messages() {
        let report = Box::new(AllocatorState::new().snapshot());
        let err = AllocationError::Exhaustion {
            subsystems: Subsystems::FAST,
            report: report.clone(),
        };
        assert_eq!(err.to_string(), "All 8 LEDC channels exhausted");

        let err = AllocationError::Exhaustion {
            subsystems: Subsystems::SLOW,
            report: report.clone(),
        };
        assert_eq!(err.to_string(), "All 12 MCPWM channels exhausted");

        let err = AllocationError::Exhaustion {
            subsystems: Subsystems::BOTH,
            report,
        };
        assert_eq!(
            err.to_string(),
            "All 20 PWM channels exhausted (8 LEDC + 12 MCPWM)"
        );
        assert!(err.report().is_some());
    }

    #[test]
    fn test_driver_error_is_propagated_verbatim() {
        let inner = DriverError::InvalidArgument("GPIO 34 is input-only".to_string());
        let err = AllocationError::from(inner.clone());
        assert!(matches!(&err, AllocationError::Driver(e) if *e == inner));
        assert!(err.to_string().contains("GPIO 34 is input-only"));
        assert!(err.report().is_none());
    }

    #[test]
    fn test_core_error_output_display() {
        let err = CoreError::Output {
            id: "fan".to_string(),
            source: AllocationError::Configuration("pin not set".to_string()),
        };
        assert_eq!(err.to_string(), "Output 'fan': Configuration error: pin not set");
    }
}
