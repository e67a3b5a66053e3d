//! Output allocation unit.
//!
//! One `OutputUnit` per configured output. It claims a GPIO and one channel
//! from the shared allocator, configures the granted backend and from then on
//! translates normalized states into duty writes.
//!
//! # Lifecycle
//!
//! ```text
//! Pending ──allocate()──► Allocated ──configure()──► Operational
//!    │                        │
//!    └────────── error ───────┴────────► Failed (terminal)
//! ```
//!
//! A failed unit keeps whatever it was granted. Claims are never returned to
//! the allocator.

use crate::allocator::SharedAllocator;
use crate::backend::{DriverSet, FastBackend, Grant, PwmBackend, SlowBackend};
use crate::duty::normalize_state;
use crate::error::AllocationError;
use pwm_common::pwm::config::OutputConfig;
use pwm_common::pwm::consts::FAST_TIMER_COUNT;
use pwm_common::pwm::types::{Assignment, Backend, DriverPreference, Subsystems};
use std::fmt;
use tracing::{debug, error, info, warn};

/// Where a unit is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnitState {
    /// Nothing attempted yet.
    #[default]
    Pending,
    /// Channel and GPIO granted, hardware not yet configured.
    Allocated,
    /// Configured; state writes reach the hardware.
    Operational,
    /// Allocation or configuration failed. Terminal.
    Failed,
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Allocated => write!(f, "allocated"),
            Self::Operational => write!(f, "operational"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A single logical PWM output.
pub struct OutputUnit {
    config: OutputConfig,
    allocator: SharedAllocator,
    drivers: DriverSet,
    grant: Option<Grant>,
    state: UnitState,
}

impl OutputUnit {
    /// Create a unit bound to a shared allocator and driver set.
    ///
    /// Nothing is claimed until [`allocate`](Self::allocate).
    pub fn new(config: OutputConfig, allocator: SharedAllocator, drivers: DriverSet) -> Self {
        Self {
            config,
            allocator,
            drivers,
            grant: None,
            state: UnitState::Pending,
        }
    }

    /// Output id.
    pub fn id(&self) -> &str {
        &self.config.id
    }

    /// Configured GPIO, if any.
    pub fn pin(&self) -> Option<u8> {
        self.config.pin
    }

    /// Configured frequency in Hz.
    pub fn frequency(&self) -> f64 {
        self.config.frequency
    }

    /// Requested subsystem.
    pub fn preference(&self) -> DriverPreference {
        self.config.driver
    }

    /// True if written states are inverted.
    pub fn inverted(&self) -> bool {
        self.config.inverted
    }

    /// Lifecycle state.
    pub fn state(&self) -> UnitState {
        self.state
    }

    /// True once configured successfully.
    pub fn is_operational(&self) -> bool {
        self.state == UnitState::Operational
    }

    /// Subsystem granted by the allocator. Stays set after a configure failure.
    pub fn granted_backend(&self) -> Option<Backend> {
        self.grant.as_ref().map(Grant::backend)
    }

    /// Channel or slot granted by the allocator.
    pub fn assignment(&self) -> Option<Assignment> {
        self.grant.as_ref().map(Grant::assignment)
    }

    /// LEDC duty resolution, for fast grants.
    pub fn resolution_bits(&self) -> Option<u32> {
        self.grant.as_ref().and_then(Grant::resolution_bits)
    }

    /// Claim a GPIO and one channel.
    ///
    /// May be called once; later calls return
    /// [`AllocationError::AlreadyAllocated`].
    pub fn allocate(&mut self) -> Result<(), AllocationError> {
        if self.state != UnitState::Pending {
            return Err(AllocationError::AlreadyAllocated);
        }

        debug!(
            id = %self.config.id,
            pin = ?self.config.pin,
            preference = %self.config.driver,
            "Allocating PWM channel"
        );

        match self.try_allocate() {
            Ok(grant) => {
                info!(
                    id = %self.config.id,
                    backend = %grant.backend(),
                    assignment = %grant.assignment(),
                    "PWM channel allocated"
                );
                self.grant = Some(grant);
                self.state = UnitState::Allocated;
                Ok(())
            }
            Err(err) => {
                self.state = UnitState::Failed;
                self.log_failure(&err);
                Err(err)
            }
        }
    }

    // The allocator borrow ends before any unit state changes.
    fn try_allocate(&self) -> Result<Grant, AllocationError> {
        let pin = self
            .config
            .pin
            .ok_or_else(|| AllocationError::Configuration("pin not set".to_string()))?;
        let frequency = self.config.frequency;
        if !frequency.is_finite() || frequency <= 0.0 {
            return Err(AllocationError::Configuration(format!(
                "invalid frequency {frequency} Hz"
            )));
        }

        let mut allocator = self.allocator.borrow_mut();
        if allocator.is_gpio_claimed(pin) {
            return Err(AllocationError::Conflict {
                pin,
                report: Box::new(allocator.snapshot()),
            });
        }

        let preference = self.config.driver;
        let fast_wanted = preference.subsystems().contains(Subsystems::FAST);
        let slow_wanted = preference.subsystems().contains(Subsystems::SLOW);

        let mut grant = None;
        if fast_wanted {
            grant = allocator
                .try_claim_fast_at(self.config.preferred_fast_channel(), frequency)
                .map(|(channel, timer_slot)| {
                    Grant::Fast(FastBackend::new(
                        channel,
                        timer_slot,
                        frequency,
                        self.drivers.fast.clone(),
                    ))
                });
            if grant.is_none() && slow_wanted {
                debug!(id = %self.config.id, "LEDC unavailable, trying MCPWM");
            }
        }
        if grant.is_none() && slow_wanted {
            grant = allocator
                .try_claim_slow(self.config.preferred_slow_slot())
                .map(|slot| Grant::Slow(SlowBackend::new(slot, frequency, self.drivers.slow.clone())));
        }

        let Some(grant) = grant else {
            if preference == DriverPreference::Fast && allocator.has_free_fast_channel() {
                return Err(AllocationError::Configuration(format!(
                    "no free LEDC timer for {frequency} Hz (all {FAST_TIMER_COUNT} timers run other frequencies)"
                )));
            }
            return Err(AllocationError::Exhaustion {
                subsystems: preference.subsystems(),
                report: Box::new(allocator.snapshot()),
            });
        };

        if let Grant::Slow(slow) = &grant {
            let slot = slow.slot();
            if let Some(previous) = allocator.set_slow_timer_frequency(slot, frequency) {
                warn!(
                    id = %self.config.id,
                    %slot,
                    previous,
                    frequency,
                    "MCPWM timer already runs at another frequency; the operator sharing it follows the new one"
                );
            }
        }

        allocator.claim_gpio(pin);
        Ok(grant)
    }

    /// Configure the granted backend.
    ///
    /// A driver failure leaves the unit [`UnitState::Failed`] with its grant
    /// kept for diagnostics.
    pub fn configure(&mut self) -> Result<(), AllocationError> {
        if self.state != UnitState::Allocated {
            return Err(AllocationError::NotOperational);
        }
        let (Some(grant), Some(pin)) = (self.grant.as_mut(), self.config.pin) else {
            return Err(AllocationError::NotOperational);
        };

        match grant.configure(pin) {
            Ok(()) => {
                self.state = UnitState::Operational;
                info!(id = %self.config.id, pin, backend = %grant.backend(), "PWM output ready");
                Ok(())
            }
            Err(err) => {
                self.state = UnitState::Failed;
                error!(
                    id = %self.config.id,
                    pin,
                    backend = %grant.backend(),
                    error = %err,
                    "Failed to configure PWM output"
                );
                Err(err.into())
            }
        }
    }

    /// Allocate, then configure.
    pub fn allocate_and_configure(&mut self) -> Result<(), AllocationError> {
        info!(
            id = %self.config.id,
            pin = ?self.config.pin,
            frequency = self.config.frequency,
            "Setting up PWM output"
        );
        self.allocate()?;
        self.configure()
    }

    /// Write a state in `[0, 1]`. Out-of-range values are clamped, NaN is 0.
    ///
    /// A driver failure is returned but the unit stays operational.
    pub fn write_state(&mut self, state: f64) -> Result<(), AllocationError> {
        let grant = match (self.state, self.grant.as_mut()) {
            (UnitState::Operational, Some(grant)) => grant,
            _ => return Err(AllocationError::NotOperational),
        };

        let level = normalize_state(state, self.config.inverted);
        grant.write_duty(level).map_err(|err| {
            warn!(id = %self.config.id, state, error = %err, "PWM duty write failed");
            AllocationError::from(err)
        })
    }

    /// Log this unit's configuration and grant.
    pub fn dump_config(&self) {
        info!("PWM Output '{}':", self.config.id);
        match self.config.pin {
            Some(pin) => info!("  Pin: GPIO {}", pin),
            None => info!("  Pin: not set"),
        }
        info!("  Frequency: {:.1} Hz", self.config.frequency);
        info!("  Inverted: {}", if self.config.inverted { "yes" } else { "no" });
        info!("  Requested driver: {}", self.config.driver);
        info!("  State: {}", self.state);

        match &self.grant {
            Some(Grant::Fast(fast)) => {
                info!("  Driver: LEDC");
                info!("  Channel: {}", fast.channel());
                info!("  Timer: {}", fast.timer_slot());
                info!("  Resolution: {} bits", fast.resolution_bits());
            }
            Some(Grant::Slow(slow)) => {
                let slot = slow.slot();
                info!("  Driver: MCPWM");
                info!("  Unit: {}", slot.unit);
                info!("  Timer: {}", slot.timer);
                info!("  Operator: {}", slot.operator);
            }
            None => info!("  Driver: not allocated"),
        }
    }

    fn log_failure(&self, err: &AllocationError) {
        error!(id = %self.config.id, error = %err, "PWM allocation failed");
        match err {
            AllocationError::Conflict { pin, report } => {
                error!("GPIO {} is already used by another PWM output", pin);
                error!("Check your configuration for duplicate pin assignments");
                report.log(self.config.driver);
            }
            AllocationError::Exhaustion { report, .. } => report.log(self.config.driver),
            _ => {}
        }
    }
}

impl fmt::Debug for OutputUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputUnit")
            .field("id", &self.config.id)
            .field("pin", &self.config.pin)
            .field("state", &self.state)
            .field("grant", &self.grant)
            .finish_non_exhaustive()
    }
}
