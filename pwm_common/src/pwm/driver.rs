//! PWM driver traits and error types.
//!
//! This module defines:
//! - `FastDriver` trait - LEDC register-level collaborator
//! - `SlowDriver` trait - MCPWM register-level collaborator
//! - `DriverError` enum - Error returned by either collaborator
//!
//! The allocator never talks to silicon itself; it calls into these traits
//! once a channel has been granted and propagates their errors unchanged.

use crate::pwm::types::Operator;
use thiserror::Error;

/// Error types for driver operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DriverError {
    /// An argument was outside what the peripheral accepts
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The peripheral is not in a state that allows the call
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The peripheral reported a failure
    #[error("Hardware error {code}: {message}")]
    Hardware {
        /// Vendor error code
        code: i32,
        /// Vendor error name
        message: String,
    },
}

/// LEDC (fast subsystem) driver contract.
///
/// # Lifecycle
///
/// 1. `configure_timer()` then `configure_channel()` - once, at setup
/// 2. `set_duty()` + `commit_duty()` - every state write
pub trait FastDriver {
    /// Returns the driver's unique identifier (e.g., "simulation").
    fn name(&self) -> &'static str;

    /// Configure an LEDC timer for the given duty resolution and frequency.
    fn configure_timer(
        &mut self,
        timer_slot: u8,
        resolution_bits: u32,
        frequency: f64,
    ) -> Result<(), DriverError>;

    /// Bind an LEDC channel to a GPIO and a timer. Initial duty is 0.
    fn configure_channel(
        &mut self,
        channel_index: u8,
        gpio_pin: u8,
        timer_slot: u8,
    ) -> Result<(), DriverError>;

    /// Stage a raw duty value for a channel.
    fn set_duty(&mut self, channel_index: u8, duty_value: u32) -> Result<(), DriverError>;

    /// Latch the staged duty value.
    fn commit_duty(&mut self, channel_index: u8) -> Result<(), DriverError>;
}

/// MCPWM (slow subsystem) driver contract.
///
/// # Lifecycle
///
/// 1. `init_gpio()` then `init_timer()` - once, at setup
/// 2. `set_duty_percent()` - every state write
pub trait SlowDriver {
    /// Returns the driver's unique identifier (e.g., "simulation").
    fn name(&self) -> &'static str;

    /// Route the operator output signal to a GPIO.
    fn init_gpio(
        &mut self,
        unit: u8,
        timer: u8,
        operator: Operator,
        gpio_pin: u8,
    ) -> Result<(), DriverError>;

    /// Start a timer in up-counting mode at the given frequency.
    fn init_timer(&mut self, unit: u8, timer: u8, frequency: f64) -> Result<(), DriverError>;

    /// Set the duty of one operator output in percent (0–100).
    fn set_duty_percent(
        &mut self,
        unit: u8,
        timer: u8,
        operator: Operator,
        percent: f64,
    ) -> Result<(), DriverError>;
}
