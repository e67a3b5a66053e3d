//! Prelude module for common re-exports.
//!
//! ```rust
//! use pwm_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};
pub use crate::pwm::config::{OutputConfig, PwmConfig};

// ─── Capacity ───────────────────────────────────────────────────────
pub use crate::pwm::consts::{
    DEFAULT_FREQUENCY_HZ, FAST_CHANNEL_COUNT, SLOW_SLOT_COUNT, TOTAL_CHANNEL_COUNT,
};

// ─── Drivers ────────────────────────────────────────────────────────
pub use crate::pwm::driver::{DriverError, FastDriver, SlowDriver};

// ─── Identifiers ────────────────────────────────────────────────────
pub use crate::pwm::types::{
    Assignment, Backend, DriverPreference, Operator, SlowSlot, Subsystems,
};
