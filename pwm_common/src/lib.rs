//! PWM Common Library
//!
//! Shared types, hardware-driver contracts and configuration loading for the
//! dual-subsystem PWM allocator.
//!
//! # Module Structure
//!
//! - [`pwm`] - PWM constants, identifier types, driver traits, output config
//! - [`config`] - Configuration loading traits and types
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use pwm_common::prelude::*;
//!
//! let pref: DriverPreference = "mcpwm".parse().unwrap();
//! assert_eq!(pref.subsystems(), Subsystems::SLOW);
//! ```

#![deny(missing_docs)]

pub mod config;
pub mod prelude;
pub mod pwm;
