//! PWM constants, identifier types, driver contracts and output configuration.

pub mod config;
pub mod consts;
pub mod driver;
pub mod types;
