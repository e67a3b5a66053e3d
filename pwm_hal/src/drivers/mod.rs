//! PWM driver implementations.
//!
//! - [`simulation`] - Software LEDC and MCPWM for development and testing
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement `FastDriver` and `SlowDriver` from `pwm_common::pwm::driver`
//! 3. Expose a `fn() -> DriverSet` factory and register it below

pub mod simulation;

use crate::driver_registry::DriverRegistry;

/// Register all built-in drivers.
pub fn register_builtin_drivers(registry: &mut DriverRegistry) {
    registry.register("simulation", simulation::create_drivers);
}
