//! Driver registry for PWM drivers.
//!
//! Provides a `DriverRegistry` struct for registering and retrieving
//! driver-set factories by name. This uses constructor-injection rather
//! than global state.

use crate::backend::DriverSet;
use crate::error::CoreError;
use std::collections::HashMap;

/// Builds one LEDC + MCPWM collaborator pair.
pub type DriverFactory = fn() -> DriverSet;

/// Registry of available PWM drivers.
///
/// Constructed at startup, populated via `register()`, and consulted once
/// when `PwmCore` is built.
pub struct DriverRegistry {
    factories: HashMap<&'static str, DriverFactory>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with every built-in driver registered.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        crate::drivers::register_builtin_drivers(&mut registry);
        registry
    }

    /// Register a driver factory.
    ///
    /// # Panics
    /// Panics if a driver with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: DriverFactory) {
        if self.factories.contains_key(name) {
            panic!("Driver '{name}' is already registered");
        }
        self.factories.insert(name, factory);
    }

    /// Get a driver factory by name.
    pub fn get_factory(&self, name: &str) -> Option<DriverFactory> {
        self.factories.get(name).copied()
    }

    /// Create a driver set by name.
    ///
    /// # Errors
    /// Returns `CoreError::DriverNotFound` if no driver with the given name is registered.
    pub fn create_drivers(&self, name: &str) -> Result<DriverSet, CoreError> {
        let factory = self
            .get_factory(name)
            .ok_or_else(|| CoreError::DriverNotFound(name.to_string()))?;
        Ok(factory())
    }

    /// List all registered driver names, sorted.
    pub fn list_drivers(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}
