//! # PWM HAL Library
//!
//! Dual-subsystem PWM channel allocator.
//!
//! Each configured output is granted one channel from either the 8-channel
//! LEDC block or the 12-slot MCPWM block, plus exclusive use of its GPIO.
//! Grants are permanent for the life of the process.
//!
//! # Module Structure
//!
//! - [`core`] - PwmCore struct, setup orchestration
//! - [`output`] - Output allocation unit and its lifecycle
//! - [`allocator`] - Capacity registers for both subsystems and GPIOs
//! - [`backend`] - Backend capability interface (LEDC / MCPWM)
//! - [`duty`] - Frequency → resolution mapping and duty math
//! - [`diagnostics`] - Usage report and troubleshooting hints
//! - [`driver_registry`] - Driver factory registration
//! - [`drivers`] - Driver implementations
//! - [`error`] - Error types
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        pwm_hal (single crate)                    │
//! │  ┌─────────────┐    ┌──────────────┐    ┌─────────────────────┐  │
//! │  │ PwmConfig   │───►│  PwmCore     │◄───│  Driver Registry    │  │
//! │  │ (pwm_common)│    │  (setup)     │    │                     │  │
//! │  └─────────────┘    └──────┬───────┘    └─────────────────────┘  │
//! │                            │ one per output                      │
//! │                            ▼                                     │
//! │  ┌─────────────┐    ┌──────────────┐    ┌─────────────────────┐  │
//! │  │ Allocator   │◄──►│ OutputUnit   │───►│ Grant: Fast | Slow  │  │
//! │  │ (shared)    │    │              │    │ (PwmBackend)        │  │
//! │  └─────────────┘    └──────────────┘    └──────────┬──────────┘  │
//! │                                                    ▼             │
//! │                                      FastDriver / SlowDriver     │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

#![deny(warnings)]
#![deny(missing_docs)]

pub mod allocator;
pub mod backend;
pub mod core;
pub mod diagnostics;
pub mod driver_registry;
pub mod drivers;
pub mod duty;
pub mod error;
pub mod output;

// Re-export key types for convenience
pub use crate::allocator::{AllocatorState, SharedAllocator};
pub use crate::backend::{DriverSet, Grant, PwmBackend};
pub use crate::core::{PwmCore, SetupPolicy, SetupSummary};
pub use crate::diagnostics::UsageReport;
pub use crate::driver_registry::DriverRegistry;
pub use crate::error::{AllocationError, CoreError};
pub use crate::output::{OutputUnit, UnitState};
