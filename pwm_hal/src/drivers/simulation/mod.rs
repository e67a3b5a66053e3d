//! Simulation driver module.
//!
//! Software LEDC and MCPWM peripherals for development and testing without
//! physical hardware. Both record every call and can be told to fail on a
//! given GPIO.

mod fast;
mod slow;

pub use fast::{FastCall, FastChannelState, FastTimerState, SimulatedFastDriver};
pub use slow::{SimulatedSlowDriver, SlowCall};

use crate::backend::DriverSet;
use pwm_common::pwm::consts::MAX_GPIO;
use pwm_common::pwm::driver::DriverError;
use std::cell::RefCell;
use std::rc::Rc;

/// First GPIO of the input-only bank (34–39).
const FIRST_INPUT_ONLY_GPIO: u8 = 34;

/// GPIOs wired to the SPI flash.
const FLASH_GPIOS: std::ops::RangeInclusive<u8> = 6..=11;

/// Gaps in the GPIO numbering.
const MISSING_GPIOS: [u8; 6] = [20, 24, 28, 29, 30, 31];

/// Reject GPIOs that cannot drive an output.
fn check_output_gpio(gpio: u8) -> Result<(), DriverError> {
    if gpio > MAX_GPIO || MISSING_GPIOS.contains(&gpio) {
        return Err(DriverError::InvalidArgument(format!(
            "GPIO {gpio} does not exist"
        )));
    }
    if FLASH_GPIOS.contains(&gpio) {
        return Err(DriverError::InvalidArgument(format!(
            "GPIO {gpio} is reserved for SPI flash"
        )));
    }
    if gpio >= FIRST_INPUT_ONLY_GPIO {
        return Err(DriverError::InvalidArgument(format!(
            "GPIO {gpio} is input-only"
        )));
    }
    Ok(())
}

/// Factory function to create a simulated driver set.
pub fn create_drivers() -> DriverSet {
    DriverSet::new(
        Rc::new(RefCell::new(SimulatedFastDriver::new())),
        Rc::new(RefCell::new(SimulatedSlowDriver::new())),
    )
}

/// Simulated drivers with typed handles kept for inspection.
///
/// `drivers()` hands out trait-object clones of the same peripherals, so a
/// test can set up outputs through the allocator and then look at what the
/// "hardware" saw.
#[derive(Debug, Clone, Default)]
pub struct SimulatedHardware {
    /// LEDC handle.
    pub fast: Rc<RefCell<SimulatedFastDriver>>,
    /// MCPWM handle.
    pub slow: Rc<RefCell<SimulatedSlowDriver>>,
}

impl SimulatedHardware {
    /// Fresh simulated peripherals.
    pub fn new() -> Self {
        Self::default()
    }

    /// Driver set backed by these peripherals.
    pub fn drivers(&self) -> DriverSet {
        DriverSet::new(self.fast.clone(), self.slow.clone())
    }
}
