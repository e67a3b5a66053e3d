//! Backend capability interface.
//!
//! A granted output owns a [`Grant`]: either a [`FastBackend`] (LEDC
//! channel) or a [`SlowBackend`] (MCPWM slot). Both implement
//! [`PwmBackend`], so the output only decides *which* variant it got and
//! never how to drive it.

use crate::duty::{fast_duty, resolution_for, slow_duty_percent};
use pwm_common::pwm::driver::{DriverError, FastDriver, SlowDriver};
use pwm_common::pwm::types::{Assignment, Backend, SlowSlot};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::trace;

/// LEDC driver shared by every fast backend.
pub type SharedFastDriver = Rc<RefCell<dyn FastDriver>>;

/// MCPWM driver shared by every slow backend.
pub type SharedSlowDriver = Rc<RefCell<dyn SlowDriver>>;

/// One collaborator per subsystem.
#[derive(Clone)]
pub struct DriverSet {
    /// LEDC collaborator.
    pub fast: SharedFastDriver,
    /// MCPWM collaborator.
    pub slow: SharedSlowDriver,
}

impl DriverSet {
    /// Bundle two collaborators.
    pub fn new(fast: SharedFastDriver, slow: SharedSlowDriver) -> Self {
        Self { fast, slow }
    }
}

impl fmt::Debug for DriverSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverSet")
            .field("fast", &self.fast.borrow().name())
            .field("slow", &self.slow.borrow().name())
            .finish()
    }
}

/// What every backend can do once granted.
pub trait PwmBackend {
    /// Configure the hardware for `pin`. Called once, after allocation.
    fn configure(&mut self, pin: u8) -> Result<(), DriverError>;

    /// Write a normalized level (already clamped and inverted).
    fn write_duty(&mut self, level: f64) -> Result<(), DriverError>;
}

// ─── LEDC ───────────────────────────────────────────────────────────

/// LEDC channel backend.
pub struct FastBackend {
    channel: u8,
    timer_slot: u8,
    frequency: f64,
    resolution_bits: u32,
    driver: SharedFastDriver,
}

impl FastBackend {
    /// Backend for a granted LEDC channel on a granted timer; resolution
    /// follows `frequency`.
    pub fn new(channel: u8, timer_slot: u8, frequency: f64, driver: SharedFastDriver) -> Self {
        Self {
            channel,
            timer_slot,
            frequency,
            resolution_bits: resolution_for(frequency),
            driver,
        }
    }

    /// Granted LEDC channel.
    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// LEDC timer driving the channel.
    pub fn timer_slot(&self) -> u8 {
        self.timer_slot
    }

    /// Duty resolution in bits.
    pub fn resolution_bits(&self) -> u32 {
        self.resolution_bits
    }
}

impl PwmBackend for FastBackend {
    fn configure(&mut self, pin: u8) -> Result<(), DriverError> {
        let mut driver = self.driver.borrow_mut();
        driver.configure_timer(self.timer_slot, self.resolution_bits, self.frequency)?;
        driver.configure_channel(self.channel, pin, self.timer_slot)
    }

    fn write_duty(&mut self, level: f64) -> Result<(), DriverError> {
        let duty = fast_duty(level, self.resolution_bits);
        trace!(channel = self.channel, duty, "LEDC duty");
        let mut driver = self.driver.borrow_mut();
        driver.set_duty(self.channel, duty)?;
        driver.commit_duty(self.channel)
    }
}

impl fmt::Debug for FastBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FastBackend")
            .field("channel", &self.channel)
            .field("timer_slot", &self.timer_slot)
            .field("frequency", &self.frequency)
            .field("resolution_bits", &self.resolution_bits)
            .finish_non_exhaustive()
    }
}

// ─── MCPWM ──────────────────────────────────────────────────────────

/// MCPWM operator backend.
pub struct SlowBackend {
    slot: SlowSlot,
    frequency: f64,
    driver: SharedSlowDriver,
}

impl SlowBackend {
    /// Backend for a granted MCPWM slot.
    pub fn new(slot: SlowSlot, frequency: f64, driver: SharedSlowDriver) -> Self {
        Self {
            slot,
            frequency,
            driver,
        }
    }

    /// Granted slot.
    pub fn slot(&self) -> SlowSlot {
        self.slot
    }
}

impl PwmBackend for SlowBackend {
    fn configure(&mut self, pin: u8) -> Result<(), DriverError> {
        let SlowSlot {
            unit,
            timer,
            operator,
        } = self.slot;
        let mut driver = self.driver.borrow_mut();
        driver.init_gpio(unit, timer, operator, pin)?;
        driver.init_timer(unit, timer, self.frequency)
    }

    fn write_duty(&mut self, level: f64) -> Result<(), DriverError> {
        let percent = slow_duty_percent(level);
        let SlowSlot {
            unit,
            timer,
            operator,
        } = self.slot;
        trace!(slot = %self.slot, percent, "MCPWM duty");
        self.driver
            .borrow_mut()
            .set_duty_percent(unit, timer, operator, percent)
    }
}

impl fmt::Debug for SlowBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlowBackend")
            .field("slot", &self.slot)
            .field("frequency", &self.frequency)
            .finish_non_exhaustive()
    }
}

// ─── Grant ──────────────────────────────────────────────────────────

/// Backend granted to an output.
#[derive(Debug)]
pub enum Grant {
    /// LEDC channel.
    Fast(FastBackend),
    /// MCPWM slot.
    Slow(SlowBackend),
}

impl Grant {
    /// Which subsystem was granted.
    pub fn backend(&self) -> Backend {
        match self {
            Self::Fast(_) => Backend::Fast,
            Self::Slow(_) => Backend::Slow,
        }
    }

    /// The concrete resource.
    pub fn assignment(&self) -> Assignment {
        match self {
            Self::Fast(fast) => Assignment::Fast {
                channel: fast.channel(),
            },
            Self::Slow(slow) => Assignment::Slow(slow.slot()),
        }
    }

    /// LEDC resolution, if this is a fast grant.
    pub fn resolution_bits(&self) -> Option<u32> {
        match self {
            Self::Fast(fast) => Some(fast.resolution_bits()),
            Self::Slow(_) => None,
        }
    }
}

impl PwmBackend for Grant {
    fn configure(&mut self, pin: u8) -> Result<(), DriverError> {
        match self {
            Self::Fast(fast) => fast.configure(pin),
            Self::Slow(slow) => slow.configure(pin),
        }
    }

    fn write_duty(&mut self, level: f64) -> Result<(), DriverError> {
        match self {
            Self::Fast(fast) => fast.write_duty(level),
            Self::Slow(slow) => slow.write_duty(level),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::simulation::{SimulatedFastDriver, SimulatedSlowDriver};
    use pwm_common::pwm::types::Operator;

    #[test]
    fn test_fast_backend_configure_and_write() {
        let sim = Rc::new(RefCell::new(SimulatedFastDriver::new()));
        let mut backend = FastBackend::new(3, 1, 25_000.0, sim.clone());
        assert_eq!(backend.resolution_bits(), 11);

        backend.configure(18).unwrap();
        backend.write_duty(1.0).unwrap();

        let sim = sim.borrow();
        let timer = sim.timer(1).unwrap();
        assert_eq!(timer.resolution_bits, 11);
        assert_eq!(sim.timer(0), None);
        assert_eq!(sim.channel(3).unwrap().gpio, 18);
        assert_eq!(sim.channel(3).unwrap().timer_slot, 1);
        assert_eq!(sim.duty(3), Some(2047));
    }

    #[test]
    fn test_slow_backend_configure_and_write() {
        let sim = Rc::new(RefCell::new(SimulatedSlowDriver::new()));
        let slot = SlowSlot::new(1, 2, Operator::B);
        let mut backend = SlowBackend::new(slot, 1_000.0, sim.clone());

        backend.configure(19).unwrap();
        backend.write_duty(0.25).unwrap();

        let sim = sim.borrow();
        assert_eq!(sim.gpio(slot), Some(19));
        assert_eq!(sim.timer_frequency(1, 2), Some(1_000.0));
        assert_eq!(sim.duty_percent(slot), Some(25.0));
    }

    #[test]
    fn test_grant_dispatch() {
        let fast = Rc::new(RefCell::new(SimulatedFastDriver::new()));
        let grant = Grant::Fast(FastBackend::new(0, 0, 50_000.0, fast));
        assert_eq!(grant.backend(), Backend::Fast);
        assert_eq!(grant.assignment(), Assignment::Fast { channel: 0 });
        assert_eq!(grant.resolution_bits(), Some(10));

        let slow = Rc::new(RefCell::new(SimulatedSlowDriver::new()));
        let slot = SlowSlot::new(0, 1, Operator::A);
        let grant = Grant::Slow(SlowBackend::new(slot, 50_000.0, slow));
        assert_eq!(grant.backend(), Backend::Slow);
        assert_eq!(grant.assignment(), Assignment::Slow(slot));
        assert_eq!(grant.resolution_bits(), None);
    }
}
