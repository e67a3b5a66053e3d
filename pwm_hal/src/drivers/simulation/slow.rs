//! Simulated MCPWM peripheral.

use super::check_output_gpio;
use pwm_common::pwm::consts::{SLOW_OPERATOR_COUNT, SLOW_TIMER_COUNT, SLOW_UNIT_COUNT};
use pwm_common::pwm::driver::{DriverError, SlowDriver};
use pwm_common::pwm::types::{Operator, SlowSlot};
use std::collections::HashSet;
use tracing::debug;

/// `ESP_FAIL`
const ERR_FAIL: i32 = -1;

/// Per-operator state, indexed `[unit][timer][operator]`.
type OperatorTable<T> = [[[T; SLOW_OPERATOR_COUNT]; SLOW_TIMER_COUNT]; SLOW_UNIT_COUNT];

/// One recorded call into the simulated MCPWM.
#[derive(Debug, Clone, PartialEq)]
pub enum SlowCall {
    /// `init_gpio`
    InitGpio {
        /// Slot routed to the GPIO.
        slot: SlowSlot,
        /// GPIO.
        gpio: u8,
    },
    /// `init_timer`
    InitTimer {
        /// Unit.
        unit: u8,
        /// Timer.
        timer: u8,
        /// Frequency in Hz.
        frequency: f64,
    },
    /// `set_duty_percent`
    SetDutyPercent {
        /// Slot.
        slot: SlowSlot,
        /// Duty in percent.
        percent: f64,
    },
}

/// Software MCPWM implementing [`SlowDriver`].
#[derive(Debug, Default)]
pub struct SimulatedSlowDriver {
    gpios: OperatorTable<Option<u8>>,
    duties: OperatorTable<f64>,
    timers: [[Option<f64>; SLOW_TIMER_COUNT]; SLOW_UNIT_COUNT],
    faulty_gpios: HashSet<u8>,
    calls: Vec<SlowCall>,
}

impl SimulatedSlowDriver {
    /// Create a simulated MCPWM with nothing configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `init_gpio` fail with a hardware error for this GPIO.
    pub fn fail_on_gpio(&mut self, gpio: u8) {
        self.faulty_gpios.insert(gpio);
    }

    /// GPIO routed to a slot.
    pub fn gpio(&self, slot: SlowSlot) -> Option<u8> {
        if !slot.is_valid() {
            return None;
        }
        self.gpios[slot.unit as usize][slot.timer as usize][slot.operator.index()]
    }

    /// Frequency of a started timer.
    pub fn timer_frequency(&self, unit: u8, timer: u8) -> Option<f64> {
        self.timers
            .get(unit as usize)
            .and_then(|timers| timers.get(timer as usize))
            .copied()
            .flatten()
    }

    /// Duty of a slot whose timer has been started.
    pub fn duty_percent(&self, slot: SlowSlot) -> Option<f64> {
        self.timer_frequency(slot.unit, slot.timer)?;
        Some(self.duties[slot.unit as usize][slot.timer as usize][slot.operator.index()])
    }

    /// Every call made so far, oldest first.
    pub fn calls(&self) -> &[SlowCall] {
        &self.calls
    }
}

fn check_slot(unit: u8, timer: u8) -> Result<(), DriverError> {
    if unit as usize >= SLOW_UNIT_COUNT {
        return Err(DriverError::InvalidArgument(format!(
            "MCPWM unit {unit} out of range"
        )));
    }
    if timer as usize >= SLOW_TIMER_COUNT {
        return Err(DriverError::InvalidArgument(format!(
            "MCPWM timer {timer} out of range"
        )));
    }
    Ok(())
}

impl SlowDriver for SimulatedSlowDriver {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn init_gpio(
        &mut self,
        unit: u8,
        timer: u8,
        operator: Operator,
        gpio_pin: u8,
    ) -> Result<(), DriverError> {
        let slot = SlowSlot::new(unit, timer, operator);
        self.calls.push(SlowCall::InitGpio {
            slot,
            gpio: gpio_pin,
        });

        check_slot(unit, timer)?;
        check_output_gpio(gpio_pin)?;
        if self.faulty_gpios.contains(&gpio_pin) {
            return Err(DriverError::Hardware {
                code: ERR_FAIL,
                message: "ESP_FAIL".to_string(),
            });
        }

        debug!(%slot, gpio = gpio_pin, "MCPWM signal routed");
        self.gpios[unit as usize][timer as usize][operator.index()] = Some(gpio_pin);
        Ok(())
    }

    fn init_timer(&mut self, unit: u8, timer: u8, frequency: f64) -> Result<(), DriverError> {
        self.calls.push(SlowCall::InitTimer {
            unit,
            timer,
            frequency,
        });

        check_slot(unit, timer)?;
        if !frequency.is_finite() || frequency <= 0.0 {
            return Err(DriverError::InvalidArgument(format!(
                "frequency {frequency} Hz not supported"
            )));
        }

        debug!(unit, timer, frequency, "MCPWM timer started");
        self.timers[unit as usize][timer as usize] = Some(frequency);
        Ok(())
    }

    fn set_duty_percent(
        &mut self,
        unit: u8,
        timer: u8,
        operator: Operator,
        percent: f64,
    ) -> Result<(), DriverError> {
        let slot = SlowSlot::new(unit, timer, operator);
        self.calls.push(SlowCall::SetDutyPercent { slot, percent });

        check_slot(unit, timer)?;
        if self.timer_frequency(unit, timer).is_none() {
            return Err(DriverError::InvalidState(format!(
                "MCPWM unit {unit} timer {timer} not started"
            )));
        }
        if !(0.0..=100.0).contains(&percent) {
            return Err(DriverError::InvalidArgument(format!(
                "duty {percent}% out of range"
            )));
        }

        self.duties[unit as usize][timer as usize][operator.index()] = percent;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duty_requires_started_timer() {
        let mut sim = SimulatedSlowDriver::new();
        let result = sim.set_duty_percent(0, 0, Operator::A, 50.0);
        assert!(matches!(result, Err(DriverError::InvalidState(_))));
    }

    #[test]
    fn test_operators_share_timer() {
        let mut sim = SimulatedSlowDriver::new();
        sim.init_gpio(0, 1, Operator::A, 12).unwrap();
        sim.init_gpio(0, 1, Operator::B, 13).unwrap();
        sim.init_timer(0, 1, 2_000.0).unwrap();

        sim.set_duty_percent(0, 1, Operator::A, 10.0).unwrap();
        sim.set_duty_percent(0, 1, Operator::B, 90.0).unwrap();

        assert_eq!(sim.duty_percent(SlowSlot::new(0, 1, Operator::A)), Some(10.0));
        assert_eq!(sim.duty_percent(SlowSlot::new(0, 1, Operator::B)), Some(90.0));
        assert_eq!(sim.gpio(SlowSlot::new(0, 1, Operator::B)), Some(13));
    }

    #[test]
    fn test_out_of_range_arguments() {
        let mut sim = SimulatedSlowDriver::new();
        assert!(sim.init_gpio(2, 0, Operator::A, 12).is_err());
        assert!(sim.init_timer(0, 3, 1_000.0).is_err());
        assert!(sim.init_timer(0, 0, 0.0).is_err());
        sim.init_timer(0, 0, 1_000.0).unwrap();
        assert!(sim.set_duty_percent(0, 0, Operator::A, 100.5).is_err());
        assert_eq!(sim.calls().len(), 5);
    }

    #[test]
    fn test_fault_injection() {
        let mut sim = SimulatedSlowDriver::new();
        sim.fail_on_gpio(26);
        assert!(matches!(
            sim.init_gpio(1, 0, Operator::A, 26),
            Err(DriverError::Hardware { code: -1, .. })
        ));
        assert_eq!(sim.gpio(SlowSlot::new(1, 0, Operator::A)), None);
    }
}
