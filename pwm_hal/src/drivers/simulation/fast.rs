//! Simulated LEDC peripheral.
//!
//! Tracks timer and channel configuration plus staged/committed duty, and
//! rejects the calls real silicon would reject.

use super::check_output_gpio;
use pwm_common::pwm::consts::{FAST_CHANNEL_COUNT, FAST_TIMER_COUNT};
use pwm_common::pwm::driver::{DriverError, FastDriver};
use std::collections::HashSet;
use tracing::debug;

/// Highest duty resolution the LEDC timer supports.
const MAX_RESOLUTION_BITS: u32 = 20;

/// `ESP_ERR_INVALID_STATE`
const ERR_INVALID_STATE: i32 = 0x103;

/// Configured LEDC timer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FastTimerState {
    /// Duty resolution in bits.
    pub resolution_bits: u32,
    /// Frequency in Hz.
    pub frequency: f64,
}

/// Configured LEDC channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FastChannelState {
    /// Output GPIO.
    pub gpio: u8,
    /// Timer the channel is bound to.
    pub timer_slot: u8,
    /// Duty written but not yet committed.
    pub staged_duty: u32,
    /// Duty currently on the pin.
    pub duty: u32,
}

/// One recorded call into the simulated LEDC.
#[derive(Debug, Clone, PartialEq)]
pub enum FastCall {
    /// `configure_timer`
    ConfigureTimer {
        /// Timer slot.
        timer_slot: u8,
        /// Resolution.
        resolution_bits: u32,
        /// Frequency in Hz.
        frequency: f64,
    },
    /// `configure_channel`
    ConfigureChannel {
        /// Channel.
        channel: u8,
        /// GPIO.
        gpio: u8,
        /// Timer slot.
        timer_slot: u8,
    },
    /// `set_duty`
    SetDuty {
        /// Channel.
        channel: u8,
        /// Raw duty.
        duty: u32,
    },
    /// `commit_duty`
    CommitDuty {
        /// Channel.
        channel: u8,
    },
}

/// Software LEDC implementing [`FastDriver`].
#[derive(Debug, Default)]
pub struct SimulatedFastDriver {
    timers: [Option<FastTimerState>; FAST_TIMER_COUNT],
    channels: [Option<FastChannelState>; FAST_CHANNEL_COUNT],
    faulty_gpios: HashSet<u8>,
    calls: Vec<FastCall>,
}

impl SimulatedFastDriver {
    /// Create a simulated LEDC with nothing configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `configure_channel` fail with a hardware error for this GPIO.
    pub fn fail_on_gpio(&mut self, gpio: u8) {
        self.faulty_gpios.insert(gpio);
    }

    /// Timer state, if configured.
    pub fn timer(&self, timer_slot: u8) -> Option<FastTimerState> {
        self.timers.get(timer_slot as usize).copied().flatten()
    }

    /// Channel state, if configured.
    pub fn channel(&self, channel: u8) -> Option<FastChannelState> {
        self.channels.get(channel as usize).copied().flatten()
    }

    /// Committed duty of a configured channel.
    pub fn duty(&self, channel: u8) -> Option<u32> {
        self.channel(channel).map(|c| c.duty)
    }

    /// Every call made so far, oldest first.
    pub fn calls(&self) -> &[FastCall] {
        &self.calls
    }

    fn configured_channel(&mut self, channel: u8) -> Result<&mut FastChannelState, DriverError> {
        self.channels
            .get_mut(channel as usize)
            .ok_or_else(|| {
                DriverError::InvalidArgument(format!("LEDC channel {channel} out of range"))
            })?
            .as_mut()
            .ok_or_else(|| DriverError::InvalidState(format!("LEDC channel {channel} not configured")))
    }
}

impl FastDriver for SimulatedFastDriver {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn configure_timer(
        &mut self,
        timer_slot: u8,
        resolution_bits: u32,
        frequency: f64,
    ) -> Result<(), DriverError> {
        self.calls.push(FastCall::ConfigureTimer {
            timer_slot,
            resolution_bits,
            frequency,
        });

        if timer_slot as usize >= FAST_TIMER_COUNT {
            return Err(DriverError::InvalidArgument(format!(
                "LEDC timer {timer_slot} out of range"
            )));
        }
        if resolution_bits == 0 || resolution_bits > MAX_RESOLUTION_BITS {
            return Err(DriverError::InvalidArgument(format!(
                "duty resolution {resolution_bits} bits not supported"
            )));
        }
        if !frequency.is_finite() || frequency <= 0.0 {
            return Err(DriverError::InvalidArgument(format!(
                "frequency {frequency} Hz not supported"
            )));
        }

        debug!(timer_slot, resolution_bits, frequency, "LEDC timer configured");
        self.timers[timer_slot as usize] = Some(FastTimerState {
            resolution_bits,
            frequency,
        });
        Ok(())
    }

    fn configure_channel(
        &mut self,
        channel_index: u8,
        gpio_pin: u8,
        timer_slot: u8,
    ) -> Result<(), DriverError> {
        self.calls.push(FastCall::ConfigureChannel {
            channel: channel_index,
            gpio: gpio_pin,
            timer_slot,
        });

        if channel_index as usize >= FAST_CHANNEL_COUNT {
            return Err(DriverError::InvalidArgument(format!(
                "LEDC channel {channel_index} out of range"
            )));
        }
        if self.timer(timer_slot).is_none() {
            return Err(DriverError::InvalidState(format!(
                "LEDC timer {timer_slot} not configured"
            )));
        }
        check_output_gpio(gpio_pin)?;
        if self.faulty_gpios.contains(&gpio_pin) {
            return Err(DriverError::Hardware {
                code: ERR_INVALID_STATE,
                message: "ESP_ERR_INVALID_STATE".to_string(),
            });
        }

        debug!(channel = channel_index, gpio = gpio_pin, timer_slot, "LEDC channel configured");
        self.channels[channel_index as usize] = Some(FastChannelState {
            gpio: gpio_pin,
            timer_slot,
            staged_duty: 0,
            duty: 0,
        });
        Ok(())
    }

    fn set_duty(&mut self, channel_index: u8, duty_value: u32) -> Result<(), DriverError> {
        self.calls.push(FastCall::SetDuty {
            channel: channel_index,
            duty: duty_value,
        });

        let timers = self.timers;
        let state = self.configured_channel(channel_index)?;
        let max = timers[state.timer_slot as usize]
            .map(|t| (1u32 << t.resolution_bits) - 1)
            .unwrap_or(0);
        if duty_value > max {
            return Err(DriverError::InvalidArgument(format!(
                "duty {duty_value} exceeds {max}"
            )));
        }
        state.staged_duty = duty_value;
        Ok(())
    }

    fn commit_duty(&mut self, channel_index: u8) -> Result<(), DriverError> {
        self.calls.push(FastCall::CommitDuty {
            channel: channel_index,
        });

        let state = self.configured_channel(channel_index)?;
        state.duty = state.staged_duty;
        Ok(())
    }
}
