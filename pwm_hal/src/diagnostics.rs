//! Allocator usage report.
//!
//! A read-only snapshot of the capacity registers, used to explain failed
//! setups to a human. Nothing in here feeds back into allocation decisions.
//!
//! Channel numbering follows the report convention: LEDC channels are 0–7,
//! MCPWM slots are 8–19 in allocation scan order (unit → timer → operator).

use crate::allocator::AllocatorState;
use pwm_common::pwm::consts::{
    FAST_CHANNEL_COUNT, FAST_TIMER_COUNT, SLOW_SLOT_COUNT, TOTAL_CHANNEL_COUNT,
};
use pwm_common::pwm::types::{DriverPreference, SlowSlot, Subsystems};
use serde::Serialize;
use std::fmt;
use tracing::error;

/// Claim state of one LEDC channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelUsage {
    /// LEDC channel index (0–7).
    pub channel: u8,
    /// True once granted to an output.
    pub claimed: bool,
}

/// Claim state of one MCPWM slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotUsage {
    /// Report channel number (8–19).
    pub channel: usize,
    /// Slot coordinate.
    pub slot: SlowSlot,
    /// True once granted to an output.
    pub claimed: bool,
}

/// Snapshot of all capacity registers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageReport {
    /// LEDC channels 0–7.
    pub fast: [ChannelUsage; FAST_CHANNEL_COUNT],
    /// Frequency each LEDC timer runs at, `None` when free.
    pub fast_timers: [Option<f64>; FAST_TIMER_COUNT],
    /// MCPWM slots in scan order.
    pub slow: heapless::Vec<SlotUsage, SLOW_SLOT_COUNT>,
    /// Claimed GPIOs, ascending.
    pub claimed_pins: Vec<u8>,
    /// Free LEDC channels.
    pub fast_free: usize,
    /// Free MCPWM slots.
    pub slow_free: usize,
}

impl UsageReport {
    /// Build a report from the allocator state.
    pub fn capture(state: &AllocatorState) -> Self {
        let fast: [ChannelUsage; FAST_CHANNEL_COUNT] = std::array::from_fn(|idx| {
            let channel = idx as u8;
            ChannelUsage {
                channel,
                claimed: state.is_fast_claimed(channel),
            }
        });

        let slow: heapless::Vec<SlotUsage, SLOW_SLOT_COUNT> = SlowSlot::scan_order()
            .map(|slot| SlotUsage {
                channel: slot.channel_number(),
                slot,
                claimed: state.is_slow_claimed(slot),
            })
            .collect();

        let fast_free = fast.iter().filter(|c| !c.claimed).count();
        let slow_free = slow.iter().filter(|s| !s.claimed).count();

        Self {
            fast,
            fast_timers: std::array::from_fn(|idx| state.fast_timer_frequency(idx as u8)),
            slow,
            claimed_pins: state.claimed_pins().collect(),
            fast_free,
            slow_free,
        }
    }

    /// True if at least one LEDC channel is free.
    pub fn fast_available(&self) -> bool {
        self.fast_free > 0
    }

    /// True if at least one MCPWM slot is free.
    pub fn slow_available(&self) -> bool {
        self.slow_free > 0
    }

    /// Subsystems with no free capacity left.
    pub fn exhausted(&self) -> Subsystems {
        let mut full = Subsystems::empty();
        if !self.fast_available() {
            full |= Subsystems::FAST;
        }
        if !self.slow_available() {
            full |= Subsystems::SLOW;
        }
        full
    }

    /// Total number of granted channels across both subsystems.
    pub fn claimed_count(&self) -> usize {
        TOTAL_CHANNEL_COUNT - self.fast_free - self.slow_free
    }

    /// Troubleshooting suggestions derived from availability.
    pub fn hints(&self) -> Vec<&'static str> {
        match (self.fast_available(), self.slow_available()) {
            (false, false) => vec![
                "All 20 PWM channels exhausted (8 LEDC + 12 MCPWM)",
                "Solution: Reduce number of PWM outputs or reuse existing ones",
            ],
            (false, true) => vec![
                "LEDC channels full, but MCPWM available",
                "Try: driver: mcpwm or driver: auto",
            ],
            (true, false) => vec![
                "MCPWM channels full, but LEDC available",
                "Try: driver: ledc or driver: auto",
            ],
            (true, true) => Vec::new(),
        }
    }

    /// Log the full report and hints at error level.
    pub fn log(&self, preference: DriverPreference) {
        for line in self.to_string().lines() {
            error!("{}", line);
        }
        error!("=== Troubleshooting Suggestions ===");
        for hint in self.hints() {
            error!("{}", hint);
        }
        error!("Current driver preference: {}", preference);
    }
}

impl fmt::Display for UsageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Resource Usage ===")?;

        writeln!(f, "LEDC Channels (0-7):")?;
        for usage in &self.fast {
            writeln!(f, "  Channel {}: {}", usage.channel, used_or_free(usage.claimed))?;
        }
        writeln!(
            f,
            "LEDC Summary: {}",
            if self.fast_available() {
                "Channels available"
            } else {
                "All channels used"
            }
        )?;

        writeln!(f, "LEDC Timers:")?;
        for (idx, timer) in self.fast_timers.iter().enumerate() {
            match timer {
                Some(frequency) => writeln!(f, "  Timer {idx}: {frequency} Hz")?,
                None => writeln!(f, "  Timer {idx}: FREE")?,
            }
        }

        writeln!(f, "MCPWM Channels (8-19):")?;
        for usage in &self.slow {
            writeln!(
                f,
                "  Channel {} ({}): {}",
                usage.channel,
                usage.slot,
                used_or_free(usage.claimed)
            )?;
        }
        writeln!(
            f,
            "MCPWM Summary: {}",
            if self.slow_available() {
                "Channels available"
            } else {
                "All channels used"
            }
        )?;

        writeln!(f, "GPIO Pins in use:")?;
        if self.claimed_pins.is_empty() {
            writeln!(f, "  None")?;
        }
        for pin in &self.claimed_pins {
            writeln!(f, "  GPIO {pin}")?;
        }
        Ok(())
    }
}

fn used_or_free(claimed: bool) -> &'static str {
    if claimed { "USED" } else { "FREE" }
}
