//! PWM hardware constants.
//!
//! Capacity of the two PWM subsystems and defaults applied to output
//! configuration.

use static_assertions::const_assert_eq;

/// Canonical service name (used for logging).
pub const PWM_SERVICE_NAME: &str = "pwm_hal";

/// Number of LEDC (fast subsystem) channels.
pub const FAST_CHANNEL_COUNT: usize = 8;

/// Number of MCPWM units.
pub const SLOW_UNIT_COUNT: usize = 2;

/// Number of timers per MCPWM unit.
pub const SLOW_TIMER_COUNT: usize = 3;

/// Number of operators (A/B) per MCPWM timer.
pub const SLOW_OPERATOR_COUNT: usize = 2;

/// Number of addressable MCPWM (slow subsystem) slots.
pub const SLOW_SLOT_COUNT: usize = SLOW_UNIT_COUNT * SLOW_TIMER_COUNT * SLOW_OPERATOR_COUNT;

/// Total PWM capacity across both subsystems.
pub const TOTAL_CHANNEL_COUNT: usize = FAST_CHANNEL_COUNT + SLOW_SLOT_COUNT;

const_assert_eq!(SLOW_SLOT_COUNT, 12);
const_assert_eq!(TOTAL_CHANNEL_COUNT, 20);

/// Highest channel number accepted by the `channel` configuration key.
///
/// Channels 0–7 address LEDC; 8–19 are the MCPWM slots in report numbering.
pub const MAX_CONFIG_CHANNEL: u8 = (TOTAL_CHANNEL_COUNT - 1) as u8;

/// Number of LEDC timers. Channels running the same frequency share one.
pub const FAST_TIMER_COUNT: usize = 4;

/// Default PWM frequency in Hz.
pub const DEFAULT_FREQUENCY_HZ: f64 = 50_000.0;

/// Highest GPIO number on the target.
pub const MAX_GPIO: u8 = 39;

/// Maximum number of `[[outputs]]` entries accepted by configuration.
pub const MAX_OUTPUTS: usize = 64;

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "/etc/pwm/outputs.toml";

/// Default driver name
pub const DEFAULT_DRIVER: &str = "simulation";
