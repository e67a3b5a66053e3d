//! PWM identifier types.
//!
//! `DriverPreference` comes from configuration, `Backend` and `Assignment`
//! describe what the allocator actually granted.

use crate::pwm::consts::{
    FAST_CHANNEL_COUNT, SLOW_OPERATOR_COUNT, SLOW_TIMER_COUNT, SLOW_UNIT_COUNT,
};
use bitflags::bitflags;
use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

// ─── DriverPreference ───────────────────────────────────────────────

/// Which subsystem an output asks for.
///
/// Parsed case-insensitively from `"auto"`, `"ledc"` and `"mcpwm"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DriverPreference {
    /// LEDC first, MCPWM when LEDC is full.
    #[default]
    Auto,
    /// LEDC only.
    Fast,
    /// MCPWM only.
    Slow,
}

impl DriverPreference {
    /// Subsystems this preference may draw from.
    pub const fn subsystems(self) -> Subsystems {
        match self {
            Self::Auto => Subsystems::BOTH,
            Self::Fast => Subsystems::FAST,
            Self::Slow => Subsystems::SLOW,
        }
    }
}

impl fmt::Display for DriverPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Fast => write!(f, "ledc"),
            Self::Slow => write!(f, "mcpwm"),
        }
    }
}

impl FromStr for DriverPreference {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "ledc" => Ok(Self::Fast),
            "mcpwm" => Ok(Self::Slow),
            _ => Err(format!(
                "unknown driver {s:?} (expected \"auto\", \"ledc\" or \"mcpwm\")"
            )),
        }
    }
}

impl TryFrom<String> for DriverPreference {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DriverPreference> for String {
    fn from(value: DriverPreference) -> Self {
        value.to_string()
    }
}

// ─── Backend ────────────────────────────────────────────────────────

/// Subsystem an output was granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// LEDC channel.
    Fast,
    /// MCPWM unit/timer/operator.
    Slow,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fast => write!(f, "LEDC"),
            Self::Slow => write!(f, "MCPWM"),
        }
    }
}

// ─── Subsystems ─────────────────────────────────────────────────────

bitflags! {
    /// Set of PWM subsystems, used to report which ones were exhausted.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Subsystems: u8 {
        /// LEDC (8 channels).
        const FAST = 0x01;
        /// MCPWM (12 slots).
        const SLOW = 0x02;
    }
}

impl Subsystems {
    /// Both subsystems.
    pub const BOTH: Self = Self::from_bits_truncate(Self::FAST.bits() | Self::SLOW.bits());
}

impl Default for Subsystems {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for Subsystems {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.contains(Self::FAST), self.contains(Self::SLOW)) {
            (true, true) => write!(f, "LEDC+MCPWM"),
            (true, false) => write!(f, "LEDC"),
            (false, true) => write!(f, "MCPWM"),
            (false, false) => write!(f, "none"),
        }
    }
}

// ─── Operator ───────────────────────────────────────────────────────

/// MCPWM operator output (generator A or B).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
#[repr(u8)]
pub enum Operator {
    /// Operator A, the default.
    #[default]
    A = 0,
    /// Operator B.
    B = 1,
}

impl Operator {
    /// Operators in allocation scan order.
    pub const ALL: [Self; SLOW_OPERATOR_COUNT] = [Self::A, Self::B];

    /// Array index of this operator.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
        }
    }
}

impl FromStr for Operator {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            _ => Err(format!("unknown MCPWM operator {s:?} (expected \"A\" or \"B\")")),
        }
    }
}

impl TryFrom<String> for Operator {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Operator> for String {
    fn from(value: Operator) -> Self {
        value.to_string()
    }
}

// ─── SlowSlot ───────────────────────────────────────────────────────

/// One MCPWM output: `(unit, timer, operator)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SlowSlot {
    /// MCPWM unit (0–1).
    pub unit: u8,
    /// Timer within the unit (0–2).
    pub timer: u8,
    /// Operator output.
    pub operator: Operator,
}

impl SlowSlot {
    /// Create a slot coordinate. No range check; see [`SlowSlot::is_valid`].
    pub const fn new(unit: u8, timer: u8, operator: Operator) -> Self {
        Self {
            unit,
            timer,
            operator,
        }
    }

    /// True if every coordinate is within hardware range.
    pub const fn is_valid(&self) -> bool {
        (self.unit as usize) < SLOW_UNIT_COUNT && (self.timer as usize) < SLOW_TIMER_COUNT
    }

    /// Position in allocation scan order (unit → timer → operator), 0–11.
    pub const fn scan_index(&self) -> usize {
        (self.unit as usize * SLOW_TIMER_COUNT + self.timer as usize) * SLOW_OPERATOR_COUNT
            + self.operator.index()
    }

    /// Global channel number used in reports (8–19).
    pub const fn channel_number(&self) -> usize {
        FAST_CHANNEL_COUNT + self.scan_index()
    }

    /// All slots in allocation scan order.
    pub fn scan_order() -> impl Iterator<Item = Self> {
        (0..SLOW_UNIT_COUNT as u8).flat_map(|unit| {
            (0..SLOW_TIMER_COUNT as u8).flat_map(move |timer| {
                Operator::ALL
                    .into_iter()
                    .map(move |operator| Self::new(unit, timer, operator))
            })
        })
    }
}

impl fmt::Display for SlowSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unit{}/Timer{}/Op{}",
            self.unit, self.timer, self.operator
        )
    }
}

// ─── Assignment ─────────────────────────────────────────────────────

/// Concrete resource granted to an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum Assignment {
    /// LEDC channel.
    Fast {
        /// Channel index (0–7).
        channel: u8,
    },
    /// MCPWM slot.
    Slow(SlowSlot),
}

impl Assignment {
    /// Backend this assignment belongs to.
    pub const fn backend(&self) -> Backend {
        match self {
            Self::Fast { .. } => Backend::Fast,
            Self::Slow(_) => Backend::Slow,
        }
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fast { channel } => write!(f, "LEDC channel {channel}"),
            Self::Slow(slot) => write!(f, "MCPWM {slot}"),
        }
    }
}
