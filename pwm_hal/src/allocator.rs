//! Capacity registers for both PWM subsystems.
//!
//! `AllocatorState` is the single source of truth for which LEDC channels,
//! MCPWM slots and GPIOs are taken. It is constructed once per process and
//! handed to every output as a [`SharedAllocator`]; there is no global
//! instance, so tests build a fresh one each.
//!
//! Claims are permanent: nothing in this module ever clears a register.
//!
//! All setup runs sequentially on one thread, which is why plain
//! `Rc<RefCell<_>>` is enough here.

use crate::diagnostics::UsageReport;
use pwm_common::pwm::consts::{
    FAST_CHANNEL_COUNT, FAST_TIMER_COUNT, SLOW_OPERATOR_COUNT, SLOW_TIMER_COUNT, SLOW_UNIT_COUNT,
};
use pwm_common::pwm::types::SlowSlot;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;
use tracing::{debug, trace, warn};

/// Allocator shared by all outputs created during configuration.
pub type SharedAllocator = Rc<RefCell<AllocatorState>>;

/// MCPWM claim bits, indexed `[timer][operator][unit]`.
type SlowRegister = [[[bool; SLOW_UNIT_COUNT]; SLOW_OPERATOR_COUNT]; SLOW_TIMER_COUNT];

/// Process-wide capacity registers.
#[derive(Debug, Clone, Default)]
pub struct AllocatorState {
    fast_channels: [bool; FAST_CHANNEL_COUNT],
    /// Frequency each LEDC timer was claimed for.
    fast_timers: [Option<f64>; FAST_TIMER_COUNT],
    slow_slots: SlowRegister,
    /// Frequency each MCPWM timer runs at, indexed `[unit][timer]`.
    slow_timers: [[Option<f64>; SLOW_TIMER_COUNT]; SLOW_UNIT_COUNT],
    claimed_pins: BTreeSet<u8>,
}

impl AllocatorState {
    /// Create an allocator with every register free.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fresh allocator wrapped for sharing between outputs.
    pub fn shared() -> SharedAllocator {
        Rc::new(RefCell::new(Self::new()))
    }

    // ─── LEDC ───────────────────────────────────────────────────────

    /// Claim an LEDC channel.
    ///
    /// A valid, free `preferred` channel is granted as-is. Otherwise channels
    /// are scanned in ascending order and the first free one is claimed.
    /// Returns `None` when all channels are taken.
    pub fn try_claim_fast(&mut self, preferred: Option<u8>) -> Option<u8> {
        if let Some(channel) = preferred {
            if (channel as usize) < FAST_CHANNEL_COUNT && !self.fast_channels[channel as usize] {
                self.fast_channels[channel as usize] = true;
                trace!(channel, "claimed preferred LEDC channel");
                return Some(channel);
            }
            debug!(channel, "preferred LEDC channel unavailable, scanning");
        }

        let idx = self.fast_channels.iter().position(|claimed| !claimed)?;
        self.fast_channels[idx] = true;
        trace!(channel = idx, "claimed LEDC channel");
        Some(idx as u8)
    }

    /// Claim an LEDC channel together with a timer running at `frequency`.
    ///
    /// A timer already claimed for the same frequency is shared; otherwise
    /// the lowest free timer is claimed. Nothing is claimed unless both a
    /// channel and a timer are available. Returns `(channel, timer_slot)`.
    pub fn try_claim_fast_at(&mut self, preferred: Option<u8>, frequency: f64) -> Option<(u8, u8)> {
        let Some(timer_slot) = self.fast_timer_for(frequency) else {
            debug!(frequency, "no LEDC timer free for this frequency");
            return None;
        };
        let channel = self.try_claim_fast(preferred)?;
        if self.fast_timers[timer_slot as usize].is_none() {
            trace!(timer_slot, frequency, "claimed LEDC timer");
        }
        self.fast_timers[timer_slot as usize] = Some(frequency);
        Some((channel, timer_slot))
    }

    /// Timer a new LEDC channel at `frequency` would use, without claiming it.
    pub fn fast_timer_for(&self, frequency: f64) -> Option<u8> {
        self.fast_timers
            .iter()
            .position(|timer| *timer == Some(frequency))
            .or_else(|| self.fast_timers.iter().position(Option::is_none))
            .map(|idx| idx as u8)
    }

    /// Frequency an LEDC timer was claimed for.
    pub fn fast_timer_frequency(&self, timer_slot: u8) -> Option<f64> {
        self.fast_timers.get(timer_slot as usize).copied().flatten()
    }

    /// True if at least one LEDC channel is unclaimed.
    pub fn has_free_fast_channel(&self) -> bool {
        self.fast_channels.iter().any(|claimed| !claimed)
    }

    /// True if the LEDC channel has been granted. Out-of-range channels
    /// report `false`.
    pub fn is_fast_claimed(&self, channel: u8) -> bool {
        self.fast_channels
            .get(channel as usize)
            .copied()
            .unwrap_or(false)
    }

    // ─── MCPWM ──────────────────────────────────────────────────────

    /// Claim an MCPWM slot.
    ///
    /// A valid, free `preferred` slot is granted as-is. Otherwise slots are
    /// scanned unit → timer → operator (A before B) and the first free one
    /// is claimed. Returns `None` when all slots are taken.
    pub fn try_claim_slow(&mut self, preferred: Option<SlowSlot>) -> Option<SlowSlot> {
        if let Some(slot) = preferred {
            if slot.is_valid() && !self.is_slow_claimed(slot) {
                self.mark_slow(slot);
                trace!(%slot, "claimed preferred MCPWM slot");
                return Some(slot);
            }
            debug!(%slot, "preferred MCPWM slot unavailable, scanning");
        }

        let slot = SlowSlot::scan_order().find(|slot| !self.is_slow_claimed(*slot))?;
        self.mark_slow(slot);
        trace!(%slot, "claimed MCPWM slot");
        Some(slot)
    }

    /// True if the MCPWM slot has been granted. Invalid coordinates report
    /// `false`.
    pub fn is_slow_claimed(&self, slot: SlowSlot) -> bool {
        slot.is_valid()
            && self.slow_slots[slot.timer as usize][slot.operator.index()][slot.unit as usize]
    }

    /// Record the frequency of the MCPWM timer behind `slot`.
    ///
    /// Operators A and B share their timer. Returns the previous frequency
    /// when the timer was already running at a different one.
    pub fn set_slow_timer_frequency(&mut self, slot: SlowSlot, frequency: f64) -> Option<f64> {
        if !slot.is_valid() {
            return None;
        }
        let timer = &mut self.slow_timers[slot.unit as usize][slot.timer as usize];
        let previous = timer.replace(frequency);
        previous.filter(|&prev| prev != frequency)
    }

    /// Frequency recorded for an MCPWM timer.
    pub fn slow_timer_frequency(&self, unit: u8, timer: u8) -> Option<f64> {
        self.slow_timers
            .get(unit as usize)
            .and_then(|timers| timers.get(timer as usize))
            .copied()
            .flatten()
    }

    fn mark_slow(&mut self, slot: SlowSlot) {
        self.slow_slots[slot.timer as usize][slot.operator.index()][slot.unit as usize] = true;
    }

    // ─── GPIO ───────────────────────────────────────────────────────

    /// True if an output already drives this GPIO.
    pub fn is_gpio_claimed(&self, pin: u8) -> bool {
        self.claimed_pins.contains(&pin)
    }

    /// Record a GPIO as claimed.
    ///
    /// The caller checks [`is_gpio_claimed`](Self::is_gpio_claimed) first;
    /// setup is sequential so no check-and-set is needed here.
    pub fn claim_gpio(&mut self, pin: u8) {
        if !self.claimed_pins.insert(pin) {
            warn!(pin, "GPIO claimed twice");
        }
    }

    /// Claimed GPIOs in ascending order.
    pub fn claimed_pins(&self) -> impl Iterator<Item = u8> + '_ {
        self.claimed_pins.iter().copied()
    }

    // ─── Diagnostics ────────────────────────────────────────────────

    /// Read-only view of all registers.
    pub fn snapshot(&self) -> UsageReport {
        UsageReport::capture(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pwm_common::pwm::types::Operator;

    #[test]
    fn test_fast_scan_ascending() {
        let mut state = AllocatorState::new();
        for expected in 0..8u8 {
            assert_eq!(state.try_claim_fast(None), Some(expected));
        }
        assert_eq!(state.try_claim_fast(None), None);
        assert_eq!(state.try_claim_fast(Some(3)), None);
    }

    #[test]
    fn test_fast_preferred_honored() {
        let mut state = AllocatorState::new();
        assert_eq!(state.try_claim_fast(Some(5)), Some(5));
        assert!(state.is_fast_claimed(5));
        assert!(!state.is_fast_claimed(0));
    }

    #[test]
    fn test_fast_preferred_claimed_falls_back() {
        let mut state = AllocatorState::new();
        assert_eq!(state.try_claim_fast(Some(0)), Some(0));
        assert_eq!(state.try_claim_fast(Some(2)), Some(2));
        // Channel 2 is taken: the first free channel in ascending order wins.
        assert_eq!(state.try_claim_fast(Some(2)), Some(1));
    }

    #[test]
    fn test_fast_preferred_out_of_range_falls_back() {
        let mut state = AllocatorState::new();
        assert_eq!(state.try_claim_fast(Some(12)), Some(0));
        assert!(!state.is_fast_claimed(12));
    }

    #[test]
    fn test_slow_scan_order() {
        let mut state = AllocatorState::new();
        let granted: Vec<SlowSlot> = (0..12).filter_map(|_| state.try_claim_slow(None)).collect();
        let expected: Vec<SlowSlot> = SlowSlot::scan_order().collect();
        assert_eq!(granted, expected);
        assert_eq!(granted[1], SlowSlot::new(0, 0, Operator::B));
        assert_eq!(granted[6], SlowSlot::new(1, 0, Operator::A));
        assert_eq!(state.try_claim_slow(None), None);
    }

    #[test]
    fn test_slow_preferred_honored_and_fallback() {
        let mut state = AllocatorState::new();
        let wanted = SlowSlot::new(1, 2, Operator::B);
        assert_eq!(state.try_claim_slow(Some(wanted)), Some(wanted));
        assert!(state.is_slow_claimed(wanted));
        assert_eq!(
            state.try_claim_slow(Some(wanted)),
            Some(SlowSlot::new(0, 0, Operator::A))
        );
    }

    #[test]
    fn test_slow_preferred_invalid_falls_back() {
        let mut state = AllocatorState::new();
        let invalid = SlowSlot::new(2, 0, Operator::A);
        assert!(!state.is_slow_claimed(invalid));
        assert_eq!(
            state.try_claim_slow(Some(invalid)),
            Some(SlowSlot::new(0, 0, Operator::A))
        );
    }

    #[test]
    fn test_subsystems_are_independent() {
        let mut state = AllocatorState::new();
        for _ in 0..8 {
            state.try_claim_fast(None);
        }
        assert!(state.try_claim_slow(None).is_some());
    }

    #[test]
    fn test_fast_timers_shared_by_frequency() {
        let mut state = AllocatorState::new();
        assert_eq!(state.try_claim_fast_at(None, 1_000.0), Some((0, 0)));
        assert_eq!(state.try_claim_fast_at(None, 50_000.0), Some((1, 1)));
        assert_eq!(state.try_claim_fast_at(None, 1_000.0), Some((2, 0)));
        assert_eq!(state.fast_timer_frequency(0), Some(1_000.0));
        assert_eq!(state.fast_timer_frequency(1), Some(50_000.0));
        assert_eq!(state.fast_timer_frequency(2), None);
    }

    #[test]
    fn test_fast_timers_exhausted_claims_nothing() {
        let mut state = AllocatorState::new();
        for freq in [100.0, 200.0, 300.0, 400.0] {
            assert!(state.try_claim_fast_at(None, freq).is_some());
        }
        assert_eq!(state.fast_timer_for(500.0), None);
        assert_eq!(state.try_claim_fast_at(None, 500.0), None);
        assert!(!state.is_fast_claimed(4));
        assert!(state.has_free_fast_channel());
        // A frequency already running still gets a channel.
        assert_eq!(state.try_claim_fast_at(None, 300.0), Some((4, 2)));
    }

    #[test]
    fn test_slow_timer_frequency_change_reported() {
        let mut state = AllocatorState::new();
        let a = SlowSlot::new(0, 1, Operator::A);
        let b = SlowSlot::new(0, 1, Operator::B);
        assert_eq!(state.set_slow_timer_frequency(a, 1_000.0), None);
        assert_eq!(state.set_slow_timer_frequency(b, 1_000.0), None);
        assert_eq!(state.set_slow_timer_frequency(b, 2_000.0), Some(1_000.0));
        assert_eq!(state.slow_timer_frequency(0, 1), Some(2_000.0));
    }

    #[test]
    fn test_gpio_registry() {
        let mut state = AllocatorState::new();
        assert!(!state.is_gpio_claimed(18));
        state.claim_gpio(18);
        state.claim_gpio(5);
        assert!(state.is_gpio_claimed(18));
        assert_eq!(state.claimed_pins().collect::<Vec<_>>(), vec![5, 18]);
    }

    #[test]
    fn test_snapshot_does_not_mutate() {
        let mut state = AllocatorState::new();
        state.try_claim_fast(None);
        let before = state.snapshot();
        let again = state.snapshot();
        assert_eq!(before, again);
        assert_eq!(state.try_claim_fast(None), Some(1));
    }
}
