//! Frequency → resolution mapping and duty computation.

/// LEDC duty resolution in bits for a given frequency.
///
/// Higher frequencies leave fewer clock ticks per period, so resolution
/// steps down as frequency goes up.
///
/// | frequency (Hz)  | bits | steps |
/// |-----------------|------|-------|
/// | ≥ 40000         | 10   | 1024  |
/// | [20000, 40000)  | 11   | 2048  |
/// | [10000, 20000)  | 12   | 4096  |
/// | [5000, 10000)   | 13   | 8192  |
/// | < 5000          | 14   | 16384 |
pub fn resolution_for(frequency: f64) -> u32 {
    if frequency >= 40_000.0 {
        10
    } else if frequency >= 20_000.0 {
        11
    } else if frequency >= 10_000.0 {
        12
    } else if frequency >= 5_000.0 {
        13
    } else {
        14
    }
}

/// Largest raw duty value at a resolution: `2^bits - 1`.
#[inline]
pub const fn max_duty(resolution_bits: u32) -> u32 {
    (1u32 << resolution_bits) - 1
}

/// Clamp a requested state to `[0, 1]` and apply inversion.
///
/// NaN is treated as 0.
#[inline]
pub fn normalize_state(state: f64, inverted: bool) -> f64 {
    let level = if state.is_nan() {
        0.0
    } else {
        state.clamp(0.0, 1.0)
    };
    if inverted { 1.0 - level } else { level }
}

/// Raw LEDC duty: `round(clamp(level, 0, 1) * (2^bits - 1))`.
#[inline]
pub fn fast_duty(level: f64, resolution_bits: u32) -> u32 {
    let level = normalize_state(level, false);
    (level * max_duty(resolution_bits) as f64).round() as u32
}

/// MCPWM duty in percent: `clamp(level, 0, 1) * 100`.
#[inline]
pub fn slow_duty_percent(level: f64) -> f64 {
    normalize_state(level, false) * 100.0
}
