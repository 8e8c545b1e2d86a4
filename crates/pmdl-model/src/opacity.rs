//! Opacity conversion between the stored u16 scale and whole percentages.
//!
//! `0x0000` is fully transparent and `0xFFFF` fully opaque. The extremes map
//! exactly so that 0% and 100% never drift after repeated edits.

/// Convert a stored opacity to a percentage in `0..=100`.
pub fn percent_from_opacity_u16(value: u16) -> u8 {
    match value {
        0 => 0,
        u16::MAX => 100,
        // Never lands on an exact .5, so plain rounding is fine.
        _ => (f64::from(value) * 100.0 / f64::from(u16::MAX)).round() as u8,
    }
}

/// Convert a percentage to a stored opacity. Values outside `0..=100` are
/// clamped.
pub fn opacity_u16_from_percent(percent: i32) -> u16 {
    match percent.clamp(0, 100) {
        0 => 0x0000,
        100 => 0xFFFF,
        pct => (f64::from(pct) * f64::from(u16::MAX) / 100.0).round_ties_even() as u16,
    }
}
