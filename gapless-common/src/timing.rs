//! Tick-based timing system for sample-accurate scheduling
//!
//! All scheduler arithmetic (durations, spans, cursor, offsets) is done in
//! integer ticks at 28,224,000 Hz. The tick rate divides evenly into all common
//! audio sample rates (8kHz to 192kHz), so a buffer's duration in ticks is exact
//! and chaining `end = at + duration - offset` never accumulates rounding error.
//!
//! # Representations
//!
//! 1. **Ticks (internal)**: i64 values at 28,224,000 Hz
//! 2. **Samples (rendering)**: usize frame counts at a given sample rate
//! 3. **Seconds / milliseconds (display, CLI)**: lossy conversions
//!
//! | Rate (Hz) | Ticks/Sample |
//! |-----------|--------------|
//! | 44,100    | 640          |
//! | 48,000    | 588          |
//! | 96,000    | 294          |
//!
//! # Examples
//!
//! ```rust
//! use gapless_common::timing::*;
//!
//! let ticks = seconds_to_ticks(5.0);
//! assert_eq!(ticks, 141_120_000);
//! assert_eq!(ticks_to_samples(ticks, 44100), 220_500);
//! assert_eq!(ticks_to_samples(ticks, 48000), 240_000);
//! assert_eq!(ticks_to_ms(ticks), 5000);
//! ```
//!
//! # Precision and Overflow
//!
//! - i64::MAX ticks = ~10.36 years of audio
//! - Sample conversions at table rates are exact
//! - Millisecond conversions use truncating division

/// Tick rate: 28,224,000 Hz
///
/// LCM of the common audio sample rates.
pub const TICK_RATE: i64 = 28_224_000;

/// Ticks per millisecond: 28,224
pub const TICKS_PER_MS: i64 = 28_224;

/// Lookup table for ticks per sample at common sample rates
///
/// For rates not in the table, `TICK_RATE ÷ sample_rate` is used.
pub const TICKS_PER_SAMPLE_TABLE: [(u32, i64); 11] = [
    (8000, 3528),
    (11025, 2560),
    (16000, 1764),
    (22050, 1280),
    (32000, 882),
    (44100, 640),
    (48000, 588),
    (88200, 320),
    (96000, 294),
    (176400, 160),
    (192000, 147),
];

/// Convert milliseconds to ticks
///
/// ```rust
/// use gapless_common::timing::ms_to_ticks;
///
/// assert_eq!(ms_to_ticks(1), 28_224);
/// assert_eq!(ms_to_ticks(1000), 28_224_000);
/// assert_eq!(ms_to_ticks(-1000), -28_224_000);
/// ```
pub fn ms_to_ticks(milliseconds: i64) -> i64 {
    milliseconds * TICKS_PER_MS
}

/// Convert ticks to milliseconds (truncating)
///
/// ```rust
/// use gapless_common::timing::ticks_to_ms;
///
/// assert_eq!(ticks_to_ms(28_224), 1);
/// assert_eq!(ticks_to_ms(28_223), 0);
/// ```
pub fn ticks_to_ms(ticks: i64) -> i64 {
    ticks / TICKS_PER_MS
}

/// Convert ticks to a frame count at the given sample rate
///
/// Negative tick values map to zero frames. Exact for table rates.
///
/// # Panics
///
/// Panics if `sample_rate` is 0
///
/// ```rust
/// use gapless_common::timing::ticks_to_samples;
///
/// assert_eq!(ticks_to_samples(28_224_000, 44100), 44_100);
/// assert_eq!(ticks_to_samples(-640, 44100), 0);
/// ```
pub fn ticks_to_samples(ticks: i64, sample_rate: u32) -> usize {
    assert!(sample_rate > 0, "sample_rate must be > 0");

    if ticks <= 0 {
        return 0;
    }

    // (ticks × sample_rate) ÷ TICK_RATE, widened so long streams never overflow
    ((ticks as i128 * sample_rate as i128) / TICK_RATE as i128) as usize
}

/// Convert a frame count at the given sample rate to ticks
///
/// # Panics
///
/// Panics if `sample_rate` is 0
///
/// ```rust
/// use gapless_common::timing::samples_to_ticks;
///
/// assert_eq!(samples_to_ticks(1, 44100), 640);
/// assert_eq!(samples_to_ticks(48000, 48000), 28_224_000);
/// ```
pub fn samples_to_ticks(samples: usize, sample_rate: u32) -> i64 {
    assert!(sample_rate > 0, "sample_rate must be > 0");

    if TICK_RATE % sample_rate as i64 == 0 {
        samples as i64 * ticks_per_sample(sample_rate)
    } else {
        ((samples as i128 * TICK_RATE as i128) / sample_rate as i128) as i64
    }
}

/// Convert ticks to seconds (display and logging only)
pub fn ticks_to_seconds(ticks: i64) -> f64 {
    ticks as f64 / TICK_RATE as f64
}

/// Convert seconds to ticks (rounded to nearest tick)
///
/// ```rust
/// use gapless_common::timing::seconds_to_ticks;
///
/// assert_eq!(seconds_to_ticks(0.5), 14_112_000);
/// ```
pub fn seconds_to_ticks(seconds: f64) -> i64 {
    (seconds * TICK_RATE as f64).round() as i64
}

/// Get ticks per sample for a given sample rate
///
/// # Panics
///
/// Panics if `sample_rate` is 0
pub fn ticks_per_sample(sample_rate: u32) -> i64 {
    assert!(sample_rate > 0, "sample_rate must be > 0");

    if let Some(&(_, ticks)) = TICKS_PER_SAMPLE_TABLE
        .iter()
        .find(|(rate, _)| *rate == sample_rate)
    {
        return ticks;
    }

    TICK_RATE / sample_rate as i64
}

/// Position `percent` (0-100) of the way through `total_ticks`, rounded to the
/// nearest tick
///
/// `percent_of(total, 100.0) == total` for any total below 2^53 ticks.
///
/// ```rust
/// use gapless_common::timing::{percent_of, seconds_to_ticks};
///
/// let total = seconds_to_ticks(10.0);
/// assert_eq!(percent_of(total, 50.0), seconds_to_ticks(5.0));
/// assert_eq!(percent_of(total, 100.0), total);
/// ```
pub fn percent_of(total_ticks: i64, percent: f64) -> i64 {
    (total_ticks as f64 * percent / 100.0).round() as i64
}

#[cfg(test)]
#[path = "timing_tests.rs"]
mod tests;
