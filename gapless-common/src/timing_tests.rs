//! Unit tests for tick-based timing
//!
//! Tests conversion functions and the exactness of tick arithmetic the
//! scheduler relies on for back-to-back chaining.

use super::*;

// ============================================================================
// Test Group 1: Tick Rate Constants
// ============================================================================

#[test]
fn test_tick_rate_divides_all_table_rates() {
    for (rate, ticks) in TICKS_PER_SAMPLE_TABLE {
        assert_eq!(
            TICK_RATE % rate as i64,
            0,
            "TICK_RATE {} must divide evenly into sample rate {}",
            TICK_RATE,
            rate
        );
        assert_eq!(TICK_RATE / rate as i64, ticks);
    }
}

#[test]
fn test_ticks_per_ms_matches_tick_rate() {
    assert_eq!(TICKS_PER_MS * 1000, TICK_RATE);
}

// ============================================================================
// Test Group 2: Sample ↔ Tick Conversions
// ============================================================================

#[test]
fn test_samples_roundtrip_at_table_rates() {
    for (rate, _) in TICKS_PER_SAMPLE_TABLE {
        let frames = rate as usize * 3 + 17;
        let ticks = samples_to_ticks(frames, rate);
        assert_eq!(ticks_to_samples(ticks, rate), frames, "rate {}", rate);
    }
}

#[test]
fn test_samples_to_ticks_non_table_rate() {
    // 12,345 Hz does not divide TICK_RATE; one second must still be ~1s
    let ticks = samples_to_ticks(12_345, 12_345);
    assert_eq!(ticks, TICK_RATE);
}

#[test]
fn test_ticks_to_samples_truncates_partial_frame() {
    // 639 ticks is just under one 44.1kHz frame
    assert_eq!(ticks_to_samples(639, 44100), 0);
    assert_eq!(ticks_to_samples(640, 44100), 1);
    assert_eq!(ticks_to_samples(1279, 44100), 1);
}

#[test]
fn test_ticks_to_samples_large_values_do_not_overflow() {
    // ~10 hours at 192kHz
    let ticks = seconds_to_ticks(36_000.0);
    assert_eq!(ticks_to_samples(ticks, 192_000), 36_000 * 192_000);
}

#[test]
#[should_panic(expected = "sample_rate must be > 0")]
fn test_zero_sample_rate_panics() {
    ticks_per_sample(0);
}

// ============================================================================
// Test Group 3: Seconds / Percent
// ============================================================================

#[test]
fn test_seconds_roundtrip() {
    for seconds in [0.0, 0.25, 2.0, 3.0, 5.0, 600.0] {
        let ticks = seconds_to_ticks(seconds);
        assert!((ticks_to_seconds(ticks) - seconds).abs() < 1e-9);
    }
}

#[test]
fn test_percent_of_endpoints_are_exact() {
    let total = seconds_to_ticks(10.0);
    assert_eq!(percent_of(total, 0.0), 0);
    assert_eq!(percent_of(total, 100.0), total);
    assert_eq!(percent_of(total, 50.0), seconds_to_ticks(5.0));
    assert_eq!(percent_of(total, 20.0), seconds_to_ticks(2.0));
}

#[test]
fn test_chained_durations_sum_exactly() {
    // 2s + 3s + 5s built from frame counts must equal 10s to the tick
    let parts = [88_200usize, 132_300, 220_500];
    let sum: i64 = parts.iter().map(|&f| samples_to_ticks(f, 44100)).sum();
    assert_eq!(sum, seconds_to_ticks(10.0));
}
