//! Core audio data types
//!
//! Defines the decoded buffer handed from the decoder to the scheduler and the
//! rendering backend.

use gapless_common::timing::samples_to_ticks;

/// DecodedBuffer holds one fully decoded chunk ready for rendering.
///
/// **Format:**
/// - Samples are f32 (floating point -1.0 to 1.0)
/// - Interleaved by channel: [L, R, L, R, ...] for stereo
/// - Kept at the source sample rate; the mixer maps ticks to source frames
#[derive(Debug, Clone)]
pub struct DecodedBuffer {
    /// PCM audio samples (interleaved)
    pub samples: Vec<f32>,

    /// Source sample rate in Hz
    pub sample_rate: u32,

    /// Channel count (1=mono, 2=stereo, ...)
    pub channel_count: u16,

    /// Number of frames (samples.len() / channel_count)
    pub frame_count: usize,
}

impl DecodedBuffer {
    /// Create a new DecodedBuffer from interleaved samples
    ///
    /// A trailing partial frame is ignored.
    pub fn new(samples: Vec<f32>, sample_rate: u32, channel_count: u16) -> Self {
        let frame_count = samples.len() / channel_count.max(1) as usize;

        Self {
            samples,
            sample_rate,
            channel_count,
            frame_count,
        }
    }

    /// Duration in ticks; exact for all common sample rates
    pub fn duration_ticks(&self) -> i64 {
        if self.sample_rate == 0 {
            return 0;
        }
        samples_to_ticks(self.frame_count, self.sample_rate)
    }

    /// True if the buffer holds no complete frame
    pub fn is_empty(&self) -> bool {
        self.frame_count == 0
    }

    /// Sample at `frame` for `channel`, or silence when out of range
    #[inline]
    pub fn sample(&self, frame: usize, channel: usize) -> f32 {
        let channels = self.channel_count as usize;
        if frame >= self.frame_count || channel >= channels {
            return 0.0;
        }
        self.samples[frame * channels + channel]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gapless_common::timing::seconds_to_ticks;

    #[test]
    fn test_duration_from_frames() {
        let buffer = DecodedBuffer::new(vec![0.0; 44100 * 2 * 3], 44100, 2);
        assert_eq!(buffer.frame_count, 132_300);
        assert_eq!(buffer.duration_ticks(), seconds_to_ticks(3.0));
    }

    #[test]
    fn test_partial_trailing_frame_ignored() {
        let buffer = DecodedBuffer::new(vec![0.1, 0.2, 0.3], 48000, 2);
        assert_eq!(buffer.frame_count, 1);
        assert!(!buffer.is_empty());
    }

    #[test]
    fn test_sample_lookup_interleaved() {
        let buffer = DecodedBuffer::new(vec![0.1, 0.2, 0.3, 0.4], 8000, 2);
        assert_eq!(buffer.sample(1, 0), 0.3);
        assert_eq!(buffer.sample(1, 1), 0.4);
        assert_eq!(buffer.sample(2, 0), 0.0);
        assert_eq!(buffer.sample(0, 2), 0.0);
    }

    #[test]
    fn test_zero_rate_has_zero_duration() {
        let buffer = DecodedBuffer::new(vec![0.0; 4], 0, 1);
        assert_eq!(buffer.duration_ticks(), 0);
    }
}
