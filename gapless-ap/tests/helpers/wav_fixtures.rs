//! In-memory WAV fixtures

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::io::Cursor;

/// 16-bit PCM WAV of `frames` frames, every sample set to `value`
pub fn constant_wav(sample_rate: u32, channels: u16, frames: usize, value: f32) -> Vec<u8> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let sample = (value * i16::MAX as f32).round() as i16;
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
        for _ in 0..frames * channels as usize {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

/// Read back a 32-bit float WAV
pub fn decode_wav_samples(bytes: &[u8]) -> (WavSpec, Vec<f32>) {
    let mut reader = WavReader::new(Cursor::new(bytes)).unwrap();
    let spec = reader.spec();
    let samples = reader.samples::<f32>().map(|s| s.unwrap()).collect();
    (spec, samples)
}
