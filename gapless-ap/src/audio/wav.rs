//! Offline rendering to WAV
//!
//! Drives a [`Mixer`] faster than real time and writes the result as 32-bit
//! float WAV. Completion callbacks are invoked on the rendering thread after
//! each block, outside the mixer lock, so the scheduler observes the same
//! completion sequence it would get from a live device.

use crate::audio::mixer::Mixer;
use crate::error::{Error, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use parking_lot::Mutex;
use std::io::{Seek, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Frames rendered per block
pub const DEFAULT_BLOCK_FRAMES: usize = 1024;

/// Summary of an offline render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderStats {
    /// Frames written to the output
    pub frames: u64,
    /// Completion callbacks delivered
    pub completions: usize,
}

/// Offline renderer over a shared mixer
pub struct WavRenderer {
    mixer: Arc<Mutex<Mixer>>,
    block_frames: usize,
}

impl WavRenderer {
    pub fn new(mixer: Arc<Mutex<Mixer>>) -> Self {
        Self {
            mixer,
            block_frames: DEFAULT_BLOCK_FRAMES,
        }
    }

    /// Use a different block size (minimum 1 frame)
    pub fn with_block_frames(mut self, block_frames: usize) -> Self {
        self.block_frames = block_frames.max(1);
        self
    }

    fn wav_spec(&self) -> WavSpec {
        let mixer = self.mixer.lock();
        WavSpec {
            channels: mixer.channels(),
            sample_rate: mixer.sample_rate(),
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        }
    }

    /// Render into a WAV file at `path`
    ///
    /// See [`WavRenderer::render_to_writer`].
    pub fn render_to_file<F>(&self, path: &Path, finished: F, max_frames: u64) -> Result<RenderStats>
    where
        F: FnMut() -> bool,
    {
        let writer = WavWriter::create(path, self.wav_spec()).map_err(wav_error)?;
        let stats = self.render_with(writer, finished, max_frames)?;
        info!("Rendered {} frames to {}", stats.frames, path.display());
        Ok(stats)
    }

    /// Render into any seekable writer
    ///
    /// Renders block by block until `finished()` returns true (checked after
    /// completions of each block are delivered) or `max_frames` were written.
    pub fn render_to_writer<W, F>(&self, out: W, finished: F, max_frames: u64) -> Result<RenderStats>
    where
        W: Write + Seek,
        F: FnMut() -> bool,
    {
        let writer = WavWriter::new(out, self.wav_spec()).map_err(wav_error)?;
        self.render_with(writer, finished, max_frames)
    }

    fn render_with<W, F>(
        &self,
        mut writer: WavWriter<W>,
        mut finished: F,
        max_frames: u64,
    ) -> Result<RenderStats>
    where
        W: Write + Seek,
        F: FnMut() -> bool,
    {
        let channels = self.mixer.lock().channels() as usize;
        let mut block = vec![0.0f32; self.block_frames * channels];
        let mut stats = RenderStats {
            frames: 0,
            completions: 0,
        };

        while stats.frames < max_frames && !finished() {
            let frames = (max_frames - stats.frames).min(self.block_frames as u64) as usize;
            let block = &mut block[..frames * channels];

            let completed = self.mixer.lock().render(block);

            for &sample in block.iter() {
                writer.write_sample(sample).map_err(wav_error)?;
            }
            stats.frames += frames as u64;

            stats.completions += completed.len();
            for callback in completed {
                callback();
            }
        }

        writer.finalize().map_err(wav_error)?;
        debug!(
            "Offline render finished: {} frames, {} completions",
            stats.frames, stats.completions
        );
        Ok(stats)
    }
}

fn wav_error(err: hound::Error) -> Error {
    match err {
        hound::Error::IoError(e) => Error::Io(e),
        other => Error::AudioOutput(format!("WAV write failed: {}", other)),
    }
}
