//! Clocked software mixer
//!
//! The mixer owns the output sample clock. Voices are placed on that clock at
//! an absolute tick time and read their buffer from a tick offset; `render`
//! fills interleaved output frames, advances the clock and hands back the
//! completion callbacks of voices that played out.
//!
//! A voice covers output frames `[frame(at), frame(at + remaining))`, where
//! `remaining = duration - offset`. The next chunk of a gapless chain starts at
//! `at + remaining`, i.e. exactly on the frame where the previous one stopped.
//!
//! Source frames are picked by tick position (zero-order hold), so buffers at a
//! different rate than the device still play for their exact duration.

use crate::audio::backend::{CompletionCallback, RenderBackend, RenderHandle};
use crate::audio::types::DecodedBuffer;
use gapless_common::timing::{samples_to_ticks, ticks_to_samples};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Identifier of a voice inside one mixer
pub type VoiceId = u64;

struct Voice {
    buffer: Arc<DecodedBuffer>,
    at_ticks: i64,
    offset_ticks: i64,
    start_frame: u64,
    end_frame: u64,
    on_complete: Option<CompletionCallback>,
}

/// Software mixer with a frame-counting clock
pub struct Mixer {
    sample_rate: u32,
    channels: u16,
    clock_frames: u64,
    voices: BTreeMap<VoiceId, Voice>,
}

impl Mixer {
    /// Create a mixer producing `channels` interleaved channels at `sample_rate`
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            channels: channels.max(1),
            clock_frames: 0,
            voices: BTreeMap::new(),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Output frames rendered so far
    pub fn clock_frames(&self) -> u64 {
        self.clock_frames
    }

    /// Current clock time in ticks
    pub fn clock_ticks(&self) -> i64 {
        samples_to_ticks(self.clock_frames as usize, self.sample_rate)
    }

    /// Number of voices started and not yet finished or removed
    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    /// Place a voice on the clock (replacing any voice with the same id)
    pub fn add_voice(
        &mut self,
        id: VoiceId,
        buffer: Arc<DecodedBuffer>,
        at_ticks: i64,
        offset_ticks: i64,
        on_complete: Option<CompletionCallback>,
    ) {
        let offset_ticks = offset_ticks.max(0);
        let remaining = (buffer.duration_ticks() - offset_ticks).max(0);
        let start_frame = ticks_to_samples(at_ticks, self.sample_rate) as u64;
        let end_frame = ticks_to_samples(at_ticks + remaining, self.sample_rate) as u64;

        trace!(
            "Voice {} placed on frames {}..{} (clock at {})",
            id,
            start_frame,
            end_frame,
            self.clock_frames
        );

        self.voices.insert(
            id,
            Voice {
                buffer,
                at_ticks,
                offset_ticks,
                start_frame,
                end_frame,
                on_complete,
            },
        );
    }

    /// Remove a voice without firing its completion callback
    ///
    /// Returns false if the voice was not active.
    pub fn remove_voice(&mut self, id: VoiceId) -> bool {
        self.voices.remove(&id).is_some()
    }

    /// Render `out.len() / channels` frames of interleaved audio
    ///
    /// Returns the completion callbacks of voices that reached their end
    /// during this block. Callers must invoke them after releasing the mixer.
    pub fn render(&mut self, out: &mut [f32]) -> Vec<CompletionCallback> {
        out.iter_mut().for_each(|s| *s = 0.0);

        let out_channels = self.channels as usize;
        let frames = (out.len() / out_channels) as u64;
        let block_start = self.clock_frames;
        let block_end = block_start + frames;

        for voice in self.voices.values() {
            let first = voice.start_frame.max(block_start);
            let last = voice.end_frame.min(block_end);
            if first >= last {
                continue;
            }

            let src = &voice.buffer;
            let src_channels = src.channel_count as usize;
            let src_last = src.frame_count.saturating_sub(1);

            for frame in first..last {
                let frame_ticks = samples_to_ticks(frame as usize, self.sample_rate);
                let position = (voice.offset_ticks + frame_ticks - voice.at_ticks).max(0);
                let src_frame = ticks_to_samples(position, src.sample_rate).min(src_last);

                let base = (frame - block_start) as usize * out_channels;
                for ch in 0..out_channels {
                    let sample = if src_channels == 1 {
                        src.sample(src_frame, 0)
                    } else {
                        src.sample(src_frame, ch)
                    };
                    out[base + ch] += sample;
                }
            }
        }

        self.clock_frames = block_end;

        let finished: Vec<VoiceId> = self
            .voices
            .iter()
            .filter(|(_, v)| v.end_frame <= block_end)
            .map(|(id, _)| *id)
            .collect();

        let mut completed = Vec::with_capacity(finished.len());
        for id in finished {
            if let Some(voice) = self.voices.remove(&id) {
                trace!("Voice {} finished at frame {}", id, block_end);
                if let Some(callback) = voice.on_complete {
                    completed.push(callback);
                }
            }
        }
        completed
    }
}

/// Delivers completion callbacks off the audio thread
///
/// The audio callback must not take the scheduler lock; it hands finished
/// voices' callbacks to a tokio task instead.
#[derive(Clone)]
pub struct CompletionDispatcher {
    tx: mpsc::UnboundedSender<CompletionCallback>,
}

impl CompletionDispatcher {
    /// Spawn the dispatch task on the current tokio runtime
    pub fn spawn() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<CompletionCallback>();

        tokio::spawn(async move {
            while let Some(callback) = rx.recv().await {
                callback();
            }
            debug!("Completion dispatcher stopped");
        });

        Self { tx }
    }

    /// Queue callbacks for delivery; never blocks
    pub fn dispatch(&self, callbacks: Vec<CompletionCallback>) {
        for callback in callbacks {
            // Receiver only goes away at runtime shutdown
            let _ = self.tx.send(callback);
        }
    }
}

/// [`RenderBackend`] over a shared [`Mixer`]
pub struct MixerBackend {
    mixer: Arc<Mutex<Mixer>>,
    next_voice: AtomicU64,
}

impl MixerBackend {
    pub fn new(mixer: Arc<Mutex<Mixer>>) -> Self {
        Self {
            mixer,
            next_voice: AtomicU64::new(1),
        }
    }

    /// Shared mixer this backend places voices on
    pub fn mixer(&self) -> Arc<Mutex<Mixer>> {
        Arc::clone(&self.mixer)
    }
}

impl RenderBackend for MixerBackend {
    fn clock_now(&self) -> i64 {
        self.mixer.lock().clock_ticks()
    }

    fn create_handle(&self, buffer: Arc<DecodedBuffer>) -> Box<dyn RenderHandle> {
        Box::new(MixerHandle {
            mixer: Arc::clone(&self.mixer),
            id: self.next_voice.fetch_add(1, Ordering::Relaxed),
            buffer,
            on_complete: None,
            started: false,
        })
    }
}

struct MixerHandle {
    mixer: Arc<Mutex<Mixer>>,
    id: VoiceId,
    buffer: Arc<DecodedBuffer>,
    on_complete: Option<CompletionCallback>,
    started: bool,
}

impl RenderHandle for MixerHandle {
    fn on_complete(&mut self, callback: CompletionCallback) {
        self.on_complete = Some(callback);
    }

    fn start(&mut self, at_ticks: i64, offset_ticks: i64) {
        self.started = true;
        self.mixer.lock().add_voice(
            self.id,
            Arc::clone(&self.buffer),
            at_ticks,
            offset_ticks,
            self.on_complete.take(),
        );
    }

    fn disconnect(&mut self) {
        self.on_complete = None;
        if self.started {
            self.mixer.lock().remove_voice(self.id);
            self.started = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn constant_buffer(value: f32, frames: usize, rate: u32) -> Arc<DecodedBuffer> {
        Arc::new(DecodedBuffer::new(vec![value; frames], rate, 1))
    }

    fn counter_callback(counter: &Arc<AtomicUsize>) -> CompletionCallback {
        let counter = Arc::clone(counter);
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_render_advances_clock() {
        let mut mixer = Mixer::new(8000, 2);
        let mut out = vec![1.0; 200];
        mixer.render(&mut out);

        assert_eq!(mixer.clock_frames(), 100);
        assert_eq!(mixer.clock_ticks(), samples_to_ticks(100, 8000));
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_back_to_back_voices_leave_no_gap() {
        let mut mixer = Mixer::new(8000, 1);
        let a = constant_buffer(0.5, 30, 8000);
        let b = constant_buffer(0.25, 30, 8000);

        let a_end = a.duration_ticks();
        mixer.add_voice(1, a, 0, 0, None);
        mixer.add_voice(2, b, a_end, 0, None);

        let mut out = vec![0.0; 80];
        mixer.render(&mut out);

        assert!(out[..30].iter().all(|&s| s == 0.5));
        assert!(out[30..60].iter().all(|&s| s == 0.25));
        assert!(out[60..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_offset_skips_into_buffer() {
        let mut mixer = Mixer::new(8000, 1);
        let samples: Vec<f32> = (0..10).map(|i| i as f32).collect();
        let buffer = Arc::new(DecodedBuffer::new(samples, 8000, 1));

        mixer.add_voice(1, buffer, 0, samples_to_ticks(4, 8000), None);

        let mut out = vec![0.0; 8];
        mixer.render(&mut out);
        assert_eq!(&out[..6], &[4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        assert_eq!(&out[6..], &[0.0, 0.0]);
    }

    #[test]
    fn test_completion_returned_once_voice_finishes() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut mixer = Mixer::new(8000, 1);
        mixer.add_voice(1, constant_buffer(0.1, 10, 8000), 0, 0, Some(counter_callback(&counter)));

        let mut out = vec![0.0; 6];
        assert!(mixer.render(&mut out).is_empty());
        assert_eq!(mixer.active_voices(), 1);

        let completed = mixer.render(&mut out);
        assert_eq!(completed.len(), 1);
        completed.into_iter().for_each(|cb| cb());

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(mixer.active_voices(), 0);
        assert!(mixer.render(&mut out).is_empty());
    }

    #[test]
    fn test_removed_voice_never_completes() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut mixer = Mixer::new(8000, 1);
        mixer.add_voice(1, constant_buffer(0.1, 10, 8000), 0, 0, Some(counter_callback(&counter)));

        assert!(mixer.remove_voice(1));
        assert!(!mixer.remove_voice(1));

        let mut out = vec![0.0; 20];
        assert!(mixer.render(&mut out).is_empty());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_late_voice_starts_where_it_would_have_been() {
        let mut mixer = Mixer::new(8000, 1);
        let mut out = vec![0.0; 4];
        mixer.render(&mut out);

        let samples: Vec<f32> = (0..10).map(|i| i as f32).collect();
        mixer.add_voice(1, Arc::new(DecodedBuffer::new(samples, 8000, 1)), 0, 0, None);

        let mut out = vec![0.0; 4];
        mixer.render(&mut out);
        assert_eq!(out, vec![4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_mono_source_fills_all_output_channels() {
        let mut mixer = Mixer::new(8000, 2);
        mixer.add_voice(1, constant_buffer(0.3, 4, 8000), 0, 0, None);

        let mut out = vec![0.0; 8];
        mixer.render(&mut out);
        assert!(out.iter().all(|&s| s == 0.3));
    }

    #[test]
    fn test_source_rate_mapped_by_ticks() {
        // 4 frames at 4kHz last as long as 8 frames at 8kHz
        let mut mixer = Mixer::new(8000, 1);
        let buffer = Arc::new(DecodedBuffer::new(vec![1.0, 2.0, 3.0, 4.0], 4000, 1));
        mixer.add_voice(1, buffer, 0, 0, None);

        let mut out = vec![0.0; 10];
        mixer.render(&mut out);
        assert_eq!(out, vec![1.0, 1.0, 2.0, 2.0, 3.0, 3.0, 4.0, 4.0, 0.0, 0.0]);
    }

    #[test]
    fn test_offset_at_full_duration_completes_immediately() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut mixer = Mixer::new(8000, 1);
        let buffer = constant_buffer(0.9, 10, 8000);
        let duration = buffer.duration_ticks();
        mixer.add_voice(1, buffer, 0, duration, Some(counter_callback(&counter)));

        let mut out = vec![0.0; 2];
        let completed = mixer.render(&mut out);
        assert_eq!(completed.len(), 1);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_backend_handle_disconnect_removes_voice() {
        let mixer = Arc::new(Mutex::new(Mixer::new(8000, 1)));
        let backend = MixerBackend::new(Arc::clone(&mixer));

        let mut handle = backend.create_handle(constant_buffer(0.2, 100, 8000));
        handle.disconnect();
        handle.start(backend.clock_now(), 0);
        assert_eq!(mixer.lock().active_voices(), 1);

        handle.disconnect();
        assert_eq!(mixer.lock().active_voices(), 0);
        handle.disconnect();
    }
}
