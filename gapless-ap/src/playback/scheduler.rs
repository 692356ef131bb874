//! Stream scheduler
//!
//! Accepts an append-only sequence of encoded chunks, decodes them, and
//! schedules each decoded chunk on the rendering backend so that it starts
//! exactly when the previous one ends.
//!
//! **Components:**
//! - [`Timeline`]: cumulative duration spans, one per chunk, used for seeking
//! - [`PlayableChunk`]: a decoded buffer plus its current render handle
//! - ingest worker: applies decoded chunks in submission order
//!
//! **Scheduling:** a cursor holds the absolute backend time at which the next
//! chunk must start. Scheduling a chunk starts it at the cursor and moves the
//! cursor to the chunk's end, so consecutive chunks are chained back to back
//! with no gap and no overlap.
//!
//! **Locking:** all scheduler state lives behind one `parking_lot::Mutex`,
//! never held across an `.await`. Backend completion callbacks take the same
//! lock, which is why backends must deliver them asynchronously.

use crate::audio::backend::RenderBackend;
use crate::audio::decoder::AudioDecoder;
use crate::audio::types::DecodedBuffer;
use crate::error::{Error, Result};
use crate::playback::chunk::{CompletionNotify, PlayableChunk};
use crate::playback::ingest::{self, IngestJob};
use crate::playback::state::{transition, PlaybackState, PlaybackTrigger};
use crate::playback::timeline::{DurationSpan, SeekTarget, Timeline};
use gapless_common::events::{EventBus, SchedulerEvent};
use gapless_common::timing::{percent_of, ticks_to_ms};
use parking_lot::Mutex;
use std::future::Future;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Instant;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Mutable scheduler state, guarded by a single mutex
pub(crate) struct SchedulerCore {
    /// Weak self reference handed to chunk completion callbacks
    self_ref: Weak<Mutex<SchedulerCore>>,
    backend: Arc<dyn RenderBackend>,
    timeline: Timeline,
    /// Chunk arena, in append order
    chunks: Vec<PlayableChunk>,
    /// Playback order as indices into `chunks`
    entries: Vec<usize>,
    state: PlaybackState,
    /// Absolute backend time at which the next chunk starts
    schedule_cursor: i64,
    /// Scheduled-or-skipped chunks that have finished
    ended_count: usize,
    events: EventBus,
}

impl SchedulerCore {
    fn new(
        self_ref: Weak<Mutex<SchedulerCore>>,
        backend: Arc<dyn RenderBackend>,
        events: EventBus,
    ) -> Self {
        Self {
            self_ref,
            backend,
            timeline: Timeline::new(),
            chunks: Vec::new(),
            entries: Vec::new(),
            state: PlaybackState::Idle,
            schedule_cursor: 0,
            ended_count: 0,
            events,
        }
    }

    /// Apply a state trigger; emits `StateChanged` when the state moves
    ///
    /// Returns false if the trigger does not apply in the current state.
    fn apply(&mut self, trigger: PlaybackTrigger) -> bool {
        let Some(new_state) = transition(self.state, trigger) else {
            return false;
        };

        if new_state != self.state {
            let old_state = self.state;
            self.state = new_state;
            debug!("State {} -> {} ({:?})", old_state, new_state, trigger);
            self.events.emit(SchedulerEvent::StateChanged {
                old_state,
                new_state,
            });
        }
        true
    }

    /// Append a decoded chunk; schedules it right away while playing
    ///
    /// Returns the new total duration.
    pub(crate) fn append(&mut self, buffer: DecodedBuffer) -> i64 {
        let index = self.chunks.len();
        let span = self.timeline.push(buffer.duration_ticks());

        let core = self.self_ref.clone();
        let notify: CompletionNotify = Arc::new(move |chunk_id, run| {
            if let Some(core) = core.upgrade() {
                core.lock().chunk_ended(index, chunk_id, run);
            }
        });

        let chunk = PlayableChunk::new(Arc::new(buffer), Arc::clone(&self.backend), notify);
        let chunk_id = chunk.id();
        self.chunks.push(chunk);
        self.entries.push(index);

        debug!(
            "Appended chunk {} ({}): {}ms..{}ms",
            index,
            chunk_id,
            ticks_to_ms(span.begin_ticks),
            ticks_to_ms(span.end_ticks)
        );
        self.events.emit(SchedulerEvent::ChunkAppended {
            index,
            chunk_id,
            begin_ticks: span.begin_ticks,
            end_ticks: span.end_ticks,
        });

        if self.state == PlaybackState::Playing {
            // A drained schedule leaves the cursor in the past
            self.schedule_cursor = self.schedule_cursor.max(self.backend.clock_now());
            let pos = self.entries.len() - 1;
            self.schedule(pos..self.entries.len(), 0);
        }

        self.timeline.total_ticks()
    }

    /// Start the entries in `range` back to back from the cursor
    ///
    /// `offset_ticks` applies to the first entry only.
    fn schedule(&mut self, range: Range<usize>, mut offset_ticks: i64) {
        for pos in range {
            let Some(&index) = self.entries.get(pos) else {
                break;
            };
            let Some(chunk) = self.chunks.get_mut(index) else {
                continue;
            };

            let at_ticks = self.schedule_cursor;
            let end_ticks = chunk.start(at_ticks, offset_ticks);

            debug!(
                "Scheduled chunk {} at {} (offset {}, ends {})",
                index, at_ticks, offset_ticks, end_ticks
            );
            self.events.emit(SchedulerEvent::ChunkScheduled {
                index,
                at_ticks,
                offset_ticks,
                end_ticks,
            });

            self.schedule_cursor = end_ticks;
            offset_ticks = 0;
        }
    }

    fn start(&mut self) {
        if !self.apply(PlaybackTrigger::Start) {
            debug!("Start ignored: already {}", self.state);
            return;
        }

        self.ended_count = 0;
        self.schedule_cursor = self.backend.clock_now();
        info!(
            "Starting playback of {} chunks ({}ms)",
            self.entries.len(),
            ticks_to_ms(self.timeline.total_ticks())
        );
        self.schedule(0..self.entries.len(), 0);
    }

    fn seek(&mut self, percent: f64) -> Result<()> {
        let total_ticks = self.timeline.total_ticks();
        let target_ticks = percent_of(total_ticks, percent);

        let located = if self.chunks.is_empty()
            || !percent.is_finite()
            || !(0.0..=100.0).contains(&percent)
        {
            None
        } else {
            self.timeline.locate(target_ticks)
        };

        let Some(SeekTarget {
            index,
            offset_ticks,
        }) = located
        else {
            warn!(
                "Rejected seek to {}% (target {} ticks, stream {} ticks, {} chunks)",
                percent,
                target_ticks,
                total_ticks,
                self.chunks.len()
            );
            return Err(Error::InvalidSeekPosition {
                percent,
                target_ticks,
                total_ticks,
            });
        };

        info!(
            "Seeking to {}% ({}ms): chunk {} at offset {}ms",
            percent,
            ticks_to_ms(target_ticks),
            index,
            ticks_to_ms(offset_ticks)
        );

        self.teardown(PlaybackTrigger::Reset);
        self.apply(PlaybackTrigger::Seek);
        self.ended_count = index;
        self.schedule_cursor = self.backend.clock_now();
        self.apply(PlaybackTrigger::Resumed);
        self.schedule(index..self.entries.len(), offset_ticks);
        Ok(())
    }

    /// Disconnect every chunk and go idle, keeping the stream history
    fn teardown(&mut self, trigger: PlaybackTrigger) {
        for chunk in &mut self.chunks {
            chunk.disconnect();
        }
        self.ended_count = 0;
        self.apply(trigger);
    }

    fn stop(&mut self) {
        self.teardown(PlaybackTrigger::Stop);
        self.entries.clear();
        self.chunks.clear();
        self.timeline.clear();
        self.schedule_cursor = 0;
        info!("Playback stopped, stream cleared");
        self.events.emit(SchedulerEvent::Stopped);
    }

    /// Completion notification from a chunk's render handle
    fn chunk_ended(&mut self, index: usize, chunk_id: Uuid, run: u64) {
        let counted = match self.chunks.get_mut(index) {
            Some(chunk) if chunk.id() == chunk_id => chunk.complete(run),
            _ => false,
        };
        if !counted {
            warn!(
                "Ignoring stale completion for chunk {} ({}, run {})",
                index, chunk_id, run
            );
            return;
        }

        self.ended_count += 1;
        debug!(
            "Chunk {} ended ({}/{})",
            index,
            self.ended_count,
            self.entries.len()
        );
        self.events.emit(SchedulerEvent::ChunkEnded { index, chunk_id });

        if self.ended_count >= self.entries.len() && self.apply(PlaybackTrigger::StreamEnded) {
            let total_ticks = self.timeline.total_ticks();
            info!("Stream ended after {}ms", ticks_to_ms(total_ticks));
            self.events.emit(SchedulerEvent::StreamEnded { total_ticks });
        }
    }
}

/// Gapless scheduler over an append-only stream of encoded chunks
///
/// # Examples
///
/// ```no_run
/// use gapless_ap::audio::{Mixer, MixerBackend, SymphoniaDecoder};
/// use gapless_ap::StreamScheduler;
/// use gapless_common::events::EventBus;
/// use parking_lot::Mutex;
/// use std::sync::Arc;
///
/// # async fn demo(files: Vec<Vec<u8>>) -> gapless_ap::Result<()> {
/// let mixer = Arc::new(Mutex::new(Mixer::new(44100, 2)));
/// let scheduler = StreamScheduler::new(
///     Arc::new(MixerBackend::new(mixer)),
///     Arc::new(SymphoniaDecoder::new()),
///     EventBus::new(64),
/// );
///
/// // Issue every call up front; decodes overlap, appends keep call order
/// let pending: Vec<_> = files.into_iter().map(|f| scheduler.add_chunk(f)).collect();
/// for added in pending {
///     added.await?;
/// }
///
/// scheduler.start();
/// scheduler.seek(50.0)?;
/// # Ok(())
/// # }
/// ```
pub struct StreamScheduler {
    core: Arc<Mutex<SchedulerCore>>,
    decoder: Arc<dyn AudioDecoder>,
    ingest_tx: mpsc::UnboundedSender<IngestJob>,
    worker: JoinHandle<()>,
    next_seq: AtomicU64,
    events: EventBus,
}

impl StreamScheduler {
    /// Create a scheduler and spawn its ingest worker
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime.
    pub fn new(
        backend: Arc<dyn RenderBackend>,
        decoder: Arc<dyn AudioDecoder>,
        events: EventBus,
    ) -> Self {
        let core = Arc::new_cyclic(|weak| {
            Mutex::new(SchedulerCore::new(weak.clone(), backend, events.clone()))
        });

        let (ingest_tx, ingest_rx) = mpsc::unbounded_channel();
        let worker = ingest::spawn_worker(Arc::clone(&core), ingest_rx);

        info!("Stream scheduler created");

        Self {
            core,
            decoder,
            ingest_tx,
            worker,
            next_seq: AtomicU64::new(0),
            events,
        }
    }

    /// Decode `bytes` and append the result to the stream
    ///
    /// The decode starts and the request is queued when this is *called*, not
    /// when the returned future is first polled: chunks are appended in call
    /// order even if their decodes finish out of order. While playing, the new
    /// chunk is scheduled right after the previously scheduled one.
    ///
    /// Resolves to the total stream duration (ticks) after the append.
    ///
    /// # Errors
    /// - `Error::Decode` when this chunk fails to decode (later calls unaffected)
    /// - `Error::Playback` when the ingest worker is gone
    pub fn add_chunk(&self, bytes: Vec<u8>) -> impl Future<Output = Result<i64>> + Send + 'static {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let byte_len = bytes.len();
        let decode = tokio::spawn(self.decoder.decode(bytes));
        let (reply, reply_rx) = oneshot::channel();

        let queued = self
            .ingest_tx
            .send(IngestJob {
                seq,
                decode,
                reply,
                submitted: Instant::now(),
            })
            .is_ok();

        debug!("Queued chunk #{} ({} bytes)", seq, byte_len);

        async move {
            if !queued {
                return Err(Error::Playback("Ingest worker is not running".to_string()));
            }
            reply_rx.await.map_err(|_| {
                Error::Playback(format!("Ingest worker dropped chunk #{}", seq))
            })?
        }
    }

    /// Total duration of every appended chunk, in ticks
    pub fn total_duration(&self) -> i64 {
        self.core.lock().timeline.total_ticks()
    }

    /// Schedule every chunk from the beginning; no-op while playing
    pub fn start(&self) {
        self.core.lock().start();
    }

    /// Jump to `percent` (0..=100) of the current total duration
    ///
    /// Starts playback if the scheduler was idle.
    ///
    /// # Errors
    /// `Error::InvalidSeekPosition` when the stream is empty or the position
    /// is out of range. Nothing changes in that case.
    pub fn seek(&self, percent: f64) -> Result<()> {
        self.core.lock().seek(percent)
    }

    /// Stop rendering and discard the stream
    ///
    /// Decodes still in flight are appended (unscheduled) when they finish.
    pub fn stop(&self) {
        self.core.lock().stop();
    }

    /// Stop rendering, keeping the stream
    pub(crate) fn reset(&self) {
        self.core.lock().teardown(PlaybackTrigger::Reset);
    }

    pub fn state(&self) -> PlaybackState {
        self.core.lock().state
    }

    pub fn is_playing(&self) -> bool {
        self.state() == PlaybackState::Playing
    }

    pub fn chunk_count(&self) -> usize {
        self.core.lock().chunks.len()
    }

    /// Snapshot of the cumulative duration spans
    pub fn spans(&self) -> Vec<DurationSpan> {
        self.core.lock().timeline.spans().to_vec()
    }

    /// Subscribe to scheduler events
    pub fn subscribe(&self) -> broadcast::Receiver<SchedulerEvent> {
        self.events.subscribe()
    }
}

impl Drop for StreamScheduler {
    fn drop(&mut self) {
        self.worker.abort();
        self.reset();
    }
}
