//! Playable chunk
//!
//! Wraps one decoded buffer together with the render handle currently playing
//! it. Every `start` creates a fresh handle (disconnecting the previous one) and
//! opens a new *run*; the completion notification carries the run number so
//! the owner can tell a live completion from a stale one.
//!
//! Completion guarantees, enforced by [`PlayableChunk::complete`]:
//! - at most one counted completion per `start`
//! - no counted completion after `disconnect`

use crate::audio::backend::{RenderBackend, RenderHandle};
use crate::audio::types::DecodedBuffer;
use std::sync::Arc;
use uuid::Uuid;

/// Notification sink for natural completion, called with the chunk id and
/// the run number of the rendering that finished
pub type CompletionNotify = Arc<dyn Fn(Uuid, u64) + Send + Sync>;

/// One decoded chunk and its rendering state
pub struct PlayableChunk {
    id: Uuid,
    buffer: Arc<DecodedBuffer>,
    duration_ticks: i64,
    backend: Arc<dyn RenderBackend>,
    handle: Option<Box<dyn RenderHandle>>,
    run: u64,
    armed: bool,
    notify: CompletionNotify,
}

impl PlayableChunk {
    pub fn new(
        buffer: Arc<DecodedBuffer>,
        backend: Arc<dyn RenderBackend>,
        notify: CompletionNotify,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            duration_ticks: buffer.duration_ticks(),
            buffer,
            backend,
            handle: None,
            run: 0,
            armed: false,
            notify,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn duration_ticks(&self) -> i64 {
        self.duration_ticks
    }

    /// Current run number (0 = never started)
    pub fn run(&self) -> u64 {
        self.run
    }

    /// True while a started rendering has neither completed nor been disconnected
    pub fn is_active(&self) -> bool {
        self.armed
    }

    /// Start rendering at absolute `at_ticks`, skipping `offset_ticks`
    ///
    /// Returns the instant this chunk's audio ends: `at + duration - offset`.
    pub fn start(&mut self, at_ticks: i64, offset_ticks: i64) -> i64 {
        self.disconnect();

        self.run += 1;
        let run = self.run;
        let id = self.id;
        let notify = Arc::clone(&self.notify);

        let mut handle = self.backend.create_handle(Arc::clone(&self.buffer));
        handle.on_complete(Box::new(move || notify(id, run)));
        handle.start(at_ticks, offset_ticks);

        self.handle = Some(handle);
        self.armed = true;

        at_ticks + self.duration_ticks - offset_ticks
    }

    /// Tear down the current rendering, if any; no-op otherwise
    pub fn disconnect(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.disconnect();
        }
        self.armed = false;
    }

    /// Consume a completion notification for `run`
    ///
    /// Returns true only for the current, still armed run.
    pub fn complete(&mut self, run: u64) -> bool {
        if !self.armed || run != self.run {
            return false;
        }
        self.armed = false;
        self.handle = None;
        true
    }
}

impl std::fmt::Debug for PlayableChunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayableChunk")
            .field("id", &self.id)
            .field("duration_ticks", &self.duration_ticks)
            .field("run", &self.run)
            .field("armed", &self.armed)
            .finish()
    }
}
