//! Manual-clock render backend
//!
//! Nothing renders: `start` and `disconnect` are recorded, the clock moves
//! only when a test sets it, and completions fire only when a test asks for
//! them. Completion callbacks are invoked on the test's thread with no
//! backend lock held, like a real backend delivering them asynchronously.

use gapless_ap::audio::{CompletionCallback, DecodedBuffer, RenderBackend, RenderHandle};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One recorded `RenderHandle::start`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartRecord {
    pub handle: u64,
    pub duration_ticks: i64,
    pub at_ticks: i64,
    pub offset_ticks: i64,
}

impl StartRecord {
    /// Backend time at which this rendering ends
    pub fn end_ticks(&self) -> i64 {
        self.at_ticks + self.duration_ticks - self.offset_ticks
    }
}

#[derive(Default)]
struct Recorder {
    now: i64,
    next_handle: u64,
    starts: Vec<StartRecord>,
    disconnects: Vec<u64>,
    /// Armed completions of started, not yet disconnected handles
    pending: BTreeMap<u64, CompletionCallback>,
}

#[derive(Clone, Default)]
pub struct RecordingBackend {
    inner: Arc<Mutex<Recorder>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_now(&self, ticks: i64) {
        self.inner.lock().now = ticks;
    }

    pub fn starts(&self) -> Vec<StartRecord> {
        self.inner.lock().starts.clone()
    }

    pub fn disconnect_count(&self) -> usize {
        self.inner.lock().disconnects.len()
    }

    /// Handles whose completion is still armed, in start order
    pub fn pending_handles(&self) -> Vec<u64> {
        self.inner.lock().pending.keys().copied().collect()
    }

    /// Remove a handle's armed completion without firing it
    pub fn take_callback(&self, handle: u64) -> Option<CompletionCallback> {
        self.inner.lock().pending.remove(&handle)
    }

    /// Fire the completion of `handle`; false if it was not armed
    pub fn complete(&self, handle: u64) -> bool {
        let callback = self.take_callback(handle);
        match callback {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    /// Fire the earliest armed completion
    pub fn complete_next(&self) -> bool {
        let next = self.inner.lock().pending.keys().next().copied();
        next.map_or(false, |handle| self.complete(handle))
    }

    /// Fire every armed completion in start order; returns how many fired
    pub fn complete_all(&self) -> usize {
        let mut fired = 0;
        while self.complete_next() {
            fired += 1;
        }
        fired
    }
}

impl RenderBackend for RecordingBackend {
    fn clock_now(&self) -> i64 {
        self.inner.lock().now
    }

    fn create_handle(&self, buffer: Arc<DecodedBuffer>) -> Box<dyn RenderHandle> {
        let mut recorder = self.inner.lock();
        recorder.next_handle += 1;
        Box::new(RecordingHandle {
            recorder: Arc::clone(&self.inner),
            id: recorder.next_handle,
            duration_ticks: buffer.duration_ticks(),
            callback: None,
            started: false,
        })
    }
}

struct RecordingHandle {
    recorder: Arc<Mutex<Recorder>>,
    id: u64,
    duration_ticks: i64,
    callback: Option<CompletionCallback>,
    started: bool,
}

impl RenderHandle for RecordingHandle {
    fn on_complete(&mut self, callback: CompletionCallback) {
        self.callback = Some(callback);
    }

    fn start(&mut self, at_ticks: i64, offset_ticks: i64) {
        self.started = true;
        let mut recorder = self.recorder.lock();
        recorder.starts.push(StartRecord {
            handle: self.id,
            duration_ticks: self.duration_ticks,
            at_ticks,
            offset_ticks,
        });
        if let Some(callback) = self.callback.take() {
            recorder.pending.insert(self.id, callback);
        }
    }

    fn disconnect(&mut self) {
        self.callback = None;
        if self.started {
            let mut recorder = self.recorder.lock();
            recorder.pending.remove(&self.id);
            recorder.disconnects.push(self.id);
            self.started = false;
        }
    }
}
