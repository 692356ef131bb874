//! Rendering backend interface
//!
//! The scheduler drives rendering through two small traits:
//!
//! - [`RenderBackend`]: a clock in ticks plus a factory for render handles.
//! - [`RenderHandle`]: one-shot playback of one buffer at an absolute clock
//!   time and read offset, with a completion notification.
//!
//! # Completion contract
//!
//! - The completion callback fires at most once, and only when the buffer
//!   played out to its end.
//! - It never fires after `disconnect()` returned.
//! - It is delivered asynchronously: never from inside `start()` or
//!   `disconnect()`. The scheduler holds its state lock across those calls.

use crate::audio::types::DecodedBuffer;
use std::sync::Arc;

/// Callback invoked when a handle's buffer finished playing naturally
pub type CompletionCallback = Box<dyn FnOnce() + Send + 'static>;

/// Rendering backend collaborator
pub trait RenderBackend: Send + Sync + 'static {
    /// Current backend clock time in ticks
    fn clock_now(&self) -> i64;

    /// Create a fresh, not yet started handle bound to `buffer`
    fn create_handle(&self, buffer: Arc<DecodedBuffer>) -> Box<dyn RenderHandle>;
}

/// One rendering of one buffer
pub trait RenderHandle: Send {
    /// Register the natural-completion callback (replaces any previous one)
    fn on_complete(&mut self, callback: CompletionCallback);

    /// Begin rendering at absolute clock time `at_ticks`, skipping the first
    /// `offset_ticks` of the buffer
    fn start(&mut self, at_ticks: i64, offset_ticks: i64);

    /// Stop rendering and drop the completion callback
    ///
    /// Safe to call on a handle that was never started or already finished.
    fn disconnect(&mut self);
}
