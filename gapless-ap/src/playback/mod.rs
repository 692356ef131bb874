//! Playback scheduling
//!
//! Turns appended chunks into a gapless, seekable stream on a rendering
//! backend.

pub mod chunk;
mod ingest;
pub mod scheduler;
pub mod state;
pub mod timeline;

pub use chunk::PlayableChunk;
pub use scheduler::StreamScheduler;
pub use state::{PlaybackState, PlaybackTrigger};
pub use timeline::{DurationSpan, SeekTarget, Timeline};
