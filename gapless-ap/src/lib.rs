//! # Gapless Audio Player Library (gapless-ap)
//!
//! Gapless sequential playback of an append-only stream of independently
//! decoded audio chunks.
//!
//! **Purpose:** Decode chunks as they arrive, schedule each one to start exactly
//! when the previous one ends, and support start/stop and percentage seeking
//! across the accumulated stream.
//!
//! **Architecture:** `StreamScheduler` over two collaborator traits,
//! `AudioDecoder` (symphonia) and `RenderBackend` (software mixer driven by cpal
//! or rendered offline to WAV).

pub mod audio;
pub mod config;
pub mod error;
pub mod playback;

pub use error::{Error, Result};
pub use playback::StreamScheduler;
