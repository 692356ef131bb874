//! Test helper modules for gapless-ap integration tests
//!
//! Provides reusable test infrastructure components:
//! - RecordingBackend: manual-clock render backend that records every call
//! - ScriptedDecoder: decoder whose durations, delays and failures are
//!   described by the chunk bytes themselves
//! - wav_fixtures: in-memory WAV files built with hound

#![allow(dead_code)]

pub mod recording_backend;
pub mod scripted_decoder;
pub mod wav_fixtures;

pub use recording_backend::{RecordingBackend, StartRecord};
pub use scripted_decoder::{failing_chunk, scripted_chunk, ScriptedDecoder, SCRIPT_SAMPLE_RATE};
pub use wav_fixtures::{constant_wav, decode_wav_samples};
