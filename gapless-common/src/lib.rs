//! # Gapless Common Library
//!
//! Shared code for the gapless playback workspace:
//! - Tick-based timing and conversions
//! - Scheduler event types and the EventBus
//! - Configuration file resolution
//! - Common error type

pub mod config;
pub mod error;
pub mod events;
pub mod timing;

pub use error::{Error, Result};
pub use events::{EventBus, PlaybackState, SchedulerEvent};
