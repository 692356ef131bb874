//! Scheduler event definitions and EventBus
//!
//! Events are emitted by the stream scheduler as chunks are appended,
//! scheduled and completed, and whenever the playback state changes. They are
//! serializable so front ends can forward them as-is (JSON lines, SSE, ...).

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Playback state of a stream scheduler
///
/// `Seeking` is a transient state entered while a seek tears down and
/// re-schedules rendering; it always resolves to `Playing`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// Nothing is rendering
    Idle,
    /// Chunks are scheduled on the rendering backend
    Playing,
    /// Rendering torn down, about to resume from a new position
    Seeking,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "idle"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Seeking => write!(f, "seeking"),
        }
    }
}

/// Events emitted by the stream scheduler
///
/// All times are in ticks (see [`crate::timing`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SchedulerEvent {
    /// A decoded chunk was appended to the stream
    ChunkAppended {
        /// Position in the stream (0-based)
        index: usize,
        /// Unique chunk identifier
        chunk_id: Uuid,
        /// Cumulative span start
        begin_ticks: i64,
        /// Cumulative span end (new total duration)
        end_ticks: i64,
    },

    /// A chunk was handed to the rendering backend
    ChunkScheduled {
        index: usize,
        /// Absolute backend clock time the chunk starts at
        at_ticks: i64,
        /// Read offset into the chunk
        offset_ticks: i64,
        /// Absolute backend clock time the chunk ends at
        end_ticks: i64,
    },

    /// A chunk finished rendering naturally
    ChunkEnded { index: usize, chunk_id: Uuid },

    /// Playback state changed
    StateChanged {
        old_state: PlaybackState,
        new_state: PlaybackState,
    },

    /// Every scheduled chunk finished rendering
    StreamEnded {
        /// Total stream duration at the time playback ended
        total_ticks: i64,
    },

    /// The stream was stopped and its history discarded
    Stopped,
}

/// Event distribution bus for scheduler events
///
/// Uses tokio::broadcast internally:
/// - Non-blocking publish (slow subscribers don't block the scheduler)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use gapless_common::events::{EventBus, PlaybackState, SchedulerEvent};
///
/// let bus = EventBus::new(16);
/// let mut rx = bus.subscribe();
///
/// bus.emit(SchedulerEvent::StateChanged {
///     old_state: PlaybackState::Idle,
///     new_state: PlaybackState::Playing,
/// });
///
/// assert!(matches!(rx.try_recv(), Ok(SchedulerEvent::StateChanged { .. })));
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SchedulerEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<SchedulerEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns the number of subscribers that received it. Having no
    /// subscribers is not an error for the scheduler.
    pub fn emit(&self, event: SchedulerEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("capacity", &self.capacity)
            .field("subscribers", &self.tx.receiver_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscribers_is_not_an_error() {
        let bus = EventBus::new(4);
        assert_eq!(bus.emit(SchedulerEvent::Stopped), 0);
    }

    #[test]
    fn test_emit_reaches_every_subscriber() {
        let bus = EventBus::new(4);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        assert_eq!(bus.emit(SchedulerEvent::StreamEnded { total_ticks: 42 }), 2);
        assert_eq!(a.try_recv().ok(), Some(SchedulerEvent::StreamEnded { total_ticks: 42 }));
        assert_eq!(b.try_recv().ok(), Some(SchedulerEvent::StreamEnded { total_ticks: 42 }));
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = SchedulerEvent::StateChanged {
            old_state: PlaybackState::Idle,
            new_state: PlaybackState::Seeking,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"StateChanged\""));
        assert!(json.contains("\"new_state\":\"seeking\""));

        let back: SchedulerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_playback_state_display() {
        assert_eq!(PlaybackState::Idle.to_string(), "idle");
        assert_eq!(PlaybackState::Playing.to_string(), "playing");
        assert_eq!(PlaybackState::Seeking.to_string(), "seeking");
    }
}
