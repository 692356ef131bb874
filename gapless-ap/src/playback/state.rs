//! Playback state machine
//!
//! ```text
//!            start                 seek
//!   Idle ─────────────► Playing ─────────► Seeking
//!    ▲                   │  ▲                │
//!    │  stop / reset /   │  └── resumed ─────┘
//!    └── stream ended ───┘
//! ```
//!
//! Seeking is also reachable from Idle: a seek on a stopped stream starts it.

pub use gapless_common::events::PlaybackState;

/// Something that moves the scheduler between playback states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackTrigger {
    /// Caller requested playback from the beginning
    Start,
    /// Seek accepted; rendering is being torn down
    Seek,
    /// Rendering re-scheduled after a seek
    Resumed,
    /// Caller stopped the stream
    Stop,
    /// Internal reset (disconnect everything, keep history)
    Reset,
    /// Every scheduled chunk finished rendering
    StreamEnded,
}

/// Next state for `trigger` applied in `state`
///
/// Returns None when the trigger does not apply in that state; the caller
/// keeps the current state.
pub fn transition(state: PlaybackState, trigger: PlaybackTrigger) -> Option<PlaybackState> {
    use PlaybackState::*;
    use PlaybackTrigger::*;

    match (state, trigger) {
        (Idle, Start) => Some(Playing),
        (Playing, Start) => None,
        (Seeking, Start) => None,

        (Idle | Playing, Seek) => Some(Seeking),
        (Seeking, Seek) => None,

        (Seeking, Resumed) => Some(Playing),
        (Idle | Playing, Resumed) => None,

        (_, Stop) | (_, Reset) => Some(Idle),

        (Playing, StreamEnded) => Some(Idle),
        (Idle | Seeking, StreamEnded) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_from_idle() {
        assert_eq!(
            transition(PlaybackState::Idle, PlaybackTrigger::Start),
            Some(PlaybackState::Playing)
        );
    }

    #[test]
    fn test_start_while_playing_is_noop() {
        assert_eq!(transition(PlaybackState::Playing, PlaybackTrigger::Start), None);
    }

    #[test]
    fn test_seek_cycle() {
        let seeking = transition(PlaybackState::Playing, PlaybackTrigger::Seek);
        assert_eq!(seeking, Some(PlaybackState::Seeking));
        assert_eq!(
            transition(PlaybackState::Seeking, PlaybackTrigger::Resumed),
            Some(PlaybackState::Playing)
        );
        assert_eq!(
            transition(PlaybackState::Idle, PlaybackTrigger::Seek),
            Some(PlaybackState::Seeking)
        );
    }

    #[test]
    fn test_stop_and_reset_always_idle() {
        for state in [
            PlaybackState::Idle,
            PlaybackState::Playing,
            PlaybackState::Seeking,
        ] {
            assert_eq!(transition(state, PlaybackTrigger::Stop), Some(PlaybackState::Idle));
            assert_eq!(transition(state, PlaybackTrigger::Reset), Some(PlaybackState::Idle));
        }
    }

    #[test]
    fn test_stream_ended_only_while_playing() {
        assert_eq!(
            transition(PlaybackState::Playing, PlaybackTrigger::StreamEnded),
            Some(PlaybackState::Idle)
        );
        assert_eq!(transition(PlaybackState::Idle, PlaybackTrigger::StreamEnded), None);
        assert_eq!(transition(PlaybackState::Seeking, PlaybackTrigger::StreamEnded), None);
    }
}
