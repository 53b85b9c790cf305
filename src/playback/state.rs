use std::fmt;

/// Why playback ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The audio output ran out of samples.
    EndOfTrack,
    /// The visualization window was closed.
    UserClose,
    /// Quit was requested; nothing is persisted.
    UserQuit,
}

impl StopReason {
    /// Completion paths save the songbook, the abort path does not.
    pub fn persists_songbook(self) -> bool {
        matches!(self, StopReason::EndOfTrack | StopReason::UserClose)
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StopReason::EndOfTrack => "end of track",
            StopReason::UserClose => "window closed",
            StopReason::UserQuit => "quit requested",
        })
    }
}

/// Mutable state owned by the playback loop. `stopped` moves from `None`
/// to `Some` exactly once.
#[derive(Debug)]
pub struct PlaybackState {
    current_frame: usize,
    stopped: Option<StopReason>,
    track_name: String,
}

impl PlaybackState {
    pub fn new(track_name: impl Into<String>) -> Self {
        Self {
            current_frame: 0,
            stopped: None,
            track_name: track_name.into(),
        }
    }

    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    pub fn track_name(&self) -> &str {
        &self.track_name
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.is_some()
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stopped
    }

    /// Move the frame pointer. Ignored once stopped.
    pub fn advance_to(&mut self, frame: usize) {
        if !self.is_stopped() {
            self.current_frame = frame;
        }
    }

    /// Check-and-set. Returns `true` only for the call that performed the
    /// transition; later calls leave the first reason in place.
    pub fn stop(&mut self, reason: StopReason) -> bool {
        if self.stopped.is_some() {
            return false;
        }
        self.stopped = Some(reason);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_stop_wins() {
        let mut state = PlaybackState::new("Song");
        assert!(!state.is_stopped());
        assert!(state.stop(StopReason::EndOfTrack));
        assert!(!state.stop(StopReason::UserClose));
        assert!(!state.stop(StopReason::UserQuit));
        assert_eq!(state.stop_reason(), Some(StopReason::EndOfTrack));
    }

    #[test]
    fn frame_pointer_freezes_after_stop() {
        let mut state = PlaybackState::new("Song");
        assert_eq!(state.current_frame(), 0);
        state.advance_to(12);
        assert_eq!(state.current_frame(), 12);
        state.stop(StopReason::UserQuit);
        state.advance_to(40);
        assert_eq!(state.current_frame(), 12);
    }

    #[test]
    fn only_completion_paths_persist() {
        assert!(StopReason::EndOfTrack.persists_songbook());
        assert!(StopReason::UserClose.persists_songbook());
        assert!(!StopReason::UserQuit.persists_songbook());
        assert_eq!(StopReason::UserClose.to_string(), "window closed");
    }
}
