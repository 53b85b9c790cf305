use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::state::{PlaybackState, StopReason};
use super::{AudioOutput, NoDisplay, Renderer, Songbook};
use crate::audio::analysis::Analysis;
use crate::error::SongbookError;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub struct PlaybackOutcome {
    pub reason: StopReason,
    /// Where the songbook was written, if this exit path persists it.
    pub songbook: Option<PathBuf>,
    pub frames_drawn: usize,
    pub render_failures: usize,
    pub last_frame: usize,
}

/// How a session ended.
#[derive(Debug)]
pub enum Session {
    Played(PlaybackOutcome),
    /// No audio output was available; the songbook was written without
    /// playback.
    Unplayed { songbook: PathBuf },
}

/// Play with whatever collaborators could be set up. Without a display the
/// track still plays and the songbook is saved on the usual exit paths;
/// without audio output nothing plays and the songbook is written directly.
/// The display is only opened once audio output is known to work.
pub fn play_or_save<A, R, S, F>(
    analysis: &Analysis,
    audio: Result<A>,
    open_display: F,
    mut songbook: S,
    track_name: &str,
    track: &Path,
    poll_interval: Duration,
) -> Result<Session>
where
    A: AudioOutput,
    R: Renderer + 'static,
    S: Songbook,
    F: FnOnce() -> Result<R>,
{
    let audio = match audio {
        Ok(audio) => audio,
        Err(err) => {
            log::warn!("Audio output unavailable, skipping playback: {:#}", err);
            let path = songbook.save(analysis.chords(), track_name)?;
            return Ok(Session::Unplayed { songbook: path });
        }
    };

    let renderer: Box<dyn Renderer> = match open_display() {
        Ok(display) => Box::new(display),
        Err(err) => {
            log::warn!("Display unavailable, playing without visualization: {:#}", err);
            Box::new(NoDisplay)
        }
    };

    Player::new(analysis, audio, renderer, songbook, track_name)
        .with_poll_interval(poll_interval)
        .run(track)
        .map(Session::Played)
}

/// Single-threaded playback loop.
///
/// Each pass polls the three termination signals, then redraws if a redraw
/// is due, then sleeps until the next redraw or poll, whichever is sooner.
/// The frame shown is always derived from the audio output's elapsed time.
pub struct Player<'a, A, R, S> {
    analysis: &'a Analysis,
    audio: A,
    renderer: R,
    songbook: S,
    state: PlaybackState,
    poll_interval: Duration,
    redraw_interval: Duration,
    last_drawn: Option<usize>,
    frames_drawn: usize,
    render_failures: usize,
    saved: Option<Result<PathBuf, SongbookError>>,
}

impl<'a, A, R, S> Player<'a, A, R, S>
where
    A: AudioOutput,
    R: Renderer,
    S: Songbook,
{
    pub fn new(
        analysis: &'a Analysis,
        audio: A,
        renderer: R,
        songbook: S,
        track_name: impl Into<String>,
    ) -> Self {
        Self {
            analysis,
            audio,
            renderer,
            songbook,
            state: PlaybackState::new(track_name),
            poll_interval: DEFAULT_POLL_INTERVAL,
            redraw_interval: analysis.hop_duration(),
            last_drawn: None,
            frames_drawn: 0,
            render_failures: 0,
            saved: None,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Override the redraw cadence (one hop by default).
    #[cfg(test)]
    pub fn with_redraw_interval(mut self, interval: Duration) -> Self {
        self.redraw_interval = interval;
        self
    }

    pub fn run(mut self, track: &Path) -> Result<PlaybackOutcome> {
        if let Err(err) = self.audio.load(track) {
            self.renderer.release();
            return Err(err.context(format!("Failed to load {} for playback", track.display())));
        }
        self.audio.play();
        log::info!(
            "Playing '{}' ({} frames, {:.1}s)",
            self.state.track_name(),
            self.analysis.frame_count(),
            self.analysis.duration()
        );

        let mut next_redraw = Instant::now();
        let reason = loop {
            if let Some(reason) = self.poll_events() {
                break reason;
            }

            let now = Instant::now();
            if now >= next_redraw {
                self.redraw();
                next_redraw = now + self.redraw_interval;
            }

            let wait = next_redraw
                .saturating_duration_since(Instant::now())
                .min(self.poll_interval);
            if !wait.is_zero() {
                std::thread::sleep(wait);
            }
        };

        let songbook = match self.saved.take() {
            Some(Ok(path)) => Some(path),
            Some(Err(err)) => {
                return Err(anyhow::Error::new(err).context("Playback finished but the songbook was not saved"));
            }
            None => None,
        };

        Ok(PlaybackOutcome {
            reason,
            songbook,
            frames_drawn: self.frames_drawn,
            render_failures: self.render_failures,
            last_frame: self.state.current_frame(),
        })
    }

    /// Observe every termination signal for this pass. Each observed signal
    /// goes through `handle_stop`; only the first one has any effect.
    fn poll_events(&mut self) -> Option<StopReason> {
        let signals = [
            (StopReason::EndOfTrack, self.audio.is_track_finished()),
            (StopReason::UserClose, self.renderer.close_requested()),
            (StopReason::UserQuit, self.audio.quit_requested()),
        ];
        for (reason, fired) in signals {
            if fired {
                self.handle_stop(reason);
            }
        }
        self.state.stop_reason()
    }

    fn handle_stop(&mut self, reason: StopReason) {
        if !self.state.stop(reason) {
            log::debug!("Ignoring '{}': playback already stopped", reason);
            return;
        }
        log::info!(
            "Playback stopped ({}) at frame {}",
            reason,
            self.state.current_frame()
        );

        // Redraws stop here: `redraw` returns early once the state is stopped.
        if reason != StopReason::EndOfTrack {
            self.audio.stop();
        }
        if reason.persists_songbook() {
            self.saved = Some(
                self.songbook
                    .save(self.analysis.chords(), self.state.track_name()),
            );
        }
        self.renderer.release();
    }

    fn redraw(&mut self) {
        if self.state.is_stopped() {
            return;
        }
        let Some(index) = self.analysis.frame_at(self.audio.elapsed()) else {
            return;
        };
        if self.last_drawn == Some(index) {
            return;
        }
        let Some(frame) = self.analysis.frame(index) else {
            return;
        };

        self.state.advance_to(index);
        self.last_drawn = Some(index);
        log::trace!("Frame {} ({:.2}s): {}", index, frame.time, frame.chord);

        match self.renderer.draw_frame(&frame) {
            Ok(()) => self.frames_drawn += 1,
            Err(err) => {
                self.render_failures += 1;
                if self.render_failures == 1 {
                    log::warn!("Failed to render frame {}: {:#}", index, err);
                } else {
                    log::debug!("Failed to render frame {}: {:#}", index, err);
                }
            }
        }
    }
}
