//! Playback and visualization synchronization.
//!
//! The loop only talks to its collaborators through the traits below, so the
//! device-backed implementations (rodio, wgpu + ffplay) and the test doubles
//! are interchangeable.

pub mod player;
pub mod state;

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::audio::analysis::Frame;
use crate::audio::chords::Chord;
use crate::error::SongbookError;
use crate::songbook::SongbookWriter;

pub trait AudioOutput {
    fn load(&mut self, path: &Path) -> Result<()>;
    fn play(&mut self);
    fn stop(&mut self);
    fn is_track_finished(&self) -> bool;
    fn quit_requested(&mut self) -> bool;
    /// Playback position of the loaded track.
    fn elapsed(&self) -> Duration;
}

pub trait Renderer {
    fn draw_frame(&mut self, frame: &Frame) -> Result<()>;
    fn close_requested(&mut self) -> bool;
    fn release(&mut self);
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn draw_frame(&mut self, frame: &Frame) -> Result<()> {
        (**self).draw_frame(frame)
    }

    fn close_requested(&mut self) -> bool {
        (**self).close_requested()
    }

    fn release(&mut self) {
        (**self).release()
    }
}

/// Stand-in when no display could be opened: playback runs without a
/// visualization and never reports a close.
pub struct NoDisplay;

impl Renderer for NoDisplay {
    fn draw_frame(&mut self, _frame: &Frame) -> Result<()> {
        Ok(())
    }

    fn close_requested(&mut self) -> bool {
        false
    }

    fn release(&mut self) {}
}

pub trait Songbook {
    fn save(&mut self, chords: &[Chord], track_name: &str) -> Result<PathBuf, SongbookError>;
}

impl Songbook for SongbookWriter {
    fn save(&mut self, chords: &[Chord], track_name: &str) -> Result<PathBuf, SongbookError> {
        self.write(chords, track_name)
    }
}
