use anyhow::{Context, Result};
use std::io::{ErrorKind, Write};
use std::process::{Child, Command, Stdio};

pub fn ffplay_args(width: u32, height: u32, fps: f32, title: &str) -> Vec<String> {
    vec![
        "-loglevel".into(), "error".into(),
        "-fflags".into(), "nobuffer".into(),
        "-an".into(),
        "-autoexit".into(),
        "-window_title".into(), title.to_string(),
        "-f".into(), "rawvideo".into(),
        "-pixel_format".into(), "rgba".into(),
        "-video_size".into(), format!("{}x{}", width, height),
        "-framerate".into(), format!("{:.3}", fps),
        "-i".into(), "pipe:0".into(),
    ]
}

/// A display window backed by an `ffplay` child reading raw RGBA frames on
/// stdin. Closing the window ends the child, which is how a user close is
/// detected.
pub struct FfplayWindow {
    child: Option<Child>,
    closed: bool,
}

impl FfplayWindow {
    pub fn open(width: u32, height: u32, fps: f32, title: &str) -> Result<Self> {
        let child = Command::new("ffplay")
            .args(ffplay_args(width, height, fps, title))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .context("Failed to spawn ffplay. Is ffmpeg installed?")?;

        log::info!("Display window opened: {}x{} @ {:.1}fps", width, height, fps);
        Ok(Self {
            child: Some(child),
            closed: false,
        })
    }

    /// A broken pipe marks the window closed instead of failing.
    pub fn write_frame(&mut self, rgba_pixels: &[u8]) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        let stdin = self
            .child
            .as_mut()
            .and_then(|c| c.stdin.as_mut())
            .context("ffplay stdin not available")?;
        match stdin.write_all(rgba_pixels) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::BrokenPipe => {
                log::debug!("ffplay pipe closed");
                self.closed = true;
                Ok(())
            }
            Err(err) => Err(err).context("Failed to write frame to ffplay"),
        }
    }

    pub fn is_closed(&mut self) -> bool {
        if self.closed {
            return true;
        }
        let Some(child) = self.child.as_mut() else {
            return true;
        };
        match child.try_wait() {
            Ok(Some(status)) => {
                log::debug!("ffplay exited: {}", status);
                self.closed = true;
            }
            Ok(None) => {}
            Err(err) => {
                log::warn!("Failed to poll ffplay: {}", err);
                self.closed = true;
            }
        }
        self.closed
    }

    /// Close stdin and reap the child. Safe to call more than once.
    pub fn close(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        drop(child.stdin.take());
        if let Ok(None) = child.try_wait() {
            let _ = child.kill();
        }
        let _ = child.wait();
        self.closed = true;
        log::debug!("Display window closed");
    }
}

impl Drop for FfplayWindow {
    fn drop(&mut self) {
        self.close();
    }
}
