use anyhow::{Context, Result};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::Duration;

use crate::playback::AudioOutput;

pub fn is_quit_command(line: &str) -> bool {
    matches!(line.trim().to_ascii_lowercase().as_str(), "q" | "quit")
}

/// Watch `input` line by line on a helper thread; one message is sent per
/// quit command. The thread exits at end of input.
pub fn spawn_quit_listener<R>(input: R) -> Receiver<()>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let spawned = std::thread::Builder::new()
        .name("quit-listener".into())
        .spawn(move || {
            for line in input.lines() {
                let Ok(line) = line else { break };
                if is_quit_command(&line) && tx.send(()).is_err() {
                    break;
                }
            }
        });
    if let Err(err) = spawned {
        log::warn!("Quit key disabled: {}", err);
    }
    rx
}

/// System audio output via rodio. The quit signal is "q" + Enter on stdin.
pub struct RodioOutput {
    _stream: OutputStream,
    handle: OutputStreamHandle,
    sink: Sink,
    quit_rx: Receiver<()>,
    loaded: bool,
}

impl RodioOutput {
    pub fn new() -> Result<Self> {
        let (stream, handle) =
            OutputStream::try_default().context("Failed to open default audio output")?;
        let sink = Sink::try_new(&handle).context("Failed to create audio sink")?;
        sink.pause();

        let quit_rx = spawn_quit_listener(BufReader::new(std::io::stdin()));
        log::info!("Type 'q' + Enter to quit without saving");

        Ok(Self {
            _stream: stream,
            handle,
            sink,
            quit_rx,
            loaded: false,
        })
    }
}

impl AudioOutput for RodioOutput {
    fn load(&mut self, path: &Path) -> Result<()> {
        let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        let source = Decoder::new(BufReader::new(file))
            .with_context(|| format!("Failed to decode {} for playback", path.display()))?;

        if self.loaded {
            self.sink.stop();
            self.sink = Sink::try_new(&self.handle).context("Failed to create audio sink")?;
            self.sink.pause();
        }
        self.sink.append(source);
        self.loaded = true;
        Ok(())
    }

    fn play(&mut self) {
        self.sink.play();
    }

    fn stop(&mut self) {
        self.sink.stop();
    }

    fn is_track_finished(&self) -> bool {
        self.loaded && self.sink.empty()
    }

    fn quit_requested(&mut self) -> bool {
        match self.quit_rx.try_recv() {
            Ok(()) => true,
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => false,
        }
    }

    fn elapsed(&self) -> Duration {
        self.sink.get_pos()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn recognizes_quit_commands() {
        assert!(is_quit_command("q"));
        assert!(is_quit_command("  Q \n"));
        assert!(is_quit_command("quit"));
        assert!(!is_quit_command(""));
        assert!(!is_quit_command("queue"));
    }

    #[test]
    fn listener_signals_once_per_quit_line() {
        let rx = spawn_quit_listener(Cursor::new("hello\nq\n\nquit\n"));
        let received: Vec<()> = rx.iter().collect();
        assert_eq!(received.len(), 2);
    }

    #[test]
    fn listener_ends_quietly_at_eof() {
        let rx = spawn_quit_listener(Cursor::new(""));
        assert!(rx.recv_timeout(Duration::from_secs(1)).is_err());
    }
}
