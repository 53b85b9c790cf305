use clap::Parser;
use std::path::PathBuf;

use crate::config::Config;

pub const DEFAULT_SONGBOOK_DIR: &str = "songbook";
pub const DEFAULT_WIDTH: u32 = 1000;
pub const DEFAULT_HEIGHT: u32 = 600;
pub const DEFAULT_POLL_MS: u64 = 100;

#[derive(Parser, Debug)]
#[command(
    name = "chordscope",
    about = "Chord recognition with synchronized playback and a chroma display"
)]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG, AAC)
    pub input: PathBuf,

    /// Config file (defaults to ./chordscope.toml or the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory that receives songbook.txt
    #[arg(short = 'd', long, default_value = DEFAULT_SONGBOOK_DIR)]
    pub songbook_dir: PathBuf,

    /// Display width in pixels
    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    pub width: u32,

    /// Display height in pixels
    #[arg(long, default_value_t = DEFAULT_HEIGHT)]
    pub height: u32,

    /// How often playback events are polled, in milliseconds
    #[arg(long = "poll-ms", default_value_t = DEFAULT_POLL_MS)]
    pub poll_ms: u64,

    /// TTF/OTF font for labels and readout
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Download the font from a URL
    #[arg(long)]
    pub font_url: Option<String>,

    /// Analyze and write the songbook without playing audio
    #[arg(long)]
    pub no_playback: bool,
}

impl Cli {
    /// Config values apply only where the CLI is still at its default.
    pub fn apply_config(&mut self, cfg: Config) {
        if self.width == DEFAULT_WIDTH {
            self.width = cfg.display.width;
        }
        if self.height == DEFAULT_HEIGHT {
            self.height = cfg.display.height;
        }
        if self.font.is_none() {
            self.font = cfg.display.font;
        }
        if self.font_url.is_none() {
            self.font_url = cfg.display.font_url;
        }
        if self.poll_ms == DEFAULT_POLL_MS {
            self.poll_ms = cfg.playback.poll_interval_ms;
        }
        if self.songbook_dir.as_os_str() == DEFAULT_SONGBOOK_DIR {
            self.songbook_dir = cfg.songbook.directory;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::parse_from(["chordscope", "song.mp3"]);
        assert_eq!(cli.input, PathBuf::from("song.mp3"));
        assert_eq!(cli.songbook_dir, PathBuf::from("songbook"));
        assert_eq!((cli.width, cli.height, cli.poll_ms), (1000, 600, 100));
        assert!(!cli.no_playback);
    }

    #[test]
    fn input_is_required() {
        assert!(Cli::try_parse_from(["chordscope"]).is_err());
    }

    #[test]
    fn config_fills_only_defaults() {
        let mut cli = Cli::parse_from(["chordscope", "a.wav", "--width", "800", "-d", "out"]);
        let cfg: Config = toml::from_str(
            r#"
            [display]
            width = 1280
            height = 720
            font = "/fonts/a.ttf"

            [playback]
            poll_interval_ms = 50

            [songbook]
            directory = "books"
            "#,
        )
        .unwrap();

        cli.apply_config(cfg);

        assert_eq!(cli.width, 800);
        assert_eq!(cli.height, 720);
        assert_eq!(cli.poll_ms, 50);
        assert_eq!(cli.songbook_dir, PathBuf::from("out"));
        assert_eq!(cli.font, Some(PathBuf::from("/fonts/a.ttf")));
    }
}
