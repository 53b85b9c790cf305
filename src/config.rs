use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::cli::{DEFAULT_HEIGHT, DEFAULT_POLL_MS, DEFAULT_SONGBOOK_DIR, DEFAULT_WIDTH};

pub const LOCAL_CONFIG: &str = "chordscope.toml";

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub songbook: SongbookConfig,
}

#[derive(Debug, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default)]
    pub font: Option<PathBuf>,
    #[serde(default)]
    pub font_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlaybackConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct SongbookConfig {
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            font: None,
            font_url: None,
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for SongbookConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
        }
    }
}

fn default_width() -> u32 { DEFAULT_WIDTH }
fn default_height() -> u32 { DEFAULT_HEIGHT }
fn default_poll_interval_ms() -> u64 { DEFAULT_POLL_MS }
fn default_directory() -> PathBuf { PathBuf::from(DEFAULT_SONGBOOK_DIR) }

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Invalid config {}", path.display()))
}

/// Explicit path, else `./chordscope.toml`, else the user config locations.
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from(LOCAL_CONFIG);
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("chordscope").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("chordscope").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.display.width, 1000);
        assert_eq!(cfg.display.height, 600);
        assert_eq!(cfg.playback.poll_interval_ms, 100);
        assert_eq!(cfg.songbook.directory, PathBuf::from("songbook"));
        assert!(cfg.display.font.is_none());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg: Config = toml::from_str("[display]\nheight = 480\n").unwrap();
        assert_eq!(cfg.display.width, 1000);
        assert_eq!(cfg.display.height, 480);
    }

    #[test]
    fn load_reports_bad_files() {
        let dir = std::env::temp_dir().join(format!("chordscope-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let bad = dir.join("bad.toml");
        std::fs::write(&bad, "[display]\nwidth = \"wide\"\n").unwrap();

        assert!(load_config(&bad).is_err());
        assert!(load_config(&dir.join("missing.toml")).is_err());

        let good = dir.join("good.toml");
        std::fs::write(&good, "[songbook]\ndirectory = \"out\"\n").unwrap();
        assert_eq!(load_config(&good).unwrap().songbook.directory, PathBuf::from("out"));
    }

    #[test]
    fn explicit_path_wins() {
        let path = Path::new("/tmp/custom.toml");
        assert_eq!(find_config(Some(path)), Some(path.to_path_buf()));
    }
}
