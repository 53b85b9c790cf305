use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::audio::chords::Chord;
use crate::error::SongbookError;

pub const SONGBOOK_FILE: &str = "songbook.txt";

/// Track name shown in the songbook header: the file name without its
/// extension.
pub fn track_name(path: &Path) -> String {
    path.file_stem()
        .or_else(|| path.file_name())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Songbook text: a header line, a blank line, then one label per frame.
pub fn render(chords: &[Chord], track_name: &str) -> String {
    let mut out = format!("Song: {}\n\n", track_name);
    for chord in chords {
        out.push_str(chord.name());
        out.push('\n');
    }
    out
}

/// Writes `<dir>/songbook.txt`, overwriting any previous songbook there.
#[derive(Clone, Debug)]
pub struct SongbookWriter {
    dir: PathBuf,
}

impl SongbookWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(SONGBOOK_FILE)
    }

    pub fn write(&self, chords: &[Chord], track_name: &str) -> Result<PathBuf, SongbookError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| SongbookError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.path();
        let write_err = |source| SongbookError::Write {
            path: path.clone(),
            source,
        };

        let file = File::create(&path).map_err(write_err)?;
        let mut out = BufWriter::new(file);
        out.write_all(render(chords, track_name).as_bytes())
            .map_err(write_err)?;
        out.flush().map_err(write_err)?;

        log::info!("Songbook saved: {} ({} chords)", path.display(), chords.len());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("chordscope-songbook-{}", std::process::id()))
            .join(name);
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    fn chords(names: &[&str]) -> Vec<Chord> {
        names
            .iter()
            .map(|name| {
                Chord::all()
                    .find(|c| c.name() == *name)
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn writes_header_then_one_chord_per_line() {
        let dir = scratch_dir("basic");
        let writer = SongbookWriter::new(&dir);
        let path = writer.write(&chords(&["C", "C", "G", "Am"]), "Test").unwrap();

        assert_eq!(path, dir.join("songbook.txt"));
        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content, "Song: Test\n\nC\nC\nG\nAm\n");
    }

    #[test]
    fn empty_sequence_writes_header_only() {
        let dir = scratch_dir("empty");
        let path = SongbookWriter::new(&dir).write(&[], "Silence").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "Song: Silence\n\n");
    }

    #[test]
    fn creates_missing_directories_and_overwrites() {
        let dir = scratch_dir("nested").join("a").join("b");
        let writer = SongbookWriter::new(&dir);
        writer.write(&chords(&["D", "D", "D"]), "First").unwrap();
        writer.write(&chords(&["Em"]), "Second").unwrap();
        assert_eq!(
            std::fs::read_to_string(writer.path()).unwrap(),
            "Song: Second\n\nEm\n"
        );
    }

    #[test]
    fn directory_blocked_by_file_is_an_error() {
        let dir = scratch_dir("blocked");
        std::fs::create_dir_all(&dir).unwrap();
        let blocker = dir.join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();

        let err = SongbookWriter::new(&blocker).write(&[], "X").unwrap_err();
        assert!(matches!(err, SongbookError::CreateDir { .. }));
    }

    #[test]
    fn track_name_strips_extension() {
        assert_eq!(track_name(Path::new("Song Title.mp3")), "Song Title");
        assert_eq!(track_name(Path::new("input/Ed Sheeran - Shivers.flac")), "Ed Sheeran - Shivers");
        assert_eq!(track_name(Path::new("no_extension")), "no_extension");
        assert_eq!(track_name(Path::new("dotted.name.wav")), "dotted.name");
    }
}
