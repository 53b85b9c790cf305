mod audio;
mod cli;
mod config;
mod error;
mod playback;
mod render;
mod songbook;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use audio::analysis::{self, Analysis};
use audio::features::frame_count;
use audio::output::RodioOutput;
use cli::Cli;
use playback::player::{play_or_save, Session};
use render::display::{ChromaDisplay, DisplayOptions};
use render::text::load_font;
use songbook::SongbookWriter;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();

    if let Some(path) = config::find_config(cli.config.as_deref()) {
        match config::load_config(&path) {
            Ok(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cli.apply_config(cfg);
            }
            Err(err) => log::warn!("Failed to load config: {:#}", err),
        }
    }

    log::info!("chordscope - chord recognition and chroma display");
    log::info!("Input: {}", cli.input.display());

    // 1. Decode audio
    log::info!("Decoding audio...");
    let audio_data = audio::decode::load(&cli.input)?;
    log::info!(
        "Decoded {:.1}s at {} Hz",
        audio_data.duration(),
        audio_data.sample_rate
    );

    // 2. Analyze audio (3-pass pipeline)
    log::info!("Analyzing audio...");
    let frames = frame_count(audio_data.samples.len());
    let pb = ProgressBar::new(2 * frames as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} steps ({eta} remaining)")
            .context("Invalid progress template")?
            .progress_chars("=>-"),
    );
    let analysis = analysis::analyze_with_progress(&audio_data, pb.clone())?;
    pb.finish_with_message("Analysis complete");
    drop(audio_data);
    log_summary(&analysis);

    let track_name = songbook::track_name(&cli.input);
    let writer = SongbookWriter::new(&cli.songbook_dir);

    if cli.no_playback {
        writer.write(analysis.chords(), &track_name)?;
        return Ok(());
    }

    // 3. Play with synchronized display
    let title = format!("chordscope - {}", track_name);
    let session = play_or_save(
        &analysis,
        RodioOutput::new(),
        || {
            ChromaDisplay::new(
                &analysis,
                DisplayOptions {
                    width: cli.width,
                    height: cli.height,
                    title,
                    font: load_font(cli.font.as_deref(), cli.font_url.as_deref()),
                },
            )
        },
        writer,
        &track_name,
        &cli.input,
        Duration::from_millis(cli.poll_ms.max(1)),
    )?;

    let outcome = match session {
        Session::Played(outcome) => outcome,
        Session::Unplayed { songbook } => {
            log::info!("Done! Songbook: {}", songbook.display());
            return Ok(());
        }
    };

    log::info!(
        "Stopped: {} after frame {} ({} frames drawn)",
        outcome.reason,
        outcome.last_frame,
        outcome.frames_drawn
    );
    if outcome.render_failures > 0 {
        log::warn!("{} frames failed to render", outcome.render_failures);
    }
    match outcome.songbook {
        Some(path) => log::info!("Done! Songbook: {}", path.display()),
        None => log::info!("Done! Songbook not saved"),
    }
    Ok(())
}

fn log_summary(analysis: &Analysis) {
    log::info!(
        "Total frames: {}, Duration: {:.1}s",
        analysis.frame_count(),
        analysis.duration()
    );
    if let Some((chord, count)) = analysis.most_common_chord() {
        log::info!(
            "Chord changes: {}, most common: {} ({} frames)",
            analysis.chord_changes(),
            chord,
            count
        );
    }
}
