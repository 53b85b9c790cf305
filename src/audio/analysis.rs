use indicatif::ProgressBar;
use std::collections::HashMap;
use std::time::Duration;

use super::chords::{self, Chord};
use super::decode::AudioData;
use super::features::{frame_count, Chroma, FeatureExtractor, HOP_SIZE};
use crate::error::AnalysisError;

/// Everything the visualizer shows for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frame {
    pub index: usize,
    pub chroma: Chroma,
    pub chord: Chord,
    pub frequency_hz: f32,
    /// Playback time of the frame in seconds.
    pub time: f32,
}

/// Per-frame analysis of a whole track. The three sequences are parallel
/// and always have the same length.
#[derive(Clone, Debug)]
pub struct Analysis {
    chroma: Vec<Chroma>,
    chords: Vec<Chord>,
    frequencies: Vec<f32>,
    sample_rate: u32,
    hop_size: usize,
}

impl Analysis {
    pub fn new(
        chroma: Vec<Chroma>,
        chords: Vec<Chord>,
        frequencies: Vec<f32>,
        sample_rate: u32,
        hop_size: usize,
    ) -> Result<Self, AnalysisError> {
        if chroma.len() != chords.len() || chroma.len() != frequencies.len() {
            return Err(AnalysisError::FrameCountMismatch {
                chroma: chroma.len(),
                chords: chords.len(),
                frequencies: frequencies.len(),
            });
        }
        Ok(Self {
            chroma,
            chords,
            frequencies,
            sample_rate,
            hop_size,
        })
    }

    pub fn chords(&self) -> &[Chord] {
        &self.chords
    }

    pub fn frame_count(&self) -> usize {
        self.chroma.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chroma.is_empty()
    }

    pub fn hop_duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.hop_size as f64 / self.sample_rate as f64)
    }

    pub fn duration(&self) -> f32 {
        self.frame_time(self.frame_count())
    }

    pub fn frame_time(&self, index: usize) -> f32 {
        (index * self.hop_size) as f32 / self.sample_rate as f32
    }

    /// Frame on screen after `elapsed` of playback:
    /// `floor(elapsed * sample_rate / hop_size)`, clamped to the last frame.
    /// Computed in integer nanoseconds so long tracks do not drift.
    pub fn frame_at(&self, elapsed: Duration) -> Option<usize> {
        if self.is_empty() {
            return None;
        }
        let frames = elapsed.as_nanos() * self.sample_rate as u128
            / (self.hop_size as u128 * 1_000_000_000);
        let last = self.frame_count() - 1;
        Some(usize::try_from(frames).map_or(last, |f| f.min(last)))
    }

    pub fn frame(&self, index: usize) -> Option<Frame> {
        Some(Frame {
            index,
            chroma: *self.chroma.get(index)?,
            chord: self.chords[index],
            frequency_hz: self.frequencies[index],
            time: self.frame_time(index),
        })
    }

    /// Largest chroma value over the whole track, used as the bar scale.
    pub fn peak_chroma(&self) -> f32 {
        self.chroma
            .iter()
            .flat_map(|frame| frame.iter().copied())
            .fold(0.0f32, f32::max)
    }

    /// Number of frames whose label differs from the previous frame.
    pub fn chord_changes(&self) -> usize {
        self.chords.windows(2).filter(|w| w[0] != w[1]).count()
    }

    /// Most frequent label; ties go to the earlier template.
    pub fn most_common_chord(&self) -> Option<(Chord, usize)> {
        let mut counts: HashMap<Chord, usize> = HashMap::new();
        for &chord in &self.chords {
            *counts.entry(chord).or_default() += 1;
        }
        counts
            .into_iter()
            .max_by(|(a, ca), (b, cb)| ca.cmp(cb).then(b.cmp(a)))
    }
}

/// Run feature extraction and chord matching over the whole track.
/// `progress` advances twice per frame (chroma, then spectrum).
pub fn analyze_with_progress(
    audio: &AudioData,
    progress: ProgressBar,
) -> Result<Analysis, AnalysisError> {
    let samples = &audio.samples;
    let total_frames = frame_count(samples.len());
    let extractor = FeatureExtractor::new(audio.sample_rate).with_progress(progress);

    log::info!("Pass 1: Chroma ({} frames)...", total_frames);
    let chroma = extractor.chroma(samples);

    log::info!("Pass 2: Dominant frequencies...");
    let frequencies = extractor.dominant_frequencies(samples);

    log::info!("Pass 3: Template matching...");
    let chords = chords::recognize(&chroma);

    Analysis::new(chroma, chords, frequencies, audio.sample_rate, HOP_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::decode::ANALYSIS_SAMPLE_RATE;
    use proptest::prelude::*;

    fn analyze(audio: &AudioData) -> Result<Analysis, AnalysisError> {
        analyze_with_progress(audio, ProgressBar::hidden())
    }

    fn audio(samples: Vec<f32>) -> AudioData {
        AudioData {
            samples,
            sample_rate: ANALYSIS_SAMPLE_RATE,
        }
    }

    fn chord_progression() -> Vec<f32> {
        // One second each of C major then A minor
        let sr = ANALYSIS_SAMPLE_RATE as f32;
        let mut samples = Vec::new();
        for notes in [[261.63f32, 329.63, 392.0], [220.0, 261.63, 329.63]] {
            for i in 0..ANALYSIS_SAMPLE_RATE as usize {
                let t = i as f32 / sr;
                let s: f32 = notes
                    .iter()
                    .map(|f| (2.0 * std::f32::consts::PI * f * t).sin())
                    .sum();
                samples.push(s * 0.25);
            }
        }
        samples
    }

    fn fake(frames: usize) -> Analysis {
        let chords = (0..frames).map(|i| Chord::from_index(i % 3).unwrap()).collect();
        Analysis::new(
            vec![[0.5; 12]; frames],
            chords,
            vec![440.0; frames],
            ANALYSIS_SAMPLE_RATE,
            HOP_SIZE,
        )
        .unwrap()
    }

    #[test]
    fn empty_track_is_empty_analysis() {
        let analysis = analyze(&audio(Vec::new())).unwrap();
        assert!(analysis.is_empty());
        assert!(analysis.chords().is_empty());
        assert!(analysis.frequencies.is_empty());
        assert_eq!(analysis.frame_at(Duration::from_secs(1)), None);
        assert_eq!(analysis.most_common_chord(), None);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let err = Analysis::new(
            vec![[0.0; 12]; 3],
            vec![Chord::from_index(0).unwrap(); 2],
            vec![0.0; 3],
            ANALYSIS_SAMPLE_RATE,
            HOP_SIZE,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::FrameCountMismatch {
                chroma: 3,
                chords: 2,
                frequencies: 3
            }
        ));
    }

    #[test]
    fn analysis_is_deterministic() {
        let input = audio(chord_progression());
        let a = analyze(&input).unwrap();
        let b = analyze(&input).unwrap();
        assert_eq!(a.chords(), b.chords());
        let bits = |v: &[f32]| v.iter().map(|f| f.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&a.frequencies), bits(&b.frequencies));
    }

    #[test]
    fn detects_chords_of_a_progression() {
        let analysis = analyze(&audio(chord_progression())).unwrap();
        let n = analysis.frame_count();
        assert_eq!(analysis.chords()[n / 4].name(), "C");
        assert_eq!(analysis.chords()[3 * n / 4].name(), "Am");
        assert!(analysis.chord_changes() >= 1);
    }

    #[test]
    fn frame_at_floors_elapsed_time() {
        let analysis = fake(100);
        let hop = analysis.hop_duration();
        assert_eq!(analysis.frame_at(Duration::ZERO), Some(0));
        assert_eq!(analysis.frame_at(hop - Duration::from_micros(1)), Some(0));
        assert_eq!(analysis.frame_at(hop * 10 + Duration::from_micros(1)), Some(10));
        assert_eq!(analysis.frame_at(Duration::from_secs(3600)), Some(99));
    }

    #[test]
    fn frame_at_does_not_drift_over_long_tracks() {
        let analysis = fake(200_000);
        // 10 minutes in: exactly 600 * 22050 / 512 = 25839.84 frames
        assert_eq!(analysis.frame_at(Duration::from_secs(600)), Some(25_839));
    }

    #[test]
    fn frame_carries_all_three_sequences() {
        let analysis = fake(4);
        let frame = analysis.frame(2).unwrap();
        assert_eq!(frame.index, 2);
        assert_eq!(frame.chord.name(), "D");
        assert_eq!(frame.frequency_hz, 440.0);
        approx::assert_relative_eq!(frame.time, 1024.0 / 22_050.0);
        assert!(analysis.frame(4).is_none());
    }

    #[test]
    fn summary_statistics() {
        let analysis = fake(7); // C C# D C C# D C
        assert_eq!(analysis.chord_changes(), 6);
        assert_eq!(analysis.most_common_chord().map(|(c, n)| (c.name(), n)), Some(("C", 3)));
        assert_eq!(analysis.peak_chroma(), 0.5);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn sequences_stay_aligned(len in 0usize..6000, freq in 50.0f32..4000.0) {
            let samples: Vec<f32> = (0..len)
                .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / 22_050.0).sin())
                .collect();
            let analysis = analyze(&audio(samples)).unwrap();
            prop_assert_eq!(analysis.chroma.len(), len / HOP_SIZE);
            prop_assert_eq!(analysis.chords().len(), analysis.chroma.len());
            prop_assert_eq!(analysis.frequencies.len(), analysis.chroma.len());
        }
    }
}
