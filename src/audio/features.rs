use indicatif::ProgressBar;
use rayon::prelude::*;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Samples between the centers of consecutive analysis frames.
pub const HOP_SIZE: usize = 512;
/// Window length of the STFT used for the dominant frequency.
pub const STFT_SIZE: usize = 2048;
pub const N_CHROMA: usize = 12;
pub const N_OCTAVES: usize = 7;

/// Long window so the lowest octave still resolves individual semitones.
const CQT_FFT_SIZE: usize = 16384;
/// C1, the lowest constant-Q bin.
const CQT_FMIN: f32 = 32.703_197;
/// Gaussian width of a constant-Q bin, in semitones.
const CQT_BIN_SIGMA: f32 = 0.35;
/// Frames whose strongest pitch class is below this are reported as silence.
const SILENCE_THRESHOLD: f32 = 1e-6;

/// Pitch-class energies for one frame, ordered C, C#, D, ... B.
pub type Chroma = [f32; N_CHROMA];

pub const PITCH_CLASSES: [&str; N_CHROMA] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Number of analysis frames for a waveform. Shared by every per-frame
/// computation so their outputs always line up.
pub fn frame_count(num_samples: usize) -> usize {
    num_samples / HOP_SIZE
}

/// Per-frame chroma and dominant frequency extraction.
///
/// Frames are centered on sample `k * HOP_SIZE` and zero-padded at the
/// edges of the signal. Frames are independent of each other, so they are
/// computed in parallel and collected in frame order.
pub struct FeatureExtractor {
    sample_rate: u32,
    stft: Arc<dyn Fft<f32>>,
    stft_window: Vec<f32>,
    cqt_fft: Arc<dyn Fft<f32>>,
    cqt_window: Vec<f32>,
    /// Sparse (fft_bin, weight) lists, one per constant-Q bin.
    cqt_kernel: Vec<Vec<(usize, f32)>>,
    progress: ProgressBar,
}

impl FeatureExtractor {
    pub fn new(sample_rate: u32) -> Self {
        let mut planner = FftPlanner::<f32>::new();
        Self {
            sample_rate,
            stft: planner.plan_fft_forward(STFT_SIZE),
            stft_window: hann_window(STFT_SIZE),
            cqt_fft: planner.plan_fft_forward(CQT_FFT_SIZE),
            cqt_window: hann_window(CQT_FFT_SIZE),
            cqt_kernel: constant_q_kernel(sample_rate, CQT_FFT_SIZE),
            progress: ProgressBar::hidden(),
        }
    }

    /// Report each finished frame on `progress`.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Chroma matrix: one max-normalized 12-bin vector per frame.
    pub fn chroma(&self, samples: &[f32]) -> Vec<Chroma> {
        (0..frame_count(samples.len()))
            .into_par_iter()
            .map(|frame_idx| {
                let chroma = self.chroma_frame(samples, frame_idx);
                self.progress.inc(1);
                chroma
            })
            .collect()
    }

    /// Center frequency of the strongest STFT bin in each frame.
    pub fn dominant_frequencies(&self, samples: &[f32]) -> Vec<f32> {
        let bin_hz = self.sample_rate as f32 / STFT_SIZE as f32;
        (0..frame_count(samples.len()))
            .into_par_iter()
            .map(|frame_idx| {
                let mut buffer = windowed_frame(samples, frame_idx, &self.stft_window);
                self.stft.process(&mut buffer);
                let bin = argmax_magnitude(&buffer[..=STFT_SIZE / 2]);
                self.progress.inc(1);
                bin as f32 * bin_hz
            })
            .collect()
    }

    fn chroma_frame(&self, samples: &[f32], frame_idx: usize) -> Chroma {
        let mut buffer = windowed_frame(samples, frame_idx, &self.cqt_window);
        self.cqt_fft.process(&mut buffer);

        let magnitudes: Vec<f32> = buffer[..=CQT_FFT_SIZE / 2].iter().map(|c| c.norm()).collect();

        // Constant-Q energies, folded into pitch classes across octaves
        let mut chroma = [0.0f32; N_CHROMA];
        for (k, bin) in self.cqt_kernel.iter().enumerate() {
            let energy: f32 = bin.iter().map(|&(j, w)| w * magnitudes[j]).sum();
            chroma[k % N_CHROMA] += energy;
        }

        let peak = chroma.iter().copied().fold(0.0f32, f32::max);
        if peak < SILENCE_THRESHOLD {
            return [0.0; N_CHROMA];
        }
        for value in chroma.iter_mut() {
            *value /= peak;
        }
        chroma
    }
}

/// Hann-windowed, zero-padded frame centered on `frame_idx * HOP_SIZE`.
fn windowed_frame(samples: &[f32], frame_idx: usize, window: &[f32]) -> Vec<Complex<f32>> {
    let size = window.len();
    let center = (frame_idx * HOP_SIZE) as isize;
    let start = center - (size / 2) as isize;

    (0..size)
        .map(|i| {
            let idx = start + i as isize;
            let sample = if idx >= 0 && (idx as usize) < samples.len() {
                samples[idx as usize]
            } else {
                0.0
            };
            Complex::new(sample * window[i], 0.0)
        })
        .collect()
}

/// Index of the largest magnitude. Ties resolve to the lowest bin.
fn argmax_magnitude(spectrum: &[Complex<f32>]) -> usize {
    let mut best = 0;
    let mut best_mag = f32::NEG_INFINITY;
    for (i, c) in spectrum.iter().enumerate() {
        let mag = c.norm();
        if mag > best_mag {
            best = i;
            best_mag = mag;
        }
    }
    best
}

/// Map each of the `N_OCTAVES * 12` constant-Q bins onto the FFT bins that
/// fall within a semitone of its center, weighted by a Gaussian in
/// log-frequency. Weights of a bin sum to 1 so every octave contributes on
/// the same scale.
fn constant_q_kernel(sample_rate: u32, fft_size: usize) -> Vec<Vec<(usize, f32)>> {
    let bin_hz = sample_rate as f32 / fft_size as f32;
    let nyquist_bin = fft_size / 2;

    (0..N_OCTAVES * N_CHROMA)
        .map(|k| {
            let center = CQT_FMIN * 2f32.powf(k as f32 / N_CHROMA as f32);
            let lo = ((center * 2f32.powf(-1.0 / 12.0)) / bin_hz).floor().max(1.0) as usize;
            let hi = (((center * 2f32.powf(1.0 / 12.0)) / bin_hz).ceil() as usize).min(nyquist_bin);

            let mut weights: Vec<(usize, f32)> = (lo..=hi)
                .filter_map(|j| {
                    let semitones = 12.0 * (j as f32 * bin_hz / center).log2();
                    if semitones.abs() > 1.0 {
                        return None;
                    }
                    let w = (-0.5 * (semitones / CQT_BIN_SIGMA).powi(2)).exp();
                    Some((j, w))
                })
                .collect();

            if weights.is_empty() {
                let nearest = ((center / bin_hz).round() as usize).clamp(1, nyquist_bin);
                weights.push((nearest, 1.0));
            }

            let total: f32 = weights.iter().map(|&(_, w)| w).sum();
            for (_, w) in weights.iter_mut() {
                *w /= total;
            }
            weights
        })
        .collect()
}

fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32).cos())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const SR: u32 = 22_050;

    fn tone(freqs: &[f32], seconds: f32) -> Vec<f32> {
        let len = (seconds * SR as f32) as usize;
        (0..len)
            .map(|i| {
                let t = i as f32 / SR as f32;
                freqs
                    .iter()
                    .map(|f| (2.0 * std::f32::consts::PI * f * t).sin())
                    .sum::<f32>()
                    * 0.3
            })
            .collect()
    }

    fn strongest(chroma: &Chroma, n: usize) -> Vec<usize> {
        let mut idx: Vec<usize> = (0..N_CHROMA).collect();
        idx.sort_by(|&a, &b| chroma[b].partial_cmp(&chroma[a]).unwrap());
        let mut top = idx[..n].to_vec();
        top.sort();
        top
    }

    #[test]
    fn frame_count_floors() {
        assert_eq!(frame_count(0), 0);
        assert_eq!(frame_count(511), 0);
        assert_eq!(frame_count(512), 1);
        assert_eq!(frame_count(1025), 2);
    }

    #[test]
    fn empty_waveform_yields_no_frames() {
        let fx = FeatureExtractor::new(SR);
        assert!(fx.chroma(&[]).is_empty());
        assert!(fx.dominant_frequencies(&[]).is_empty());
    }

    #[test]
    fn chroma_and_frequencies_share_frame_count() {
        let fx = FeatureExtractor::new(SR);
        for len in [100, 512, 5000, 22_050] {
            let samples = tone(&[440.0], len as f32 / SR as f32);
            let expected = frame_count(samples.len());
            assert_eq!(fx.chroma(&samples).len(), expected);
            assert_eq!(fx.dominant_frequencies(&samples).len(), expected);
        }
    }

    #[test]
    fn a440_dominates_spectrum_and_chroma() {
        let fx = FeatureExtractor::new(SR);
        let samples = tone(&[440.0], 1.0);

        let freqs = fx.dominant_frequencies(&samples);
        let mid = freqs.len() / 2;
        let bin_hz = SR as f32 / STFT_SIZE as f32;
        assert_abs_diff_eq!(freqs[mid], 440.0, epsilon = bin_hz);

        let chroma = fx.chroma(&samples);
        assert_eq!(strongest(&chroma[mid], 1), vec![9]); // A
    }

    #[test]
    fn c_major_triad_lights_c_e_g() {
        let fx = FeatureExtractor::new(SR);
        let samples = tone(&[261.63, 329.63, 392.0], 1.5);
        let chroma = fx.chroma(&samples);
        let mid = chroma.len() / 2;
        assert_eq!(strongest(&chroma[mid], 3), vec![0, 4, 7]);
    }

    #[test]
    fn chroma_is_max_normalized() {
        let fx = FeatureExtractor::new(SR);
        let chroma = fx.chroma(&tone(&[220.0, 330.0], 0.5));
        for frame in &chroma {
            assert!(frame.iter().all(|&v| (0.0..=1.0 + 1e-6).contains(&v)));
            let peak = frame.iter().copied().fold(0.0f32, f32::max);
            assert_abs_diff_eq!(peak, 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn silence_is_zero_chroma_at_zero_hz() {
        let fx = FeatureExtractor::new(SR);
        let samples = vec![0.0; 4096];
        assert!(fx.chroma(&samples).iter().all(|f| f.iter().all(|&v| v == 0.0)));
        assert!(fx.dominant_frequencies(&samples).iter().all(|&f| f == 0.0));
    }

    #[test]
    fn kernel_covers_seven_octaves_with_unit_weight() {
        let kernel = constant_q_kernel(SR, CQT_FFT_SIZE);
        assert_eq!(kernel.len(), N_OCTAVES * N_CHROMA);
        for bin in &kernel {
            assert!(!bin.is_empty());
            let total: f32 = bin.iter().map(|&(_, w)| w).sum();
            assert_abs_diff_eq!(total, 1.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn argmax_prefers_lowest_bin_on_ties() {
        let flat = vec![Complex::new(1.0, 0.0); 8];
        assert_eq!(argmax_magnitude(&flat), 0);
    }
}
