use rubato::{FftFixedIn, Resampler};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::DecodeError;

/// Rate every waveform is brought to before feature extraction.
pub const ANALYSIS_SAMPLE_RATE: u32 = 22_050;

const RESAMPLE_CHUNK: usize = 1024;

pub struct AudioData {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioData {
    pub fn duration(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Decode `path` to mono and resample it to [`ANALYSIS_SAMPLE_RATE`].
pub fn load(path: &Path) -> Result<AudioData, DecodeError> {
    let decoded = decode_audio(path)?;
    if decoded.sample_rate == ANALYSIS_SAMPLE_RATE {
        return Ok(decoded);
    }

    log::info!(
        "Resampling {}Hz -> {}Hz...",
        decoded.sample_rate,
        ANALYSIS_SAMPLE_RATE
    );
    let samples = resample(&decoded.samples, decoded.sample_rate, ANALYSIS_SAMPLE_RATE)?;
    Ok(AudioData {
        samples,
        sample_rate: ANALYSIS_SAMPLE_RATE,
    })
}

pub fn decode_audio(path: &Path) -> Result<AudioData, DecodeError> {
    let format_err = |source| DecodeError::Format {
        path: path.to_path_buf(),
        source,
    };

    let file = std::fs::File::open(path).map_err(|source| DecodeError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(format_err)?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .ok_or_else(|| DecodeError::NoTrack(path.to_path_buf()))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| DecodeError::UnknownSampleRate(path.to_path_buf()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(format_err)?;

    let mut all_samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(format_err(e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(symphonia::core::errors::Error::DecodeError(msg)) => {
                log::debug!("Skipping undecodable packet: {}", msg);
                continue;
            }
            Err(e) => return Err(format_err(e)),
        };

        // The buffer's own layout, which may differ from the track header
        let spec = *decoded.spec();
        let num_frames = decoded.frames();

        let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        downmix(sample_buf.samples(), spec.channels.count(), &mut all_samples);
    }

    log::info!(
        "Decoded audio: {} samples, {}Hz, {:.1}s",
        all_samples.len(),
        sample_rate,
        all_samples.len() as f32 / sample_rate as f32
    );

    Ok(AudioData {
        samples: all_samples,
        sample_rate,
    })
}

/// Average interleaved frames of `channels` samples into `out`.
fn downmix(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    if channels <= 1 {
        out.extend_from_slice(interleaved);
        return;
    }
    out.extend(
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32),
    );
}

/// Resample mono audio with an FFT resampler. The output is trimmed of the
/// resampler's delay so sample `i` of the input lines up with sample
/// `i * to / from` of the output.
pub fn resample(samples: &[f32], from: u32, to: u32) -> Result<Vec<f32>, DecodeError> {
    if from == to || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let fail = |reason: String| DecodeError::Resample { from, to, reason };

    let mut resampler = FftFixedIn::<f32>::new(from as usize, to as usize, RESAMPLE_CHUNK, 2, 1)
        .map_err(|e| fail(e.to_string()))?;

    let expected = (samples.len() as u64 * to as u64 / from as u64) as usize;
    let delay = resampler.output_delay();
    let mut output: Vec<f32> = Vec::with_capacity(expected + delay);

    let mut pos = 0;
    while pos + resampler.input_frames_next() <= samples.len() {
        let n = resampler.input_frames_next();
        let chunk: [&[f32]; 1] = [&samples[pos..pos + n]];
        let block = resampler
            .process(&chunk[..], None)
            .map_err(|e| fail(e.to_string()))?;
        output.extend_from_slice(&block[0]);
        pos += n;
    }

    if pos < samples.len() {
        let tail: [&[f32]; 1] = [&samples[pos..]];
        let block = resampler
            .process_partial(Some(&tail[..]), None)
            .map_err(|e| fail(e.to_string()))?;
        output.extend_from_slice(&block[0]);
    }

    // Drain the delay line
    while output.len() < expected + delay {
        let block = resampler
            .process_partial::<&[f32]>(None, None)
            .map_err(|e| fail(e.to_string()))?;
        if block[0].is_empty() {
            break;
        }
        output.extend_from_slice(&block[0]);
    }

    let mut output: Vec<f32> = output.into_iter().skip(delay).collect();
    output.resize(expected, 0.0);
    Ok(output)
}
