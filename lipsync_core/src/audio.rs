//! Waveform loading and resampling for feature extraction.

use std::path::Path;

use crate::error::{RenderError, Result};

/// Sample rate the mel feature extractor expects.
pub const FEATURE_SAMPLE_RATE: u32 = 16_000;

/// A mono PCM waveform held as f32 samples in [-1.0, 1.0].
#[derive(Debug, Clone)]
pub struct AudioWaveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioWaveform {
    /// Load a WAV file and mix it down to mono.
    pub fn from_wav_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = hound::WavReader::open(path.as_ref())
            .map_err(|e| RenderError::InvalidAudio(format!("wav read error: {e}")))?;
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| RenderError::InvalidAudio(format!("wav sample error: {e}")))?,
            hound::SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|e| RenderError::InvalidAudio(format!("wav sample error: {e}")))?
            }
        };

        // Mix interleaved channels down to mono by averaging.
        let samples = if channels == 1 {
            interleaved
        } else {
            interleaved
                .chunks(channels)
                .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
                .collect()
        };

        Ok(Self {
            samples,
            sample_rate: spec.sample_rate,
        })
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Linear resample to `dst_hz`. Returns self unchanged when the rates
    /// already match.
    pub fn resampled(&self, dst_hz: u32) -> AudioWaveform {
        AudioWaveform {
            samples: resample_linear_mono(&self.samples, self.sample_rate, dst_hz),
            sample_rate: dst_hz,
        }
    }
}

fn resample_linear_mono(input: &[f32], src_hz: u32, dst_hz: u32) -> Vec<f32> {
    if src_hz == dst_hz || input.is_empty() {
        return input.to_vec();
    }

    let new_len = (input.len() as u64 * u64::from(dst_hz) / u64::from(src_hz)) as usize;
    let mut out = vec![0.0f32; new_len];

    for (i, y) in out.iter_mut().enumerate() {
        let src_pos = (i as f64) * f64::from(src_hz) / f64::from(dst_hz);
        let idx = src_pos.floor() as usize;
        let frac = (src_pos - idx as f64) as f32;

        let a = input.get(idx).copied().unwrap_or(0.0);
        let b = input.get(idx + 1).copied().unwrap_or(a);
        *y = a * (1.0 - frac) + b * frac;
    }

    out
}
