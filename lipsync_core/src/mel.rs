//! Mel spectrogram computation and per-frame feature windows.
//!
//! The synthesis model consumes one fixed-width window of mel features per
//! output video frame. Windows advance through the spectrogram at a
//! non-integer stride (spectral frame rate / video frame rate) so that each
//! window stays aligned to its frame's position in the audio.

use mel_spec::prelude::*;
use ndarray::{s, Array1, Array2};
use num_complex::Complex;

use crate::error::{RenderError, Result};

/// Mel filterbank size expected by the synthesis model.
pub const MEL_BINS: usize = 80;
/// FFT window length at 16 kHz.
pub const FFT_SIZE: usize = 800;
/// Hop between spectral frames; 16000 / 200 = 80 spectral frames per second.
pub const HOP_SIZE: usize = 200;
/// Spectral frames produced per second of audio.
pub const SPECTRAL_FPS: f64 = 80.0;

/// Compute a mel spectrogram with shape `(MEL_BINS, n_frames)`.
///
/// Fails with `InvalidAudio` if the spectrogram contains non-finite values.
pub fn mel_spectrogram(samples: &[f32], sample_rate: f64) -> Result<Array2<f32>> {
    let mut stft = Spectrogram::new(FFT_SIZE, HOP_SIZE);
    let mut mel = MelSpectrogram::new(FFT_SIZE, sample_rate, MEL_BINS);

    let mut frames: Vec<Vec<f64>> = Vec::new();
    let mut offset = 0usize;
    while offset + HOP_SIZE <= samples.len() {
        let slice = &samples[offset..offset + HOP_SIZE];

        let mel_frame: Vec<f64> = if let Some(fft_frame) = stft.add(slice) {
            let arr_f64: Array1<Complex<f64>> =
                Array1::from_iter(fft_frame.into_iter().map(|c: Complex<f64>| c));
            let (flat, _off) = mel.add(&arr_f64).into_raw_vec_and_offset();
            flat
        } else {
            vec![0.0f64; MEL_BINS]
        };

        frames.push(mel_frame);
        offset += HOP_SIZE;
    }

    let n_frames = frames.len();
    let mut out = Array2::<f32>::zeros((MEL_BINS, n_frames));
    for (t, frame) in frames.iter().enumerate() {
        for (bin, &v) in frame.iter().enumerate() {
            if !v.is_finite() {
                return Err(RenderError::InvalidAudio(
                    "mel spectrogram contains non-finite values".into(),
                ));
            }
            out[[bin, t]] = v as f32;
        }
    }

    Ok(out)
}

/// Partition a mel spectrogram into one feature window per output frame.
///
/// The frame count is `ceil(duration_secs * fps)`, a pure function of audio
/// duration and frame rate. Window `i` starts at spectral frame
/// `floor(i * SPECTRAL_FPS / fps)`; once a window would overrun the
/// spectrogram it is drawn from the last `window` spectral frames instead of
/// being zero-padded, to avoid introducing silence artifacts at the tail.
pub fn chunk_windows(
    mel: &Array2<f32>,
    duration_secs: f64,
    fps: u32,
    window: usize,
) -> Result<Vec<Array2<f32>>> {
    let n_frames = mel.ncols();
    if n_frames < window {
        return Err(RenderError::InvalidAudio(format!(
            "audio too short: {n_frames} spectral frames, need at least {window}"
        )));
    }

    let frame_count = (duration_secs * f64::from(fps)).ceil() as usize;
    let stride = SPECTRAL_FPS / f64::from(fps);

    let mut chunks = Vec::with_capacity(frame_count);
    for i in 0..frame_count {
        let start = (i as f64 * stride) as usize;
        let chunk = if start + window > n_frames {
            mel.slice(s![.., n_frames - window..]).to_owned()
        } else {
            mel.slice(s![.., start..start + window]).to_owned()
        };
        chunks.push(chunk);
    }

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_mel(n_frames: usize) -> Array2<f32> {
        // Each column holds its own index so window contents are traceable.
        let mut mel = Array2::<f32>::zeros((MEL_BINS, n_frames));
        for t in 0..n_frames {
            mel.column_mut(t).fill(t as f32);
        }
        mel
    }

    #[test]
    fn chunk_count_follows_duration_and_fps() {
        // 3.2 s of audio at 80 spectral fps -> 256 frames, 80 output chunks.
        let mel = ramp_mel(256);
        let chunks = chunk_windows(&mel, 3.2, 25, 16).unwrap();
        assert_eq!(chunks.len(), 80);
        for c in &chunks {
            assert_eq!(c.shape(), &[MEL_BINS, 16]);
        }
    }

    #[test]
    fn chunk_count_rounds_up_partial_frames() {
        let mel = ramp_mel(100);
        // 1.01 s -> ceil(25.25) = 26 frames.
        let chunks = chunk_windows(&mel, 1.01, 25, 16).unwrap();
        assert_eq!(chunks.len(), 26);
    }

    #[test]
    fn windows_advance_at_fractional_stride() {
        let mel = ramp_mel(256);
        let chunks = chunk_windows(&mel, 3.2, 25, 16).unwrap();
        // floor(i * 3.2): 0, 3, 6, 9, 12, 16, ...
        assert_eq!(chunks[0][[0, 0]], 0.0);
        assert_eq!(chunks[1][[0, 0]], 3.0);
        assert_eq!(chunks[5][[0, 0]], 16.0);
    }

    #[test]
    fn overruns_draw_from_spectrogram_tail() {
        let mel = ramp_mel(256);
        let chunks = chunk_windows(&mel, 3.2, 25, 16).unwrap();
        // floor(79 * 3.2) = 252; 252 + 16 > 256, so the last chunk is the
        // final 16 spectral frames.
        let last = chunks.last().unwrap();
        assert_eq!(last[[0, 0]], 240.0);
        assert_eq!(last[[0, 15]], 255.0);
    }

    #[test]
    fn too_short_audio_is_rejected() {
        let mel = ramp_mel(8);
        let err = chunk_windows(&mel, 0.1, 25, 16).unwrap_err();
        assert!(matches!(err, RenderError::InvalidAudio(_)));
    }

    #[test]
    fn non_finite_samples_are_rejected() {
        let samples = vec![f32::NAN; 16_000];
        let err = mel_spectrogram(&samples, 16_000.0).unwrap_err();
        assert!(matches!(err, RenderError::InvalidAudio(_)));

        let samples = vec![f32::INFINITY; 16_000];
        let err = mel_spectrogram(&samples, 16_000.0).unwrap_err();
        assert!(matches!(err, RenderError::InvalidAudio(_)));
    }

    #[test]
    fn silence_produces_finite_spectrogram() {
        let samples = vec![0.0f32; 16_000];
        let mel = mel_spectrogram(&samples, 16_000.0).unwrap();
        assert!(mel.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn spectrogram_frame_count_tracks_hops() {
        let samples = vec![0.0f32; 16_000];
        let mel = mel_spectrogram(&samples, 16_000.0).unwrap();
        assert_eq!(mel.nrows(), MEL_BINS);
        assert_eq!(mel.ncols(), 16_000 / HOP_SIZE);
    }
}
