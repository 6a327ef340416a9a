//! Opaque synthesis model boundary.
//!
//! The lip-synthesis network is an external collaborator; only its tensor
//! contract is fixed here. Any conforming backend (different weights,
//! different runtime, CPU or accelerator) is substitutable without touching
//! the rest of the pipeline.

use ndarray::Array4;

use crate::mel::MEL_BINS;

/// Side length of the model's square input and output crops.
pub const MODEL_RESOLUTION: usize = 96;

/// Fixed tensor contract of the lip-synthesis model.
///
/// * `mels`: `(N, 1, 80, W)` mel feature windows.
/// * `faces`: `(N, 6, 96, 96)` reference input in `[0, 1]` — the masked
///   crop (lower half zeroed) concatenated channel-wise with the full crop.
/// * returns `(N, 3, 96, 96)` predicted mouth-region pixels in `[0, 1]`.
///
/// Invocations are pure: same inputs, same outputs, no side effects and no
/// retry semantics. Any failure (missing weights, device exhaustion) is
/// fatal to the render.
pub trait SynthesisModel: Send + Sync {
    fn synthesize(&self, mels: &Array4<f32>, faces: &Array4<f32>) -> anyhow::Result<Array4<f32>>;
}

/// Expected mel tensor height, re-exported for backends.
pub const MODEL_MEL_BINS: usize = MEL_BINS;
