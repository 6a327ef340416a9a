//! Batch inference driver.
//!
//! Groups feature windows into fixed-size batches, builds the model input
//! tensors and collects per-frame predicted crops in chunk order. Batch
//! boundaries are invisible downstream.

use anyhow::anyhow;
use image::{imageops, Rgb, RgbImage};
use ndarray::{s, Array2, Array3, Array4};
use tracing::debug;

use crate::error::{RenderError, Result};
use crate::model::{SynthesisModel, MODEL_RESOLUTION};

/// Drives the synthesis model over an ordered chunk sequence.
pub struct BatchDriver<'a> {
    model: &'a dyn SynthesisModel,
    batch_size: usize,
    /// Static 6-channel reference input, `(6, 96, 96)` in [0, 1]: the
    /// resized face crop with its lower half zeroed, stacked on top of the
    /// unmodified crop. Built once per render and tiled across each batch.
    reference: Array3<f32>,
}

impl<'a> BatchDriver<'a> {
    /// `face_crop` is the square crop extracted from the source image, at
    /// its native resolution; it is downsampled to the model resolution
    /// here with Lanczos filtering.
    pub fn new(model: &'a dyn SynthesisModel, face_crop: &RgbImage, batch_size: usize) -> Self {
        let size = MODEL_RESOLUTION as u32;
        let resized = imageops::resize(face_crop, size, size, imageops::FilterType::Lanczos3);

        let mut reference = Array3::<f32>::zeros((6, MODEL_RESOLUTION, MODEL_RESOLUTION));
        for (x, y, pixel) in resized.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            for c in 0..3 {
                let v = pixel[c] as f32 / 255.0;
                // Channels 0..3: target-shape hint with the mouth half
                // blanked. Channels 3..6: full appearance reference.
                if y < MODEL_RESOLUTION / 2 {
                    reference[[c, y, x]] = v;
                }
                reference[[c + 3, y, x]] = v;
            }
        }

        Self {
            model,
            batch_size: batch_size.max(1),
            reference,
        }
    }

    /// Run inference over all chunks, returning one predicted crop per
    /// chunk in the same order.
    pub fn run(&self, chunks: &[Array2<f32>]) -> Result<Vec<RgbImage>> {
        let mut crops = Vec::with_capacity(chunks.len());

        for (batch_idx, batch) in chunks.chunks(self.batch_size).enumerate() {
            let preds = self.run_batch(batch)?;
            debug!(batch = batch_idx, frames = batch.len(), "inference batch done");
            crops.extend(preds);
        }

        Ok(crops)
    }

    fn run_batch(&self, batch: &[Array2<f32>]) -> Result<Vec<RgbImage>> {
        let n = batch.len();
        let (bins, width) = batch[0].dim();

        let mut mels = Array4::<f32>::zeros((n, 1, bins, width));
        let mut faces = Array4::<f32>::zeros((n, 6, MODEL_RESOLUTION, MODEL_RESOLUTION));
        for (i, chunk) in batch.iter().enumerate() {
            mels.slice_mut(s![i, 0, .., ..]).assign(chunk);
            faces.slice_mut(s![i, .., .., ..]).assign(&self.reference);
        }

        let preds = self
            .model
            .synthesize(&mels, &faces)
            .map_err(RenderError::Inference)?;

        let expected = [n, 3, MODEL_RESOLUTION, MODEL_RESOLUTION];
        if preds.shape() != expected {
            return Err(RenderError::Inference(anyhow!(
                "model returned shape {:?}, expected {:?}",
                preds.shape(),
                expected
            )));
        }

        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            let size = MODEL_RESOLUTION as u32;
            let mut img = RgbImage::new(size, size);
            for (x, y, pixel) in img.enumerate_pixels_mut() {
                let (xu, yu) = (x as usize, y as usize);
                *pixel = Rgb([
                    to_u8(preds[[i, 0, yu, xu]]),
                    to_u8(preds[[i, 1, yu, xu]]),
                    to_u8(preds[[i, 2, yu, xu]]),
                ]);
            }
            out.push(img);
        }

        Ok(out)
    }
}

fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array4;

    /// Deterministic stand-in: every output pixel carries the mean of the
    /// frame's mel window, so chunk identity survives into the crops.
    struct MelMeanModel;

    impl SynthesisModel for MelMeanModel {
        fn synthesize(
            &self,
            mels: &Array4<f32>,
            faces: &Array4<f32>,
        ) -> anyhow::Result<Array4<f32>> {
            let n = mels.shape()[0];
            assert_eq!(faces.shape(), &[n, 6, 96, 96]);

            let mut out = Array4::<f32>::zeros((n, 3, 96, 96));
            for i in 0..n {
                let mean = mels.slice(s![i, 0, .., ..]).mean().unwrap_or(0.0);
                out.slice_mut(s![i, .., .., ..]).fill(mean);
            }
            Ok(out)
        }
    }

    struct FailingModel;

    impl SynthesisModel for FailingModel {
        fn synthesize(
            &self,
            _mels: &Array4<f32>,
            _faces: &Array4<f32>,
        ) -> anyhow::Result<Array4<f32>> {
            Err(anyhow!("weights not loaded"))
        }
    }

    struct BadShapeModel;

    impl SynthesisModel for BadShapeModel {
        fn synthesize(
            &self,
            mels: &Array4<f32>,
            _faces: &Array4<f32>,
        ) -> anyhow::Result<Array4<f32>> {
            Ok(Array4::zeros((mels.shape()[0], 3, 48, 48)))
        }
    }

    fn indexed_chunks(count: usize) -> Vec<Array2<f32>> {
        (0..count)
            .map(|i| Array2::from_elem((80, 16), i as f32 / 255.0))
            .collect()
    }

    #[test]
    fn order_preserved_across_batch_boundaries() {
        let model = MelMeanModel;
        let driver = BatchDriver::new(&model, &RgbImage::new(132, 132), 4);

        let crops = driver.run(&indexed_chunks(10)).unwrap();
        assert_eq!(crops.len(), 10);
        for (i, crop) in crops.iter().enumerate() {
            assert_eq!(crop.get_pixel(0, 0)[0], i as u8);
        }
    }

    #[test]
    fn reference_masks_lower_half() {
        let model = MelMeanModel;
        let mut face = RgbImage::new(132, 132);
        for p in face.pixels_mut() {
            *p = Rgb([255, 255, 255]);
        }
        let driver = BatchDriver::new(&model, &face, 4);

        // Upper half keeps the appearance, lower half of the hint is zero.
        assert!(driver.reference[[0, 10, 50]] > 0.9);
        assert_eq!(driver.reference[[0, 60, 50]], 0.0);
        // The appearance channels are never masked.
        assert!(driver.reference[[3, 60, 50]] > 0.9);
    }

    #[test]
    fn model_failure_is_fatal() {
        let model = FailingModel;
        let driver = BatchDriver::new(&model, &RgbImage::new(96, 96), 32);
        let err = driver.run(&indexed_chunks(3)).unwrap_err();
        assert!(matches!(err, RenderError::Inference(_)));
    }

    #[test]
    fn wrong_output_shape_is_fatal() {
        let model = BadShapeModel;
        let driver = BatchDriver::new(&model, &RgbImage::new(96, 96), 32);
        let err = driver.run(&indexed_chunks(2)).unwrap_err();
        assert!(matches!(err, RenderError::Inference(_)));
    }
}
