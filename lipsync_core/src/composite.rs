//! Frame compositing: paste predicted mouth crops back onto the source
//! portrait with a soft alpha mask so no seam is visible.

use image::{imageops, Rgb, RgbImage};
use rayon::prelude::*;

use crate::config::RenderConfig;
use crate::locate::CropRect;

/// Radius of the gaussian used to soften the alpha mask (21-tap kernel).
const MASK_BLUR_RADIUS: usize = 10;

/// Build the raw alpha ramp for a crop of the given size, before blurring:
/// 0 above `blend_start` of the height, a linear ramp up to `blend_end`,
/// and 1 below that. Values approximate the mouth/jaw region.
pub fn ramp_mask(width: u32, height: u32, blend_start: f32, blend_end: f32) -> Vec<f32> {
    let (w, h) = (width as usize, height as usize);
    let start = (h as f32 * blend_start) as usize;
    let end = (h as f32 * blend_end) as usize;
    let span = end.saturating_sub(start);

    let mut mask = vec![0.0f32; w * h];
    for y in 0..h {
        let v = if y < start {
            0.0
        } else if y >= end {
            1.0
        } else if span > 1 {
            (y - start) as f32 / (span - 1) as f32
        } else {
            0.0
        };
        mask[y * w..(y + 1) * w].fill(v);
    }

    mask
}

/// Separable gaussian blur over a single-channel f32 mask, clamping at the
/// edges.
fn blur_mask(mask: &[f32], width: u32, height: u32, sigma: f32) -> Vec<f32> {
    let (w, h) = (width as usize, height as usize);
    let radius = MASK_BLUR_RADIUS as i64;

    let mut kernel = [0.0f32; 2 * MASK_BLUR_RADIUS + 1];
    let mut sum = 0.0f32;
    for (i, k) in kernel.iter_mut().enumerate() {
        let d = i as f32 - MASK_BLUR_RADIUS as f32;
        *k = (-d * d / (2.0 * sigma * sigma)).exp();
        sum += *k;
    }
    for k in kernel.iter_mut() {
        *k /= sum;
    }

    // Horizontal pass, then vertical.
    let mut tmp = vec![0.0f32; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0f32;
            for (i, &k) in kernel.iter().enumerate() {
                let sx = (x as i64 + i as i64 - radius).clamp(0, w as i64 - 1) as usize;
                acc += mask[y * w + sx] * k;
            }
            tmp[y * w + x] = acc;
        }
    }

    let mut out = vec![0.0f32; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0f32;
            for (i, &k) in kernel.iter().enumerate() {
                let sy = (y as i64 + i as i64 - radius).clamp(0, h as i64 - 1) as usize;
                acc += tmp[sy * w + x] * k;
            }
            out[y * w + x] = acc;
        }
    }

    out
}

/// Mild 3x3 sharpen (center 9, neighbors -1) to counteract resampling blur,
/// with edge pixels clamped.
pub fn sharpen3x3(img: &RgbImage) -> RgbImage {
    let (w, h) = (img.width() as i64, img.height() as i64);
    let mut out = RgbImage::new(img.width(), img.height());

    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let mut acc = [0.0f32; 3];
        for dy in -1..=1i64 {
            for dx in -1..=1i64 {
                let sx = (x as i64 + dx).clamp(0, w - 1) as u32;
                let sy = (y as i64 + dy).clamp(0, h - 1) as u32;
                let weight = if dx == 0 && dy == 0 { 9.0 } else { -1.0 };
                let src = img.get_pixel(sx, sy);
                for c in 0..3 {
                    acc[c] += weight * src[c] as f32;
                }
            }
        }
        *pixel = Rgb([
            acc[0].clamp(0.0, 255.0).round() as u8,
            acc[1].clamp(0.0, 255.0).round() as u8,
            acc[2].clamp(0.0, 255.0).round() as u8,
        ]);
    }

    out
}

/// Composites predicted crops back into the source frame. Stateless per
/// frame; the mask and crop geometry are computed once per render.
pub struct Compositor {
    source: RgbImage,
    rect: CropRect,
    mask: Vec<f32>,
}

impl Compositor {
    pub fn new(source: RgbImage, rect: CropRect, cfg: &RenderConfig) -> Self {
        let raw = ramp_mask(
            rect.width(),
            rect.height(),
            cfg.mask_blend_start,
            cfg.mask_blend_end,
        );
        let mask = blur_mask(&raw, rect.width(), rect.height(), cfg.mask_blur_sigma);

        Self { source, rect, mask }
    }

    /// Blend one predicted crop into a copy of the source frame.
    ///
    /// The crop rectangle is clamped to the image; regions outside the
    /// overlap are never written, so those pixels stay bit-identical to the
    /// source.
    pub fn composite(&self, predicted: &RgbImage) -> RgbImage {
        let rect = &self.rect;
        let crop_w = rect.width();
        let crop_h = rect.height();

        let upscaled = imageops::resize(predicted, crop_w, crop_h, imageops::FilterType::Lanczos3);
        let sharpened = sharpen3x3(&upscaled);

        let (img_w, img_h) = (self.source.width() as i64, self.source.height() as i64);
        let ox1 = rect.x1.max(0);
        let oy1 = rect.y1.max(0);
        let ox2 = rect.x2.min(img_w);
        let oy2 = rect.y2.min(img_h);

        let mut frame = self.source.clone();
        if ox2 <= ox1 || oy2 <= oy1 {
            return frame;
        }

        // Offsets into the crop-local buffers.
        let px1 = (ox1 - rect.x1) as u32;
        let py1 = (oy1 - rect.y1) as u32;

        for y in 0..(oy2 - oy1) as u32 {
            for x in 0..(ox2 - ox1) as u32 {
                let (cx, cy) = (px1 + x, py1 + y);
                let m = self.mask[cy as usize * crop_w as usize + cx as usize];

                let pred = sharpened.get_pixel(cx, cy);
                let dst = frame.get_pixel_mut((ox1 as u32) + x, (oy1 as u32) + y);
                for c in 0..3 {
                    let blended = dst[c] as f32 * (1.0 - m) + pred[c] as f32 * m;
                    dst[c] = blended.clamp(0.0, 255.0).round() as u8;
                }
            }
        }

        frame
    }

    /// Composite a batch of predicted crops in parallel. Output order
    /// matches input order; frames are independent so this is the natural
    /// parallelism point.
    pub fn composite_all(&self, predicted: &[RgbImage]) -> Vec<RgbImage> {
        predicted.par_iter().map(|p| self.composite(p)).collect()
    }
}
