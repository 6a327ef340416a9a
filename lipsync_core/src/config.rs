// Tuned constants for the render pipeline.

use std::path::PathBuf;

/// Per-render configuration. The defaults are the empirically tuned values
/// the pipeline was shipped with; they can be overridden per deployment via
/// environment variables, not per request.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Output video frame rate.
    pub fps: u32,
    /// Width of one mel feature window, in spectral frames.
    pub mel_step_size: usize,
    /// Number of feature chunks per model invocation.
    pub batch_size: usize,
    /// Scale applied to the detected face box to get the square crop side.
    pub padding_scale: f32,
    /// Fraction of crop height where the alpha mask starts ramping up.
    pub mask_blend_start: f32,
    /// Fraction of crop height where the alpha mask reaches fully opaque.
    pub mask_blend_end: f32,
    /// Gaussian sigma used to soften the alpha mask.
    pub mask_blur_sigma: f32,
    /// Root directory for per-render session output.
    pub storage_root: PathBuf,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fps: 25,
            mel_step_size: 16,
            batch_size: 32,
            padding_scale: 1.1,
            mask_blend_start: 0.5,
            mask_blend_end: 0.8,
            mask_blur_sigma: 11.0,
            storage_root: PathBuf::from("storage"),
        }
    }
}

impl RenderConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let fps = std::env::var("LIPSYNC_FPS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.fps);

        let batch_size = std::env::var("LIPSYNC_BATCH_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.batch_size);

        let padding_scale = std::env::var("LIPSYNC_PADDING_SCALE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.padding_scale);

        let mask_blend_start = std::env::var("LIPSYNC_MASK_BLEND_START")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.mask_blend_start);

        let mask_blend_end = std::env::var("LIPSYNC_MASK_BLEND_END")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.mask_blend_end);

        let mask_blur_sigma = std::env::var("LIPSYNC_MASK_BLUR_SIGMA")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.mask_blur_sigma);

        let storage_root = std::env::var("LIPSYNC_STORAGE_ROOT")
            .ok()
            .map(PathBuf::from)
            .unwrap_or_else(|| defaults.storage_root.clone());

        Self {
            fps,
            batch_size,
            padding_scale,
            mask_blend_start,
            mask_blend_end,
            mask_blur_sigma,
            storage_root,
            ..defaults
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_shipped_tuning() {
        let cfg = RenderConfig::default();
        assert_eq!(cfg.fps, 25);
        assert_eq!(cfg.mel_step_size, 16);
        assert_eq!(cfg.batch_size, 32);
        assert!((cfg.padding_scale - 1.1).abs() < f32::EPSILON);
        assert!((cfg.mask_blend_start - 0.5).abs() < f32::EPSILON);
        assert!((cfg.mask_blend_end - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn env_overrides_tuned_constants() {
        std::env::set_var("LIPSYNC_PADDING_SCALE", "1.25");
        std::env::set_var("LIPSYNC_MASK_BLEND_START", "0.4");
        std::env::set_var("LIPSYNC_MASK_BLEND_END", "0.9");
        std::env::set_var("LIPSYNC_MASK_BLUR_SIGMA", "7.5");
        std::env::set_var("LIPSYNC_BATCH_SIZE", "8");

        let cfg = RenderConfig::from_env();

        std::env::remove_var("LIPSYNC_PADDING_SCALE");
        std::env::remove_var("LIPSYNC_MASK_BLEND_START");
        std::env::remove_var("LIPSYNC_MASK_BLEND_END");
        std::env::remove_var("LIPSYNC_MASK_BLUR_SIGMA");
        std::env::remove_var("LIPSYNC_BATCH_SIZE");

        assert!((cfg.padding_scale - 1.25).abs() < f32::EPSILON);
        assert!((cfg.mask_blend_start - 0.4).abs() < f32::EPSILON);
        assert!((cfg.mask_blend_end - 0.9).abs() < f32::EPSILON);
        assert!((cfg.mask_blur_sigma - 7.5).abs() < f32::EPSILON);
        assert_eq!(cfg.batch_size, 8);
    }
}
