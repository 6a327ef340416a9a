//! End-to-end render orchestration.
//!
//! Stages run strictly in sequence: locate face, chunk audio features,
//! batch inference, composite, assemble. Any fatal error unwinds the whole
//! render; no partial video is ever written.

use std::path::Path;

use image::RgbImage;
use tracing::info;

use crate::audio::{AudioWaveform, FEATURE_SAMPLE_RATE};
use crate::composite::Compositor;
use crate::config::RenderConfig;
use crate::error::{RenderError, Result};
use crate::infer::BatchDriver;
use crate::locate::{extract_crop, locate_face, FaceDetector, FaceLocation};
use crate::mel::{chunk_windows, mel_spectrogram};
use crate::model::SynthesisModel;
use crate::session::{RenderSession, SessionManifest};
use crate::video;

/// Composited frame sequence before assembly, with the locator outcome.
pub struct RenderedFrames {
    pub frames: Vec<RgbImage>,
    pub face_location: FaceLocation,
}

/// One renderer per deployment; renders are independent and share only the
/// read-only detector and model, so concurrent invocations need no locking.
pub struct LipSyncRenderer {
    detector: Box<dyn FaceDetector>,
    model: Box<dyn SynthesisModel>,
    config: RenderConfig,
}

impl LipSyncRenderer {
    pub fn new(
        detector: Box<dyn FaceDetector>,
        model: Box<dyn SynthesisModel>,
        config: RenderConfig,
    ) -> Self {
        Self {
            detector,
            model,
            config,
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Run stages 1-4 and return the ordered composite frame sequence.
    ///
    /// Split out from [`render`](Self::render) so the numerical pipeline is
    /// testable without ffmpeg.
    pub fn render_frames(
        &self,
        image: &RgbImage,
        waveform: &AudioWaveform,
    ) -> Result<RenderedFrames> {
        let cfg = &self.config;

        let resampled = waveform.resampled(FEATURE_SAMPLE_RATE);
        let mel = mel_spectrogram(&resampled.samples, f64::from(FEATURE_SAMPLE_RATE))?;
        let chunks = chunk_windows(&mel, resampled.duration_secs(), cfg.fps, cfg.mel_step_size)?;
        info!(chunks = chunks.len(), "audio features chunked");

        let location = locate_face(image, self.detector.as_ref(), cfg.padding_scale);
        let rect = location.rect();
        info!(
            fallback = location.is_fallback(),
            x1 = rect.x1,
            y1 = rect.y1,
            side = rect.width(),
            "face region located"
        );

        let face_crop = extract_crop(image, &rect);
        let driver = BatchDriver::new(self.model.as_ref(), &face_crop, cfg.batch_size);
        let crops = driver.run(&chunks)?;
        info!(frames = crops.len(), "inference complete");

        let compositor = Compositor::new(image.clone(), rect, cfg);
        let frames = compositor.composite_all(&crops);

        Ok(RenderedFrames {
            frames,
            face_location: location,
        })
    }

    /// Render a talking-head video for a portrait image and a speech WAV.
    /// Returns the session owning the final video file.
    pub fn render(&self, image_path: &Path, audio_path: &Path) -> Result<RenderSession> {
        for path in [image_path, audio_path] {
            if !path.exists() {
                return Err(RenderError::NotFound(path.to_path_buf()));
            }
        }

        info!(image = %image_path.display(), audio = %audio_path.display(), "starting render");
        let image = image::open(image_path)?.to_rgb8();
        let waveform = AudioWaveform::from_wav_file(audio_path)?;

        let rendered = self.render_frames(&image, &waveform)?;

        let session = RenderSession::create(&self.config.storage_root)?;
        let frames_dir = session.frames_dir();
        video::write_frame_sequence(&rendered.frames, &frames_dir)?;
        video::assemble(
            &frames_dir,
            rendered.frames.len(),
            self.config.fps,
            audio_path,
            waveform.duration_secs(),
            &session.video_path(),
        )?;

        session.write_manifest(&SessionManifest {
            id: session.id.clone(),
            image: image_path.to_path_buf(),
            audio: audio_path.to_path_buf(),
            frame_count: rendered.frames.len(),
            fps: self.config.fps,
            detection_fallback: rendered.face_location.is_fallback(),
            video: session.video_path(),
        })?;
        session.cleanup_frames()?;

        info!(session = %session.id, video = %session.video_path().display(), "render finished");
        Ok(session)
    }
}
