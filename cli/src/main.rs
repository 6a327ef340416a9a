//! Command-line front end for the render pipeline.
//!
//! The synthesis network and face detector are deployment-provided
//! backends; this binary wires in pass-through stand-ins so the pipeline
//! can be exercised end to end without model weights: detection always
//! falls back to the centered crop, and the "synthesized" mouth region is
//! the appearance reference itself, yielding a still-face video timed to
//! the audio.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use image::RgbImage;
use ndarray::{s, Array4};
use tracing::info;

use lipsync_core::{FaceBounds, FaceDetector, LipSyncRenderer, RenderConfig, SynthesisModel};

#[derive(Debug, Parser)]
#[command(name = "lipsync")]
#[command(about = "Render a talking-head video from a portrait and a speech WAV", long_about = None)]
struct Args {
    /// Path to the source portrait image.
    #[arg(long)]
    image: PathBuf,

    /// Path to the speech audio (WAV).
    #[arg(long)]
    audio: PathBuf,

    /// Root directory for per-render session output.
    #[arg(long, default_value = "storage")]
    storage_root: PathBuf,

    /// Frames per model invocation.
    #[arg(long)]
    batch_size: Option<usize>,

    /// Output video frame rate.
    #[arg(long)]
    fps: Option<u32>,
}

/// No detection backend linked; the locator's centered fallback applies.
struct NoDetector;

impl FaceDetector for NoDetector {
    fn detect(&self, _image: &RgbImage) -> Vec<FaceBounds> {
        Vec::new()
    }
}

/// Pass-through model: echoes the appearance reference channels back as the
/// prediction, conforming to the tensor contract without any weights.
struct PassthroughModel;

impl SynthesisModel for PassthroughModel {
    fn synthesize(&self, mels: &Array4<f32>, faces: &Array4<f32>) -> anyhow::Result<Array4<f32>> {
        let n = mels.shape()[0];
        let (h, w) = (faces.shape()[2], faces.shape()[3]);

        let mut out = Array4::<f32>::zeros((n, 3, h, w));
        out.assign(&faces.slice(s![.., 3..6, .., ..]));
        Ok(out)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = RenderConfig::from_env();
    config.storage_root = args.storage_root;
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    if let Some(fps) = args.fps {
        config.fps = fps;
    }

    let renderer = LipSyncRenderer::new(Box::new(NoDetector), Box::new(PassthroughModel), config);

    let session = renderer
        .render(&args.image, &args.audio)
        .context("render failed")?;

    info!(session = %session.id, "done");
    println!("{}", session.video_path().display());
    Ok(())
}
