//! Audio-driven facial compositing pipeline.
//!
//! Generates a video of a still portrait speaking a given audio track:
//! locate the face, derive per-frame mel feature windows, drive an opaque
//! lip-synthesis model in batches, composite the predicted mouth crops back
//! onto the portrait with a soft mask, and assemble the timed video with
//! its audio.
//!
//! The synthesis network and the face detection backend are pluggable
//! ([`SynthesisModel`], [`FaceDetector`]); everything else in the pipeline
//! is deterministic.

pub mod audio;
pub mod composite;
pub mod config;
pub mod error;
pub mod infer;
pub mod locate;
pub mod mel;
pub mod model;
pub mod pipeline;
pub mod session;
pub mod video;

pub use audio::{AudioWaveform, FEATURE_SAMPLE_RATE};
pub use config::RenderConfig;
pub use error::{RenderError, Result};
pub use locate::{CropRect, FaceBounds, FaceDetector, FaceLocation};
pub use model::{SynthesisModel, MODEL_RESOLUTION};
pub use pipeline::{LipSyncRenderer, RenderedFrames};
pub use session::{RenderSession, SessionManifest};
pub use video::AudioFit;
