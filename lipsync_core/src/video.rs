//! Video assembly: frame sequence encode plus audio mux via ffmpeg.

use std::path::Path;
use std::process::Command;

use image::RgbImage;
use tracing::{debug, info};

use crate::error::{RenderError, Result};

/// Relationship between the audio track and the video implied by the frame
/// count. Audio longer than the video is trimmed before muxing; shorter
/// audio is muxed unchanged and the tail of the video runs silent. The
/// asymmetry is intentional behavioral parity, not an oversight fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AudioFit {
    LongerThanVideo { trim_to_secs: f64 },
    ShorterOrEqual,
}

pub fn audio_fit(audio_secs: f64, video_secs: f64) -> AudioFit {
    if audio_secs > video_secs {
        AudioFit::LongerThanVideo {
            trim_to_secs: video_secs,
        }
    } else {
        AudioFit::ShorterOrEqual
    }
}

/// Write frames as a zero-padded PNG sequence (`000000.png`, ...) that
/// ffmpeg can consume as an image2 input.
pub fn write_frame_sequence(frames: &[RgbImage], dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    for (i, frame) in frames.iter().enumerate() {
        let path = dir.join(format!("{i:06}.png"));
        frame.save(&path)?;
    }
    debug!(count = frames.len(), dir = %dir.display(), "frame sequence written");
    Ok(())
}

pub fn check_ffmpeg() -> Result<()> {
    Command::new("ffmpeg")
        .arg("-version")
        .output()
        .map_err(|_| {
            RenderError::Assembly("ffmpeg not found; install ffmpeg to assemble videos".into())
        })?;
    Ok(())
}

/// Encode the frame sequence at the given frame rate and mux it with the
/// audio track into `output`.
pub fn assemble(
    frames_dir: &Path,
    frame_count: usize,
    fps: u32,
    audio_path: &Path,
    audio_secs: f64,
    output: &Path,
) -> Result<()> {
    check_ffmpeg()?;

    let video_secs = frame_count as f64 / f64::from(fps);
    let fit = audio_fit(audio_secs, video_secs);

    let pattern = frames_dir.join("%06d.png");
    let mut cmd = Command::new("ffmpeg");
    cmd.arg("-y")
        .arg("-framerate")
        .arg(fps.to_string())
        .arg("-i")
        .arg(&pattern);

    if let AudioFit::LongerThanVideo { trim_to_secs } = fit {
        info!(trim_to_secs, "audio longer than video, trimming before mux");
        cmd.arg("-t").arg(format!("{trim_to_secs:.6}"));
    }
    cmd.arg("-i").arg(audio_path);

    cmd.arg("-c:v")
        .arg("libx264")
        .arg("-pix_fmt")
        .arg("yuv420p")
        .arg("-c:a")
        .arg("aac")
        .arg("-r")
        .arg(fps.to_string())
        .arg(output);

    let out = cmd
        .output()
        .map_err(|e| RenderError::Assembly(format!("ffmpeg spawn failed: {e}")))?;

    if !out.status.success() {
        let stderr = String::from_utf8_lossy(&out.stderr);
        return Err(RenderError::Assembly(format!(
            "ffmpeg exited with {}: {}",
            out.status,
            stderr.trim_end()
        )));
    }

    info!(video = %output.display(), secs = video_secs, "video assembled");
    Ok(())
}
