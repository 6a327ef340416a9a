//! Per-render session directories and artifacts.
//!
//! Each invocation gets its own directory under the storage root; the
//! session exclusively owns everything inside it until the final video is
//! persisted. Frame staging artifacts are removed after a successful mux
//! and deliberately left behind on failure for inspection.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

pub const FINAL_VIDEO_NAME: &str = "final_video.mp4";
const FRAMES_DIR_NAME: &str = "frames";
const MANIFEST_NAME: &str = "session.json";

#[derive(Debug)]
pub struct RenderSession {
    pub id: String,
    pub dir: PathBuf,
}

/// Summary of a completed render, written next to the final video.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionManifest {
    pub id: String,
    pub image: PathBuf,
    pub audio: PathBuf,
    pub frame_count: usize,
    pub fps: u32,
    pub detection_fallback: bool,
    pub video: PathBuf,
}

impl RenderSession {
    pub fn create(storage_root: &Path) -> Result<Self> {
        let id = Uuid::new_v4().to_string();
        let dir = storage_root.join("sessions").join(&id);
        std::fs::create_dir_all(dir.join(FRAMES_DIR_NAME))?;
        Ok(Self { id, dir })
    }

    pub fn frames_dir(&self) -> PathBuf {
        self.dir.join(FRAMES_DIR_NAME)
    }

    pub fn video_path(&self) -> PathBuf {
        self.dir.join(FINAL_VIDEO_NAME)
    }

    pub fn write_manifest(&self, manifest: &SessionManifest) -> Result<()> {
        let json = serde_json::to_string_pretty(manifest)?;
        std::fs::write(self.dir.join(MANIFEST_NAME), json)?;
        Ok(())
    }

    /// Remove the frame staging directory once the video is durable.
    pub fn cleanup_frames(&self) -> Result<()> {
        let frames = self.frames_dir();
        if frames.exists() {
            std::fs::remove_dir_all(frames)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_makes_session_and_staging_dirs() {
        let root = tempfile::tempdir().unwrap();
        let session = RenderSession::create(root.path()).unwrap();

        assert!(session.dir.starts_with(root.path().join("sessions")));
        assert!(session.frames_dir().is_dir());
        assert!(!session.id.is_empty());
    }

    #[test]
    fn sessions_are_unique() {
        let root = tempfile::tempdir().unwrap();
        let a = RenderSession::create(root.path()).unwrap();
        let b = RenderSession::create(root.path()).unwrap();
        assert_ne!(a.id, b.id);
        assert_ne!(a.dir, b.dir);
    }

    #[test]
    fn cleanup_removes_only_staging() {
        let root = tempfile::tempdir().unwrap();
        let session = RenderSession::create(root.path()).unwrap();
        std::fs::write(session.frames_dir().join("000000.png"), b"x").unwrap();
        std::fs::write(session.video_path(), b"video").unwrap();

        session.cleanup_frames().unwrap();
        assert!(!session.frames_dir().exists());
        assert!(session.video_path().exists());
    }

    #[test]
    fn manifest_round_trips() {
        let root = tempfile::tempdir().unwrap();
        let session = RenderSession::create(root.path()).unwrap();
        let manifest = SessionManifest {
            id: session.id.clone(),
            image: PathBuf::from("portrait.png"),
            audio: PathBuf::from("speech.wav"),
            frame_count: 80,
            fps: 25,
            detection_fallback: true,
            video: session.video_path(),
        };
        session.write_manifest(&manifest).unwrap();

        let text = std::fs::read_to_string(session.dir.join("session.json")).unwrap();
        let parsed: SessionManifest = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.frame_count, 80);
        assert!(parsed.detection_fallback);
    }
}
