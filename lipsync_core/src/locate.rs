//! Face region location and square crop derivation.

use image::RgbImage;
use tracing::warn;

/// Bounding box of a detected face within an image.
#[derive(Debug, Clone)]
pub struct FaceBounds {
    /// X coordinate of the top-left corner (pixels).
    pub x: f64,
    /// Y coordinate of the top-left corner (pixels).
    pub y: f64,
    /// Width of the bounding box (pixels).
    pub width: f64,
    /// Height of the bounding box (pixels).
    pub height: f64,
    /// Detection confidence score.
    pub confidence: f64,
}

/// Pluggable face detection backend.
///
/// Implement this trait to provide a detector (ONNX, mediapipe bindings,
/// etc.) and pass it to the renderer. Detection quality is the backend's
/// concern; crop geometry and the no-face fallback live here.
pub trait FaceDetector: Send + Sync {
    fn detect(&self, image: &RgbImage) -> Vec<FaceBounds>;
}

/// Square crop region in source-image coordinates. Coordinates may lie
/// outside the image bounds; extraction and compositing clamp as needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
}

impl CropRect {
    pub fn width(&self) -> u32 {
        (self.x2 - self.x1).max(0) as u32
    }

    pub fn height(&self) -> u32 {
        (self.y2 - self.y1).max(0) as u32
    }
}

/// Outcome of the locator. Missing detection is an expected condition with
/// an explicit fallback, not an error; the pipeline never aborts on it.
#[derive(Debug, Clone, Copy)]
pub enum FaceLocation {
    Detected(CropRect),
    FallbackCentered(CropRect),
}

impl FaceLocation {
    pub fn rect(&self) -> CropRect {
        match self {
            FaceLocation::Detected(r) | FaceLocation::FallbackCentered(r) => *r,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, FaceLocation::FallbackCentered(_))
    }
}

/// Locate the face region in a source portrait.
///
/// Takes the highest-confidence detection and derives a square crop of side
/// `round(max(w, h) * padding_scale)` centered on the detection center. With
/// no detections, falls back to the middle half of the image (25%..75% of
/// each dimension).
pub fn locate_face(
    image: &RgbImage,
    detector: &dyn FaceDetector,
    padding_scale: f32,
) -> FaceLocation {
    let detections = detector.detect(image);
    let best = detections
        .into_iter()
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence));

    match best {
        Some(face) => {
            let center_x = face.x + face.width / 2.0;
            let center_y = face.y + face.height / 2.0;
            let side = (face.width.max(face.height) * f64::from(padding_scale)).round() as i64;

            let x1 = center_x.round() as i64 - side / 2;
            let y1 = center_y.round() as i64 - side / 2;
            FaceLocation::Detected(CropRect {
                x1,
                y1,
                x2: x1 + side,
                y2: y1 + side,
            })
        }
        None => {
            warn!("no face detected, using centered fallback crop");
            let (w, h) = (image.width() as i64, image.height() as i64);
            FaceLocation::FallbackCentered(CropRect {
                x1: w / 4,
                y1: h / 4,
                x2: 3 * w / 4,
                y2: 3 * h / 4,
            })
        }
    }
}

/// Extract the crop region from the image, padding with black wherever the
/// rectangle extends beyond the image bounds so the output keeps the exact
/// requested dimensions.
pub fn extract_crop(image: &RgbImage, rect: &CropRect) -> RgbImage {
    let (w, h) = (image.width() as i64, image.height() as i64);
    let mut out = RgbImage::new(rect.width(), rect.height());

    for (ox, oy, pixel) in out.enumerate_pixels_mut() {
        let sx = rect.x1 + ox as i64;
        let sy = rect.y1 + oy as i64;
        if sx >= 0 && sx < w && sy >= 0 && sy < h {
            *pixel = *image.get_pixel(sx as u32, sy as u32);
        }
    }

    out
}
