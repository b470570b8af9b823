/// Template matching data types
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use std::borrow::Cow;
use std::fmt;
use std::io::Cursor;
use std::sync::Arc;

/// Outcome code of a single locate call. `0` means found, anything else is a miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MatchStatus {
    Found = 0,
    /// Best candidate scored under the acceptance threshold
    BelowThreshold = 1,
    /// Template does not fit inside the screenshot
    TemplateTooLarge = 2,
    /// Template or screenshot has a zero dimension
    EmptyImage = 3,
}

impl MatchStatus {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn is_found(self) -> bool {
        self == MatchStatus::Found
    }
}

/// Reference picture searched for on screen.
///
/// Keeps the encoded bytes (for export) next to the decoded grayscale pixels
/// used by the matcher. Cloning is cheap.
#[derive(Clone)]
pub struct Template {
    bytes: Arc<[u8]>,
    gray: Arc<GrayImage>,
}

impl Template {
    /// Decode an encoded image (PNG, JPEG, ...) held in memory
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, image::ImageError> {
        let decoded = image::load_from_memory(&bytes)?;
        Ok(Self {
            gray: Arc::new(decoded.to_luma8()),
            bytes: bytes.into(),
        })
    }

    /// Build a template from pixels, storing a PNG encoding of them
    pub fn from_image(image: &DynamicImage) -> Result<Self, image::ImageError> {
        // PNG has no float pixel layout
        let pixels = match image {
            DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
                Cow::Owned(DynamicImage::ImageRgba8(image.to_rgba8()))
            }
            _ => Cow::Borrowed(image),
        };
        let mut encoded = Cursor::new(Vec::new());
        pixels.write_to(&mut encoded, ImageFormat::Png)?;
        Ok(Self {
            gray: Arc::new(image.to_luma8()),
            bytes: encoded.into_inner().into(),
        })
    }

    /// Encoded image bytes as supplied or produced at construction
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn gray(&self) -> &GrayImage {
        &self.gray
    }

    pub fn width(&self) -> u32 {
        self.gray.width()
    }

    pub fn height(&self) -> u32 {
        self.gray.height()
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("encoded_len", &self.bytes.len())
            .finish()
    }
}

impl PartialEq for Template {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

/// Result of one locate call
#[derive(Clone, Debug)]
pub struct MatchResult {
    pub status: MatchStatus,
    /// Top-left corner of the best candidate in screenshot pixels
    pub top_left: (u32, u32),
    /// Exclusive bottom-right corner (`top_left + template size`)
    pub bottom_right: (u32, u32),
    /// Zero-mean correlation of the best candidate (0.0-1.0)
    pub confidence: f32,
    /// Annotated screenshot, only present in debug mode
    pub visualization: Option<RgbImage>,
}

impl MatchResult {
    pub(crate) fn failed(status: MatchStatus) -> Self {
        Self {
            status,
            top_left: (0, 0),
            bottom_right: (0, 0),
            confidence: 0.0,
            visualization: None,
        }
    }

    pub fn is_found(&self) -> bool {
        self.status.is_found()
    }

    pub fn width(&self) -> u32 {
        self.bottom_right.0.saturating_sub(self.top_left.0)
    }

    pub fn height(&self) -> u32 {
        self.bottom_right.1.saturating_sub(self.top_left.1)
    }

    /// Pixel inside the box at normalized `offset`, truncated toward the top-left.
    /// `(0.5, 0.5)` is the center.
    pub fn point_at(&self, offset: (f32, f32)) -> (u32, u32) {
        let dx = (self.width() as f64 * offset.0 as f64) as u32;
        let dy = (self.height() as f64 * offset.1 as f64) as u32;
        (self.top_left.0 + dx, self.top_left.1 + dy)
    }

    /// Format match as string with confidence percentage
    pub fn describe(&self) -> String {
        let confidence_pct = (self.confidence * 100.0) as u32;
        if self.is_found() {
            format!(
                "({},{})-({},{}) - {}%",
                self.top_left.0, self.top_left.1, self.bottom_right.0, self.bottom_right.1, confidence_pct
            )
        } else {
            format!("no match (status {}, best {}%)", self.status.code(), confidence_pct)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn found_at(x: u32, y: u32, w: u32, h: u32) -> MatchResult {
        MatchResult {
            status: MatchStatus::Found,
            top_left: (x, y),
            bottom_right: (x + w, y + h),
            confidence: 0.99,
            visualization: None,
        }
    }

    #[test]
    fn test_point_at_center() {
        let result = found_at(100, 100, 40, 40);
        assert_eq!(result.point_at((0.5, 0.5)), (120, 120));
    }

    #[test]
    fn test_point_at_corners() {
        let result = found_at(10, 20, 50, 30);
        assert_eq!(result.point_at((0.0, 0.0)), (10, 20));
        assert_eq!(result.point_at((1.0, 1.0)), (60, 50));
        // 50 * 0.25 = 12.5 truncates to 12
        assert_eq!(result.point_at((0.25, 0.5)), (22, 35));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(MatchStatus::Found.code(), 0);
        assert_ne!(MatchStatus::BelowThreshold.code(), 0);
        assert_ne!(MatchStatus::TemplateTooLarge.code(), 0);
        assert_ne!(MatchStatus::EmptyImage.code(), 0);
    }

    #[test]
    fn test_template_from_image_roundtrips_bytes() {
        let image = DynamicImage::ImageLuma8(GrayImage::from_fn(6, 4, |x, y| {
            image::Luma([(x * 40 + y * 10) as u8])
        }));
        let template = Template::from_image(&image).unwrap();
        assert_eq!((template.width(), template.height()), (6, 4));

        let reloaded = Template::from_bytes(template.bytes().to_vec()).unwrap();
        assert_eq!(reloaded.gray(), template.gray());
        assert_eq!(reloaded, template);
    }

    #[test]
    fn test_template_rejects_garbage() {
        assert!(Template::from_bytes(b"definitely not a png".to_vec()).is_err());
    }
}
