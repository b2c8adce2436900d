//! Core types for background replacement operations

use crate::{
    config::OutputFormat,
    error::{BackdropError, Result},
    gradient::GradientPreset,
    services::ImageIOService,
};
use chrono::{DateTime, Utc};
use image::{GrayImage, ImageBuffer, Luma, RgbImage};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Mask value for foreground (subject) pixels
pub const FOREGROUND: u8 = 255;

/// Mask value for background pixels
pub const BACKGROUND: u8 = 0;

/// Binary foreground mask, one byte per pixel, every value either 0 or 255
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawMask")]
pub struct Mask {
    data: Vec<u8>,
    dimensions: (u32, u32),
}

/// Serialized form of [`Mask`], checked by [`Mask::from_raw`] on the way in
#[derive(Deserialize)]
struct RawMask {
    data: Vec<u8>,
    dimensions: (u32, u32),
}

impl TryFrom<RawMask> for Mask {
    type Error = BackdropError;

    fn try_from(raw: RawMask) -> Result<Self> {
        Self::from_raw(raw.data, raw.dimensions)
    }
}

impl Mask {
    /// Create an all-background mask
    #[must_use]
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            data: vec![BACKGROUND; (width as usize) * (height as usize)],
            dimensions: (width, height),
        }
    }

    /// Create an all-foreground mask
    #[must_use]
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            data: vec![FOREGROUND; (width as usize) * (height as usize)],
            dimensions: (width, height),
        }
    }

    /// Create a mask from raw row-major data, binarizing every nonzero value to 255
    pub fn from_raw(data: Vec<u8>, dimensions: (u32, u32)) -> Result<Self> {
        let expected = (dimensions.0 as usize) * (dimensions.1 as usize);
        if data.len() != expected {
            return Err(BackdropError::invalid_input(format!(
                "Mask data has {} bytes, expected {} for {}x{}",
                data.len(),
                expected,
                dimensions.0,
                dimensions.1
            )));
        }
        let data = data.into_iter().map(binarize).collect();
        Ok(Self { data, dimensions })
    }

    /// Create a mask from a grayscale image; any nonzero pixel becomes foreground
    #[must_use]
    pub fn from_image(image: &GrayImage) -> Self {
        Self {
            data: image.as_raw().iter().copied().map(binarize).collect(),
            dimensions: image.dimensions(),
        }
    }

    /// Convert the mask to a grayscale image
    #[must_use]
    pub fn to_image(&self) -> GrayImage {
        let (width, height) = self.dimensions;
        ImageBuffer::from_fn(width, height, |x, y| Luma([self.value(x, y)]))
    }

    /// Mask dimensions as (width, height)
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.dimensions.0
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.dimensions.1
    }

    /// Raw mask bytes in row-major order
    #[must_use]
    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    /// Mask value at (x, y); coordinates outside the mask read as background
    #[must_use]
    pub fn value(&self, x: u32, y: u32) -> u8 {
        if x >= self.dimensions.0 || y >= self.dimensions.1 {
            return BACKGROUND;
        }
        let index = (y as usize) * (self.dimensions.0 as usize) + x as usize;
        self.data.get(index).copied().unwrap_or(BACKGROUND)
    }

    #[must_use]
    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        self.value(x, y) == FOREGROUND
    }

    /// Pixel-wise OR of two masks of identical dimensions
    pub fn combine(&self, other: &Mask) -> Result<Mask> {
        if self.dimensions != other.dimensions {
            return Err(BackdropError::dimension_mismatch(
                "Mask",
                self.dimensions,
                other.dimensions,
            ));
        }
        let data = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| a | b)
            .collect();
        Ok(Mask {
            data,
            dimensions: self.dimensions,
        })
    }

    /// Number of foreground pixels
    #[must_use]
    pub fn foreground_pixels(&self) -> usize {
        self.data.iter().filter(|&&v| v == FOREGROUND).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.foreground_pixels() == 0
    }

    /// Smallest rectangle containing every foreground pixel, as (min_x, min_y, max_x, max_y)
    #[must_use]
    pub fn bounding_box(&self) -> Option<(u32, u32, u32, u32)> {
        let (width, height) = self.dimensions;
        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for y in 0..height {
            for x in 0..width {
                if !self.is_foreground(x, y) {
                    continue;
                }
                bounds = Some(match bounds {
                    None => (x, y, x, y),
                    Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
                });
            }
        }
        bounds
    }

    /// Get mask statistics
    #[must_use]
    pub fn statistics(&self) -> MaskStatistics {
        let total_pixels = self.data.len();
        let foreground_pixels = self.foreground_pixels();
        let foreground_ratio = if total_pixels == 0 {
            0.0
        } else {
            foreground_pixels as f32 / total_pixels as f32
        };
        MaskStatistics {
            total_pixels,
            foreground_pixels,
            background_pixels: total_pixels - foreground_pixels,
            foreground_ratio,
        }
    }

    /// Save mask as PNG
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.to_image()
            .save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }
}

fn binarize(value: u8) -> u8 {
    if value == BACKGROUND {
        BACKGROUND
    } else {
        FOREGROUND
    }
}

/// Statistics about a foreground mask
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskStatistics {
    pub total_pixels: usize,
    pub foreground_pixels: usize,
    pub background_pixels: usize,
    pub foreground_ratio: f32,
}

/// Per-pixel foreground probabilities produced by a segmentation backend
///
/// Stored as an `Array2<f32>` indexed `[y, x]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityMap {
    values: Array2<f32>,
}

impl ProbabilityMap {
    /// Wrap an array of shape (height, width)
    #[must_use]
    pub fn new(values: Array2<f32>) -> Self {
        Self { values }
    }

    /// Map where every pixel has the same probability
    #[must_use]
    pub fn uniform(width: u32, height: u32, probability: f32) -> Self {
        Self::new(Array2::from_elem(
            (height as usize, width as usize),
            probability,
        ))
    }

    /// Build a map by evaluating `f(x, y)` for every pixel
    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> f32,
    {
        Self::new(Array2::from_shape_fn(
            (height as usize, width as usize),
            |(y, x)| f(x as u32, y as u32),
        ))
    }

    /// Interpret a grayscale image as probabilities (`value / 255`)
    #[must_use]
    pub fn from_gray_image(image: &GrayImage) -> Self {
        Self::from_fn(image.width(), image.height(), |x, y| {
            f32::from(image.get_pixel(x, y)[0]) / 255.0
        })
    }

    /// Build from row-major values
    pub fn from_raw(width: u32, height: u32, values: Vec<f32>) -> Result<Self> {
        Array2::from_shape_vec((height as usize, width as usize), values)
            .map(Self::new)
            .map_err(|e| {
                BackdropError::invalid_input(format!(
                    "Probability data does not fit {}x{}: {}",
                    width, height, e
                ))
            })
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.values.ncols() as u32
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.values.nrows() as u32
    }

    /// Map dimensions as (width, height)
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    /// Probability at (x, y); out-of-range coordinates read as 0.0
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.values
            .get((y as usize, x as usize))
            .copied()
            .unwrap_or(0.0)
    }

    #[must_use]
    pub fn values(&self) -> &Array2<f32> {
        &self.values
    }

    /// Resample to new dimensions with bilinear filtering
    #[must_use]
    pub fn resize(&self, width: u32, height: u32) -> Self {
        if self.dimensions() == (width, height) {
            return self.clone();
        }
        let source: ImageBuffer<Luma<f32>, Vec<f32>> =
            ImageBuffer::from_fn(self.width(), self.height(), |x, y| Luma([self.get(x, y)]));
        let resized = image::imageops::resize(
            &source,
            width,
            height,
            image::imageops::FilterType::Triangle,
        );
        Self::from_fn(width, height, |x, y| resized.get_pixel(x, y)[0])
    }
}

/// Timing breakdown for a single background change
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingTimings {
    /// Backend initialization (first call only)
    pub model_load_ms: u64,
    /// Segmentation backend call
    pub segmentation_ms: u64,
    /// Threshold, closing and component selection
    pub mask_extraction_ms: u64,
    /// Gradient generation and compositing
    pub compositing_ms: u64,
    /// Total end-to-end processing time
    pub total_ms: u64,
}

impl ProcessingTimings {
    /// Time not attributed to any measured stage
    #[must_use]
    pub fn other_overhead_ms(&self) -> u64 {
        let measured = self.model_load_ms
            + self.segmentation_ms
            + self.mask_extraction_ms
            + self.compositing_ms;
        self.total_ms.saturating_sub(measured)
    }

    /// Get timing summary for display
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Total: {}ms | Model load: {}ms | Segmentation: {}ms | Mask: {}ms | Compositing: {}ms",
            self.total_ms,
            self.model_load_ms,
            self.segmentation_ms,
            self.mask_extraction_ms,
            self.compositing_ms
        )
    }
}

/// Metadata about a background change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingMetadata {
    /// Name of the segmentation backend that produced the probability map
    pub backend_name: String,
    /// Gradient preset painted behind the subject
    pub background: GradientPreset,
    /// Whether a user-drawn mask was merged in
    pub manual_mask_applied: bool,
    /// Statistics of the final combined mask
    pub mask_statistics: MaskStatistics,
    /// Stage timings
    pub timings: ProcessingTimings,
    /// When processing finished
    pub processed_at: DateTime<Utc>,
}

/// Result of a background change
#[derive(Debug, Clone)]
pub struct ReplacementResult {
    /// The composited image
    pub image: RgbImage,
    /// The combined mask that selected source pixels
    pub mask: Mask,
    /// Processing metadata
    pub metadata: ProcessingMetadata,
}

impl ReplacementResult {
    /// Image dimensions
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Save the composited image; the format follows the path's extension
    pub fn save<P: AsRef<Path>>(&self, path: P, jpeg_quality: u8) -> Result<()> {
        let format = OutputFormat::from_path(path.as_ref())?;
        ImageIOService::save_image(&self.image, path, format, jpeg_quality)
    }

    /// Encode the composited image into memory
    pub fn to_bytes(&self, format: OutputFormat, jpeg_quality: u8) -> Result<Vec<u8>> {
        ImageIOService::encode_image(&self.image, format, jpeg_quality)
    }

    /// Metadata as pretty-printed JSON
    pub fn metadata_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.metadata).map_err(|e| {
            BackdropError::processing(format!("Failed to serialize metadata: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_from_rows(rows: &[&[u8]]) -> Mask {
        let height = rows.len() as u32;
        let width = rows.first().map_or(0, |r| r.len()) as u32;
        let data = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Mask::from_raw(data, (width, height)).unwrap()
    }

    #[test]
    fn test_deserialize_goes_through_from_raw() {
        let mask: Mask = serde_json::from_str(r#"{"data": [0, 7, 255, 0], "dimensions": [2, 2]}"#).unwrap();
        assert_eq!(mask.as_raw(), &[0, 255, 255, 0]);
        assert_eq!(mask.foreground_pixels(), 2);

        let short = serde_json::from_str::<Mask>(r#"{"data": [0, 255], "dimensions": [2, 2]}"#);
        assert!(short.unwrap_err().to_string().contains("expected 4"));

        let json = serde_json::to_string(&Mask::full(3, 1)).unwrap();
        assert_eq!(serde_json::from_str::<Mask>(&json).unwrap(), Mask::full(3, 1));
    }

    #[test]
    fn test_from_raw_binarizes() {
        let mask = Mask::from_raw(vec![0, 1, 128, 255], (2, 2)).unwrap();
        assert_eq!(mask.as_raw(), &[0, 255, 255, 255]);
    }

    #[test]
    fn test_from_raw_rejects_wrong_length() {
        let result = Mask::from_raw(vec![0; 5], (2, 2));
        assert!(matches!(result, Err(BackdropError::InvalidInput(_))));
    }

    #[test]
    fn test_combine_is_commutative_and_idempotent() {
        let a = mask_from_rows(&[&[255, 0, 0], &[0, 255, 0]]);
        let b = mask_from_rows(&[&[0, 0, 255], &[0, 255, 0]]);

        assert_eq!(a.combine(&a).unwrap(), a);
        assert_eq!(a.combine(&b).unwrap(), b.combine(&a).unwrap());
        assert_eq!(
            a.combine(&b).unwrap().as_raw(),
            &[255, 0, 255, 0, 255, 0]
        );
    }

    #[test]
    fn test_combine_rejects_mismatched_dimensions() {
        let a = Mask::empty(4, 4);
        let b = Mask::empty(4, 5);
        assert!(matches!(a.combine(&b), Err(BackdropError::InvalidInput(_))));
    }

    #[test]
    fn test_bounding_box_and_statistics() {
        let mask = mask_from_rows(&[&[0, 0, 0, 0], &[0, 255, 255, 0], &[0, 0, 255, 0]]);
        assert_eq!(mask.bounding_box(), Some((1, 1, 2, 2)));

        let stats = mask.statistics();
        assert_eq!(stats.total_pixels, 12);
        assert_eq!(stats.foreground_pixels, 3);
        assert_eq!(stats.background_pixels, 9);
        assert!((stats.foreground_ratio - 0.25).abs() < f32::EPSILON);

        assert_eq!(Mask::empty(3, 3).bounding_box(), None);
    }

    #[test]
    fn test_mask_image_conversion() {
        let mut gray = GrayImage::new(3, 2);
        gray.put_pixel(1, 0, Luma([7]));
        let mask = Mask::from_image(&gray);
        assert!(mask.is_foreground(1, 0));
        assert!(!mask.is_foreground(0, 0));
        assert!(!mask.is_foreground(10, 10));
        assert_eq!(mask.to_image().get_pixel(1, 0)[0], 255);
    }

    #[test]
    fn test_probability_map_accessors() {
        let map = ProbabilityMap::from_fn(4, 3, |x, y| (x + y) as f32 / 10.0);
        assert_eq!(map.dimensions(), (4, 3));
        assert!((map.get(3, 2) - 0.5).abs() < f32::EPSILON);
        assert_eq!(map.get(4, 0), 0.0);

        let gray = GrayImage::from_pixel(2, 2, Luma([255]));
        let map = ProbabilityMap::from_gray_image(&gray);
        assert!((map.get(1, 1) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_probability_map_resize_keeps_uniform_values() {
        let map = ProbabilityMap::uniform(8, 6, 0.5);
        let resized = map.resize(20, 10);
        assert_eq!(resized.dimensions(), (20, 10));
        assert!(resized.values().iter().all(|&v| (v - 0.5).abs() < 1e-5));
    }

    #[test]
    fn test_from_raw_probability_shape_error() {
        let result = ProbabilityMap::from_raw(3, 3, vec![0.0; 4]);
        assert!(matches!(result, Err(BackdropError::InvalidInput(_))));
    }

    #[test]
    fn test_timing_overhead() {
        let timings = ProcessingTimings {
            model_load_ms: 10,
            segmentation_ms: 20,
            mask_extraction_ms: 5,
            compositing_ms: 5,
            total_ms: 50,
        };
        assert_eq!(timings.other_overhead_ms(), 10);
        assert!(timings.summary().contains("Segmentation: 20ms"));
    }
}
