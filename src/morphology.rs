//! Binary morphology and connected-component labelling on masks
//!
//! Square elements with odd sides map onto `imageproc`'s chessboard-distance
//! operators: iterating a `(2r+1)`-square element `n` times equals a single
//! pass with radius `r*n`. Rectangular elements with an even side have no
//! symmetric center, so they are applied here directly with the anchor at cell
//! `(w/2, h/2)`. In both cases pixels outside the image never contribute.

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::distance_transform::Norm;
use imageproc::region_labelling::{connected_components, Connectivity};

use crate::types::{BACKGROUND, FOREGROUND};

/// Morphological closing with a square element of the given radius
#[must_use]
pub fn close_square(image: &GrayImage, radius: u8) -> GrayImage {
    if radius == 0 {
        return image.clone();
    }
    let dilated = imageproc::morphology::dilate(image, Norm::LInf, radius);
    // Erosion finds no background to measure from once dilation fills the
    // image and clears it; ignoring the border, a full image erodes to itself.
    if dilated.as_raw().iter().all(|&v| v != BACKGROUND) {
        return dilated;
    }
    imageproc::morphology::erode(&dilated, Norm::LInf, radius)
}

/// Dilate a binary image with a `kernel_width` x `kernel_height` rectangle, `iterations` times
///
/// The element covers offsets `-w/2 ..= w-1-w/2` horizontally (likewise
/// vertically), so a 10-wide element reaches 5 pixels left and 4 right.
#[must_use]
pub fn dilate_rect(
    image: &GrayImage,
    kernel_width: u32,
    kernel_height: u32,
    iterations: u32,
) -> GrayImage {
    let mut current = image.clone();
    if kernel_width == 0 || kernel_height == 0 {
        return current;
    }
    let horizontal = span(kernel_width);
    let vertical = span(kernel_height);
    for _ in 0..iterations {
        current = dilate_rows(&current, horizontal);
        current = transpose(&dilate_rows(&transpose(&current), vertical));
    }
    current
}

/// Offsets (before, after) covered by an element of the given side length
fn span(size: u32) -> (u32, u32) {
    let anchor = size / 2;
    (anchor, size - 1 - anchor)
}

/// One-dimensional dilation along rows using a running foreground count
fn dilate_rows(image: &GrayImage, (before, after): (u32, u32)) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut out = GrayImage::new(width, height);
    let mut prefix = vec![0u32; width as usize + 1];
    for y in 0..height {
        for x in 0..width {
            let set = u32::from(image.get_pixel(x, y)[0] != BACKGROUND);
            let idx = x as usize;
            prefix[idx + 1] = prefix[idx] + set;
        }
        for x in 0..width {
            // Output at x sees inputs x - before ..= x + after
            let lo = x.saturating_sub(before) as usize;
            let hi = (x.saturating_add(after)).min(width - 1) as usize;
            if prefix[hi + 1] > prefix[lo] {
                out.put_pixel(x, y, Luma([FOREGROUND]));
            }
        }
    }
    out
}

fn transpose(image: &GrayImage) -> GrayImage {
    let (width, height) = image.dimensions();
    ImageBuffer::from_fn(height, width, |x, y| *image.get_pixel(y, x))
}

/// Connected foreground regions of a binary image
#[derive(Debug, Clone)]
pub struct ComponentLabels {
    labels: ImageBuffer<Luma<u32>, Vec<u32>>,
    /// Pixel count per label; index 0 is the background
    areas: Vec<u64>,
    /// Pixel count per label within rows `0..height/2`
    top_half_areas: Vec<u64>,
}

impl ComponentLabels {
    /// Label 8-connected foreground regions
    #[must_use]
    pub fn label(image: &GrayImage) -> Self {
        let labels = connected_components(image, Connectivity::Eight, Luma([BACKGROUND]));
        let max_label = labels.pixels().map(|p| p[0]).max().unwrap_or(0) as usize;
        let mut areas = vec![0u64; max_label + 1];
        let mut top_half_areas = vec![0u64; max_label + 1];
        let top_half_rows = image.height() / 2;
        for (_, y, pixel) in labels.enumerate_pixels() {
            let label = pixel[0] as usize;
            if label == 0 {
                continue;
            }
            if let Some(area) = areas.get_mut(label) {
                *area += 1;
            }
            if y < top_half_rows {
                if let Some(area) = top_half_areas.get_mut(label) {
                    *area += 1;
                }
            }
        }
        Self {
            labels,
            areas,
            top_half_areas,
        }
    }

    /// Number of foreground components
    #[must_use]
    pub fn count(&self) -> usize {
        self.areas.len().saturating_sub(1)
    }

    /// Pixel count of a component (labels start at 1)
    #[must_use]
    pub fn area(&self, label: u32) -> u64 {
        self.areas.get(label as usize).copied().unwrap_or(0)
    }

    /// Pixel count of a component within the top half of the image
    #[must_use]
    pub fn top_half_area(&self, label: u32) -> u64 {
        self.top_half_areas.get(label as usize).copied().unwrap_or(0)
    }

    /// Labels of all components, ascending
    pub fn labels(&self) -> impl Iterator<Item = u32> + '_ {
        (1..self.areas.len()).map(|l| l as u32)
    }

    /// Binary image containing only the given component
    #[must_use]
    pub fn isolate(&self, label: u32) -> GrayImage {
        let (width, height) = self.labels.dimensions();
        ImageBuffer::from_fn(width, height, |x, y| {
            if label != 0 && self.labels.get_pixel(x, y)[0] == label {
                Luma([FOREGROUND])
            } else {
                Luma([BACKGROUND])
            }
        })
    }
}
