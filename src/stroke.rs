//! User-drawn strokes and their conversion to a manual foreground mask

use crate::{
    config::StrokeConfig,
    error::{BackdropError, Result},
    morphology::dilate_rect,
    types::{Mask, FOREGROUND},
};
use image::{GrayImage, Luma};
use imageproc::drawing::{draw_filled_circle_mut, BresenhamLineIter};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A point in original-image pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// Ordered polyline accumulated while drawing is enabled
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrokePath {
    points: Vec<Point>,
}

impl StrokePath {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_points(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Read a path from JSON of the form `{"points": [{"x": 1, "y": 2}, ...]}`
    ///
    /// # Errors
    /// - File cannot be read or is not a valid stroke document
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| BackdropError::file_io_error("read stroke file", path, &e))?;
        serde_json::from_str(&content).map_err(|e| {
            BackdropError::invalid_input(format!(
                "Failed to parse stroke file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    pub fn push(&mut self, point: Point) {
        self.points.push(point);
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Draw the polyline into a `width` x `height` mask and thicken it by dilation
    ///
    /// Paths with fewer than two points produce an empty mask. Parts of the
    /// path outside the image are clipped.
    #[must_use]
    pub fn rasterize(&self, width: u32, height: u32, config: &StrokeConfig) -> Mask {
        if self.points.len() < 2 {
            return Mask::empty(width, height);
        }

        let mut canvas = GrayImage::new(width, height);
        let radius = (config.thickness / 2) as i32;
        for segment in self.points.windows(2) {
            let [start, end] = segment else { continue };
            let line = BresenhamLineIter::new(
                (start.x as f32, start.y as f32),
                (end.x as f32, end.y as f32),
            );
            for (x, y) in line {
                stamp(&mut canvas, x, y, radius);
            }
        }

        let dilated = dilate_rect(
            &canvas,
            config.dilation_kernel_size,
            config.dilation_kernel_size,
            config.dilation_iterations,
        );
        Mask::from_image(&dilated)
    }
}

/// Paint a filled disc, giving segments round caps and a width of `2 * radius + 1`
fn stamp(canvas: &mut GrayImage, x: i32, y: i32, radius: i32) {
    if radius > 0 {
        draw_filled_circle_mut(canvas, (x, y), radius, Luma([FOREGROUND]));
        return;
    }
    if let (Ok(ux), Ok(uy)) = (u32::try_from(x), u32::try_from(y)) {
        if ux < canvas.width() && uy < canvas.height() {
            canvas.put_pixel(ux, uy, Luma([FOREGROUND]));
        }
    }
}
