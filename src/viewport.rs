//! Mapping between display (widget) coordinates and image coordinates
//!
//! A front end shows the current image scaled to fit its widget while
//! keeping the aspect ratio, centered with letterbox bars. Strokes are drawn
//! in widget coordinates but stored in image coordinates.

use crate::stroke::Point;
use serde::{Deserialize, Serialize};

/// Rectangle occupied by the scaled image inside the widget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Aspect-preserving fit of an image into a widget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayMapping {
    rect: DisplayRect,
    image_size: (u32, u32),
}

impl DisplayMapping {
    /// Fit `image_size` into `widget_size`, both as (width, height)
    ///
    /// The scaled size is computed with integer arithmetic: full widget
    /// height if the resulting width fits, otherwise full widget width.
    /// Returns `None` when any dimension (input or scaled) is zero.
    #[must_use]
    pub fn fit(widget_size: (u32, u32), image_size: (u32, u32)) -> Option<Self> {
        let (widget_w, widget_h) = widget_size;
        let (image_w, image_h) = image_size;
        if widget_w == 0 || widget_h == 0 || image_w == 0 || image_h == 0 {
            return None;
        }

        let width_at_full_height = u64::from(widget_h) * u64::from(image_w) / u64::from(image_h);
        let (width, height) = if width_at_full_height <= u64::from(widget_w) {
            (width_at_full_height as u32, widget_h)
        } else {
            let height = u64::from(widget_w) * u64::from(image_h) / u64::from(image_w);
            (widget_w, height as u32)
        };
        if width == 0 || height == 0 {
            return None;
        }

        let x = ((i64::from(widget_w) - i64::from(width)) / 2) as i32;
        let y = ((i64::from(widget_h) - i64::from(height)) / 2) as i32;
        Some(Self {
            rect: DisplayRect {
                x,
                y,
                width,
                height,
            },
            image_size,
        })
    }

    #[must_use]
    pub fn rect(&self) -> DisplayRect {
        self.rect
    }

    #[must_use]
    pub fn image_size(&self) -> (u32, u32) {
        self.image_size
    }

    /// Map a widget position to image coordinates, truncating toward zero
    ///
    /// Positions in the letterbox bars map outside the image; rasterization
    /// clips them.
    #[must_use]
    pub fn to_image(&self, x: i32, y: i32) -> Point {
        let scale_x = f64::from(self.image_size.0) / f64::from(self.rect.width);
        let scale_y = f64::from(self.image_size.1) / f64::from(self.rect.height);
        Point::new(
            (f64::from(x - self.rect.x) * scale_x) as i32,
            (f64::from(y - self.rect.y) * scale_y) as i32,
        )
    }

    /// Map an image point back to widget coordinates
    #[must_use]
    pub fn to_display(&self, point: Point) -> (i32, i32) {
        let scale_x = f64::from(self.rect.width) / f64::from(self.image_size.0);
        let scale_y = f64::from(self.rect.height) / f64::from(self.image_size.1);
        (
            (f64::from(point.x) * scale_x + f64::from(self.rect.x)) as i32,
            (f64::from(point.y) * scale_y + f64::from(self.rect.y)) as i32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pillarboxed_fit() {
        let mapping = DisplayMapping::fit((800, 600), (400, 600)).unwrap();
        assert_eq!(
            mapping.rect(),
            DisplayRect {
                x: 200,
                y: 0,
                width: 400,
                height: 600
            }
        );
        assert_eq!(mapping.to_image(200, 0), Point::new(0, 0));
        assert_eq!(mapping.to_image(399, 123), Point::new(199, 123));
    }

    #[test]
    fn test_letterboxed_fit_and_round_trip() {
        let mapping = DisplayMapping::fit((800, 600), (1600, 600)).unwrap();
        assert_eq!(
            mapping.rect(),
            DisplayRect {
                x: 0,
                y: 150,
                width: 800,
                height: 300
            }
        );

        let point = mapping.to_image(400, 300);
        assert_eq!(point, Point::new(800, 300));
        assert_eq!(mapping.to_display(point), (400, 300));

        for (x, y) in [(0, 150), (10, 160), (799, 449), (123, 321)] {
            let back = mapping.to_display(mapping.to_image(x, y));
            assert_eq!(back, (x, y));
        }
    }

    #[test]
    fn test_downscaled_round_trip_stays_within_one_image_pixel() {
        // 3000x2000 shown in 640x480: one display pixel covers several image pixels
        let mapping = DisplayMapping::fit((640, 480), (3000, 2000)).unwrap();
        let rect = mapping.rect();
        assert_eq!((rect.width, rect.height), (640, 426));
        for (x, y) in [(0, rect.y), (320, 240), (639, rect.y + 425)] {
            let image_point = mapping.to_image(x, y);
            let (dx, dy) = mapping.to_display(image_point);
            assert!((dx - x).abs() <= 1 && (dy - y).abs() <= 1);
        }
    }

    #[test]
    fn test_truncates_toward_zero_in_bars() {
        let mapping = DisplayMapping::fit((800, 600), (400, 600)).unwrap();
        // Left bar maps to negative x
        assert_eq!(mapping.to_image(199, 0).x, -1);
        assert_eq!(mapping.to_image(0, 0).x, -200);

        // Half-scale display: -3 display pixels is -1.5 image pixels, truncated to -1
        let mapping = DisplayMapping::fit((200, 100), (100, 50)).unwrap();
        assert_eq!(mapping.rect().width, 200);
        assert_eq!(mapping.to_image(-3, 3), Point::new(-1, 1));

        let mapping = DisplayMapping::fit((50, 100), (100, 50)).unwrap();
        assert_eq!(
            mapping.rect(),
            DisplayRect {
                x: 0,
                y: 37,
                width: 50,
                height: 25
            }
        );
        assert_eq!(mapping.to_image(0, 36), Point::new(0, -2));
    }

    #[test]
    fn test_zero_sizes() {
        assert!(DisplayMapping::fit((0, 600), (400, 600)).is_none());
        assert!(DisplayMapping::fit((800, 600), (400, 0)).is_none());
        // Extremely thin image scales to zero width
        assert!(DisplayMapping::fit((10, 10), (1, 1000)).is_none());
    }
}
