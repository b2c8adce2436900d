//! Image I/O operations service
//!
//! This module separates file I/O operations from the compositing logic,
//! making the replacer and session testable with in-memory images.

use crate::{
    config::OutputFormat,
    error::{BackdropError, Result},
};
use image::{codecs::jpeg::JpegEncoder, RgbImage};
use std::io::Cursor;
use std::path::Path;

/// Service for handling image file input/output operations
#[derive(Debug)]
pub struct ImageIOService;

impl ImageIOService {
    /// Load an image from a file path as 8-bit RGB
    ///
    /// The format is taken from the extension first; if that fails the
    /// content is sniffed, so mislabelled files still load.
    ///
    /// # Examples
    /// ```rust,no_run
    /// use idphoto_backdrop::services::ImageIOService;
    ///
    /// let image = ImageIOService::load_image("portrait.jpg")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    ///
    /// # Errors
    /// - File missing or unreadable
    /// - Content is not a decodable image
    pub fn load_image<P: AsRef<Path>>(path: P) -> Result<RgbImage> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(BackdropError::file_io_error(
                "read image file",
                path_ref,
                &std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist"),
            ));
        }

        match image::open(path_ref) {
            Ok(img) => Ok(img.to_rgb8()),
            Err(e) => {
                log::debug!(
                    "Extension-based loading failed for {}: {}. Attempting content-based detection.",
                    path_ref.display(),
                    e
                );

                let data = std::fs::read(path_ref).map_err(|io_err| {
                    BackdropError::file_io_error("read image data", path_ref, &io_err)
                })?;

                image::load_from_memory(&data)
                    .map(|img| img.to_rgb8())
                    .map_err(|content_err| {
                        let extension = path_ref
                            .extension()
                            .and_then(|s| s.to_str())
                            .unwrap_or("unknown");

                        BackdropError::processing_stage_error(
                            "image loading",
                            &format!(
                                "Failed to load image with both extension-based ({}) and content-based detection. Extension error: {}. Content error: {}",
                                extension, e, content_err
                            ),
                            Some(&format!("path: {}, size: {} bytes", path_ref.display(), data.len())),
                        )
                    })
            },
        }
    }

    /// Decode an image held in memory
    ///
    /// # Errors
    /// - Bytes are not a decodable image
    pub fn load_from_bytes(bytes: &[u8]) -> Result<RgbImage> {
        image::load_from_memory(bytes)
            .map(|img| img.to_rgb8())
            .map_err(|e| {
                BackdropError::processing(format!("Failed to decode image from bytes: {}", e))
            })
    }

    /// Save an image in the given format, creating parent directories
    ///
    /// # Examples
    /// ```rust,no_run
    /// use idphoto_backdrop::{services::ImageIOService, OutputFormat};
    /// use image::RgbImage;
    ///
    /// # let image = RgbImage::new(100, 100);
    /// ImageIOService::save_image(&image, "output.jpg", OutputFormat::Jpeg, 90)?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    ///
    /// # Errors
    /// - Output directory cannot be created
    /// - Encoding or writing fails
    pub fn save_image<P: AsRef<Path>>(
        image: &RgbImage,
        path: P,
        format: OutputFormat,
        jpeg_quality: u8,
    ) -> Result<()> {
        let path_ref = path.as_ref();

        if let Some(parent) = path_ref.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    BackdropError::file_io_error("create output directory", parent, &e)
                })?;
            }
        }

        let bytes = Self::encode_image(image, format, jpeg_quality)?;
        std::fs::write(path_ref, bytes)
            .map_err(|e| BackdropError::file_io_error("write image", path_ref, &e))?;

        log::debug!(
            "Saved {}x{} {:?} image to {}",
            image.width(),
            image.height(),
            format,
            path_ref.display()
        );
        Ok(())
    }

    /// Encode an image into memory
    ///
    /// # Errors
    /// - Encoder failure (e.g. zero-sized image)
    pub fn encode_image(image: &RgbImage, format: OutputFormat, jpeg_quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        match format {
            OutputFormat::Png => {
                let mut cursor = Cursor::new(&mut buffer);
                image
                    .write_to(&mut cursor, image::ImageFormat::Png)
                    .map_err(|e| {
                        BackdropError::processing(format!("Failed to encode PNG: {}", e))
                    })?;
            },
            OutputFormat::Jpeg => {
                let quality = jpeg_quality.clamp(1, 100);
                let mut jpeg_encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
                jpeg_encoder.encode_image(image).map_err(|e| {
                    BackdropError::processing(format!("Failed to encode JPEG: {}", e))
                })?;
            },
        }
        Ok(buffer)
    }

    /// Check if a file path has a supported image extension
    pub fn is_supported_format<P: AsRef<Path>>(path: P) -> bool {
        OutputFormat::from_path(path.as_ref()).is_ok()
    }
}
