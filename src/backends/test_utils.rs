//! Test utilities and mock backends for testing segmentation functionality
//!
//! This module provides mock implementations of the `SegmentationBackend`
//! trait so the replacer and session can be tested without model files.

use crate::{
    error::{BackdropError, Result},
    segmentation::SegmentationBackend,
    types::ProbabilityMap,
};
use image::RgbImage;
use instant::Duration;
use std::sync::{Arc, Mutex};

type MapFn = Arc<dyn Fn(u32, u32, u32, u32) -> f32 + Send + Sync>;

/// Mock backend that evaluates a closure per pixel and records its calls
#[derive(Clone)]
pub struct MockSegmenter {
    /// Whether the backend has been initialized
    initialized: bool,
    /// Probability of pixel (x, y) in a `width` x `height` image
    map_fn: MapFn,
    /// Forced output size, for dimension mismatch tests
    output_size: Option<(u32, u32)>,
    /// Call history for verification in tests
    call_history: Arc<Mutex<Vec<String>>>,
    /// Whether to simulate initialization failure
    should_fail_init: bool,
    /// Whether to simulate inference failure
    should_fail_inference: bool,
}

impl std::fmt::Debug for MockSegmenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSegmenter")
            .field("initialized", &self.initialized)
            .field("output_size", &self.output_size)
            .finish_non_exhaustive()
    }
}

impl MockSegmenter {
    /// Mock whose probability is `f(x, y, width, height)`
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(u32, u32, u32, u32) -> f32 + Send + Sync + 'static,
    {
        Self {
            initialized: false,
            map_fn: Arc::new(f),
            output_size: None,
            call_history: Arc::new(Mutex::new(Vec::new())),
            should_fail_init: false,
            should_fail_inference: false,
        }
    }

    /// Mock reporting a centered disc of radius `min(w, h) / 3` as foreground
    pub fn new() -> Self {
        Self::from_fn(|x, y, width, height| {
            let dx = x as f32 - width as f32 / 2.0;
            let dy = y as f32 - height as f32 / 2.0;
            let radius = width.min(height) as f32 / 3.0;
            if (dx * dx + dy * dy).sqrt() < radius {
                0.9
            } else {
                0.0
            }
        })
    }

    /// Create a mock backend that will fail during initialization
    pub fn new_failing_init() -> Self {
        let mut backend = Self::new();
        backend.should_fail_init = true;
        backend
    }

    /// Create a mock backend that will fail during inference
    pub fn new_failing_inference() -> Self {
        let mut backend = Self::new();
        backend.should_fail_inference = true;
        backend
    }

    /// Always produce maps of this size regardless of the input image
    pub fn with_output_size(mut self, width: u32, height: u32) -> Self {
        self.output_size = Some((width, height));
        self
    }

    /// Shared handle to the call history, usable after the mock is boxed
    pub fn history_handle(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.call_history)
    }

    /// Get the call history for verification in tests
    pub fn get_call_history(&self) -> Vec<String> {
        self.call_history.lock().unwrap().clone()
    }

    /// Record a method call for testing verification
    fn record_call(&self, method: &str) {
        if let Ok(mut history) = self.call_history.lock() {
            history.push(method.to_string());
        }
    }
}

impl Default for MockSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentationBackend for MockSegmenter {
    fn initialize(&mut self) -> Result<Option<Duration>> {
        self.record_call("initialize");

        if self.should_fail_init {
            return Err(BackdropError::model("Mock backend initialization failed"));
        }
        if self.initialized {
            return Ok(None);
        }
        self.initialized = true;
        Ok(Some(Duration::from_millis(1)))
    }

    fn probability_map(&mut self, image: &RgbImage) -> Result<ProbabilityMap> {
        self.record_call("probability_map");

        if !self.initialized {
            return Err(BackdropError::segmentation("Mock backend not initialized"));
        }
        if self.should_fail_inference {
            return Err(BackdropError::segmentation("Mock backend inference failed"));
        }

        let (width, height) = self.output_size.unwrap_or_else(|| image.dimensions());
        let f = Arc::clone(&self.map_fn);
        Ok(ProbabilityMap::from_fn(width, height, |x, y| {
            f(x, y, width, height)
        }))
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_records_calls() {
        let mut backend = MockSegmenter::new();
        assert!(backend.probability_map(&RgbImage::new(4, 4)).is_err());
        backend.initialize().unwrap();
        let map = backend.probability_map(&RgbImage::new(30, 30)).unwrap();
        assert!(map.get(15, 15) > 0.5);
        assert!(map.get(0, 0) < 0.1);
        assert_eq!(
            backend.get_call_history(),
            vec!["probability_map", "initialize", "probability_map"]
        );
    }

    #[test]
    fn test_failing_variants() {
        assert!(MockSegmenter::new_failing_init().initialize().is_err());

        let mut backend = MockSegmenter::new_failing_inference();
        backend.initialize().unwrap();
        assert!(backend.probability_map(&RgbImage::new(2, 2)).is_err());
    }

    #[test]
    fn test_forced_output_size() {
        let mut backend = MockSegmenter::new().with_output_size(3, 5);
        backend.initialize().unwrap();
        let map = backend.probability_map(&RgbImage::new(10, 10)).unwrap();
        assert_eq!(map.dimensions(), (3, 5));
    }
}
