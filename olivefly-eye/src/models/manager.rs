//! Lazy, process-wide model handle

use crate::config::DetectorConfig;
use crate::detector::Detector;
use crate::error::VisionError;
use crate::models::yolo::YoloDetector;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

type Loader = Box<dyn Fn(&Path) -> Result<Arc<dyn Detector>, VisionError> + Send + Sync>;

/// Holds the detector, loading it on first use.
///
/// A failed load leaves the handle empty so the next request tries again.
/// Once loaded, every caller shares the same instance.
pub struct ModelHandle {
    model_path: PathBuf,
    loader: Loader,
    detector: RwLock<Option<Arc<dyn Detector>>>,
}

impl ModelHandle {
    /// Create a handle with a custom loader
    pub fn new<F>(model_path: impl Into<PathBuf>, loader: F) -> Self
    where
        F: Fn(&Path) -> Result<Arc<dyn Detector>, VisionError> + Send + Sync + 'static,
    {
        Self {
            model_path: model_path.into(),
            loader: Box::new(loader),
            detector: RwLock::new(None),
        }
    }

    /// Handle backed by an ONNX YOLO export at `config.model_path`
    pub fn yolo(config: DetectorConfig) -> Self {
        let model_path = config.model_path.clone();
        Self::new(model_path, move |path| {
            if !path.exists() {
                return Err(VisionError::ModelUnavailable(format!(
                    "model file not found: {}",
                    path.display()
                )));
            }
            let mut config = config.clone();
            config.model_path = path.to_path_buf();
            let detector: Arc<dyn Detector> = Arc::new(YoloDetector::new(config)?);
            Ok(detector)
        })
    }

    /// Handle around an already-built detector
    pub fn preloaded(model_path: impl Into<PathBuf>, detector: Arc<dyn Detector>) -> Self {
        let model_path = model_path.into();
        let missing = model_path.clone();
        Self {
            model_path,
            loader: Box::new(move |_| {
                Err(VisionError::ModelUnavailable(format!(
                    "no loader for {}",
                    missing.display()
                )))
            }),
            detector: RwLock::new(Some(detector)),
        }
    }

    /// The detector, loading it if needed
    pub fn try_get(&self) -> Result<Arc<dyn Detector>, VisionError> {
        if let Some(detector) = self.detector.read().as_ref() {
            return Ok(Arc::clone(detector));
        }

        let mut slot = self.detector.write();
        // another request may have finished loading while we waited
        if let Some(detector) = slot.as_ref() {
            return Ok(Arc::clone(detector));
        }

        info!("Loading model from {:?}", self.model_path);
        let detector = (self.loader)(&self.model_path)?;
        *slot = Some(Arc::clone(&detector));
        info!("Model ready: {}", self.model_name());
        Ok(detector)
    }

    /// The detector, or `None` when it cannot be loaded right now
    pub fn get(&self) -> Option<Arc<dyn Detector>> {
        match self.try_get() {
            Ok(detector) => Some(detector),
            Err(e) => {
                warn!("Model unavailable: {}", e);
                None
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.detector.read().is_some()
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// File name of the model path
    pub fn model_name(&self) -> String {
        self.model_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.model_path.to_string_lossy().into_owned())
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("model_path", &self.model_path)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::DetectorOutput;
    use image::RgbImage;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EmptyDetector;

    impl Detector for EmptyDetector {
        fn detect(&self, _image: &RgbImage) -> Result<DetectorOutput, VisionError> {
            Ok(DetectorOutput::default())
        }
    }

    #[test]
    fn test_loads_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let handle = ModelHandle::new("weights/fly.onnx", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            let detector: Arc<dyn Detector> = Arc::new(EmptyDetector);
            Ok(detector)
        });

        assert!(!handle.is_loaded());
        let first = handle.get().unwrap();
        let second = handle.get().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(handle.is_loaded());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_load_is_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let handle = ModelHandle::new("weights/fly.onnx", move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(VisionError::ModelUnavailable("not yet".to_string()));
            }
            let detector: Arc<dyn Detector> = Arc::new(EmptyDetector);
            Ok(detector)
        });

        assert!(handle.get().is_none());
        assert!(!handle.is_loaded());
        assert!(handle.get().is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_concurrent_first_use_loads_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let handle = Arc::new(ModelHandle::new("weights/fly.onnx", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(20));
            let detector: Arc<dyn Detector> = Arc::new(EmptyDetector);
            Ok(detector)
        }));

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let handle = Arc::clone(&handle);
                std::thread::spawn(move || handle.get().is_some())
            })
            .collect();
        for t in threads {
            assert!(t.join().unwrap());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_yolo_missing_file_is_unavailable() {
        let config = DetectorConfig {
            model_path: PathBuf::from("/nonexistent/olivefly.onnx"),
            ..DetectorConfig::default()
        };
        let handle = ModelHandle::yolo(config);
        assert!(matches!(handle.try_get(), Err(VisionError::ModelUnavailable(_))));
        assert!(!handle.is_loaded());
        assert_eq!(handle.model_name(), "olivefly.onnx");
    }

    #[test]
    fn test_preloaded() {
        let handle = ModelHandle::preloaded("stub.onnx", Arc::new(EmptyDetector));
        assert!(handle.is_loaded());
        assert!(handle.get().is_some());
        assert_eq!(handle.model_path(), Path::new("stub.onnx"));
    }
}
