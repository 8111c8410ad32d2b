use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use ndarray::Array2;

use crate::frame::Frame;

use super::backend::{DetectionCapability, InferenceBackend};

/// Thread-safe registry of inference backends, in registration order.
///
/// Backends are wrapped in `Mutex` because `InferenceBackend::infer` takes `&mut self`.
pub struct BackendRegistry {
    backends: Vec<Arc<Mutex<dyn InferenceBackend>>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            backends: Vec::new(),
        }
    }

    pub fn register<B: InferenceBackend + 'static>(&mut self, backend: B) {
        self.backends.push(Arc::new(Mutex::new(backend)));
    }

    /// Register an already boxed backend, as returned by `backends::build`.
    pub fn register_boxed(&mut self, backend: Box<dyn InferenceBackend>) {
        self.backends.push(Arc::new(Mutex::new(BoxedBackend(backend))));
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    /// First registered backend that supports the requested capability.
    pub fn backend_for_capability(
        &self,
        capability: DetectionCapability,
    ) -> Result<Arc<Mutex<dyn InferenceBackend>>> {
        for backend in &self.backends {
            let supports = backend
                .lock()
                .map_err(|_| anyhow!("backend lock poisoned"))?
                .supports(capability);
            if supports {
                return Ok(backend.clone());
            }
        }

        Err(anyhow!(
            "no registered backend supports capability {:?}",
            capability
        ))
    }

    /// Run inference using a backend that supports the requested capability.
    pub fn infer_with_capability(
        &self,
        capability: DetectionCapability,
        frame: &Frame,
    ) -> Result<Array2<f32>> {
        let backend = self.backend_for_capability(capability)?;
        let mut guard = backend
            .lock()
            .map_err(|_| anyhow!("backend lock poisoned"))?;
        guard.infer(frame)
    }

    /// Warm up every registered backend.
    pub fn warm_up_all(&self) -> Result<()> {
        for backend in &self.backends {
            let mut guard = backend
                .lock()
                .map_err(|_| anyhow!("backend lock poisoned"))?;
            guard.warm_up()?;
            log::info!("backend '{}' warmed up", guard.name());
        }
        Ok(())
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

struct BoxedBackend(Box<dyn InferenceBackend>);

impl InferenceBackend for BoxedBackend {
    fn name(&self) -> &'static str {
        self.0.name()
    }

    fn supports(&self, capability: DetectionCapability) -> bool {
        self.0.supports(capability)
    }

    fn infer(&mut self, frame: &Frame) -> Result<Array2<f32>> {
        self.0.infer(frame)
    }

    fn warm_up(&mut self) -> Result<()> {
        self.0.warm_up()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::StubBackend;
    use ndarray::array;

    /// Backend whose model failed to load; advertises nothing.
    struct Offline {
        warmed: bool,
    }

    impl InferenceBackend for Offline {
        fn name(&self) -> &'static str {
            "offline"
        }

        fn supports(&self, _capability: DetectionCapability) -> bool {
            false
        }

        fn infer(&mut self, _frame: &Frame) -> Result<Array2<f32>> {
            Err(anyhow!("model not loaded"))
        }

        fn warm_up(&mut self) -> Result<()> {
            self.warmed = true;
            Ok(())
        }
    }

    #[test]
    fn capability_lookup_skips_unsupporting_backends() {
        let mut registry = BackendRegistry::new();
        registry.register(Offline { warmed: false });
        registry.register_boxed(Box::new(StubBackend::with_tensor(array![[
            0.5f32, 0.5, 0.1, 0.1, 0.9, 0.9
        ]])));
        registry.register(StubBackend::new());
        assert_eq!(registry.len(), 3);

        let frame = Frame::blank(8, 8).unwrap();
        let out = registry
            .infer_with_capability(DetectionCapability::ObjectDetection, &frame)
            .unwrap();
        assert_eq!(out.dim(), (1, 6));
    }

    #[test]
    fn missing_capability_is_an_error() {
        let registry = BackendRegistry::default();
        assert!(registry.is_empty());
        assert!(registry
            .backend_for_capability(DetectionCapability::ObjectDetection)
            .is_err());
        registry.warm_up_all().unwrap();

        let mut registry = BackendRegistry::new();
        registry.register(Offline { warmed: false });
        let frame = Frame::blank(2, 2).unwrap();
        assert!(registry
            .infer_with_capability(DetectionCapability::ObjectDetection, &frame)
            .is_err());
    }

    #[test]
    fn warm_up_reaches_every_backend() {
        let offline = Arc::new(Mutex::new(Offline { warmed: false }));
        let mut registry = BackendRegistry::new();
        registry.backends.push(offline.clone());
        registry.register(StubBackend::new());

        registry.warm_up_all().unwrap();
        assert!(offline.lock().unwrap().warmed);
    }
}
