//! Registry of named detection and tracking providers.

use std::collections::HashMap;
use std::sync::Arc;

use vidanno_core::{CopyTrackerFactory, Detector, TrackerFactory};

/// Registry of available detectors and tracker factories.
///
/// Providers are shared (`Arc`) so batch jobs can hold them on worker
/// threads. The built-in `copy` tracker is registered on creation.
#[derive(Clone)]
pub struct ProviderRegistry {
    detectors: HashMap<String, Arc<dyn Detector>>,
    trackers: HashMap<String, Arc<dyn TrackerFactory>>,
}

impl ProviderRegistry {
    /// Create a registry with the built-in providers registered.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register_tracker(Arc::new(CopyTrackerFactory));
        registry
    }

    /// Create a registry with nothing registered.
    pub fn empty() -> Self {
        Self {
            detectors: HashMap::new(),
            trackers: HashMap::new(),
        }
    }

    /// Register a detector under its own name, replacing any previous one.
    pub fn register_detector(&mut self, detector: Arc<dyn Detector>) {
        log::debug!("🔌 Registered detector '{}'", detector.name());
        self.detectors.insert(detector.name().to_string(), detector);
    }

    /// Register a tracker factory under its own name, replacing any previous one.
    pub fn register_tracker(&mut self, factory: Arc<dyn TrackerFactory>) {
        log::debug!("🔌 Registered tracker '{}'", factory.name());
        self.trackers.insert(factory.name().to_string(), factory);
    }

    pub fn detector(&self, name: &str) -> Option<Arc<dyn Detector>> {
        self.detectors.get(name).cloned()
    }

    /// Look up a tracker case-insensitively.
    pub fn tracker(&self, name: &str) -> Option<Arc<dyn TrackerFactory>> {
        self.trackers.get(name).cloned().or_else(|| {
            self.trackers
                .iter()
                .find(|(id, _)| id.eq_ignore_ascii_case(name))
                .map(|(_, f)| Arc::clone(f))
        })
    }

    /// Sorted detector names.
    pub fn detector_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.detectors.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Sorted tracker names.
    pub fn tracker_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.trackers.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
