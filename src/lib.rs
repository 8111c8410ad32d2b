//! Tour Companion core
//!
//! Location-aware scenic-spot tracking and object-detection post-processing
//! for a handheld tour companion.
//!
//! # Pipelines
//!
//! - **Geofence**: each cycle a `PositionFix` is tested against the configured
//!   regions (`GeofenceEngine`), and the `ScenicSpotTracker` turns the result
//!   into enter/leave edges.
//! - **Detection**: an inference backend produces a raw `[N, 5 + C]` tensor;
//!   `BoxDecoder` gates and decodes it, then non-max suppression removes
//!   overlapping boxes.
//!
//! The two pipelines share no state. `Companion` bundles both behind one
//! `&mut self` interface so one owner serializes update cycles.
//!
//! # Module Structure
//!
//! - `geo`: fixes and great-circle distance
//! - `geofence`: regions and membership
//! - `tracker`: enter/leave state machine
//! - `detect`: decoding, NMS, inference backends
//! - `config`, `frame`, `labels`, `locate`, `geocode`: collaborators

use anyhow::Result;
use ndarray::ArrayView2;

pub mod config;
pub mod detect;
pub mod frame;
pub mod geo;
pub mod geocode;
pub mod geofence;
pub mod labels;
pub mod locate;
pub mod tracker;

pub use config::{CompanionConfig, DetectionSettings, FrameSettings};
pub use detect::{
    BackendKind, BackendRegistry, BoundingBox, BoxDecoder, Detection, DetectionCapability,
    InferenceBackend,
};
pub use frame::Frame;
pub use geo::{haversine_distance, PositionFix};
pub use geocode::{ReverseGeocoder, StaticGeocoder};
pub use geofence::{GeofenceEngine, Region};
pub use labels::ClassLabels;
pub use locate::{Locator, SampleRouteLocator};
pub use tracker::{ScenicSpotState, ScenicSpotTracker, Transition};

/// Per-cycle core: geofence tracking plus detection decoding.
#[derive(Debug)]
pub struct Companion {
    engine: GeofenceEngine,
    tracker: ScenicSpotTracker,
    decoder: BoxDecoder,
    last_transition: Transition,
}

impl Companion {
    pub fn new(cfg: &CompanionConfig) -> Result<Self> {
        let engine = GeofenceEngine::new(cfg.regions.clone())?;
        let decoder = BoxDecoder::new(
            cfg.detection.confidence_threshold,
            cfg.detection.nms_threshold,
        )
        .with_score_floor(cfg.detection.score_floor);
        Ok(Self::with_parts(engine, decoder))
    }

    /// Regions only; detection uses the default thresholds.
    pub fn from_regions(regions: Vec<Region>) -> Result<Self> {
        let settings = DetectionSettings::default();
        let decoder = BoxDecoder::new(settings.confidence_threshold, settings.nms_threshold)
            .with_score_floor(settings.score_floor);
        Ok(Self::with_parts(GeofenceEngine::new(regions)?, decoder))
    }

    fn with_parts(engine: GeofenceEngine, decoder: BoxDecoder) -> Self {
        Self {
            engine,
            tracker: ScenicSpotTracker::new(),
            decoder,
            last_transition: Transition::None,
        }
    }

    // -------------------- Geofence --------------------

    /// Advance the tracker by one cycle. Invalid fixes count as "no region".
    pub fn update_location(&mut self, fix: PositionFix) -> &Transition {
        self.last_transition = self.tracker.update(&self.engine, &fix);
        &self.last_transition
    }

    /// Region containing the latest fix, or `""` when outside all regions.
    pub fn current_region(&self) -> &str {
        self.tracker.current_region()
    }

    pub fn previous_region(&self) -> &str {
        self.tracker.previous_region()
    }

    pub fn has_just_entered(&self) -> bool {
        self.tracker.has_just_entered()
    }

    pub fn has_just_left(&self) -> bool {
        self.tracker.has_just_left()
    }

    /// Edge produced by the most recent `update_location`.
    pub fn last_transition(&self) -> &Transition {
        &self.last_transition
    }

    pub fn reset_tracker(&mut self) {
        self.tracker.reset();
        self.last_transition = Transition::None;
    }

    pub fn regions(&self) -> &[Region] {
        self.engine.regions()
    }

    pub fn region(&self, name: &str) -> Option<&Region> {
        self.engine.region(name)
    }

    // -------------------- Detection --------------------

    /// Decode with explicit thresholds; the configured score floor still
    /// applies.
    pub fn decode_detections(
        &self,
        tensor: ArrayView2<'_, f32>,
        confidence_threshold: f32,
        nms_threshold: f32,
        frame_width: u32,
        frame_height: u32,
    ) -> Vec<Detection> {
        BoxDecoder::new(confidence_threshold, nms_threshold)
            .with_score_floor(self.decoder.score_floor)
            .decode(tensor, frame_width, frame_height)
    }

    /// Thresholds from configuration.
    pub fn decoder(&self) -> &BoxDecoder {
        &self.decoder
    }

    /// Run object detection on `frame` through the registry and decode the
    /// result with the configured thresholds.
    pub fn detect(&self, registry: &BackendRegistry, frame: &Frame) -> Result<Vec<Detection>> {
        let tensor = registry.infer_with_capability(DetectionCapability::ObjectDetection, frame)?;
        Ok(self
            .decoder
            .decode(tensor.view(), frame.width(), frame.height()))
    }
}
