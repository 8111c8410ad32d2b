use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::detect::BackendKind;
use crate::geofence::Region;

const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.7;
const DEFAULT_NMS_THRESHOLD: f32 = 0.4;
const DEFAULT_SCORE_FLOOR: f32 = 0.0;
const DEFAULT_FRAME_WIDTH: u32 = 640;
const DEFAULT_FRAME_HEIGHT: u32 = 480;
const DEFAULT_INPUT_SIZE: u32 = 640;
const DEFAULT_REGION_RADIUS_M: f64 = 500.0;
const DEFAULT_LABELS_PATH: &str = "models/coco.names";

const MIN_CONFIDENCE_THRESHOLD: f32 = 0.1;
const MAX_CONFIDENCE_THRESHOLD: f32 = 1.0;

/// Built-in scenic spots: name, latitude, longitude.
pub const DEFAULT_SCENIC_SPOTS: &[(&str, f64, f64)] = &[
    ("故宫博物院", 39.9042, 116.4074),
    ("天坛公园", 39.9139, 116.3912),
    ("兵马俑博物馆", 34.2657, 108.9542),
    ("杭州西湖", 30.2741, 120.1551),
    ("深圳世界之窗", 22.5431, 114.0579),
];

#[derive(Debug, Deserialize, Default)]
struct CompanionConfigFile {
    regions: Option<Vec<RegionConfigFile>>,
    detection: Option<DetectionConfigFile>,
    frame: Option<FrameConfigFile>,
}

#[derive(Debug, Deserialize)]
struct RegionConfigFile {
    name: String,
    latitude: f64,
    longitude: f64,
    radius_m: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectionConfigFile {
    backend: Option<BackendKind>,
    model_path: Option<PathBuf>,
    labels_path: Option<PathBuf>,
    confidence_threshold: Option<f32>,
    nms_threshold: Option<f32>,
    score_floor: Option<f32>,
    input_width: Option<u32>,
    input_height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct FrameConfigFile {
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct CompanionConfig {
    pub regions: Vec<Region>,
    pub detection: DetectionSettings,
    pub frame: FrameSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectionSettings {
    pub backend: BackendKind,
    pub model_path: Option<PathBuf>,
    pub labels_path: PathBuf,
    /// Objectness and class-score gate.
    pub confidence_threshold: f32,
    /// IoU at or above which overlapping boxes are suppressed.
    pub nms_threshold: f32,
    /// Minimum combined score entering suppression.
    pub score_floor: f32,
    pub input_width: u32,
    pub input_height: u32,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            backend: BackendKind::Stub,
            model_path: None,
            labels_path: PathBuf::from(DEFAULT_LABELS_PATH),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            nms_threshold: DEFAULT_NMS_THRESHOLD,
            score_floor: DEFAULT_SCORE_FLOOR,
            input_width: DEFAULT_INPUT_SIZE,
            input_height: DEFAULT_INPUT_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSettings {
    pub width: u32,
    pub height: u32,
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            width: DEFAULT_FRAME_WIDTH,
            height: DEFAULT_FRAME_HEIGHT,
        }
    }
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            regions: default_regions(),
            detection: DetectionSettings::default(),
            frame: FrameSettings::default(),
        }
    }
}

/// The built-in scenic spots with the default radius.
pub fn default_regions() -> Vec<Region> {
    DEFAULT_SCENIC_SPOTS
        .iter()
        .map(|&(name, lat, lon)| Region::new(name, lat, lon, DEFAULT_REGION_RADIUS_M))
        .collect()
}

impl CompanionConfig {
    /// Load from `COMPANION_CONFIG` (if set), then apply env overrides and validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("COMPANION_CONFIG").ok();
        Self::load_from(config_path.as_deref().map(Path::new))
    }

    /// Load from an explicit file (or defaults), then apply env overrides and validate.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: CompanionConfigFile) -> Self {
        let regions = match file.regions {
            Some(regions) => regions
                .into_iter()
                .map(|r| Region {
                    name: r.name,
                    latitude: r.latitude,
                    longitude: r.longitude,
                    radius_m: r.radius_m.unwrap_or(DEFAULT_REGION_RADIUS_M),
                })
                .collect(),
            None => default_regions(),
        };

        let defaults = DetectionSettings::default();
        let d = file.detection.unwrap_or_default();
        let detection = DetectionSettings {
            backend: d.backend.unwrap_or(defaults.backend),
            model_path: d.model_path,
            labels_path: d.labels_path.unwrap_or(defaults.labels_path),
            confidence_threshold: d
                .confidence_threshold
                .unwrap_or(defaults.confidence_threshold),
            nms_threshold: d.nms_threshold.unwrap_or(defaults.nms_threshold),
            score_floor: d.score_floor.unwrap_or(defaults.score_floor),
            input_width: d.input_width.unwrap_or(defaults.input_width),
            input_height: d.input_height.unwrap_or(defaults.input_height),
        };

        let frame = FrameSettings {
            width: file
                .frame
                .as_ref()
                .and_then(|f| f.width)
                .unwrap_or(DEFAULT_FRAME_WIDTH),
            height: file
                .frame
                .and_then(|f| f.height)
                .unwrap_or(DEFAULT_FRAME_HEIGHT),
        };

        Self {
            regions,
            detection,
            frame,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(backend) = std::env::var("COMPANION_BACKEND") {
            if !backend.trim().is_empty() {
                self.detection.backend = backend.parse()?;
            }
        }
        if let Ok(path) = std::env::var("COMPANION_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.detection.model_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(path) = std::env::var("COMPANION_LABELS_PATH") {
            if !path.trim().is_empty() {
                self.detection.labels_path = PathBuf::from(path);
            }
        }
        if let Some(value) = env_f32("COMPANION_CONFIDENCE")? {
            self.detection.confidence_threshold = value;
        }
        if let Some(value) = env_f32("COMPANION_NMS_THRESHOLD")? {
            self.detection.nms_threshold = value;
        }
        if let Some(value) = env_f32("COMPANION_SCORE_FLOOR")? {
            self.detection.score_floor = value;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.regions.is_empty() {
            return Err(anyhow!("at least one region must be configured"));
        }
        let mut names = HashSet::new();
        for region in &self.regions {
            region.validate()?;
            if !names.insert(region.name.as_str()) {
                return Err(anyhow!("duplicate region name '{}'", region.name));
            }
        }

        let d = &self.detection;
        if !(MIN_CONFIDENCE_THRESHOLD..=MAX_CONFIDENCE_THRESHOLD).contains(&d.confidence_threshold)
        {
            return Err(anyhow!(
                "confidence threshold must be between {} and {}",
                MIN_CONFIDENCE_THRESHOLD,
                MAX_CONFIDENCE_THRESHOLD
            ));
        }
        if !(d.nms_threshold > 0.0 && d.nms_threshold <= 1.0) {
            return Err(anyhow!("nms threshold must be in (0, 1]"));
        }
        if !(0.0..=1.0).contains(&d.score_floor) {
            return Err(anyhow!("score floor must be in [0, 1]"));
        }
        if d.input_width == 0 || d.input_height == 0 {
            return Err(anyhow!("model input dimensions must be greater than zero"));
        }
        if d.backend != BackendKind::Stub && d.model_path.is_none() {
            return Err(anyhow!(
                "{} backend requires detection.model_path or COMPANION_MODEL_PATH",
                d.backend.as_str()
            ));
        }
        if self.frame.width == 0 || self.frame.height == 0 {
            return Err(anyhow!("frame dimensions must be greater than zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<CompanionConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg: CompanionConfigFile = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn env_f32(key: &str) -> Result<Option<f32>> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => {
            let parsed = value
                .trim()
                .parse()
                .map_err(|_| anyhow!("{} must be a number", key))?;
            Ok(Some(parsed))
        }
        _ => Ok(None),
    }
}
