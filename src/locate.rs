//! Position fix sources.
//!
//! The companion consumes one `PositionFix` per cycle from a `Locator`.
//! `SampleRouteLocator` replays a fixed route for demos and bench runs where
//! no GNSS receiver is attached.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::geo::PositionFix;
use crate::geofence::Region;

/// Accuracy scale applied when GPS and IMU readings are both available.
pub const FUSED_ACCURACY_SCALE: f64 = 0.9;

/// Default number of cycles between route steps.
pub const DEFAULT_STEP_PERIOD: u64 = 10;

/// Produces the fix for the current cycle.
pub trait Locator {
    fn name(&self) -> &'static str;

    /// Latest fix. Called exactly once per update cycle.
    fn next_fix(&mut self) -> PositionFix;
}

/// Which positioning sensors reported in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SensorAvailability {
    pub gps: bool,
    pub imu: bool,
}

impl Default for SensorAvailability {
    fn default() -> Self {
        Self {
            gps: true,
            imu: true,
        }
    }
}

/// Placeholder for GPS/IMU fusion: tightens accuracy when both sensors are up.
///
/// Invalid fixes pass through unchanged.
pub fn adjust_accuracy(fix: PositionFix, sensors: SensorAvailability) -> PositionFix {
    if fix.valid && sensors.gps && sensors.imu {
        PositionFix {
            accuracy: fix.accuracy * FUSED_ACCURACY_SCALE,
            ..fix
        }
    } else {
        fix
    }
}

/// Replays a list of waypoints, advancing one waypoint every `period` cycles.
///
/// Between steps the previous fix is reported again; before the first step the
/// fix is invalid (no lock yet).
pub struct SampleRouteLocator {
    waypoints: Vec<(f64, f64)>,
    period: u64,
    cycle: u64,
    sensors: SensorAvailability,
    current: PositionFix,
    last_valid: Option<PositionFix>,
    previous_valid: Option<PositionFix>,
    rng: StdRng,
}

impl SampleRouteLocator {
    pub fn new(waypoints: Vec<(f64, f64)>, period: u64) -> Self {
        Self {
            waypoints,
            period: period.max(1),
            cycle: 0,
            sensors: SensorAvailability::default(),
            current: PositionFix::invalid(),
            last_valid: None,
            previous_valid: None,
            rng: StdRng::from_entropy(),
        }
    }

    /// Route through the centers of the given regions, in order.
    pub fn through_regions(regions: &[Region], period: u64) -> Self {
        Self::new(
            regions.iter().map(|r| (r.latitude, r.longitude)).collect(),
            period,
        )
    }

    /// Deterministic altitude/accuracy jitter.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn with_sensors(mut self, sensors: SensorAvailability) -> Self {
        self.sensors = sensors;
        self
    }

    /// Meters between the two most recent valid fixes; 0 until there are two.
    pub fn distance_from_last(&self) -> f64 {
        match (&self.previous_valid, &self.last_valid) {
            (Some(prev), Some(last)) => prev.distance_to(last),
            _ => 0.0,
        }
    }

    fn step(&mut self) -> PositionFix {
        let index = ((self.cycle / self.period - 1) % self.waypoints.len() as u64) as usize;
        let (latitude, longitude) = self.waypoints[index];
        let fix = PositionFix::new(latitude, longitude)
            .with_altitude(50.0 + self.rng.gen_range(0..100) as f64)
            .with_accuracy(5.0 + self.rng.gen_range(0..20) as f64 / 10.0);
        adjust_accuracy(fix, self.sensors)
    }
}

impl Locator for SampleRouteLocator {
    fn name(&self) -> &'static str {
        "sample-route"
    }

    fn next_fix(&mut self) -> PositionFix {
        self.cycle += 1;
        if !self.waypoints.is_empty() && self.cycle % self.period == 0 {
            let fix = self.step();
            self.previous_valid = self.last_valid.replace(fix);
            self.current = fix;
        }
        self.current
    }
}

/// Replays a scripted sequence of fixes, then keeps returning invalid fixes.
#[derive(Debug, Default)]
pub struct ScriptedLocator {
    fixes: std::collections::VecDeque<PositionFix>,
}

impl ScriptedLocator {
    pub fn new<I: IntoIterator<Item = PositionFix>>(fixes: I) -> Self {
        Self {
            fixes: fixes.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.fixes.len()
    }
}

impl Locator for ScriptedLocator {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn next_fix(&mut self) -> PositionFix {
        self.fixes.pop_front().unwrap_or_else(PositionFix::invalid)
    }
}
