use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::geo::{haversine_distance, PositionFix};

/// Circular geofence around a named scenic spot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_m: f64,
}

impl Region {
    pub fn new(name: &str, latitude: f64, longitude: f64, radius_m: f64) -> Self {
        Self {
            name: name.to_string(),
            latitude,
            longitude,
            radius_m,
        }
    }

    /// Distance from the fix to the region center, in meters.
    pub fn distance_from(&self, fix: &PositionFix) -> f64 {
        haversine_distance(fix.latitude, fix.longitude, self.latitude, self.longitude)
    }

    /// Inclusive containment test: a fix exactly on the rim is inside.
    pub fn contains(&self, fix: &PositionFix) -> bool {
        self.distance_from(fix) <= self.radius_m
    }

    /// Reject malformed region definitions. Called once at load time.
    pub fn validate(&self) -> Result<()> {
        validate_region_name(&self.name)?;
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(anyhow!(
                "region '{}': latitude {} outside [-90, 90]",
                self.name,
                self.latitude
            ));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(anyhow!(
                "region '{}': longitude {} outside [-180, 180]",
                self.name,
                self.longitude
            ));
        }
        if !self.radius_m.is_finite() || self.radius_m <= 0.0 {
            return Err(anyhow!(
                "region '{}': radius must be a positive number of meters",
                self.name
            ));
        }
        Ok(())
    }
}

/// Region names are display strings: 1-64 chars, no control characters,
/// no leading or trailing whitespace.
pub fn validate_region_name(name: &str) -> Result<()> {
    static REGION_NAME_RE: OnceLock<regex::Regex> = OnceLock::new();
    let re = REGION_NAME_RE
        .get_or_init(|| regex::Regex::new(r"^\S(?:[^\p{Cc}]{0,62}\S)?$").unwrap());
    if name.chars().count() > 64 || !re.is_match(name) {
        return Err(anyhow!("invalid region name {:?}", name));
    }
    Ok(())
}

/// Membership tests against a fixed, ordered list of regions.
///
/// The region list is validated once on construction and never mutated.
#[derive(Clone, Debug)]
pub struct GeofenceEngine {
    regions: Vec<Region>,
}

impl GeofenceEngine {
    pub fn new(regions: Vec<Region>) -> Result<Self> {
        let mut seen = HashSet::new();
        for region in &regions {
            region.validate()?;
            if !seen.insert(region.name.as_str()) {
                return Err(anyhow!("duplicate region name '{}'", region.name));
            }
        }
        Ok(Self { regions })
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn region(&self, name: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.name == name)
    }

    /// Name of the first region containing `fix`, or `""` when none does.
    pub fn test_membership(&self, fix: &PositionFix) -> &str {
        test_membership(fix, &self.regions)
    }
}

/// First-match membership over `regions` in declaration order.
///
/// Invalid fixes never match anything.
pub fn test_membership<'a>(fix: &PositionFix, regions: &'a [Region]) -> &'a str {
    if !fix.valid {
        return "";
    }
    regions
        .iter()
        .find(|region| region.contains(fix))
        .map(|region| region.name.as_str())
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::EARTH_RADIUS_M;

    fn engine() -> GeofenceEngine {
        GeofenceEngine::new(vec![
            Region::new("A", 39.9042, 116.4074, 500.0),
            Region::new("B", 39.9139, 116.3912, 500.0),
        ])
        .unwrap()
    }

    #[test]
    fn center_fix_is_inside() {
        let e = engine();
        assert_eq!(e.test_membership(&PositionFix::new(39.9042, 116.4074)), "A");
        assert_eq!(e.test_membership(&PositionFix::new(39.9139, 116.3912)), "B");
    }

    #[test]
    fn far_fix_is_outside() {
        let e = engine();
        assert_eq!(e.test_membership(&PositionFix::new(34.2657, 108.9542)), "");
    }

    #[test]
    fn invalid_fix_is_never_inside() {
        let e = engine();
        let mut fix = PositionFix::new(39.9042, 116.4074);
        fix.valid = false;
        assert_eq!(e.test_membership(&fix), "");
    }

    #[test]
    fn boundary_is_inclusive() {
        // Fix one degree north of the equator; radius set to the exact distance.
        let exact = haversine_distance(0.0, 0.0, 1.0, 0.0);
        let regions = vec![Region::new("rim", 0.0, 0.0, exact)];
        assert_eq!(test_membership(&PositionFix::new(1.0, 0.0), &regions), "rim");

        let shrunk = vec![Region::new("rim", 0.0, 0.0, exact - 1e-6)];
        assert_eq!(test_membership(&PositionFix::new(1.0, 0.0), &shrunk), "");
        assert!((exact - EARTH_RADIUS_M * 1f64.to_radians()).abs() < 1e-6);
    }

    #[test]
    fn overlapping_regions_use_first_match() {
        let regions = vec![
            Region::new("outer", 30.2741, 120.1551, 2_000.0),
            Region::new("inner", 30.2741, 120.1551, 100.0),
        ];
        let fix = PositionFix::new(30.2741, 120.1551);
        assert_eq!(test_membership(&fix, &regions), "outer");

        let reversed: Vec<Region> = regions.into_iter().rev().collect();
        assert_eq!(test_membership(&fix, &reversed), "inner");
    }

    #[test]
    fn rejects_bad_configuration() {
        assert!(GeofenceEngine::new(vec![Region::new("x", 91.0, 0.0, 10.0)]).is_err());
        assert!(GeofenceEngine::new(vec![Region::new("x", 0.0, -180.5, 10.0)]).is_err());
        assert!(GeofenceEngine::new(vec![Region::new("x", 0.0, 0.0, 0.0)]).is_err());
        assert!(GeofenceEngine::new(vec![Region::new("x", 0.0, 0.0, f64::NAN)]).is_err());
        assert!(GeofenceEngine::new(vec![Region::new("", 0.0, 0.0, 10.0)]).is_err());
        assert!(GeofenceEngine::new(vec![
            Region::new("dup", 0.0, 0.0, 10.0),
            Region::new("dup", 1.0, 1.0, 10.0),
        ])
        .is_err());
    }

    #[test]
    fn region_names_allow_unicode() {
        assert!(validate_region_name("故宫博物院").is_ok());
        assert!(validate_region_name("West Lake").is_ok());
        assert!(validate_region_name("a").is_ok());
        assert!(validate_region_name(" padded").is_err());
        assert!(validate_region_name("tab\tname").is_err());
        assert!(validate_region_name(&"x".repeat(65)).is_err());
    }
}
