//! Reverse geocoding for welcome messages.

use crate::geo::PositionFix;

/// Max per-axis offset, in degrees, for a fix to match a known address.
pub const MATCH_TOLERANCE_DEG: f64 = 0.01;

pub trait ReverseGeocoder {
    /// Street address near the coordinate, if known.
    fn address_for(&self, latitude: f64, longitude: f64) -> Option<String>;

    fn address_for_fix(&self, fix: &PositionFix) -> Option<String> {
        if !fix.valid {
            return None;
        }
        self.address_for(fix.latitude, fix.longitude)
    }
}

#[derive(Clone, Debug, PartialEq)]
struct KnownAddress {
    latitude: f64,
    longitude: f64,
    address: String,
}

/// Offline table of addresses keyed by coordinate.
#[derive(Clone, Debug, PartialEq)]
pub struct StaticGeocoder {
    entries: Vec<KnownAddress>,
    tolerance_deg: f64,
}

const BUILTIN_ADDRESSES: &[(f64, f64, &str)] = &[
    (39.9042, 116.4074, "北京市东城区景山前街4号"),
    (39.9139, 116.3912, "北京市东城区天坛东路甲1号"),
    (34.2657, 108.9542, "陕西省西安市临潼区秦始皇陵东侧"),
    (30.2741, 120.1551, "浙江省杭州市西湖区龙井路1号"),
    (22.5431, 114.0579, "广东省深圳市南山区深南大道9037号"),
];

impl StaticGeocoder {
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            tolerance_deg: MATCH_TOLERANCE_DEG,
        }
    }

    /// Addresses for the bundled sample scenic spots.
    pub fn builtin() -> Self {
        let mut geocoder = Self::empty();
        for (lat, lon, address) in BUILTIN_ADDRESSES {
            geocoder.insert(*lat, *lon, address);
        }
        geocoder
    }

    pub fn with_tolerance(mut self, tolerance_deg: f64) -> Self {
        self.tolerance_deg = tolerance_deg.abs();
        self
    }

    pub fn insert(&mut self, latitude: f64, longitude: f64, address: &str) {
        self.entries.push(KnownAddress {
            latitude,
            longitude,
            address: address.to_string(),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for StaticGeocoder {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ReverseGeocoder for StaticGeocoder {
    fn address_for(&self, latitude: f64, longitude: f64) -> Option<String> {
        self.entries
            .iter()
            .find(|e| {
                (e.latitude - latitude).abs() < self.tolerance_deg
                    && (e.longitude - longitude).abs() < self.tolerance_deg
            })
            .map(|e| e.address.clone())
    }
}
