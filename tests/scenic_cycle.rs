use ndarray::{array, Array2};

use tour_companion::detect::{iou, non_max_suppression, StubBackend};
use tour_companion::geofence::test_membership;
use tour_companion::locate::ScriptedLocator;
use tour_companion::{
    haversine_distance, BackendRegistry, BoundingBox, Companion, CompanionConfig, Frame, Locator,
    PositionFix, Region, ReverseGeocoder, StaticGeocoder, Transition,
};

fn region_a() -> Region {
    Region::new("A", 39.9042, 116.4074, 500.0)
}

// -------------------- Geofence --------------------

#[test]
fn distance_is_zero_for_coincident_points_and_symmetric() {
    let pts = [
        (39.9042, 116.4074),
        (-33.8688, 151.2093),
        (0.0, 179.9999),
        (89.9, -45.0),
    ];
    for &(lat, lon) in &pts {
        assert_eq!(haversine_distance(lat, lon, lat, lon), 0.0);
    }
    for &(a_lat, a_lon) in &pts {
        for &(b_lat, b_lon) in &pts {
            let ab = haversine_distance(a_lat, a_lon, b_lat, b_lon);
            let ba = haversine_distance(b_lat, b_lon, a_lat, a_lon);
            assert!((ab - ba).abs() < 1e-6);
        }
    }
}

#[test]
fn membership_at_center_and_on_boundary() {
    let center = PositionFix::new(39.9042, 116.4074);
    let regions = [region_a()];
    assert_eq!(test_membership(&center, &regions), "A");

    // Radius set to the exact distance of a nearby point: inclusive.
    let rim = PositionFix::new(39.9072, 116.4074);
    let exact = rim.distance_to(&center);
    let edge = [Region::new("Edge", 39.9042, 116.4074, exact)];
    assert_eq!(test_membership(&rim, &edge), "Edge");
}

#[test]
fn enter_once_leave_on_signal_loss_then_reenter() {
    let mut companion = Companion::from_regions(vec![region_a()]).expect("companion");
    let inside = PositionFix::new(39.9042, 116.4074);
    let mut locator = ScriptedLocator::new([inside, inside, inside, PositionFix::invalid(), inside]);

    let mut entered = Vec::new();
    while locator.remaining() > 0 {
        companion.update_location(locator.next_fix());
        entered.push(companion.has_just_entered());
        if locator.remaining() == 1 {
            assert_eq!(companion.current_region(), "");
            assert_eq!(companion.previous_region(), "A");
        }
    }

    assert_eq!(entered, vec![true, false, false, false, true]);
    assert_eq!(companion.current_region(), "A");
}

#[test]
fn overlapping_regions_hand_off_without_outside_gap() {
    let mut companion = Companion::from_regions(vec![
        Region::new("Palace", 39.9163, 116.3972, 600.0),
        Region::new("Old City", 39.9163, 116.3972, 3_000.0),
    ])
    .expect("companion");

    companion.update_location(PositionFix::new(39.9163, 116.3972));
    assert_eq!(companion.current_region(), "Palace");

    // ~1.1 km north: only inside the larger region.
    let tr = companion
        .update_location(PositionFix::new(39.9263, 116.3972))
        .clone();
    assert_eq!(
        tr,
        Transition::Moved {
            from: "Palace".to_string(),
            to: "Old City".to_string()
        }
    );
    assert!(companion.has_just_entered());
}

#[test]
fn welcome_address_for_default_spots() {
    let cfg = CompanionConfig::default();
    let mut companion = Companion::new(&cfg).expect("companion");
    let geocoder = StaticGeocoder::builtin();

    for region in cfg.regions.iter() {
        let fix = PositionFix::new(region.latitude, region.longitude);
        companion.update_location(fix);
        assert!(companion.has_just_entered());
        assert_eq!(companion.current_region(), region.name);
        assert!(geocoder.address_for_fix(&fix).is_some());
    }
}

// -------------------- Detection --------------------

#[test]
fn iou_identity_and_disjoint() {
    let a = BoundingBox::new(10.0, 10.0, 50.0, 40.0);
    let b = BoundingBox::new(100.0, 100.0, 20.0, 20.0);
    assert_eq!(iou(&a, &a), 1.0);
    assert_eq!(iou(&a, &b), 0.0);
    assert_eq!(iou(&BoundingBox::new(5.0, 5.0, 0.0, 0.0), &a), 0.0);
}

#[test]
fn nms_keeps_first_and_distant_box() {
    let boxes = [
        BoundingBox::new(0.0, 0.0, 100.0, 100.0),
        BoundingBox::new(0.0, 0.0, 100.0, 90.0),
        BoundingBox::new(300.0, 300.0, 50.0, 50.0),
    ];
    assert!((iou(&boxes[0], &boxes[1]) - 0.9).abs() < 1e-6);
    assert_eq!(iou(&boxes[0], &boxes[2]), 0.0);

    let keep = non_max_suppression(&boxes, &[0.9, 0.8, 0.7], 0.0, 0.5);
    assert_eq!(keep, vec![0, 2]);
}

#[test]
fn decoder_scenarios_through_companion() {
    let companion = Companion::from_regions(vec![region_a()]).expect("companion");

    let t = array![[0.5f32, 0.5, 0.1, 0.1, 0.9, 0.1, 0.95]];
    let out = companion.decode_detections(t.view(), 0.5, 0.4, 640, 480);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].class_id, 1);
    assert!((out[0].confidence - 0.855).abs() < 1e-6);

    let weak = array![[0.5f32, 0.5, 0.1, 0.1, 0.01, 1.0, 0.0]];
    assert!(companion
        .decode_detections(weak.view(), 0.5, 0.4, 640, 480)
        .is_empty());

    let empty = Array2::<f32>::zeros((0, 85));
    assert!(companion
        .decode_detections(empty.view(), 0.5, 0.4, 640, 480)
        .is_empty());
}

#[test]
fn stub_backend_cycle_yields_suppressed_detections() {
    let companion = Companion::from_regions(vec![region_a()]).expect("companion");
    let mut registry = BackendRegistry::new();
    registry.register(StubBackend::with_tensor(array![
        [0.25f32, 0.25, 0.2, 0.2, 0.95, 0.9, 0.05],
        [0.25, 0.25, 0.2, 0.19, 0.9, 0.85, 0.1],
        [0.75, 0.75, 0.2, 0.2, 0.8, 0.1, 0.9],
    ]));

    let detections = companion
        .detect(&registry, &Frame::blank(640, 480).unwrap())
        .expect("detect");

    assert_eq!(detections.len(), 2);
    assert_eq!(detections[0].class_id, 0);
    assert_eq!(detections[1].class_id, 1);
    assert!(detections[0].confidence > detections[1].confidence);
}
