use noodle_animation_core::{
    glam::{Quat, Vec4},
    parse_curve, PointDefinitions,
};
use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize)]
struct CurveFixture {
    points: Value,
    samples: Vec<Vec<f32>>,
}

fn load(name: &str) -> CurveFixture {
    noodle_test_fixtures::curves::load(name).expect("curve fixture")
}

#[test]
fn quarter_turn_slerps_through_the_midpoint() {
    let fx = load("quarter-turn");
    let curve = parse_curve::<Quat>(&fx.points, 1.0, &PointDefinitions::new()).unwrap();
    for sample in &fx.samples {
        let (t, degrees) = (sample[0], sample[1]);
        let got = curve.sample(t).angle_between(Quat::IDENTITY).to_degrees();
        assert!((got - degrees).abs() < 1e-3, "t={t}: {got} vs {degrees}");
    }
}

#[test]
fn eased_fade_uses_the_right_keyframe_easing() {
    let fx = load("eased-fade");
    let curve = parse_curve::<f32>(&fx.points, 1.0, &PointDefinitions::new()).unwrap();
    assert_eq!(curve.len(), 3);
    for sample in &fx.samples {
        let got = curve.sample(sample[0]);
        assert!((got - sample[1]).abs() < 1e-6, "t={}: {got} vs {}", sample[0], sample[1]);
    }
}

#[test]
fn hsv_sweep_travels_through_hue() {
    let fx = load("hsv-sweep");
    let curve = parse_curve::<Vec4>(&fx.points, 1.0, &PointDefinitions::new()).unwrap();
    for sample in &fx.samples {
        let expected = Vec4::new(sample[1], sample[2], sample[3], sample[4]);
        let got = curve.sample(sample[0]);
        assert!(got.abs_diff_eq(expected, 1e-4), "t={}: {got:?}", sample[0]);
    }
}

#[test]
fn every_manifest_curve_parses() {
    let keys = noodle_test_fixtures::curves::keys();
    assert!(!keys.is_empty());
    for key in keys {
        assert!(noodle_test_fixtures::curves::path(&key).unwrap().exists(), "{key}");
        let fx = load(&key);
        assert!(fx.points.is_array(), "{key}");
        assert!(!fx.samples.is_empty(), "{key}");
    }
}
