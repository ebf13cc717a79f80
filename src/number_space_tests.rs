use super::*;
use std::f64::consts::PI;

fn assert_close(expected: f64, actual: f64) {
    assert!(
        (expected - actual).abs() < 1e-12,
        "Expected {} and {} to be equal within 1e-12",
        expected,
        actual
    );
}

#[test]
fn test_angular_space_bounds() {
    let space = PeriodicSpace::angular();
    assert_eq!(space.range_start(), -PI);
    assert_eq!(space.range_size(), 2.0 * PI);
}

#[test]
fn test_angular_space_normalize_value() {
    let space = PeriodicSpace::angular();
    assert_eq!(space.normalize_value(0.0), 0.0);
    assert_eq!(space.normalize_value(-PI), -PI);
    assert_eq!(space.normalize_value(PI), -PI);
    assert_close(-0.5 * PI, space.normalize_value(1.5 * PI));
    assert_close(0.25 * PI, space.normalize_value(-1.75 * PI));
}

#[test]
fn test_angular_space_normalize_value_stays_inside_range() {
    let space = PeriodicSpace::angular();
    for i in -100..100 {
        let value = space.normalize_value(f64::from(i) * 0.37);
        assert!(value >= -PI && value < PI, "{} is outside [-PI, PI)", value);
    }

    for value in [3.0 * PI, -3.0 * PI, 5.0 * PI, -PI - 1e-15, PI - 1e-15] {
        let normalized = space.normalize_value(value);
        assert!(normalized >= -PI && normalized < PI);
    }
}

#[test]
fn test_angular_space_smallest_distance_between_values() {
    let space = PeriodicSpace::angular();
    assert_close(0.0, space.smallest_distance_between_values(0.0, 2.0 * PI));
    assert_close(
        -PI / 2.0,
        space.smallest_distance_between_values(PI / 4.0, -PI / 4.0),
    );
    assert_close(
        -PI / 2.0,
        space.smallest_distance_between_values(PI / 4.0, 7.0 * PI / 4.0),
    );
    assert_close(
        -0.5 * PI,
        space.smallest_distance_between_values(0.0, 1.5 * PI),
    );
}

#[test]
fn test_angular_space_smallest_distance_is_bounded_by_half_a_period() {
    let space = PeriodicSpace::angular();
    for i in -50..50 {
        for j in -50..50 {
            let d = space.smallest_distance_between_values(f64::from(i) * 0.21, f64::from(j) * 0.4);
            assert!(d >= -PI && d < PI);
        }
    }
}

#[test]
fn test_encoder_count_space_normalize_value() {
    let space = PeriodicSpace::encoder_counts(4096.0);
    assert_eq!(space.normalize_value(0.0), 0.0);
    assert_eq!(space.normalize_value(1024.0), 1024.0);
    assert_eq!(space.normalize_value(2048.0), -2048.0);
    assert_eq!(space.normalize_value(3072.0), -1024.0);
    assert_eq!(space.normalize_value(4096.0), 0.0);
    assert_eq!(space.normalize_value(-1024.0), -1024.0);
    assert_eq!(space.normalize_value(-7168.0), 1024.0);
}

#[test]
fn test_encoder_count_space_smallest_distance_between_values() {
    let space = PeriodicSpace::encoder_counts(4096.0);
    assert_eq!(space.smallest_distance_between_values(0.0, 1024.0), 1024.0);
    assert_eq!(space.smallest_distance_between_values(4096.0, 1024.0), 1024.0);
    assert_eq!(space.smallest_distance_between_values(1024.0, 4096.0), -1024.0);
    assert_eq!(space.smallest_distance_between_values(10_000.0, 0.0), -1808.0);
    assert_eq!(space.smallest_distance_between_values(-4000.0, 4000.0), -192.0);
}
