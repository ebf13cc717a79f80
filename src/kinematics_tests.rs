use std::f64::consts::{PI, SQRT_2};

use float_cmp::{ApproxEq, F64Margin};

use super::*;

const HALF_WIDTH: f64 = 0.27305;

fn margin() -> F64Margin {
    F64Margin {
        ulps: 2,
        epsilon: 1e-9,
    }
}

fn square_locations() -> [WheelLocation; MODULE_COUNT] {
    [
        WheelLocation::new(HALF_WIDTH, HALF_WIDTH),
        WheelLocation::new(HALF_WIDTH, -HALF_WIDTH),
        WheelLocation::new(-HALF_WIDTH, HALF_WIDTH),
        WheelLocation::new(-HALF_WIDTH, -HALF_WIDTH),
    ]
}

fn zero_angles() -> [Angle; MODULE_COUNT] {
    [Angle::zero(); MODULE_COUNT]
}

fn assert_state(state: &ModuleState, speed: f64, degrees: f64) {
    assert!(
        state.speed().approx_eq(speed, margin()),
        "Expected speed {} but was {}",
        speed,
        state.speed()
    );
    assert!(
        state
            .angle()
            .approx_eq(Angle::from_degrees(degrees), margin()),
        "Expected angle {} deg but was {}",
        degrees,
        state.angle()
    );
}

// ModuleState

#[test]
fn when_optimizing_a_small_rotation_it_should_keep_the_state() {
    let state = ModuleState::new(1.5, Angle::from_degrees(80.0));
    let optimized = state.optimize(Angle::zero());

    assert_eq!(optimized, state);
}

#[test]
fn when_optimizing_a_large_rotation_it_should_reverse_the_wheel() {
    let state = ModuleState::new(1.0, Angle::from_degrees(170.0));
    let optimized = state.optimize(Angle::zero());

    assert_state(&optimized, -1.0, -10.0);
}

#[test]
fn when_optimizing_across_the_wrap_it_should_use_the_short_way_around() {
    let state = ModuleState::new(2.0, Angle::from_degrees(-170.0));
    let optimized = state.optimize(Angle::from_degrees(170.0));

    assert_state(&optimized, 2.0, -170.0);
}

#[test]
fn when_optimizing_any_state_it_should_never_rotate_more_than_a_quarter_turn() {
    for current in (-36..36).map(|i| Angle::from_degrees(5.0 * i as f64 + 0.5)) {
        for desired in (-36..36).map(|i| Angle::from_degrees(5.0 * i as f64)) {
            let optimized = ModuleState::new(1.0, desired).optimize(current);
            let rotation = current.smallest_rotation_to(optimized.angle());

            assert!(
                rotation.abs() <= 0.5 * PI + 1e-9,
                "Rotating from {} to {} took {} rad",
                current,
                desired,
                rotation
            );
            assert!(optimized.speed().abs().approx_eq(1.0, margin()));
        }
    }
}

// ChassisVelocity

#[test]
fn when_checking_a_zero_velocity_it_should_be_stationary() {
    assert!(ChassisVelocity::new(0.0, 0.0, 0.0).is_stationary());
    assert!(ChassisVelocity::default().is_stationary());
    assert!(!ChassisVelocity::new(0.0, 0.0, 0.1).is_stationary());
    assert!(!ChassisVelocity::new(0.0, -0.1, 0.0).is_stationary());
}

#[test]
fn when_converting_a_field_relative_velocity_it_should_rotate_by_the_heading() {
    let velocity = ChassisVelocity::from_field_relative(1.0, 0.0, 0.5, Angle::from_degrees(90.0));

    assert!(velocity.vx.approx_eq(0.0, margin()));
    assert!(velocity.vy.approx_eq(-1.0, margin()));
    assert_eq!(velocity.omega, 0.5);

    let velocity = ChassisVelocity::from_field_relative(1.0, 2.0, 0.0, Angle::zero());
    assert_eq!(velocity, ChassisVelocity::new(1.0, 2.0, 0.0));
}

// normalize_wheel_speeds

#[test]
fn when_all_speeds_are_within_the_limit_it_should_not_change_them() {
    let mut states = [
        ModuleState::new(1.0, Angle::zero()),
        ModuleState::new(-2.0, Angle::zero()),
        ModuleState::new(3.0, Angle::zero()),
        ModuleState::new(0.5, Angle::zero()),
    ];
    let original = states;

    let factor = normalize_wheel_speeds(&mut states, 3.0);

    assert_eq!(factor, 1.0);
    assert_eq!(states, original);
}

#[test]
fn when_a_speed_exceeds_the_limit_it_should_scale_all_speeds() {
    let mut states = [
        ModuleState::new(1.0, Angle::from_degrees(10.0)),
        ModuleState::new(-4.0, Angle::from_degrees(20.0)),
        ModuleState::new(2.0, Angle::from_degrees(30.0)),
        ModuleState::new(0.0, Angle::from_degrees(40.0)),
    ];

    let factor = normalize_wheel_speeds(&mut states, 2.0);

    assert!(factor.approx_eq(0.5, margin()));
    assert_state(&states[0], 0.5, 10.0);
    assert_state(&states[1], -2.0, 20.0);
    assert_state(&states[2], 1.0, 30.0);
    assert_state(&states[3], 0.0, 40.0);
}

#[test]
fn when_normalizing_twice_it_should_not_change_the_result() {
    let mut states = [
        ModuleState::new(6.0, Angle::zero()),
        ModuleState::new(-3.0, Angle::zero()),
        ModuleState::new(1.5, Angle::zero()),
        ModuleState::new(4.5, Angle::zero()),
    ];

    normalize_wheel_speeds(&mut states, 3.84020432);
    let once = states;
    normalize_wheel_speeds(&mut states, 3.84020432);

    for (first, second) in once.iter().zip(states.iter()) {
        assert!(first.speed().approx_eq(second.speed(), margin()));
    }
    assert!(states[0].speed().approx_eq(3.84020432, margin()));
    assert!((states[0].speed() / states[1].speed()).approx_eq(-2.0, margin()));
}

// SwerveKinematics

#[test]
fn when_creating_kinematics_with_coincident_wheels_it_should_error() {
    let mut locations = square_locations();
    locations[3] = locations[0];

    let result = SwerveKinematics::new(locations);

    assert_eq!(
        result.unwrap_err(),
        Error::DuplicateWheelLocation {
            x: HALF_WIDTH,
            y: HALF_WIDTH
        }
    );
}

#[test]
fn when_creating_kinematics_it_should_keep_the_locations() {
    let kinematics = SwerveKinematics::new(square_locations()).unwrap();

    assert_eq!(kinematics.locations(), &square_locations());
}

#[test]
fn when_driving_forward_all_wheels_should_point_forward() {
    let kinematics = SwerveKinematics::new(square_locations()).unwrap();

    let states = kinematics.to_module_states(&ChassisVelocity::new(1.0, 0.0, 0.0), &zero_angles());

    for state in states.iter() {
        assert_state(state, 1.0, 0.0);
    }
}

#[test]
fn when_strafing_all_wheels_should_point_sideways() {
    let kinematics = SwerveKinematics::new(square_locations()).unwrap();

    let states =
        kinematics.to_module_states(&ChassisVelocity::new(0.0, 2.0, 0.0), &zero_angles());

    for state in states.iter() {
        assert_state(state, 2.0, 90.0);
    }
}

#[test]
fn when_rotating_in_place_the_wheels_should_be_tangential() {
    let kinematics = SwerveKinematics::new(square_locations()).unwrap();

    let states =
        kinematics.to_module_states(&ChassisVelocity::new(0.0, 0.0, 1.0), &zero_angles());

    let speed = HALF_WIDTH * SQRT_2;
    assert_state(&states[0], speed, 135.0);
    assert_state(&states[1], speed, 45.0);
    assert_state(&states[2], speed, -135.0);
    assert_state(&states[3], speed, -45.0);
}

#[test]
fn when_stationary_the_wheels_should_hold_their_angles() {
    let kinematics = SwerveKinematics::new(square_locations()).unwrap();
    let held = [
        Angle::from_degrees(10.0),
        Angle::from_degrees(-20.0),
        Angle::from_degrees(135.0),
        Angle::from_degrees(-90.0),
    ];

    let states = kinematics.to_module_states(&ChassisVelocity::default(), &held);

    for (state, angle) in states.iter().zip(held.iter()) {
        assert_eq!(state.speed(), 0.0);
        assert_eq!(state.angle(), *angle);
    }
}

#[test]
fn when_rotating_around_a_wheel_that_wheel_should_hold_its_angle() {
    let kinematics = SwerveKinematics::new(square_locations()).unwrap();
    let held = [
        Angle::from_degrees(30.0),
        Angle::from_degrees(-20.0),
        Angle::from_degrees(135.0),
        Angle::from_degrees(-90.0),
    ];

    // Turning around the front left wheel leaves that wheel without a velocity.
    let velocity = ChassisVelocity::new(HALF_WIDTH, -HALF_WIDTH, 1.0);
    let states = kinematics.to_module_states(&velocity, &held);

    assert_eq!(states[0].speed(), 0.0);
    assert_eq!(states[0].angle(), held[0]);
    assert_state(&states[1], 2.0 * HALF_WIDTH, 0.0);
    assert_state(&states[2], 2.0 * HALF_WIDTH, -90.0);
    assert_state(&states[3], 2.0 * SQRT_2 * HALF_WIDTH, -45.0);
}

#[test]
fn when_converting_states_back_it_should_recover_the_chassis_velocity() {
    let kinematics = SwerveKinematics::new(square_locations()).unwrap();
    let velocity = ChassisVelocity::new(1.0, 0.5, 0.3);

    let states = kinematics.to_module_states(&velocity, &zero_angles());
    let recovered = kinematics.to_chassis_velocity(&states);

    assert!(recovered.vx.approx_eq(1.0, margin()));
    assert!(recovered.vy.approx_eq(0.5, margin()));
    assert!(recovered.omega.approx_eq(0.3, margin()));
}

#[test]
fn when_converting_states_of_an_asymmetric_chassis_back_it_should_recover_the_chassis_velocity()
{
    let locations = [
        WheelLocation::new(0.4, 0.2),
        WheelLocation::new(0.3, -0.25),
        WheelLocation::new(-0.2, 0.3),
        WheelLocation::new(-0.35, -0.2),
    ];
    let kinematics = SwerveKinematics::new(locations).unwrap();
    let velocity = ChassisVelocity::new(-0.7, 1.2, -2.0);

    let states = kinematics.to_module_states(&velocity, &zero_angles());
    let recovered = kinematics.to_chassis_velocity(&states);

    assert!(recovered.vx.approx_eq(-0.7, margin()));
    assert!(recovered.vy.approx_eq(1.2, margin()));
    assert!(recovered.omega.approx_eq(-2.0, margin()));
}

#[test]
fn when_converting_inconsistent_states_back_it_should_return_the_least_squares_fit() {
    let kinematics = SwerveKinematics::new(square_locations()).unwrap();
    let states = [
        ModuleState::new(2.0, Angle::zero()),
        ModuleState::new(1.0, Angle::zero()),
        ModuleState::new(1.0, Angle::zero()),
        ModuleState::new(1.0, Angle::zero()),
    ];

    let recovered = kinematics.to_chassis_velocity(&states);

    assert!(recovered.vx.approx_eq(1.25, margin()));
    assert!(recovered.vy.approx_eq(0.0, margin()));
    assert!(recovered.omega.approx_eq(-1.0 / (8.0 * HALF_WIDTH), margin()));
}
