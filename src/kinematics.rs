//! Maps between the velocity of the chassis and the states of the four wheel modules.
//!
//! For a wheel at location (x, y) relative to the rotation center the wheel velocity is
//!
//! ```text
//! | v_x,i |   | 1  0  -y_i |   | v_x |
//! |       | = |            | * | v_y |
//! | v_y,i |   | 0  1   x_i |   | ω   |
//! ```
//!
//! Stacking the rows for all wheels gives an 8x3 matrix. Going from the chassis velocity to the
//! wheel velocities is a plain multiplication. Going back is over-determined and is solved as a
//! least squares fit.

extern crate nalgebra as na;

use std::{f64::consts::PI, fmt::Display};

use na::{SMatrix, SVector, Vector3};

use crate::{
    geometry::{Angle, WheelLocation},
    Error,
};

#[cfg(test)]
#[path = "kinematics_tests.rs"]
mod kinematics_tests;

/// The number of wheel modules on the chassis.
pub const MODULE_COUNT: usize = 4;

/// The minimum distance, in meters, between two wheel locations.
const MINIMUM_WHEEL_SEPARATION: f64 = 1e-9;

/// Stores the speed and azimuth angle of a wheel module.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ModuleState {
    /// The signed speed of the wheel in meters per second.
    speed: f64,

    /// The direction in which the wheel points.
    angle: Angle,
}

impl ModuleState {
    /// Returns the direction in which the wheel points.
    pub fn angle(&self) -> Angle {
        self.angle
    }

    /// Creates a new [ModuleState].
    ///
    /// ## Parameters
    ///
    /// * 'speed' - The signed speed of the wheel in meters per second.
    /// * 'angle' - The direction in which the wheel points.
    pub fn new(speed: f64, angle: Angle) -> Self {
        Self { speed, angle }
    }

    /// Returns the state that reaches the same wheel velocity with the least azimuth travel
    /// from the `current` azimuth angle.
    ///
    /// When the target angle is more than 90 degrees away from the current angle the wheel
    /// is turned to the opposite direction and driven in reverse instead. The returned
    /// state is never more than 90 degrees away from `current`.
    pub fn optimize(&self, current: Angle) -> Self {
        let rotation = current.smallest_rotation_to(self.angle);
        if rotation.abs() > 0.5 * PI {
            Self::new(-self.speed, self.angle + Angle::new(PI))
        } else {
            *self
        }
    }

    /// Returns the signed speed of the wheel in meters per second.
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Returns a copy of the state with the speed replaced.
    pub fn with_speed(&self, speed: f64) -> Self {
        Self::new(speed, self.angle)
    }
}

impl Display for ModuleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ModuleState [{:.3} m/s, {}]", self.speed, self.angle)
    }
}

/// Stores the velocity of the chassis.
///
/// Whether the translational components are relative to the robot or to the field depends
/// on how the value was obtained; [ChassisVelocity::from_field_relative] converts a field
/// relative velocity to a robot relative one.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ChassisVelocity {
    /// The forward velocity in meters per second.
    pub vx: f64,

    /// The leftward velocity in meters per second.
    pub vy: f64,

    /// The counter-clockwise angular velocity in radians per second.
    pub omega: f64,
}

impl ChassisVelocity {
    /// Converts a field relative velocity to a robot relative velocity.
    ///
    /// ## Parameters
    ///
    /// * 'vx' - The velocity along the field x-axis in meters per second.
    /// * 'vy' - The velocity along the field y-axis in meters per second.
    /// * 'omega' - The angular velocity in radians per second.
    /// * 'heading' - The heading of the robot relative to the field at this moment.
    pub fn from_field_relative(vx: f64, vy: f64, omega: f64, heading: Angle) -> Self {
        let (sin, cos) = (heading.sin(), heading.cos());
        Self::new(vx * cos + vy * sin, -vx * sin + vy * cos, omega)
    }

    /// Returns a value indicating whether the chassis is asked to stand still.
    pub fn is_stationary(&self) -> bool {
        self.vx == 0.0 && self.vy == 0.0 && self.omega == 0.0
    }

    /// Creates a new [ChassisVelocity].
    pub fn new(vx: f64, vy: f64, omega: f64) -> Self {
        Self { vx, vy, omega }
    }
}

/// Scales the wheel speeds down so that none of them exceeds `maximum_speed`.
///
/// All speeds are scaled by the same factor so the ratios between the wheels, and thus the
/// path the chassis follows, are unchanged. Speeds are never scaled up.
///
/// Returns the factor that was applied, which is 1.0 if nothing had to change.
pub fn normalize_wheel_speeds(states: &mut [ModuleState], maximum_speed: f64) -> f64 {
    let fastest = states
        .iter()
        .map(|s| s.speed().abs())
        .fold(0.0_f64, f64::max);

    if fastest <= maximum_speed {
        return 1.0;
    }

    for state in states.iter_mut() {
        *state = state.with_speed(state.speed() / fastest * maximum_speed);
    }

    maximum_speed / fastest
}

/// Defines the kinematics of a swerve chassis with four wheel modules at fixed locations.
#[derive(Clone, Debug)]
pub struct SwerveKinematics {
    /// The location of each wheel, in module order.
    locations: [WheelLocation; MODULE_COUNT],

    /// Maps the chassis velocity to the stacked wheel velocity vectors.
    inverse_kinematics: SMatrix<f64, 8, 3>,

    /// The least squares solution that maps the stacked wheel velocity vectors back to the
    /// chassis velocity.
    forward_kinematics: SMatrix<f64, 3, 8>,
}

impl SwerveKinematics {
    /// Returns the wheel locations in module order.
    pub fn locations(&self) -> &[WheelLocation; MODULE_COUNT] {
        &self.locations
    }

    /// Creates a new [SwerveKinematics] for wheels at the given locations.
    ///
    /// ## Parameters
    ///
    /// * 'locations' - The location of each wheel relative to the rotation center. The order
    ///   of the locations is the order of the module states used by all other methods.
    ///
    /// ## Errors
    ///
    /// * [Error::DuplicateWheelLocation] - Returned when two wheels share a location.
    /// * [Error::SingularWheelGeometry] - Returned when the chassis velocity cannot be
    ///   recovered from the wheel velocities.
    pub fn new(locations: [WheelLocation; MODULE_COUNT]) -> Result<Self, Error> {
        for (i, first) in locations.iter().enumerate() {
            for second in locations.iter().skip(i + 1) {
                if first.distance_to(second) < MINIMUM_WHEEL_SEPARATION {
                    return Err(Error::DuplicateWheelLocation {
                        x: first.x,
                        y: first.y,
                    });
                }
            }
        }

        let mut inverse_kinematics = SMatrix::<f64, 8, 3>::zeros();
        for (i, location) in locations.iter().enumerate() {
            inverse_kinematics[(2 * i, 0)] = 1.0;
            inverse_kinematics[(2 * i, 2)] = -location.y;
            inverse_kinematics[(2 * i + 1, 1)] = 1.0;
            inverse_kinematics[(2 * i + 1, 2)] = location.x;
        }

        let transposed = inverse_kinematics.transpose();
        let normal_matrix = transposed * inverse_kinematics;
        let normal_inverse = normal_matrix
            .try_inverse()
            .ok_or(Error::SingularWheelGeometry)?;
        let forward_kinematics = normal_inverse * transposed;

        Ok(Self {
            locations,
            inverse_kinematics,
            forward_kinematics,
        })
    }

    /// Returns the best fitting chassis velocity for the given module states.
    ///
    /// The four wheels over-determine the three degrees of freedom of the chassis, so the
    /// result is the least squares fit. For consistent module states the fit is exact.
    pub fn to_chassis_velocity(&self, states: &[ModuleState; MODULE_COUNT]) -> ChassisVelocity {
        let wheel_velocities = SVector::<f64, 8>::from_fn(|row, _| {
            let state = &states[row / 2];
            if row % 2 == 0 {
                state.speed() * state.angle().cos()
            } else {
                state.speed() * state.angle().sin()
            }
        });

        let chassis = self.forward_kinematics * wheel_velocities;
        ChassisVelocity::new(chassis[0], chassis[1], chassis[2])
    }

    /// Returns the module states that produce the given robot relative chassis velocity.
    ///
    /// A wheel that does not move has no defined direction. Any module whose wheel velocity
    /// is zero gets a speed of zero and keeps its angle from `held_angles`, normally the angle
    /// it was last commanded to, so that the wheel does not turn while standing still. This
    /// covers every module when the chassis is stationary, and a single module when the
    /// chassis rotates around that wheel.
    ///
    /// ## Parameters
    ///
    /// * 'velocity' - The robot relative chassis velocity.
    /// * 'held_angles' - The angle for each module to keep while its wheel stands still.
    pub fn to_module_states(
        &self,
        velocity: &ChassisVelocity,
        held_angles: &[Angle; MODULE_COUNT],
    ) -> [ModuleState; MODULE_COUNT] {
        if velocity.is_stationary() {
            return (*held_angles).map(|angle| ModuleState::new(0.0, angle));
        }

        let wheel_velocities =
            self.inverse_kinematics * Vector3::new(velocity.vx, velocity.vy, velocity.omega);

        std::array::from_fn(|i| {
            let x = wheel_velocities[2 * i];
            let y = wheel_velocities[2 * i + 1];
            let speed = x.hypot(y);
            if speed == 0.0 {
                ModuleState::new(0.0, held_angles[i])
            } else {
                ModuleState::new(speed, Angle::from_xy(x, y))
            }
        })
    }
}
