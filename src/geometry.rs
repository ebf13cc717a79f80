//! Defines the planar geometry used by the drive.
//!
//! All coordinates use the robot convention: x points forward, y points to the left and
//! positive rotations are counter-clockwise when viewed from above.

extern crate nalgebra as na;

use std::{
    fmt::Display,
    ops::{Add, Neg, Sub},
};

use float_cmp::{ApproxEq, F64Margin};
use na::{Isometry2, Vector2};
use serde::{Deserialize, Serialize};

use crate::{number_space::PeriodicSpace, Error};

#[cfg(test)]
#[path = "geometry_tests.rs"]
mod geometry_tests;

/// The largest angular difference, in radians, for which two angles are considered equal.
const ANGLE_EQUALITY_TOLERANCE: f64 = 1e-9;

/// Defines a planar rotation.
///
/// The angle is always stored in the range `[-PI, PI)`. Equality and arithmetic are
/// defined modulo 2 PI, so 190 degrees and -170 degrees are the same angle.
#[derive(Clone, Copy, Debug, Default)]
pub struct Angle {
    radians: f64,
}

impl Angle {
    /// Returns the cosine of the angle.
    pub fn cos(&self) -> f64 {
        self.radians.cos()
    }

    /// Returns the angle in degrees, in the range `[-180, 180)`.
    pub fn degrees(&self) -> f64 {
        self.radians.to_degrees()
    }

    /// Creates a new [Angle] from a value in degrees.
    pub fn from_degrees(degrees: f64) -> Self {
        Self::new(degrees.to_radians())
    }

    /// Creates a new [Angle] that points along the vector (x, y).
    ///
    /// The zero vector has no direction and results in the zero angle.
    pub fn from_xy(x: f64, y: f64) -> Self {
        Self::new(y.atan2(x))
    }

    /// Creates a new [Angle] from a value in radians. The value is wrapped into `[-PI, PI)`.
    pub fn new(radians: f64) -> Self {
        Self {
            radians: PeriodicSpace::angular().normalize_value(radians),
        }
    }

    /// Returns the angle in radians, in the range `[-PI, PI)`.
    pub fn radians(&self) -> f64 {
        self.radians
    }

    /// Returns the current angle rotated by `other`.
    pub fn rotate_by(&self, other: Angle) -> Self {
        *self + other
    }

    /// Returns the sine of the angle.
    pub fn sin(&self) -> f64 {
        self.radians.sin()
    }

    /// Returns the smallest signed rotation that takes the current angle to `target`.
    ///
    /// The result is in the range `[-PI, PI)`.
    pub fn smallest_rotation_to(&self, target: Angle) -> f64 {
        PeriodicSpace::angular().smallest_distance_between_values(self.radians, target.radians)
    }

    /// Returns the zero angle.
    pub fn zero() -> Self {
        Self { radians: 0.0 }
    }
}

impl Add for Angle {
    type Output = Angle;

    fn add(self, rhs: Self) -> Self::Output {
        Angle::new(self.radians + rhs.radians)
    }
}

impl Sub for Angle {
    type Output = Angle;

    fn sub(self, rhs: Self) -> Self::Output {
        Angle::new(self.radians - rhs.radians)
    }
}

impl Neg for Angle {
    type Output = Angle;

    fn neg(self) -> Self::Output {
        Angle::new(-self.radians)
    }
}

impl PartialEq for Angle {
    fn eq(&self, other: &Self) -> bool {
        self.smallest_rotation_to(*other).abs() <= ANGLE_EQUALITY_TOLERANCE
    }
}

impl ApproxEq for Angle {
    type Margin = F64Margin;

    fn approx_eq<M: Into<Self::Margin>>(self, other: Self, margin: M) -> bool {
        self.smallest_rotation_to(other).approx_eq(0.0, margin)
    }
}

impl Display for Angle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3} deg", self.degrees())
    }
}

/// Defines the location of the contact point of a wheel relative to the rotation
/// center of the robot, in meters.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct WheelLocation {
    /// The forward offset in meters.
    pub x: f64,

    /// The leftward offset in meters.
    pub y: f64,
}

impl WheelLocation {
    /// Returns the location as a vector.
    pub fn as_vector(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }

    /// Returns the distance between the current location and `other`.
    pub fn distance_to(&self, other: &WheelLocation) -> f64 {
        (self.as_vector() - other.as_vector()).norm()
    }

    /// Creates a new [WheelLocation].
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Defines the quadrant of the robot in which a wheel is located.
///
/// The quadrant provides a stable index for a wheel that does not depend on the order
/// in which the wheel modules are constructed.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum WheelPosition {
    /// x > 0, y > 0
    FrontLeft,
    /// x > 0, y < 0
    FrontRight,
    /// x < 0, y > 0
    RearLeft,
    /// x < 0, y < 0
    RearRight,
}

impl WheelPosition {
    /// Returns the quadrant for the given wheel location.
    ///
    /// ## Errors
    ///
    /// * [Error::WheelLocationOnAxis] - Returned when the location has a zero x or y coordinate.
    pub fn from_location(location: &WheelLocation) -> Result<Self, Error> {
        let WheelLocation { x, y } = *location;
        if x == 0.0 || y == 0.0 || !x.is_finite() || !y.is_finite() {
            return Err(Error::WheelLocationOnAxis { x, y });
        }

        let position = match (x > 0.0, y > 0.0) {
            (true, true) => WheelPosition::FrontLeft,
            (true, false) => WheelPosition::FrontRight,
            (false, true) => WheelPosition::RearLeft,
            (false, false) => WheelPosition::RearRight,
        };

        Ok(position)
    }

    /// Returns the index of the wheel.
    pub fn index(&self) -> usize {
        match self {
            WheelPosition::FrontLeft => 0,
            WheelPosition::FrontRight => 1,
            WheelPosition::RearLeft => 2,
            WheelPosition::RearRight => 3,
        }
    }

    /// Returns the key under which the azimuth zero reference of the wheel is stored.
    pub fn preference_key(&self) -> String {
        format!("wheel.{}", self.index())
    }
}

impl Display for WheelPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WheelPosition::FrontLeft => "front-left",
            WheelPosition::FrontRight => "front-right",
            WheelPosition::RearLeft => "rear-left",
            WheelPosition::RearRight => "rear-right",
        };
        write!(f, "{}", name)
    }
}

/// Defines a change in pose along an arc of constant curvature, expressed in the frame of
/// the starting pose.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Twist {
    /// The forward displacement in meters.
    pub dx: f64,

    /// The leftward displacement in meters.
    pub dy: f64,

    /// The change in heading in radians.
    pub dtheta: f64,
}

/// Defines the position and heading of the robot on the field.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Pose {
    x: f64,
    y: f64,
    heading: Angle,
}

impl Pose {
    /// Returns the pose reached by following the given [Twist] from the current pose.
    ///
    /// The twist is integrated along an arc of constant curvature rather than along a
    /// straight line.
    ///
    /// ## References
    ///
    /// * [Controls Engineering in FRC](https://file.tavsys.net/control/controls-engineering-in-frc.pdf)
    ///   Tyler Veness, section 10.2 "Pose exponential"
    pub fn exp(&self, twist: &Twist) -> Pose {
        let Twist { dx, dy, dtheta } = *twist;
        let sin_theta = dtheta.sin();
        let cos_theta = dtheta.cos();

        // Use the Taylor expansion close to zero to avoid dividing by a vanishing angle
        let (s, c) = if dtheta.abs() < 1e-9 {
            (1.0 - dtheta * dtheta / 6.0, 0.5 * dtheta)
        } else {
            (sin_theta / dtheta, (1.0 - cos_theta) / dtheta)
        };

        let local = Isometry2::new(Vector2::new(dx * s - dy * c, dx * c + dy * s), dtheta);
        let result = self.to_isometry() * local;

        Pose::new(
            result.translation.vector.x,
            result.translation.vector.y,
            Angle::new(result.rotation.angle()),
        )
    }

    /// Returns the heading of the robot.
    pub fn heading(&self) -> Angle {
        self.heading
    }

    /// Creates a new [Pose].
    ///
    /// ## Parameters
    ///
    /// * `x` - The x-coordinate on the field in meters.
    /// * `y` - The y-coordinate on the field in meters.
    /// * `heading` - The heading of the robot relative to the field.
    pub fn new(x: f64, y: f64, heading: Angle) -> Self {
        Self { x, y, heading }
    }

    /// Returns the pose as a rigid body transform from the robot frame to the field frame.
    pub fn to_isometry(&self) -> Isometry2<f64> {
        Isometry2::new(Vector2::new(self.x, self.y), self.heading.radians())
    }

    /// Returns a copy of the pose with the heading replaced.
    pub fn with_heading(&self, heading: Angle) -> Self {
        Self {
            x: self.x,
            y: self.y,
            heading,
        }
    }

    /// Returns the x-coordinate on the field in meters.
    pub fn x(&self) -> f64 {
        self.x
    }

    /// Returns the y-coordinate on the field in meters.
    pub fn y(&self) -> f64 {
        self.y
    }
}

impl Display for Pose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Pose [x: {:.3} m, y: {:.3} m, heading: {}]", self.x, self.y, self.heading)
    }
}
