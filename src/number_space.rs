//! Defines periodic number spaces and how values behave at the boundaries of these spaces.
//!
//! A periodic number space has lower and upper boundaries at specific non-infinity numbers
//! and wraps around, i.e. in order to go from the lower boundary to the upper boundary you can
//! pass through all the numbers between the lower and upper boundary, or you can go backwards
//! from the lower boundary and end up directly at the upper boundary. An example of this kind
//! of space is a space that describes the position on a circle.
//!
//! Two periodic spaces are used by the drive:
//!
//! * The angular space `[-PI, PI)` that all module and chassis headings live in.
//! * The encoder count space `[-counts / 2, counts / 2)` for a sensor that reports
//!   `counts` per revolution. This is used to turn an absolute target angle into the
//!   shortest relative move of a continuously accumulating position counter.
//!

use std::f64::consts::PI;

#[cfg(test)]
#[path = "number_space_tests.rs"]
mod number_space_tests;

/// Defines a periodic number space that wraps around at the period.
///
/// The space contains the values in the half-open range `[range_start, range_start + range_size)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PeriodicSpace {
    range_start: f64,
    range_size: f64,
}

impl PeriodicSpace {
    /// Returns the angular space `[-PI, PI)`.
    ///
    /// ## Example
    ///
    /// ```
    /// use core::f64::consts::PI;
    /// use swerve_drive_core::number_space::PeriodicSpace;
    ///
    /// let space = PeriodicSpace::angular();
    /// assert_eq!(-PI, space.normalize_value(PI));
    /// assert!((space.normalize_value(2.5 * PI) - 0.5 * PI).abs() < 1e-12);
    /// ```
    pub fn angular() -> Self {
        Self::new(-PI, 2.0 * PI)
    }

    /// Returns the space for an encoder that reports `counts_per_revolution` counts for
    /// one full revolution, centred on zero.
    ///
    /// ## Example
    ///
    /// ```
    /// use swerve_drive_core::number_space::PeriodicSpace;
    ///
    /// let space = PeriodicSpace::encoder_counts(4096.0);
    /// assert_eq!(1024.0, space.normalize_value(-7168.0));
    /// assert_eq!(-1024.0, space.smallest_distance_between_values(1024.0, 4096.0));
    /// ```
    pub fn encoder_counts(counts_per_revolution: f64) -> Self {
        Self::new(-0.5 * counts_per_revolution, counts_per_revolution)
    }

    /// Creates a new [PeriodicSpace] starting at `range_start` that covers `range_size`.
    ///
    /// ## Parameters
    ///
    /// * `range_start` - The lowest value in the space.
    /// * `range_size` - The size of the period. Expected to be strictly positive.
    pub fn new(range_start: f64, range_size: f64) -> Self {
        Self {
            range_start,
            range_size,
        }
    }

    /// Returns the value in the space that is equivalent to the given value.
    ///
    /// ## Parameters
    ///
    /// * `value` - The value that should be normalized.
    pub fn normalize_value(&self, value: f64) -> f64 {
        let offset = (value - self.range_start).rem_euclid(self.range_size);

        // rem_euclid can round up to the period for tiny negative offsets
        if offset >= self.range_size {
            self.range_start
        } else {
            self.range_start + offset
        }
    }

    /// Returns the size of the period.
    pub fn range_size(&self) -> f64 {
        self.range_size
    }

    /// Returns the lowest value in the space.
    pub fn range_start(&self) -> f64 {
        self.range_start
    }

    /// Returns the smallest signed distance to travel from `start` to `end`.
    ///
    /// Across a boundary the distance may be shorter than the plain difference. The result
    /// is always in the range `[-range_size / 2, range_size / 2)`.
    ///
    /// ## Parameters
    ///
    /// * `start` - The starting value.
    /// * `end` - The ending value.
    pub fn smallest_distance_between_values(&self, start: f64, end: f64) -> f64 {
        let half = 0.5 * self.range_size;
        let diff = (end - start + half).rem_euclid(self.range_size) - half;

        if diff >= half {
            diff - self.range_size
        } else {
            diff
        }
    }
}
