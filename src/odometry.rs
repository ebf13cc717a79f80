use std::time::Duration;

use tracing::trace;

use crate::{
    geometry::{Angle, Pose, Twist},
    kinematics::{ModuleState, SwerveKinematics, MODULE_COUNT},
};

#[cfg(test)]
#[path = "odometry_tests.rs"]
mod odometry_tests;

/// Tracks the pose of the robot on the field by integrating the wheel module states and the
/// heading reported by the gyro.
///
/// The translation is taken from the wheels and the rotation from the gyro. Each update
/// integrates the chassis velocity along an arc of constant curvature over the elapsed time.
#[derive(Clone, Debug)]
pub struct SwerveOdometry {
    kinematics: SwerveKinematics,
    pose: Pose,

    /// The difference between the heading of the pose and the heading reported by the gyro.
    gyro_offset: Angle,

    /// The field relative heading at the previous update.
    previous_angle: Angle,

    /// The timestamp of the previous timestamped update.
    previous_timestamp: Option<Duration>,
}

impl SwerveOdometry {
    /// Returns the kinematics used to convert the module states.
    pub fn kinematics(&self) -> &SwerveKinematics {
        &self.kinematics
    }

    /// Creates a new [SwerveOdometry].
    ///
    /// ## Parameters
    ///
    /// * 'kinematics' - The kinematics of the chassis.
    /// * 'gyro_heading' - The heading currently reported by the gyro.
    /// * 'initial_pose' - The pose of the robot on the field at this moment.
    pub fn new(kinematics: SwerveKinematics, gyro_heading: Angle, initial_pose: Pose) -> Self {
        Self {
            kinematics,
            pose: initial_pose,
            gyro_offset: initial_pose.heading() - gyro_heading,
            previous_angle: initial_pose.heading(),
            previous_timestamp: None,
        }
    }

    /// Returns the current estimate of the robot pose.
    pub fn pose(&self) -> Pose {
        self.pose
    }

    /// Resets the pose estimate to the given pose.
    ///
    /// Subsequent gyro headings are interpreted relative to the heading of `pose`, so the gyro
    /// itself does not need to be reset.
    ///
    /// ## Parameters
    ///
    /// * 'pose' - The new pose of the robot on the field.
    /// * 'gyro_heading' - The heading currently reported by the gyro.
    pub fn reset_position(&mut self, pose: Pose, gyro_heading: Angle) {
        self.pose = pose;
        self.previous_angle = pose.heading();
        self.gyro_offset = pose.heading() - gyro_heading;
        self.previous_timestamp = None;
    }

    /// Integrates the module states over the elapsed time and returns the new pose.
    ///
    /// ## Parameters
    ///
    /// * 'gyro_heading' - The heading currently reported by the gyro.
    /// * 'states' - The measured state of each module, in kinematics order.
    /// * 'elapsed' - The time since the previous update.
    pub fn update(
        &mut self,
        gyro_heading: Angle,
        states: &[ModuleState; MODULE_COUNT],
        elapsed: Duration,
    ) -> Pose {
        let period = elapsed.as_secs_f64();
        let angle = gyro_heading + self.gyro_offset;
        let velocity = self.kinematics.to_chassis_velocity(states);

        let twist = Twist {
            dx: velocity.vx * period,
            dy: velocity.vy * period,
            dtheta: self.previous_angle.smallest_rotation_to(angle),
        };

        self.pose = self.pose.exp(&twist).with_heading(angle);
        self.previous_angle = angle;

        trace!(
            "Odometry update over {:?}: chassis velocity [{:.3}, {:.3}, {:.3}], {}",
            elapsed,
            velocity.vx,
            velocity.vy,
            velocity.omega,
            self.pose
        );

        self.pose
    }

    /// Integrates the module states up to the given timestamp and returns the new pose.
    ///
    /// The elapsed time is derived from the timestamp of the previous call. The first call
    /// after creation or a reset only records the timestamp and the heading.
    ///
    /// ## Parameters
    ///
    /// * 'timestamp' - The time at which the measurements were taken, from a monotonic clock.
    /// * 'gyro_heading' - The heading currently reported by the gyro.
    /// * 'states' - The measured state of each module, in kinematics order.
    pub fn update_with_time(
        &mut self,
        timestamp: Duration,
        gyro_heading: Angle,
        states: &[ModuleState; MODULE_COUNT],
    ) -> Pose {
        let elapsed = self
            .previous_timestamp
            .map(|previous| timestamp.saturating_sub(previous))
            .unwrap_or(Duration::ZERO);
        self.previous_timestamp = Some(timestamp);

        self.update(gyro_heading, states, elapsed)
    }
}
