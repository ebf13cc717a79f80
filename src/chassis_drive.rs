use std::{sync::Arc, time::Duration};

use tracing::{debug, info};

use crate::{
    config::DriveConfig,
    geometry::{Angle, Pose},
    hardware::{Actuator, AzimuthActuator, Gyro, PreferenceStore},
    kinematics::{
        normalize_wheel_speeds, ChassisVelocity, ModuleState, SwerveKinematics, MODULE_COUNT,
    },
    odometry::SwerveOdometry,
    wheel_module::WheelModule,
    Error,
};

#[cfg(test)]
#[path = "chassis_drive_tests.rs"]
mod chassis_drive_tests;

/// The azimuth and drive actuator of a single wheel module.
pub type ModuleHardware = (Box<dyn AzimuthActuator>, Box<dyn Actuator>);

/// Defines a swerve drive with four wheel modules.
///
/// The drive converts chassis velocities into wheel commands and keeps track of the pose of
/// the robot on the field. It expects to be called from a single control loop: the commands
/// ([ChassisDrive::drive], [ChassisDrive::move_closed_loop]) whenever the desired motion
/// changes and [ChassisDrive::periodic] once every control period.
pub struct ChassisDrive {
    gyro: Box<dyn Gyro>,

    /// The wheel modules, in kinematics order.
    modules: [WheelModule; MODULE_COUNT],

    kinematics: SwerveKinematics,
    odometry: SwerveOdometry,

    /// The maximum speed shared by all modules.
    maximum_speed: f64,

    /// The time between two calls to periodic.
    control_period: Duration,
}

impl ChassisDrive {
    /// Sends the states to the modules after checking that every module is calibrated.
    fn dispatch(
        &mut self,
        states: &[ModuleState; MODULE_COUNT],
        open_loop: bool,
    ) -> Result<(), Error> {
        // Nothing moves unless every wheel can move
        if let Some(module) = self.modules.iter().find(|m| !m.is_calibrated()) {
            return Err(Error::ModuleNotCalibrated {
                position: module.position(),
            });
        }

        for (module, state) in self.modules.iter_mut().zip(states.iter()) {
            module.set_desired_state(*state, open_loop)?;
        }

        Ok(())
    }

    /// Drives the chassis with open loop control of the drive actuators.
    ///
    /// ## Parameters
    ///
    /// * 'vx' - The forward velocity in meters per second.
    /// * 'vy' - The leftward velocity in meters per second.
    /// * 'omega' - The counter-clockwise angular velocity in radians per second.
    /// * 'field_oriented' - `true` if `vx` and `vy` are relative to the field, in which case
    ///   they are rotated by the current heading of the robot.
    ///
    /// ## Errors
    ///
    /// * [Error::ModuleNotCalibrated] - Returned when any module is uncalibrated. No module
    ///   is commanded.
    /// * [Error::Hardware] - Returned when the gyro or an actuator fails.
    pub fn drive(&mut self, vx: f64, vy: f64, omega: f64, field_oriented: bool) -> Result<(), Error> {
        self.drive_with(vx, vy, omega, field_oriented, true)
    }

    fn drive_with(
        &mut self,
        vx: f64,
        vy: f64,
        omega: f64,
        field_oriented: bool,
        open_loop: bool,
    ) -> Result<(), Error> {
        let velocity = if field_oriented {
            ChassisVelocity::from_field_relative(vx, vy, omega, self.gyro.heading()?)
        } else {
            ChassisVelocity::new(vx, vy, omega)
        };

        let held_angles = self.last_commanded_angles();
        let mut states = self.kinematics.to_module_states(&velocity, &held_angles);
        let factor = normalize_wheel_speeds(&mut states, self.maximum_speed);

        debug!(
            "Driving with [{:.3}, {:.3}, {:.3}] (field oriented {}, open loop {}, scaled by {:.3})",
            velocity.vx, velocity.vy, velocity.omega, field_oriented, open_loop, factor
        );

        self.dispatch(&states, open_loop)
    }

    /// Creates a [ChassisDrive] from the configuration and loads the azimuth zero reference
    /// of every module.
    ///
    /// ## Parameters
    ///
    /// * 'config' - The configuration of the drive.
    /// * 'gyro' - The heading sensor.
    /// * 'hardware' - The actuators of each module, in the same order as the module
    ///   configurations.
    /// * 'store' - The store that holds the azimuth zero references.
    ///
    /// ## Errors
    ///
    /// Returns the first configuration, calibration or hardware error that is encountered.
    /// A drive with an uncalibrated module is never returned.
    pub fn from_config(
        config: &DriveConfig,
        gyro: Box<dyn Gyro>,
        hardware: [ModuleHardware; MODULE_COUNT],
        store: Arc<dyn PreferenceStore>,
    ) -> Result<Self, Error> {
        let modules = config
            .modules
            .iter()
            .zip(hardware)
            .map(|(module_config, (azimuth, drive))| {
                WheelModule::new(module_config, azimuth, drive, Arc::clone(&store))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let modules: [WheelModule; MODULE_COUNT] =
            modules
                .try_into()
                .map_err(|_| Error::InvalidConfiguration {
                    reason: format!("expected {} wheel modules", MODULE_COUNT),
                })?;

        let mut drive = Self::new(gyro, modules, config.control_period())?;
        drive.load_azimuth_zero_references()?;

        Ok(drive)
    }

    /// Returns the current heading of the robot as reported by the gyro.
    ///
    /// ## Errors
    ///
    /// * [Error::Hardware] - Returned when the gyro fails.
    pub fn heading(&self) -> Result<Angle, Error> {
        Ok(self.gyro.heading()?)
    }

    /// Returns the kinematics of the chassis.
    pub fn kinematics(&self) -> &SwerveKinematics {
        &self.kinematics
    }

    fn last_commanded_angles(&self) -> [Angle; MODULE_COUNT] {
        std::array::from_fn(|i| self.modules[i].last_commanded_angle())
    }

    /// Loads and applies the azimuth zero reference of every module.
    ///
    /// ## Errors
    ///
    /// * [Error::MissingZeroReference] - Returned for the first module that has no stored
    ///   reference. Modules after it are not loaded.
    /// * [Error::Hardware] - Returned when an azimuth actuator fails.
    pub fn load_azimuth_zero_references(&mut self) -> Result<(), Error> {
        for module in self.modules.iter_mut() {
            module.load_and_set_azimuth_zero_reference()?;
        }

        Ok(())
    }

    /// Returns the maximum wheel speed shared by all modules, in meters per second.
    pub fn maximum_speed(&self) -> f64 {
        self.maximum_speed
    }

    /// Returns the measured state of every module, in kinematics order.
    ///
    /// ## Errors
    ///
    /// * [Error::Hardware] - Returned when an actuator cannot be read.
    pub fn module_states(&self) -> Result<[ModuleState; MODULE_COUNT], Error> {
        let mut states = [ModuleState::default(); MODULE_COUNT];
        for (state, module) in states.iter_mut().zip(self.modules.iter()) {
            *state = module.state()?;
        }

        Ok(states)
    }

    /// Returns the wheel modules, in kinematics order.
    pub fn modules(&self) -> &[WheelModule; MODULE_COUNT] {
        &self.modules
    }

    /// Drives the chassis with closed loop velocity control of the drive actuators.
    ///
    /// This is the variant for following trajectories, where tracking the wheel speeds matters
    /// more than responsiveness. The parameters and errors are those of [ChassisDrive::drive].
    pub fn move_closed_loop(
        &mut self,
        vx: f64,
        vy: f64,
        omega: f64,
        field_oriented: bool,
    ) -> Result<(), Error> {
        self.drive_with(vx, vy, omega, field_oriented, false)
    }

    /// Creates a new [ChassisDrive].
    ///
    /// The odometry starts at the origin of the field with the current gyro heading as the
    /// zero heading.
    ///
    /// ## Parameters
    ///
    /// * 'gyro' - The heading sensor.
    /// * 'modules' - The wheel modules. Their order is the order of all module states.
    /// * 'control_period' - The time between two calls to [ChassisDrive::periodic].
    ///
    /// ## Errors
    ///
    /// * [Error::MismatchedMaximumSpeed] - Returned when the modules do not share one maximum
    ///   speed.
    /// * [Error::DuplicateWheelPosition] - Returned when two modules are in the same quadrant.
    /// * [Error::DuplicateWheelLocation] - Returned when two modules share a location.
    /// * [Error::Hardware] - Returned when the gyro fails.
    pub fn new(
        gyro: Box<dyn Gyro>,
        modules: [WheelModule; MODULE_COUNT],
        control_period: Duration,
    ) -> Result<Self, Error> {
        let maximum_speed = modules[0].maximum_speed();
        if let Some(module) = modules
            .iter()
            .find(|m| m.maximum_speed() != maximum_speed)
        {
            return Err(Error::MismatchedMaximumSpeed {
                expected: maximum_speed,
                found: module.maximum_speed(),
            });
        }

        let mut occupied = [false; MODULE_COUNT];
        for module in modules.iter() {
            let index = module.position().index();
            if occupied[index] {
                return Err(Error::DuplicateWheelPosition {
                    position: module.position(),
                });
            }
            occupied[index] = true;
        }

        let kinematics = SwerveKinematics::new(std::array::from_fn(|i| modules[i].location()))?;
        let odometry = SwerveOdometry::new(kinematics.clone(), gyro.heading()?, Pose::default());

        info!(
            "Assembled the swerve drive with a maximum speed of {} m/s and a control period of {:?}",
            maximum_speed, control_period
        );

        Ok(Self {
            gyro,
            modules,
            kinematics,
            odometry,
            maximum_speed,
            control_period,
        })
    }

    /// Updates the odometry from the current heading and module states. Must be called once
    /// every control period.
    ///
    /// Returns the updated pose.
    ///
    /// ## Errors
    ///
    /// * [Error::Hardware] - Returned when the gyro or an actuator cannot be read. The pose is
    ///   not updated.
    pub fn periodic(&mut self) -> Result<Pose, Error> {
        let heading = self.gyro.heading()?;
        let states = self.module_states()?;

        Ok(self.odometry.update(heading, &states, self.control_period))
    }

    /// Returns the current estimate of the robot pose on the field.
    pub fn pose(&self) -> Pose {
        self.odometry.pose()
    }

    /// Resets the position counter of every drive encoder to zero.
    ///
    /// ## Errors
    ///
    /// * [Error::Hardware] - Returned when a drive actuator fails.
    pub fn reset_drive_encoders(&mut self) -> Result<(), Error> {
        for module in self.modules.iter_mut() {
            module.reset_drive_encoder()?;
        }

        Ok(())
    }

    /// Resets the pose estimate to the given pose, for instance at the start of a trajectory.
    ///
    /// ## Errors
    ///
    /// * [Error::Hardware] - Returned when the gyro fails.
    pub fn reset_odometry(&mut self, pose: Pose) -> Result<(), Error> {
        let heading = self.gyro.heading()?;
        self.odometry.reset_position(pose, heading);

        info!("Reset the odometry to {}", pose);
        Ok(())
    }

    /// Sends the given states to the modules after normalizing their speeds.
    ///
    /// ## Parameters
    ///
    /// * 'states' - The desired state of each module, in kinematics order.
    /// * 'open_loop' - `true` to drive with a fraction of the supply, `false` to use velocity
    ///   control.
    ///
    /// ## Errors
    ///
    /// * [Error::ModuleNotCalibrated] - Returned when any module is uncalibrated. No module
    ///   is commanded.
    /// * [Error::Hardware] - Returned when an actuator fails.
    pub fn set_module_states(
        &mut self,
        states: &[ModuleState; MODULE_COUNT],
        open_loop: bool,
    ) -> Result<(), Error> {
        let mut states = *states;
        normalize_wheel_speeds(&mut states, self.maximum_speed);

        self.dispatch(&states, open_loop)
    }

    /// Stores the current absolute azimuth reading of every module as its zero reference.
    ///
    /// All wheels must be physically aligned to their zero azimuth. The references take
    /// effect after [ChassisDrive::load_azimuth_zero_references].
    ///
    /// ## Errors
    ///
    /// * [Error::Hardware] - Returned when an absolute sensor cannot be read.
    /// * [Error::Persistence] - Returned when the store cannot be written.
    pub fn store_azimuth_zero_references(&mut self) -> Result<(), Error> {
        for module in self.modules.iter_mut() {
            module.store_azimuth_zero_reference()?;
        }

        Ok(())
    }
}
