use std::cell::Cell;

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use tracing::warn;

use super::actuator_interface::{Actuator, ActuatorCommand, AzimuthActuator, HardwareFault};

#[cfg(test)]
#[path = "channel_actuator_tests.rs"]
mod channel_actuator_tests;

/// The fault code for a read before the hardware interface has published any feedback.
pub const FAULT_NO_FEEDBACK: i32 = 1;

/// The fault code for a hardware interface that has hung up.
pub const FAULT_DISCONNECTED: i32 = 2;

/// The fault code for an absolute position read on an actuator without an absolute sensor.
pub const FAULT_NO_ABSOLUTE_SENSOR: i32 = 3;

/// The number of counts per revolution of the absolute sensor when none is configured.
pub const DEFAULT_ABSOLUTE_COUNTS_PER_REVOLUTION: i32 = 4096;

/// Stores a snapshot of the sensor values of an actuator as published by the
/// hardware interface.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ActuatorFeedback {
    /// The relative position counter, in encoder counts.
    pub position: f64,

    /// The velocity measured by the relative encoder, in encoder counts per 100 ms.
    pub velocity: f64,

    /// The raw reading of the absolute position sensor, if the actuator has one. The
    /// [ChannelActuator] reduces it to a single revolution when it is read.
    pub absolute_position: Option<i32>,
}

/// The hardware side of a [ChannelActuator].
///
/// The hardware interface thread receives the commands for the actuator through this
/// endpoint and publishes sensor snapshots back through it.
pub struct ActuatorEndpoint {
    /// The receiver for the commands sent by the [ChannelActuator].
    commands: Receiver<ActuatorCommand>,

    /// The sender for the sensor snapshots.
    feedback: Sender<ActuatorFeedback>,
}

impl ActuatorEndpoint {
    /// Returns the [Receiver] on which the actuator commands arrive.
    pub fn commands(&self) -> &Receiver<ActuatorCommand> {
        &self.commands
    }

    /// Publishes a new sensor snapshot.
    ///
    /// ## Errors
    ///
    /// * [HardwareFault] - Returned when the [ChannelActuator] has been dropped.
    pub fn publish(&self, feedback: ActuatorFeedback) -> Result<(), HardwareFault> {
        self.feedback.send(feedback).map_err(|_source| {
            HardwareFault::new("endpoint", FAULT_DISCONNECTED, "the actuator has been dropped")
        })
    }

    /// Returns the next pending command, if there is one, without blocking.
    pub fn try_next_command(&self) -> Option<ActuatorCommand> {
        self.commands.try_recv().ok()
    }
}

/// Defines an [Actuator] that forwards commands to, and receives sensor snapshots from,
/// a hardware interface that runs on another thread.
///
/// Neither commanding nor reading blocks. Reads return the most recent snapshot that
/// the hardware interface has published.
pub struct ChannelActuator {
    /// The human readable name of the actuator, used in faults.
    name: String,

    /// The sender for the commands to the hardware interface.
    command_sender: Sender<ActuatorCommand>,

    /// The receiver for the sensor snapshots from the hardware interface.
    feedback_receiver: Receiver<ActuatorFeedback>,

    /// The most recent snapshot that has been received.
    latest: Cell<Option<ActuatorFeedback>>,

    /// The number of counts in one revolution of the absolute sensor.
    absolute_counts_per_revolution: i32,
}

impl ChannelActuator {
    /// Drains all pending snapshots and returns the most recent one.
    #[cfg_attr(test, mutants::skip)] // Draining order cannot be observed beyond the latest value
    fn latest_feedback(&self) -> Result<ActuatorFeedback, HardwareFault> {
        let mut latest = self.latest.get();
        loop {
            match self.feedback_receiver.try_recv() {
                Ok(feedback) => latest = Some(feedback),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    warn!("Hardware interface for '{}' has disconnected", self.name);
                    return Err(HardwareFault::new(
                        self.name.clone(),
                        FAULT_DISCONNECTED,
                        "the hardware interface has disconnected",
                    ));
                }
            }
        }

        self.latest.set(latest);
        latest.ok_or_else(|| {
            HardwareFault::new(
                self.name.clone(),
                FAULT_NO_FEEDBACK,
                "no feedback has been received",
            )
        })
    }

    /// Returns the name of the actuator.
    pub fn name(&self) -> &str {
        self.name.as_ref()
    }

    /// Creates a new [ChannelActuator] and the [ActuatorEndpoint] that the hardware
    /// interface uses to serve it.
    ///
    /// ## Parameters
    ///
    /// * 'name' - The human readable name of the actuator.
    pub fn new(name: impl Into<String>) -> (Self, ActuatorEndpoint) {
        let (command_sender, command_receiver) = crossbeam_channel::unbounded();
        let (feedback_sender, feedback_receiver) = crossbeam_channel::unbounded();

        let actuator = Self {
            name: name.into(),
            command_sender,
            feedback_receiver,
            latest: Cell::new(None),
            absolute_counts_per_revolution: DEFAULT_ABSOLUTE_COUNTS_PER_REVOLUTION,
        };
        let endpoint = ActuatorEndpoint {
            commands: command_receiver,
            feedback: feedback_sender,
        };

        (actuator, endpoint)
    }

    /// Returns the actuator with the resolution of its absolute sensor replaced.
    ///
    /// ## Parameters
    ///
    /// * 'counts_per_revolution' - The number of counts in one revolution of the absolute
    ///   sensor. Values below one are ignored.
    pub fn with_absolute_counts_per_revolution(mut self, counts_per_revolution: i32) -> Self {
        if counts_per_revolution > 0 {
            self.absolute_counts_per_revolution = counts_per_revolution;
        }
        self
    }
}

impl Actuator for ChannelActuator {
    fn command(&mut self, command: ActuatorCommand) -> Result<(), HardwareFault> {
        // Until https://github.com/rust-lang/rust/issues/99301 is fixed we can't send an error type
        // with generics (i.e. SendError<ActuatorCommand>) into a thiserror source
        self.command_sender.send(command).map_err(|_source| {
            HardwareFault::new(
                self.name.clone(),
                FAULT_DISCONNECTED,
                "the hardware interface has disconnected",
            )
        })?;

        // The counter is overwritten right away, later snapshots will confirm it
        if let ActuatorCommand::SeedPosition(counts) = command {
            if let Some(mut feedback) = self.latest.get() {
                feedback.position = counts;
                self.latest.set(Some(feedback));
            }
        }

        Ok(())
    }

    fn read_position(&self) -> Result<f64, HardwareFault> {
        Ok(self.latest_feedback()?.position)
    }

    fn read_velocity(&self) -> Result<f64, HardwareFault> {
        Ok(self.latest_feedback()?.velocity)
    }
}

impl AzimuthActuator for ChannelActuator {
    fn read_absolute_position(&self) -> Result<i32, HardwareFault> {
        let raw = self.latest_feedback()?.absolute_position.ok_or_else(|| {
            HardwareFault::new(
                self.name.clone(),
                FAULT_NO_ABSOLUTE_SENSOR,
                "the actuator has no absolute position sensor",
            )
        })?;

        Ok(raw.rem_euclid(self.absolute_counts_per_revolution))
    }
}
