/// Defines the capability interfaces for the wheel actuators and the faults they report
pub mod actuator_interface;

/// Defines the interface for the heading sensor
pub mod sensor_interface;

/// Provides an actuator adapter that talks to a hardware interface thread over channels
pub mod channel_actuator;

/// Provides the persistent key/value storage for the azimuth zero references
pub mod preferences;

pub use actuator_interface::{Actuator, ActuatorCommand, AzimuthActuator, HardwareFault};
pub use channel_actuator::{ActuatorEndpoint, ActuatorFeedback, ChannelActuator};
pub use preferences::{JsonFilePreferenceStore, MemoryPreferenceStore, PreferenceStore};
pub use sensor_interface::Gyro;
