#![warn(missing_docs)]
#![doc = "Two-phase time-of-flight driver for HC-SR04 style ultrasonic sensors."]
#![doc = ""]
#![doc = "The driver fires a trigger pulse, captures the rising and falling edges of the"]
#![doc = "echo pulse with an [`aurus_capture::InputCaptureUnit`], and converts the pulse"]
#![doc = "width in timer ticks to centimeters."]

pub mod config;
pub mod edge;
pub mod error;
pub mod sensor;
pub mod sim;
pub mod state;
pub mod timing;

pub use config::{GlitchPolicy, UltrasonicConfig};
pub use edge::EdgeProcessor;
pub use error::UltrasonicError;
pub use sensor::{Measurement, Ultrasonic};
pub use state::{EchoPhase, EchoState};
pub use timing::EchoTiming;
