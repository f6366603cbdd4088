//! Error types for the ultrasonic driver.

use core::convert::Infallible;
use core::time::Duration;

use aurus_capture::{CaptureError, GpioError};
use thiserror::Error;

/// Errors that can occur while configuring or reading the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UltrasonicError {
    /// No complete echo pulse was captured before the configured deadline.
    #[error("no echo captured within {waited:?}")]
    Timeout {
        /// How long the read waited.
        waited: Duration,
    },
    /// The configuration cannot produce a valid measurement.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
    /// A measurement was requested before `init` or after `deinit`.
    #[error("sensor is not initialised")]
    NotInitialized,
    /// Configuring the capture unit failed.
    #[error(transparent)]
    Capture(#[from] CaptureError),
    /// Driving the trigger pin failed.
    #[error("trigger pin: {0}")]
    Gpio(#[from] GpioError),
}

impl From<Infallible> for UltrasonicError {
    fn from(err: Infallible) -> Self {
        match err {}
    }
}
