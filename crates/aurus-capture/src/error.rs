//! Error types for the capture unit and its pin collaborators.

use core::convert::Infallible;

use embedded_hal::digital::ErrorKind;
use thiserror::Error;

use crate::gpio::PinDirection;

/// Errors raised by [`DigitalPin`](crate::DigitalPin) implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GpioError {
    /// The pin cannot be used in the requested direction.
    #[error("pin does not support {0:?} direction")]
    UnsupportedDirection(PinDirection),
    /// The underlying pin driver reported a failure.
    #[error("pin driver failure: {0:?}")]
    Hardware(ErrorKind),
}

/// Errors that can occur while configuring a capture unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// Configuring the capture input pin failed.
    #[error("capture pin: {0}")]
    Gpio(#[from] GpioError),
}

impl From<Infallible> for CaptureError {
    fn from(err: Infallible) -> Self {
        match err {}
    }
}
