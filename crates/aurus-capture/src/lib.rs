#![warn(missing_docs)]
#![doc = "Input capture timer abstraction."]
#![doc = ""]
#![doc = "A capture unit runs a free-running 16-bit counter at a configurable tick rate,"]
#![doc = "latches the counter when a selected edge appears on its input pin, and hands each"]
#![doc = "latch event to exactly one owned [`EdgeHandler`]."]

pub mod error;
pub mod gpio;
pub mod sim;
pub mod timer;
pub mod types;
pub mod unit;

pub use error::{CaptureError, GpioError};
pub use gpio::{DigitalPin, HalInputPin, HalOutputPin, PinDirection};
pub use timer::CaptureTimer;
pub use types::{CaptureConfig, CaptureEdge, ClockPrescaler};
pub use unit::{CaptureChannel, EdgeHandler, InputCaptureUnit, SharedCaptureUnit};
