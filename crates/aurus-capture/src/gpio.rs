//! Digital I/O collaborator used by the capture unit and the drivers built on it.

use embedded_hal::digital::{Error as _, InputPin, OutputPin};

use crate::error::GpioError;

/// Direction of a digital pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinDirection {
    /// Pin is read by a peripheral or by software.
    Input,
    /// Pin is driven by software.
    Output,
}

/// Capability to configure a pin's direction and drive its level.
pub trait DigitalPin {
    /// Error reported by the pin driver.
    type Error;

    /// Configure the pin as an input or an output.
    fn set_direction(&mut self, direction: PinDirection) -> Result<(), Self::Error>;

    /// Drive the pin high.
    fn set_high(&mut self) -> Result<(), Self::Error>;

    /// Drive the pin low.
    fn set_low(&mut self) -> Result<(), Self::Error>;
}

/// Adapts an `embedded-hal` output pin to [`DigitalPin`].
///
/// The pin's direction is fixed by its HAL type, so only
/// [`PinDirection::Output`] is accepted.
#[derive(Debug)]
pub struct HalOutputPin<P> {
    pin: P,
}

impl<P: OutputPin> HalOutputPin<P> {
    /// Wrap an `embedded-hal` output pin.
    pub fn new(pin: P) -> Self {
        Self { pin }
    }

    /// Release the wrapped pin.
    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P: OutputPin> DigitalPin for HalOutputPin<P> {
    type Error = GpioError;

    fn set_direction(&mut self, direction: PinDirection) -> Result<(), Self::Error> {
        match direction {
            PinDirection::Output => Ok(()),
            PinDirection::Input => Err(GpioError::UnsupportedDirection(direction)),
        }
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.pin.set_high().map_err(|e| GpioError::Hardware(e.kind()))
    }

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.pin.set_low().map_err(|e| GpioError::Hardware(e.kind()))
    }
}

/// Adapts an `embedded-hal` input pin, typically the timer's capture input.
#[derive(Debug)]
pub struct HalInputPin<P> {
    pin: P,
}

impl<P: InputPin> HalInputPin<P> {
    /// Wrap an `embedded-hal` input pin.
    pub fn new(pin: P) -> Self {
        Self { pin }
    }

    /// Current level of the pin.
    pub fn is_high(&mut self) -> Result<bool, GpioError> {
        self.pin.is_high().map_err(|e| GpioError::Hardware(e.kind()))
    }
}

impl<P: InputPin> DigitalPin for HalInputPin<P> {
    type Error = GpioError;

    fn set_direction(&mut self, direction: PinDirection) -> Result<(), Self::Error> {
        match direction {
            PinDirection::Input => Ok(()),
            PinDirection::Output => Err(GpioError::UnsupportedDirection(direction)),
        }
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Err(GpioError::UnsupportedDirection(PinDirection::Output))
    }

    fn set_low(&mut self) -> Result<(), Self::Error> {
        Err(GpioError::UnsupportedDirection(PinDirection::Output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::digital::ErrorType;

    struct MockPin {
        high: bool,
    }

    impl ErrorType for MockPin {
        type Error = Infallible;
    }

    impl OutputPin for MockPin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.high = false;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.high = true;
            Ok(())
        }
    }

    impl InputPin for MockPin {
        fn is_high(&mut self) -> Result<bool, Self::Error> {
            Ok(self.high)
        }

        fn is_low(&mut self) -> Result<bool, Self::Error> {
            Ok(!self.high)
        }
    }

    #[test]
    fn test_output_adapter_drives_level() {
        let mut pin = HalOutputPin::new(MockPin { high: false });
        assert!(pin.set_direction(PinDirection::Output).is_ok());
        pin.set_high().unwrap();
        assert!(pin.pin.high);
        pin.set_low().unwrap();
        assert!(!pin.into_inner().high);
    }

    #[test]
    fn test_output_adapter_rejects_input_direction() {
        let mut pin = HalOutputPin::new(MockPin { high: false });
        assert_eq!(
            pin.set_direction(PinDirection::Input),
            Err(GpioError::UnsupportedDirection(PinDirection::Input))
        );
    }

    #[test]
    fn test_input_adapter_is_read_only() {
        let mut pin = HalInputPin::new(MockPin { high: true });
        assert!(pin.set_direction(PinDirection::Input).is_ok());
        assert_eq!(pin.is_high(), Ok(true));
        assert!(matches!(pin.set_high(), Err(GpioError::UnsupportedDirection(_))));
        assert!(matches!(
            pin.set_direction(PinDirection::Output),
            Err(GpioError::UnsupportedDirection(PinDirection::Output))
        ));
    }
}
