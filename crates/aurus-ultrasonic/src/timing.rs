//! Conversion between echo pulse width in timer ticks and distance.
//!
//! `time = ticks * divisor / clock` and `distance = time * speed / 2`, since
//! the pulse covers the round trip. Both are evaluated in 64-bit integer
//! arithmetic with round-half-up, so no intermediate product can overflow
//! for any 16-bit tick count.

use core::time::Duration;

use aurus_capture::ClockPrescaler;

use crate::config::UltrasonicConfig;
use crate::error::UltrasonicError;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Tick rate and speed of sound for one sensor setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchoTiming {
    divisor: u32,
    system_clock_hz: u32,
    speed_of_sound_cm_s: u32,
}

impl EchoTiming {
    /// Construct timing parameters.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` for a stopped prescaler, a zero clock or a zero speed of sound.
    pub fn new(
        prescaler: ClockPrescaler,
        system_clock_hz: u32,
        speed_of_sound_cm_s: u32,
    ) -> Result<Self, UltrasonicError> {
        let divisor = prescaler
            .divisor()
            .ok_or(UltrasonicError::InvalidConfig("prescaler must not stop the clock"))?;
        if system_clock_hz == 0 {
            return Err(UltrasonicError::InvalidConfig("system clock must be positive"));
        }
        if speed_of_sound_cm_s == 0 {
            return Err(UltrasonicError::InvalidConfig("speed of sound must be positive"));
        }
        Ok(EchoTiming { divisor, system_clock_hz, speed_of_sound_cm_s })
    }

    /// Timing parameters for `config`.
    pub fn from_config(config: &UltrasonicConfig) -> Result<Self, UltrasonicError> {
        Self::new(config.prescaler, config.system_clock_hz, config.speed_of_sound_cm_s)
    }

    /// Distance in centimeters for an echo pulse of `ticks`, saturating at `u16::MAX`.
    pub fn ticks_to_cm(&self, ticks: u16) -> u16 {
        let numerator =
            u64::from(ticks) * u64::from(self.divisor) * u64::from(self.speed_of_sound_cm_s);
        let denominator = 2 * u64::from(self.system_clock_hz);
        let cm = (numerator + denominator / 2) / denominator;
        u16::try_from(cm).unwrap_or(u16::MAX)
    }

    /// Echo pulse width in ticks for an obstacle at `cm`, or `None` if the
    /// pulse would overflow the 16-bit counter.
    pub fn cm_to_ticks(&self, cm: u16) -> Option<u16> {
        let numerator = u64::from(cm) * 2 * u64::from(self.system_clock_hz);
        let denominator = u64::from(self.divisor) * u64::from(self.speed_of_sound_cm_s);
        u16::try_from((numerator + denominator / 2) / denominator).ok()
    }

    /// Duration of `ticks` timer ticks.
    pub fn ticks_to_duration(&self, ticks: u16) -> Duration {
        let nanos = u64::from(ticks) * u64::from(self.divisor) * NANOS_PER_SEC
            / u64::from(self.system_clock_hz);
        Duration::from_nanos(nanos)
    }

    /// Duration of one timer tick.
    pub fn tick_period(&self) -> Duration {
        self.ticks_to_duration(1)
    }

    /// Farthest distance a full 16-bit count can express.
    pub fn max_distance_cm(&self) -> u16 {
        self.ticks_to_cm(u16::MAX)
    }
}
