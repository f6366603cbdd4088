//! Sensor configuration.

use core::time::Duration;

use aurus_capture::{CaptureConfig, CaptureEdge, ClockPrescaler};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::UltrasonicError;

/// Prescaler giving a 1 µs tick on an 8 MHz part.
pub const DEFAULT_PRESCALER: ClockPrescaler = ClockPrescaler::Div8;
/// System clock of the reference board.
pub const DEFAULT_SYSTEM_CLOCK_HZ: u32 = 8_000_000;
/// Speed of sound used for the conversion, in cm/s.
pub const DEFAULT_SPEED_OF_SOUND_CM_S: u32 = 34_000;
/// Shortest trigger pulse the sensor reliably accepts.
pub const MIN_TRIGGER_PULSE_US: u32 = 10;

/// How the edge processor treats echo pulses that are implausibly short.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "mode", rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GlitchPolicy {
    /// Every rising/falling pair is a measurement.
    #[default]
    Accept,
    /// Pulses shorter than `min_ticks` are discarded and the unit rearms for
    /// a rising edge without completing the cycle.
    RejectBelow {
        /// Shortest pulse, in ticks, that counts as an echo.
        min_ticks: u16,
    },
}

impl GlitchPolicy {
    /// Whether a pulse of `ticks` counts as a measurement.
    pub fn accepts(&self, ticks: u16) -> bool {
        match *self {
            GlitchPolicy::Accept => true,
            GlitchPolicy::RejectBelow { min_ticks } => ticks >= min_ticks,
        }
    }
}

/// Configuration of an [`Ultrasonic`](crate::Ultrasonic) driver.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UltrasonicConfig {
    /// Tick source for the capture timer.
    pub prescaler: ClockPrescaler,
    /// System clock feeding the prescaler (Hz).
    pub system_clock_hz: u32,
    /// Speed of sound (cm/s).
    pub speed_of_sound_cm_s: u32,
    /// Width of the trigger pulse (µs).
    pub trigger_pulse_us: u32,
    /// Deadline for a complete echo (ms). `None` waits forever.
    pub echo_timeout_ms: Option<u64>,
    /// Treatment of implausibly short echo pulses.
    pub glitch_policy: GlitchPolicy,
}

impl Default for UltrasonicConfig {
    fn default() -> Self {
        UltrasonicConfig {
            prescaler: DEFAULT_PRESCALER,
            system_clock_hz: DEFAULT_SYSTEM_CLOCK_HZ,
            speed_of_sound_cm_s: DEFAULT_SPEED_OF_SOUND_CM_S,
            trigger_pulse_us: MIN_TRIGGER_PULSE_US,
            echo_timeout_ms: None,
            glitch_policy: GlitchPolicy::Accept,
        }
    }
}

impl UltrasonicConfig {
    /// Set the echo deadline.
    pub fn with_echo_timeout(mut self, timeout: Duration) -> Self {
        self.echo_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Set the glitch policy.
    pub fn with_glitch_policy(mut self, policy: GlitchPolicy) -> Self {
        self.glitch_policy = policy;
        self
    }

    /// Check that the configuration can produce a measurement.
    pub fn validate(&self) -> Result<(), UltrasonicError> {
        if !self.prescaler.is_running() {
            return Err(UltrasonicError::InvalidConfig("prescaler must not stop the clock"));
        }
        if self.system_clock_hz == 0 {
            return Err(UltrasonicError::InvalidConfig("system clock must be positive"));
        }
        if self.speed_of_sound_cm_s == 0 {
            return Err(UltrasonicError::InvalidConfig("speed of sound must be positive"));
        }
        if self.trigger_pulse_us < MIN_TRIGGER_PULSE_US {
            return Err(UltrasonicError::InvalidConfig("trigger pulse must be at least 10 us"));
        }
        Ok(())
    }

    /// Trigger pulse width.
    pub fn trigger_pulse(&self) -> Duration {
        Duration::from_micros(u64::from(self.trigger_pulse_us))
    }

    /// Echo deadline, if any.
    pub fn echo_timeout(&self) -> Option<Duration> {
        self.echo_timeout_ms.map(Duration::from_millis)
    }

    /// Capture unit settings: the configured prescaler, armed for the rising
    /// edge that starts every echo pulse.
    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig::new(self.prescaler, CaptureEdge::Rising)
    }
}
