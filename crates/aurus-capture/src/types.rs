//! Configuration values shared by every capture timer implementation.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The pin transition that arms the next capture event.
///
/// The discriminants match the edge-select bit of the reference timer
/// (`0` = falling, `1` = rising).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CaptureEdge {
    /// High to low transition.
    #[default]
    Falling = 0,
    /// Low to high transition.
    Rising = 1,
}

impl CaptureEdge {
    /// The opposite transition.
    pub const fn flipped(self) -> Self {
        match self {
            CaptureEdge::Falling => CaptureEdge::Rising,
            CaptureEdge::Rising => CaptureEdge::Falling,
        }
    }
}

impl fmt::Display for CaptureEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureEdge::Falling => write!(f, "falling"),
            CaptureEdge::Rising => write!(f, "rising"),
        }
    }
}

/// Divisor applied to the system clock to derive the counter tick rate.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ClockPrescaler {
    /// No clock source; the counter does not advance.
    #[default]
    Stopped,
    /// System clock, undivided.
    Div1,
    /// System clock / 8.
    Div8,
    /// System clock / 64.
    Div64,
    /// System clock / 256.
    Div256,
    /// System clock / 1024.
    Div1024,
}

impl ClockPrescaler {
    /// Integer divisor for this setting, `None` when the clock is stopped.
    pub const fn divisor(self) -> Option<u32> {
        match self {
            ClockPrescaler::Stopped => None,
            ClockPrescaler::Div1 => Some(1),
            ClockPrescaler::Div8 => Some(8),
            ClockPrescaler::Div64 => Some(64),
            ClockPrescaler::Div256 => Some(256),
            ClockPrescaler::Div1024 => Some(1024),
        }
    }

    /// Value of the three clock-select bits on the reference timer.
    pub const fn clock_select_bits(self) -> u8 {
        match self {
            ClockPrescaler::Stopped => 0b000,
            ClockPrescaler::Div1 => 0b001,
            ClockPrescaler::Div8 => 0b010,
            ClockPrescaler::Div64 => 0b011,
            ClockPrescaler::Div256 => 0b100,
            ClockPrescaler::Div1024 => 0b101,
        }
    }

    /// Whether the counter advances with this setting.
    pub const fn is_running(self) -> bool {
        !matches!(self, ClockPrescaler::Stopped)
    }
}

impl fmt::Display for ClockPrescaler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.divisor() {
            Some(divisor) => write!(f, "clk/{}", divisor),
            None => write!(f, "stopped"),
        }
    }
}

/// Settings applied by [`InputCaptureUnit::init`](crate::InputCaptureUnit::init).
///
/// `edge` is only the initial edge; it may be changed afterwards with
/// `set_edge_detection_type`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CaptureConfig {
    /// Tick source for the free-running counter.
    pub prescaler: ClockPrescaler,
    /// Edge that arms the first capture event.
    pub edge: CaptureEdge,
}

impl CaptureConfig {
    /// Construct a capture configuration.
    pub const fn new(prescaler: ClockPrescaler, edge: CaptureEdge) -> Self {
        CaptureConfig { prescaler, edge }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prescaler_divisors() {
        assert_eq!(ClockPrescaler::Stopped.divisor(), None);
        assert_eq!(ClockPrescaler::Div1.divisor(), Some(1));
        assert_eq!(ClockPrescaler::Div8.divisor(), Some(8));
        assert_eq!(ClockPrescaler::Div1024.divisor(), Some(1024));
        assert!(!ClockPrescaler::Stopped.is_running());
        assert!(ClockPrescaler::Div64.is_running());
    }

    #[test]
    fn test_clock_select_bits_follow_divisor_order() {
        assert_eq!(ClockPrescaler::Stopped.clock_select_bits(), 0);
        assert_eq!(ClockPrescaler::Div8.clock_select_bits(), 2);
        assert_eq!(ClockPrescaler::Div1024.clock_select_bits(), 5);
    }

    #[test]
    fn test_edge_bits_and_flip() {
        assert_eq!(CaptureEdge::Falling as u8, 0);
        assert_eq!(CaptureEdge::Rising as u8, 1);
        assert_eq!(CaptureEdge::Rising.flipped(), CaptureEdge::Falling);
        assert_eq!(CaptureEdge::Falling.flipped(), CaptureEdge::Rising);
    }

    #[test]
    fn test_display() {
        assert_eq!(ClockPrescaler::Div8.to_string(), "clk/8");
        assert_eq!(ClockPrescaler::Stopped.to_string(), "stopped");
        assert_eq!(CaptureEdge::Rising.to_string(), "rising");
    }
}
