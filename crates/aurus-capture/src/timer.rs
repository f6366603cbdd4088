//! Register-level contract a timer channel must provide to back a capture unit.

use crate::types::{CaptureEdge, ClockPrescaler};

/// A single timer channel with a free-running counter and an input capture latch.
///
/// Implementations are thin register accessors. All sequencing lives in
/// [`InputCaptureUnit`](crate::InputCaptureUnit).
pub trait CaptureTimer: Send {
    /// Select the counter's tick source and the capture edge, normal counting mode.
    fn configure(&mut self, prescaler: ClockPrescaler, edge: CaptureEdge);

    /// Change the edge that arms the next capture, leaving counter and latch untouched.
    fn select_edge(&mut self, edge: CaptureEdge);

    /// Edge currently armed.
    fn armed_edge(&self) -> CaptureEdge;

    /// Reset the running counter to zero.
    fn reset_counter(&mut self);

    /// Reset the capture latch to zero.
    fn reset_latch(&mut self);

    /// Counter value latched at the most recent capture event.
    fn latched_value(&self) -> u16;

    /// Enable the capture interrupt.
    fn enable_capture_interrupt(&mut self);

    /// Disable the capture interrupt.
    fn disable_capture_interrupt(&mut self);
}
