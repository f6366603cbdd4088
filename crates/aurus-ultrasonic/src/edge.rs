//! The capture callback that runs the two-phase echo state machine.

use std::sync::Arc;

use aurus_capture::{CaptureChannel, CaptureEdge, CaptureTimer, EdgeHandler};
use tracing::{trace, warn};

use crate::config::GlitchPolicy;
use crate::state::{EchoPhase, EchoState};

/// Edge handler registered with the capture unit by [`Ultrasonic::init`](crate::Ultrasonic::init).
///
/// On the rising edge it zeroes the counter and arms the falling edge; on
/// the falling edge it reads the latched pulse width, rearms the rising edge
/// and publishes the measurement. The edge is flipped inside the same
/// interrupt invocation, before the next transition can arrive.
#[derive(Debug, Clone)]
pub struct EdgeProcessor {
    state: Arc<EchoState>,
    policy: GlitchPolicy,
}

impl EdgeProcessor {
    /// Processor writing into `state`.
    pub fn new(state: Arc<EchoState>, policy: GlitchPolicy) -> Self {
        Self { state, policy }
    }
}

impl<T: CaptureTimer> EdgeHandler<T> for EdgeProcessor {
    fn on_edge(&mut self, channel: &mut CaptureChannel<T>) {
        match self.state.phase() {
            EchoPhase::AwaitingRisingEdge => {
                channel.clear_timer_value();
                channel.set_edge_detection_type(CaptureEdge::Falling);
                self.state.set_phase(EchoPhase::AwaitingFallingEdge);
            }
            EchoPhase::AwaitingFallingEdge => {
                let ticks = channel.get_input_capture_value();
                channel.set_edge_detection_type(CaptureEdge::Rising);
                self.state.set_phase(EchoPhase::AwaitingRisingEdge);

                if self.policy.accepts(ticks) {
                    trace!(ticks, "Echo pulse captured");
                    self.state.publish(ticks);
                } else {
                    self.state.record_rejected();
                    warn!(ticks, policy = ?self.policy, "Echo pulse below glitch threshold discarded");
                }
            }
        }
    }
}
