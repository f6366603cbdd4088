//! The capture unit driver and its edge handler slot.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::CaptureError;
use crate::gpio::{DigitalPin, PinDirection};
use crate::timer::CaptureTimer;
use crate::types::{CaptureConfig, CaptureEdge, ClockPrescaler};

/// A capture unit shared between the interrupt context and the driver that owns it.
pub type SharedCaptureUnit<T, P> = Arc<Mutex<InputCaptureUnit<T, P>>>;

/// Operations available to an edge handler while it services a capture event.
///
/// This is the timer half of an [`InputCaptureUnit`]; handlers get it by
/// mutable reference so they can read the latch and rearm the edge
/// synchronously, inside the same interrupt invocation.
#[derive(Debug)]
pub struct CaptureChannel<T> {
    timer: T,
}

impl<T: CaptureTimer> CaptureChannel<T> {
    /// Change which transition arms the next capture event.
    ///
    /// Does not reset the counter or the latch.
    pub fn set_edge_detection_type(&mut self, edge: CaptureEdge) {
        self.timer.select_edge(edge);
    }

    /// Counter value latched at the most recent capture event.
    ///
    /// The latch is not cleared; reading twice without a new event returns
    /// the same value.
    pub fn get_input_capture_value(&self) -> u16 {
        self.timer.latched_value()
    }

    /// Reset the running counter to zero without touching the latch.
    pub fn clear_timer_value(&mut self) {
        self.timer.reset_counter();
    }

    /// Edge currently armed.
    pub fn armed_edge(&self) -> CaptureEdge {
        self.timer.armed_edge()
    }

    /// The underlying timer.
    pub fn timer(&self) -> &T {
        &self.timer
    }

    /// The underlying timer, mutably.
    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }
}

/// Callback invoked once per capture event, in interrupt context.
///
/// Handlers must be short and must never wait for another capture event.
/// Any `FnMut(&mut CaptureChannel<T>) + Send` closure is a handler.
pub trait EdgeHandler<T>: Send {
    /// Service one capture event.
    fn on_edge(&mut self, channel: &mut CaptureChannel<T>);
}

impl<T, F> EdgeHandler<T> for F
where
    F: FnMut(&mut CaptureChannel<T>) + Send,
{
    fn on_edge(&mut self, channel: &mut CaptureChannel<T>) {
        self(channel)
    }
}

/// Input capture driver for one timer channel and its dedicated input pin.
///
/// The unit owns at most one [`EdgeHandler`]. Capture events that arrive
/// while no handler is registered are discarded, not queued.
pub struct InputCaptureUnit<T, P> {
    channel: CaptureChannel<T>,
    pin: P,
    handler: Option<Box<dyn EdgeHandler<T>>>,
    config: Option<CaptureConfig>,
    dropped_events: u32,
}

impl<T, P> InputCaptureUnit<T, P>
where
    T: CaptureTimer,
    P: DigitalPin,
    P::Error: Into<CaptureError>,
{
    /// Bind a timer channel to its capture input pin. Nothing is configured yet.
    pub fn new(timer: T, pin: P) -> Self {
        Self {
            channel: CaptureChannel { timer },
            pin,
            handler: None,
            config: None,
            dropped_events: 0,
        }
    }

    /// Wrap the unit so it can be shared with the interrupt context.
    pub fn into_shared(self) -> SharedCaptureUnit<T, P> {
        Arc::new(Mutex::new(self))
    }

    /// Configure the capture pin as an input, select tick source and edge,
    /// zero the counter and the latch, and enable the capture interrupt.
    pub fn init(&mut self, config: CaptureConfig) -> Result<(), CaptureError> {
        self.pin.set_direction(PinDirection::Input).map_err(Into::<CaptureError>::into)?;

        let timer = &mut self.channel.timer;
        timer.configure(config.prescaler, config.edge);
        timer.reset_counter();
        timer.reset_latch();
        timer.enable_capture_interrupt();

        self.config = Some(config);
        debug!(prescaler = %config.prescaler, edge = %config.edge, "Input capture initialised");
        Ok(())
    }

    /// Register `handler` as the sole callback for subsequent capture events,
    /// replacing any previous one.
    pub fn set_callback<H>(&mut self, handler: H)
    where
        H: EdgeHandler<T> + 'static,
    {
        if self.handler.replace(Box::new(handler)).is_some() {
            debug!("Replaced input capture handler");
        }
    }

    /// Remove the registered handler. Later events are discarded.
    pub fn clear_callback(&mut self) {
        self.handler = None;
    }

    /// Whether a handler is registered.
    pub fn has_callback(&self) -> bool {
        self.handler.is_some()
    }

    /// Change which transition arms the next capture event.
    pub fn set_edge_detection_type(&mut self, edge: CaptureEdge) {
        self.channel.set_edge_detection_type(edge);
    }

    /// Counter value latched at the most recent capture event.
    pub fn get_input_capture_value(&self) -> u16 {
        self.channel.get_input_capture_value()
    }

    /// Reset the running counter to zero without touching the latch.
    pub fn clear_timer_value(&mut self) {
        self.channel.clear_timer_value();
    }

    /// Edge currently armed.
    pub fn armed_edge(&self) -> CaptureEdge {
        self.channel.armed_edge()
    }

    /// Disable the capture interrupt, return the timer to an inert state and
    /// drop the registered handler.
    pub fn deinit(&mut self) {
        let timer = &mut self.channel.timer;
        timer.disable_capture_interrupt();
        timer.configure(ClockPrescaler::Stopped, CaptureEdge::Falling);
        timer.reset_counter();
        timer.reset_latch();

        self.handler = None;
        self.config = None;
        debug!("Input capture deinitialised");
    }

    /// Interrupt entry point: service one capture event.
    ///
    /// Invokes the registered handler exactly once, or counts the event as
    /// dropped when none is registered.
    pub fn handle_capture_interrupt(&mut self) {
        match self.handler.as_mut() {
            Some(handler) => handler.on_edge(&mut self.channel),
            None => {
                self.dropped_events = self.dropped_events.wrapping_add(1);
                trace!(dropped = self.dropped_events, "Capture event without handler discarded");
            }
        }
    }

    /// Configuration applied by the last `init`, `None` before init or after deinit.
    pub fn config(&self) -> Option<CaptureConfig> {
        self.config
    }

    /// Number of capture events discarded because no handler was registered.
    pub fn dropped_events(&self) -> u32 {
        self.dropped_events
    }

    /// The underlying timer.
    pub fn timer(&self) -> &T {
        self.channel.timer()
    }

    /// The underlying timer, mutably.
    pub fn timer_mut(&mut self) -> &mut T {
        self.channel.timer_mut()
    }

    /// The capture input pin.
    pub fn pin(&self) -> &P {
        &self.pin
    }
}
