//! The ultrasonic driver: trigger, wait for a complete echo cycle, convert.

use std::sync::Arc;

use aurus_capture::{
    CaptureEdge, CaptureError, CaptureTimer, DigitalPin, PinDirection, SharedCaptureUnit,
};
use spin_sleep::SpinSleeper;
use tracing::{debug, info, warn};

use crate::config::UltrasonicConfig;
use crate::edge::EdgeProcessor;
use crate::error::UltrasonicError;
use crate::state::{EchoPhase, EchoState};
use crate::timing::EchoTiming;

// Spin for the last 100 µs of a sleep; the trigger pulse is shorter than that.
const SLEEP_ACCURACY_NS: u32 = 100_000;

/// One completed reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measurement {
    /// Echo pulse width in timer ticks.
    pub pulse_ticks: u16,
    /// Distance to the reflecting surface (cm).
    pub distance_cm: u16,
}

/// HC-SR04 style sensor on a capture unit and a trigger pin.
///
/// `T` is the capture timer, `P` its input pin, `O` the trigger output.
/// Reads take `&mut self`, so only one measurement can be in flight per
/// sensor.
pub struct Ultrasonic<T, P, O> {
    unit: SharedCaptureUnit<T, P>,
    trigger: O,
    state: Arc<EchoState>,
    config: UltrasonicConfig,
    timing: EchoTiming,
    sleeper: SpinSleeper,
    initialized: bool,
}

impl<T, P, O> Ultrasonic<T, P, O>
where
    T: CaptureTimer + 'static,
    P: DigitalPin,
    P::Error: Into<CaptureError>,
    O: DigitalPin,
    O::Error: Into<UltrasonicError>,
{
    /// Create a driver. Nothing is touched until [`init`](Self::init).
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if `config` fails [`UltrasonicConfig::validate`].
    pub fn new(
        unit: SharedCaptureUnit<T, P>,
        trigger: O,
        config: UltrasonicConfig,
    ) -> Result<Self, UltrasonicError> {
        config.validate()?;
        let timing = EchoTiming::from_config(&config)?;
        Ok(Self {
            unit,
            trigger,
            state: Arc::new(EchoState::new()),
            config,
            timing,
            sleeper: SpinSleeper::new(SLEEP_ACCURACY_NS),
            initialized: false,
        })
    }

    /// Configure the trigger pin as a low output, configure the capture unit
    /// for a rising edge and register the edge processor as its callback.
    pub fn init(&mut self) -> Result<(), UltrasonicError> {
        self.trigger.set_direction(PinDirection::Output).map_err(Into::<UltrasonicError>::into)?;
        self.trigger.set_low().map_err(Into::<UltrasonicError>::into)?;
        self.state.reset_phase();

        {
            let mut unit = self.unit.lock();
            unit.init(self.config.capture_config())?;
            unit.set_callback(EdgeProcessor::new(Arc::clone(&self.state), self.config.glitch_policy));
        }

        self.initialized = true;
        info!(
            prescaler = %self.config.prescaler,
            tick = ?self.timing.tick_period(),
            max_cm = self.timing.max_distance_cm(),
            "Ultrasonic sensor initialised"
        );
        Ok(())
    }

    /// Emit one trigger pulse of the configured width. Does not wait for the echo.
    pub fn trigger(&mut self) -> Result<(), UltrasonicError> {
        self.trigger.set_high().map_err(Into::<UltrasonicError>::into)?;
        self.sleeper.sleep(self.config.trigger_pulse());
        self.trigger.set_low().map_err(Into::<UltrasonicError>::into)?;
        Ok(())
    }

    /// Trigger the sensor and block until the echo has been captured.
    ///
    /// # Errors
    ///
    /// * `NotInitialized` before `init` or after `deinit`.
    /// * `Timeout` if an echo deadline is configured and no complete cycle
    ///   arrives in time; the state machine is rearmed for a rising edge.
    ///   Without a deadline this call blocks until an echo arrives.
    pub fn read_measurement(&mut self) -> Result<Measurement, UltrasonicError> {
        if !self.initialized {
            return Err(UltrasonicError::NotInitialized);
        }

        let seen = self.state.completed_cycles();
        self.trigger()?;

        let timeout = self.config.echo_timeout();
        match self.state.wait_for_cycle(seen, timeout) {
            Some(pulse_ticks) => {
                let distance_cm = self.timing.ticks_to_cm(pulse_ticks);
                debug!(pulse_ticks, distance_cm, "Measurement complete");
                Ok(Measurement { pulse_ticks, distance_cm })
            }
            None => {
                let waited = timeout.unwrap_or_default();
                let phase = self.state.phase();
                self.rearm();
                warn!(?waited, ?phase, "No echo before deadline, rearmed for rising edge");
                Err(UltrasonicError::Timeout { waited })
            }
        }
    }

    /// Trigger the sensor and return the distance in centimeters.
    ///
    /// See [`read_measurement`](Self::read_measurement) for blocking and errors.
    pub fn read_distance(&mut self) -> Result<u16, UltrasonicError> {
        self.read_measurement().map(|m| m.distance_cm)
    }

    /// Deinitialise the capture unit, which also drops the edge processor.
    pub fn deinit(&mut self) {
        self.unit.lock().deinit();
        self.state.reset_phase();
        self.initialized = false;
        debug!("Ultrasonic sensor deinitialised");
    }

    fn rearm(&mut self) {
        let mut unit = self.unit.lock();
        unit.set_edge_detection_type(CaptureEdge::Rising);
        self.state.reset_phase();
    }

    /// Current phase of the echo state machine.
    pub fn phase(&self) -> EchoPhase {
        self.state.phase()
    }

    /// Pulse width of the most recent completed cycle.
    pub fn last_pulse_ticks(&self) -> u16 {
        self.state.pulse_ticks()
    }

    /// Number of completed echo cycles since creation.
    pub fn completed_cycles(&self) -> u64 {
        self.state.completed_cycles()
    }

    /// Number of echo pulses discarded by the glitch policy.
    pub fn rejected_glitches(&self) -> u32 {
        self.state.rejected_glitches()
    }

    /// Whether `init` has run and `deinit` has not.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Active configuration.
    pub fn config(&self) -> &UltrasonicConfig {
        &self.config
    }

    /// Conversion parameters.
    pub fn timing(&self) -> &EchoTiming {
        &self.timing
    }

    /// Shared handle to the capture unit.
    pub fn unit(&self) -> &SharedCaptureUnit<T, P> {
        &self.unit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GlitchPolicy;
    use crate::sim::SimulatedRig;
    use aurus_capture::ClockPrescaler;
    use std::sync::atomic::{AtomicU16, Ordering};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_init_configures_trigger_and_capture_unit() {
        let rig = SimulatedRig::new();
        let mut sensor = rig.sensor(UltrasonicConfig::default()).unwrap();
        assert!(!sensor.is_initialized());

        sensor.init().unwrap();
        assert!(sensor.is_initialized());
        assert_eq!(rig.trigger_pin().direction(), Some(PinDirection::Output));
        assert!(!rig.trigger_pin().is_high());

        let unit = rig.unit().lock();
        assert_eq!(unit.pin().direction(), Some(PinDirection::Input));
        assert_eq!(unit.timer().prescaler(), ClockPrescaler::Div8);
        assert_eq!(unit.armed_edge(), CaptureEdge::Rising);
        assert!(unit.has_callback());
        assert_eq!(sensor.phase(), EchoPhase::AwaitingRisingEdge);
    }

    #[test]
    fn test_trigger_emits_one_pulse_without_waiting() {
        let rig = SimulatedRig::new();
        let mut sensor = rig.sensor(UltrasonicConfig::default()).unwrap();
        sensor.init().unwrap();

        sensor.trigger().unwrap();
        assert_eq!(rig.trigger_pin().pulses(), 1);
        assert!(!rig.trigger_pin().is_high());
        assert_eq!(sensor.completed_cycles(), 0);
    }

    #[test]
    fn test_read_distance_thousand_ticks_is_seventeen_cm() {
        let rig = SimulatedRig::new();
        rig.echo_on_trigger(|| Some(1000));
        let mut sensor = rig.sensor(UltrasonicConfig::default()).unwrap();
        sensor.init().unwrap();

        assert_eq!(sensor.read_distance(), Ok(17));
        assert_eq!(sensor.last_pulse_ticks(), 1000);
        assert_eq!(sensor.phase(), EchoPhase::AwaitingRisingEdge);
        assert_eq!(rig.trigger_pin().pulses(), 1);
    }

    #[test]
    fn test_consecutive_reads_track_obstacle() {
        let rig = SimulatedRig::new();
        let ticks = Arc::new(AtomicU16::new(1000));
        let source = Arc::clone(&ticks);
        rig.echo_on_trigger(move || Some(source.load(Ordering::SeqCst)));
        let mut sensor = rig.sensor(UltrasonicConfig::default()).unwrap();
        sensor.init().unwrap();

        assert_eq!(sensor.read_distance(), Ok(17));
        ticks.store(5882, Ordering::SeqCst);
        assert_eq!(sensor.read_distance(), Ok(100));
        ticks.store(0, Ordering::SeqCst);
        assert_eq!(sensor.read_measurement(), Ok(Measurement { pulse_ticks: 0, distance_cm: 0 }));
        assert_eq!(sensor.completed_cycles(), 3);
    }

    #[test]
    fn test_read_waits_for_echo_from_another_thread() {
        let rig = SimulatedRig::new();
        let (tx, rx) = mpsc::channel::<()>();
        rig.respond_with(move |_| {
            let _ = tx.send(());
        });

        let responder_rig = rig.clone();
        let responder = thread::spawn(move || {
            rx.recv().unwrap();
            thread::sleep(Duration::from_millis(5));
            responder_rig.echo_pulse(1000);
        });

        let mut sensor = rig.sensor(UltrasonicConfig::default()).unwrap();
        sensor.init().unwrap();
        assert_eq!(sensor.read_distance(), Ok(17));
        responder.join().unwrap();
    }

    #[test]
    fn test_missing_echo_blocks_without_deadline() {
        let rig = SimulatedRig::new();
        let mut sensor = rig.sensor(UltrasonicConfig::default()).unwrap();
        sensor.init().unwrap();

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(sensor.read_distance());
        });

        assert_eq!(
            rx.recv_timeout(Duration::from_millis(100)),
            Err(mpsc::RecvTimeoutError::Timeout)
        );
    }

    #[test]
    fn test_missing_echo_times_out_with_deadline() {
        let rig = SimulatedRig::new();
        let config = UltrasonicConfig::default().with_echo_timeout(Duration::from_millis(20));
        let mut sensor = rig.sensor(config).unwrap();
        sensor.init().unwrap();

        assert_eq!(
            sensor.read_distance(),
            Err(UltrasonicError::Timeout { waited: Duration::from_millis(20) })
        );
        assert_eq!(sensor.phase(), EchoPhase::AwaitingRisingEdge);
    }

    #[test]
    fn test_timeout_mid_pulse_rearms_rising_edge() {
        let rig = SimulatedRig::new();
        rig.respond_with(|rig| rig.edge(CaptureEdge::Rising));
        let config = UltrasonicConfig::default().with_echo_timeout(Duration::from_millis(20));
        let mut sensor = rig.sensor(config).unwrap();
        sensor.init().unwrap();

        assert!(matches!(sensor.read_distance(), Err(UltrasonicError::Timeout { .. })));
        assert_eq!(sensor.phase(), EchoPhase::AwaitingRisingEdge);
        assert_eq!(rig.unit().lock().armed_edge(), CaptureEdge::Rising);

        // A full echo on the next read is measured normally.
        rig.echo_on_trigger(|| Some(1000));
        assert_eq!(sensor.read_distance(), Ok(17));
    }

    #[test]
    fn test_glitch_before_echo_is_skipped() {
        let rig = SimulatedRig::new();
        rig.respond_with(|rig| {
            rig.echo_pulse(3);
            rig.echo_pulse(1000);
        });
        let config = UltrasonicConfig::default()
            .with_glitch_policy(GlitchPolicy::RejectBelow { min_ticks: 50 });
        let mut sensor = rig.sensor(config).unwrap();
        sensor.init().unwrap();

        assert_eq!(sensor.read_distance(), Ok(17));
        assert_eq!(sensor.rejected_glitches(), 1);
        assert_eq!(sensor.completed_cycles(), 1);
    }

    #[test]
    fn test_read_before_init_fails() {
        let rig = SimulatedRig::new();
        let mut sensor = rig.sensor(UltrasonicConfig::default()).unwrap();
        assert_eq!(sensor.read_distance(), Err(UltrasonicError::NotInitialized));
        assert_eq!(rig.trigger_pin().pulses(), 0);
    }

    #[test]
    fn test_deinit_releases_capture_unit() {
        let rig = SimulatedRig::new();
        let mut sensor = rig.sensor(UltrasonicConfig::default()).unwrap();
        sensor.init().unwrap();
        sensor.deinit();

        assert!(!sensor.is_initialized());
        {
            let unit = rig.unit().lock();
            assert!(!unit.has_callback());
            assert!(!unit.timer().interrupt_enabled());
            assert_eq!(unit.timer().prescaler(), ClockPrescaler::Stopped);
        }
        assert_eq!(sensor.read_distance(), Err(UltrasonicError::NotInitialized));

        sensor.init().unwrap();
        rig.echo_on_trigger(|| Some(1000));
        assert_eq!(sensor.read_distance(), Ok(17));
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let rig = SimulatedRig::new();
        let config = UltrasonicConfig { prescaler: ClockPrescaler::Stopped, ..Default::default() };
        assert!(matches!(rig.sensor(config), Err(UltrasonicError::InvalidConfig(_))));
    }
}
