use aurus_ultrasonic::sim::SimulatedRig;
use aurus_ultrasonic::{EchoTiming, UltrasonicConfig, UltrasonicError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use crate::config::SimulationConfig;

/// Echo source for the simulated rig: the configured obstacle plus jitter,
/// with an occasional missing echo.
///
/// Obstacles too far for the 16-bit counter produce no echo, as a real
/// sensor out of range would.
pub fn echo_responder(
    sim: &SimulationConfig,
    timing: EchoTiming,
    mut rng: impl Rng + Send + 'static,
) -> impl FnMut() -> Option<u16> + Send + 'static {
    let obstacle = i32::from(sim.obstacle_cm);
    let jitter = i32::from(sim.jitter_cm);
    let dropout = sim.dropout_probability.clamp(0.0, 1.0);

    move || {
        if dropout > 0.0 && rng.random_bool(dropout) {
            return None;
        }
        let offset = if jitter > 0 { rng.random_range(-jitter..=jitter) } else { 0 };
        let cm = (obstacle + offset).clamp(0, i32::from(u16::MAX)) as u16;
        timing.cm_to_ticks(cm)
    }
}

/// A rig that answers every trigger from [`echo_responder`].
pub fn build_rig(
    sim: &SimulationConfig,
    sensor: &UltrasonicConfig,
) -> Result<SimulatedRig, UltrasonicError> {
    let timing = EchoTiming::from_config(sensor)?;
    if timing.cm_to_ticks(sim.obstacle_cm).is_none() {
        warn!(
            obstacle_cm = sim.obstacle_cm,
            max_cm = timing.max_distance_cm(),
            "Simulated obstacle is beyond counter range; no echo will be produced"
        );
    }
    if sim.dropout_probability > 0.0 && sensor.echo_timeout().is_none() {
        warn!("Echo dropouts enabled without an echo timeout; a dropped echo blocks forever");
    }

    let rig = SimulatedRig::new();
    rig.echo_on_trigger(echo_responder(sim, timing, StdRng::from_os_rng()));
    info!(
        obstacle_cm = sim.obstacle_cm,
        jitter_cm = sim.jitter_cm,
        dropout = sim.dropout_probability,
        "Simulated sensor rig ready"
    );
    Ok(rig)
}
