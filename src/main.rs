mod blackboard;   // brings `blackboard.rs` in as `crate::blackboard`
mod bus;          // brings `bus.rs` in as `crate::bus`
mod config;       // brings `config.rs` in as `crate::config`
mod simulation;   // brings `simulation.rs` in as `crate::simulation`

use blackboard::{Blackboard, Reading, raise_fault, record_reading, record_timeout, snapshot};
use bus::Topic;
use crate::config::SamplingConfig;

use aurus_ultrasonic::sim::SimulatedUltrasonic;
use aurus_ultrasonic::UltrasonicError;
use parking_lot::Mutex;
use std::{sync::Arc, time::{Duration, Instant}};
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::{self, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    info!("Aurus Rangefinder started. Loading configuration...");
    let app = config::load_config()?;

    let rig = simulation::build_rig(&app.simulation, &app.sensor)?;
    let mut sensor = rig.sensor(app.sensor)?;
    sensor.init()?;
    let sensor = Arc::new(Mutex::new(sensor));

    let bb: Blackboard = Arc::default();
    let readings: Topic<Reading> = Topic::new(16);

    info!("Spawning display task...");
    tokio::spawn(display(readings.subscribe()));

    info!("Spawning watchdog task...");
    let stale_after = Duration::from_millis(app.sampling.stale_after_ms);
    tokio::spawn({
        let bb = Arc::clone(&bb);
        async move {
            if let Err(e) = watchdog(bb, stale_after).await {
                error!("Watchdog stopped: {:?}", e);
            }
        }
    });

    poll(Arc::clone(&sensor), bb.clone(), readings, &app.sampling).await?;

    sensor.lock().deinit();
    let state = snapshot(&bb);
    info!(
        readings = state.readings,
        timeouts = state.timeouts,
        faults = ?state.faults,
        "Aurus Rangefinder finished."
    );
    Ok(())
}

/// The polling loop: trigger a reading every period and publish it.
async fn poll(
    sensor: Arc<Mutex<SimulatedUltrasonic>>,
    bb: Blackboard,
    readings: Topic<Reading>,
    sampling: &SamplingConfig,
) -> anyhow::Result<()> {
    info!(period_ms = sampling.period_ms, max = ?sampling.max_readings, "Polling loop started.");
    let mut ticker = tokio::time::interval(Duration::from_millis(sampling.period_ms.max(1)));
    let mut taken: u64 = 0;

    loop {
        if sampling.max_readings.is_some_and(|max| taken >= max) {
            break;
        }
        ticker.tick().await;

        // read_distance blocks until the echo arrives, keep it off the async workers
        let sensor = Arc::clone(&sensor);
        let result = tokio::task::spawn_blocking(move || sensor.lock().read_measurement()).await?;
        taken += 1;

        match result {
            Ok(measurement) => {
                let reading = Reading::from(measurement);
                record_reading(&bb, reading);
                readings.publish(reading);
            }
            Err(UltrasonicError::Timeout { waited }) => {
                warn!(?waited, "No echo received.");
                record_timeout(&bb);
                raise_fault(&bb, "echo timeout");
            }
            Err(e) => {
                error!("Sensor read failed: {}", e);
                return Err(e.into());
            }
        }
    }

    info!(taken, "Polling loop finished.");
    Ok(())
}

/// Stand-in for the display: logs every reading.
async fn display(mut rx: broadcast::Receiver<Arc<Reading>>) {
    loop {
        match rx.recv().await {
            Ok(reading) => info!("Distance = {} cm", reading.distance_cm),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("Display lagged by {} readings.", n);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn watchdog(bb: Blackboard, stale_after: Duration) -> anyhow::Result<()> {
    info!("Watchdog task started.");
    let mut tick = tokio::time::interval((stale_after / 2).max(Duration::from_millis(1)));
    loop {
        tick.tick().await;
        let last_update_ts = snapshot(&bb).last_update_ts;
        let age = Instant::now() - last_update_ts;
        if age > stale_after {
            warn!(?age, "No reading or timeout recorded recently, sensor may be stuck.");
            raise_fault(&bb, "sensor stalled");
        }
    }
}
