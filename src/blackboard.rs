use parking_lot::RwLock;
use std::{sync::Arc, time::Instant};

use aurus_ultrasonic::Measurement;

/// A measurement stamped with the time it completed.
#[derive(Debug, Clone, Copy)]
pub struct Reading {
    pub distance_cm: u16,
    pub pulse_ticks: u16,
    pub at: Instant,
}

impl From<Measurement> for Reading {
    fn from(m: Measurement) -> Self {
        Reading { distance_cm: m.distance_cm, pulse_ticks: m.pulse_ticks, at: Instant::now() }
    }
}

#[derive(Clone)]
pub struct State {
    pub last_reading: Option<Reading>,
    pub readings: u64,
    pub timeouts: u64,
    pub last_update_ts: Instant,
    pub faults: Vec<String>,
}

impl Default for State {
    fn default() -> Self {
        State {
            last_reading: None,
            readings: 0,
            timeouts: 0,
            last_update_ts: Instant::now(),
            faults: Vec::new(),
        }
    }
}

pub type Blackboard = Arc<RwLock<State>>;

pub fn snapshot(bb: &Blackboard) -> State {
    (*bb.read()).clone()
}

pub fn record_reading(bb: &Blackboard, reading: Reading) {
    let mut g = bb.write();
    g.last_reading = Some(reading);
    g.readings += 1;
    g.last_update_ts = reading.at;
}

pub fn record_timeout(bb: &Blackboard) {
    let mut g = bb.write();
    g.timeouts += 1;
    g.last_update_ts = Instant::now();
}

pub fn raise_fault(bb: &Blackboard, msg: &str) {
    let mut g = bb.write();
    if !g.faults.iter().any(|s| s == msg) {
        g.faults.push(msg.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_reading_updates_counters() {
        let bb: Blackboard = Arc::default();
        record_reading(&bb, Measurement { pulse_ticks: 1000, distance_cm: 17 }.into());
        record_timeout(&bb);

        let state = snapshot(&bb);
        assert_eq!(state.readings, 1);
        assert_eq!(state.timeouts, 1);
        assert_eq!(state.last_reading.map(|r| r.distance_cm), Some(17));
    }

    #[test]
    fn test_faults_are_deduplicated() {
        let bb: Blackboard = Arc::default();
        raise_fault(&bb, "echo timeout");
        raise_fault(&bb, "echo timeout");
        raise_fault(&bb, "reading stale");
        assert_eq!(snapshot(&bb).faults, vec!["echo timeout", "reading stale"]);
    }
}
