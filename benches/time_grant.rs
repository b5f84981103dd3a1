//! Throughput of the distributed time coordinator's grant evaluation: the
//! hot path every federate's time request runs through.

use std::time::Instant;

use helics_coordinator::{distributed, TimeDependencies};
use helics_core::{GlobalFederateId, Time};

fn build_dependencies(n: usize) -> TimeDependencies {
    let mut deps = TimeDependencies::new();
    for i in 0..n {
        let fed = GlobalFederateId::new(i as i32 + 2);
        let entry = deps.entry_or_insert(fed);
        entry.dependency = true;
        entry.data.next = Time::from_seconds(1.0);
        entry.data.te = Time::from_seconds(1.0);
    }
    deps
}

fn main() {
    const ITERATIONS: usize = 200_000;
    for fan_in in [1usize, 8, 64] {
        let deps = build_dependencies(fan_in);
        let start = Instant::now();
        for _ in 0..ITERATIONS {
            let _ = distributed::evaluate_grant(&deps, Time::from_seconds(1.0), Time::MAX_TIME, false, 0);
        }
        let elapsed = start.elapsed();
        println!(
            "fan_in={fan_in:<3} {ITERATIONS} evaluations in {elapsed:?} ({:.0} ns/op)",
            elapsed.as_nanos() as f64 / ITERATIONS as f64
        );
    }
}
