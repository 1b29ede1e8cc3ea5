//! Lemon spiral and runaway-engine scenarios (spec.md §8 scenarios 4-5),
//! exercised directly against `VehicleReliabilityRecord` since neither
//! needs a `Core`/`HostGameApi` round trip.

use used_equipment_core::config::ReliabilityConfig;
use used_equipment_core::{Component, MalfunctionKind, VehicleReliabilityRecord};

#[test]
fn twenty_workshop_repairs_on_a_lemon_bound_the_ceiling_at_point_eight_three() {
    let cfg = ReliabilityConfig::default();
    let mut rec = VehicleReliabilityRecord::first_observed(1, 42);
    rec.dna = 0.15; // lemon tier
    for _ in 0..20 {
        rec.apply_workshop_repair(&cfg);
    }
    assert!(rec.ceiling <= 0.83, "ceiling = {}", rec.ceiling);
    assert!(rec.engine_r <= rec.ceiling + 1e-6);
    assert!(rec.hydraulic_r <= rec.ceiling + 1e-6);
    assert!(rec.electrical_r <= rec.ceiling + 1e-6);
    // Monotonic: never creeps back up without a restoration.
    assert!(rec.ceiling < 1.0);
}

#[test]
fn starved_oil_and_hydraulic_eventually_triggers_a_runaway_malfunction() {
    let cfg = ReliabilityConfig::default();
    let mut rec = VehicleReliabilityRecord::first_observed(2, 42);
    rec.oil_level = 0.05;
    rec.hydraulic_level = 0.05;
    // Worn components push the per-tick probability high enough that a
    // malfunction fires well inside this bound; once it does, the
    // oil/hydraulic starvation guarantees it is Runaway (reliability.rs's
    // own `runaway_requires_low_oil_and_hydraulic` pins the same rule).
    rec.engine_r = 0.0;
    rec.hydraulic_r = 0.0;
    rec.electrical_r = 0.0;

    let mut triggered = None;
    let mut now: i64 = 0;
    for _ in 0..5_000 {
        now += 1000;
        if let Some(kind) = rec.frame_tick(&cfg, now, 1.0, 42, 1.0, 0.0, 1.0) {
            triggered = Some(kind);
            break;
        }
    }

    let kind = triggered.expect("expected a malfunction to trigger within the bound");
    assert_eq!(kind, MalfunctionKind::Runaway);
    let (speed_mult, brake_mult) = MalfunctionKind::runaway_effect();
    assert_eq!(speed_mult, 1.5);
    assert_eq!(brake_mult, 0.4);
    let _ = rec.is_seized(Component::Hydraulic);
}
