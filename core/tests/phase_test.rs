mod common;

use std::collections::HashMap;
use std::rc::Rc;

use atsc_core::control::phase::Phase;
use atsc_core::control::signal::{Signal, SignalSettings, SignalType, TrafficMovement};
use atsc_core::prelude::*;
use tokio::task::LocalSet;

use common::{ctx, standalone_signal, standalone_signal_with};

/// Advance every signal by one 1 Hz time tick, yielding around it so the
/// cooperative service tasks observe the changes.
async fn step(signals: &[Rc<Signal>]) {
    tokio::task::yield_now().await;
    for signal in signals {
        signal.tick(ctx()).expect("tick");
    }
    tokio::task::yield_now().await;
    tokio::task::yield_now().await;
}

// ==========================================================================
// Service window
// ==========================================================================

#[tokio::test]
async fn test_serve_without_demand_is_noop() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let signal = standalone_signal(501, 101);
            let phase = Phase::new(601, vec![signal]);
            phase.clone().serve().await.unwrap();
            assert!(!phase.in_service());
        })
        .await;
}

#[tokio::test]
async fn test_serve_runs_all_demanded_signals() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let vehicle = standalone_signal(501, 101);
            let ped = standalone_signal(502, 104);
            vehicle.set_demand(true);
            ped.set_demand(true);
            let phase = Phase::new(601, vec![vehicle.clone(), ped.clone()]);

            let handle = tokio::task::spawn_local(phase.clone().serve());
            let signals = [vehicle.clone(), ped.clone()];
            step(&signals).await;
            assert!(phase.in_service());
            assert!(vehicle.active());
            assert!(ped.active());
            assert_eq!(vehicle.state(), SignalState::Go);

            // Both signals consumed their demand at activation.
            assert!(!vehicle.demand());
            assert!(!ped.demand());

            // GO 3 + CAUTION 2 + STOP 1 = 6 ticks to quiescence.
            for _ in 0..6 {
                step(&signals).await;
            }
            assert!(handle.await.unwrap().is_ok());
            assert!(!phase.in_service());
            assert!(!vehicle.active());
        })
        .await;
}

#[tokio::test]
async fn test_serve_rejects_active_signals() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let signal = standalone_signal(501, 101);
            signal.set_demand(true);
            signal.change(None).unwrap(); // already mid-service
            let phase = Phase::new(601, vec![signal]);
            let result = phase.serve().await;
            assert!(matches!(result, Err(Fault::AlreadyActive { .. })));
        })
        .await;
}

// ==========================================================================
// Recycle protocol
// ==========================================================================

fn recycling_ped(id: ObjectId, base: ObjectId) -> Rc<Signal> {
    // Short crossing: GO 1, CAUTION 1, STOP 0.
    let timing = HashMap::from([
        (SignalState::Stop, IntervalTiming::new(0.0)),
        (SignalState::Caution, IntervalTiming::new(1.0)),
        (SignalState::Go, IntervalTiming::new(1.0)),
    ]);
    standalone_signal_with(
        id,
        base,
        timing,
        SignalSettings {
            signal_type: SignalType::Pedestrian,
            movement: TrafficMovement::Crosswalk,
            recycle: true,
            latch: true,
            ..SignalSettings::default()
        },
    )
}

#[tokio::test]
async fn test_recycle_reserves_within_open_window() {
    let local = LocalSet::new();
    local
        .run_until(async {
            // Vehicle holds the window for 6 ticks; the crossing takes 2
            // and latches fresh demand from standing presence.
            let vehicle = standalone_signal(501, 101);
            let ped = recycling_ped(502, 104);
            vehicle.set_demand(true);
            ped.set_demand(true);
            ped.set_free(true);
            ped.set_presence(true); // someone keeps pressing the button

            let phase = Phase::new(601, vec![vehicle.clone(), ped.clone()]);
            let handle = tokio::task::spawn_local(phase.clone().serve());
            let signals = [vehicle.clone(), ped.clone()];

            let mut ped_services = 0u32;
            let mut last_active = false;
            for _ in 0..7 {
                step(&signals).await;
                let now_active = ped.active();
                if now_active && !last_active {
                    ped_services += 1;
                }
                last_active = now_active;
            }
            assert!(handle.await.unwrap().is_ok());
            assert!(
                ped_services >= 2,
                "crossing recycled while the vehicle window was open ({ped_services})"
            );
            assert!(!phase.in_service());
        })
        .await;
}

#[tokio::test]
async fn test_no_recycle_without_flag() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let vehicle = standalone_signal(501, 101);
            let ped = {
                let timing = HashMap::from([
                    (SignalState::Stop, IntervalTiming::new(0.0)),
                    (SignalState::Caution, IntervalTiming::new(1.0)),
                    (SignalState::Go, IntervalTiming::new(1.0)),
                ]);
                standalone_signal_with(
                    502,
                    104,
                    timing,
                    SignalSettings {
                        latch: true,
                        ..SignalSettings::default()
                    },
                )
            };
            vehicle.set_demand(true);
            ped.set_demand(true);
            ped.set_free(true);
            ped.set_presence(true);

            let phase = Phase::new(601, vec![vehicle.clone(), ped.clone()]);
            let handle = tokio::task::spawn_local(phase.clone().serve());
            let signals = [vehicle.clone(), ped.clone()];

            let mut ped_services = 0u32;
            let mut last_active = false;
            for _ in 0..7 {
                step(&signals).await;
                let now_active = ped.active();
                if now_active && !last_active {
                    ped_services += 1;
                }
                last_active = now_active;
            }
            assert!(handle.await.unwrap().is_ok());
            assert_eq!(ped_services, 1, "no recycle without the flag");
        })
        .await;
}
