mod common;

use std::collections::HashMap;
use std::rc::Rc;

use atsc_core::control::cycler::{CycleMode, FyaPair, PhaseCycler};
use atsc_core::control::field::FieldOutput;
use atsc_core::control::phase::Phase;
use atsc_core::control::ring::{Barrier, Ring};
use atsc_core::control::signal::{Signal, SignalSettings, TrafficMovement};
use atsc_core::core::event::Event;
use atsc_core::core::id::Identifiable;
use atsc_core::prelude::*;
use tokio::task::LocalSet;

use common::{ctx, standalone_signal};

/// A protected-turn head with an FYA arrow output, paired to `phase`.
fn turn_signal(fya_phase: ObjectId) -> Rc<Signal> {
    let timing = HashMap::from([
        (SignalState::Stop, IntervalTiming::new(1.0).with_revert(2.0)),
        (SignalState::Caution, IntervalTiming::new(2.0)),
        (SignalState::Go, IntervalTiming::new(3.0)),
        (SignalState::Fya, IntervalTiming::new(1.0)),
    ]);
    let config = HashMap::from([
        (SignalState::Stop, IntervalConfig::resting()),
        (SignalState::Fya, IntervalConfig::flashing_resting()),
    ]);
    let outputs: HashMap<ObjectId, Rc<FieldOutput>> = [151, 152, 153, 154]
        .into_iter()
        .map(|i| (i, Rc::new(FieldOutput::new(i))))
        .collect();
    let mapping = HashMap::from([
        (SignalState::Stop, outputs[&151].clone()),
        (SignalState::Caution, outputs[&152].clone()),
        (SignalState::Go, outputs[&153].clone()),
        (SignalState::Fya, outputs[&154].clone()),
    ]);
    Signal::new(
        521,
        timing,
        config,
        mapping,
        SignalSettings {
            movement: TrafficMovement::ProtectedTurn,
            fya_enabled: true,
            fya_service_delay: Some(30.0),
            fya_phase: Some(fya_phase),
            ..SignalSettings::default()
        },
    )
    .unwrap()
}

// ==========================================================================
// Direct state machine behaviour
// ==========================================================================

#[test]
fn test_serve_enters_fya_while_paired_phase_holds() {
    let signal = turn_signal(602);
    signal.set_demand(true);
    signal.set_fya_hold(true);
    signal.change(None).unwrap();
    assert_eq!(signal.state(), SignalState::Fya);
    // Arrow output flashes; the red has been retired.
    let outputs = signal.field_outputs();
    let arrow = outputs.iter().find(|o| o.id() == 154).unwrap();
    assert_eq!(arrow.state(), atsc_core::control::field::FieldState::Flashing);
    let red = outputs.iter().find(|o| o.id() == 151).unwrap();
    assert!(!red.scalar());
}

#[test]
fn test_fya_rests_under_hold_and_reverts_on_release() {
    let signal = turn_signal(602);
    signal.set_fya_hold(true);
    signal.change(Some(SignalState::Fya)).unwrap();
    for _ in 0..10 {
        signal.tick(ctx()).unwrap();
    }
    assert_eq!(signal.state(), SignalState::Fya, "held by the paired phase");

    signal.set_fya_hold(false);
    signal.tick(ctx()).unwrap();
    assert_eq!(signal.state(), SignalState::Caution, "reverts on release");
}

#[test]
fn test_revert_offset_delays_stop_exit() {
    let signal = turn_signal(602);
    signal.set_fya_hold(true);
    signal.change(Some(SignalState::Fya)).unwrap();
    signal.tick(ctx()).unwrap(); // past FYA minimum
    signal.set_fya_hold(false);
    signal.tick(ctx()).unwrap(); // FYA -> CAUTION
    signal.tick(ctx()).unwrap();
    signal.tick(ctx()).unwrap(); // CAUTION -> STOP
    assert_eq!(signal.state(), SignalState::Stop);

    // STOP minimum is 1 s, but the post-FYA revert adds 2 s.
    signal.tick(ctx()).unwrap();
    assert!(signal.active(), "revert offset holds the window");
    signal.tick(ctx()).unwrap();
    signal.tick(ctx()).unwrap();
    assert!(!signal.active());
}

// ==========================================================================
// Overlay service through the cycler
// ==========================================================================

#[tokio::test]
async fn test_overlay_runs_during_paired_phase_service() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let turn = turn_signal(602);
            let through = standalone_signal(502, 104);
            through.set_demand(true);

            let turn_phase = Phase::new(601, vec![turn.clone()]);
            let through_phase = Phase::new(602, vec![through.clone()]);
            let ring = Ring::new(701, vec![turn_phase.clone(), through_phase.clone()]);
            let barrier = Barrier::new(801, vec![turn_phase.clone(), through_phase.clone()]);
            let shutdown = Rc::new(Event::new());
            let cycler = PhaseCycler::new(
                vec![ring],
                vec![barrier],
                vec![FyaPair {
                    signal: turn.clone(),
                    phase: 602,
                }],
                shutdown.clone(),
            );
            cycler.set_mode(CycleMode::Concurrent);
            let cycler_run = cycler.clone();
            let run = tokio::task::spawn_local(async move {
                cycler_run.run().await.expect("cycler");
            });

            let signals = [turn.clone(), through.clone()];
            let mut saw_overlay = false;
            for _ in 0..14 {
                tokio::task::yield_now().await;
                for signal in &signals {
                    signal.tick(ctx()).expect("tick");
                }
                cycler.tick(ctx());
                tokio::task::yield_now().await;
                tokio::task::yield_now().await;
                if through_phase.in_service() && turn.state() == SignalState::Fya {
                    saw_overlay = true;
                    // The overlay never makes the turn phase count as
                    // served; ring exclusivity holds on service windows.
                    assert!(!turn_phase.in_service());
                }
            }
            assert!(saw_overlay, "arrow flashed during the opposing green");
            assert_eq!(turn.state(), SignalState::Stop, "cleared after the green");
            shutdown.set();
            let _ = run.await;
        })
        .await;
}
