mod common;

use atsc_core::control::cycler::CycleMode;
use atsc_core::core::id::Identifiable;
use tokio::task::LocalSet;

use common::{Parts, ctx, dual_ring_parts};

/// One 1 Hz control tick: signals first, then cycler bookkeeping, with
/// yields so the scheduler task reacts in between.
async fn step(parts: &Parts) {
    tokio::task::yield_now().await;
    for signal in &parts.signals {
        signal.tick(ctx()).expect("tick");
    }
    parts.cycler.tick(ctx());
    tokio::task::yield_now().await;
    tokio::task::yield_now().await;
}

fn spawn_cycler(parts: &Parts) -> tokio::task::JoinHandle<()> {
    let cycler = parts.cycler.clone();
    tokio::task::spawn_local(async move {
        cycler.run().await.expect("cycler");
    })
}

// ==========================================================================
// Single-demand service (scenario: one call in barrier 1)
// ==========================================================================

#[tokio::test]
async fn test_single_demand_serves_and_returns_to_rest() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let parts = dual_ring_parts();
            parts.cycler.set_mode(CycleMode::Concurrent);
            parts.phase(602).set_demand(true);
            let _run = spawn_cycler(&parts);

            let mut served_ticks = 0u32;
            let mut barrier_during_service = None;
            for _ in 0..12 {
                step(&parts).await;
                if parts.phase(602).in_service() {
                    served_ticks += 1;
                    barrier_during_service = parts.cycler.active_barrier().map(|b| b.id());
                }
                // Ring 2 must stay idle throughout.
                for id in [605, 606, 607, 608] {
                    assert!(!parts.phase(id).in_service());
                }
            }
            // GO 3 + CAUTION 2 + STOP 1, one tick of slack either way.
            assert!(
                (5..=8).contains(&served_ticks),
                "dwell was {served_ticks} ticks"
            );
            assert_eq!(barrier_during_service, Some(801), "no barrier change mid-service");
            assert!(!parts.phase(602).in_service());
            assert!(!parts.signal(502).active());
            parts.shutdown.set();
        })
        .await;
}

// ==========================================================================
// Concurrent rings (scenario: calls on both rings of barrier 1)
// ==========================================================================

#[tokio::test]
async fn test_concurrent_service_across_rings() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let parts = dual_ring_parts();
            parts.cycler.set_mode(CycleMode::Concurrent);
            parts.phase(602).set_demand(true);
            parts.phase(606).set_demand(true);
            let _run = spawn_cycler(&parts);

            step(&parts).await;
            assert!(parts.phase(602).in_service());
            assert!(parts.phase(606).in_service(), "both start within one tick");

            // Ring 2's green is shorter; 606 must clear first.
            let mut first_done = None;
            for _ in 0..12 {
                step(&parts).await;
                if first_done.is_none() {
                    if !parts.phase(606).in_service() && parts.phase(602).in_service() {
                        first_done = Some(606);
                    } else if !parts.phase(602).in_service() && parts.phase(606).in_service() {
                        first_done = Some(602);
                    }
                }
            }
            assert_eq!(first_done, Some(606));
            assert!(!parts.phase(602).in_service());
            assert!(!parts.phase(606).in_service());
            parts.shutdown.set();
        })
        .await;
}

// ==========================================================================
// Barrier gating (scenario: cross-barrier demand waits)
// ==========================================================================

#[tokio::test]
async fn test_cross_barrier_demand_waits_for_crossing() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let parts = dual_ring_parts();
            parts.cycler.set_mode(CycleMode::Concurrent);
            parts.phase(602).set_demand(true);
            let _run = spawn_cycler(&parts);

            step(&parts).await;
            assert!(parts.phase(602).in_service());

            // Demand lands on the other barrier mid-green.
            parts.phase(604).set_demand(true);

            let mut served_604_during_602 = false;
            let mut served_604 = false;
            for _ in 0..20 {
                step(&parts).await;
                if parts.phase(602).in_service() && parts.phase(604).in_service() {
                    served_604_during_602 = true;
                }
                if parts.phase(604).in_service() {
                    served_604 = true;
                    assert_eq!(
                        parts.cycler.active_barrier().map(|b| b.id()),
                        Some(802),
                        "cross-barrier service only after the crossing"
                    );
                }
            }
            assert!(!served_604_during_602, "barrier containment held");
            assert!(served_604, "waiting demand served after the crossing");
            parts.shutdown.set();
        })
        .await;
}

// ==========================================================================
// Cycle accounting and modes
// ==========================================================================

#[tokio::test]
async fn test_idle_barrier_rotation_counts_cycles() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let parts = dual_ring_parts();
            parts.cycler.set_mode(CycleMode::Concurrent);
            let _run = spawn_cycler(&parts);

            // No demand anywhere: the cycler rotates one barrier per tick
            // and wraps increment the cycle count.
            for _ in 0..6 {
                step(&parts).await;
            }
            assert!(parts.cycler.cycle_count() >= 1);
            assert!(parts.cycler.cycle_count() <= 3);
            for signal in &parts.signals {
                assert!(!signal.active());
            }
            parts.shutdown.set();
        })
        .await;
}

#[tokio::test]
async fn test_pause_mode_initiates_nothing() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let parts = dual_ring_parts();
            parts.phase(602).set_demand(true);
            let _run = spawn_cycler(&parts);

            for _ in 0..5 {
                step(&parts).await;
            }
            assert!(!parts.phase(602).in_service());
            assert!(parts.phase(602).demand(), "demand retained for later");
            parts.shutdown.set();
        })
        .await;
}

#[tokio::test]
async fn test_sequential_serves_one_at_a_time() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let parts = dual_ring_parts();
            parts.cycler.set_mode(CycleMode::Sequential);
            parts.phase(602).set_demand(true);
            parts.phase(606).set_demand(true);
            let _run = spawn_cycler(&parts);

            let mut overlap = false;
            let mut order = Vec::new();
            for _ in 0..25 {
                step(&parts).await;
                let a = parts.phase(602).in_service();
                let b = parts.phase(606).in_service();
                if a && b {
                    overlap = true;
                }
                for (id, active) in [(602u16, a), (606u16, b)] {
                    if active && order.last() != Some(&id) {
                        order.push(id);
                    }
                }
            }
            assert!(!overlap, "sequential mode never overlaps service");
            assert_eq!(order, vec![602, 606], "global phase order respected");
            parts.shutdown.set();
        })
        .await;
}

#[tokio::test]
async fn test_mode_change_does_not_interrupt_service() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let parts = dual_ring_parts();
            parts.cycler.set_mode(CycleMode::Concurrent);
            parts.phase(602).set_demand(true);
            let _run = spawn_cycler(&parts);

            step(&parts).await;
            assert!(parts.phase(602).in_service());
            parts.cycler.set_mode(CycleMode::Pause);

            // The committed service finishes naturally.
            let mut saw_completion = false;
            for _ in 0..10 {
                step(&parts).await;
                if !parts.phase(602).in_service() {
                    saw_completion = true;
                }
            }
            assert!(saw_completion);
            assert!(!parts.signal(502).active());
            parts.shutdown.set();
        })
        .await;
}

#[tokio::test]
async fn test_switch_to_concurrent_resumes_past_home_barrier() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let parts = dual_ring_parts();
            parts.cycler.set_mode(CycleMode::Sequential);
            parts.phase(602).set_demand(true);
            let _run = spawn_cycler(&parts);

            // Let 602 serve to completion sequentially.
            for _ in 0..10 {
                step(&parts).await;
            }
            assert!(!parts.phase(602).in_service());

            parts.cycler.set_mode(CycleMode::Concurrent);
            // 602's home barrier is 801; the cycler resumes past it.
            assert_eq!(parts.cycler.active_barrier().map(|b| b.id()), Some(802));
            parts.shutdown.set();
        })
        .await;
}
