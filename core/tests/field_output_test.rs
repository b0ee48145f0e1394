use atsc_core::control::field::{FieldOutput, FieldState};
use atsc_core::core::timer::Flasher;

// ==========================================================================
// Tri-state semantics
// ==========================================================================

#[test]
fn test_new_output_is_dark() {
    let output = FieldOutput::new(101);
    assert_eq!(output.state(), FieldState::Off);
    assert!(!output.scalar());
}

#[test]
fn test_on_off_drive_scalar_immediately() {
    let output = FieldOutput::new(101);
    output.set(FieldState::On);
    assert!(output.scalar());
    output.set(FieldState::Off);
    assert!(!output.scalar());
}

#[test]
fn test_off_to_flashing_starts_dark() {
    let output = FieldOutput::new(101);
    output.set(FieldState::Flashing);
    assert!(!output.scalar());
    // The next flash tick illuminates it.
    output.tick_flash();
    assert!(output.scalar());
}

#[test]
fn test_on_to_flashing_preserves_scalar() {
    let output = FieldOutput::new(101);
    output.set(FieldState::On);
    output.set(FieldState::Flashing);
    assert!(output.scalar());
    output.tick_flash();
    assert!(!output.scalar());
}

#[test]
fn test_flash_tick_ignored_when_not_flashing() {
    let output = FieldOutput::new(101);
    output.set(FieldState::On);
    output.tick_flash();
    assert!(output.scalar());
    output.set(FieldState::Off);
    output.tick_flash();
    assert!(!output.scalar());
}

// ==========================================================================
// Flash coherence
// ==========================================================================

#[test]
fn test_toggle_count_tracks_flash_rate() {
    // 60 FPM for 30 s: one toggle per half period, so 2 * 30 * 60/60
    // toggles, one flash cycle per second.
    let output = FieldOutput::new(101);
    output.set(FieldState::Flashing);

    let fpm = 60.0;
    let duration = 30.0;
    let mut flasher = Flasher::new();
    let mut toggles = 0u32;
    let step = 0.05;
    let mut elapsed = 0.0;
    while elapsed < duration {
        if flasher.poll(step, fpm) {
            output.tick_flash();
            toggles += 1;
        }
        elapsed += step;
    }
    let expected = (duration * fpm / 60.0 * 2.0) as i64;
    assert!((i64::from(toggles) - expected).abs() <= 1, "toggles {toggles}");
}

#[test]
fn test_flasher_half_period_range() {
    // 54-66 FPM maps onto the valid half-period window.
    assert!((Flasher::half_period(60.0) - 0.5).abs() < 1e-9);
    assert!(Flasher::half_period(54.0) > Flasher::half_period(66.0));
}
