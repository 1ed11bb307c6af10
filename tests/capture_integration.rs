//! Integration tests for the capture engine
//!
//! These tests validate:
//! - Timestamps relative to the capture epoch, non-decreasing
//! - Move filtering against the last recorded position
//! - Stop key behavior and idempotent stop
//! - Backend failure reporting

mod common;

use common::mock_helpers::{mock_backend, wait_for_subscribers};
use macrotape::engine::CaptureEngine;
use macrotape::{CaptureSettings, EventKind, InputAction, KeySymbol, MacroError, MouseButton, NamedKey};
use std::thread;
use std::time::Duration;

#[test]
fn test_timestamps_follow_arrival() {
    let backend = mock_backend();
    let engine = CaptureEngine::new(backend.clone(), &CaptureSettings::default());
    let handle = engine.handle();

    let worker = thread::spawn(move || engine.start());
    wait_for_subscribers(&backend, 1);

    backend.emit_button(0, 0, MouseButton::Left, true);
    thread::sleep(Duration::from_millis(100));
    backend.emit_button(0, 0, MouseButton::Left, false);
    thread::sleep(Duration::from_millis(100));
    backend.emit_key('q', true);
    handle.stop();

    let log = worker.join().unwrap().unwrap();
    let times: Vec<f64> = log.iter().map(|e| e.time).collect();
    assert_eq!(times.len(), 3);
    assert!(times[0] >= 0.0);
    assert!(times.windows(2).all(|w| w[0] <= w[1]));
    assert!(times[1] - times[0] >= 0.09, "{:?}", times);
    assert!(times[2] - times[0] >= 0.18, "{:?}", times);
    assert!(log.duration() < 5.0);
}

#[test]
fn test_pointer_drift_scenario() {
    let backend = mock_backend();
    let engine = CaptureEngine::new(backend.clone(), &CaptureSettings::default());
    let handle = engine.handle();

    let worker = thread::spawn(move || engine.start());
    wait_for_subscribers(&backend, 1);

    for (x, y) in [(100, 100), (102, 100), (104, 100), (106, 100), (107, 100), (111, 100)] {
        backend.emit_pointer_move(x, y);
    }
    handle.stop();

    let log = worker.join().unwrap().unwrap();
    let positions: Vec<(i32, i32)> = log
        .iter()
        .filter_map(|e| match e.action {
            InputAction::PointerMove { x, y } => Some((x, y)),
            _ => None,
        })
        .collect();
    assert_eq!(positions, vec![(100, 100), (106, 100), (111, 100)]);
}

#[test]
fn test_custom_threshold_and_stop_key() {
    let backend = mock_backend();
    let settings = CaptureSettings {
        movement_threshold: 50,
        stop_key: KeySymbol::Named(NamedKey::Esc),
        ..CaptureSettings::default()
    };
    let engine = CaptureEngine::new(backend.clone(), &settings);

    let worker = thread::spawn(move || engine.start());
    wait_for_subscribers(&backend, 1);

    backend.emit_pointer_move(0, 0);
    backend.emit_pointer_move(49, 0);
    backend.emit_pointer_move(0, 50);
    backend.emit_key(NamedKey::F9, true); // not the stop key here
    backend.emit_key(NamedKey::F9, false);
    backend.emit_key(NamedKey::Esc, true);

    let log = worker.join().unwrap().unwrap();
    let stats = log.stats();
    assert_eq!(stats.move_count, 2);
    assert_eq!(stats.key_press_count, 2);
    assert_eq!(log.events().last().map(|e| e.kind()), Some(EventKind::KeyDown));
}

#[test]
fn test_stop_is_idempotent_and_repeatable() {
    let backend = mock_backend();
    let engine = std::sync::Arc::new(CaptureEngine::new(backend.clone(), &CaptureSettings::default()));
    let handle = engine.handle();

    for round in 0..2 {
        let runner = std::sync::Arc::clone(&engine);
        let worker = thread::spawn(move || runner.start());
        wait_for_subscribers(&backend, 1);

        backend.emit_scroll(0, 0, 0.0, 1.0);
        handle.stop();
        handle.stop();

        let log = worker.join().unwrap().unwrap();
        assert_eq!(log.len(), 1, "round {round}");
        assert!(!handle.is_capturing());
        assert_eq!(backend.subscriber_count(), 0);
    }
}

#[test]
fn test_toggle_moves_mid_capture() {
    let backend = mock_backend();
    let engine = CaptureEngine::new(backend.clone(), &CaptureSettings::default());
    let handle = engine.handle();

    let worker = thread::spawn(move || engine.start());
    wait_for_subscribers(&backend, 1);

    backend.emit_pointer_move(0, 0);
    handle.set_record_moves(false);
    backend.emit_pointer_move(100, 0);
    handle.set_record_moves(true);
    backend.emit_pointer_move(200, 0);
    handle.stop();

    let log = worker.join().unwrap().unwrap();
    assert_eq!(log.stats().move_count, 2);
}

#[test]
fn test_unavailable_backend_fails_start() {
    let backend = std::sync::Arc::new(macrotape::MockBackend::unavailable());
    let engine = CaptureEngine::new(backend, &CaptureSettings::default());
    assert!(matches!(
        engine.start(),
        Err(MacroError::BackendUnavailable(_))
    ));
}
