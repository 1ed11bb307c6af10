//! Integration tests for the persistence codec and script compiler

mod common;

use common::builders::LogBuilder;
use macrotape::persistence::{self, compile_to_script, from_json_str, to_json_string};
use macrotape::{EventLog, InputAction, InputEvent, KeySymbol, MacroError, MouseButton, NamedKey};
use proptest::prelude::*;

#[test]
fn test_file_round_trip_preserves_everything() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("macros").join("demo.json");

    let log = LogBuilder::new()
        .step(0.125)
        .move_to(-20, 1080)
        .click(5, 5, MouseButton::X2)
        .scroll(-1.5, 3.0)
        .tap(NamedKey::AltGr)
        .tap('ß')
        .key_down(KeySymbol::parse("Key.hyper"))
        .build();

    persistence::save(&log, &path).unwrap();
    let loaded = persistence::load(&path).unwrap();

    assert_eq!(loaded, log);
    assert_eq!(loaded.stats(), log.stats());
}

#[test]
fn test_save_replaces_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("macro.json");

    persistence::save(&LogBuilder::new().move_to(1, 1).build(), &path).unwrap();
    let second = LogBuilder::new().move_to(2, 2).move_to(3, 3).build();
    persistence::save(&second, &path).unwrap();

    assert_eq!(persistence::load(&path).unwrap(), second);
}

#[test]
fn test_pretty_output_uses_two_space_indent() {
    let json = to_json_string(&LogBuilder::new().move_to(1, 2).build()).unwrap();
    assert!(json.starts_with("[\n  {\n    \""));
}

#[test]
fn test_legacy_file_loads() {
    let json = r#"[
      {"type": "mouse_move", "data": {"x": 640, "y": 480}, "time": 0.0},
      {"type": "mouse_click", "data": {"x": 640, "y": 480, "button": "Button.right", "pressed": true}, "time": 0.31},
      {"type": "mouse_scroll", "data": {"x": 640, "y": 480, "dx": 0, "dy": -1}, "time": 0.52},
      {"type": "key_press", "data": {"key": "'h'"}, "time": 0.9},
      {"type": "key_release", "data": {"key": "'h'"}, "time": 0.95},
      {"type": "key_press", "data": {"key": "Key.f9"}, "time": 1.2}
    ]"#;

    let log = from_json_str(json).unwrap();
    let stats = log.stats();
    assert_eq!(stats.total_events, 6);
    assert_eq!(stats.click_count, 1);
    assert_eq!(stats.move_count, 1);
    assert_eq!(stats.key_press_count, 2);
    common::assert_float_eq(stats.duration, 1.2, 1e-12);
    assert_eq!(
        log.events()[2].action,
        InputAction::Scroll {
            x: 640,
            y: 480,
            dx: 0.0,
            dy: -1.0
        }
    );
}

#[test]
fn test_non_monotonic_file_names_offending_index() {
    let json = r#"[
      {"type": "mouse_move", "data": {"x": 0, "y": 0}, "time": 0.5},
      {"type": "mouse_move", "data": {"x": 0, "y": 0}, "time": 0.7},
      {"type": "mouse_move", "data": {"x": 0, "y": 0}, "time": 0.6}
    ]"#;

    match from_json_str(json) {
        Err(MacroError::MalformedLog(message)) => assert!(message.contains("event 2"), "{message}"),
        other => panic!("expected MalformedLog, got {other:?}"),
    }
}

#[test]
fn test_load_failure_is_wrapped_with_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "[{\"type\": \"mouse_move\"").unwrap();

    let err = persistence::load(&path).unwrap_err();
    assert!(matches!(err.root(), MacroError::MalformedLog(_)));
    assert!(err.to_string().contains("broken.json"));
}

#[test]
fn test_compiled_script_written() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("replay.py");
    let log = LogBuilder::new().step(0.1).move_to(1, 1).tap('x').build();

    compile_to_script(&log, &out).unwrap();

    let script = std::fs::read_to_string(&out).unwrap();
    assert!(script.starts_with("#!/usr/bin/env python3"));
    assert!(script.contains("keyboard.Key.__members__"));
    assert!(script.contains("Events: 3"));
}

fn arb_key() -> impl Strategy<Value = KeySymbol> {
    prop_oneof![
        prop::sample::select(NamedKey::ALL.to_vec()).prop_map(KeySymbol::Named),
        any::<char>().prop_map(KeySymbol::Char),
    ]
}

fn arb_action() -> impl Strategy<Value = InputAction> {
    let button = prop::sample::select(vec![
        MouseButton::Left,
        MouseButton::Right,
        MouseButton::Middle,
        MouseButton::X1,
        MouseButton::X2,
    ]);
    prop_oneof![
        (any::<i32>(), any::<i32>()).prop_map(|(x, y)| InputAction::PointerMove { x, y }),
        (any::<i32>(), any::<i32>(), button, any::<bool>()).prop_map(|(x, y, button, pressed)| {
            InputAction::PointerButton {
                x,
                y,
                button,
                pressed,
            }
        }),
        (-100.0f64..100.0, -100.0f64..100.0)
            .prop_map(|(dx, dy)| InputAction::Scroll { x: 0, y: 0, dx, dy }),
        arb_key().prop_map(|key| InputAction::KeyDown { key }),
        arb_key().prop_map(|key| InputAction::KeyUp { key }),
    ]
}

fn arb_log() -> impl Strategy<Value = EventLog> {
    prop::collection::vec((0.0f64..2.0, arb_action()), 0..40).prop_map(|steps| {
        let mut time = 0.0;
        let events = steps
            .into_iter()
            .map(|(delta, action)| {
                time += delta;
                InputEvent::new(time, action)
            })
            .collect();
        EventLog::new(events).unwrap()
    })
}

proptest! {
    #[test]
    fn test_codec_round_trip(log in arb_log()) {
        let json = to_json_string(&log).unwrap();
        let decoded = from_json_str(&json).unwrap();
        prop_assert_eq!(decoded, log);
    }
}
