//! Helpers around the mock input backend

use super::wait_until;
use macrotape::backend::{InjectedInput, MockBackend};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Create a shared mock backend
pub fn mock_backend() -> Arc<MockBackend> {
    Arc::new(MockBackend::new())
}

/// Wait until the backend has `count` subscribers
pub fn wait_for_subscribers(backend: &MockBackend, count: usize) {
    assert!(
        wait_until(|| backend.subscriber_count() == count),
        "expected {} subscribers, found {}",
        count,
        backend.subscriber_count()
    );
}

/// Wait until the backend has seen at least `count` injections
pub fn wait_for_injections(backend: &MockBackend, count: usize) {
    assert!(
        wait_until(|| backend.injected_count() >= count),
        "expected {} injections, found {}",
        count,
        backend.injected_count()
    );
}

/// Offsets of each injection relative to the first one
pub fn injection_offsets(backend: &MockBackend) -> Vec<Duration> {
    let records = backend.injected();
    let Some(first) = records.first().map(|r| r.at) else {
        return Vec::new();
    };
    records
        .iter()
        .map(|r| r.at.saturating_duration_since(first))
        .collect()
}

/// Instant of the last injection
pub fn last_injection_at(backend: &MockBackend) -> Option<Instant> {
    backend.injected().last().map(|r| r.at)
}

/// Injected pointer positions, ignoring other inputs
pub fn injected_positions(backend: &MockBackend) -> Vec<(i32, i32)> {
    backend
        .injected_inputs()
        .into_iter()
        .filter_map(|input| match input {
            InjectedInput::PointerMove { x, y } => Some((x, y)),
            _ => None,
        })
        .collect()
}
