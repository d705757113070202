//! Test helpers for arena-bridge-server unit tests.

use tempfile::TempDir;

use arena_bridge_core::bridge::AppState;
use arena_bridge_core::modules::config::ConfigStore;

/// Create an `AppState` backed by an empty data directory.
///
/// Returns `(AppState, TempDir)`; keep `TempDir` alive for the test duration.
pub fn test_app_state() -> (AppState, TempDir) {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let state = AppState::new(ConfigStore::load(temp_dir.path())).expect("failed to create test AppState");
    (state, temp_dir)
}
