//! Sync progress reporting.

/// Receives human-readable status while a sync or add runs.
pub trait SyncProgress: Send + Sync {
    /// Called when a phase starts (e.g., "Fetching updates from TheTVDB").
    fn on_phase(&self, message: &str);

    /// Called before each entity of a batch is fetched.
    fn on_item(&self, current: usize, total: usize, message: &str);

    /// Called when the operation is complete.
    fn on_complete(&self, message: &str);
}

/// A no-op progress reporter that discards all updates.
pub struct SilentProgress;

impl SyncProgress for SilentProgress {
    fn on_phase(&self, _message: &str) {}
    fn on_item(&self, _current: usize, _total: usize, _message: &str) {}
    fn on_complete(&self, _message: &str) {}
}

/// A progress reporter that logs to the `log` crate.
pub struct LogProgress;

impl SyncProgress for LogProgress {
    fn on_phase(&self, message: &str) {
        log::info!("{}", message);
    }

    fn on_item(&self, current: usize, total: usize, message: &str) {
        log::info!("  [{}/{}] {}", current, total, message);
    }

    fn on_complete(&self, message: &str) {
        log::info!("{}", message);
    }
}
