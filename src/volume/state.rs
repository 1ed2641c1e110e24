use std::sync::{Arc, Mutex};

/// Clamps any requested or reported level into 0..=100.
pub fn clamp_percent(value: i64) -> u8 {
    value.clamp(0, 100) as u8
}

/// Last known mixer percentage, shared between request handlers and the poll ticker.
///
/// `None` means the level has never been read successfully.
#[derive(Debug, Clone, Default)]
pub struct VolumeState {
    percent: Arc<Mutex<Option<u8>>>,
}

impl VolumeState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a reading and returns the stored (clamped) value.
    pub fn record(&self, value: i64) -> u8 {
        let clamped = clamp_percent(value);
        *self.lock() = Some(clamped);
        clamped
    }

    pub fn last_known(&self) -> Option<u8> {
        *self.lock()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<u8>> {
        // A poisoned Option<u8> is still a valid value
        self.percent.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
