//! Per-target single-flight guard
//!
//! The source design let two concurrent passes issue conflicting patches
//! against the same deployment. The guard closes that gap: at most one pass
//! per target key may hold the actuation step at a time.

use dashmap::DashMap;
use std::sync::Arc;

/// In-flight marker keyed by deployment target
#[derive(Clone, Default)]
pub struct SingleFlight {
    in_flight: Arc<DashMap<String, ()>>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to claim the key
    ///
    /// Returns `None` while another holder is alive. The claim is released
    /// when the returned guard drops.
    pub fn try_acquire(&self, key: &str) -> Option<FlightGuard> {
        match self.in_flight.entry(key.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => None,
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(());
                Some(FlightGuard {
                    key: key.to_string(),
                    in_flight: Arc::clone(&self.in_flight),
                })
            }
        }
    }
}

/// RAII claim on a single-flight key
pub struct FlightGuard {
    key: String,
    in_flight: Arc<DashMap<String, ()>>,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.in_flight.remove(&self.key);
    }
}
