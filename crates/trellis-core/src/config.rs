use crate::lane::Millis;

/// Tunables for a [`Reconciler`](crate::Reconciler).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Time budget of one time slice before the work loop yields.
    pub frame_interval_ms: Millis,
    /// Starvation budget for the sync and input-continuous lanes.
    pub sync_lane_expiration_ms: Millis,
    /// Starvation budget for the default lane.
    pub default_lane_expiration_ms: Millis,
    /// When set, default and continuous lanes are time sliced like any other
    /// non-sync lane.
    pub allow_concurrent_by_default: bool,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: 5,
            sync_lane_expiration_ms: 250,
            default_lane_expiration_ms: 5000,
            allow_concurrent_by_default: true,
        }
    }
}
