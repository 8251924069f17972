//! Bridge readiness: disconnected until the host sends `initialize`.

use serde::{Deserialize, Serialize};

/// Lifecycle of the bridge as seen by the front end.
///
/// `Disconnected -> Connected` is the only transition; a host disconnect is
/// not modelled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected,
}

impl ConnectionState {
    #[must_use]
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Record an `initialize` push. Returns `true` only for the call that
    /// actually performed the transition.
    pub fn mark_initialized(&mut self) -> bool {
        let first = !self.is_connected();
        *self = Self::Connected;
        first
    }
}
