//! Lifecycle state of a port handle.

use serde::Serialize;
use std::sync::atomic::{AtomicU8, Ordering};

/// Where a `PortHandle` is in its lifecycle.
///
/// `Unopened -> Opened -> Closed`. `Closed` is terminal: reopening a device
/// takes a fresh handle from the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PortState {
    #[default]
    Unopened,
    Opened,
    Closed,
}

impl PortState {
    fn to_u8(self) -> u8 {
        match self {
            PortState::Unopened => 0,
            PortState::Opened => 1,
            PortState::Closed => 2,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => PortState::Unopened,
            1 => PortState::Opened,
            _ => PortState::Closed,
        }
    }
}

/// A `PortState` readable without taking any lock.
#[derive(Debug, Default)]
pub(crate) struct AtomicState(AtomicU8);

impl AtomicState {
    pub(crate) fn load(&self) -> PortState {
        PortState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn is_opened(&self) -> bool {
        self.load() == PortState::Opened
    }

    pub(crate) fn store(&self, state: PortState) {
        self.0.store(state.to_u8(), Ordering::Release);
    }

    /// Move `from -> to` if the current state is `from`. Returns whether the
    /// transition happened.
    pub(crate) fn transition(&self, from: PortState, to: PortState) -> bool {
        self.0
            .compare_exchange(from.to_u8(), to.to_u8(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
