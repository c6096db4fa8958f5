//! Per-tick reports emitted by the presentation controller.

use crate::presentation::PresentationState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresentationEvent {
    /// The state machine moved on.
    Transitioned {
        from: PresentationState,
        to: PresentationState,
    },
    /// Decoding a catalog entry failed; another entry will be tried next tick.
    LoadFailed { index: usize, reason: String },
}

/// What one call to `tick` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    /// State the tick ran in.
    pub state: PresentationState,
    /// Catalog entry current during the tick.
    pub index: usize,
    /// Panel brightness after the tick.
    pub brightness: u8,
    /// Whether a glitched frame was composited.
    pub rendered: bool,
    pub event: Option<PresentationEvent>,
}

impl TickReport {
    /// The state entered at the end of this tick, if it changed.
    #[must_use]
    pub fn entered(&self) -> Option<PresentationState> {
        match self.event {
            Some(PresentationEvent::Transitioned { to, .. }) => Some(to),
            _ => None,
        }
    }
}
