//! Service lifecycle state machine
//!
//! Pure transition logic for the three service phases. The controller feeds
//! it attach/detach signals and tracking changes and carries out the
//! returned [`Presentation`]; nothing here touches a collaborator.
//!
//! ```text
//!                 attach / reattach
//!      ┌──────────────────────────────────────────┐
//!      │                                          ▼
//!  Detached ◄── detach (off) ── AttachedForeground ── detach (on) ──► DetachedForeground
//!      │  ▲                          ▲                                    │   │
//!      │  └──── tracking off ────────┼────────────────────────────────────┘   │
//!      └──────── tracking on ────────┼───────────────────────────────────────►│
//!                                    └──────────── attach / reattach ─────────┘
//! ```
//!
//! A detach caused by a configuration change (rotation) leaves the phase and
//! the notification exactly as they were.

use std::fmt;

/// Phase of the location service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LifecyclePhase {
    /// No UI bound; the host may tear the process down if tracking is off
    #[default]
    Detached,
    /// UI bound and visible; notification suppressed
    AttachedForeground,
    /// UI gone while tracking; promoted with an ongoing notification
    DetachedForeground,
}

impl LifecyclePhase {
    /// True if the ongoing notification must be visible in this phase
    pub fn shows_notification(self) -> bool {
        self == LifecyclePhase::DetachedForeground
    }

    pub fn is_attached(self) -> bool {
        self == LifecyclePhase::AttachedForeground
    }
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecyclePhase::Detached => write!(f, "Detached"),
            LifecyclePhase::AttachedForeground => write!(f, "AttachedForeground"),
            LifecyclePhase::DetachedForeground => write!(f, "DetachedForeground"),
        }
    }
}

/// Why the UI detached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetachReason {
    /// The UI really went away
    #[default]
    Genuine,
    /// Transient reconfiguration; the UI comes right back
    ConfigurationChange,
}

/// Input to the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleSignal {
    /// First bind of a UI client
    Attach,
    /// A UI client returned after detaching
    Reattach,
    Detach(DetachReason),
    /// The host reported a configuration change; the next detach is transient
    ConfigurationChanged,
    /// Tracking was switched on or off
    TrackingChanged(bool),
}

/// What the notification layer must do after a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presentation {
    /// Promote to foreground and show the ongoing notification
    Show,
    /// Leave foreground and remove the notification
    Hide,
    Unchanged,
}

/// Result of applying one signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: LifecyclePhase,
    pub to: LifecyclePhase,
    pub presentation: Presentation,
}

impl Transition {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Process-local lifecycle state; recomputed on every process start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LifecycleState {
    phase: LifecyclePhase,
    configuration_change: bool,
}

impl LifecycleState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    /// True if a configuration change was reported since the last attach
    pub fn configuration_change_pending(&self) -> bool {
        self.configuration_change
    }

    /// Apply `signal` given the current tracking flag
    pub fn apply(&mut self, signal: LifecycleSignal, tracking_enabled: bool) -> Transition {
        let from = self.phase;
        let (to, presentation) = match signal {
            LifecycleSignal::Attach | LifecycleSignal::Reattach => {
                self.configuration_change = false;
                (LifecyclePhase::AttachedForeground, Presentation::Hide)
            }
            LifecycleSignal::ConfigurationChanged => {
                self.configuration_change = true;
                (from, Presentation::Unchanged)
            }
            LifecycleSignal::Detach(reason) => {
                if reason == DetachReason::ConfigurationChange || self.configuration_change {
                    (from, Presentation::Unchanged)
                } else if tracking_enabled {
                    (LifecyclePhase::DetachedForeground, Presentation::Show)
                } else if from.shows_notification() {
                    (LifecyclePhase::Detached, Presentation::Hide)
                } else {
                    (LifecyclePhase::Detached, Presentation::Unchanged)
                }
            }
            LifecycleSignal::TrackingChanged(enabled) => match (from, enabled) {
                (LifecyclePhase::Detached, true) => {
                    (LifecyclePhase::DetachedForeground, Presentation::Show)
                }
                (LifecyclePhase::DetachedForeground, false) => {
                    (LifecyclePhase::Detached, Presentation::Hide)
                }
                _ => (from, Presentation::Unchanged),
            },
        };
        self.phase = to;
        Transition {
            from,
            to,
            presentation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENUINE: LifecycleSignal = LifecycleSignal::Detach(DetachReason::Genuine);
    const ROTATION: LifecycleSignal = LifecycleSignal::Detach(DetachReason::ConfigurationChange);

    #[test]
    fn test_attach_detach_without_tracking() {
        let mut state = LifecycleState::new();

        let t = state.apply(LifecycleSignal::Attach, false);
        assert_eq!(t.to, LifecyclePhase::AttachedForeground);
        assert_eq!(t.presentation, Presentation::Hide);

        let t = state.apply(GENUINE, false);
        assert_eq!(t.to, LifecyclePhase::Detached);
        assert_eq!(t.presentation, Presentation::Unchanged);
    }

    #[test]
    fn test_detach_while_tracking_promotes() {
        let mut state = LifecycleState::new();
        state.apply(LifecycleSignal::Attach, true);

        let t = state.apply(GENUINE, true);
        assert_eq!(t.to, LifecyclePhase::DetachedForeground);
        assert_eq!(t.presentation, Presentation::Show);

        let t = state.apply(LifecycleSignal::Reattach, true);
        assert_eq!(t.to, LifecyclePhase::AttachedForeground);
        assert_eq!(t.presentation, Presentation::Hide);
    }

    #[test]
    fn test_configuration_change_detach_is_noop() {
        let mut state = LifecycleState::new();
        state.apply(LifecycleSignal::Attach, true);

        let t = state.apply(ROTATION, true);
        assert!(!t.changed());
        assert_eq!(t.presentation, Presentation::Unchanged);
        assert_eq!(state.phase(), LifecyclePhase::AttachedForeground);
    }

    #[test]
    fn test_reported_configuration_change_flags_next_detach() {
        let mut state = LifecycleState::new();
        state.apply(LifecycleSignal::Attach, true);
        state.apply(LifecycleSignal::ConfigurationChanged, true);
        assert!(state.configuration_change_pending());

        let t = state.apply(GENUINE, true);
        assert_eq!(t.presentation, Presentation::Unchanged);
        assert_eq!(state.phase(), LifecyclePhase::AttachedForeground);

        // Rebinding clears the flag, so the next real detach promotes again
        state.apply(LifecycleSignal::Reattach, true);
        assert!(!state.configuration_change_pending());
        assert_eq!(state.apply(GENUINE, true).presentation, Presentation::Show);
    }

    #[test]
    fn test_tracking_changes_while_detached() {
        let mut state = LifecycleState::new();

        let t = state.apply(LifecycleSignal::TrackingChanged(true), true);
        assert_eq!(t.to, LifecyclePhase::DetachedForeground);
        assert_eq!(t.presentation, Presentation::Show);

        let t = state.apply(LifecycleSignal::TrackingChanged(false), false);
        assert_eq!(t.to, LifecyclePhase::Detached);
        assert_eq!(t.presentation, Presentation::Hide);
    }

    #[test]
    fn test_tracking_changes_while_attached_keep_phase() {
        let mut state = LifecycleState::new();
        state.apply(LifecycleSignal::Attach, false);

        let t = state.apply(LifecycleSignal::TrackingChanged(true), true);
        assert_eq!(t.to, LifecyclePhase::AttachedForeground);
        assert_eq!(t.presentation, Presentation::Unchanged);
    }

    const SIGNALS: [LifecycleSignal; 7] = [
        LifecycleSignal::Attach,
        LifecycleSignal::Reattach,
        GENUINE,
        ROTATION,
        LifecycleSignal::ConfigurationChanged,
        LifecycleSignal::TrackingChanged(true),
        LifecycleSignal::TrackingChanged(false),
    ];

    /// Every sequence over `SIGNALS` of length 1 to `max_len`
    fn all_sequences(max_len: u32) -> impl Iterator<Item = Vec<LifecycleSignal>> {
        (1..=max_len).flat_map(|len| {
            (0..SIGNALS.len().pow(len)).map(move |mut index| {
                (0..len)
                    .map(|_| {
                        let signal = SIGNALS[index % SIGNALS.len()];
                        index /= SIGNALS.len();
                        signal
                    })
                    .collect()
            })
        })
    }

    #[test]
    fn test_all_sequences_enumerated() {
        assert_eq!(all_sequences(4).count(), 7 + 49 + 343 + 2401);
    }

    /// Replays every short signal sequence, from either initial tracking
    /// value, and checks that a visibility flag driven only by the returned
    /// presentations always matches the phase.
    #[test]
    fn test_notification_visible_iff_detached_foreground() {
        for initial_tracking in [false, true] {
            for sequence in all_sequences(4) {
                let mut state = LifecycleState::new();
                let mut tracking = initial_tracking;
                let mut visible = false;
                for signal in sequence.iter().copied() {
                    if let LifecycleSignal::TrackingChanged(enabled) = signal {
                        tracking = enabled;
                    }
                    let before = state.phase();
                    let transition = state.apply(signal, tracking);
                    match transition.presentation {
                        Presentation::Show => visible = true,
                        Presentation::Hide => visible = false,
                        Presentation::Unchanged => {}
                    }

                    assert_eq!(
                        visible,
                        state.phase().shows_notification(),
                        "after {:?} with tracking={} in {:?}",
                        signal,
                        initial_tracking,
                        sequence
                    );
                    if signal == ROTATION {
                        assert_eq!(state.phase(), before, "rotation moved phase in {:?}", sequence);
                        assert_eq!(transition.presentation, Presentation::Unchanged);
                    }
                }
            }
        }
    }
}
