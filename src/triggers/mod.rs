//! Release triggers
//!
//! A trigger watches for one kind of engine signal (or simply for the
//! instance being activated) and decides when a pooled instance goes back to
//! its pool. Triggers are configured per pool and apply to every instance the
//! pool hands out. Each trigger fires at most once per activation cycle.
//!
//! # Example
//!
//! ```ignore
//! let config = PoolConfig::default()
//!     .with_initial_size(32)
//!     .with_trigger(ReleaseTrigger::AfterDelay { delay: 2.0 })
//!     .with_trigger(ReleaseTrigger::OnCollision { delay: 0.0 });
//! ```

use std::time::Duration;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::core::seconds;

/// When a pooled instance should be released
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ReleaseTrigger {
    /// Release a fixed time after every activation
    AfterDelay { delay: f32 },
    /// Release when a collision begins, optionally after a delay
    OnCollision {
        #[serde(default)]
        delay: f32,
    },
    /// Release when the rigid body falls asleep, optionally after a delay
    OnBodySleep {
        #[serde(default)]
        delay: f32,
    },
    /// Release as soon as the instance leaves the view
    WhenNotVisible,
}

/// What to do once a trigger fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseAction {
    /// Release right away
    Now,
    /// Schedule a release on the frame clock
    After(Duration),
}

impl ReleaseAction {
    /// `Now` for non-positive delays, otherwise `After(delay)`
    pub fn after_seconds(delay: f32) -> Self {
        let delay = seconds(delay);
        if delay.is_zero() {
            Self::Now
        } else {
            Self::After(delay)
        }
    }
}

/// Kind of an engine signal, without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Collision,
    BecameInvisible,
    BodySleeping,
}

/// A signal raised by the external engine
#[derive(Debug, Clone, PartialEq)]
pub enum Signal<N> {
    /// Two bodies started touching
    Collision {
        /// First body
        a: N,
        /// Second body
        b: N,
        /// World-space contact point
        contact_point: Vec3,
        /// Contact normal (from A to B)
        normal: Vec3,
        /// Magnitude of the relative velocity at impact
        relative_speed: f32,
    },
    /// A renderer left every camera's view
    BecameInvisible { node: N },
    /// A rigid body went to sleep
    BodySleeping { node: N },
}

impl<N: Copy> Signal<N> {
    /// Kind of this signal
    pub fn kind(&self) -> SignalKind {
        match self {
            Self::Collision { .. } => SignalKind::Collision,
            Self::BecameInvisible { .. } => SignalKind::BecameInvisible,
            Self::BodySleeping { .. } => SignalKind::BodySleeping,
        }
    }

    /// Nodes the signal is about
    pub fn nodes(&self) -> SmallVec<[N; 2]> {
        let mut nodes = SmallVec::new();
        match *self {
            Self::Collision { a, b, .. } => {
                nodes.push(a);
                nodes.push(b);
            }
            Self::BecameInvisible { node } | Self::BodySleeping { node } => nodes.push(node),
        }
        nodes
    }
}

impl ReleaseTrigger {
    /// Action to take when an instance is handed out
    pub fn on_activate(&self) -> Option<ReleaseAction> {
        match *self {
            Self::AfterDelay { delay } => Some(ReleaseAction::After(seconds(delay))),
            _ => None,
        }
    }

    /// Action to take when a signal about the instance arrives
    pub fn on_signal(&self, kind: SignalKind) -> Option<ReleaseAction> {
        match (*self, kind) {
            (Self::OnCollision { delay }, SignalKind::Collision)
            | (Self::OnBodySleep { delay }, SignalKind::BodySleeping) => {
                Some(ReleaseAction::after_seconds(delay))
            }
            (Self::WhenNotVisible, SignalKind::BecameInvisible) => Some(ReleaseAction::Now),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_after_delay_schedules_on_activation() {
        let trigger = ReleaseTrigger::AfterDelay { delay: 5.0 };
        assert_eq!(
            trigger.on_activate(),
            Some(ReleaseAction::After(Duration::from_secs(5)))
        );
        assert_eq!(trigger.on_signal(SignalKind::Collision), None);
    }

    #[test]
    fn test_collision_delay_zero_releases_now() {
        let immediate = ReleaseTrigger::OnCollision { delay: 0.0 };
        let delayed = ReleaseTrigger::OnCollision { delay: 0.25 };

        assert_eq!(immediate.on_signal(SignalKind::Collision), Some(ReleaseAction::Now));
        assert_eq!(
            delayed.on_signal(SignalKind::Collision),
            Some(ReleaseAction::After(Duration::from_millis(250)))
        );
        assert_eq!(immediate.on_signal(SignalKind::BodySleeping), None);
        assert_eq!(immediate.on_activate(), None);
    }

    #[test]
    fn test_visibility_and_sleep_triggers() {
        assert_eq!(
            ReleaseTrigger::WhenNotVisible.on_signal(SignalKind::BecameInvisible),
            Some(ReleaseAction::Now)
        );
        assert_eq!(
            ReleaseTrigger::OnBodySleep { delay: -1.0 }.on_signal(SignalKind::BodySleeping),
            Some(ReleaseAction::Now)
        );
    }

    #[test]
    fn test_signal_nodes() {
        let signal = Signal::Collision {
            a: 1_u32,
            b: 2,
            contact_point: Vec3::ZERO,
            normal: Vec3::Y,
            relative_speed: 3.0,
        };
        assert_eq!(signal.kind(), SignalKind::Collision);
        assert_eq!(signal.nodes().as_slice(), &[1, 2]);

        let signal = Signal::BodySleeping { node: 7_u32 };
        assert_eq!(signal.nodes().as_slice(), &[7]);
    }

    #[test]
    fn test_trigger_from_ron() {
        let triggers: Vec<ReleaseTrigger> =
            ron::from_str("[AfterDelay(delay: 1.5), OnBodySleep(delay: 2.0), WhenNotVisible]")
                .unwrap();
        assert_eq!(triggers[0], ReleaseTrigger::AfterDelay { delay: 1.5 });
        assert_eq!(triggers[1], ReleaseTrigger::OnBodySleep { delay: 2.0 });
        assert_eq!(triggers[2], ReleaseTrigger::WhenNotVisible);
    }

    #[test]
    fn test_trigger_delay_defaults_to_zero() {
        let trigger: ReleaseTrigger = serde_json::from_str(r#"{"OnCollision": {}}"#).unwrap();
        assert_eq!(trigger, ReleaseTrigger::OnCollision { delay: 0.0 });
    }
}
