//! Lifecycle event payloads published on the [`EventBus`](crate::bus::EventBus).
//!
//! ## Event contract
//!
//! | Event                  | Published by                                     | After host has…                 |
//! |------------------------|--------------------------------------------------|---------------------------------|
//! | `ParticipantJoined`    | [`JoinHook`](crate::hooks::JoinHook)             | added participant to roster     |
//! | `ParticipantLeft`      | [`LeaveHook`](crate::hooks::LeaveHook)           | removed participant from roster |
//! | `ParticipantDied`      | [`DeathHook`](crate::hooks::DeathHook)           | applied death processing        |
//! | `AchievementCompleted` | [`CriterionGrantedHook`](crate::hooks::CriterionGrantedHook) | applied the completing grant |
//!
//! Payloads are immutable snapshots; subscribers receive `&E` and cannot
//! reach back into the host.

use crate::types::{Achievement, DeathCause, ParticipantRef};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Event kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    ParticipantJoined,
    ParticipantLeft,
    ParticipantDied,
    AchievementCompleted,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::ParticipantJoined => "participant.joined",
            EventKind::ParticipantLeft => "participant.left",
            EventKind::ParticipantDied => "participant.died",
            EventKind::AchievementCompleted => "achievement.completed",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Marker for payload types that can travel over the bus.
pub trait BridgeEvent: Send + Sync + 'static {
    const KIND: EventKind;
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantJoined {
    pub participant: ParticipantRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantLeft {
    pub participant: ParticipantRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantDied {
    pub participant: ParticipantRef,
    /// Passed through unchanged from the host.
    pub cause: DeathCause,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementCompleted {
    pub participant: ParticipantRef,
    pub achievement: Achievement,
    /// Result of [`should_announce`](crate::policy::should_announce).
    pub should_announce: bool,
}

impl BridgeEvent for ParticipantJoined {
    const KIND: EventKind = EventKind::ParticipantJoined;
}

impl BridgeEvent for ParticipantLeft {
    const KIND: EventKind = EventKind::ParticipantLeft;
}

impl BridgeEvent for ParticipantDied {
    const KIND: EventKind = EventKind::ParticipantDied;
}

impl BridgeEvent for AchievementCompleted {
    const KIND: EventKind = EventKind::AchievementCompleted;
}

// ---------------------------------------------------------------------------
// Tagged union
// ---------------------------------------------------------------------------

/// Any bridge event, for consumers that want a single stream
/// (serialisation, recording, catch-all subscribers).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    ParticipantJoined(ParticipantJoined),
    ParticipantLeft(ParticipantLeft),
    ParticipantDied(ParticipantDied),
    AchievementCompleted(AchievementCompleted),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::ParticipantJoined(_) => EventKind::ParticipantJoined,
            Event::ParticipantLeft(_) => EventKind::ParticipantLeft,
            Event::ParticipantDied(_) => EventKind::ParticipantDied,
            Event::AchievementCompleted(_) => EventKind::AchievementCompleted,
        }
    }

    pub fn participant(&self) -> &ParticipantRef {
        match self {
            Event::ParticipantJoined(e) => &e.participant,
            Event::ParticipantLeft(e) => &e.participant,
            Event::ParticipantDied(e) => &e.participant,
            Event::AchievementCompleted(e) => &e.participant,
        }
    }
}

impl From<ParticipantJoined> for Event {
    fn from(e: ParticipantJoined) -> Self {
        Event::ParticipantJoined(e)
    }
}

impl From<ParticipantLeft> for Event {
    fn from(e: ParticipantLeft) -> Self {
        Event::ParticipantLeft(e)
    }
}

impl From<ParticipantDied> for Event {
    fn from(e: ParticipantDied) -> Self {
        Event::ParticipantDied(e)
    }
}

impl From<AchievementCompleted> for Event {
    fn from(e: AchievementCompleted) -> Self {
        Event::AchievementCompleted(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Achievement, Display};

    #[test]
    fn tagged_union_serializes_with_kind() {
        let event: Event = ParticipantDied {
            participant: ParticipantRef::new("u-1", "alice"),
            cause: DeathCause::new("alice fell from a high place"),
        }
        .into();

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "participant_died");
        assert_eq!(json["cause"], "alice fell from a high place");
        assert_eq!(event.kind(), EventKind::ParticipantDied);
    }

    #[test]
    fn kind_constants_match_union() {
        let completed: Event = AchievementCompleted {
            participant: ParticipantRef::new("u-2", "bob"),
            achievement: Achievement::new(
                "story/mine_stone",
                Some(Display::new("Stone Age", true)),
            ),
            should_announce: true,
        }
        .into();
        assert_eq!(completed.kind(), AchievementCompleted::KIND);
        assert_eq!(completed.participant().name, "bob");
    }
}
