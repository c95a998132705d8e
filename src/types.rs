//! Host-facing value types shared across all modules.
//!
//! Everything here is a read-only snapshot handed over by the host at a hook
//! point. The bridge never owns or mutates the host objects these describe.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Participants
// ---------------------------------------------------------------------------

/// Snapshot of a host participant at the moment a hook fired.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticipantRef {
    /// Stable host identifier (e.g. a UUID string).
    pub id: String,
    /// Account name.
    pub name: String,
    /// Decorated name shown in-world, if the host has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Hidden from other participants; relays skip it.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub vanished: bool,
}

impl ParticipantRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            display_name: None,
            vanished: false,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_vanished(mut self, vanished: bool) -> Self {
        self.vanished = vanished;
        self
    }

    /// Name to show to humans: display name when set, account name otherwise.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

impl std::fmt::Display for ParticipantRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

// ---------------------------------------------------------------------------
// Achievements
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AchievementId(pub String);

impl AchievementId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AchievementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Presentation tier of an achievement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frame {
    #[default]
    Task,
    Goal,
    Challenge,
}

/// User-facing metadata for an achievement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Display {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub frame: Frame,
    /// Whether the host would announce completion in its own chat.
    pub announce_to_chat: bool,
}

impl Display {
    pub fn new(title: impl Into<String>, announce_to_chat: bool) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            frame: Frame::Task,
            announce_to_chat,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_frame(mut self, frame: Frame) -> Self {
        self.frame = frame;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: AchievementId,
    /// Absent for hidden/internal achievements (recipes, root nodes, …).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<Display>,
}

impl Achievement {
    pub fn new(id: impl Into<String>, display: Option<Display>) -> Self {
        Self {
            id: AchievementId::new(id),
            display,
        }
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Per-criterion progress of one (participant, achievement) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionState {
    /// Criterion name → granted.
    pub criteria: BTreeMap<String, bool>,
}

impl CompletionState {
    /// Build a state with every named criterion still outstanding.
    pub fn pending<I, S>(criteria: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            criteria: criteria.into_iter().map(|c| (c.into(), false)).collect(),
        }
    }

    /// Mark `criterion` as granted. Returns `false` if it is not part of
    /// this achievement.
    pub fn grant(&mut self, criterion: &str) -> bool {
        match self.criteria.get_mut(criterion) {
            Some(granted) => {
                *granted = true;
                true
            }
            None => false,
        }
    }

    /// Done when there is at least one criterion and all are granted.
    pub fn is_done(&self) -> bool {
        !self.criteria.is_empty() && self.criteria.values().all(|granted| *granted)
    }

    pub fn granted_count(&self) -> usize {
        self.criteria.values().filter(|granted| **granted).count()
    }
}

// ---------------------------------------------------------------------------
// World rules & causes
// ---------------------------------------------------------------------------

/// Per-world toggles owned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldRules {
    pub announce_achievements: bool,
}

impl Default for WorldRules {
    fn default() -> Self {
        Self {
            announce_achievements: true,
        }
    }
}

/// What killed a participant, already rendered by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeathCause(pub String);

impl DeathCause {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DeathCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
