//! Completion policy: should an achievement completion be announced?

use crate::types::{Display, WorldRules};

/// `true` only when the achievement has a display, that display asks for a
/// chat announcement, and the participant's world allows announcements.
pub fn should_announce(display: Option<&Display>, rules: &WorldRules) -> bool {
    match display {
        Some(display) => display.announce_to_chat && rules.announce_achievements,
        None => false,
    }
}
