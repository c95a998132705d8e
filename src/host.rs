//! Host boundary: the narrow, read-only state surface the hooks query.
//!
//! The host-specific glue implements these against its own registries (or
//! passes closures) and calls the hook functions at the matching points.

use crate::types::{AchievementId, CompletionState, ParticipantRef, WorldRules};

/// Looks up the *current* progress of one (participant, achievement) pair.
///
/// `None` means the host has no entry yet; the bridge treats that as
/// "not done".
pub trait ProgressQuery {
    fn completion(
        &self,
        participant: &ParticipantRef,
        achievement: &AchievementId,
    ) -> Option<CompletionState>;
}

impl<F> ProgressQuery for F
where
    F: Fn(&ParticipantRef, &AchievementId) -> Option<CompletionState>,
{
    fn completion(
        &self,
        participant: &ParticipantRef,
        achievement: &AchievementId,
    ) -> Option<CompletionState> {
        self(participant, achievement)
    }
}

/// Resolves the rule set of the world the participant is currently in.
pub trait WorldRuleLookup {
    fn rules_for(&self, participant: &ParticipantRef) -> WorldRules;
}

/// A fixed rule set applies to every participant.
impl WorldRuleLookup for WorldRules {
    fn rules_for(&self, _participant: &ParticipantRef) -> WorldRules {
        *self
    }
}
