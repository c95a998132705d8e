//! `Bridge` – the single object a host embeds.
//!
//! Owns one [`EventBus`] (shared with subscribers through [`Bridge::bus`])
//! and the four hook adapters. The host-specific glue constructs it once at
//! startup, registers subscribers, then calls the `on_*` methods from its
//! processing loop at the documented points.

use crate::bus::{Delivery, EventBus};
use crate::hooks::{CriterionGrantedHook, DeathHook, GrantOutcome, JoinHook, LeaveHook};
use crate::host::{ProgressQuery, WorldRuleLookup};
use crate::types::{Achievement, AchievementId, DeathCause, ParticipantRef};
use std::sync::Arc;

pub struct Bridge {
    bus: Arc<EventBus>,
    join: JoinHook,
    leave: LeaveHook,
    death: DeathHook,
    criteria: CriterionGrantedHook,
}

impl Bridge {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            join: JoinHook::new(bus.clone()),
            leave: LeaveHook::new(bus.clone()),
            death: DeathHook::new(bus.clone()),
            criteria: CriterionGrantedHook::new(bus.clone()),
            bus,
        }
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    // -----------------------------------------------------------------------
    // Hook points
    // -----------------------------------------------------------------------

    /// Participant is now in the active roster.
    pub fn on_participant_connected(&self, participant: &ParticipantRef) -> Delivery {
        self.join.on_participant_connected(participant)
    }

    /// Participant is no longer in the active roster. Ends its completion
    /// session.
    pub fn on_participant_removed(&self, participant: &ParticipantRef) -> Delivery {
        let delivery = self.leave.on_participant_removed(participant);
        self.criteria.end_session(participant);
        delivery
    }

    /// Death processing (drops, state flags) has been applied.
    pub fn on_participant_death(
        &self,
        participant: &ParticipantRef,
        cause: &DeathCause,
    ) -> Delivery {
        self.death.on_participant_death(participant, cause)
    }

    /// The host's progress already includes the grant of `criterion`.
    pub fn on_criterion_granted(
        &self,
        participant: &ParticipantRef,
        achievement: &Achievement,
        criterion: &str,
        progress: &dyn ProgressQuery,
        rules: &dyn WorldRuleLookup,
    ) -> GrantOutcome {
        self.criteria
            .on_criterion_granted(participant, achievement, criterion, progress, rules)
    }

    // -----------------------------------------------------------------------
    // Session bookkeeping
    // -----------------------------------------------------------------------

    /// Mark achievements the participant had already completed when its
    /// progress was loaded, so replayed grants on them stay silent.
    pub fn prime_completed<I>(&self, participant: &ParticipantRef, achievements: I)
    where
        I: IntoIterator<Item = AchievementId>,
    {
        self.criteria.ledger().prime(participant, achievements);
    }

    pub fn is_completed(&self, participant: &ParticipantRef, achievement: &AchievementId) -> bool {
        self.criteria.ledger().contains(participant, achievement)
    }
}

impl Default for Bridge {
    fn default() -> Self {
        Self::new(Arc::new(EventBus::new()))
    }
}
