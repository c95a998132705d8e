//! Hook adapters – one per host lifecycle point.
//!
//! | Hook                     | Host calls it…                              | Publishes              |
//! |--------------------------|---------------------------------------------|------------------------|
//! | [`JoinHook`]             | after participant added to active roster    | `ParticipantJoined`    |
//! | [`LeaveHook`]            | after participant removed from roster       | `ParticipantLeft`      |
//! | [`DeathHook`]            | after death processing (drops, flags)       | `ParticipantDied`      |
//! | [`CriterionGrantedHook`] | after the host applied a criterion grant    | `AchievementCompleted` |
//!
//! Hooks only read host state and never return an error to the caller.

use crate::bus::{Delivery, EventBus};
use crate::events::{AchievementCompleted, ParticipantDied, ParticipantJoined, ParticipantLeft};
use crate::host::{ProgressQuery, WorldRuleLookup};
use crate::policy::should_announce;
use crate::types::{Achievement, AchievementId, DeathCause, ParticipantRef};
use log::debug;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Join / leave / death
// ---------------------------------------------------------------------------

pub struct JoinHook {
    bus: Arc<EventBus>,
}

impl JoinHook {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }

    pub fn on_participant_connected(&self, participant: &ParticipantRef) -> Delivery {
        debug!("Participant {} joined", participant);
        self.bus.publish(&ParticipantJoined {
            participant: participant.clone(),
        })
    }
}

pub struct LeaveHook {
    bus: Arc<EventBus>,
}

impl LeaveHook {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }

    pub fn on_participant_removed(&self, participant: &ParticipantRef) -> Delivery {
        debug!("Participant {} left", participant);
        self.bus.publish(&ParticipantLeft {
            participant: participant.clone(),
        })
    }
}

pub struct DeathHook {
    bus: Arc<EventBus>,
}

impl DeathHook {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self { bus }
    }

    pub fn on_participant_death(
        &self,
        participant: &ParticipantRef,
        cause: &DeathCause,
    ) -> Delivery {
        debug!("Participant {} died: {}", participant, cause);
        self.bus.publish(&ParticipantDied {
            participant: participant.clone(),
            cause: cause.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Completion ledger
// ---------------------------------------------------------------------------

/// Achievements already reported complete, per participant session.
///
/// This is what makes completion edge-triggered: the host may call its grant
/// routine again on an achievement that is already done (save/reload replay,
/// duplicate triggers) and the bridge must stay quiet.
#[derive(Default)]
pub struct CompletionLedger {
    completed: Mutex<HashMap<String, HashSet<AchievementId>>>,
}

impl CompletionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completion. Returns `true` only the first time.
    pub fn record(&self, participant: &ParticipantRef, achievement: &AchievementId) -> bool {
        self.completed
            .lock()
            .entry(participant.id.clone())
            .or_default()
            .insert(achievement.clone())
    }

    /// Drop a completion after the host reported the achievement as not done
    /// again, so a later completion counts as a new transition.
    pub fn revoke(&self, participant: &ParticipantRef, achievement: &AchievementId) -> bool {
        let mut completed = self.completed.lock();
        match completed.get_mut(&participant.id) {
            Some(set) => set.remove(achievement),
            None => false,
        }
    }

    /// Seed achievements the host already considers complete (loaded from
    /// its save data when the participant connects).
    pub fn prime<I>(&self, participant: &ParticipantRef, achievements: I)
    where
        I: IntoIterator<Item = AchievementId>,
    {
        self.completed
            .lock()
            .entry(participant.id.clone())
            .or_default()
            .extend(achievements);
    }

    /// Forget everything about a participant whose session ended.
    pub fn forget(&self, participant: &ParticipantRef) {
        self.completed.lock().remove(&participant.id);
    }

    pub fn contains(&self, participant: &ParticipantRef, achievement: &AchievementId) -> bool {
        self.completed
            .lock()
            .get(&participant.id)
            .is_some_and(|set| set.contains(achievement))
    }

    pub fn tracked_participants(&self) -> usize {
        self.completed.lock().len()
    }
}

// ---------------------------------------------------------------------------
// Criterion granted
// ---------------------------------------------------------------------------

/// What a single [`CriterionGrantedHook::on_criterion_granted`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantOutcome {
    /// Host has no progress entry for the pair.
    StaleQuery,
    /// Achievement still has outstanding criteria.
    NotDone,
    /// Done, but a previous call already reported the transition.
    AlreadyCompleted,
    /// This call completed the achievement; the event went out.
    Published {
        should_announce: bool,
        delivery: Delivery,
    },
}

/// Edge-triggered completion reporting.
///
/// The ledger lives as long as the hook. Whoever calls the leave hook must
/// also call [`CriterionGrantedHook::end_session`] for the same participant,
/// otherwise its completions are kept until the hook is dropped. [`Bridge`]
/// does both in `on_participant_removed`.
///
/// [`Bridge`]: crate::Bridge
pub struct CriterionGrantedHook {
    bus: Arc<EventBus>,
    ledger: CompletionLedger,
}

impl CriterionGrantedHook {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            bus,
            ledger: CompletionLedger::new(),
        }
    }

    pub fn ledger(&self) -> &CompletionLedger {
        &self.ledger
    }

    /// Release everything recorded for `participant`.
    pub fn end_session(&self, participant: &ParticipantRef) {
        self.ledger.forget(participant);
    }

    /// Call after the host applied the grant of `criterion`.
    ///
    /// `progress` must already reflect the grant; `rules` resolves the world
    /// the participant is in right now.
    pub fn on_criterion_granted(
        &self,
        participant: &ParticipantRef,
        achievement: &Achievement,
        criterion: &str,
        progress: &dyn ProgressQuery,
        rules: &dyn WorldRuleLookup,
    ) -> GrantOutcome {
        let Some(state) = progress.completion(participant, &achievement.id) else {
            debug!(
                "No progress for {} on {} after granting '{}'; treating as not done",
                participant, achievement.id, criterion
            );
            return GrantOutcome::StaleQuery;
        };

        if !state.is_done() {
            if self.ledger.revoke(participant, &achievement.id) {
                debug!("{} no longer complete for {}", achievement.id, participant);
            }
            return GrantOutcome::NotDone;
        }

        if !self.ledger.record(participant, &achievement.id) {
            debug!(
                "Ignoring grant '{}' on already completed {} for {}",
                criterion, achievement.id, participant
            );
            return GrantOutcome::AlreadyCompleted;
        }

        let should_announce =
            should_announce(achievement.display.as_ref(), &rules.rules_for(participant));
        debug!(
            "{} completed {} (announce={})",
            participant, achievement.id, should_announce
        );

        let delivery = self.bus.publish(&AchievementCompleted {
            participant: participant.clone(),
            achievement: achievement.clone(),
            should_announce,
        });

        GrantOutcome::Published {
            should_announce,
            delivery,
        }
    }
}
