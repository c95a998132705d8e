//! Scripted host – drives a [`Bridge`] from a JSON-lines transcript.
//!
//! Stands in for the real host glue in the replay binary and the integration
//! tests. Like the real host it applies its own state change first (roster,
//! progress) and only then calls the matching hook.
//!
//! ## Record format (one JSON object per line, `#` lines ignored)
//!
//! | `op`     | Fields                                               |
//! |----------|------------------------------------------------------|
//! | `world`  | `world`, `announce_achievements`                     |
//! | `define` | `achievement` (`id`, optional `display`), `criteria` |
//! | `join`   | `participant` (`id`, `name`, `display_name?`, `vanished?`), `world?` |
//! | `leave`  | `participant_id`                                     |
//! | `death`  | `participant_id`, `cause`                            |
//! | `grant`  | `participant_id`, `achievement`, `criterion`         |
//!
//! Progress survives `leave` (it is the host's save data), so a rejoin
//! followed by a replayed grant on a finished achievement stays silent.

use crate::bridge::Bridge;
use crate::error::{BridgeError, Result};
use crate::hooks::GrantOutcome;
use crate::host::{ProgressQuery, WorldRuleLookup};
use crate::types::{
    Achievement, AchievementId, CompletionState, DeathCause, ParticipantRef, WorldRules,
};
use log::debug;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::BufRead;
use std::sync::Arc;

pub const DEFAULT_WORLD: &str = "overworld";

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum HostTransition {
    World {
        world: String,
        announce_achievements: bool,
    },
    Define {
        achievement: Achievement,
        criteria: Vec<String>,
    },
    Join {
        participant: ParticipantRef,
        #[serde(default)]
        world: Option<String>,
    },
    Leave {
        participant_id: String,
    },
    Death {
        participant_id: String,
        cause: String,
    },
    Grant {
        participant_id: String,
        achievement: AchievementId,
        criterion: String,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub transitions: usize,
    pub joins: usize,
    pub leaves: usize,
    pub deaths: usize,
    pub grants: usize,
    pub completions: usize,
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

/// Shared view of who is currently active, and in which world.
#[derive(Clone, Default)]
pub struct Roster {
    active: Arc<RwLock<HashMap<String, (ParticipantRef, String)>>>,
}

impl Roster {
    pub fn is_active(&self, participant_id: &str) -> bool {
        self.active.read().contains_key(participant_id)
    }

    pub fn len(&self) -> usize {
        self.active.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.read().is_empty()
    }

    fn get(&self, participant_id: &str) -> Option<(ParticipantRef, String)> {
        self.active.read().get(participant_id).cloned()
    }
}

// ---------------------------------------------------------------------------
// ScriptedHost
// ---------------------------------------------------------------------------

pub struct ScriptedHost {
    bridge: Arc<Bridge>,
    roster: Roster,
    definitions: HashMap<AchievementId, (Achievement, Vec<String>)>,
    progress: HashMap<(String, AchievementId), CompletionState>,
    worlds: HashMap<String, WorldRules>,
    default_rules: WorldRules,
    stats: ReplayStats,
}

impl ScriptedHost {
    pub fn new(bridge: Arc<Bridge>, default_rules: WorldRules) -> Self {
        Self {
            bridge,
            roster: Roster::default(),
            definitions: HashMap::new(),
            progress: HashMap::new(),
            worlds: HashMap::new(),
            default_rules,
            stats: ReplayStats::default(),
        }
    }

    pub fn roster(&self) -> Roster {
        self.roster.clone()
    }

    pub fn stats(&self) -> ReplayStats {
        self.stats
    }

    /// Replay every record from `reader`.
    pub fn run_script<R: BufRead>(&mut self, reader: R) -> Result<ReplayStats> {
        for (index, line) in reader.lines().enumerate() {
            let line_no = index + 1;
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let transition: HostTransition = serde_json::from_str(trimmed)
                .map_err(|source| BridgeError::Script {
                    line: line_no,
                    source,
                })?;
            self.apply(transition)
                .map_err(|reason| BridgeError::ScriptState {
                    line: line_no,
                    reason,
                })?;
        }
        Ok(self.stats)
    }

    /// Apply one host transition, then fire the matching hook.
    pub fn apply(&mut self, transition: HostTransition) -> std::result::Result<(), String> {
        self.stats.transitions += 1;
        match transition {
            HostTransition::World {
                world,
                announce_achievements,
            } => {
                self.worlds.insert(
                    world,
                    WorldRules {
                        announce_achievements,
                    },
                );
            }

            HostTransition::Define {
                achievement,
                criteria,
            } => {
                if criteria.is_empty() {
                    return Err(format!("achievement {} has no criteria", achievement.id));
                }
                self.definitions
                    .insert(achievement.id.clone(), (achievement, criteria));
            }

            HostTransition::Join { participant, world } => {
                let world = world.unwrap_or_else(|| DEFAULT_WORLD.to_string());
                self.roster
                    .active
                    .write()
                    .insert(participant.id.clone(), (participant.clone(), world));

                let finished: Vec<AchievementId> = self
                    .progress
                    .iter()
                    .filter(|((pid, _), state)| *pid == participant.id && state.is_done())
                    .map(|((_, id), _)| id.clone())
                    .collect();
                self.bridge.prime_completed(&participant, finished);

                self.bridge.on_participant_connected(&participant);
                self.stats.joins += 1;
            }

            HostTransition::Leave { participant_id } => {
                let (participant, _) = self
                    .roster
                    .active
                    .write()
                    .remove(&participant_id)
                    .ok_or_else(|| format!("participant {} is not active", participant_id))?;

                self.bridge.on_participant_removed(&participant);
                self.stats.leaves += 1;
            }

            HostTransition::Death {
                participant_id,
                cause,
            } => {
                let (participant, _) = self.active(&participant_id)?;
                self.bridge
                    .on_participant_death(&participant, &DeathCause::new(cause));
                self.stats.deaths += 1;
            }

            HostTransition::Grant {
                participant_id,
                achievement,
                criterion,
            } => {
                let (participant, _) = self.active(&participant_id)?;
                let (definition, criteria) = self
                    .definitions
                    .get(&achievement)
                    .cloned()
                    .ok_or_else(|| format!("achievement {} is not defined", achievement))?;

                let state = self
                    .progress
                    .entry((participant_id, achievement))
                    .or_insert_with(|| CompletionState::pending(criteria));
                if !state.grant(&criterion) {
                    debug!("Criterion '{}' is not part of {}", criterion, definition.id);
                }

                let outcome = self.bridge.on_criterion_granted(
                    &participant,
                    &definition,
                    &criterion,
                    &*self,
                    &*self,
                );
                if matches!(outcome, GrantOutcome::Published { .. }) {
                    self.stats.completions += 1;
                }
                self.stats.grants += 1;
            }
        }
        Ok(())
    }

    fn active(
        &self,
        participant_id: &str,
    ) -> std::result::Result<(ParticipantRef, String), String> {
        self.roster
            .get(participant_id)
            .ok_or_else(|| format!("participant {} is not active", participant_id))
    }
}

impl ProgressQuery for ScriptedHost {
    fn completion(
        &self,
        participant: &ParticipantRef,
        achievement: &AchievementId,
    ) -> Option<CompletionState> {
        self.progress
            .get(&(participant.id.clone(), achievement.clone()))
            .cloned()
    }
}

impl WorldRuleLookup for ScriptedHost {
    fn rules_for(&self, participant: &ParticipantRef) -> WorldRules {
        self.roster
            .get(&participant.id)
            .and_then(|(_, world)| self.worlds.get(&world).copied())
            .unwrap_or(self.default_rules)
    }
}
