//! Relay Bridge
//!
//! Turns lifecycle transitions of a tick-driven world host (participant
//! join / leave / death, achievement completion) into typed events and
//! delivers them to any number of in-process subscribers.
//!
//! ## Architecture
//!
//! ```text
//! host glue (calls hook points after its own state change)
//!   └── Bridge  (bridge.rs)
//!         ├── JoinHook / LeaveHook / DeathHook   (hooks.rs)
//!         ├── CriterionGrantedHook + ledger      (hooks.rs) → policy.rs
//!         └── EventBus  (bus.rs) ← subscribers
//!               └── RelaySubscriber (relay.rs) ─ mpsc ─▶ RelayWorker ─▶ RelaySink
//! ```
//!
//! The host never sees subscriber failures: the bus logs them and moves on.

// Event model, bus and hooks are always available (no relay feature needed).
pub mod bridge;
pub mod bus;
pub mod error;
pub mod events;
pub mod hooks;
pub mod host;
pub mod policy;
pub mod types;

// Chat relay, configuration and replay require the `relay` feature.
#[cfg(feature = "relay")]
pub mod config;
#[cfg(feature = "relay")]
pub mod relay;
#[cfg(feature = "relay")]
pub mod replay;

// Convenience re-exports
pub use bridge::Bridge;
pub use bus::{Delivery, EventBus, HandlerResult, Subscriber};
pub use error::{BridgeError, SubscriberFailure};
pub use events::{
    AchievementCompleted, BridgeEvent, Event, EventKind, ParticipantDied, ParticipantJoined,
    ParticipantLeft,
};
pub use hooks::{CompletionLedger, GrantOutcome};
pub use host::{ProgressQuery, WorldRuleLookup};
pub use policy::should_announce;
pub use types::{
    Achievement, AchievementId, CompletionState, DeathCause, Display, Frame, ParticipantRef,
    WorldRules,
};

#[cfg(feature = "relay")]
pub use crate::config::RelayConfig;
#[cfg(feature = "relay")]
pub use relay::{MessageKind, RelayMessage, RelaySink, RelaySubscriber, RelayWorker};
