//! Chat relay – turns bridge events into chat-ready messages.
//!
//! ## Threading
//!
//! ```text
//! host loop (sync)                         tokio task
//! ─────────────────────────────────        ─────────────────────────────
//! EventBus::publish(&E)
//!   └── RelaySubscriber::handle
//!         format → try_send ──── mpsc ───▶ RelayWorker::drain
//!         (never blocks)                     └── RelaySink::deliver
//! ```
//!
//! A full or closed queue is reported back to the bus as a handler error and
//! the message is dropped; the host loop is never stalled by the relay.
//!
//! ## Message contract
//!
//! | Event                  | Title                                 | Colour     |
//! |------------------------|---------------------------------------|------------|
//! | `ParticipantJoined`    | `<name> joined`                       | `0xFFFFFF` |
//! | `ParticipantLeft`      | `<name> left`                         | `0xFFFFFF` |
//! | `ParticipantDied`      | death message from the host           | `0xFFFFAA` |
//! | `AchievementCompleted` | `<name> <frame text> <title>`         | by frame   |
//! | server started         | `The server has started`              | `0x00FF00` |
//! | server stopped         | `The server has stopped`              | `0xFF0000` |
//!
//! Completions are relayed only when `should_announce` is set. Vanished
//! participants are never relayed. Server status messages are not bus events;
//! the embedding process sends them with [`RelaySubscriber::server_started`]
//! and [`RelaySubscriber::server_stopped`].

use crate::bus::{EventBus, HandlerResult, Subscriber};
use crate::config::RelayConfig;
use crate::error::{BridgeError, Result};
use crate::events::{
    AchievementCompleted, EventKind, ParticipantDied, ParticipantJoined, ParticipantLeft,
};
use crate::types::{Frame, ParticipantRef};
use log::{info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

pub const COLOR_PRESENCE: u32 = 0xFFFFFF;
pub const COLOR_DEATH: u32 = 0xFFFFAA;
pub const COLOR_ACHIEVEMENT: u32 = 0x54FB54;
pub const COLOR_CHALLENGE: u32 = 0xA700A7;
pub const COLOR_SERVER_STARTED: u32 = 0x00FF00;
pub const COLOR_SERVER_STOPPED: u32 = 0xFF0000;

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    ServerStarted,
    ServerStopped,
    ParticipantJoined,
    ParticipantLeft,
    ParticipantDied,
    AchievementCompleted,
}

impl MessageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::ServerStarted => "server_started",
            MessageKind::ServerStopped => "server_stopped",
            MessageKind::ParticipantJoined => "participant_joined",
            MessageKind::ParticipantLeft => "participant_left",
            MessageKind::ParticipantDied => "participant_died",
            MessageKind::AchievementCompleted => "achievement_completed",
        }
    }
}

impl From<EventKind> for MessageKind {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::ParticipantJoined => MessageKind::ParticipantJoined,
            EventKind::ParticipantLeft => MessageKind::ParticipantLeft,
            EventKind::ParticipantDied => MessageKind::ParticipantDied,
            EventKind::AchievementCompleted => MessageKind::AchievementCompleted,
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outbound chat message (embed-shaped: title line, icon, body, colour).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayMessage {
    pub kind: MessageKind,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub color: u32,
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

pub fn frame_text(frame: Frame) -> &'static str {
    match frame {
        Frame::Task => "has made the advancement",
        Frame::Goal => "reached the goal",
        Frame::Challenge => "completed the challenge",
    }
}

pub fn frame_color(frame: Frame) -> u32 {
    match frame {
        Frame::Challenge => COLOR_CHALLENGE,
        Frame::Task | Frame::Goal => COLOR_ACHIEVEMENT,
    }
}

fn presence(
    config: &RelayConfig,
    kind: EventKind,
    who: &ParticipantRef,
    verb: &str,
) -> RelayMessage {
    RelayMessage {
        kind: kind.into(),
        title: format!("{} {}", who.label(), verb),
        icon_url: Some(config.avatar_url_for(&who.id)),
        description: None,
        color: COLOR_PRESENCE,
    }
}

pub fn format_joined(config: &RelayConfig, event: &ParticipantJoined) -> RelayMessage {
    presence(config, EventKind::ParticipantJoined, &event.participant, "joined")
}

pub fn format_left(config: &RelayConfig, event: &ParticipantLeft) -> RelayMessage {
    presence(config, EventKind::ParticipantLeft, &event.participant, "left")
}

pub fn format_died(config: &RelayConfig, event: &ParticipantDied) -> RelayMessage {
    RelayMessage {
        kind: MessageKind::ParticipantDied,
        title: event.cause.message().to_string(),
        icon_url: Some(config.avatar_url_for(&event.participant.id)),
        description: None,
        color: COLOR_DEATH,
    }
}

/// `None` when the completion is not meant to be announced.
pub fn format_completed(
    config: &RelayConfig,
    event: &AchievementCompleted,
) -> Option<RelayMessage> {
    if !event.should_announce {
        return None;
    }

    let display = event.achievement.display.as_ref();
    let text = display.map_or("gained the achievement", |d| frame_text(d.frame));
    let title = display.map_or("Unknown", |d| d.title.as_str());
    let description = display
        .map(|d| d.description.as_str())
        .filter(|d| !d.trim().is_empty())
        .map(str::to_string);

    Some(RelayMessage {
        kind: MessageKind::AchievementCompleted,
        title: format!("{} {} {}", event.participant.label(), text, title),
        icon_url: Some(config.avatar_url_for(&event.participant.id)),
        description,
        color: display.map_or(COLOR_ACHIEVEMENT, |d| frame_color(d.frame)),
    })
}

fn server_status(kind: MessageKind, title: &str, color: u32) -> RelayMessage {
    RelayMessage {
        kind,
        title: title.to_string(),
        icon_url: None,
        description: None,
        color,
    }
}

pub fn format_server_started() -> RelayMessage {
    server_status(
        MessageKind::ServerStarted,
        "The server has started",
        COLOR_SERVER_STARTED,
    )
}

pub fn format_server_stopped() -> RelayMessage {
    server_status(
        MessageKind::ServerStopped,
        "The server has stopped",
        COLOR_SERVER_STOPPED,
    )
}

// ---------------------------------------------------------------------------
// Subscriber
// ---------------------------------------------------------------------------

/// Bus subscriber that formats events and queues them for the worker.
pub struct RelaySubscriber {
    config: RelayConfig,
    tx: mpsc::Sender<RelayMessage>,
}

/// Build a subscriber and the receiving half of its queue.
pub fn channel(config: RelayConfig) -> (RelaySubscriber, mpsc::Receiver<RelayMessage>) {
    let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
    (RelaySubscriber { config, tx }, rx)
}

impl RelaySubscriber {
    /// Register for all four event types on `bus`.
    pub fn attach(self: &Arc<Self>, bus: &EventBus) {
        bus.subscribe::<ParticipantJoined, _>(self.clone());
        bus.subscribe::<ParticipantLeft, _>(self.clone());
        bus.subscribe::<ParticipantDied, _>(self.clone());
        bus.subscribe::<AchievementCompleted, _>(self.clone());
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Queue a message outside of bus dispatch.
    pub fn send(&self, message: RelayMessage) -> Result<()> {
        self.tx.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => BridgeError::RelayFull {
                capacity: self.tx.max_capacity(),
            },
            TrySendError::Closed(_) => BridgeError::RelayClosed,
        })
    }

    pub fn server_started(&self) -> Result<()> {
        if !self.config.relay_server_status {
            return Ok(());
        }
        self.send(format_server_started())
    }

    pub fn server_stopped(&self) -> Result<()> {
        if !self.config.relay_server_status {
            return Ok(());
        }
        self.send(format_server_stopped())
    }

    fn relays(&self, enabled: bool, who: &ParticipantRef) -> bool {
        enabled && !who.vanished
    }

    fn enqueue(&self, message: RelayMessage) -> HandlerResult {
        self.send(message)?;
        Ok(())
    }
}

impl Subscriber<ParticipantJoined> for RelaySubscriber {
    fn handle(&self, event: &ParticipantJoined) -> HandlerResult {
        if !self.relays(self.config.relay_joins, &event.participant) {
            return Ok(());
        }
        self.enqueue(format_joined(&self.config, event))
    }
}

impl Subscriber<ParticipantLeft> for RelaySubscriber {
    fn handle(&self, event: &ParticipantLeft) -> HandlerResult {
        if !self.relays(self.config.relay_leaves, &event.participant) {
            return Ok(());
        }
        self.enqueue(format_left(&self.config, event))
    }
}

impl Subscriber<ParticipantDied> for RelaySubscriber {
    fn handle(&self, event: &ParticipantDied) -> HandlerResult {
        if !self.relays(self.config.relay_deaths, &event.participant) {
            return Ok(());
        }
        self.enqueue(format_died(&self.config, event))
    }
}

impl Subscriber<AchievementCompleted> for RelaySubscriber {
    fn handle(&self, event: &AchievementCompleted) -> HandlerResult {
        if !self.relays(self.config.relay_achievements, &event.participant) {
            return Ok(());
        }
        match format_completed(&self.config, event) {
            Some(message) => self.enqueue(message),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Final destination of relayed messages (webhook client, chat bot, …).
pub trait RelaySink: Send + Sync {
    fn deliver(&self, message: &RelayMessage) -> anyhow::Result<()>;
}

/// Writes every message to the log.
pub struct LogSink;

impl RelaySink for LogSink {
    fn deliver(&self, message: &RelayMessage) -> anyhow::Result<()> {
        match &message.description {
            Some(description) => info!("[relay] {} – {}", message.title, description),
            None => info!("[relay] {}", message.title),
        }
        Ok(())
    }
}

/// Keeps messages in memory (replay output, tests).
#[derive(Default)]
pub struct MemorySink {
    messages: Mutex<Vec<RelayMessage>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<RelayMessage> {
        self.messages.lock().clone()
    }
}

impl RelaySink for MemorySink {
    fn deliver(&self, message: &RelayMessage) -> anyhow::Result<()> {
        self.messages.lock().push(message.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub delivered: usize,
    pub failed: usize,
}

pub struct RelayWorker;

impl RelayWorker {
    /// Deliver queued messages until every sender is gone.
    ///
    /// Sink errors are logged and swallowed; one failed delivery does not
    /// stop the relay.
    pub async fn drain<S>(mut rx: mpsc::Receiver<RelayMessage>, sink: Arc<S>) -> WorkerStats
    where
        S: RelaySink + ?Sized,
    {
        let mut stats = WorkerStats::default();
        while let Some(message) = rx.recv().await {
            let span = tracing::info_span!("relay", kind = %message.kind);
            match span.in_scope(|| sink.deliver(&message)) {
                Ok(()) => stats.delivered += 1,
                Err(e) => {
                    stats.failed += 1;
                    warn!("Failed to relay '{}': {:#}", message.title, e);
                }
            }
        }
        stats
    }

    /// Run [`RelayWorker::drain`] on the current Tokio runtime.
    pub fn spawn<S>(rx: mpsc::Receiver<RelayMessage>, sink: Arc<S>) -> JoinHandle<WorkerStats>
    where
        S: RelaySink + ?Sized + 'static,
    {
        tokio::spawn(Self::drain(rx, sink))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Achievement, DeathCause, Display};

    fn alice() -> ParticipantRef {
        ParticipantRef::new("u-alice", "alice").with_display_name("Alice")
    }

    fn completed(display: Option<Display>, should_announce: bool) -> AchievementCompleted {
        AchievementCompleted {
            participant: alice(),
            achievement: Achievement::new("adventure/kill_all_mobs", display),
            should_announce,
        }
    }

    #[test]
    fn presence_messages_use_label_and_avatar() {
        let config = RelayConfig::default();
        let msg = format_joined(&config, &ParticipantJoined { participant: alice() });
        assert_eq!(msg.title, "Alice joined");
        assert_eq!(
            msg.icon_url.as_deref(),
            Some("https://mc-heads.net/avatar/u-alice/128")
        );
        assert_eq!(msg.color, COLOR_PRESENCE);

        let msg = format_left(&config, &ParticipantLeft { participant: alice() });
        assert_eq!(msg.title, "Alice left");
    }

    #[test]
    fn death_uses_host_message() {
        let msg = format_died(
            &RelayConfig::default(),
            &ParticipantDied {
                participant: alice(),
                cause: DeathCause::new("Alice drowned"),
            },
        );
        assert_eq!(msg.title, "Alice drowned");
        assert_eq!(msg.color, COLOR_DEATH);
    }

    #[test]
    fn challenge_completion_is_purple_with_description() {
        let display = Display::new("Monsters Hunted", true)
            .with_frame(Frame::Challenge)
            .with_description("Kill one of every hostile monster");
        let msg =
            format_completed(&RelayConfig::default(), &completed(Some(display), true)).unwrap();

        assert_eq!(msg.title, "Alice completed the challenge Monsters Hunted");
        assert_eq!(msg.description.as_deref(), Some("Kill one of every hostile monster"));
        assert_eq!(msg.color, COLOR_CHALLENGE);
    }

    #[test]
    fn blank_description_is_omitted() {
        let display = Display::new("Stone Age", true).with_description("   ");
        let msg =
            format_completed(&RelayConfig::default(), &completed(Some(display), true)).unwrap();
        assert_eq!(msg.description, None);
        assert_eq!(msg.title, "Alice has made the advancement Stone Age");
    }

    #[test]
    fn unannounced_completion_is_not_formatted() {
        let display = Display::new("Stone Age", true);
        let event = completed(Some(display), false);
        assert!(format_completed(&RelayConfig::default(), &event).is_none());
    }

    #[test]
    fn description_is_sent_as_written() {
        let display = Display::new("Stone Age", true).with_description("  Mine Stone\n");
        let msg = format_completed(&RelayConfig::default(), &completed(Some(display), true));
        assert_eq!(msg.unwrap().description.as_deref(), Some("  Mine Stone\n"));
    }

    #[test]
    fn server_status_messages() {
        let started = format_server_started();
        assert_eq!(started.kind, MessageKind::ServerStarted);
        assert_eq!(started.title, "The server has started");
        assert_eq!(started.color, 0x00FF00);
        assert_eq!(started.icon_url, None);

        let stopped = format_server_stopped();
        assert_eq!(stopped.kind, MessageKind::ServerStopped);
        assert_eq!(stopped.title, "The server has stopped");
        assert_eq!(stopped.color, 0xFF0000);
    }

    #[test]
    fn server_status_respects_toggle() {
        let (subscriber, mut rx) = channel(RelayConfig::default());
        subscriber.server_started().unwrap();
        subscriber.server_stopped().unwrap();
        assert_eq!(rx.try_recv().unwrap().kind, MessageKind::ServerStarted);
        assert_eq!(rx.try_recv().unwrap().kind, MessageKind::ServerStopped);

        let config = RelayConfig {
            relay_server_status: false,
            ..Default::default()
        };
        let (subscriber, mut rx) = channel(config);
        subscriber.server_started().unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn vanished_participant_is_never_relayed() {
        let (subscriber, mut rx) = channel(RelayConfig::default());
        let ghost = alice().with_vanished(true);

        subscriber
            .handle(&ParticipantJoined {
                participant: ghost.clone(),
            })
            .unwrap();
        subscriber
            .handle(&ParticipantDied {
                participant: ghost.clone(),
                cause: DeathCause::new("Alice drowned"),
            })
            .unwrap();
        subscriber
            .handle(&AchievementCompleted {
                participant: ghost.clone(),
                achievement: Achievement::new("story/root", Some(Display::new("Minecraft", true))),
                should_announce: true,
            })
            .unwrap();
        subscriber
            .handle(&ParticipantLeft { participant: ghost })
            .unwrap();

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn full_queue_is_a_handler_error() {
        let config = RelayConfig {
            queue_capacity: 1,
            ..Default::default()
        };
        let (subscriber, _rx) = channel(config);
        let event = ParticipantJoined { participant: alice() };

        assert!(subscriber.handle(&event).is_ok());
        let err = subscriber.handle(&event).unwrap_err();
        assert!(err.to_string().contains("relay queue full"));
    }

    #[test]
    fn closed_queue_is_a_handler_error() {
        let (subscriber, rx) = channel(RelayConfig::default());
        drop(rx);
        let err = subscriber
            .handle(&ParticipantJoined { participant: alice() })
            .unwrap_err();
        assert!(err.to_string().contains("closed"));
    }

    #[test]
    fn disabled_kind_is_skipped() {
        let config = RelayConfig {
            relay_joins: false,
            ..Default::default()
        };
        let (subscriber, mut rx) = channel(config);
        subscriber
            .handle(&ParticipantJoined { participant: alice() })
            .unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn drain_delivers_until_senders_drop() {
        let (subscriber, rx) = channel(RelayConfig::default());
        subscriber
            .handle(&ParticipantJoined { participant: alice() })
            .unwrap();
        subscriber
            .handle(&ParticipantLeft { participant: alice() })
            .unwrap();
        drop(subscriber);

        let sink = Arc::new(MemorySink::new());
        let stats = tokio_test::block_on(RelayWorker::drain(rx, sink.clone()));

        assert_eq!(stats, WorkerStats { delivered: 2, failed: 0 });
        let titles: Vec<_> = sink.messages().into_iter().map(|m| m.title).collect();
        assert_eq!(titles, vec!["Alice joined", "Alice left"]);
    }
}
