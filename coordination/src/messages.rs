//! Swarm communication log.
//!
//! Each swarm owns exactly one append-only message log for its
//! lifetime. Appends are serialized behind a mutex so concurrent
//! member executions can record safely; a broadcast side-channel lets
//! live observers follow along, but the log itself is the source of
//! truth (the channel is lossy like any broadcast channel).
//!
//! Only the `broadcast` protocol actually appends. `direct` and
//! `gossip` are accepted configuration values with no distinct
//! behavior — an acknowledged incompleteness carried over from the
//! source design, not something this layer silently fixes.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

/// Channel capacity for live subscribers.
const CHANNEL_CAPACITY: usize = 256;

/// Kind of swarm message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// A question from one agent to another.
    Query,
    /// A completed contribution.
    Result,
    /// A request for work or data.
    Request,
    /// A broadcast status update.
    Notification,
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Query => write!(f, "query"),
            Self::Result => write!(f, "result"),
            Self::Request => write!(f, "request"),
            Self::Notification => write!(f, "notification"),
        }
    }
}

/// How messages propagate through the swarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    /// Every message lands on the shared log.
    #[default]
    Broadcast,
    /// Point-to-point delivery. Inert stub: accepted, records nothing.
    Direct,
    /// Epidemic relay. Inert stub: accepted, records nothing.
    Gossip,
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Broadcast => write!(f, "broadcast"),
            Self::Direct => write!(f, "direct"),
            Self::Gossip => write!(f, "gossip"),
        }
    }
}

/// One entry on the communication log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmMessage {
    /// Sender agent id.
    pub from: String,
    /// Recipient agent id, or "*" for the whole swarm.
    pub to: String,
    /// Message kind.
    pub kind: MessageKind,
    /// Payload.
    pub content: Value,
    /// When the message was recorded.
    pub timestamp: DateTime<Utc>,
}

impl SwarmMessage {
    /// Create a message addressed to a specific agent.
    pub fn new(from: impl Into<String>, to: impl Into<String>, kind: MessageKind, content: Value) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            kind,
            content,
            timestamp: Utc::now(),
        }
    }

    /// Create a message addressed to the whole swarm.
    pub fn to_all(from: impl Into<String>, kind: MessageKind, content: Value) -> Self {
        Self::new(from, "*", kind, content)
    }
}

/// Append-only communication log, one per swarm instance.
pub struct MessageLog {
    messages: Mutex<Vec<SwarmMessage>>,
    sender: broadcast::Sender<SwarmMessage>,
}

impl MessageLog {
    /// Create an empty log.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            messages: Mutex::new(Vec::new()),
            sender,
        }
    }

    /// Record a message under the given protocol.
    ///
    /// Returns whether the message was appended. Only `broadcast`
    /// appends; the other protocols accept the message and drop it.
    pub fn record(&self, protocol: Protocol, message: SwarmMessage) -> bool {
        match protocol {
            Protocol::Broadcast => {
                debug!(from = %message.from, to = %message.to, kind = %message.kind, "message recorded");
                self.messages
                    .lock()
                    .expect("message log poisoned")
                    .push(message.clone());
                // No receivers is fine — the log already has it.
                let _ = self.sender.send(message);
                true
            }
            Protocol::Direct | Protocol::Gossip => {
                debug!(protocol = %protocol, "protocol is a no-op stub; message dropped");
                false
            }
        }
    }

    /// Snapshot of all recorded messages in append order.
    pub fn messages(&self) -> Vec<SwarmMessage> {
        self.messages.lock().expect("message log poisoned").clone()
    }

    /// Number of recorded messages.
    pub fn len(&self) -> usize {
        self.messages.lock().expect("message log poisoned").len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Subscribe to live messages as they are recorded.
    pub fn subscribe(&self) -> broadcast::Receiver<SwarmMessage> {
        self.sender.subscribe()
    }
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new()
    }
}
