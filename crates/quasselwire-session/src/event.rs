//! Notifications emitted to whoever drives the session.

use serde::Serialize;
use tokio::sync::mpsc;

use quasselwire_types::{BufferInfo, MessageInfo, SemanticValue};

use crate::identifier::ObjectId;

/// A `(bufferId, msgId)` pair from the buffer syncer; the message id is
/// `None` when the core sent an odd number of elements.
pub type BufferMarker = (i64, Option<i64>);

/// One notification, serialized as `{"type": <name>, "data": <payload>}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum Event {
    Message(Box<MessageInfo>),
    /// Oldest message first.
    Backlog(Vec<MessageInfo>),
    UserModeAdded {
        network_id: i32,
        buffer_name: String,
        nickname: String,
        mode: String,
    },
    UserModeRemoved {
        network_id: i32,
        buffer_name: String,
        nickname: String,
        mode: String,
    },
    TopicChanged {
        network_id: i32,
        buffer_name: String,
        topic: String,
    },
    LatencyUpdated {
        network_id: i32,
        latency: i64,
    },
    ObjectRenamed {
        #[serde(rename = "type")]
        object_type: String,
        old: ObjectId,
        new: ObjectId,
    },
    UserSetMetadata {
        network_id: i32,
        nickname: String,
        key: String,
        value: SemanticValue,
    },
    UserConnected {
        network_id: i32,
        host: String,
    },
    UserQuit {
        network_id: i32,
        nickname: String,
    },
    UserParted {
        network_id: i32,
        nickname: String,
        buffer_name: String,
    },
    UsersJoined {
        network_id: i32,
        buffer_name: String,
        /// `(nickname, mode)` pairs.
        user_modes: Vec<(String, String)>,
    },
    ChannelJoined {
        network_id: i32,
        buffer_name: String,
    },
    BufferAdded {
        buffer_view_id: i32,
        buffer_id: i64,
        index: i64,
    },
    BufferRemoved {
        buffer_view_id: i32,
        buffer_id: i64,
        permanent: bool,
    },
    MarkerUpdated {
        buffer_id: i64,
        message_id: i64,
    },
    InitializeNetwork(i32, SemanticValue),
    InitializeBufferView(i32, SemanticValue),
    InitializeBufferSyncer {
        marker_lines: Vec<BufferMarker>,
        last_seen_messages: Vec<BufferMarker>,
    },
    InitializeBuffer(BufferInfo),
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Message(_) => "message",
            Event::Backlog(_) => "backlog",
            Event::UserModeAdded { .. } => "userModeAdded",
            Event::UserModeRemoved { .. } => "userModeRemoved",
            Event::TopicChanged { .. } => "topicChanged",
            Event::LatencyUpdated { .. } => "latencyUpdated",
            Event::ObjectRenamed { .. } => "objectRenamed",
            Event::UserSetMetadata { .. } => "userSetMetadata",
            Event::UserConnected { .. } => "userConnected",
            Event::UserQuit { .. } => "userQuit",
            Event::UserParted { .. } => "userParted",
            Event::UsersJoined { .. } => "usersJoined",
            Event::ChannelJoined { .. } => "channelJoined",
            Event::BufferAdded { .. } => "bufferAdded",
            Event::BufferRemoved { .. } => "bufferRemoved",
            Event::MarkerUpdated { .. } => "markerUpdated",
            Event::InitializeNetwork(..) => "initializeNetwork",
            Event::InitializeBufferView(..) => "initializeBufferView",
            Event::InitializeBufferSyncer { .. } => "initializeBufferSyncer",
            Event::InitializeBuffer(_) => "initializeBuffer",
        }
    }
}

/// Receiver of session notifications.
pub trait NotificationSink {
    fn notify(&mut self, event: Event);
}

impl NotificationSink for Vec<Event> {
    fn notify(&mut self, event: Event) {
        self.push(event);
    }
}

impl NotificationSink for mpsc::UnboundedSender<Event> {
    fn notify(&mut self, event: Event) {
        if self.send(event).is_err() {
            tracing::debug!("notification receiver dropped");
        }
    }
}

/// Bounded channel sink. Lossy: an event that finds the channel full, or the
/// receiver gone, is dropped with a warning. Use an unbounded sender when
/// every event must arrive.
impl NotificationSink for mpsc::Sender<Event> {
    fn notify(&mut self, event: Event) {
        if let Err(err) = self.try_send(event) {
            tracing::warn!(error = %err, "notification dropped");
        }
    }
}
