//! Login handshake and steady-state message processing.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use quasselwire_types::registry::user_types;
use quasselwire_types::{
    date, encode_variant, Adapter, BufferInfo, Decoder, SemanticValue, TypeRegistry, Value,
    Variant,
};

use crate::client::ClientCommand;
use crate::config::{self, Clock, Credentials, SessionConfig};
use crate::dispatch::Args;
use crate::error::{DispatchError, HandshakeError, Result, SessionError};
use crate::event::Event;
use crate::handlers::{rpc, Handlers};
use crate::heartbeat::Heartbeat;
use crate::request::RequestType;

/// Protocol version announced in `ClientInit`.
pub const PROTOCOL_VERSION: i32 = 10;

const SEND_INPUT: &str = "2sendInput(BufferInfo,QString)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// `ClientInit` sent, waiting for `ClientInitAck`.
    LoggingIn,
    /// `ClientLogin` sent, waiting for `ClientLoginAck`.
    AwaitingLoginAck,
    AwaitingSessionInit,
    Active,
    Closed,
}

impl SessionState {
    fn expected_message(self) -> &'static str {
        match self {
            SessionState::LoggingIn => "ClientInitAck",
            SessionState::AwaitingLoginAck => "ClientLoginAck",
            SessionState::AwaitingSessionInit => "SessionInit",
            SessionState::Active | SessionState::Closed => "message list",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionState::LoggingIn => "logging in",
            SessionState::AwaitingLoginAck => "awaiting login ack",
            SessionState::AwaitingSessionInit => "awaiting session init",
            SessionState::Active => "active",
            SessionState::Closed => "closed",
        })
    }
}

/// What one inbound frame produced: payloads to send, in order, and
/// notifications to deliver.
#[derive(Debug, Default)]
pub struct Output {
    pub frames: Vec<Bytes>,
    pub events: Vec<Event>,
}

/// One client connection's protocol state.
pub struct Session {
    config: SessionConfig,
    credentials: Credentials,
    registry: Arc<TypeRegistry>,
    adapter: Arc<Adapter>,
    clock: Arc<dyn Clock>,
    handlers: Handlers,
    state: SessionState,
    buffers: BTreeMap<i32, BufferInfo>,
    network_ids: Vec<i32>,
    heartbeat: Heartbeat,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("credentials", &self.credentials)
            .field("state", &self.state)
            .field("buffers", &self.buffers.len())
            .field("network_ids", &self.network_ids)
            .field("heartbeat", &self.heartbeat.is_running())
            .finish()
    }
}

impl Session {
    pub fn new(config: SessionConfig, credentials: Credentials) -> Self {
        Self {
            config,
            credentials,
            registry: Arc::new(TypeRegistry::quassel()),
            adapter: Arc::new(Adapter::quassel()),
            clock: config::system_clock(),
            handlers: Handlers::default(),
            state: SessionState::LoggingIn,
            buffers: BTreeMap::new(),
            network_ids: Vec::new(),
            heartbeat: Heartbeat::new(),
        }
    }

    /// Share a registry built once for the process.
    pub fn with_registry(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Replace the projector table. The adapter is rebound to the session
    /// clock.
    pub fn with_adapter(mut self, adapter: Arc<Adapter>) -> Self {
        self.adapter = Arc::new(Adapter::clone(&adapter).with_clock(Arc::clone(&self.clock)));
        self
    }

    /// Replace the wall clock, for outbound timestamps and for decoded
    /// `DateTime`s with a null date.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.adapter = Arc::new(Adapter::clone(&self.adapter).with_clock(Arc::clone(&clock)));
        self.clock = clock;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Buffers announced by the core at session init.
    pub fn buffers(&self) -> impl Iterator<Item = &BufferInfo> {
        self.buffers.values()
    }

    pub fn buffer(&self, id: i32) -> Option<&BufferInfo> {
        self.buffers.get(&id)
    }

    pub fn network_ids(&self) -> &[i32] {
        &self.network_ids
    }

    pub fn heartbeat_running(&self) -> bool {
        self.heartbeat.is_running()
    }

    /// The `ClientInit` handshake payload, sent as soon as the connection is up.
    pub fn start(&mut self) -> Result<Bytes> {
        if self.state != SessionState::LoggingIn {
            return Err(SessionError::Terminated);
        }
        let init = Variant::map([
            (
                "ClientDate",
                Variant::string(date::format_client_date(self.clock.now())),
            ),
            ("UseSsl", Variant::bool(false)),
            ("ClientVersion", Variant::string(self.config.client_version.clone())),
            ("UseCompression", Variant::bool(false)),
            ("MsgType", Variant::string("ClientInit")),
            ("ProtocolVersion", Variant::int(PROTOCOL_VERSION)),
        ]);
        tracing::info!(version = %self.config.client_version, "sending client init");
        self.encode(&init)
    }

    /// Process one inbound frame payload. Fatal errors close the session
    /// and stop the heartbeat before returning.
    pub fn handle_frame(&mut self, payload: &[u8]) -> Result<Output> {
        if self.state == SessionState::Closed {
            return Err(SessionError::Terminated);
        }
        tracing::debug!(state = %self.state, len = payload.len(), "frame received");
        let result = match self.state {
            SessionState::Active => self.handle_message(payload),
            _ => self.handle_handshake(payload),
        };
        if let Err(err) = &result {
            if err.is_fatal() {
                tracing::error!(error = %err, state = %self.state, "session failed");
                self.close();
            }
        }
        result
    }

    /// Close the session; the heartbeat stops and further frames are refused.
    pub fn close(&mut self) {
        self.heartbeat.stop();
        if self.state != SessionState::Closed {
            tracing::info!(state = %self.state, "session closed");
            self.state = SessionState::Closed;
        }
    }

    /// Resolves on the next heartbeat tick; never while inactive.
    pub async fn next_heartbeat(&mut self) {
        self.heartbeat.tick().await;
    }

    /// `Heartbeat` request carrying the current time of day.
    pub fn heartbeat_request(&self) -> Result<Bytes> {
        self.require_active()?;
        self.heartbeat_frame(RequestType::Heartbeat)
    }

    /// Send a line of input to a buffer. Empty input sends nothing; text
    /// without a leading `/` is sent as `/SAY`.
    pub fn send_input(&self, buffer: &BufferInfo, text: &str) -> Result<Option<Bytes>> {
        self.require_active()?;
        let Some(line) = input_line(text) else {
            return Ok(None);
        };
        tracing::debug!(buffer = buffer.id, "sending input");
        let call = request(
            RequestType::RpcCall,
            [
                Variant::string(SEND_INPUT),
                Variant::user(user_types::BUFFER_INFO, buffer.to_value()),
                Variant::string(line),
            ],
        );
        self.encode(&call).map(Some)
    }

    /// Ask for up to `limit` messages of a buffer between two message ids
    /// (`-1` for unbounded).
    pub fn request_backlog(&self, buffer_id: i32, first: i32, last: i32, limit: i32) -> Result<Bytes> {
        self.require_active()?;
        self.backlog_frame(buffer_id, first, last, limit)
    }

    pub fn hide_buffer(&self, buffer_id: i32) -> Result<Bytes> {
        self.require_active()?;
        self.encode(&sync_request(
            "BufferViewConfig",
            "0",
            "requestRemoveBuffer",
            [Variant::user(user_types::BUFFER_ID, Value::Int(buffer_id))],
        ))
    }

    pub fn unhide_buffer(&self, buffer_id: i32, index: i32) -> Result<Bytes> {
        self.require_active()?;
        self.encode(&sync_request(
            "BufferViewConfig",
            "0",
            "requestAddBuffer",
            [
                Variant::user(user_types::BUFFER_ID, Value::Int(buffer_id)),
                Variant::int(index),
            ],
        ))
    }

    /// Apply a collaborator command; `Disconnect` closes the session.
    pub fn apply(&mut self, command: ClientCommand) -> Result<Option<Bytes>> {
        match command {
            ClientCommand::SendInput { buffer, text } => self.send_input(&buffer, &text),
            ClientCommand::RequestBacklog {
                buffer_id,
                first,
                last,
                limit,
            } => self.request_backlog(buffer_id, first, last, limit).map(Some),
            ClientCommand::HideBuffer { buffer_id } => self.hide_buffer(buffer_id).map(Some),
            ClientCommand::UnhideBuffer { buffer_id, index } => {
                self.unhide_buffer(buffer_id, index).map(Some)
            }
            ClientCommand::Disconnect => {
                self.close();
                Ok(None)
            }
        }
    }

    fn require_active(&self) -> Result<()> {
        match self.state {
            SessionState::Active => Ok(()),
            SessionState::Closed => Err(SessionError::Terminated),
            state => Err(SessionError::NotActive { state }),
        }
    }

    fn encode(&self, variant: &Variant) -> Result<Bytes> {
        Ok(encode_variant(&self.registry, variant)?)
    }

    fn decode(&self, payload: &[u8]) -> Result<SemanticValue> {
        let mut decoder = Decoder::new(&self.registry, payload).with_max_depth(self.config.max_depth);
        let variant = decoder.read_variant()?;
        decoder.finish()?;
        Ok(self.adapter.project(&variant)?)
    }

    fn handle_handshake(&mut self, payload: &[u8]) -> Result<Output> {
        let state = self.state;
        let message = self.decode(payload).map_err(|err| HandshakeError::Malformed {
            state,
            reason: err.to_string(),
        })?;
        let map = message.as_map().ok_or_else(|| HandshakeError::Malformed {
            state,
            reason: format!("expected a map, got a {}", message.kind()),
        })?;
        let msg_type = map
            .get("MsgType")
            .and_then(SemanticValue::as_text)
            .unwrap_or_default();

        let mut output = Output::default();
        match (state, msg_type.as_str()) {
            (SessionState::LoggingIn, "ClientInitAck") => {
                tracing::info!("core accepted client init, logging in");
                let login = Variant::map([
                    ("MsgType", Variant::string("ClientLogin")),
                    ("User", Variant::string(self.credentials.user.clone())),
                    ("Password", Variant::string(self.credentials.password.clone())),
                ]);
                output.frames.push(self.encode(&login)?);
                self.state = SessionState::AwaitingLoginAck;
            }
            (SessionState::LoggingIn, "ClientInitReject") => {
                return Err(rejected("client init", map).into());
            }
            (SessionState::AwaitingLoginAck, "ClientLoginAck") => {
                tracing::info!(user = %self.credentials.user, "login accepted");
                self.state = SessionState::AwaitingSessionInit;
            }
            (SessionState::AwaitingLoginAck, "ClientLoginReject") => {
                return Err(rejected("login", map).into());
            }
            (SessionState::AwaitingSessionInit, "SessionInit") => {
                output = self.enter_active(map)?;
            }
            _ => {
                return Err(HandshakeError::UnexpectedMessage {
                    state,
                    expected: state.expected_message(),
                    found: msg_type,
                }
                .into());
            }
        }
        Ok(output)
    }

    fn enter_active(&mut self, init: &BTreeMap<String, SemanticValue>) -> Result<Output> {
        let state = self.state;
        let malformed = |reason: String| HandshakeError::Malformed { state, reason };
        let session_state = init
            .get("SessionState")
            .and_then(SemanticValue::as_map)
            .ok_or_else(|| malformed("SessionInit without SessionState".into()))?;

        let mut output = Output::default();
        let mut buffer_ids = Vec::new();
        for item in list_entry(session_state, "BufferInfos").map_err(&malformed)? {
            let SemanticValue::BufferInfo(info) = item else {
                return Err(malformed(format!("BufferInfos holds a {}", item.kind())).into());
            };
            buffer_ids.push(info.id);
            self.buffers.insert(info.id, info.clone());
            output.events.push(Event::InitializeBuffer(info.clone()));
        }
        for item in list_entry(session_state, "NetworkIds").map_err(&malformed)? {
            let id = item
                .as_i64()
                .ok_or_else(|| malformed(format!("NetworkIds holds a {}", item.kind())))?;
            self.network_ids.push(id as i32);
        }

        for id in &self.network_ids {
            output.frames.push(self.init_request("Network", &id.to_string())?);
        }
        for id in buffer_ids {
            output
                .frames
                .push(self.backlog_frame(id, -1, -1, self.config.backlog_limit)?);
        }
        output.frames.push(self.init_request("BufferSyncer", "")?);
        output.frames.push(self.init_request("BufferViewConfig", "0")?);

        self.state = SessionState::Active;
        if let Some(period) = self.config.heartbeat_interval {
            self.heartbeat.start(period);
        }
        tracing::info!(
            buffers = self.buffers.len(),
            networks = self.network_ids.len(),
            "session active"
        );
        Ok(output)
    }

    fn handle_message(&mut self, payload: &[u8]) -> Result<Output> {
        let message = self.decode(payload)?;
        let items = match &message {
            SemanticValue::List(items) => items.as_slice(),
            other => {
                return Err(DispatchError::BadArguments {
                    key: "message".into(),
                    reason: format!("expected a list, got a {}", other.kind()),
                }
                .into())
            }
        };
        let (head, rest) = items.split_first().ok_or_else(|| DispatchError::BadArguments {
            key: "message".into(),
            reason: "empty message".into(),
        })?;
        let kind = head
            .as_i64()
            .and_then(|id| RequestType::try_from(id).ok())
            .ok_or_else(|| DispatchError::BadArguments {
                key: "message".into(),
                reason: format!("invalid request type {head:?}"),
            })?;
        let args = Args {
            key: kind.name(),
            items: rest,
        };

        let mut output = Output::default();
        match kind {
            RequestType::Heartbeat => {
                output
                    .frames
                    .push(self.heartbeat_frame(RequestType::HeartbeatReply)?);
            }
            RequestType::HeartbeatReply => {
                tracing::debug!("heartbeat acknowledged");
            }
            RequestType::Sync => {
                let class = args.text(0)?;
                let function = args.text(2)?;
                let key = format!("{class}_{function}");
                let mut sync_args = Vec::with_capacity(rest.len() - 2);
                sync_args.push(args.get(1)?.clone());
                sync_args.extend_from_slice(&rest[3..]);
                tracing::debug!(key = %key, "sync");
                let result = self.handlers.sync.dispatch(&key, &sync_args);
                queue_event(result, &mut output)?;
            }
            RequestType::InitData => {
                let class = args.text(0)?;
                tracing::debug!(class = %class, "init data");
                queue_event(self.handlers.init.dispatch(&class, &rest[1..]), &mut output)?;
            }
            RequestType::RpcCall => {
                let function = rpc::mangle(&args.text(0)?);
                tracing::debug!(function = %function, "rpc call");
                queue_event(self.handlers.rpc.dispatch(&function, &rest[1..]), &mut output)?;
            }
            RequestType::Invalid | RequestType::InitRequest => {
                tracing::warn!(kind = kind.name(), "unhandled message");
            }
        }
        Ok(output)
    }

    fn heartbeat_frame(&self, kind: RequestType) -> Result<Bytes> {
        let (_, msecs) = date::julian_day_and_msecs(self.clock.now());
        self.encode(&request(kind, [Variant::time(msecs)]))
    }

    fn init_request(&self, class: &str, object: &str) -> Result<Bytes> {
        tracing::debug!(class, object, "init request");
        self.encode(&request(
            RequestType::InitRequest,
            [Variant::string(class), Variant::string(object)],
        ))
    }

    fn backlog_frame(&self, buffer_id: i32, first: i32, last: i32, limit: i32) -> Result<Bytes> {
        self.encode(&sync_request(
            "BacklogManager",
            "",
            "requestBacklog",
            [
                Variant::user(user_types::BUFFER_ID, Value::Int(buffer_id)),
                Variant::user(user_types::MSG_ID, Value::Int(first)),
                Variant::user(user_types::MSG_ID, Value::Int(last)),
                Variant::int(limit),
                Variant::int(0),
            ],
        ))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.heartbeat.stop();
    }
}

/// Input line as sent to the core: the command word of a `/command` is
/// uppercased, anything else becomes `/SAY <text>`.
pub fn input_line(text: &str) -> Option<String> {
    if text.is_empty() {
        return None;
    }
    if !text.starts_with('/') {
        return Some(format!("/SAY {text}"));
    }
    Some(match text.split_once(' ') {
        Some((command, rest)) => format!("{} {rest}", command.to_uppercase()),
        None => text.to_uppercase(),
    })
}

fn request<const N: usize>(kind: RequestType, args: [Variant; N]) -> Variant {
    Variant::list(std::iter::once(Variant::int(kind.id())).chain(args))
}

fn sync_request<const N: usize>(
    class: &str,
    object: &str,
    function: &str,
    args: [Variant; N],
) -> Variant {
    let head = [
        Variant::int(RequestType::Sync.id()),
        Variant::string(class),
        Variant::string(object),
        Variant::string(function),
    ];
    Variant::list(head.into_iter().chain(args))
}

/// Queue a handler's event. Commands without a handler (already logged by
/// the table fallback) are ignored; malformed arguments abort the frame.
fn queue_event(
    result: std::result::Result<Event, DispatchError>,
    output: &mut Output,
) -> Result<()> {
    match result {
        Ok(event) => output.events.push(event),
        Err(DispatchError::Unhandled { .. }) => {}
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

fn rejected(stage: &'static str, map: &BTreeMap<String, SemanticValue>) -> HandshakeError {
    let reason = map
        .get("Error")
        .and_then(SemanticValue::as_text)
        .unwrap_or_else(|| "no reason given".into());
    HandshakeError::Rejected { stage, reason }
}

fn list_entry<'a>(
    map: &'a BTreeMap<String, SemanticValue>,
    key: &str,
) -> std::result::Result<&'a [SemanticValue], String> {
    match map.get(key) {
        None => Ok(&[]),
        Some(SemanticValue::List(items)) => Ok(items),
        Some(other) => Err(format!("{key} is a {}, not a list", other.kind())),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use quasselwire_types::{QDateTime, TypeTag};

    use super::*;
    use crate::test_support::*;

    #[test]
    fn client_init_announces_protocol() {
        let mut session = new_session();
        let init = read(&session.start().unwrap());

        assert_eq!(text(&init, "MsgType"), "ClientInit");
        assert_eq!(text(&init, "ClientDate"), "Oct 16 2026 09:05:00");
        assert_eq!(entry(&init, "ProtocolVersion"), &Variant::int(10));
        assert_eq!(entry(&init, "UseSsl"), &Variant::bool(false));
        assert_eq!(entry(&init, "UseCompression"), &Variant::bool(false));
        assert_eq!(session.state(), SessionState::LoggingIn);
    }

    #[test]
    fn init_ack_sends_login() {
        let mut session = new_session();
        session.start().unwrap();
        let output = session.handle_frame(&handshake("ClientInitAck")).unwrap();

        assert_eq!(output.frames.len(), 1);
        let login = read(&output.frames[0]);
        assert_eq!(text(&login, "MsgType"), "ClientLogin");
        assert_eq!(text(&login, "User"), "alice");
        assert_eq!(text(&login, "Password"), "hunter22");
        assert_eq!(session.state(), SessionState::AwaitingLoginAck);
    }

    #[test]
    fn unexpected_handshake_message_is_fatal() {
        let mut session = new_session();
        session.start().unwrap();
        let err = session.handle_frame(&handshake("SessionInit")).unwrap_err();

        assert!(err.is_fatal());
        assert!(matches!(
            err,
            SessionError::Handshake(HandshakeError::UnexpectedMessage {
                state: SessionState::LoggingIn,
                expected: "ClientInitAck",
                ..
            })
        ));
        assert_eq!(session.state(), SessionState::Closed);
        assert!(matches!(
            session.handle_frame(&handshake("ClientInitAck")),
            Err(SessionError::Terminated)
        ));
    }

    #[test]
    fn undecodable_handshake_frame_is_fatal() {
        let mut session = new_session();
        session.start().unwrap();
        let err = session.handle_frame(&[0, 0, 0, 99, 0]).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Handshake(HandshakeError::Malformed { .. })
        ));
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn login_reject_carries_reason() {
        let mut session = new_session();
        session.start().unwrap();
        session.handle_frame(&handshake("ClientInitAck")).unwrap();
        let reject = frame(&Variant::map([
            ("MsgType", Variant::string("ClientLoginReject")),
            ("Error", Variant::string("bad password")),
        ]));
        let err = session.handle_frame(&reject).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Handshake(HandshakeError::Rejected { stage: "login", ref reason })
                if reason == "bad password"
        ));
    }

    #[test]
    fn session_init_requests_state_in_order() {
        let mut session = new_session();
        session.start().unwrap();
        session.handle_frame(&handshake("ClientInitAck")).unwrap();
        session.handle_frame(&handshake("ClientLoginAck")).unwrap();
        let output = session
            .handle_frame(&session_init(&[channel(3, "#rust"), channel(5, "#tokio")], &[1]))
            .unwrap();

        assert_eq!(
            output.events,
            [
                Event::InitializeBuffer(channel(3, "#rust")),
                Event::InitializeBuffer(channel(5, "#tokio")),
            ]
        );
        let frames: Vec<_> = output.frames.iter().map(read).collect();
        assert_eq!(frames.len(), 5);
        assert_eq!(
            frames[0],
            list([Variant::int(3), Variant::string("Network"), Variant::string("1")])
        );
        assert_eq!(
            frames[1],
            list([
                Variant::int(1),
                Variant::string("BacklogManager"),
                Variant::string(""),
                Variant::string("requestBacklog"),
                Variant::user("BufferId", Value::Int(3)),
                Variant::user("MsgId", Value::Int(-1)),
                Variant::user("MsgId", Value::Int(-1)),
                Variant::int(50),
                Variant::int(0),
            ])
        );
        assert_eq!(item(&frames[2], 4), &Variant::user("BufferId", Value::Int(5)));
        assert_eq!(
            frames[3],
            list([Variant::int(3), Variant::string("BufferSyncer"), Variant::string("")])
        );
        assert_eq!(
            frames[4],
            list([
                Variant::int(3),
                Variant::string("BufferViewConfig"),
                Variant::string("0")
            ])
        );
        assert!(session.is_active());
        assert!(session.heartbeat_running());
        assert_eq!(session.network_ids(), [1]);
        assert_eq!(session.buffer(5).map(BufferInfo::display_name).as_deref(), Some("#tokio"));
    }

    #[test]
    fn heartbeat_stays_off_without_interval() {
        let config = SessionConfig {
            heartbeat_interval: None,
            ..SessionConfig::default()
        };
        let session = active_session_with(config);
        assert!(session.is_active());
        assert!(!session.heartbeat_running());
    }

    #[test]
    fn zero_heartbeat_interval_disables_heartbeat() {
        let config = SessionConfig {
            heartbeat_interval: Some(Duration::ZERO),
            ..SessionConfig::default()
        };
        let session = active_session_with(config);
        assert!(session.is_active());
        assert!(!session.heartbeat_running());
    }

    #[test]
    fn heartbeat_gets_exactly_one_reply() {
        let mut session = active_session();
        let output = session
            .handle_frame(&frame(&list([Variant::int(5), Variant::time(1000)])))
            .unwrap();
        assert_eq!(output.frames.len(), 1);
        // 09:05:00 UTC from the fixed clock.
        assert_eq!(
            read(&output.frames[0]),
            list([Variant::int(6), Variant::time(32_700_000)])
        );

        let output = session
            .handle_frame(&frame(&list([Variant::int(6), Variant::time(1000)])))
            .unwrap();
        assert!(output.frames.is_empty());
        assert!(output.events.is_empty());
    }

    #[test]
    fn sync_is_dispatched_by_class_and_function() {
        let mut session = active_session();
        let sync = list([
            Variant::int(1),
            Variant::string("IrcChannel"),
            Variant::string("1/#rust"),
            Variant::string("setTopic"),
            Variant::string("be kind"),
        ]);
        let output = session.handle_frame(&frame(&sync)).unwrap();
        assert_eq!(
            output.events,
            [Event::TopicChanged {
                network_id: 1,
                buffer_name: "#rust".into(),
                topic: "be kind".into(),
            }]
        );
    }

    #[test]
    fn rpc_display_message_is_forwarded() {
        let mut session = active_session();
        let rpc = list([
            Variant::int(2),
            Variant::byte_array(*b"2displayMsg(Message)"),
            Variant::user("Message", message_value(42, "hello")),
        ]);
        let output = session.handle_frame(&frame(&rpc)).unwrap();
        let [Event::Message(message)] = output.events.as_slice() else {
            panic!("expected one message event, got {:?}", output.events);
        };
        assert_eq!(message.id, 42);
        assert_eq!(message.content, b"hello");
    }

    #[test]
    fn null_datetime_takes_today_from_session_clock() {
        let mut session = active_session().with_adapter(Arc::new(Adapter::quassel()));
        let connected_since = Variant::new(
            TypeTag::QDateTime,
            Value::DateTime(QDateTime {
                julian_day: 0,
                msecs: 60_000,
                utc: true,
            }),
        );
        let init_data = list([
            Variant::int(4),
            Variant::string("Network"),
            Variant::string("1"),
            Variant::map([("ConnectedSince", connected_since)]),
        ]);
        let output = session.handle_frame(&frame(&init_data)).unwrap();

        let [Event::InitializeNetwork(1, SemanticValue::Map(state))] = output.events.as_slice()
        else {
            panic!("expected one network init, got {:?}", output.events);
        };
        let today = date::julian_day_and_msecs(NOW).0;
        assert_eq!(
            state.get("ConnectedSince"),
            Some(&SemanticValue::DateTime(date::epoch_millis(today, 60_000)))
        );
    }

    #[test]
    fn unhandled_command_is_a_no_op() {
        let mut session = active_session();
        let sync = list([
            Variant::int(1),
            Variant::string("IrcChannel"),
            Variant::string("1/#rust"),
            Variant::string("addChannelMode"),
        ]);
        let output = session.handle_frame(&frame(&sync)).unwrap();
        assert!(output.events.is_empty());
        assert!(output.frames.is_empty());

        let init_data = list([
            Variant::int(4),
            Variant::string("Identity"),
            Variant::string("0"),
        ]);
        assert!(session.handle_frame(&frame(&init_data)).unwrap().events.is_empty());
        assert!(session.is_active());
    }

    #[test]
    fn malformed_arguments_abort_only_the_frame() {
        let mut session = active_session();
        let sync = list([
            Variant::int(1),
            Variant::string("Network"),
            Variant::string("1"),
            Variant::string("setLatency"),
        ]);
        let err = session.handle_frame(&frame(&sync)).unwrap_err();
        assert!(!err.is_fatal());
        assert!(matches!(
            err,
            SessionError::Dispatch(DispatchError::BadArguments { .. })
        ));
        assert!(session.is_active());
    }

    #[test]
    fn decode_error_aborts_only_the_frame() {
        let mut session = active_session();
        let err = session.handle_frame(&[0, 0, 0, 2, 0, 0]).unwrap_err();
        assert!(matches!(err, SessionError::Decode(_)));
        assert!(!err.is_fatal());

        let output = session
            .handle_frame(&frame(&list([Variant::int(5), Variant::time(0)])))
            .unwrap();
        assert_eq!(output.frames.len(), 1);
    }

    #[test]
    fn commands_require_active_session() {
        let mut session = new_session();
        session.start().unwrap();
        assert!(matches!(
            session.hide_buffer(1),
            Err(SessionError::NotActive {
                state: SessionState::LoggingIn
            })
        ));
        assert!(matches!(
            session.heartbeat_request(),
            Err(SessionError::NotActive { .. })
        ));
        session.close();
        assert!(matches!(session.hide_buffer(1), Err(SessionError::Terminated)));
    }

    #[test]
    fn send_input_wraps_plain_text_in_say() {
        let session = active_session();
        let rust = channel(3, "#rust");
        let frame = session.send_input(&rust, "hello there").unwrap().unwrap();
        let call = read(&frame);
        assert_eq!(item(&call, 0), &Variant::int(2));
        assert_eq!(item(&call, 1), &Variant::string(SEND_INPUT));
        assert_eq!(item(&call, 2), &Variant::user("BufferInfo", rust.to_value()));
        assert_eq!(item(&call, 3), &Variant::string("/SAY hello there"));

        assert!(session.send_input(&rust, "").unwrap().is_none());
    }

    #[test]
    fn send_input_reaches_buffers_opened_after_login() {
        let session = active_session();
        let joined = channel(9, "#new");
        assert!(session.buffer(9).is_none());

        let frame = session.send_input(&joined, "/topic hi").unwrap().unwrap();
        let call = read(&frame);
        assert_eq!(item(&call, 2), &Variant::user("BufferInfo", joined.to_value()));
        assert_eq!(item(&call, 3), &Variant::string("/TOPIC hi"));
    }

    #[test]
    fn input_line_uppercases_command_word() {
        assert_eq!(input_line("/join #rust").as_deref(), Some("/JOIN #rust"));
        assert_eq!(input_line("/me waves  twice").as_deref(), Some("/ME waves  twice"));
        assert_eq!(input_line("/quit").as_deref(), Some("/QUIT"));
        assert_eq!(input_line("hi").as_deref(), Some("/SAY hi"));
        assert_eq!(input_line(""), None);
    }

    #[test]
    fn buffer_visibility_requests() {
        let session = active_session();
        assert_eq!(
            read(&session.hide_buffer(7).unwrap()),
            list([
                Variant::int(1),
                Variant::string("BufferViewConfig"),
                Variant::string("0"),
                Variant::string("requestRemoveBuffer"),
                Variant::user("BufferId", Value::Int(7)),
            ])
        );
        let unhide = read(&session.unhide_buffer(7, 2).unwrap());
        assert_eq!(item(&unhide, 3), &Variant::string("requestAddBuffer"));
        assert_eq!(item(&unhide, 5), &Variant::int(2));
    }

    #[test]
    fn disconnect_command_closes_and_stops_heartbeat() {
        let mut session = active_session();
        assert!(session.heartbeat_running());
        assert!(session.apply(ClientCommand::Disconnect).unwrap().is_none());
        assert_eq!(session.state(), SessionState::Closed);
        assert!(!session.heartbeat_running());
    }

    #[test]
    fn custom_backlog_limit_is_used() {
        let config = SessionConfig {
            backlog_limit: 10,
            heartbeat_interval: Some(Duration::from_secs(30)),
            ..SessionConfig::default()
        };
        let mut session = new_session_with(config);
        session.start().unwrap();
        session.handle_frame(&handshake("ClientInitAck")).unwrap();
        session.handle_frame(&handshake("ClientLoginAck")).unwrap();
        let output = session
            .handle_frame(&session_init(&[channel(3, "#rust")], &[]))
            .unwrap();
        assert_eq!(item(&read(&output.frames[0]), 7), &Variant::int(10));
    }
}
