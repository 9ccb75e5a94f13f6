//! Protocol module - JSON message types for the front-end adapter
//!
//! Line-delimited JSON. Every message has: type, seq (sequence number), ts
//! (timestamp in ms).

use serde::{Deserialize, Serialize};

use crate::core::{BlockSnapshot, SessionSnapshot};
use crate::types::{ErrorKind, GameEvent};

/// Protocol version spoken by this server. Clients must send a `1.x` version.
pub const PROTOCOL_VERSION: &str = "1.0.0";

pub const GAME_ID: &str = "tower-builder";

// ============== Client -> Game Messages ==============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum HelloType {
    #[serde(rename = "hello")]
    #[default]
    Hello,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CommandType {
    #[serde(rename = "command")]
    #[default]
    Command,
}

/// Client hello message (first message on a connection)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloMessage {
    #[serde(rename = "type")]
    #[serde(default)]
    pub msg_type: HelloType,
    pub seq: u64,
    pub ts: u64,
    pub client: ClientInfo,
    pub protocol_version: String,
    #[serde(default)]
    pub requested: RequestedCapabilities,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestedCapabilities {
    #[serde(default = "default_true")]
    pub stream_events: bool,
    /// `observer` never takes control; `auto` and `controller` take it when free.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<RequestedRole>,
}

impl Default for RequestedCapabilities {
    fn default() -> Self {
        Self {
            stream_events: true,
            role: None,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestedRole {
    Auto,
    Controller,
    Observer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignedRole {
    Controller,
    Observer,
}

/// Command message: one session operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandMessage {
    #[serde(rename = "type")]
    #[serde(default)]
    pub msg_type: CommandType,
    pub seq: u64,
    pub ts: u64,
    /// `start`, `drop`, `reset` or `difficulty`.
    pub action: String,
    /// `easy`, `normal` or `hard`; required by `difficulty`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
}

// ============== Game -> Client Messages ==============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WelcomeType {
    #[serde(rename = "welcome")]
    Welcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AckType {
    #[serde(rename = "ack")]
    Ack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AckStatus {
    #[serde(rename = "ok")]
    Ok,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorType {
    #[serde(rename = "error")]
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "event")]
    Event,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObservationType {
    #[serde(rename = "observation")]
    Observation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    HandshakeRequired,
    ProtocolMismatch,
    NotController,
    InvalidCommand,
    NoActiveBlock,
    AdapterFailure,
    Backpressure,
}

impl From<ErrorKind> for ErrorCode {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::NoActiveBlock => ErrorCode::NoActiveBlock,
            ErrorKind::AdapterFailure | ErrorKind::MissingBaseReference => {
                ErrorCode::AdapterFailure
            }
        }
    }
}

/// Welcome message (response to hello)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WelcomeMessage {
    #[serde(rename = "type")]
    pub msg_type: WelcomeType,
    pub seq: u64,
    pub ts: u64,
    pub protocol_version: String,
    pub client_id: u64,
    pub role: AssignedRole,
    pub game_id: String,
}

/// Acknowledgment of an applied command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckMessage {
    #[serde(rename = "type")]
    pub msg_type: AckType,
    pub seq: u64,
    pub ts: u64,
    pub status: AckStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMessage {
    #[serde(rename = "type")]
    pub msg_type: ErrorType,
    pub seq: u64,
    pub ts: u64,
    pub code: ErrorCode,
    pub message: String,
}

/// One session event, streamed to every client that asked for events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    #[serde(rename = "type")]
    pub msg_type: EventType,
    pub seq: u64,
    pub ts: u64,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Front-end log line.
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockView {
    pub index: u32,
    pub size: [f32; 3],
    pub position: [f32; 3],
    pub period: u32,
    pub state: String,
}

impl From<&BlockSnapshot> for BlockView {
    fn from(b: &BlockSnapshot) -> Self {
        Self {
            index: b.index,
            size: b.size,
            position: b.position,
            period: b.period,
            state: b.state.as_str().to_string(),
        }
    }
}

/// Full session snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationMessage {
    #[serde(rename = "type")]
    pub msg_type: ObservationType,
    pub seq: u64,
    pub ts: u64,
    pub phase: String,
    pub score: u32,
    pub block_count: u32,
    pub difficulty: String,
    pub frame: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_top: Option<f32>,
    pub labels: [String; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<BlockView>,
    pub placed: Vec<BlockView>,
}

// ============== Message Parsing ==============

/// Parse a JSON message from a string
pub fn parse_message(json: &str) -> Result<ParsedMessage, serde_json::Error> {
    #[derive(Debug, Deserialize)]
    #[serde(tag = "type")]
    enum InboundMessage {
        #[serde(rename = "hello")]
        Hello(HelloMessage),
        #[serde(rename = "command")]
        Command(CommandMessage),
    }

    match serde_json::from_str::<InboundMessage>(json) {
        Ok(InboundMessage::Hello(m)) => Ok(ParsedMessage::Hello(m)),
        Ok(InboundMessage::Command(m)) => Ok(ParsedMessage::Command(m)),
        Err(e) => {
            // An unknown message type is reported, not treated as malformed JSON.
            #[derive(Debug, Deserialize)]
            struct Header<'a> {
                #[serde(rename = "type")]
                msg_type: Option<&'a str>,
                seq: Option<u64>,
            }
            let header = serde_json::from_str::<Header>(json)?;
            match header.msg_type {
                Some("hello") | Some("command") => Err(e),
                _ => Ok(ParsedMessage::Unknown(UnknownMessage {
                    seq: header.seq.unwrap_or(0),
                })),
            }
        }
    }
}

/// Parsed incoming message
#[derive(Debug, Clone)]
pub enum ParsedMessage {
    Hello(HelloMessage),
    Command(CommandMessage),
    Unknown(UnknownMessage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownMessage {
    pub seq: u64,
}

// ============== Utility Functions ==============

pub fn create_hello(seq: u64, client_name: &str, role: RequestedRole) -> HelloMessage {
    HelloMessage {
        msg_type: HelloType::Hello,
        seq,
        ts: current_timestamp_ms(),
        client: ClientInfo {
            name: client_name.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        protocol_version: PROTOCOL_VERSION.to_string(),
        requested: RequestedCapabilities {
            stream_events: true,
            role: Some(role),
        },
    }
}

pub fn create_command(seq: u64, action: &str, difficulty: Option<&str>) -> CommandMessage {
    CommandMessage {
        msg_type: CommandType::Command,
        seq,
        ts: current_timestamp_ms(),
        action: action.to_string(),
        difficulty: difficulty.map(str::to_string),
    }
}

pub fn create_welcome(
    seq: u64,
    protocol_version: &str,
    client_id: u64,
    role: AssignedRole,
) -> WelcomeMessage {
    WelcomeMessage {
        msg_type: WelcomeType::Welcome,
        seq,
        ts: current_timestamp_ms(),
        protocol_version: protocol_version.to_string(),
        client_id,
        role,
        game_id: GAME_ID.to_string(),
    }
}

pub fn create_ack(seq: u64) -> AckMessage {
    AckMessage {
        msg_type: AckType::Ack,
        seq,
        ts: current_timestamp_ms(),
        status: AckStatus::Ok,
    }
}

pub fn create_error(seq: u64, code: ErrorCode, message: &str) -> ErrorMessage {
    ErrorMessage {
        msg_type: ErrorType::Error,
        seq,
        ts: current_timestamp_ms(),
        code,
        message: message.to_string(),
    }
}

/// Build the wire form of a session event.
pub fn build_event(seq: u64, event: &GameEvent) -> EventMessage {
    let mut msg = EventMessage {
        msg_type: EventType::Event,
        seq,
        ts: current_timestamp_ms(),
        kind: event.kind().to_string(),
        index: None,
        score: None,
        period: None,
        difficulty: None,
        error: None,
        message: event.log_line(),
    };

    match *event {
        GameEvent::BlockSpawned { index, period } => {
            msg.index = Some(index);
            msg.period = Some(period);
        }
        GameEvent::BlockPlaced { index, score } => {
            msg.index = Some(index);
            msg.score = Some(score);
        }
        GameEvent::DifficultyChanged(mode) => {
            msg.difficulty = Some(mode.as_str().to_string());
        }
        GameEvent::Error(kind) => {
            msg.error = Some(kind.as_str().to_string());
        }
        GameEvent::Started | GameEvent::Collapsed | GameEvent::Reset => {}
    }
    msg
}

/// Build an observation from a session snapshot.
pub fn build_observation(seq: u64, snapshot: &SessionSnapshot) -> ObservationMessage {
    ObservationMessage {
        msg_type: ObservationType::Observation,
        seq,
        ts: current_timestamp_ms(),
        phase: snapshot.phase.as_str().to_string(),
        score: snapshot.score,
        block_count: snapshot.block_count,
        difficulty: snapshot.difficulty.as_str().to_string(),
        frame: snapshot.frame,
        stack_top: snapshot.stack_top,
        labels: snapshot.labels(),
        active: snapshot.active.as_ref().map(BlockView::from),
        placed: snapshot.placed.iter().map(BlockView::from).collect(),
    }
}

/// Get current timestamp in milliseconds
fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
