//! Adapter module - front-end control via TCP socket with a JSON protocol
//!
//! A front-end (control panel, test harness, script) drives a game session
//! through this adapter and receives its event stream.
//!
//! # Protocol Overview
//!
//! The adapter implements a **line-delimited JSON protocol** over TCP:
//!
//! 1. **Connection**: Client connects to TCP socket (default: 127.0.0.1:7878)
//! 2. **Handshake**: Client sends `hello`, server responds with `welcome`
//! 3. **Controller Assignment**: First client to hello becomes the controller,
//!    unless it asked for the `observer` role
//! 4. **Event Streaming**: Every session event is broadcast as an `event`
//! 5. **Commanding**: Controller sends `command`s; each is answered with an
//!    `ack` once applied, or an `error`
//!
//! # Message Types
//!
//! ## Client → Server
//!
//! - **hello**: Initial handshake with client info and requested role
//! - **command**: `start`, `drop`, `reset` or `difficulty` (with `difficulty`)
//!
//! ## Server → Client
//!
//! - **welcome**: Response to hello with the assigned role
//! - **ack**: Command applied
//! - **error**: Error response with code and message
//! - **event**: One session event with its log line
//! - **observation**: Full session snapshot, sent once after subscribing
//!
//! # Environment Variables
//!
//! - `TOWER_ADAPTER_HOST`: Bind address (default: "127.0.0.1")
//! - `TOWER_ADAPTER_PORT`: Port number (default: 7878)
//! - `TOWER_ADAPTER_MAX_PENDING`: Command queue depth (default: 16)
//! - `TOWER_ADAPTER_LOG_PATH`: Optional wire log file
//! - `TOWER_ADAPTER_DISABLED`: Set to "1" or "true" to disable the adapter
//!
//! # Example Protocol Flow
//!
//! ```text
//! Client -> Server: {"type":"hello","seq":1,"ts":0,"client":{"name":"panel","version":"1.0.0"},"protocol_version":"1.0.0"}
//! Server -> Client: {"type":"welcome","seq":1,"ts":0,"protocol_version":"1.0.0","client_id":1,"role":"controller","game_id":"tower-builder"}
//! Server -> Client: {"type":"observation","seq":1,"ts":0,"phase":"idle",...}
//! Client -> Server: {"type":"command","seq":2,"ts":0,"action":"start"}
//! Server -> Client: {"type":"ack","seq":2,"ts":0,"status":"ok"}
//! Server -> Client: {"type":"event","seq":2,"ts":0,"kind":"started","message":"Game started."}
//! ```

pub mod protocol;
pub mod runtime;
pub mod server;

pub use tower_builder_core as core;
pub use tower_builder_types as types;

pub use protocol::*;
pub use runtime::{Adapter, InboundCommand, InboundPayload, OutboundMessage};
pub use server::{run_server, ServerConfig, ServerState};
