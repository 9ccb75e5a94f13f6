//! Headless host loop pieces.
//!
//! [`Host`] owns the session and turns adapter traffic into session calls and
//! session events into wire messages. The binary only adds sockets and a clock.

use serde::Serialize;
use tracing::{debug, warn};

use crate::adapter::protocol::{build_event, build_observation, create_ack, create_error, ErrorCode};
use crate::adapter::{InboundCommand, InboundPayload, OutboundMessage};
use crate::core::{GameSession, SceneAdapter, SessionError};
use crate::types::{GameEvent, DEFAULT_FPS};

/// Host configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostConfig {
    /// Timeline frames advanced per second of wall time.
    pub fps: u32,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self { fps: DEFAULT_FPS }
    }
}

impl HostConfig {
    /// `TOWER_FPS`, default 24. Zero and unparseable values use the default.
    pub fn from_env() -> Self {
        let fps = std::env::var("TOWER_FPS")
            .ok()
            .and_then(|s| s.trim().parse::<u32>().ok())
            .filter(|&fps| fps > 0)
            .unwrap_or(DEFAULT_FPS);
        Self { fps }
    }

    pub fn tick_secs(&self) -> f64 {
        1.0 / self.fps.max(1) as f64
    }
}

pub struct Host<S: SceneAdapter> {
    session: GameSession<S>,
    /// Sequence number of the last server-originated message.
    seq: u64,
}

impl<S: SceneAdapter> Host<S> {
    pub fn new(session: GameSession<S>) -> Self {
        Self { session, seq: 0 }
    }

    pub fn session(&self) -> &GameSession<S> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut GameSession<S> {
        &mut self.session
    }

    /// Apply one inbound command and return the replies and events it produced.
    ///
    /// Commands are answered before their events are broadcast.
    pub fn handle(&mut self, inbound: InboundCommand) -> Vec<OutboundMessage> {
        let mut out = Vec::new();
        let client_id = inbound.client_id;

        match inbound.payload {
            InboundPayload::Command(command) => {
                debug!(client_id, seq = inbound.seq, action = command.as_str(), "applying command");
                match self.session.apply(command) {
                    Ok(()) => out.push(OutboundMessage::ToClientAck {
                        client_id,
                        ack: create_ack(inbound.seq),
                    }),
                    Err(e) => out.push(OutboundMessage::ToClientError {
                        client_id,
                        err: create_error(inbound.seq, ErrorCode::from(e.kind()), &error_text(&e)),
                    }),
                }
            }
            InboundPayload::SnapshotRequest => {
                let seq = self.next_seq();
                let obs = build_observation(seq, &self.session.snapshot());
                if let Some(line) = encode(&obs) {
                    out.push(OutboundMessage::ToClient { client_id, line });
                }
            }
        }

        self.flush_events(&mut out);
        out
    }

    /// Advance the timeline by `frames` and flush pending events.
    pub fn tick(&mut self, frames: f32) -> Vec<OutboundMessage> {
        self.session.advance(frames);
        let mut out = Vec::new();
        self.flush_events(&mut out);
        out
    }

    fn flush_events(&mut self, out: &mut Vec<OutboundMessage>) {
        for event in self.session.drain_events() {
            let seq = self.next_seq();
            if let Some(line) = encode(&build_event(seq, &event)) {
                out.push(OutboundMessage::Broadcast { line });
            }
        }
    }

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }
}

fn error_text(e: &SessionError) -> String {
    match e {
        SessionError::NoActiveBlock => GameEvent::Error(e.kind()).log_line(),
        SessionError::Adapter(inner) => inner.to_string(),
    }
}

fn encode<T: Serialize>(msg: &T) -> Option<String> {
    match serde_json::to_string(msg) {
        Ok(line) => Some(line),
        Err(e) => {
            warn!(error = %e, "failed to encode outbound message");
            None
        }
    }
}
