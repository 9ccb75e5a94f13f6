//! TCP server for the front-end adapter
//!
//! Handles incoming connections and manages client lifecycle.
//! Uses tokio for async networking.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, RwLock};
use tracing::{debug, info, warn};

use crate::protocol::*;
use crate::runtime::{InboundCommand, InboundPayload, OutboundMessage};
use crate::types::CommandKind;

type WireLog = mpsc::UnboundedSender<Vec<u8>>;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub protocol_version: String,
    pub max_pending_commands: usize,
    /// Append every inbound and outbound line to this file.
    pub log_path: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7878,
            protocol_version: PROTOCOL_VERSION.to_string(),
            max_pending_commands: 16,
            log_path: None,
        }
    }
}

impl ServerConfig {
    /// Create from environment variables
    ///
    /// - `TOWER_ADAPTER_HOST` (default `127.0.0.1`)
    /// - `TOWER_ADAPTER_PORT` (default 7878)
    /// - `TOWER_ADAPTER_MAX_PENDING` (default 16)
    /// - `TOWER_ADAPTER_LOG_PATH` (unset or empty disables the wire log)
    pub fn from_env() -> Self {
        use std::env;

        let defaults = Self::default();

        let host = env::var("TOWER_ADAPTER_HOST").unwrap_or(defaults.host);
        let port = env::var("TOWER_ADAPTER_PORT")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.port);

        let max_pending_commands = env::var("TOWER_ADAPTER_MAX_PENDING")
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.max_pending_commands);

        let log_path = env::var("TOWER_ADAPTER_LOG_PATH")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Self {
            host,
            port,
            protocol_version: defaults.protocol_version,
            max_pending_commands,
            log_path,
        }
    }
}

/// Shared server state
pub struct ServerState {
    config: ServerConfig,
    clients: RwLock<Vec<ClientHandle>>,
    controller: RwLock<Option<usize>>,
}

impl ServerState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            clients: RwLock::new(Vec::new()),
            controller: RwLock::new(None),
        }
    }

    /// Check if the adapter is disabled via environment
    pub fn is_disabled() -> bool {
        std::env::var("TOWER_ADAPTER_DISABLED")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    async fn is_handshaken(&self, client_id: usize) -> bool {
        self.clients
            .read()
            .await
            .iter()
            .any(|c| c.id == client_id && c.handshaken)
    }

    async fn is_controller(&self, client_id: usize) -> bool {
        *self.controller.read().await == Some(client_id)
    }

    /// Record `seq` if it is strictly greater than the client's last one.
    async fn check_and_update_seq(&self, client_id: usize, seq: u64) -> bool {
        let mut clients = self.clients.write().await;
        let Some(client) = clients.iter_mut().find(|c| c.id == client_id) else {
            return true;
        };
        match client.last_seq {
            Some(prev) if seq <= prev => false,
            _ => {
                client.last_seq = Some(seq);
                true
            }
        }
    }
}

/// Handle to a connected client
pub struct ClientHandle {
    pub id: usize,
    pub addr: SocketAddr,
    pub handshaken: bool,
    /// False for clients that asked to observe only.
    pub wants_control: bool,
    pub stream_events: bool,
    pub last_seq: Option<u64>,
    pub tx: mpsc::UnboundedSender<ClientOutbound>,
}

#[derive(Debug, Clone)]
pub enum ClientOutbound {
    Line(String),
    Ack(AckMessage),
    Error(ErrorMessage),
    Welcome(WelcomeMessage),
}

impl ClientOutbound {
    fn encode(&self, buf: &mut Vec<u8>) -> serde_json::Result<()> {
        buf.clear();
        match self {
            ClientOutbound::Line(line) => buf.extend_from_slice(line.as_bytes()),
            ClientOutbound::Ack(m) => serde_json::to_writer(&mut *buf, m)?,
            ClientOutbound::Error(m) => serde_json::to_writer(&mut *buf, m)?,
            ClientOutbound::Welcome(m) => serde_json::to_writer(&mut *buf, m)?,
        }
        Ok(())
    }
}

/// Start the TCP server
///
/// `ready_tx` receives the bound address once the listener is up, which lets
/// callers bind port 0.
pub async fn run_server(
    config: ServerConfig,
    command_tx: mpsc::Sender<InboundCommand>,
    mut out_rx: mpsc::UnboundedReceiver<OutboundMessage>,
    ready_tx: Option<oneshot::Sender<SocketAddr>>,
) -> anyhow::Result<()> {
    let wire_log_tx = config.log_path.clone().map(spawn_wire_log);

    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?;
    let bound = listener.local_addr()?;
    info!(%bound, "adapter listening");
    if let Some(tx) = ready_tx {
        let _ = tx.send(bound);
    }

    let state = Arc::new(ServerState::new(config));

    // Outbound dispatcher.
    {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                let clients = state.clients.read().await;
                match msg {
                    OutboundMessage::ToClient { client_id, line } => {
                        send_to(&clients, client_id, ClientOutbound::Line(line));
                    }
                    OutboundMessage::Broadcast { line } => {
                        for c in clients.iter().filter(|c| c.handshaken && c.stream_events) {
                            let _ = c.tx.send(ClientOutbound::Line(line.clone()));
                        }
                    }
                    OutboundMessage::ToClientAck { client_id, ack } => {
                        send_to(&clients, client_id, ClientOutbound::Ack(ack));
                    }
                    OutboundMessage::ToClientError { client_id, err } => {
                        send_to(&clients, client_id, ClientOutbound::Error(err));
                    }
                }
            }
        });
    }

    let mut next_client_id = 0usize;
    loop {
        let (socket, addr) = listener.accept().await?;
        next_client_id += 1;
        let client_id = next_client_id;
        info!(client_id, %addr, "client connected");

        let state = Arc::clone(&state);
        let command_tx = command_tx.clone();
        let wire_log_tx = wire_log_tx.clone();

        tokio::spawn(async move {
            if let Err(e) =
                handle_client(socket, addr, client_id, state, command_tx, wire_log_tx).await
            {
                warn!(client_id, error = %e, "client error");
            }
            info!(client_id, "client disconnected");
        });
    }
}

fn send_to(clients: &[ClientHandle], client_id: usize, msg: ClientOutbound) {
    if let Some(c) = clients.iter().find(|c| c.id == client_id) {
        let _ = c.tx.send(msg);
    }
}

fn spawn_wire_log(path: String) -> WireLog {
    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
    tokio::spawn(async move {
        use tokio::fs::OpenOptions;

        let mut file = match OpenOptions::new().create(true).append(true).open(&path).await {
            Ok(f) => f,
            Err(e) => {
                warn!(path = %path, error = %e, "failed to open wire log");
                return;
            }
        };

        while let Some(mut line) = rx.recv().await {
            line.push(b'\n');
            if file.write_all(&line).await.is_err() {
                break;
            }
        }
        let _ = file.flush().await;
    });
    tx
}

/// Handle a single client connection
async fn handle_client(
    socket: TcpStream,
    addr: SocketAddr,
    client_id: usize,
    state: Arc<ServerState>,
    command_tx: mpsc::Sender<InboundCommand>,
    wire_log_tx: Option<WireLog>,
) -> anyhow::Result<()> {
    let (reader, mut writer) = tokio::io::split(socket);
    let mut reader = BufReader::new(reader);

    let (tx, mut rx) = mpsc::unbounded_channel::<ClientOutbound>();

    state.clients.write().await.push(ClientHandle {
        id: client_id,
        addr,
        handshaken: false,
        wants_control: true,
        stream_events: false,
        last_seq: None,
        tx: tx.clone(),
    });

    let wire_log_out = wire_log_tx.clone();
    let write_task = tokio::spawn(async move {
        let mut buf: Vec<u8> = Vec::with_capacity(1024);
        while let Some(msg) = rx.recv().await {
            if let Err(e) = msg.encode(&mut buf) {
                warn!(client_id, error = %e, "failed to encode message");
                continue;
            }
            if let Some(log) = wire_log_out.as_ref() {
                let _ = log.send(buf.clone());
            }
            buf.push(b'\n');
            if writer.write_all(&buf).await.is_err() || writer.flush().await.is_err() {
                break;
            }
        }
    });

    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }

        let raw_line = line.trim_end_matches(['\n', '\r']);
        let trimmed = raw_line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(log) = wire_log_tx.as_ref() {
            let _ = log.send(raw_line.as_bytes().to_vec());
        }

        let keep_open = match parse_message(trimmed) {
            Ok(ParsedMessage::Hello(hello)) => {
                on_hello(&state, client_id, &tx, &command_tx, hello).await
            }
            Ok(ParsedMessage::Command(cmd)) => {
                on_command(&state, client_id, &tx, &command_tx, cmd).await;
                true
            }
            Ok(ParsedMessage::Unknown(unknown)) => {
                let _ = tx.send(ClientOutbound::Error(create_error(
                    unknown.seq,
                    ErrorCode::InvalidCommand,
                    "Unknown message type",
                )));
                true
            }
            Err(e) => {
                let _ = tx.send(ClientOutbound::Error(create_error(
                    seq_hint(trimmed),
                    ErrorCode::InvalidCommand,
                    &format!("JSON parse error: {e}"),
                )));
                true
            }
        };
        if !keep_open {
            break;
        }
    }

    // Remove the client and hand control to the next eligible client.
    {
        let mut controller = state.controller.write().await;
        let mut clients = state.clients.write().await;
        clients.retain(|c| c.id != client_id);

        if *controller == Some(client_id) {
            *controller = clients
                .iter()
                .filter(|c| c.handshaken && c.wants_control)
                .map(|c| c.id)
                .min();
            match *controller {
                Some(next) => info!(client_id = next, "controller promoted"),
                None => info!(client_id, "controller released"),
            }
        }
    }

    drop(tx);
    let _ = write_task.await;
    Ok(())
}

/// Returns false when the connection must be closed.
async fn on_hello(
    state: &ServerState,
    client_id: usize,
    tx: &mpsc::UnboundedSender<ClientOutbound>,
    command_tx: &mpsc::Sender<InboundCommand>,
    hello: HelloMessage,
) -> bool {
    if state.is_handshaken(client_id).await
        && !state.check_and_update_seq(client_id, hello.seq).await
    {
        let _ = tx.send(ClientOutbound::Error(create_error(
            hello.seq,
            ErrorCode::InvalidCommand,
            "seq must be strictly increasing",
        )));
        return true;
    }

    if !hello.protocol_version.starts_with("1.") {
        let _ = tx.send(ClientOutbound::Error(create_error(
            hello.seq,
            ErrorCode::ProtocolMismatch,
            &format!("Protocol version {} not supported", hello.protocol_version),
        )));
        return false;
    }

    let wants_control = hello.requested.role != Some(RequestedRole::Observer);
    let stream_events = hello.requested.stream_events;

    let role = {
        let mut controller = state.controller.write().await;
        let mut clients = state.clients.write().await;

        let role = if *controller == Some(client_id) || (wants_control && controller.is_none()) {
            *controller = Some(client_id);
            AssignedRole::Controller
        } else {
            AssignedRole::Observer
        };

        if let Some(client) = clients.iter_mut().find(|c| c.id == client_id) {
            client.handshaken = true;
            client.wants_control = wants_control;
            client.stream_events = stream_events;
            client.last_seq = Some(hello.seq);
        }
        role
    };

    info!(client_id, name = %hello.client.name, ?role, "handshake complete");

    let welcome = create_welcome(
        hello.seq,
        &state.config.protocol_version,
        client_id as u64,
        role,
    );
    let _ = tx.send(ClientOutbound::Welcome(welcome));

    if stream_events {
        // Best effort; the next broadcast event reaches the client regardless.
        let _ = command_tx.try_send(InboundCommand {
            client_id,
            seq: hello.seq,
            payload: InboundPayload::SnapshotRequest,
        });
    }
    true
}

async fn on_command(
    state: &ServerState,
    client_id: usize,
    tx: &mpsc::UnboundedSender<ClientOutbound>,
    command_tx: &mpsc::Sender<InboundCommand>,
    cmd: CommandMessage,
) {
    let reject = |code: ErrorCode, message: &str| {
        let _ = tx.send(ClientOutbound::Error(create_error(cmd.seq, code, message)));
    };

    if !state.is_handshaken(client_id).await {
        reject(ErrorCode::HandshakeRequired, "Send hello before command");
        return;
    }
    if !state.check_and_update_seq(client_id, cmd.seq).await {
        reject(ErrorCode::InvalidCommand, "seq must be strictly increasing");
        return;
    }
    if !state.is_controller(client_id).await {
        reject(ErrorCode::NotController, "Only controller may send commands");
        return;
    }

    let command = match map_command(&cmd) {
        Ok(c) => c,
        Err((code, message)) => {
            reject(code, &message);
            return;
        }
    };
    debug!(client_id, seq = cmd.seq, action = command.as_str(), "command queued");

    // Backpressure: bounded queue. The host answers with an ack once applied.
    if command_tx
        .try_send(InboundCommand {
            client_id,
            seq: cmd.seq,
            payload: InboundPayload::Command(command),
        })
        .is_err()
    {
        reject(ErrorCode::Backpressure, "Command queue is full");
    }
}

/// Map a protocol command onto a session command.
fn map_command(cmd: &CommandMessage) -> Result<CommandKind, (ErrorCode, String)> {
    CommandKind::parse(&cmd.action, cmd.difficulty.as_deref()).ok_or_else(|| {
        let message = match cmd.action.to_lowercase().as_str() {
            "difficulty" | "setdifficulty" => match cmd.difficulty.as_deref() {
                Some(d) => format!("Unknown difficulty: {d}"),
                None => "Missing difficulty".to_string(),
            },
            _ => format!("Unknown action: {}", cmd.action),
        };
        (ErrorCode::InvalidCommand, message)
    })
}

/// Sequence number of a line that failed to parse, or 0.
fn seq_hint(line: &str) -> u64 {
    serde_json::from_str::<serde_json::Value>(line)
        .ok()
        .and_then(|v| v.get("seq").and_then(|s| s.as_u64()))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Difficulty;

    #[test]
    fn test_map_command() {
        assert_eq!(map_command(&create_command(1, "start", None)), Ok(CommandKind::Start));
        assert_eq!(map_command(&create_command(2, "DROP", None)), Ok(CommandKind::Drop));
        assert_eq!(
            map_command(&create_command(3, "difficulty", Some("normal"))),
            Ok(CommandKind::SetDifficulty(Difficulty::Normal))
        );
    }

    #[test]
    fn test_map_command_errors() {
        let (code, msg) = map_command(&create_command(1, "jump", None)).unwrap_err();
        assert_eq!(code, ErrorCode::InvalidCommand);
        assert_eq!(msg, "Unknown action: jump");

        let (_, msg) = map_command(&create_command(2, "difficulty", None)).unwrap_err();
        assert_eq!(msg, "Missing difficulty");

        let (_, msg) = map_command(&create_command(3, "difficulty", Some("insane"))).unwrap_err();
        assert_eq!(msg, "Unknown difficulty: insane");
    }

    #[test]
    fn test_seq_hint() {
        assert_eq!(seq_hint(r#"{"type":"command","seq":12}"#), 12);
        assert_eq!(seq_hint("garbage"), 0);
    }

    #[test]
    fn test_server_config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 7878);
        assert_eq!(config.max_pending_commands, 16);
        assert!(config.log_path.is_none());
    }

    #[test]
    fn test_server_config_from_env() {
        // This test just ensures it doesn't panic
        let _config = ServerConfig::from_env();
    }
}
