//! `tower-builder observe`: a read-only client that prints what a session does.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};

use crate::adapter::protocol::{
    create_hello, AssignedRole, EventMessage, ObservationMessage, RequestedRole,
};
use crate::adapter::server::ServerConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObserveConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ObserveConfig {
    /// Where a host started with default settings listens.
    fn default() -> Self {
        let server = ServerConfig::default();
        Self {
            host: server.host,
            port: server.port,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ObserveEvent {
    Welcome { client_id: u64, role: AssignedRole },
    Event(EventMessage),
    Observation(ObservationMessage),
    Error(String),
    Closed,
}

/// `observe [--host H] [--port P]`. Returns `None` for any other subcommand.
pub fn parse_observe_args(args: &[String]) -> Result<Option<ObserveConfig>> {
    match args.split_first() {
        Some((cmd, flags)) if cmd == "observe" => parse_flags(flags).map(Some),
        _ => Ok(None),
    }
}

fn parse_flags(flags: &[String]) -> Result<ObserveConfig> {
    let mut config = ObserveConfig::default();
    let mut flags = flags.iter();
    while let Some(flag) = flags.next() {
        match (flag.as_str(), flags.next()) {
            ("--host", Some(host)) => config.host = host.clone(),
            ("--port", Some(port)) => {
                config.port = port
                    .parse()
                    .with_context(|| format!("observe: invalid --port value: {port}"))?;
            }
            ("--host" | "--port", None) => bail!("observe: missing value for {flag}"),
            (other, _) => bail!("observe: unknown argument: {other}"),
        }
    }
    Ok(config)
}

/// Join the session as an observer. Server lines arrive parsed on the channel,
/// ending with [`ObserveEvent::Closed`].
pub fn connect_observer(config: &ObserveConfig) -> Result<mpsc::Receiver<ObserveEvent>> {
    let mut stream = TcpStream::connect((config.host.as_str(), config.port))
        .with_context(|| format!("observe: connect {}:{} failed", config.host, config.port))?;
    stream.set_nodelay(true).context("observe: set_nodelay failed")?;

    let hello = create_hello(1, "tower-builder-observe", RequestedRole::Observer);
    writeln!(stream, "{}", serde_json::to_string(&hello)?)?;
    stream.flush()?;

    let (tx, rx) = mpsc::channel::<ObserveEvent>();
    thread::spawn(move || forward_lines(stream, tx));
    Ok(rx)
}

fn forward_lines(stream: TcpStream, tx: mpsc::Sender<ObserveEvent>) {
    for line in BufReader::new(stream).lines() {
        let event = match line {
            Ok(line) => match parse_server_line(&line) {
                Some(event) => event,
                None => continue,
            },
            Err(e) => {
                let _ = tx.send(ObserveEvent::Error(format!("observe: read error: {e}")));
                break;
            }
        };
        if tx.send(event).is_err() {
            return;
        }
    }
    let _ = tx.send(ObserveEvent::Closed);
}

/// Block until the welcome arrives or `timeout` passes.
pub fn wait_for_welcome(
    rx: &mpsc::Receiver<ObserveEvent>,
    timeout: Duration,
) -> Result<(u64, AssignedRole)> {
    match rx.recv_timeout(timeout) {
        Ok(ObserveEvent::Welcome { client_id, role }) => Ok((client_id, role)),
        Ok(ObserveEvent::Error(msg)) => Err(anyhow!(msg)),
        Ok(ObserveEvent::Closed) => Err(anyhow!("observe: connection closed")),
        Ok(other) => Err(anyhow!("observe: expected welcome, got {:?}", other)),
        Err(_) => Err(anyhow!("observe: did not receive welcome")),
    }
}

/// Text printed for one observer event.
pub fn render_event(event: &ObserveEvent) -> Option<String> {
    match event {
        ObserveEvent::Welcome { client_id, role } => {
            Some(format!("Connected as client {} ({:?}).", client_id, role))
        }
        ObserveEvent::Event(ev) => Some(ev.message.clone()),
        ObserveEvent::Observation(obs) => Some(format!(
            "{} | {} | {} | {}",
            obs.phase, obs.labels[0], obs.labels[1], obs.labels[2]
        )),
        ObserveEvent::Error(msg) => Some(msg.clone()),
        ObserveEvent::Closed => None,
    }
}

fn parse_server_line(line: &str) -> Option<ObserveEvent> {
    if line.trim().is_empty() {
        return None;
    }
    let value: serde_json::Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => return Some(ObserveEvent::Error(format!("observe: invalid json: {}", e))),
    };
    let msg_type = value
        .get("type")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();
    let parsed = match msg_type.as_str() {
        "welcome" => {
            let client_id = value.get("client_id").and_then(|v| v.as_u64()).unwrap_or(0);
            let role = serde_json::from_value::<AssignedRole>(value["role"].clone())
                .unwrap_or(AssignedRole::Observer);
            return Some(ObserveEvent::Welcome { client_id, role });
        }
        "event" => serde_json::from_value::<EventMessage>(value).map(ObserveEvent::Event),
        "observation" => {
            serde_json::from_value::<ObservationMessage>(value).map(ObserveEvent::Observation)
        }
        "error" => {
            let code = value.get("code").and_then(|v| v.as_str()).unwrap_or("unknown");
            let msg = value.get("message").and_then(|v| v.as_str()).unwrap_or("");
            return Some(ObserveEvent::Error(format!(
                "observe: server error {} {}",
                code, msg
            )));
        }
        _ => return None,
    };

    Some(parsed.unwrap_or_else(|e| {
        ObserveEvent::Error(format!("observe: invalid {}: {}", msg_type, e))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_observe_args_parses_host_port() {
        let parsed = parse_observe_args(&args(&["observe", "--host", "0.0.0.0", "--port", "9001"]))
            .unwrap()
            .unwrap();
        assert_eq!(
            parsed,
            ObserveConfig {
                host: "0.0.0.0".to_string(),
                port: 9001
            }
        );
    }

    #[test]
    fn parse_observe_args_defaults() {
        let parsed = parse_observe_args(&args(&["observe"])).unwrap().unwrap();
        assert_eq!(parsed.host, "127.0.0.1");
        assert_eq!(parsed.port, 7878);
    }

    #[test]
    fn parse_observe_args_ignores_other_commands() {
        assert_eq!(parse_observe_args(&args(&[])).unwrap(), None);
        assert_eq!(parse_observe_args(&args(&["run"])).unwrap(), None);
    }

    #[test]
    fn observer_defaults_follow_the_server() {
        let server = ServerConfig::default();
        let config = ObserveConfig::default();
        assert_eq!((config.host, config.port), (server.host, server.port));
    }

    #[test]
    fn blank_lines_are_skipped() {
        assert!(parse_server_line("   ").is_none());
    }

    #[test]
    fn parse_observe_args_rejects_bad_input() {
        assert!(parse_observe_args(&args(&["observe", "--port"])).is_err());
        assert!(parse_observe_args(&args(&["observe", "--port", "x"])).is_err());
        assert!(parse_observe_args(&args(&["observe", "--verbose"])).is_err());
        let err = parse_observe_args(&args(&["observe", "--host"])).unwrap_err();
        assert_eq!(err.to_string(), "observe: missing value for --host");
    }

    #[test]
    fn event_lines_render_their_log_text() {
        let line = r#"{"type":"event","seq":3,"ts":0,"kind":"collapsed","message":"Game Over! Tower collapsed!"}"#;
        let event = parse_server_line(line).unwrap();
        assert_eq!(render_event(&event).as_deref(), Some("Game Over! Tower collapsed!"));
    }

    #[test]
    fn welcome_and_errors_are_recognised() {
        let welcome = r#"{"type":"welcome","seq":1,"ts":0,"protocol_version":"1.0.0","client_id":4,"role":"observer","game_id":"tower-builder"}"#;
        match parse_server_line(welcome) {
            Some(ObserveEvent::Welcome { client_id, role }) => {
                assert_eq!(client_id, 4);
                assert_eq!(role, AssignedRole::Observer);
            }
            other => panic!("unexpected {other:?}"),
        }

        let err = r#"{"type":"error","seq":1,"ts":0,"code":"protocol_mismatch","message":"nope"}"#;
        assert!(matches!(parse_server_line(err), Some(ObserveEvent::Error(_))));
        assert!(parse_server_line(r#"{"type":"ack","seq":2,"ts":0,"status":"ok"}"#).is_none());
    }
}
