//! End-to-end router tests driving a real `browser-bridge --daemon`
//! subprocess, the way `crates/cli/tests/e2e.rs` drives a real `pw`
//! subprocess rather than constructing router internals in-process —
//! this binary has no `[lib]` target to construct them with anyway.
//!
//! Each test plays a fake Helper (raw `UnixStream`, hand-rolled
//! REGISTER/REQUEST/DISCONNECT frames) and, where needed, a fake
//! Extension (a `tokio-tungstenite` client against the daemon's
//! `/extension` WebSocket route) against one daemon process.

#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use bridge_core::FramedLineReader;
use bridge_protocol::{Message, codec};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::UnixStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as WsMessage;

const STEP: Duration = Duration::from_secs(5);

fn daemon_binary() -> PathBuf {
    let mut path = std::env::current_exe().expect("current_exe");
    path.pop(); // deps/
    path.pop(); // debug/ or release/
    path.push("browser-bridge");
    path
}

struct Daemon {
    child: Child,
    _dir: tempfile::TempDir,
    socket_path: PathBuf,
    ws_port: u16,
}

impl Drop for Daemon {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port()
}

async fn wait_for_socket(path: &Path) {
    timeout(STEP, async {
        while !path.exists() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("daemon never created its socket");
}

async fn spawn_daemon() -> Daemon {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("daemon.sock");
    let ws_port = free_port();

    let child = Command::new(daemon_binary())
        .arg("--daemon")
        .arg("--socket")
        .arg(&socket_path)
        .arg("--ws-host")
        .arg("127.0.0.1")
        .arg("--ws-port")
        .arg(ws_port.to_string())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn browser-bridge --daemon");

    wait_for_socket(&socket_path).await;
    Daemon { child, _dir: dir, socket_path, ws_port }
}

struct Helper {
    reader: FramedLineReader<ReadHalf<UnixStream>>,
    writer: WriteHalf<UnixStream>,
}

impl Helper {
    async fn connect(socket_path: &Path) -> Self {
        let stream = UnixStream::connect(socket_path).await.expect("connect to daemon socket");
        let (read_half, writer) = tokio::io::split(stream);
        Helper { reader: FramedLineReader::new(read_half), writer }
    }

    async fn send(&mut self, message: &Message) {
        let bytes = codec::encode_line(message).unwrap();
        self.writer.write_all(&bytes).await.unwrap();
    }

    async fn recv(&mut self) -> Message {
        let line = timeout(STEP, self.reader.next_line())
            .await
            .expect("timed out waiting for a reply")
            .unwrap()
            .expect("daemon closed the connection");
        codec::decode_line(&line).unwrap()
    }

    async fn register(&mut self) -> String {
        self.send(&Message::Register).await;
        match self.recv().await {
            Message::RegisterOk { session_id } => session_id,
            other => panic!("expected REGISTER_OK, got {other:?}"),
        }
    }
}

type ExtensionSocket = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn connect_extension(ws_port: u16) -> ExtensionSocket {
    let url = format!("ws://127.0.0.1:{ws_port}/extension");
    let (ws, _response) = timeout(STEP, tokio_tungstenite::connect_async(url)).await.expect("ws connect timed out").expect("ws handshake failed");
    ws
}

async fn extension_recv(ws: &mut ExtensionSocket) -> Message {
    loop {
        match timeout(STEP, ws.next()).await.expect("timed out waiting on extension socket").expect("extension socket closed") {
            Ok(WsMessage::Text(text)) => return codec::decode_line(&text).unwrap(),
            Ok(WsMessage::Ping(_)) | Ok(WsMessage::Pong(_)) => continue,
            other => panic!("unexpected ws frame: {other:?}"),
        }
    }
}

async fn extension_send(ws: &mut ExtensionSocket, message: &Message) {
    let bytes = codec::encode_line(message).unwrap();
    let text = String::from_utf8(bytes).unwrap();
    ws.send(WsMessage::Text(text.trim_end().to_string())).await.unwrap();
}

#[tokio::test]
async fn request_round_trips_through_a_connected_extension() {
    let daemon = spawn_daemon().await;
    let mut extension = connect_extension(daemon.ws_port).await;
    let mut helper = Helper::connect(&daemon.socket_path).await;

    let session_id = helper.register().await;
    helper
        .send(&Message::Request {
            req_id: format!("{session_id}:1"),
            session_id: Some(session_id.clone()),
            action: bridge_protocol::Action::Navigate,
            params: serde_json::json!({"url": "https://example.com"}),
            tab_id: None,
        })
        .await;

    let forwarded = extension_recv(&mut extension).await;
    let Message::Request { req_id, session_id: forwarded_session, action, .. } = forwarded else {
        panic!("expected the daemon to forward a REQUEST to the extension");
    };
    assert_eq!(req_id, format!("{session_id}:1"));
    assert_eq!(forwarded_session.as_deref(), Some(session_id.as_str()));
    assert_eq!(action, bridge_protocol::Action::Navigate);

    extension_send(
        &mut extension,
        &Message::Response { req_id: req_id.clone(), session_id: forwarded_session, ok: true, data: Some(serde_json::json!({"url": "https://example.com"})), error: None },
    )
    .await;

    match helper.recv().await {
        Message::Response { req_id: got_req_id, ok, data, .. } => {
            assert_eq!(got_req_id, req_id);
            assert!(ok);
            assert_eq!(data.unwrap()["url"], "https://example.com");
        }
        other => panic!("expected RESPONSE, got {other:?}"),
    }
}

#[tokio::test]
async fn two_sessions_are_routed_independently() {
    let daemon = spawn_daemon().await;
    let mut extension = connect_extension(daemon.ws_port).await;
    let mut helper_a = Helper::connect(&daemon.socket_path).await;
    let mut helper_b = Helper::connect(&daemon.socket_path).await;

    let session_a = helper_a.register().await;
    let session_b = helper_b.register().await;
    assert_ne!(session_a, session_b);

    helper_a
        .send(&Message::Request { req_id: format!("{session_a}:1"), session_id: Some(session_a.clone()), action: bridge_protocol::Action::GetTabs, params: serde_json::json!({}), tab_id: None })
        .await;
    helper_b
        .send(&Message::Request { req_id: format!("{session_b}:1"), session_id: Some(session_b.clone()), action: bridge_protocol::Action::GetTabs, params: serde_json::json!({}), tab_id: None })
        .await;

    for _ in 0..2 {
        let forwarded = extension_recv(&mut extension).await;
        let Message::Request { req_id, session_id, .. } = forwarded else { panic!("expected REQUEST") };
        extension_send(&mut extension, &Message::Response { req_id, session_id, ok: true, data: Some(serde_json::json!([])), error: None }).await;
    }

    let reply_a = helper_a.recv().await;
    let reply_b = helper_b.recv().await;
    assert_eq!(reply_a.req_id(), Some(format!("{session_a}:1").as_str()));
    assert_eq!(reply_b.req_id(), Some(format!("{session_b}:1").as_str()));
}

#[tokio::test]
async fn request_without_a_connected_extension_errors_immediately() {
    let daemon = spawn_daemon().await;
    let mut helper = Helper::connect(&daemon.socket_path).await;
    let session_id = helper.register().await;

    helper
        .send(&Message::Request { req_id: format!("{session_id}:1"), session_id: Some(session_id.clone()), action: bridge_protocol::Action::Screenshot, params: serde_json::json!({}), tab_id: None })
        .await;

    match helper.recv().await {
        Message::Response { ok, error, .. } => {
            assert!(!ok);
            assert!(error.is_some());
        }
        other => panic!("expected an immediate error RESPONSE, got {other:?}"),
    }
}

#[tokio::test]
async fn unregistered_session_id_is_rejected() {
    let daemon = spawn_daemon().await;
    let mut helper = Helper::connect(&daemon.socket_path).await;
    helper.register().await;

    helper
        .send(&Message::Request {
            req_id: "sess_does_not_exist:1".into(),
            session_id: Some("sess_does_not_exist".into()),
            action: bridge_protocol::Action::GetTabs,
            params: serde_json::json!({}),
            tab_id: None,
        })
        .await;

    match helper.recv().await {
        Message::Response { ok, error, .. } => {
            assert!(!ok);
            assert!(error.unwrap().to_lowercase().contains("session"));
        }
        other => panic!("expected a rejection RESPONSE, got {other:?}"),
    }
}

#[tokio::test]
async fn status_reports_extension_and_session_counts() {
    let daemon = spawn_daemon().await;
    let mut helper = Helper::connect(&daemon.socket_path).await;

    helper.send(&Message::Status).await;
    match helper.recv().await {
        Message::StatusOk { extension_connected, active_sessions } => {
            assert!(!extension_connected);
            assert_eq!(active_sessions, 0);
        }
        other => panic!("expected STATUS_OK, got {other:?}"),
    }

    let _extension = connect_extension(daemon.ws_port).await;
    let _session_id = helper.register().await;

    helper.send(&Message::Status).await;
    match helper.recv().await {
        Message::StatusOk { extension_connected, active_sessions } => {
            assert!(extension_connected);
            assert_eq!(active_sessions, 1);
        }
        other => panic!("expected STATUS_OK, got {other:?}"),
    }
}

#[tokio::test]
async fn disconnect_ends_the_session_before_its_helper_closes() {
    let daemon = spawn_daemon().await;
    let mut helper = Helper::connect(&daemon.socket_path).await;
    let session_id = helper.register().await;

    helper.send(&Message::Disconnect { session_id: session_id.clone() }).await;

    // The session is gone immediately; a STATUS on a second helper
    // connection must not still count it.
    let mut status_helper = Helper::connect(&daemon.socket_path).await;
    // give the daemon a moment to process the DISCONNECT frame
    tokio::time::sleep(Duration::from_millis(100)).await;
    status_helper.send(&Message::Status).await;
    match status_helper.recv().await {
        Message::StatusOk { active_sessions, .. } => assert_eq!(active_sessions, 0),
        other => panic!("expected STATUS_OK, got {other:?}"),
    }
}

#[tokio::test]
async fn daemon_status_subcommand_reports_a_running_daemon() {
    let daemon = spawn_daemon().await;

    let output = Command::new(daemon_binary())
        .arg("--socket")
        .arg(&daemon.socket_path)
        .arg("daemon")
        .arg("status")
        .output()
        .expect("failed to run `daemon status`");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
}
