//! Router Daemon (spec §4.3, C3): the single host-wide process that
//! multiplexes many helpers onto one extension WebSocket.

mod connection;
mod extension;
mod state;
mod transport;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use bridge_core::config;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

pub use state::DaemonState;
use transport::HelperListener;

use crate::error::Result;

pub struct DaemonOptions {
	pub socket_path: PathBuf,
	pub ws_host: String,
	pub ws_port: u16,
	pub max_sessions: usize,
	pub request_deadline: Duration,
	pub idle_shutdown: Duration,
}

/// Runs the Router Daemon to completion: binds both listeners, serves
/// until idle-timeout or a termination signal, then shuts down in the
/// order spec §5 requires: stop accepting new helpers, abort pending
/// entries, close the extension uplink, close the listener, remove the
/// socket and PID file.
pub async fn run(opts: DaemonOptions) -> Result<()> {
	bridge_runtime::ensure_parent_dir(&opts.socket_path)?;
	let pid_path = bridge_runtime::sibling(&opts.socket_path, config::DEFAULT_PID_FILE_NAME);

	let listener = HelperListener::bind(&opts.socket_path).await?;
	bridge_runtime::write_pid(&pid_path)?;
	info!(target = "bridge.daemon", socket = %opts.socket_path.display(), "helper socket bound");

	let state = DaemonState::new(opts.max_sessions, opts.request_deadline, opts.idle_shutdown);

	let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

	spawn_idle_ticker(Arc::clone(&state), shutdown_tx.clone(), shutdown_rx.clone());
	spawn_signal_watcher(shutdown_tx.clone());

	let ws_addr = format!("{}:{}", opts.ws_host, opts.ws_port);
	let ws_listener = TcpListener::bind(&ws_addr).await?;
	info!(target = "bridge.daemon", addr = %ws_addr, "extension websocket listening");

	let app = Router::new().route("/extension", get(extension::upgrade)).with_state(Arc::clone(&state));
	let mut ws_shutdown_rx = shutdown_rx.clone();
	let ws_server = tokio::spawn(async move {
		let _ = axum::serve(ws_listener, app.into_make_service())
			.with_graceful_shutdown(async move {
				let _ = ws_shutdown_rx.changed().await;
			})
			.await;
	});

	loop {
		tokio::select! {
			changed = shutdown_rx.changed() => {
				if changed.is_err() || *shutdown_rx.borrow() {
					break;
				}
			}
			accepted = listener.accept() => {
				match accepted {
					Ok(stream) => {
						let helper_id = state.next_helper_id();
						let conn_state = Arc::clone(&state);
						tokio::spawn(async move { connection::handle(stream, conn_state, helper_id).await; });
					}
					Err(err) => warn!(target = "bridge.daemon", error = %err, "failed to accept helper connection"),
				}
			}
		}
	}

	info!(target = "bridge.daemon", "shutting down");
	state.correlation.abort_all("daemon shutting down");
	drop(state.take_extension());
	drop(listener);
	let _ = ws_server.await;

	let _ = std::fs::remove_file(&opts.socket_path);
	let _ = bridge_runtime::remove_pid(&pid_path);
	info!(target = "bridge.daemon", "shutdown complete");
	Ok(())
}

fn spawn_idle_ticker(state: Arc<DaemonState>, shutdown_tx: watch::Sender<bool>, shutdown_rx: watch::Receiver<bool>) {
	tokio::spawn(async move {
		let mut interval = tokio::time::interval(Duration::from_secs(1));
		loop {
			interval.tick().await;
			if *shutdown_rx.borrow() {
				break;
			}
			state.idle_timer.observe(state.sessions.len());
			if state.idle_timer.expired() {
				info!(target = "bridge.daemon", "idle timeout reached, no active sessions");
				let _ = shutdown_tx.send(true);
				break;
			}
		}
	});
}

fn spawn_signal_watcher(shutdown_tx: watch::Sender<bool>) {
	tokio::spawn(async move {
		wait_for_termination().await;
		let _ = shutdown_tx.send(true);
	});
}

#[cfg(unix)]
async fn wait_for_termination() {
	use tokio::signal::unix::{SignalKind, signal};

	let mut sigterm = match signal(SignalKind::terminate()) {
		Ok(sig) => sig,
		Err(_) => return std::future::pending().await,
	};
	tokio::select! {
		_ = tokio::signal::ctrl_c() => {}
		_ = sigterm.recv() => {}
	}
}

#[cfg(not(unix))]
async fn wait_for_termination() {
	let _ = tokio::signal::ctrl_c().await;
}
