//! MCP Helper (spec §4.4, C4): one per editor window, speaking MCP over
//! stdio to the agent and the wire protocol to either the Router Daemon
//! or, if none can be reached, a local stand-in it runs itself.

mod daemon_link;
mod direct_link;
mod link;
mod mcp_server;

use std::path::PathBuf;
use std::time::Duration;

use bridge_core::config;
use rmcp::ServiceExt;
use rmcp::transport::stdio;
use tracing::{info, warn};

pub use link::{Mode, RouterLink};
use mcp_server::BridgeServer;

use crate::error::Result;

pub struct HelperOptions {
	pub socket_path: PathBuf,
	pub ws_host: String,
	pub ws_port: u16,
	pub request_deadline: Duration,
}

/// Startup algorithm (spec §4.4): try to connect to an already-running
/// daemon; if that fails, race to spawn one and connect to it; if that
/// also fails, fall back to acting as the daemon's stand-in for exactly
/// this one session. Whichever link wins, serve MCP over stdio until the
/// client disconnects, then shut down in order: tell the far side this
/// session is gone, abort anything still pending, and exit.
pub async fn run(opts: HelperOptions) -> Result<()> {
	let link = acquire_link(&opts).await;

	let direct_connected = match &link {
		Linked::Daemon(_) => None,
		Linked::Direct(direct) => Some(direct.connected.clone()),
	};
	let link = link.into_inner();

	let server = BridgeServer::new(link.clone(), direct_connected);
	let service = server.serve(stdio()).await.map_err(|err| bridge_core::RouterError::Io(std::io::Error::other(err)))?;

	info!(target = "bridge.helper", mode = link.mode.as_str(), "mcp helper serving over stdio");
	let reason = service.waiting().await;

	shutdown(&link, &opts).await;

	match reason {
		Ok(_) => Ok(()),
		Err(err) => {
			warn!(target = "bridge.helper", error = %err, "mcp service ended with an error");
			Ok(())
		}
	}
}

enum Linked {
	Daemon(std::sync::Arc<RouterLink>),
	Direct(direct_link::DirectLink),
}

impl Linked {
	fn into_inner(self) -> std::sync::Arc<RouterLink> {
		match self {
			Linked::Daemon(link) => link,
			Linked::Direct(direct) => direct.link,
		}
	}
}

async fn acquire_link(opts: &HelperOptions) -> Linked {
	if let Some(link) = daemon_link::try_connect(&opts.socket_path, opts.request_deadline).await {
		return Linked::Daemon(link);
	}

	let held_lock = bridge_runtime::StartupLock::try_acquire(lock_path(&opts.socket_path)).ok().flatten();
	if held_lock.is_some() {
		info!(target = "bridge.helper", "won startup lock, spawning daemon");
		let extra_args = spawn_args(opts);
		if let Err(err) = bridge_runtime::spawn_daemon("--daemon", &extra_args) {
			warn!(target = "bridge.helper", error = %err, "failed to spawn daemon");
		}
	} else {
		info!(target = "bridge.helper", "another helper is already spawning the daemon, waiting");
	}

	// The lock is held until the socket is actually observed (spec §4.4
	// step 3), not released right after spawn: releasing early lets a
	// follower win the lock and spawn a second daemon that clobbers the
	// first's still-being-created socket.
	let socket_seen = bridge_runtime::poll_until_exists(&opts.socket_path, config::STARTUP_LOCK_POLL_WINDOW, Duration::from_millis(100)).await;
	if let Some(lock) = held_lock {
		let _ = lock.release();
	}

	if socket_seen {
		if let Some(link) = daemon_link::try_connect(&opts.socket_path, opts.request_deadline).await {
			return Linked::Daemon(link);
		}
	}

	warn!(target = "bridge.helper", "no daemon reachable, falling back to direct mode");
	match direct_link::start(&opts.ws_host, opts.ws_port, opts.request_deadline).await {
		Ok(direct) => Linked::Direct(direct),
		Err(err) => {
			// Nothing left to fall back to; the caller still gets a
			// usable link, just one that will error on every call.
			warn!(target = "bridge.helper", error = %err, "direct-mode listener failed to bind");
			let (tx, _rx) = tokio::sync::mpsc::unbounded_channel::<bridge_protocol::Message>();
			Linked::Daemon(std::sync::Arc::new(RouterLink::new(Mode::Direct, None, tx, opts.request_deadline)))
		}
	}
}

fn lock_path(socket_path: &std::path::Path) -> PathBuf {
	bridge_runtime::sibling(socket_path, config::DEFAULT_LOCK_FILE_NAME)
}

fn spawn_args(opts: &HelperOptions) -> Vec<String> {
	vec![
		"--socket".to_string(),
		opts.socket_path.display().to_string(),
		"--ws-host".to_string(),
		opts.ws_host.clone(),
		"--ws-port".to_string(),
		opts.ws_port.to_string(),
	]
}

/// Shutdown (spec §4.4): tell the far side the session is gone, abort
/// whatever is still pending locally, then arm a force-exit watchdog so
/// a wedged outbound write can't keep the process alive forever.
async fn shutdown(link: &std::sync::Arc<RouterLink>, _opts: &HelperOptions) {
	link.send_disconnect();
	link.abort_pending("helper shutting down");
	tokio::time::sleep(config::FORCE_EXIT_WATCHDOG).await;
}
