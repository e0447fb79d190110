//! Operator conveniences (`daemon status` / `daemon stop`) that talk to
//! an already-running daemon without going through the Helper's
//! connect-or-spawn dance: these commands never spawn a daemon.

use std::path::Path;
use std::time::Duration;

use bridge_protocol::{Message, codec};
use tracing::info;

use crate::cli::DaemonAction;
use crate::error::Result;

pub async fn dispatch(action: DaemonAction, socket_path: &Path, pid_path: &Path) -> Result<()> {
	match action {
		DaemonAction::Status => status(socket_path).await,
		DaemonAction::Stop => stop(socket_path, pid_path).await,
	}
}

async fn status(socket_path: &Path) -> Result<()> {
	let Some(stream) = connect(socket_path).await else {
		println!("daemon not running");
		return Ok(());
	};

	let (read_half, mut write_half) = tokio::io::split(stream);

	use tokio::io::AsyncWriteExt;
	write_half.write_all(&codec::encode_line(&Message::Status)?).await?;

	let mut reader = bridge_core::FramedLineReader::new(read_half);
	match tokio::time::timeout(Duration::from_secs(5), reader.next_line()).await {
		Ok(Ok(Some(line))) => match codec::decode_line::<Message>(&line) {
			Ok(Message::StatusOk { extension_connected, active_sessions }) => {
				println!("daemon running: extension_connected={extension_connected} active_sessions={active_sessions}");
			}
			_ => println!("daemon running but sent an unexpected reply"),
		},
		_ => println!("daemon running but did not answer in time"),
	}

	Ok(())
}

async fn stop(socket_path: &Path, pid_path: &Path) -> Result<()> {
	if connect(socket_path).await.is_none() {
		println!("daemon not running");
		return Ok(());
	}

	let Some(pid) = bridge_runtime::read_pid(pid_path) else {
		println!("daemon socket is live but no pid file was found; cannot signal it");
		return Ok(());
	};

	bridge_runtime::terminate_daemon(pid)?;
	info!(target = "bridge.helper", pid, "sent shutdown signal to daemon");
	println!("stop signal sent to daemon (pid {pid})");
	Ok(())
}

#[cfg(unix)]
async fn connect(socket_path: &Path) -> Option<tokio::net::UnixStream> {
	tokio::net::UnixStream::connect(socket_path).await.ok()
}

#[cfg(windows)]
async fn connect(_socket_path: &Path) -> Option<tokio::net::TcpStream> {
	use bridge_core::config::WINDOWS_FALLBACK_PORT;
	tokio::net::TcpStream::connect(("127.0.0.1", WINDOWS_FALLBACK_PORT)).await.ok()
}
