//! The daemon's helper-facing listener (spec §4.3: "a Unix domain socket
//! on POSIX, a named pipe on Windows"). `tokio` has no first-class named
//! pipe story that mirrors a Unix socket's path-based bind/connect, so
//! Windows falls back to a loopback TCP port, the same substitution the
//! original CDP daemon used for its own IPC (`DAEMON_TCP_PORT`).

use std::path::Path;

#[cfg(unix)]
pub type HelperStream = tokio::net::UnixStream;
#[cfg(windows)]
pub type HelperStream = tokio::net::TcpStream;

#[cfg(unix)]
pub struct HelperListener(tokio::net::UnixListener);
#[cfg(windows)]
pub struct HelperListener(tokio::net::TcpListener);

impl HelperListener {
	#[cfg(unix)]
	pub async fn bind(socket_path: &Path) -> std::io::Result<Self> {
		if socket_path.exists() {
			std::fs::remove_file(socket_path)?;
		}
		Ok(Self(tokio::net::UnixListener::bind(socket_path)?))
	}

	#[cfg(windows)]
	pub async fn bind(socket_path: &Path) -> std::io::Result<Self> {
		use bridge_core::config::WINDOWS_FALLBACK_PORT;
		let _ = std::fs::write(socket_path, WINDOWS_FALLBACK_PORT.to_string());
		Ok(Self(tokio::net::TcpListener::bind(("127.0.0.1", WINDOWS_FALLBACK_PORT)).await?))
	}

	pub async fn accept(&self) -> std::io::Result<HelperStream> {
		#[cfg(unix)]
		{
			let (stream, _addr) = self.0.accept().await?;
			Ok(stream)
		}
		#[cfg(windows)]
		{
			let (stream, _addr) = self.0.accept().await?;
			Ok(stream)
		}
	}
}
