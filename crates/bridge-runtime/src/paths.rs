//! Endpoint/path resolution (spec §6 "Persisted state", §4.3 "a
//! host-writable path ... default lives in a user-writable runtime
//! directory").

use std::path::PathBuf;

use crate::error::{Result, RuntimeError};

/// The directory the daemon writes its socket, lock, and PID files into
/// when no explicit path is configured: a runtime directory if the OS
/// exposes one (`XDG_RUNTIME_DIR` on Linux), else a local data directory,
/// under an app-specific subdirectory.
pub fn default_runtime_dir(app_dir_name: &str) -> Result<PathBuf> {
	let base = dirs::runtime_dir().or_else(dirs::data_local_dir).ok_or(RuntimeError::NoRuntimeDir)?;
	Ok(base.join(app_dir_name))
}

pub fn default_socket_path(app_dir_name: &str, socket_file_name: &str) -> Result<PathBuf> {
	Ok(default_runtime_dir(app_dir_name)?.join(socket_file_name))
}

/// A sibling path in the same directory as `socket_path`, e.g. turning
/// `.../daemon.sock` into `.../daemon.pid`.
pub fn sibling(socket_path: &std::path::Path, file_name: &str) -> PathBuf {
	socket_path.with_file_name(file_name)
}

/// Ensures the parent directory of `path` exists, with owner-only
/// permissions on Unix (spec §4.3: "Permissions restricted to the
/// owner.").
pub fn ensure_parent_dir(path: &std::path::Path) -> std::io::Result<()> {
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent)?;
		restrict_to_owner(parent)?;
	}
	Ok(())
}

#[cfg(unix)]
fn restrict_to_owner(dir: &std::path::Path) -> std::io::Result<()> {
	use std::os::unix::fs::PermissionsExt;
	std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700))
}

#[cfg(not(unix))]
fn restrict_to_owner(_dir: &std::path::Path) -> std::io::Result<()> {
	Ok(())
}
