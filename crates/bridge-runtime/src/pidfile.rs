//! PID file for the operator-facing `daemon status`/`daemon stop`
//! commands (spec §6 "Persisted state").

use std::fs;
use std::path::Path;

/// Writes the current process id to `path`, creating or truncating it.
pub fn write_pid(path: &Path) -> std::io::Result<()> {
	fs::write(path, std::process::id().to_string())
}

/// Reads back a PID previously written by [`write_pid`]. Returns `None`
/// if the file is absent or not a valid PID — a stale or half-written
/// file is treated the same as "no daemon running", since the socket
/// connect attempt is the real liveness check.
pub fn read_pid(path: &Path) -> Option<u32> {
	fs::read_to_string(path).ok()?.trim().parse().ok()
}

pub fn remove_pid(path: &Path) -> std::io::Result<()> {
	match fs::remove_file(path) {
		Ok(()) => Ok(()),
		Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
		Err(err) => Err(err),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_trips_a_pid() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("daemon.pid");

		write_pid(&path).unwrap();
		assert_eq!(read_pid(&path), Some(std::process::id()));

		remove_pid(&path).unwrap();
		assert_eq!(read_pid(&path), None);
	}

	#[test]
	fn garbage_contents_read_as_absent() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("daemon.pid");
		fs::write(&path, b"not-a-pid\0\0").unwrap();
		assert_eq!(read_pid(&path), None);
	}

	#[test]
	fn removing_a_missing_file_is_not_an_error() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("missing.pid");
		assert!(remove_pid(&path).is_ok());
	}
}
