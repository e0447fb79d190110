//! Mutual exclusion for daemon self-spawn (spec §4.4 step 2, §9 "Mutual-
//! exclusion for daemon spawn"): "Implement the 'only one spawn' rule
//! with an exclusive-create lock file next to the socket, and a polling
//! window for followers; do not use in-process locks — the competitors
//! are in different processes."

use std::fs::OpenOptions;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::{Instant, sleep};

/// An exclusively-created file. `std::fs::OpenOptions::create_new` maps
/// to `O_EXCL` on Unix and `CREATE_NEW` on Windows, so this needs no
/// platform-specific syscalls.
pub struct StartupLock {
	path: PathBuf,
	file: std::fs::File,
}

impl StartupLock {
	/// Attempts to become the one process responsible for spawning the
	/// daemon. Returns `Ok(None)` if another process already holds the
	/// lock (the caller should poll for the socket instead).
	pub fn try_acquire(path: impl Into<PathBuf>) -> io::Result<Option<Self>> {
		let path = path.into();
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent)?;
		}

		match OpenOptions::new().write(true).create_new(true).open(&path) {
			Ok(mut file) => {
				let _ = write!(file, "{}", std::process::id());
				Ok(Some(Self { path, file }))
			}
			Err(err) if err.kind() == ErrorKind::AlreadyExists => Ok(None),
			Err(err) => Err(err),
		}
	}

	/// Release the lock. Spec §4.4 step 3: "Release the lock once the
	/// socket is observed."
	pub fn release(self) -> io::Result<()> {
		drop(self.file);
		std::fs::remove_file(&self.path)
	}
}

/// Spec §4.4 step 2: "poll the socket for up to a bounded window (e.g.
/// 5 s) and retry connect." This polls for the *path's existence*; the
/// caller still has to attempt the actual connect, since a socket path
/// can exist without anything listening on it (a stale file).
pub async fn poll_until_exists(path: &Path, window: Duration, poll_interval: Duration) -> bool {
	let deadline = Instant::now() + window;
	loop {
		if path.exists() {
			return true;
		}
		if Instant::now() >= deadline {
			return false;
		}
		sleep(poll_interval).await;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn second_acquire_observes_the_first_is_held() {
		let dir = tempfile::tempdir().unwrap();
		let lock_path = dir.path().join("daemon.lock");

		let first = StartupLock::try_acquire(&lock_path).unwrap();
		assert!(first.is_some());

		let second = StartupLock::try_acquire(&lock_path).unwrap();
		assert!(second.is_none());

		first.unwrap().release().unwrap();
		assert!(!lock_path.exists());

		let third = StartupLock::try_acquire(&lock_path).unwrap();
		assert!(third.is_some());
	}

	#[tokio::test]
	async fn poll_until_exists_returns_true_once_the_file_appears() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("daemon.sock");

		let wait_path = path.clone();
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_millis(20)).await;
			std::fs::write(&wait_path, b"").unwrap();
		});

		assert!(poll_until_exists(&path, Duration::from_secs(1), Duration::from_millis(5)).await);
	}

	#[tokio::test]
	async fn poll_until_exists_times_out_if_nothing_appears() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("never.sock");
		assert!(!poll_until_exists(&path, Duration::from_millis(30), Duration::from_millis(5)).await);
	}
}
