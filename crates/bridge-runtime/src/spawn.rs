//! Daemon self-spawn (spec §4.4 step 3): "the Helper that won the
//! startup lock re-execs its own binary with a flag selecting Daemon
//! mode, detached from the Helper's own stdio."

use std::path::Path;
use std::process::{Command, Stdio};

/// Re-executes the current binary with `daemon_flag` appended, detached
/// from this process' stdio so the daemon outlives the Helper that
/// spawned it. stdin/stdout/stderr are redirected to `/dev/null`
/// equivalents; the daemon logs to its own file (spec §6) instead of
/// inheriting the Helper's stderr.
pub fn spawn_daemon(daemon_flag: &str, extra_args: &[String]) -> std::io::Result<()> {
	let exe = std::env::current_exe()?;
	spawn_daemon_with_exe(&exe, daemon_flag, extra_args)
}

/// Asks the daemon at `pid` to shut down gracefully: the daemon's own
/// signal watcher (`wait_for_termination`) treats SIGTERM the same as
/// Ctrl-C, running the ordered shutdown in spec §5 rather than dying
/// mid-request. Windows has no SIGTERM equivalent reachable without a
/// console attach, so there the operator has to close the daemon some
/// other way; this returns an error explaining that instead of pretending
/// to succeed.
#[cfg(unix)]
pub fn terminate_daemon(pid: u32) -> std::io::Result<()> {
	let result = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
	if result == 0 { Ok(()) } else { Err(std::io::Error::last_os_error()) }
}

#[cfg(not(unix))]
pub fn terminate_daemon(_pid: u32) -> std::io::Result<()> {
	Err(std::io::Error::other("stopping a daemon by PID is not supported on this platform; close it from its own process instead"))
}

fn spawn_daemon_with_exe(exe: &Path, daemon_flag: &str, extra_args: &[String]) -> std::io::Result<()> {
	let mut cmd = Command::new(exe);
	cmd.arg(daemon_flag)
		.args(extra_args)
		.stdin(Stdio::null())
		.stdout(Stdio::null())
		.stderr(Stdio::null());

	detach(&mut cmd);

	cmd.spawn()?;
	Ok(())
}

#[cfg(unix)]
fn detach(cmd: &mut Command) {
	use std::os::unix::process::CommandExt;
	// A fresh session so the daemon is not killed when the Helper's
	// controlling terminal (or the MCP client that spawned the Helper)
	// goes away.
	unsafe {
		cmd.pre_exec(|| {
			// A failure here (already a session leader) is harmless: the
			// daemon just keeps its current session.
			libc::setsid();
			Ok(())
		});
	}
}

#[cfg(not(unix))]
fn detach(cmd: &mut Command) {
	#[cfg(windows)]
	{
		const DETACHED_PROCESS: u32 = 0x0000_0008;
		const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
		std::os::windows::process::CommandExt::creation_flags(cmd, DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
	}
	let _ = cmd;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn spawns_a_detached_child_with_the_daemon_flag() {
		let dir = tempfile::tempdir().unwrap();
		let marker = dir.path().join("ran");

		// Stand in for "the binary" with `sh`, since we cannot re-exec
		// the test harness itself.
		#[cfg(unix)]
		{
			let script = dir.path().join("fake-exe.sh");
			std::fs::write(
				&script,
				format!("#!/bin/sh\nif [ \"$1\" = \"--daemon\" ]; then touch '{}'; fi\n", marker.display()),
			)
			.unwrap();
			use std::os::unix::fs::PermissionsExt;
			std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

			spawn_daemon_with_exe(&script, "--daemon", &[]).unwrap();
			// Give the detached child a moment to run.
			std::thread::sleep(std::time::Duration::from_millis(200));
			assert!(marker.exists());
		}
	}
}
