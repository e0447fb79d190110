//! Process lifecycle primitives for the Router Daemon's self-spawn
//! dance (spec §4.4): endpoint resolution, a cross-process startup
//! lock, a PID file, and the actual re-exec into Daemon mode.

pub mod error;
pub mod lock;
pub mod paths;
pub mod pidfile;
pub mod spawn;

pub use error::{Result, RuntimeError};
pub use lock::{StartupLock, poll_until_exists};
pub use paths::{default_runtime_dir, default_socket_path, ensure_parent_dir, sibling};
pub use pidfile::{read_pid, remove_pid, write_pid};
pub use spawn::{spawn_daemon, terminate_daemon};
