//! Named defaults for everything spec §12/§6 says must be configurable.
//! Every value here is overridable by a CLI flag or environment variable
//! in `bridge-cli`; nothing here is duplicated as a literal at a call site.

use std::time::Duration;

/// Spec §4.3: "if active-session count >= a configured cap (e.g. 100)".
pub const MAX_SESSIONS: usize = 100;

/// Spec §4.3 / §5: default deadline for a pending REQUEST.
pub const DEFAULT_REQUEST_DEADLINE: Duration = Duration::from_secs(30);

/// Spec §4.3: "An idle timer (e.g. 60 s) fires whenever the active-session
/// count drops to zero".
pub const IDLE_SHUTDOWN: Duration = Duration::from_secs(60);

/// Spec §4.4 step 2: "poll the socket for up to a bounded window (e.g. 5 s)".
pub const STARTUP_LOCK_POLL_WINDOW: Duration = Duration::from_secs(5);

/// Spec §4.4 Shutdown: "A force-exit watchdog (e.g. 5 s)".
pub const FORCE_EXIT_WATCHDOG: Duration = Duration::from_secs(5);

/// Spec §4.3/§6: extension WebSocket uplink default.
pub const DEFAULT_WS_HOST: &str = "127.0.0.1";
pub const DEFAULT_WS_PORT: u16 = 3026;

/// Env vars spec §6 says implementations "should honor".
pub const ENV_DAEMON_SOCKET: &str = "BROWSER_AGENT_DAEMON_SOCKET";
pub const ENV_WS_HOST: &str = "BROWSER_AGENT_WS_HOST";
pub const ENV_WS_PORT: &str = "BROWSER_AGENT_WS_PORT";
pub const ENV_LOG_FILE: &str = "BROWSER_AGENT_LOG_FILE";

/// Default socket file name, joined onto a runtime/data-local directory
/// chosen by `bridge-runtime`.
pub const DEFAULT_SOCKET_FILE_NAME: &str = "daemon.sock";
pub const DEFAULT_PID_FILE_NAME: &str = "daemon.pid";
pub const DEFAULT_LOCK_FILE_NAME: &str = "daemon.lock";
pub const RUNTIME_DIR_NAME: &str = "browser-bridge";

/// Windows has no first-class named-pipe story that mirrors a Unix
/// socket's path-based bind/connect from `tokio`, so the Helper<->Daemon
/// IPC hop falls back to a loopback TCP port there; both the daemon's
/// listener and the helper's connector need the same port.
#[cfg(windows)]
pub const WINDOWS_FALLBACK_PORT: u16 = 19_522;
