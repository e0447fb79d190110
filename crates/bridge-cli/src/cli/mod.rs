use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::styles::cli_styles;
use bridge_core::config;

/// One binary, two roles (spec §4.4): run with no subcommand to act as
/// the MCP Helper (one per editor window, speaking MCP over stdio), or
/// with `--daemon` to act as the Router Daemon (at most one per
/// machine, spawned automatically by whichever Helper gets there
/// first). `daemon status`/`daemon stop` are operator conveniences that
/// talk to an already-running daemon without spawning one.
#[derive(Parser, Debug)]
#[command(name = "browser-bridge")]
#[command(about = "MCP bridge between an editor-side agent and a browser extension side panel")]
#[command(version)]
#[command(styles = cli_styles())]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug/trace).
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Run as the Router Daemon instead of the MCP Helper.
	#[arg(long, global = true)]
	pub daemon: bool,

	/// Path to the daemon's Unix domain socket. Defaults to a
	/// per-user runtime directory.
	#[arg(long, env = config::ENV_DAEMON_SOCKET, global = true)]
	pub socket: Option<PathBuf>,

	/// Host the daemon's extension-facing WebSocket server binds to.
	#[arg(long, env = config::ENV_WS_HOST, global = true)]
	pub ws_host: Option<String>,

	/// Port the daemon's extension-facing WebSocket server binds to.
	#[arg(long, env = config::ENV_WS_PORT, global = true)]
	pub ws_port: Option<u16>,

	/// Append daemon logs to this file in addition to stderr.
	#[arg(long, env = config::ENV_LOG_FILE, global = true)]
	pub log_file: Option<PathBuf>,

	#[command(subcommand)]
	pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Inspect or control an already-running daemon.
	Daemon(DaemonArgs),
}

#[derive(Args, Debug, Clone)]
pub struct DaemonArgs {
	#[command(subcommand)]
	pub action: DaemonAction,
}

#[derive(Subcommand, Debug, Clone)]
pub enum DaemonAction {
	/// Report whether a daemon is running and how many sessions/helpers
	/// it currently holds.
	Status,
	/// Ask a running daemon to shut down gracefully.
	Stop,
}
