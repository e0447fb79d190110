//! `browser-bridge`: one binary, two roles. Run with no subcommand to
//! act as the MCP Helper; run with `--daemon` to act as the Router
//! Daemon; run `daemon status`/`daemon stop` to talk to one already
//! running, without spawning anything.

mod cli;
mod commands;
mod daemon;
mod error;
mod helper;
mod logging;
mod styles;

use std::path::PathBuf;

use bridge_core::config;
use clap::Parser;

use cli::{Cli, Commands};
use error::BridgeError;

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose, cli.log_file.as_deref());

	if let Err(err) = run(cli).await {
		tracing::error!(target = "bridge.helper", error = %err, "fatal error");
		std::process::exit(err.exit_code());
	}
}

async fn run(cli: Cli) -> Result<(), BridgeError> {
	let socket_path = resolve_socket_path(cli.socket.clone())?;
	let ws_host = cli.ws_host.clone().unwrap_or_else(|| config::DEFAULT_WS_HOST.to_string());
	let ws_port = cli.ws_port.unwrap_or(config::DEFAULT_WS_PORT);

	if let Some(Commands::Daemon(args)) = cli.command {
		let pid_path = bridge_runtime::sibling(&socket_path, config::DEFAULT_PID_FILE_NAME);
		return commands::dispatch(args.action, &socket_path, &pid_path).await;
	}

	if cli.daemon {
		let opts = daemon::DaemonOptions {
			socket_path,
			ws_host,
			ws_port,
			max_sessions: config::MAX_SESSIONS,
			request_deadline: config::DEFAULT_REQUEST_DEADLINE,
			idle_shutdown: config::IDLE_SHUTDOWN,
		};
		return daemon::run(opts).await;
	}

	let opts = helper::HelperOptions { socket_path, ws_host, ws_port, request_deadline: config::DEFAULT_REQUEST_DEADLINE };
	helper::run(opts).await
}

fn resolve_socket_path(explicit: Option<PathBuf>) -> Result<PathBuf, BridgeError> {
	match explicit {
		Some(path) => Ok(path),
		None => Ok(bridge_runtime::default_socket_path(config::RUNTIME_DIR_NAME, config::DEFAULT_SOCKET_FILE_NAME)?),
	}
}
