use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Initializes `tracing` with stderr-only output, never stdout: the
/// Helper's stdout is the MCP stdio transport, and any stray log line
/// there would corrupt the framing the client expects.
///
/// Default verbosity (`0`) logs errors only; `-v` raises `bridge_cli` to
/// info and `-vv` to debug/trace across the whole workspace. A
/// `BROWSER_AGENT_LOG_FILE` path, if set, additionally mirrors output to
/// a file — useful for the Daemon, which otherwise has no attached
/// terminal once it has detached from the Helper that spawned it.
pub fn init_logging(verbosity: u8, log_file: Option<&std::path::Path>) {
	let filter = match verbosity {
		0 => "error",
		1 => "info,bridge_cli=debug",
		_ => "debug,bridge_cli=trace",
	};

	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
	let stderr = std::io::stderr.with_max_level(tracing::Level::TRACE);

	let builder = tracing_subscriber::fmt().with_env_filter(env_filter).with_target(true).with_level(true).compact();

	match log_file.and_then(|path| std::fs::OpenOptions::new().create(true).append(true).open(path).ok()) {
		Some(file) => {
			let file_writer = move || file.try_clone().expect("log file handle is clonable");
			builder.with_writer(stderr.and(file_writer)).init()
		}
		None => builder.with_writer(stderr).init(),
	}
}
