use thiserror::Error;

pub type Result<T> = std::result::Result<T, BridgeError>;

#[derive(Debug, Error)]
pub enum BridgeError {
	#[error(transparent)]
	Router(#[from] bridge_core::RouterError),

	#[error(transparent)]
	Runtime(#[from] bridge_runtime::RuntimeError),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),

	#[error(transparent)]
	Anyhow(#[from] anyhow::Error),
}

impl BridgeError {
	/// Exit code per the helper/daemon CLI contract: every failure this
	/// binary can report is a generic process failure, distinguished
	/// only by the message on stderr. There is no per-error-code exit
	/// status contract the way the old CDP command surface had one,
	/// since nothing outside this process parses this binary's exit code
	/// beyond zero/non-zero.
	pub fn exit_code(&self) -> i32 {
		1
	}
}
