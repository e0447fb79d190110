use thiserror::Error;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
	#[error("no writable runtime directory available on this system")]
	NoRuntimeDir,

	#[error("startup lock at {path} is already held")]
	LockHeld { path: std::path::PathBuf },

	#[error(transparent)]
	Io(#[from] std::io::Error),
}
