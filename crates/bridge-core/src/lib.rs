//! Session-aware multi-client request router core: the Correlation Table
//! (§4.2), the Session table and idle-shutdown arming policy (§4.3), and
//! the buffered half of the Wire Codec (§4.1). This is the part of the
//! spec shared by the daemon and (in direct-fallback mode) the helper
//! itself; both live in `bridge-cli`.

pub mod config;
pub mod correlation;
pub mod error;
pub mod framed;
pub mod session;

pub use correlation::{CorrelationOutcome, CorrelationTable};
pub use error::{Result, RouterError};
pub use framed::FramedLineReader;
pub use session::{IdleTimer, SessionRecord, SessionTable};
