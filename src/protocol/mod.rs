//! Evaluation protocol: wire messages, session state and the per-attempt
//! state machine.

pub mod machine;
pub mod messages;
pub mod state;

pub use machine::{dispatch_envelope, Attempt};
pub use messages::{AudioMessage, ConfigMessage, EnvelopeData, EnvelopeStatus, ServerEnvelope};
pub use state::{Session, SessionState};
