pub mod config;
pub mod error;
pub mod media;
pub mod relay;
pub mod session;
pub mod transport;

pub use config::*;
pub use error::*;
pub use session::{CallCommand, CallHandle, CallView, NegotiationPhase, Negotiator};
