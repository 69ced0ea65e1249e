mod call_command;
mod call_view;
mod capability;
mod negotiation_session;
mod negotiator;
mod session_guard;

pub use call_command::*;
pub use call_view::*;
pub use capability::*;
pub use negotiation_session::*;
pub use negotiator::*;
pub use session_guard::*;
