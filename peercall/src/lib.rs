pub use peercall_core::model::{Role, SessionId, SignalingMessage};

pub mod model {
    pub use peercall_core::model::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use peercall_client::*;
}

#[cfg(feature = "relay")]
pub mod relay {
    pub use peercall_relay::*;
}
