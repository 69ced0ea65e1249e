use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of one negotiation attempt. A new id is minted for every call
/// attempt so results belonging to a superseded attempt can be told apart.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Hash, Eq, PartialEq)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The short form is enough to follow a session through the logs.
        write!(f, "{}", &self.0.simple().to_string()[..8])
    }
}
