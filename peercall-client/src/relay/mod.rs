mod relay_channel;

pub use relay_channel::*;
