mod capture;
mod ivf_library;
mod remote_stream;
mod synthetic;
pub mod vp8;

pub use capture::*;
pub use ivf_library::*;
pub use remote_stream::*;
pub use synthetic::*;
