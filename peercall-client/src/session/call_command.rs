/// Commands from the user interface to a running negotiator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallCommand {
    /// Capture from `device_id`, or the first device when `None`.
    StartCapture { device_id: Option<String> },

    /// Create a fresh session and send an offer.
    StartCall,

    /// Resize the view to the negotiated video dimensions.
    AdjustResolution,

    Shutdown,
}
