use crate::media::CapturedMedia;
use peercall_core::Role;

/// Whether this side sends video. Starts as [`Role::Receiver`]; the first
/// successful capture turns it into [`Role::Sender`] for good.
#[derive(Debug, Default)]
pub struct CapabilityRole {
    role: Role,
    media: Option<CapturedMedia>,
}

impl CapabilityRole {
    pub fn role(&self) -> Role {
        self.role
    }

    pub fn send_video(&self) -> bool {
        self.role.send_video()
    }

    pub fn captured(&self) -> Option<&CapturedMedia> {
        self.media.as_ref()
    }

    /// Store a new capture. The previous one stops once no session sends it.
    pub fn set_captured(&mut self, media: CapturedMedia) {
        self.role = Role::Sender;
        self.media = Some(media);
    }
}
