use crate::error::ConfigError;
use crate::media::DefaultResolution;
use crate::transport::TransportConfig;
use peercall_core::utils::DEFAULT_RELAY_URL;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// When a freshly created offer or answer is sent relative to committing it
/// as the local description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptionOrder {
    #[default]
    CommitThenSend,
    /// Send first, then commit. Matches peers that expect the description on
    /// the wire before local ICE gathering starts.
    SendThenCommit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallConfig {
    pub relay_url: String,
    pub transport: TransportConfig,
    pub default_resolutions: Vec<DefaultResolution>,
    pub description_order: DescriptionOrder,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            relay_url: DEFAULT_RELAY_URL.to_owned(),
            transport: TransportConfig::default(),
            default_resolutions: vec![DefaultResolution {
                label_prefix: "USB3.0 Capture Video".to_owned(),
                width: 1920,
                height: 1080,
            }],
            description_order: DescriptionOrder::default(),
        }
    }
}

impl CallConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}
