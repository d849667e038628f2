use serde::{Deserialize, Serialize};

/// Audio device configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Capture device name (None = default input device).
    #[serde(default)]
    pub selected_device: Option<String>,
}
