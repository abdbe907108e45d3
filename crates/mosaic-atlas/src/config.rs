// Atlas bank sizing.

use serde::{Deserialize, Serialize};

/// Largest packed image the bank will produce per atlas.
pub const DEFAULT_MAX_ATLAS_SIZE: u32 = 2048;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankConfig {
    #[serde(default = "default_max_size")]
    pub max_width: u32,
    #[serde(default = "default_max_size")]
    pub max_height: u32,
}

fn default_max_size() -> u32 {
    DEFAULT_MAX_ATLAS_SIZE
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_ATLAS_SIZE,
            max_height: DEFAULT_MAX_ATLAS_SIZE,
        }
    }
}

impl BankConfig {
    pub fn new(max_width: u32, max_height: u32) -> Self {
        Self {
            max_width,
            max_height,
        }
    }

    /// Whether a stored entry of this size can ever be packed.
    pub fn fits(&self, width: u32, height: u32) -> bool {
        width <= self.max_width && height <= self.max_height
    }

    /// This config with both dimensions capped at `limit`, the largest
    /// texture side the backend can allocate.
    pub fn clamped(self, limit: u32) -> Self {
        Self {
            max_width: self.max_width.min(limit),
            max_height: self.max_height.min(limit),
        }
    }
}
