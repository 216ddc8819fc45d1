//! Decode configuration

use serde::{Deserialize, Serialize};

/// Switches controlling how much of a document is decoded
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// Decode channel data and compose layer images. When off, channel
    /// payloads are skipped by their declared lengths.
    pub decode_pixels: bool,
    /// Parse the descriptors inside effects and type tool blocks
    pub decode_descriptors: bool,
    /// Decode the merged composite image that follows the layer section
    pub decode_merged_image: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            decode_pixels: true,
            decode_descriptors: true,
            decode_merged_image: true,
        }
    }
}

impl DecodeOptions {
    /// Structure only: no pixel data, no descriptors
    pub fn metadata_only() -> Self {
        Self {
            decode_pixels: false,
            decode_descriptors: false,
            decode_merged_image: false,
        }
    }
}
