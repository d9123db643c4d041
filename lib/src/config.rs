use serde::{Deserialize, Serialize};

use crate::catalog::{DecodeContext, DecodeMode};

/// Settings for a decoding run. Every field has a default so a partial
/// config file is valid.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Output mode
    pub mode: DecodeMode,
    /// Radio (SIM slot) the capture was taken on
    pub radio_id: u8,
    /// Drop frames whose HDLC checksum doesn't match
    pub validate_crc: bool,
    /// Decode event reports as well as log packets
    pub decode_events: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        DecoderConfig {
            mode: DecodeMode::Text,
            radio_id: 0,
            validate_crc: true,
            decode_events: true,
        }
    }
}

impl DecoderConfig {
    pub fn context(&self) -> DecodeContext {
        DecodeContext {
            mode: self.mode,
            radio_id: self.radio_id,
        }
    }
}
