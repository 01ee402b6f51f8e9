//! Connection-scope configuration for the frame codec.

use crate::error::ConfigError;
use crate::frame::{DEFAULT_MAX_FRAME_SIZE, MAX_FRAME_SIZE_LIMIT};
use crate::table::DEFAULT_MAX_TABLE_SIZE;

/// Maximum accumulated header block size (256 KB).
/// Bounds memory when a peer floods CONTINUATION frames.
pub const MAX_HEADER_BLOCK_SIZE: usize = 256 * 1024;

/// Limits and table sizes for one connection.
///
/// The two table sizes are independent: `encoder_table_size` is the dynamic
/// table the peer lets us use for what we send (its SETTINGS_HEADER_TABLE_SIZE),
/// `decoder_table_size` is what we advertised for what we receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecConfig {
    pub encoder_table_size: usize,
    pub decoder_table_size: usize,
    /// Largest frame payload accepted from the peer.
    pub max_frame_size: u32,
    /// Largest frame payload emitted; header blocks above it are split into
    /// CONTINUATION frames.
    pub peer_max_frame_size: u32,
    pub max_header_block_size: usize,
    pub max_header_list_size: Option<usize>,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            encoder_table_size: DEFAULT_MAX_TABLE_SIZE,
            decoder_table_size: DEFAULT_MAX_TABLE_SIZE,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            peer_max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            max_header_block_size: MAX_HEADER_BLOCK_SIZE,
            max_header_list_size: None,
        }
    }
}

impl CodecConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_encoder_table_size(mut self, size: usize) -> Self {
        self.encoder_table_size = size;
        self
    }

    pub fn with_decoder_table_size(mut self, size: usize) -> Self {
        self.decoder_table_size = size;
        self
    }

    pub fn with_max_frame_size(mut self, size: u32) -> Self {
        self.max_frame_size = size;
        self
    }

    pub fn with_peer_max_frame_size(mut self, size: u32) -> Self {
        self.peer_max_frame_size = size;
        self
    }

    pub fn with_max_header_block_size(mut self, size: usize) -> Self {
        self.max_header_block_size = size;
        self
    }

    pub fn with_max_header_list_size(mut self, size: usize) -> Self {
        self.max_header_list_size = Some(size);
        self
    }

    /// Check every bound; called by the codec constructors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_table_size(self.encoder_table_size)?;
        validate_table_size(self.decoder_table_size)?;
        validate_frame_size(self.max_frame_size)?;
        validate_frame_size(self.peer_max_frame_size)?;
        if self.max_header_block_size == 0 {
            return Err(ConfigError::InvalidHeaderBlockLimit);
        }
        Ok(())
    }
}

/// Table sizes travel in a 32-bit SETTINGS value.
pub(crate) fn validate_table_size(size: usize) -> Result<(), ConfigError> {
    if u32::try_from(size).is_err() {
        return Err(ConfigError::InvalidTableSize(size));
    }
    Ok(())
}

pub(crate) fn validate_frame_size(size: u32) -> Result<(), ConfigError> {
    if !(DEFAULT_MAX_FRAME_SIZE..=MAX_FRAME_SIZE_LIMIT).contains(&size) {
        return Err(ConfigError::InvalidMaxFrameSize(size));
    }
    Ok(())
}
