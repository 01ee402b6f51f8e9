//! Error taxonomy for the frame codec and the HPACK engine.
//!
//! Everything that can go wrong on the wire is a [`ProtocolError`]. Once one is
//! returned the header compression state of the connection can no longer be
//! trusted, so callers should send a GOAWAY with [`ProtocolError::error_code`]
//! and close. [`ConfigError`] only ever comes out of constructors.

use std::io;

use crate::frame::error_code;

/// Violations of the framing layer or of HPACK (RFC 7540 / RFC 7541).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The buffer ended in the middle of a prefix integer.
    #[error("integer continuation truncated")]
    IntegerTruncated,

    /// A prefix integer does not fit in 64 bits.
    #[error("integer overflows 64 bits")]
    IntegerOverflow,

    /// A string literal declares more octets than are available.
    #[error("string literal truncated: need {needed} octets, have {available}")]
    StringTruncated { needed: usize, available: usize },

    /// Trailing bits of a Huffman string are not an EOS prefix, or are 8+ bits long.
    #[error("invalid huffman padding")]
    InvalidHuffmanPadding,

    /// The EOS symbol appeared inside a Huffman string.
    #[error("huffman string contains EOS symbol")]
    HuffmanEos,

    /// Index 0 or an index past the end of the static and dynamic tables.
    #[error("header table index {0} out of range")]
    InvalidIndex(u64),

    /// Dynamic table size update above the limit we advertised.
    #[error("dynamic table size update to {requested} exceeds limit {limit}")]
    TableSizeExceeded { requested: u64, limit: usize },

    /// Dynamic table size update after the first header field of a block.
    #[error("dynamic table size update after a header field")]
    MisplacedSizeUpdate,

    /// The decoded header list is larger than SETTINGS_MAX_HEADER_LIST_SIZE.
    #[error("header list size {size} exceeds limit {limit}")]
    HeaderListTooLarge { size: usize, limit: usize },

    /// An earlier error left the decoder table out of sync with the peer.
    #[error("header compression state lost after an earlier error")]
    CompressionStateLost,

    /// A payload whose length is illegal for its frame type.
    #[error("{frame} frame payload length {length} is invalid")]
    InvalidFrameLength { frame: &'static str, length: usize },

    /// A frame larger than the negotiated maximum frame size.
    #[error("frame of {length} octets exceeds max frame size {max}")]
    FrameTooLarge { length: usize, max: u32 },

    /// Padding length does not fit inside the payload.
    #[error("padding length {pad_length} exceeds {frame} payload of {available} octets")]
    InvalidPadding { frame: &'static str, pad_length: u8, available: usize },

    /// A frame was sent on a stream it is not allowed on.
    #[error("{frame} frame not allowed on stream {stream_id}")]
    InvalidStreamId { frame: &'static str, stream_id: u32 },

    /// CONTINUATION for a different stream than the pending header block.
    #[error("CONTINUATION for stream {got} but pending headers on stream {expected}")]
    ContinuationStreamMismatch { expected: u32, got: u32 },

    /// CONTINUATION without a preceding HEADERS lacking END_HEADERS.
    #[error("unexpected CONTINUATION frame for stream {0}")]
    UnexpectedContinuation(u32),

    /// A frame other than CONTINUATION arrived while a header block was open.
    #[error("expected CONTINUATION for stream {expected}, got frame type {frame_type:#04x}")]
    ExpectedContinuation { expected: u32, frame_type: u8 },

    /// The accumulated header block exceeded the configured cap.
    #[error("header block too large ({size} bytes, max {max})")]
    HeaderBlockTooLarge { size: usize, max: usize },

    /// PUSH_PROMISE is never accepted; skipping it would desynchronize HPACK.
    #[error("PUSH_PROMISE received on stream {0} but server push is disabled")]
    PushPromise(u32),
}

impl ProtocolError {
    /// False only for errors raised after a header block was fully decoded:
    /// the table is still in sync and the stream alone can be reset.
    pub fn is_connection_fatal(&self) -> bool {
        !matches!(self, Self::HeaderListTooLarge { .. })
    }

    /// HTTP/2 error code to report in a GOAWAY for this error.
    pub fn error_code(&self) -> u32 {
        match self {
            Self::IntegerTruncated
            | Self::IntegerOverflow
            | Self::StringTruncated { .. }
            | Self::InvalidHuffmanPadding
            | Self::HuffmanEos
            | Self::InvalidIndex(_)
            | Self::TableSizeExceeded { .. }
            | Self::MisplacedSizeUpdate
            | Self::CompressionStateLost => error_code::COMPRESSION_ERROR,
            Self::InvalidFrameLength { .. } | Self::FrameTooLarge { .. } => {
                error_code::FRAME_SIZE_ERROR
            }
            Self::HeaderListTooLarge { .. } | Self::HeaderBlockTooLarge { .. } => {
                error_code::ENHANCE_YOUR_CALM
            }
            Self::InvalidPadding { .. }
            | Self::InvalidStreamId { .. }
            | Self::ContinuationStreamMismatch { .. }
            | Self::UnexpectedContinuation(_)
            | Self::ExpectedContinuation { .. }
            | Self::PushPromise(_) => error_code::PROTOCOL_ERROR,
        }
    }
}

/// Invalid parameters supplied when building a codec component.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("integer prefix width {0} outside 1..=8")]
    InvalidPrefix(u8),

    #[error("dynamic table size {0} exceeds {max}", max = u32::MAX)]
    InvalidTableSize(usize),

    #[error("max frame size {0} outside 16384..=16777215")]
    InvalidMaxFrameSize(u32),

    #[error("max header block size must be non-zero")]
    InvalidHeaderBlockLimit,
}

/// Top-level error returned by the frame codec.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Channel failure or a short read; the connection is unusable.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The caller's cancel token fired while waiting on the channel.
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// True when the connection must be torn down: the byte stream or the
    /// header compression state can no longer be trusted.
    pub fn is_connection_fatal(&self) -> bool {
        match self {
            Self::Io(_) => true,
            Self::Protocol(err) => err.is_connection_fatal(),
            Self::Config(_) | Self::Cancelled => false,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
