//! h2-frame-codec: a synchronous HTTP/2 frame codec with HPACK
//!
//! This crate turns HTTP/2 frames into bytes and back, including the header
//! compression that HEADERS frames depend on. It has no async runtime and no
//! transport: feed it bytes (or an `std::io::Read`) and get [`Frame`] values out.
//!
//! # Features
//!
//! - **Sans-I/O Design**: `process` / `encode` work on byte slices; blocking
//!   `read_frame` / `write_frame` are provided for `std::io` channels
//! - **Complete HPACK (RFC 7541)**: static and dynamic tables with eviction,
//!   the full Huffman code, all five representations
//! - **Pluggable Compression Policy**: choose per field what gets indexed,
//!   Huffman-coded or marked never-indexed via [`EncodePolicy`]
//! - **CONTINUATION Handling**: header blocks are reassembled on receive and
//!   split on send
//! - **Deterministic Output**: SETTINGS are sent in the order given
//!
//! # Quick Start
//!
//! ```rust
//! use h2_frame_codec::{Frame, FrameCodec, HeaderField, Payload};
//!
//! let mut client = FrameCodec::new();
//! let mut server = FrameCodec::new();
//!
//! let request = Frame::headers(1, vec![
//!     HeaderField::new(":method", "GET"),
//!     HeaderField::new(":path", "/"),
//! ])
//! .end_stream();
//!
//! let bytes = client.encode(&request).unwrap();
//! let frames = server.process(&bytes).unwrap();
//!
//! match &frames[0].payload {
//!     Payload::Headers { fields, .. } => {
//!         assert_eq!(fields[0].value(), b"GET");
//!     }
//!     _ => unreachable!(),
//! }
//! assert_eq!(frames[0], request);
//! ```
//!
//! # Architecture
//!
//! Leaf modules first: [`integer`] and [`string`] literals, the [`huffman`]
//! code, the [`table`] index space, the [`hpack`] compressor/decompressor
//! pair, then [`frame`] layouts and the [`h2_codec`] that ties frames to
//! header compression.
//!
//! It does NOT provide:
//! - TCP/TLS transport or the connection preface
//! - Stream state machines, flow control or SETTINGS negotiation
//!
//! Errors that reach the caller as [`ProtocolError`] mean the connection's
//! compression state can no longer be trusted; send a GOAWAY and close.

pub mod channel;
pub mod config;
pub mod error;
pub mod frame;
pub mod h2_codec;
pub mod hpack;
pub mod huffman;
pub mod integer;
pub mod string;
pub mod table;

pub use channel::CancelToken;
pub use config::{CodecConfig, MAX_HEADER_BLOCK_SIZE};
pub use error::{ConfigError, Error, ProtocolError, Result};
pub use frame::{
    error_code, flags, frame_type, settings_id, Frame, FrameHeader, Payload, Priority,
    DEFAULT_MAX_FRAME_SIZE, FRAME_HEADER_LEN, MAX_FRAME_SIZE_LIMIT,
};
pub use h2_codec::{FrameCodec, FrameDecoder, FrameEncoder};
pub use hpack::{DefaultPolicy, EncodePolicy, HeaderCompressor, HeaderDecompressor};
pub use table::{DynamicTable, HeaderField, DEFAULT_MAX_TABLE_SIZE};
