//! HTTP/2 frame codec with HPACK header blocks.
//!
//! Each direction of a connection is a separate value: [`FrameEncoder`] owns
//! the header compressor for frames we send, [`FrameDecoder`] owns the
//! decompressor for frames we receive. [`FrameCodec`] bundles the two and can
//! be [split](FrameCodec::split) so reader and writer run on different threads.
//!
//! Both halves work sans-I/O (`encode` / `process`) or against a blocking
//! `std::io` channel (`write_frame` / `read_frame`).
//!
//! Reference: RFC 7540 (HTTP/2)

use std::io::{Read, Write};

use crate::channel::{self, CancelToken};
use crate::config::CodecConfig;
use crate::error::{ConfigError, Error, ProtocolError, Result};
use crate::frame::{
    self, flags, frame_type, Decoded, Frame, FrameHeader, Payload, Priority,
    DEFAULT_MAX_FRAME_SIZE, FRAME_HEADER_LEN,
};
use crate::hpack::{HeaderCompressor, HeaderDecompressor};
use crate::table::HeaderField;

/// Serializes frames for one connection, compressing header blocks.
#[derive(Debug)]
pub struct FrameEncoder {
    compressor: HeaderCompressor,
    /// Peer's SETTINGS_MAX_FRAME_SIZE.
    max_frame_size: u32,
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameEncoder {
    pub fn new() -> Self {
        Self {
            compressor: HeaderCompressor::new(),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    pub fn with_config(config: &CodecConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            compressor: HeaderCompressor::with_max_table_size(config.encoder_table_size)?,
            max_frame_size: config.peer_max_frame_size,
        })
    }

    pub fn compressor(&self) -> &HeaderCompressor {
        &self.compressor
    }

    /// For policy changes and table resizes after the peer's SETTINGS.
    pub fn compressor_mut(&mut self) -> &mut HeaderCompressor {
        &mut self.compressor
    }

    pub fn max_frame_size(&self) -> u32 {
        self.max_frame_size
    }

    pub fn set_max_frame_size(&mut self, size: u32) -> Result<(), ConfigError> {
        crate::config::validate_frame_size(size)?;
        self.max_frame_size = size;
        Ok(())
    }

    /// Encode one frame. A HEADERS frame whose block does not fit in one
    /// frame comes out as HEADERS followed by CONTINUATION frames.
    pub fn encode(&mut self, frame: &Frame) -> Result<Vec<u8>, ProtocolError> {
        let mut dst = Vec::new();
        self.encode_into(frame, &mut dst)?;
        Ok(dst)
    }

    /// Like [`encode`](Self::encode), appending to `dst`.
    pub fn encode_into(&mut self, frame: &Frame, dst: &mut Vec<u8>) -> Result<(), ProtocolError> {
        frame::check_stream_id(frame.frame_type(), frame.stream_id)?;
        let wire_flags = frame.wire_flags();

        if let Payload::Headers {
            pad_length,
            priority,
            fields,
        } = &frame.payload
        {
            self.encode_headers(frame.stream_id, wire_flags, *pad_length, priority.as_ref(), fields, dst);
            return Ok(());
        }

        let mut payload = Vec::new();
        frame::encode_payload(&frame.payload, &mut payload);
        if payload.len() > self.max_frame_size as usize {
            return Err(ProtocolError::FrameTooLarge {
                length: payload.len(),
                max: self.max_frame_size,
            });
        }
        write_frame_bytes(frame.frame_type(), wire_flags, frame.stream_id, &payload, dst);
        Ok(())
    }

    fn encode_headers(
        &mut self,
        stream_id: u32,
        wire_flags: u8,
        pad_length: Option<u8>,
        priority: Option<&Priority>,
        fields: &[HeaderField],
        dst: &mut Vec<u8>,
    ) {
        let mut block = Vec::new();
        self.compressor.encode(fields, &mut block);

        let max = self.max_frame_size as usize;
        let overhead = frame::headers_overhead(pad_length, priority);
        let first_len = block.len().min(max.saturating_sub(overhead));
        let (first, mut rest) = block.split_at(first_len);

        let mut headers_flags = wire_flags & !flags::END_HEADERS;
        if rest.is_empty() {
            headers_flags |= flags::END_HEADERS;
        }
        let mut payload = Vec::with_capacity(overhead + first.len());
        frame::encode_headers_payload(pad_length, priority, first, &mut payload);
        write_frame_bytes(frame_type::HEADERS, headers_flags, stream_id, &payload, dst);

        let mut continuations = 0;
        while !rest.is_empty() {
            let (chunk, tail) = rest.split_at(rest.len().min(max));
            rest = tail;
            let continuation_flags = if rest.is_empty() { flags::END_HEADERS } else { 0 };
            write_frame_bytes(frame_type::CONTINUATION, continuation_flags, stream_id, chunk, dst);
            continuations += 1;
        }

        tracing::trace!(
            stream_id,
            fields = fields.len(),
            block_len = block.len(),
            continuations,
            "encoded header block"
        );
    }

    /// Encode `frame` and write it to `writer`.
    pub fn write_frame<W: Write + ?Sized>(&mut self, writer: &mut W, frame: &Frame) -> Result<()> {
        let bytes = self.encode(frame)?;
        writer.write_all(&bytes)?;
        Ok(())
    }

    /// Like [`write_frame`](Self::write_frame), giving up before encoding if
    /// `cancel` has fired. Once encoding starts the frame is written in full,
    /// since a half-sent header block would desynchronize the peer.
    pub fn write_frame_cancellable<W: Write + ?Sized>(
        &mut self,
        writer: &mut W,
        frame: &Frame,
        cancel: &CancelToken,
    ) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        self.write_frame(writer, frame)
    }
}

fn write_frame_bytes(frame_type: u8, flags: u8, stream_id: u32, payload: &[u8], dst: &mut Vec<u8>) {
    dst.reserve(FRAME_HEADER_LEN + payload.len());
    FrameHeader {
        length: payload.len() as u32,
        frame_type,
        flags,
        stream_id,
    }
    .encode(dst);
    dst.extend_from_slice(payload);
}

/// Header block waiting for CONTINUATION frames.
#[derive(Debug)]
struct PendingHeaders {
    stream_id: u32,
    flags: u8,
    pad_length: Option<u8>,
    priority: Option<Priority>,
    block: Vec<u8>,
}

/// Parses frames for one connection, decompressing header blocks.
///
/// Feed it either through [`process`](Self::process) or through
/// [`read_frame`](Self::read_frame); bytes buffered by one are not seen by
/// the other.
#[derive(Debug)]
pub struct FrameDecoder {
    decompressor: HeaderDecompressor,
    /// Buffer for incomplete frames
    buffer: Vec<u8>,
    /// Frames completed ahead of a recoverable error, not yet returned.
    ready: Vec<Frame>,
    pending: Option<PendingHeaders>,
    max_frame_size: u32,
    max_header_block_size: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        let config = CodecConfig::default();
        Self {
            decompressor: HeaderDecompressor::new(),
            buffer: Vec::new(),
            ready: Vec::new(),
            pending: None,
            max_frame_size: config.max_frame_size,
            max_header_block_size: config.max_header_block_size,
        }
    }

    pub fn with_config(config: &CodecConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut decompressor = HeaderDecompressor::with_max_table_size(config.decoder_table_size)?;
        if let Some(limit) = config.max_header_list_size {
            decompressor = decompressor.with_max_header_list_size(limit);
        }
        Ok(Self {
            decompressor,
            buffer: Vec::new(),
            ready: Vec::new(),
            pending: None,
            max_frame_size: config.max_frame_size,
            max_header_block_size: config.max_header_block_size,
        })
    }

    pub fn decompressor(&self) -> &HeaderDecompressor {
        &self.decompressor
    }

    /// For raising the table size limit after our SETTINGS are acknowledged.
    pub fn decompressor_mut(&mut self) -> &mut HeaderDecompressor {
        &mut self.decompressor
    }

    /// Octets received but not yet part of a complete frame.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// True while a HEADERS frame is waiting for its CONTINUATION frames.
    pub fn has_pending_headers(&self) -> bool {
        self.pending.is_some()
    }

    /// Process incoming data and return the frames completed by it.
    ///
    /// Partial frames stay buffered until the rest arrives. Skipped frame
    /// types and the pieces of an unfinished header block yield nothing.
    ///
    /// After an error that is not connection-fatal, frames completed before
    /// the failing one and the bytes after it are kept; the next call
    /// returns them first.
    pub fn process(&mut self, data: &[u8]) -> Result<Vec<Frame>, ProtocolError> {
        self.buffer.extend_from_slice(data);
        let buffer = std::mem::take(&mut self.buffer);
        let mut frames = std::mem::take(&mut self.ready);
        let mut pos = 0;

        while let Some(header) = FrameHeader::parse(&buffer[pos..]) {
            self.check_frame_size(&header)?;
            let end = pos + header.total_size();
            if buffer.len() < end {
                break;
            }
            match self.handle_frame(&header, &buffer[pos + FRAME_HEADER_LEN..end]) {
                Ok(Some(frame)) => frames.push(frame),
                Ok(None) => {}
                Err(err) => {
                    if !err.is_connection_fatal() {
                        // Only the failing frame is dropped.
                        self.buffer = buffer[end..].to_vec();
                        self.ready = frames;
                    }
                    return Err(err);
                }
            }
            pos = end;
        }

        self.buffer = buffer;
        self.buffer.drain(..pos);
        Ok(frames)
    }

    /// Read from `reader` until one frame is complete.
    pub fn read_frame<R: Read + ?Sized>(&mut self, reader: &mut R) -> Result<Frame> {
        self.read_frame_inner(reader, None)
    }

    /// Like [`read_frame`](Self::read_frame), returning [`Error::Cancelled`]
    /// once `cancel` fires. `reader` should have a read timeout so a blocked
    /// read gets a chance to notice.
    pub fn read_frame_cancellable<R: Read + ?Sized>(
        &mut self,
        reader: &mut R,
        cancel: &CancelToken,
    ) -> Result<Frame> {
        self.read_frame_inner(reader, Some(cancel))
    }

    fn read_frame_inner<R: Read + ?Sized>(
        &mut self,
        reader: &mut R,
        cancel: Option<&CancelToken>,
    ) -> Result<Frame> {
        loop {
            let mut head = [0u8; FRAME_HEADER_LEN];
            channel::read_full(reader, &mut head, cancel)?;
            let header = FrameHeader::from_bytes(&head);
            self.check_frame_size(&header)?;

            let mut payload = vec![0u8; header.length as usize];
            channel::read_full(reader, &mut payload, cancel)?;
            if let Some(frame) = self.handle_frame(&header, &payload)? {
                return Ok(frame);
            }
        }
    }

    fn check_frame_size(&mut self, header: &FrameHeader) -> Result<(), ProtocolError> {
        if header.length > self.max_frame_size {
            return Err(self.fail(ProtocolError::FrameTooLarge {
                length: header.length as usize,
                max: self.max_frame_size,
            }));
        }
        Ok(())
    }

    /// Parse a single frame and return it if complete
    fn handle_frame(
        &mut self,
        header: &FrameHeader,
        payload: &[u8],
    ) -> Result<Option<Frame>, ProtocolError> {
        tracing::trace!(
            frame_type = header.frame_type,
            flags = header.flags,
            stream_id = header.stream_id,
            length = header.length,
            "frame received"
        );

        if let Some(pending) = &self.pending {
            if header.frame_type != frame_type::CONTINUATION {
                let err = ProtocolError::ExpectedContinuation {
                    expected: pending.stream_id,
                    frame_type: header.frame_type,
                };
                return Err(self.fail(err));
            }
        }

        let decoded = match frame::decode_payload(header, payload) {
            Ok(decoded) => decoded,
            Err(err) => return Err(self.fail(err)),
        };
        let end_headers = header.has_flag(flags::END_HEADERS);

        match decoded {
            Decoded::Complete(payload) => Ok(Some(Frame {
                flags: header.flags,
                stream_id: header.stream_id,
                payload,
            })),
            Decoded::HeaderBlock {
                pad_length,
                priority,
                fragment,
            } => {
                let pending = PendingHeaders {
                    stream_id: header.stream_id,
                    flags: header.flags,
                    pad_length,
                    priority,
                    block: Vec::new(),
                };
                self.append_fragment(pending, fragment, end_headers)
            }
            Decoded::Continuation(fragment) => {
                let Some(pending) = self.pending.take() else {
                    return Err(self.fail(ProtocolError::UnexpectedContinuation(header.stream_id)));
                };
                if pending.stream_id != header.stream_id {
                    return Err(self.fail(ProtocolError::ContinuationStreamMismatch {
                        expected: pending.stream_id,
                        got: header.stream_id,
                    }));
                }
                self.append_fragment(pending, fragment, end_headers)
            }
            Decoded::Skipped => {
                tracing::debug!(
                    frame_type = header.frame_type,
                    stream_id = header.stream_id,
                    length = header.length,
                    "skipping frame"
                );
                Ok(None)
            }
        }
    }

    fn append_fragment(
        &mut self,
        mut pending: PendingHeaders,
        fragment: &[u8],
        end_headers: bool,
    ) -> Result<Option<Frame>, ProtocolError> {
        // Guard against unbounded header block accumulation
        let size = pending.block.len() + fragment.len();
        if size > self.max_header_block_size {
            return Err(self.fail(ProtocolError::HeaderBlockTooLarge {
                size,
                max: self.max_header_block_size,
            }));
        }
        pending.block.extend_from_slice(fragment);

        if !end_headers {
            self.pending = Some(pending);
            return Ok(None);
        }

        let fields = self.decompressor.decode(&pending.block)?;
        Ok(Some(Frame {
            flags: pending.flags | flags::END_HEADERS,
            stream_id: pending.stream_id,
            payload: Payload::Headers {
                pad_length: pending.pad_length,
                priority: pending.priority,
                fields,
            },
        }))
    }

    /// Every framing error ends the connection; make sure no later header
    /// block is decoded against a table that may have missed an update.
    fn fail(&mut self, err: ProtocolError) -> ProtocolError {
        self.pending = None;
        self.decompressor.poison();
        tracing::warn!(error = %err, "frame rejected");
        err
    }
}

/// Both directions of one connection.
#[derive(Debug, Default)]
pub struct FrameCodec {
    encoder: FrameEncoder,
    decoder: FrameDecoder,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &CodecConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            encoder: FrameEncoder::with_config(config)?,
            decoder: FrameDecoder::with_config(config)?,
        })
    }

    pub fn encoder(&mut self) -> &mut FrameEncoder {
        &mut self.encoder
    }

    pub fn decoder(&mut self) -> &mut FrameDecoder {
        &mut self.decoder
    }

    pub fn encode(&mut self, frame: &Frame) -> Result<Vec<u8>, ProtocolError> {
        self.encoder.encode(frame)
    }

    pub fn process(&mut self, data: &[u8]) -> Result<Vec<Frame>, ProtocolError> {
        self.decoder.process(data)
    }

    pub fn write_frame<W: Write + ?Sized>(&mut self, writer: &mut W, frame: &Frame) -> Result<()> {
        self.encoder.write_frame(writer, frame)
    }

    pub fn read_frame<R: Read + ?Sized>(&mut self, reader: &mut R) -> Result<Frame> {
        self.decoder.read_frame(reader)
    }

    /// Separate the send and receive halves; the two are independent.
    pub fn split(self) -> (FrameEncoder, FrameDecoder) {
        (self.encoder, self.decoder)
    }
}
