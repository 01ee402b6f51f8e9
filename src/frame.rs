//! HTTP/2 frame layout (RFC 7540 Section 4 and 6).
//!
//! [`Frame`] is the decoded form handed to and from callers. Its type follows
//! from the [`Payload`] variant, so a HEADERS type with a DATA payload cannot
//! be expressed. Header blocks travel as [`HeaderField`] lists; turning them
//! into bytes needs connection state and lives in [`crate::h2_codec`].

use crate::error::ProtocolError;
use crate::table::HeaderField;

/// HTTP/2 frame types (RFC 7540 Section 6)
pub mod frame_type {
    pub const DATA: u8 = 0x0;
    pub const HEADERS: u8 = 0x1;
    pub const PRIORITY: u8 = 0x2;
    pub const RST_STREAM: u8 = 0x3;
    pub const SETTINGS: u8 = 0x4;
    pub const PUSH_PROMISE: u8 = 0x5;
    pub const PING: u8 = 0x6;
    pub const GOAWAY: u8 = 0x7;
    pub const WINDOW_UPDATE: u8 = 0x8;
    pub const CONTINUATION: u8 = 0x9;
}

/// HTTP/2 frame flags
pub mod flags {
    pub const END_STREAM: u8 = 0x1;
    /// SETTINGS and PING share bit 0 with END_STREAM.
    pub const ACK: u8 = 0x1;
    pub const END_HEADERS: u8 = 0x4;
    pub const PADDED: u8 = 0x8;
    pub const PRIORITY: u8 = 0x20;
}

/// HTTP/2 SETTINGS identifiers (RFC 7540 Section 6.5.2)
pub mod settings_id {
    pub const HEADER_TABLE_SIZE: u16 = 0x1;
    pub const ENABLE_PUSH: u16 = 0x2;
    pub const MAX_CONCURRENT_STREAMS: u16 = 0x3;
    pub const INITIAL_WINDOW_SIZE: u16 = 0x4;
    pub const MAX_FRAME_SIZE: u16 = 0x5;
    pub const MAX_HEADER_LIST_SIZE: u16 = 0x6;
}

/// HTTP/2 error codes (RFC 7540 Section 7)
pub mod error_code {
    pub const NO_ERROR: u32 = 0x0;
    pub const PROTOCOL_ERROR: u32 = 0x1;
    pub const INTERNAL_ERROR: u32 = 0x2;
    pub const FLOW_CONTROL_ERROR: u32 = 0x3;
    pub const SETTINGS_TIMEOUT: u32 = 0x4;
    pub const STREAM_CLOSED: u32 = 0x5;
    pub const FRAME_SIZE_ERROR: u32 = 0x6;
    pub const REFUSED_STREAM: u32 = 0x7;
    pub const CANCEL: u32 = 0x8;
    pub const COMPRESSION_ERROR: u32 = 0x9;
    pub const CONNECT_ERROR: u32 = 0xa;
    pub const ENHANCE_YOUR_CALM: u32 = 0xb;
    pub const INADEQUATE_SECURITY: u32 = 0xc;
    pub const HTTP_1_1_REQUIRED: u32 = 0xd;
}

pub const FRAME_HEADER_LEN: usize = 9;

/// Initial SETTINGS_MAX_FRAME_SIZE, also its lowest legal value.
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 16_384;

/// Largest payload the 24-bit length field can carry.
pub const MAX_FRAME_SIZE_LIMIT: u32 = (1 << 24) - 1;

const STREAM_ID_MASK: u32 = 0x7fff_ffff;

/// A parsed HTTP/2 frame header (9 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub length: u32,      // 24 bits
    pub frame_type: u8,
    pub flags: u8,
    pub stream_id: u32,   // 31 bits (high bit reserved)
}

impl FrameHeader {
    /// Parse a 9-byte frame header
    pub fn parse(data: &[u8]) -> Option<Self> {
        let head = data.get(..FRAME_HEADER_LEN)?;
        head.try_into().ok().map(Self::from_bytes)
    }

    pub fn from_bytes(data: &[u8; FRAME_HEADER_LEN]) -> Self {
        let length = u32::from_be_bytes([0, data[0], data[1], data[2]]);
        let stream_id = u32::from_be_bytes([data[5], data[6], data[7], data[8]]) & STREAM_ID_MASK;

        Self {
            length,
            frame_type: data[3],
            flags: data[4],
            stream_id,
        }
    }

    pub fn encode(&self, dst: &mut Vec<u8>) {
        dst.extend_from_slice(&self.length.to_be_bytes()[1..]);
        dst.push(self.frame_type);
        dst.push(self.flags);
        dst.extend_from_slice(&(self.stream_id & STREAM_ID_MASK).to_be_bytes());
    }

    /// Total frame size including header
    pub fn total_size(&self) -> usize {
        FRAME_HEADER_LEN + self.length as usize
    }

    pub fn has_flag(&self, flag: u8) -> bool {
        self.flags & flag != 0
    }
}

/// Stream dependency carried by a HEADERS frame with the PRIORITY flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Priority {
    pub exclusive: bool,
    pub dependency: u32,
    /// As sent on the wire: the effective weight minus one.
    pub weight: u8,
}

/// Type-specific frame payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Data {
        pad_length: Option<u8>,
        data: Vec<u8>,
    },
    Headers {
        pad_length: Option<u8>,
        priority: Option<Priority>,
        fields: Vec<HeaderField>,
    },
    /// Parameters in the order they are sent.
    Settings { params: Vec<(u16, u32)> },
    WindowUpdate { increment: u32 },
    RstStream { error_code: u32 },
    Ping { data: [u8; 8] },
    GoAway {
        last_stream_id: u32,
        error_code: u32,
        debug_data: Vec<u8>,
    },
}

impl Payload {
    pub fn frame_type(&self) -> u8 {
        match self {
            Self::Data { .. } => frame_type::DATA,
            Self::Headers { .. } => frame_type::HEADERS,
            Self::Settings { .. } => frame_type::SETTINGS,
            Self::WindowUpdate { .. } => frame_type::WINDOW_UPDATE,
            Self::RstStream { .. } => frame_type::RST_STREAM,
            Self::Ping { .. } => frame_type::PING,
            Self::GoAway { .. } => frame_type::GOAWAY,
        }
    }
}

/// One HTTP/2 frame.
///
/// `flags` holds END_STREAM, END_HEADERS and ACK as given. PADDED and PRIORITY
/// are recomputed from the payload on encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub flags: u8,
    pub stream_id: u32,
    pub payload: Payload,
}

impl Frame {
    pub fn new(stream_id: u32, payload: Payload) -> Self {
        Self {
            flags: 0,
            stream_id,
            payload,
        }
    }

    pub fn settings(params: Vec<(u16, u32)>) -> Self {
        Self::new(0, Payload::Settings { params })
    }

    pub fn settings_ack() -> Self {
        Self {
            flags: flags::ACK,
            ..Self::settings(Vec::new())
        }
    }

    /// HEADERS frame; END_HEADERS is always set since `fields` is a whole block.
    pub fn headers(stream_id: u32, fields: Vec<HeaderField>) -> Self {
        Self {
            flags: flags::END_HEADERS,
            stream_id,
            payload: Payload::Headers {
                pad_length: None,
                priority: None,
                fields,
            },
        }
    }

    pub fn data(stream_id: u32, data: impl Into<Vec<u8>>) -> Self {
        Self::new(
            stream_id,
            Payload::Data {
                pad_length: None,
                data: data.into(),
            },
        )
    }

    pub fn window_update(stream_id: u32, increment: u32) -> Self {
        Self::new(
            stream_id,
            Payload::WindowUpdate {
                increment: increment & STREAM_ID_MASK,
            },
        )
    }

    pub fn rst_stream(stream_id: u32, error_code: u32) -> Self {
        Self::new(stream_id, Payload::RstStream { error_code })
    }

    pub fn ping(data: [u8; 8]) -> Self {
        Self::new(0, Payload::Ping { data })
    }

    pub fn ping_ack(data: [u8; 8]) -> Self {
        Self {
            flags: flags::ACK,
            ..Self::ping(data)
        }
    }

    pub fn goaway(last_stream_id: u32, error_code: u32) -> Self {
        Self::new(
            0,
            Payload::GoAway {
                last_stream_id: last_stream_id & STREAM_ID_MASK,
                error_code,
                debug_data: Vec::new(),
            },
        )
    }

    pub fn end_stream(mut self) -> Self {
        self.flags |= flags::END_STREAM;
        self
    }

    /// Pad a DATA or HEADERS frame with `pad_length` zero octets.
    /// Other frame types cannot be padded and are returned unchanged.
    pub fn padded(mut self, pad_length: u8) -> Self {
        match &mut self.payload {
            Payload::Data { pad_length: pad, .. } | Payload::Headers { pad_length: pad, .. } => {
                *pad = Some(pad_length);
                self.flags |= flags::PADDED;
            }
            _ => {}
        }
        self
    }

    /// Attach a stream dependency to a HEADERS frame.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        if let Payload::Headers { priority: slot, .. } = &mut self.payload {
            *slot = Some(priority);
            self.flags |= flags::PRIORITY;
        }
        self
    }

    pub fn frame_type(&self) -> u8 {
        self.payload.frame_type()
    }

    pub fn is_end_stream(&self) -> bool {
        matches!(self.payload, Payload::Data { .. } | Payload::Headers { .. })
            && self.flags & flags::END_STREAM != 0
    }

    pub fn is_ack(&self) -> bool {
        matches!(self.payload, Payload::Settings { .. } | Payload::Ping { .. })
            && self.flags & flags::ACK != 0
    }

    /// Flags as they go on the wire.
    pub(crate) fn wire_flags(&self) -> u8 {
        let mut wire = self.flags & !(flags::PADDED | flags::PRIORITY);
        match &self.payload {
            Payload::Data { pad_length, .. } => {
                if pad_length.is_some() {
                    wire |= flags::PADDED;
                }
            }
            Payload::Headers {
                pad_length,
                priority,
                ..
            } => {
                if pad_length.is_some() {
                    wire |= flags::PADDED;
                }
                if priority.is_some() {
                    wire |= flags::PRIORITY;
                }
            }
            _ => {}
        }
        wire
    }
}

/// Name used in error messages.
pub(crate) fn frame_name(frame_type: u8) -> &'static str {
    match frame_type {
        frame_type::DATA => "DATA",
        frame_type::HEADERS => "HEADERS",
        frame_type::PRIORITY => "PRIORITY",
        frame_type::RST_STREAM => "RST_STREAM",
        frame_type::SETTINGS => "SETTINGS",
        frame_type::PUSH_PROMISE => "PUSH_PROMISE",
        frame_type::PING => "PING",
        frame_type::GOAWAY => "GOAWAY",
        frame_type::WINDOW_UPDATE => "WINDOW_UPDATE",
        frame_type::CONTINUATION => "CONTINUATION",
        _ => "UNKNOWN",
    }
}

/// Stream-0 rules of RFC 7540 Section 6.
pub(crate) fn check_stream_id(frame_type: u8, stream_id: u32) -> Result<(), ProtocolError> {
    let connection_level = matches!(
        frame_type,
        frame_type::SETTINGS | frame_type::PING | frame_type::GOAWAY
    );
    let stream_level = matches!(
        frame_type,
        frame_type::DATA
            | frame_type::HEADERS
            | frame_type::PRIORITY
            | frame_type::RST_STREAM
            | frame_type::CONTINUATION
            | frame_type::PUSH_PROMISE
    );
    let valid = stream_id <= STREAM_ID_MASK
        && !(connection_level && stream_id != 0)
        && !(stream_level && stream_id == 0);
    if valid {
        Ok(())
    } else {
        Err(ProtocolError::InvalidStreamId {
            frame: frame_name(frame_type),
            stream_id,
        })
    }
}

/// A frame payload after type dispatch. Header block fragments stay encoded
/// until the whole block has arrived.
#[derive(Debug)]
pub(crate) enum Decoded<'a> {
    Complete(Payload),
    HeaderBlock {
        pad_length: Option<u8>,
        priority: Option<Priority>,
        fragment: &'a [u8],
    },
    Continuation(&'a [u8]),
    /// PRIORITY (once its length is checked) and unknown types.
    Skipped,
}

/// Validate and split one frame payload.
pub(crate) fn decode_payload<'a>(
    header: &FrameHeader,
    payload: &'a [u8],
) -> Result<Decoded<'a>, ProtocolError> {
    let name = frame_name(header.frame_type);
    let invalid_length = || ProtocolError::InvalidFrameLength {
        frame: name,
        length: payload.len(),
    };

    match header.frame_type {
        frame_type::DATA => {
            check_stream_id(header.frame_type, header.stream_id)?;
            let (pad_length, data) = strip_padding(name, header, payload)?;
            Ok(Decoded::Complete(Payload::Data {
                pad_length,
                data: data.to_vec(),
            }))
        }
        frame_type::HEADERS => {
            check_stream_id(header.frame_type, header.stream_id)?;
            let (pad_length, mut fragment) = strip_padding(name, header, payload)?;
            let priority = if header.has_flag(flags::PRIORITY) {
                if fragment.len() < 5 {
                    return Err(invalid_length());
                }
                let dependency =
                    u32::from_be_bytes([fragment[0], fragment[1], fragment[2], fragment[3]]);
                let priority = Priority {
                    exclusive: dependency & !STREAM_ID_MASK != 0,
                    dependency: dependency & STREAM_ID_MASK,
                    weight: fragment[4],
                };
                fragment = &fragment[5..];
                Some(priority)
            } else {
                None
            };
            Ok(Decoded::HeaderBlock {
                pad_length,
                priority,
                fragment,
            })
        }
        frame_type::CONTINUATION => {
            check_stream_id(header.frame_type, header.stream_id)?;
            Ok(Decoded::Continuation(payload))
        }
        frame_type::SETTINGS => {
            check_stream_id(header.frame_type, header.stream_id)?;
            if payload.len() % 6 != 0 || (header.has_flag(flags::ACK) && !payload.is_empty()) {
                return Err(invalid_length());
            }
            let params = payload
                .chunks_exact(6)
                .map(|entry| {
                    (
                        u16::from_be_bytes([entry[0], entry[1]]),
                        u32::from_be_bytes([entry[2], entry[3], entry[4], entry[5]]),
                    )
                })
                .collect();
            Ok(Decoded::Complete(Payload::Settings { params }))
        }
        frame_type::WINDOW_UPDATE => {
            check_stream_id(header.frame_type, header.stream_id)?;
            let bytes: [u8; 4] = payload.try_into().map_err(|_| invalid_length())?;
            Ok(Decoded::Complete(Payload::WindowUpdate {
                increment: u32::from_be_bytes(bytes) & STREAM_ID_MASK,
            }))
        }
        frame_type::RST_STREAM => {
            check_stream_id(header.frame_type, header.stream_id)?;
            let bytes: [u8; 4] = payload.try_into().map_err(|_| invalid_length())?;
            Ok(Decoded::Complete(Payload::RstStream {
                error_code: u32::from_be_bytes(bytes),
            }))
        }
        frame_type::PING => {
            check_stream_id(header.frame_type, header.stream_id)?;
            let data: [u8; 8] = payload.try_into().map_err(|_| invalid_length())?;
            Ok(Decoded::Complete(Payload::Ping { data }))
        }
        frame_type::GOAWAY => {
            check_stream_id(header.frame_type, header.stream_id)?;
            if payload.len() < 8 {
                return Err(invalid_length());
            }
            Ok(Decoded::Complete(Payload::GoAway {
                last_stream_id: u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]])
                    & STREAM_ID_MASK,
                error_code: u32::from_be_bytes([payload[4], payload[5], payload[6], payload[7]]),
                debug_data: payload[8..].to_vec(),
            }))
        }
        frame_type::PRIORITY => {
            check_stream_id(header.frame_type, header.stream_id)?;
            if payload.len() != 5 {
                return Err(invalid_length());
            }
            Ok(Decoded::Skipped)
        }
        frame_type::PUSH_PROMISE => Err(ProtocolError::PushPromise(header.stream_id)),
        _ => Ok(Decoded::Skipped),
    }
}

/// Split off the pad length octet and exactly `pad_length` trailing octets.
fn strip_padding<'a>(
    name: &'static str,
    header: &FrameHeader,
    payload: &'a [u8],
) -> Result<(Option<u8>, &'a [u8]), ProtocolError> {
    if !header.has_flag(flags::PADDED) {
        return Ok((None, payload));
    }
    let (&pad_length, rest) = payload.split_first().ok_or(ProtocolError::InvalidFrameLength {
        frame: name,
        length: 0,
    })?;
    let body_len = rest
        .len()
        .checked_sub(pad_length as usize)
        .ok_or(ProtocolError::InvalidPadding {
            frame: name,
            pad_length,
            available: rest.len(),
        })?;
    Ok((Some(pad_length), &rest[..body_len]))
}

/// Append the payload of any frame except HEADERS, whose block needs the
/// header compressor and is written by [`encode_headers_payload`].
pub(crate) fn encode_payload(payload: &Payload, dst: &mut Vec<u8>) {
    match payload {
        Payload::Data { pad_length, data } => {
            write_padded(*pad_length, dst, |dst| dst.extend_from_slice(data));
        }
        Payload::Headers { .. } => {}
        Payload::Settings { params } => {
            for &(id, value) in params {
                dst.extend_from_slice(&id.to_be_bytes());
                dst.extend_from_slice(&value.to_be_bytes());
            }
        }
        Payload::WindowUpdate { increment } => {
            dst.extend_from_slice(&(increment & STREAM_ID_MASK).to_be_bytes());
        }
        Payload::RstStream { error_code } => dst.extend_from_slice(&error_code.to_be_bytes()),
        Payload::Ping { data } => dst.extend_from_slice(data),
        Payload::GoAway {
            last_stream_id,
            error_code,
            debug_data,
        } => {
            dst.extend_from_slice(&(last_stream_id & STREAM_ID_MASK).to_be_bytes());
            dst.extend_from_slice(&error_code.to_be_bytes());
            dst.extend_from_slice(debug_data);
        }
    }
}

/// Octets a HEADERS frame spends on padding and priority around its fragment.
pub(crate) fn headers_overhead(pad_length: Option<u8>, priority: Option<&Priority>) -> usize {
    pad_length.map_or(0, |pad| 1 + pad as usize) + priority.map_or(0, |_| 5)
}

/// Append a HEADERS payload carrying `fragment`.
pub(crate) fn encode_headers_payload(
    pad_length: Option<u8>,
    priority: Option<&Priority>,
    fragment: &[u8],
    dst: &mut Vec<u8>,
) {
    write_padded(pad_length, dst, |dst| {
        if let Some(priority) = priority {
            let mut dependency = priority.dependency & STREAM_ID_MASK;
            if priority.exclusive {
                dependency |= !STREAM_ID_MASK;
            }
            dst.extend_from_slice(&dependency.to_be_bytes());
            dst.push(priority.weight);
        }
        dst.extend_from_slice(fragment);
    });
}

fn write_padded(pad_length: Option<u8>, dst: &mut Vec<u8>, body: impl FnOnce(&mut Vec<u8>)) {
    match pad_length {
        Some(pad) => {
            dst.push(pad);
            body(dst);
            dst.resize(dst.len() + pad as usize, 0);
        }
        None => body(dst),
    }
}
