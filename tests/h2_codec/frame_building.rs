//! Tests for HTTP/2 frame building and encoding

use h2_frame_codec::{
    error_code, flags, frame_type, settings_id, Frame, FrameEncoder, Payload, Priority,
};

use super::fields;

#[test]
fn test_settings_encoding_is_ordered() {
    let mut encoder = FrameEncoder::new();
    let frame = Frame::settings(vec![
        (settings_id::MAX_CONCURRENT_STREAMS, 100),
        (settings_id::INITIAL_WINDOW_SIZE, 33_554_432),
        (settings_id::ENABLE_PUSH, 0),
    ]);

    let bytes = encoder.encode(&frame).unwrap();
    assert_eq!(
        bytes,
        [
            0x00, 0x00, 0x12, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, // header
            0x00, 0x03, 0x00, 0x00, 0x00, 0x64, // MAX_CONCURRENT_STREAMS
            0x00, 0x04, 0x02, 0x00, 0x00, 0x00, // INITIAL_WINDOW_SIZE
            0x00, 0x02, 0x00, 0x00, 0x00, 0x00, // ENABLE_PUSH
        ]
    );
}

#[test]
fn test_settings_encoding_is_repeatable() {
    let frame = Frame::settings(vec![(settings_id::MAX_FRAME_SIZE, 32_768), (settings_id::HEADER_TABLE_SIZE, 0)]);
    let first = FrameEncoder::new().encode(&frame).unwrap();
    for _ in 0..8 {
        assert_eq!(FrameEncoder::new().encode(&frame).unwrap(), first);
    }
}

#[test]
fn test_settings_ack() {
    let bytes = FrameEncoder::new().encode(&Frame::settings_ack()).unwrap();
    assert_eq!(bytes, [0, 0, 0, frame_type::SETTINGS, flags::ACK, 0, 0, 0, 0]);
}

#[test]
fn test_request_headers_frame() {
    let mut encoder = FrameEncoder::new();
    let frame = Frame::headers(
        1,
        fields(&[
            (":method", "GET"),
            (":path", "/"),
            (":scheme", "https"),
            (":authority", "localhost"),
            ("user-agent", "curl/7.85.0"),
            ("accept", "*/*"),
        ]),
    )
    .end_stream();

    let bytes = encoder.encode(&frame).unwrap();
    assert_eq!(
        bytes,
        [
            0x00, 0x00, 0x1a, 0x01, 0x05, 0x00, 0x00, 0x00, 0x01, // header
            0x82, 0x84, 0x87, 0x41, 0x86, 0xa0, 0xe4, 0x1d, 0x13, 0x9d, 0x09, 0x7a, 0x88, 0x25,
            0xb6, 0x50, 0xc3, 0xab, 0xbc, 0xda, 0xe0, 0x53, 0x03, 0x2a, 0x2f, 0x2a,
        ]
    );
}

#[test]
fn test_rst_stream() {
    let bytes = FrameEncoder::new()
        .encode(&Frame::rst_stream(1, error_code::HTTP_1_1_REQUIRED))
        .unwrap();
    assert_eq!(bytes, [0, 0, 4, frame_type::RST_STREAM, 0, 0, 0, 0, 1, 0, 0, 0, 0x0d]);
}

#[test]
fn test_ping_ack() {
    let data = [0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88];
    let bytes = FrameEncoder::new().encode(&Frame::ping_ack(data)).unwrap();
    assert_eq!(bytes.len(), 17);
    assert_eq!(bytes[3], frame_type::PING);
    assert_eq!(bytes[4], flags::ACK);
    assert_eq!(&bytes[9..], &data);
}

#[test]
fn test_window_update_clears_reserved_bit() {
    let frame = Frame::window_update(7, 0x8000_8000);
    assert_eq!(frame.payload, Payload::WindowUpdate { increment: 0x8000 });

    let bytes = FrameEncoder::new().encode(&frame).unwrap();
    assert_eq!(bytes, [0, 0, 4, frame_type::WINDOW_UPDATE, 0, 0, 0, 0, 7, 0, 0, 0x80, 0]);
}

#[test]
fn test_goaway() {
    let bytes = FrameEncoder::new()
        .encode(&Frame::goaway(5, error_code::NO_ERROR))
        .unwrap();
    assert_eq!(bytes, [0, 0, 8, frame_type::GOAWAY, 0, 0, 0, 0, 0, 0, 0, 0, 5, 0, 0, 0, 0]);
}

#[test]
fn test_padded_data() {
    let frame = Frame::data(3, b"abc".to_vec()).padded(2).end_stream();
    let bytes = FrameEncoder::new().encode(&frame).unwrap();
    assert_eq!(
        bytes,
        [0, 0, 6, frame_type::DATA, flags::PADDED | flags::END_STREAM, 0, 0, 0, 3, 2, b'a', b'b', b'c', 0, 0]
    );
}

#[test]
fn test_headers_with_priority_and_padding() {
    let frame = Frame::headers(5, fields(&[(":method", "GET")]))
        .with_priority(Priority {
            exclusive: true,
            dependency: 3,
            weight: 15,
        })
        .padded(1);
    let bytes = FrameEncoder::new().encode(&frame).unwrap();
    assert_eq!(
        bytes,
        [
            0, 0, 8, frame_type::HEADERS,
            flags::END_HEADERS | flags::PADDED | flags::PRIORITY,
            0, 0, 0, 5,
            1, // pad length
            0x80, 0, 0, 3, 15, // exclusive dependency on stream 3, weight 15
            0x82, // :method GET
            0, // padding
        ]
    );
}

#[test]
fn test_frame_type_follows_payload() {
    assert_eq!(Frame::data(1, Vec::new()).frame_type(), frame_type::DATA);
    assert_eq!(Frame::headers(1, Vec::new()).frame_type(), frame_type::HEADERS);
    assert_eq!(Frame::settings_ack().frame_type(), frame_type::SETTINGS);
    assert_eq!(Frame::ping([0; 8]).frame_type(), frame_type::PING);
    assert_eq!(Frame::goaway(0, 0).frame_type(), frame_type::GOAWAY);
    assert_eq!(Frame::rst_stream(1, 0).frame_type(), frame_type::RST_STREAM);
    assert_eq!(Frame::window_update(0, 1).frame_type(), frame_type::WINDOW_UPDATE);
}

#[test]
fn test_ack_and_end_stream_accessors() {
    assert!(Frame::settings_ack().is_ack());
    assert!(!Frame::settings(Vec::new()).is_ack());
    assert!(Frame::data(1, b"x".to_vec()).end_stream().is_end_stream());
    // The same bit means ACK on PING, never END_STREAM.
    assert!(!Frame::ping_ack([0; 8]).is_end_stream());
}
