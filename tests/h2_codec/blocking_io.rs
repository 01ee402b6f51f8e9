//! Tests for read_frame / write_frame over std::io channels

use std::io::{self, Cursor, Read};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use h2_frame_codec::{
    frame_type, CancelToken, Error, Frame, FrameCodec, FrameDecoder, FrameEncoder,
};

use super::{fields, raw_frame};

/// Returns at most `chunk` octets per read, like a congested socket.
struct ChunkedReader {
    data: Cursor<Vec<u8>>,
    chunk: usize,
}

impl Read for ChunkedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = buf.len().min(self.chunk);
        self.data.read(&mut buf[..len])
    }
}

/// Never produces data; every read times out.
struct SilentReader;

impl Read for SilentReader {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        thread::sleep(Duration::from_millis(1));
        Err(io::ErrorKind::TimedOut.into())
    }
}

fn encoded(frames: &[Frame]) -> Vec<u8> {
    let mut encoder = FrameEncoder::new();
    let mut wire = Vec::new();
    for frame in frames {
        encoder.write_frame(&mut wire, frame).unwrap();
    }
    wire
}

#[test]
fn test_read_frame_over_short_reads() {
    let frames = vec![
        Frame::headers(1, fields(&[(":method", "GET"), (":path", "/"), ("accept", "*/*")])),
        Frame::data(1, vec![7u8; 1000]).padded(16).end_stream(),
        Frame::goaway(1, 0),
    ];
    let mut reader = ChunkedReader {
        data: Cursor::new(encoded(&frames)),
        chunk: 3,
    };

    let mut decoder = FrameDecoder::new();
    for expected in &frames {
        assert_eq!(&decoder.read_frame(&mut reader).unwrap(), expected);
    }
}

#[test]
fn test_read_frame_skips_unknown_types() {
    let mut wire = raw_frame(0xee, 0, 1, b"ignored");
    wire.extend(raw_frame(frame_type::PRIORITY, 0, 1, &[0, 0, 0, 0, 1]));
    wire.extend(encoded(&[Frame::window_update(1, 10)]));

    let mut decoder = FrameDecoder::new();
    let frame = decoder.read_frame(&mut Cursor::new(wire)).unwrap();
    assert_eq!(frame, Frame::window_update(1, 10));
}

#[test]
fn test_read_frame_assembles_continuation() {
    let value = "c".repeat(30_000);
    let frame = Frame::headers(5, fields(&[("x-huge", value.as_str())])).end_stream();
    let mut reader = ChunkedReader {
        data: Cursor::new(encoded(&[frame.clone()])),
        chunk: 1000,
    };

    let mut decoder = FrameDecoder::new();
    assert_eq!(decoder.read_frame(&mut reader).unwrap(), frame);
}

#[test]
fn test_eof_mid_frame_is_io_error() {
    let mut wire = encoded(&[Frame::data(1, b"truncated".to_vec())]);
    wire.truncate(wire.len() - 3);

    let mut decoder = FrameDecoder::new();
    match decoder.read_frame(&mut Cursor::new(wire)) {
        Err(Error::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::UnexpectedEof),
        other => panic!("expected UnexpectedEof, got {other:?}"),
    }
}

#[test]
fn test_eof_before_frame_is_io_error() {
    let mut decoder = FrameDecoder::new();
    let err = decoder.read_frame(&mut Cursor::new(Vec::new())).unwrap_err();
    assert!(err.is_connection_fatal());
}

#[test]
fn test_read_frame_cancelled_from_another_thread() {
    let token = CancelToken::new();
    let (done_tx, done_rx) = mpsc::channel();

    let reader_token = token.clone();
    let handle = thread::spawn(move || {
        let mut decoder = FrameDecoder::new();
        let result = decoder.read_frame_cancellable(&mut SilentReader, &reader_token);
        done_tx.send(()).unwrap();
        result
    });

    thread::sleep(Duration::from_millis(20));
    token.cancel();
    done_rx.recv_timeout(Duration::from_secs(5)).unwrap();

    let result = handle.join().unwrap();
    assert!(matches!(result, Err(Error::Cancelled)));
}

#[test]
fn test_timeout_without_token_is_returned() {
    let mut decoder = FrameDecoder::new();
    match decoder.read_frame(&mut SilentReader) {
        Err(Error::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::TimedOut),
        other => panic!("expected TimedOut, got {other:?}"),
    }
}

#[test]
fn test_write_frame_cancelled_before_encoding() {
    let token = CancelToken::new();
    token.cancel();

    let mut encoder = FrameEncoder::new();
    let mut wire = Vec::new();
    let frame = Frame::headers(1, fields(&[("x-session", "abc")]));
    let result = encoder.write_frame_cancellable(&mut wire, &frame, &token);

    assert!(matches!(result, Err(Error::Cancelled)));
    assert!(wire.is_empty());
    assert!(encoder.compressor().table().is_empty());
}

#[test]
fn test_codec_write_then_read() {
    let mut client = FrameCodec::new();
    let mut server = FrameCodec::new();
    let frame = Frame::ping(*b"pingpong");

    let mut wire = Vec::new();
    client.write_frame(&mut wire, &frame).unwrap();
    assert_eq!(server.read_frame(&mut wire.as_slice()).unwrap(), frame);
}
