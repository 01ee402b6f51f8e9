//! Tests for HPACK decoding

use h2_frame_codec::{HeaderDecompressor, ProtocolError};

use super::fields;

#[test]
fn test_decode_indexed_header() {
    let mut decoder = HeaderDecompressor::new();

    // 0x82 = indexed header, index 2 = :method: GET
    let headers = decoder.decode(&[0x82]).unwrap();
    assert_eq!(headers, fields(&[(":method", "GET")]));
}

#[test]
fn test_decode_multiple_indexed_headers() {
    let mut decoder = HeaderDecompressor::new();

    // 0x82 = :method: GET, 0x86 = :scheme: http, 0x84 = :path: /
    let headers = decoder.decode(&[0x82, 0x86, 0x84]).unwrap();
    assert_eq!(headers, fields(&[(":method", "GET"), (":scheme", "http"), (":path", "/")]));
}

#[test]
fn test_decode_literal_with_indexing() {
    let mut decoder = HeaderDecompressor::new();

    let data = [
        0x40, // Literal with indexing, new name
        0x06, // Name length: 6
        b'c', b'u', b's', b't', b'o', b'm',
        0x05, // Value length: 5
        b'v', b'a', b'l', b'u', b'e',
    ];

    let headers = decoder.decode(&data).unwrap();
    assert_eq!(headers, fields(&[("custom", "value")]));
    assert_eq!(decoder.table().size(), 6 + 5 + 32);

    // The new entry is now index 62.
    assert_eq!(decoder.decode(&[0xbe]).unwrap(), fields(&[("custom", "value")]));
}

#[test]
fn test_decode_literal_indexed_name() {
    let mut decoder = HeaderDecompressor::new();

    let data = [
        0x41, // Literal with indexing, name index 1
        0x0B, // Value length: 11
        b'e', b'x', b'a', b'm', b'p', b'l', b'e', b'.', b'c', b'o', b'm',
    ];

    let headers = decoder.decode(&data).unwrap();
    assert_eq!(headers, fields(&[(":authority", "example.com")]));
}

#[test]
fn test_decode_nginx_response() {
    let mut decoder = HeaderDecompressor::new();
    let block = [
        0x88, 0x76, 0x89, 0xaa, 0x63, 0x55, 0xe5, 0x80, 0xae, 0x26, 0x97, 0x07, 0x61, 0x96, 0xc3,
        0x61, 0xbe, 0x94, 0x13, 0x2a, 0x68, 0x1f, 0xa5, 0x04, 0x01, 0x36, 0xa0, 0x5c, 0xb8, 0x11,
        0x5c, 0x64, 0x4a, 0x62, 0xd1, 0xbf, 0x5f, 0x87, 0x49, 0x7c, 0xa5, 0x89, 0xd3, 0x4d, 0x1f,
        0x5c, 0x04, 0x38, 0x34, 0x37, 0x34, 0x6c, 0x96, 0xd0, 0x7a, 0xbe, 0x94, 0x13, 0xca, 0x68,
        0x1d, 0x8a, 0x08, 0x02, 0x12, 0x81, 0x7e, 0xe3, 0x4e, 0x5c, 0x69, 0xe5, 0x31, 0x68, 0xdf,
        0x00, 0x83, 0x2a, 0x47, 0x37, 0x8c, 0xfe, 0x5c, 0x13, 0x42, 0x08, 0x06, 0xf2, 0xc2, 0x08,
        0x47, 0xfc, 0xff, 0x00, 0x89, 0x19, 0x08, 0x5a, 0xd2, 0xb5, 0x83, 0xaa, 0x62, 0xa3, 0x84,
        0x8f, 0xd2, 0x4a, 0x8f,
    ];

    let headers = decoder.decode(&block).unwrap();
    assert_eq!(
        headers,
        fields(&[
            (":status", "200"),
            ("server", "nginx/1.24.0"),
            ("date", "Fri, 23 May 2025 16:12:32 GMT"),
            ("content-type", "text/html"),
            ("content-length", "8474"),
            ("last-modified", "Mon, 28 Mar 2022 19:46:48 GMT"),
            ("etag", "\"624210a8-211a\""),
            ("accept-ranges", "bytes"),
        ])
    );

    // Five incrementally indexed fields, newest first.
    let table = decoder.table();
    assert_eq!(table.len(), 5);
    assert_eq!(table.size(), 292);
    assert_eq!(table.get(1).unwrap().name(), b"last-modified");
    assert_eq!(table.get(5).unwrap().value(), b"nginx/1.24.0");
}

#[test]
fn test_rfc7541_c4_requests_with_huffman() {
    let mut decoder = HeaderDecompressor::new();

    // C.4.1
    let first = [
        0x82, 0x86, 0x84, 0x41, 0x8c, 0xf1, 0xe3, 0xc2, 0xe5, 0xf2, 0x3a, 0x6b, 0xa0, 0xab, 0x90,
        0xf4, 0xff,
    ];
    assert_eq!(
        decoder.decode(&first).unwrap(),
        fields(&[
            (":method", "GET"),
            (":scheme", "http"),
            (":path", "/"),
            (":authority", "www.example.com"),
        ])
    );

    // C.4.2
    let second = [0x82, 0x86, 0x84, 0xbe, 0x58, 0x86, 0xa8, 0xeb, 0x10, 0x64, 0x9c, 0xbf];
    assert_eq!(
        decoder.decode(&second).unwrap(),
        fields(&[
            (":method", "GET"),
            (":scheme", "http"),
            (":path", "/"),
            (":authority", "www.example.com"),
            ("cache-control", "no-cache"),
        ])
    );

    // C.4.3
    let third = [
        0x82, 0x87, 0x85, 0xbf, 0x40, 0x88, 0x25, 0xa8, 0x49, 0xe9, 0x5b, 0xa9, 0x7d, 0x7f, 0x89,
        0x25, 0xa8, 0x49, 0xe9, 0x5b, 0xb8, 0xe8, 0xb4, 0xbf,
    ];
    assert_eq!(
        decoder.decode(&third).unwrap(),
        fields(&[
            (":method", "GET"),
            (":scheme", "https"),
            (":path", "/index.html"),
            (":authority", "www.example.com"),
            ("custom-key", "custom-value"),
        ])
    );
    assert_eq!(decoder.table().size(), 164);
}

#[test]
fn test_rfc7541_c6_eviction() {
    // C.6: responses with Huffman coding and a 256-octet table.
    let mut decoder = HeaderDecompressor::with_max_table_size(256).unwrap();

    // Announce the 256-octet table the RFC example assumes.
    let mut first = vec![0x3f, 0xe1, 0x01];
    first.extend_from_slice(&[
        0x48, 0x82, 0x64, 0x02, 0x58, 0x85, 0xae, 0xc3, 0x77, 0x1a, 0x4b, 0x61, 0x96, 0xd0, 0x7a,
        0xbe, 0x94, 0x10, 0x54, 0xd4, 0x44, 0xa8, 0x20, 0x05, 0x95, 0x04, 0x0b, 0x81, 0x66, 0xe0,
        0x82, 0xa6, 0x2d, 0x1b, 0xff, 0x6e, 0x91, 0x9d, 0x29, 0xad, 0x17, 0x18, 0x63, 0xc7, 0x8f,
        0x0b, 0x97, 0xc8, 0xe9, 0xae, 0x82, 0xae, 0x43, 0xd3,
    ]);
    assert_eq!(
        decoder.decode(&first).unwrap(),
        fields(&[
            (":status", "302"),
            ("cache-control", "private"),
            ("date", "Mon, 21 Oct 2013 20:13:21 GMT"),
            ("location", "https://www.example.com"),
        ])
    );
    assert_eq!(decoder.table().size(), 222);

    // C.6.2: inserting ":status 307" evicts ":status 302".
    let second = [0x48, 0x83, 0x64, 0x0e, 0xff, 0xc1, 0xc0, 0xbf];
    assert_eq!(
        decoder.decode(&second).unwrap(),
        fields(&[
            (":status", "307"),
            ("cache-control", "private"),
            ("date", "Mon, 21 Oct 2013 20:13:21 GMT"),
            ("location", "https://www.example.com"),
        ])
    );
    assert_eq!(decoder.table().size(), 222);
    assert_eq!(decoder.table().len(), 4);
    assert_eq!(decoder.table().get(1).unwrap().value(), b"307");
}

#[test]
fn test_decode_empty_block() {
    let mut decoder = HeaderDecompressor::new();
    assert!(decoder.decode(&[]).unwrap().is_empty());
}

#[test]
fn test_truncated_integer_is_error() {
    let mut decoder = HeaderDecompressor::new();
    // Indexed field with a continuation octet that never ends.
    assert_eq!(decoder.decode(&[0xff, 0x80]), Err(ProtocolError::IntegerTruncated));
}

#[test]
fn test_invalid_huffman_padding_is_error() {
    let mut decoder = HeaderDecompressor::new();
    // :path with a one-octet Huffman value whose padding is not all ones.
    assert_eq!(decoder.decode(&[0x04, 0x81, 0x00]), Err(ProtocolError::InvalidHuffmanPadding));
    assert!(decoder.is_poisoned());
}

#[test]
fn test_never_indexed_literal_not_stored() {
    let mut decoder = HeaderDecompressor::new();
    // 0x10: never indexed, new name
    let mut data = vec![0x10, 0x08];
    data.extend_from_slice(b"password");
    data.push(0x06);
    data.extend_from_slice(b"secret");

    assert_eq!(decoder.decode(&data).unwrap(), fields(&[("password", "secret")]));
    assert!(decoder.table().is_empty());
}
