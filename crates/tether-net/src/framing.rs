//! The framed message codec for the secure channel.
//!
//! One frame on the wire is `opcode (1 byte)` + `decompressed length
//! (u32 big-endian)` + `base64(deflate(json payload))` + `0xFF`. The
//! length field is advertised for diagnostics but never validated against
//! the actual decompressed size; that quirk is part of the wire format.
//! Any failure while decoding a segment is fatal to the connection that
//! produced it.

use std::io::{Read, Write};

use base64::prelude::{Engine as _, BASE64_STANDARD};
use bytes::{Buf, BytesMut};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde_json::Value;

use tether_shared::constants::{FRAME_DELIMITER, FRAME_HEADER_LEN};
use tether_shared::error::FramingError;
use tether_shared::protocol::Message;

/// One successfully decoded frame, with the header's advertised length
/// kept around for logging.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub message: Message,
    pub advertised_len: u32,
    pub decompressed_len: usize,
}

/// Encode one message into its on-wire frame.
pub fn encode_frame(opcode: u8, payload: &Value) -> Result<Vec<u8>, FramingError> {
    let json = serde_json::to_vec(payload)?;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::fast());
    encoder.write_all(&json).map_err(FramingError::Compress)?;
    let compressed = encoder.finish().map_err(FramingError::Compress)?;

    let body = BASE64_STANDARD.encode(compressed);

    let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + body.len() + 1);
    frame.push(opcode);
    frame.extend_from_slice(&(json.len() as u32).to_be_bytes());
    frame.extend_from_slice(body.as_bytes());
    frame.push(FRAME_DELIMITER);
    Ok(frame)
}

/// Decode one delimiter-stripped segment back into a message.
pub fn decode_segment(segment: &[u8]) -> Result<DecodedFrame, FramingError> {
    if segment.len() < FRAME_HEADER_LEN {
        return Err(FramingError::Truncated {
            expected: FRAME_HEADER_LEN,
            got: segment.len(),
        });
    }

    let opcode = segment[0];
    let advertised_len = u32::from_be_bytes(
        segment[1..FRAME_HEADER_LEN]
            .try_into()
            .expect("header slice is 4 bytes"),
    );

    let compressed = BASE64_STANDARD.decode(&segment[FRAME_HEADER_LEN..])?;

    let mut json = Vec::new();
    ZlibDecoder::new(compressed.as_slice())
        .read_to_end(&mut json)
        .map_err(FramingError::Decompress)?;

    let payload: Value = serde_json::from_slice(&json)?;

    Ok(DecodedFrame {
        message: Message { opcode, payload },
        advertised_len,
        decompressed_len: json.len(),
    })
}

/// Reassembly buffer for the receive side. Bytes arrive in arbitrary
/// chunks; segments are handed out left-to-right as each delimiter
/// appears, preserving arrival order.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: BytesMut,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Pop the next complete segment (delimiter stripped), if any.
    pub fn next_segment(&mut self) -> Option<BytesMut> {
        let pos = self.buf.iter().position(|&b| b == FRAME_DELIMITER)?;
        let segment = self.buf.split_to(pos);
        self.buf.advance(1);
        Some(segment)
    }

    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tether_shared::protocol::Opcode;

    #[test]
    fn test_roundtrip() {
        let payload = json!({"challenge": "abc:123", "nested": {"n": 5}});
        let frame = encode_frame(Opcode::S2cHandshakeChallenge as u8, &payload).unwrap();
        assert_eq!(*frame.last().unwrap(), FRAME_DELIMITER);

        let decoded = decode_segment(&frame[..frame.len() - 1]).unwrap();
        assert_eq!(decoded.message.opcode, 4);
        assert_eq!(decoded.message.payload, payload);
        assert_eq!(decoded.advertised_len as usize, decoded.decompressed_len);
    }

    #[test]
    fn test_roundtrip_empty_payload() {
        let frame = encode_frame(Opcode::C2sRequestContacts as u8, &json!({})).unwrap();
        let decoded = decode_segment(&frame[..frame.len() - 1]).unwrap();
        assert_eq!(decoded.message.payload, json!({}));
        assert_eq!(decoded.advertised_len, 2); // "{}"
    }

    #[test]
    fn test_roundtrip_large_payload() {
        let text = "the quick brown fox ".repeat(4096);
        let payload = json!({"data": text});
        let frame = encode_frame(11, &payload).unwrap();
        // Compression should beat the repetitive source handily.
        assert!(frame.len() < text.len());
        let decoded = decode_segment(&frame[..frame.len() - 1]).unwrap();
        assert_eq!(decoded.message.payload, payload);
    }

    #[test]
    fn test_buffer_reassembles_across_splits() {
        let a = encode_frame(1, &json!({"key": "first"})).unwrap();
        let b = encode_frame(2, &json!({"key": "second"})).unwrap();
        let mut stream = Vec::new();
        stream.extend_from_slice(&a);
        stream.extend_from_slice(&b);

        // Feed the combined stream one byte at a time.
        let mut buffer = FrameBuffer::new();
        let mut decoded = Vec::new();
        for &byte in &stream {
            buffer.extend(&[byte]);
            while let Some(segment) = buffer.next_segment() {
                decoded.push(decode_segment(&segment).unwrap());
            }
        }

        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].message.opcode, 1);
        assert_eq!(decoded[0].message.payload, json!({"key": "first"}));
        assert_eq!(decoded[1].message.opcode, 2);
        assert_eq!(decoded[1].message.payload, json!({"key": "second"}));
        assert_eq!(buffer.pending_len(), 0);
    }

    #[test]
    fn test_buffer_handles_multiple_frames_per_chunk() {
        let a = encode_frame(8, &json!({})).unwrap();
        let b = encode_frame(10, &json!({})).unwrap();
        let mut chunk = a.clone();
        chunk.extend_from_slice(&b);

        let mut buffer = FrameBuffer::new();
        buffer.extend(&chunk);
        let first = buffer.next_segment().unwrap();
        let second = buffer.next_segment().unwrap();
        assert!(buffer.next_segment().is_none());
        assert_eq!(decode_segment(&first).unwrap().message.opcode, 8);
        assert_eq!(decode_segment(&second).unwrap().message.opcode, 10);
    }

    #[test]
    fn test_truncated_segment_rejected() {
        let err = decode_segment(&[1, 0, 0]).unwrap_err();
        assert!(matches!(err, FramingError::Truncated { got: 3, .. }));
    }

    #[test]
    fn test_corrupt_base64_rejected() {
        let mut frame = encode_frame(1, &json!({"k": "v"})).unwrap();
        frame.pop(); // drop delimiter
        frame.push(b'!'); // not in the base64 alphabet
        assert!(matches!(
            decode_segment(&frame),
            Err(FramingError::Base64(_))
        ));
    }

    #[test]
    fn test_corrupt_compression_rejected() {
        let mut frame = vec![1, 0, 0, 0, 2];
        frame.extend_from_slice(BASE64_STANDARD.encode(b"not deflate data").as_bytes());
        assert!(matches!(
            decode_segment(&frame),
            Err(FramingError::Decompress(_))
        ));
    }

    #[test]
    fn test_non_json_payload_rejected() {
        let mut compressed = ZlibEncoder::new(Vec::new(), Compression::fast());
        compressed.write_all(b"definitely not json").unwrap();
        let compressed = compressed.finish().unwrap();

        let mut frame = vec![1, 0, 0, 0, 19];
        frame.extend_from_slice(BASE64_STANDARD.encode(compressed).as_bytes());
        assert!(matches!(decode_segment(&frame), Err(FramingError::Json(_))));
    }

    #[test]
    fn test_advertised_length_not_validated() {
        // A frame whose header lies about the decompressed size still
        // decodes; the length is diagnostic only.
        let frame = encode_frame(1, &json!({"k": "v"})).unwrap();
        let mut lying = frame[..frame.len() - 1].to_vec();
        lying[1..5].copy_from_slice(&9999u32.to_be_bytes());
        let decoded = decode_segment(&lying).unwrap();
        assert_eq!(decoded.advertised_len, 9999);
        assert_eq!(decoded.message.payload, json!({"k": "v"}));
    }
}
