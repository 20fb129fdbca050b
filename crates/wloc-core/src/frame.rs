//! Response framing.
//!
//! A location response is a fixed status header, a 2-byte big-endian payload
//! length and the payload itself.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::FrameError;

/// Status header the client expects in front of every location response.
pub const RESPONSE_HEADER: [u8; 8] = [0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00];

/// Largest payload the length field can describe.
pub const MAX_FRAME_PAYLOAD: usize = u16::MAX as usize;

/// Frames `payload` behind `header`.
///
/// Payloads that do not fit the length field are rejected, never truncated.
pub fn frame(header: &[u8], payload: &[u8]) -> Result<Bytes, FrameError> {
    if payload.len() > MAX_FRAME_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            len: payload.len(),
            max: MAX_FRAME_PAYLOAD,
        });
    }

    let mut buf = BytesMut::with_capacity(header.len() + 2 + payload.len());
    buf.put_slice(header);
    buf.put_u16(payload.len() as u16);
    buf.put_slice(payload);
    Ok(buf.freeze())
}

/// Frames `payload` behind [`RESPONSE_HEADER`].
pub fn frame_response(payload: &[u8]) -> Result<Bytes, FrameError> {
    frame(&RESPONSE_HEADER, payload)
}

/// Returns the payload of a framed buffer whose header is `header_len` bytes.
///
/// Trailing bytes beyond the declared length are ignored.
pub fn parse_frame(data: &[u8], header_len: usize) -> Result<&[u8], FrameError> {
    let body_at = header_len + 2;
    let Some(len_bytes) = data.get(header_len..body_at) else {
        return Err(FrameError::Truncated {
            needed: body_at,
            available: data.len(),
        });
    };
    let len = u16::from_be_bytes([len_bytes[0], len_bytes[1]]) as usize;

    data.get(body_at..body_at + len)
        .ok_or(FrameError::Truncated {
            needed: body_at + len,
            available: data.len(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_layout() {
        let framed = frame_response(b"abc").unwrap();
        assert_eq!(&framed[..8], &RESPONSE_HEADER);
        assert_eq!(&framed[8..10], &[0x00, 0x03]);
        assert_eq!(&framed[10..], b"abc");
    }

    #[test]
    fn frame_empty_payload() {
        let framed = frame(&[0xaa], &[]).unwrap();
        assert_eq!(&framed[..], &[0xaa, 0x00, 0x00]);
    }

    #[test]
    fn frame_maximum_payload() {
        let payload = vec![7u8; MAX_FRAME_PAYLOAD];
        let framed = frame_response(&payload).unwrap();
        assert_eq!(&framed[8..10], &[0xff, 0xff]);
        assert_eq!(framed.len(), 10 + MAX_FRAME_PAYLOAD);
    }

    #[test]
    fn frame_rejects_oversized_payload() {
        let payload = vec![0u8; MAX_FRAME_PAYLOAD + 1];
        assert_eq!(
            frame_response(&payload),
            Err(FrameError::PayloadTooLarge {
                len: MAX_FRAME_PAYLOAD + 1,
                max: MAX_FRAME_PAYLOAD,
            })
        );
    }

    #[test]
    fn parse_frame_returns_payload() {
        let framed = frame_response(b"payload").unwrap();
        assert_eq!(parse_frame(&framed, RESPONSE_HEADER.len()).unwrap(), b"payload");
    }

    #[test]
    fn parse_frame_detects_truncation() {
        let framed = frame_response(b"payload").unwrap();
        assert!(parse_frame(&framed[..5], 8).is_err());
        assert_eq!(
            parse_frame(&framed[..framed.len() - 1], 8),
            Err(FrameError::Truncated {
                needed: 17,
                available: 16,
            })
        );
    }
}
