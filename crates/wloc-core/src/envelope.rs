//! Request envelope codec.
//!
//! Wire layout, all integers big-endian:
//!
//! ```text
//! u16 version
//! u16 len | bytes   locale
//! u16 len | bytes   app identifier
//! u16 len | bytes   OS version
//! u32 function id
//! u32 len | bytes   payload
//! ```
//!
//! Decoding never indexes the buffer directly; every read is preceded by a
//! length check so malformed input yields an error instead of a panic.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::EnvelopeError;

/// Fixed bytes outside of the variable-length fields.
const FIXED_LEN: usize = 2 + 3 * 2 + 4 + 4;

/// Decoded request envelope.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestEnvelope {
    /// Protocol version.
    pub version: u16,
    /// Client locale, e.g. `en-001_001`.
    pub locale: String,
    /// Requesting app, e.g. `com.apple.locationd`.
    pub app_identifier: String,
    /// Client OS build.
    pub os_version: String,
    /// Function selector. Not interpreted, only carried through.
    pub function_id: u32,
    /// Serialized positioning message.
    pub payload: Bytes,
}

impl RequestEnvelope {
    /// Decodes an envelope from the start of `data`.
    ///
    /// Bytes after the declared payload are ignored.
    pub fn decode(data: &[u8]) -> Result<Self, EnvelopeError> {
        Self::decode_prefix(data).map(|(envelope, _)| envelope)
    }

    /// Decodes an envelope and returns it with the number of bytes consumed.
    pub fn decode_prefix(data: &[u8]) -> Result<(Self, usize), EnvelopeError> {
        let mut buf = data;

        ensure(buf, "version", 2)?;
        let version = buf.get_u16();

        let locale = read_text(&mut buf, "locale")?;
        let app_identifier = read_text(&mut buf, "app_identifier")?;
        let os_version = read_text(&mut buf, "os_version")?;

        ensure(buf, "function_id", 4)?;
        let function_id = buf.get_u32();

        ensure(buf, "payload_len", 4)?;
        let payload_len = buf.get_u32() as usize;
        ensure(buf, "payload", payload_len)?;
        let payload = buf.copy_to_bytes(payload_len);

        let consumed = data.len() - buf.remaining();
        Ok((
            Self {
                version,
                locale,
                app_identifier,
                os_version,
                function_id,
                payload,
            },
            consumed,
        ))
    }

    /// Exact number of bytes [`encode`](Self::encode) produces.
    pub fn encoded_len(&self) -> usize {
        FIXED_LEN
            + self.locale.len()
            + self.app_identifier.len()
            + self.os_version.len()
            + self.payload.len()
    }

    /// Encodes the envelope into a new buffer.
    pub fn encode(&self) -> Result<Bytes, EnvelopeError> {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode_into(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Appends the encoded envelope to `buf`.
    ///
    /// Length limits are checked before anything is written.
    pub fn encode_into(&self, buf: &mut BytesMut) -> Result<(), EnvelopeError> {
        check_len("locale", self.locale.len(), u16::MAX as usize)?;
        check_len("app_identifier", self.app_identifier.len(), u16::MAX as usize)?;
        check_len("os_version", self.os_version.len(), u16::MAX as usize)?;
        check_len("payload", self.payload.len(), u32::MAX as usize)?;

        buf.reserve(self.encoded_len());
        buf.put_u16(self.version);
        put_text(buf, &self.locale);
        put_text(buf, &self.app_identifier);
        put_text(buf, &self.os_version);
        buf.put_u32(self.function_id);
        buf.put_u32(self.payload.len() as u32);
        buf.put_slice(&self.payload);
        Ok(())
    }
}

impl std::fmt::Display for RequestEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "v{} {} {} ({}) fn={} payload={}B",
            self.version,
            self.app_identifier,
            self.os_version,
            self.locale,
            self.function_id,
            self.payload.len()
        )
    }
}

fn ensure(buf: &[u8], field: &'static str, needed: usize) -> Result<(), EnvelopeError> {
    if buf.len() < needed {
        return Err(EnvelopeError::Truncated {
            field,
            needed,
            available: buf.len(),
        });
    }
    Ok(())
}

fn read_text(buf: &mut &[u8], field: &'static str) -> Result<String, EnvelopeError> {
    ensure(buf, field, 2)?;
    let len = buf.get_u16() as usize;
    ensure(buf, field, len)?;
    let raw = buf.copy_to_bytes(len);
    String::from_utf8(raw.to_vec()).map_err(|_| EnvelopeError::InvalidText { field })
}

fn check_len(field: &'static str, len: usize, max: usize) -> Result<(), EnvelopeError> {
    if len > max {
        return Err(EnvelopeError::FieldTooLong { field, len, max });
    }
    Ok(())
}

fn put_text(buf: &mut BytesMut, text: &str) {
    buf.put_u16(text.len() as u16);
    buf.put_slice(text.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Captured `locationd` request with an empty payload and four trailing bytes.
    const CAPTURED: &str = "0001000a656e2d3030315f3030310013636f6d2e6170706c652e6c6f636174696f6e64000a32362e322e3233433535000000020000000002000000";

    fn sample() -> RequestEnvelope {
        RequestEnvelope {
            version: 1,
            locale: "en-001_001".into(),
            app_identifier: "com.apple.locationd".into(),
            os_version: "26.2.23C55".into(),
            function_id: 2,
            payload: Bytes::from_static(&[0x12, 0x03, 0x0a, 0x01, 0x61]),
        }
    }

    #[test]
    fn decode_captured_request() {
        let data = hex::decode(CAPTURED).unwrap();
        let (envelope, consumed) = RequestEnvelope::decode_prefix(&data).unwrap();

        assert_eq!(envelope.version, 1);
        assert_eq!(envelope.locale, "en-001_001");
        assert_eq!(envelope.app_identifier, "com.apple.locationd");
        assert_eq!(envelope.os_version, "26.2.23C55");
        assert_eq!(envelope.function_id, 2);
        assert!(envelope.payload.is_empty());
        assert_eq!(consumed, data.len() - 4);
    }

    #[test]
    fn round_trip() {
        let envelope = sample();
        let encoded = envelope.encode().unwrap();
        assert_eq!(encoded.len(), envelope.encoded_len());
        assert_eq!(RequestEnvelope::decode(&encoded).unwrap(), envelope);
    }

    #[test]
    fn round_trip_empty_fields() {
        let envelope = RequestEnvelope {
            version: u16::MAX,
            function_id: u32::MAX,
            ..Default::default()
        };
        let encoded = envelope.encode().unwrap();
        assert_eq!(encoded.len(), FIXED_LEN);
        assert_eq!(RequestEnvelope::decode(&encoded).unwrap(), envelope);
    }

    #[test]
    fn encode_matches_captured_bytes() {
        let data = hex::decode(CAPTURED).unwrap();
        let envelope = RequestEnvelope::decode(&data).unwrap();
        let encoded = envelope.encode().unwrap();
        assert_eq!(&encoded[..], &data[..data.len() - 4]);
    }

    #[test]
    fn every_truncation_fails() {
        let encoded = sample().encode().unwrap();
        for len in 0..encoded.len() {
            assert!(
                RequestEnvelope::decode(&encoded[..len]).is_err(),
                "prefix of {len} bytes decoded"
            );
        }
    }

    #[test]
    fn over_declared_string_reports_field() {
        // version, then locale claiming 16 bytes with only 3 present
        let data = [0x00, 0x01, 0x00, 0x10, b'e', b'n', b'-'];
        assert_eq!(
            RequestEnvelope::decode(&data),
            Err(EnvelopeError::Truncated {
                field: "locale",
                needed: 16,
                available: 3,
            })
        );
    }

    #[test]
    fn over_declared_payload_fails() {
        let mut encoded = BytesMut::from(&sample().encode().unwrap()[..]);
        let len_at = encoded.len() - 5 - 4;
        encoded[len_at..len_at + 4].copy_from_slice(&100u32.to_be_bytes());
        assert!(matches!(
            RequestEnvelope::decode(&encoded),
            Err(EnvelopeError::Truncated {
                field: "payload",
                needed: 100,
                available: 5,
            })
        ));
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let data = [0x00, 0x01, 0x00, 0x01, 0xff];
        assert_eq!(
            RequestEnvelope::decode(&data),
            Err(EnvelopeError::InvalidText { field: "locale" })
        );
    }

    #[test]
    fn oversized_text_is_rejected_on_encode() {
        let envelope = RequestEnvelope {
            locale: "x".repeat(u16::MAX as usize + 1),
            ..Default::default()
        };
        assert!(matches!(
            envelope.encode(),
            Err(EnvelopeError::FieldTooLong { field: "locale", .. })
        ));
    }

    #[test]
    fn display_summarizes() {
        let shown = sample().to_string();
        assert!(shown.contains("com.apple.locationd"));
        assert!(shown.contains("payload=5B"));
    }
}
