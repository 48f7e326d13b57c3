//! RTD Text record payloads.
//!
//! ```text
//! +--------+------------------+----------------------+
//! | status | language (ASCII) | text (UTF-8/UTF-16)  |
//! +--------+------------------+----------------------+
//!   bit 7: UTF-16 flag
//!   bit 6: reserved, zero
//!   bits 5..0: language code length
//! ```

use nfctap_core::constants::DEFAULT_LANGUAGE;
use nfctap_core::{Error, NdefRecord, Result};

const UTF16_FLAG: u8 = 0x80;
const RESERVED_FLAG: u8 = 0x40;
const LANGUAGE_LENGTH_MASK: u8 = 0x3F;

/// Character encoding of the text portion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Utf16,
}

/// Decoded text record payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRecord {
    pub language: String,
    pub text: String,
    pub encoding: TextEncoding,
}

impl TextRecord {
    /// UTF-8 text record in the given language.
    pub fn new(text: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            text: text.into(),
            encoding: TextEncoding::Utf8,
        }
    }

    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Encode into a record payload.
    ///
    /// # Errors
    ///
    /// Returns `Error::EncodingFailed` when the language code is empty,
    /// non-ASCII or longer than 63 bytes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let language = self.language.as_bytes();
        if language.is_empty() || !self.language.is_ascii() {
            return Err(Error::encoding_failed(format!(
                "invalid language code '{}'",
                self.language
            )));
        }
        if language.len() > LANGUAGE_LENGTH_MASK as usize {
            return Err(Error::encoding_failed(format!(
                "language code is {} bytes, limit is {}",
                language.len(),
                LANGUAGE_LENGTH_MASK
            )));
        }

        let mut status = language.len() as u8;
        let body = match self.encoding {
            TextEncoding::Utf8 => self.text.as_bytes().to_vec(),
            TextEncoding::Utf16 => {
                status |= UTF16_FLAG;
                self.text
                    .encode_utf16()
                    .flat_map(|unit| unit.to_be_bytes())
                    .collect()
            }
        };

        let mut payload = Vec::with_capacity(1 + language.len() + body.len());
        payload.push(status);
        payload.extend_from_slice(language);
        payload.extend_from_slice(&body);
        Ok(payload)
    }

    /// Decode a record payload.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedPayload` if the payload is empty, the
    /// language length overruns it, or the text is not valid in the
    /// declared encoding.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let (&status, rest) = payload
            .split_first()
            .ok_or_else(|| Error::malformed_payload("text record payload is empty"))?;

        if status & RESERVED_FLAG != 0 {
            return Err(Error::malformed_payload(format!(
                "reserved bit set in status byte {status:#04x}"
            )));
        }

        let language_len = (status & LANGUAGE_LENGTH_MASK) as usize;
        if language_len > rest.len() {
            return Err(Error::malformed_payload(format!(
                "language code length {language_len} exceeds payload of {} bytes",
                rest.len()
            )));
        }
        let (language, body) = rest.split_at(language_len);
        let language = std::str::from_utf8(language)
            .map_err(|_| Error::malformed_payload("language code is not ASCII"))?
            .to_string();

        let (text, encoding) = if status & UTF16_FLAG != 0 {
            (decode_utf16(body)?, TextEncoding::Utf16)
        } else {
            let text = String::from_utf8(body.to_vec())
                .map_err(|e| Error::malformed_payload(format!("invalid UTF-8 text: {e}")))?;
            (text, TextEncoding::Utf8)
        };

        Ok(Self {
            language,
            text,
            encoding,
        })
    }
}

/// UTF-16 text, big-endian unless a byte order mark says otherwise.
fn decode_utf16(body: &[u8]) -> Result<String> {
    if body.len() % 2 != 0 {
        return Err(Error::malformed_payload(format!(
            "UTF-16 text has odd length {}",
            body.len()
        )));
    }

    let (little_endian, body) = match body {
        [0xFF, 0xFE, rest @ ..] => (true, rest),
        [0xFE, 0xFF, rest @ ..] => (false, rest),
        _ => (false, body),
    };

    let units: Vec<u16> = body
        .chunks_exact(2)
        .map(|pair| {
            let pair = [pair[0], pair[1]];
            if little_endian {
                u16::from_le_bytes(pair)
            } else {
                u16::from_be_bytes(pair)
            }
        })
        .collect();

    String::from_utf16(&units)
        .map_err(|e| Error::malformed_payload(format!("invalid UTF-16 text: {e}")))
}

/// Well-known text record in the default language, UTF-8.
pub fn text_record(text: &str) -> Result<NdefRecord> {
    let payload = TextRecord::new(text, DEFAULT_LANGUAGE).encode()?;
    Ok(NdefRecord::text(payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nfctap_core::ErrorKind;
    use rstest::rstest;

    #[test]
    fn test_encode_hello() {
        let payload = TextRecord::new("hello", "en").encode().unwrap();
        assert_eq!(payload, b"\x02enhello");
    }

    #[test]
    fn test_decode_hello() {
        let record = TextRecord::decode(b"\x02enhello").unwrap();
        assert_eq!(record.language, "en");
        assert_eq!(record.text, "hello");
        assert_eq!(record.encoding, TextEncoding::Utf8);
    }

    #[test]
    fn test_utf16_roundtrip() {
        let record = TextRecord::new("olá", "pt-BR").with_encoding(TextEncoding::Utf16);
        let payload = record.encode().unwrap();
        assert_eq!(payload[0], UTF16_FLAG | 5);
        assert_eq!(TextRecord::decode(&payload).unwrap(), record);
    }

    #[test]
    fn test_utf16_little_endian_bom() {
        let payload = [0x82, b'e', b'n', 0xFF, 0xFE, b'h', 0x00, b'i', 0x00];
        assert_eq!(TextRecord::decode(&payload).unwrap().text, "hi");
    }

    #[rstest]
    #[case::empty(&[])]
    #[case::language_overrun(&[0x05, b'e', b'n'])]
    #[case::reserved_bit(&[0x42, b'e', b'n', b'x'])]
    #[case::invalid_utf8(&[0x02, b'e', b'n', 0xC3, 0x28])]
    #[case::odd_utf16(&[0x82, b'e', b'n', 0x00])]
    fn test_decode_malformed(#[case] payload: &[u8]) {
        let error = TextRecord::decode(payload).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::MalformedPayload);
    }

    #[test]
    fn test_encode_rejects_long_language() {
        let language = "x".repeat(64);
        let error = TextRecord::new("hi", language).encode().unwrap_err();
        assert_eq!(error.kind(), ErrorKind::EncodingFailed);
    }

    #[test]
    fn test_encode_rejects_empty_language() {
        let error = TextRecord::new("hi", "").encode().unwrap_err();
        assert_eq!(error.kind(), ErrorKind::EncodingFailed);
    }

    #[test]
    fn test_text_record_is_well_known_text() {
        let record = text_record("meeting").unwrap();
        assert!(record.is_text());
        assert_eq!(record.payload, b"\x02enmeeting");
    }
}
