//! NDEF message byte layout.
//!
//! Each record starts with a header byte followed by length fields:
//!
//! ```text
//! header: MB ME CF SR IL TNF(3)
//! type length (1)
//! payload length (1 if SR, else 4, big-endian)
//! id length (1, only if IL)
//! type | id | payload
//! ```
//!
//! Records are written as short records when the payload fits in one
//! byte. Chunked records are not supported.

use bytes::{Buf, BufMut, BytesMut};
use nfctap_core::{Error, NdefRecord, Result, Tnf};

const FLAG_MB: u8 = 0x80;
const FLAG_ME: u8 = 0x40;
const FLAG_CF: u8 = 0x20;
const FLAG_SR: u8 = 0x10;
const FLAG_IL: u8 = 0x08;

/// Encode records into an NDEF message.
///
/// # Errors
///
/// Returns `Error::EncodingFailed` if the record list is empty or a field
/// exceeds its length encoding.
pub fn encode_message(records: &[NdefRecord]) -> Result<Vec<u8>> {
    if records.is_empty() {
        return Err(Error::encoding_failed("message has no records"));
    }

    let mut buf = BytesMut::new();
    let last = records.len() - 1;

    for (index, record) in records.iter().enumerate() {
        let type_len = u8::try_from(record.record_type.len())
            .map_err(|_| Error::encoding_failed("record type longer than 255 bytes"))?;
        let id_len = u8::try_from(record.id.len())
            .map_err(|_| Error::encoding_failed("record id longer than 255 bytes"))?;
        let payload_len = u32::try_from(record.payload.len())
            .map_err(|_| Error::encoding_failed("record payload exceeds 4 GiB"))?;
        let short = payload_len <= u8::MAX as u32;

        let mut header = record.tnf.as_u8();
        if index == 0 {
            header |= FLAG_MB;
        }
        if index == last {
            header |= FLAG_ME;
        }
        if short {
            header |= FLAG_SR;
        }
        if id_len > 0 {
            header |= FLAG_IL;
        }

        buf.put_u8(header);
        buf.put_u8(type_len);
        if short {
            buf.put_u8(payload_len as u8);
        } else {
            buf.put_u32(payload_len);
        }
        if id_len > 0 {
            buf.put_u8(id_len);
        }
        buf.put_slice(&record.record_type);
        buf.put_slice(&record.id);
        buf.put_slice(&record.payload);
    }

    Ok(buf.to_vec())
}

/// Decode an NDEF message into its records.
///
/// # Errors
///
/// Returns `Error::MalformedPayload` if the bytes are empty, truncated,
/// chunked, or not framed by MB/ME flags.
pub fn decode_message(bytes: &[u8]) -> Result<Vec<NdefRecord>> {
    if bytes.is_empty() {
        return Err(Error::malformed_payload("NDEF message is empty"));
    }

    let mut buf = bytes;
    let mut records = Vec::new();

    loop {
        let header = take_u8(&mut buf, "record header")?;
        if records.is_empty() && header & FLAG_MB == 0 {
            return Err(Error::malformed_payload(
                "first record lacks message-begin flag",
            ));
        }
        if header & FLAG_CF != 0 {
            return Err(Error::malformed_payload(
                "chunked records are not supported",
            ));
        }

        let type_len = take_u8(&mut buf, "type length")? as usize;
        let payload_len = if header & FLAG_SR != 0 {
            take_u8(&mut buf, "payload length")? as usize
        } else {
            if buf.remaining() < 4 {
                return Err(truncated("payload length"));
            }
            buf.get_u32() as usize
        };
        let id_len = if header & FLAG_IL != 0 {
            take_u8(&mut buf, "id length")? as usize
        } else {
            0
        };

        let record_type = take_bytes(&mut buf, type_len, "record type")?;
        let id = take_bytes(&mut buf, id_len, "record id")?;
        let payload = take_bytes(&mut buf, payload_len, "payload")?;

        records.push(NdefRecord {
            tnf: Tnf::from_bits(header),
            record_type,
            id,
            payload,
        });

        if header & FLAG_ME != 0 {
            break;
        }
        if !buf.has_remaining() {
            return Err(Error::malformed_payload(
                "message ends without message-end flag",
            ));
        }
    }

    if buf.has_remaining() {
        return Err(Error::malformed_payload(format!(
            "{} trailing bytes after message end",
            buf.remaining()
        )));
    }

    Ok(records)
}

fn take_u8(buf: &mut &[u8], field: &str) -> Result<u8> {
    if !buf.has_remaining() {
        return Err(truncated(field));
    }
    Ok(buf.get_u8())
}

fn take_bytes(buf: &mut &[u8], len: usize, field: &str) -> Result<Vec<u8>> {
    if buf.remaining() < len {
        return Err(truncated(field));
    }
    let mut out = vec![0u8; len];
    buf.copy_to_slice(&mut out);
    Ok(out)
}

fn truncated(field: &str) -> Error {
    Error::malformed_payload(format!("NDEF message truncated in {field}"))
}
