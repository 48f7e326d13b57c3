//! TLV blocks in NFC Forum Type 2 tag memory.
//!
//! The data area of a Type 2 tag holds a sequence of TLVs; the NDEF
//! message lives in a `0x03` TLV and the sequence ends with `0xFE`.

use nfctap_core::{Error, Result};

const TLV_NULL: u8 = 0x00;
const TLV_NDEF: u8 = 0x03;
const TLV_TERMINATOR: u8 = 0xFE;
const THREE_BYTE_LENGTH: u8 = 0xFF;

/// Wrap an NDEF message in an NDEF TLV followed by a terminator.
///
/// # Errors
///
/// Returns `Error::EncodingFailed` if the message exceeds 65534 bytes.
pub fn wrap_tlv(message: &[u8]) -> Result<Vec<u8>> {
    let len = message.len();
    let mut out = Vec::with_capacity(len + 5);
    out.push(TLV_NDEF);
    if len < THREE_BYTE_LENGTH as usize {
        out.push(len as u8);
    } else {
        let len = u16::try_from(len)
            .ok()
            .filter(|l| *l != u16::MAX)
            .ok_or_else(|| Error::encoding_failed(format!("message of {len} bytes too large")))?;
        out.push(THREE_BYTE_LENGTH);
        out.extend_from_slice(&len.to_be_bytes());
    }
    out.extend_from_slice(message);
    out.push(TLV_TERMINATOR);
    Ok(out)
}

/// Outcome of scanning a TLV area that may only be partly read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlvScan {
    /// Value of the first NDEF TLV.
    Found(Vec<u8>),
    /// A terminator TLV closed the area before any NDEF TLV.
    Terminated,
    /// The data ended between two TLVs.
    Exhausted,
    /// The data ended inside the TLV with this tag.
    Truncated { tag: u8 },
}

impl TlvScan {
    /// True when reading more memory could change the outcome.
    pub fn needs_more(&self) -> bool {
        matches!(self, Self::Exhausted | Self::Truncated { .. })
    }
}

/// Scan `memory` for the NDEF TLV.
///
/// NULL TLVs are padding and never end the scan, only the terminator does.
/// Works on a prefix of tag memory, so a reader can call it after every
/// chunk and stop once [`TlvScan::needs_more`] turns false.
pub fn scan_tlv(memory: &[u8]) -> TlvScan {
    let mut pos = 0;
    while let Some(&tag) = memory.get(pos) {
        pos += 1;
        match tag {
            TLV_NULL => continue,
            TLV_TERMINATOR => return TlvScan::Terminated,
            _ => {}
        }

        let (len, header) = match memory.get(pos) {
            Some(&THREE_BYTE_LENGTH) => match memory.get(pos + 1..pos + 3) {
                Some(&[hi, lo]) => (usize::from(u16::from_be_bytes([hi, lo])), 3),
                _ => return TlvScan::Truncated { tag },
            },
            Some(&len) => (usize::from(len), 1),
            None => return TlvScan::Truncated { tag },
        };
        pos += header;

        let Some(value) = memory.get(pos..pos + len) else {
            return TlvScan::Truncated { tag };
        };
        if tag == TLV_NDEF {
            return TlvScan::Found(value.to_vec());
        }
        pos += len;
    }
    TlvScan::Exhausted
}

/// Locate the NDEF message inside complete tag memory.
///
/// Returns `Ok(None)` when the memory ends (terminator or end of data)
/// without an NDEF TLV.
///
/// # Errors
///
/// Returns `Error::MalformedPayload` when a TLV length runs past the data.
pub fn unwrap_tlv(memory: &[u8]) -> Result<Option<Vec<u8>>> {
    match scan_tlv(memory) {
        TlvScan::Found(message) => Ok(Some(message)),
        TlvScan::Terminated | TlvScan::Exhausted => Ok(None),
        TlvScan::Truncated { tag } => Err(Error::malformed_payload(format!(
            "TLV {tag:#04x} overruns memory"
        ))),
    }
}
