//! Read strategies, one per [`TagKind`].
//!
//! [`ReadDispatcher::read`] never returns an error: every failure is folded
//! into [`ReadResult::Failure`] so the caller always gets a value to show.

use crate::config::EngineConfig;
use nfctap_core::constants::{BLOCKS_PER_SECTOR, MIFARE_CMD_READ, PRINTABLE_MAX, PRINTABLE_MIN};
use nfctap_core::{Error, ReadResult, Result, Tag, TagInfo, TagKind, labels};
use nfctap_hardware::RadioDevice;
use nfctap_ndef::TextRecord;
use tracing::{debug, warn};

/// Runs the read strategy matching a tag's classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadDispatcher {
    sector: u8,
    sector_key: [u8; 6],
    candidate_blocks: Vec<u8>,
}

impl ReadDispatcher {
    pub fn new(sector: u8, sector_key: [u8; 6], candidate_blocks: Vec<u8>) -> Self {
        Self {
            sector,
            sector_key,
            candidate_blocks,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.sector,
            config.sector_key,
            config.candidate_blocks.clone(),
        )
    }

    /// Read `tag` according to `kind`, talking to it through `radio`.
    ///
    /// `radio` must hold an open session on `tag`.
    pub async fn read<R: RadioDevice>(
        &self,
        kind: TagKind,
        tag: &Tag,
        radio: &mut R,
    ) -> ReadResult {
        debug!(%kind, uid = %tag.uid_hex(), "Dispatching read");

        let result = match kind {
            TagKind::Standard => first_text(tag).map(ReadResult::Text),
            TagKind::AuthenticatedSector => self.read_sector(radio).await,
            TagKind::BasicRadioFrame => Ok(self.read_frames(tag, radio).await),
            TagKind::ExtendedProtocol => Ok(ReadResult::RawInfo(extended_info(tag))),
            TagKind::Unknown => Ok(ReadResult::RawInfo(unsupported_info(tag))),
        };

        result.into()
    }

    async fn read_sector<R: RadioDevice>(&self, radio: &mut R) -> Result<ReadResult> {
        let sector = self.sector;
        let block = sector.checked_mul(BLOCKS_PER_SECTOR).ok_or_else(|| {
            Error::auth_required(sector, format!("sector {sector} is out of range"))
        })?;

        radio
            .authenticate_sector(sector, &self.sector_key)
            .await
            .map_err(|e| Error::auth_required(sector, e.to_string()))?;

        let data = radio
            .read_block(block)
            .await
            .map_err(|e| Error::auth_required(sector, format!("reading block {block}: {e}")))?;

        let text = latin1_trimmed(&data);
        if text.is_empty() {
            return Err(Error::malformed_payload(format!(
                "block {block} holds no text"
            )));
        }
        Ok(ReadResult::Text(text))
    }

    async fn read_frames<R: RadioDevice>(&self, tag: &Tag, radio: &mut R) -> ReadResult {
        if tag.has_ndef_message() {
            match first_text(tag) {
                Ok(text) => return ReadResult::Text(text),
                Err(e) => debug!("NDEF message unreadable, reading blocks: {}", e),
            }
        }

        let mut info = TagInfo::new().with(labels::UID, tag.uid_hex());
        let mut content = None;

        for &block in &self.candidate_blocks {
            match radio.transceive(&[MIFARE_CMD_READ, block]).await {
                Ok(data) => {
                    let text = printable_ascii(&data);
                    if text.is_empty() {
                        continue;
                    }
                    debug!(block, text = %text, "Block holds text");
                    info.insert(labels::block(block), text.as_str());
                    content.get_or_insert(text);
                }
                Err(e) => debug!(block, "Block read failed: {}", e),
            }
        }

        match content {
            Some(text) => info.insert(labels::CONTENT, text),
            None => warn!(uid = %tag.uid_hex(), "No readable text in candidate blocks"),
        }
        ReadResult::RawInfo(info)
    }
}

/// Decode the first record of the tag's NDEF message as text.
fn first_text(tag: &Tag) -> Result<String> {
    let record = tag
        .ndef_message
        .as_deref()
        .and_then(<[_]>::first)
        .ok_or_else(|| Error::malformed_payload("NDEF message has no records"))?;

    if !record.is_text() {
        return Err(Error::malformed_payload(format!(
            "first record is not a text record (type {:?})",
            String::from_utf8_lossy(&record.record_type)
        )));
    }

    Ok(TextRecord::decode(&record.payload)?.text)
}

fn extended_info(tag: &Tag) -> TagInfo {
    let mut info = TagInfo::new().with(labels::UID, tag.uid_hex());
    append_metadata(&mut info, tag);
    info
}

fn unsupported_info(tag: &Tag) -> TagInfo {
    let technologies = if tag.technologies.is_empty() {
        "none".to_string()
    } else {
        tag.technologies
            .iter()
            .map(|t| t.identifier())
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut info = TagInfo::new()
        .with(labels::UID, tag.uid_hex())
        .with(labels::TECHNOLOGIES, technologies);
    if let Some(type_name) = &tag.type_name {
        info.insert(labels::TYPE, type_name.as_str());
    }
    append_metadata(&mut info, tag);
    info.insert(labels::STATUS, labels::UNSUPPORTED);
    info
}

fn append_metadata(info: &mut TagInfo, tag: &Tag) {
    let metadata = &tag.metadata;
    if let Some(atqa) = &metadata.atqa {
        info.insert(labels::ATQA, hex::encode_upper(atqa));
    }
    if let Some(sak) = metadata.sak {
        info.insert(labels::SAK, format!("{sak:02X}"));
    }
    if let Some(bytes) = &metadata.historical_bytes {
        info.insert(labels::HISTORICAL_BYTES, hex::encode_upper(bytes));
    }
    if let Some(bytes) = &metadata.hi_layer_response {
        info.insert(labels::HI_LAYER_RESPONSE, hex::encode_upper(bytes));
    }
}

/// Latin-1 decode, dropping trailing bytes that are not printable.
fn latin1_trimmed(bytes: &[u8]) -> String {
    let end = bytes
        .iter()
        .rposition(|&b| is_printable_latin1(b))
        .map_or(0, |last| last + 1);
    bytes[..end].iter().map(|&b| char::from(b)).collect()
}

fn is_printable_latin1(byte: u8) -> bool {
    (PRINTABLE_MIN..=PRINTABLE_MAX).contains(&byte) || byte >= 0xA0
}

/// Keep printable ASCII only, then trim surrounding whitespace.
fn printable_ascii(bytes: &[u8]) -> String {
    let text: String = bytes
        .iter()
        .filter(|b| (PRINTABLE_MIN..=PRINTABLE_MAX).contains(*b))
        .map(|&b| char::from(b))
        .collect();
    text.trim().to_string()
}
