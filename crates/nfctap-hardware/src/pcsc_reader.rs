//! PC/SC contactless reader backend.
//! Can be enabled by turning the `hardware-pcsc` feature on.
//!
//! Talks to ACR122U-class readers through the PC/SC part 3 pseudo-APDUs:
//!
//! | APDU | Purpose |
//! |------|---------|
//! | `FF CA 00 00 00` | Get UID |
//! | `FF 82 00 00 06 <key>` | Load key into slot 0 |
//! | `FF 86 00 00 05 01 00 <block> 60 00` | General authenticate, key A |
//! | `FF B0 00 <block> 10` | Read binary (16 bytes) |
//! | `FF D6 00 <block> <len> <data>` | Update binary |
//! | `FF 00 00 00 <len> D4 42 <frame>` | Direct transmit (InCommunicateThru) |
//!
//! The tag's technologies are derived from the ATR the reader synthesizes
//! for contactless cards.

use std::ffi::CString;
use std::time::Duration;

use pcsc::{Attribute, Card, Context, Disposition, MAX_BUFFER_SIZE, Protocols, Scope, ShareMode};
use tracing::{debug, info};

use crate::{HardwareError, ReaderInfo, Result, traits::RadioDevice};
use nfctap_core::constants::{
    BLOCK_SIZE, BLOCKS_PER_SECTOR, MIFARE_CMD_AUTH_A, MIFARE_CMD_READ, MIFARE_CMD_WRITE,
};
use nfctap_core::{Tag, Technology};
use nfctap_ndef::TlvScan;

/// How often the reader is polled for a card.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// First user page of a Type 2 tag.
const TYPE2_FIRST_DATA_PAGE: u8 = 4;

/// Page holding the Type 2 capability container.
const TYPE2_CC_PAGE: u8 = 3;

/// NDEF magic number in the capability container.
const TYPE2_NDEF_MAGIC: u8 = 0xE1;

/// Bytes per Type 2 page.
const TYPE2_PAGE_SIZE: usize = 4;

/// Upper bound of pages scanned for the NDEF TLV.
const TYPE2_MAX_PAGES: u8 = 64;

/// Card family encoded in a PC/SC storage-card ATR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CardFamily {
    MifareClassic,
    MifareUltralight,
    IsoDep,
}

/// PC/SC contactless reader.
///
/// Card polling runs on the blocking thread pool. APDU exchanges with a
/// connected card run on the calling task and hold it for one reader round
/// trip each.
pub struct PcscRadio {
    ctx: Context,
    reader: CString,
    card: Option<Card>,
    family: Option<CardFamily>,
    tag: Option<Tag>,
}

impl std::fmt::Debug for PcscRadio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PcscRadio")
            .field("reader", &self.reader)
            .field("connected", &self.card.is_some())
            .field("family", &self.family)
            .finish()
    }
}

impl PcscRadio {
    /// Establishes a PC/SC context in user scope and picks the first reader.
    ///
    /// # Errors
    ///
    /// Returns an error if the PC/SC service is unavailable or no reader is
    /// attached.
    pub fn open() -> Result<Self> {
        let ctx = Context::establish(Scope::User)?;

        let mut buf = [0u8; 2048];
        let reader = ctx
            .list_readers(&mut buf)?
            .next()
            .ok_or_else(|| HardwareError::disconnected("no PC/SC reader found"))?
            .to_owned();

        debug!("Using reader: {}", reader.to_string_lossy());

        Ok(Self {
            ctx,
            reader,
            card: None,
            family: None,
            tag: None,
        })
    }

    fn card(&self) -> Result<&Card> {
        self.card.as_ref().ok_or(HardwareError::TagLost)
    }

    /// Transmits an APDU and strips a `90 00` status word.
    fn apdu(&self, tx: &[u8]) -> Result<Vec<u8>> {
        debug!("TX: {}", hex::encode(tx));

        let mut rx = [0u8; MAX_BUFFER_SIZE];
        let rx = self.card()?.transmit(tx, &mut rx)?;

        debug!("RX: {}", hex::encode(rx));

        match rx {
            [data @ .., 0x90, 0x00] => Ok(data.to_vec()),
            [.., sw1, sw2] => Err(HardwareError::communication(format!(
                "status word {sw1:02X}{sw2:02X}"
            ))),
            _ => Err(HardwareError::invalid_data(
                "response shorter than a status word",
            )),
        }
    }

    fn read_binary(&self, block: u8) -> Result<Vec<u8>> {
        self.apdu(&[0xFF, 0xB0, 0x00, block, BLOCK_SIZE as u8])
    }

    fn update_binary(&self, block: u8, data: &[u8]) -> Result<()> {
        let mut tx = vec![0xFF, 0xD6, 0x00, block, data.len() as u8];
        tx.extend_from_slice(data);
        self.apdu(&tx).map(|_| ())
    }

    fn authenticate_block(&self, block: u8, key: &[u8; 6]) -> Result<()> {
        let mut load = vec![0xFF, 0x82, 0x00, 0x00, 0x06];
        load.extend_from_slice(key);
        self.apdu(&load)?;

        self.apdu(&[0xFF, 0x86, 0x00, 0x00, 0x05, 0x01, 0x00, block, 0x60, 0x00])
            .map(|_| ())
            .map_err(|_| HardwareError::authentication_failed(block / BLOCKS_PER_SECTOR))
    }

    /// InCommunicateThru for frames without a pseudo-APDU equivalent.
    fn direct_transmit(&self, frame: &[u8]) -> Result<Vec<u8>> {
        let len = u8::try_from(frame.len() + 2)
            .map_err(|_| HardwareError::invalid_data("frame too long for direct transmit"))?;
        let mut tx = vec![0xFF, 0x00, 0x00, 0x00, len, 0xD4, 0x42];
        tx.extend_from_slice(frame);

        match self.apdu(&tx)?.as_slice() {
            [0xD5, 0x43, 0x00, data @ ..] => Ok(data.to_vec()),
            [0xD5, 0x43, status, ..] => Err(HardwareError::communication(format!(
                "tag returned error {status:02X}"
            ))),
            _ => Err(HardwareError::invalid_data(
                "unexpected direct transmit response",
            )),
        }
    }

    /// Builds the tag snapshot for the connected card.
    fn snapshot(&self) -> Result<(Tag, CardFamily)> {
        let uid = self.apdu(&[0xFF, 0xCA, 0x00, 0x00, 0x00])?;
        let atr = self.card()?.get_attribute_owned(Attribute::AtrString)?;
        let family = card_family(&atr);

        let mut builder = Tag::builder(uid).technology(Technology::NfcA);
        builder = match family {
            CardFamily::MifareClassic => builder
                .technology(Technology::MifareClassic)
                .sak(0x08)
                .type_name("MIFARE Classic"),
            CardFamily::MifareUltralight => builder
                .technology(Technology::MifareUltralight)
                .sak(0x00)
                .type_name("NFC Forum Type 2"),
            CardFamily::IsoDep => builder
                .technology(Technology::IsoDep)
                .historical_bytes(historical_bytes(&atr))
                .type_name("ISO 14443-4"),
        };

        if family == CardFamily::MifareUltralight
            && let Some(records) = self.read_type2_ndef()?
        {
            builder = builder.ndef_message(records);
        }

        Ok((builder.build(), family))
    }

    /// Reads the NDEF message from Type 2 memory, if formatted.
    fn read_type2_ndef(&self) -> Result<Option<Vec<nfctap_core::NdefRecord>>> {
        let cc = self.read_binary(TYPE2_CC_PAGE)?;
        let &[magic, _, size, ..] = cc.as_slice() else {
            return Err(HardwareError::invalid_data("short capability container"));
        };
        if magic != TYPE2_NDEF_MAGIC {
            return Ok(None);
        }

        let scan = scan_type2_memory(type2_data_area(size), |page| self.read_binary(page))?;
        match scan {
            TlvScan::Found(message) if message.is_empty() => Ok(Some(Vec::new())),
            TlvScan::Found(message) => nfctap_ndef::decode_message(&message)
                .map(Some)
                .map_err(|e| HardwareError::invalid_data(e.to_string())),
            TlvScan::Terminated | TlvScan::Exhausted => Ok(None),
            TlvScan::Truncated { tag } => Err(HardwareError::invalid_data(format!(
                "TLV {tag:#04x} runs past the data area"
            ))),
        }
    }
}

impl RadioDevice for PcscRadio {
    async fn is_supported(&self) -> Result<bool> {
        Ok(true)
    }

    async fn is_enabled(&self) -> Result<bool> {
        Ok(self.ctx.is_valid().is_ok())
    }

    async fn request_technology(&mut self, technologies: &[Technology]) -> Result<Technology> {
        if self.card.is_some() {
            return Err(HardwareError::Busy);
        }

        debug!("Waiting for a card");

        loop {
            let ctx = self.ctx.clone();
            let reader = self.reader.clone();
            let connected = tokio::task::spawn_blocking(move || {
                ctx.connect(&reader, ShareMode::Shared, Protocols::ANY)
            })
            .await
            .map_err(|e| HardwareError::communication(format!("connect task failed: {e}")))?;

            match connected {
                Ok(card) => {
                    self.card = Some(card);
                    let (tag, family) = match self.snapshot() {
                        Ok(snapshot) => snapshot,
                        Err(e) => {
                            debug!("Could not identify card: {}", e);
                            self.cancel_technology_request();
                            tokio::time::sleep(POLL_INTERVAL).await;
                            continue;
                        }
                    };

                    if let Some(tech) = technologies.iter().find(|t| tag.has_technology(t)) {
                        info!("Connected to card {} via {}", tag.uid_hex(), tech);
                        let tech = tech.clone();
                        self.family = Some(family);
                        self.tag = Some(tag);
                        return Ok(tech);
                    }

                    debug!(
                        "Ignoring card {} without a requested technology",
                        tag.uid_hex()
                    );
                    self.cancel_technology_request();
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
                Err(pcsc::Error::NoSmartcard) | Err(pcsc::Error::RemovedCard) => {
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
                Err(e) => return Err(HardwareError::Pcsc(e)),
            }
        }
    }

    fn cancel_technology_request(&mut self) {
        if let Some(card) = self.card.take()
            && let Err((_, e)) = card.disconnect(Disposition::LeaveCard)
        {
            debug!("Error disconnecting card: {}", e);
        }
        self.family = None;
        self.tag = None;
    }

    async fn tag(&self) -> Result<Tag> {
        self.tag.clone().ok_or(HardwareError::TagLost)
    }

    async fn transceive(&mut self, frame: &[u8]) -> Result<Vec<u8>> {
        match frame {
            [MIFARE_CMD_READ, block] => self.read_binary(*block),
            [MIFARE_CMD_AUTH_A, block, key @ ..] => {
                let key: &[u8; 6] = key
                    .try_into()
                    .map_err(|_| HardwareError::invalid_data("AUTH frame needs a 6-byte key"))?;
                self.authenticate_block(*block, key).map(|_| Vec::new())
            }
            [MIFARE_CMD_WRITE, block, data @ ..] => {
                self.update_binary(*block, data).map(|_| Vec::new())
            }
            _ => self.direct_transmit(frame),
        }
    }

    async fn write_ndef_message(&mut self, message: &[u8]) -> Result<()> {
        if self.family != Some(CardFamily::MifareUltralight) {
            return Err(HardwareError::unsupported("NDEF write on a non Type 2 tag"));
        }

        let tlv = nfctap_ndef::wrap_tlv(message)
            .map_err(|e| HardwareError::invalid_data(e.to_string()))?;
        for (index, chunk) in tlv.chunks(TYPE2_PAGE_SIZE).enumerate() {
            let page = u8::try_from(index)
                .ok()
                .and_then(|i| i.checked_add(TYPE2_FIRST_DATA_PAGE))
                .filter(|p| *p < TYPE2_MAX_PAGES)
                .ok_or_else(|| HardwareError::capacity_exceeded(tlv.len(), 0))?;
            let mut data = [0u8; TYPE2_PAGE_SIZE];
            data[..chunk.len()].copy_from_slice(chunk);
            self.update_binary(page, &data)?;
        }
        Ok(())
    }

    async fn authenticate_sector(&mut self, sector: u8, key: &[u8; 6]) -> Result<()> {
        self.authenticate_block(sector * BLOCKS_PER_SECTOR, key)
    }

    async fn read_block(&mut self, block: u8) -> Result<Vec<u8>> {
        self.read_binary(block)
    }

    async fn get_reader_info(&self) -> Result<ReaderInfo> {
        Ok(ReaderInfo::new(
            self.reader.to_string_lossy(),
            vec!["ISO14443A".to_string(), "ISO14443B".to_string()],
        ))
    }
}

/// Data area declared by a Type 2 capability container, capped to the
/// pages this reader scans.
fn type2_data_area(cc_size: u8) -> usize {
    let scanned = usize::from(TYPE2_MAX_PAGES - TYPE2_FIRST_DATA_PAGE) * TYPE2_PAGE_SIZE;
    (usize::from(cc_size) * 8).min(scanned)
}

/// Reads Type 2 data pages until the TLV area is settled.
///
/// Stops at the terminator TLV or once `data_area` bytes are in. NULL
/// padding keeps the scan going.
fn scan_type2_memory(
    data_area: usize,
    mut read_pages: impl FnMut(u8) -> Result<Vec<u8>>,
) -> Result<TlvScan> {
    let mut memory = Vec::with_capacity(data_area);
    let mut page = TYPE2_FIRST_DATA_PAGE;
    loop {
        let scan = nfctap_ndef::scan_tlv(&memory);
        if !scan.needs_more() || memory.len() >= data_area {
            return Ok(scan);
        }

        // READ BINARY returns four pages
        let chunk = read_pages(page)?;
        if chunk.is_empty() {
            return Err(HardwareError::invalid_data("empty read of Type 2 memory"));
        }
        memory.extend_from_slice(&chunk);
        memory.truncate(data_area);
        page += (BLOCK_SIZE / TYPE2_PAGE_SIZE) as u8;
    }
}

/// Card family from a PC/SC ATR.
///
/// Storage cards carry the registered application provider `A0 00 00 03 06`
/// followed by the standard byte and a two-byte card name.
fn card_family(atr: &[u8]) -> CardFamily {
    const RID: [u8; 5] = [0xA0, 0x00, 0x00, 0x03, 0x06];

    match atr.windows(RID.len()).position(|w| w == RID) {
        Some(pos) => match atr.get(pos + 6..pos + 8) {
            Some([0x00, 0x01]) | Some([0x00, 0x02]) | Some([0x00, 0x26]) => {
                CardFamily::MifareClassic
            }
            Some([0x00, 0x03]) | Some([0xF0, 0x04]) => CardFamily::MifareUltralight,
            _ => CardFamily::IsoDep,
        },
        None => CardFamily::IsoDep,
    }
}

/// Historical bytes of an ATR (the `K` bytes before TCK).
fn historical_bytes(atr: &[u8]) -> Vec<u8> {
    let Some(t0) = atr.get(1) else {
        return Vec::new();
    };
    let count = (t0 & 0x0F) as usize;
    let end = atr.len().saturating_sub(1);
    atr.get(end.saturating_sub(count)..end)
        .map(<[u8]>::to_vec)
        .unwrap_or_default()
}
