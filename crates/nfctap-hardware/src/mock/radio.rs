//! Mock radio implementation for testing and development.
//!
//! This module provides a simulated contactless radio that can be controlled
//! programmatically: tags are built with [`MockTag`] and presented through a
//! [`MockRadioHandle`], which also exposes session counters and a log of
//! everything written to the tags.

use crate::{HardwareError, Result, traits::RadioDevice, types::ReaderInfo};
use nfctap_core::constants::{
    BLOCK_SIZE, BLOCKS_PER_SECTOR, DEFAULT_SECTOR_KEY, MIFARE_CMD_AUTH_A, MIFARE_CMD_READ,
    MIFARE_CMD_WRITE,
};
use nfctap_core::{Tag, Technology};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::debug;

/// Sectors of a MIFARE Classic 1K card.
const CLASSIC_1K_SECTORS: u8 = 16;

/// Default NDEF capacity of a mock tag (NTAG215 user memory).
const DEFAULT_NDEF_CAPACITY: usize = 504;

/// A programmable tag for the mock radio.
///
/// Wraps the [`Tag`] snapshot the radio reports plus the memory behind it.
///
/// # Examples
///
/// ```
/// use nfctap_core::{Tag, Technology};
/// use nfctap_hardware::mock::MockTag;
///
/// let tag = MockTag::mifare_classic(vec![0x04, 0xAB, 0xCD, 0xEF])
///     .with_block(4, b"meeting");
///
/// assert!(tag.tag().has_technology(&Technology::MifareClassic));
/// ```
#[derive(Debug, Clone)]
pub struct MockTag {
    tag: Tag,
    blocks: HashMap<u8, Vec<u8>>,
    sector_keys: HashMap<u8, [u8; 6]>,
    read_only: bool,
    ndef_capacity: usize,
    leaves_field: bool,
}

impl MockTag {
    /// Tag with the given snapshot and empty memory.
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            blocks: HashMap::new(),
            sector_keys: HashMap::new(),
            read_only: false,
            ndef_capacity: DEFAULT_NDEF_CAPACITY,
            leaves_field: false,
        }
    }

    /// MIFARE Classic 1K advertising NfcA and MifareClassic, every sector
    /// protected by the factory default key.
    pub fn mifare_classic(uid: Vec<u8>) -> Self {
        let tag = Tag::builder(uid)
            .technologies([Technology::NfcA, Technology::MifareClassic])
            .atqa(vec![0x44, 0x00])
            .sak(0x08)
            .build();
        let mut mock = Self::new(tag);
        for sector in 0..CLASSIC_1K_SECTORS {
            mock.sector_keys.insert(sector, DEFAULT_SECTOR_KEY);
        }
        mock
    }

    /// Store `data` in `block`, zero-padded to the block size.
    pub fn with_block(mut self, block: u8, data: &[u8]) -> Self {
        let mut padded = data.to_vec();
        padded.resize(BLOCK_SIZE, 0);
        self.blocks.insert(block, padded);
        self
    }

    /// Protect `sector` with `key`.
    pub fn with_sector_key(mut self, sector: u8, key: [u8; 6]) -> Self {
        self.sector_keys.insert(sector, key);
        self
    }

    /// Reject every write.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Limit the NDEF message size the tag accepts.
    pub fn with_ndef_capacity(mut self, capacity: usize) -> Self {
        self.ndef_capacity = capacity;
        self
    }

    /// Leave the field right after a technology is negotiated.
    pub fn leaves_field(mut self) -> Self {
        self.leaves_field = true;
        self
    }

    /// The snapshot the radio reports for this tag.
    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    fn sector_of(block: u8) -> u8 {
        block / BLOCKS_PER_SECTOR
    }

    fn block_data(&self, block: u8) -> Vec<u8> {
        self.blocks
            .get(&block)
            .cloned()
            .unwrap_or_else(|| vec![0; BLOCK_SIZE])
    }
}

/// Shared state between the radio and its handle.
#[derive(Debug)]
struct MockState {
    supported: bool,
    enabled: bool,
    session_open: bool,
    acquisitions: usize,
    releases: usize,
    ndef_writes: Vec<Vec<u8>>,
    frames: Vec<Vec<u8>>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            supported: true,
            enabled: true,
            session_open: false,
            acquisitions: 0,
            releases: 0,
            ndef_writes: Vec::new(),
            frames: Vec::new(),
        }
    }
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock contactless radio for testing and development.
///
/// # Examples
///
/// ```
/// use nfctap_core::{Tag, Technology};
/// use nfctap_hardware::mock::{MockRadio, MockTag};
/// use nfctap_hardware::traits::RadioDevice;
///
/// #[tokio::main]
/// async fn main() -> nfctap_hardware::Result<()> {
///     let (mut radio, handle) = MockRadio::new();
///
///     let tag = Tag::builder(vec![0x04, 0xAB, 0xCD, 0xEF])
///         .technology(Technology::IsoDep)
///         .build();
///     handle.present_tag(MockTag::new(tag)).await?;
///
///     let tech = radio.request_technology(&[Technology::IsoDep]).await?;
///     assert_eq!(tech, Technology::IsoDep);
///     assert_eq!(radio.tag().await?.uid_hex(), "04ABCDEF");
///
///     radio.cancel_technology_request();
///     assert_eq!(handle.releases(), 1);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockRadio {
    /// Channel receiver for presented tags
    tag_rx: mpsc::Receiver<MockTag>,

    /// State shared with the handle
    state: Arc<Mutex<MockState>>,

    /// Device name
    name: String,

    /// Tag in the current technology window
    active: Option<MockTag>,

    /// Technology negotiated for the active tag
    negotiated: Option<Technology>,

    /// Sector unlocked by the last successful authentication
    authenticated_sector: Option<u8>,
}

impl MockRadio {
    /// Create a new mock radio with the default name.
    ///
    /// Returns a tuple of (MockRadio, MockRadioHandle) where the handle
    /// can be used to present tags and inspect the radio.
    pub fn new() -> (Self, MockRadioHandle) {
        Self::with_name("Mock NFC Radio".to_string())
    }

    /// Create a new mock radio with a custom name.
    pub fn with_name(name: String) -> (Self, MockRadioHandle) {
        let (tag_tx, tag_rx) = mpsc::channel(32);
        let state = Arc::new(Mutex::new(MockState::default()));

        let radio = Self {
            tag_rx,
            state: Arc::clone(&state),
            name,
            active: None,
            negotiated: None,
            authenticated_sector: None,
        };

        (radio, MockRadioHandle { tag_tx, state })
    }

    /// Technology negotiated in the current window, if any.
    pub fn negotiated_technology(&self) -> Option<&Technology> {
        self.negotiated.as_ref()
    }

    fn active_tag(&self) -> Result<&MockTag> {
        self.active
            .as_ref()
            .filter(|tag| !tag.leaves_field)
            .ok_or(HardwareError::TagLost)
    }

    fn active_tag_mut(&mut self) -> Result<&mut MockTag> {
        self.active
            .as_mut()
            .filter(|tag| !tag.leaves_field)
            .ok_or(HardwareError::TagLost)
    }

    /// Unlocked unless the sector has a key and another sector is authenticated.
    fn check_unlocked(&self, block: u8) -> Result<()> {
        let tag = self.active_tag()?;
        let sector = MockTag::sector_of(block);
        if tag.sector_keys.contains_key(&sector) && self.authenticated_sector != Some(sector) {
            return Err(HardwareError::authentication_failed(sector));
        }
        Ok(())
    }

    fn frame_read(&self, block: u8) -> Result<Vec<u8>> {
        self.check_unlocked(block)
            .map_err(|_| HardwareError::communication(format!("NAK reading block {block}")))?;
        Ok(self.active_tag()?.block_data(block))
    }

    fn frame_auth(&mut self, block: u8, key: &[u8]) -> Result<Vec<u8>> {
        let key: [u8; 6] = key
            .try_into()
            .map_err(|_| HardwareError::invalid_data("AUTH frame needs a 6-byte key"))?;
        self.authenticate(MockTag::sector_of(block), &key)?;
        Ok(Vec::new())
    }

    fn frame_write(&mut self, block: u8, data: &[u8]) -> Result<Vec<u8>> {
        if data.len() != BLOCK_SIZE {
            return Err(HardwareError::invalid_data(format!(
                "WRITE frame needs {BLOCK_SIZE} data bytes, got {}",
                data.len()
            )));
        }
        self.check_unlocked(block)
            .map_err(|_| HardwareError::communication(format!("NAK writing block {block}")))?;
        let tag = self.active_tag_mut()?;
        if tag.read_only {
            return Err(HardwareError::ReadOnly);
        }
        tag.blocks.insert(block, data.to_vec());
        Ok(Vec::new())
    }

    fn authenticate(&mut self, sector: u8, key: &[u8; 6]) -> Result<()> {
        let accepted = self.active_tag()?.sector_keys.get(&sector) == Some(key);
        if accepted {
            self.authenticated_sector = Some(sector);
            Ok(())
        } else {
            self.authenticated_sector = None;
            Err(HardwareError::authentication_failed(sector))
        }
    }
}

impl Default for MockRadio {
    fn default() -> Self {
        Self::new().0
    }
}

impl RadioDevice for MockRadio {
    async fn is_supported(&self) -> Result<bool> {
        Ok(lock(&self.state).supported)
    }

    async fn is_enabled(&self) -> Result<bool> {
        Ok(lock(&self.state).enabled)
    }

    async fn request_technology(&mut self, technologies: &[Technology]) -> Result<Technology> {
        {
            let mut state = lock(&self.state);
            if state.session_open {
                return Err(HardwareError::Busy);
            }
            state.session_open = true;
            state.acquisitions += 1;
        }

        loop {
            let candidate = self
                .tag_rx
                .recv()
                .await
                .ok_or_else(|| HardwareError::disconnected("mock tag channel closed"))?;

            let negotiated = technologies
                .iter()
                .find(|tech| candidate.tag.has_technology(tech))
                .cloned();

            match negotiated {
                Some(tech) => {
                    debug!(uid = %candidate.tag.uid_hex(), %tech, "Tag negotiated");
                    self.active = Some(candidate);
                    self.negotiated = Some(tech.clone());
                    self.authenticated_sector = None;
                    return Ok(tech);
                }
                None => {
                    let uid = candidate.tag.uid_hex();
                    debug!(%uid, "Ignoring tag without a requested technology");
                }
            }
        }
    }

    fn cancel_technology_request(&mut self) {
        let mut state = lock(&self.state);
        if state.session_open {
            state.session_open = false;
            state.releases += 1;
        }
        self.active = None;
        self.negotiated = None;
        self.authenticated_sector = None;
    }

    async fn tag(&self) -> Result<Tag> {
        Ok(self.active_tag()?.tag.clone())
    }

    async fn transceive(&mut self, frame: &[u8]) -> Result<Vec<u8>> {
        self.active_tag()?;
        lock(&self.state).frames.push(frame.to_vec());
        debug!(frame = %hex::encode(frame), "TX");

        match frame {
            [MIFARE_CMD_READ, block] => self.frame_read(*block),
            [MIFARE_CMD_AUTH_A, block, key @ ..] => self.frame_auth(*block, key),
            [MIFARE_CMD_WRITE, block, data @ ..] => self.frame_write(*block, data),
            _ => Err(HardwareError::communication(format!(
                "unknown command {}",
                hex::encode(frame)
            ))),
        }
    }

    async fn write_ndef_message(&mut self, message: &[u8]) -> Result<()> {
        let tag = self.active_tag()?;
        if !tag.tag.has_technology(&Technology::Ndef) {
            return Err(HardwareError::unsupported("NDEF write on a non-NDEF tag"));
        }
        if tag.read_only {
            return Err(HardwareError::ReadOnly);
        }
        if message.len() > tag.ndef_capacity {
            return Err(HardwareError::capacity_exceeded(
                message.len(),
                tag.ndef_capacity,
            ));
        }

        lock(&self.state).ndef_writes.push(message.to_vec());
        Ok(())
    }

    async fn authenticate_sector(&mut self, sector: u8, key: &[u8; 6]) -> Result<()> {
        self.authenticate(sector, key)
    }

    async fn read_block(&mut self, block: u8) -> Result<Vec<u8>> {
        let sector = MockTag::sector_of(block);
        if self.authenticated_sector != Some(sector) {
            return Err(HardwareError::authentication_failed(sector));
        }
        Ok(self.active_tag()?.block_data(block))
    }

    async fn get_reader_info(&self) -> Result<ReaderInfo> {
        Ok(ReaderInfo::new(
            self.name.clone(),
            vec!["ISO14443A".to_string(), "ISO14443B".to_string()],
        )
        .with_max_baud_rate(424000))
    }
}

/// Handle for controlling a mock radio.
///
/// Presents tags, toggles the radio preconditions and exposes what the
/// engine did with the radio.
#[derive(Debug, Clone)]
pub struct MockRadioHandle {
    /// Channel sender for presented tags
    tag_tx: mpsc::Sender<MockTag>,

    /// State shared with the radio
    state: Arc<Mutex<MockState>>,
}

impl MockRadioHandle {
    /// Present a tag to the radio.
    ///
    /// # Errors
    ///
    /// Returns an error if the radio has been dropped.
    pub async fn present_tag(&self, tag: MockTag) -> Result<()> {
        self.tag_tx
            .send(tag)
            .await
            .map_err(|_| HardwareError::disconnected("mock tag channel closed"))
    }

    /// Simulate a device with or without NFC hardware.
    pub fn set_supported(&self, supported: bool) {
        lock(&self.state).supported = supported;
    }

    /// Simulate the user toggling NFC.
    pub fn set_enabled(&self, enabled: bool) {
        lock(&self.state).enabled = enabled;
    }

    /// Number of technology requests made.
    pub fn acquisitions(&self) -> usize {
        lock(&self.state).acquisitions
    }

    /// Number of technology windows closed.
    pub fn releases(&self) -> usize {
        lock(&self.state).releases
    }

    /// Whether a technology window is currently open.
    pub fn is_session_open(&self) -> bool {
        lock(&self.state).session_open
    }

    /// Every NDEF message written, oldest first.
    pub fn ndef_writes(&self) -> Vec<Vec<u8>> {
        lock(&self.state).ndef_writes.clone()
    }

    /// Every raw frame transmitted, oldest first.
    pub fn frames(&self) -> Vec<Vec<u8>> {
        lock(&self.state).frames.clone()
    }
}
