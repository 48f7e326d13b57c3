//! Write strategies.
//!
//! Writes are split into `prepare` (pure, runs before any radio access)
//! and `commit` (runs inside a session). Input problems are therefore
//! reported without ever touching the radio.

use crate::config::RawBlockWriteConfig;
use nfctap_core::constants::{BLOCK_SIZE, DEFAULT_LANGUAGE, MIFARE_CMD_AUTH_A, MIFARE_CMD_WRITE};
use nfctap_core::{Error, Result, Technology};
use nfctap_hardware::RadioDevice;
use nfctap_ndef::{TextRecord, encode_message};
use tracing::{debug, info, warn};

/// Writes text as a single NDEF text record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteStrategy {
    language: String,
}

impl Default for WriteStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_LANGUAGE)
    }
}

impl WriteStrategy {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
        }
    }

    /// Technologies a write session is restricted to.
    pub fn technologies(&self) -> [Technology; 1] {
        [Technology::Ndef]
    }

    /// Encode `text` into NDEF message bytes.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyInput`] for blank text, [`Error::EncodingFailed`] when
    /// the record cannot be built.
    pub fn prepare(&self, text: &str) -> Result<Vec<u8>> {
        if text.trim().is_empty() {
            return Err(Error::EmptyInput);
        }

        let payload = TextRecord::new(text, self.language.as_str()).encode()?;
        let message = encode_message(&[nfctap_core::NdefRecord::text(payload)])?;
        debug!(bytes = message.len(), "NDEF message prepared");
        Ok(message)
    }

    /// Write a prepared message to the tag in the open session.
    pub async fn commit<R: RadioDevice>(&self, message: &[u8], radio: &mut R) -> Result<()> {
        radio
            .write_ndef_message(message)
            .await
            .map_err(|e| Error::write_rejected(e.to_string()))?;
        info!(bytes = message.len(), "NDEF message written");
        Ok(())
    }
}

/// Overwrites one MIFARE block with raw text over NfcA frames.
///
/// Only built when the raw block write mode is enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlockWriter {
    block: u8,
    key: [u8; 6],
}

impl RawBlockWriter {
    pub fn new(block: u8, key: [u8; 6]) -> Self {
        Self { block, key }
    }

    /// Writer for `config`, or `None` when the mode is disabled.
    pub fn from_config(config: &RawBlockWriteConfig, key: [u8; 6]) -> Option<Self> {
        config.enabled.then(|| Self::new(config.block, key))
    }

    pub fn block(&self) -> u8 {
        self.block
    }

    pub fn technologies(&self) -> [Technology; 1] {
        [Technology::NfcA]
    }

    /// Lay `text` out as one zero-padded block.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyInput`] for blank text, [`Error::EncodingFailed`] when
    /// the text does not fit in a block.
    pub fn prepare(&self, text: &str) -> Result<[u8; BLOCK_SIZE]> {
        if text.trim().is_empty() {
            return Err(Error::EmptyInput);
        }

        let bytes = text.as_bytes();
        if bytes.len() > BLOCK_SIZE {
            return Err(Error::encoding_failed(format!(
                "text is {} bytes, a block holds {BLOCK_SIZE}",
                bytes.len()
            )));
        }

        let mut block = [0u8; BLOCK_SIZE];
        block[..bytes.len()].copy_from_slice(bytes);
        Ok(block)
    }

    /// Authenticate (best effort) and write the block.
    pub async fn commit<R: RadioDevice>(
        &self,
        data: &[u8; BLOCK_SIZE],
        radio: &mut R,
    ) -> Result<()> {
        let mut auth = vec![MIFARE_CMD_AUTH_A, self.block];
        auth.extend_from_slice(&self.key);
        if let Err(e) = radio.transceive(&auth).await {
            // Ultralight-style tags have no sector keys
            warn!(
                block = self.block,
                "Authentication failed or not needed: {}",
                e
            );
        }

        let mut frame = vec![MIFARE_CMD_WRITE, self.block];
        frame.extend_from_slice(data);
        radio
            .transceive(&frame)
            .await
            .map_err(|e| Error::write_rejected(format!("block {}: {e}", self.block)))?;

        info!(block = self.block, "Raw block written");
        Ok(())
    }
}
