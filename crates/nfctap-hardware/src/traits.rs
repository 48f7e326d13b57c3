//! Radio device abstraction.
//!
//! [`RadioDevice`] is the boundary between the engine and whatever stack
//! owns the contactless radio (a phone NFC service, a PC/SC reader, a mock).
//!
//! The trait uses native `async fn` methods (Edition 2024 RPITIT).

#![allow(async_fn_in_trait)]

use crate::{Result, types::ReaderInfo};
use nfctap_core::{Tag, Technology};

/// Contactless radio able to negotiate a technology with a presented tag.
///
/// A technology request opens an exclusive window on the radio that stays
/// open until [`cancel_technology_request`](Self::cancel_technology_request)
/// is called. All tag operations are only valid inside that window.
///
/// # Object Safety and Dynamic Dispatch
///
/// **NOTE**: This trait is NOT object-safe because `async fn` methods return
/// `impl Future` (Edition 2024 RPITIT). You cannot use `Box<dyn RadioDevice>`.
/// For dynamic dispatch, use [`AnyRadioDevice`](crate::devices::AnyRadioDevice).
///
/// # Examples
///
/// ```no_run
/// use nfctap_core::Technology;
/// use nfctap_hardware::traits::RadioDevice;
/// use nfctap_hardware::error::Result;
///
/// async fn uid_of_next_tag<R: RadioDevice>(radio: &mut R) -> Result<String> {
///     radio.request_technology(&[Technology::NfcA]).await?;
///     let tag = radio.tag().await;
///     radio.cancel_technology_request();
///
///     Ok(tag?.uid_hex())
/// }
/// ```
pub trait RadioDevice: Send + Sync {
    /// Whether the device has contactless hardware at all.
    async fn is_supported(&self) -> Result<bool>;

    /// Whether the user has the radio switched on.
    async fn is_enabled(&self) -> Result<bool>;

    /// Wait for a tag that speaks one of `technologies`.
    ///
    /// The list is in priority order; the first technology the tag
    /// advertises is negotiated and returned. Tags advertising none of
    /// them are ignored. This call suspends until a tag arrives, so callers
    /// bound it with their own timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Another technology request is still open ([`HardwareError::Busy`](crate::HardwareError::Busy))
    /// - The radio is disconnected
    async fn request_technology(&mut self, technologies: &[Technology]) -> Result<Technology>;

    /// Close the technology window and release the tag.
    ///
    /// Idempotent and synchronous so it can run from `Drop`.
    fn cancel_technology_request(&mut self);

    /// Snapshot of the tag in the current window.
    async fn tag(&self) -> Result<Tag>;

    /// Exchange a raw frame with the tag (NfcA transceive).
    async fn transceive(&mut self, frame: &[u8]) -> Result<Vec<u8>>;

    /// Replace the tag's NDEF message with `message` (encoded bytes).
    async fn write_ndef_message(&mut self, message: &[u8]) -> Result<()>;

    /// Authenticate a MIFARE Classic sector with key A.
    async fn authenticate_sector(&mut self, sector: u8, key: &[u8; 6]) -> Result<()>;

    /// Read one 16-byte block of an authenticated sector.
    async fn read_block(&mut self, block: u8) -> Result<Vec<u8>>;

    /// Get reader information.
    async fn get_reader_info(&self) -> Result<ReaderInfo>;
}
