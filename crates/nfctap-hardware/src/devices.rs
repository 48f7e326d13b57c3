//! Enum wrapper for radio dispatch.
//!
//! Native `async fn` in traits (RPITIT - Rust Edition 2024) are not
//! object-safe, so we cannot use `Box<dyn RadioDevice>`. [`AnyRadioDevice`]
//! provides concrete type dispatch instead, with hardware backends behind
//! feature flags.
//!
//! # Examples
//!
//! ```
//! use nfctap_hardware::devices::AnyRadioDevice;
//! use nfctap_hardware::mock::MockRadio;
//!
//! let (radio, _handle) = MockRadio::new();
//! let any_radio = AnyRadioDevice::Mock(radio);
//!
//! // Can now be used polymorphically through the RadioDevice trait
//! ```

use crate::mock::MockRadio;
#[cfg(feature = "hardware-pcsc")]
use crate::pcsc_reader::PcscRadio;
use crate::traits::RadioDevice;
use crate::{ReaderInfo, Result};
use nfctap_core::{Tag, Technology};

/// Enum wrapper for radio dispatch.
///
/// # Examples
///
/// ```
/// use nfctap_hardware::devices::AnyRadioDevice;
/// use nfctap_hardware::traits::RadioDevice;
/// use nfctap_hardware::mock::MockRadio;
///
/// #[tokio::main]
/// async fn main() -> nfctap_hardware::Result<()> {
///     let (radio, _handle) = MockRadio::new();
///     let any_radio = AnyRadioDevice::Mock(radio);
///
///     let info = any_radio.get_reader_info().await?;
///     println!("Radio: {}", info.name);
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyRadioDevice {
    /// Mock radio for development and testing.
    Mock(MockRadio),

    /// PC/SC contactless reader.
    #[cfg(feature = "hardware-pcsc")]
    Pcsc(PcscRadio),
}

macro_rules! dispatch {
    ($self:ident, $device:ident => $call:expr) => {
        match $self {
            Self::Mock($device) => $call,
            #[cfg(feature = "hardware-pcsc")]
            Self::Pcsc($device) => $call,
        }
    };
}

impl RadioDevice for AnyRadioDevice {
    async fn is_supported(&self) -> Result<bool> {
        dispatch!(self, device => device.is_supported().await)
    }

    async fn is_enabled(&self) -> Result<bool> {
        dispatch!(self, device => device.is_enabled().await)
    }

    async fn request_technology(&mut self, technologies: &[Technology]) -> Result<Technology> {
        dispatch!(self, device => device.request_technology(technologies).await)
    }

    fn cancel_technology_request(&mut self) {
        dispatch!(self, device => device.cancel_technology_request())
    }

    async fn tag(&self) -> Result<Tag> {
        dispatch!(self, device => device.tag().await)
    }

    async fn transceive(&mut self, frame: &[u8]) -> Result<Vec<u8>> {
        dispatch!(self, device => device.transceive(frame).await)
    }

    async fn write_ndef_message(&mut self, message: &[u8]) -> Result<()> {
        dispatch!(self, device => device.write_ndef_message(message).await)
    }

    async fn authenticate_sector(&mut self, sector: u8, key: &[u8; 6]) -> Result<()> {
        dispatch!(self, device => device.authenticate_sector(sector, key).await)
    }

    async fn read_block(&mut self, block: u8) -> Result<Vec<u8>> {
        dispatch!(self, device => device.read_block(block).await)
    }

    async fn get_reader_info(&self) -> Result<ReaderInfo> {
        dispatch!(self, device => device.get_reader_info().await)
    }
}
