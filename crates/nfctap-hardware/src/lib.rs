//! Radio abstraction layer for the nfctap engine.
//!
//! This crate defines the [`RadioDevice`] trait the engine drives, the
//! [`HardwareError`] type radio implementations report, and concrete
//! radios: a programmable mock for development and tests, and a PC/SC
//! backend behind the `hardware-pcsc` feature.
//!
//! # Design Philosophy
//!
//! - **Async-first**: Operations that wait on the radio are native `async fn`
//!   in traits (Rust 1.90 + Edition 2024 RPITIT).
//! - **Release from anywhere**: Closing a technology window is synchronous
//!   so scope guards can release the radio from `Drop`.
//! - **Thread-safe**: The trait requires `Send + Sync` for use with Tokio.
//! - **Error-aware**: All operations return `Result<T>` with detailed error information.
//!
//! # Reading a Tag
//!
//! ```no_run
//! use nfctap_core::Technology;
//! use nfctap_hardware::traits::RadioDevice;
//! use nfctap_hardware::error::Result;
//!
//! async fn read_sector_block<R: RadioDevice>(radio: &mut R) -> Result<Vec<u8>> {
//!     radio.request_technology(&[Technology::MifareClassic]).await?;
//!
//!     let result = async {
//!         radio.authenticate_sector(1, &[0xFF; 6]).await?;
//!         radio.read_block(4).await
//!     }
//!     .await;
//!
//!     radio.cancel_technology_request();
//!     result
//! }
//! ```
//!
//! # Mock Implementations
//!
//! [`mock::MockRadio`] is paired with a [`mock::MockRadioHandle`] that
//! presents [`mock::MockTag`]s and exposes acquisition/release counters.
//!
//! [`RadioDevice`]: traits::RadioDevice

pub mod devices;
pub mod error;
pub mod mock;
#[cfg(feature = "hardware-pcsc")]
pub mod pcsc_reader;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use devices::AnyRadioDevice;
pub use error::{HardwareError, Result};
pub use traits::RadioDevice;
pub use types::ReaderInfo;
