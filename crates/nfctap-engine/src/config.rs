//! Engine configuration.
//!
//! Every field has a default, so a partial JSON document is enough:
//!
//! ```
//! use nfctap_engine::config::{EngineConfig, Platform};
//!
//! let config: EngineConfig = serde_json::from_str(r#"{ "platform": "ios" }"#).unwrap();
//! assert_eq!(config.platform, Platform::Ios);
//! assert_eq!(config.sector, 1);
//! ```

use nfctap_core::Technology;
use nfctap_core::constants::{
    DEFAULT_ACQUIRE_TIMEOUT, DEFAULT_CANDIDATE_BLOCKS, DEFAULT_DISPLAY_WINDOW,
    DEFAULT_RAW_WRITE_BLOCK, DEFAULT_SECTOR, DEFAULT_SECTOR_KEY,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Host platform of the radio stack.
///
/// Decides which technologies a read asks the radio for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Android,
    Ios,
}

impl Platform {
    /// Technologies requested for a read, in negotiation order.
    ///
    /// NDEF first, then the closest low-level frame technology, then
    /// authenticated sectors. iOS exposes neither raw NfcA nor MIFARE
    /// Classic sectors.
    pub fn read_technologies(self) -> Vec<Technology> {
        match self {
            Self::Android => vec![
                Technology::Ndef,
                Technology::NfcA,
                Technology::IsoDep,
                Technology::MifareClassic,
            ],
            Self::Ios => vec![Technology::Ndef, Technology::IsoDep],
        }
    }
}

/// Settings of the raw block write mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawBlockWriteConfig {
    /// Raw writes are refused unless this is set.
    pub enabled: bool,

    /// Block overwritten by a raw write.
    pub block: u8,
}

impl Default for RawBlockWriteConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            block: DEFAULT_RAW_WRITE_BLOCK,
        }
    }
}

/// Configuration of a [`TagEngine`](crate::TagEngine).
///
/// # Example
///
/// ```
/// use nfctap_engine::config::EngineConfig;
/// use std::time::Duration;
///
/// let config = EngineConfig::default()
///     .with_acquire_timeout(Duration::from_secs(5))
///     .with_sector(2);
///
/// assert_eq!(config.acquire_timeout(), Duration::from_secs(5));
/// assert_eq!(config.sector, 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Platform whose read technologies are requested.
    pub platform: Platform,

    /// How long an acquisition waits for a tag (milliseconds).
    pub acquire_timeout_ms: u64,

    /// How long scanned content stays visible (milliseconds).
    pub display_window_ms: u64,

    /// Sector read from authenticated-sector tags.
    pub sector: u8,

    /// Key A used for the sector handshake.
    pub sector_key: [u8; 6],

    /// Blocks probed over raw frames, in order.
    pub candidate_blocks: Vec<u8>,

    /// Raw block write mode.
    pub raw_block_write: RawBlockWriteConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            platform: Platform::default(),
            acquire_timeout_ms: DEFAULT_ACQUIRE_TIMEOUT,
            display_window_ms: DEFAULT_DISPLAY_WINDOW,
            sector: DEFAULT_SECTOR,
            sector_key: DEFAULT_SECTOR_KEY,
            candidate_blocks: DEFAULT_CANDIDATE_BLOCKS.to_vec(),
            raw_block_write: RawBlockWriteConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    pub fn display_window(&self) -> Duration {
        Duration::from_millis(self.display_window_ms)
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout_ms = duration_ms(timeout);
        self
    }

    pub fn with_display_window(mut self, window: Duration) -> Self {
        self.display_window_ms = duration_ms(window);
        self
    }

    pub fn with_sector(mut self, sector: u8) -> Self {
        self.sector = sector;
        self
    }

    pub fn with_sector_key(mut self, key: [u8; 6]) -> Self {
        self.sector_key = key;
        self
    }

    pub fn with_candidate_blocks(mut self, blocks: impl Into<Vec<u8>>) -> Self {
        self.candidate_blocks = blocks.into();
        self
    }

    /// Enable raw block writes to `block`.
    pub fn with_raw_block_write(mut self, block: u8) -> Self {
        self.raw_block_write = RawBlockWriteConfig {
            enabled: true,
            block,
        };
        self
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
