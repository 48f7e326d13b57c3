//! Protocol constants for contactless tag interaction.
//!
//! Values here describe the MIFARE command set, the sector layout of
//! MIFARE Classic memory, and the default timing of the engine.
//!
//! # Usage
//!
//! ```
//! use nfctap_core::constants::*;
//!
//! // First block of the default sector
//! assert_eq!(DEFAULT_SECTOR * BLOCKS_PER_SECTOR, 4);
//!
//! // Reading a block over a raw NfcA link
//! let frame = [MIFARE_CMD_READ, 4];
//! assert_eq!(frame, [0x30, 0x04]);
//! ```
//!
//! # Security
//!
//! [`DEFAULT_SECTOR_KEY`] is the factory transport key shipped on MIFARE
//! Classic cards. It is publicly known and provides no access control.

// ============================================================================
// MIFARE command set
// ============================================================================

/// MIFARE READ command, returns 16 bytes starting at the given block/page.
pub const MIFARE_CMD_READ: u8 = 0x30;

/// MIFARE Classic AUTH with key A.
pub const MIFARE_CMD_AUTH_A: u8 = 0x60;

/// MIFARE Classic WRITE command (16-byte block).
pub const MIFARE_CMD_WRITE: u8 = 0xA0;

/// Size of a MIFARE Classic data block in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Number of blocks in each of the first 32 MIFARE Classic sectors.
pub const BLOCKS_PER_SECTOR: u8 = 4;

// ============================================================================
// Authenticated-sector defaults
// ============================================================================

/// Factory default key A (`FF FF FF FF FF FF`).
pub const DEFAULT_SECTOR_KEY: [u8; 6] = [0xFF; 6];

/// Sector read by the authenticated-sector strategy.
pub const DEFAULT_SECTOR: u8 = 1;

// ============================================================================
// Basic-frame read defaults
// ============================================================================

/// Blocks probed by the basic-frame strategy.
///
/// Blocks 4-6 and 8-10 commonly hold user data; sector trailers (3, 7, 11)
/// are skipped.
pub const DEFAULT_CANDIDATE_BLOCKS: [u8; 6] = [4, 5, 6, 8, 9, 10];

/// Block targeted by the gated raw block write.
pub const DEFAULT_RAW_WRITE_BLOCK: u8 = 4;

// ============================================================================
// Timing (milliseconds)
// ============================================================================

/// How long an acquisition waits for a tag before giving up.
pub const DEFAULT_ACQUIRE_TIMEOUT: u64 = 30_000;

/// How long scanned content stays visible.
pub const DEFAULT_DISPLAY_WINDOW: u64 = 10_000;

// ============================================================================
// NDEF
// ============================================================================

/// Language code written into new text records.
pub const DEFAULT_LANGUAGE: &str = "en";

// ============================================================================
// Printable range
// ============================================================================

/// Lowest printable ASCII byte (space).
pub const PRINTABLE_MIN: u8 = 0x20;

/// Highest printable ASCII byte (`~`).
pub const PRINTABLE_MAX: u8 = 0x7E;
