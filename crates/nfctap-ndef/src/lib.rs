//! NDEF encoding for text payloads.
//!
//! Covers the subset of the NFC Forum Data Exchange Format the engine needs:
//! well-known text records (RTD Text), the record/message byte layout, and
//! the TLV wrapper used by Type 2 tag memory.
//!
//! ```
//! use nfctap_ndef::{decode_message, encode_message, text_record, TextRecord};
//!
//! let bytes = encode_message(&[text_record("hello").unwrap()]).unwrap();
//! let records = decode_message(&bytes).unwrap();
//! let text = TextRecord::decode(&records[0].payload).unwrap();
//! assert_eq!(text.text, "hello");
//! ```

pub mod message;
pub mod text;
pub mod tlv;

pub use message::{decode_message, encode_message};
pub use text::{TextEncoding, TextRecord, text_record};
pub use tlv::{TlvScan, scan_tlv, unwrap_tlv, wrap_tlv};
