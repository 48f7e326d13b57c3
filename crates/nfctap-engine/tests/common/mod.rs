//! Shared fixtures for engine integration tests.
//!
//! Each integration test binary compiles this module separately, so not
//! every helper is used by every binary.

#![allow(dead_code)]

use nfctap_core::constants::DEFAULT_SECTOR_KEY;
use nfctap_core::{ErrorKind, ReadResult, Tag, Technology};
use nfctap_engine::{EngineConfig, TagEngine};
use nfctap_hardware::mock::{MockRadio, MockRadioHandle, MockTag};
use nfctap_ndef::text_record;

/// Engine over a fresh mock radio.
pub fn engine(config: EngineConfig) -> (TagEngine<MockRadio>, MockRadioHandle) {
    let (radio, handle) = MockRadio::new();
    (TagEngine::new(radio, config), handle)
}

/// NDEF tag holding one text record.
pub fn ndef_text_tag(uid: Vec<u8>, text: &str) -> MockTag {
    let tag = Tag::builder(uid)
        .technology(Technology::NfcA)
        .ndef_message(vec![text_record(text).unwrap()])
        .type_name("NFC Forum Type 2")
        .build();
    MockTag::new(tag)
}

/// Writable NDEF tag with no message on it.
pub fn writable_ndef_tag() -> MockTag {
    let tag = Tag::builder(vec![0x04, 0x5A, 0x11, 0x22, 0x33, 0x44, 0x80])
        .technologies([Technology::NfcA, Technology::Ndef])
        .build();
    MockTag::new(tag)
}

/// Tag exposing only MifareClassic, `text` stored in sector 1 block 4.
pub fn sector_tag(text: &[u8]) -> MockTag {
    let tag = Tag::builder(vec![0x04, 0xAB, 0xCD, 0xEF])
        .technology(Technology::MifareClassic)
        .build();
    MockTag::new(tag)
        .with_sector_key(1, DEFAULT_SECTOR_KEY)
        .with_block(4, text)
}

/// Negotiates NDEF but carries no message and nothing else readable.
pub fn unreadable_tag() -> MockTag {
    let tag = Tag::builder(vec![0xE0, 0x04, 0x01, 0x50])
        .technologies([Technology::Ndef, Technology::NfcV])
        .type_name("ISO 15693")
        .build();
    MockTag::new(tag)
}

pub fn failure_kind(result: &ReadResult) -> Option<ErrorKind> {
    result.failure().map(|e| e.kind())
}
