use crate::error::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform prefix of technology identifiers.
const TECH_PREFIX: &str = "android.nfc.tech.";

/// A contactless technology advertised by a presented tag.
///
/// Identifiers follow the platform naming (`android.nfc.tech.NfcA`). Anything
/// not in the known set is preserved verbatim as [`Technology::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Technology {
    /// NFC Forum data exchange format (NDEF).
    Ndef,
    /// Tag that can be formatted to NDEF.
    NdefFormatable,
    /// ISO 14443-3A, raw frame access.
    NfcA,
    /// ISO 14443-3B.
    NfcB,
    /// JIS 6319-4 (FeliCa).
    NfcF,
    /// ISO 15693.
    NfcV,
    /// ISO 14443-4, higher-layer protocol over NfcA/NfcB.
    IsoDep,
    /// MIFARE Classic, key-authenticated sectors.
    MifareClassic,
    /// MIFARE Ultralight pages.
    MifareUltralight,
    /// Unrecognized identifier.
    Other(String),
}

impl Technology {
    /// Full platform identifier of this technology.
    pub fn identifier(&self) -> String {
        match self {
            Self::Other(id) => id.clone(),
            known => format!("{TECH_PREFIX}{}", known.short_name()),
        }
    }

    /// Short name without the platform prefix.
    pub fn short_name(&self) -> &str {
        match self {
            Self::Ndef => "Ndef",
            Self::NdefFormatable => "NdefFormatable",
            Self::NfcA => "NfcA",
            Self::NfcB => "NfcB",
            Self::NfcF => "NfcF",
            Self::NfcV => "NfcV",
            Self::IsoDep => "IsoDep",
            Self::MifareClassic => "MifareClassic",
            Self::MifareUltralight => "MifareUltralight",
            Self::Other(id) => id,
        }
    }

    /// Parse a platform identifier; the prefix is optional.
    pub fn from_identifier(identifier: &str) -> Self {
        let short = identifier.strip_prefix(TECH_PREFIX).unwrap_or(identifier);
        match short {
            "Ndef" => Self::Ndef,
            "NdefFormatable" => Self::NdefFormatable,
            "NfcA" => Self::NfcA,
            "NfcB" => Self::NfcB,
            "NfcF" => Self::NfcF,
            "NfcV" => Self::NfcV,
            "IsoDep" => Self::IsoDep,
            "MifareClassic" => Self::MifareClassic,
            "MifareUltralight" => Self::MifareUltralight,
            _ => Self::Other(identifier.to_string()),
        }
    }
}

impl fmt::Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl std::str::FromStr for Technology {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Technology::from_identifier(s))
    }
}

/// Classification of a presented tag, decides the read strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TagKind {
    /// Carries an NDEF message.
    Standard,
    /// Block memory behind a key handshake (MIFARE Classic).
    AuthenticatedSector,
    /// Raw frame access only (NfcA).
    BasicRadioFrame,
    /// Higher-layer protocol over basic frames (IsoDep).
    ExtendedProtocol,
    /// Nothing the engine knows how to read.
    Unknown,
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::Standard => "NDEF",
            Self::AuthenticatedSector => "MifareClassic",
            Self::BasicRadioFrame => "NfcA",
            Self::ExtendedProtocol => "ISO-DEP",
            Self::Unknown => "Unknown",
        };
        write!(f, "{name}")
    }
}

/// Type Name Format of an NDEF record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Tnf {
    Empty = 0x00,
    WellKnown = 0x01,
    MimeMedia = 0x02,
    AbsoluteUri = 0x03,
    External = 0x04,
    Unknown = 0x05,
    Unchanged = 0x06,
    Reserved = 0x07,
}

impl Tnf {
    /// Decode the low three bits of a record header.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x07 {
            0x00 => Self::Empty,
            0x01 => Self::WellKnown,
            0x02 => Self::MimeMedia,
            0x03 => Self::AbsoluteUri,
            0x04 => Self::External,
            0x05 => Self::Unknown,
            0x06 => Self::Unchanged,
            _ => Self::Reserved,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// One record of an NDEF message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NdefRecord {
    pub tnf: Tnf,
    pub record_type: Vec<u8>,
    pub id: Vec<u8>,
    pub payload: Vec<u8>,
}

impl NdefRecord {
    /// Record type of a well-known text record (`"T"`).
    pub const TEXT_TYPE: &'static [u8] = b"T";

    pub fn new(tnf: Tnf, record_type: Vec<u8>, payload: Vec<u8>) -> Self {
        Self {
            tnf,
            record_type,
            id: Vec::new(),
            payload,
        }
    }

    /// Well-known text record with an already encoded payload.
    pub fn text(payload: Vec<u8>) -> Self {
        Self::new(Tnf::WellKnown, Self::TEXT_TYPE.to_vec(), payload)
    }

    pub fn is_text(&self) -> bool {
        self.tnf == Tnf::WellKnown && self.record_type == Self::TEXT_TYPE
    }
}

/// Low-level metadata reported by the radio with the tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagMetadata {
    /// ATQA (answer to request, type A).
    pub atqa: Option<Vec<u8>>,
    /// SAK (select acknowledge).
    pub sak: Option<u8>,
    /// ISO-DEP historical bytes (NfcA).
    pub historical_bytes: Option<Vec<u8>>,
    /// ISO-DEP higher-layer response (NfcB).
    pub hi_layer_response: Option<Vec<u8>>,
}

/// Snapshot of a physically presented tag.
///
/// Valid only for the session it was read in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Unique identifier (UID) bytes.
    pub id: Vec<u8>,
    /// Technologies the tag advertises.
    pub technologies: Vec<Technology>,
    /// Cached NDEF message, if the tag carries one.
    pub ndef_message: Option<Vec<NdefRecord>>,
    /// Protocol metadata.
    pub metadata: TagMetadata,
    /// Tag-type label reported by the radio stack (e.g. `"NFC Forum Type 2"`).
    pub type_name: Option<String>,
}

impl Tag {
    /// Start building a tag snapshot with the given UID.
    ///
    /// # Examples
    ///
    /// ```
    /// use nfctap_core::{Tag, Technology};
    ///
    /// let tag = Tag::builder(vec![0x04, 0xAB, 0xCD, 0xEF])
    ///     .technology(Technology::NfcA)
    ///     .technology(Technology::MifareClassic)
    ///     .build();
    ///
    /// assert_eq!(tag.uid_hex(), "04ABCDEF");
    /// assert!(tag.has_technology(&Technology::NfcA));
    /// ```
    pub fn builder(id: Vec<u8>) -> TagBuilder {
        TagBuilder::new(id)
    }

    /// UID as uppercase hex.
    pub fn uid_hex(&self) -> String {
        hex::encode_upper(&self.id)
    }

    pub fn has_technology(&self, technology: &Technology) -> bool {
        self.technologies.contains(technology)
    }

    /// True when an NDEF message is attached, even an empty one.
    pub fn has_ndef_message(&self) -> bool {
        self.ndef_message.is_some()
    }
}

/// Builder for [`Tag`] snapshots.
#[derive(Debug, Clone)]
pub struct TagBuilder {
    tag: Tag,
}

impl TagBuilder {
    pub fn new(id: Vec<u8>) -> Self {
        Self {
            tag: Tag {
                id,
                technologies: Vec::new(),
                ndef_message: None,
                metadata: TagMetadata::default(),
                type_name: None,
            },
        }
    }

    pub fn technology(mut self, technology: Technology) -> Self {
        if !self.tag.technologies.contains(&technology) {
            self.tag.technologies.push(technology);
        }
        self
    }

    pub fn technologies(mut self, technologies: impl IntoIterator<Item = Technology>) -> Self {
        for technology in technologies {
            self = self.technology(technology);
        }
        self
    }

    /// Attach an NDEF message; also advertises [`Technology::Ndef`].
    pub fn ndef_message(mut self, records: Vec<NdefRecord>) -> Self {
        self.tag.ndef_message = Some(records);
        self.technology(Technology::Ndef)
    }

    pub fn atqa(mut self, atqa: Vec<u8>) -> Self {
        self.tag.metadata.atqa = Some(atqa);
        self
    }

    pub fn sak(mut self, sak: u8) -> Self {
        self.tag.metadata.sak = Some(sak);
        self
    }

    pub fn historical_bytes(mut self, bytes: Vec<u8>) -> Self {
        self.tag.metadata.historical_bytes = Some(bytes);
        self
    }

    pub fn hi_layer_response(mut self, bytes: Vec<u8>) -> Self {
        self.tag.metadata.hi_layer_response = Some(bytes);
        self
    }

    pub fn type_name(mut self, name: impl Into<String>) -> Self {
        self.tag.type_name = Some(name.into());
        self
    }

    pub fn build(self) -> Tag {
        self.tag
    }
}

/// Labels used in [`TagInfo`] entries.
pub mod labels {
    pub const UID: &str = "uid";
    pub const ATQA: &str = "atqa";
    pub const SAK: &str = "sak";
    pub const HISTORICAL_BYTES: &str = "historical_bytes";
    pub const HI_LAYER_RESPONSE: &str = "hi_layer_response";
    pub const TECHNOLOGIES: &str = "technologies";
    pub const TYPE: &str = "type";
    pub const STATUS: &str = "status";
    pub const CONTENT: &str = "content";

    /// Marker value of [`STATUS`] for tags no strategy can read.
    pub const UNSUPPORTED: &str = "unsupported";

    /// Label of a block read over raw frames.
    pub fn block(index: u8) -> String {
        format!("block {index}")
    }
}

/// Ordered label/value pairs describing a tag that yielded no text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagInfo {
    entries: Vec<(String, String)>,
}

impl TagInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry, keeping first-insertion order.
    pub fn insert(&mut self, label: impl Into<String>, value: impl Into<String>) {
        let label = label.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(l, _)| *l == label) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((label, value)),
        }
    }

    pub fn with(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(label, value);
        self
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, label: &str) -> bool {
        self.get(label).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(l, v)| (l.as_str(), v.as_str()))
    }

    /// True when the info marks the tag as unreadable.
    pub fn is_unsupported(&self) -> bool {
        self.get(labels::STATUS) == Some(labels::UNSUPPORTED)
    }
}

impl fmt::Display for TagInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (label, value) in self.iter() {
            writeln!(f, "{label}: {value}")?;
        }
        Ok(())
    }
}

/// Outcome of a read request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadResult {
    /// Decoded text content.
    Text(String),
    /// Structured metadata for tags without decodable text.
    RawInfo(TagInfo),
    /// The read failed; the engine stays usable.
    Failure(Error),
}

impl ReadResult {
    pub fn failure(&self) -> Option<&Error> {
        match self {
            Self::Failure(error) => Some(error),
            _ => None,
        }
    }

    /// Text worth showing to the user after this read, if any.
    ///
    /// Decoded text is shown as-is. For metadata results the first
    /// block content wins, then the UID. Unsupported tags and failures
    /// show nothing.
    pub fn display_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text.as_str()),
            Self::RawInfo(info) if info.is_unsupported() => None,
            Self::RawInfo(info) => info.get(labels::CONTENT).or_else(|| info.get(labels::UID)),
            Self::Failure(_) => None,
        }
    }
}

impl From<crate::Result<ReadResult>> for ReadResult {
    fn from(result: crate::Result<ReadResult>) -> Self {
        result.unwrap_or_else(ReadResult::Failure)
    }
}

/// The most recent successful read, held for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannedContent {
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl ScannedContent {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("android.nfc.tech.NfcA", Technology::NfcA)]
    #[case("android.nfc.tech.IsoDep", Technology::IsoDep)]
    #[case("android.nfc.tech.MifareClassic", Technology::MifareClassic)]
    #[case("Ndef", Technology::Ndef)]
    fn test_technology_from_identifier(#[case] identifier: &str, #[case] expected: Technology) {
        assert_eq!(Technology::from_identifier(identifier), expected);
    }

    #[test]
    fn test_technology_identifier_roundtrip() {
        let tech = Technology::MifareUltralight;
        assert_eq!(tech.identifier(), "android.nfc.tech.MifareUltralight");
        assert_eq!(Technology::from_identifier(&tech.identifier()), tech);
    }

    #[test]
    fn test_unknown_technology_preserved() {
        let tech: Technology = "com.vendor.tech.Proprietary".parse().unwrap();
        assert_eq!(
            tech,
            Technology::Other("com.vendor.tech.Proprietary".to_string())
        );
        assert_eq!(tech.to_string(), "com.vendor.tech.Proprietary");
    }

    #[test]
    fn test_tag_builder_ndef_adds_technology() {
        let tag = Tag::builder(vec![0x01, 0x02])
            .ndef_message(vec![NdefRecord::text(b"\x02enhi".to_vec())])
            .build();
        assert!(tag.has_ndef_message());
        assert!(tag.has_technology(&Technology::Ndef));
    }

    #[test]
    fn test_tag_builder_deduplicates_technologies() {
        let tag = Tag::builder(vec![0x01])
            .technology(Technology::NfcA)
            .technologies([Technology::NfcA, Technology::IsoDep])
            .build();
        assert_eq!(tag.technologies, vec![Technology::NfcA, Technology::IsoDep]);
    }

    #[test]
    fn test_uid_hex() {
        let tag = Tag::builder(vec![0x04, 0xab, 0x0c]).build();
        assert_eq!(tag.uid_hex(), "04AB0C");
    }

    #[test]
    fn test_tag_info_insert_replaces_in_place() {
        let mut info = TagInfo::new().with("uid", "01").with("sak", "08");
        info.insert("uid", "02");
        let entries: Vec<_> = info.iter().collect();
        assert_eq!(entries, vec![("uid", "02"), ("sak", "08")]);
    }

    #[test]
    fn test_display_text_prefers_content() {
        let info = TagInfo::new()
            .with(labels::UID, "04ABCDEF")
            .with(labels::CONTENT, "room 12");
        assert_eq!(ReadResult::RawInfo(info).display_text(), Some("room 12"));
    }

    #[test]
    fn test_display_text_falls_back_to_uid() {
        let info = TagInfo::new().with(labels::UID, "04ABCDEF");
        assert_eq!(ReadResult::RawInfo(info).display_text(), Some("04ABCDEF"));
    }

    #[test]
    fn test_display_text_hides_unsupported() {
        let info = TagInfo::new()
            .with(labels::UID, "04ABCDEF")
            .with(labels::STATUS, labels::UNSUPPORTED);
        assert_eq!(ReadResult::RawInfo(info).display_text(), None);
        assert_eq!(ReadResult::Failure(Error::Disabled).display_text(), None);
    }

    #[test]
    fn test_read_result_from_result() {
        let ok: crate::Result<ReadResult> = Ok(ReadResult::Text("hi".into()));
        assert_eq!(ReadResult::from(ok), ReadResult::Text("hi".into()));

        let err: crate::Result<ReadResult> = Err(Error::EmptyInput);
        assert_eq!(
            ReadResult::from(err),
            ReadResult::Failure(Error::EmptyInput)
        );
    }

    #[test]
    fn test_read_result_serializes() {
        let json = serde_json::to_string(&ReadResult::Text("hello".into())).unwrap();
        assert_eq!(json, r#"{"Text":"hello"}"#);
    }

    #[test]
    fn test_tnf_from_bits_masks_flags() {
        assert_eq!(Tnf::from_bits(0xD1), Tnf::WellKnown);
        assert_eq!(Tnf::from_bits(0x02), Tnf::MimeMedia);
    }
}
