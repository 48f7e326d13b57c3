//! Tag classification.

use nfctap_core::{Tag, TagKind, Technology};

/// Decide how a tag will be read. First match wins:
///
/// 1. NDEF message present: [`TagKind::Standard`]
/// 2. NfcA: [`TagKind::BasicRadioFrame`]
/// 3. IsoDep: [`TagKind::ExtendedProtocol`]
/// 4. MifareClassic: [`TagKind::AuthenticatedSector`]
/// 5. anything else: [`TagKind::Unknown`]
///
/// A MIFARE Classic card also advertises NfcA, so it is read over raw
/// frames; the sector handshake only applies to radios that expose
/// MifareClassic alone.
///
/// # Examples
///
/// ```
/// use nfctap_core::{Tag, TagKind, Technology};
/// use nfctap_engine::resolver::classify;
///
/// let tag = Tag::builder(vec![0x04, 0x01])
///     .technologies([Technology::NfcA, Technology::MifareClassic])
///     .build();
/// assert_eq!(classify(&tag), TagKind::BasicRadioFrame);
/// ```
pub fn classify(tag: &Tag) -> TagKind {
    if tag.has_ndef_message() {
        TagKind::Standard
    } else if tag.has_technology(&Technology::NfcA) {
        TagKind::BasicRadioFrame
    } else if tag.has_technology(&Technology::IsoDep) {
        TagKind::ExtendedProtocol
    } else if tag.has_technology(&Technology::MifareClassic) {
        TagKind::AuthenticatedSector
    } else {
        TagKind::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nfctap_core::NdefRecord;
    use proptest::prelude::*;
    use rstest::rstest;

    fn tag_with(technologies: &[Technology]) -> Tag {
        Tag::builder(vec![0x04, 0xAA, 0xBB, 0xCC])
            .technologies(technologies.iter().cloned())
            .build()
    }

    #[rstest]
    #[case(&[Technology::NfcA], TagKind::BasicRadioFrame)]
    #[case(&[Technology::NfcA, Technology::MifareClassic], TagKind::BasicRadioFrame)]
    #[case(&[Technology::NfcA, Technology::IsoDep], TagKind::BasicRadioFrame)]
    #[case(&[Technology::IsoDep], TagKind::ExtendedProtocol)]
    #[case(&[Technology::IsoDep, Technology::MifareClassic], TagKind::ExtendedProtocol)]
    #[case(&[Technology::MifareClassic], TagKind::AuthenticatedSector)]
    #[case(&[Technology::NfcV], TagKind::Unknown)]
    #[case(&[], TagKind::Unknown)]
    fn test_classify(#[case] technologies: &[Technology], #[case] expected: TagKind) {
        assert_eq!(classify(&tag_with(technologies)), expected);
    }

    #[test]
    fn test_ndef_technology_without_message_is_not_standard() {
        let tag = tag_with(&[Technology::Ndef]);
        assert_eq!(classify(&tag), TagKind::Unknown);
    }

    fn any_technology() -> impl Strategy<Value = Technology> {
        prop_oneof![
            Just(Technology::NdefFormatable),
            Just(Technology::NfcA),
            Just(Technology::NfcB),
            Just(Technology::NfcF),
            Just(Technology::NfcV),
            Just(Technology::IsoDep),
            Just(Technology::MifareClassic),
            Just(Technology::MifareUltralight),
        ]
    }

    proptest! {
        #[test]
        fn prop_ndef_message_always_standard(
            technologies in prop::collection::vec(any_technology(), 0..6),
        ) {
            let tag = Tag::builder(vec![0x01, 0x02, 0x03, 0x04])
                .technologies(technologies)
                .ndef_message(vec![NdefRecord::text(b"\x02enhi".to_vec())])
                .build();
            prop_assert_eq!(classify(&tag), TagKind::Standard);
        }
    }
}
