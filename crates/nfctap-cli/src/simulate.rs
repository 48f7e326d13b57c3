//! Simulated radio for trying the CLI without a reader.

use crate::Commands;
use nfctap_core::{Tag, Technology};
use nfctap_hardware::AnyRadioDevice;
use nfctap_hardware::mock::{MockRadio, MockRadioHandle, MockTag};
use nfctap_ndef::text_record;
use std::time::Duration;
use tracing::{debug, warn};

/// Text stored on the demo tag.
pub const DEMO_TEXT: &str = "hello from nfctap";

/// Delay before the demo tag is "tapped".
const TAP_DELAY: Duration = Duration::from_millis(500);

pub fn radio() -> (AnyRadioDevice, MockRadioHandle) {
    let (radio, handle) = MockRadio::with_name("nfctap simulator".to_string());
    (AnyRadioDevice::Mock(radio), handle)
}

/// NTAG-style tag carrying [`DEMO_TEXT`].
pub fn demo_text_tag() -> nfctap_core::Result<MockTag> {
    let record = text_record(DEMO_TEXT)?;
    let tag = Tag::builder(vec![0x04, 0xA2, 0x3B, 0x1C, 0x55, 0x60, 0x80])
        .technology(Technology::NfcA)
        .ndef_message(vec![record])
        .type_name("NFC Forum Type 2")
        .atqa(vec![0x44, 0x00])
        .sak(0x00)
        .build();
    Ok(MockTag::new(tag))
}

/// Blank, writable NDEF tag.
pub fn demo_writable_tag() -> MockTag {
    let tag = Tag::builder(vec![0x04, 0x5A, 0x11, 0x22, 0x33, 0x44, 0x80])
        .technologies([Technology::NfcA, Technology::Ndef])
        .type_name("NFC Forum Type 2")
        .build();
    MockTag::new(tag)
}

/// MIFARE Classic 1K with factory keys.
pub fn demo_classic_tag() -> MockTag {
    MockTag::mifare_classic(vec![0x0A, 0x0B, 0x0C, 0x0D])
}

/// Present the tag `command` needs after a short delay.
pub fn present_demo_tag(handle: MockRadioHandle, command: &Commands) {
    let tag = match command {
        Commands::Read { .. } => match demo_text_tag() {
            Ok(tag) => tag,
            Err(e) => {
                warn!("Demo tag could not be built: {}", e);
                return;
            }
        },
        Commands::Write { .. } => demo_writable_tag(),
        Commands::RawWrite { .. } => demo_classic_tag(),
        Commands::Info => return,
    };

    tokio::spawn(async move {
        tokio::time::sleep(TAP_DELAY).await;
        debug!(uid = %tag.tag().uid_hex(), "Simulated tap");
        if let Err(e) = handle.present_tag(tag).await {
            warn!("Simulated tap failed: {}", e);
        }
    });
}
