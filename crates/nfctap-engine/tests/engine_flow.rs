//! End-to-end read/write flows against the mock radio.
//!
//! Every test checks the session bookkeeping as well as the result: each
//! acquisition must be matched by exactly one release, whatever happened.

mod common;

use common::{engine, failure_kind, ndef_text_tag, sector_tag, unreadable_tag, writable_ndef_tag};
use nfctap_core::constants::{MIFARE_CMD_AUTH_A, MIFARE_CMD_WRITE};
use nfctap_core::{Error, ErrorKind, ReadResult, Tag, Technology, labels};
use nfctap_engine::{EngineConfig, Platform, SessionStats};
use nfctap_hardware::mock::{MockRadioHandle, MockTag};
use nfctap_ndef::{TextRecord, decode_message};
use std::time::Duration;

fn assert_balanced(handle: &MockRadioHandle, acquisitions: usize) {
    assert_eq!(handle.acquisitions(), acquisitions, "acquisitions");
    assert_eq!(handle.releases(), acquisitions, "releases");
    assert!(!handle.is_session_open());
}

// ============================================================================
// Reads
// ============================================================================

#[tokio::test]
async fn test_read_ndef_text() {
    let (engine, handle) = engine(EngineConfig::default());
    handle
        .present_tag(ndef_text_tag(vec![0x04, 0xA2, 0x3B, 0x1C], "hello"))
        .await
        .unwrap();

    let result = engine.request_read().await;

    assert_eq!(result, ReadResult::Text("hello".to_string()));
    assert_eq!(engine.current_scanned_content().unwrap().text, "hello");
    assert_balanced(&handle, 1);
    assert_eq!(
        engine.session_stats(),
        SessionStats {
            acquisitions: 1,
            releases: 1
        }
    );
}

#[tokio::test]
async fn test_read_authenticated_sector() {
    let (engine, handle) = engine(EngineConfig::default());
    handle
        .present_tag(sector_tag(b"meeting\0\0\0\0\0\0\0\0\0"))
        .await
        .unwrap();

    let result = engine.request_read().await;

    assert_eq!(result, ReadResult::Text("meeting".to_string()));
    assert_eq!(engine.current_scanned_content().unwrap().text, "meeting");
    assert_balanced(&handle, 1);
}

#[tokio::test]
async fn test_read_sector_with_wrong_key() {
    let config = EngineConfig::default().with_sector_key([0x12; 6]);
    let (engine, handle) = engine(config);
    handle.present_tag(sector_tag(b"meeting")).await.unwrap();

    let result = engine.request_read().await;

    assert!(matches!(
        result,
        ReadResult::Failure(Error::AuthRequired { sector: 1, .. })
    ));
    assert!(engine.current_scanned_content().is_none());
    assert_balanced(&handle, 1);
}

#[tokio::test]
async fn test_read_mifare_card_over_raw_frames() {
    let (engine, handle) = engine(EngineConfig::default());
    handle
        .present_tag(MockTag::mifare_classic(vec![0x0A, 0x0B, 0x0C, 0x0D]))
        .await
        .unwrap();

    let result = engine.request_read().await;

    let ReadResult::RawInfo(info) = &result else {
        panic!("expected raw info, got {result:?}");
    };
    assert_eq!(info.get(labels::UID), Some("0A0B0C0D"));
    assert_eq!(engine.current_scanned_content().unwrap().text, "0A0B0C0D");
    assert_balanced(&handle, 1);
}

#[tokio::test]
async fn test_read_raw_frame_content() {
    let (engine, handle) = engine(EngineConfig::default());
    let tag = Tag::builder(vec![0x04, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06])
        .technology(Technology::NfcA)
        .build();
    handle
        .present_tag(MockTag::new(tag).with_block(6, b"DESK 7"))
        .await
        .unwrap();

    let result = engine.request_read().await;

    assert_eq!(result.display_text(), Some("DESK 7"));
    assert_eq!(engine.current_scanned_content().unwrap().text, "DESK 7");
}

#[tokio::test]
async fn test_read_extended_protocol() {
    let (engine, handle) = engine(EngineConfig::default());
    let tag = Tag::builder(vec![0x08, 0x9A, 0x7B, 0x6C])
        .technology(Technology::IsoDep)
        .hi_layer_response(vec![0x00, 0x11])
        .build();
    handle.present_tag(MockTag::new(tag)).await.unwrap();

    let result = engine.request_read().await;

    let ReadResult::RawInfo(info) = &result else {
        panic!("expected raw info, got {result:?}");
    };
    assert_eq!(info.get(labels::HI_LAYER_RESPONSE), Some("0011"));
    assert_eq!(engine.current_scanned_content().unwrap().text, "089A7B6C");
}

#[tokio::test]
async fn test_read_unknown_tag() {
    let (engine, handle) = engine(EngineConfig::default());
    handle.present_tag(unreadable_tag()).await.unwrap();

    let result = engine.request_read().await;

    let ReadResult::RawInfo(info) = &result else {
        panic!("expected raw info, got {result:?}");
    };
    assert_eq!(info.get(labels::UID), Some("E0040150"));
    assert_eq!(info.get(labels::STATUS), Some(labels::UNSUPPORTED));
    assert!(engine.current_scanned_content().is_none());
    assert_balanced(&handle, 1);
}

#[tokio::test]
async fn test_failed_read_leaves_engine_usable() {
    let (engine, handle) = engine(EngineConfig::default());
    let broken = Tag::builder(vec![0x04, 0x01])
        .ndef_message(vec![nfctap_core::NdefRecord::text(vec![0x3F])])
        .build();
    handle.present_tag(MockTag::new(broken)).await.unwrap();
    handle
        .present_tag(ndef_text_tag(vec![0x04, 0x02], "second"))
        .await
        .unwrap();

    let first = engine.request_read().await;
    assert_eq!(failure_kind(&first), Some(ErrorKind::MalformedPayload));

    let second = engine.request_read().await;
    assert_eq!(second, ReadResult::Text("second".to_string()));
    assert_balanced(&handle, 2);
}

#[tokio::test]
async fn test_tag_lost_after_detection() {
    let (engine, handle) = engine(EngineConfig::default());
    let tag = ndef_text_tag(vec![0x04, 0x03], "gone").leaves_field();
    handle.present_tag(tag).await.unwrap();

    let result = engine.request_read().await;

    assert_eq!(failure_kind(&result), Some(ErrorKind::AcquisitionTimeout));
    let error = result.failure().unwrap();
    assert!(error.to_string().contains("tag lost"));
    assert!(engine.current_scanned_content().is_none());
    assert_balanced(&handle, 1);
}

#[tokio::test]
async fn test_newer_read_replaces_content() {
    let (engine, handle) = engine(EngineConfig::default());
    handle
        .present_tag(ndef_text_tag(vec![0x01], "first"))
        .await
        .unwrap();
    handle
        .present_tag(ndef_text_tag(vec![0x02], "second"))
        .await
        .unwrap();

    engine.request_read().await;
    engine.request_read().await;

    assert_eq!(engine.current_scanned_content().unwrap().text, "second");
}

#[tokio::test]
async fn test_dismiss_clears_content() {
    let (engine, handle) = engine(EngineConfig::default());
    let mut rx = engine.subscribe_scanned_content();
    handle
        .present_tag(ndef_text_tag(vec![0x01], "hello"))
        .await
        .unwrap();

    engine.request_read().await;
    assert_eq!(rx.borrow_and_update().as_ref().unwrap().text, "hello");

    engine.dismiss_scanned_content();
    assert!(engine.current_scanned_content().is_none());
    assert!(rx.has_changed().unwrap());
    assert!(rx.borrow_and_update().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_read_times_out_without_tag() {
    let config = EngineConfig::default().with_acquire_timeout(Duration::from_secs(5));
    let (engine, handle) = engine(config);

    let result = engine.request_read().await;

    assert_eq!(failure_kind(&result), Some(ErrorKind::AcquisitionTimeout));
    assert_balanced(&handle, 1);
}

#[tokio::test(start_paused = true)]
async fn test_ios_ignores_sector_only_tags() {
    let config = EngineConfig::default()
        .with_platform(Platform::Ios)
        .with_acquire_timeout(Duration::from_secs(5));
    let (engine, handle) = engine(config);
    handle.present_tag(sector_tag(b"meeting")).await.unwrap();

    let result = engine.request_read().await;

    assert_eq!(failure_kind(&result), Some(ErrorKind::AcquisitionTimeout));
    assert_balanced(&handle, 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_read_releases_session() {
    let (engine, handle) = engine(EngineConfig::default());

    let abandoned = tokio::time::timeout(Duration::from_millis(200), engine.request_read()).await;
    assert!(abandoned.is_err());
    assert_balanced(&handle, 1);

    handle
        .present_tag(ndef_text_tag(vec![0x01], "after"))
        .await
        .unwrap();
    assert_eq!(
        engine.request_read().await,
        ReadResult::Text("after".to_string())
    );
    assert_balanced(&handle, 2);
}

#[tokio::test]
async fn test_concurrent_reads_never_overlap() {
    let (engine, handle) = engine(EngineConfig::default());
    handle
        .present_tag(ndef_text_tag(vec![0x01], "one"))
        .await
        .unwrap();
    handle
        .present_tag(ndef_text_tag(vec![0x02], "two"))
        .await
        .unwrap();

    let (first, second) = tokio::join!(engine.request_read(), engine.request_read());

    let mut texts = vec![
        first.display_text().unwrap().to_string(),
        second.display_text().unwrap().to_string(),
    ];
    texts.sort();
    assert_eq!(texts, vec!["one", "two"]);
    assert_balanced(&handle, 2);
}

// ============================================================================
// Preconditions
// ============================================================================

#[tokio::test]
async fn test_disabled_radio() {
    let (engine, handle) = engine(EngineConfig::default());
    handle.set_enabled(false);

    assert_eq!(engine.start().await, Err(Error::Disabled));
    assert_eq!(
        engine.request_read().await,
        ReadResult::Failure(Error::Disabled)
    );
    assert_eq!(engine.request_write("hello").await, Err(Error::Disabled));
    assert_eq!(handle.acquisitions(), 0);

    handle.set_enabled(true);
    assert!(engine.start().await.is_ok());
}

#[tokio::test]
async fn test_unsupported_radio() {
    let (engine, handle) = engine(EngineConfig::default());
    handle.set_supported(false);

    assert_eq!(engine.start().await, Err(Error::Unsupported));
    assert_eq!(
        engine.request_read().await,
        ReadResult::Failure(Error::Unsupported)
    );
    assert_eq!(handle.acquisitions(), 0);
}

// ============================================================================
// Writes
// ============================================================================

#[tokio::test]
async fn test_write_text() {
    let (engine, handle) = engine(EngineConfig::default());
    handle.present_tag(writable_ndef_tag()).await.unwrap();

    engine.request_write("hello").await.unwrap();

    let writes = handle.ndef_writes();
    assert_eq!(writes.len(), 1);
    let records = decode_message(&writes[0]).unwrap();
    let text = TextRecord::decode(&records[0].payload).unwrap();
    assert_eq!(text.text, "hello");
    assert_eq!(text.language, "en");
    assert_balanced(&handle, 1);
}

#[tokio::test]
async fn test_blank_write_never_touches_radio() {
    let (engine, handle) = engine(EngineConfig::default());

    assert_eq!(engine.request_write("").await, Err(Error::EmptyInput));
    assert_eq!(engine.request_write("   ").await, Err(Error::EmptyInput));

    assert_eq!(handle.acquisitions(), 0);
    assert_eq!(engine.session_stats(), SessionStats::default());
}

#[tokio::test]
async fn test_write_read_only_tag() {
    let (engine, handle) = engine(EngineConfig::default());
    handle
        .present_tag(writable_ndef_tag().read_only())
        .await
        .unwrap();

    let result = engine.request_write("hello").await;

    assert_eq!(result.unwrap_err().kind(), ErrorKind::WriteRejected);
    assert!(handle.ndef_writes().is_empty());
    assert_balanced(&handle, 1);
}

#[tokio::test]
async fn test_write_over_capacity() {
    let (engine, handle) = engine(EngineConfig::default());
    handle
        .present_tag(writable_ndef_tag().with_ndef_capacity(8))
        .await
        .unwrap();

    let result = engine.request_write("this will not fit").await;

    assert_eq!(result.unwrap_err().kind(), ErrorKind::WriteRejected);
    assert_balanced(&handle, 1);
}

#[tokio::test]
async fn test_write_ignores_non_ndef_tags() {
    let config = EngineConfig::default().with_acquire_timeout(Duration::from_millis(50));
    let (engine, handle) = engine(config);
    handle
        .present_tag(MockTag::mifare_classic(vec![0x01, 0x02, 0x03, 0x04]))
        .await
        .unwrap();

    let result = engine.request_write("hello").await;

    assert_eq!(result.unwrap_err().kind(), ErrorKind::AcquisitionTimeout);
    assert!(handle.frames().is_empty());
    assert_balanced(&handle, 1);
}

// ============================================================================
// Raw block writes
// ============================================================================

#[tokio::test]
async fn test_raw_block_write_disabled_by_default() {
    let (engine, handle) = engine(EngineConfig::default());
    handle
        .present_tag(MockTag::mifare_classic(vec![0x01, 0x02, 0x03, 0x04]))
        .await
        .unwrap();

    let result = engine.request_raw_block_write("ROOM 12").await;

    assert_eq!(result.unwrap_err().kind(), ErrorKind::WriteRejected);
    assert_eq!(handle.acquisitions(), 0);
}

#[tokio::test]
async fn test_raw_block_write_frames() {
    let config = EngineConfig::default().with_raw_block_write(4);
    let (engine, handle) = engine(config);
    let tag = Tag::builder(vec![0x04, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06])
        .technology(Technology::NfcA)
        .build();
    handle.present_tag(MockTag::new(tag)).await.unwrap();

    engine.request_raw_block_write("ROOM 12").await.unwrap();

    let frames = handle.frames();
    assert_eq!(frames[0][0], MIFARE_CMD_AUTH_A);
    assert_eq!(&frames[1][..2], &[MIFARE_CMD_WRITE, 4]);
    assert_eq!(&frames[1][2..9], b"ROOM 12");
    assert_eq!(frames[1].len(), 18);
    assert_balanced(&handle, 1);
}

#[tokio::test]
async fn test_raw_block_write_input_checks() {
    let config = EngineConfig::default().with_raw_block_write(4);
    let (engine, handle) = engine(config);

    assert_eq!(
        engine.request_raw_block_write(" ").await,
        Err(Error::EmptyInput)
    );
    assert_eq!(
        engine
            .request_raw_block_write("more than sixteen bytes")
            .await
            .unwrap_err()
            .kind(),
        ErrorKind::EncodingFailed
    );
    assert_eq!(handle.acquisitions(), 0);
}

#[tokio::test]
async fn test_reader_info() {
    let (engine, _handle) = engine(EngineConfig::default());
    let info = engine.reader_info().await.unwrap();
    assert_eq!(info.name, "Mock NFC Radio");
}
