//! The engine facade.
//!
//! [`TagEngine`] is the only entry point a front end needs. Each request
//! checks the radio, opens one session, runs one strategy and releases
//! the session before returning. Failures come back as values and leave
//! the engine ready for the next request.
//!
//! # Example
//!
//! ```
//! use nfctap_core::{ReadResult, Tag};
//! use nfctap_engine::{EngineConfig, TagEngine};
//! use nfctap_hardware::mock::{MockRadio, MockTag};
//! use nfctap_ndef::text_record;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let (radio, handle) = MockRadio::new();
//! let engine = TagEngine::new(radio, EngineConfig::default());
//!
//! let tag = Tag::builder(vec![0x04, 0xA2, 0x3B, 0x1C])
//!     .ndef_message(vec![text_record("hello").unwrap()])
//!     .build();
//! handle.present_tag(MockTag::new(tag)).await.unwrap();
//!
//! assert_eq!(engine.request_read().await, ReadResult::Text("hello".into()));
//! assert_eq!(engine.current_scanned_content().unwrap().text, "hello");
//! # }
//! ```

use crate::config::EngineConfig;
use crate::dispatcher::ReadDispatcher;
use crate::resolver;
use crate::session::{RadioSessionManager, SessionStats};
use crate::store::TransientResultStore;
use crate::writer::{RawBlockWriter, WriteStrategy};
use nfctap_core::{Error, ReadResult, Result, ScannedContent};
use nfctap_hardware::{HardwareError, RadioDevice, ReaderInfo};
use tokio::sync::watch;
use tracing::{info, warn};

/// Read/write engine over one radio.
#[derive(Debug)]
pub struct TagEngine<R> {
    config: EngineConfig,
    sessions: RadioSessionManager<R>,
    dispatcher: ReadDispatcher,
    writer: WriteStrategy,
    raw_writer: Option<RawBlockWriter>,
    store: TransientResultStore,
}

impl<R: RadioDevice> TagEngine<R> {
    pub fn new(radio: R, config: EngineConfig) -> Self {
        Self {
            sessions: RadioSessionManager::new(radio, config.acquire_timeout()),
            dispatcher: ReadDispatcher::from_config(&config),
            writer: WriteStrategy::default(),
            raw_writer: RawBlockWriter::from_config(&config.raw_block_write, config.sector_key),
            store: TransientResultStore::new(config.display_window()),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Check the radio and log its state.
    ///
    /// # Errors
    ///
    /// [`Error::Unsupported`] or [`Error::Disabled`] when the radio is
    /// unusable. The engine can still be used once the radio comes back.
    pub async fn start(&self) -> Result<()> {
        match self.sessions.check_preconditions().await {
            Ok(()) => {
                info!(platform = ?self.config.platform, "NFC supported and enabled");
                Ok(())
            }
            Err(e) => {
                warn!("NFC unavailable: {}", e);
                Err(e)
            }
        }
    }

    /// Wait for a tag and read it.
    ///
    /// Text worth showing is kept in the scanned-content store.
    pub async fn request_read(&self) -> ReadResult {
        let result: ReadResult = self.read_once().await.into();

        match &result {
            ReadResult::Failure(e) => warn!(kind = %e.kind(), "Read failed: {}", e),
            ReadResult::Text(_) => info!("Tag read: text"),
            ReadResult::RawInfo(tag_info) => info!(entries = tag_info.len(), "Tag read: metadata"),
        }
        if let Some(text) = result.display_text() {
            self.store.set(text);
        }
        result
    }

    /// Wait for an NDEF tag and write `text` to it.
    ///
    /// Blank text is refused before the radio is touched.
    pub async fn request_write(&self, text: &str) -> Result<()> {
        let message = self.writer.prepare(text)?;
        self.sessions.check_preconditions().await?;

        info!("Hold an NDEF tag close to the device to write");
        let mut session = self
            .sessions
            .acquire(&self.writer.technologies())
            .await
            .map_err(write_acquisition_error)?;

        let outcome = self.writer.commit(&message, &mut *session).await;
        session.release();

        if let Err(e) = &outcome {
            warn!("Write failed: {}", e);
        }
        outcome
    }

    /// Overwrite the configured block with `text` over raw frames.
    ///
    /// # Errors
    ///
    /// [`Error::WriteRejected`] unless raw block writes are enabled in the
    /// configuration.
    pub async fn request_raw_block_write(&self, text: &str) -> Result<()> {
        let Some(writer) = &self.raw_writer else {
            return Err(Error::write_rejected("raw block writes are disabled"));
        };
        let data = writer.prepare(text)?;
        self.sessions.check_preconditions().await?;

        info!(
            block = writer.block(),
            "Hold an NfcA tag close to the device to write"
        );
        let mut session = self
            .sessions
            .acquire(&writer.technologies())
            .await
            .map_err(write_acquisition_error)?;

        let outcome = writer.commit(&data, &mut *session).await;
        session.release();

        if let Err(e) = &outcome {
            warn!("Raw block write failed: {}", e);
        }
        outcome
    }

    pub fn dismiss_scanned_content(&self) {
        self.store.clear();
    }

    pub fn current_scanned_content(&self) -> Option<ScannedContent> {
        self.store.current()
    }

    pub fn subscribe_scanned_content(&self) -> watch::Receiver<Option<ScannedContent>> {
        self.store.subscribe()
    }

    /// Reader information for diagnostics.
    pub async fn reader_info(&self) -> nfctap_hardware::Result<ReaderInfo> {
        self.sessions.reader_info().await
    }

    pub fn session_stats(&self) -> SessionStats {
        self.sessions.stats()
    }

    async fn read_once(&self) -> Result<ReadResult> {
        self.sessions.check_preconditions().await?;

        info!("Hold your NFC tag close to the device");
        let technologies = self.config.platform.read_technologies();
        let mut session = self
            .sessions
            .acquire(&technologies)
            .await
            .map_err(read_acquisition_error)?;

        let tag = session
            .tag()
            .await
            .map_err(|e| {
                Error::acquisition_timeout(format!("tag lost before it could be read: {e}"))
            })?;

        let kind = resolver::classify(&tag);
        info!(uid = %tag.uid_hex(), %kind, "Tag detected");

        let result = self.dispatcher.read(kind, &tag, &mut *session).await;
        session.release();
        Ok(result)
    }
}

fn read_acquisition_error(error: HardwareError) -> Error {
    match error {
        HardwareError::Timeout { duration_ms } => {
            Error::acquisition_timeout(format!("no tag presented within {duration_ms}ms"))
        }
        other => Error::acquisition_timeout(other.to_string()),
    }
}

fn write_acquisition_error(error: HardwareError) -> Error {
    match error {
        HardwareError::Timeout { duration_ms } => {
            Error::acquisition_timeout(format!("no tag presented within {duration_ms}ms"))
        }
        other => Error::write_rejected(other.to_string()),
    }
}
