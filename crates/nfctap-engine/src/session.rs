//! Exclusive access to the radio.
//!
//! The radio sits behind an async mutex owned by [`RadioSessionManager`].
//! [`Session`] holds that mutex for as long as a technology window is open
//! and closes the window in `Drop`, so a session is released on every exit
//! path: normal return, early `?`, timeout, or a dropped future.
//!
//! ```text
//! acquire() ──> lock radio ──> request_technology ──> Session
//!                                                      │
//!                 cancel_technology_request <── Drop ──┘
//! ```

use nfctap_core::{Error, Result, Technology};
use nfctap_hardware::{HardwareError, RadioDevice, ReaderInfo};
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// Session counters, for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Technology requests started.
    pub acquisitions: usize,

    /// Sessions closed.
    pub releases: usize,
}

/// Owns the radio and hands out at most one [`Session`] at a time.
#[derive(Debug)]
pub struct RadioSessionManager<R> {
    radio: Mutex<R>,
    acquire_timeout: Duration,
    acquisitions: AtomicUsize,
    releases: AtomicUsize,
}

impl<R: RadioDevice> RadioSessionManager<R> {
    pub fn new(radio: R, acquire_timeout: Duration) -> Self {
        Self {
            radio: Mutex::new(radio),
            acquire_timeout,
            acquisitions: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
        }
    }

    /// Check that the radio exists and is switched on.
    ///
    /// # Errors
    ///
    /// [`Error::Unsupported`] when the device has no radio (or cannot tell),
    /// [`Error::Disabled`] when the radio is off.
    pub async fn check_preconditions(&self) -> Result<()> {
        let radio = self.radio.lock().await;

        match radio.is_supported().await {
            Ok(true) => {}
            Ok(false) => return Err(Error::Unsupported),
            Err(e) => {
                warn!("Radio support query failed: {}", e);
                return Err(Error::Unsupported);
            }
        }

        match radio.is_enabled().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(Error::Disabled),
            Err(e) => {
                warn!("Radio state query failed: {}", e);
                Err(Error::Disabled)
            }
        }
    }

    /// Wait for a tag speaking one of `technologies` and open a session on it.
    ///
    /// Suspends until a compatible tag is presented or the acquisition
    /// timeout elapses. Waits for any session still in use first.
    ///
    /// # Errors
    ///
    /// [`HardwareError::Timeout`] when no tag arrived in time, or whatever
    /// the radio reported while negotiating.
    pub async fn acquire(
        &self,
        technologies: &[Technology],
    ) -> nfctap_hardware::Result<Session<'_, R>> {
        let attempt = async {
            let radio = self.radio.lock().await;
            self.acquisitions.fetch_add(1, Ordering::Relaxed);

            // Guard exists before the request so cancellation still releases
            let mut session = Session {
                radio,
                technology: None,
                releases: &self.releases,
            };
            let technology = session.radio.request_technology(technologies).await?;
            debug!(%technology, "Radio session opened");
            session.technology = Some(technology);
            Ok::<_, HardwareError>(session)
        };

        match tokio::time::timeout(self.acquire_timeout, attempt).await {
            Ok(result) => result,
            Err(_) => {
                let duration_ms =
                    u64::try_from(self.acquire_timeout.as_millis()).unwrap_or(u64::MAX);
                warn!("No tag presented within {}ms", duration_ms);
                Err(HardwareError::timeout(duration_ms))
            }
        }
    }

    /// Reader information, queried between sessions.
    pub async fn reader_info(&self) -> nfctap_hardware::Result<ReaderInfo> {
        self.radio.lock().await.get_reader_info().await
    }

    /// True while a session holds the radio.
    pub fn is_busy(&self) -> bool {
        self.radio.try_lock().is_err()
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            acquisitions: self.acquisitions.load(Ordering::Relaxed),
            releases: self.releases.load(Ordering::Relaxed),
        }
    }
}

/// An open technology window on the radio.
///
/// Dereferences to the radio. Dropping the session releases it.
pub struct Session<'a, R: RadioDevice> {
    radio: MutexGuard<'a, R>,
    technology: Option<Technology>,
    releases: &'a AtomicUsize,
}

impl<R: RadioDevice> Session<'_, R> {
    /// Technology negotiated with the tag.
    pub fn technology(&self) -> Option<&Technology> {
        self.technology.as_ref()
    }

    /// Release the session now instead of at end of scope.
    pub fn release(self) {}
}

impl<R: RadioDevice> Deref for Session<'_, R> {
    type Target = R;

    fn deref(&self) -> &R {
        &self.radio
    }
}

impl<R: RadioDevice> DerefMut for Session<'_, R> {
    fn deref_mut(&mut self) -> &mut R {
        &mut self.radio
    }
}

impl<R: RadioDevice> Drop for Session<'_, R> {
    fn drop(&mut self) {
        self.radio.cancel_technology_request();
        self.releases.fetch_add(1, Ordering::Relaxed);
        debug!("Radio session released");
    }
}

impl<R: RadioDevice> std::fmt::Debug for Session<'_, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("technology", &self.technology)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nfctap_core::Tag;
    use nfctap_hardware::mock::{MockRadio, MockTag};

    fn nfca_tag() -> MockTag {
        MockTag::new(
            Tag::builder(vec![0x04, 0x11, 0x22, 0x33])
                .technology(Technology::NfcA)
                .build(),
        )
    }

    #[tokio::test]
    async fn test_preconditions() {
        let (radio, handle) = MockRadio::new();
        let manager = RadioSessionManager::new(radio, Duration::from_secs(1));
        assert!(manager.check_preconditions().await.is_ok());

        handle.set_enabled(false);
        assert_eq!(manager.check_preconditions().await, Err(Error::Disabled));

        handle.set_supported(false);
        assert_eq!(manager.check_preconditions().await, Err(Error::Unsupported));
    }

    #[tokio::test]
    async fn test_session_released_on_drop() {
        let (radio, handle) = MockRadio::new();
        let manager = RadioSessionManager::new(radio, Duration::from_secs(1));
        handle.present_tag(nfca_tag()).await.unwrap();

        {
            let session = manager.acquire(&[Technology::NfcA]).await.unwrap();
            assert_eq!(session.technology(), Some(&Technology::NfcA));
            assert!(manager.is_busy());
            assert!(handle.is_session_open());
        }

        assert!(!manager.is_busy());
        assert!(!handle.is_session_open());
        assert_eq!(handle.releases(), 1);
        assert_eq!(
            manager.stats(),
            SessionStats {
                acquisitions: 1,
                releases: 1
            }
        );
    }

    #[tokio::test]
    async fn test_explicit_release() {
        let (radio, handle) = MockRadio::new();
        let manager = RadioSessionManager::new(radio, Duration::from_secs(1));
        handle.present_tag(nfca_tag()).await.unwrap();

        let session = manager.acquire(&[Technology::NfcA]).await.unwrap();
        session.release();
        assert_eq!(handle.releases(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_times_out_and_releases() {
        let (radio, handle) = MockRadio::new();
        let manager = RadioSessionManager::new(radio, Duration::from_secs(30));

        let result = manager.acquire(&[Technology::Ndef]).await;
        let Err(HardwareError::Timeout { duration_ms }) = result else {
            panic!("expected an acquisition timeout");
        };
        assert_eq!(duration_ms, 30_000);
        assert_eq!(handle.acquisitions(), 1);
        assert_eq!(handle.releases(), 1);
        assert!(!handle.is_session_open());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_acquire_releases() {
        let (radio, handle) = MockRadio::new();
        let manager = RadioSessionManager::new(radio, Duration::from_secs(30));

        let pending = manager.acquire(&[Technology::Ndef]);
        let outcome = tokio::time::timeout(Duration::from_millis(100), pending).await;
        assert!(outcome.is_err());

        assert_eq!(handle.acquisitions(), 1);
        assert_eq!(handle.releases(), 1);
    }

    #[tokio::test]
    async fn test_reader_info() {
        let (radio, _handle) = MockRadio::with_name("Bench Radio".to_string());
        let manager = RadioSessionManager::new(radio, Duration::from_secs(1));
        assert_eq!(manager.reader_info().await.unwrap().name, "Bench Radio");
    }
}
