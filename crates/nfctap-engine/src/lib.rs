//! Tag read/write engine.
//!
//! Ties a [`RadioDevice`](nfctap_hardware::RadioDevice) to the read and
//! write strategies:
//!
//! ```text
//! TagEngine
//!     │
//!     ├─> RadioSessionManager ──> RadioDevice (one session at a time)
//!     ├─> resolver::classify ──> TagKind
//!     ├─> ReadDispatcher ──> ReadResult
//!     ├─> WriteStrategy / RawBlockWriter
//!     └─> TransientResultStore (last scanned text, display window)
//! ```
//!
//! Nothing here retries: a request that fails returns its error and the
//! next request starts from scratch.

pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod resolver;
pub mod session;
pub mod store;
pub mod writer;

pub use config::{EngineConfig, Platform, RawBlockWriteConfig};
pub use dispatcher::ReadDispatcher;
pub use engine::TagEngine;
pub use resolver::classify;
pub use session::{RadioSessionManager, Session, SessionStats};
pub use store::TransientResultStore;
pub use writer::{RawBlockWriter, WriteStrategy};
