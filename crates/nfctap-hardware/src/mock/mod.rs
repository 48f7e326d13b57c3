//! Mock radio implementation for testing and development.
//!
//! This module provides a simulated radio that can be controlled
//! programmatically without requiring physical hardware.

pub mod radio;

// Re-export commonly used types
pub use radio::{MockRadio, MockRadioHandle, MockTag};
