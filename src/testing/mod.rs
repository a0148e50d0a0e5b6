//! Test doubles shared by unit and integration tests
//!
//! ```rust
//! use carrierbot::testing::RecordingTransport;
//!
//! let transport = RecordingTransport::new();
//! assert!(transport.calls().is_empty());
//! ```

pub mod fixtures;
pub mod recorder;

pub use recorder::{RecordingTransport, TransportCall};
