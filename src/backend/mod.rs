//! Backend abstraction layer
//!
//! Provides the host services render passes rely on, plus two hosts: a
//! recording one for tests and a headless wgpu one.

pub mod recording;
pub mod traits;
pub mod types;

#[cfg(feature = "wgpu-backend")]
pub mod wgpu_backend;

pub use recording::{HostEvent, RecordingBackend};
pub use traits::*;
pub use types::*;
