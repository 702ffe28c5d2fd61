//! Audio module for Windows Core Audio API interactions.
//!
//! This module provides master volume and mute control of the default
//! output endpoint, behind a provider trait so the Windows backend can be
//! swapped for an in-memory one.

pub mod controller;
pub mod device;
pub mod endpoint;
#[cfg(windows)]
pub mod enumerator;
pub mod memory;
#[cfg(windows)]
pub mod volume;

pub use controller::{ControllerOptions, LevelPolicy, VolumeController};
pub use device::{
    completion_flag, AudioError, ErrorKind, PlatformError, VolumeOperation, VolumeReading,
    VolumeRequest, VolumeResult,
};
pub use endpoint::{BoxedProvider, DynEndpointProvider, EndpointProvider, EndpointVolume};
#[cfg(windows)]
pub use enumerator::{ComGuard, DefaultEndpointProvider};
pub use memory::{MemoryEndpoint, MemoryEndpointProvider};
#[cfg(windows)]
pub use volume::EndpointHandle;
