//! Win32 Volume - Library
//!
//! Master volume and mute control for the Windows default audio output
//! device, through the Core Audio `IAudioEndpointVolume` interface.
//!
//! ## Features
//!
//! - Get and set the master volume level (scalar, 0.0 to 1.0)
//! - Get and set the master mute state
//! - Synchronous calls, or asynchronous calls on a worker pool whose
//!   completions are delivered back on the caller's thread
//! - The endpoint is opened and released per call
//! - In-memory endpoint for tests and non-Windows builds

pub mod audio;
pub mod dispatcher;
pub mod logging;
pub mod worker;

#[cfg(windows)]
pub use audio::DefaultEndpointProvider;
pub use audio::{
    AudioError, BoxedProvider, ControllerOptions, EndpointProvider, EndpointVolume, ErrorKind,
    LevelPolicy, MemoryEndpointProvider, VolumeController, VolumeReading, VolumeRequest,
    VolumeResult,
};
pub use dispatcher::{Continuation, DispatcherOptions, PendingOperation, Ticket, VolumeDispatcher};
pub use worker::WorkerPool;
