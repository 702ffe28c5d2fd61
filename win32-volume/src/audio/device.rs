//! Volume request and result models.
//!
//! Defines the requests that can be issued against the default output
//! endpoint, the readings they produce, and the error taxonomy shared by
//! every backend.

use std::fmt;
use thiserror::Error;

/// `HRESULT_FROM_WIN32(ERROR_NOT_FOUND)`, reported when no default endpoint exists.
pub const E_NOTFOUND: i32 = 0x8007_0490_u32 as i32;

/// `E_INVALIDARG`, reported for a level outside [0.0, 1.0].
pub const E_INVALIDARG: i32 = 0x8007_0057_u32 as i32;

/// `E_FAIL`, unspecified failure.
pub const E_FAIL: i32 = 0x8000_4005_u32 as i32;

/// One of the four primitive operations on an endpoint volume interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VolumeOperation {
    SetLevel,
    SetMute,
    GetLevel,
    GetMute,
}

impl fmt::Display for VolumeOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VolumeOperation::SetLevel => "SetMasterVolumeLevelScalar",
            VolumeOperation::SetMute => "SetMute",
            VolumeOperation::GetLevel => "GetMasterVolumeLevelScalar",
            VolumeOperation::GetMute => "GetMute",
        };
        f.write_str(name)
    }
}

/// A request against the default output endpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VolumeRequest {
    /// Set the master volume level (scalar, 0.0 to 1.0)
    SetLevel(f32),

    /// Set the master mute flag
    SetMute(bool),

    /// Read the master volume level
    GetLevel,

    /// Read the master mute flag
    GetMute,

    /// Flip the master mute flag within a single acquisition
    ToggleMute,
}

impl VolumeRequest {
    /// True for requests that change device state.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            VolumeRequest::SetLevel(_) | VolumeRequest::SetMute(_) | VolumeRequest::ToggleMute
        )
    }
}

/// The value produced by a successful request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VolumeReading {
    /// A set operation was applied by the device
    Applied,

    /// Current master volume level (0.0 to 1.0)
    Level(f32),

    /// Current (or, after a toggle, new) mute state
    Muted(bool),
}

impl VolumeReading {
    /// Boolean view used by completion continuations.
    ///
    /// Set operations report `true`; a mute reading reports the mute flag.
    pub fn as_flag(&self) -> bool {
        match self {
            VolumeReading::Applied | VolumeReading::Level(_) => true,
            VolumeReading::Muted(muted) => *muted,
        }
    }
}

/// Outcome of a single request.
pub type VolumeResult = Result<VolumeReading, AudioError>;

/// Boolean projection of a result: failures are always `false`.
pub fn completion_flag(result: &VolumeResult) -> bool {
    result.as_ref().map(VolumeReading::as_flag).unwrap_or(false)
}

/// An operating-system status code with its message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (HRESULT 0x{code:08X})")]
pub struct PlatformError {
    pub code: i32,
    pub message: String,
}

impl PlatformError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn not_found() -> Self {
        Self::new(E_NOTFOUND, "Element not found.")
    }

    pub fn invalid_argument() -> Self {
        Self::new(E_INVALIDARG, "The parameter is incorrect.")
    }

    pub fn unspecified() -> Self {
        Self::new(E_FAIL, "Unspecified error")
    }
}

#[cfg(windows)]
impl From<windows_core::Error> for PlatformError {
    fn from(err: windows_core::Error) -> Self {
        Self {
            code: err.code().0,
            message: err.message(),
        }
    }
}

/// Coarse classification of an [`AudioError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No default render endpoint, or its volume interface could not be activated
    DeviceUnavailable,

    /// The endpoint was acquired but the call itself failed
    OperationFailed,

    /// The request was rejected before touching the device
    InvalidArgument,
}

/// Audio service error types.
#[derive(Debug, Clone, Error)]
pub enum AudioError {
    #[error("COM initialization failed: {0}")]
    ComInitFailed(#[source] PlatformError),

    #[error("Failed to create device enumerator: {0}")]
    EnumeratorUnavailable(#[source] PlatformError),

    #[error("No default audio output device available: {0}")]
    NoDefaultDevice(#[source] PlatformError),

    #[error("Volume control not available for device: {0}")]
    VolumeNotAvailable(#[source] PlatformError),

    #[error("{operation} failed: {source}")]
    OperationFailed {
        operation: VolumeOperation,
        #[source]
        source: PlatformError,
    },

    #[error("Invalid volume level: {0}")]
    InvalidLevel(f32),

    #[error("Volume operation panicked on a worker thread")]
    OperationPanicked,

    #[error("Failed to start worker thread: {0}")]
    WorkerSpawn(String),

    #[error("Worker pool is not accepting requests")]
    WorkerUnavailable,
}

impl AudioError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AudioError::ComInitFailed(_)
            | AudioError::EnumeratorUnavailable(_)
            | AudioError::NoDefaultDevice(_)
            | AudioError::VolumeNotAvailable(_) => ErrorKind::DeviceUnavailable,
            AudioError::InvalidLevel(_) => ErrorKind::InvalidArgument,
            AudioError::OperationFailed { .. }
            | AudioError::OperationPanicked
            | AudioError::WorkerSpawn(_)
            | AudioError::WorkerUnavailable => ErrorKind::OperationFailed,
        }
    }

    pub fn is_device_unavailable(&self) -> bool {
        self.kind() == ErrorKind::DeviceUnavailable
    }

    /// Wrap a failed call on an acquired endpoint.
    pub fn operation(operation: VolumeOperation, source: impl Into<PlatformError>) -> Self {
        AudioError::OperationFailed {
            operation,
            source: source.into(),
        }
    }

    /// The OS status code carried by this error, if any.
    pub fn platform_code(&self) -> Option<i32> {
        match self {
            AudioError::ComInitFailed(e)
            | AudioError::EnumeratorUnavailable(e)
            | AudioError::NoDefaultDevice(e)
            | AudioError::VolumeNotAvailable(e)
            | AudioError::OperationFailed { source: e, .. } => Some(e.code),
            _ => None,
        }
    }
}
