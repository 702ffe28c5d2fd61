//! Volume control using IAudioEndpointVolume.
//!
//! Provides master volume and mute control for an acquired endpoint.

use super::device::{AudioError, VolumeOperation};
use super::endpoint::EndpointVolume;
use super::enumerator::ComGuard;
use windows::Win32::Media::Audio::Endpoints::IAudioEndpointVolume;

/// Volume interface of the default output endpoint.
///
/// Dropping the handle releases the interface and then the COM
/// initialization that backs it.
pub struct EndpointHandle {
    // Field order is drop order: the interface goes before COM.
    endpoint_volume: IAudioEndpointVolume,
    _com: ComGuard,
}

impl EndpointHandle {
    pub(crate) fn new(endpoint_volume: IAudioEndpointVolume, com: ComGuard) -> Self {
        Self {
            endpoint_volume,
            _com: com,
        }
    }
}

impl EndpointVolume for EndpointHandle {
    fn master_level(&self) -> Result<f32, AudioError> {
        unsafe {
            let level = self
                .endpoint_volume
                .GetMasterVolumeLevelScalar()
                .map_err(|e| AudioError::operation(VolumeOperation::GetLevel, e))?;
            Ok(level)
        }
    }

    fn set_master_level(&self, level: f32) -> Result<(), AudioError> {
        unsafe {
            self.endpoint_volume
                .SetMasterVolumeLevelScalar(level, std::ptr::null())
                .map_err(|e| AudioError::operation(VolumeOperation::SetLevel, e))?;
            Ok(())
        }
    }

    fn is_muted(&self) -> Result<bool, AudioError> {
        unsafe {
            let muted = self
                .endpoint_volume
                .GetMute()
                .map_err(|e| AudioError::operation(VolumeOperation::GetMute, e))?;
            Ok(muted.as_bool())
        }
    }

    fn set_muted(&self, muted: bool) -> Result<(), AudioError> {
        unsafe {
            self.endpoint_volume
                .SetMute(muted, std::ptr::null())
                .map_err(|e| AudioError::operation(VolumeOperation::SetMute, e))?;
            Ok(())
        }
    }
}
