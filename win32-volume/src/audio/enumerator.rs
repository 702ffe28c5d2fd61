//! Default output endpoint lookup using the Windows MMDevice API.
//!
//! Provides COM initialization and acquisition of the default render
//! endpoint's volume interface.

use super::device::AudioError;
use super::endpoint::EndpointProvider;
use super::volume::EndpointHandle;
use windows::Win32::Foundation::RPC_E_CHANGED_MODE;
use windows::Win32::Media::Audio::Endpoints::IAudioEndpointVolume;
use windows::Win32::Media::Audio::{eConsole, eRender, IMMDeviceEnumerator, MMDeviceEnumerator};
use windows::Win32::System::Com::{
    CoCreateInstance, CoInitializeEx, CoUninitialize, CLSCTX_ALL, COINIT_APARTMENTTHREADED,
};

/// COM initialization guard that uninitializes COM on drop.
pub struct ComGuard {
    initialized: bool,
}

impl ComGuard {
    /// Initialize COM for the current thread.
    ///
    /// A thread that already joined a different apartment keeps it; the guard
    /// then leaves COM alone on drop.
    pub fn new() -> Result<Self, AudioError> {
        let hr = unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED) };
        if hr == RPC_E_CHANGED_MODE {
            tracing::debug!("COM already initialized with a different threading model");
            return Ok(Self { initialized: false });
        }

        hr.ok()
            .map_err(|e| AudioError::ComInitFailed(e.into()))?;
        Ok(Self { initialized: true })
    }
}

impl Drop for ComGuard {
    fn drop(&mut self) {
        if self.initialized {
            unsafe {
                CoUninitialize();
            }
        }
    }
}

/// Opens the system default render endpoint for the console role.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEndpointProvider;

impl DefaultEndpointProvider {
    pub fn new() -> Self {
        Self
    }
}

impl EndpointProvider for DefaultEndpointProvider {
    type Endpoint = EndpointHandle;

    fn acquire(&self) -> Result<EndpointHandle, AudioError> {
        let com = ComGuard::new()?;

        unsafe {
            let enumerator: IMMDeviceEnumerator =
                CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL)
                    .map_err(|e| AudioError::EnumeratorUnavailable(e.into()))?;

            let device = enumerator
                .GetDefaultAudioEndpoint(eRender, eConsole)
                .map_err(|e| AudioError::NoDefaultDevice(e.into()))?;

            let endpoint_volume: IAudioEndpointVolume = device
                .Activate(CLSCTX_ALL, None)
                .map_err(|e| AudioError::VolumeNotAvailable(e.into()))?;

            Ok(EndpointHandle::new(endpoint_volume, com))
        }
    }
}
