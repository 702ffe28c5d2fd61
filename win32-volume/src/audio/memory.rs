//! In-memory output endpoint.
//!
//! Behaves like the default render endpoint without touching the system:
//! level and mute live in shared state, the device can be removed, and
//! individual calls can be made to fail. Acquisitions and releases are
//! counted so callers can check that no handle outlives its operation.

use super::device::{AudioError, PlatformError, VolumeOperation};
use super::endpoint::{EndpointProvider, EndpointVolume};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
struct DeviceState {
    present: bool,
    level: f32,
    muted: bool,
    failing: HashSet<VolumeOperation>,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            present: true,
            level: 1.0,
            muted: false,
            failing: HashSet::new(),
        }
    }
}

#[derive(Debug, Default)]
struct Shared {
    device: Mutex<DeviceState>,
    acquired: AtomicUsize,
    released: AtomicUsize,
}

impl Shared {
    fn device(&self) -> MutexGuard<'_, DeviceState> {
        self.device.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Provider for an in-memory endpoint. Clones share the same device.
#[derive(Debug, Clone, Default)]
pub struct MemoryEndpointProvider {
    shared: Arc<Shared>,
}

impl MemoryEndpointProvider {
    /// A present device at full volume, unmuted.
    pub fn new() -> Self {
        Self::default()
    }

    /// A present device with the given state.
    pub fn with_state(level: f32, muted: bool) -> Self {
        let provider = Self::default();
        {
            let mut device = provider.shared.device();
            device.level = level;
            device.muted = muted;
        }
        provider
    }

    /// A system with no default output device.
    pub fn without_device() -> Self {
        let provider = Self::default();
        provider.set_present(false);
        provider
    }

    /// Plug or unplug the device.
    pub fn set_present(&self, present: bool) {
        self.shared.device().present = present;
    }

    /// Make every subsequent call of `operation` fail.
    pub fn fail(&self, operation: VolumeOperation) {
        self.shared.device().failing.insert(operation);
    }

    /// Undo a previous [`fail`](Self::fail).
    pub fn recover(&self, operation: VolumeOperation) {
        self.shared.device().failing.remove(&operation);
    }

    pub fn level(&self) -> f32 {
        self.shared.device().level
    }

    pub fn is_muted(&self) -> bool {
        self.shared.device().muted
    }

    /// Number of handles handed out so far.
    pub fn acquisitions(&self) -> usize {
        self.shared.acquired.load(Ordering::SeqCst)
    }

    /// Number of handles dropped so far.
    pub fn releases(&self) -> usize {
        self.shared.released.load(Ordering::SeqCst)
    }

    /// Handles currently alive.
    pub fn open_handles(&self) -> usize {
        self.acquisitions().saturating_sub(self.releases())
    }
}

impl EndpointProvider for MemoryEndpointProvider {
    type Endpoint = MemoryEndpoint;

    fn acquire(&self) -> Result<MemoryEndpoint, AudioError> {
        if !self.shared.device().present {
            return Err(AudioError::NoDefaultDevice(PlatformError::not_found()));
        }

        self.shared.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(MemoryEndpoint {
            shared: Arc::clone(&self.shared),
        })
    }
}

/// Handle returned by [`MemoryEndpointProvider`].
#[derive(Debug)]
pub struct MemoryEndpoint {
    shared: Arc<Shared>,
}

impl MemoryEndpoint {
    fn check(&self, device: &DeviceState, operation: VolumeOperation) -> Result<(), AudioError> {
        if device.failing.contains(&operation) {
            return Err(AudioError::operation(operation, PlatformError::unspecified()));
        }
        Ok(())
    }
}

impl EndpointVolume for MemoryEndpoint {
    fn master_level(&self) -> Result<f32, AudioError> {
        let device = self.shared.device();
        self.check(&device, VolumeOperation::GetLevel)?;
        Ok(device.level)
    }

    fn set_master_level(&self, level: f32) -> Result<(), AudioError> {
        let mut device = self.shared.device();
        self.check(&device, VolumeOperation::SetLevel)?;
        // Same contract as SetMasterVolumeLevelScalar
        if !(0.0..=1.0).contains(&level) {
            return Err(AudioError::operation(
                VolumeOperation::SetLevel,
                PlatformError::invalid_argument(),
            ));
        }
        device.level = level;
        Ok(())
    }

    fn is_muted(&self) -> Result<bool, AudioError> {
        let device = self.shared.device();
        self.check(&device, VolumeOperation::GetMute)?;
        Ok(device.muted)
    }

    fn set_muted(&self, muted: bool) -> Result<(), AudioError> {
        let mut device = self.shared.device();
        self.check(&device, VolumeOperation::SetMute)?;
        device.muted = muted;
        Ok(())
    }
}

impl Drop for MemoryEndpoint {
    fn drop(&mut self) {
        self.shared.released.fetch_add(1, Ordering::SeqCst);
    }
}
