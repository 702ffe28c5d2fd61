//! Master volume façade over an endpoint provider.
//!
//! Every call opens the default output endpoint, performs one operation and
//! releases the endpoint before returning, on success and on failure.

use super::device::{AudioError, VolumeReading, VolumeRequest, VolumeResult};
use super::endpoint::{EndpointProvider, EndpointVolume};

/// How out-of-range levels passed to `set_volume` are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LevelPolicy {
    /// Clamp finite levels into [0.0, 1.0]
    #[default]
    Clamp,

    /// Reject levels outside [0.0, 1.0] without touching the device
    Reject,
}

impl LevelPolicy {
    /// Validate a requested level. NaN is rejected under every policy.
    pub fn apply(self, level: f32) -> Result<f32, AudioError> {
        if level.is_nan() {
            return Err(AudioError::InvalidLevel(level));
        }

        match self {
            LevelPolicy::Clamp => Ok(level.clamp(0.0, 1.0)),
            LevelPolicy::Reject if (0.0..=1.0).contains(&level) => Ok(level),
            LevelPolicy::Reject => Err(AudioError::InvalidLevel(level)),
        }
    }
}

/// Controller options.
#[derive(Debug, Clone, Copy, Default)]
pub struct ControllerOptions {
    pub level_policy: LevelPolicy,
}

/// Volume controller for the default output endpoint.
pub struct VolumeController<P> {
    provider: P,
    options: ControllerOptions,
}

impl<P: EndpointProvider> VolumeController<P> {
    /// Create a new VolumeController with default options.
    pub fn new(provider: P) -> Self {
        Self::with_options(provider, ControllerOptions::default())
    }

    pub fn with_options(provider: P, options: ControllerOptions) -> Self {
        Self { provider, options }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn options(&self) -> ControllerOptions {
        self.options
    }

    /// Open the default output endpoint.
    ///
    /// The returned handle is released when dropped.
    pub fn acquire_endpoint(&self) -> Result<P::Endpoint, AudioError> {
        self.provider.acquire().map_err(|e| {
            tracing::warn!("Default output endpoint unavailable: {}", e);
            e
        })
    }

    fn with_endpoint<T>(
        &self,
        f: impl FnOnce(&P::Endpoint) -> Result<T, AudioError>,
    ) -> Result<T, AudioError> {
        let endpoint = self.acquire_endpoint()?;
        let result = f(&endpoint);
        drop(endpoint);

        if let Err(e) = &result {
            tracing::warn!("Volume operation failed: {}", e);
        }
        result
    }

    /// Set the volume level (0.0 to 1.0).
    pub fn set_volume(&self, level: f32) -> Result<(), AudioError> {
        let level = self.options.level_policy.apply(level)?;
        tracing::debug!(level, "Setting master volume");
        self.with_endpoint(|endpoint| endpoint.set_master_level(level))
    }

    /// Set the mute state.
    pub fn set_mute(&self, muted: bool) -> Result<(), AudioError> {
        tracing::debug!(muted, "Setting master mute");
        self.with_endpoint(|endpoint| endpoint.set_muted(muted))
    }

    /// Get the current volume level (0.0 to 1.0).
    pub fn get_volume(&self) -> Result<f32, AudioError> {
        self.with_endpoint(|endpoint| endpoint.master_level())
    }

    /// Get the current mute state.
    pub fn get_mute(&self) -> Result<bool, AudioError> {
        self.with_endpoint(|endpoint| endpoint.is_muted())
    }

    /// Toggle the mute state. Returns the new state.
    pub fn toggle_mute(&self) -> Result<bool, AudioError> {
        self.with_endpoint(|endpoint| {
            let new_state = !endpoint.is_muted()?;
            endpoint.set_muted(new_state)?;
            Ok(new_state)
        })
    }

    /// Run a request synchronously.
    pub fn execute(&self, request: VolumeRequest) -> VolumeResult {
        match request {
            VolumeRequest::SetLevel(level) => self.set_volume(level).map(|()| VolumeReading::Applied),
            VolumeRequest::SetMute(muted) => self.set_mute(muted).map(|()| VolumeReading::Applied),
            VolumeRequest::GetLevel => self.get_volume().map(VolumeReading::Level),
            VolumeRequest::GetMute => self.get_mute().map(VolumeReading::Muted),
            VolumeRequest::ToggleMute => self.toggle_mute().map(VolumeReading::Muted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::device::{ErrorKind, VolumeOperation};
    use crate::audio::memory::MemoryEndpointProvider;

    fn controller(provider: &MemoryEndpointProvider) -> VolumeController<MemoryEndpointProvider> {
        VolumeController::new(provider.clone())
    }

    #[test]
    fn test_level_round_trip() {
        let provider = MemoryEndpointProvider::new();
        let ctrl = controller(&provider);

        for step in 0..=20 {
            let level = step as f32 / 20.0;
            ctrl.set_volume(level).unwrap();
            assert!((ctrl.get_volume().unwrap() - level).abs() < 1e-6);
        }
        assert_eq!(provider.open_handles(), 0);
        assert_eq!(provider.acquisitions(), 42);
    }

    #[test]
    fn test_mute_round_trip() {
        let provider = MemoryEndpointProvider::new();
        let ctrl = controller(&provider);

        ctrl.set_mute(true).unwrap();
        assert!(ctrl.get_mute().unwrap());
        ctrl.set_mute(false).unwrap();
        assert!(!ctrl.get_mute().unwrap());
    }

    #[test]
    fn test_half_volume_scenario() {
        let provider = MemoryEndpointProvider::new();
        let ctrl = controller(&provider);

        assert!(ctrl.set_volume(0.5).is_ok());
        assert!((ctrl.get_volume().unwrap() - 0.5).abs() < 1e-6);
        assert!(ctrl.set_mute(true).is_ok());
        assert!(ctrl.get_mute().unwrap());
    }

    #[test]
    fn test_toggle_mute() {
        let provider = MemoryEndpointProvider::with_state(0.3, false);
        let ctrl = controller(&provider);

        assert!(ctrl.toggle_mute().unwrap());
        assert!(provider.is_muted());
        assert!(!ctrl.toggle_mute().unwrap());
        assert_eq!(provider.open_handles(), 0);
    }

    #[test]
    fn test_clamps_by_default() {
        let provider = MemoryEndpointProvider::with_state(0.5, false);
        let ctrl = controller(&provider);

        ctrl.set_volume(1.7).unwrap();
        assert_eq!(provider.level(), 1.0);
        ctrl.set_volume(-0.2).unwrap();
        assert_eq!(provider.level(), 0.0);
    }

    #[test]
    fn test_reject_policy() {
        let provider = MemoryEndpointProvider::with_state(0.5, false);
        let ctrl = VolumeController::with_options(
            provider.clone(),
            ControllerOptions {
                level_policy: LevelPolicy::Reject,
            },
        );

        let err = ctrl.set_volume(1.7).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(provider.level(), 0.5);
        assert_eq!(provider.acquisitions(), 0);

        ctrl.set_volume(1.0).unwrap();
        assert_eq!(provider.level(), 1.0);
    }

    #[test]
    fn test_nan_never_reaches_device() {
        let provider = MemoryEndpointProvider::with_state(0.5, false);
        let ctrl = controller(&provider);

        assert!(matches!(
            ctrl.set_volume(f32::NAN),
            Err(AudioError::InvalidLevel(_))
        ));
        assert_eq!(provider.acquisitions(), 0);
    }

    #[test]
    fn test_every_operation_reports_missing_device() {
        let provider = MemoryEndpointProvider::without_device();
        let ctrl = controller(&provider);

        assert!(ctrl.set_volume(0.5).unwrap_err().is_device_unavailable());
        assert!(ctrl.set_mute(true).unwrap_err().is_device_unavailable());
        assert!(ctrl.get_volume().unwrap_err().is_device_unavailable());
        assert!(ctrl.get_mute().unwrap_err().is_device_unavailable());
        assert!(ctrl.toggle_mute().unwrap_err().is_device_unavailable());
    }

    #[test]
    fn test_failed_read_is_an_error_and_releases() {
        let provider = MemoryEndpointProvider::with_state(0.8, true);
        provider.fail(VolumeOperation::GetLevel);
        provider.fail(VolumeOperation::GetMute);
        let ctrl = controller(&provider);

        assert_eq!(ctrl.get_volume().unwrap_err().kind(), ErrorKind::OperationFailed);
        assert_eq!(ctrl.get_mute().unwrap_err().kind(), ErrorKind::OperationFailed);
        assert_eq!(provider.acquisitions(), 2);
        assert_eq!(provider.open_handles(), 0);
    }

    #[test]
    fn test_failed_write_leaves_state() {
        let provider = MemoryEndpointProvider::with_state(0.8, false);
        provider.fail(VolumeOperation::SetMute);
        let ctrl = controller(&provider);

        assert!(ctrl.set_mute(true).is_err());
        assert!(!provider.is_muted());
        assert!(ctrl.toggle_mute().is_err());
        assert_eq!(provider.open_handles(), 0);
    }

    #[test]
    fn test_execute_requests() {
        let provider = MemoryEndpointProvider::with_state(0.1, false);
        let ctrl = controller(&provider);

        assert_eq!(
            ctrl.execute(VolumeRequest::SetLevel(0.6)).unwrap(),
            VolumeReading::Applied
        );
        assert_eq!(
            ctrl.execute(VolumeRequest::GetLevel).unwrap(),
            VolumeReading::Level(0.6)
        );
        assert_eq!(
            ctrl.execute(VolumeRequest::ToggleMute).unwrap(),
            VolumeReading::Muted(true)
        );
        assert_eq!(
            ctrl.execute(VolumeRequest::GetMute).unwrap(),
            VolumeReading::Muted(true)
        );
    }

    #[test]
    fn test_boxed_provider() {
        let provider = MemoryEndpointProvider::new();
        let boxed: crate::audio::BoxedProvider = Box::new(provider.clone());
        let ctrl = VolumeController::new(boxed);

        ctrl.set_volume(0.4).unwrap();
        assert_eq!(provider.level(), 0.4);
        assert_eq!(provider.open_handles(), 0);
    }
}
