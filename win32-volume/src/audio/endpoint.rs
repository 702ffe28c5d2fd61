//! Endpoint capability traits.
//!
//! An [`EndpointProvider`] opens the default output endpoint; the handle it
//! returns is an [`EndpointVolume`] that is released when dropped. Backends
//! implement both: the Windows Core Audio backend and the in-memory backend
//! used by tests.

use super::device::AudioError;

/// Volume controls of an acquired endpoint.
///
/// Implementors release the underlying device handle on drop.
pub trait EndpointVolume {
    /// Current master volume level (0.0 to 1.0).
    fn master_level(&self) -> Result<f32, AudioError>;

    /// Set the master volume level. The level is already validated.
    fn set_master_level(&self, level: f32) -> Result<(), AudioError>;

    /// Current master mute state.
    fn is_muted(&self) -> Result<bool, AudioError>;

    /// Set the master mute state.
    fn set_muted(&self, muted: bool) -> Result<(), AudioError>;
}

impl<E: EndpointVolume + ?Sized> EndpointVolume for Box<E> {
    fn master_level(&self) -> Result<f32, AudioError> {
        (**self).master_level()
    }

    fn set_master_level(&self, level: f32) -> Result<(), AudioError> {
        (**self).set_master_level(level)
    }

    fn is_muted(&self) -> Result<bool, AudioError> {
        (**self).is_muted()
    }

    fn set_muted(&self, muted: bool) -> Result<(), AudioError> {
        (**self).set_muted(muted)
    }
}

/// Opens the default output endpoint.
///
/// A provider is shared by every worker thread; the handles it returns are
/// confined to the thread and the operation that acquired them.
pub trait EndpointProvider: Send + Sync {
    type Endpoint: EndpointVolume;

    fn acquire(&self) -> Result<Self::Endpoint, AudioError>;
}

/// Object-safe form of [`EndpointProvider`], for callers that pick the
/// backend at runtime.
pub trait DynEndpointProvider: Send + Sync {
    fn acquire_boxed(&self) -> Result<Box<dyn EndpointVolume>, AudioError>;
}

impl<P> DynEndpointProvider for P
where
    P: EndpointProvider,
    P::Endpoint: 'static,
{
    fn acquire_boxed(&self) -> Result<Box<dyn EndpointVolume>, AudioError> {
        let endpoint = self.acquire()?;
        Ok(Box::new(endpoint))
    }
}

/// A backend chosen at runtime.
pub type BoxedProvider = Box<dyn DynEndpointProvider>;

impl EndpointProvider for BoxedProvider {
    type Endpoint = Box<dyn EndpointVolume>;

    fn acquire(&self) -> Result<Self::Endpoint, AudioError> {
        (**self).acquire_boxed()
    }
}
