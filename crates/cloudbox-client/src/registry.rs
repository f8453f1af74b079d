use std::collections::BTreeMap;

use cloudbox_core::{BackendName, ClientBackend, PlaybackConfig, StartupError};
use tracing::debug;

#[cfg(not(all(feature = "original", feature = "fast")))]
use crate::unavailable::UnavailableBackend;

/// Maps each [`BackendName`] to the one backend that serves it.
///
/// Entries are fixed when the registry is built; there is no runtime
/// discovery.
#[derive(Default)]
pub struct BackendRegistry {
    entries: BTreeMap<BackendName, Box<dyn ClientBackend>>,
}

impl BackendRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// One entry per backend name. Backends compiled out of this build are
    /// registered as [`UnavailableBackend`](crate::UnavailableBackend).
    #[cfg_attr(not(any(feature = "original", feature = "fast")), allow(unused_variables))]
    pub fn with_defaults(playback: &PlaybackConfig) -> Self {
        let mut registry = Self::empty();

        #[cfg(feature = "original")]
        registry.register(Box::new(crate::original::ContainerFileBackend::new(playback.clone())));
        #[cfg(not(feature = "original"))]
        registry.register(Box::new(UnavailableBackend::not_compiled(BackendName::Original)));

        #[cfg(feature = "fast")]
        registry.register(Box::new(crate::fast::RawFrameBackend::new(playback.clone())));
        #[cfg(not(feature = "fast"))]
        registry.register(Box::new(UnavailableBackend::not_compiled(BackendName::Fast)));

        registry
    }

    /// Adds `backend` under its own name, returning the entry it replaced.
    pub fn register(&mut self, backend: Box<dyn ClientBackend>) -> Option<Box<dyn ClientBackend>> {
        let name = backend.name();
        debug!("Registering backend '{}'", name);
        self.entries.insert(name, backend)
    }

    pub fn with(mut self, backend: Box<dyn ClientBackend>) -> Self {
        self.register(backend);
        self
    }

    /// The backend registered for `name`.
    ///
    /// A missing entry means the registry was built incompletely; it is
    /// reported as [`StartupError::UnknownBackendName`] and never answered
    /// with some other backend.
    pub fn resolve(&self, name: BackendName) -> Result<&dyn ClientBackend, StartupError> {
        self.entries
            .get(&name)
            .map(|backend| backend.as_ref())
            .ok_or_else(|| StartupError::UnknownBackendName { name: name.to_string() })
    }

    pub fn resolve_str(&self, name: &str) -> Result<&dyn ClientBackend, StartupError> {
        self.resolve(name.parse()?)
    }

    pub fn names(&self) -> Vec<BackendName> {
        self.entries.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
