//! cloudbox-client: the launcher and the backends it can start.
//!
//! ```text
//! Launcher ──► BackendRegistry::resolve(name) ──► ClientBackend::start(source)
//!                                                   │
//!                                                   ▼
//!                                 StreamSession ──► FrameSink (decoder/renderer seam)
//! ```

#[cfg(feature = "fast")]
pub mod fast;
pub mod launcher;
#[cfg(feature = "original")]
pub mod original;
pub mod registry;
mod session;
pub mod sink;
pub mod unavailable;

#[cfg(test)]
pub(crate) mod testing;

#[cfg(feature = "fast")]
pub use fast::RawFrameBackend;
pub use launcher::{LaunchOutcome, Launcher};
#[cfg(feature = "original")]
pub use original::ContainerFileBackend;
pub use registry::BackendRegistry;
pub use sink::{default_sink_factory, FrameSink, LoggingSink, SinkFactory};
pub use unavailable::UnavailableBackend;
