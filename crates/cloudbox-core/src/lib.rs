pub mod backend;
pub mod config;
pub mod errors;
pub mod stats;
pub mod types;

pub use backend::{ClientBackend, SessionSummary};
pub use config::{LaunchConfig, PlaybackConfig};
pub use errors::{BitstreamError, ConfigError, LaunchError, LaunchPhase, StartupError};
pub use stats::{FrameStatistics, PlayerStatistics, StatisticsSummary};
pub use types::*;
