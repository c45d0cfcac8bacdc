use std::path::PathBuf;

/// Rejected solver configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Failure reported by a single simulation step.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("timestep must be finite and positive, got {0}")]
    InvalidTimestep(f32),

    /// The step ran to completion but left a particle with a NaN or infinite
    /// position or velocity.
    #[error("particle {particle} has non-finite state at t = {time}")]
    NonFiniteState { particle: usize, time: f32 },
}
