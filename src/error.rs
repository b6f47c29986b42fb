use thiserror::Error;

/// Library errors using thiserror for structured error handling.
///
/// Engine operations absorb almost all of these at the engine boundary (logged
/// and published as diagnostics). Only `add_sound` surfaces an error to its
/// caller, through the ticket.

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Failed to open audio output")]
    OutputUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Failed to decode audio source")]
    DecodeFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Audio playback failed")]
    PlaybackFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Failed to seek to {position:.3}s")]
    SeekFailed {
        position: f64,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Audio source was released")]
    SourceReleased,
}

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Unrecognized audio container")]
    Format(#[source] symphonia::core::errors::Error),

    #[error("No decodable audio track found")]
    NoTrack,

    #[error("Audio track does not report a sample rate")]
    UnknownSampleRate,

    #[error("Audio source was released before probing")]
    SourceReleased,
}

#[derive(Error, Debug)]
pub enum AddSoundError {
    #[error("Unsupported audio file: {name}")]
    Rejected { name: String },

    #[error("Failed to read metadata for {name}")]
    Probe {
        name: String,
        #[source]
        source: ProbeError,
    },

    #[error("Metadata probe for {name} did not finish within {timeout_ms}ms")]
    TimedOut { name: String, timeout_ms: u64 },

    #[error("Sound {name} was removed before it finished loading")]
    Cancelled { name: String },

    #[error("Audio engine is shut down")]
    EngineShutDown,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from {path}")]
    LoadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to save configuration to {path}")]
    SaveFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Could not determine user config directory")]
    NoConfigDir,
}

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Failed to read audio file: {path}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Type alias for application Results using anyhow for context chaining
pub type AppResult<T> = anyhow::Result<T>;
