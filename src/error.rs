//! Error types for seqtrim
//!
//! Defines module-specific error types using thiserror for clear error propagation.

use thiserror::Error;

/// Main error type for seqtrim
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Project file loading or saving errors
    #[error("Project error: {0}")]
    Project(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing errors
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// WAV container errors (duration probing, fixture generation)
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// Referenced asset does not exist
    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    /// Geometrically unsatisfiable section operation (split point outside
    /// the section range, inverted frame range, ...)
    #[error("Geometry error: {0}")]
    Geometry(String),

    /// Waveform export failures
    #[error("Export error: {0}")]
    Export(String),

    /// External trim tool failures
    #[error("Trim error: {0}")]
    Trim(String),

    /// Reimport of a trimmed waveform failed
    #[error("Reimport error: {0}")]
    Reimport(String),
}

/// Convenience Result type using seqtrim Error
pub type Result<T> = std::result::Result<T, Error>;
