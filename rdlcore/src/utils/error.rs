use semver::{Version, VersionReq};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RdlError {
    #[error(transparent)]
    Expression(#[from] rdlexpr::Error),

    #[error("Custom report item '{item}' failed: {message}")]
    ExtensionFailure { item: String, message: String },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse manifest file '{file}': {source}")]
    ManifestParseError {
        source: toml::de::Error,
        file: String,
    },

    #[error("Malformed custom report item markup: {0}")]
    MarkupParseError(String),

    #[error("An unknown error occurred: {0}")]
    Unknown(String),

    #[error("Extension with name '{0}' not found")]
    ExtensionNotFound(String),

    #[error("Failed to load extension '{name}' from file '{file}': {source}")]
    ExtensionLoadError {
        source: libloading::Error,
        file: String,
        name: String,
    },

    #[error(
        "Compatibility check failed for extension '{name}' from file '{file}'. Required: {req}, found: {version}"
    )]
    CompatibilityCheckFailed {
        file: String,
        name: String,
        version: Version,
        req: VersionReq,
    },

    #[error("Render job was cancelled")]
    Cancelled,
}

pub type RdlResult<T> = Result<T, RdlError>;
