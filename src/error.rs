use thiserror::Error;

/// Everything that can end a compression run early.
#[derive(Debug, Clone, Error)]
pub enum DemoError {
    /// The trigger fired before a file was chosen.
    #[error("no image selected")]
    NoFileSelected,

    #[error(transparent)]
    Compression(#[from] CompressionFailure),
}

impl DemoError {
    /// Text shown to the user. Details stay in the log.
    pub fn user_message(&self) -> &'static str {
        match self {
            DemoError::NoFileSelected => "Select an image first.",
            DemoError::Compression(_) => "Compression failed.",
        }
    }
}

/// A failure anywhere between reading the source file and publishing the
/// result. All variants are reported to the user the same way.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompressionFailure {
    #[error("failed to read selected file: {0}")]
    ReadSource(String),

    #[error("compression module unavailable: {0}")]
    ModuleUnavailable(String),

    #[error("failed to stage `{name}`: {reason}")]
    Stage { name: String, reason: String },

    #[error("call to `{export}` failed: {reason}")]
    Call { export: String, reason: String },

    #[error("compressor rejected `{source_name}` (returned {code})")]
    Rejected { source_name: String, code: f64 },

    #[error("failed to fetch staged output `{name}`: {reason}")]
    Fetch { name: String, reason: String },

    #[error("staged output `{0}` is empty")]
    EmptyOutput(String),

    #[error("failed to publish result: {0}")]
    Publish(String),
}

/// Invalid demo configuration, reported when mounting.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("`{0}` must not be empty")]
    Empty(&'static str),

    #[error("default quality {0} is outside 1..=100")]
    QualityOutOfRange(i32),

    #[error("invalid configuration object: {0}")]
    Parse(String),
}
