/// Result alias used across the crate.
pub type UgoiraResult<T> = Result<T, UgoiraError>;

/// Errors surfaced by ingestion, correlation, decoding and presentation.
#[derive(thiserror::Error, Debug)]
pub enum UgoiraError {
    /// The container could not be opened or is not a zip archive.
    #[error("archive error: {0}")]
    Archive(String),

    /// An entry's extracted size disagrees with its declared size.
    #[error("corrupt archive: {0}")]
    Corrupt(String),

    /// The archive holds no image entries.
    #[error("no frames")]
    NoFrames,

    /// The manifest is not valid JSON or does not have the expected shape.
    #[error("manifest error: {0}")]
    Manifest(String),

    /// Image bytes could not be turned into a texture.
    #[error("decode error: {0}")]
    Decode(String),

    /// The presentation surface failed.
    #[error("render error: {0}")]
    Render(String),

    /// A value violates a documented bound.
    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl UgoiraError {
    pub fn archive(msg: impl Into<String>) -> Self {
        Self::Archive(msg.into())
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }

    pub fn manifest(msg: impl Into<String>) -> Self {
        Self::Manifest(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
