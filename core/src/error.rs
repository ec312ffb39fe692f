use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A ranking mode string that is not one of the three supported modes.
    #[error("unrecognized ranking mode `{0}` (expected relevance, recency_asc or recency_desc)")]
    UnknownMode(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("unsupported text encoding `{0}`, only utf-8 is supported")]
    UnsupportedEncoding(String),

    #[error("corrupt record at {}: {reason}", path.display())]
    CorruptRecord { path: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Bincode(#[from] bincode::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}
