use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Malformed card data in {source_label}: {cause}")]
    Malformed {
        source_label: String,
        #[source]
        cause: BoxError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage sink failed: {0}")]
    Sink(#[source] anyhow::Error),
}

impl Error {
    pub(crate) fn malformed(source_label: &str, cause: impl Into<BoxError>) -> Self {
        Self::Malformed { source_label: source_label.to_string(), cause: cause.into() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
