use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key \"{key}\" not found")]
    NotFound { key: String },

    #[error("store request for key \"{key}\" failed: {source}")]
    Backend {
        key: String,
        #[source]
        source: BoxError,
    },

    #[error("failed to connect to counting store at {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("store backend '{backend}' is not available in this build")]
    Unsupported { backend: String },
}

impl StoreError {
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    pub fn backend(key: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Backend {
            key: key.into(),
            source: source.into(),
        }
    }

    /// An absent key is a legitimate zero; anything else means the store misbehaved.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
