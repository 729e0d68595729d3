use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Unknown provider: {0}")]
    ProviderNotFound(String),

    #[error("Provider {provider} failed: {message}")]
    ProviderFailed { provider: String, message: String },

    #[error("Lyrics fetch failed: {0}")]
    LyricsFetchFailed(String),

    #[error("Artwork fetch failed: {0}")]
    ArtworkFetchFailed(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::error::BridgeError),
}

impl MetadataError {
    pub fn provider_failed(provider: &str, message: impl Into<String>) -> Self {
        MetadataError::ProviderFailed {
            provider: provider.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MetadataError>;
