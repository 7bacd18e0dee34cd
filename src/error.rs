//! Crate-wide error type for failures that aren't a [`crate::types::Verdict`]
//! — config loading, transport construction, StoreQuery header grammar.
//! `Verdict::Err` is deliberately not an `Error` impl: it's the typed
//! authentication outcome, not an exception (spec Design Notes §9).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("invalid config value for {key}: {reason}")]
    ConfigValue { key: String, reason: String },

    #[error("failed to construct transport channel for {uri}: {reason}")]
    ChannelConstruction { uri: String, reason: String },

    #[error("storequery header rejected: {0}")]
    StoreQueryGrammar(String),

    #[error("unknown storequery command: {0}")]
    StoreQueryUnknownCommand(String),

    #[error("storequery command {command} not permitted in {context:?} context")]
    StoreQueryContext { command: String, context: crate::types::HandlerContext },

    #[error("bucket listing failed: {0}")]
    BucketListing(String),

    #[error("multipart listing failed: {0}")]
    MultipartListing(String),

    #[error("no such object: {bucket}/{key}")]
    ObjectNotFound { bucket: String, key: String },
}
