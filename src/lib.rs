//! Handoff authentication core — delegated AWS SigV2/V4 request verification
//! against an external Authenticator service, plus the StoreQuery
//! out-of-band query side-channel.

pub mod acc;
pub mod config;
pub mod demo_app;
pub mod engine;
pub mod error;
pub mod error_translator;
pub mod metrics;
pub mod rco;
pub mod sin;
pub mod skf;
pub mod storequery;
pub mod transport;
pub mod types;

pub use engine::HandoffEngine;
pub use error::AuthError;
pub use rco::{ConfigUpdate, RuntimeConfigObserver};
pub use types::{RequestSnapshot, RuntimeConfig, Verdict};
