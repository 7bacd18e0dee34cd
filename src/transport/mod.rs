//! Verdict Client & Transport — the `Verifier` capability (Design Notes §9)
//! unifying the RPC (primary) and HTTP (fallback/legacy) transports behind
//! one trait. The Handoff Engine only ever depends on `dyn Verifier`.

pub mod http;
pub mod rpc;

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::types::{AuthorizationParameters, SigningKey, Verdict};

/// Generated from `proto/handoff.proto` by `build.rs`. Kept private to this
/// module so no other part of the crate depends on tonic/prost types
/// directly — the spec's PIMPL note (§9) says that indirection is only
/// there to hide RPC headers from the include graph, which in Rust just
/// means "don't leak the generated module path."
pub(crate) mod proto {
    tonic::include_proto!("handoff");
}

/// Common request fields shared by both transports (spec §4.3).
#[derive(Debug, Clone)]
pub struct VerifyRequest {
    pub transaction_id: String,
    pub string_to_sign: Vec<u8>,
    pub authorization_header: String,
    pub access_key_id: String,
    pub method: String,
    pub bucket: String,
    pub object_key: String,
    pub eak: Option<AuthorizationParameters>,
}

#[async_trait]
pub trait Verifier: Send + Sync {
    async fn verify(&self, request: VerifyRequest, cancel: CancellationToken) -> Verdict;

    async fn get_signing_key(
        &self,
        transaction_id: &str,
        authorization_header: &str,
        cancel: CancellationToken,
    ) -> Result<SigningKey, Verdict>;
}

pub type DynVerifier = Arc<dyn Verifier>;
