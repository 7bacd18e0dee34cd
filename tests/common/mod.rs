//! Shared test infrastructure for integration tests: a `FakeVerifier`
//! standing in for the Authenticator, and a helper that builds `AppState`
//! against it. Tests seed `state.bucket_index`/`state.multipart_table`
//! directly (both take `&self` — `DashMap`-backed) before wrapping the
//! state in a `Router` with `handoff_auth::demo_app::build_router`, then
//! drive it with `tower::ServiceExt::oneshot`, the same shape used
//! elsewhere in the retrieval pack for Axum services.

#![allow(dead_code)]

use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use axum::Router;
use tokio_util::sync::CancellationToken;

use handoff_auth::demo_app::AppState;
use handoff_auth::engine::HandoffEngine;
use handoff_auth::metrics::Metrics;
use handoff_auth::storequery::memory::{InMemoryBucketIndex, InMemoryMultipartTable};
use handoff_auth::storequery::Registry as StoreQueryRegistry;
use handoff_auth::transport::{DynVerifier, VerifyRequest, Verifier};
use handoff_auth::types::{RuntimeConfig, SigningKey};
use handoff_auth::Verdict;

pub struct FakeVerifier {
    pub result: Verdict,
    pub signing_key: Option<Vec<u8>>,
}

#[async_trait]
impl Verifier for FakeVerifier {
    async fn verify(&self, _request: VerifyRequest, _cancel: CancellationToken) -> Verdict {
        self.result.clone()
    }

    async fn get_signing_key(
        &self,
        _transaction_id: &str,
        _authorization_header: &str,
        _cancel: CancellationToken,
    ) -> Result<SigningKey, Verdict> {
        match &self.signing_key {
            Some(bytes) => Ok(SigningKey { bytes: bytes.clone(), issued_date: chrono::Utc::now().date_naive() }),
            None => Err(Verdict::transport_denied("no signing key configured")),
        }
    }
}

/// Build `AppState` wired to a `FakeVerifier` that always returns `verdict`,
/// with fresh in-memory `BucketIndex`/`MultipartTable` the caller can seed
/// through the returned `Arc` before building a router over it.
pub fn state_with(verdict: Verdict, signing_key: Option<Vec<u8>>, cfg: RuntimeConfig, metrics_enabled: bool) -> Arc<AppState> {
    let config = Arc::new(ArcSwap::from_pointee(cfg));
    let verifier: DynVerifier = Arc::new(FakeVerifier { result: verdict, signing_key });
    let verifier = Arc::new(ArcSwap::from_pointee(verifier));
    let metrics = if metrics_enabled { Some(Arc::new(Metrics::new())) } else { None };
    let engine = HandoffEngine::new(config, verifier, metrics.clone());

    Arc::new(AppState {
        engine,
        registry: StoreQueryRegistry::with_defaults(),
        bucket_index: InMemoryBucketIndex::new(),
        multipart_table: InMemoryMultipartTable::new(),
        metrics,
    })
}

pub fn router(state: Arc<AppState>) -> Router {
    handoff_auth::demo_app::build_router(state)
}
