//! Core data model: the types every other module in this crate passes
//! around. Nothing here talks to a network or a clock — it's pure data plus
//! the small amount of validation logic the spec calls out as an invariant.

use std::collections::HashMap;

/// Opaque access-key-id string. No secret is ever held alongside it.
pub type Credential = String;

/// The inputs required to authenticate one request. Built once per request
/// by the gateway's REST layer and read-only from then on.
///
/// `env` mirrors the CGI-style environment map the host framework exposes
/// (`HTTP_AUTHORIZATION`, `HTTP_X_AMZ_DATE`, ...) — this is what lets SIN and
/// ACC do case-sensitive prefix matching on header names without needing a
/// real `HeaderMap` dependency in this crate.
#[derive(Debug, Clone)]
pub struct RequestSnapshot {
    pub transaction_id: String,
    pub string_to_sign: Vec<u8>,
    pub access_key_id: String,
    pub session_token: Option<String>,
    pub method: String,
    /// Request path, not including the query string.
    pub path: String,
    pub bucket: String,
    pub object_key: String,
    pub env: HashMap<String, String>,
    pub query: HashMap<String, String>,
}

impl RequestSnapshot {
    /// Convert an ordinary header name (`Authorization`, `X-Amz-Date`) into
    /// the environment-map key the REST layer would expose it as.
    pub fn env_key_for_header(name: &str) -> String {
        format!("HTTP_{}", name.to_uppercase().replace('-', "_"))
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.env.get(&Self::env_key_for_header(name)).map(|s| s.as_str())
    }
}

/// A normalized `Authorization` credential string, either lifted verbatim
/// from the inbound request or synthesized by SIN from presigned-URL
/// parameters. Exactly one of these exists per successfully-normalized
/// request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationHeader(String);

impl AuthorizationHeader {
    pub fn new(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `AWS <access_key_id>:<signature>` — the v2 shape.
    pub fn is_v2(&self) -> bool {
        self.0.starts_with("AWS ")
    }
}

impl std::fmt::Display for AuthorizationHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether, and how aggressively, the Authorization Context Capture
/// component should snapshot enriched request context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthCaptureMode {
    #[default]
    Never,
    WithToken,
    Always,
}

impl AuthCaptureMode {
    /// Reduce the two independent `authparam_always`/`authparam_withtoken`
    /// runtime-config booleans to one mode. Always dominates, then
    /// WithToken, else Never (spec.md §4.6).
    pub fn from_toggles(always: bool, with_token: bool) -> Self {
        if always {
            AuthCaptureMode::Always
        } else if with_token {
            AuthCaptureMode::WithToken
        } else {
            AuthCaptureMode::Never
        }
    }
}

/// Enriched snapshot of request context, captured only when runtime policy
/// calls for it. `valid` distinguishes "present and well-formed" from
/// "unavailable"; per spec.md §4.2, reading any other field on an invalid
/// snapshot is a programmer error — the accessors below enforce that with a
/// panic, and the Handoff Engine never constructs one without checking
/// `valid` first.
#[derive(Debug, Clone)]
pub struct AuthorizationParameters {
    valid: bool,
    method: String,
    bucket_name: String,
    object_key_name: String,
    headers: HashMap<String, String>,
    path: String,
    query_parameters: HashMap<String, String>,
}

impl AuthorizationParameters {
    pub fn invalid() -> Self {
        Self {
            valid: false,
            method: String::new(),
            bucket_name: String::new(),
            object_key_name: String::new(),
            headers: HashMap::new(),
            path: String::new(),
            query_parameters: HashMap::new(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn valid(
        method: String,
        bucket_name: String,
        object_key_name: String,
        headers: HashMap<String, String>,
        path: String,
        query_parameters: HashMap<String, String>,
    ) -> Self {
        Self {
            valid: true,
            method,
            bucket_name,
            object_key_name,
            headers,
            path,
            query_parameters,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn method(&self) -> &str {
        assert!(self.valid, "read of AuthorizationParameters::method on an invalid snapshot");
        &self.method
    }

    pub fn bucket_name(&self) -> &str {
        assert!(self.valid, "read of AuthorizationParameters::bucket_name on an invalid snapshot");
        &self.bucket_name
    }

    pub fn object_key_name(&self) -> &str {
        assert!(
            self.valid,
            "read of AuthorizationParameters::object_key_name on an invalid snapshot"
        );
        &self.object_key_name
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        assert!(self.valid, "read of AuthorizationParameters::headers on an invalid snapshot");
        &self.headers
    }

    pub fn path(&self) -> &str {
        assert!(self.valid, "read of AuthorizationParameters::path on an invalid snapshot");
        &self.path
    }

    pub fn query_parameters(&self) -> &HashMap<String, String> {
        assert!(
            self.valid,
            "read of AuthorizationParameters::query_parameters on an invalid snapshot"
        );
        &self.query_parameters
    }
}

/// A per-day HMAC-SHA256 signing key handed back by the Authenticator for
/// chunked uploads. Single-use per request — the Handoff Engine does not
/// cache these across requests even though they remain valid for the rest
/// of the UTC day they were issued on.
#[derive(Clone)]
pub struct SigningKey {
    pub bytes: Vec<u8>,
    pub issued_date: chrono::NaiveDate,
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("bytes", &format!("<{} bytes redacted>", self.bytes.len()))
            .field("issued_date", &self.issued_date)
            .finish()
    }
}

impl SigningKey {
    pub fn is_valid_for(&self, date: chrono::NaiveDate) -> bool {
        self.issued_date == date
    }
}

/// The gateway's S3 error taxonomy. Exactly the code set §4.4's mapping
/// table can produce, plus `NotFound`/`MethodNotAllowed` for the fallback
/// paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorCode {
    Access,
    InvalidRequest,
    InternalError,
    InvalidAccessKey,
    Invalid,
    InvalidIdentityToken,
    MethodNotAllowed,
    RequestTimeSkewed,
    SignatureNoMatch,
    NotFound,
}

impl GatewayErrorCode {
    /// The conventional S3 `<Code>` element / machine-readable identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayErrorCode::Access => "ERR_ACCESS_DENIED",
            GatewayErrorCode::InvalidRequest => "ERR_INVALID_REQUEST",
            GatewayErrorCode::InternalError => "ERR_INTERNAL_ERROR",
            GatewayErrorCode::InvalidAccessKey => "ERR_INVALID_ACCESS_KEY",
            GatewayErrorCode::Invalid => "ERR_INVALID",
            GatewayErrorCode::InvalidIdentityToken => "ERR_INVALID_IDENTITY_TOKEN",
            GatewayErrorCode::MethodNotAllowed => "ERR_METHOD_NOT_ALLOWED",
            GatewayErrorCode::RequestTimeSkewed => "ERR_REQUEST_TIME_SKEWED",
            GatewayErrorCode::SignatureNoMatch => "ERR_SIGNATURE_NO_MATCH",
            GatewayErrorCode::NotFound => "ERR_NO_SUCH_KEY",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            GatewayErrorCode::Access => 403,
            GatewayErrorCode::InvalidRequest => 400,
            GatewayErrorCode::InternalError => 500,
            GatewayErrorCode::InvalidAccessKey => 403,
            GatewayErrorCode::Invalid => 400,
            GatewayErrorCode::InvalidIdentityToken => 400,
            GatewayErrorCode::MethodNotAllowed => 405,
            GatewayErrorCode::RequestTimeSkewed => 403,
            GatewayErrorCode::SignatureNoMatch => 403,
            GatewayErrorCode::NotFound => 404,
        }
    }
}

/// Coarse classification of *why* a verdict failed, surfaced in logs and
/// metrics alongside the precise `GatewayErrorCode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    NoError,
    TransportError,
    AuthError,
    InternalError,
}

impl ErrorCategory {
    pub fn as_label(&self) -> &'static str {
        match self {
            ErrorCategory::NoError => "none",
            ErrorCategory::TransportError => "transport",
            ErrorCategory::AuthError => "auth",
            ErrorCategory::InternalError => "internal",
        }
    }
}

/// Successful half of a [`Verdict`].
#[derive(Debug, Clone)]
pub struct VerdictOk {
    pub user_id: String,
    pub message: String,
    pub signing_key: Option<SigningKey>,
}

/// Denied half of a [`Verdict`].
#[derive(Debug, Clone)]
pub struct VerdictErr {
    pub category: ErrorCategory,
    pub code: GatewayErrorCode,
    pub message: String,
}

/// The typed authentication result returned by [`crate::engine::HandoffEngine`].
///
/// Per spec.md's Design Notes, reading `user_id` on a denied verdict is a
/// programmer error rather than something callers are expected to recover
/// from — [`Verdict::into_result`] is the total accessor every normal
/// caller should use; [`Verdict::user_id_or_fatal`] exists for the one
/// internal sanity-check call site that must panic instead of silently
/// proceeding.
#[derive(Debug, Clone)]
pub enum Verdict {
    Ok(VerdictOk),
    Err(VerdictErr),
}

impl Verdict {
    pub fn ok(user_id: impl Into<String>, message: impl Into<String>, signing_key: Option<SigningKey>) -> Self {
        Verdict::Ok(VerdictOk {
            user_id: user_id.into(),
            message: message.into(),
            signing_key,
        })
    }

    pub fn err(category: ErrorCategory, code: GatewayErrorCode, message: impl Into<String>) -> Self {
        Verdict::Err(VerdictErr {
            category,
            code,
            message: message.into(),
        })
    }

    /// Fail-closed access-denied verdict with a transport-error category —
    /// the shape every "the Authenticator call itself failed" path returns.
    pub fn transport_denied(message: impl Into<String>) -> Self {
        Verdict::err(ErrorCategory::TransportError, GatewayErrorCode::Access, message)
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Verdict::Ok(_))
    }

    pub fn into_result(self) -> Result<VerdictOk, VerdictErr> {
        match self {
            Verdict::Ok(ok) => Ok(ok),
            Verdict::Err(err) => Err(err),
        }
    }

    /// Panics if called on `Err` — reserved for the Handoff Engine's own
    /// post-verification sanity check, never for REST-layer callers.
    pub fn user_id_or_fatal(&self) -> &str {
        match self {
            Verdict::Ok(ok) => &ok.user_id,
            Verdict::Err(_) => panic!("accessed user_id on a denied Verdict — programmer error"),
        }
    }
}

/// Reconnect-backoff tuning for the RPC transport channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelArgs {
    pub initial_backoff_ms: u64,
    pub min_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for ChannelArgs {
    fn default() -> Self {
        Self {
            initial_backoff_ms: 1_000,
            min_backoff_ms: 1_000,
            max_backoff_ms: 120_000,
        }
    }
}

/// Identifies one instance of the transport channel: the URI it connects
/// to plus the backoff parameters governing reconnects. The Runtime Config
/// Observer diffs these against the previous snapshot to decide whether a
/// rebuild is required (spec.md §4.6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportChannelSpec {
    pub uri: String,
    pub args: ChannelArgs,
}

/// The runtime-mutable subset of configuration, read by the Handoff Engine
/// under one atomic snapshot per request (spec.md §3, §9: represented as an
/// immutable struct swapped by the RCO, not fine-grained locked booleans).
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub grpc_mode: bool,
    pub presigned_expiry_check: bool,
    pub signature_v2_enabled: bool,
    pub chunked_upload_enabled: bool,
    pub authorization_capture_mode: AuthCaptureMode,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            grpc_mode: true,
            presigned_expiry_check: true,
            signature_v2_enabled: true,
            chunked_upload_enabled: true,
            authorization_capture_mode: AuthCaptureMode::Never,
        }
    }
}

/// Which StoreQuery command handlers are legal to dispatch to; mirrors the
/// RGWOp context the real gateway would provide at the dispatch site
/// (spec.md §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerContext {
    Service,
    Bucket,
    Object,
}

/// A parsed `x-rgw-storequery` command: name plus positional parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreQueryCommand {
    pub name: String,
    pub params: Vec<String>,
}
