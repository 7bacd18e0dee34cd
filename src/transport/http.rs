//! HTTP transport (alternate/legacy) — a `reqwest`-based client POSTing to
//! `<base>/verify`, grounded in the teacher's existing `reqwest` dependency
//! and its JSON request/response handling conventions in `api/auth.rs`.

use async_trait::async_trait;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::AuthError;
use crate::types::{ErrorCategory, GatewayErrorCode, SigningKey, Verdict};

use super::{VerifyRequest, Verifier};

pub struct HttpVerifier {
    client: reqwest::Client,
    verify_url: String,
}

impl HttpVerifier {
    pub fn new(base_uri: &str, verify_ssl: bool) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(!verify_ssl)
            .build()
            .map_err(|e| AuthError::ChannelConstruction {
                uri: base_uri.to_string(),
                reason: e.to_string(),
            })?;

        let verify_url = format!("{}/verify", base_uri.trim_end_matches('/'));

        Ok(Self { client, verify_url })
    }
}

#[derive(Serialize)]
struct VerifyRequestBody {
    #[serde(rename = "stringToSign")]
    string_to_sign: String,
    #[serde(rename = "accessKeyId")]
    access_key_id: String,
    authorization: String,
    #[serde(rename = "eakParameters", skip_serializing_if = "Option::is_none")]
    eak_parameters: Option<EakParametersBody>,
}

#[derive(Serialize)]
struct EakParametersBody {
    method: String,
    #[serde(rename = "bucketName")]
    bucket_name: String,
    #[serde(rename = "objectKeyName")]
    object_key_name: String,
}

#[derive(Deserialize)]
struct VerifyResponseBody {
    message: String,
    uid: String,
}

#[async_trait]
impl Verifier for HttpVerifier {
    async fn verify(&self, request: VerifyRequest, cancel: CancellationToken) -> Verdict {
        let body = VerifyRequestBody {
            string_to_sign: base64::engine::general_purpose::STANDARD.encode(&request.string_to_sign),
            access_key_id: request.access_key_id.clone(),
            authorization: request.authorization_header.clone(),
            eak_parameters: request.eak.as_ref().map(|p| EakParametersBody {
                method: p.method().to_string(),
                bucket_name: p.bucket_name().to_string(),
                object_key_name: p.object_key_name().to_string(),
            }),
        };

        let call = self
            .client
            .post(&self.verify_url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send();

        let response = tokio::select! {
            res = call => res,
            _ = cancel.cancelled() => {
                return Verdict::transport_denied("verification call cancelled");
            }
        };

        let response = match response {
            Ok(r) => r,
            Err(e) => return Verdict::transport_denied(format!("HTTP transport error: {e}")),
        };

        match response.status().as_u16() {
            200 => match response.json::<VerifyResponseBody>().await {
                Ok(parsed) => Verdict::ok(parsed.uid, parsed.message, None),
                Err(e) => Verdict::err(
                    ErrorCategory::InternalError,
                    GatewayErrorCode::InternalError,
                    format!("failed to parse Authenticator response: {e}"),
                ),
            },
            401 => Verdict::err(ErrorCategory::AuthError, GatewayErrorCode::SignatureNoMatch, "signature does not match"),
            404 => Verdict::err(ErrorCategory::AuthError, GatewayErrorCode::InvalidAccessKey, "access key not found"),
            status => Verdict::err(
                ErrorCategory::TransportError,
                GatewayErrorCode::Access,
                format!("Authenticator returned unexpected status {status}"),
            ),
        }
    }

    async fn get_signing_key(
        &self,
        _transaction_id: &str,
        _authorization_header: &str,
        _cancel: CancellationToken,
    ) -> Result<SigningKey, Verdict> {
        Err(Verdict::err(
            ErrorCategory::InternalError,
            GatewayErrorCode::InternalError,
            "chunked-upload signing key fetch is not available over the HTTP transport",
        ))
    }
}
