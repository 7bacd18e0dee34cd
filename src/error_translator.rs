//! Error Translator — maps the Authenticator's typed error taxonomy (and,
//! failing that, its HTTP status) onto the gateway's S3 error codes.
//!
//! Design Notes §9 rejects lazy one-shot initialization of an error map in
//! favor of "a simple pre-initialized immutable map" — the simplest thing
//! that satisfies that in Rust is a plain exhaustive `match`, which the
//! compiler already turns into a jump table. No `OnceLock`, no `phf`.

use crate::types::GatewayErrorCode;

/// Mirrors the Authenticator's wire-level error taxonomy (`S3ErrorType` in
/// `proto/handoff.proto`), kept as a standalone enum so this module stays
/// free of any tonic/prost dependency — the RPC transport converts the
/// generated type into this one at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticatorErrorType {
    NoError,
    AccessDenied,
    AuthorizationHeaderMalformed,
    ExpiredToken,
    InternalError,
    InvalidAccessKeyId,
    InvalidRequest,
    InvalidSecurity,
    InvalidToken,
    InvalidUri,
    MethodNotAllowed,
    MissingSecurityHeader,
    RequestTimeTooSkewed,
    SignatureDoesNotMatch,
    TokenRefreshRequired,
}

/// The table from spec §4.4, plus the HTTP-status fallback for anything
/// that doesn't match (including `NoError`, which should never reach here
/// on a genuine error response but falls back safely if it does).
pub fn translate(error_type: AuthenticatorErrorType, http_status_code: u16) -> GatewayErrorCode {
    match error_type {
        AuthenticatorErrorType::NoError => fallback_by_status(http_status_code),
        AuthenticatorErrorType::AccessDenied => GatewayErrorCode::Access,
        AuthenticatorErrorType::AuthorizationHeaderMalformed => GatewayErrorCode::InvalidRequest,
        AuthenticatorErrorType::ExpiredToken => GatewayErrorCode::Access,
        AuthenticatorErrorType::InternalError => GatewayErrorCode::InternalError,
        AuthenticatorErrorType::InvalidAccessKeyId => GatewayErrorCode::InvalidAccessKey,
        AuthenticatorErrorType::InvalidRequest => GatewayErrorCode::Invalid,
        AuthenticatorErrorType::InvalidSecurity => GatewayErrorCode::Invalid,
        AuthenticatorErrorType::InvalidToken => GatewayErrorCode::InvalidIdentityToken,
        AuthenticatorErrorType::InvalidUri => GatewayErrorCode::InvalidRequest,
        AuthenticatorErrorType::MethodNotAllowed => GatewayErrorCode::MethodNotAllowed,
        AuthenticatorErrorType::MissingSecurityHeader => GatewayErrorCode::InvalidRequest,
        AuthenticatorErrorType::RequestTimeTooSkewed => GatewayErrorCode::RequestTimeSkewed,
        AuthenticatorErrorType::SignatureDoesNotMatch => GatewayErrorCode::SignatureNoMatch,
        AuthenticatorErrorType::TokenRefreshRequired => GatewayErrorCode::InvalidRequest,
    }
}

fn fallback_by_status(status: u16) -> GatewayErrorCode {
    match status {
        400 => GatewayErrorCode::Invalid,
        404 => GatewayErrorCode::NotFound,
        _ => GatewayErrorCode::Access,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_matches_spec_exactly() {
        assert_eq!(translate(AuthenticatorErrorType::AccessDenied, 403), GatewayErrorCode::Access);
        assert_eq!(
            translate(AuthenticatorErrorType::AuthorizationHeaderMalformed, 400),
            GatewayErrorCode::InvalidRequest
        );
        assert_eq!(translate(AuthenticatorErrorType::ExpiredToken, 403), GatewayErrorCode::Access);
        assert_eq!(translate(AuthenticatorErrorType::InternalError, 500), GatewayErrorCode::InternalError);
        assert_eq!(
            translate(AuthenticatorErrorType::InvalidAccessKeyId, 403),
            GatewayErrorCode::InvalidAccessKey
        );
        assert_eq!(translate(AuthenticatorErrorType::InvalidRequest, 400), GatewayErrorCode::Invalid);
        assert_eq!(translate(AuthenticatorErrorType::InvalidSecurity, 400), GatewayErrorCode::Invalid);
        assert_eq!(
            translate(AuthenticatorErrorType::InvalidToken, 400),
            GatewayErrorCode::InvalidIdentityToken
        );
        assert_eq!(translate(AuthenticatorErrorType::InvalidUri, 400), GatewayErrorCode::InvalidRequest);
        assert_eq!(
            translate(AuthenticatorErrorType::MethodNotAllowed, 405),
            GatewayErrorCode::MethodNotAllowed
        );
        assert_eq!(
            translate(AuthenticatorErrorType::MissingSecurityHeader, 400),
            GatewayErrorCode::InvalidRequest
        );
        assert_eq!(
            translate(AuthenticatorErrorType::RequestTimeTooSkewed, 403),
            GatewayErrorCode::RequestTimeSkewed
        );
        assert_eq!(
            translate(AuthenticatorErrorType::SignatureDoesNotMatch, 401),
            GatewayErrorCode::SignatureNoMatch
        );
        assert_eq!(
            translate(AuthenticatorErrorType::TokenRefreshRequired, 400),
            GatewayErrorCode::InvalidRequest
        );
    }

    #[test]
    fn fallback_by_status_when_no_entry_matches() {
        assert_eq!(translate(AuthenticatorErrorType::NoError, 400), GatewayErrorCode::Invalid);
        assert_eq!(translate(AuthenticatorErrorType::NoError, 404), GatewayErrorCode::NotFound);
        assert_eq!(translate(AuthenticatorErrorType::NoError, 403), GatewayErrorCode::Access);
        assert_eq!(translate(AuthenticatorErrorType::NoError, 500), GatewayErrorCode::Access);
    }

    #[test]
    fn is_pure() {
        for _ in 0..3 {
            assert_eq!(
                translate(AuthenticatorErrorType::SignatureDoesNotMatch, 401),
                GatewayErrorCode::SignatureNoMatch
            );
        }
    }
}
