//! Authorization Context Capture — snapshots enriched request context when
//! runtime policy calls for it. Construction-time invalidity is suppressed
//! by the caller (the Handoff Engine), never treated as an authentication
//! failure (spec §4.2, §4.7 step 4).

use std::collections::HashMap;

use crate::types::{AuthCaptureMode, AuthorizationParameters, RequestSnapshot};

/// Decide whether to capture, and if so, build the snapshot. Returns `None`
/// both when policy says skip and when the snapshot built out invalid — the
/// two cases the Handoff Engine treats identically.
pub fn capture(snapshot: &RequestSnapshot, mode: AuthCaptureMode) -> Option<AuthorizationParameters> {
    if !should_capture(snapshot, mode) {
        return None;
    }

    let params = build(snapshot);
    if params.is_valid() {
        Some(params)
    } else {
        None
    }
}

fn should_capture(snapshot: &RequestSnapshot, mode: AuthCaptureMode) -> bool {
    match mode {
        AuthCaptureMode::Always => true,
        AuthCaptureMode::WithToken => snapshot.session_token.as_deref().is_some_and(|t| !t.is_empty()),
        AuthCaptureMode::Never => false,
    }
}

fn build(snapshot: &RequestSnapshot) -> AuthorizationParameters {
    if snapshot.method.is_empty() {
        return AuthorizationParameters::invalid();
    }

    if !snapshot.path.starts_with('/') {
        return AuthorizationParameters::invalid();
    }

    let (bucket_name, object_key_name) = split_bucket_and_key(&snapshot.path);
    let headers = capture_amz_headers(&snapshot.env);

    AuthorizationParameters::valid(
        snapshot.method.clone(),
        bucket_name,
        object_key_name,
        headers,
        snapshot.path.clone(),
        snapshot.query.clone(),
    )
}

/// Strip the leading `/`; the portion up to the first subsequent `/` is the
/// bucket name, the remainder (possibly empty, possibly itself leading with
/// `/`) is the object key.
fn split_bucket_and_key(path: &str) -> (String, String) {
    let stripped = &path[1..];
    match stripped.find('/') {
        Some(idx) => (stripped[..idx].to_string(), stripped[idx + 1..].to_string()),
        None => (stripped.to_string(), String::new()),
    }
}

fn capture_amz_headers(env: &HashMap<String, String>) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    for (key, value) in env {
        if let Some(rest) = key.strip_prefix("HTTP_") {
            if rest.starts_with("X_AMZ_") {
                headers.insert(rest.replace('_', "-").to_lowercase(), value.clone());
            }
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_with_path(path: &str) -> RequestSnapshot {
        RequestSnapshot {
            transaction_id: "tx-1".into(),
            string_to_sign: vec![],
            access_key_id: "ak".into(),
            session_token: None,
            method: "GET".into(),
            path: path.into(),
            bucket: String::new(),
            object_key: String::new(),
            env: HashMap::new(),
            query: HashMap::new(),
        }
    }

    #[test]
    fn bucket_only_no_trailing_slash() {
        let (bucket, key) = split_bucket_and_key("/bucket");
        assert_eq!(bucket, "bucket");
        assert_eq!(key, "");
    }

    #[test]
    fn bucket_with_trailing_slash() {
        let (bucket, key) = split_bucket_and_key("/bucket/");
        assert_eq!(bucket, "bucket");
        assert_eq!(key, "");
    }

    #[test]
    fn double_slash_key_begins_with_slash() {
        let (bucket, key) = split_bucket_and_key("/bucket//key");
        assert_eq!(bucket, "bucket");
        assert_eq!(key, "/key");
    }

    #[test]
    fn root_path_yields_empty_bucket_and_key() {
        let (bucket, key) = split_bucket_and_key("/");
        assert_eq!(bucket, "");
        assert_eq!(key, "");
    }

    #[test]
    fn never_mode_skips_capture_entirely() {
        let snapshot = snapshot_with_path("/bucket/key");
        assert!(capture(&snapshot, AuthCaptureMode::Never).is_none());
    }

    #[test]
    fn with_token_mode_requires_nonempty_token() {
        let mut snapshot = snapshot_with_path("/bucket/key");
        assert!(capture(&snapshot, AuthCaptureMode::WithToken).is_none());
        snapshot.session_token = Some("tok".into());
        assert!(capture(&snapshot, AuthCaptureMode::WithToken).is_some());
    }

    #[test]
    fn invalid_relative_uri_suppresses_capture() {
        let snapshot = snapshot_with_path("not-a-path");
        assert!(capture(&snapshot, AuthCaptureMode::Always).is_none());
    }

    #[test]
    fn amz_headers_are_renamed_and_lowercased() {
        let mut snapshot = snapshot_with_path("/bucket/key");
        snapshot.env.insert("HTTP_X_AMZ_DATE".to_string(), "20231012T000000Z".to_string());
        snapshot.env.insert("HTTP_CONTENT_LENGTH".to_string(), "123".to_string());
        let captured = capture(&snapshot, AuthCaptureMode::Always).unwrap();
        assert_eq!(captured.headers().get("x-amz-date").map(String::as_str), Some("20231012T000000Z"));
        assert!(!captured.headers().contains_key("content-length"));
    }
}
