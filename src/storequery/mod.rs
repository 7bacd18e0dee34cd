//! StoreQuery side-channel — a header-triggered set of out-of-band commands
//! that bypass authorization and surface object-presence information
//! (spec.md §4.8). Grounded in the teacher's bucket/multipart abstractions:
//! [`BucketIndex`] is shaped like `storage::traits::StorageBackend`'s
//! listing methods (paginated, marker-based), [`MultipartTable`] like
//! `multipart.rs::MultipartStore`'s upload map, keyed by bucket/key with
//! enumeration by prefix.
//!
//! The command registry (supplemented beyond spec.md's literal two
//! commands, per SPEC_FULL.md §4.8) mirrors the teacher's handler-submodule
//! pattern in `api/handlers/mod.rs`: each command is its own
//! [`CommandHandler`] impl, registered by name, so a third command can be
//! added without touching the dispatch site.

pub mod memory;
mod objectstatus;
mod ping;

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::AuthError;
use crate::types::{HandlerContext, StoreQueryCommand};

const MAX_HEADER_LEN: usize = 2048;

/// Parse the raw `x-rgw-storequery` header bytes into a [`StoreQueryCommand`]
/// (spec.md §4.8). Any byte outside printable ASCII-7, or a header over
/// 2048 bytes, is a terminal parse error — the caller aborts the request
/// with an internal-error status rather than attempting partial recovery.
pub fn parse_header(raw: &[u8]) -> Result<StoreQueryCommand, AuthError> {
    if raw.len() > MAX_HEADER_LEN {
        return Err(AuthError::StoreQueryGrammar(format!(
            "header is {} bytes, exceeds the {MAX_HEADER_LEN}-byte limit",
            raw.len()
        )));
    }
    if let Some(bad) = raw.iter().find(|&&b| !(32..=126).contains(&b)) {
        return Err(AuthError::StoreQueryGrammar(format!("non-printable-ASCII byte 0x{bad:02x} in header")));
    }

    // Every byte is already verified printable ASCII, so this can't fail.
    let text = std::str::from_utf8(raw).expect("printable ASCII-7 is valid UTF-8");
    let tokens = tokenize(text)?;
    let (name, params) = tokens.split_first().ok_or_else(|| AuthError::StoreQueryGrammar("empty header".to_string()))?;

    Ok(StoreQueryCommand {
        name: name.to_lowercase(),
        params: params.to_vec(),
    })
}

/// Space-separated tokens; a double-quoted token preserves internal spaces,
/// and `\"` inside one denotes a literal `"` (spec.md §4.8).
fn tokenize(text: &str) -> Result<Vec<String>, AuthError> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();

    loop {
        while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }

        let mut token = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            loop {
                match chars.next() {
                    None => return Err(AuthError::StoreQueryGrammar("unterminated quoted token".to_string())),
                    Some('\\') if chars.peek() == Some(&'"') => {
                        chars.next();
                        token.push('"');
                    }
                    Some('"') => break,
                    Some(c) => token.push(c),
                }
            }
        } else {
            while matches!(chars.peek(), Some(c) if !c.is_whitespace()) {
                token.push(chars.next().unwrap());
            }
        }
        tokens.push(token);
    }

    Ok(tokens)
}

/// One page of a bucket's object-version listing, returned by
/// [`BucketIndex::list_versions`].
#[derive(Debug, Clone)]
pub struct VersionEntry {
    pub key: String,
    pub version_id: String,
    pub is_current: bool,
    pub is_delete_marker: bool,
    pub size: u64,
}

#[derive(Debug, Clone, Default)]
pub struct VersionPage {
    pub entries: Vec<VersionEntry>,
    pub next_marker: Option<String>,
    pub is_truncated: bool,
}

/// Committed-object listing, prefix-filtered and marker-paginated
/// (spec.md §4.8.1 Pass A).
#[async_trait]
pub trait BucketIndex: Send + Sync {
    async fn list_versions(
        &self,
        bucket: &str,
        prefix: &str,
        marker: Option<&str>,
        page_size: u32,
    ) -> Result<VersionPage, AuthError>;
}

#[derive(Debug, Clone)]
pub struct UploadEntry {
    pub key: String,
    pub upload_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct UploadPage {
    pub entries: Vec<UploadEntry>,
    pub next_marker: Option<String>,
    pub is_truncated: bool,
}

/// In-flight multipart-upload listing, prefix-filtered and
/// marker-paginated (spec.md §4.8.1 Pass B). The marker is advanced across
/// every page until `is_truncated` is false — spec.md §9 calls out that the
/// original implementation's failure to do this was a latent defect.
#[async_trait]
pub trait MultipartTable: Send + Sync {
    async fn list_uploads(
        &self,
        bucket: &str,
        prefix: &str,
        marker: Option<&str>,
        page_size: u32,
    ) -> Result<UploadPage, AuthError>;
}

/// One command handler. All StoreQuery operations bypass requester
/// authorization and permission checks and are treated as read-only
/// (spec.md §4.8).
#[async_trait]
pub trait CommandHandler: Send + Sync {
    fn allowed_contexts(&self) -> &'static [HandlerContext];

    async fn execute(
        &self,
        command: &StoreQueryCommand,
        bucket: &str,
        object_key: &str,
        index: &dyn BucketIndex,
        multipart: &dyn MultipartTable,
    ) -> Result<Value, AuthError>;
}

pub struct Registry {
    handlers: HashMap<String, Box<dyn CommandHandler>>,
}

impl Registry {
    pub fn new() -> Self {
        Self { handlers: HashMap::new() }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("ping", Box::new(ping::PingHandler));
        registry.register("objectstatus", Box::new(objectstatus::ObjectStatusHandler));
        registry
    }

    pub fn register(&mut self, name: &str, handler: Box<dyn CommandHandler>) {
        self.handlers.insert(name.to_string(), handler);
    }

    pub async fn dispatch(
        &self,
        command: &StoreQueryCommand,
        context: HandlerContext,
        bucket: &str,
        object_key: &str,
        index: &dyn BucketIndex,
        multipart: &dyn MultipartTable,
    ) -> Result<Value, AuthError> {
        let handler = self
            .handlers
            .get(&command.name)
            .ok_or_else(|| AuthError::StoreQueryUnknownCommand(command.name.clone()))?;

        if !handler.allowed_contexts().contains(&context) {
            return Err(AuthError::StoreQueryContext {
                command: command.name.clone(),
                context,
            });
        }

        handler.execute(command, bucket, object_key, index, multipart).await
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Parse the header and dispatch in one call — the shape the REST layer's
/// extension point actually uses.
pub async fn dispatch(
    raw_header: &[u8],
    context: HandlerContext,
    bucket: &str,
    object_key: &str,
    registry: &Registry,
    index: &dyn BucketIndex,
    multipart: &dyn MultipartTable,
) -> Result<Value, AuthError> {
    let command = parse_header(raw_header)?;
    registry.dispatch(&command, context, bucket, object_key, index, multipart).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_at_exactly_2048_bytes_accepted() {
        let raw = vec![b'a'; MAX_HEADER_LEN];
        assert!(parse_header(&raw).is_ok());
    }

    #[test]
    fn header_at_2049_bytes_rejected() {
        let raw = vec![b'a'; MAX_HEADER_LEN + 1];
        assert!(parse_header(&raw).is_err());
    }

    #[test]
    fn rejects_non_printable_byte() {
        let raw = b"ping \x01foo".to_vec();
        assert!(parse_header(&raw).is_err());
    }

    #[test]
    fn lowercases_command_name_preserves_param_case() {
        let cmd = parse_header(b"PING RequestId123").unwrap();
        assert_eq!(cmd.name, "ping");
        assert_eq!(cmd.params, vec!["RequestId123".to_string()]);
    }

    #[test]
    fn quoted_token_preserves_spaces_and_escaped_quote() {
        let cmd = parse_header(br#"ping "hello \"world\" there""#).unwrap();
        assert_eq!(cmd.params, vec![r#"hello "world" there"#.to_string()]);
    }

    #[test]
    fn empty_header_rejected() {
        assert!(parse_header(b"").is_err());
        assert!(parse_header(b"   ").is_err());
    }
}
