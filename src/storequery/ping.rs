//! `ping` — the simplest StoreQuery command: echo a request id back to the
//! caller. Valid from any handler context (spec.md §4.8).

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::AuthError;
use crate::types::HandlerContext;

use super::{BucketIndex, CommandHandler, MultipartTable};
use crate::types::StoreQueryCommand;

pub struct PingHandler;

#[async_trait]
impl CommandHandler for PingHandler {
    fn allowed_contexts(&self) -> &'static [HandlerContext] {
        &[HandlerContext::Service, HandlerContext::Bucket, HandlerContext::Object]
    }

    async fn execute(
        &self,
        command: &StoreQueryCommand,
        _bucket: &str,
        _object_key: &str,
        _index: &dyn BucketIndex,
        _multipart: &dyn MultipartTable,
    ) -> Result<Value, AuthError> {
        if command.params.len() != 1 {
            return Err(AuthError::StoreQueryGrammar("ping takes exactly one parameter: request_id".to_string()));
        }
        let request_id = &command.params[0];

        Ok(json!({ "StoreQueryPingResult": { "request_id": request_id } }))
    }
}
