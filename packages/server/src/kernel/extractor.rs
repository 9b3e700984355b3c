//! LLM-backed fact extraction over policy text.
//!
//! Two fixed-shape extractions: the five boolean compliance scopes and the
//! five contact/jurisdiction fields. Context is bounded to the first few
//! chunks; upstream warm-up and rate-limit errors are retried here and, once
//! retries run out, collapse to the deterministic all-false / all-null
//! fallback so the pipeline never sees a transient error.

use anyhow::Result;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use super::traits::{BaseAI, BaseFactExtractor};
use crate::domains::companies::{EnrichmentFields, ScopeFlags};

/// Hard bound on how many chunks reach the model.
pub const MAX_CONTEXT_CHUNKS: usize = 5;

const MAX_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(20);

const SCOPE_PREAMBLE: &str =
    "You are a legal expert analyzing privacy and terms-of-service documents. \
     Respond with a single JSON object and nothing else.";

const ENRICH_PREAMBLE: &str =
    "You extract contact and jurisdiction details from policy documents. \
     Respond with a single JSON object and nothing else.";

pub struct LlmFactExtractor {
    ai: Arc<dyn BaseAI>,
    max_attempts: u32,
    retry_delay: Duration,
}

impl LlmFactExtractor {
    pub fn new(ai: Arc<dyn BaseAI>) -> Self {
        Self {
            ai,
            max_attempts: MAX_ATTEMPTS,
            retry_delay: RETRY_DELAY,
        }
    }

    pub fn with_retry_policy(mut self, max_attempts: u32, retry_delay: Duration) -> Self {
        self.max_attempts = max_attempts;
        self.retry_delay = retry_delay;
        self
    }

    async fn complete_with_retry(&self, preamble: &str, prompt: &str) -> Result<String> {
        let mut attempt = 1;
        loop {
            match self.ai.complete(preamble, prompt).await {
                Ok(reply) => return Ok(reply),
                Err(e) if attempt < self.max_attempts && is_transient(&e) => {
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "transient model error, retrying"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn extract<T: DeserializeOwned + Default>(
        &self,
        preamble: &str,
        prompt: &str,
        what: &str,
    ) -> T {
        match self.complete_with_retry(preamble, prompt).await {
            Ok(reply) => match parse_json_reply::<T>(&reply) {
                Ok(value) => value,
                Err(e) => {
                    warn!(error = %e, what, "unparseable model reply, using fallback");
                    T::default()
                }
            },
            Err(e) => {
                warn!(error = %e, what, "extraction failed, using fallback");
                T::default()
            }
        }
    }
}

#[async_trait]
impl BaseFactExtractor for LlmFactExtractor {
    async fn classify_scopes(&self, chunks: &[String]) -> Result<ScopeFlags> {
        let context = join_context(chunks);
        let prompt = format!(
            r#"Analyze the following policy text excerpts and determine whether each scope applies (true/false).

Scopes:
- scope_registration: data collection appears to start at user registration.
- scope_legal: data collected for legal compliance.
- scope_customization: data used to customize the user experience.
- scope_marketing: data used for marketing purposes.
- scope_security: data used for security purposes.

Policy text:
{context}

Return ONLY a JSON object with keys scope_registration, scope_legal, scope_customization, scope_marketing, scope_security. Values must be booleans."#
        );

        Ok(self.extract(SCOPE_PREAMBLE, &prompt, "scopes").await)
    }

    async fn extract_fields(&self, chunks: &[String]) -> Result<EnrichmentFields> {
        let context = join_context(chunks);
        let prompt = format!(
            r#"Extract the following from the policy text if present:
- generic_email
- contact_email
- privacy_email
- delete_link (URL for account deletion)
- country (jurisdiction or address country)

Policy text:
{context}

Return ONLY a JSON object with these keys. Use null for anything not found."#
        );

        Ok(self.extract(ENRICH_PREAMBLE, &prompt, "enrichment").await)
    }
}

fn join_context(chunks: &[String]) -> String {
    chunks
        .iter()
        .take(MAX_CONTEXT_CHUNKS)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// True for upstream conditions worth retrying: rate limits, gateway errors,
/// and inference endpoints still warming up.
fn is_transient(error: &anyhow::Error) -> bool {
    for cause in error.chain() {
        if let Some(req) = cause.downcast_ref::<reqwest::Error>() {
            if req.is_timeout() {
                return true;
            }
            if let Some(status) = req.status() {
                return matches!(status.as_u16(), 429 | 502 | 503 | 504);
            }
        }
    }

    let message = format!("{:#}", error);
    if message.contains("model_pending_deploy") || message.contains("timed out") {
        return true;
    }
    ["429", "502", "503", "504"]
        .iter()
        .any(|code| contains_status_token(&message, code))
}

/// Match a status code only as a standalone token, so digits embedded in a
/// URL, identifier, or longer number never count.
fn contains_status_token(message: &str, code: &str) -> bool {
    let is_word = |c: char| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/');
    message.match_indices(code).any(|(at, _)| {
        let joined_before = message[..at].chars().next_back().is_some_and(is_word);
        let joined_after = message[at + code.len()..].chars().next().is_some_and(is_word);
        !joined_before && !joined_after
    })
}

/// Parse a model reply that may be wrapped in markdown code fences.
fn parse_json_reply<T: DeserializeOwned>(reply: &str) -> Result<T> {
    Ok(serde_json::from_str(strip_code_fences(reply))?)
}

fn strip_code_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let without_prefix = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_prefix
        .strip_suffix("```")
        .unwrap_or(without_prefix)
        .trim()
}
