// AI implementation using OpenAI
//
// Infrastructure only: completions via rig agents, embeddings via the REST
// endpoint. What to prompt for lives in kernel/extractor.rs.

use anyhow::{Context, Result};
use async_trait::async_trait;
use rig::completion::Prompt;
use rig::providers::openai;
use serde::{Deserialize, Serialize};

use super::traits::BaseAI;

#[derive(Debug, Serialize)]
struct EmbeddingRequest {
    input: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// OpenAI client shared by the fact extractor and the semantic indexer.
#[derive(Clone)]
pub struct OpenAIClient {
    client: openai::Client,
    http: reqwest::Client,
    api_key: String,
    model: String,
    embedding_model: String,
}

impl OpenAIClient {
    pub fn new(api_key: String, model: String, embedding_model: String) -> Self {
        let client = openai::Client::new(&api_key);
        Self {
            client,
            http: reqwest::Client::new(),
            api_key,
            model,
            embedding_model,
        }
    }

    /// Generate an embedding vector for a single text.
    pub async fn create_embedding(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            input: text.to_string(),
            model: self.embedding_model.clone(),
        };

        let response = self
            .http
            .post("https://api.openai.com/v1/embeddings")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to send embedding request to OpenAI")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("OpenAI embeddings returned HTTP {}", status);
        }

        let embedding_response: EmbeddingResponse = response
            .json()
            .await
            .context("Failed to parse embedding response")?;

        embedding_response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .context("Embedding response contained no data")
    }
}

#[async_trait]
impl BaseAI for OpenAIClient {
    async fn complete(&self, preamble: &str, prompt: &str) -> Result<String> {
        tracing::debug!(
            prompt_length = prompt.len(),
            model = %self.model,
            "Calling OpenAI for completion"
        );

        let agent = self
            .client
            .agent(&self.model)
            .preamble(preamble)
            .max_tokens(1024)
            .build();

        let response = agent
            .prompt(prompt)
            .await
            .context("Failed to call OpenAI API")?;

        tracing::debug!(response_length = response.len(), "OpenAI response received");
        Ok(response)
    }
}
