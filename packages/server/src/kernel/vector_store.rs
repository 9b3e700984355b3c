//! Semantic chunk index backed by pgvector.
//!
//! Chunks are embedded one at a time and inserted with their metadata; the
//! same table serves cosine-distance search for retrieval.

use anyhow::{Context, Result};
use async_trait::async_trait;
use pgvector::Vector;
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::ai::OpenAIClient;
use super::traits::{BaseSemanticIndexer, ChunkMetadata};

pub struct PgVectorIndexer {
    pool: PgPool,
    ai: Arc<OpenAIClient>,
}

/// A scored retrieval hit.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ChunkHit {
    pub domain: String,
    pub page_type: String,
    pub url: String,
    pub chunk_text: String,
    pub score: f64,
}

impl PgVectorIndexer {
    pub fn new(pool: PgPool, ai: Arc<OpenAIClient>) -> Self {
        Self { pool, ai }
    }

    /// Search indexed chunks by semantic similarity.
    pub async fn search(&self, query: &str, limit: i64) -> Result<Vec<ChunkHit>> {
        let embedding = self
            .ai
            .create_embedding(query)
            .await
            .context("failed to embed search query")?;
        let vector = Vector::from(embedding);

        let hits = sqlx::query_as::<_, ChunkHit>(
            r#"
            SELECT domain, page_type, url, chunk_text,
                   1 - (embedding <=> $1) AS score
            FROM policy_chunks
            ORDER BY embedding <=> $1
            LIMIT $2
            "#,
        )
        .bind(&vector)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("chunk search failed")?;

        Ok(hits)
    }
}

#[async_trait]
impl BaseSemanticIndexer for PgVectorIndexer {
    async fn index(&self, chunks: &[String], metadatas: &[ChunkMetadata]) -> Result<()> {
        for (chunk, meta) in chunks.iter().zip(metadatas) {
            let embedding = self
                .ai
                .create_embedding(chunk)
                .await
                .with_context(|| format!("failed to embed chunk for {}", meta.url))?;
            let vector = Vector::from(embedding);

            sqlx::query(
                r#"
                INSERT INTO policy_chunks (id, domain, page_type, url, chunk_text, embedding)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(&meta.domain)
            .bind(meta.page_type.as_str())
            .bind(&meta.url)
            .bind(chunk)
            .bind(&vector)
            .execute(&self.pool)
            .await
            .context("failed to insert policy chunk")?;
        }

        debug!(chunks = chunks.len(), "indexed policy chunks");
        Ok(())
    }
}
