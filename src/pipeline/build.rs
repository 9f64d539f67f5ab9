//! Index build pipeline
//!
//! Embeds a whole corpus and loads it into the index in one `build` call.
//! A single failed embedding aborts the run before the index is touched.

use crate::config::PipelineConfig;
use crate::pipeline::{PipelineError, PipelineResult};
use crate::session::Session;
use crate::vector::Document;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::info;

/// A corpus record awaiting embedding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seed {
    pub id: String,
    pub title: String,
    pub url: String,
    pub text: String,
}

impl Seed {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: url.into(),
            text: text.into(),
        }
    }
}

/// Outcome of a successful build
#[derive(Debug, Clone, PartialEq)]
pub struct BuildReport {
    /// Generation the build published
    pub generation: u64,
    pub documents: usize,
    pub dimension: Option<usize>,
    pub elapsed: Duration,
}

/// Embeds a fixed corpus and bulk-loads it into the session's index
#[derive(Debug, Clone)]
pub struct IndexBuildPipeline {
    corpus: Vec<Seed>,
    concurrency: usize,
}

impl IndexBuildPipeline {
    pub fn new(corpus: Vec<Seed>) -> Self {
        Self {
            corpus,
            concurrency: PipelineConfig::default().embed_concurrency,
        }
    }

    pub fn from_config(corpus: Vec<Seed>, config: &PipelineConfig) -> Self {
        Self::new(corpus).with_concurrency(config.embed_concurrency)
    }

    /// Maximum embedding calls in flight
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn corpus(&self) -> &[Seed] {
        &self.corpus
    }

    /// Embed every seed, then replace the index contents with the result.
    /// Running it again publishes a fresh generation.
    pub async fn run(&self, session: &Session) -> PipelineResult<BuildReport> {
        let handles = session.handles()?;
        let started = Instant::now();
        let provider = &handles.provider;

        let documents: Vec<Document> = stream::iter(self.corpus.iter())
            .map(|seed| async move {
                let embedding = provider
                    .embed(&seed.text)
                    .await
                    .map_err(|source| PipelineError::Embed {
                        id: seed.id.clone(),
                        source,
                    })?;
                Ok::<_, PipelineError>(Document::new(
                    seed.id.clone(),
                    seed.title.clone(),
                    seed.url.clone(),
                    embedding,
                ))
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let count = documents.len();
        let generation = handles.index.build(documents)?;
        let report = BuildReport {
            generation,
            documents: count,
            dimension: handles.index.dimension(),
            elapsed: started.elapsed(),
        };

        info!(
            generation,
            documents = count,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "corpus indexed"
        );
        Ok(report)
    }
}
