//! Build and query pipelines
//!
//! Both pipelines take their resources from a [`Session`](crate::session::Session)
//! and fail fast when its gate is not open.

pub mod build;
pub mod query;

use crate::embed::EmbedError;
use crate::session::SessionError;
use crate::vector::VectorError;
use thiserror::Error;

pub use build::{BuildReport, IndexBuildPipeline, Seed};
pub use query::{QueryPipeline, QueryResults, ResultBoard};

/// Neighbors returned per query unless configured otherwise
pub const DEFAULT_TOP_K: usize = 4;

/// Pipeline errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error(transparent)]
    NotReady(#[from] SessionError),

    #[error("Failed to embed document {id}: {source}")]
    Embed { id: String, source: EmbedError },

    #[error("Failed to embed query: {0}")]
    QueryEmbed(EmbedError),

    #[error("Index error: {0}")]
    Index(#[from] VectorError),
}

pub type PipelineResult<T> = Result<T, PipelineError>;
