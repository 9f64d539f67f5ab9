//! Semdex
//!
//! An in-memory embedding index with atomic rebuilds, plus the session
//! orchestration that brings up an index engine and an embedding provider
//! before any indexing or query work runs.
//!
//! # Architecture
//!
//! - `vector`: exact nearest-neighbor index. Each build publishes a complete,
//!   immutable generation; readers never see a partial build.
//! - `embed`: embedding providers behind an async trait (local feature
//!   hashing, OpenAI, Ollama).
//! - `session`: loads the engine and the provider concurrently, once, and
//!   opens a readiness gate when both are ready. Cancellation freezes state.
//! - `pipeline`: the build pipeline (embed a corpus, one atomic build) and
//!   the query pipeline (embed text, search the current generation).
//! - `config`: YAML/JSON configuration.
//!
//! ## Example Usage
//!
//! ```rust
//! use semdex::{IndexBuildPipeline, QueryPipeline, SemdexConfig, Seed, Session};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let session = Session::from_config(&SemdexConfig::default());
//! session.start().unwrap();
//! session.wait_ready().await.unwrap();
//!
//! let corpus = vec![
//!     Seed::new("0", "That is a happy dog", "/path/0", "That is a happy dog"),
//!     Seed::new("1", "Today is a sunny day", "/path/1", "Today is a sunny day"),
//! ];
//! IndexBuildPipeline::new(corpus).run(&session).await.unwrap();
//!
//! let results = QueryPipeline::default().run(&session, "sunny day").await.unwrap();
//! assert_eq!(results.neighbors[0].document.id, "1");
//! # }
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod embed;
pub mod pipeline;
pub mod session;
pub mod vector;

// Re-export main types for convenience
pub use config::{
    ConfigError, ConfigResult, EmbedConfig, IndexConfig, PipelineConfig, ProviderKind,
    SemdexConfig,
};

pub use embed::{
    EmbedError, EmbedResult, EmbeddingProvider, HashingEmbedder, HttpEmbeddingProvider,
    LoadError, ProviderLoader,
};

pub use pipeline::{
    BuildReport, IndexBuildPipeline, PipelineError, PipelineResult, QueryPipeline, QueryResults,
    ResultBoard, Seed, DEFAULT_TOP_K,
};

pub use session::{
    EngineLoader, GateStatus, InMemoryEngineLoader, ResourceState, Session, SessionError,
    SessionHandles, SessionResult,
};

pub use vector::{
    DistanceMetric, Document, IndexEvent, IndexSnapshot, Neighbor, VectorError, VectorIndex, VectorResult,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
