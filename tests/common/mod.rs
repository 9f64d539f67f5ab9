#![allow(dead_code)]

use async_trait::async_trait;
use semdex::embed::{EmbedError, EmbedResult, EmbeddingProvider, LoadError, ProviderLoader};
use semdex::session::{EngineLoader, InMemoryEngineLoader};
use semdex::{IndexConfig, Session, VectorIndex};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

/// Embedder with a fixed text -> vector table. Unknown text is an API error.
pub struct StaticEmbedder {
    dimensions: usize,
    table: HashMap<String, Vec<f32>>,
    pub calls: AtomicUsize,
}

impl StaticEmbedder {
    pub fn new(dimensions: usize, entries: &[(&str, Vec<f32>)]) -> Self {
        Self {
            dimensions,
            table: entries
                .iter()
                .map(|(text, v)| (text.to_string(), v.clone()))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for StaticEmbedder {
    async fn embed(&self, text: &str) -> EmbedResult<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.table
            .get(text)
            .cloned()
            .ok_or_else(|| EmbedError::ApiError(format!("no embedding for {:?}", text)))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Hands out one shared provider and counts loads
pub struct SharedLoader {
    provider: Arc<dyn EmbeddingProvider>,
    pub loads: AtomicUsize,
}

impl SharedLoader {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            loads: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ProviderLoader for SharedLoader {
    async fn load(&self) -> Result<Arc<dyn EmbeddingProvider>, LoadError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::clone(&self.provider))
    }
}

/// Loader whose outcome is supplied by the test through a oneshot channel
pub struct Gated<T> {
    rx: Mutex<Option<oneshot::Receiver<Result<T, LoadError>>>>,
}

pub fn gated<T>() -> (oneshot::Sender<Result<T, LoadError>>, Gated<T>) {
    let (tx, rx) = oneshot::channel();
    (tx, Gated { rx: Mutex::new(Some(rx)) })
}

impl<T> Gated<T> {
    async fn wait(&self) -> Result<T, LoadError> {
        let rx = self.rx.lock().unwrap().take();
        match rx {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(LoadError::Provider("gate dropped".to_string()))),
            None => Err(LoadError::Provider("loaded twice".to_string())),
        }
    }
}

#[async_trait]
impl ProviderLoader for Gated<Arc<dyn EmbeddingProvider>> {
    async fn load(&self) -> Result<Arc<dyn EmbeddingProvider>, LoadError> {
        self.wait().await
    }
}

#[async_trait]
impl EngineLoader for Gated<Arc<VectorIndex>> {
    async fn instantiate(&self, _config: &IndexConfig) -> Result<Arc<VectorIndex>, LoadError> {
        self.wait().await
    }
}

/// Embeddings for the happy/sunny corpus, in 3 dimensions
pub fn sunny_embedder() -> Arc<StaticEmbedder> {
    Arc::new(StaticEmbedder::new(
        3,
        &[
            ("happy person", vec![1.0, 0.0, 0.2]),
            ("happy dog", vec![0.9, 0.1, 0.0]),
            ("sunny day", vec![0.0, 1.0, 0.9]),
            ("sunny", vec![0.0, 0.9, 1.0]),
            ("happy", vec![1.0, 0.0, 0.0]),
        ],
    ))
}

/// A started session over an in-memory index and the given provider
pub async fn ready_session(provider: Arc<dyn EmbeddingProvider>) -> Session {
    let session = Session::new(
        IndexConfig::default(),
        Arc::new(InMemoryEngineLoader),
        Arc::new(SharedLoader::new(provider)),
    );
    session.start().unwrap();
    session.wait_ready().await.unwrap();
    session
}
