//! HTTP embedding providers (OpenAI, Ollama)

use crate::config::{EmbedConfig, ProviderKind};
use crate::embed::{EmbedError, EmbedResult, EmbeddingProvider, LoadError, ProviderLoader};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Text embedded once at load time to verify the endpoint and its dimension
const PROBE_TEXT: &str = "dimension probe";

/// Provider backed by a remote embeddings API
pub struct HttpEmbeddingProvider {
    client: Client,
    provider: ProviderKind,
    model: String,
    api_key: Option<String>,
    api_base_url: String,
    dimensions: usize,
}

impl std::fmt::Debug for HttpEmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpEmbeddingProvider")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_base_url", &self.api_base_url)
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

impl HttpEmbeddingProvider {
    /// Create a new provider based on configuration
    pub fn new(config: &EmbedConfig) -> EmbedResult<Self> {
        let api_base_url = config.api_base_url.clone().unwrap_or_else(|| match config.provider {
            ProviderKind::OpenAI => "https://api.openai.com/v1".to_string(),
            ProviderKind::Ollama => "http://localhost:11434".to_string(),
            ProviderKind::Hashing => String::new(),
        });

        let api_key = config.resolved_api_key();
        match config.provider {
            ProviderKind::Hashing => {
                return Err(EmbedError::ConfigError(
                    "hashing provider is local, not HTTP".to_string(),
                ));
            }
            ProviderKind::OpenAI if api_key.is_none() => {
                return Err(EmbedError::ConfigError("OpenAI requires API key".to_string()));
            }
            _ => {}
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmbedError::ConfigError(e.to_string()))?;

        Ok(Self {
            client,
            provider: config.provider,
            model: config.model_name().to_string(),
            api_key,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            dimensions: config.dimensions,
        })
    }

    /// Embed without checking the result length
    async fn embed_unchecked(&self, text: &str) -> EmbedResult<Vec<f32>> {
        match self.provider {
            ProviderKind::OpenAI => self.openai_embedding(text).await,
            ProviderKind::Ollama => self.ollama_embedding(text).await,
            ProviderKind::Hashing => Err(EmbedError::ConfigError(
                "hashing provider is local, not HTTP".to_string(),
            )),
        }
    }

    async fn openai_embedding(&self, text: &str) -> EmbedResult<Vec<f32>> {
        #[derive(Serialize)]
        struct OpenAIRequest<'a> {
            input: [&'a str; 1],
            model: &'a str,
        }

        #[derive(Deserialize)]
        struct OpenAIResponse {
            data: Vec<OpenAIData>,
        }

        #[derive(Deserialize)]
        struct OpenAIData {
            embedding: Vec<f32>,
        }

        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| EmbedError::ConfigError("OpenAI requires API key".to_string()))?;

        let url = format!("{}/embeddings", self.api_base_url);
        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&OpenAIRequest {
                input: [text],
                model: &self.model,
            })
            .send()
            .await
            .map_err(|e| EmbedError::NetworkError(e.to_string()))?;

        if !resp.status().is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            return Err(EmbedError::ApiError(format!("OpenAI returned error: {}", error_text)));
        }

        let result: OpenAIResponse = resp
            .json()
            .await
            .map_err(|e| EmbedError::SerializationError(e.to_string()))?;
        result
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbedError::ApiError("OpenAI returned no embeddings".to_string()))
    }

    async fn ollama_embedding(&self, text: &str) -> EmbedResult<Vec<f32>> {
        #[derive(Serialize)]
        struct OllamaRequest<'a> {
            model: &'a str,
            prompt: &'a str,
        }

        #[derive(Deserialize)]
        struct OllamaResponse {
            embedding: Vec<f32>,
        }

        let url = format!("{}/api/embeddings", self.api_base_url);
        let resp = self
            .client
            .post(&url)
            .json(&OllamaRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| EmbedError::NetworkError(e.to_string()))?;

        if !resp.status().is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            return Err(EmbedError::ApiError(format!("Ollama returned error: {}", error_text)));
        }

        let result: OllamaResponse = resp
            .json()
            .await
            .map_err(|e| EmbedError::SerializationError(e.to_string()))?;
        Ok(result.embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed(&self, text: &str) -> EmbedResult<Vec<f32>> {
        let embedding = self.embed_unchecked(text).await?;
        if embedding.len() != self.dimensions {
            return Err(EmbedError::UnexpectedDimension {
                expected: self.dimensions,
                got: embedding.len(),
            });
        }
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// Loader that builds an [`HttpEmbeddingProvider`] and probes it once
#[derive(Debug, Clone)]
pub struct HttpProviderLoader {
    config: EmbedConfig,
}

impl HttpProviderLoader {
    pub fn new(config: EmbedConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ProviderLoader for HttpProviderLoader {
    async fn load(&self) -> Result<Arc<dyn EmbeddingProvider>, LoadError> {
        let provider = HttpEmbeddingProvider::new(&self.config).map_err(|e| match e {
            EmbedError::ConfigError(msg) => LoadError::Config(msg),
            other => LoadError::Provider(other.to_string()),
        })?;

        let probe = provider
            .embed_unchecked(PROBE_TEXT)
            .await
            .map_err(|e| LoadError::Provider(e.to_string()))?;
        if probe.len() != provider.dimensions {
            return Err(LoadError::DimensionProbe {
                expected: provider.dimensions,
                got: probe.len(),
            });
        }

        debug!(model = %provider.model, url = %provider.api_base_url, "embedding provider loaded");
        Ok(Arc::new(provider))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ollama_config(url: &str, dimensions: usize) -> EmbedConfig {
        EmbedConfig {
            provider: ProviderKind::Ollama,
            api_base_url: Some(url.to_string()),
            dimensions,
            timeout_secs: 5,
            ..EmbedConfig::default()
        }
    }

    async fn mount_ollama(server: &MockServer, prompt: &str, embedding: Vec<f32>) {
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .and(body_partial_json(json!({ "prompt": prompt })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "embedding": embedding })))
            .mount(server)
            .await;
    }

    #[test]
    fn test_ollama_defaults() {
        let config = EmbedConfig {
            provider: ProviderKind::Ollama,
            dimensions: 768,
            ..EmbedConfig::default()
        };
        let provider = HttpEmbeddingProvider::new(&config).unwrap();
        assert_eq!(provider.api_base_url, "http://localhost:11434");
        assert_eq!(provider.name(), "nomic-embed-text");
        assert_eq!(provider.dimensions(), 768);
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let config = EmbedConfig {
            provider: ProviderKind::OpenAI,
            api_key: Some("key".to_string()),
            api_base_url: Some("http://proxy.local/v1/".to_string()),
            ..EmbedConfig::default()
        };
        let provider = HttpEmbeddingProvider::new(&config).unwrap();
        assert_eq!(provider.api_base_url, "http://proxy.local/v1");
    }

    #[test]
    fn test_hashing_kind_rejected() {
        assert!(matches!(
            HttpEmbeddingProvider::new(&EmbedConfig::default()),
            Err(EmbedError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_fails_load() {
        let config = EmbedConfig {
            provider: ProviderKind::Ollama,
            api_base_url: Some("http://127.0.0.1:9".to_string()),
            timeout_secs: 2,
            ..EmbedConfig::default()
        };
        let result = HttpProviderLoader::new(config).load().await;
        assert!(matches!(result, Err(LoadError::Provider(_))));
    }

    #[tokio::test]
    async fn test_ollama_load_and_embed() {
        let server = MockServer::start().await;
        mount_ollama(&server, PROBE_TEXT, vec![0.0, 0.0, 1.0]).await;
        mount_ollama(&server, "sunny day", vec![0.1, 0.2, 0.3]).await;

        let provider = HttpProviderLoader::new(ollama_config(&server.uri(), 3))
            .load()
            .await
            .unwrap();
        assert_eq!(provider.dimensions(), 3);
        assert_eq!(provider.embed("sunny day").await.unwrap(), vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn test_load_rejects_wrong_dimension() {
        let server = MockServer::start().await;
        mount_ollama(&server, PROBE_TEXT, vec![0.5, 0.5]).await;

        let result = HttpProviderLoader::new(ollama_config(&server.uri(), 3)).load().await;
        assert_eq!(
            result.err(),
            Some(LoadError::DimensionProbe { expected: 3, got: 2 })
        );
    }

    #[tokio::test]
    async fn test_wrong_dimension_after_load() {
        let server = MockServer::start().await;
        mount_ollama(&server, PROBE_TEXT, vec![0.0, 0.0, 1.0]).await;
        mount_ollama(&server, "sunny day", vec![0.1, 0.2]).await;

        let provider = HttpProviderLoader::new(ollama_config(&server.uri(), 3))
            .load()
            .await
            .unwrap();
        assert_eq!(
            provider.embed("sunny day").await,
            Err(EmbedError::UnexpectedDimension { expected: 3, got: 2 })
        );
    }

    #[tokio::test]
    async fn test_openai_embedding() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .and(header("Authorization", "Bearer test-key"))
            .and(body_partial_json(json!({ "model": "text-embedding-3-small" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": "list",
                "data": [{ "object": "embedding", "index": 0, "embedding": [0.25, 0.75] }],
                "model": "text-embedding-3-small"
            })))
            .mount(&server)
            .await;

        let config = EmbedConfig {
            provider: ProviderKind::OpenAI,
            api_key: Some("test-key".to_string()),
            api_base_url: Some(server.uri()),
            dimensions: 2,
            timeout_secs: 5,
            ..EmbedConfig::default()
        };
        let provider = HttpProviderLoader::new(config).load().await.unwrap();
        assert_eq!(provider.name(), "text-embedding-3-small");
        assert_eq!(provider.embed("That is a Happy Dog").await.unwrap(), vec![0.25, 0.75]);
    }

    #[tokio::test]
    async fn test_error_status_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
            .mount(&server)
            .await;

        let provider = HttpEmbeddingProvider::new(&ollama_config(&server.uri(), 3)).unwrap();
        match provider.embed("sunny day").await {
            Err(EmbedError::ApiError(msg)) => assert!(msg.contains("model not found")),
            other => panic!("expected ApiError, got {:?}", other),
        }

        let result = HttpProviderLoader::new(ollama_config(&server.uri(), 3)).load().await;
        assert!(matches!(result, Err(LoadError::Provider(_))));
    }
}
