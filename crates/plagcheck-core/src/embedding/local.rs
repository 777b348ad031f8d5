//! Local sentence-transformer embeddings through `fastembed` (ONNX runtime).
//!
//! The model files are downloaded into the cache directory on first use and
//! loaded once; inference runs on the blocking pool.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use super::{EmbedError, Embedder, Embeddings};

/// Model used when none is named: the `all-MiniLM-L6-v2` sentence
/// transformer.
pub const DEFAULT_LOCAL_MODEL: &str = "all-MiniLM-L6-v2";

/// Map a model name as users write it to a `fastembed` model.
pub fn parse_model(name: &str) -> Option<EmbeddingModel> {
    let key: String = name
        .rsplit('/')
        .next()
        .unwrap_or(name)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    match key.as_str() {
        "allminilml6v2" => Some(EmbeddingModel::AllMiniLML6V2),
        "bgesmallenv15" => Some(EmbeddingModel::BGESmallENV15),
        "bgebaseenv15" => Some(EmbeddingModel::BGEBaseENV15),
        "bgelargeenv15" => Some(EmbeddingModel::BGELargeENV15),
        "paraphrasemultilingualminilml12v2" | "paraphraseminilml12v2" => {
            Some(EmbeddingModel::ParaphraseMLMiniLML12V2)
        }
        "paraphrasemultilingualmpnetbasev2" | "paraphrasempnetbasev2" => {
            Some(EmbeddingModel::ParaphraseMLMpnetBaseV2)
        }
        _ => None,
    }
}

pub struct FastEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
    name: String,
}

impl FastEmbedder {
    /// Load `model`, downloading it into `cache_dir` (or fastembed's default
    /// cache) when missing.
    pub fn new(model: EmbeddingModel, cache_dir: Option<PathBuf>) -> Result<Self, EmbedError> {
        let name = format!("{:?}", model);
        let mut options = InitOptions::new(model).with_show_download_progress(false);
        if let Some(dir) = cache_dir {
            options = options.with_cache_dir(dir);
        }
        let text_embedding = TextEmbedding::try_new(options)
            .map_err(|e| EmbedError::Model(format!("failed to load {}: {}", name, e)))?;
        tracing::info!(model = %name, "loaded local embedding model");
        Ok(Self {
            model: Arc::new(Mutex::new(text_embedding)),
            name,
        })
    }

    /// Load a model by name (see [`parse_model`]).
    pub fn from_name(name: &str, cache_dir: Option<PathBuf>) -> Result<Self, EmbedError> {
        let model = parse_model(name)
            .ok_or_else(|| EmbedError::Model(format!("unknown local model '{}'", name)))?;
        Self::new(model, cache_dir)
    }
}

impl Embedder for FastEmbedder {
    fn name(&self) -> &str {
        &self.name
    }

    fn embed<'a>(
        &'a self,
        sentences: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Result<Embeddings, EmbedError>> + Send + 'a>> {
        Box::pin(async move {
            let model = Arc::clone(&self.model);
            let texts = sentences.to_vec();
            let rows = tokio::task::spawn_blocking(move || {
                let model = model
                    .lock()
                    .map_err(|_| EmbedError::Model("model lock poisoned".into()))?;
                model
                    .embed(texts, None)
                    .map_err(|e| EmbedError::Model(e.to_string()))
            })
            .await
            .map_err(|e| EmbedError::Model(format!("embedding task failed: {}", e)))??;
            tracing::debug!(model = %self.name, rows = rows.len(), "embedded sentences");
            Ok(rows)
        })
    }
}
