use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::Config;

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub thresholds: Option<ThresholdsConfig>,
    pub citations: Option<CitationsConfig>,
    pub concurrency: Option<ConcurrencyConfig>,
    pub embedding: Option<EmbeddingConfig>,
    pub bibliography: Option<BibliographyConfig>,
    pub normalizer: Option<NormalizerConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThresholdsConfig {
    pub exact: Option<f64>,
    pub partial: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CitationsConfig {
    pub window: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    pub num_workers: Option<usize>,
    pub embed_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// API root of an OpenAI-compatible embeddings service. Unset means the
    /// local sentence-transformer model.
    pub url: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    /// Download directory for local model files.
    pub cache_dir: Option<String>,
    pub batch_size: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BibliographyConfig {
    pub db_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NormalizerConfig {
    pub segment_min_words: Option<usize>,
}

/// Platform config directory path: `<config_dir>/plagcheck/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("plagcheck").join("config.toml"))
}

/// Load config by cascading CWD `.plagcheck.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".plagcheck.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparsable config file");
            None
        }
    }
}

/// Overlay value if set, else base value.
fn pick<S, T>(base: &Option<S>, overlay: &Option<S>, field: impl Fn(&S) -> Option<T>) -> Option<T> {
    overlay
        .as_ref()
        .and_then(&field)
        .or_else(|| base.as_ref().and_then(&field))
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        thresholds: Some(ThresholdsConfig {
            exact: pick(&base.thresholds, &overlay.thresholds, |t| t.exact),
            partial: pick(&base.thresholds, &overlay.thresholds, |t| t.partial),
        }),
        citations: Some(CitationsConfig {
            window: pick(&base.citations, &overlay.citations, |c| c.window),
        }),
        concurrency: Some(ConcurrencyConfig {
            num_workers: pick(&base.concurrency, &overlay.concurrency, |c| c.num_workers),
            embed_timeout_secs: pick(&base.concurrency, &overlay.concurrency, |c| {
                c.embed_timeout_secs
            }),
        }),
        embedding: Some(EmbeddingConfig {
            url: pick(&base.embedding, &overlay.embedding, |e| e.url.clone()),
            model: pick(&base.embedding, &overlay.embedding, |e| e.model.clone()),
            api_key: pick(&base.embedding, &overlay.embedding, |e| e.api_key.clone()),
            cache_dir: pick(&base.embedding, &overlay.embedding, |e| e.cache_dir.clone()),
            batch_size: pick(&base.embedding, &overlay.embedding, |e| e.batch_size),
        }),
        bibliography: Some(BibliographyConfig {
            db_path: pick(&base.bibliography, &overlay.bibliography, |b| {
                b.db_path.clone()
            }),
        }),
        normalizer: Some(NormalizerConfig {
            segment_min_words: pick(&base.normalizer, &overlay.normalizer, |n| {
                n.segment_min_words
            }),
        }),
    }
}

impl ConfigFile {
    /// Copy the comparison settings present in this file onto `config`.
    /// Embedding, bibliography and normalizer sections are consumed by the
    /// binary, which owns those resources.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(ref t) = self.thresholds {
            if let Some(exact) = t.exact {
                config.exact_threshold = exact;
            }
            if let Some(partial) = t.partial {
                config.match_threshold = partial;
            }
        }
        if let Some(window) = self.citations.as_ref().and_then(|c| c.window) {
            config.citation_window = window;
        }
        if let Some(ref c) = self.concurrency {
            if let Some(n) = c.num_workers {
                config.num_workers = n;
            }
            if let Some(secs) = c.embed_timeout_secs {
                config.embed_timeout_secs = secs;
            }
        }
    }
}
