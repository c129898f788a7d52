use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub recommendation: RecommendationConfig,
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Valid evaluations required before a session completes.
    pub target_evaluations: u32,
    /// Size of the curated pool candidates are drawn from.
    pub top_pool_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationConfig {
    pub default_k: usize,
    pub max_k: usize,
    /// Catalog slice (by popularity) considered when ranking.
    pub catalog_limit: usize,
    pub min_evaluations_for_recommendations: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// JSON catalog file; the server starts with an empty catalog when unset.
    pub path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            session: SessionConfig {
                target_evaluations: 20,
                top_pool_size: 100,
            },
            recommendation: RecommendationConfig {
                default_k: 10,
                max_k: 1000,
                catalog_limit: 1000,
                min_evaluations_for_recommendations: 5,
            },
            catalog: CatalogConfig {
                path: Some("data/movies.json".to_string()),
            },
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("FUZZYREC").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Loads `path` when it exists, otherwise falls back to the defaults.
    pub fn load_or_default(path: &str) -> anyhow::Result<Self> {
        if std::path::Path::new(path).exists() {
            Self::from_file(path)
        } else {
            tracing::info!("Config file {} not found, using default configuration", path);
            Ok(Self::default())
        }
    }
}
