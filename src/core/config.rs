use super::extract::{DEFAULT_MAX_TNA, DEFAULT_MIN_TNA, ExtractionStrategy};
use super::wallet::WalletRegistry;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

pub const STRUCTURED_SOURCE_ID: &str = "argentinadatos";
pub const EXTERNAL_SOURCE_PREFIX: &str = "external:";

const DEFAULT_STRUCTURED_URLS: [&str; 3] = [
    "https://api.argentinadatos.com/v1/finanzas/rendimientos",
    "https://api.argentinadatos.com/v1/finanzas/tasas/billeteras",
    "https://api.argentinadatos.com/v1/finanzas/billeteras",
];

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StoreConfig {
    /// `memory`, or a filesystem path for the persistent store.
    pub uri: Option<String>,
    #[serde(default = "default_db_name")]
    pub db_name: String,
    #[serde(default = "default_collection")]
    pub collection: String,
}

fn default_db_name() -> String {
    "comparador_tasas".to_string()
}

fn default_collection() -> String {
    "wallets".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            uri: None,
            db_name: default_db_name(),
            collection: default_collection(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StructuredApiConfig {
    pub override_url: Option<String>,
    #[serde(default = "default_structured_urls")]
    pub candidate_urls: Vec<String>,
    #[serde(default)]
    pub extra_urls: Vec<String>,
}

fn default_structured_urls() -> Vec<String> {
    DEFAULT_STRUCTURED_URLS.iter().map(|u| u.to_string()).collect()
}

impl Default for StructuredApiConfig {
    fn default() -> Self {
        StructuredApiConfig {
            override_url: None,
            candidate_urls: default_structured_urls(),
            extra_urls: Vec::new(),
        }
    }
}

/// One structured endpoint and the source label its rates are recorded under.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredEndpoint {
    pub url: String,
    pub source: String,
}

impl StructuredApiConfig {
    /// Override first, then the fixed candidates, then extras; duplicates dropped.
    ///
    /// Extra URLs are third-party feeds and are labelled `external:<url>`.
    pub fn endpoints(&self) -> Vec<StructuredEndpoint> {
        let own = self
            .override_url
            .iter()
            .chain(self.candidate_urls.iter())
            .map(|url| (url, STRUCTURED_SOURCE_ID.to_string()));
        let extra = self
            .extra_urls
            .iter()
            .map(|url| (url, format!("{EXTERNAL_SOURCE_PREFIX}{}", url.trim())));

        let mut endpoints: Vec<StructuredEndpoint> = Vec::new();
        for (url, source) in own.chain(extra) {
            let url = url.trim();
            if !url.is_empty() && !endpoints.iter().any(|e| e.url == url) {
                endpoints.push(StructuredEndpoint {
                    url: url.to_string(),
                    source,
                });
            }
        }
        endpoints
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct HtmlSourceConfig {
    pub id: String,
    pub url: String,
    /// Inferred from the URL when absent.
    pub strategy: Option<ExtractionStrategy>,
    pub mirror_url: Option<String>,
}

impl HtmlSourceConfig {
    pub fn strategy(&self) -> ExtractionStrategy {
        self.strategy
            .unwrap_or_else(|| ExtractionStrategy::for_url(&self.url))
    }
}

fn default_html_sources() -> Vec<HtmlSourceConfig> {
    vec![
        HtmlSourceConfig {
            id: "rendimientohoy".to_string(),
            url: "https://rendimientohoy.com.ar/billeteras".to_string(),
            strategy: Some(ExtractionStrategy::RendimientoHoy),
            mirror_url: None,
        },
        HtmlSourceConfig {
            id: "comparatasas".to_string(),
            url: "https://comparatasas.ar/cuentas-billeteras".to_string(),
            strategy: Some(ExtractionStrategy::ComparaTasas),
            mirror_url: Some(
                "https://r.jina.ai/http://comparatasas.ar/cuentas-billeteras".to_string(),
            ),
        },
        HtmlSourceConfig {
            id: "cronista".to_string(),
            url: "https://www.cronista.com/finanzas-mercados/billeteras-virtuales-cuanto-rinde-hoy/"
                .to_string(),
            strategy: Some(ExtractionStrategy::Generic),
            mirror_url: None,
        },
    ]
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout_secs() -> u64 {
    20
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/124.0 Safari/537.36"
        .to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ExtractionConfig {
    #[serde(default = "default_min_tna")]
    pub min_tna: f64,
    #[serde(default = "default_max_tna")]
    pub max_tna: f64,
}

fn default_min_tna() -> f64 {
    DEFAULT_MIN_TNA
}

fn default_max_tna() -> f64 {
    DEFAULT_MAX_TNA
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        ExtractionConfig {
            min_tna: DEFAULT_MIN_TNA,
            max_tna: DEFAULT_MAX_TNA,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: default_port(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub structured_api: StructuredApiConfig,
    #[serde(default = "default_html_sources")]
    pub html_sources: Vec<HtmlSourceConfig>,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub wallets: WalletRegistry,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            store: StoreConfig::default(),
            structured_api: StructuredApiConfig::default(),
            html_sources: default_html_sources(),
            http: HttpConfig::default(),
            extraction: ExtractionConfig::default(),
            server: ServerConfig::default(),
            wallets: WalletRegistry::default(),
        }
    }
}

impl AppConfig {
    /// Loads the default config file if present, then applies environment overrides.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        let mut config = if config_path.exists() {
            Self::load_from_path(&config_path)?
        } else {
            debug!("No config at {}, using defaults", config_path.display());
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    /// Loads an explicit config file, then applies environment overrides.
    pub fn load_with_env<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let mut config = Self::load_from_path(path)?;
        config.apply_env();
        Ok(config)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("ar", "tasas", "tasas")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.store.uri {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("ar", "tasas", "tasas")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file loaded: {}", e);
        }
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from a variable lookup (the process environment in production).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string());

        if let Some(uri) = get("STORE_URI").filter(|v| !v.is_empty()) {
            self.store.uri = Some(uri);
        }
        if let Some(db_name) = get("DB_NAME").filter(|v| !v.is_empty()) {
            self.store.db_name = db_name;
        }
        if let Some(collection) = get("WALLETS_COLLECTION").filter(|v| !v.is_empty()) {
            self.store.collection = collection;
        }
        if let Some(url) = get("ARGENTINA_DATOS_WALLETS_URL") {
            self.structured_api.override_url = Some(url).filter(|v| !v.is_empty());
        }
        if let Some(urls) = get("EXTERNAL_WALLET_SOURCES") {
            self.structured_api.extra_urls = urls
                .split(',')
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(mirror) = get("COMPARATASAS_MIRROR_URL") {
            let mirror = Some(mirror).filter(|v| !v.is_empty());
            for source in self
                .html_sources
                .iter_mut()
                .filter(|s| s.strategy() == ExtractionStrategy::ComparaTasas)
            {
                source.mirror_url = mirror.clone();
            }
        }
        if let Some(port) = get("PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
store:
  uri: "/tmp/tasas"
structured_api:
  override_url: "http://localhost:9000/rates"
html_sources:
  - id: "comparatasas"
    url: "https://comparatasas.ar/cuentas-billeteras"
  - id: "blog"
    url: "https://example.com/billeteras"
    strategy: rendimiento_hoy
extraction:
  min_tna: 10
wallets:
  - id: "brubank"
    name: "Brubank"
    aliases: ["brubank"]
    fallback_tna: 40.5
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.store.uri.as_deref(), Some("/tmp/tasas"));
        assert_eq!(config.store.collection, "wallets");
        assert_eq!(config.structured_api.candidate_urls.len(), 3);
        assert_eq!(
            config.structured_api.endpoints()[0].url,
            "http://localhost:9000/rates"
        );
        assert_eq!(config.html_sources.len(), 2);
        assert_eq!(
            config.html_sources[0].strategy(),
            ExtractionStrategy::ComparaTasas
        );
        assert_eq!(
            config.html_sources[1].strategy(),
            ExtractionStrategy::RendimientoHoy
        );
        assert_eq!(config.extraction.min_tna, 10.0);
        assert_eq!(config.extraction.max_tna, DEFAULT_MAX_TNA);
        assert_eq!(config.http.timeout_secs, 20);
        assert_eq!(config.wallets.len(), 1);
        assert_eq!(config.wallets.get("brubank").unwrap().fallback_tna, Some(40.5));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.html_sources.len(), 3);
        assert_eq!(config.wallets.len(), 3);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("STORE_URI", "memory"),
            ("WALLETS_COLLECTION", "billeteras"),
            ("ARGENTINA_DATOS_WALLETS_URL", " http://override/rates "),
            ("EXTERNAL_WALLET_SOURCES", "http://a/rates, ,http://b/rates"),
            ("COMPARATASAS_MIRROR_URL", "http://mirror/comparatasas"),
            ("PORT", "9090"),
        ]);
        let mut config = AppConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.store.uri.as_deref(), Some("memory"));
        assert_eq!(config.store.collection, "billeteras");
        assert_eq!(config.server.port, 9090);

        let endpoints = config.structured_api.endpoints();
        assert_eq!(endpoints.len(), 6);
        assert_eq!(endpoints[0].url, "http://override/rates");
        assert_eq!(endpoints[0].source, STRUCTURED_SOURCE_ID);
        assert_eq!(endpoints[3].source, STRUCTURED_SOURCE_ID);
        assert_eq!(endpoints[4].source, "external:http://a/rates");
        assert_eq!(endpoints[5].url, "http://b/rates");
        assert_eq!(endpoints[5].source, "external:http://b/rates");

        let comparatasas = config
            .html_sources
            .iter()
            .find(|s| s.id == "comparatasas")
            .unwrap();
        assert_eq!(
            comparatasas.mirror_url.as_deref(),
            Some("http://mirror/comparatasas")
        );
    }

    #[test]
    fn test_blank_mirror_disables_mirror() {
        let mut config = AppConfig::default();
        config.apply_overrides(|key| (key == "COMPARATASAS_MIRROR_URL").then(String::new));
        assert!(config.html_sources.iter().all(|s| s.mirror_url.is_none()));
    }
}
