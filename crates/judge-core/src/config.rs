use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::loader::DEFAULT_BATCH_SIZE;
use crate::rules::ParagraphSeparator;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub data: DataSettings,
    pub rules: RulesSettings,
    pub loader: LoaderSettings,
    pub store: StoreSettings,
    pub embedding: EmbeddingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSettings {
    pub atomic_path: String,
    /// Optional detailed card file, loaded between the atomic file and the rules.
    pub detailed_path: Option<String>,
    pub rules_path: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            atomic_path: "data/atomic.json".to_string(),
            detailed_path: None,
            rules_path: "data/MagicCompRules.txt".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RulesSettings {
    pub paragraph_separator: ParagraphSeparator,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderSettings {
    pub batch_size: usize,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self { batch_size: DEFAULT_BATCH_SIZE }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSettings {
    pub db_path: String,
    pub table: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self { db_path: "data/lancedb".to_string(), table: "mtg-cards".to_string() }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmbedBackend {
    #[default]
    Hash,
    BgeM3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    pub backend: EmbedBackend,
    pub model_dir: Option<String>,
    pub dim: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self { backend: EmbedBackend::Hash, model_dir: None, dim: 1024 }
    }
}

pub struct Config {
    figment: Figment,
}

impl Config {
    /// Built-in defaults, then `config.toml`, then `config.<env>.toml`, then
    /// `APP_*` variables (`__` separates nested keys).
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?;
        Ok(config)
    }

    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self.figment.extract().map_err(|e| Error::InvalidConfig(e.to_string()))?;
        if settings.loader.batch_size == 0 {
            return Err(Error::InvalidConfig("loader.batch_size must be greater than zero".to_string()));
        }
        if settings.embedding.dim == 0 {
            return Err(Error::InvalidConfig("embedding.dim must be greater than zero".to_string()));
        }
        Ok(settings)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
