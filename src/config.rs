use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::feature_builder::PriceTiers;
use crate::file_utils;
use crate::ranker::{
    SuggestionOptions, DEFAULT_MAX_SUGGESTIONS, DEFAULT_SUGGESTION_CUTOFF, DEFAULT_TOP_N,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub recommend: RecommendConfig,
    #[serde(default)]
    pub price: PriceTiers,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatasetConfig {
    pub path: PathBuf,
    pub delimiter: char,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("trt_rest.csv"),
            delimiter: ',',
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecommendConfig {
    pub top_n: usize,
    pub max_suggestions: usize,
    pub suggestion_cutoff: f64,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            max_suggestions: DEFAULT_MAX_SUGGESTIONS,
            suggestion_cutoff: DEFAULT_SUGGESTION_CUTOFF,
        }
    }
}

impl RecommendConfig {
    pub fn suggestion_options(&self) -> SuggestionOptions {
        SuggestionOptions {
            limit: self.max_suggestions,
            cutoff: self.suggestion_cutoff,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found")]
    DirectoryError,
    #[error("Invalid top_n: {0} (must be at least 1)")]
    InvalidTopN(usize),
    #[error("Invalid suggestion cutoff: {0} (must be between 0 and 1)")]
    InvalidSuggestionCutoff(f64),
    #[error("Invalid delimiter: {0:?} (must be a single ASCII character)")]
    InvalidDelimiter(char),
    #[error("Price tier list cannot be empty")]
    NoPriceTiers,
    #[error("Duplicate price tier: {0}")]
    DuplicatePriceTier(String),
    #[error("Invalid fallback tier: {0} (only {1} tiers defined)")]
    InvalidFallbackTier(usize, usize),
    #[error("Price symbol '{0}' maps to unknown tier '{1}'")]
    UnknownSymbolTier(String, String),
    #[error("Failed to read config file {}: {}", .0.display(), .1)]
    Read(PathBuf, #[source] std::io::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Loads `config.toml` from `config_dir`, falling back to defaults when
    /// the file does not exist.
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();
        let config_path = file_utils::config_file_path(config_dir);

        if !config_path.exists() {
            debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self {
                base_dir: config_dir.to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|e| ConfigError::Read(config_path.clone(), e))?;
        let mut config: Config = toml::from_str(&content)?;
        config.base_dir = config_dir.to_path_buf();
        config.validate()?;

        debug!("Loaded config from {}", config_path.display());
        Ok(config)
    }

    /// Loads from the per-user configuration directory.
    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load(file_utils::config_directory()?)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.validate()?;
        fs::create_dir_all(&self.base_dir)?;
        fs::write(self.config_file_path(), self.to_toml()?)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn config_file_path(&self) -> PathBuf {
        file_utils::config_file_path(&self.base_dir)
    }

    /// Dataset path, resolved against the config directory when relative
    /// and not present in the working directory.
    pub fn dataset_path(&self) -> PathBuf {
        let path = &self.dataset.path;
        if path.is_absolute() || path.exists() {
            return path.clone();
        }
        let in_config_dir = self.base_dir.join(path);
        if in_config_dir.exists() {
            in_config_dir
        } else {
            path.clone()
        }
    }

    /// Delimiter as a byte for the CSV reader. Only valid after `validate`.
    pub fn delimiter(&self) -> u8 {
        u8::try_from(self.dataset.delimiter).unwrap_or(b',')
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.dataset.delimiter.is_ascii() {
            return Err(ConfigError::InvalidDelimiter(self.dataset.delimiter));
        }
        if self.recommend.top_n == 0 {
            return Err(ConfigError::InvalidTopN(self.recommend.top_n));
        }
        if !(0.0..=1.0).contains(&self.recommend.suggestion_cutoff) {
            return Err(ConfigError::InvalidSuggestionCutoff(
                self.recommend.suggestion_cutoff,
            ));
        }
        self.validate_price_tiers()
    }

    fn validate_price_tiers(&self) -> Result<(), ConfigError> {
        let price = &self.price;
        if price.tiers.is_empty() {
            return Err(ConfigError::NoPriceTiers);
        }

        let mut seen = HashSet::new();
        if let Some(duplicate) = price.tiers.iter().find(|t| !seen.insert(t.as_str())) {
            return Err(ConfigError::DuplicatePriceTier(duplicate.clone()));
        }

        if price.fallback_tier >= price.tiers.len() {
            return Err(ConfigError::InvalidFallbackTier(
                price.fallback_tier,
                price.tiers.len(),
            ));
        }

        if let Some((symbol, label)) = price
            .symbols
            .iter()
            .find(|(_, label)| price.ordinal(label).is_none())
        {
            return Err(ConfigError::UnknownSymbolTier(symbol.clone(), label.clone()));
        }

        Ok(())
    }
}
