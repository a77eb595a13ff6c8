//! Configuration file parsing
//!
//! Reads an anonymization job from a TOML file: where the data lives, which
//! columns play which role, where each QI's hierarchy CSV is, and the privacy
//! model with its targets.
//!
//! ```toml
//! data = "data/hospital.csv"
//! output = "anonymized.csv"
//!
//! [columns]
//! identifiers = ["name"]
//! quasi_identifiers = ["age", "gender", "city"]
//! sensitive = "disease"
//!
//! [hierarchies]
//! age = "hierarchies/age.csv"
//! gender = "hierarchies/gender.csv"
//! city = "hierarchies/city.csv"
//!
//! [privacy]
//! model = "l-diversity"
//! k = 2
//! l = 2
//! supp_level = 0.0
//! ```

use crate::engine::{ModelKind, PrivacyModel};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use strum::IntoEnumIterator;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// One anonymization job as described on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Input table CSV.
    pub data: PathBuf,

    /// Where the anonymized CSV is written.
    #[serde(default = "default_output")]
    pub output: PathBuf,

    #[serde(default)]
    pub columns: ColumnsConfig,

    /// QI name -> hierarchy CSV path.
    #[serde(default)]
    pub hierarchies: BTreeMap<String, PathBuf>,

    pub privacy: PrivacyConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ColumnsConfig {
    /// Columns erased outright.
    #[serde(default)]
    pub identifiers: Vec<String>,

    /// Columns generalized through hierarchies, in priority order: the
    /// declared order breaks ties when the search picks a QI to generalize.
    #[serde(default)]
    pub quasi_identifiers: Vec<String>,

    /// The single sensitive attribute, carried through unchanged.
    #[serde(default)]
    pub sensitive: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrivacyConfig {
    /// Model name, e.g. "k-anonymity" or "recursive-cl-diversity".
    pub model: String,

    pub k: usize,

    pub alpha: Option<f64>,
    pub l: Option<usize>,
    pub c: Option<u64>,
    pub t: Option<f64>,
    pub beta: Option<f64>,
    pub delta: Option<f64>,

    /// Maximum percentage of records that may be suppressed.
    #[serde(default)]
    pub supp_level: f64,
}

impl Config {
    /// Load configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check model name, model parameters and column roles for coherence.
    /// Value ranges are the engine's job; this only catches a config that
    /// cannot even name a complete request.
    fn validate(&self) -> Result<(), ConfigError> {
        let kind = self.model_kind()?;
        self.to_model()?;
        if kind.requires_sensitive() && self.columns.sensitive.is_none() {
            let name: &'static str = kind.into();
            return Err(ConfigError::Validation(format!(
                "model '{name}' requires columns.sensitive"
            )));
        }
        if self.columns.quasi_identifiers.is_empty() {
            return Err(ConfigError::Validation(
                "columns.quasi_identifiers must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn model_kind(&self) -> Result<ModelKind, ConfigError> {
        ModelKind::from_str(&self.privacy.model).map_err(|_| {
            let known: Vec<&'static str> = ModelKind::iter().map(|k| k.into()).collect();
            ConfigError::Validation(format!(
                "unknown model '{}'. Valid models: {}",
                self.privacy.model,
                known.join(", ")
            ))
        })
    }

    /// Build the typed model from the parameter grab-bag.
    pub fn to_model(&self) -> Result<PrivacyModel, ConfigError> {
        let kind = self.model_kind()?;
        let name: &'static str = kind.into();
        let p = &self.privacy;
        let require_f64 = |label: &str, value: Option<f64>| {
            value.ok_or_else(|| {
                ConfigError::Validation(format!("model '{name}' requires privacy.{label}"))
            })
        };
        let model = match kind {
            ModelKind::KAnonymity => PrivacyModel::KAnonymity { k: p.k },
            ModelKind::AlphaKAnonymity => PrivacyModel::AlphaKAnonymity {
                k: p.k,
                alpha: require_f64("alpha", p.alpha)?,
            },
            ModelKind::LDiversity => PrivacyModel::LDiversity {
                k: p.k,
                l: require_l(name, p.l)?,
            },
            ModelKind::EntropyLDiversity => PrivacyModel::EntropyLDiversity {
                k: p.k,
                l: require_l(name, p.l)?,
            },
            ModelKind::RecursiveClDiversity => PrivacyModel::RecursiveClDiversity {
                k: p.k,
                c: p.c.ok_or_else(|| {
                    ConfigError::Validation(format!("model '{name}' requires privacy.c"))
                })?,
                l: require_l(name, p.l)?,
            },
            ModelKind::TCloseness => PrivacyModel::TCloseness {
                k: p.k,
                t: require_f64("t", p.t)?,
            },
            ModelKind::BasicBetaLikeness => PrivacyModel::BasicBetaLikeness {
                k: p.k,
                beta: require_f64("beta", p.beta)?,
            },
            ModelKind::EnhancedBetaLikeness => PrivacyModel::EnhancedBetaLikeness {
                k: p.k,
                beta: require_f64("beta", p.beta)?,
            },
            ModelKind::DeltaDisclosure => PrivacyModel::DeltaDisclosure {
                k: p.k,
                delta: require_f64("delta", p.delta)?,
            },
        };
        Ok(model)
    }
}

fn require_l(name: &str, l: Option<usize>) -> Result<usize, ConfigError> {
    l.ok_or_else(|| ConfigError::Validation(format!("model '{name}' requires privacy.l")))
}

fn default_output() -> PathBuf {
    PathBuf::from("anonymized.csv")
}
