use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Paths to the trained artifacts consumed read-only at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactPaths {
    pub model: String,
    pub tokenizer: String,
    pub scaler: String,
    pub feature_columns: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Address the web form binds to.
    pub listen: String,
    /// Score cutoff at or above which the label is "Phishing".
    pub threshold: f64,
    /// Token sequence length the model was trained with.
    pub max_sequence_length: usize,
    pub artifacts: ArtifactPaths,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_string(),
            threshold: 0.5,
            max_sequence_length: 300,
            artifacts: ArtifactPaths {
                model: "models/phishing_model.json".to_string(),
                tokenizer: "models/tokenizer.json".to_string(),
                scaler: "models/url_scaler.json".to_string(),
                feature_columns: "models/url_feature_columns.json".to_string(),
            },
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {path}"))?;
        let config: Config =
            serde_yaml::from_str(&content).with_context(|| format!("parsing config file {path}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn generate_default(path: &str) -> Result<()> {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config)?;
        std::fs::write(path, yaml).with_context(|| format!("writing config file {path}"))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            bail!("threshold {} is outside [0, 1]", self.threshold);
        }
        if self.max_sequence_length == 0 {
            bail!("max_sequence_length must be at least 1");
        }
        if self.listen.is_empty() {
            bail!("listen address is empty");
        }
        Ok(())
    }

    /// Checks that every artifact file exists before the engine tries to
    /// parse them, for friendlier startup errors.
    pub fn check_artifacts(&self) -> Result<()> {
        for (name, path) in [
            ("model", &self.artifacts.model),
            ("tokenizer", &self.artifacts.tokenizer),
            ("scaler", &self.artifacts.scaler),
            ("feature_columns", &self.artifacts.feature_columns),
        ] {
            if !Path::new(path).exists() {
                bail!("{name} artifact not found at {path}");
            }
        }
        Ok(())
    }
}
