use crate::config::Config;
use crate::features::{FeatureVector, TextFeatureExtractor, UrlFeatureExtractor};
use crate::normalization::TextNormalizer;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Token index reserved for padding. Vocabulary indices start at 1.
pub const PAD_INDEX: u32 = 0;

/// Word-index vocabulary fit by the training pipeline. Out-of-vocabulary
/// words map to the reserved OOV index.
#[derive(Debug, Deserialize)]
pub struct Tokenizer {
    word_index: HashMap<String, u32>,
    #[serde(default = "default_oov_index")]
    oov_index: u32,
}

fn default_oov_index() -> u32 {
    1
}

impl Tokenizer {
    pub fn new(word_index: HashMap<String, u32>, oov_index: u32) -> Self {
        Self {
            word_index,
            oov_index,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading tokenizer vocabulary {}", path.display()))?;
        let tokenizer: Tokenizer = serde_json::from_str(&content)
            .with_context(|| format!("parsing tokenizer vocabulary {}", path.display()))?;
        if tokenizer.word_index.values().any(|&idx| idx == PAD_INDEX) {
            bail!("tokenizer vocabulary assigns the reserved padding index 0");
        }
        log::debug!("loaded tokenizer with {} words", tokenizer.word_index.len());
        Ok(tokenizer)
    }

    /// Encodes whitespace-split words against the vocabulary, then pads on
    /// the left and truncates from the left to exactly `max_len`. This is
    /// the convention the model was trained with; padding or truncating on
    /// the other side silently shifts scores.
    pub fn encode(&self, text: &str, max_len: usize) -> Vec<u32> {
        let ids: Vec<u32> = text
            .split_whitespace()
            .map(|word| {
                self.word_index
                    .get(word)
                    .copied()
                    .unwrap_or(self.oov_index)
            })
            .collect();

        let start = ids.len().saturating_sub(max_len);
        let kept = &ids[start..];

        let mut encoded = vec![PAD_INDEX; max_len];
        encoded[max_len - kept.len()..].copy_from_slice(kept);
        encoded
    }
}

/// Per-column affine transform `(x - mean) / scale` fit by the training
/// pipeline's standard scaler.
#[derive(Debug, Deserialize)]
pub struct FeatureScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl FeatureScaler {
    /// Identity scaler: useful wherever fitted parameters are not in play.
    pub fn identity(width: usize) -> Self {
        Self {
            mean: vec![0.0; width],
            scale: vec![1.0; width],
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading feature scaler {}", path.display()))?;
        let scaler: FeatureScaler = serde_json::from_str(&content)
            .with_context(|| format!("parsing feature scaler {}", path.display()))?;
        if scaler.mean.len() != scaler.scale.len() {
            bail!(
                "scaler mean/scale length mismatch: {} vs {}",
                scaler.mean.len(),
                scaler.scale.len()
            );
        }
        if scaler.scale.iter().any(|&s| s == 0.0) {
            bail!("scaler contains a zero scale entry");
        }
        Ok(scaler)
    }

    pub fn width(&self) -> usize {
        self.mean.len()
    }

    pub fn transform(&self, values: &[f64]) -> Result<Vec<f64>> {
        if values.len() != self.mean.len() {
            bail!(
                "feature vector has {} columns, scaler was fit on {}",
                values.len(),
                self.mean.len()
            );
        }
        Ok(values
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(value, (mean, scale))| (value - mean) / scale)
            .collect())
    }
}

/// The pretrained sequence+dense hybrid, behind a trait so tests can
/// substitute a fixed model. Implementations return the model's raw
/// probability; score inversion and thresholding happen in the caller.
pub trait SequenceModel: Send + Sync {
    fn predict(&self, tokens: &[u32], scaled_features: &[f64]) -> Result<f64>;
}

#[derive(Debug, Deserialize)]
struct DenseLayer {
    // weights[output][input]
    weights: Vec<Vec<f64>>,
    bias: Vec<f64>,
}

impl DenseLayer {
    fn forward(&self, input: &[f64]) -> Result<Vec<f64>> {
        let mut output = Vec::with_capacity(self.weights.len());
        for (row, bias) in self.weights.iter().zip(&self.bias) {
            if row.len() != input.len() {
                bail!(
                    "dense layer expects {} inputs, got {}",
                    row.len(),
                    input.len()
                );
            }
            let sum: f64 = row.iter().zip(input).map(|(w, x)| w * x).sum();
            output.push(sum + bias);
        }
        Ok(output)
    }
}

fn relu(values: &mut [f64]) {
    for v in values.iter_mut() {
        if *v < 0.0 {
            *v = 0.0;
        }
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// JSON export of the trained hybrid network: an embedding mean-pool text
/// branch and a dense feature branch, concatenated into a sigmoid head.
#[derive(Debug, Deserialize)]
pub struct HybridModel {
    // embedding[token_index][dim]; row 0 is the padding row
    embedding: Vec<Vec<f64>>,
    text_dense: DenseLayer,
    feature_dense: DenseLayer,
    output: DenseLayer,
}

impl HybridModel {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading model weights {}", path.display()))?;
        let model: HybridModel = serde_json::from_str(&content)
            .with_context(|| format!("parsing model weights {}", path.display()))?;
        model.validate()?;
        log::info!(
            "loaded hybrid model: vocab {}, embedding dim {}",
            model.embedding.len(),
            model.embedding.first().map(|row| row.len()).unwrap_or(0)
        );
        Ok(model)
    }

    fn validate(&self) -> Result<()> {
        if self.embedding.is_empty() {
            bail!("model has an empty embedding table");
        }
        let dim = self.embedding[0].len();
        if self.embedding.iter().any(|row| row.len() != dim) {
            bail!("model embedding rows have inconsistent dimensions");
        }
        if self.output.weights.len() != 1 || self.output.bias.len() != 1 {
            bail!("model output head must be a single unit");
        }
        Ok(())
    }

    fn pool_embeddings(&self, tokens: &[u32]) -> Result<Vec<f64>> {
        let dim = self.embedding[0].len();
        let mut pooled = vec![0.0; dim];
        let mut count = 0usize;
        for &token in tokens {
            if token == PAD_INDEX {
                continue;
            }
            let row = self
                .embedding
                .get(token as usize)
                .with_context(|| format!("token index {token} outside embedding table"))?;
            for (acc, value) in pooled.iter_mut().zip(row) {
                *acc += value;
            }
            count += 1;
        }
        if count > 0 {
            for value in pooled.iter_mut() {
                *value /= count as f64;
            }
        }
        Ok(pooled)
    }
}

impl SequenceModel for HybridModel {
    fn predict(&self, tokens: &[u32], scaled_features: &[f64]) -> Result<f64> {
        let pooled = self.pool_embeddings(tokens)?;

        let mut text_branch = self.text_dense.forward(&pooled)?;
        relu(&mut text_branch);

        let mut feature_branch = self.feature_dense.forward(scaled_features)?;
        relu(&mut feature_branch);

        let mut combined = text_branch;
        combined.extend(feature_branch);

        let logit = self.output.forward(&combined)?[0];
        Ok(sigmoid(logit))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Label {
    Phishing,
    Legitimate,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Phishing => write!(f, "Phishing"),
            Label::Legitimate => write!(f, "Legitimate"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    /// Phishing likelihood in [0, 1], after score inversion.
    pub score: f64,
    pub label: Label,
}

/// Everything the pipeline needs, constructed once at startup and shared
/// read-only for the process lifetime. Nothing here mutates per request,
/// so concurrent requests need no coordination.
pub struct InferenceContext {
    normalizer: TextNormalizer,
    url_extractor: UrlFeatureExtractor,
    text_extractor: TextFeatureExtractor,
    tokenizer: Tokenizer,
    scaler: FeatureScaler,
    feature_columns: Vec<String>,
    model: Box<dyn SequenceModel>,
    max_len: usize,
    threshold: f64,
}

impl InferenceContext {
    /// Loads all trained artifacts named by the config.
    pub fn load(config: &Config) -> Result<Self> {
        let tokenizer = Tokenizer::load(Path::new(&config.artifacts.tokenizer))?;
        let scaler = FeatureScaler::load(Path::new(&config.artifacts.scaler))?;
        let feature_columns = load_feature_columns(Path::new(&config.artifacts.feature_columns))?;
        if feature_columns.len() != scaler.width() {
            bail!(
                "feature column list has {} names, scaler was fit on {} columns",
                feature_columns.len(),
                scaler.width()
            );
        }
        let model = HybridModel::load(Path::new(&config.artifacts.model))?;

        Ok(Self::new(
            tokenizer,
            scaler,
            feature_columns,
            Box::new(model),
            config.max_sequence_length,
            config.threshold,
        ))
    }

    pub fn new(
        tokenizer: Tokenizer,
        scaler: FeatureScaler,
        feature_columns: Vec<String>,
        model: Box<dyn SequenceModel>,
        max_len: usize,
        threshold: f64,
    ) -> Self {
        Self {
            normalizer: TextNormalizer::new(),
            url_extractor: UrlFeatureExtractor::new(),
            text_extractor: TextFeatureExtractor::new(),
            tokenizer,
            scaler,
            feature_columns,
            model,
            max_len,
            threshold,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Runs feature extraction only: returns the normalized body and the
    /// combined 14-field vector. URL features come from the RAW text; the
    /// keyword counts come from the normalized text.
    pub fn features(&self, raw_email: &str) -> (String, FeatureVector) {
        let normalized = self.normalizer.normalize(raw_email);
        let url = self.url_extractor.first_url(raw_email).unwrap_or("");
        let url_features = self.url_extractor.extract(url);
        let text_features = self.text_extractor.extract(&normalized);
        (normalized, FeatureVector::combine(&url_features, &text_features))
    }

    /// Full pipeline: normalize, extract, tokenize, scale, infer,
    /// invert, threshold.
    pub fn classify(&self, raw_email: &str) -> Result<Prediction> {
        self.classify_with_threshold(raw_email, self.threshold)
    }

    pub fn classify_with_threshold(&self, raw_email: &str, threshold: f64) -> Result<Prediction> {
        let (normalized, vector) = self.features(raw_email);
        let tokens = self.tokenizer.encode(&normalized, self.max_len);
        let ordered = vector.ordered_values(&self.feature_columns);
        let scaled = self.scaler.transform(&ordered)?;

        let raw_probability = self.model.predict(&tokens, &scaled)?;

        // The model's native output polarity is inverted relative to
        // phishing likelihood (training-time label encoding); this flip is
        // the documented fix, not something to correct away.
        let score = 1.0 - raw_probability;
        let label = if score >= threshold {
            Label::Phishing
        } else {
            Label::Legitimate
        };

        log::debug!("classified email: score {score:.4}, label {label}");
        Ok(Prediction { score, label })
    }
}

fn load_feature_columns(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading feature column list {}", path.display()))?;
    let columns: Vec<String> = serde_json::from_str(&content)
        .with_context(|| format!("parsing feature column list {}", path.display()))?;
    if columns.is_empty() {
        bail!("feature column list is empty");
    }
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FEATURE_COLUMNS;

    struct FixedModel(f64);

    impl SequenceModel for FixedModel {
        fn predict(&self, _tokens: &[u32], _features: &[f64]) -> Result<f64> {
            Ok(self.0)
        }
    }

    struct FailingModel;

    impl SequenceModel for FailingModel {
        fn predict(&self, _tokens: &[u32], _features: &[f64]) -> Result<f64> {
            bail!("shape mismatch in model input")
        }
    }

    fn test_tokenizer() -> Tokenizer {
        let mut word_index = HashMap::new();
        word_index.insert("verify".to_string(), 2);
        word_index.insert("your".to_string(), 3);
        word_index.insert("account".to_string(), 4);
        Tokenizer::new(word_index, 1)
    }

    fn test_context(model: Box<dyn SequenceModel>, threshold: f64) -> InferenceContext {
        let columns: Vec<String> = FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect();
        InferenceContext::new(
            test_tokenizer(),
            FeatureScaler::identity(columns.len()),
            columns,
            model,
            10,
            threshold,
        )
    }

    #[test]
    fn test_encode_pads_left() {
        let tokenizer = test_tokenizer();
        let encoded = tokenizer.encode("verify your account", 5);
        assert_eq!(encoded, vec![0, 0, 2, 3, 4]);
    }

    #[test]
    fn test_encode_truncates_from_left() {
        let tokenizer = test_tokenizer();
        let encoded = tokenizer.encode("verify your account", 2);
        assert_eq!(encoded, vec![3, 4]);
    }

    #[test]
    fn test_encode_maps_oov_to_reserved_index() {
        let tokenizer = test_tokenizer();
        let encoded = tokenizer.encode("please verify immediately", 3);
        assert_eq!(encoded, vec![1, 2, 1]);
    }

    #[test]
    fn test_scaler_affine_transform() {
        let scaler = FeatureScaler {
            mean: vec![1.0, 2.0],
            scale: vec![2.0, 4.0],
        };
        assert_eq!(scaler.transform(&[3.0, 2.0]).unwrap(), vec![1.0, 0.0]);
    }

    #[test]
    fn test_scaler_rejects_wrong_width() {
        let scaler = FeatureScaler::identity(14);
        assert!(scaler.transform(&[0.0; 3]).is_err());
    }

    #[test]
    fn test_score_inversion_and_threshold() {
        // Raw probability 0.2 inverts to score 0.8 >= 0.5: Phishing.
        let context = test_context(Box::new(FixedModel(0.2)), 0.5);
        let prediction = context.classify("verify your account").unwrap();
        assert!((prediction.score - 0.8).abs() < 1e-9);
        assert_eq!(prediction.label, Label::Phishing);
    }

    #[test]
    fn test_low_score_is_legitimate() {
        let context = test_context(Box::new(FixedModel(0.9)), 0.5);
        let prediction = context.classify("team meeting at noon").unwrap();
        assert!((prediction.score - 0.1).abs() < 1e-9);
        assert_eq!(prediction.label, Label::Legitimate);
    }

    #[test]
    fn test_caller_threshold_override() {
        let context = test_context(Box::new(FixedModel(0.9)), 0.5);
        let prediction = context
            .classify_with_threshold("team meeting at noon", 0.05)
            .unwrap();
        assert_eq!(prediction.label, Label::Phishing);
    }

    #[test]
    fn test_model_error_propagates() {
        let context = test_context(Box::new(FailingModel), 0.5);
        assert!(context.classify("anything").is_err());
    }

    #[test]
    fn test_features_pipeline_end_to_end() {
        let context = test_context(Box::new(FixedModel(0.5)), 0.5);
        let (normalized, vector) =
            context.features("URGENT! Verify your account: https://bit.ly/secure-login");
        assert_eq!(
            normalized,
            "urgent verify your account: https://bit.ly/secure-login"
        );
        assert_eq!(vector.is_shortened, 1);
        assert_eq!(vector.has_suspicious_kw, 1);
        // urgent, verify, account, secure, login
        assert_eq!(vector.phish_kw_count, 5);
        assert_eq!(vector.lure_url_interaction, 5);
    }

    #[test]
    fn test_hybrid_model_forward() {
        let model = HybridModel {
            embedding: vec![vec![0.0, 0.0], vec![1.0, -1.0], vec![3.0, 1.0]],
            text_dense: DenseLayer {
                weights: vec![vec![1.0, 0.0]],
                bias: vec![0.0],
            },
            feature_dense: DenseLayer {
                weights: vec![vec![1.0]],
                bias: vec![0.0],
            },
            output: DenseLayer {
                weights: vec![vec![1.0, 1.0]],
                bias: vec![0.0],
            },
        };
        model.validate().unwrap();

        // Tokens [0, 1, 2]: padding skipped, mean pool = [2.0, 0.0].
        // Text branch relu(2.0) = 2.0; feature branch relu(-1.0) = 0.0.
        // Output sigmoid(2.0).
        let probability = model.predict(&[0, 1, 2], &[-1.0]).unwrap();
        assert!((probability - sigmoid(2.0)).abs() < 1e-9);
    }

    #[test]
    fn test_hybrid_model_all_padding() {
        let model = HybridModel {
            embedding: vec![vec![0.5], vec![1.0]],
            text_dense: DenseLayer {
                weights: vec![vec![1.0]],
                bias: vec![0.0],
            },
            feature_dense: DenseLayer {
                weights: vec![vec![1.0]],
                bias: vec![0.0],
            },
            output: DenseLayer {
                weights: vec![vec![1.0, 1.0]],
                bias: vec![0.0],
            },
        };
        let probability = model.predict(&[0, 0, 0], &[0.0]).unwrap();
        assert!((probability - 0.5).abs() < 1e-9);
    }
}
