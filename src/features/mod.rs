pub mod text;
pub mod url;

use serde::Serialize;

pub use text::{TextFeatureExtractor, TextFeatures};
pub use url::{UrlFeatureExtractor, UrlFeatures};

/// Column order the feature scaler and model were fit on. Reordering or
/// renaming these silently corrupts predictions, so the canonical list
/// lives here and everything else is checked against it.
pub const FEATURE_COLUMNS: [&str; 14] = [
    "url_length",
    "has_https",
    "num_dots",
    "num_hyphens",
    "has_at",
    "has_ip",
    "is_shortened",
    "has_suspicious_kw",
    "uncommon_tld",
    "domain_length",
    "phish_kw_count",
    "legit_kw_count",
    "lure_url_interaction",
    "safety_amplifier",
];

/// The full 14-field numeric record handed to the scaler: 10 URL fields,
/// 2 keyword counts, and 2 interaction terms.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    pub url_length: i64,
    pub has_https: i64,
    pub num_dots: i64,
    pub num_hyphens: i64,
    pub has_at: i64,
    pub has_ip: i64,
    pub is_shortened: i64,
    pub has_suspicious_kw: i64,
    pub uncommon_tld: i64,
    pub domain_length: i64,
    pub phish_kw_count: i64,
    pub legit_kw_count: i64,
    pub lure_url_interaction: i64,
    pub safety_amplifier: i64,
}

impl FeatureVector {
    /// Assembles the combined vector from the two feature groups and
    /// computes the interaction terms.
    ///
    /// `url_suspicion_score` ranges over 0..=2. `safety_amplifier` goes
    /// negative when the score is 2: legitimate-sounding text paired with
    /// a doubly-suspicious URL is penalized, and the sign carries that.
    pub fn combine(url: &UrlFeatures, text: &TextFeatures) -> Self {
        let url_suspicion_score = url.has_suspicious_kw + url.uncommon_tld;
        let lure_url_interaction = text.phish_kw_count * url_suspicion_score;
        let safety_amplifier = text.legit_kw_count * (1 - url_suspicion_score);

        Self {
            url_length: url.url_length,
            has_https: url.has_https,
            num_dots: url.num_dots,
            num_hyphens: url.num_hyphens,
            has_at: url.has_at,
            has_ip: url.has_ip,
            is_shortened: url.is_shortened,
            has_suspicious_kw: url.has_suspicious_kw,
            uncommon_tld: url.uncommon_tld,
            domain_length: url.domain_length,
            phish_kw_count: text.phish_kw_count,
            legit_kw_count: text.legit_kw_count,
            lure_url_interaction,
            safety_amplifier,
        }
    }

    pub fn url_suspicion_score(&self) -> i64 {
        self.has_suspicious_kw + self.uncommon_tld
    }

    fn value(&self, name: &str) -> Option<f64> {
        let v = match name {
            "url_length" => self.url_length,
            "has_https" => self.has_https,
            "num_dots" => self.num_dots,
            "num_hyphens" => self.num_hyphens,
            "has_at" => self.has_at,
            "has_ip" => self.has_ip,
            "is_shortened" => self.is_shortened,
            "has_suspicious_kw" => self.has_suspicious_kw,
            "uncommon_tld" => self.uncommon_tld,
            "domain_length" => self.domain_length,
            "phish_kw_count" => self.phish_kw_count,
            "legit_kw_count" => self.legit_kw_count,
            "lure_url_interaction" => self.lure_url_interaction,
            "safety_amplifier" => self.safety_amplifier,
            _ => return None,
        };
        Some(v as f64)
    }

    /// Reindexes the vector into the column order a scaler was fit on.
    /// Columns the vector does not know are filled with 0.0, matching the
    /// fill behavior the training pipeline used.
    pub fn ordered_values(&self, columns: &[String]) -> Vec<f64> {
        columns
            .iter()
            .map(|name| self.value(name).unwrap_or(0.0))
            .collect()
    }
}
