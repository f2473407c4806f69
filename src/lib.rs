pub mod config;
pub mod features;
pub mod inference;
pub mod normalization;
pub mod server;

pub use config::Config;
pub use features::{FeatureVector, FEATURE_COLUMNS};
pub use inference::{InferenceContext, Label, Prediction};
pub use normalization::TextNormalizer;
