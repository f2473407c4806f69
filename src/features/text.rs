/// Terms the training data associates with phishing lures.
const PHISHING_KEYWORDS: &[&str] = &[
    "verify",
    "account",
    "password",
    "urgent",
    "suspended",
    "click",
    "free",
    "prize",
    "congratulations",
    "limited",
    "paypal",
    "bank",
    "update",
    "secure",
    "login",
    "payroll",
    "tax",
    "errors",
    "confidential",
    "submission",
];

/// Terms common in ordinary workplace mail.
const LEGIT_KEYWORDS: &[&str] = &[
    "meeting", "project", "schedule", "update", "invoice", "team", "thanks", "report", "office",
    "zoom",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextFeatures {
    pub phish_kw_count: i64,
    pub legit_kw_count: i64,
}

/// Counts keyword occurrences over normalized text. Matching is
/// substring-based, not whole-word: "update" inside "updated" counts.
/// The scaler and model were trained on these semantics, so tokenized
/// matching here would silently shift every prediction.
pub struct TextFeatureExtractor;

impl TextFeatureExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, normalized_text: &str) -> TextFeatures {
        TextFeatures {
            phish_kw_count: count_occurrences(normalized_text, PHISHING_KEYWORDS),
            legit_kw_count: count_occurrences(normalized_text, LEGIT_KEYWORDS),
        }
    }
}

impl Default for TextFeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Sum of non-overlapping occurrences of each keyword.
fn count_occurrences(text: &str, keywords: &[&str]) -> i64 {
    keywords
        .iter()
        .map(|kw| text.matches(kw).count() as i64)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_repeated_keywords() {
        let extractor = TextFeatureExtractor::new();
        let features = extractor.extract("verify your account verify now");
        assert_eq!(features.phish_kw_count, 3);
        assert_eq!(features.legit_kw_count, 0);
    }

    #[test]
    fn test_substring_matching_counts_subwords() {
        let extractor = TextFeatureExtractor::new();
        // "updated" contains "update", which is on both lists.
        let features = extractor.extract("the schedule was updated");
        assert_eq!(features.phish_kw_count, 1);
        assert_eq!(features.legit_kw_count, 2);
    }

    #[test]
    fn test_empty_text() {
        let extractor = TextFeatureExtractor::new();
        assert_eq!(extractor.extract(""), TextFeatures::default());
    }

    #[test]
    fn test_mixed_body() {
        let extractor = TextFeatureExtractor::new();
        let features =
            extractor.extract("team meeting moved - thanks. urgent: click to claim your free prize");
        assert_eq!(features.legit_kw_count, 3);
        assert_eq!(features.phish_kw_count, 4);
    }
}
