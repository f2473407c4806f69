use regex::Regex;

/// Normalizes raw email bodies into the restricted alphabet the trained
/// model was fit on: lowercase, newline-free, single-spaced, with every
/// character outside `[a-z0-9]`, whitespace, and `: / . - < > ? = &`
/// removed.
pub struct TextNormalizer {
    newline_regex: Regex,
    disallowed_regex: Regex,
    whitespace_regex: Regex,
}

impl TextNormalizer {
    pub fn new() -> Self {
        Self {
            newline_regex: Regex::new(r"\n").unwrap(),
            disallowed_regex: Regex::new(r"[^a-z0-9\s:/.\-<>?=&]").unwrap(),
            whitespace_regex: Regex::new(r"\s+").unwrap(),
        }
    }

    /// Normalization is idempotent: running it on already-normalized text
    /// changes nothing.
    pub fn normalize(&self, text: &str) -> String {
        let lowered = text.to_lowercase();
        let no_newlines = self.newline_regex.replace_all(&lowered, " ");
        let filtered = self.disallowed_regex.replace_all(&no_newlines, "");
        let collapsed = self.whitespace_regex.replace_all(&filtered, " ");
        collapsed.trim().to_string()
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_collapses_whitespace() {
        let normalizer = TextNormalizer::new();
        assert_eq!(
            normalizer.normalize("URGENT:   Verify\nYour  Account"),
            "urgent: verify your account"
        );
    }

    #[test]
    fn test_strips_disallowed_characters() {
        let normalizer = TextNormalizer::new();
        // Allowed symbols survive, everything else is deleted.
        assert_eq!(
            normalizer.normalize("Win $1,000!!! Click https://bit.ly/x?a=1&b=2"),
            "win 1000 click https://bit.ly/x?a=1&b=2"
        );
    }

    #[test]
    fn test_empty_input() {
        let normalizer = TextNormalizer::new();
        assert_eq!(normalizer.normalize(""), "");
        assert_eq!(normalizer.normalize("   \n\n  "), "");
    }

    #[test]
    fn test_idempotent() {
        let normalizer = TextNormalizer::new();
        let inputs = [
            "Hello,\nWorld!",
            "MiXeD CaSe 123",
            "  spaces   everywhere  ",
            "symbols: <a href=x?y=z&w=1> -- done.",
            "",
        ];
        for input in inputs {
            let once = normalizer.normalize(input);
            let twice = normalizer.normalize(&once);
            assert_eq!(once, twice, "normalization not idempotent for {input:?}");
        }
    }
}
