use regex::Regex;
use url::Url;

/// Domain labels (registrable domain, suffix excluded) of known URL
/// shortening services.
const SHORTENER_DOMAINS: &[&str] = &["bit", "tinyurl", "ow", "t", "is", "goo", "rebrandly", "url"];

/// Keywords that show up disproportionately in credential-phishing URLs.
const SUSPICIOUS_URL_KEYWORDS: &[&str] =
    &["login", "verify", "update", "secure", "bank", "account", "paypal"];

/// Public suffixes with high abuse rates relative to legitimate use.
const UNCOMMON_TLDS: &[&str] = &[
    "xyz", "top", "club", "info", "support", "tk", "ml", "cf", "ga",
];

/// The 10 URL-derived signals, in the order the scaler was fit on.
/// Booleans are 0/1. A missing URL yields the all-zero default rather
/// than omitted fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UrlFeatures {
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
}

pub struct UrlFeatureExtractor {
    url_regex: Regex,
    ip_regex: Regex,
}

impl UrlFeatureExtractor {
    pub fn new() -> Self {
        Self {
            url_regex: Regex::new(r"https?://[^\s]+").unwrap(),
            ip_regex: Regex::new(r"^https?://\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}").unwrap(),
        }
    }

    /// Returns the first HTTP(S) URL in the raw email body, verbatim.
    /// Later URLs are ignored: the pipeline evaluates at most one URL per
    /// email, a deliberate simplification carried over from training.
    pub fn first_url<'a>(&self, text: &'a str) -> Option<&'a str> {
        self.url_regex.find(text).map(|m| m.as_str())
    }

    pub fn extract(&self, url: &str) -> UrlFeatures {
        if url.is_empty() {
            return UrlFeatures::default();
        }

        let url_lower = url.to_lowercase();
        let (domain, suffix) = split_registrable_domain(url);

        UrlFeatures {
            url_length: url.chars().count() as i64,
            has_https: i64::from(url.starts_with("https")),
            num_dots: url.matches('.').count() as i64,
            num_hyphens: url.matches('-').count() as i64,
            has_at: i64::from(url.contains('@')),
            has_ip: i64::from(self.ip_regex.is_match(url)),
            is_shortened: i64::from(SHORTENER_DOMAINS.contains(&domain.as_str())),
            has_suspicious_kw: i64::from(
                SUSPICIOUS_URL_KEYWORDS
                    .iter()
                    .any(|kw| url_lower.contains(kw)),
            ),
            uncommon_tld: i64::from(UNCOMMON_TLDS.contains(&suffix.as_str())),
            domain_length: domain.chars().count() as i64,
        }
    }
}

impl Default for UrlFeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Splits a URL's host into (registrable domain label, public suffix)
/// using the compiled public-suffix list, so multi-part suffixes like
/// "co.uk" land in the suffix and not the domain. IP-address hosts have
/// no suffix; the whole address counts as the domain label.
fn split_registrable_domain(url: &str) -> (String, String) {
    let host = match Url::parse(url) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) => host.to_lowercase(),
            None => return (String::new(), String::new()),
        },
        Err(_) => return (String::new(), String::new()),
    };

    if host.parse::<std::net::Ipv4Addr>().is_ok() {
        return (host, String::new());
    }

    let suffix = match psl::suffix(host.as_bytes()) {
        Some(suffix) => String::from_utf8_lossy(suffix.as_bytes()).to_string(),
        None => return (host, String::new()),
    };

    // Registrable label: the single label left of the suffix.
    let without_suffix = host
        .strip_suffix(&suffix)
        .map(|h| h.trim_end_matches('.'))
        .unwrap_or("");
    let domain = without_suffix
        .rsplit('.')
        .next()
        .unwrap_or("")
        .to_string();

    (domain, suffix)
}
