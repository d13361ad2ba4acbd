use std::collections::HashMap;

const EXACT_DOMAINS: &[(&str, f64)] = &[
    ("nature.com", 0.95),
    ("science.org", 0.95),
    ("reuters.com", 0.9),
    ("apnews.com", 0.9),
    ("bbc.com", 0.85),
    ("wikipedia.org", 0.75),
];

/// Scores a domain's credibility: exact matches first, then domain-suffix
/// rules, then the operator-supplied trusted-domain overrides, then a 0.5
/// default.
pub fn score_domain(domain: &str, overrides: &HashMap<String, f64>) -> f64 {
    let domain = domain.to_lowercase();

    if let Some(score) = overrides.get(&domain) {
        return *score;
    }
    for (known, score) in EXACT_DOMAINS {
        if domain == *known || domain.ends_with(&format!(".{known}")) {
            return *score;
        }
    }
    if domain.ends_with(".gov") {
        0.9
    } else if domain.ends_with(".edu") {
        0.85
    } else if domain.ends_with(".org") {
        0.7
    } else {
        0.5
    }
}

pub fn extract_domain(url: &str) -> String {
    let without_scheme = url
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    without_scheme
        .split('/')
        .next()
        .unwrap_or(without_scheme)
        .to_string()
}

/// Fraction of claim words longer than 3 characters present in the snippet,
/// clamped to `[0,1]`.
pub fn score_relevance(claim_text: &str, snippet: &str) -> f64 {
    let snippet_lower = snippet.to_lowercase();
    let words: Vec<&str> = claim_text
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| w.len() > 3)
        .collect();

    if words.is_empty() {
        return 0.0;
    }

    let matched = words
        .iter()
        .filter(|w| snippet_lower.contains(&w.to_lowercase()))
        .count();

    (matched as f64 / words.len() as f64).clamp(0.0, 1.0)
}
