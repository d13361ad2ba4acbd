use draftloom_resilience::CircuitBreakerRegistry;
use reqwest::Client;
use serde::Deserialize;

pub struct RawResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "is", "are", "was", "were", "of", "in", "on", "to", "and", "or", "that",
    "this", "it", "for", "with", "as", "by", "at", "from",
];

/// Builds a search query from up to 5 high-signal (non-stop-word) tokens.
pub fn build_query(claim_text: &str) -> String {
    claim_text
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| !w.is_empty() && !STOP_WORDS.contains(&w.to_lowercase().as_str()))
        .take(5)
        .collect::<Vec<_>>()
        .join(" ")
}

pub struct SearchClient {
    client: Client,
    breakers: CircuitBreakerRegistry,
    commercial_api_key: Option<String>,
    commercial_url: String,
}

impl SearchClient {
    pub fn new(breakers: CircuitBreakerRegistry, commercial_api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            breakers,
            commercial_api_key,
            commercial_url: "https://serpapi.com/search".to_string(),
        }
    }

    /// Queries DuckDuckGo first; if fewer than 3 results come back and a
    /// commercial key is configured, tops up from the commercial provider.
    pub async fn search(&self, query: &str) -> Vec<RawResult> {
        let mut results = self.search_duckduckgo(query).await;
        if results.len() < 3 {
            if let Some(key) = &self.commercial_api_key {
                let need = 5 - results.len();
                let mut extra = self.search_commercial(query, key, need).await;
                results.append(&mut extra);
            }
        }
        results.truncate(5);
        results
    }

    async fn search_duckduckgo(&self, query: &str) -> Vec<RawResult> {
        let circuit = self.breakers.circuit("search:duckduckgo").await;
        if !circuit.try_acquire().await {
            return Vec::new();
        }
        match self.fetch_duckduckgo(query).await {
            Ok(results) => {
                circuit.record_success().await;
                results
            }
            Err(err) => {
                circuit.record_failure().await;
                tracing::debug!(error = %err, "duckduckgo search failed");
                Vec::new()
            }
        }
    }

    async fn fetch_duckduckgo(&self, query: &str) -> anyhow::Result<Vec<RawResult>> {
        let value: DuckDuckGoResponse = self
            .client
            .get("https://api.duckduckgo.com/")
            .query(&[("q", query), ("format", "json"), ("no_html", "1")])
            .send()
            .await?
            .json()
            .await?;

        let mut out = Vec::new();
        if !value.abstract_text.is_empty() {
            out.push(RawResult {
                title: value.heading.clone(),
                url: value.abstract_url.clone(),
                snippet: value.abstract_text.clone(),
            });
        }
        for topic in value.related_topics.into_iter().take(3) {
            if let (Some(text), Some(url)) = (topic.text, topic.first_url) {
                out.push(RawResult {
                    title: text.chars().take(80).collect(),
                    url,
                    snippet: text,
                });
            }
        }
        Ok(out)
    }

    async fn search_commercial(&self, query: &str, api_key: &str, need: usize) -> Vec<RawResult> {
        let circuit = self.breakers.circuit("search:commercial").await;
        if !circuit.try_acquire().await {
            return Vec::new();
        }
        match self.fetch_commercial(query, api_key).await {
            Ok(results) => {
                circuit.record_success().await;
                results.into_iter().take(need).collect()
            }
            Err(err) => {
                circuit.record_failure().await;
                tracing::debug!(error = %err, "commercial search failed");
                Vec::new()
            }
        }
    }

    async fn fetch_commercial(&self, query: &str, api_key: &str) -> anyhow::Result<Vec<RawResult>> {
        let value: CommercialResponse = self
            .client
            .get(&self.commercial_url)
            .query(&[("q", query), ("api_key", api_key)])
            .send()
            .await?
            .json()
            .await?;

        Ok(value
            .organic_results
            .into_iter()
            .take(3)
            .map(|r| RawResult {
                title: r.title,
                url: r.link,
                snippet: r.snippet.unwrap_or_default(),
            })
            .collect())
    }
}

#[derive(Debug, Deserialize, Default)]
struct DuckDuckGoResponse {
    #[serde(rename = "AbstractText", default)]
    abstract_text: String,
    #[serde(rename = "Heading", default)]
    heading: String,
    #[serde(rename = "AbstractURL", default)]
    abstract_url: String,
    #[serde(rename = "RelatedTopics", default)]
    related_topics: Vec<RelatedTopic>,
}

#[derive(Debug, Deserialize, Default)]
struct RelatedTopic {
    #[serde(rename = "Text")]
    text: Option<String>,
    #[serde(rename = "FirstURL")]
    first_url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct CommercialResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    title: String,
    link: String,
    snippet: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_query_drops_stop_words_and_caps_at_five_tokens() {
        let query = build_query("The population of Tokyo is approximately fifty million people today");
        let tokens: Vec<&str> = query.split_whitespace().collect();
        assert!(tokens.len() <= 5);
        assert!(!tokens.iter().any(|t| STOP_WORDS.contains(&t.to_lowercase().as_str())));
    }
}
