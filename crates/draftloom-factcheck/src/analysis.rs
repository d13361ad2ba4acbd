use chrono::Utc;
use draftloom_providers::{ChatCompletionRequest, ChatMessage, ProviderRegistry};
use draftloom_types::{FactCheckResult, FactCheckStatus, FactualClaim, SourceReference};
use serde::Deserialize;

/// Produces a verdict for one claim given its gathered sources. Prefers an LLM
/// pass; falls back to a credibility/relevance heuristic when the LLM is
/// unavailable or returns something unparseable.
pub async fn analyze_claim(
    registry: &ProviderRegistry,
    claim: &FactualClaim,
    sources: &[SourceReference],
) -> FactCheckResult {
    if sources.is_empty() {
        return FactCheckResult {
            claim_id: claim.id,
            status: FactCheckStatus::Unverified,
            confidence: 0.2,
            sources: Vec::new(),
            explanation: "No corroborating sources were found for this claim.".to_string(),
            alternatives: None,
            last_checked: Utc::now(),
        };
    }

    match analyze_via_llm(registry, claim, sources).await {
        Some(result) => result,
        None => analyze_heuristic(claim, sources),
    }
}

async fn analyze_via_llm(
    registry: &ProviderRegistry,
    claim: &FactualClaim,
    sources: &[SourceReference],
) -> Option<FactCheckResult> {
    let sources_block = sources
        .iter()
        .map(|s| format!("- ({:.2} credibility) {}: {}", s.credibility, s.title, s.snippet))
        .collect::<Vec<_>>()
        .join("\n");
    let prompt = format!(
        "Claim: \"{}\"\n\nSources:\n{sources_block}\n\n\
         Reply with strict JSON: {{\"status\": one of verified|disputed|unverified|false|misleading, \
         \"confidence\": 0-1, \"explanation\": string, \"alternatives\": array of strings or null}}.",
        claim.text
    );

    let response = registry
        .complete(
            None,
            &ChatCompletionRequest {
                model: String::new(),
                messages: vec![
                    ChatMessage {
                        role: "system".to_string(),
                        content: "You are a careful fact-checker. Respond with strict JSON only.".to_string(),
                    },
                    ChatMessage {
                        role: "user".to_string(),
                        content: prompt,
                    },
                ],
                max_tokens: Some(400),
                temperature: Some(0.0),
            },
        )
        .await
        .ok()?;

    let start = response.content.find('{')?;
    let end = response.content.rfind('}')?;
    let parsed: RawVerdict = serde_json::from_str(&response.content[start..=end]).ok()?;

    Some(FactCheckResult {
        claim_id: claim.id,
        status: parsed.status,
        confidence: parsed.confidence.clamp(0.0, 1.0),
        sources: sources.to_vec(),
        explanation: parsed.explanation,
        alternatives: parsed.alternatives,
        last_checked: Utc::now(),
    })
}

#[derive(Deserialize)]
struct RawVerdict {
    status: FactCheckStatus,
    confidence: f64,
    explanation: String,
    #[serde(default)]
    alternatives: Option<Vec<String>>,
}

fn analyze_heuristic(claim: &FactualClaim, sources: &[SourceReference]) -> FactCheckResult {
    let strong_sources: Vec<&SourceReference> = sources.iter().filter(|s| s.credibility > 0.7).collect();
    let mean_relevance = sources.iter().map(|s| s.relevance).sum::<f64>() / sources.len() as f64;
    let mean_credibility = sources.iter().map(|s| s.credibility).sum::<f64>() / sources.len() as f64;

    if strong_sources.len() >= 2 && mean_relevance > 0.6 {
        FactCheckResult {
            claim_id: claim.id,
            status: FactCheckStatus::Verified,
            confidence: (mean_credibility * mean_relevance).min(0.8),
            sources: sources.to_vec(),
            explanation: format!(
                "{} credible source(s) corroborate this claim with average relevance {:.2}.",
                strong_sources.len(),
                mean_relevance
            ),
            alternatives: None,
            last_checked: Utc::now(),
        }
    } else {
        FactCheckResult {
            claim_id: claim.id,
            status: FactCheckStatus::Unverified,
            confidence: (mean_credibility * mean_relevance).min(0.5),
            sources: sources.to_vec(),
            explanation: "Available sources do not sufficiently corroborate this claim.".to_string(),
            alternatives: None,
            last_checked: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use draftloom_types::{ClaimKind, Position};
    use uuid::Uuid;

    fn claim() -> FactualClaim {
        FactualClaim {
            id: Uuid::new_v4(),
            text: "The population of Tokyo is 50 million people.".to_string(),
            kind: ClaimKind::Statistic,
            extraction_confidence: 0.8,
            context: "".to_string(),
            position: Position { start: 0, end: 10 },
        }
    }

    fn source(credibility: f64, relevance: f64) -> SourceReference {
        SourceReference {
            title: "Wikipedia".to_string(),
            url: "https://en.wikipedia.org/wiki/Tokyo".to_string(),
            domain: "wikipedia.org".to_string(),
            credibility,
            relevance,
            snippet: "Tokyo's population is about 14 million.".to_string(),
            publish_date: None,
        }
    }

    #[test]
    fn heuristic_verifies_with_two_strong_relevant_sources() {
        let result = analyze_heuristic(&claim(), &[source(0.8, 0.8), source(0.9, 0.7)]);
        assert_eq!(result.status, FactCheckStatus::Verified);
    }

    #[test]
    fn heuristic_leaves_unverified_with_weak_sources() {
        let result = analyze_heuristic(&claim(), &[source(0.4, 0.3)]);
        assert_eq!(result.status, FactCheckStatus::Unverified);
    }
}
