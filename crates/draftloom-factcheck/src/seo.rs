use draftloom_providers::{ChatCompletionRequest, ChatMessage, ProviderRegistry};
use draftloom_types::{FactCheckResult, Priority, SeoSuggestion, SeoSuggestionKind};
use serde::Deserialize;

const MAX_SUGGESTIONS: usize = 8;

/// Generates SEO suggestions for the passage, informed by the fact-check
/// results so far. LLM pass first; a heuristic fallback otherwise.
pub async fn suggest(
    registry: &ProviderRegistry,
    content: &str,
    results: &[FactCheckResult],
) -> Vec<SeoSuggestion> {
    match suggest_via_llm(registry, content, results).await {
        Some(suggestions) if !suggestions.is_empty() => suggestions,
        _ => suggest_heuristic(content, results),
    }
}

async fn suggest_via_llm(
    registry: &ProviderRegistry,
    content: &str,
    results: &[FactCheckResult],
) -> Option<Vec<SeoSuggestion>> {
    let verified_count = results
        .iter()
        .filter(|r| r.status == draftloom_types::FactCheckStatus::Verified)
        .count();
    let prompt = format!(
        "The article below has {verified_count} verified factual claims out of {}. \
         Suggest up to {MAX_SUGGESTIONS} SEO improvements. Reply with a strict JSON array of objects: \
         {{\"kind\": internal_link|external_link|keyword|meta|structure, \"title\", \"description\", \
         \"implementation\", \"priority\": high|medium|low, \"estimated_impact\"}}.\n\nARTICLE:\n{content}",
        results.len()
    );

    let response = registry
        .complete(
            None,
            &ChatCompletionRequest {
                model: String::new(),
                messages: vec![
                    ChatMessage {
                        role: "system".to_string(),
                        content: "You are an SEO editor. Respond with strict JSON only.".to_string(),
                    },
                    ChatMessage {
                        role: "user".to_string(),
                        content: prompt,
                    },
                ],
                max_tokens: Some(700),
                temperature: Some(0.3),
            },
        )
        .await
        .ok()?;

    let start = response.content.find('[')?;
    let end = response.content.rfind(']')?;
    let parsed: Vec<RawSuggestion> = serde_json::from_str(&response.content[start..=end]).ok()?;

    Some(
        parsed
            .into_iter()
            .take(MAX_SUGGESTIONS)
            .map(|raw| SeoSuggestion {
                kind: raw.kind,
                title: raw.title,
                description: raw.description,
                implementation: raw.implementation,
                priority: raw.priority,
                estimated_impact: raw.estimated_impact,
            })
            .collect(),
    )
}

#[derive(Deserialize)]
struct RawSuggestion {
    kind: SeoSuggestionKind,
    title: String,
    description: String,
    implementation: String,
    priority: Priority,
    estimated_impact: String,
}

fn suggest_heuristic(content: &str, results: &[FactCheckResult]) -> Vec<SeoSuggestion> {
    let mut suggestions = Vec::new();

    if content.len() > 1000 {
        suggestions.push(SeoSuggestion {
            kind: SeoSuggestionKind::Structure,
            title: "Break up long passages with subheadings".to_string(),
            description: "This content exceeds 1000 characters without structural breaks.".to_string(),
            implementation: "Add H2/H3 subheadings every 2-3 paragraphs.".to_string(),
            priority: Priority::Medium,
            estimated_impact: "Improves readability and dwell time.".to_string(),
        });
    }

    let has_authoritative_source = results
        .iter()
        .flat_map(|r| r.sources.iter())
        .any(|s| s.credibility > 0.8);
    if has_authoritative_source {
        suggestions.push(SeoSuggestion {
            kind: SeoSuggestionKind::ExternalLink,
            title: "Link out to authoritative sources".to_string(),
            description: "High-credibility sources were found during fact-checking.".to_string(),
            implementation: "Cite the verified sources inline with outbound links.".to_string(),
            priority: Priority::Low,
            estimated_impact: "Signals trustworthiness to readers and search engines.".to_string(),
        });
    }

    suggestions.push(SeoSuggestion {
        kind: SeoSuggestionKind::InternalLink,
        title: "Add internal links to related content".to_string(),
        description: "No internal links were detected in the draft.".to_string(),
        implementation: "Link to 2-3 related articles on this site.".to_string(),
        priority: Priority::Low,
        estimated_impact: "Reduces bounce rate and spreads link equity.".to_string(),
    });

    suggestions.truncate(MAX_SUGGESTIONS);
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heuristic_suggests_subheadings_for_long_content() {
        let content = "a".repeat(1200);
        let suggestions = suggest_heuristic(&content, &[]);
        assert!(suggestions.iter().any(|s| s.kind == SeoSuggestionKind::Structure));
    }

    #[test]
    fn heuristic_always_suggests_internal_links() {
        let suggestions = suggest_heuristic("short content", &[]);
        assert!(suggestions.iter().any(|s| s.kind == SeoSuggestionKind::InternalLink));
    }

    #[test]
    fn heuristic_caps_at_max_suggestions() {
        let content = "a".repeat(1200);
        let suggestions = suggest_heuristic(&content, &[]);
        assert!(suggestions.len() <= MAX_SUGGESTIONS);
    }
}
