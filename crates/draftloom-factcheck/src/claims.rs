use draftloom_providers::{ChatCompletionRequest, ChatMessage, ProviderRegistry};
use draftloom_types::{ClaimKind, FactualClaim, Position};
use uuid::Uuid;

const MAX_LLM_CLAIMS: usize = 10;
const MAX_HEURISTIC_CLAIMS: usize = 8;

/// Extracts candidate factual claims from `content`. Tries an LLM pass first;
/// on any failure (call error, malformed reply, or empty result) falls back to
/// the sentence-splitting heuristic.
pub async fn extract_claims(registry: &ProviderRegistry, content: &str) -> Vec<FactualClaim> {
    match extract_via_llm(registry, content).await {
        Ok(claims) if !claims.is_empty() => claims,
        _ => extract_heuristic(content),
    }
}

async fn extract_via_llm(registry: &ProviderRegistry, content: &str) -> anyhow::Result<Vec<FactualClaim>> {
    let prompt = format!(
        "Identify up to {MAX_LLM_CLAIMS} discrete factual claims in the text below. \
         Respond with a JSON array of objects: {{\"text\", \"kind\" (statistic|historical|scientific|general|opinion), \"confidence\" (0-1)}}.\n\nTEXT:\n{content}"
    );
    let response = registry
        .complete(
            None,
            &ChatCompletionRequest {
                model: String::new(),
                messages: vec![
                    ChatMessage {
                        role: "system".to_string(),
                        content: "You extract factual claims and respond with strict JSON only.".to_string(),
                    },
                    ChatMessage {
                        role: "user".to_string(),
                        content: prompt,
                    },
                ],
                max_tokens: Some(800),
                temperature: Some(0.0),
            },
        )
        .await?;

    let parsed: Vec<RawClaim> = parse_json_array(&response.content)?;
    Ok(parsed
        .into_iter()
        .take(MAX_LLM_CLAIMS)
        .filter_map(|raw| {
            let position = locate(content, &raw.text);
            Some(FactualClaim {
                id: Uuid::new_v4(),
                text: raw.text.clone(),
                kind: raw.kind,
                extraction_confidence: raw.confidence.clamp(0.0, 1.0),
                context: surrounding_context(content, position.start, position.end),
                position,
            })
        })
        .collect())
}

#[derive(serde::Deserialize)]
struct RawClaim {
    text: String,
    kind: ClaimKind,
    #[serde(default = "default_confidence")]
    confidence: f64,
}

fn default_confidence() -> f64 {
    0.7
}

fn parse_json_array(raw: &str) -> anyhow::Result<Vec<RawClaim>> {
    let start = raw.find('[').ok_or_else(|| anyhow::anyhow!("no JSON array in LLM reply"))?;
    let end = raw.rfind(']').ok_or_else(|| anyhow::anyhow!("no JSON array in LLM reply"))?;
    Ok(serde_json::from_str(&raw[start..=end])?)
}

const TRIGGER_WORDS: &[&str] = &["study", "research", "survey", "report", "data"];
const COPULA_WORDS: &[&str] = &["is", "are", "was", "were", "according to"];

fn extract_heuristic(content: &str) -> Vec<FactualClaim> {
    split_sentences(content)
        .into_iter()
        .filter_map(|(sentence, start, end)| {
            let kind = classify(sentence)?;
            Some(FactualClaim {
                id: Uuid::new_v4(),
                text: sentence.trim().to_string(),
                kind,
                extraction_confidence: 0.5,
                context: surrounding_context(content, start, end),
                position: Position { start, end },
            })
        })
        .take(MAX_HEURISTIC_CLAIMS)
        .collect()
}

fn classify(sentence: &str) -> Option<ClaimKind> {
    let lower = sentence.to_lowercase();
    let has_number = sentence.chars().any(|c| c.is_ascii_digit());
    let has_percent = sentence.contains('%');
    let has_year = has_four_digit_year(&lower);
    let has_trigger = TRIGGER_WORDS.iter().any(|w| lower.contains(w));
    let has_copula = COPULA_WORDS.iter().any(|w| lower.contains(w));

    if !(has_number || has_percent || has_year || has_trigger || has_copula) {
        return None;
    }

    if has_percent || (has_number && !has_year) {
        Some(ClaimKind::Statistic)
    } else if has_year {
        Some(ClaimKind::Historical)
    } else if has_trigger {
        Some(ClaimKind::Scientific)
    } else if has_copula {
        Some(ClaimKind::General)
    } else {
        Some(ClaimKind::General)
    }
}

fn has_four_digit_year(lower: &str) -> bool {
    let bytes: Vec<char> = lower.chars().collect();
    bytes.windows(4).any(|w| w.iter().all(|c| c.is_ascii_digit()))
}

fn split_sentences(content: &str) -> Vec<(&str, usize, usize)> {
    let mut out = Vec::new();
    let mut start = 0usize;
    for (idx, ch) in content.char_indices() {
        if ch == '.' || ch == '!' || ch == '?' {
            let end = idx + ch.len_utf8();
            let sentence = &content[start..end];
            if !sentence.trim().is_empty() {
                out.push((sentence, start, end));
            }
            start = end;
        }
    }
    if start < content.len() {
        let sentence = &content[start..];
        if !sentence.trim().is_empty() {
            out.push((sentence, start, content.len()));
        }
    }
    out
}

fn locate(content: &str, needle: &str) -> Position {
    match content.find(needle) {
        Some(start) => Position {
            start,
            end: start + needle.len(),
        },
        None => Position { start: 0, end: needle.len().min(content.len()) },
    }
}

fn surrounding_context(content: &str, start: usize, end: usize) -> String {
    let pad = 40usize;
    let ctx_start = start.saturating_sub(pad);
    let ctx_end = (end + pad).min(content.len());
    content
        .get(ctx_start..ctx_end)
        .unwrap_or(content)
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heuristic_flags_statistic_sentence() {
        let claims = extract_heuristic("Tokyo's population is approximately 14 million people.");
        assert!(!claims.is_empty());
        assert_eq!(claims[0].kind, ClaimKind::Statistic);
    }

    #[test]
    fn heuristic_flags_historical_sentence_with_year() {
        let claims = extract_heuristic("The treaty was signed in 1919 to end the war.");
        assert!(claims.iter().any(|c| c.kind == ClaimKind::Historical));
    }

    #[test]
    fn heuristic_ignores_sentences_without_any_trigger() {
        let claims = extract_heuristic("I love writing short stories.");
        assert!(claims.is_empty());
    }

    #[test]
    fn heuristic_caps_at_eight_claims() {
        let mut text = String::new();
        for i in 0..20 {
            text.push_str(&format!("The study from {} found data. ", 1900 + i));
        }
        let claims = extract_heuristic(&text);
        assert_eq!(claims.len(), MAX_HEURISTIC_CLAIMS);
    }
}
