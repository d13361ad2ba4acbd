use draftloom_types::{ConflictKind, ConflictingInformation, FactCheckResult, FactCheckStatus, SourceReference};

/// Flags a result for editorial attention when its status is contentious and
/// at least one source is credible and relevant enough to matter.
pub fn detect_conflict(result: &FactCheckResult) -> Option<ConflictingInformation> {
    let noteworthy = matches!(
        result.status,
        FactCheckStatus::Disputed | FactCheckStatus::False | FactCheckStatus::Misleading
    );
    if !noteworthy {
        return None;
    }

    let flagged: Vec<SourceReference> = result
        .sources
        .iter()
        .filter(|s| s.credibility > 0.6 && s.relevance > 0.5)
        .cloned()
        .collect();
    if flagged.is_empty() {
        return None;
    }

    let kind = match result.status {
        FactCheckStatus::False => ConflictKind::Contradictory,
        FactCheckStatus::Misleading => ConflictKind::ContextDependent,
        _ => ConflictKind::Disputed,
    };

    Some(ConflictingInformation {
        claim_id: result.claim_id,
        kind,
        sources: flagged,
        explanation: result.explanation.clone(),
        recommendation: recommendation_for(kind),
    })
}

fn recommendation_for(kind: ConflictKind) -> String {
    match kind {
        ConflictKind::Contradictory => {
            "Remove or correct this claim; credible sources directly contradict it.".to_string()
        }
        ConflictKind::Disputed => {
            "Soften the claim or attribute it, since sources disagree on its accuracy.".to_string()
        }
        ConflictKind::Outdated => "Update the claim with more recent source data.".to_string(),
        ConflictKind::ContextDependent => {
            "Add qualifying context; the claim is misleading without it.".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn result(status: FactCheckStatus, credibility: f64, relevance: f64) -> FactCheckResult {
        FactCheckResult {
            claim_id: Uuid::new_v4(),
            status,
            confidence: 0.5,
            sources: vec![SourceReference {
                title: "Source".to_string(),
                url: "https://example.com".to_string(),
                domain: "example.com".to_string(),
                credibility,
                relevance,
                snippet: "".to_string(),
                publish_date: None,
            }],
            explanation: "disagreement among sources".to_string(),
            alternatives: None,
            last_checked: Utc::now(),
        }
    }

    #[test]
    fn verified_results_never_flag_as_conflicts() {
        assert!(detect_conflict(&result(FactCheckStatus::Verified, 0.9, 0.9)).is_none());
    }

    #[test]
    fn disputed_result_with_strong_source_flags_a_conflict() {
        let conflict = detect_conflict(&result(FactCheckStatus::Disputed, 0.8, 0.8)).unwrap();
        assert_eq!(conflict.kind, ConflictKind::Disputed);
    }

    #[test]
    fn disputed_result_with_weak_sources_does_not_flag() {
        assert!(detect_conflict(&result(FactCheckStatus::Disputed, 0.3, 0.3)).is_none());
    }
}
