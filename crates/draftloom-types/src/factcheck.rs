use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClaimKind {
    Statistic,
    Historical,
    Scientific,
    General,
    Opinion,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactualClaim {
    pub id: Uuid,
    pub text: String,
    pub kind: ClaimKind,
    pub extraction_confidence: f64,
    pub context: String,
    pub position: Position,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FactCheckStatus {
    Verified,
    Disputed,
    Unverified,
    False,
    Misleading,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceReference {
    pub title: String,
    pub url: String,
    pub domain: String,
    pub credibility: f64,
    pub relevance: f64,
    pub snippet: String,
    #[serde(default)]
    pub publish_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactCheckResult {
    pub claim_id: Uuid,
    pub status: FactCheckStatus,
    pub confidence: f64,
    pub sources: Vec<SourceReference>,
    pub explanation: String,
    #[serde(default)]
    pub alternatives: Option<Vec<String>>,
    pub last_checked: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    Contradictory,
    Disputed,
    Outdated,
    ContextDependent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictingInformation {
    pub claim_id: Uuid,
    pub kind: ConflictKind,
    pub sources: Vec<SourceReference>,
    pub explanation: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SeoSuggestionKind {
    InternalLink,
    ExternalLink,
    Keyword,
    Meta,
    Structure,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeoSuggestion {
    pub kind: SeoSuggestionKind,
    pub title: String,
    pub description: String,
    pub implementation: String,
    pub priority: Priority,
    pub estimated_impact: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FactCheckPhaseOutput {
    pub claims: Vec<FactualClaim>,
    pub fact_check_results: Vec<FactCheckResult>,
    pub conflicts: Vec<ConflictingInformation>,
    pub seo_suggestions: Vec<SeoSuggestion>,
}
