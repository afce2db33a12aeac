//! candidate.rs — Data model for the discovery pipeline.
//!
//! `SearchHit` is the raw input shape from the search collaborator,
//! `CareerCandidate` the classified output, `JobListing` the shape of the
//! direct job-search pipeline. All of these live only for the duration of
//! one request; nothing here is persisted.

use serde::{Deserialize, Serialize};

/// One raw result from the search service. Immutable once received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub snippet: String,
    /// 1-based rank as displayed by the search service. Missing in some
    /// payloads; scoring treats absence as rank 10 (zero bonus).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
}

impl SearchHit {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        snippet: impl Into<String>,
        position: Option<u32>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            snippet: snippet.into(),
            position,
        }
    }
}

/// Two-value company-size facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanySize {
    LargeCorporation,
    Startup,
}

impl CompanySize {
    pub const ALL: [CompanySize; 2] = [CompanySize::LargeCorporation, CompanySize::Startup];

    /// Human-facing label, as shown in UI dropdowns and LLM prompts.
    pub fn label(self) -> &'static str {
        match self {
            CompanySize::LargeCorporation => "Large Corporations (Fortune 500)",
            CompanySize::Startup => "Startups (Small to Medium)",
        }
    }
}

/// What the user asked for; drives both the query builder and the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryCriteria {
    pub industry: String,
    pub company_size: CompanySize,
    /// Comma-separated extra exclusion terms, or empty.
    #[serde(default)]
    pub exclude_keywords: String,
}

impl DiscoveryCriteria {
    pub fn new(industry: impl Into<String>, company_size: CompanySize) -> Self {
        Self {
            industry: industry.into(),
            company_size,
            exclude_keywords: String::new(),
        }
    }

    pub fn with_excludes(mut self, exclude_keywords: impl Into<String>) -> Self {
        self.exclude_keywords = exclude_keywords.into();
        self
    }

    /// Caller-supplied exclusion terms: split on commas, trimmed, lowercased,
    /// empty entries dropped.
    pub fn extra_excluded_terms(&self) -> Vec<String> {
        self.exclude_keywords
            .split(',')
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect()
    }
}

/// A plausible company career page, as produced by the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CareerCandidate {
    /// Best-effort, non-unique.
    pub company_name: String,
    /// The source hit's URL; unique per domain after deduplication.
    pub career_url: String,
    /// Copy of the hit's snippet.
    pub description: String,
    /// Registrable host, lowercased, no scheme, no "www." prefix. Falls back
    /// to the raw URL string when the URL does not parse.
    pub domain: String,
    pub industry: String,
    pub company_size: CompanySize,
    /// Additive heuristic score, unbounded, higher = more relevant. Used only
    /// for ordering.
    pub relevance_score: f32,
}

/// One listing from the job-search pipeline (engine `google_jobs`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobListing {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
    /// Listing source, e.g. "via LinkedIn".
    #[serde(default)]
    pub via: String,
    #[serde(default)]
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posted_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_type: Option<String>,
    #[serde(default)]
    pub work_from_home: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn company_size_serializes_snake_case() {
        let v = serde_json::to_value(CompanySize::LargeCorporation).unwrap();
        assert_eq!(v, serde_json::json!("large_corporation"));
        let v = serde_json::to_value(CompanySize::Startup).unwrap();
        assert_eq!(v, serde_json::json!("startup"));
    }

    #[test]
    fn candidate_shape_matches_api_contract() {
        let c = CareerCandidate {
            company_name: "Acme Corp".into(),
            career_url: "https://careers.acme.com/jobs".into(),
            description: "Join our team".into(),
            domain: "careers.acme.com".into(),
            industry: "Technology & Software".into(),
            company_size: CompanySize::Startup,
            relevance_score: 4.4,
        };
        let v = serde_json::to_value(&c).unwrap();
        assert_eq!(v["company_name"], "Acme Corp");
        assert_eq!(v["career_url"], "https://careers.acme.com/jobs");
        assert_eq!(v["domain"], "careers.acme.com");
        assert_eq!(v["company_size"], "startup");
        let score = v["relevance_score"].as_f64().unwrap();
        assert!((score - 4.4).abs() < 1e-6);
    }

    #[test]
    fn extra_excluded_terms_trim_and_drop_empties() {
        let c = DiscoveryCriteria::new("Technology & Software", CompanySize::Startup)
            .with_excludes(" Agency, , BOOTCAMP ,\tremote ");
        assert_eq!(c.extra_excluded_terms(), vec!["agency", "bootcamp", "remote"]);
    }

    #[test]
    fn search_hit_tolerates_missing_fields() {
        let h: SearchHit = serde_json::from_str(r#"{"title":"Careers"}"#).unwrap();
        assert_eq!(h.title, "Careers");
        assert_eq!(h.url, "");
        assert_eq!(h.position, None);
    }
}
