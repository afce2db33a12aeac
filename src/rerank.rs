//! Optional LLM re-rank pass over classifier output.
//!
//! The classifier's ranking is authoritative; this pass only *selects* from
//! it. Everything here is built so the whole stage can degrade to `None`
//! (caller keeps the heuristic order) without an error surface.

use std::fmt::Write as _;

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::Deserialize;
use tracing::warn;

use crate::ai::{sanitize_reasoning, ChatClient};
use crate::candidate::{CareerCandidate, DiscoveryCriteria};

/// Payload-size cap: at most this many candidates form the submitted batch.
pub const MAX_RERANK_BATCH: usize = 100;
/// Token-efficiency cap: at most this many candidates get a summary block
/// in the outbound prompt. Indices stay valid over the whole batch.
pub const MAX_PROMPT_SUMMARIES: usize = 50;

pub const SYSTEM_PROMPT: &str =
    "You are a career research assistant. Always respond with valid JSON only.";

const SUMMARY_DESCRIPTION_CHARS: usize = 240;

/// Result of a successful re-rank: selected candidates in model order plus
/// the model's (sanitized) reasoning, when it provided one.
#[derive(Debug, Clone)]
pub struct RerankSelection {
    pub candidates: Vec<CareerCandidate>,
    pub reasoning: Option<String>,
}

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "rerank_outcomes_total",
            "Re-rank pass outcomes (applied vs. the various fallback reasons)."
        );
    });
}

fn outcome(label: &'static str) {
    counter!("rerank_outcomes_total", "outcome" => label).increment(1);
}

/// Ask the model to pick the best candidates. `None` means "keep the
/// heuristic ranking" — unavailable client, parse failure, or an empty
/// selection all land there.
pub async fn rerank(
    client: &dyn ChatClient,
    criteria: &DiscoveryCriteria,
    ranked: &[CareerCandidate],
    want: usize,
) -> Option<RerankSelection> {
    ensure_metrics_described();
    if ranked.is_empty() || want == 0 {
        outcome("no_candidates");
        return None;
    }

    let batch = &ranked[..ranked.len().min(MAX_RERANK_BATCH)];
    let prompt = build_rerank_prompt(criteria, batch, want);
    let raw = match client.complete(SYSTEM_PROMPT, &prompt).await {
        Some(r) => r,
        None => {
            outcome("no_response");
            return None;
        }
    };
    let selection = match parse_selection(&raw) {
        Some(s) => s,
        None => {
            outcome("parse_failed");
            return None;
        }
    };

    let picked = map_indices(batch, &selection.selected_companies);
    if picked.is_empty() {
        outcome("empty_selection");
        return None;
    }
    outcome("applied");

    let reasoning = selection
        .reasoning
        .map(|r| sanitize_reasoning(&r))
        .filter(|r| !r.is_empty());
    Some(RerankSelection {
        candidates: picked.into_iter().take(want).collect(),
        reasoning,
    })
}

/// Deterministic prompt: criteria block, then numbered summaries in
/// submission order. Same input, same bytes out.
pub fn build_rerank_prompt(
    criteria: &DiscoveryCriteria,
    batch: &[CareerCandidate],
    want: usize,
) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "You are a company research expert. Analyze these discovered career pages and select the companies most likely to be legitimate employers matching the criteria."
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "Criteria:");
    let _ = writeln!(out, "- Industry: {}", criteria.industry);
    let _ = writeln!(out, "- Company Size: {}", criteria.company_size.label());
    let _ = writeln!(out, "- Number of results wanted: {want}");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Companies to analyze ({} of {} listed):",
        batch.len().min(MAX_PROMPT_SUMMARIES),
        batch.len()
    );
    for (i, c) in batch.iter().take(MAX_PROMPT_SUMMARIES).enumerate() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Company {}:", i + 1);
        let _ = writeln!(out, "Name: {}", c.company_name);
        let _ = writeln!(out, "URL: {}", c.career_url);
        let _ = writeln!(out, "Domain: {}", c.domain);
        let _ = writeln!(
            out,
            "Description: {}",
            truncate_chars(&c.description, SUMMARY_DESCRIPTION_CHARS)
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Return a JSON object with 1-based company numbers that best match the criteria, ordered by relevance, plus a one-sentence reasoning."
    );
    let _ = writeln!(
        out,
        r#"Format: {{"selected_companies": [1, 3, 5], "reasoning": "..."}}"#
    );
    let _ = writeln!(out, "Only return the JSON, no additional text.");
    out
}

#[derive(Debug, Deserialize)]
pub struct Selection {
    #[serde(default)]
    pub selected_companies: Vec<i64>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

/// Parse the model reply, tolerating a fenced code block around the JSON.
pub fn parse_selection(raw: &str) -> Option<Selection> {
    let cleaned = strip_code_fence(raw);
    match serde_json::from_str::<Selection>(cleaned) {
        Ok(s) => Some(s),
        Err(e) => {
            warn!(target: "rerank", error = %e, "model reply was not valid selection JSON");
            None
        }
    }
}

pub(crate) fn strip_code_fence(raw: &str) -> &str {
    let mut body = raw.trim();
    if let Some(rest) = body.strip_prefix("```json") {
        body = rest;
    } else if let Some(rest) = body.strip_prefix("```") {
        body = rest;
    }
    if let Some(rest) = body.strip_suffix("```") {
        body = rest;
    }
    body.trim()
}

fn map_indices(batch: &[CareerCandidate], indices: &[i64]) -> Vec<CareerCandidate> {
    indices
        .iter()
        .filter_map(|&i| {
            usize::try_from(i)
                .ok()
                .filter(|&n| n >= 1 && n <= batch.len())
                .map(|n| batch[n - 1].clone())
        })
        .collect()
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{LimitedClient, MockProvider};
    use crate::candidate::CompanySize;

    fn cand(name: &str, url: &str) -> CareerCandidate {
        CareerCandidate {
            company_name: name.to_string(),
            career_url: url.to_string(),
            description: format!("{name} is hiring engineers."),
            domain: url.trim_start_matches("https://").to_string(),
            industry: "Technology & Software".to_string(),
            company_size: CompanySize::Startup,
            relevance_score: 1.0,
        }
    }

    fn criteria() -> DiscoveryCriteria {
        DiscoveryCriteria::new("Technology & Software", CompanySize::Startup)
    }

    #[tokio::test]
    async fn scripted_selection_reorders_and_truncates() {
        let client = LimitedClient::new(
            MockProvider {
                fixed: r#"{"selected_companies": [3, 1, 5], "reasoning": "third looked best"}"#
                    .into(),
            },
            10,
        );
        let ranked: Vec<_> = (1..=5)
            .map(|i| cand(&format!("Co {i}"), &format!("https://co{i}.com/careers")))
            .collect();

        let sel = rerank(&client, &criteria(), &ranked, 2).await.unwrap();
        assert_eq!(sel.candidates.len(), 2);
        assert_eq!(sel.candidates[0].company_name, "Co 3");
        assert_eq!(sel.candidates[1].company_name, "Co 1");
        assert_eq!(sel.reasoning.as_deref(), Some("third looked best"));
    }

    #[tokio::test]
    async fn out_of_range_indices_are_ignored() {
        let client = LimitedClient::new(
            MockProvider {
                fixed: r#"{"selected_companies": [99, 2, 0, -4], "reasoning": ""}"#.into(),
            },
            10,
        );
        let ranked = vec![
            cand("A", "https://a.com/careers"),
            cand("B", "https://b.com/careers"),
        ];
        let sel = rerank(&client, &criteria(), &ranked, 5).await.unwrap();
        assert_eq!(sel.candidates.len(), 1);
        assert_eq!(sel.candidates[0].company_name, "B");
        assert_eq!(sel.reasoning, None);
    }

    #[tokio::test]
    async fn malformed_reply_falls_back() {
        let client = LimitedClient::new(
            MockProvider {
                fixed: "the best companies are Acme and Globex".into(),
            },
            10,
        );
        let ranked = vec![cand("A", "https://a.com/careers")];
        assert!(rerank(&client, &criteria(), &ranked, 3).await.is_none());
    }

    #[tokio::test]
    async fn empty_selection_falls_back() {
        let client = LimitedClient::new(
            MockProvider {
                fixed: r#"{"selected_companies": [], "reasoning": "none fit"}"#.into(),
            },
            10,
        );
        let ranked = vec![cand("A", "https://a.com/careers")];
        assert!(rerank(&client, &criteria(), &ranked, 3).await.is_none());
    }

    #[tokio::test]
    async fn empty_input_skips_the_call() {
        let client = LimitedClient::new(
            MockProvider {
                fixed: r#"{"selected_companies": [1]}"#.into(),
            },
            10,
        );
        assert!(rerank(&client, &criteria(), &[], 3).await.is_none());
        let ranked = vec![cand("A", "https://a.com/careers")];
        assert!(rerank(&client, &criteria(), &ranked, 0).await.is_none());
    }

    #[test]
    fn fenced_replies_parse() {
        let fenced = "```json\n{\"selected_companies\": [2, 1], \"reasoning\": \"ok\"}\n```";
        let sel = parse_selection(fenced).unwrap();
        assert_eq!(sel.selected_companies, vec![2, 1]);

        let bare_fence = "```\n{\"selected_companies\": [1]}\n```";
        let sel = parse_selection(bare_fence).unwrap();
        assert_eq!(sel.selected_companies, vec![1]);

        assert!(parse_selection("not json").is_none());
    }

    #[test]
    fn missing_fields_default() {
        let sel = parse_selection("{}").unwrap();
        assert!(sel.selected_companies.is_empty());
        assert!(sel.reasoning.is_none());
    }

    #[test]
    fn prompt_is_deterministic_and_caps_summaries() {
        let batch: Vec<_> = (1..=60)
            .map(|i| cand(&format!("Co {i}"), &format!("https://co{i}.com/careers")))
            .collect();
        let a = build_rerank_prompt(&criteria(), &batch, 10);
        let b = build_rerank_prompt(&criteria(), &batch, 10);
        assert_eq!(a, b);
        assert!(a.contains("Company 50:"));
        assert!(!a.contains("Company 51:"));
        assert!(a.contains("- Industry: Technology & Software"));
        assert!(a.contains(r#""selected_companies""#));
    }

    #[tokio::test]
    async fn indices_reach_past_summary_cap() {
        // Candidate 60 gets no summary block but stays selectable.
        let client = LimitedClient::new(
            MockProvider {
                fixed: r#"{"selected_companies": [60]}"#.into(),
            },
            10,
        );
        let ranked: Vec<_> = (1..=60)
            .map(|i| cand(&format!("Co {i}"), &format!("https://co{i}.com/careers")))
            .collect();
        let sel = rerank(&client, &criteria(), &ranked, 5).await.unwrap();
        assert_eq!(sel.candidates[0].company_name, "Co 60");
    }
}
