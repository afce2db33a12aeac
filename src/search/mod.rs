// src/search/mod.rs
pub mod config;
pub mod serp;
pub mod types;

use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;

use crate::candidate::{JobListing, SearchHit};
use crate::search::types::SearchProvider;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("search_requests_total", "Outbound search calls, by kind.");
        describe_counter!(
            "search_results_total",
            "Results parsed from search responses, by kind."
        );
        describe_counter!("search_errors_total", "Failed search calls, by kind.");
        describe_counter!(
            "search_rate_limited_total",
            "429 responses from the search service."
        );
        describe_histogram!("search_parse_ms", "Search response parse time in milliseconds.");
        describe_histogram!("search_fetch_ms", "End-to-end search call time in milliseconds.");
        describe_gauge!("search_last_run_ts", "Unix ts of the last search call.");
    });
}

/// Normalize text fields coming back from the search service: decode HTML
/// entities, strip stray markup, normalize curly quotes, collapse whitespace.
/// URLs are never touched.
pub fn normalize_result_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // Length cap: search snippets are short; anything longer is markup debris.
    if out.chars().count() > 500 {
        out = out.chars().take(500).collect();
    }
    out
}

fn normalize_hit(mut hit: SearchHit) -> SearchHit {
    hit.title = normalize_result_text(&hit.title);
    hit.snippet = normalize_result_text(&hit.snippet);
    hit
}

fn normalize_listing(mut job: JobListing) -> JobListing {
    job.title = normalize_result_text(&job.title);
    job.company = normalize_result_text(&job.company);
    job.description = normalize_result_text(&job.description);
    job
}

/// Run one organic search call. Collaborator failures degrade to an empty hit
/// list plus a caller-visible warning; they are never propagated as errors.
pub async fn fetch_career_hits(
    provider: &dyn SearchProvider,
    query: &str,
) -> (Vec<SearchHit>, Vec<String>) {
    ensure_metrics_described();
    counter!("search_requests_total", "kind" => "organic").increment(1);
    let t0 = Instant::now();

    let (hits, warnings) = match provider.organic(query).await {
        Ok(v) => (v.into_iter().map(normalize_hit).collect(), Vec::new()),
        Err(e) => {
            tracing::warn!(error = ?e, provider = provider.name(), "search provider error");
            counter!("search_errors_total", "kind" => "organic").increment(1);
            (Vec::new(), vec![format!("search failed: {e:#}")])
        }
    };

    histogram!("search_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    gauge!("search_last_run_ts").set(chrono::Utc::now().timestamp().max(0) as f64);
    (hits, warnings)
}

/// Run one job-listing search call, with the same degrade-to-empty contract.
pub async fn fetch_job_listings(
    provider: &dyn SearchProvider,
    query: &str,
    location: &str,
) -> (Vec<JobListing>, Vec<String>) {
    ensure_metrics_described();
    counter!("search_requests_total", "kind" => "jobs").increment(1);
    let t0 = Instant::now();

    let (jobs, warnings) = match provider.jobs(query, location).await {
        Ok(v) => (v.into_iter().map(normalize_listing).collect(), Vec::new()),
        Err(e) => {
            tracing::warn!(error = ?e, provider = provider.name(), "jobs provider error");
            counter!("search_errors_total", "kind" => "jobs").increment(1);
            (Vec::new(), vec![format!("job search failed: {e:#}")])
        }
    };

    histogram!("search_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    gauge!("search_last_run_ts").set(chrono::Utc::now().timestamp().max(0) as f64);
    (jobs, warnings)
}
