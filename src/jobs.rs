//! Job-listing search criteria, query construction, and the optional AI
//! match filter over `google_jobs` results.

use std::fmt::Write as _;

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::Deserialize;
use tracing::warn;

use crate::ai::ChatClient;
use crate::candidate::JobListing;
use crate::rerank::strip_code_fence;

/// Select options offered by the API (first entry is the no-filter value).
pub const EMPLOYMENT_TYPES: [&str; 6] = [
    "Any",
    "Full-time",
    "Part-time",
    "Contract",
    "Internship",
    "Temporary",
];
pub const WORK_MODES: [&str; 4] = ["Any", "Remote", "On-site", "Hybrid"];
pub const EXPERIENCE_LEVELS: [&str; 5] = [
    "Any",
    "Entry Level",
    "Mid Level",
    "Senior Level",
    "Executive",
];

/// At most this many listings are summarized for the filter pass.
pub const MAX_FILTER_SUMMARIES: usize = 50;
/// At most this many summaries go into the outbound prompt. Selection
/// indices stay valid over the whole input list.
pub const MAX_PROMPT_JOBS: usize = 20;

pub const JOBS_SYSTEM_PROMPT: &str =
    "You are a helpful job matching assistant. Always respond with valid JSON only.";

const SUMMARY_DESCRIPTION_CHARS: usize = 500;

/// What the caller is looking for. The string fields take the literal
/// select-option values; `"Any"` means no preference.
#[derive(Debug, Clone, Deserialize)]
pub struct JobCriteria {
    pub position: String,
    #[serde(default = "default_any")]
    pub employment_type: String,
    #[serde(default = "default_any")]
    pub work_mode: String,
    #[serde(default = "default_any")]
    pub experience_level: String,
    #[serde(default)]
    pub location: String,
    #[serde(default = "default_num_results")]
    pub num_results: usize,
}

fn default_any() -> String {
    "Any".to_string()
}

fn default_num_results() -> usize {
    20
}

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "jobs_filter_outcomes_total",
            "AI job-filter outcomes (applied vs. fallback reasons)."
        );
    });
}

fn outcome(label: &'static str) {
    counter!("jobs_filter_outcomes_total", "outcome" => label).increment(1);
}

/// Search-engine query for a job hunt: the position verbatim, the lowercased
/// employment type when one is chosen, and `remote` for remote-only hunts.
pub fn build_jobs_query(criteria: &JobCriteria) -> String {
    let mut parts = vec![criteria.position.trim().to_string()];
    if criteria.employment_type != "Any" {
        parts.push(criteria.employment_type.to_lowercase());
    }
    if criteria.work_mode == "Remote" {
        parts.push("remote".to_string());
    }
    parts.join(" ")
}

/// Ask the model which listings actually match. `None` means "show the raw
/// results" — the caller truncates those itself.
pub async fn filter_jobs(
    client: &dyn ChatClient,
    criteria: &JobCriteria,
    jobs: &[JobListing],
) -> Option<Vec<JobListing>> {
    ensure_metrics_described();
    if jobs.is_empty() {
        outcome("no_jobs");
        return None;
    }

    let prompt = build_jobs_prompt(criteria, jobs);
    let raw = match client.complete(JOBS_SYSTEM_PROMPT, &prompt).await {
        Some(r) => r,
        None => {
            outcome("no_response");
            return None;
        }
    };
    let selection = match parse_job_selection(&raw) {
        Some(s) => s,
        None => {
            outcome("parse_failed");
            return None;
        }
    };

    let picked: Vec<JobListing> = selection
        .selected_jobs
        .iter()
        .filter_map(|&i| {
            usize::try_from(i)
                .ok()
                .filter(|&n| n >= 1 && n <= jobs.len())
                .map(|n| jobs[n - 1].clone())
        })
        .collect();
    if picked.is_empty() {
        outcome("empty_selection");
        return None;
    }
    outcome("applied");
    Some(picked.into_iter().take(criteria.num_results).collect())
}

/// Deterministic filter prompt: criteria block plus numbered job summaries
/// in input order.
pub fn build_jobs_prompt(criteria: &JobCriteria, jobs: &[JobListing]) -> String {
    let summaries: Vec<String> = jobs
        .iter()
        .take(MAX_FILTER_SUMMARIES)
        .enumerate()
        .map(|(i, job)| summarize_job(i + 1, job))
        .collect();

    let location = if criteria.location.trim().is_empty() {
        "Any"
    } else {
        criteria.location.trim()
    };

    let mut out = String::new();
    let _ = writeln!(
        out,
        "You are a job recommendation expert. Please analyze these job listings and select the most relevant ones based on the following criteria:"
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "Criteria:");
    let _ = writeln!(out, "- Position: {}", criteria.position);
    let _ = writeln!(out, "- Employment Type: {}", criteria.employment_type);
    let _ = writeln!(out, "- Work Mode: {}", criteria.work_mode);
    let _ = writeln!(out, "- Experience Level: {}", criteria.experience_level);
    let _ = writeln!(out, "- Location Preference: {location}");
    let _ = writeln!(out, "- Number of results wanted: {}", criteria.num_results);
    let _ = writeln!(out);
    let _ = writeln!(out, "Jobs to analyze:");
    for summary in summaries.iter().take(MAX_PROMPT_JOBS) {
        let _ = writeln!(out);
        out.push_str(summary);
    }
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Please return a JSON array with job numbers (1-based) that best match the criteria, ordered by relevance."
    );
    let _ = writeln!(out, r#"Format: {{"selected_jobs": [1, 3, 5, 7]}}"#);
    let _ = writeln!(out, "Only return the JSON, no additional text.");
    out
}

fn summarize_job(number: usize, job: &JobListing) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Job {number}:");
    let _ = writeln!(out, "Title: {}", job.title);
    let _ = writeln!(out, "Company: {}", job.company);
    let _ = writeln!(out, "Location: {}", job.location);
    let _ = writeln!(
        out,
        "Description: {}...",
        truncate_chars(&job.description, SUMMARY_DESCRIPTION_CHARS)
    );
    let _ = writeln!(
        out,
        "Employment Type: {}",
        job.schedule_type.as_deref().unwrap_or("Not specified")
    );
    let _ = writeln!(out, "Remote: {}", job.work_from_home);
    out
}

#[derive(Debug, Deserialize)]
pub struct JobSelection {
    #[serde(default)]
    pub selected_jobs: Vec<i64>,
}

pub fn parse_job_selection(raw: &str) -> Option<JobSelection> {
    let cleaned = strip_code_fence(raw);
    match serde_json::from_str::<JobSelection>(cleaned) {
        Ok(s) => Some(s),
        Err(e) => {
            warn!(target: "jobs", error = %e, "model reply was not valid job-selection JSON");
            None
        }
    }
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}
