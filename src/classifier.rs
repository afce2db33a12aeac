// src/classifier.rs
//! Local classifier/ranker: decides which raw search hits are plausible
//! company career pages, extracts a best-effort company name and domain,
//! scores each admitted hit, and deduplicates by domain.
//!
//! Pure function of its inputs: same hits + same criteria always produce the
//! same candidates in the same order. All term checks are lowercased
//! substring containment.

use std::cmp::Ordering;
use std::collections::HashSet;

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use tracing::debug;
use url::Url;

use crate::candidate::{CareerCandidate, CompanySize, DiscoveryCriteria, SearchHit};

/// Dev logging gate for classification events (hashed ids only, never raw text).
pub const ENV_DEV_LOG: &str = "DISCOVERY_DEV_LOG";

/// Career-indicating keywords checked against the URL.
static URL_CAREER_KEYWORDS: [&str; 12] = [
    "career",
    "careers",
    "job",
    "jobs",
    "hiring",
    "employment",
    "talent",
    "work",
    "opportunity",
    "join",
    "apply",
    "openings",
];

/// Narrower keyword set checked against the title.
static TITLE_CAREER_KEYWORDS: [&str; 10] = [
    "career",
    "careers",
    "job",
    "jobs",
    "hiring",
    "employment",
    "work at",
    "join",
    "talent",
    "opportunities",
];

/// First six of `URL_CAREER_KEYWORDS`, checked against the snippet.
static SNIPPET_CAREER_KEYWORDS: [&str; 6] =
    ["career", "careers", "job", "jobs", "hiring", "employment"];

/// Job boards, aggregators, and recruiting-agency terms. A hit mentioning any
/// of these anywhere is not a company career page.
static EXCLUDED_SOURCE_TERMS: [&str; 14] = [
    "indeed",
    "linkedin",
    "glassdoor",
    "monster",
    "ziprecruiter",
    "simplyhired",
    "careerbuilder",
    "dice",
    "recruiter",
    "recruitment",
    "staffing",
    "headhunter",
    "talent agency",
    "consulting",
];

/// A title-derived company name containing one of these is a page label, not
/// a company.
static NAME_BAN_TERMS: [&str; 3] = ["career", "job", "hiring"];

/// URL score terms, strongest tier first (tiers are mutually exclusive).
static URL_HIRING_TERMS: [&str; 3] = ["hiring", "employment", "talent"];

static LARGE_COMPANY_TERMS: [&str; 4] = ["fortune", "global", "multinational", "corporation"];
static STARTUP_TERMS: [&str; 4] = ["startup", "emerging", "innovative", "scale"];

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("classify_hits_total", "Search hits seen by the classifier.");
        describe_counter!(
            "classify_admitted_total",
            "Hits admitted as career-page candidates."
        );
        describe_counter!(
            "classify_rejected_total",
            "Hits rejected, labeled by reason."
        );
    });
}

/// Classify and rank raw search hits into career-page candidates.
///
/// Admission requires a career signal in URL, title, or snippet; no excluded
/// term anywhere; and a domain not already admitted in this run
/// (first-seen-wins in scan order). Output is sorted by score descending,
/// stable on ties. Empty input yields empty output.
pub fn classify(hits: &[SearchHit], criteria: &DiscoveryCriteria) -> Vec<CareerCandidate> {
    ensure_metrics_described();
    counter!("classify_hits_total").increment(hits.len() as u64);

    let extra_excludes = criteria.extra_excluded_terms();
    let mut seen_domains: HashSet<String> = HashSet::new();
    let mut out: Vec<CareerCandidate> = Vec::new();

    for hit in hits {
        let url_l = hit.url.to_lowercase();
        let title_l = hit.title.to_lowercase();
        let snippet_l = hit.snippet.to_lowercase();

        if !has_career_signal(&url_l, &title_l, &snippet_l) {
            reject(hit, "no_signal");
            continue;
        }
        if has_excluded_term(&url_l, &title_l, &snippet_l, &extra_excludes) {
            reject(hit, "excluded_term");
            continue;
        }

        let domain = normalize_domain(&hit.url);
        if !seen_domains.insert(domain.clone()) {
            reject(hit, "duplicate_domain");
            continue;
        }

        let score = score_hit(hit, &url_l, &title_l, &snippet_l, criteria);
        counter!("classify_admitted_total").increment(1);
        dev_log_hit("admitted", hit, score);

        out.push(CareerCandidate {
            company_name: extract_company_name(&hit.title, &hit.url),
            career_url: hit.url.clone(),
            description: hit.snippet.clone(),
            domain,
            industry: criteria.industry.clone(),
            company_size: criteria.company_size,
            relevance_score: score,
        });
    }

    // Stable sort: equal scores keep scan (search-rank) order.
    out.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(Ordering::Equal)
    });
    out
}

fn reject(hit: &SearchHit, reason: &'static str) {
    counter!("classify_rejected_total", "reason" => reason).increment(1);
    dev_log_hit(reason, hit, 0.0);
}

fn has_career_signal(url_l: &str, title_l: &str, snippet_l: &str) -> bool {
    URL_CAREER_KEYWORDS.iter().any(|k| url_l.contains(k))
        || TITLE_CAREER_KEYWORDS.iter().any(|k| title_l.contains(k))
        || SNIPPET_CAREER_KEYWORDS.iter().any(|k| snippet_l.contains(k))
}

fn has_excluded_term(url_l: &str, title_l: &str, snippet_l: &str, extra: &[String]) -> bool {
    let hit_contains =
        |term: &str| url_l.contains(term) || title_l.contains(term) || snippet_l.contains(term);
    EXCLUDED_SOURCE_TERMS.iter().any(|t| hit_contains(t))
        || extra.iter().any(|t| hit_contains(t))
}

/// Additive relevance score; constants are fixed (see module tests) and used
/// only for ordering, never for admission.
fn score_hit(
    hit: &SearchHit,
    url_l: &str,
    title_l: &str,
    snippet_l: &str,
    criteria: &DiscoveryCriteria,
) -> f32 {
    let mut score = 0.0f32;

    // URL shape, strongest matching tier only.
    if url_l.contains("careers.") || url_l.contains("/careers") {
        score += 3.0;
    } else if url_l.contains("jobs.") || url_l.contains("/jobs") {
        score += 2.5;
    } else if URL_HIRING_TERMS.iter().any(|t| url_l.contains(t)) {
        score += 2.0;
    }

    // Industry label tokens ("Technology & Software" -> technology, software).
    let industry_in_title = criteria
        .industry
        .split('&')
        .flat_map(str::split_whitespace)
        .map(str::to_lowercase)
        .any(|tok| title_l.contains(&tok));
    if industry_in_title {
        score += 2.0;
    }

    let size_terms: &[&str] = match criteria.company_size {
        CompanySize::LargeCorporation => &LARGE_COMPANY_TERMS,
        CompanySize::Startup => &STARTUP_TERMS,
    };
    if size_terms
        .iter()
        .any(|t| title_l.contains(t) || snippet_l.contains(t))
    {
        score += 1.5;
    }

    if url_l.contains(".com") {
        score += 0.5;
    }
    if url_l.contains("www.") {
        score += 0.3;
    }

    // Rank bonus: missing position counts as rank 10, contributing zero.
    let position = hit.position.unwrap_or(10);
    score += 10u32.saturating_sub(position) as f32 * 0.1;

    score
}

/// Best-effort company name. Prefers the title segment before the first
/// " - " when it is short and not a page label; otherwise derives from the
/// URL host. Unparseable URLs yield "Unknown Company".
fn extract_company_name(title: &str, url: &str) -> String {
    if let Some((before, _)) = title.split_once(" - ") {
        let name = before.trim();
        let name_l = name.to_lowercase();
        if name.chars().count() < 50 && !NAME_BAN_TERMS.iter().any(|t| name_l.contains(t)) {
            return name.to_string();
        }
    }

    match host_of(url) {
        Some(host) => {
            let stripped = host
                .strip_prefix("www.")
                .or_else(|| host.strip_prefix("careers."))
                .or_else(|| host.strip_prefix("jobs."))
                .unwrap_or(&host);
            let base = stripped.split('.').next().unwrap_or(stripped);
            title_case(&base.replace('-', " "))
        }
        None => "Unknown Company".to_string(),
    }
}

/// Lowercased host without a leading "www.". Unparseable URLs fall back to
/// the raw URL string; callers must tolerate non-host-shaped values.
pub fn normalize_domain(url: &str) -> String {
    match host_of(url) {
        Some(host) => host.strip_prefix("www.").unwrap_or(&host).to_string(),
        None => url.to_string(),
    }
}

fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
}

fn title_case(s: &str) -> String {
    s.split(' ')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn dev_logging_enabled() -> bool {
    std::env::var(ENV_DEV_LOG).ok().as_deref() == Some("1")
}

fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(text.as_bytes());
    digest.iter().take(6).map(|b| format!("{b:02x}")).collect()
}

/// Anonymized dev logger: hashed hit id + rank + outcome, never raw text.
fn dev_log_hit(event: &str, hit: &SearchHit, score: f32) {
    if !dev_logging_enabled() {
        return;
    }
    let id = anon_hash(&hit.url);
    debug!(target: "classifier", %id, position = ?hit.position, %score, event, "hit classified");
}
