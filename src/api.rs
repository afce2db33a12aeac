use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::{AppendHeaders, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::ai::{build_chat_client, DynChatClient};
use crate::candidate::{CareerCandidate, CompanySize, DiscoveryCriteria, JobListing, SearchHit};
use crate::classifier;
use crate::config::ai::AiConfig;
use crate::jobs::{self, JobCriteria};
use crate::query::{build_discovery_query, known_industries};
use crate::rerank;
use crate::search::{self, config::SearchConfig, serp::SerpClient, types::SearchProvider};

#[derive(Clone)]
pub struct AppState {
    search: Arc<dyn SearchProvider>,
    chat: DynChatClient,
}

impl AppState {
    pub fn new(search: Arc<dyn SearchProvider>, chat: DynChatClient) -> Self {
        Self { search, chat }
    }

    /// Production wiring: SerpApi search + Azure chat client, both from
    /// config files with environment overrides.
    pub fn from_env() -> Self {
        let search_cfg = SearchConfig::load();
        let ai_cfg = AiConfig::load();
        Self {
            search: Arc::new(SerpClient::from_config(&search_cfg)),
            chat: build_chat_client(&ai_cfg),
        }
    }
}

pub fn create_router() -> Router {
    create_router_with(AppState::from_env())
}

pub fn create_router_with(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/discover", post(discover))
        .route("/api/classify", post(classify_hits))
        .route("/api/query-preview", get(query_preview))
        .route("/api/facets", get(facets))
        .route("/api/jobs/search", post(jobs_search))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

fn default_true() -> bool {
    true
}

fn default_discover_results() -> usize {
    10
}

fn truncated<T>(mut v: Vec<T>, n: usize) -> Vec<T> {
    v.truncate(n);
    v
}

#[derive(serde::Serialize)]
struct AiMeta {
    used: bool,
    provider: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning: Option<String>,
}

#[derive(serde::Deserialize)]
struct DiscoverReq {
    industry: String,
    company_size: CompanySize,
    #[serde(default)]
    location: String,
    #[serde(default)]
    exclude_keywords: String,
    #[serde(default = "default_discover_results")]
    num_results: usize,
    #[serde(default = "default_true")]
    use_ai: bool,
}

#[derive(serde::Serialize)]
struct DiscoverResp {
    query: String,
    /// Admitted candidates before truncation to `num_results`.
    total_results: usize,
    candidates: Vec<CareerCandidate>,
    ai: AiMeta,
    warnings: Vec<String>,
}

async fn discover(
    State(state): State<AppState>,
    Json(body): Json<DiscoverReq>,
) -> impl IntoResponse {
    let query = build_discovery_query(&body.industry, body.company_size, &body.location);
    let (hits, warnings) = search::fetch_career_hits(state.search.as_ref(), &query).await;

    let criteria = DiscoveryCriteria::new(&body.industry, body.company_size)
        .with_excludes(&body.exclude_keywords);
    let ranked = classifier::classify(&hits, &criteria);
    let total_results = ranked.len();

    let mut ai = AiMeta {
        used: false,
        provider: state.chat.provider_name(),
        reasoning: None,
    };
    let candidates = if body.use_ai {
        match rerank::rerank(state.chat.as_ref(), &criteria, &ranked, body.num_results).await {
            Some(sel) => {
                ai.used = true;
                ai.reasoning = sel.reasoning;
                sel.candidates
            }
            None => truncated(ranked, body.num_results),
        }
    } else {
        truncated(ranked, body.num_results)
    };

    let ai_used = if ai.used { "1" } else { "0" };
    (
        AppendHeaders([("x-ai-used", ai_used)]),
        Json(DiscoverResp {
            query,
            total_results,
            candidates,
            ai,
            warnings,
        }),
    )
}

#[derive(serde::Deserialize)]
struct ClassifyReq {
    hits: Vec<SearchHit>,
    industry: String,
    company_size: CompanySize,
    #[serde(default)]
    exclude_keywords: String,
}

/// Pure classification over caller-supplied hits. No network, no AI.
async fn classify_hits(Json(body): Json<ClassifyReq>) -> Json<Vec<CareerCandidate>> {
    let criteria = DiscoveryCriteria::new(&body.industry, body.company_size)
        .with_excludes(&body.exclude_keywords);
    Json(classifier::classify(&body.hits, &criteria))
}

#[derive(serde::Deserialize)]
struct QueryPreviewParams {
    industry: String,
    company_size: CompanySize,
    #[serde(default)]
    location: String,
}

#[derive(serde::Serialize)]
struct QueryPreviewResp {
    query: String,
}

async fn query_preview(Query(params): Query<QueryPreviewParams>) -> Json<QueryPreviewResp> {
    Json(QueryPreviewResp {
        query: build_discovery_query(&params.industry, params.company_size, &params.location),
    })
}

#[derive(serde::Serialize)]
struct SizeOption {
    value: CompanySize,
    label: &'static str,
}

#[derive(serde::Serialize)]
struct FacetsResp {
    industries: Vec<&'static str>,
    company_sizes: Vec<SizeOption>,
    employment_types: [&'static str; 6],
    work_modes: [&'static str; 4],
    experience_levels: [&'static str; 5],
}

async fn facets() -> Json<FacetsResp> {
    Json(FacetsResp {
        industries: known_industries(),
        company_sizes: CompanySize::ALL
            .iter()
            .map(|s| SizeOption {
                value: *s,
                label: s.label(),
            })
            .collect(),
        employment_types: jobs::EMPLOYMENT_TYPES,
        work_modes: jobs::WORK_MODES,
        experience_levels: jobs::EXPERIENCE_LEVELS,
    })
}

#[derive(serde::Deserialize)]
struct JobsReq {
    #[serde(flatten)]
    criteria: JobCriteria,
    #[serde(default = "default_true")]
    use_ai: bool,
}

#[derive(serde::Serialize)]
struct JobsResp {
    query: String,
    total_results: usize,
    jobs: Vec<JobListing>,
    ai: AiMeta,
    warnings: Vec<String>,
}

async fn jobs_search(
    State(state): State<AppState>,
    Json(body): Json<JobsReq>,
) -> impl IntoResponse {
    let mut ai = AiMeta {
        used: false,
        provider: state.chat.provider_name(),
        reasoning: None,
    };

    if body.criteria.position.trim().is_empty() {
        return (
            AppendHeaders([("x-ai-used", "0")]),
            Json(JobsResp {
                query: String::new(),
                total_results: 0,
                jobs: Vec::new(),
                ai,
                warnings: vec!["position is required".to_string()],
            }),
        );
    }

    let query = jobs::build_jobs_query(&body.criteria);
    let (listings, warnings) =
        search::fetch_job_listings(state.search.as_ref(), &query, &body.criteria.location).await;
    let total_results = listings.len();

    let selected = if body.use_ai {
        match jobs::filter_jobs(state.chat.as_ref(), &body.criteria, &listings).await {
            Some(picked) => {
                ai.used = true;
                picked
            }
            None => truncated(listings, body.criteria.num_results),
        }
    } else {
        truncated(listings, body.criteria.num_results)
    };

    let ai_used = if ai.used { "1" } else { "0" };
    (
        AppendHeaders([("x-ai-used", ai_used)]),
        Json(JobsResp {
            query,
            total_results,
            jobs: selected,
            ai,
            warnings,
        }),
    )
}
