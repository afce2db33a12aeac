// tests/jobs_flow.rs
//
// HTTP-level tests for POST /api/jobs/search: query construction, the AI
// match filter, and its fallback behavior.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::Request,
    Router,
};
use serde_json::{json, Value as Json};
use tower::ServiceExt as _;

use career_scout::ai::{DisabledClient, DynChatClient, LimitedClient, MockProvider};
use career_scout::api::{create_router_with, AppState};
use career_scout::search::types::SearchProvider;
use career_scout::{JobListing, SearchHit};

const BODY_LIMIT: usize = 1024 * 1024;

/// Records the query/location it was called with, then returns fixtures.
struct ScriptedJobs {
    listings: Vec<JobListing>,
    seen: std::sync::Mutex<Vec<(String, String)>>,
}

impl ScriptedJobs {
    fn new(listings: Vec<JobListing>) -> Self {
        Self {
            listings,
            seen: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl SearchProvider for ScriptedJobs {
    async fn organic(&self, _query: &str) -> anyhow::Result<Vec<SearchHit>> {
        Ok(Vec::new())
    }
    async fn jobs(&self, query: &str, location: &str) -> anyhow::Result<Vec<JobListing>> {
        self.seen
            .lock()
            .unwrap()
            .push((query.to_string(), location.to_string()));
        Ok(self.listings.clone())
    }
    fn name(&self) -> &'static str {
        "scripted"
    }
}

fn listing(title: &str, company: &str) -> JobListing {
    JobListing {
        title: title.to_string(),
        company: company.to_string(),
        location: "Boston, MA".to_string(),
        description: format!("{company} seeks a {title} to join the team."),
        via: "via LinkedIn".to_string(),
        link: format!("https://example.com/{}", title.replace(' ', "-")),
        thumbnail: None,
        posted_at: Some("2 days ago".to_string()),
        schedule_type: Some("Full-time".to_string()),
        work_from_home: true,
    }
}

fn listings() -> Vec<JobListing> {
    vec![
        listing("Backend Engineer", "Acme"),
        listing("Frontend Engineer", "Globex"),
        listing("Data Engineer", "Initech"),
    ]
}

fn router_with(search: Arc<dyn SearchProvider>, chat: DynChatClient) -> Router {
    create_router_with(AppState::new(search, chat))
}

fn jobs_request(payload: Json) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/jobs/search")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST /api/jobs/search")
}

async fn read_json(resp: axum::response::Response) -> Json {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    serde_json::from_slice(&bytes).expect("parse json body")
}

#[tokio::test]
async fn jobs_search_builds_query_and_applies_ai_filter() {
    let search = Arc::new(ScriptedJobs::new(listings()));
    let app = router_with(
        search.clone(),
        Arc::new(LimitedClient::new(
            MockProvider {
                fixed: r#"{"selected_jobs": [3, 1]}"#.into(),
            },
            100,
        )),
    );

    let resp = app
        .oneshot(jobs_request(json!({
            "position": "Software Engineer",
            "employment_type": "Full-time",
            "work_mode": "Remote",
            "location": "Boston",
            "num_results": 10
        })))
        .await
        .expect("oneshot");
    assert!(resp.status().is_success());

    let used = resp
        .headers()
        .get("x-ai-used")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");
    assert_eq!(used, "1");

    let v = read_json(resp).await;
    assert_eq!(v["query"], "Software Engineer full-time remote");
    assert_eq!(v["total_results"], 3);

    let titles: Vec<&str> = v["jobs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|j| j["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Data Engineer", "Backend Engineer"]);

    // The provider saw the built query and the raw location.
    let seen = search.seen.lock().unwrap();
    assert_eq!(
        seen.as_slice(),
        &[(
            "Software Engineer full-time remote".to_string(),
            "Boston".to_string()
        )]
    );
}

#[tokio::test]
async fn jobs_search_without_ai_truncates_raw_results() {
    let app = router_with(
        Arc::new(ScriptedJobs::new(listings())),
        Arc::new(DisabledClient),
    );

    let resp = app
        .oneshot(jobs_request(json!({
            "position": "Engineer",
            "use_ai": false,
            "num_results": 2
        })))
        .await
        .expect("oneshot");
    let used = resp
        .headers()
        .get("x-ai-used")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");
    assert_eq!(used, "0");

    let v = read_json(resp).await;
    assert_eq!(v["query"], "Engineer");
    assert_eq!(v["jobs"].as_array().unwrap().len(), 2);
    assert_eq!(v["jobs"][0]["title"], "Backend Engineer");
}

#[tokio::test]
async fn jobs_search_with_unavailable_ai_still_answers() {
    // Disabled AI client: filter skipped, raw order truncated.
    let app = router_with(
        Arc::new(ScriptedJobs::new(listings())),
        Arc::new(DisabledClient),
    );

    let resp = app
        .oneshot(jobs_request(json!({
            "position": "Engineer",
            "num_results": 10
        })))
        .await
        .expect("oneshot");

    let v = read_json(resp).await;
    assert_eq!(v["ai"]["used"], false);
    assert_eq!(v["ai"]["provider"], "disabled");
    assert_eq!(v["jobs"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn missing_position_yields_warning_and_no_search() {
    let search = Arc::new(ScriptedJobs::new(listings()));
    let app = router_with(search.clone(), Arc::new(DisabledClient));

    let resp = app
        .oneshot(jobs_request(json!({ "position": "   " })))
        .await
        .expect("oneshot");
    assert!(resp.status().is_success());

    let v = read_json(resp).await;
    assert_eq!(v["total_results"], 0);
    assert!(v["jobs"].as_array().unwrap().is_empty());
    assert_eq!(v["warnings"][0], "position is required");
    assert!(
        search.seen.lock().unwrap().is_empty(),
        "provider must not be called without a position"
    );
}
