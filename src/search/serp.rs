// src/search/serp.rs
//! SerpApi-style search client: flat key-value GET requests, JSON responses.
//! Handles the two engines this service uses (`google` organic results and
//! `google_jobs` listings) and applies one short backoff when rate limited.

use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::Deserialize;
use tracing::warn;

use crate::candidate::{JobListing, SearchHit};
use crate::search::config::SearchConfig;
use crate::search::types::SearchProvider;

/// Single backoff applied when the search service answers 429.
const RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(2);

pub struct SerpClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    num_results: usize,
    gl: String,
    hl: String,
}

impl SerpClient {
    pub fn from_config(cfg: &SearchConfig) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("career-scout/0.1")
            .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .expect("reqwest client");
        Self {
            http,
            endpoint: cfg.endpoint.clone(),
            api_key: cfg.api_key.clone(),
            num_results: cfg.num_results,
            gl: cfg.gl.clone(),
            hl: cfg.hl.clone(),
        }
    }

    /// GET with the given query params; retries exactly once after a 429.
    async fn send_with_backoff(&self, params: &[(&str, &str)]) -> Result<reqwest::Response> {
        if self.api_key.is_empty() {
            return Err(anyhow!("search api key is not configured (SERP_API_KEY)"));
        }
        let mut resp = self
            .http
            .get(&self.endpoint)
            .query(params)
            .send()
            .await
            .context("search request failed")?;
        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!(target: "search", "search service rate limited; backing off once");
            counter!("search_rate_limited_total").increment(1);
            tokio::time::sleep(RATE_LIMIT_BACKOFF).await;
            resp = self
                .http
                .get(&self.endpoint)
                .query(params)
                .send()
                .await
                .context("search retry failed")?;
            if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(anyhow!("search service rate limited (429) after backoff"));
            }
        }
        if !resp.status().is_success() {
            return Err(anyhow!("search service returned status {}", resp.status()));
        }
        Ok(resp)
    }

    /// Parse an organic-results body. Missing fields default to empty; an
    /// absent `organic_results` array yields zero hits.
    pub fn parse_organic(body: &str) -> Result<Vec<SearchHit>> {
        let t0 = Instant::now();
        let parsed: OrganicBody =
            serde_json::from_str(body).context("parsing organic search response json")?;
        let out: Vec<SearchHit> = parsed
            .organic_results
            .into_iter()
            .map(|r| SearchHit {
                title: r.title,
                url: r.link,
                snippet: r.snippet,
                position: r.position,
            })
            .collect();
        histogram!("search_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("search_results_total", "kind" => "organic").increment(out.len() as u64);
        Ok(out)
    }

    /// Parse a `google_jobs` body into listings.
    pub fn parse_jobs(body: &str) -> Result<Vec<JobListing>> {
        let t0 = Instant::now();
        let parsed: JobsBody =
            serde_json::from_str(body).context("parsing jobs search response json")?;
        let out: Vec<JobListing> = parsed
            .jobs_results
            .into_iter()
            .map(|r| JobListing {
                title: r.title,
                company: r.company_name,
                location: r.location,
                description: r.description,
                via: r.via,
                link: r.link,
                thumbnail: r.thumbnail,
                posted_at: r.detected_extensions.posted_at,
                schedule_type: r.detected_extensions.schedule_type,
                work_from_home: r.detected_extensions.work_from_home,
            })
            .collect();
        histogram!("search_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("search_results_total", "kind" => "jobs").increment(out.len() as u64);
        Ok(out)
    }
}

#[derive(Debug, Deserialize)]
struct OrganicBody {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
    position: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct JobsBody {
    #[serde(default)]
    jobs_results: Vec<JobsResult>,
}

#[derive(Debug, Deserialize)]
struct JobsResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    company_name: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    via: String,
    #[serde(default)]
    link: String,
    thumbnail: Option<String>,
    #[serde(default)]
    detected_extensions: DetectedExtensions,
}

#[derive(Debug, Default, Deserialize)]
struct DetectedExtensions {
    posted_at: Option<String>,
    schedule_type: Option<String>,
    #[serde(default)]
    work_from_home: bool,
}

#[async_trait]
impl SearchProvider for SerpClient {
    async fn organic(&self, query: &str) -> Result<Vec<SearchHit>> {
        let num = self.num_results.to_string();
        let params = [
            ("engine", "google"),
            ("q", query),
            ("api_key", self.api_key.as_str()),
            ("num", num.as_str()),
            ("gl", self.gl.as_str()),
            ("hl", self.hl.as_str()),
        ];
        let resp = self.send_with_backoff(&params).await?;
        let body = resp.text().await.context("reading search response body")?;
        Self::parse_organic(&body)
    }

    async fn jobs(&self, query: &str, location: &str) -> Result<Vec<JobListing>> {
        let num = self.num_results.to_string();
        let mut params: Vec<(&str, &str)> = vec![
            ("engine", "google_jobs"),
            ("q", query),
            ("api_key", self.api_key.as_str()),
            ("num", num.as_str()),
        ];
        let loc = location.trim();
        if !loc.is_empty() {
            params.push(("location", loc));
        }
        let resp = self.send_with_backoff(&params).await?;
        let body = resp.text().await.context("reading jobs response body")?;
        Self::parse_jobs(&body)
    }

    fn name(&self) -> &'static str {
        "serpapi"
    }
}
