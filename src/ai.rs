//! AI adapter: chat-completion provider abstraction + in-memory daily limit.
//! The re-rank stage talks to this layer only through `ChatClient`, so tests
//! can script responses without any network dependency.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::ai::AiConfig;

/// Forces the mock provider regardless of configuration (value `mock`).
pub const ENV_AI_TEST_MODE: &str = "AI_TEST_MODE";

/// Trait object used by handlers and tests.
pub trait ChatClient: Send + Sync {
    /// One chat-style call: system instruction + rendered user prompt in,
    /// raw completion text out. `None` covers every failure mode (missing
    /// config, transport error, non-2xx, empty completion, budget).
    fn complete<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>>;
    /// Provider name for diagnostics/headers.
    fn provider_name(&self) -> &'static str;
}

/// Convenient alias used by callers.
pub type DynChatClient = Arc<dyn ChatClient>;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ai_calls_total", "Chat-completion calls attempted, by provider.");
        describe_counter!("ai_errors_total", "Chat-completion calls that failed, by provider.");
        describe_counter!("ai_limited_total", "Calls blocked by the daily budget.");
    });
}

/// Factory: build a client according to config and environment.
///
/// * `AI_TEST_MODE=mock` returns a deterministic mock client.
/// * An incomplete configuration returns a disabled client (never an error).
/// * Otherwise the Azure provider, wrapped with the daily limit.
pub fn build_chat_client(config: &AiConfig) -> DynChatClient {
    ensure_metrics_described();

    if std::env::var(ENV_AI_TEST_MODE)
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        let mock = MockProvider {
            fixed: r#"{"selected_companies": [1, 2, 3], "reasoning": "Top heuristic candidates confirmed (mock)."}"#.to_string(),
        };
        return Arc::new(LimitedClient::new(mock, config.daily_limit));
    }

    if !config.is_complete() {
        info!(enabled = config.enabled, "ai re-rank unavailable (incomplete configuration)");
        return Arc::new(DisabledClient);
    }

    let provider = AzureOpenAiProvider::from_config(config);
    Arc::new(LimitedClient::new(provider, config.daily_limit))
}

// ------------------------------------------------------------
// Provider abstraction + concrete providers
// ------------------------------------------------------------

/// Low-level provider: does a *real* remote call. Separated so the same
/// limit wrapper serves production and tests.
pub trait Provider: Send + Sync + 'static {
    fn fetch<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>>;
    fn name(&self) -> &'static str;
}

/// Azure OpenAI chat-completions provider. The deployment identifier selects
/// the model, so the request body carries only messages and sampling knobs.
pub struct AzureOpenAiProvider {
    http: reqwest::Client,
    endpoint: String,
    deployment: String,
    api_version: String,
    api_key: String,
}

impl AzureOpenAiProvider {
    pub fn from_config(cfg: &AiConfig) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("career-scout/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("reqwest client");
        Self {
            http,
            endpoint: cfg.endpoint.trim_end_matches('/').to_string(),
            deployment: cfg.deployment.clone(),
            api_version: cfg.api_version.clone(),
            api_key: cfg.api_key.clone(),
        }
    }
}

impl Provider for AzureOpenAiProvider {
    fn fetch<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        Box::pin(async move {
            if self.api_key.is_empty() {
                return None;
            }

            #[derive(Serialize)]
            struct Msg<'a> {
                role: &'a str,
                content: &'a str,
            }
            #[derive(Serialize)]
            struct Req<'a> {
                messages: Vec<Msg<'a>>,
                temperature: f32,
                max_tokens: u32,
            }
            #[derive(Deserialize)]
            struct Resp {
                choices: Vec<Choice>,
            }
            #[derive(Deserialize)]
            struct Choice {
                message: ChoiceMsg,
            }
            #[derive(Deserialize)]
            struct ChoiceMsg {
                content: String,
            }

            let url = format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                self.endpoint, self.deployment, self.api_version
            );
            let req = Req {
                messages: vec![
                    Msg {
                        role: "system",
                        content: system,
                    },
                    Msg {
                        role: "user",
                        content: user,
                    },
                ],
                temperature: 0.3,
                max_tokens: 500,
            };

            let resp = match self
                .http
                .post(&url)
                .header("api-key", &self.api_key)
                .json(&req)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    warn!(target: "ai", error = ?e, "chat request failed");
                    return None;
                }
            };
            if !resp.status().is_success() {
                warn!(target: "ai", status = %resp.status(), "chat request returned non-success");
                return None;
            }
            let body: Resp = match resp.json().await {
                Ok(b) => b,
                Err(e) => {
                    warn!(target: "ai", error = ?e, "chat response body unreadable");
                    return None;
                }
            };
            let content = body
                .choices
                .first()
                .map(|c| c.message.content.clone())
                .unwrap_or_default();
            if content.trim().is_empty() {
                None
            } else {
                Some(content)
            }
        })
    }

    fn name(&self) -> &'static str {
        "azure-openai"
    }
}

/// Returns `None` always; used when AI is disabled or unconfigured.
pub struct DisabledClient;

impl ChatClient for DisabledClient {
    fn complete<'a>(
        &'a self,
        _system: &'a str,
        _user: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        Box::pin(async { None })
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Scripted provider for tests/local runs.
#[derive(Clone)]
pub struct MockProvider {
    pub fixed: String,
}

impl Provider for MockProvider {
    fn fetch<'a>(
        &'a self,
        _system: &'a str,
        _user: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        let out = self.fixed.clone();
        Box::pin(async move { Some(out) })
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}

// ------------------------------------------------------------
// Daily-limit wrapper
// ------------------------------------------------------------

/// Caps real provider calls per UTC day. The counter is in-memory only; a
/// process restart resets the budget (nothing in this service persists).
pub struct LimitedClient<P: Provider> {
    inner: P,
    daily_limit: u32,
    counter: Mutex<DayCounter>,
}

impl<P: Provider> LimitedClient<P> {
    pub fn new(inner: P, daily_limit: u32) -> Self {
        Self {
            inner,
            daily_limit,
            counter: Mutex::new(DayCounter::default()),
        }
    }

    async fn complete_impl(&self, system: &str, user: &str) -> Option<String> {
        ensure_metrics_described();
        {
            let mut g = self.counter.lock().expect("poisoned counter");
            if g.is_expired() {
                g.reset_to_today();
            }
            if g.count >= self.daily_limit {
                counter!("ai_limited_total").increment(1);
                warn!(target: "ai", limit = self.daily_limit, "daily ai budget exhausted");
                return None;
            }
        }

        counter!("ai_calls_total", "provider" => self.inner.name()).increment(1);
        match self.inner.fetch(system, user).await {
            Some(text) => {
                // Only successful real calls consume budget.
                let mut g = self.counter.lock().expect("poisoned counter");
                g.count = g.count.saturating_add(1);
                Some(text)
            }
            None => {
                counter!("ai_errors_total", "provider" => self.inner.name()).increment(1);
                None
            }
        }
    }
}

impl<P: Provider> ChatClient for LimitedClient<P> {
    fn complete<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        Box::pin(self.complete_impl(system, user))
    }
    fn provider_name(&self) -> &'static str {
        self.inner.name()
    }
}

#[derive(Debug, Clone)]
struct DayCounter {
    day: u64,
    count: u32,
}

impl Default for DayCounter {
    fn default() -> Self {
        Self {
            day: today_epoch_days(),
            count: 0,
        }
    }
}

impl DayCounter {
    fn is_expired(&self) -> bool {
        self.day != today_epoch_days()
    }
    fn reset_to_today(&mut self) {
        self.day = today_epoch_days();
        self.count = 0;
    }
}

fn today_epoch_days() -> u64 {
    (chrono::Utc::now().timestamp().max(0) as u64) / 86_400
}

/// Single line, collapsed whitespace, bounded length — reasoning strings go
/// straight into API responses and logs.
pub fn sanitize_reasoning(input: &str) -> String {
    let mut out = String::with_capacity(input.len().min(400));
    let mut chars = 0usize;
    let mut prev_space = false;
    for ch in input.chars() {
        let c = if ch.is_whitespace() { ' ' } else { ch };
        if c == ' ' {
            if !prev_space && !out.is_empty() {
                out.push(' ');
                chars += 1;
            }
            prev_space = true;
        } else {
            out.push(c);
            chars += 1;
            prev_space = false;
        }
        if chars >= 400 {
            break;
        }
    }
    out.trim().to_string()
}
