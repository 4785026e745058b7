//! HTTP client for the FundPilot backend.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::{
    auth::{LogSessionHandler, MemoryTokenStore, SessionHandler, TokenStore},
    funds::FundsApi,
    query::Query,
    ApiError,
};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_millis(1_000);
pub const DEFAULT_LOGIN_ROUTE: &str = "/login";

/// Client-wide settings. Individual calls may override the retry and timeout
/// values through [`RequestOptions`].
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub login_route: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
            login_route: DEFAULT_LOGIN_ROUTE.to_string(),
        }
    }
}

/// Per-call overrides of the client configuration.
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestOptions {
    pub max_retries: Option<u32>,
    pub retry_base_delay: Option<Duration>,
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn no_retry() -> Self {
        Self {
            max_retries: Some(0),
            ..Self::default()
        }
    }
}

/// Bounded exponential backoff.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Wait before retry number `attempt` (0-based): `base_delay * 2^attempt`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(20);
        self.base_delay.saturating_mul(factor)
    }
}

/// A single outbound call: method, path, optional JSON body, query pairs and overrides.
#[derive(Clone, Debug)]
pub struct Request {
    method: Method,
    path: String,
    body: Option<serde_json::Value>,
    query: Vec<(&'static str, String)>,
    options: RequestOptions,
}

impl Request {
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            body: None,
            query: Vec::new(),
            options: RequestOptions::default(),
        }
    }

    /// Attaches a JSON body. Fails with `UNKNOWN_ERROR` if the value cannot be serialized.
    pub fn with_body<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::unknown(format!("Failed to serialize request body: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn with_query(mut self, query: &impl Query) -> Self {
        self.query.extend(query.pairs());
        self
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// HTTP client for the FundPilot REST API.
///
/// Every request carries `Content-Type: application/json` and, when the token
/// store holds one, a bearer token. Failures are normalized into [`ApiError`]
/// and transient ones are retried with exponential backoff.
pub struct Client {
    http: reqwest::Client,
    config: ClientConfig,
    tokens: Arc<dyn TokenStore>,
    session: Arc<dyn SessionHandler>,
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                tracing::error!("Failed to build HTTP client: {}", e);
                ApiError::unknown(e.to_string())
            })?;
        Ok(Self {
            http,
            config,
            tokens: Arc::new(MemoryTokenStore::new()),
            session: Arc::new(LogSessionHandler),
        })
    }

    /// Creates a client with default settings and a custom base URL. Used for testing with wiremock.
    pub fn with_base_url(base_url: &str) -> Result<Self, ApiError> {
        Self::new(ClientConfig {
            base_url: base_url.to_string(),
            ..ClientConfig::default()
        })
    }

    pub fn with_token_store(mut self, tokens: Arc<dyn TokenStore>) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn with_session_handler(mut self, session: Arc<dyn SessionHandler>) -> Self {
        self.session = session;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn token_store(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    /// Typed wrappers over the `/funds` endpoints.
    pub fn funds(&self) -> FundsApi<'_> {
        FundsApi::new(self)
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        self.send(Request::new(Method::GET, path).with_options(options))
            .await
    }

    pub async fn post<T, B>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_with_body(Method::POST, path, body, options).await
    }

    pub async fn put<T, B>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_with_body(Method::PUT, path, body, options).await
    }

    pub async fn patch<T, B>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_with_body(Method::PATCH, path, body, options).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        self.send(Request::new(Method::DELETE, path).with_options(options))
            .await
    }

    async fn send_with_body<T, B>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = Request::new(method, path)
            .with_body(body)?
            .with_options(options);
        self.send(request).await
    }

    /// Returns `true` if `GET /health` succeeds.
    pub async fn check_health(&self) -> bool {
        match self
            .get::<serde_json::Value>("/health", RequestOptions::default())
            .await
        {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("API health check failed: {}", e);
                false
            }
        }
    }

    /// Sends the request, retrying transient failures, and decodes the payload.
    pub async fn send<T: DeserializeOwned>(&self, request: Request) -> Result<T, ApiError> {
        let policy = self.retry_policy(&request.options);
        let mut attempt = 0u32;
        let body = loop {
            match self.execute(&request).await {
                Ok(body) => break body,
                Err(err) => {
                    if attempt >= policy.max_retries || !err.is_retryable() {
                        return Err(err);
                    }
                    let delay = policy.delay_for_attempt(attempt);
                    attempt += 1;
                    tracing::warn!(
                        "{} {} failed with {} (attempt {}/{}), retrying in {}ms",
                        request.method,
                        request.path,
                        err.code(),
                        attempt,
                        policy.max_retries,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        };
        parse_body(&body)
    }

    fn retry_policy(&self, options: &RequestOptions) -> RetryPolicy {
        RetryPolicy {
            max_retries: options.max_retries.unwrap_or(self.config.max_retries),
            base_delay: options
                .retry_base_delay
                .unwrap_or(self.config.retry_base_delay),
        }
    }

    fn url_for(&self, request: &Request) -> Result<Url, ApiError> {
        let raw = format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            request.path.trim_start_matches('/')
        );
        let url = Url::parse(&raw).map_err(|e| {
            tracing::error!("Invalid URL constructed: {}", e);
            ApiError::unknown(format!("Invalid URL {}: {}", raw, e))
        })?;
        Ok(request.query.add_to_url(&url))
    }

    /// One network attempt. Returns the raw response body on a success status.
    async fn execute(&self, request: &Request) -> Result<String, ApiError> {
        let url = self.url_for(request)?;
        let started = Instant::now();

        let mut builder = self
            .http
            .request(request.method.clone(), url.clone())
            .header(CONTENT_TYPE, "application/json");
        if let Some(timeout) = request.options.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(token) = self.tokens.token() {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let resp = match builder.send().await {
            Ok(resp) => resp,
            Err(e) => {
                let err = ApiError::from(e);
                log_failure(request, &url, started, &err);
                return Err(err);
            }
        };

        let status = resp.status();
        let body = match resp.text().await {
            Ok(body) => body,
            Err(e) => {
                let err = ApiError::from(e);
                log_failure(request, &url, started, &err);
                return Err(err);
            }
        };

        if !status.is_success() {
            let details = serde_json::from_str::<serde_json::Value>(&body).ok();
            let err = ApiError::from_status(status.as_u16(), details);
            log_failure(request, &url, started, &err);
            if status == reqwest::StatusCode::UNAUTHORIZED {
                self.tokens.clear_token();
                self.session.on_unauthorized(&self.config.login_route);
            }
            return Err(err);
        }

        Ok(body)
    }
}

fn log_failure(request: &Request, url: &Url, started: Instant, err: &ApiError) {
    tracing::error!(
        "API Error: {} {} ({}ms): {}",
        request.method,
        url,
        started.elapsed().as_millis(),
        err
    );
}

fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    let body = if body.trim().is_empty() { "null" } else { body };
    serde_json::from_str::<T>(body).map_err(|e| {
        let snippet = truncate_body(body);
        tracing::error!("Failed to parse response: {} | body: {}", e, snippet);
        ApiError::unknown(format!("Failed to parse response: {}", e))
    })
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 2000;
    if body.len() <= MAX {
        body.to_string()
    } else {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...[truncated]", &body[..end])
    }
}
