//! HTTP client for OpenAI-compatible text-generation APIs.
//!
//! Provides the conversation and request/response types, the [`LlmProvider`]
//! trait implemented by the HTTP client (and by test fakes), and the bounded
//! retry-with-backoff wrapper used by the prompt dispatcher.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::error::LlmError;

/// Request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Default model when neither the request nor the environment names one.
const DEFAULT_MODEL: &str = "anthropic/claude-opus-4.5";

/// A message in a conversation with the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender (e.g., "system", "user", "assistant").
    pub role: String,
    /// Content of the message.
    pub content: String,
}

impl Message {
    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Request for text generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model identifier; empty means the provider's default model.
    pub model: String,
    /// Conversation messages.
    pub messages: Vec<Message>,
    /// Sampling temperature (0.0 - 2.0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Maximum number of tokens to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl GenerationRequest {
    /// Create a new generation request with default parameters.
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Set the temperature for this request.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the max tokens for this request.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Response from a generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Unique identifier for this response.
    pub id: String,
    /// Model that generated this response.
    pub model: String,
    /// Generated choices/completions.
    pub choices: Vec<Choice>,
    /// Token usage statistics.
    pub usage: Usage,
}

impl GenerationResponse {
    /// Get the content of the first choice, if available.
    pub fn first_content(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }
}

/// A single generated choice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    /// Index of this choice in the response.
    pub index: u32,
    /// Generated message.
    pub message: Message,
    /// Reason the generation stopped (e.g., "stop", "length").
    pub finish_reason: String,
}

/// Token usage statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    /// Number of tokens in the prompt.
    pub prompt_tokens: u32,
    /// Number of tokens generated.
    pub completion_tokens: u32,
    /// Total tokens used.
    pub total_tokens: u32,
}

/// Trait for providers that can generate text.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a response for the given request.
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError>;
}

/// Bounded retry policy with exponential backoff.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Number of retries after the first attempt; total attempts are
    /// `max_retries + 1`.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each subsequent retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the given retry budget and base delay.
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Total number of attempts permitted.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Delay to sleep after `failed_attempt` (1-based) before the next one:
    /// `base_delay * 2^(failed_attempt - 1)`.
    pub fn delay_for_attempt(&self, failed_attempt: u32) -> Duration {
        self.base_delay * (1u32 << (failed_attempt.saturating_sub(1)))
    }
}

/// Runs a generation request through `provider` under `policy`.
///
/// Every failure class counts against the retry budget: transport errors,
/// non-2xx responses, malformed bodies, and responses without usable
/// content. After the budget is exhausted the last error is surfaced inside
/// [`LlmError::RetriesExhausted`].
pub async fn generate_with_retry<P: LlmProvider + ?Sized>(
    provider: &P,
    request: GenerationRequest,
    policy: &RetryPolicy,
) -> Result<GenerationResponse, LlmError> {
    let mut attempt = 1u32;

    loop {
        let err = match provider.generate(request.clone()).await {
            Ok(response) => {
                let usable = response
                    .first_content()
                    .is_some_and(|content| !content.trim().is_empty());
                if usable {
                    return Ok(response);
                }
                LlmError::EmptyResponse
            }
            Err(err) => err,
        };

        if attempt > policy.max_retries {
            return Err(LlmError::RetriesExhausted {
                attempts: attempt,
                source: Box::new(err),
            });
        }

        let delay = policy.delay_for_attempt(attempt);
        tracing::warn!(
            attempt,
            max_retries = policy.max_retries,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "generation attempt failed, backing off before retry"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

/// Client for OpenAI-compatible chat-completion APIs.
pub struct HttpLlmClient {
    /// Base URL for the API.
    api_base: String,
    /// Optional API key for bearer authentication.
    api_key: Option<String>,
    /// Default model to use when a request names none.
    default_model: String,
    /// HTTP client for making API requests.
    http_client: Client,
}

impl HttpLlmClient {
    /// Create a new client with explicit configuration.
    ///
    /// # Arguments
    ///
    /// * `api_base` - Base URL for the API (e.g., "https://openrouter.ai/api/v1")
    /// * `api_key` - Optional API key for authentication
    /// * `default_model` - Default model to use when none is specified
    pub fn new(api_base: String, api_key: Option<String>, default_model: String) -> Self {
        Self {
            api_base,
            api_key,
            default_model,
            http_client: Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
        }
    }

    /// Create a new client from environment variables.
    ///
    /// Reads `CHAINFORGE_API_BASE` (required), `CHAINFORGE_API_KEY`
    /// (optional), and `CHAINFORGE_DEFAULT_MODEL` (optional). This is a
    /// boundary constructor; core types never read the environment.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::MissingApiBase`] if `CHAINFORGE_API_BASE` is not
    /// set.
    pub fn from_env() -> Result<Self, LlmError> {
        let api_base = env::var("CHAINFORGE_API_BASE").map_err(|_| LlmError::MissingApiBase)?;
        let api_key = env::var("CHAINFORGE_API_KEY").ok();
        let default_model =
            env::var("CHAINFORGE_DEFAULT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        Ok(Self::new(api_base, api_key, default_model))
    }

    /// Get the API base URL.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Get the default model.
    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Check if an API key is configured.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Internal request structure for the OpenAI-compatible API.
#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// Internal response structure from the OpenAI-compatible API.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    id: String,
    model: String,
    choices: Vec<ApiChoice>,
    usage: ApiUsage,
}

/// Internal choice structure from the API response.
#[derive(Debug, Deserialize)]
struct ApiChoice {
    index: u32,
    message: ApiMessage,
    finish_reason: Option<String>,
}

/// Internal message structure from the API response.
#[derive(Debug, Deserialize)]
struct ApiMessage {
    role: String,
    content: String,
}

/// Internal usage structure from the API response.
#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

/// Error response from the API.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

/// Error detail from the API.
#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[async_trait]
impl LlmProvider for HttpLlmClient {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
        let model = if request.model.is_empty() {
            self.default_model.clone()
        } else {
            request.model.clone()
        };

        let api_request = ApiRequest {
            model,
            messages: request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let url = format!("{}/chat/completions", self.api_base);

        let mut http_request = self
            .http_client
            .post(&url)
            .header("Content-Type", "application/json");

        if let Some(ref api_key) = self.api_key {
            http_request = http_request.header("Authorization", format!("Bearer {}", api_key));
        }

        let http_response = http_request
            .json(&api_request)
            .send()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        let status = http_response.status();

        if !status.is_success() {
            let status_code = status.as_u16();
            let error_text = http_response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());

            // Prefer the structured error body when the API provides one.
            if let Ok(error_response) = serde_json::from_str::<ApiErrorResponse>(&error_text) {
                if status_code == 429 {
                    return Err(LlmError::RateLimited(error_response.error.message));
                }
                return Err(LlmError::Api {
                    code: status_code,
                    message: error_response.error.message,
                });
            }

            return Err(LlmError::Api {
                code: status_code,
                message: error_text,
            });
        }

        let api_response: ApiResponse = http_response
            .json()
            .await
            .map_err(|e| LlmError::Parse(format!("Failed to parse API response: {}", e)))?;

        let choices = api_response
            .choices
            .into_iter()
            .map(|choice| Choice {
                index: choice.index,
                message: Message {
                    role: choice.message.role,
                    content: choice.message.content,
                },
                finish_reason: choice.finish_reason.unwrap_or_else(|| "stop".to_string()),
            })
            .collect();

        Ok(GenerationResponse {
            id: api_response.id,
            model: api_response.model,
            choices,
            usage: Usage {
                prompt_tokens: api_response.usage.prompt_tokens,
                completion_tokens: api_response.usage.completion_tokens,
                total_tokens: api_response.usage.total_tokens,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Provider that fails a configurable number of times before succeeding.
    struct FlakyProvider {
        failures_before_success: u32,
        attempts: AtomicU32,
        success_content: String,
    }

    impl FlakyProvider {
        fn new(failures_before_success: u32, content: &str) -> Self {
            Self {
                failures_before_success,
                attempts: AtomicU32::new(0),
                success_content: content.to_string(),
            }
        }

        fn attempts(&self) -> u32 {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmProvider for FlakyProvider {
        async fn generate(
            &self,
            _request: GenerationRequest,
        ) -> Result<GenerationResponse, LlmError> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt <= self.failures_before_success {
                return Err(LlmError::Transport("connection reset".to_string()));
            }
            Ok(GenerationResponse {
                id: format!("resp-{}", attempt),
                model: "test-model".to_string(),
                choices: vec![Choice {
                    index: 0,
                    message: Message::assistant(self.success_content.clone()),
                    finish_reason: "stop".to_string(),
                }],
                usage: Usage {
                    prompt_tokens: 1,
                    completion_tokens: 1,
                    total_tokens: 2,
                },
            })
        }
    }

    fn test_request() -> GenerationRequest {
        GenerationRequest::new("test-model", vec![Message::user("hi")])
    }

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, Duration::from_millis(1))
    }

    #[test]
    fn test_message_constructors() {
        assert_eq!(Message::system("s").role, "system");
        assert_eq!(Message::user("u").role, "user");
        assert_eq!(Message::assistant("a").role, "assistant");
    }

    #[test]
    fn test_generation_request_builder() {
        let request = test_request().with_temperature(0.7).with_max_tokens(1000);
        assert_eq!(request.temperature, Some(0.7));
        assert_eq!(request.max_tokens, Some(1000));
    }

    #[test]
    fn test_retry_policy_backoff_doubles() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1000));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(4000));
        assert_eq!(policy.max_attempts(), 4);
    }

    #[test]
    fn test_retry_policy_none() {
        let policy = RetryPolicy::none();
        assert_eq!(policy.max_attempts(), 1);
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_two_failures() {
        let provider = FlakyProvider::new(2, "generated text");
        let response = generate_with_retry(&provider, test_request(), &fast_policy(3))
            .await
            .expect("third attempt should succeed");

        assert_eq!(response.first_content(), Some("generated text"));
        assert_eq!(provider.attempts(), 3, "exactly three attempts recorded");
    }

    #[tokio::test]
    async fn test_retry_budget_exhausted() {
        let provider = FlakyProvider::new(u32::MAX, "never");
        let err = generate_with_retry(&provider, test_request(), &fast_policy(2))
            .await
            .expect_err("budget should run out");

        match err {
            LlmError::RetriesExhausted { attempts, source } => {
                assert_eq!(attempts, 3, "max_retries + 1 total attempts");
                assert!(matches!(*source, LlmError::Transport(_)));
            }
            other => panic!("expected RetriesExhausted, got {:?}", other),
        }
        assert_eq!(provider.attempts(), 3);
    }

    #[tokio::test]
    async fn test_empty_response_is_retried() {
        let provider = FlakyProvider::new(0, "   ");
        let err = generate_with_retry(&provider, test_request(), &fast_policy(1))
            .await
            .expect_err("whitespace-only content is unusable");

        match err {
            LlmError::RetriesExhausted { attempts, source } => {
                assert_eq!(attempts, 2);
                assert!(matches!(*source, LlmError::EmptyResponse));
            }
            other => panic!("expected RetriesExhausted, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_retry_policy_fails_on_first_error() {
        let provider = FlakyProvider::new(1, "late");
        let err = generate_with_retry(&provider, test_request(), &RetryPolicy::none())
            .await
            .expect_err("single attempt should fail");
        assert!(matches!(err, LlmError::RetriesExhausted { attempts: 1, .. }));
        assert_eq!(provider.attempts(), 1);
    }

    #[test]
    fn test_client_constructors() {
        let client = HttpLlmClient::new(
            "http://localhost:4000".to_string(),
            Some("test-key".to_string()),
            "test-model".to_string(),
        );
        assert_eq!(client.api_base(), "http://localhost:4000");
        assert_eq!(client.default_model(), "test-model");
        assert!(client.has_api_key());

        let without_key =
            HttpLlmClient::new("http://localhost:4000".to_string(), None, "m".to_string());
        assert!(!without_key.has_api_key());
    }

    #[tokio::test]
    async fn test_client_connection_error_is_transport() {
        // A port that is unlikely to have a server behind it.
        let client =
            HttpLlmClient::new("http://localhost:65535".to_string(), None, "m".to_string());
        let result = client.generate(test_request()).await;
        assert!(matches!(result, Err(LlmError::Transport(_))));
    }

    #[test]
    fn test_api_request_serialization() {
        let request = ApiRequest {
            model: "test-model".to_string(),
            messages: vec![Message::user("test")],
            temperature: Some(0.7),
            max_tokens: None,
        };

        let json = serde_json::to_string(&request).expect("serialization should succeed");
        assert!(json.contains("\"model\":\"test-model\""));
        assert!(json.contains("\"temperature\":0.7"));
        assert!(!json.contains("max_tokens"));
    }
}
