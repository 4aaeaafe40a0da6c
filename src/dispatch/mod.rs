//! Prompt dispatch: prompt construction plus bounded-retry generation.
//!
//! The dispatcher assembles a complete natural-language prompt from a
//! per-chain preamble, a structured facts block, chain-family closing
//! guidance and an optional framework-integration notice, then obtains
//! generated text through an [`LlmProvider`] under a [`RetryPolicy`].
//!
//! Callers that want multi-turn context keep a [`ConversationWindow`] and
//! pass it to [`PromptDispatcher::dispatch_with_context`]; the window is
//! caller-owned state, not dispatcher state.
//!
//! The [`ContentGenerator`] trait is the composition seam: decorators such
//! as [`BridgeAwareGenerator`] wrap a base generator and enrich requests by
//! delegating explicitly, never by patching the base object.

pub mod prompts;

use async_trait::async_trait;
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::bridge::{select_bridge_protocols, Chain};
use crate::error::LlmError;
use crate::llm::{generate_with_retry, GenerationRequest, LlmProvider, Message, RetryPolicy};
use crate::utils::extract_code_or_raw;

pub use prompts::{
    get_chain_prompt, source_extension, ChainPrompt, CHAIN_PROMPTS, GENERIC_CLOSING,
    GENERIC_PREAMBLE,
};

/// Maximum retained exchanges (user + assistant pairs) in a conversation
/// window.
pub const MAX_WINDOW_EXCHANGES: usize = 5;

/// Facts describing one generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSpec {
    /// Free-text description of what to build.
    pub description: String,
    /// Contract or project type (e.g. "token", "nft", "bridge").
    pub project_type: String,
    /// Target blockchain identifier.
    pub blockchain: String,
    /// Target network identifier (e.g. "mainnet", "sepolia").
    pub network: String,
    /// Optional free-text additional requirements.
    pub additional_requirements: Option<String>,
}

impl GenerationSpec {
    /// Creates a spec with the required fields.
    pub fn new(
        description: impl Into<String>,
        project_type: impl Into<String>,
        blockchain: impl Into<String>,
        network: impl Into<String>,
    ) -> Self {
        Self {
            description: description.into(),
            project_type: project_type.into(),
            blockchain: blockchain.into(),
            network: network.into(),
            additional_requirements: None,
        }
    }

    /// Adds free-text additional requirements.
    pub fn with_additional_requirements(mut self, requirements: impl Into<String>) -> Self {
        self.additional_requirements = Some(requirements.into());
        self
    }
}

/// Call options for one dispatch.
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    /// Model identifier; empty means the provider's default.
    pub model: String,
    /// Token budget for the generated text.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
    /// Retry budget and backoff base delay.
    pub retry: RetryPolicy,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            model: String::new(),
            max_tokens: 4096,
            temperature: 0.7,
            retry: RetryPolicy::default(),
        }
    }
}

impl DispatchOptions {
    /// Sets the model identifier.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the token budget.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the sampling temperature, clamped to [0, 2].
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    /// Sets the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Injected capability flags.
///
/// Availability of auxiliary development frameworks is decided by the
/// startup layer and passed in; core logic never probes the filesystem.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapabilityFlags {
    frameworks: Vec<String>,
}

impl CapabilityFlags {
    /// No auxiliary frameworks available.
    pub fn none() -> Self {
        Self::default()
    }

    /// Marks a framework (e.g. "hardhat", "anchor") as available.
    pub fn with_framework(mut self, name: impl Into<String>) -> Self {
        self.frameworks.push(name.into());
        self
    }

    /// Returns the available frameworks.
    pub fn frameworks(&self) -> &[String] {
        &self.frameworks
    }
}

/// Caller-owned rolling conversation window.
///
/// Retains the most recent [`MAX_WINDOW_EXCHANGES`] user/assistant
/// exchanges; the oldest exchange is evicted first.
#[derive(Debug, Clone, Default)]
pub struct ConversationWindow {
    messages: VecDeque<Message>,
}

impl ConversationWindow {
    /// Creates an empty window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one completed exchange, evicting the oldest beyond the cap.
    pub fn push_exchange(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        self.messages.push_back(Message::user(user));
        self.messages.push_back(Message::assistant(assistant));
        while self.messages.len() > MAX_WINDOW_EXCHANGES * 2 {
            self.messages.pop_front();
        }
    }

    /// Messages currently retained, oldest first.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    /// Number of retained messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if the window holds no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Drops all retained messages.
    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

/// Capability interface for content generation.
///
/// Decorators hold a base implementation and delegate explicitly.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Generates content (code) for the given spec.
    async fn generate_content(&self, spec: &GenerationSpec) -> Result<String, LlmError>;
}

/// Builds prompts and dispatches them with bounded retry.
pub struct PromptDispatcher {
    provider: Arc<dyn LlmProvider>,
    options: DispatchOptions,
    flags: CapabilityFlags,
}

impl PromptDispatcher {
    /// Creates a dispatcher with default options and no capability flags.
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            options: DispatchOptions::default(),
            flags: CapabilityFlags::none(),
        }
    }

    /// Replaces the dispatch options.
    pub fn with_options(mut self, options: DispatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Replaces the capability flags.
    pub fn with_flags(mut self, flags: CapabilityFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Returns the dispatch options.
    pub fn options(&self) -> &DispatchOptions {
        &self.options
    }

    /// Chain-specialized preamble, or the generic one.
    fn preamble(&self, spec: &GenerationSpec) -> &'static str {
        get_chain_prompt(&spec.blockchain)
            .map(|p| p.preamble)
            .unwrap_or(GENERIC_PREAMBLE)
    }

    /// Facts block plus closing guidance and the optional framework notice.
    fn request_body(&self, spec: &GenerationSpec) -> String {
        let mut body = format!(
            "Project details:\n\
             - Type: {}\n\
             - Blockchain: {}\n\
             - Network: {}\n\
             - Description: {}\n",
            spec.project_type, spec.blockchain, spec.network, spec.description
        );

        if let Some(requirements) = &spec.additional_requirements {
            body.push_str(&format!("\nAdditional requirements:\n{}\n", requirements));
        }

        let closing = get_chain_prompt(&spec.blockchain)
            .map(|p| p.closing_guidance)
            .unwrap_or(GENERIC_CLOSING);
        body.push_str(&format!("\n{}\n", closing));

        if !self.flags.frameworks().is_empty() {
            body.push_str(&format!(
                "\nThe following development frameworks are available and should be \
                 integrated: {}.\n",
                self.flags.frameworks().join(", ")
            ));
        }

        body
    }

    /// The complete prompt text (preamble plus body), as sent to the model.
    pub fn build_prompt(&self, spec: &GenerationSpec) -> String {
        format!("{}\n\n{}", self.preamble(spec), self.request_body(spec))
    }

    fn request_with(&self, messages: Vec<Message>) -> GenerationRequest {
        GenerationRequest::new(self.options.model.clone(), messages)
            .with_temperature(self.options.temperature)
            .with_max_tokens(self.options.max_tokens)
    }

    /// Dispatches a generation request and returns the text verbatim.
    #[instrument(skip_all, fields(blockchain = %spec.blockchain, project_type = %spec.project_type))]
    pub async fn dispatch(&self, spec: &GenerationSpec) -> Result<String, LlmError> {
        let request = self.request_with(vec![
            Message::system(self.preamble(spec)),
            Message::user(self.request_body(spec)),
        ]);

        let response = generate_with_retry(self.provider.as_ref(), request, &self.options.retry)
            .await?;
        let text = response
            .first_content()
            .ok_or(LlmError::EmptyResponse)?
            .to_string();
        debug!(chars = text.len(), "generation dispatch complete");
        Ok(text)
    }

    /// Dispatches and returns the fenced-code contents of the response, or
    /// the raw text when no fenced block is present.
    pub async fn dispatch_code(&self, spec: &GenerationSpec) -> Result<String, LlmError> {
        let text = self.dispatch(spec).await?;
        Ok(extract_code_or_raw(&text))
    }

    /// Dispatches with a caller-owned conversation window as context.
    ///
    /// Retained exchanges are replayed between the system preamble and the
    /// new request; on success the request and response are recorded in the
    /// window.
    pub async fn dispatch_with_context(
        &self,
        spec: &GenerationSpec,
        window: &mut ConversationWindow,
    ) -> Result<String, LlmError> {
        let body = self.request_body(spec);
        let mut messages = vec![Message::system(self.preamble(spec))];
        messages.extend(window.messages().cloned());
        messages.push(Message::user(body.clone()));

        let response =
            generate_with_retry(self.provider.as_ref(), self.request_with(messages), &self.options.retry)
                .await?;
        let text = response
            .first_content()
            .ok_or(LlmError::EmptyResponse)?
            .to_string();

        window.push_exchange(body, text.clone());
        Ok(text)
    }
}

#[async_trait]
impl ContentGenerator for PromptDispatcher {
    async fn generate_content(&self, spec: &GenerationSpec) -> Result<String, LlmError> {
        self.dispatch_code(spec).await
    }
}

/// Decorator that enriches bridging-related requests with a bridge protocol
/// recommendation before delegating to the wrapped generator.
pub struct BridgeAwareGenerator<G: ContentGenerator> {
    inner: G,
}

impl<G: ContentGenerator> BridgeAwareGenerator<G> {
    /// Wraps a base generator.
    pub fn new(inner: G) -> Self {
        Self { inner }
    }

    /// Returns the wrapped generator.
    pub fn inner(&self) -> &G {
        &self.inner
    }

    fn mentioned_chains(spec: &GenerationSpec) -> BTreeSet<Chain> {
        let mut text = format!("{} {}", spec.blockchain, spec.description);
        if let Some(requirements) = &spec.additional_requirements {
            text.push(' ');
            text.push_str(requirements);
        }

        text.split(|c: char| !c.is_ascii_alphanumeric())
            .filter_map(Chain::parse)
            .collect()
    }

    fn concerns_bridging(spec: &GenerationSpec) -> bool {
        let mut text = format!("{} {}", spec.project_type, spec.description);
        if let Some(requirements) = &spec.additional_requirements {
            text.push(' ');
            text.push_str(requirements);
        }
        let text = text.to_ascii_lowercase();
        text.contains("bridge") || text.contains("cross-chain") || text.contains("crosschain")
    }
}

#[async_trait]
impl<G: ContentGenerator> ContentGenerator for BridgeAwareGenerator<G> {
    async fn generate_content(&self, spec: &GenerationSpec) -> Result<String, LlmError> {
        let chains = Self::mentioned_chains(spec);
        if !Self::concerns_bridging(spec) || chains.len() < 2 {
            return self.inner.generate_content(spec).await;
        }

        let recommendation =
            select_bridge_protocols(chains.iter().map(|c| c.name().to_string()));
        debug!(
            protocols = recommendation.protocols.len(),
            pairs = recommendation.configurations.len(),
            "augmenting bridging request with protocol recommendation"
        );

        let section = recommendation.to_prompt_section();
        let mut augmented = spec.clone();
        augmented.additional_requirements = Some(match &spec.additional_requirements {
            Some(existing) => format!("{}\n\n{}", existing, section),
            None => section,
        });

        self.inner.generate_content(&augmented).await
    }
}
