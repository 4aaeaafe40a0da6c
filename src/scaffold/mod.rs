//! Project scaffolding orchestration.
//!
//! A scaffold request flows linearly: bindings are built from the project
//! fields, a matching template tree is materialized when the registry has
//! one for the requested type and chain, and otherwise the prompt
//! dispatcher generates the main contract source, which is written to the
//! destination. A static catalog of reference repositories per chain is
//! surfaced alongside generated output.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::fs;
use tracing::{info, instrument};

use crate::bridge::Chain;
use crate::dispatch::{source_extension, GenerationSpec, PromptDispatcher};
use crate::error::ScaffoldError;
use crate::llm::LlmProvider;
use crate::template::{Bindings, FragmentSource, MaterializeReport, Materializer, TemplateRegistry};

/// An open-source repository worth consulting for a chain's ecosystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceRepo {
    /// Short repository name.
    pub name: &'static str,
    /// Git URL.
    pub url: &'static str,
}

/// Reference repositories for EVM-family chains.
static EVM_REFERENCES: &[ReferenceRepo] = &[
    ReferenceRepo {
        name: "openzeppelin-contracts",
        url: "https://github.com/OpenZeppelin/openzeppelin-contracts",
    },
    ReferenceRepo {
        name: "hardhat",
        url: "https://github.com/NomicFoundation/hardhat",
    },
];

/// Reference repositories for Solana.
static SOLANA_REFERENCES: &[ReferenceRepo] = &[
    ReferenceRepo {
        name: "anchor",
        url: "https://github.com/solana-foundation/anchor",
    },
    ReferenceRepo {
        name: "solana-program-library",
        url: "https://github.com/solana-program/solana-program-library",
    },
];

/// Returns the reference-repository catalog for a chain.
///
/// Unrecognized chains get an empty catalog.
pub fn reference_repos(chain: &str) -> &'static [ReferenceRepo] {
    match Chain::parse(chain) {
        Some(Chain::Solana) => SOLANA_REFERENCES,
        Some(_) => EVM_REFERENCES,
        None => &[],
    }
}

/// One scaffolding request.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaffoldRequest {
    /// Human-readable project name; also drives derived bindings.
    pub project_name: String,
    /// Project type used for template selection (e.g. "token").
    pub project_type: String,
    /// Target blockchain identifier.
    pub blockchain: String,
    /// Target network identifier.
    pub network: String,
    /// Free-text description for prompt-based generation.
    pub description: String,
    /// Optional free-text additional requirements.
    pub additional_requirements: Option<String>,
    /// Directory the project is written into.
    pub destination: PathBuf,
}

impl ScaffoldRequest {
    /// Creates a request; the destination defaults to `./<sanitized name>`.
    pub fn new(
        project_name: impl Into<String>,
        project_type: impl Into<String>,
        blockchain: impl Into<String>,
        network: impl Into<String>,
    ) -> Self {
        let project_name = project_name.into();
        let destination = PathBuf::from(format!("./{}", sanitize_file_stem(&project_name)));
        Self {
            project_name,
            project_type: project_type.into(),
            blockchain: blockchain.into(),
            network: network.into(),
            description: String::new(),
            additional_requirements: None,
            destination,
        }
    }

    /// Sets the free-text description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets additional free-text requirements.
    pub fn with_additional_requirements(mut self, requirements: impl Into<String>) -> Self {
        self.additional_requirements = Some(requirements.into());
        self
    }

    /// Sets the destination directory.
    pub fn with_destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.destination = destination.into();
        self
    }

    /// Standard variable bindings for this request.
    pub fn bindings(&self) -> Bindings {
        Bindings::for_project(&self.project_name, &self.blockchain, &self.network)
    }

    fn generation_spec(&self) -> GenerationSpec {
        let spec = GenerationSpec::new(
            self.description.clone(),
            self.project_type.clone(),
            self.blockchain.clone(),
            self.network.clone(),
        );
        match &self.additional_requirements {
            Some(requirements) => spec.with_additional_requirements(requirements.clone()),
            None => spec,
        }
    }
}

/// How a request was fulfilled.
#[derive(Debug)]
pub enum ScaffoldOutcome {
    /// A registry template matched and was materialized.
    Template {
        /// Name of the matched template.
        template: String,
        /// Files and directories written.
        report: MaterializeReport,
    },
    /// No template matched; the main source was generated via dispatch.
    Generated {
        /// Path of the written source file.
        path: PathBuf,
        /// Reference repositories for the chain's ecosystem.
        references: &'static [ReferenceRepo],
    },
}

/// Ties together template selection, materialization and prompt dispatch.
pub struct ProjectScaffolder<S: FragmentSource> {
    registry: TemplateRegistry,
    materializer: Materializer<S>,
    dispatcher: PromptDispatcher,
}

impl<S: FragmentSource> ProjectScaffolder<S> {
    /// Creates a scaffolder from a registry, a fragment store and an LLM
    /// provider (wrapped in a default-configured dispatcher).
    pub fn new(
        registry: TemplateRegistry,
        store: Arc<S>,
        provider: Arc<dyn LlmProvider>,
    ) -> Self {
        Self {
            registry,
            materializer: Materializer::new(store),
            dispatcher: PromptDispatcher::new(provider),
        }
    }

    /// Replaces the dispatcher (to change options or capability flags).
    pub fn with_dispatcher(mut self, dispatcher: PromptDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Returns the template registry.
    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    /// Fulfills a scaffold request.
    #[instrument(skip_all, fields(project = %request.project_name, chain = %request.blockchain))]
    pub async fn scaffold(
        &self,
        request: &ScaffoldRequest,
    ) -> Result<ScaffoldOutcome, ScaffoldError> {
        let bindings = request.bindings();

        if let Some(template) = self
            .registry
            .select(&request.project_type, &request.blockchain)
        {
            info!(template = %template.name, "materializing matching template");
            let report = self
                .materializer
                .materialize(&template.tree, &request.destination, &bindings)
                .await?;
            return Ok(ScaffoldOutcome::Template {
                template: template.name.clone(),
                report,
            });
        }

        info!("no matching template, generating via prompt dispatch");
        let code = self.dispatcher.dispatch_code(&request.generation_spec()).await?;

        let file_name = format!(
            "{}.{}",
            sanitize_file_stem(&request.project_name),
            source_extension(&request.blockchain)
        );
        fs::create_dir_all(&request.destination)
            .await
            .map_err(|source| ScaffoldError::WriteOutput {
                path: request.destination.clone(),
                source,
            })?;
        let path = request.destination.join(file_name);
        fs::write(&path, &code)
            .await
            .map_err(|source| ScaffoldError::WriteOutput {
                path: path.clone(),
                source,
            })?;

        Ok(ScaffoldOutcome::Generated {
            path,
            references: reference_repos(&request.blockchain),
        })
    }
}

/// Lowercased, dash-separated file stem derived from a project name.
pub fn sanitize_file_stem(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    let stem = stem.trim_matches('-').to_string();
    let mut collapsed = String::with_capacity(stem.len());
    for c in stem.chars() {
        if c == '-' && collapsed.ends_with('-') {
            continue;
        }
        collapsed.push(c);
    }

    if collapsed.is_empty() {
        "project".to_string()
    } else {
        collapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::llm::{
        Choice, GenerationRequest, GenerationResponse, LlmProvider, Message, Usage,
    };
    use crate::template::{MemoryFragmentStore, ProjectTemplate, TemplateNode};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    struct FixedProvider {
        content: String,
        calls: AtomicU32,
    }

    impl FixedProvider {
        fn new(content: &str) -> Self {
            Self {
                content: content.to_string(),
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for FixedProvider {
        async fn generate(
            &self,
            _request: GenerationRequest,
        ) -> Result<GenerationResponse, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(GenerationResponse {
                id: "fixed".to_string(),
                model: "test-model".to_string(),
                choices: vec![Choice {
                    index: 0,
                    message: Message::assistant(self.content.clone()),
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

    fn registry_with_token_template() -> TemplateRegistry {
        let mut registry = TemplateRegistry::new();
        registry
            .register(ProjectTemplate {
                name: "evm-token".to_string(),
                project_type: "token".to_string(),
                chain: "ethereum".to_string(),
                tree: TemplateNode::dir([(
                    "contracts",
                    TemplateNode::dir([(
                        "Token.sol",
                        TemplateNode::file("// {{ProjectName}} ({{TokenSymbol}})"),
                    )]),
                )]),
            })
            .expect("register");
        registry
    }

    #[tokio::test]
    async fn test_scaffold_prefers_matching_template() {
        let provider = Arc::new(FixedProvider::new("should not be called"));
        let scaffolder = ProjectScaffolder::new(
            registry_with_token_template(),
            Arc::new(MemoryFragmentStore::new()),
            provider.clone(),
        );

        let dest = tempdir().expect("failed to create temp dir");
        let request = ScaffoldRequest::new("My Token", "token", "ethereum", "sepolia")
            .with_destination(dest.path());

        let outcome = scaffolder.scaffold(&request).await.expect("scaffold");
        match outcome {
            ScaffoldOutcome::Template { template, report } => {
                assert_eq!(template, "evm-token");
                assert_eq!(report.files_written.len(), 1);
            }
            other => panic!("expected template outcome, got {:?}", other),
        }

        let content = std::fs::read_to_string(dest.path().join("contracts/Token.sol"))
            .expect("read output");
        assert_eq!(content, "// My Token (MYTOK)");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0, "no dispatch");
    }

    #[tokio::test]
    async fn test_scaffold_falls_back_to_generation() {
        let provider = Arc::new(FixedProvider::new(
            "Sure:\n```solidity\ncontract Vault {}\n```",
        ));
        let scaffolder = ProjectScaffolder::new(
            TemplateRegistry::new(),
            Arc::new(MemoryFragmentStore::new()),
            provider.clone(),
        );

        let dest = tempdir().expect("failed to create temp dir");
        let request = ScaffoldRequest::new("Vault App", "vault", "ethereum", "mainnet")
            .with_description("A simple vault")
            .with_destination(dest.path());

        let outcome = scaffolder.scaffold(&request).await.expect("scaffold");
        match outcome {
            ScaffoldOutcome::Generated { path, references } => {
                assert!(path.ends_with("vault-app.sol"));
                let content = std::fs::read_to_string(&path).expect("read output");
                assert_eq!(content, "contract Vault {}");
                assert!(!references.is_empty());
            }
            other => panic!("expected generated outcome, got {:?}", other),
        }
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_sanitize_file_stem() {
        assert_eq!(sanitize_file_stem("My Token"), "my-token");
        assert_eq!(sanitize_file_stem("  DeFi!! App  "), "defi-app");
        assert_eq!(sanitize_file_stem("!!!"), "project");
    }

    #[test]
    fn test_reference_repos_per_chain_family() {
        assert!(reference_repos("ethereum")
            .iter()
            .any(|r| r.name == "openzeppelin-contracts"));
        assert!(reference_repos("solana").iter().any(|r| r.name == "anchor"));
        assert!(reference_repos("near").is_empty());
    }
}
