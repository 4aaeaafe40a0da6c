//! Chain-specific prompt templates for contract and project generation.
//!
//! Each known chain family gets a tailored instructional preamble and
//! closing guidance; chains without a specialized entry fall back to the
//! generic preamble. Prompt construction itself is pure string assembly in
//! [`build_generation_prompt`].
//!
//! [`build_generation_prompt`]: super::PromptDispatcher::build_prompt

/// Prompt configuration for one blockchain.
#[derive(Debug, Clone)]
pub struct ChainPrompt {
    /// The chain identifier this entry applies to (lowercase).
    pub chain: &'static str,
    /// Instructional preamble tailored to the chain's contract model.
    pub preamble: &'static str,
    /// Closing guidance appended after the facts block.
    pub closing_guidance: &'static str,
    /// Language the chain's contracts are written in.
    pub contract_language: &'static str,
    /// File extension for the main contract source.
    pub source_extension: &'static str,
}

/// Generic preamble for chains without a specialized entry.
pub const GENERIC_PREAMBLE: &str = "You are an expert blockchain developer. \
Write complete, production-quality code for the requested project. \
Output only code, inside a fenced code block.";

/// Generic closing guidance for chains without a specialized entry.
pub const GENERIC_CLOSING: &str = "Follow the conventions of the target \
chain's ecosystem and include inline documentation for public interfaces.";

/// Static table of specialized chain prompts.
pub static CHAIN_PROMPTS: &[ChainPrompt] = &[
    ChainPrompt {
        chain: "ethereum",
        preamble: "You are an expert Solidity developer writing contracts for \
Ethereum mainnet and its testnets. Write complete, production-quality \
Solidity targeting a recent 0.8.x compiler. Output only code, inside a \
fenced code block.",
        closing_guidance: "Ensure reentrancy protection on all external \
calls, follow the checks-effects-interactions pattern, use custom errors \
instead of revert strings, and emit events for every state change.",
        contract_language: "Solidity",
        source_extension: "sol",
    },
    ChainPrompt {
        chain: "polygon",
        preamble: "You are an expert Solidity developer writing contracts for \
Polygon PoS. Write complete, production-quality Solidity targeting a recent \
0.8.x compiler, mindful of Polygon's low gas costs and fast blocks. Output \
only code, inside a fenced code block.",
        closing_guidance: "Ensure reentrancy protection on all external \
calls, follow the checks-effects-interactions pattern, and account for \
Polygon's deeper reorgs when handling finality-sensitive logic.",
        contract_language: "Solidity",
        source_extension: "sol",
    },
    ChainPrompt {
        chain: "bsc",
        preamble: "You are an expert Solidity developer writing contracts for \
BNB Smart Chain. Write complete, production-quality Solidity targeting a \
recent 0.8.x compiler. Output only code, inside a fenced code block.",
        closing_guidance: "Ensure reentrancy protection on all external \
calls and follow the checks-effects-interactions pattern. Prefer BEP-20 \
naming where the token standard differs from ERC-20 only in name.",
        contract_language: "Solidity",
        source_extension: "sol",
    },
    ChainPrompt {
        chain: "solana",
        preamble: "You are an expert Solana developer writing on-chain \
programs in Rust with the Anchor framework. Write complete, \
production-quality program code. Output only code, inside a fenced code \
block.",
        closing_guidance: "Follow the account model: validate every account \
constraint explicitly, check signers and ownership, and avoid assumptions \
about account ordering. Use Anchor's constraint attributes rather than \
manual checks where possible.",
        contract_language: "Rust (Anchor)",
        source_extension: "rs",
    },
];

/// Returns the specialized prompt entry for a chain, if one exists.
///
/// Matching is case-insensitive.
pub fn get_chain_prompt(chain: &str) -> Option<&'static ChainPrompt> {
    CHAIN_PROMPTS
        .iter()
        .find(|p| p.chain.eq_ignore_ascii_case(chain.trim()))
}

/// File extension for a chain's main contract source, with the EVM default
/// for chains without a specialized entry.
pub fn source_extension(chain: &str) -> &'static str {
    get_chain_prompt(chain)
        .map(|p| p.source_extension)
        .unwrap_or("sol")
}
