//! Cross-chain bridge protocol selection.
//!
//! Given a set of target blockchains, [`select_bridge_protocols`] recommends
//! cross-chain messaging protocols and a per-pair configuration. The output
//! is advisory input for prompt construction, not a correctness gate: the
//! function is total and produces a generic fallback for degenerate input
//! (fewer than two chains, or an unrecognized combination).
//!
//! Selection is a fixed-order rule table whose contributions accumulate;
//! rules never short-circuit each other.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Fallback bridge type when no rule identifies one.
pub const GENERIC_BRIDGE_TYPE: &str = "Generic Cross-Chain Bridge";

/// Generalized messaging protocol appended to every recommendation.
const GENERAL_MESSAGING_PROTOCOL: &str = "Chainlink CCIP";

/// Protocol set for EVM <-> Solana pairs.
const EVM_SOLANA_PROTOCOLS: &[&str] = &["Wormhole", "LayerZero"];

/// Protocol set for EVM <-> EVM pairs.
const EVM_PAIR_PROTOCOLS: &[&str] = &["LayerZero", "Wormhole", "Axelar", "Hyperlane"];

/// Known blockchains, classified as EVM-compatible or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Ethereum,
    Polygon,
    BinanceSmartChain,
    Arbitrum,
    Optimism,
    Avalanche,
    Base,
    Solana,
}

impl Chain {
    /// All known chains.
    pub const ALL: &'static [Chain] = &[
        Chain::Ethereum,
        Chain::Polygon,
        Chain::BinanceSmartChain,
        Chain::Arbitrum,
        Chain::Optimism,
        Chain::Avalanche,
        Chain::Base,
        Chain::Solana,
    ];

    /// Parses a chain identifier leniently (case-insensitive, common
    /// aliases). Unrecognized names yield `None`; the selector treats them
    /// as absent rather than rejecting the request.
    pub fn parse(name: &str) -> Option<Chain> {
        match name.trim().to_ascii_lowercase().as_str() {
            "ethereum" | "eth" => Some(Chain::Ethereum),
            "polygon" | "matic" => Some(Chain::Polygon),
            "bsc" | "bnb" | "binance" | "binance smart chain" | "binancesmartchain" => {
                Some(Chain::BinanceSmartChain)
            }
            "arbitrum" | "arbitrum one" => Some(Chain::Arbitrum),
            "optimism" | "op" => Some(Chain::Optimism),
            "avalanche" | "avax" => Some(Chain::Avalanche),
            "base" => Some(Chain::Base),
            "solana" | "sol" => Some(Chain::Solana),
            _ => None,
        }
    }

    /// Canonical lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            Chain::Ethereum => "ethereum",
            Chain::Polygon => "polygon",
            Chain::BinanceSmartChain => "bsc",
            Chain::Arbitrum => "arbitrum",
            Chain::Optimism => "optimism",
            Chain::Avalanche => "avalanche",
            Chain::Base => "base",
            Chain::Solana => "solana",
        }
    }

    /// Whether the chain shares the EVM execution/contract model.
    pub fn is_evm(&self) -> bool {
        !matches!(self, Chain::Solana)
    }

    /// Native gas token symbol.
    pub fn gas_token(&self) -> &'static str {
        match self {
            Chain::Ethereum | Chain::Arbitrum | Chain::Optimism | Chain::Base => "ETH",
            Chain::Polygon => "POL",
            Chain::BinanceSmartChain => "BNB",
            Chain::Avalanche => "AVAX",
            Chain::Solana => "SOL",
        }
    }

    /// Blocks conventionally waited before treating a transfer as final.
    pub fn confirmation_blocks(&self) -> u32 {
        match self {
            Chain::Ethereum => 12,
            Chain::Polygon => 128,
            Chain::BinanceSmartChain => 15,
            Chain::Arbitrum => 12,
            Chain::Optimism => 12,
            Chain::Avalanche => 1,
            Chain::Base => 12,
            Chain::Solana => 32,
        }
    }
}

impl std::fmt::Display for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Recommended configuration for one unordered chain pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Preferred protocol for this pair.
    pub primary_protocol: String,
    /// Protocol to fall back to.
    pub backup_protocol: String,
    /// Gas token paid on the originating side.
    pub gas_token: String,
    /// Rough fee estimate, human-readable.
    pub estimated_fee: String,
    /// Confirmation blocks to wait; takes the higher of the two endpoints
    /// so the slower-finality chain governs.
    pub confirmation_blocks: u32,
    /// Rough transfer time, human-readable.
    pub time_estimate: String,
}

/// Output of bridge protocol selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeRecommendation {
    /// Identified bridge categories (or the generic fallback).
    pub bridge_types: Vec<String>,
    /// Recommended protocols, de-duplicated, in first-seen order.
    pub protocols: Vec<String>,
    /// Per-pair configuration keyed by the unordered pair key
    /// (alphabetical, `"a-b"`).
    pub configurations: BTreeMap<String, BridgeConfig>,
}

impl BridgeRecommendation {
    /// Renders the recommendation as a prompt section for generation
    /// requests that concern bridging.
    pub fn to_prompt_section(&self) -> String {
        let mut out = String::from("Recommended cross-chain bridge setup:\n");
        out.push_str(&format!("- Bridge types: {}\n", self.bridge_types.join(", ")));
        out.push_str(&format!("- Protocols: {}\n", self.protocols.join(", ")));
        for (pair, config) in &self.configurations {
            out.push_str(&format!(
                "- {}: primary {} (backup {}), gas in {}, ~{} confirmations, fee {}, {}\n",
                pair,
                config.primary_protocol,
                config.backup_protocol,
                config.gas_token,
                config.confirmation_blocks,
                config.estimated_fee,
                config.time_estimate,
            ));
        }
        out
    }
}

/// Unordered pair key: endpoint names in alphabetical order.
fn pair_key(a: Chain, b: Chain) -> String {
    let (first, second) = if a.name() <= b.name() { (a, b) } else { (b, a) };
    format!("{}-{}", first.name(), second.name())
}

/// Canonical-bridge primary override for well-known EVM pairs.
fn canonical_bridge(a: Chain, b: Chain) -> Option<&'static str> {
    let pair = if a <= b { (a, b) } else { (b, a) };
    match pair {
        (Chain::Ethereum, Chain::Polygon) => Some("Polygon PoS Bridge"),
        (Chain::Ethereum, Chain::Arbitrum) => Some("Arbitrum Bridge"),
        (Chain::Ethereum, Chain::Optimism) => Some("Optimism Gateway"),
        (Chain::Ethereum, Chain::Base) => Some("Base Bridge"),
        _ => None,
    }
}

fn pair_config(a: Chain, b: Chain, primary: &str, backup: &str) -> BridgeConfig {
    let (first, second) = if a.name() <= b.name() { (a, b) } else { (b, a) };
    let cross_vm = first.is_evm() != second.is_evm();
    BridgeConfig {
        primary_protocol: primary.to_string(),
        backup_protocol: backup.to_string(),
        gas_token: first.gas_token().to_string(),
        estimated_fee: if cross_vm { "~0.1-0.3%" } else { "~0.05-0.1%" }.to_string(),
        confirmation_blocks: first.confirmation_blocks().max(second.confirmation_blocks()),
        time_estimate: if cross_vm {
            "10-20 minutes"
        } else {
            "5-15 minutes"
        }
        .to_string(),
    }
}

fn dedup_preserving(values: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|v| seen.insert(v.clone()))
        .collect()
}

/// Selects bridge protocols for a set of blockchain identifiers.
///
/// Total for any input: unrecognized names are ignored, and a set that
/// matches no rule (including an empty or single-chain set) still yields
/// the generic fallback entry with a default configuration.
pub fn select_bridge_protocols<I, S>(chains: I) -> BridgeRecommendation
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let recognized: BTreeSet<Chain> = chains
        .into_iter()
        .filter_map(|name| Chain::parse(name.as_ref()))
        .collect();

    let evm: Vec<Chain> = recognized.iter().copied().filter(Chain::is_evm).collect();
    let has_solana = recognized.contains(&Chain::Solana);

    let mut bridge_types: Vec<String> = Vec::new();
    let mut protocols: Vec<String> = Vec::new();
    let mut configurations: BTreeMap<String, BridgeConfig> = BTreeMap::new();

    // Rule 1: EVM <-> Solana pairs.
    if has_solana && !evm.is_empty() {
        bridge_types.push("EVM to Solana Bridge".to_string());
        for &chain in &evm {
            protocols.extend(EVM_SOLANA_PROTOCOLS.iter().map(|p| p.to_string()));
            configurations.insert(
                pair_key(chain, Chain::Solana),
                pair_config(chain, Chain::Solana, "Wormhole", "LayerZero"),
            );
        }
    }

    // Rule 2: EVM <-> EVM pairs, with canonical-bridge overrides.
    if evm.len() >= 2 {
        bridge_types.push("EVM Multi-Chain Bridge".to_string());
        for (i, &a) in evm.iter().enumerate() {
            for &b in &evm[i + 1..] {
                protocols.extend(EVM_PAIR_PROTOCOLS.iter().map(|p| p.to_string()));
                let canonical = canonical_bridge(a, b);
                if let Some(bridge) = canonical {
                    protocols.push(bridge.to_string());
                }
                let primary = canonical.unwrap_or("LayerZero");
                configurations.insert(pair_key(a, b), pair_config(a, b, primary, "Axelar"));
            }
        }
    }

    // Rule 3: chain-specific bridges alongside the Ethereum baseline.
    if recognized.contains(&Chain::Ethereum) {
        if recognized.contains(&Chain::Avalanche) {
            bridge_types.push("Avalanche Bridge".to_string());
            protocols.push("Avalanche Bridge".to_string());
        }
        if recognized.contains(&Chain::BinanceSmartChain) {
            bridge_types.push("BNB Chain Bridge".to_string());
            protocols.push("cBridge".to_string());
        }
    }

    // Rule 4: the generalized messaging protocol is always recommended.
    protocols.push(GENERAL_MESSAGING_PROTOCOL.to_string());

    // Rule 5: fall back when rules 1-3 identified nothing.
    if bridge_types.is_empty() {
        bridge_types.push(GENERIC_BRIDGE_TYPE.to_string());
        configurations.insert(
            "default".to_string(),
            BridgeConfig {
                primary_protocol: GENERIC_BRIDGE_TYPE.to_string(),
                backup_protocol: GENERAL_MESSAGING_PROTOCOL.to_string(),
                gas_token: "ETH".to_string(),
                estimated_fee: "~0.1%".to_string(),
                confirmation_blocks: 12,
                time_estimate: "10-30 minutes".to_string(),
            },
        );
    }

    BridgeRecommendation {
        bridge_types,
        protocols: dedup_preserving(protocols),
        configurations,
    }
}
