//! Keyword routing.
//!
//! Every specialist's raw score is the sum of the weights of its patterns
//! that match the normalized query, squashed into `[0, 1)` with
//! `raw / (raw + saturation)`. The general agent always scores
//! `fallback_score`. The strictly highest score wins; ties go to the
//! earlier type in [`AgentType::ALL`], so the general agent wins any tie
//! it is part of.

use std::collections::BTreeMap;
use agentloop_config::{ConfigError, RoutingConfig};
use regex_lite::Regex;
use serde::Serialize;
use tracing::debug;

use crate::agent_type::AgentType;
use super::keywords;

/// The outcome of routing one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutingDecision {
    pub agent: AgentType,
    /// The winner's normalized score
    pub confidence: f64,
    pub scores: BTreeMap<AgentType, f64>,
    /// Patterns the winner matched
    pub matched_keywords: Vec<String>,
    pub rationale: String,
}

struct Keyword {
    pattern: Regex,
    weight: f64,
}

/// Scores queries against per-type keyword tables.
pub struct KeywordRouter {
    tables: BTreeMap<AgentType, Vec<Keyword>>,
    fallback_score: f64,
    saturation: f64,
}

impl KeywordRouter {
    /// A router with the built-in tables only.
    pub fn new(fallback_score: f64, saturation: f64) -> Self {
        let mut tables = BTreeMap::new();
        for agent_type in AgentType::ALL {
            let table = keywords::builtin(agent_type)
                .iter()
                .filter_map(|(pattern, weight)| {
                    Regex::new(pattern).ok().map(|pattern| Keyword {
                        pattern,
                        weight: *weight,
                    })
                })
                .collect();
            tables.insert(agent_type, table);
        }
        Self {
            tables,
            fallback_score,
            saturation,
        }
    }

    /// Built-in tables plus the `[routing.keywords]` extras.
    pub fn from_config(config: &RoutingConfig) -> Result<Self, ConfigError> {
        let mut router = Self::new(config.fallback_score, config.saturation);
        // Sorted so the pattern order (and so the matched list) is stable.
        let mut extras: Vec<_> = config.keywords.iter().collect();
        extras.sort_by(|a, b| a.0.cmp(b.0));

        for (name, entries) in extras {
            let agent_type: AgentType = name
                .parse()
                .map_err(|e: String| ConfigError::ValidationError(format!("routing.keywords: {e}")))?;
            for entry in entries {
                router.add_keyword(agent_type, &entry.pattern, entry.weight)?;
            }
        }
        Ok(router)
    }

    /// Add one pattern to a specialist's table.
    pub fn add_keyword(
        &mut self,
        agent_type: AgentType,
        pattern: &str,
        weight: f64,
    ) -> Result<(), ConfigError> {
        if agent_type.is_fallback() {
            return Err(ConfigError::ValidationError(
                "the general agent is scored by fallback_score, not keywords".into(),
            ));
        }
        if !(weight > 0.0 && weight.is_finite()) {
            return Err(ConfigError::ValidationError(format!(
                "keyword weight for '{pattern}' must be > 0"
            )));
        }
        let regex = Regex::new(pattern).map_err(|e| {
            ConfigError::ValidationError(format!("invalid keyword pattern '{pattern}': {e}"))
        })?;
        self.tables.entry(agent_type).or_default().push(Keyword {
            pattern: regex,
            weight,
        });
        Ok(())
    }

    /// Score `query` against every table and pick an agent.
    pub fn route(&self, query: &str) -> RoutingDecision {
        let normalized = normalize(query);
        let mut scores = BTreeMap::new();
        let mut matches: BTreeMap<AgentType, Vec<String>> = BTreeMap::new();

        for agent_type in AgentType::ALL {
            if agent_type.is_fallback() {
                scores.insert(agent_type, self.fallback_score);
                continue;
            }
            let mut raw = 0.0;
            let matched = matches.entry(agent_type).or_default();
            for kw in self.tables.get(&agent_type).into_iter().flatten() {
                if kw.pattern.is_match(&normalized) {
                    raw += kw.weight;
                    matched.push(kw.pattern.as_str().to_string());
                }
            }
            scores.insert(agent_type, raw / (raw + self.saturation));
        }

        let mut winner = AgentType::General;
        let mut best = f64::NEG_INFINITY;
        for agent_type in AgentType::ALL {
            let score = scores[&agent_type];
            if score > best {
                winner = agent_type;
                best = score;
            }
        }

        let matched_keywords = matches.remove(&winner).unwrap_or_default();
        let rationale = if matched_keywords.is_empty() {
            format!(
                "No specialist keywords outscored the fallback; routed to {winner} (score {best:.2})"
            )
        } else {
            format!(
                "Routed to {winner} (score {best:.2}) on {} matched keyword(s): {}",
                matched_keywords.len(),
                matched_keywords.join(", ")
            )
        };
        debug!(agent = %winner, confidence = best, query = %normalized, "Routed query");

        RoutingDecision {
            agent: winner,
            confidence: best,
            scores,
            matched_keywords,
            rationale,
        }
    }
}

impl Default for KeywordRouter {
    fn default() -> Self {
        Self::from_config(&RoutingConfig::default())
            .unwrap_or_else(|_| Self::new(0.5, 1.0))
    }
}

/// Lowercase, collapse runs of whitespace, trim.
pub fn normalize(query: &str) -> String {
    query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
