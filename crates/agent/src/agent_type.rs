//! The kinds of agent the orchestrator can route to.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An agent role. Declaration order is the routing tie-break priority:
/// `General` wins every tie, then `Math`, `Research`, `Code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    /// Fallback for anything no specialist claims
    General,
    Math,
    Research,
    Code,
}

impl AgentType {
    /// Every type, in tie-break priority order.
    pub const ALL: [AgentType; 4] = [
        AgentType::General,
        AgentType::Math,
        AgentType::Research,
        AgentType::Code,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::General => "general",
            AgentType::Math => "math",
            AgentType::Research => "research",
            AgentType::Code => "code",
        }
    }

    pub fn is_fallback(&self) -> bool {
        *self == AgentType::General
    }
}

impl fmt::Display for AgentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "unknown agent type '{s}' (expected one of {})",
                    agentloop_config::AGENT_TYPES.join(", ")
                )
            })
    }
}
