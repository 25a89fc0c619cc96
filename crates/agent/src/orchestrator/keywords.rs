//! Built-in keyword tables and role prompts.
//!
//! Patterns are matched against the normalized (lowercased,
//! whitespace-collapsed) query. A specialist needs a raw score above the
//! saturation point to beat the general agent, so single strong signals
//! carry a weight of 2 or more and weak hints stay below that.

use crate::agent_type::AgentType;

/// `(pattern, weight)` pairs for one agent type.
pub type KeywordTable = &'static [(&'static str, f64)];

const MATH: KeywordTable = &[
    (r"\bcalculat\w*", 2.0),
    (r"\bcompute\b", 2.0),
    (r"\bmultipl\w*", 2.0),
    (r"\bdivid\w*", 2.0),
    (r"\bmath\w*", 2.0),
    (r"\bequation\w*|\bsolve\b", 2.0),
    (r"\bsquare root\b|\bsqrt\b", 2.0),
    (r"\*", 2.0),
    (r"\d+(\.\d+)?\s*[-+*/^%]\s*\d+", 3.0),
    (r"\bsum\b|\bplus\b|\bminus\b|\btimes\b", 1.5),
    (r"\bpercent\w*", 1.5),
    (r"\baverage\b|\bmean\b|\bmedian\b", 1.5),
    (r"\bconvert\b|\bunits?\b", 1.0),
];

const RESEARCH: KeywordTable = &[
    (r"\bresearch\w*", 2.0),
    (r"\bwho (is|was|were)\b", 2.0),
    (r"\bhistory\b|\bhistorical\b", 2.0),
    (r"\bexplain\w*", 1.5),
    (r"\bcompare\b|\bdifference between\b", 1.5),
    (r"\bsummar\w*", 1.5),
    (r"\bwhen (did|was|were)\b", 1.5),
    (r"\bfacts?\b|\bsources?\b|\bevidence\b", 1.5),
    (r"\bwhy\b", 1.0),
];

const CODE: KeywordTable = &[
    (r"```", 3.0),
    (r"\bcode\b|\bcoding\b", 2.0),
    (r"\bbug\w*|\bdebug\w*", 2.0),
    (r"\bcompil\w*", 2.0),
    (r"\brefactor\w*", 2.0),
    (r"\brust\b|\bpython\b|\bjavascript\b|\btypescript\b|\bgolang\b", 2.0),
    (r"\bfn \w+|\bdef \w+|\bclass \w+", 2.0),
    (r"\bfunction\b|\bmethod\b", 1.5),
    (r"\bimplement\w*", 1.5),
    (r"\bprogram\w*|\balgorithm\w*", 1.5),
    (r"\bapi\b|\bsql\b|\bregex\b", 1.5),
    (r"\bstack ?trace\b|\bexception\b|\bpanic\w*", 1.5),
];

/// The built-in table for `agent_type`. The general agent has none.
pub fn builtin(agent_type: AgentType) -> KeywordTable {
    match agent_type {
        AgentType::General => &[],
        AgentType::Math => MATH,
        AgentType::Research => RESEARCH,
        AgentType::Code => CODE,
    }
}

/// Default system prompt for each role.
pub fn system_prompt(agent_type: AgentType) -> &'static str {
    match agent_type {
        AgentType::General => {
            "You are a helpful general-purpose assistant. Answer clearly and concisely, \
             and use the available tools when they help."
        }
        AgentType::Math => {
            "You are a math specialist. Work through calculations step by step and use the \
             calculator tool for arithmetic instead of computing in your head."
        }
        AgentType::Research => {
            "You are a research assistant. Give well-organized, factual explanations, say \
             when you are unsure, and distinguish established facts from interpretation."
        }
        AgentType::Code => {
            "You are a senior software engineer. Write correct, idiomatic code, explain the \
             important decisions briefly, and point out bugs or edge cases you notice."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_patterns_compile_with_positive_weights() {
        for agent_type in AgentType::ALL {
            for (pattern, weight) in builtin(agent_type) {
                assert!(regex_lite::Regex::new(pattern).is_ok(), "bad pattern {pattern}");
                assert!(*weight > 0.0);
            }
        }
    }

    #[test]
    fn general_has_no_keywords() {
        assert!(builtin(AgentType::General).is_empty());
    }
}
