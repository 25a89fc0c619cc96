//! Text statistics tool: counts words, characters, sentences and lines.

use agentloop_core::{ParamSpec, Tool, ToolArgs, ToolError};
use async_trait::async_trait;

pub struct TextStatsTool;

#[async_trait]
impl Tool for TextStatsTool {
    fn name(&self) -> &str {
        "text_stats"
    }

    fn description(&self) -> &str {
        "Count the words, characters, sentences and lines in a piece of text.\n\n\
         Args:\n    text: The text to analyse\n    top_words: How many of the most frequent words to list"
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::new("text", "String"),
            ParamSpec::new("top_words", "usize").with_default(serde_json::json!(0)),
        ]
    }

    async fn call(&self, args: &ToolArgs) -> Result<String, ToolError> {
        let text = args.str("text")?;
        let top = usize::try_from(args.i64("top_words")?).map_err(|_| {
            ToolError::InvalidArguments("'top_words' must not be negative".into())
        })?;
        let stats = analyse(text, top);
        serde_json::to_string_pretty(&stats).map_err(|e| ToolError::ExecutionFailed {
            tool_name: "text_stats".into(),
            reason: e.to_string(),
        })
    }
}

fn analyse(text: &str, top: usize) -> serde_json::Value {
    let words: Vec<String> = text
        .split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect();

    let sentences = text
        .split(['.', '!', '?'])
        .filter(|s| s.chars().any(char::is_alphanumeric))
        .count();

    let mut stats = serde_json::json!({
        "words": words.len(),
        "characters": text.chars().count(),
        "characters_no_spaces": text.chars().filter(|c| !c.is_whitespace()).count(),
        "sentences": sentences,
        "lines": text.lines().count(),
    });

    if top > 0 {
        let mut counts: std::collections::BTreeMap<&str, usize> = Default::default();
        for w in &words {
            *counts.entry(w.as_str()).or_default() += 1;
        }
        let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
        // Count descending; BTreeMap order breaks ties alphabetically.
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(top);
        stats["top_words"] = ranked
            .into_iter()
            .map(|(w, n)| serde_json::json!({"word": w, "count": n}))
            .collect();
    }

    stats
}
