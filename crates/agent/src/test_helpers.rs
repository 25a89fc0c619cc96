//! Shared test helpers for loop and orchestrator tests.

use agentloop_core::{
    Completion, Provider, ProviderError, ProviderRequest, ProviderResponse, ToolCall, Usage,
};
use std::sync::Mutex;

/// A mock provider that replays a script of responses.
///
/// Each call to `complete` returns the next entry. With `repeat_last`, the
/// final entry is returned forever; otherwise running past the end panics.
/// Every request is recorded for inspection.
pub struct SequentialMockProvider {
    responses: Vec<Result<ProviderResponse, ProviderError>>,
    repeat_last: bool,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            responses,
            repeat_last: false,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Returns `response` on every call.
    pub fn always(response: Result<ProviderResponse, ProviderError>) -> Self {
        Self {
            repeat_last: true,
            ..Self::new(vec![response])
        }
    }

    pub fn single_text(text: &str) -> Self {
        Self::new(vec![Ok(make_text_response(text))])
    }

    pub fn tool_then_answer(calls: Vec<ToolCall>, answer: &str) -> Self {
        Self::new(vec![
            Ok(make_tool_use_response(calls)),
            Ok(make_text_response(answer)),
        ])
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let index = requests.len();
        requests.push(request);

        let index = if self.repeat_last {
            index.min(self.responses.len() - 1)
        } else {
            index
        };
        match self.responses.get(index) {
            Some(response) => response.clone(),
            None => panic!(
                "SequentialMockProvider: no more responses (call #{index}, have {})",
                self.responses.len()
            ),
        }
    }
}

pub fn make_text_response(text: &str) -> ProviderResponse {
    response(Completion::Final { text: text.into() })
}

pub fn make_tool_use_response(calls: Vec<ToolCall>) -> ProviderResponse {
    response(Completion::ToolUse {
        text: String::new(),
        calls,
    })
}

fn response(completion: Completion) -> ProviderResponse {
    ProviderResponse {
        completion,
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

pub fn make_tool_call(id: &str, name: &str, args: serde_json::Value) -> ToolCall {
    ToolCall {
        id: id.into(),
        name: name.into(),
        arguments: args,
    }
}
