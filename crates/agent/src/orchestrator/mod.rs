//! Multi-agent orchestration: route a query to the best-scoring agent and
//! run that agent's loop.
//!
//! Agents share one completion endpoint and one tool registry but each
//! keeps its own conversation memory, so switching topics mid-session does
//! not leak one specialist's history into another's context.

pub mod keywords;
pub mod router;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use agentloop_config::{AppConfig, ConfigError};
use agentloop_core::event::{DomainEvent, EventBus};
use agentloop_core::{Provider, ToolRegistry};
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::agent_type::AgentType;
use crate::loop_runner::{Agent, AgentSettings};
pub use router::{KeywordRouter, RoutingDecision, normalize};

/// The result of one orchestrated query.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorResponse {
    /// The agent that actually answered
    pub agent: AgentType,
    pub response: String,
    pub routing: RoutingDecision,
    pub elapsed_ms: u64,
    /// Distinct tools used, in first-use order
    pub tools_used: Vec<String>,
    /// Set when the loop failed; `response` then holds the user-facing error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Routes queries across a set of agents.
pub struct Orchestrator {
    router: KeywordRouter,
    agents: BTreeMap<AgentType, Agent>,
    event_bus: Arc<EventBus>,
}

impl Orchestrator {
    /// An orchestrator with no agents yet.
    pub fn new(router: KeywordRouter) -> Self {
        Self {
            router,
            agents: BTreeMap::new(),
            event_bus: Arc::new(EventBus::default()),
        }
    }

    /// One agent per type, configured from `config`, all sharing `provider`
    /// and `tools`.
    pub fn from_config(
        config: &AppConfig,
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
    ) -> Result<Self, ConfigError> {
        let mut orchestrator = Self::new(KeywordRouter::from_config(&config.routing)?);
        for agent_type in AgentType::ALL {
            orchestrator.add_agent(Agent::new(
                format!("{agent_type}-agent"),
                agent_type,
                provider.clone(),
                tools.clone(),
                AgentSettings::from_config(config, agent_type),
            ));
        }
        info!(agents = orchestrator.agents.len(), "Orchestrator ready");
        Ok(orchestrator)
    }

    /// Register an agent under its type, replacing any existing one.
    pub fn add_agent(&mut self, agent: Agent) {
        let agent = agent.with_event_bus(self.event_bus.clone());
        self.agents.insert(agent.agent_type(), agent);
    }

    /// Routing only; no agent runs.
    pub fn route(&self, query: &str) -> RoutingDecision {
        self.router.route(query)
    }

    /// Route `query` and run the chosen agent's loop.
    ///
    /// When the routed type has no agent the general agent answers instead.
    /// Loop errors do not propagate: they land in `error`, with the
    /// user-facing text in `response`.
    pub async fn process(&mut self, query: &str) -> OrchestratorResponse {
        let start = Instant::now();
        let routing = self.router.route(query);
        self.event_bus.publish(DomainEvent::QueryRouted {
            agent: routing.agent.to_string(),
            confidence: routing.confidence,
            timestamp: Utc::now(),
        });

        let target = if self.agents.contains_key(&routing.agent) {
            routing.agent
        } else {
            warn!(agent = %routing.agent, "No agent registered for route, using fallback");
            AgentType::General
        };

        let Some(agent) = self.agents.get_mut(&target) else {
            return OrchestratorResponse {
                agent: target,
                response: format!("Error processing request: no agent available for '{target}'"),
                routing,
                elapsed_ms: start.elapsed().as_millis() as u64,
                tools_used: Vec::new(),
                error: Some(format!("no agent registered for '{target}'")),
            };
        };

        // Tools that ran before a failure are still reported.
        let (response, error) = match agent.run(query).await {
            Ok(reply) => (reply.text, None),
            Err(e) => (e.user_message(), Some(e.to_string())),
        };
        let mut tools_used: Vec<String> = Vec::new();
        for name in agent.last_tools_invoked() {
            if !tools_used.contains(name) {
                tools_used.push(name.clone());
            }
        }

        let elapsed_ms = start.elapsed().as_millis() as u64;
        info!(agent = %target, elapsed_ms, tools = tools_used.len(), "Query processed");

        OrchestratorResponse {
            agent: target,
            response,
            routing,
            elapsed_ms,
            tools_used,
            error,
        }
    }

    /// Registered agent types, in priority order.
    pub fn list_agents(&self) -> Vec<AgentType> {
        self.agents.keys().copied().collect()
    }

    /// Registered agent ids, in the same order as [`Self::list_agents`].
    pub fn agent_ids(&self) -> Vec<&str> {
        self.agents.values().map(Agent::id).collect()
    }

    pub fn get_agent(&self, agent_type: AgentType) -> Option<&Agent> {
        self.agents.get(&agent_type)
    }

    pub fn get_agent_mut(&mut self, agent_type: AgentType) -> Option<&mut Agent> {
        self.agents.get_mut(&agent_type)
    }

    pub fn clear_all_histories(&mut self) {
        for agent in self.agents.values_mut() {
            agent.clear_history();
        }
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use agentloop_core::{ParamSpec, ProviderError};
    use serde_json::json;

    fn registry() -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry
            .register_fn(
                "multiply",
                |args| Ok((args.f64("a")? * args.f64("b")?).to_string()),
                "Multiply two numbers",
                vec![ParamSpec::new("a", "f64"), ParamSpec::new("b", "f64")],
            )
            .unwrap();
        Arc::new(registry)
    }

    fn orchestrator(provider: Arc<SequentialMockProvider>) -> Orchestrator {
        Orchestrator::from_config(&AppConfig::default(), provider, registry()).unwrap()
    }

    #[tokio::test]
    async fn math_query_goes_to_math_agent() {
        let provider = Arc::new(SequentialMockProvider::tool_then_answer(
            vec![make_tool_call("c1", "multiply", json!({"a": 25, "b": 4}))],
            "25 * 4 = 100",
        ));
        let mut orch = orchestrator(provider.clone());

        let resp = orch.process("What is 25 * 4?").await;
        assert_eq!(resp.agent, AgentType::Math);
        assert_eq!(resp.routing.agent, AgentType::Math);
        assert_eq!(resp.response, "25 * 4 = 100");
        assert_eq!(resp.tools_used, vec!["multiply"]);
        assert!(resp.error.is_none());

        // Only the math agent's memory moved.
        assert_eq!(orch.get_agent(AgentType::Math).unwrap().memory().len(), 4);
        assert!(orch.get_agent(AgentType::General).unwrap().memory().is_empty());

        // The math agent's role prompt was sent.
        let system = provider.requests()[0].messages[0].text().to_string();
        assert!(system.contains("math"));
    }

    #[tokio::test]
    async fn small_talk_goes_to_general() {
        let provider = Arc::new(SequentialMockProvider::single_text("Hi!"));
        let mut orch = orchestrator(provider);

        let resp = orch.process("hello there").await;
        assert_eq!(resp.agent, AgentType::General);
        assert_eq!(resp.routing.confidence, 0.5);
        assert!(resp.tools_used.is_empty());
    }

    #[tokio::test]
    async fn missing_agent_falls_back_to_general() {
        let provider = Arc::new(SequentialMockProvider::single_text("general answer"));
        let mut orch = Orchestrator::new(KeywordRouter::default());
        orch.add_agent(Agent::new(
            "general-agent",
            AgentType::General,
            provider,
            registry(),
            AgentSettings::default(),
        ));

        let resp = orch.process("What is 25 * 4?").await;
        assert_eq!(resp.routing.agent, AgentType::Math);
        assert_eq!(resp.agent, AgentType::General);
        assert_eq!(resp.response, "general answer");
    }

    #[tokio::test]
    async fn no_agents_reports_error() {
        let mut orch = Orchestrator::new(KeywordRouter::default());
        let resp = orch.process("hello").await;
        assert!(resp.error.is_some());
        assert!(resp.response.starts_with("Error processing request:"));
    }

    #[tokio::test]
    async fn loop_errors_are_captured() {
        let provider = Arc::new(SequentialMockProvider::new(vec![Err(
            ProviderError::AuthenticationFailed("bad key".into()),
        )]));
        let mut orch = orchestrator(provider);

        let resp = orch.process("hello").await;
        assert_eq!(
            resp.response,
            "Error processing request: Authentication failed: bad key"
        );
        assert!(resp.error.unwrap().contains("bad key"));
        assert!(orch.get_agent(AgentType::General).unwrap().memory().is_empty());
    }

    #[tokio::test]
    async fn tools_used_survives_a_failed_loop() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            Ok(make_tool_use_response(vec![make_tool_call(
                "c1",
                "multiply",
                json!({"a": 6, "b": 7}),
            )])),
            Err(ProviderError::ApiError {
                status_code: 500,
                message: "boom".into(),
            }),
        ]));
        let mut orch = orchestrator(provider);

        let resp = orch.process("multiply 6 by 7").await;
        assert_eq!(resp.agent, AgentType::Math);
        assert!(resp.error.is_some());
        assert_eq!(resp.tools_used, vec!["multiply"]);
        // The turn itself is still rolled back.
        assert!(orch.get_agent(AgentType::Math).unwrap().memory().is_empty());

        // A later run starts from an empty list.
        let provider = Arc::new(SequentialMockProvider::single_text("hi"));
        let mut orch = orchestrator(provider);
        assert!(orch.process("hello").await.tools_used.is_empty());
    }

    #[tokio::test]
    async fn tools_used_is_deduplicated() {
        let provider = Arc::new(SequentialMockProvider::tool_then_answer(
            vec![
                make_tool_call("c1", "multiply", json!({"a": 2, "b": 3})),
                make_tool_call("c2", "multiply", json!({"a": 4, "b": 5})),
            ],
            "6 and 20",
        ));
        let mut orch = orchestrator(provider);
        let resp = orch.process("multiply 2 by 3 and 4 by 5").await;
        assert_eq!(resp.tools_used, vec!["multiply"]);
    }

    #[tokio::test]
    async fn routing_event_is_published() {
        let provider = Arc::new(SequentialMockProvider::single_text("ok"));
        let mut orch = orchestrator(provider);
        let mut rx = orch.event_bus().subscribe();

        orch.process("please debug my rust code").await;

        match rx.try_recv().unwrap().as_ref() {
            DomainEvent::QueryRouted { agent, confidence, .. } => {
                assert_eq!(agent, "code");
                assert!(*confidence > 0.5);
            }
            other => panic!("expected QueryRouted, got {other:?}"),
        }
        // Agent events share the orchestrator's bus.
        assert!(matches!(
            rx.try_recv().unwrap().as_ref(),
            DomainEvent::CompletionReceived { .. }
        ));
    }

    #[tokio::test]
    async fn clear_all_histories_empties_every_agent() {
        let provider = Arc::new(SequentialMockProvider::always(Ok(make_text_response("ok"))));
        let mut orch = orchestrator(provider);
        orch.process("hello").await;
        orch.process("What is 2 + 2?").await;
        assert!(!orch.get_agent(AgentType::Math).unwrap().memory().is_empty());

        orch.clear_all_histories();
        for agent_type in orch.list_agents() {
            assert!(orch.get_agent(agent_type).unwrap().memory().is_empty());
        }
    }

    #[test]
    fn from_config_builds_every_agent() {
        let provider = Arc::new(SequentialMockProvider::single_text("unused"));
        let orch = orchestrator(provider);
        assert_eq!(orch.list_agents(), AgentType::ALL.to_vec());
        assert_eq!(
            orch.agent_ids(),
            vec!["general-agent", "math-agent", "research-agent", "code-agent"]
        );
        assert_eq!(orch.get_agent(AgentType::Code).unwrap().id(), "code-agent");
    }

    #[test]
    fn from_config_rejects_bad_keywords() {
        let mut config = AppConfig::default();
        config.routing.keywords.insert(
            "math".into(),
            vec![agentloop_config::KeywordConfig {
                pattern: "[".into(),
                weight: 1.0,
            }],
        );
        let provider = Arc::new(SequentialMockProvider::single_text("unused"));
        assert!(Orchestrator::from_config(&config, provider, registry()).is_err());
    }
}
