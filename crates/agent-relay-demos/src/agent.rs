use std::sync::Mutex;
use std::time::Duration;

use agent_relay_stream::{AgentRunner, RunContext};

/// Progress published by the scripted agent.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    Thinking { message: String },
    ToolCall { tool: String, network: String },
    ToolResult { tool: String, output: serde_json::Value },
    Chunk { text: String },
}

/// Offline stand-in for a blockchain explorer agent: walks a fixed plan of
/// tool calls and answers from canned tool output.
pub struct ScriptedExplorer {
    network: String,
    step_delay: Duration,
    default_timeout: Mutex<Duration>,
    history: Mutex<Vec<String>>,
}

impl ScriptedExplorer {
    pub fn new(network: impl Into<String>, step_delay: Duration) -> Self {
        Self {
            network: network.into(),
            step_delay,
            default_timeout: Mutex::new(Duration::from_secs(60)),
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn history_len(&self) -> usize {
        self.history.lock().map(|history| history.len()).unwrap_or(0)
    }

    fn plan(&self) -> Vec<(&'static str, serde_json::Value)> {
        vec![
            ("get_block_count", serde_json::json!({"count": 5_412_907})),
            (
                "get_best_block_hash",
                serde_json::json!({"hash": "0x9f1c2e0b7d3a"}),
            ),
        ]
    }
}

#[async_trait::async_trait]
impl AgentRunner for ScriptedExplorer {
    type Event = AgentEvent;
    type Output = String;
    type Error = String;

    fn reset(&self) {
        if let Ok(mut history) = self.history.lock() {
            history.clear();
        }
    }

    fn default_timeout(&self) -> Duration {
        self.default_timeout
            .lock()
            .map(|timeout| *timeout)
            .unwrap_or_default()
    }

    fn set_default_timeout(&self, timeout: Duration) {
        if let Ok(mut current) = self.default_timeout.lock() {
            *current = timeout;
        }
    }

    async fn run(&self, request: String, ctx: RunContext<AgentEvent>) -> Result<String, String> {
        if request.trim().is_empty() {
            return Err("empty request".into());
        }
        if let Ok(mut history) = self.history.lock() {
            history.push(request.clone());
        }
        ctx.sink.emit(AgentEvent::Thinking {
            message: format!("planning tool calls for: {request}"),
        });

        let work = async {
            let mut facts = Vec::new();
            for (tool, output) in self.plan() {
                ctx.sink.emit(AgentEvent::ToolCall {
                    tool: tool.to_string(),
                    network: self.network.clone(),
                });
                tokio::time::sleep(self.step_delay).await;
                facts.push(format!("{tool} -> {output}"));
                ctx.sink.emit(AgentEvent::ToolResult {
                    tool: tool.to_string(),
                    output,
                });
            }
            facts
        };
        let facts = tokio::time::timeout(ctx.timeout, work)
            .await
            .map_err(|_| format!("agent timed out after {:?}", ctx.timeout))?;

        let answer = format!("Neo {} status: {}", self.network, facts.join("; "));
        for word in answer.split_inclusive(' ') {
            ctx.sink.emit(AgentEvent::Chunk {
                text: word.to_string(),
            });
        }
        Ok(answer)
    }
}
