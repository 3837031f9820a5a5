//! Workflow step types
//!
//! A workflow step is one observed unit of backend planning activity (an agent
//! starting, a tool call, a handoff...). Steps arrive over the planning stream
//! and are shown progressively; they are never reordered or deduplicated.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Kind of workflow step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StepKind {
    PlanStart,
    AgentStart,
    AgentEnd,
    ToolCall,
    LlmCall,
    Handoff,
    Error,
    /// Any tag this client does not know about, kept verbatim
    Other(String),
}

impl StepKind {
    /// Parse a step tag; accepts both `agent_start` and `agent-start` spellings
    pub fn from_tag(tag: &str) -> Self {
        match tag.replace('-', "_").as_str() {
            "plan_start" => StepKind::PlanStart,
            "agent_start" => StepKind::AgentStart,
            "agent_end" => StepKind::AgentEnd,
            "tool_call" => StepKind::ToolCall,
            "llm_call" => StepKind::LlmCall,
            "handoff" => StepKind::Handoff,
            "error" => StepKind::Error,
            _ => {
                debug!(%tag, "StepKind::from_tag: unknown tag");
                StepKind::Other(tag.to_string())
            }
        }
    }

    /// Wire tag for this kind
    pub fn as_tag(&self) -> &str {
        match self {
            StepKind::PlanStart => "plan_start",
            StepKind::AgentStart => "agent_start",
            StepKind::AgentEnd => "agent_end",
            StepKind::ToolCall => "tool_call",
            StepKind::LlmCall => "llm_call",
            StepKind::Handoff => "handoff",
            StepKind::Error => "error",
            StepKind::Other(tag) => tag,
        }
    }
}

impl Default for StepKind {
    fn default() -> Self {
        StepKind::Other("unknown".to_string())
    }
}

impl From<String> for StepKind {
    fn from(tag: String) -> Self {
        StepKind::from_tag(&tag)
    }
}

impl From<StepKind> for String {
    fn from(kind: StepKind) -> Self {
        kind.as_tag().to_string()
    }
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_tag())
    }
}

/// One observed unit of agent activity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    #[serde(rename = "type", default)]
    pub kind: StepKind,

    /// Display text
    #[serde(default)]
    pub message: String,

    /// Wall time the step took, when the backend reports it
    #[serde(
        rename = "duration",
        alias = "durationSeconds",
        alias = "duration_seconds",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub duration_seconds: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,

    /// Agent output (agent_end)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,

    /// Handoff context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// Prompt preview sent to the model (llm_call)
    #[serde(
        rename = "prompt",
        alias = "promptMessages",
        alias = "prompt_messages",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub prompt_messages: Option<Vec<serde_json::Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,

    #[serde(alias = "toolInput", default, skip_serializing_if = "Option::is_none")]
    pub tool_input: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

impl WorkflowStep {
    /// Create a bare step of the given kind
    pub fn new(kind: StepKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            ..Default::default()
        }
    }

    /// Build a step from a decoded `workflow_step` payload
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Reported duration; negative or non-finite values are dropped
    pub fn duration(&self) -> Option<Duration> {
        self.duration_seconds
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }
}
