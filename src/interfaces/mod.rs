//! External interfaces (§6): the inbound command / outbound event shapes
//! the core is driven by and reports through. The chat UI, scheduler, and
//! storage backend that produce/consume these are out of scope (§1).

use serde::{Deserialize, Serialize};

/// Commands the core is driven by, from the out-of-scope UI/scheduler layer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InboundCommand {
    /// LLM-only, no tools — delegated to a trivial chat handler outside the core
    #[serde(rename = "CHAT")]
    Chat { prompt: String, #[serde(rename = "conversationId")] conversation_id: Option<String> },
    #[serde(rename = "AGENT_RUN")]
    AgentRun { prompt: String, #[serde(rename = "conversationId")] conversation_id: Option<String> },
    #[serde(rename = "RESEARCH_RUN")]
    ResearchRun { prompt: String, #[serde(rename = "conversationId")] conversation_id: Option<String> },
    /// Sets the cooperative-cancellation flag; acknowledges immediately
    #[serde(rename = "AGENT_STOP")]
    AgentStop {},
}

/// Events the core emits asynchronously while an `AGENT_RUN`/`RESEARCH_RUN` is in flight
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutboundEvent {
    #[serde(rename = "agent_progress")]
    AgentProgress { text: String, #[serde(rename = "conversationId")] conversation_id: Option<String> },
    #[serde(rename = "agent_done")]
    AgentDone { #[serde(rename = "conversationId")] conversation_id: Option<String> },
    #[serde(rename = "agent_error")]
    AgentError { error: String, #[serde(rename = "conversationId")] conversation_id: Option<String> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_run_round_trips_through_json() {
        let cmd = InboundCommand::AgentRun { prompt: "search youtube".into(), conversation_id: Some("c1".into()) };
        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains("AGENT_RUN"));
        let parsed: InboundCommand = serde_json::from_str(&json).unwrap();
        match parsed {
            InboundCommand::AgentRun { prompt, .. } => assert_eq!(prompt, "search youtube"),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn agent_stop_has_no_fields() {
        let json = serde_json::to_string(&InboundCommand::AgentStop {}).unwrap();
        assert!(json.contains("AGENT_STOP"));
    }

    #[test]
    fn outbound_progress_serializes_with_tag() {
        let event = OutboundEvent::AgentProgress { text: "Navigating...".into(), conversation_id: None };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("agent_progress"));
        assert!(json.contains("Navigating"));
    }
}
