//! Bounded conversation transcript (§4.4.2 step 2)
//!
//! A round-aware pruning rule, not a blunt message-count trim: every `user`
//! message is kept forever, and only the most recent `K` tool-exchange
//! rounds (one tool-calling assistant message plus the tool-result messages
//! it produced) survive. This operates at the prompt-assembly layer, distinct
//! from any storage-side history limit a conversation store might keep.

use crate::core::types::{Message, Role};

const DEFAULT_KEEP_ROUNDS: usize = 6;

pub struct Transcript {
    messages: Vec<Message>,
    next_id: u64,
    keep_rounds: usize,
}

impl Transcript {
    pub fn new(keep_rounds: usize) -> Self {
        Self {
            messages: Vec::new(),
            next_id: 1,
            keep_rounds: if keep_rounds == 0 { DEFAULT_KEEP_ROUNDS } else { keep_rounds },
        }
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn push_user(&mut self, content: impl Into<String>, timestamp: u64) {
        let id = self.next_id();
        self.messages.push(Message::user(id, content, timestamp));
    }

    pub fn push_assistant(
        &mut self,
        content: impl Into<String>,
        tool_calls: Vec<crate::core::types::ToolCall>,
        timestamp: u64,
    ) {
        let id = self.next_id();
        self.messages.push(Message::assistant(id, content, tool_calls, timestamp));
    }

    pub fn push_tool_result(
        &mut self,
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
        timestamp: u64,
    ) {
        let id = self.next_id();
        self.messages
            .push(Message::tool_result(id, tool_call_id, tool_name, content, timestamp));
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Drops older tool-exchange rounds in place, keeping the most recent
    /// `keep_rounds` and every `user`-role message regardless of position.
    pub fn prune(&mut self) {
        let units = group_into_units(&self.messages);
        let round_count = units.iter().filter(|u| u.is_round).count();
        let drop_before = round_count.saturating_sub(self.keep_rounds);

        let mut kept = Vec::with_capacity(self.messages.len());
        let mut rounds_seen = 0;
        for unit in units {
            if unit.is_round {
                rounds_seen += 1;
                if rounds_seen <= drop_before {
                    continue;
                }
            }
            kept.extend(unit.messages);
        }
        self.messages = kept;
    }
}

struct Unit {
    is_round: bool,
    messages: Vec<Message>,
}

/// Groups a flat message list into standalone units (one `user` or tool-call-free
/// `assistant` message) and round units (a tool-calling `assistant` message plus
/// the consecutive `tool`-role messages that follow it).
fn group_into_units(messages: &[Message]) -> Vec<Unit> {
    let mut units = Vec::new();
    let mut i = 0;
    while i < messages.len() {
        let msg = &messages[i];
        if msg.role == Role::Assistant && msg.has_tool_calls() {
            let mut round = vec![msg.clone()];
            let mut j = i + 1;
            while j < messages.len() && messages[j].role == Role::Tool {
                round.push(messages[j].clone());
                j += 1;
            }
            units.push(Unit { is_round: true, messages: round });
            i = j;
        } else {
            units.push(Unit { is_round: false, messages: vec![msg.clone()] });
            i += 1;
        }
    }
    units
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ToolCall;
    use serde_json::json;

    fn tool_call() -> ToolCall {
        ToolCall::new("c1", "take_snapshot", json!({}))
    }

    #[test]
    fn prune_keeps_all_user_messages() {
        let mut t = Transcript::new(1);
        t.push_user("first", 0);
        for i in 0..5 {
            t.push_assistant("", vec![tool_call()], i);
            t.push_tool_result("c1", "take_snapshot", "ok", i);
        }
        t.push_user("second", 10);
        t.prune();
        let user_count = t.messages().iter().filter(|m| m.role == Role::User).count();
        assert_eq!(user_count, 2);
    }

    #[test]
    fn prune_drops_rounds_beyond_k() {
        let mut t = Transcript::new(2);
        for i in 0..5 {
            t.push_assistant("", vec![tool_call()], i);
            t.push_tool_result("c1", "take_snapshot", format!("snap-{}", i), i);
        }
        t.prune();
        let tool_msgs: Vec<&Message> = t.messages().iter().filter(|m| m.role == Role::Tool).collect();
        assert_eq!(tool_msgs.len(), 2);
        assert_eq!(tool_msgs[0].content, "snap-3");
        assert_eq!(tool_msgs[1].content, "snap-4");
    }

    #[test]
    fn standalone_assistant_messages_are_never_dropped() {
        let mut t = Transcript::new(1);
        for i in 0..3 {
            t.push_assistant("", vec![tool_call()], i);
            t.push_tool_result("c1", "take_snapshot", "ok", i);
        }
        t.push_assistant("final answer", vec![], 9);
        t.prune();
        assert!(t.messages().iter().any(|m| m.content == "final answer"));
    }
}
