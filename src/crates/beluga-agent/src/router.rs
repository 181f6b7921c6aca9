//! Post-reasoning routing decision
//!
//! After each reasoning step the router inspects the state and picks the
//! next node. It is a pure function of the state plus fixed configuration;
//! the decision order below is load-bearing and mirrors the conversational
//! contract: finish first, respect the rate limit, gate sensitive actions
//! before anything else runs, delegate pure search batches, otherwise
//! execute directly.

use crate::config::AgentConfig;
use crate::state::ThreadState;

/// Where the turn goes after a reasoning step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    /// Terminate the turn
    End,
    /// Execute the pending tool calls directly
    Tools,
    /// Pause for approval, then execute only gated capabilities
    ToolsGated,
    /// Hand the batch to the self-correcting search sub-workflow
    Delegate,
}

/// The routing decision table, fixed at startup.
#[derive(Debug, Clone)]
pub struct Router {
    gated_tools: Vec<String>,
    delegated_tool: String,
    max_tool_results: usize,
}

impl Router {
    pub fn new(config: &AgentConfig) -> Self {
        Self {
            gated_tools: config.gated_tools.clone(),
            delegated_tool: config.delegated_tool.clone(),
            max_tool_results: config.max_tool_results,
        }
    }

    /// Decide the next node. Rules, in order:
    ///
    /// 1. Last message is not an assistant message with tool calls → end.
    /// 2. Tool-observation count reached the rate limit → end, even with
    ///    calls pending.
    /// 3. Any call names a gated capability → gated execution. Gated
    ///    precedence over a mixed batch is deliberate: a sensitive action
    ///    must never execute as a side effect of unrelated calls.
    /// 4. Every call names the delegated search capability → delegate.
    /// 5. Otherwise → direct execution.
    pub fn route(&self, state: &ThreadState) -> Next {
        let Some(last) = state.last_message() else {
            return Next::End;
        };
        if !last.requests_tools() {
            return Next::End;
        }
        if state.tool_result_count() >= self.max_tool_results {
            return Next::End;
        }
        if last
            .tool_calls
            .iter()
            .any(|call| self.gated_tools.iter().any(|g| g == &call.name))
        {
            return Next::ToolsGated;
        }
        if last
            .tool_calls
            .iter()
            .all(|call| call.name == self.delegated_tool)
        {
            return Next::Delegate;
        }
        Next::Tools
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Message, ToolCall};
    use crate::state::{StateUpdate, ThreadState};
    use beluga_graph::GraphState;
    use serde_json::json;

    fn router() -> Router {
        Router::new(&AgentConfig::default())
    }

    fn state_with(messages: Vec<Message>) -> ThreadState {
        let mut state = ThreadState::default();
        state.apply(StateUpdate::messages(messages));
        state
    }

    fn call(id: &str, name: &str) -> ToolCall {
        ToolCall::new(id, name, json!({}))
    }

    #[test]
    fn test_plain_assistant_reply_ends() {
        let state = state_with(vec![Message::human("hi"), Message::assistant("hello")]);
        assert_eq!(router().route(&state), Next::End);
    }

    #[test]
    fn test_empty_state_ends() {
        assert_eq!(router().route(&ThreadState::default()), Next::End);
    }

    #[test]
    fn test_generic_calls_go_to_tools() {
        let state = state_with(vec![
            Message::assistant("").with_tool_calls(vec![call("a", "lookup_policy")]),
        ]);
        assert_eq!(router().route(&state), Next::Tools);
    }

    #[test]
    fn test_gated_call_goes_to_gate() {
        let state = state_with(vec![
            Message::assistant("").with_tool_calls(vec![call("a", "send_email")]),
        ]);
        assert_eq!(router().route(&state), Next::ToolsGated);
    }

    #[test]
    fn test_mixed_batch_gated_takes_precedence() {
        let state = state_with(vec![Message::assistant("").with_tool_calls(vec![
            call("a", "lookup_policy"),
            call("b", "send_email"),
            call("c", "search_records"),
        ])]);
        assert_eq!(router().route(&state), Next::ToolsGated);
    }

    #[test]
    fn test_all_search_calls_delegate() {
        let state = state_with(vec![Message::assistant("").with_tool_calls(vec![
            call("a", "search_records"),
            call("b", "search_records"),
        ])]);
        assert_eq!(router().route(&state), Next::Delegate);
    }

    #[test]
    fn test_partial_search_batch_goes_to_tools() {
        let state = state_with(vec![Message::assistant("").with_tool_calls(vec![
            call("a", "search_records"),
            call("b", "lookup_policy"),
        ])]);
        assert_eq!(router().route(&state), Next::Tools);
    }

    #[test]
    fn test_rate_limit_forces_end() {
        let mut messages: Vec<Message> = (0..10)
            .map(|i| Message::tool_result("ok", format!("c{i}")))
            .collect();
        messages.push(Message::assistant("").with_tool_calls(vec![
            call("x", "lookup_policy"),
            call("y", "send_email"),
        ]));
        let state = state_with(messages);
        assert_eq!(router().route(&state), Next::End);
    }

    #[test]
    fn test_route_is_deterministic() {
        let state = state_with(vec![
            Message::assistant("").with_tool_calls(vec![call("a", "search_records")]),
        ]);
        let r = router();
        let first = r.route(&state);
        for _ in 0..5 {
            assert_eq!(r.route(&state), first);
        }
    }
}
