//! History repair for interrupted tool calls
//!
//! A checkpoint can be taken between "the assistant requested tool calls"
//! and "the results were recorded": a crash mid-dispatch, or an approval
//! gate that paused the turn and was never resolved before the next human
//! message. Model providers reject a history where a tool call has no
//! answer, so before every reasoning call the history is repaired: any
//! call left unanswered gets a placeholder observation telling the model
//! the action was interrupted.

use std::collections::HashSet;

use tracing::debug;

use crate::message::{Message, Role};

/// Observation synthesized for a tool call that was interrupted before
/// its result was recorded.
pub const INTERRUPTED_PLACEHOLDER: &str =
    "Error: the previous action was interrupted. Please try again or rephrase your request.";

/// Produce a history where every assistant tool call has a matching
/// tool result.
///
/// Real results are kept in place; placeholders for missing ids are
/// appended after them, in the order the calls were declared. The
/// transform is idempotent: placeholders are ordinary tool results, so a
/// second pass finds every call answered.
pub fn sanitize_history(messages: &[Message]) -> Vec<Message> {
    let mut out = Vec::with_capacity(messages.len());
    let mut i = 0;

    while i < messages.len() {
        let msg = &messages[i];
        out.push(msg.clone());
        i += 1;

        if !msg.requests_tools() {
            continue;
        }

        let mut answered: HashSet<&str> = HashSet::new();
        while i < messages.len() && messages[i].role == Role::ToolResult {
            if let Some(id) = messages[i].tool_call_id.as_deref() {
                answered.insert(id);
            }
            out.push(messages[i].clone());
            i += 1;
        }

        for call in &msg.tool_calls {
            if !answered.contains(call.id.as_str()) {
                debug!(call_id = %call.id, tool = %call.name, "repairing unanswered tool call");
                out.push(Message::tool_result(INTERRUPTED_PLACEHOLDER, &call.id));
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ToolCall;
    use proptest::prelude::*;
    use serde_json::json;

    fn call(id: &str) -> ToolCall {
        ToolCall::new(id, "lookup_policy", json!({}))
    }

    #[test]
    fn test_complete_history_unchanged() {
        let history = vec![
            Message::human("hi"),
            Message::assistant("").with_tool_calls(vec![call("a")]),
            Message::tool_result("ok", "a"),
            Message::assistant("done"),
        ];
        assert_eq!(sanitize_history(&history), history);
    }

    #[test]
    fn test_missing_result_gets_placeholder() {
        let history = vec![
            Message::human("hi"),
            Message::assistant("").with_tool_calls(vec![call("a"), call("b")]),
            Message::tool_result("ok", "a"),
        ];
        let repaired = sanitize_history(&history);
        assert_eq!(repaired.len(), 4);
        let last = &repaired[3];
        assert_eq!(last.role, Role::ToolResult);
        assert_eq!(last.tool_call_id.as_deref(), Some("b"));
        assert_eq!(last.content, INTERRUPTED_PLACEHOLDER);
    }

    #[test]
    fn test_placeholders_follow_declaration_order() {
        let history = vec![Message::assistant("").with_tool_calls(vec![
            call("x"),
            call("y"),
            call("z"),
        ])];
        let repaired = sanitize_history(&history);
        let ids: Vec<&str> = repaired[1..]
            .iter()
            .filter_map(|m| m.tool_call_id.as_deref())
            .collect();
        assert_eq!(ids, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_interrupted_before_human_follow_up() {
        // Pause point history: the gated call was never answered and the
        // user sent a new message instead of resolving the approval.
        let history = vec![
            Message::human("email bob"),
            Message::assistant("").with_tool_calls(vec![ToolCall::new(
                "g1",
                "send_email",
                json!({"to": "bob"}),
            )]),
            Message::human("never mind, what's our refund policy?"),
        ];
        let repaired = sanitize_history(&history);
        assert_eq!(repaired.len(), 4);
        assert_eq!(repaired[2].tool_call_id.as_deref(), Some("g1"));
        assert_eq!(repaired[2].content, INTERRUPTED_PLACEHOLDER);
        assert_eq!(repaired[3].role, Role::Human);
    }

    #[test]
    fn test_idempotent_on_repaired_history() {
        let history = vec![
            Message::human("hi"),
            Message::assistant("").with_tool_calls(vec![call("a"), call("b")]),
        ];
        let once = sanitize_history(&history);
        let twice = sanitize_history(&once);
        assert_eq!(once, twice);
    }

    // Strategy for arbitrary histories mixing answered, unanswered and
    // interleaved messages.
    fn arb_history() -> impl Strategy<Value = Vec<Message>> {
        prop::collection::vec(
            prop_oneof![
                Just(0u8), // human
                Just(1u8), // assistant with text
                Just(2u8), // assistant with 1-3 calls
                Just(3u8), // answer most recent call, if any
            ],
            0..20,
        )
        .prop_map(|kinds| {
            let mut history = Vec::new();
            let mut open_calls: Vec<String> = Vec::new();
            let mut counter = 0usize;
            for kind in kinds {
                match kind {
                    0 => history.push(Message::human("msg")),
                    1 => {
                        open_calls.clear();
                        history.push(Message::assistant("text"));
                    }
                    2 => {
                        open_calls.clear();
                        let n = counter % 3 + 1;
                        let calls: Vec<ToolCall> = (0..n)
                            .map(|k| {
                                let id = format!("c{counter}-{k}");
                                open_calls.push(id.clone());
                                ToolCall::new(id, "lookup_policy", json!({}))
                            })
                            .collect();
                        history.push(Message::assistant("").with_tool_calls(calls));
                    }
                    _ => {
                        if let Some(id) = open_calls.pop() {
                            history.push(Message::tool_result("ok", id));
                        }
                    }
                }
                counter += 1;
            }
            history
        })
    }

    proptest! {
        #[test]
        fn prop_sanitize_idempotent(history in arb_history()) {
            let once = sanitize_history(&history);
            let twice = sanitize_history(&once);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_sanitize_complete(history in arb_history()) {
            let repaired = sanitize_history(&history);
            for (i, msg) in repaired.iter().enumerate() {
                if msg.requests_tools() {
                    let following: Vec<&str> = repaired[i + 1..]
                        .iter()
                        .take_while(|m| m.role == Role::ToolResult)
                        .filter_map(|m| m.tool_call_id.as_deref())
                        .collect();
                    for call in &msg.tool_calls {
                        let answers =
                            following.iter().filter(|id| **id == call.id).count();
                        prop_assert_eq!(answers, 1, "call {} answered {} times", call.id, answers);
                    }
                }
            }
        }

        #[test]
        fn prop_sanitize_preserves_original_order(history in arb_history()) {
            let repaired = sanitize_history(&history);
            let original_ids: Vec<&str> =
                history.iter().map(|m| m.id.as_str()).collect();
            let surviving: Vec<&str> = repaired
                .iter()
                .map(|m| m.id.as_str())
                .filter(|id| original_ids.contains(id))
                .collect();
            prop_assert_eq!(original_ids, surviving);
        }
    }
}
