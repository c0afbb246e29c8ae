//! Reassembly of streamed assistant turns.

use crate::{
    error::LlmError,
    messages::unified::{
        ChatRole, FunctionCall, StreamingToolCall, ToolCall, ToolCallType, UnifiedChunk, UnifiedMessage,
    },
};

/// Rebuilds one assistant turn from the chunks of a streaming response.
///
/// Tool calls are tracked as an ordered builder list keyed by position, with
/// an explicit pointer to the currently open builder: a `Start` fragment
/// appends a builder and repoints, an argument fragment appends to the
/// pointed-at builder. Ids play no role in routing fragments, since an id
/// may arrive in the same fragment as the first piece of its arguments.
///
/// On the chunk carrying `finish_reason`, the builders freeze into immutable
/// [`ToolCall`] values, the completed message is returned, and all state is
/// discarded; accumulation never spans turns.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    content: String,
    reasoning_content: String,
    builders: Vec<ToolCallBuilder>,
    open: Option<usize>,
}

#[derive(Debug)]
struct ToolCallBuilder {
    id: String,
    name: String,
    arguments: String,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one chunk into the turn. Returns the completed assistant message
    /// when the chunk carries `finish_reason`, `None` otherwise.
    pub fn push(&mut self, chunk: &UnifiedChunk) -> crate::Result<Option<UnifiedMessage>> {
        let Some(choice) = chunk.choices.first() else {
            return Ok(None);
        };

        if let Some(text) = &choice.delta.reasoning_content {
            self.reasoning_content.push_str(text);
        }

        if let Some(text) = &choice.delta.content {
            self.content.push_str(text);
        }

        for call in choice.delta.tool_calls.as_deref().unwrap_or_default() {
            match call {
                StreamingToolCall::Start { id, function, .. } => {
                    self.builders.push(ToolCallBuilder {
                        id: id.clone(),
                        name: function.name.clone(),
                        arguments: function.arguments.clone(),
                    });
                    self.open = Some(self.builders.len() - 1);
                }
                StreamingToolCall::Delta { function, .. } => {
                    let Some(builder) = self.open.and_then(|index| self.builders.get_mut(index)) else {
                        return Err(LlmError::StreamProtocol(
                            "tool argument fragment arrived before any tool call was started".to_string(),
                        ));
                    };

                    builder.arguments.push_str(&function.arguments);
                }
            }
        }

        if choice.finish_reason.is_some() {
            Ok(Some(self.finish()))
        } else {
            Ok(None)
        }
    }

    fn finish(&mut self) -> UnifiedMessage {
        let content = std::mem::take(&mut self.content);
        let reasoning_content = std::mem::take(&mut self.reasoning_content);
        let builders = std::mem::take(&mut self.builders);
        self.open = None;

        let tool_calls: Vec<ToolCall> = builders
            .into_iter()
            .map(|builder| ToolCall {
                id: builder.id,
                kind: ToolCallType::Function,
                function: FunctionCall {
                    name: builder.name,
                    arguments: builder.arguments,
                },
            })
            .collect();

        UnifiedMessage {
            role: ChatRole::Assistant,
            content,
            reasoning_content: (!reasoning_content.is_empty()).then_some(reasoning_content),
            tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
            tool_call_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::unified::{
        FinishReason, FunctionDelta, FunctionStart, UnifiedChoiceDelta, UnifiedMessageDelta,
    };

    fn chunk(delta: UnifiedMessageDelta, finish_reason: Option<FinishReason>) -> UnifiedChunk {
        UnifiedChunk {
            id: "chunk".to_string(),
            model: "test-model".to_string(),
            choices: vec![UnifiedChoiceDelta {
                index: 0,
                delta,
                finish_reason,
            }],
            usage: None,
        }
    }

    fn start(index: usize, id: &str, name: &str) -> StreamingToolCall {
        StreamingToolCall::Start {
            index,
            id: id.to_string(),
            kind: ToolCallType::Function,
            function: FunctionStart {
                name: name.to_string(),
                arguments: String::new(),
            },
        }
    }

    fn fragment(index: usize, arguments: &str) -> StreamingToolCall {
        StreamingToolCall::Delta {
            index,
            function: FunctionDelta {
                arguments: arguments.to_string(),
            },
        }
    }

    fn tool_delta(call: StreamingToolCall) -> UnifiedMessageDelta {
        UnifiedMessageDelta {
            tool_calls: Some(vec![call]),
            ..Default::default()
        }
    }

    #[test]
    fn reassembles_fragmented_arguments_in_arrival_order() {
        let mut accumulator = StreamAccumulator::new();

        assert!(
            accumulator
                .push(&chunk(tool_delta(start(0, "a", "calculator")), None))
                .unwrap()
                .is_none()
        );
        assert!(
            accumulator
                .push(&chunk(tool_delta(fragment(0, r#"{"operation":"add","#)), None))
                .unwrap()
                .is_none()
        );
        assert!(
            accumulator
                .push(&chunk(tool_delta(fragment(0, r#""operand1":2,"operand2":3}"#)), None))
                .unwrap()
                .is_none()
        );

        let message = accumulator
            .push(&chunk(UnifiedMessageDelta::default(), Some(FinishReason::ToolCalls)))
            .unwrap()
            .expect("terminal chunk completes the turn");

        let calls = message.tool_calls.as_ref().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "a");
        assert_eq!(calls[0].function.name, "calculator");
        assert_eq!(
            calls[0].function.arguments,
            r#"{"operation":"add","operand1":2,"operand2":3}"#
        );

        let parsed: serde_json::Value = serde_json::from_str(&calls[0].function.arguments).unwrap();
        assert_eq!(parsed["operation"], "add");
        assert_eq!(parsed["operand1"], 2);
        assert_eq!(parsed["operand2"], 3);
    }

    #[test]
    fn a_new_start_repoints_fragment_routing() {
        let mut accumulator = StreamAccumulator::new();

        accumulator.push(&chunk(tool_delta(start(0, "a", "first")), None)).unwrap();
        accumulator.push(&chunk(tool_delta(fragment(0, "{}")), None)).unwrap();
        accumulator.push(&chunk(tool_delta(start(1, "b", "second")), None)).unwrap();
        accumulator.push(&chunk(tool_delta(fragment(1, r#"{"x":1}"#)), None)).unwrap();

        let message = accumulator
            .push(&chunk(UnifiedMessageDelta::default(), Some(FinishReason::ToolCalls)))
            .unwrap()
            .unwrap();

        let calls = message.tool_calls.as_ref().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].function.arguments, "{}");
        assert_eq!(calls[1].function.arguments, r#"{"x":1}"#);
    }

    #[test]
    fn orphan_fragment_is_a_protocol_violation() {
        let mut accumulator = StreamAccumulator::new();

        let err = accumulator
            .push(&chunk(tool_delta(fragment(0, "{")), None))
            .unwrap_err();

        assert!(matches!(err, LlmError::StreamProtocol(_)));
    }

    #[test]
    fn content_and_reasoning_accumulate_separately() {
        let mut accumulator = StreamAccumulator::new();

        let reasoning = UnifiedMessageDelta {
            reasoning_content: Some("Two plus three. ".to_string()),
            ..Default::default()
        };
        let answer = UnifiedMessageDelta {
            content: Some("The answer is 5.".to_string()),
            ..Default::default()
        };

        accumulator.push(&chunk(reasoning, None)).unwrap();
        accumulator.push(&chunk(answer, None)).unwrap();

        let message = accumulator
            .push(&chunk(UnifiedMessageDelta::default(), Some(FinishReason::Stop)))
            .unwrap()
            .unwrap();

        assert_eq!(message.role, ChatRole::Assistant);
        assert_eq!(message.content, "The answer is 5.");
        assert_eq!(message.reasoning_content.as_deref(), Some("Two plus three. "));
        assert!(message.tool_calls.is_none());
    }

    #[test]
    fn state_resets_after_a_turn_completes() {
        let mut accumulator = StreamAccumulator::new();

        let first = UnifiedMessageDelta {
            content: Some("first turn".to_string()),
            ..Default::default()
        };
        accumulator.push(&chunk(first, None)).unwrap();
        accumulator
            .push(&chunk(UnifiedMessageDelta::default(), Some(FinishReason::Stop)))
            .unwrap()
            .unwrap();

        let second = UnifiedMessageDelta {
            content: Some("second turn".to_string()),
            ..Default::default()
        };
        accumulator.push(&chunk(second, None)).unwrap();

        let message = accumulator
            .push(&chunk(UnifiedMessageDelta::default(), Some(FinishReason::Stop)))
            .unwrap()
            .unwrap();

        assert_eq!(message.content, "second turn");
        assert!(message.tool_calls.is_none());
    }
}
