use std::{
    io::{self, Write},
    path::Path,
};

use anyhow::Context;
use futures::StreamExt;
use llm::{
    Client, StreamAccumulator,
    messages::unified::{ChatRole, UnifiedMessage, UnifiedRequest},
    registry,
};
use secrecy::SecretString;

use crate::{args::Args, tools};

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

pub(crate) async fn run(args: Args) -> anyhow::Result<()> {
    let config = load_config(&args)?;

    let model = match args.model.clone().or_else(|| config.default_model.clone()) {
        Some(model) => model,
        None => prompt("Enter the model name (e.g. 'gpt-4o-mini'): ")?,
    };

    // Fails fast on unknown models, before any credential is requested.
    let family = registry::resolve_family(&model)?;

    let provider_config = config.provider(family.name());

    let api_key: SecretString = match args.api_key.clone() {
        Some(key) if !key.is_empty() => key.into(),
        _ => match provider_config.and_then(|provider| provider.api_key.clone()) {
            Some(key) => key,
            None => {
                let entered = prompt(&format!("Enter your {} API key: ", family.name()))?;

                if entered.is_empty() {
                    anyhow::bail!("API key cannot be empty");
                }

                entered.into()
            }
        },
    };

    let mut client = Client::new(api_key);

    if let Some(base_url) = provider_config.and_then(|provider| provider.base_url.clone()) {
        client = client.with_base_url(base_url);
    }

    let temperature = args.temperature.or(config.default_temperature).unwrap_or(1.0);

    let system = {
        let entered = prompt("Enter system instructions or leave blank for default: ")?;

        if entered.is_empty() {
            DEFAULT_SYSTEM_PROMPT.to_string()
        } else {
            entered
        }
    };

    let tools = vec![tools::calculator()];
    let mut conversation = vec![UnifiedMessage::system(system)];
    let streaming = !args.no_stream;

    loop {
        // While the tail of the conversation is an unanswered tool result,
        // the model speaks next; don't prompt the user.
        let awaiting_model = matches!(conversation.last(), Some(message) if message.role == ChatRole::Tool);

        if !awaiting_model {
            let user_message = prompt("\nYou: ")?;

            if user_message.is_empty() {
                continue;
            }

            if matches!(user_message.to_lowercase().as_str(), "exit" | "quit") {
                println!("Exiting the chat.");
                return Ok(());
            }

            conversation.push(UnifiedMessage::user(user_message));
        }

        let mut request = UnifiedRequest::new(model.clone(), conversation.clone());
        request.temperature = temperature;
        request.tools = Some(tools.clone());
        request.reasoning_effort = args.reasoning_effort.map(Into::into);
        request.cached = args.cached.clone();

        let turn = if streaming {
            handle_stream(&client, request, &mut conversation).await
        } else {
            handle_response(&client, request, &mut conversation).await
        };

        if let Err(e) = turn {
            eprintln!("An error occurred during chat: {e}");
            return Ok(());
        }
    }
}

fn load_config(args: &Args) -> anyhow::Result<config::Config> {
    match &args.config {
        Some(path) => {
            config::Config::load(path).with_context(|| format!("failed to load configuration from {}", path.display()))
        }
        None => {
            let default = Path::new("prism.toml");

            if default.exists() {
                Ok(config::Config::load(default)?)
            } else {
                Ok(config::Config::default())
            }
        }
    }
}

/// Drain a streaming turn: print deltas as they arrive, feed every chunk to
/// the accumulator, and finish the turn from the message it assembles.
async fn handle_stream(
    client: &Client,
    request: UnifiedRequest,
    conversation: &mut Vec<UnifiedMessage>,
) -> anyhow::Result<()> {
    let mut stream = client.completions_stream(request).await?;
    let mut accumulator = StreamAccumulator::new();

    let mut printed_reasoning_label = false;
    let mut printed_assistant_label = false;
    let mut completed = None;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;

        if let Some(choice) = chunk.choices.first() {
            if let Some(reasoning) = choice.delta.reasoning_content.as_deref()
                && !reasoning.is_empty()
            {
                if !printed_reasoning_label {
                    print!("\nAssistant reasoning: ");
                    printed_reasoning_label = true;
                }

                print!("{reasoning}");
                io::stdout().flush()?;
            }

            if let Some(content) = choice.delta.content.as_deref()
                && !content.is_empty()
            {
                if !printed_assistant_label {
                    if printed_reasoning_label {
                        println!();
                    }

                    print!("\nAssistant: ");
                    printed_assistant_label = true;
                }

                print!("{content}");
                io::stdout().flush()?;
            }
        }

        if let Some(message) = accumulator.push(&chunk)? {
            completed = Some(message);
        }
    }

    println!();

    let message = completed.context("the stream ended without a finish signal")?;

    finish_turn(message, conversation)
}

async fn handle_response(
    client: &Client,
    request: UnifiedRequest,
    conversation: &mut Vec<UnifiedMessage>,
) -> anyhow::Result<()> {
    let response = client.completions(request).await?;

    let message = response
        .choices
        .into_iter()
        .next()
        .context("the response contained no choices")?
        .message;

    if let Some(reasoning) = message.reasoning_content.as_deref() {
        println!("\nAssistant reasoning: {reasoning}");
    }

    if !message.content.is_empty() {
        println!("\nAssistant: {}", message.content);
    }

    finish_turn(message, conversation)
}

/// Append the assistant turn and answer any calculator calls it made.
fn finish_turn(message: UnifiedMessage, conversation: &mut Vec<UnifiedMessage>) -> anyhow::Result<()> {
    conversation.push(message.clone());

    for call in message.tool_calls.as_deref().unwrap_or_default() {
        if call.function.name == tools::CALCULATOR_NAME {
            let result = tools::execute_calculator(call)?;
            conversation.push(result);
        }
    }

    Ok(())
}

fn prompt(label: &str) -> anyhow::Result<String> {
    print!("{label}");
    io::stdout().flush().context("failed to flush stdout")?;

    let mut line = String::new();

    if io::stdin().read_line(&mut line).context("failed to read stdin")? == 0 {
        anyhow::bail!("stdin closed");
    }

    Ok(line.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm::messages::unified::{FunctionCall, ToolCall, ToolCallType};

    #[test]
    fn a_tool_call_turn_appends_assistant_and_tool_messages() {
        let mut conversation = vec![
            UnifiedMessage::system(DEFAULT_SYSTEM_PROMPT),
            UnifiedMessage::user("2+3?"),
        ];

        let assistant = UnifiedMessage {
            role: ChatRole::Assistant,
            content: String::new(),
            reasoning_content: None,
            tool_calls: Some(vec![ToolCall {
                id: "call_1".to_string(),
                kind: ToolCallType::Function,
                function: FunctionCall {
                    name: tools::CALCULATOR_NAME.to_string(),
                    arguments: r#"{"operation":"add","operand1":2,"operand2":3}"#.to_string(),
                },
            }]),
            tool_call_id: None,
        };

        finish_turn(assistant, &mut conversation).unwrap();

        assert_eq!(conversation.len(), 4);
        assert_eq!(conversation[2].role, ChatRole::Assistant);

        let tool_message = &conversation[3];
        assert_eq!(tool_message.role, ChatRole::Tool);
        assert_eq!(tool_message.content, "5.0");
        assert_eq!(tool_message.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn turns_without_tool_calls_only_append_the_assistant_message() {
        let mut conversation = vec![UnifiedMessage::user("hello")];

        finish_turn(UnifiedMessage::assistant("Hi there."), &mut conversation).unwrap();

        assert_eq!(conversation.len(), 2);
        assert_eq!(conversation[1].content, "Hi there.");
    }

    #[tokio::test]
    async fn a_scripted_tool_call_response_appends_the_calculator_result() {
        use axum::{Json, Router, routing::post};
        use serde_json::json;

        async fn handle() -> Json<serde_json::Value> {
            Json(json!({
                "id": "chatcmpl-1",
                "model": "gpt-4o-mini",
                "choices": [{
                    "index": 0,
                    "message": {
                        "role": "assistant",
                        "content": "",
                        "tool_calls": [{
                            "id": "call_1",
                            "type": "function",
                            "function": {
                                "name": "calculator",
                                "arguments": "{\"operation\":\"add\",\"operand1\":2,\"operand2\":3}"
                            }
                        }]
                    },
                    "finish_reason": "tool_calls"
                }]
            }))
        }

        let app = Router::new().route("/chat/completions", post(handle));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = Client::new("test-key".to_string()).with_base_url(format!("http://{address}"));

        let mut conversation = vec![UnifiedMessage::user("2+3?")];

        let mut request = UnifiedRequest::new("gpt-4o-mini", conversation.clone());
        request.tools = Some(vec![tools::calculator()]);

        handle_response(&client, request, &mut conversation).await.unwrap();

        assert_eq!(conversation.len(), 3);
        assert_eq!(conversation[1].role, ChatRole::Assistant);
        assert_eq!(
            conversation[1].tool_calls.as_ref().unwrap()[0].function.name,
            tools::CALCULATOR_NAME
        );

        let tool_message = &conversation[2];
        assert_eq!(tool_message.role, ChatRole::Tool);
        assert_eq!(tool_message.content, "5.0");
        assert_eq!(tool_message.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn unknown_tools_are_left_unanswered() {
        let mut conversation = Vec::new();

        let assistant = UnifiedMessage {
            role: ChatRole::Assistant,
            content: String::new(),
            reasoning_content: None,
            tool_calls: Some(vec![ToolCall {
                id: "call_2".to_string(),
                kind: ToolCallType::Function,
                function: FunctionCall {
                    name: "web_search".to_string(),
                    arguments: "{}".to_string(),
                },
            }]),
            tool_call_id: None,
        };

        finish_turn(assistant, &mut conversation).unwrap();

        assert_eq!(conversation.len(), 1);
    }
}
