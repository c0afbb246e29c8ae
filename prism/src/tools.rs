use anyhow::{Context, bail};
use llm::messages::unified::{ToolCall, ToolDefinition, UnifiedMessage};
use serde::Deserialize;
use serde_json::json;

pub(crate) const CALCULATOR_NAME: &str = "calculator";

pub(crate) fn calculator() -> ToolDefinition {
    ToolDefinition {
        name: CALCULATOR_NAME.to_string(),
        description: "A simple calculator that performs basic arithmetic operations.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "operation": {
                    "type": "string",
                    "enum": ["add", "subtract", "multiply", "divide"],
                    "description": "The arithmetic operation to perform."
                },
                "operand1": {
                    "type": "number",
                    "description": "The first operand."
                },
                "operand2": {
                    "type": "number",
                    "description": "The second operand."
                }
            },
            "required": ["operation", "operand1", "operand2"]
        }),
    }
}

#[derive(Debug, Deserialize)]
struct CalculatorArguments {
    operation: String,
    operand1: f64,
    operand2: f64,
}

/// Run a calculator call and wrap the result as a tool message answering it.
///
/// Malformed arguments are a user-facing error: the adapter only guarantees
/// faithful fragment concatenation, not that the model produced valid JSON.
pub(crate) fn execute_calculator(call: &ToolCall) -> anyhow::Result<UnifiedMessage> {
    let arguments: CalculatorArguments =
        serde_json::from_str(&call.function.arguments).context("calculator arguments were not valid JSON")?;

    let result = match arguments.operation.as_str() {
        "add" => arguments.operand1 + arguments.operand2,
        "subtract" => arguments.operand1 - arguments.operand2,
        "multiply" => arguments.operand1 * arguments.operand2,
        "divide" => {
            if arguments.operand2 == 0.0 {
                bail!("Cannot divide by zero.");
            }

            arguments.operand1 / arguments.operand2
        }
        other => bail!("Unsupported operation: {other}"),
    };

    Ok(UnifiedMessage::tool(format!("{result:?}"), call.id.clone()))
}
