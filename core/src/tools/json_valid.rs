use crate::tools::extract_string_arg;
use crate::traits::Tool;
use async_trait::async_trait;
use serde_json::json;

/// Lets the model check JSON it produced before relying on it.
pub struct JsonValidTool;

#[async_trait]
impl Tool for JsonValidTool {
    fn name(&self) -> &str {
        "json_is_valid"
    }

    fn description(&self) -> &str {
        "Check if the input string is valid JSON. Returns true or false."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "s": {
                    "type": "string",
                    "description": "The string to check"
                }
            },
            "required": ["s"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<serde_json::Value> {
        let s = extract_string_arg(&args, "s")?;
        let valid = serde_json::from_str::<serde_json::Value>(&s).is_ok();
        Ok(json!(valid))
    }
}
