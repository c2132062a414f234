//! Task-success detection over test-runner output.
//!
//! [`PytestHeuristic`] is a substring heuristic over unstructured text, not a
//! report parser. It is case-sensitive for `FAIL`/`ERROR` but lower-cases the
//! text before looking for `no tests ran`, and it only understands pytest's
//! English `collected N items` line. Output in other locales or formats will
//! not be recognized as a pass.

use crate::traits::ToolResult;
use serde_json::Value;

/// The `{success, result}` view of a task-defining tool result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskOutcome {
    pub success: bool,
    pub text: String,
}

impl TaskOutcome {
    pub fn new(success: bool, text: impl Into<String>) -> Self {
        Self {
            success,
            text: text.into(),
        }
    }

    /// Unwraps a dispatcher envelope. When the tool itself returned a
    /// `{success, result}` mapping, both success flags must hold and the text
    /// is the tool's `result` (or `error`).
    pub fn from_tool_result(result: &ToolResult) -> Self {
        let Some(value) = &result.result else {
            return Self::new(false, result.error.clone().unwrap_or_default());
        };

        match value {
            Value::String(text) => Self::new(result.success, text.clone()),
            Value::Object(map) => {
                let inner_success = map.get("success").and_then(Value::as_bool).unwrap_or(true);
                let text = match map.get("result").or_else(|| map.get("error")) {
                    Some(Value::String(text)) => text.clone(),
                    Some(other) => other.to_string(),
                    None => value.to_string(),
                };
                Self::new(result.success && inner_success, text)
            }
            other => Self::new(result.success, other.to_string()),
        }
    }
}

pub trait TerminationDetector: Send + Sync {
    fn evaluate(&self, outcome: &TaskOutcome) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PytestHeuristic;

impl TerminationDetector for PytestHeuristic {
    fn evaluate(&self, outcome: &TaskOutcome) -> bool {
        let text = outcome.text.as_str();
        outcome.success
            && !text.contains("FAIL")
            && !text.contains("ERROR")
            && !text.to_lowercase().contains("no tests ran")
            && collected_count(text).is_some_and(|n| n > 0)
    }
}

/// Item count from `collected N items`: the text after the first `collected`
/// is cut at the first `items` (the whole remainder when absent) and the last
/// whitespace token parsed as an integer. Counts beyond `i64` saturate.
pub fn collected_count(text: &str) -> Option<i64> {
    let (_, after) = text.split_once("collected")?;
    let before_items = after.split_once("items").map_or(after, |(head, _)| head);
    parse_count(before_items.split_whitespace().last()?)
}

/// Decimal integer with optional sign and `_` digit separators.
fn parse_count(token: &str) -> Option<i64> {
    let (negative, digits) = match token.as_bytes().first()? {
        b'-' => (true, &token[1..]),
        b'+' => (false, &token[1..]),
        _ => (false, token),
    };
    if digits.is_empty()
        || digits.starts_with('_')
        || digits.ends_with('_')
        || digits.contains("__")
        || !digits.bytes().all(|b| b.is_ascii_digit() || b == b'_')
    {
        return None;
    }

    let mut value: i64 = 0;
    for digit in digits.bytes().filter(u8::is_ascii_digit) {
        let digit = i64::from(digit - b'0');
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add(digit))
            .unwrap_or(i64::MAX);
    }
    Some(if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn passes(success: bool, text: &str) -> bool {
        PytestHeuristic.evaluate(&TaskOutcome::new(success, text))
    }

    #[test]
    fn collected_items_pass() {
        let output = "============ test session starts ============\n\
                      collected 3 items\n\n\
                      test_web.py ...                       [100%]\n\n\
                      ============ 3 passed in 0.02s ============";
        assert!(passes(true, output));
    }

    #[test]
    fn zero_items_fail() {
        assert!(!passes(true, "collected 0 items"));
    }

    #[test]
    fn missing_collected_fails_regardless_of_flag() {
        assert!(!passes(true, "3 passed in 0.01s"));
        assert!(!passes(false, "3 passed in 0.01s"));
    }

    #[test]
    fn fail_anywhere_fails() {
        assert!(!passes(true, "collected 4 items\nFAILED test_web.py::test_goto"));
        assert!(!passes(true, "collected 4 items\nERROR collecting test_web.py"));
    }

    #[test]
    fn unsuccessful_result_fails() {
        assert!(!passes(false, "collected 3 items"));
    }

    #[test]
    fn case_asymmetry_is_preserved() {
        assert!(passes(true, "collected 2 items\n2 passed, 1 failed-looking word: fail"));
        assert!(!passes(true, "collected 2 items\nNO TESTS RAN"));
    }

    #[test]
    fn count_parsing() {
        assert_eq!(collected_count("collected 12 items / 2 deselected"), Some(12));
        assert_eq!(collected_count("collected 1 item"), None);
        assert_eq!(collected_count("collected 5"), Some(5));
        assert_eq!(collected_count("collected many items"), None);
        assert_eq!(collected_count("collected items"), None);
        assert_eq!(collected_count("nothing here"), None);
        assert_eq!(collected_count("collected +4 items"), Some(4));
        assert_eq!(collected_count("collected 1_000 items"), Some(1000));
        assert_eq!(collected_count("collected 1__0 items"), None);
        assert_eq!(collected_count("collected -3 items"), Some(-3));
    }

    #[test]
    fn oversized_counts_still_pass() {
        let huge = "collected 123456789012345678901234567890 items";
        assert_eq!(collected_count(huge), Some(i64::MAX));
        assert!(passes(true, huge));
        assert_eq!(collected_count("collected 000000000000000000000000 items"), Some(0));
    }

    #[test]
    fn outcome_from_nested_tool_mapping() {
        let envelope = ToolResult::success(json!({
            "success": true,
            "result": "collected 3 items\n3 passed",
        }));
        let outcome = TaskOutcome::from_tool_result(&envelope);
        assert_eq!(outcome, TaskOutcome::new(true, "collected 3 items\n3 passed"));
        assert!(PytestHeuristic.evaluate(&outcome));

        let envelope = ToolResult::success(json!({"success": false, "error": "pytest not found"}));
        let outcome = TaskOutcome::from_tool_result(&envelope);
        assert!(!outcome.success);
        assert_eq!(outcome.text, "pytest not found");

        let outcome = TaskOutcome::from_tool_result(&ToolResult::error("Tool 'x' not found"));
        assert!(!outcome.success);
    }
}
