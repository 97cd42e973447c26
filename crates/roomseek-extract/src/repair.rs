//! Recovery of a JSON object from loosely formatted model output.

use roomseek_core::{Error, Result};
use serde::Serialize;
use serde_json::Value;

/// How an object was recovered when the raw text did not parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairStrategy {
    /// The first balanced `{...}` span inside surrounding text.
    BalancedObject,
    /// Truncated output closed by appending this many `}`.
    ClosedBraces(usize),
}

/// Parse model output as a JSON object, repairing it if needed.
///
/// Returns the object and the repair applied, `None` when the text parsed
/// directly.
pub fn parse_model_output(text: &str) -> Result<(Value, Option<RepairStrategy>)> {
    let text = text.trim();
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(text) {
        return Ok((value, None));
    }

    let start = text
        .find('{')
        .ok_or_else(|| Error::MalformedOutput("no JSON object in output".into()))?;
    let candidate = &text[start..];

    match scan_object(candidate) {
        Scan::Balanced(end) => {
            let value = parse_object(&candidate[..end])?;
            Ok((value, Some(RepairStrategy::BalancedObject)))
        }
        Scan::Unclosed(missing) => {
            let mut repaired = candidate.to_string();
            repaired.push_str(&"}".repeat(missing));
            let value = parse_object(&repaired)?;
            Ok((value, Some(RepairStrategy::ClosedBraces(missing))))
        }
    }
}

fn parse_object(text: &str) -> Result<Value> {
    match serde_json::from_str::<Value>(text) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(_) => Err(Error::MalformedOutput("output is not a JSON object".into())),
        Err(e) => Err(Error::MalformedOutput(e.to_string())),
    }
}

enum Scan {
    /// Byte length of the balanced object.
    Balanced(usize),
    /// Number of braces left open at end of text.
    Unclosed(usize),
}

/// Walk `text` (starting at `{`) tracking brace depth outside string literals.
fn scan_object(text: &str) -> Scan {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Scan::Balanced(i + 1);
                }
            }
            _ => {}
        }
    }

    Scan::Unclosed(depth)
}
