use crate::error::CoreError;
use crate::transfer::Direction;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const ACTION_NAMES: [&str; 4] = ["navigate", "search", "copy", "question"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "params", rename_all = "snake_case")]
pub enum ActionRequest {
    Navigate {
        path: String,
    },
    Search {
        query: String,
    },
    Copy {
        source: String,
        destination: String,
        direction: Direction,
    },
    Question {
        text: String,
    },
}

impl ActionRequest {
    pub fn name(&self) -> &'static str {
        match self {
            ActionRequest::Navigate { .. } => "navigate",
            ActionRequest::Search { .. } => "search",
            ActionRequest::Copy { .. } => "copy",
            ActionRequest::Question { .. } => "question",
        }
    }
}

/// Exactly one JSON object; surrounding prose or code fences are rejected.
pub fn parse_action(raw: &str) -> Result<ActionRequest, CoreError> {
    let parse_err = |reason: String| CoreError::Parse {
        reason,
        raw: raw.to_string(),
    };
    let value: Value =
        serde_json::from_str(raw).map_err(|e| parse_err(e.to_string()))?;
    let name = value
        .as_object()
        .ok_or_else(|| parse_err("expected a JSON object".to_string()))?
        .get("action")
        .and_then(Value::as_str)
        .ok_or_else(|| parse_err("missing \"action\" field".to_string()))?
        .to_string();
    if !ACTION_NAMES.contains(&name.as_str()) {
        return Err(CoreError::UnknownAction(name));
    }
    serde_json::from_value(value).map_err(|e| parse_err(e.to_string()))
}
