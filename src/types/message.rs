use super::step::Step;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

/// One server-to-client message on the execution channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Step(Step),
    Final { answer: String },
    Error { error: String },
}

#[derive(Debug, Error)]
pub enum MessageParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("message matches neither step, final nor error shape: {0}")]
    UnknownShape(String),
}

/// Why a run ended in the error state.
///
/// All variants collapse to the same observable status; the variant is kept
/// for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamFailure {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("malformed message: {0}")]
    Malformed(String),
    #[error("backend error: {0}")]
    Backend(String),
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum TaggedMessage {
    Step { step: Step },
    Final { answer: String },
}

impl ServerMessage {
    pub fn parse(text: &str) -> Result<Self, MessageParseError> {
        let value: Value = serde_json::from_str(text)?;
        let Some(object) = value.as_object() else {
            return Err(MessageParseError::UnknownShape(shape_hint(&value)));
        };

        match object.get("error") {
            Some(Value::Null) | None => {}
            Some(Value::String(error)) => {
                return Ok(ServerMessage::Error {
                    error: error.clone(),
                })
            }
            Some(other) => {
                return Ok(ServerMessage::Error {
                    error: other.to_string(),
                })
            }
        }

        match object.get("type").and_then(Value::as_str) {
            Some("step") | Some("final") => {}
            _ => return Err(MessageParseError::UnknownShape(shape_hint(&value))),
        }

        Ok(match serde_json::from_value::<TaggedMessage>(value)? {
            TaggedMessage::Step { step } => ServerMessage::Step(step),
            TaggedMessage::Final { answer } => ServerMessage::Final { answer },
        })
    }
}

fn shape_hint(value: &Value) -> String {
    match value {
        Value::Object(object) => {
            let keys: Vec<&str> = object.keys().map(String::as_str).collect();
            format!("object with keys [{}]", keys.join(", "))
        }
        Value::Array(_) => "array".to_string(),
        Value::String(_) => "string".to_string(),
        Value::Number(_) => "number".to_string(),
        Value::Bool(_) => "bool".to_string(),
        Value::Null => "null".to_string(),
    }
}

/// Client-to-server initiation message, sent once per channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteRequest {
    pub query: String,
    pub context: String,
    pub enable_sub_llm: bool,
}

impl ExecuteRequest {
    pub fn new(query: impl Into<String>, context: impl Into<String>, enable_sub_llm: bool) -> Self {
        Self {
            query: query.into(),
            context: context.into(),
            enable_sub_llm,
        }
    }

    /// The backend reads `enable_sub_llm`; `enableSubLlm` is the client-side
    /// name and is sent as well so either reader sees the flag.
    pub fn to_wire(&self) -> Value {
        json!({
            "query": self.query,
            "context": self.context,
            "enable_sub_llm": self.enable_sub_llm,
            "enableSubLlm": self.enable_sub_llm,
        })
    }
}
