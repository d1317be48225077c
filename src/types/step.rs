use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    Thinking,
    CodeExecution,
    ToolCallStart,
    ToolCallEnd,
    ModuleStart,
    ModuleEnd,
    LmCallStart,
    LmCallEnd,
    #[serde(alias = "lm_call")]
    LlmCall,
    SubLlmCall,
    Complete,
    Error,
}

impl StepType {
    pub const ALL: [StepType; 12] = [
        StepType::Thinking,
        StepType::CodeExecution,
        StepType::ToolCallStart,
        StepType::ToolCallEnd,
        StepType::ModuleStart,
        StepType::ModuleEnd,
        StepType::LmCallStart,
        StepType::LmCallEnd,
        StepType::LlmCall,
        StepType::SubLlmCall,
        StepType::Complete,
        StepType::Error,
    ];

    pub fn wire_name(self) -> &'static str {
        match self {
            StepType::Thinking => "thinking",
            StepType::CodeExecution => "code_execution",
            StepType::ToolCallStart => "tool_call_start",
            StepType::ToolCallEnd => "tool_call_end",
            StepType::ModuleStart => "module_start",
            StepType::ModuleEnd => "module_end",
            StepType::LmCallStart => "lm_call_start",
            StepType::LmCallEnd => "lm_call_end",
            StepType::LlmCall => "llm_call",
            StepType::SubLlmCall => "sub_llm_call",
            StepType::Complete => "complete",
            StepType::Error => "error",
        }
    }
}

/// One observed unit of execution, as streamed by the backend.
///
/// Steps are never edited after they are received; the session only appends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(
        default,
        deserialize_with = "deserialize_step_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<i64>,
    #[serde(rename = "type")]
    pub kind: StepType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(
        default,
        rename = "parent_id",
        alias = "parentId",
        deserialize_with = "deserialize_step_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub parent_id: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: Map<String, Value>,
}

impl Step {
    pub fn new(kind: StepType) -> Self {
        Self {
            id: None,
            kind,
            content: None,
            output: None,
            parent_id: None,
            metadata: Map::new(),
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_parent(mut self, parent_id: i64) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn model(&self) -> Option<&str> {
        self.metadata_str("model")
    }

    /// Tool name; emitters use both `tool_name` and `tool`.
    pub fn tool_name(&self) -> Option<&str> {
        self.metadata_str("tool_name")
            .or_else(|| self.metadata_str("tool"))
            .filter(|name| !name.is_empty())
    }

    pub fn module_name(&self) -> Option<&str> {
        self.metadata_str("module")
    }

    pub fn args(&self) -> Option<&str> {
        self.metadata_str("args")
    }

    pub fn elapsed_secs(&self) -> Option<f64> {
        self.metadata.get("time").and_then(Value::as_f64)
    }

    pub fn tokens(&self) -> Option<u64> {
        self.metadata.get("tokens").and_then(Value::as_u64)
    }

    pub fn cost(&self) -> Option<f64> {
        self.metadata.get("cost").and_then(Value::as_f64)
    }

    fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }
}

fn deserialize_step_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(i64),
        Text(String),
    }

    match Option::<RawId>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawId::Number(id)) => Ok(Some(id)),
        Some(RawId::Text(text)) => text.trim().parse::<i64>().map(Some).map_err(|_| {
            serde::de::Error::custom(format!("step id must be an integer, got '{text}'"))
        }),
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_backend_step_with_snake_case_parent() {
        let step: Step = serde_json::from_value(json!({
            "id": 4,
            "parent_id": 2,
            "type": "code_execution",
            "content": "print(len(context))",
            "output": "1024",
            "metadata": {"time": 0.25}
        }))
        .unwrap();

        assert_eq!(step.id, Some(4));
        assert_eq!(step.parent_id, Some(2));
        assert_eq!(step.kind, StepType::CodeExecution);
        assert_eq!(step.elapsed_secs(), Some(0.25));
    }

    #[test]
    fn accepts_camel_case_parent_and_numeric_string_ids() {
        let step: Step = serde_json::from_value(json!({
            "id": "7",
            "parentId": "3",
            "type": "thinking"
        }))
        .unwrap();

        assert_eq!(step.id, Some(7));
        assert_eq!(step.parent_id, Some(3));
        assert!(step.metadata.is_empty());
    }

    #[test]
    fn null_fields_are_absent() {
        let step: Step = serde_json::from_value(json!({
            "id": null,
            "parent_id": null,
            "type": "tool_call_end",
            "metadata": null
        }))
        .unwrap();

        assert_eq!(step.id, None);
        assert_eq!(step.parent_id, None);
        assert!(step.content.is_none());
        assert!(step.metadata.is_empty());
    }

    #[test]
    fn rejects_non_numeric_id_and_unknown_type() {
        assert!(serde_json::from_value::<Step>(json!({"id": "abc", "type": "thinking"})).is_err());
        assert!(serde_json::from_value::<Step>(json!({"type": "telepathy"})).is_err());
    }

    #[test]
    fn lm_call_alias_maps_to_llm_call() {
        let step: Step = serde_json::from_value(json!({"type": "lm_call"})).unwrap();
        assert_eq!(step.kind, StepType::LlmCall);
    }

    #[test]
    fn wire_names_match_serde_names() {
        for kind in StepType::ALL {
            let encoded = serde_json::to_value(kind).unwrap();
            assert_eq!(encoded, json!(kind.wire_name()));
        }
    }

    #[test]
    fn tool_name_prefers_tool_name_key() {
        let mut step = Step::new(StepType::ToolCallStart);
        step.metadata.insert("tool".to_string(), json!("execute_python"));
        assert_eq!(step.tool_name(), Some("execute_python"));

        step.metadata.insert("tool_name".to_string(), json!("llm_query"));
        assert_eq!(step.tool_name(), Some("llm_query"));
    }
}
