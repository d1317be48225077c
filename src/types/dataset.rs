use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A random task from the backend's benchmark datasets, used to pre-fill a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSample {
    #[serde(default)]
    pub id: Option<String>,
    pub query: String,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub dataset: Option<String>,
    #[serde(default, rename = "hasContext")]
    pub has_context: bool,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub split: Option<String>,
    #[serde(default, rename = "hasContext")]
    pub has_context: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetList {
    pub datasets: Vec<DatasetInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sample_parses_backend_shape() {
        let sample: DatasetSample = serde_json::from_value(json!({
            "query": "Who wrote it?",
            "context": "long text",
            "answer": "B",
            "dataset": "longbench_v2",
            "hasContext": true,
            "metadata": {"domain": "qa"}
        }))
        .unwrap();

        assert_eq!(sample.dataset.as_deref(), Some("longbench_v2"));
        assert!(sample.has_context);
        assert_eq!(sample.id, None);
    }

    #[test]
    fn list_tolerates_missing_optional_fields() {
        let list: DatasetList = serde_json::from_value(json!({
            "datasets": [{"name": "LongBench-v2"}, {"name": "x", "split": "test"}]
        }))
        .unwrap();

        assert_eq!(list.datasets.len(), 2);
        assert_eq!(list.datasets[1].split.as_deref(), Some("test"));
        assert!(list.datasets[0].description.is_none());
    }
}
