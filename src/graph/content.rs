//! Typed views over the raw `content` payload of the built-in node kinds.
//!
//! Every field is optional or defaulted: the editor writes partially filled
//! content while a node is being configured, and a missing field must never
//! turn an otherwise valid node into malformed content.

use crate::error::ContentError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Parses a raw content payload into the typed view `T`.
///
/// `null` content is treated as an empty object so that freshly created nodes
/// parse into their defaults.
pub fn parse_content<T: DeserializeOwned>(kind: &str, content: &Value) -> Result<T, ContentError> {
    let value = match content {
        Value::Null => Value::Object(Map::new()),
        other => other.clone(),
    };
    serde_json::from_value(value).map_err(|e| ContentError::malformed(kind, e))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExecutionMode {
    #[default]
    Single,
    Loop,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HitPolicy {
    #[default]
    First,
    Collect,
}

/// Input/output mapping shared by expression, decision table and decision nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingOptions {
    #[serde(default)]
    pub input_field: Option<String>,
    #[serde(default)]
    pub output_path: Option<String>,
    #[serde(default)]
    pub pass_through: Option<bool>,
    #[serde(default)]
    pub execution_mode: Option<ExecutionMode>,
}

impl MappingOptions {
    pub fn input_field(&self) -> Option<&str> {
        non_blank(self.input_field.as_deref())
    }

    pub fn output_path(&self) -> Option<&str> {
        non_blank(self.output_path.as_deref())
    }

    pub fn pass_through(&self) -> bool {
        self.pass_through.unwrap_or(false)
    }

    pub fn is_loop(&self) -> bool {
        self.execution_mode == Some(ExecutionMode::Loop)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionContent {
    #[serde(default)]
    pub expressions: Vec<ExpressionRow>,
    #[serde(flatten)]
    pub mapping: MappingOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpressionRow {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionTableContent {
    #[serde(default)]
    pub hit_policy: Option<HitPolicy>,
    #[serde(default)]
    pub inputs: Vec<TableColumn>,
    #[serde(default)]
    pub outputs: Vec<TableColumn>,
    #[serde(default)]
    pub rules: Vec<Map<String, Value>>,
    #[serde(flatten)]
    pub mapping: MappingOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableColumn {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub field: Option<String>,
}

impl DecisionTableContent {
    /// The cell of `rule` under the column `column_id`, ignoring blank cells.
    pub fn cell<'a>(rule: &'a Map<String, Value>, column_id: &str) -> Option<&'a str> {
        non_blank(rule.get(column_id).and_then(Value::as_str))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchContent {
    #[serde(default)]
    pub hit_policy: Option<HitPolicy>,
    #[serde(default)]
    pub statements: Vec<SwitchStatement>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwitchStatement {
    pub id: String,
    #[serde(default)]
    pub condition: Option<String>,
}

/// Function nodes store either the bare source text or `{ "source": ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FunctionContent {
    Source(String),
    Wrapped {
        #[serde(default)]
        source: String,
    },
}

impl FunctionContent {
    pub fn source(&self) -> &str {
        match self {
            FunctionContent::Source(source) | FunctionContent::Wrapped { source } => source,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionContent {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(flatten)]
    pub mapping: MappingOptions,
}

/// Content of request/response nodes: an optional JSON Schema document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaContent {
    #[serde(default)]
    pub schema: Option<String>,
}

impl SchemaContent {
    /// The parsed schema document, if one is present and is valid JSON.
    pub fn schema_document(&self) -> Option<Value> {
        non_blank(self.schema.as_deref()).and_then(|s| serde_json::from_str(s).ok())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomContent {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub config: Option<Value>,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}
