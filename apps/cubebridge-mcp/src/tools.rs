//! # Tool Catalog
//!
//! Argument types and descriptors for the tools the server advertises.
//! Input schemas are generated from the argument structs, so the schema a
//! client sees and the shape the dispatcher accepts come from one place.

use crate::config::ToolSet;
use crate::protocol::RpcError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, json};

pub const QUERY_TOOL: &str = "query_semantic_layer";
pub const SCHEMA_TOOL: &str = "get_schema_metadata";
pub const SUGGEST_TOOL: &str = "suggest_analysis";

// =============================================================================
// ARGUMENTS
// =============================================================================

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct QueryArgs {
    /// Structured Cube query (measures, dimensions, timeDimensions, filters, order, limit).
    #[schemars(
        description = "Structured Cube query with measures, dimensions, timeDimensions, filters, order and limit",
        with = "Option<serde_json::Map<String, Value>>"
    )]
    #[serde(default)]
    pub query: Option<Value>,

    /// Plain-language question; compiled into a query when `query` is absent.
    /// An explicit `null` counts as present and empty.
    #[schemars(
        description = "Natural language description of what you want to analyze",
        with = "Option<String>"
    )]
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
}

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct SchemaArgs {
    /// Restrict the answer to one cube.
    #[schemars(description = "Specific cube name to get metadata for (optional)")]
    #[serde(default)]
    pub cube_name: Option<String>,
}

#[derive(Debug, Default, Deserialize, schemars::JsonSchema)]
pub struct SuggestArgs {
    /// Question to tailor suggestions to.
    #[schemars(description = "Business question or area of interest")]
    #[serde(default)]
    pub business_question: Option<String>,
}

/// Keeps `Some(None)` for an explicit null, which plain `Option` folds into `None`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Decode `tools/call` arguments; a missing or null object means no arguments.
pub fn parse_args<T: DeserializeOwned>(arguments: Option<&Value>) -> Result<T, RpcError> {
    match arguments {
        None | Some(Value::Null) => serde_json::from_value(json!({})),
        Some(value) if value.is_object() => serde_json::from_value(value.clone()),
        Some(_) => {
            return Err(RpcError::InvalidParams(
                "arguments must be an object".to_string(),
            ));
        }
    }
    .map_err(|e| RpcError::InvalidParams(e.to_string()))
}

// =============================================================================
// DESCRIPTORS
// =============================================================================

/// One entry of the `tools/list` answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

/// The advertised tools, built once per process.
#[derive(Debug, Clone)]
pub struct ToolCatalog {
    tools: Vec<ToolDescriptor>,
    listing: Value,
}

impl ToolCatalog {
    pub fn new(set: ToolSet) -> Self {
        let mut tools = vec![query_descriptor(), schema_descriptor()];
        if set == ToolSet::Full {
            tools.push(suggest_descriptor());
        }
        let listing = json!({ "tools": tools });
        Self { tools, listing }
    }

    /// Result object of `tools/list`. Identical on every call.
    pub fn listing(&self) -> &Value {
        &self.listing
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.iter().any(|tool| tool.name == name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|tool| tool.name).collect()
    }
}

fn query_descriptor() -> ToolDescriptor {
    let mut input_schema = input_schema::<QueryArgs>();
    if let Some(object) = input_schema.as_object_mut() {
        object.insert(
            "anyOf".to_string(),
            json!([{"required": ["query"]}, {"required": ["description"]}]),
        );
    }
    ToolDescriptor {
        name: QUERY_TOOL,
        description: "Execute queries against the Cube.dev semantic layer. Pass either a \
                      structured Cube query or a natural language description, which is \
                      translated into a query over the cities, sales and customers cubes.",
        input_schema,
    }
}

fn schema_descriptor() -> ToolDescriptor {
    ToolDescriptor {
        name: SCHEMA_TOOL,
        description: "Get metadata about available cubes, measures and dimensions in the \
                      semantic layer.",
        input_schema: input_schema::<SchemaArgs>(),
    }
}

fn suggest_descriptor() -> ToolDescriptor {
    ToolDescriptor {
        name: SUGGEST_TOOL,
        description: "Suggest relevant analyses and queries based on a business question \
                      and the available data.",
        input_schema: input_schema::<SuggestArgs>(),
    }
}

/// Draft-07 schema of `T` without the `$schema` and `title` keys.
fn input_schema<T: schemars::JsonSchema>() -> Value {
    let root = schemars::schema_for!(T);
    let mut schema = serde_json::to_value(root).unwrap_or_else(|_| json!({"type": "object"}));
    if let Some(object) = schema.as_object_mut() {
        object.remove("$schema");
        object.remove("title");
    }
    schema
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_set_has_three_tools() {
        let catalog = ToolCatalog::new(ToolSet::Full);
        assert_eq!(catalog.names(), vec![QUERY_TOOL, SCHEMA_TOOL, SUGGEST_TOOL]);
    }

    #[test]
    fn reduced_set_drops_suggestions() {
        let catalog = ToolCatalog::new(ToolSet::Reduced);
        assert!(catalog.contains(QUERY_TOOL));
        assert!(catalog.contains(SCHEMA_TOOL));
        assert!(!catalog.contains(SUGGEST_TOOL));
    }

    #[test]
    fn schemas_are_objects_with_properties() {
        let catalog = ToolCatalog::new(ToolSet::Full);
        for tool in catalog.listing()["tools"].as_array().expect("tools") {
            assert_eq!(tool["inputSchema"]["type"], "object");
            assert!(tool["inputSchema"]["properties"].is_object());
            assert!(tool["inputSchema"].get("$schema").is_none());
        }
    }

    #[test]
    fn query_schema_requires_one_of_two() {
        let schema = query_descriptor().input_schema;
        assert!(schema["properties"]["query"].is_object());
        assert!(schema["properties"]["description"].is_object());
        assert_eq!(schema["anyOf"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn null_description_is_present_but_empty() {
        let args: QueryArgs =
            parse_args(Some(&json!({"description": null}))).expect("args");
        assert_eq!(args.description, Some(None));

        let args: QueryArgs = parse_args(Some(&json!({}))).expect("args");
        assert_eq!(args.description, None);
    }

    #[test]
    fn non_object_arguments_rejected() {
        let err = parse_args::<SchemaArgs>(Some(&json!([1, 2]))).expect_err("array");
        assert!(matches!(err, RpcError::InvalidParams(_)));

        let err = parse_args::<SchemaArgs>(Some(&json!({"cube_name": 7}))).expect_err("type");
        assert!(matches!(err, RpcError::InvalidParams(_)));
    }

    #[test]
    fn missing_arguments_mean_defaults() {
        let args: SuggestArgs = parse_args(None).expect("args");
        assert!(args.business_question.is_none());
    }
}
