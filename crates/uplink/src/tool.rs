//! Tool declarations and the wire-ready descriptor builder.
//!
//! Callers declare tools as a name-keyed map of [`ToolSchema`] values;
//! [`build_tools`] validates the whole set and lowers it to the flat
//! [`ToolDescriptor`] list transports dispatch. The build is atomic:
//! one bad declaration fails the entire set and nothing is dispatched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::InvokeError;

/// A caller-declared tool, keyed by name in [`InvocationConfig::tools`].
///
/// [`InvocationConfig::tools`]: crate::request::InvocationConfig::tools
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    /// What the tool does, shown to the model.
    pub description: String,
    /// JSON Schema for the tool's arguments. Must be an object schema.
    pub parameters: Value,
}

impl ToolSchema {
    /// Declares a tool with the given description and parameter schema.
    pub fn new(description: impl Into<String>, parameters: Value) -> Self {
        Self {
            description: description.into(),
            parameters,
        }
    }
}

/// A validated, wire-ready tool definition handed to transports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool name. Restricted to `[A-Za-z0-9_-]`.
    pub name: String,
    /// What the tool does.
    pub description: String,
    /// JSON Schema object for the tool's arguments.
    pub parameters: Value,
}

fn valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Validates and lowers a tool map into dispatch-ready descriptors.
///
/// Descriptors come out in the map's key order. Any invalid entry
/// fails the whole build with a config-kind error; no partial set is
/// ever produced.
pub fn build_tools(tools: &BTreeMap<String, ToolSchema>) -> Result<Vec<ToolDescriptor>, InvokeError> {
    let mut descriptors = Vec::with_capacity(tools.len());
    for (name, schema) in tools {
        if !valid_name(name) {
            return Err(InvokeError::Config(format!(
                "invalid tool name '{name}': must be non-empty and contain only letters, digits, '_' or '-'"
            )));
        }
        if schema.description.is_empty() {
            return Err(InvokeError::Config(format!(
                "tool '{name}' has an empty description"
            )));
        }
        let is_object_schema = schema
            .parameters
            .as_object()
            .and_then(|o| o.get("type"))
            .and_then(Value::as_str)
            == Some("object");
        if !is_object_schema {
            return Err(InvokeError::Config(format!(
                "tool '{name}' parameters must be a JSON Schema with \"type\": \"object\""
            )));
        }
        descriptors.push(ToolDescriptor {
            name: name.clone(),
            description: schema.description.clone(),
            parameters: schema.parameters.clone(),
        });
    }
    Ok(descriptors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object_schema() -> Value {
        json!({
            "type": "object",
            "properties": { "query": { "type": "string" } },
            "required": ["query"]
        })
    }

    #[test]
    fn test_build_valid_tools_in_key_order() {
        let mut tools = BTreeMap::new();
        tools.insert("web_search".to_string(), ToolSchema::new("Search the web", object_schema()));
        tools.insert("calculator".to_string(), ToolSchema::new("Evaluate math", object_schema()));

        let descriptors = build_tools(&tools).unwrap();
        let names: Vec<_> = descriptors.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["calculator", "web_search"]);
        assert_eq!(descriptors[0].description, "Evaluate math");
    }

    #[test]
    fn test_empty_map_builds_empty_set() {
        assert_eq!(build_tools(&BTreeMap::new()).unwrap(), vec![]);
    }

    #[test]
    fn test_rejects_empty_name() {
        let mut tools = BTreeMap::new();
        tools.insert(String::new(), ToolSchema::new("does things", object_schema()));
        let err = build_tools(&tools).unwrap_err();
        assert!(matches!(err, InvokeError::Config(_)));
        assert!(err.message().contains("invalid tool name"));
    }

    #[test]
    fn test_rejects_name_with_spaces() {
        let mut tools = BTreeMap::new();
        tools.insert("web search".to_string(), ToolSchema::new("does things", object_schema()));
        let err = build_tools(&tools).unwrap_err();
        assert!(err.message().contains("'web search'"));
    }

    #[test]
    fn test_rejects_empty_description() {
        let mut tools = BTreeMap::new();
        tools.insert("lookup".to_string(), ToolSchema::new("", object_schema()));
        let err = build_tools(&tools).unwrap_err();
        assert!(err.message().contains("empty description"));
    }

    #[test]
    fn test_rejects_non_object_parameters() {
        let mut tools = BTreeMap::new();
        tools.insert("lookup".to_string(), ToolSchema::new("finds things", json!("not a schema")));
        let err = build_tools(&tools).unwrap_err();
        assert!(err.message().contains("\"type\": \"object\""));

        tools.insert("lookup".to_string(), ToolSchema::new("finds things", json!({"type": "array"})));
        assert!(build_tools(&tools).is_err());
    }

    #[test]
    fn test_build_is_atomic() {
        let mut tools = BTreeMap::new();
        tools.insert("good".to_string(), ToolSchema::new("fine", object_schema()));
        tools.insert("z bad".to_string(), ToolSchema::new("broken name", object_schema()));
        // The valid entry sorts first but the bad one still fails the set.
        assert!(build_tools(&tools).is_err());
    }
}
