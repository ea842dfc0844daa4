//! Typed argument schemas for tools.

use serde::Serialize;
use serde_json::{json, Map, Value};

/// Semantic type of a single tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamKind {
    /// JSON-schema type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.as_f64().is_some_and(|n| n.fract() == 0.0),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }
}

impl std::fmt::Display for ParamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A declared tool parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub description: String,
    pub required: bool,
}

/// Ordered parameter list of a tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ToolSchema {
    pub params: Vec<ParamSpec>,
}

impl ToolSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(self, name: &str, kind: ParamKind, description: &str) -> Self {
        self.param(name, kind, description, true)
    }

    pub fn optional(self, name: &str, kind: ParamKind, description: &str) -> Self {
        self.param(name, kind, description, false)
    }

    fn param(mut self, name: &str, kind: ParamKind, description: &str, required: bool) -> Self {
        self.params.push(ParamSpec {
            name: name.to_string(),
            kind,
            description: description.to_string(),
            required,
        });
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Check `args` against the schema.
    ///
    /// Arguments must be a JSON object; every required parameter must be
    /// present and non-null, every present parameter must be declared and of
    /// the declared kind. Optional parameters may be `null`.
    pub fn validate(&self, args: &Value) -> Result<(), String> {
        let Some(obj) = args.as_object() else {
            return Err(format!("expected a JSON object, got {}", json_type(args)));
        };

        for param in self.params.iter().filter(|p| p.required) {
            match obj.get(&param.name) {
                None | Some(Value::Null) => {
                    return Err(format!("missing required field '{}'", param.name));
                }
                Some(_) => {}
            }
        }

        for (key, value) in obj {
            let Some(param) = self.get(key) else {
                return Err(format!("unexpected field '{}'", key));
            };
            if value.is_null() && !param.required {
                continue;
            }
            if !param.kind.matches(value) {
                return Err(format!(
                    "field '{}' must be {}, got {}",
                    key,
                    param.kind,
                    json_type(value)
                ));
            }
        }

        Ok(())
    }

    /// Render as a JSON-schema object for function-calling backends.
    ///
    /// The object is closed (`additionalProperties: false`), matching
    /// [`ToolSchema::validate`].
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.params {
            properties.insert(
                param.name.clone(),
                json!({
                    "type": param.kind.as_str(),
                    "description": param.description,
                }),
            );
        }
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    /// One-line signature such as `query: string, max_results?: integer`.
    pub fn signature(&self) -> String {
        self.params
            .iter()
            .map(|p| {
                format!(
                    "{}{}: {}",
                    p.name,
                    if p.required { "" } else { "?" },
                    p.kind
                )
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> ToolSchema {
        ToolSchema::new()
            .required("query", ParamKind::String, "Search query")
            .optional("max_results", ParamKind::Integer, "Result cap")
            .optional("score", ParamKind::Number, "Minimum score")
    }

    #[test]
    fn accepts_matching_arguments() {
        assert!(schema().validate(&json!({"query": "eth"})).is_ok());
        assert!(schema()
            .validate(&json!({"query": "eth", "max_results": 3, "score": 0.5}))
            .is_ok());
        // integers satisfy number
        assert!(schema().validate(&json!({"query": "eth", "score": 1})).is_ok());
        assert!(schema()
            .validate(&json!({"query": "eth", "max_results": null}))
            .is_ok());
    }

    #[test]
    fn rejects_missing_required_field() {
        let err = schema().validate(&json!({"max_results": 3})).unwrap_err();
        assert_eq!(err, "missing required field 'query'");
        let err = schema().validate(&json!({"query": null})).unwrap_err();
        assert_eq!(err, "missing required field 'query'");
    }

    #[test]
    fn rejects_type_mismatch() {
        let err = schema()
            .validate(&json!({"query": "eth", "max_results": 2.5}))
            .unwrap_err();
        assert_eq!(err, "field 'max_results' must be integer, got number");
    }

    #[test]
    fn whole_floats_satisfy_integer() {
        assert!(schema()
            .validate(&json!({"query": "eth", "max_results": 5.0}))
            .is_ok());
    }

    #[test]
    fn rejects_non_object_and_unknown_fields() {
        assert!(schema().validate(&json!(["eth"])).is_err());
        let err = schema()
            .validate(&json!({"query": "eth", "page": 2}))
            .unwrap_err();
        assert_eq!(err, "unexpected field 'page'");
    }

    #[test]
    fn json_schema_lists_required_params() {
        let rendered = schema().to_json_schema();
        assert_eq!(rendered["type"], "object");
        assert_eq!(rendered["required"], json!(["query"]));
        assert_eq!(rendered["properties"]["max_results"]["type"], "integer");
    }

    #[test]
    fn rendered_schema_and_validation_agree_on_extra_fields() {
        let schema = schema();
        let rendered = schema.to_json_schema();
        assert_eq!(rendered["additionalProperties"], json!(false));

        let declared: Vec<&str> = rendered["properties"]
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert!(!declared.contains(&"page"));
        assert!(schema
            .validate(&json!({"query": "eth", "page": 2}))
            .is_err());
        assert!(schema.validate(&json!({"query": "eth"})).is_ok());
    }

    #[test]
    fn signature_marks_optional_params() {
        assert_eq!(
            schema().signature(),
            "query: string, max_results?: integer, score?: number"
        );
    }
}
