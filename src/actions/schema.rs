//! Parameter schemas and validation
//!
//! A [`ParamSchema`] is a recursively nested, typed parameter contract. It
//! drives both prompt signature rendering and runtime validation of the
//! parameters the model supplies with an action call.
//!
//! Validation is closed-world and exact: objects reject undeclared
//! properties, integers must be integral JSON numbers, and every failure
//! message pinpoints the offending node with a dotted/bracketed path.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The type of a schema node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
    Null,
    Object,
    Array,
}

impl ParamKind {
    fn label(&self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
            ParamKind::Number => "number",
            ParamKind::Boolean => "boolean",
            ParamKind::Null => "null",
            ParamKind::Object => "object",
            ParamKind::Array => "array",
        }
    }
}

/// A typed, recursively nested parameter contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSchema {
    /// Node type.
    pub kind: ParamKind,
    /// Whether a value must be present.
    #[serde(default)]
    pub required: bool,
    /// Optional human/model-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Optional default, rendered into signatures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Declared object properties, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<(String, ParamSchema)>,
    /// Element schema for arrays.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<ParamSchema>>,
}

impl ParamSchema {
    fn of(kind: ParamKind) -> Self {
        Self {
            kind,
            required: false,
            description: None,
            default: None,
            properties: Vec::new(),
            items: None,
        }
    }

    /// A string node.
    pub fn string() -> Self {
        Self::of(ParamKind::String)
    }

    /// An integer node (exact integral numbers only).
    pub fn integer() -> Self {
        Self::of(ParamKind::Integer)
    }

    /// A number node (any JSON number).
    pub fn number() -> Self {
        Self::of(ParamKind::Number)
    }

    /// A boolean node.
    pub fn boolean() -> Self {
        Self::of(ParamKind::Boolean)
    }

    /// A null node.
    pub fn null() -> Self {
        Self::of(ParamKind::Null)
    }

    /// An object node with no declared properties.
    pub fn object() -> Self {
        Self::of(ParamKind::Object)
    }

    /// An array node without an element schema (array-ness only).
    pub fn array() -> Self {
        Self::of(ParamKind::Array)
    }

    /// Mark this node required.
    pub fn require(mut self) -> Self {
        self.required = true;
        self
    }

    /// Attach a description.
    pub fn describe(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Attach a default value.
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Declare an object property.
    pub fn property(mut self, name: &str, schema: ParamSchema) -> Self {
        self.properties.push((name.to_string(), schema));
        self
    }

    /// Set the array element schema.
    pub fn with_items(mut self, items: ParamSchema) -> Self {
        self.items = Some(Box::new(items));
        self
    }

    /// Validate an optional value against this schema.
    ///
    /// A missing value errors only when the node is required. On failure the
    /// returned message carries a dotted/bracketed path to the offending
    /// node, e.g. `params.filters[2].name: expected string, got number`.
    ///
    /// # Example
    /// ```
    /// use casement::actions::ParamSchema;
    /// use serde_json::json;
    ///
    /// let schema = ParamSchema::object()
    ///     .property("query", ParamSchema::string().require());
    ///
    /// assert!(schema.validate(Some(&json!({"query": "rust"})), "params").is_ok());
    /// let err = schema.validate(Some(&json!({"query": 7})), "params").unwrap_err();
    /// assert_eq!(err, "params.query: expected string, got number");
    /// ```
    pub fn validate(&self, value: Option<&Value>, path: &str) -> Result<(), String> {
        let value = match value {
            Some(v) => v,
            None => {
                return if self.required {
                    Err(format!("{}: missing required value", path))
                } else {
                    Ok(())
                };
            }
        };

        match self.kind {
            ParamKind::String => {
                if !value.is_string() {
                    return Err(type_error(path, "string", value));
                }
            }
            ParamKind::Integer => {
                // An exact integral number, not any numeric.
                if value.as_i64().is_none() && value.as_u64().is_none() {
                    return Err(type_error(path, "integer", value));
                }
            }
            ParamKind::Number => {
                if !value.is_number() {
                    return Err(type_error(path, "number", value));
                }
            }
            ParamKind::Boolean => {
                if !value.is_boolean() {
                    return Err(type_error(path, "boolean", value));
                }
            }
            ParamKind::Null => {
                if !value.is_null() {
                    return Err(type_error(path, "null", value));
                }
            }
            ParamKind::Object => {
                let map = match value.as_object() {
                    Some(m) => m,
                    None => return Err(type_error(path, "object", value)),
                };
                // Closed world: every supplied key must be declared.
                for key in map.keys() {
                    if !self.properties.iter().any(|(name, _)| name == key) {
                        return Err(format!("{}.{}: undeclared property", path, key));
                    }
                }
                for (name, schema) in &self.properties {
                    let child_path = format!("{}.{}", path, name);
                    schema.validate(map.get(name), &child_path)?;
                }
            }
            ParamKind::Array => {
                let elements = match value.as_array() {
                    Some(a) => a,
                    None => return Err(type_error(path, "array", value)),
                };
                if let Some(items) = &self.items {
                    for (i, element) in elements.iter().enumerate() {
                        let child_path = format!("{}[{}]", path, i);
                        items.validate(Some(element), &child_path)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Render a compact signature fragment, e.g. `query: string` or
    /// `limit?: integer = 10`.
    pub fn signature_fragment(&self, name: &str) -> String {
        let marker = if self.required { "" } else { "?" };
        let mut fragment = format!("{}{}: {}", name, marker, self.kind.label());
        if let Some(default) = &self.default {
            fragment.push_str(&format!(" = {}", default));
        }
        fragment
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn type_error(path: &str, expected: &str, value: &Value) -> String {
    format!(
        "{}: expected {}, got {}",
        path,
        expected,
        json_type_name(value)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_value_only_errors_when_required() {
        let optional = ParamSchema::string();
        assert!(optional.validate(None, "p").is_ok());

        let required = ParamSchema::string().require();
        let err = required.validate(None, "p").unwrap_err();
        assert_eq!(err, "p: missing required value");
    }

    #[test]
    fn test_primitive_checks_exact() {
        assert!(ParamSchema::string().validate(Some(&json!("x")), "p").is_ok());
        assert!(ParamSchema::string().validate(Some(&json!(1)), "p").is_err());

        assert!(ParamSchema::boolean().validate(Some(&json!(true)), "p").is_ok());
        assert!(ParamSchema::boolean().validate(Some(&json!("true")), "p").is_err());

        assert!(ParamSchema::null().validate(Some(&json!(null)), "p").is_ok());
        assert!(ParamSchema::null().validate(Some(&json!(0)), "p").is_err());
    }

    #[test]
    fn test_integer_requires_integral_number() {
        let schema = ParamSchema::integer();
        assert!(schema.validate(Some(&json!(5)), "p").is_ok());
        assert!(schema.validate(Some(&json!(-5)), "p").is_ok());
        assert!(schema.validate(Some(&json!(u64::MAX)), "p").is_ok());
        let err = schema.validate(Some(&json!(5.5)), "p").unwrap_err();
        assert_eq!(err, "p: expected integer, got number");
        assert!(schema.validate(Some(&json!("5")), "p").is_err());
    }

    #[test]
    fn test_number_accepts_any_numeric() {
        let schema = ParamSchema::number();
        assert!(schema.validate(Some(&json!(5)), "p").is_ok());
        assert!(schema.validate(Some(&json!(5.5)), "p").is_ok());
        assert!(schema.validate(Some(&json!("5")), "p").is_err());
    }

    #[test]
    fn test_object_requires_declared_required_properties() {
        let schema = ParamSchema::object()
            .property("query", ParamSchema::string().require())
            .property("limit", ParamSchema::integer());

        assert!(schema
            .validate(Some(&json!({"query": "x", "limit": 3})), "params")
            .is_ok());
        assert!(schema.validate(Some(&json!({"query": "x"})), "params").is_ok());

        let err = schema.validate(Some(&json!({"limit": 3})), "params").unwrap_err();
        assert_eq!(err, "params.query: missing required value");
    }

    #[test]
    fn test_object_rejects_undeclared_properties() {
        let schema = ParamSchema::object().property("query", ParamSchema::string());
        let err = schema
            .validate(Some(&json!({"query": "x", "extra": 1})), "params")
            .unwrap_err();
        assert_eq!(err, "params.extra: undeclared property");
    }

    #[test]
    fn test_object_rejects_non_object() {
        let schema = ParamSchema::object();
        let err = schema.validate(Some(&json!([1, 2])), "params").unwrap_err();
        assert_eq!(err, "params: expected object, got array");
    }

    #[test]
    fn test_array_elementwise_recursion() {
        let schema = ParamSchema::array().with_items(ParamSchema::integer());
        assert!(schema.validate(Some(&json!([1, 2, 3])), "p").is_ok());
        let err = schema.validate(Some(&json!([1, "two", 3])), "p").unwrap_err();
        assert_eq!(err, "p[1]: expected integer, got string");
    }

    #[test]
    fn test_array_without_items_checks_arrayness_only() {
        let schema = ParamSchema::array();
        assert!(schema.validate(Some(&json!([1, "mixed", null])), "p").is_ok());
        assert!(schema.validate(Some(&json!({"a": 1})), "p").is_err());
    }

    #[test]
    fn test_nested_path_reporting() {
        let schema = ParamSchema::object().property(
            "filters",
            ParamSchema::array().with_items(
                ParamSchema::object().property("name", ParamSchema::string().require()),
            ),
        );
        let err = schema
            .validate(Some(&json!({"filters": [{"name": "a"}, {"name": 7}]})), "params")
            .unwrap_err();
        assert_eq!(err, "params.filters[1].name: expected string, got number");
    }

    #[test]
    fn test_signature_fragment() {
        assert_eq!(
            ParamSchema::string().require().signature_fragment("query"),
            "query: string"
        );
        assert_eq!(
            ParamSchema::integer()
                .with_default(json!(10))
                .signature_fragment("limit"),
            "limit?: integer = 10"
        );
    }

    #[test]
    fn test_schema_serde_roundtrip() {
        let schema = ParamSchema::object()
            .property("q", ParamSchema::string().require().describe("the query"))
            .property("tags", ParamSchema::array().with_items(ParamSchema::string()));
        let json = serde_json::to_string(&schema).unwrap();
        let back: ParamSchema = serde_json::from_str(&json).unwrap();
        assert_eq!(back, schema);
    }
}
