use std::collections::HashMap;

use serde_json::{Map, Value, json};

/// JSON schema primitive types supported for function parameters.
#[derive(Debug, Clone)]
pub enum ParamType {
    Integer,
    Number,
    String,
    Boolean,
    Object,
    Array,
}

impl ParamType {
    fn as_str(&self) -> &'static str {
        match self {
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::String => "string",
            ParamType::Boolean => "boolean",
            ParamType::Object => "object",
            ParamType::Array => "array",
        }
    }
}

/// One function parameter definition.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    /// Parameter name.
    pub name: String,
    /// Optional human-readable description.
    pub description: Option<String>,
    /// JSON schema type.
    pub kind: ParamType,
    /// Whether the parameter is required.
    pub required: bool,
}

impl ParamSpec {
    /// Builds a parameter definition.
    pub fn new(
        name: impl Into<String>,
        kind: ParamType,
        required: bool,
        description: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description,
            kind,
            required,
        }
    }
}

/// Declaration advertised to the model for one callable function.
#[derive(Debug, Clone)]
pub struct FunctionSchema {
    /// Function name, unique key within a registry.
    pub name: String,
    /// Function description.
    pub description: String,
    /// Parameter definitions.
    pub params: Vec<ParamSpec>,
}

impl FunctionSchema {
    /// Creates a schema with no parameters.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
        }
    }

    /// Appends one parameter definition.
    pub fn with_param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    fn parameters_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in &self.params {
            let mut param_def = Map::new();
            param_def.insert(
                "type".to_string(),
                Value::String(param.kind.as_str().to_string()),
            );
            if let Some(description) = &param.description {
                param_def.insert(
                    "description".to_string(),
                    Value::String(description.clone()),
                );
            }
            properties.insert(param.name.clone(), Value::Object(param_def));
            if param.required {
                required.push(Value::String(param.name.clone()));
            }
        }

        let mut schema = Map::new();
        schema.insert("type".to_string(), Value::String("object".to_string()));
        schema.insert("properties".to_string(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".to_string(), Value::Array(required));
        }
        Value::Object(schema)
    }

    /// Serializes the declaration to chat-completions `functions` format.
    pub fn to_json(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "parameters": self.parameters_schema(),
        })
    }
}

/// Callback executing a function call; receives the raw arguments text.
pub type FunctionCallback = Box<dyn Fn(&str) -> String + Send + Sync>;

struct RegisteredFunction {
    schema: FunctionSchema,
    callback: FunctionCallback,
}

/// Name-keyed table of callable functions advertised to the model.
#[derive(Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, RegisteredFunction>,
}

impl FunctionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a function under its schema name. Last write wins on collision.
    pub fn register(&mut self, schema: FunctionSchema, callback: FunctionCallback) {
        self.functions
            .insert(schema.name.clone(), RegisteredFunction { schema, callback });
    }

    /// Declarations to advertise to the service; order is unspecified.
    pub fn schemas(&self) -> Vec<Value> {
        self.functions
            .values()
            .map(|entry| entry.schema.to_json())
            .collect()
    }

    /// Executes the named function, or `None` if the name is not registered.
    pub fn invoke(&self, name: &str, arguments: &str) -> Option<String> {
        let entry = self.functions.get(name)?;
        Some((entry.callback)(arguments))
    }

    /// Returns true when no function has been registered.
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{FunctionRegistry, FunctionSchema, ParamSpec, ParamType};
    use serde_json::json;

    fn echo_schema(name: &str) -> FunctionSchema {
        FunctionSchema::new(name, "Echoes its arguments")
    }

    #[test]
    fn invoke_runs_the_registered_callback() {
        let mut registry = FunctionRegistry::new();
        registry.register(echo_schema("echo"), Box::new(|args| format!("got {args}")));

        assert_eq!(registry.invoke("echo", "{}").as_deref(), Some("got {}"));
    }

    #[test]
    fn invoke_returns_none_for_unregistered_name() {
        let registry = FunctionRegistry::new();
        assert!(registry.invoke("missing", "{}").is_none());
    }

    #[test]
    fn registering_twice_keeps_only_the_second_callback() {
        let mut registry = FunctionRegistry::new();
        registry.register(echo_schema("dup"), Box::new(|_| "first".to_string()));
        registry.register(echo_schema("dup"), Box::new(|_| "second".to_string()));

        assert_eq!(registry.invoke("dup", "{}").as_deref(), Some("second"));
        assert_eq!(registry.schemas().len(), 1);
    }

    #[test]
    fn schema_serializes_to_function_declaration_shape() {
        let schema = FunctionSchema::new("get_current_weather", "Get the current weather")
            .with_param(ParamSpec::new(
                "location",
                ParamType::String,
                true,
                Some("The city and state, e.g. San Francisco, CA".to_string()),
            ))
            .with_param(ParamSpec::new("unit", ParamType::String, false, None));

        assert_eq!(
            schema.to_json(),
            json!({
                "name": "get_current_weather",
                "description": "Get the current weather",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "location": {
                            "type": "string",
                            "description": "The city and state, e.g. San Francisco, CA",
                        },
                        "unit": {"type": "string"},
                    },
                    "required": ["location"],
                },
            })
        );
    }
}
