use chrono::Local;
use serde_json::Value;

use crate::chat::registry::{FunctionRegistry, FunctionSchema, ParamSpec, ParamType};

fn argument(arguments: &str, name: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(arguments).ok()?;
    Some(parsed.get(name)?.as_str()?.to_string())
}

fn current_weather(arguments: &str) -> String {
    let location = argument(arguments, "location").unwrap_or_default();
    format!("The weather in {location} is 72 degrees and sunny.")
}

fn current_date(_arguments: &str) -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

fn current_time(_arguments: &str) -> String {
    Local::now().format("%H:%M:%S").to_string()
}

/// Registry pre-loaded with the stock sample functions: weather, date, time.
pub fn sample_registry() -> FunctionRegistry {
    let mut registry = FunctionRegistry::new();

    registry.register(
        FunctionSchema::new("get_current_weather", "Get the current weather in a given location")
            .with_param(ParamSpec::new(
                "location",
                ParamType::String,
                true,
                Some("The city and state, e.g. San Francisco, CA".to_string()),
            ))
            .with_param(ParamSpec::new("unit", ParamType::String, false, None)),
        Box::new(current_weather),
    );
    registry.register(
        FunctionSchema::new("get_current_date", "Get the current date"),
        Box::new(current_date),
    );
    registry.register(
        FunctionSchema::new("get_current_time", "Get the current time"),
        Box::new(current_time),
    );

    registry
}

#[cfg(test)]
mod tests {
    use super::sample_registry;

    #[test]
    fn weather_reads_the_location_argument() {
        let registry = sample_registry();
        let result = registry
            .invoke("get_current_weather", r#"{"location":"Paris, France"}"#)
            .unwrap();
        assert_eq!(result, "The weather in Paris, France is 72 degrees and sunny.");
    }

    #[test]
    fn date_ignores_malformed_arguments() {
        let registry = sample_registry();
        let result = registry.invoke("get_current_date", "not json").unwrap();
        assert_eq!(result.len(), 10);
    }
}
