//! API configuration and service context

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::ProgrammingError;

/// Static configuration of an API
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub title: String,

    pub description: String,

    /// Context properties that must be supplied when the service is built
    pub context: Vec<String>,

    /// Error codes in addition to the built-in ones, mapped to HTTP statuses
    pub error_codes: HashMap<String, u16>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            title: "Untitled API".to_string(),
            description: String::new(),
            context: Vec::new(),
            error_codes: HashMap::new(),
        }
    }
}

impl ApiConfig {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    /// Requires context properties by name
    pub fn with_context<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.context.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn with_error_code(mut self, code: impl Into<String>, status: u16) -> Self {
        self.error_codes.insert(code.into(), status);
        self
    }
}

/// Properties shared by every handler of a service
///
/// Built once at startup and read concurrently by all calls.
#[derive(Debug, Clone, Default)]
pub struct ServiceContext {
    properties: Map<String, Value>,
}

impl ServiceContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Deserializes a property into `T`
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.properties
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// Checks that every required key is present
    pub fn validate(&self, required: &[String]) -> Result<(), ProgrammingError> {
        let missing: Vec<String> = required
            .iter()
            .filter(|key| !self.contains(key))
            .cloned()
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ProgrammingError::MissingContext(missing))
        }
    }
}

impl From<Map<String, Value>> for ServiceContext {
    fn from(properties: Map<String, Value>) -> Self {
        Self { properties }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ApiConfig::new("Test Api", "Yet another test api")
            .with_context(["prop1", "prop2"])
            .with_error_code("TooManyFoos", 472);

        assert_eq!(config.title, "Test Api");
        assert_eq!(config.context, vec!["prop1", "prop2"]);
        assert_eq!(config.error_codes.get("TooManyFoos"), Some(&472));
    }

    #[test]
    fn test_context_validation() {
        let required = vec!["prop1".to_string(), "prop2".to_string()];

        let partial = ServiceContext::new().with("prop1", "value1");
        assert_eq!(
            partial.validate(&required),
            Err(ProgrammingError::MissingContext(vec!["prop2".to_string()]))
        );

        let full = partial.with("prop2", "value2");
        assert!(full.validate(&required).is_ok());
        assert_eq!(full.get_as::<String>("prop2").as_deref(), Some("value2"));
    }
}
