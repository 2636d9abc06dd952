//! Parameters supplied to a scope expression at request time

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProgrammingError;

/// A single parameter value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    String(String),
    Array(Vec<String>),
}

impl ParamValue {
    /// Short type description used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "a boolean",
            Self::String(_) => "a string",
            Self::Array(_) => "an array",
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(value: Vec<String>) -> Self {
        Self::Array(value)
    }
}

impl From<Vec<&str>> for ParamValue {
    fn from(value: Vec<&str>) -> Self {
        Self::Array(value.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for ParamValue {
    fn from(value: [&str; N]) -> Self {
        Self::Array(value.iter().map(|s| s.to_string()).collect())
    }
}

/// Named parameters for expanding a scope expression
///
/// ```
/// use cretoai_scopes::expression::Params;
///
/// let params = Params::new()
///     .with("provisionerId", "aws")
///     .with("routes", ["index.a", "index.b"])
///     .with("private", false);
/// assert_eq!(params.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params {
    values: BTreeMap<String, ParamValue>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Builds parameters from a JSON object
    ///
    /// Only strings, booleans and arrays of strings are accepted; `null`
    /// members are skipped so that optional request fields read as absent.
    pub fn from_json(value: &Value) -> Result<Self, ProgrammingError> {
        let Value::Object(object) = value else {
            return Err(ProgrammingError::ParameterType {
                name: "<params>".to_string(),
                expected: "an object",
                found: json_kind(value),
            });
        };

        let mut params = Params::new();
        for (name, value) in object {
            let value = match value {
                Value::Null => continue,
                Value::Bool(b) => ParamValue::Bool(*b),
                Value::String(s) => ParamValue::String(s.clone()),
                Value::Array(items) => ParamValue::Array(
                    items
                        .iter()
                        .map(|item| match item {
                            Value::String(s) => Ok(s.clone()),
                            other => Err(ProgrammingError::ParameterType {
                                name: name.clone(),
                                expected: "an array of strings",
                                found: json_kind(other),
                            }),
                        })
                        .collect::<Result<_, _>>()?,
                ),
                other => {
                    return Err(ProgrammingError::ParameterType {
                        name: name.clone(),
                        expected: "a string, boolean or array of strings",
                        found: json_kind(other),
                    })
                }
            };
            params.values.insert(name.clone(), value);
        }

        Ok(params)
    }

    /// Merges `other` into this map
    ///
    /// Supplying a name again with the same value is allowed; a different
    /// value is a `ConflictingParameter` error and leaves `self` unchanged.
    pub fn merge(&mut self, other: Params) -> Result<(), ProgrammingError> {
        for (name, value) in &other.values {
            if let Some(existing) = self.values.get(name) {
                if existing != value {
                    return Err(ProgrammingError::ConflictingParameter { name: name.clone() });
                }
            }
        }

        self.values.extend(other.values);
        Ok(())
    }
}

impl<K, V> FromIterator<(K, V)> for Params
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json() {
        let params = Params::from_json(&json!({
            "provisionerId": "aws",
            "routes": ["a", "b"],
            "private": true,
            "missing": null,
        }))
        .unwrap();

        assert_eq!(params.len(), 3);
        assert_eq!(params.get("provisionerId"), Some(&ParamValue::from("aws")));
        assert_eq!(params.get("routes"), Some(&ParamValue::from(["a", "b"])));
        assert_eq!(params.get("private"), Some(&ParamValue::Bool(true)));
        assert!(params.get("missing").is_none());
    }

    #[test]
    fn test_from_json_rejects_numbers() {
        let result = Params::from_json(&json!({"count": 3}));
        assert!(matches!(
            result,
            Err(ProgrammingError::ParameterType { ref name, .. }) if name == "count"
        ));

        let result = Params::from_json(&json!({"routes": ["a", 1]}));
        assert!(result.is_err());
    }

    #[test]
    fn test_merge_accumulates() {
        let mut params = Params::new().with("a", "1");
        params.merge(Params::new().with("b", "2")).unwrap();
        params.merge(Params::new().with("a", "1")).unwrap();

        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_merge_conflict_leaves_params_unchanged() {
        let mut params = Params::new().with("a", "1");
        let result = params.merge(Params::new().with("b", "2").with("a", "other"));

        assert_eq!(
            result,
            Err(ProgrammingError::ConflictingParameter { name: "a".to_string() })
        );
        assert_eq!(params, Params::new().with("a", "1"));
    }

    #[test]
    fn test_untagged_serde() {
        let params: Params = serde_json::from_value(json!({"p": "x", "b": false, "l": ["y"]})).unwrap();
        assert_eq!(params.get("b"), Some(&ParamValue::Bool(false)));
        assert_eq!(params.get("l"), Some(&ParamValue::from(vec!["y"])));
    }
}
