//! Declaration-time validation of scope requirements

use serde_json::{Map, Value};
use thiserror::Error;

use super::ScopeExpression;

/// Requirement shapes rejected when an operation is declared
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeclarationError {
    /// Top-level value is neither an expression object nor an array of
    /// arrays of strings
    #[error("scopes must be an expression object or an array of arrays of strings, got {0}")]
    InvalidShape(String),

    /// A node inside the expression is malformed
    #[error("invalid scope expression at {path}: {reason}")]
    InvalidNode { path: String, reason: String },
}

fn invalid(path: &str, reason: impl Into<String>) -> DeclarationError {
    DeclarationError::InvalidNode {
        path: path.to_string(),
        reason: reason.into(),
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

pub(super) fn parse(value: &Value) -> Result<ScopeExpression, DeclarationError> {
    match value {
        Value::Object(object) => parse_node(object, "$", true),
        Value::Array(sets) => parse_legacy(sets),
        other => Err(DeclarationError::InvalidShape(describe(other).to_string())),
    }
}

/// `[["a", "b"], ["c"]]` → `AnyOf[AllOf[a, b], AllOf[c]]`
fn parse_legacy(sets: &[Value]) -> Result<ScopeExpression, DeclarationError> {
    let mut alternatives = Vec::with_capacity(sets.len());

    for set in sets {
        let Value::Array(scopes) = set else {
            return Err(DeclarationError::InvalidShape(format!(
                "an array containing {}",
                describe(set)
            )));
        };

        let mut all = Vec::with_capacity(scopes.len());
        for scope in scopes {
            let Value::String(scope) = scope else {
                return Err(DeclarationError::InvalidShape(format!(
                    "an array of arrays containing {}",
                    describe(scope)
                )));
            };
            all.push(ScopeExpression::Literal(validate_template("$", scope)?));
        }
        alternatives.push(ScopeExpression::AllOf(all));
    }

    Ok(ScopeExpression::AnyOf(alternatives))
}

fn parse_node(
    object: &Map<String, Value>,
    path: &str,
    top_level: bool,
) -> Result<ScopeExpression, DeclarationError> {
    let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
    keys.sort_unstable();

    match keys.as_slice() {
        ["AllOf"] => Ok(ScopeExpression::AllOf(parse_children(
            &object["AllOf"],
            &format!("{}.AllOf", path),
        )?)),
        ["AnyOf"] => Ok(ScopeExpression::AnyOf(parse_children(
            &object["AnyOf"],
            &format!("{}.AnyOf", path),
        )?)),
        ["if", "then"] => {
            let condition = string_field(object, "if", path)?;
            let then_path = format!("{}.then", path);
            let Value::Object(then) = &object["then"] else {
                return Err(invalid(
                    &then_path,
                    format!("expected an expression object, got {}", describe(&object["then"])),
                ));
            };
            Ok(ScopeExpression::IfThen {
                condition,
                then: Box::new(parse_node(then, &then_path, true)?),
            })
        }
        ["each", "for", "in"] if !top_level => {
            let var = string_field(object, "for", path)?;
            let source = string_field(object, "in", path)?;
            let each = validate_template(path, &string_field(object, "each", path)?)?;
            Ok(ScopeExpression::ForEach { var, source, each })
        }
        ["each", "for", "in"] => Err(invalid(
            path,
            "for/in/each must be wrapped in AllOf or AnyOf",
        )),
        _ => Err(invalid(
            path,
            format!(
                "expected AllOf, AnyOf, if/then or for/in/each, got keys [{}]",
                keys.join(", ")
            ),
        )),
    }
}

fn parse_children(value: &Value, path: &str) -> Result<Vec<ScopeExpression>, DeclarationError> {
    let Value::Array(children) = value else {
        return Err(invalid(path, format!("expected an array, got {}", describe(value))));
    };

    children
        .iter()
        .enumerate()
        .map(|(index, child)| {
            let child_path = format!("{}[{}]", path, index);
            match child {
                Value::String(template) => Ok(ScopeExpression::Literal(validate_template(
                    &child_path,
                    template,
                )?)),
                Value::Object(object) => parse_node(object, &child_path, false),
                other => Err(invalid(
                    &child_path,
                    format!("expected a scope string or expression object, got {}", describe(other)),
                )),
            }
        })
        .collect()
}

fn string_field(
    object: &Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<String, DeclarationError> {
    match object.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(other) => Err(invalid(
            path,
            format!("'{}' must be a non-empty string, got {}", key, describe(other)),
        )),
        None => Err(invalid(path, format!("'{}' is required", key))),
    }
}

fn validate_template(path: &str, template: &str) -> Result<String, DeclarationError> {
    if template.bytes().any(|b| !(0x20..=0x7e).contains(&b)) {
        return Err(invalid(
            path,
            format!("scope {:?} must be printable ASCII", template),
        ));
    }
    Ok(template.to_string())
}
