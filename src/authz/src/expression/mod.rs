//! Scope expressions
//!
//! A scope expression is the declarative requirement attached to an
//! operation. It is a small tree of boolean combinators over templated scope
//! strings, with two dynamic node kinds that are resolved per request:
//!
//! ```text
//! {"AllOf": [
//!     "queue:create-task:<provisionerId>/<workerType>",
//!     {"for": "route", "in": "routes", "each": "queue:route:<route>"},
//!     {"if": "private", "then": {"AnyOf": ["secrets:get:<name>"]}}
//! ]}
//! ```
//!
//! Expressions are validated when they are declared; a malformed shape never
//! reaches request handling. [`expand`] substitutes parameters and returns the
//! names that were still missing, [`evaluate`] decides a fully expanded tree
//! against a granted [`ScopeSet`](crate::scope::ScopeSet).

mod declaration;
mod eval;
mod expand;
mod params;


use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};

pub use declaration::DeclarationError;
pub use eval::evaluate;
pub use expand::{expand, placeholders, Expansion};
pub use params::{ParamValue, Params};

/// A scope requirement tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeExpression {
    /// Scope string, possibly containing `<name>` placeholders
    Literal(String),

    /// Satisfied iff every child is satisfied; empty is satisfied
    AllOf(Vec<ScopeExpression>),

    /// Satisfied iff some child is satisfied; empty is never satisfied
    AnyOf(Vec<ScopeExpression>),

    /// One `each` scope per element of the array parameter `source`,
    /// with `<var>` replaced by the element
    ForEach {
        var: String,
        source: String,
        each: String,
    },

    /// `then` applies only when the boolean parameter `condition` is true
    IfThen {
        condition: String,
        then: Box<ScopeExpression>,
    },
}

impl ScopeExpression {
    pub fn literal(template: impl Into<String>) -> Self {
        Self::Literal(template.into())
    }

    pub fn all_of(children: impl IntoIterator<Item = ScopeExpression>) -> Self {
        Self::AllOf(children.into_iter().collect())
    }

    pub fn any_of(children: impl IntoIterator<Item = ScopeExpression>) -> Self {
        Self::AnyOf(children.into_iter().collect())
    }

    pub fn for_each(
        var: impl Into<String>,
        source: impl Into<String>,
        each: impl Into<String>,
    ) -> Self {
        Self::ForEach {
            var: var.into(),
            source: source.into(),
            each: each.into(),
        }
    }

    pub fn if_then(condition: impl Into<String>, then: ScopeExpression) -> Self {
        Self::IfThen {
            condition: condition.into(),
            then: Box::new(then),
        }
    }

    /// Parses a declared requirement
    ///
    /// Accepts `{"AllOf": [..]}`, `{"AnyOf": [..]}` and `{"if": .., "then": ..}`
    /// at the top level, plus the legacy array-of-arrays form
    /// `[["a", "b"], ["c"]]`, which reads as `AnyOf[AllOf[a, b], AllOf[c]]`.
    pub fn from_declaration(value: &Value) -> Result<Self, DeclarationError> {
        declaration::parse(value)
    }

    /// Returns `true` if the expression needs no per-request parameters
    pub fn is_static(&self) -> bool {
        match self {
            Self::Literal(template) => placeholders(template).next().is_none(),
            Self::AllOf(children) | Self::AnyOf(children) => {
                children.iter().all(ScopeExpression::is_static)
            }
            Self::ForEach { .. } | Self::IfThen { .. } => false,
        }
    }

    /// Returns `true` for `AllOf[]`, which every caller satisfies
    pub fn is_trivial(&self) -> bool {
        matches!(self, Self::AllOf(children) if children.is_empty())
    }

    /// Converts the expression back into its declaration form
    pub fn to_json(&self) -> Value {
        match self {
            Self::Literal(template) => Value::String(template.clone()),
            Self::AllOf(children) => {
                json!({ "AllOf": children.iter().map(Self::to_json).collect::<Vec<_>>() })
            }
            Self::AnyOf(children) => {
                json!({ "AnyOf": children.iter().map(Self::to_json).collect::<Vec<_>>() })
            }
            Self::ForEach { var, source, each } => {
                json!({ "for": var, "in": source, "each": each })
            }
            Self::IfThen { condition, then } => {
                json!({ "if": condition, "then": then.to_json() })
            }
        }
    }
}

impl fmt::Display for ScopeExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl Serialize for ScopeExpression {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ScopeExpression {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_declaration(&value).map_err(serde::de::Error::custom)
    }
}
