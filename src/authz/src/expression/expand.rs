//! Parameter expansion of scope expressions

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use super::params::{ParamValue, Params};
use super::ScopeExpression;
use crate::error::ProgrammingError;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<([^>]+)>").expect("placeholder pattern is valid"))
}

/// Iterates over the placeholder names in a template, in order
///
/// ```
/// use cretoai_scopes::expression::placeholders;
///
/// let names: Vec<_> = placeholders("queue:create-task:<provisionerId>/<workerType>").collect();
/// assert_eq!(names, vec!["provisionerId", "workerType"]);
/// ```
pub fn placeholders(template: &str) -> impl Iterator<Item = &str> {
    placeholder_pattern()
        .find_iter(template)
        .map(|m| &m.as_str()[1..m.as_str().len() - 1])
}

/// Result of expanding a scope expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    /// Expression with every resolvable placeholder and dynamic node
    /// replaced
    pub expression: ScopeExpression,

    /// Names that were needed but not supplied
    pub missing: BTreeSet<String>,
}

impl Expansion {
    /// Returns `true` when nothing was missing and the expression can be
    /// evaluated
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Expands `expression` against `params`
///
/// Literals have their placeholders substituted; unknown placeholders are
/// left in place and reported in `missing`. `ForEach` becomes an `AllOf` with
/// one literal per array element. `IfThen` becomes its expanded `then` branch
/// when the condition is `true` and `AllOf[]` when it is `false`. A `ForEach`
/// or `IfThen` whose parameter is absent becomes `AllOf[]` and reports the
/// parameter as missing.
///
/// # Errors
///
/// Returns a `ProgrammingError` when a parameter has the wrong type for its
/// position: conditions must be booleans, `for` sources arrays of strings,
/// and placeholders strings.
pub fn expand(
    expression: &ScopeExpression,
    params: &Params,
) -> Result<Expansion, ProgrammingError> {
    let mut missing = BTreeSet::new();
    let expression = expand_node(expression, params, &mut missing)?;

    debug!(
        "Expanded scope expression with {} parameters, {} missing",
        params.len(),
        missing.len()
    );

    Ok(Expansion { expression, missing })
}

fn expand_node(
    expression: &ScopeExpression,
    params: &Params,
    missing: &mut BTreeSet<String>,
) -> Result<ScopeExpression, ProgrammingError> {
    match expression {
        ScopeExpression::Literal(template) => Ok(ScopeExpression::Literal(substitute(
            template,
            |_| None,
            params,
            missing,
        )?)),
        ScopeExpression::AllOf(children) => Ok(ScopeExpression::AllOf(
            children
                .iter()
                .map(|child| expand_node(child, params, missing))
                .collect::<Result<_, _>>()?,
        )),
        ScopeExpression::AnyOf(children) => Ok(ScopeExpression::AnyOf(
            children
                .iter()
                .map(|child| expand_node(child, params, missing))
                .collect::<Result<_, _>>()?,
        )),
        ScopeExpression::ForEach { var, source, each } => match params.get(source) {
            None => {
                missing.insert(source.clone());
                Ok(ScopeExpression::AllOf(Vec::new()))
            }
            Some(ParamValue::Array(elements)) => Ok(ScopeExpression::AllOf(
                elements
                    .iter()
                    .map(|element| {
                        let bound = |name: &str| (name == var.as_str()).then_some(element.as_str());
                        substitute(each, bound, params, missing).map(ScopeExpression::Literal)
                    })
                    .collect::<Result<_, _>>()?,
            )),
            Some(other) => Err(ProgrammingError::ParameterType {
                name: source.clone(),
                expected: "an array of strings",
                found: other.kind(),
            }),
        },
        ScopeExpression::IfThen { condition, then } => match params.get(condition) {
            Some(ParamValue::Bool(true)) => expand_node(then, params, missing),
            Some(ParamValue::Bool(false)) => Ok(ScopeExpression::AllOf(Vec::new())),
            None => {
                missing.insert(condition.clone());
                Ok(ScopeExpression::AllOf(Vec::new()))
            }
            Some(other) => Err(ProgrammingError::NonBooleanCondition {
                name: condition.clone(),
                found: other.kind(),
            }),
        },
    }
}

/// Replaces every `<name>` in `template` in a single pass
///
/// `bound` resolves loop variables first, so an element value is inserted
/// verbatim and never re-scanned for placeholders.
fn substitute<'a>(
    template: &str,
    bound: impl Fn(&str) -> Option<&'a str>,
    params: &Params,
    missing: &mut BTreeSet<String>,
) -> Result<String, ProgrammingError> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    for m in placeholder_pattern().find_iter(template) {
        out.push_str(&template[last..m.start()]);
        last = m.end();

        let name = &m.as_str()[1..m.as_str().len() - 1];
        if let Some(value) = bound(name) {
            out.push_str(value);
            continue;
        }

        match params.get(name) {
            Some(ParamValue::String(value)) => out.push_str(value),
            Some(other) => {
                return Err(ProgrammingError::ParameterType {
                    name: name.to_string(),
                    expected: "a string",
                    found: other.kind(),
                })
            }
            None => {
                missing.insert(name.to_string());
                out.push_str(m.as_str());
            }
        }
    }

    out.push_str(&template[last..]);
    Ok(out)
}
