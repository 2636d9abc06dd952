//! Evaluation of expanded scope expressions

use tracing::warn;

use super::ScopeExpression;
use crate::scope::ScopeSet;

/// Decides an expanded expression against a granted scope set
///
/// `AllOf[]` is satisfied and `AnyOf[]` is not. Dynamic nodes that were never
/// expanded cannot be decided and count as unsatisfied; callers only evaluate
/// expansions whose `missing` set is empty.
pub fn evaluate(expression: &ScopeExpression, scopes: &ScopeSet) -> bool {
    match expression {
        ScopeExpression::Literal(scope) => scopes.satisfies(scope),
        ScopeExpression::AllOf(children) => children.iter().all(|child| evaluate(child, scopes)),
        ScopeExpression::AnyOf(children) => children.iter().any(|child| evaluate(child, scopes)),
        ScopeExpression::ForEach { source, .. } => {
            warn!("Evaluated unexpanded for/in/each over '{}'", source);
            false
        }
        ScopeExpression::IfThen { condition, .. } => {
            warn!("Evaluated unexpanded if/then on '{}'", condition);
            false
        }
    }
}
