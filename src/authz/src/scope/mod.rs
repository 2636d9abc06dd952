/// Scope matching and scope set algebra
///
/// A scope is a permission token; a trailing `*` turns it into a prefix
/// wildcard. Scope sets are the granted permissions of a caller and can be
/// narrowed by temporary certificates or caller-declared restrictions.
///
/// # Examples
///
/// ```
/// use cretoai_scopes::scope::{Scope, ScopeSet};
///
/// let granted = ScopeSet::parse(["queue:create-task:*", "queue:route:index"]).unwrap();
///
/// assert!(granted.satisfies("queue:create-task:aws/builder"));
/// assert!(!granted.satisfies("queue:route:other"));
/// assert!(Scope::new("*").unwrap().matches("anything:at:all"));
/// ```

mod types;
mod set;

#[cfg(test)]
mod tests;

pub use types::{matches, Scope, ScopeError, ScopeResult};
pub use set::ScopeSet;
