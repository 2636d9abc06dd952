/// Scope set algebra
///
/// Satisfaction of a required scope by a granted set, and narrowing of a
/// granted set by a restriction set (temporary certificates and
/// caller-declared `authorizedScopes`).

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::types::{Scope, ScopeResult};

/// An unordered collection of unique scopes, read as the union of the
/// permissions they grant
///
/// Members are kept sorted so that iteration, display and comparison are
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeSet {
    scopes: BTreeSet<Scope>,
}

impl ScopeSet {
    /// Creates an empty scope set
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a scope set from string slices, validating every member
    pub fn parse<I, S>(scopes: I) -> ScopeResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        scopes
            .into_iter()
            .map(|s| Scope::new(s.as_ref()))
            .collect()
    }

    /// Adds a scope, returning `false` if it was already present
    pub fn insert(&mut self, scope: Scope) -> bool {
        self.scopes.insert(scope)
    }

    /// Returns `true` if the set contains exactly this scope string
    pub fn contains(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s.as_str() == scope)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scope> {
        self.scopes.iter()
    }

    /// Returns the members as plain strings, sorted
    pub fn to_strings(&self) -> Vec<String> {
        self.scopes.iter().map(|s| s.as_str().to_string()).collect()
    }

    /// Checks whether some member of this set matches `required`
    ///
    /// # Arguments
    ///
    /// * `required` - A concrete required scope (no placeholders)
    ///
    /// # Returns
    ///
    /// Returns `true` if any granted scope satisfies `required`
    pub fn satisfies(&self, required: &str) -> bool {
        self.scopes.iter().any(|granted| granted.matches(required))
    }

    /// Narrows this granted set by a restriction set
    ///
    /// For every granted scope `g`: if some restriction scope covers `g`, `g`
    /// is kept; otherwise every restriction scope that `g` covers is kept
    /// instead. The more specific of two overlapping scopes always wins:
    ///
    /// ```
    /// use cretoai_scopes::scope::ScopeSet;
    ///
    /// let granted = ScopeSet::parse(["service:*"]).unwrap();
    /// let restriction = ScopeSet::parse(["service:magic"]).unwrap();
    /// assert_eq!(granted.narrow(&restriction).to_strings(), vec!["service:magic"]);
    ///
    /// let granted = ScopeSet::parse(["service:magic"]).unwrap();
    /// let restriction = ScopeSet::parse(["service:*"]).unwrap();
    /// assert_eq!(granted.narrow(&restriction).to_strings(), vec!["service:magic"]);
    /// ```
    pub fn narrow(&self, restriction: &ScopeSet) -> ScopeSet {
        let mut narrowed = ScopeSet::new();

        for granted in &self.scopes {
            if restriction.scopes.iter().any(|r| r.covers(granted)) {
                narrowed.insert(granted.clone());
                continue;
            }

            if granted.is_wildcard() {
                for r in restriction.scopes.iter().filter(|r| granted.covers(r)) {
                    narrowed.insert(r.clone());
                }
            }
        }

        narrowed
    }

    /// Removes members already covered by another member
    pub fn normalize(&self) -> ScopeSet {
        self.scopes
            .iter()
            .filter(|s| {
                !self
                    .scopes
                    .iter()
                    .any(|other| other != *s && other.covers(s))
            })
            .cloned()
            .collect()
    }
}

impl FromIterator<Scope> for ScopeSet {
    fn from_iter<T: IntoIterator<Item = Scope>>(iter: T) -> Self {
        Self {
            scopes: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ScopeSet {
    type Item = Scope;
    type IntoIter = std::collections::btree_set::IntoIter<Scope>;

    fn into_iter(self) -> Self::IntoIter {
        self.scopes.into_iter()
    }
}

impl<'a> IntoIterator for &'a ScopeSet {
    type Item = &'a Scope;
    type IntoIter = std::collections::btree_set::Iter<'a, Scope>;

    fn into_iter(self) -> Self::IntoIter {
        self.scopes.iter()
    }
}

impl fmt::Display for ScopeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.to_strings().join(", "))
    }
}
