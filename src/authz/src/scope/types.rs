/// Scope type definitions and validation
///
/// Provides the core Scope type and the single matching rule every other
/// part of the engine builds on.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Result type for scope operations
pub type ScopeResult<T> = Result<T, ScopeError>;

/// Errors that can occur during scope operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeError {
    /// Scope contains a character outside printable ASCII
    InvalidCharacter {
        /// Offending scope string
        scope: String,
        /// Byte offset of the first invalid character
        position: usize,
    },
}

impl fmt::Display for ScopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCharacter { scope, position } => write!(
                f,
                "Invalid character at position {} in scope {:?}: scopes must be printable ASCII",
                position, scope
            ),
        }
    }
}

impl std::error::Error for ScopeError {}

/// Returns `true` if `granted` satisfies `required`.
///
/// Exact string equality always matches. A granted scope ending in `*`
/// matches every required scope that starts with the part before the `*`,
/// including required wildcards with the same or a longer prefix. A `*`
/// anywhere but the final position is an ordinary character.
///
/// ```
/// use cretoai_scopes::scope::matches;
///
/// assert!(matches("queue:*", "queue:create-task:aws"));
/// assert!(matches("queue:*", "queue:route:*"));
/// assert!(!matches("queue:route:*", "queue:*"));
/// assert!(!matches("queue:create-task", "queue:create-task:aws"));
/// ```
pub fn matches(granted: &str, required: &str) -> bool {
    if granted == required {
        return true;
    }

    match granted.strip_suffix('*') {
        Some(prefix) => required.starts_with(prefix),
        None => false,
    }
}

/// A single permission token
///
/// A scope is an opaque string over printable ASCII. A trailing `*` makes it
/// a wildcard covering the scope without the `*` and everything below it:
/// - `queue:create-task:aws` (exact)
/// - `queue:create-task:*` (everything under `queue:create-task:`)
/// - `*` (everything)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Scope {
    raw: String,
}

impl Scope {
    /// Creates a new scope from a string slice
    ///
    /// # Arguments
    ///
    /// * `s` - The scope string (e.g., "queue:create-task:aws")
    ///
    /// # Returns
    ///
    /// Returns the scope or `ScopeError::InvalidCharacter` if `s` contains
    /// anything outside `0x20..=0x7e`
    pub fn new(s: &str) -> ScopeResult<Self> {
        if let Some(position) = s.bytes().position(|b| !(0x20..=0x7e).contains(&b)) {
            return Err(ScopeError::InvalidCharacter {
                scope: s.to_string(),
                position,
            });
        }

        Ok(Self { raw: s.to_string() })
    }

    /// Returns the raw scope string
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns whether this scope ends in a wildcard
    pub fn is_wildcard(&self) -> bool {
        self.raw.ends_with('*')
    }

    /// Returns the scope without its trailing wildcard
    pub fn prefix(&self) -> &str {
        self.raw.strip_suffix('*').unwrap_or(&self.raw)
    }

    /// Checks whether this scope, as a granted scope, satisfies `required`
    pub fn matches(&self, required: &str) -> bool {
        matches(&self.raw, required)
    }

    /// Checks whether this scope covers everything `other` covers
    pub fn covers(&self, other: &Scope) -> bool {
        self.matches(&other.raw)
    }
}

impl FromStr for Scope {
    type Err = ScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Scope {
    type Error = ScopeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(&s)
    }
}

impl From<Scope> for String {
    fn from(scope: Scope) -> Self {
        scope.raw
    }
}

impl AsRef<str> for Scope {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}
