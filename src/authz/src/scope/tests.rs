/// Test suite for the scope module
///
/// Tests cover:
/// - Exact matching
/// - Trailing wildcard matching
/// - Set satisfaction
/// - Narrowing and normalization
/// - Matching laws (property based)

use super::*;
use proptest::prelude::*;

fn set(scopes: &[&str]) -> ScopeSet {
    ScopeSet::parse(scopes).unwrap()
}

// ============================================================================
// Matching Tests
// ============================================================================

#[test]
fn test_exact_match_identical() {
    assert!(matches("service:magic", "service:magic"));
}

#[test]
fn test_exact_match_different() {
    assert!(!matches("service:magic", "service:magi"));
    assert!(!matches("service:magic", "service:magic:more"));
}

#[test]
fn test_wildcard_matches_prefix_itself() {
    assert!(matches("service:*", "service:"));
    assert!(matches("service:*", "service:magic"));
    assert!(!matches("service:*", "service"));
}

#[test]
fn test_star_matches_everything() {
    assert!(matches("*", ""));
    assert!(matches("*", "anything"));
    assert!(matches("*", "got-*"));
}

#[test]
fn test_required_wildcard_needs_broader_wildcard() {
    assert!(matches("got-all/*", "got-all/hello/*"));
    assert!(matches("got-all/*", "got-all/*"));
    assert!(!matches("got-all/*", "got-*"));
    assert!(!matches("got-only/this", "got-only/this*"));
}

// ============================================================================
// Set Satisfaction Tests
// ============================================================================

#[test]
fn test_set_satisfies() {
    let granted = set(&["service:magic", "queue:route:*"]);

    assert!(granted.satisfies("service:magic"));
    assert!(granted.satisfies("queue:route:index.foo"));
    assert!(!granted.satisfies("service:other"));
}

#[test]
fn test_empty_set_satisfies_nothing() {
    let granted = ScopeSet::new();
    assert!(!granted.satisfies(""));
    assert!(!granted.satisfies("service:magic"));
}

#[test]
fn test_duplicates_collapse() {
    let granted = set(&["a", "a", "b"]);
    assert_eq!(granted.len(), 2);
}

// ============================================================================
// Narrowing Tests
// ============================================================================

#[test]
fn test_narrow_broad_grant_by_specific_restriction() {
    let narrowed = set(&["service:*"]).narrow(&set(&["service:magic"]));
    assert_eq!(narrowed, set(&["service:magic"]));
}

#[test]
fn test_narrow_specific_grant_by_broad_restriction() {
    let narrowed = set(&["service:magic"]).narrow(&set(&["service:*"]));
    assert_eq!(narrowed, set(&["service:magic"]));
}

#[test]
fn test_narrow_star_by_prefix_wildcard() {
    let narrowed = set(&["*"]).narrow(&set(&["service:ma*"]));
    assert_eq!(narrowed, set(&["service:ma*"]));
    assert!(narrowed.satisfies("service:magic"));
}

#[test]
fn test_narrow_without_overlap_is_empty() {
    let narrowed = set(&["service:magic"]).narrow(&set(&["some-irrelevant-scope"]));
    assert!(narrowed.is_empty());
}

#[test]
fn test_narrow_keeps_every_covered_restriction() {
    let narrowed = set(&["*"]).narrow(&set(&["got-all/*", "got-only/this"]));
    assert_eq!(narrowed, set(&["got-all/*", "got-only/this"]));
}

#[test]
fn test_narrow_left_to_right() {
    let granted = set(&["*"]);
    let certificate = set(&["service:mag*"]);
    let authorized = set(&["service:magic", "queue:*"]);

    let narrowed = granted.narrow(&certificate).narrow(&authorized);
    assert_eq!(narrowed, set(&["service:magic"]));
}

#[test]
fn test_narrow_by_self_is_identity() {
    let scopes = set(&["a*", "ab", "queue:route:*", "x"]);
    assert_eq!(scopes.narrow(&scopes), scopes);
}

#[test]
fn test_normalize_removes_covered_members() {
    let scopes = set(&["a*", "ab", "abc*", "b"]);
    assert_eq!(scopes.normalize(), set(&["a*", "b"]));
}

#[test]
fn test_display() {
    assert_eq!(set(&["b", "a"]).to_string(), "[a, b]");
}

// ============================================================================
// Matching Laws
// ============================================================================

proptest! {
    #[test]
    fn test_wildcard_law(prefix in "[a-z:/]{0,8}", required in "[a-z:/*]{0,12}") {
        let granted = format!("{}*", prefix);
        prop_assert_eq!(matches(&granted, &required), required.starts_with(&prefix));
    }

    #[test]
    fn test_exact_law(granted in "[a-z:/]{1,8}", required in "[a-z:/*]{0,12}") {
        prop_assert_eq!(matches(&granted, &required), granted == required);
    }

    #[test]
    fn test_narrow_idempotent(scopes in proptest::collection::vec("[a-c:]{0,4}\\*?", 0..6)) {
        let scopes = ScopeSet::parse(&scopes).unwrap();
        prop_assert_eq!(scopes.narrow(&scopes), scopes);
    }

    #[test]
    fn test_narrowed_set_never_grants_more(
        granted in proptest::collection::vec("[a-c:]{0,3}\\*?", 0..5),
        restriction in proptest::collection::vec("[a-c:]{0,3}\\*?", 0..5),
        required in "[a-c:]{0,4}\\*?",
    ) {
        let granted = ScopeSet::parse(&granted).unwrap();
        let restriction = ScopeSet::parse(&restriction).unwrap();
        let narrowed = granted.narrow(&restriction);

        if narrowed.satisfies(&required) {
            prop_assert!(granted.satisfies(&required));
            prop_assert!(restriction.satisfies(&required));
        }
    }
}
