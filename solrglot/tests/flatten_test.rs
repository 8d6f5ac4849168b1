//! End-to-end tests for key flattening.
//!
//! The exact strings here are what the engine receives; a change in any of
//! them is a change of the query contract.

use proptest::prelude::*;
use solrglot::keys::{Conjunction, KeyExpression, KeyGroup, ParseMode, SearchKeys};
use solrglot::{Error, FlattenOptions, KeyFlattener, QueryEscaper};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn fields(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn flatten(keys: &SearchKeys, names: &[&str], mode: ParseMode) -> Result<String, Error> {
    KeyFlattener::default().flatten(keys, &fields(names), mode, &FlattenOptions::default())
}

/// True when `flat` holds a `()` whose opening paren is not escaped
fn has_empty_group(flat: &str) -> bool {
    flat.match_indices("()").any(|(at, _)| {
        let backslashes = flat[..at].chars().rev().take_while(|c| *c == '\\').count();
        backslashes % 2 == 0
    })
}

/// Escaper that makes escaping visible in the output
struct Marking;

impl QueryEscaper for Marking {
    fn escape_term(&self, input: &str) -> String {
        format!("t[{}]", input)
    }

    fn escape_phrase(&self, input: &str) -> String {
        format!("p[{}]", input)
    }
}

// ---------------------------------------------------------------------------
// Reference grid
// ---------------------------------------------------------------------------

#[test]
fn test_reference_grid() {
    let and = SearchKeys::parsed(KeyGroup::terms(["A", "B"]));
    let or = SearchKeys::parsed(KeyGroup::or(vec![
        KeyExpression::term("A"),
        KeyExpression::term("B"),
    ]));
    let not = SearchKeys::parsed(KeyGroup::terms(["A", "B"]).negate());

    assert_eq!(flatten(&and, &[], ParseMode::Keys).unwrap(), "+A +B");
    assert_eq!(flatten(&or, &[], ParseMode::Keys).unwrap(), "A B");
    assert_eq!(flatten(&not, &[], ParseMode::Keys).unwrap(), "-(+A +B)");
    assert_eq!(flatten(&and, &["x"], ParseMode::Phrase).unwrap(), "+(x:(+A +B)^1)");
    assert_eq!(
        flatten(&or, &["x", "y"], ParseMode::Edismax).unwrap(),
        "+({!edismax qf='x^1 y^1'}A B)"
    );
}

#[test]
fn test_nested_query_with_boosted_field() {
    let keys = SearchKeys::parsed(KeyGroup::and(vec![KeyExpression::group(KeyGroup::terms([
        "foo", "bar",
    ]))]));
    assert_eq!(
        flatten(&keys, &["tm_title^2"], ParseMode::Phrase).unwrap(),
        "+(tm_title:(+foo +bar)^2)"
    );
}

#[test]
fn test_injected_escaper_is_used_per_mode() {
    let keys = SearchKeys::parsed(KeyGroup::terms(["one", "two words"]));
    let flattener = KeyFlattener::new(Marking);

    let keys_mode = flattener
        .flatten(&keys, &[], ParseMode::Keys, &FlattenOptions::default())
        .unwrap();
    assert_eq!(keys_mode, "+t[one] +t[two words]");

    let phrase_mode = flattener
        .flatten(&keys, &fields(&["x"]), ParseMode::Phrase, &FlattenOptions::default())
        .unwrap();
    assert_eq!(phrase_mode, "+(x:(+t[one] +p[two words])^1)");

    let escaped = SearchKeys::escaped(KeyGroup::terms(["one"]));
    let verbatim = flattener
        .flatten(&escaped, &[], ParseMode::Keys, &FlattenOptions::default())
        .unwrap();
    assert_eq!(verbatim, "+one");
}

// ---------------------------------------------------------------------------
// Mode / arity contract
// ---------------------------------------------------------------------------

#[test]
fn test_escaped_paren_before_block_close() {
    let keys = SearchKeys::parsed(KeyGroup::terms(["("]));
    let flat = KeyFlattener::default()
        .flatten(&keys, &fields(&["x", "y^2"]), ParseMode::Terms, &FlattenOptions::default())
        .unwrap();
    assert_eq!(flat, "+(x:(+\\()^1 y:(+\\()^2)");
    assert!(!has_empty_group(&flat));
    assert!(has_empty_group("+(x:()^1)"));
    assert!(has_empty_group("a\\\\()"));
}

fn leaf() -> impl Strategy<Value = KeyExpression> {
    prop_oneof![
        "[a-z]{0,6}".prop_map(KeyExpression::Term),
        "[a-z]{1,4} [a-z]{1,4}".prop_map(KeyExpression::Term),
        "[ :()\"^~*+-]{0,3}".prop_map(KeyExpression::Term),
    ]
}

fn key_tree() -> impl Strategy<Value = KeyGroup> {
    let group = |children: Vec<KeyExpression>, or: bool, negated: bool| KeyGroup {
        children,
        conjunction: if or { Conjunction::Or } else { Conjunction::And },
        negated,
    };

    leaf()
        .prop_recursive(3, 24, 4, move |inner| {
            (prop::collection::vec(inner, 0..4), any::<bool>(), any::<bool>())
                .prop_map(move |(children, or, negated)| {
                    KeyExpression::Group(group(children, or, negated))
                })
        })
        .prop_map(|expr| match expr {
            KeyExpression::Group(g) => g,
            term => KeyGroup::and(vec![term]),
        })
}

proptest! {
    #[test]
    fn prop_keys_mode_without_fields_never_fails(root in key_tree()) {
        let keys = SearchKeys::parsed(root);
        prop_assert!(flatten(&keys, &[], ParseMode::Keys).is_ok());
    }

    #[test]
    fn prop_edismax_without_fields_always_fails(root in key_tree()) {
        let keys = SearchKeys::parsed(root);
        let err = flatten(&keys, &[], ParseMode::Edismax).unwrap_err();
        prop_assert!(err.is_incompatible_mode());
    }

    #[test]
    fn prop_empty_parens_never_appear(root in key_tree(), mode_idx in 0usize..5) {
        let mode = [
            ParseMode::Terms,
            ParseMode::Phrase,
            ParseMode::SloppyPhrase,
            ParseMode::FuzzyTerms,
            ParseMode::SloppyTerms,
        ][mode_idx];
        let keys = SearchKeys::parsed(root);
        let flat = KeyFlattener::default()
            .flatten(&keys, &fields(&["x", "y^2"]), mode, &FlattenOptions { slop: Some(2), fuzzy: Some(1) })
            .unwrap();
        prop_assert!(!has_empty_group(&flat), "{}", flat);
    }

    #[test]
    fn prop_empty_tree_flattens_to_nothing(depth in 0usize..5) {
        let mut root = KeyGroup::default();
        for _ in 0..depth {
            root = KeyGroup::and(vec![KeyExpression::group(root), KeyExpression::term("  ")]);
        }
        let keys = SearchKeys::parsed(root);
        prop_assert_eq!(flatten(&keys, &[], ParseMode::Keys).unwrap(), "");
        prop_assert_eq!(flatten(&keys, &["x"], ParseMode::Terms).unwrap(), "");
    }
}
