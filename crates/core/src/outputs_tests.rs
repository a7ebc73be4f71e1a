// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn parses_simple_pairs() {
    let env = parse_output_env("TOKEN=abc\nCOUNT=3\n");
    assert_eq!(env.get("TOKEN").map(String::as_str), Some("abc"));
    assert_eq!(env.get("COUNT").map(String::as_str), Some("3"));
}

#[test]
fn later_keys_shadow_earlier_ones() {
    let env = parse_output_env("K=first\nK=second\nK=third\n");
    assert_eq!(env.get("K").map(String::as_str), Some("third"));
}

#[test]
fn ignores_comments_and_blank_lines() {
    let env = parse_output_env("# header\n\n  \nA=1\n# trailing\n");
    assert_eq!(env.len(), 1);
    assert_eq!(env.get("A").map(String::as_str), Some("1"));
}

#[test]
fn trims_surrounding_whitespace() {
    let env = parse_output_env("  KEY =  value with spaces  \n");
    assert_eq!(env.get("KEY").map(String::as_str), Some("value with spaces"));
}

#[test]
fn value_may_contain_equals() {
    let env = parse_output_env("URL=https://host/p?a=1&b=2\n");
    assert_eq!(
        env.get("URL").map(String::as_str),
        Some("https://host/p?a=1&b=2")
    );
}

#[test]
fn empty_value_is_kept() {
    let env = parse_output_env("EMPTY=\n");
    assert_eq!(env.get("EMPTY").map(String::as_str), Some(""));
}

#[parameterized(
    no_equals = { "JUSTAWORD" },
    empty_key = { "=value" },
    comment = { "# K=V" },
)]
fn ignored_lines_produce_no_entries(line: &str) {
    assert!(parse_output_env(line).is_empty());
}

#[test]
fn empty_file_parses_to_empty_map() {
    assert!(parse_output_env("").is_empty());
}

// =============================================================================
// properties
// =============================================================================

use proptest::prelude::*;

proptest! {
    /// Well-formed KEY=VALUE files parse to exactly the last-wins map.
    #[test]
    fn generated_pairs_parse_with_last_wins(
        pairs in proptest::collection::vec(
            ("[A-Z][A-Z0-9_]{0,7}", "[a-zA-Z0-9 ./:-]{0,12}"),
            0..16,
        )
    ) {
        let mut content = String::new();
        let mut expected: HashMap<String, String> = HashMap::new();
        for (key, value) in &pairs {
            content.push_str(&format!("{key}={value}\n"));
            expected.insert(key.clone(), value.trim().to_string());
        }
        prop_assert_eq!(parse_output_env(&content), expected);
    }

    /// Comment and whitespace-only lines never produce entries.
    #[test]
    fn noise_lines_produce_no_entries(
        noise in proptest::collection::vec(
            prop_oneof!["#[ -~]{0,12}", "[ \t]{0,4}"],
            0..8,
        )
    ) {
        let content = noise.join("\n");
        prop_assert!(parse_output_env(&content).is_empty());
    }
}
