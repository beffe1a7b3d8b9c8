// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;

#[test]
fn new_run_id_has_prefix_and_fits_inline() {
    let id = RunId::new();
    assert!(id.starts_with(RunId::PREFIX));
    assert_eq!(id.len(), 23);
    assert_eq!(id.suffix().len(), 19);
}

#[test]
fn run_ids_are_unique() {
    assert_ne!(RunId::new(), RunId::new());
}

#[test]
fn run_id_is_path_safe() {
    let id = RunId::new();
    assert!(id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
}

#[test]
fn run_id_hash_map_lookup_by_str() {
    let mut map = HashMap::new();
    map.insert(RunId::from_string("run-abc"), 42);
    assert_eq!(map.get("run-abc"), Some(&42));
}

#[test]
fn run_id_serializes_transparently() {
    let id = RunId::from("run-xyz");
    assert_eq!(serde_json::to_string(&id).unwrap(), "\"run-xyz\"");
}

#[yare::parameterized(
    truncates      = { "abcdefghijklmnop", 8, "abcdefgh" },
    shorter        = { "abc",              8, "abc" },
    exact          = { "abcdefgh",         8, "abcdefgh" },
    multibyte_safe = { "ééééé",            2, "éé" },
)]
fn short_cases(input: &str, n: usize, expected: &str) {
    assert_eq!(short(input, n), expected);
}

#[test]
fn run_id_short_uses_suffix() {
    let id = RunId::from("run-abcdefghij");
    assert_eq!(id.short(4), "abcd");
}
