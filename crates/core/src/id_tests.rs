// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::HashMap;

crate::define_id! {
    /// Test ID type for macro verification.
    pub struct TestId("tst-");
}

#[test]
fn define_id_hash_map_lookup() {
    let mut map = HashMap::new();
    let id = TestId::from_string("tst-k");
    map.insert(id, 42);
    assert_eq!(map.get("tst-k"), Some(&42));
}

#[test]
fn define_id_new_has_prefix() {
    let id = TestId::new();
    assert!(id.as_str().starts_with("tst-"));
    assert_eq!(id.as_str().len(), ID_MAX_LEN);
}

#[test]
fn define_id_new_is_unique() {
    assert_ne!(TestId::new(), TestId::new());
}

#[test]
fn define_id_from_string_round_trips() {
    let id = TestId::from_string("tst-abc123");
    assert_eq!(id.as_str(), "tst-abc123");
    assert_eq!(id, "tst-abc123");
}

#[test]
fn define_id_suffix_strips_prefix() {
    let id = TestId::from_string("tst-abc123");
    assert_eq!(id.suffix(), "abc123");
}

#[test]
fn define_id_suffix_without_prefix_returns_whole_string() {
    let id = TestId::from_string("abc123");
    assert_eq!(id.suffix(), "abc123");
}

// --- short() tests ---

#[test]
fn define_id_short_truncates() {
    let id = TestId::from_string("tst-abcdefghijklmnop");
    assert_eq!(id.short(8), "abcdefgh");
}

#[test]
fn define_id_short_returns_full_when_shorter() {
    let id = TestId::from_string("tst-abc");
    assert_eq!(id.short(8), "abc");
}

#[test]
fn define_id_short_returns_full_when_exact() {
    let id = TestId::from_string("tst-abcdefgh");
    assert_eq!(id.short(8), "abcdefgh");
}

#[test]
fn short_fn_on_str() {
    let s = "abcdefghijklmnop";
    assert_eq!(short(s, 8), "abcdefgh");
    assert_eq!(short(s, 100), s);
    assert_eq!(short("abc", 8), "abc");
}

// --- IdBuf tests ---

#[test]
fn idbuf_borrow_str_matches_hash() {
    let mut map: HashMap<IdBuf, u32> = HashMap::new();
    map.insert(IdBuf::new("abc"), 1);
    assert_eq!(map.get("abc"), Some(&1));
}

#[test]
fn idbuf_empty_is_empty() {
    assert!(IdBuf::empty().is_empty());
    assert!(!IdBuf::new("x").is_empty());
}

// --- WorkerId ---

#[test]
fn worker_id_from_control_plane_string_has_no_prefix_requirement() {
    let id = WorkerId::from_string("model-7f3a");
    assert_eq!(id.as_str(), "model-7f3a");
}

#[test]
fn worker_id_equality_by_value() {
    assert_eq!(WorkerId::from_string("w1"), WorkerId::from_string("w1"));
    assert_ne!(WorkerId::from_string("w1"), WorkerId::from_string("w2"));
}

#[test]
fn worker_id_usable_as_hashmap_key_via_borrowed_str() {
    let mut map: HashMap<WorkerId, u32> = HashMap::new();
    map.insert(WorkerId::from_string("w1"), 10);
    assert_eq!(map.get("w1"), Some(&10));
}
