// Copyright 2025 the Banter Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hit testing, selection adjustment and spoiler state.

use crate::{
    shift_selection, snap_selection, unshift_selection, Entity, EntityKind, SelectType, Selection,
    StateFlags, StateRequest, StateRequestElided, TextWithEntities,
};

use super::utils::TestEnv;

fn lookup_all() -> StateRequest {
    StateRequest {
        flags: StateFlags::LOOKUP_SYMBOL | StateFlags::LOOKUP_LINK,
    }
}

#[test]
fn hit_resolves_to_the_cluster_under_the_point() {
    let env = TestEnv::new();
    let doc = env.plain("hello world");

    // 'e' spans 6..12 units on the first line.
    let state = doc.get_state(&env.ctx(), 8, 5, 200, lookup_all());
    assert_eq!(state.symbol, 1);
    assert!(state.upon_symbol);
    assert!(!state.after_symbol, "left half of the cluster");

    let state = doc.get_state(&env.ctx(), 11, 5, 200, lookup_all());
    assert_eq!(state.symbol, 1);
    assert!(state.after_symbol, "right half of the cluster");
}

#[test]
fn hit_respects_wrapped_lines() {
    let env = TestEnv::new();
    let doc = env.plain("hello world");

    // Wrapped at 40 units: "world" is the second line.
    let state = doc.get_state(&env.ctx(), 2, 20, 40, lookup_all());
    assert_eq!(state.symbol, 6);
    assert!(state.upon_symbol);
}

#[test]
fn hit_before_and_after_the_line() {
    let env = TestEnv::new();
    let doc = env.plain("hello");

    let state = doc.get_state(&env.ctx(), -5, 5, 200, lookup_all());
    assert_eq!(state.symbol, 0);
    assert!(!state.upon_symbol);

    let state = doc.get_state(&env.ctx(), 500, 5, 200, lookup_all());
    assert_eq!(state.symbol, 5);
    assert!(!state.upon_symbol);
    assert!(state.after_symbol);

    // Below every line the caret belongs at the very end.
    let state = doc.get_state(&env.ctx(), 0, 400, 200, lookup_all());
    assert_eq!(state.symbol, 5);
}

#[test]
fn links_resolve_within_their_blocks() {
    let env = TestEnv::new();
    let doc = env.marked(&TextWithEntities::new(
        "click here",
        vec![Entity::new(
            EntityKind::TextUrl("https://example.com".into()),
            6,
            4,
        )],
    ));

    assert!(doc.has_links());

    // "here" starts at 34 units (30 for "click" plus the folded space).
    let state = doc.get_state(&env.ctx(), 40, 5, 200, lookup_all());
    let link = state.link.expect("point is inside the link");
    assert_eq!(link.url(), "https://example.com");

    let state = doc.get_state(&env.ctx(), 10, 5, 200, lookup_all());
    assert!(state.link.is_none());
}

#[test]
fn hidden_spoilers_win_tooltip_lookup() {
    let env = TestEnv::new();
    let doc = env.marked(&TextWithEntities::new(
        "secret stuff",
        vec![
            Entity::new(EntityKind::TextUrl("https://s".into()), 0, 6),
            Entity::new(EntityKind::Spoiler, 0, 6),
        ],
    ));
    let request = StateRequest {
        flags: StateFlags::LOOKUP_LINK | StateFlags::LOOKUP_CUSTOM_TOOLTIP,
    };

    let state = doc.get_state(&env.ctx(), 5, 5, 200, request);
    assert!(state.spoiler.is_some(), "hidden spoiler masks the link");
    assert!(state.link.is_none());

    doc.spoilers[0].set_shown(true);
    let state = doc.get_state(&env.ctx(), 5, 5, 200, request);
    assert!(state.spoiler.is_none());
    assert!(state.link.is_some());
}

#[test]
fn spoiler_toggle_pairs_are_idempotent() {
    let env = TestEnv::new();
    let mut doc = env.marked(&TextWithEntities::new(
        "secret",
        vec![Entity::new(EntityKind::Spoiler, 0, 6)],
    ));
    assert_eq!(doc.spoilers_count(), 1);
    let before = doc.spoilers[0].shown();

    doc.set_spoiler_shown(1, true);
    doc.set_spoiler_shown(1, false);
    doc.set_spoiler_shown(1, true);
    doc.set_spoiler_shown(1, false);
    assert_eq!(doc.spoilers[0].shown(), before);
}

#[test]
fn elided_hit_maps_to_the_last_kept_line() {
    let env = TestEnv::new();
    let doc = env.plain("hello world");
    let request = StateRequestElided {
        flags: StateFlags::LOOKUP_SYMBOL,
        lines: 1,
    };

    // Far below the first line, but only one line is kept.
    let state = doc.get_state_elided(&env.ctx(), 8, 300, 40, request);
    assert_eq!(state.symbol, 1, "the point maps into the elided line");
}

#[test]
fn word_selection_snaps_outward() {
    let env = TestEnv::new();
    let doc = env.plain("hello world");

    let adjusted = doc.adjust_selection(&env.ctx(), Selection::new(3, 3), SelectType::Words);
    assert_eq!(adjusted, Selection::new(0, 5));

    let adjusted = doc.adjust_selection(&env.ctx(), Selection::new(3, 8), SelectType::Words);
    assert_eq!(adjusted, Selection::new(0, 11));
}

#[test]
fn letter_selection_snaps_to_grapheme_boundaries() {
    let env = TestEnv::new();
    // 'e' + combining acute occupies bytes 1..4.
    let doc = env.plain("he\u{0301}y");

    let adjusted = doc.adjust_selection(&env.ctx(), Selection::new(2, 2), SelectType::Letters);
    assert_eq!(adjusted, Selection::new(1, 4));
}

#[test]
fn paragraph_selection_spans_newlines() {
    let env = TestEnv::new();
    let doc = env.plain("one\ntwo three\nfour");

    let adjusted = doc.adjust_selection(&env.ctx(), Selection::new(5, 5), SelectType::Paragraphs);
    assert_eq!(adjusted, Selection::new(4, 13));
}

#[test]
fn selection_helpers_clamp_and_shift() {
    assert_eq!(snap_selection(-5, 70000), Selection::ALL);

    let selection = Selection::new(3, 8);
    assert_eq!(shift_selection(selection, 4), Selection::new(7, 12));
    assert_eq!(unshift_selection(Selection::new(7, 12), 4), selection);
    assert_eq!(unshift_selection(Selection::new(2, 8), 4), Selection::new(0, 4));

    let env = TestEnv::new();
    let doc = env.plain("hello");
    assert!(doc.is_full_selection(Selection::ALL));
    assert!(doc.is_full_selection(Selection::new(0, 5)));
    assert!(!doc.is_full_selection(Selection::new(0, 4)));
    assert!(!doc.is_full_selection(Selection::new(1, 5)));
}

#[test]
fn adjustment_is_monotonically_widening() {
    let env = TestEnv::new();
    let doc = env.plain("alpha beta\ngamma delta");
    for from in 0..doc.length() as u16 {
        for kind in [SelectType::Letters, SelectType::Words, SelectType::Paragraphs] {
            let to = (from + 2).min(doc.length() as u16);
            let adjusted = doc.adjust_selection(&env.ctx(), Selection::new(from, to), kind);
            assert!(adjusted.from <= from, "{kind:?} at {from}");
            assert!(adjusted.to >= to, "{kind:?} at {from}");
        }
    }
}
