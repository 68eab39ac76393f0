// Copyright 2025 the Banter Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Serialization flavours and the marked-text round trip.

use crate::{
    Block, BlockKind, Entity, EntityKind, ParseOptions, Selection, StyleFlags, Text,
    TextWithEntities,
};

use super::utils::TestEnv;

fn sample_marked() -> TextWithEntities {
    TextWithEntities::new(
        "bold and linked here",
        vec![
            Entity::new(EntityKind::Bold, 0, 4),
            Entity::new(EntityKind::TextUrl("https://example.com".into()), 9, 6),
        ],
    )
}

fn assert_equivalent(a: &Text, b: &Text) {
    assert_eq!(a.length(), b.length());
    assert_eq!(a.blocks.len(), b.blocks.len());
    for (left, right) in a.blocks.iter().zip(&b.blocks) {
        assert_eq!(left.kind(), right.kind());
        assert_eq!(left.from(), right.from());
        assert_eq!(left.flags(), right.flags());
        assert_eq!(left.link_index(), right.link_index());
        assert_eq!(left.spoiler_index(), right.spoiler_index());
    }
    assert_eq!(a.links.len(), b.links.len());
    for (left, right) in a.links.iter().zip(&b.links) {
        assert_eq!(left.url(), right.url());
    }
    assert_eq!(a.spoilers_count(), b.spoilers_count());
}

#[test]
fn to_string_strips_style() {
    let env = TestEnv::new();
    let doc = env.marked(&sample_marked());
    assert_eq!(doc.to_string(Selection::ALL), "bold and linked here");
}

#[test]
fn selection_restricts_output() {
    let env = TestEnv::new();
    let doc = env.plain("hello world");
    assert_eq!(doc.to_string(Selection::new(6, 11)), "world");
    let partial = doc.to_string(Selection::new(3, 8));
    assert!(partial.len() <= 5);
    assert_eq!(partial, "lo wo");
}

#[test]
fn entities_survive_serialization() {
    let env = TestEnv::new();
    let doc = env.marked(&sample_marked());
    let exported = doc.to_text_with_entities(Selection::ALL);

    assert_eq!(exported.text, "bold and linked here");
    assert_eq!(exported.entities.len(), 2);
    assert_eq!(exported.entities[0], Entity::new(EntityKind::Bold, 0, 4));
    assert_eq!(
        exported.entities[1],
        Entity::new(EntityKind::TextUrl("https://example.com".into()), 9, 6)
    );
}

#[test]
fn marked_round_trip_reproduces_blocks() {
    let env = TestEnv::new();
    let doc = env.marked(&sample_marked());
    let exported = doc.to_text_with_entities(Selection::ALL);
    let again = env.marked(&exported);
    assert_equivalent(&doc, &again);
}

#[test]
fn spoiler_round_trip_keeps_bindings() {
    let env = TestEnv::new();
    let doc = env.marked(&TextWithEntities::new(
        "shh secret here",
        vec![Entity::new(EntityKind::Spoiler, 4, 6)],
    ));
    assert_eq!(doc.spoilers_count(), 1);

    let exported = doc.to_text_with_entities(Selection::ALL);
    assert_eq!(
        exported.entities,
        vec![Entity::new(EntityKind::Spoiler, 4, 6)]
    );
    let again = env.marked(&exported);
    assert_equivalent(&doc, &again);
}

#[test]
fn custom_emoji_round_trip() {
    let env = TestEnv::new();
    let doc = env.marked(&TextWithEntities::new(
        "hi X",
        vec![Entity::new(EntityKind::CustomEmoji("doc42".into()), 3, 1)],
    ));
    assert!(doc.has_custom_emoji());
    let custom = match &doc.blocks[1] {
        Block::CustomEmoji(block) => block,
        other => panic!("expected a custom emoji block, got {:?}", other.kind()),
    };
    assert_eq!(custom.custom().data(), "doc42");

    let exported = doc.to_text_with_entities(Selection::ALL);
    assert_eq!(
        exported.entities,
        vec![Entity::new(EntityKind::CustomEmoji("doc42".into()), 3, 1)]
    );
    let again = env.marked(&exported);
    assert_equivalent(&doc, &again);
}

#[test]
fn mime_data_carries_both_flavours() {
    let env = TestEnv::new();
    let doc = env.marked(&sample_marked());
    let mime = doc.to_text_for_mime_data(Selection::ALL);
    assert_eq!(mime.expanded, "bold and linked here");
    assert_eq!(mime.rich, doc.to_text_with_entities(Selection::ALL));
}

#[test]
fn newlines_serialize_in_place() {
    let env = TestEnv::new();
    let doc = env.plain("a\nb");
    assert_eq!(doc.to_string(Selection::ALL), "a\nb");
}

#[test]
fn single_line_options_flatten_newlines() {
    let env = TestEnv::new();
    let mut doc = Text::new();
    doc.set_text(&env.ctx(), &env.style, "a\nb", &ParseOptions::plain());
    assert_eq!(doc.to_string(Selection::ALL), "a b");
    assert!(doc
        .blocks
        .iter()
        .all(|block| block.kind() != BlockKind::Newline));
}

#[test]
fn skip_blocks_stay_out_of_serialization() {
    let env = TestEnv::new();
    let mut doc = env.plain("hello");
    doc.update_skip_block(20, 30);
    assert_eq!(doc.to_string(Selection::ALL), "hello");
}

#[test]
fn flags_compose_across_overlapping_entities() {
    let env = TestEnv::new();
    let doc = env.marked(&TextWithEntities::new(
        "abcdef",
        vec![
            Entity::new(EntityKind::Bold, 0, 4),
            Entity::new(EntityKind::Italic, 2, 4),
        ],
    ));
    let flags: Vec<StyleFlags> = doc.blocks.iter().map(|b| b.flags()).collect();
    assert_eq!(
        flags,
        vec![
            StyleFlags::BOLD,
            StyleFlags::BOLD | StyleFlags::ITALIC,
            StyleFlags::ITALIC,
        ]
    );
}
