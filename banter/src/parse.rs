// Copyright 2025 the Banter Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Building the block sequence from parsed marked text.
//!
//! The outer span parser (URL detection, markdown, emoji recognition in raw
//! text) is an external collaborator; this module only converts an already
//! entity-annotated text into ordered blocks, allocating the link and
//! spoiler tables along the way.

use std::collections::BTreeSet;
use std::rc::Rc;

use crate::block::Block;
use crate::context::TextContext;
use crate::entity::{Entity, EntityKind, Link, TextWithEntities};
use crate::spoiler::Spoiler;
use crate::style::{StyleFlags, TextStyle};
use crate::text::{ParseOptions, Text, MAX_TEXT_LEN};

/// Fills `doc` (already cleared, style set) from `source`.
pub(crate) fn parse_into(
    doc: &mut Text,
    ctx: &TextContext<'_>,
    source: &TextWithEntities,
    options: &ParseOptions,
) {
    let mut text = source.text.clone();
    if !options.multiline {
        text = text.replace(['\n', '\r'], " ");
    }
    if text.len() > MAX_TEXT_LEN {
        let mut cut = MAX_TEXT_LEN;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
    }
    let len = text.len();

    let mut entities: Vec<Entity> = source
        .entities
        .iter()
        .filter(|entity| (entity.offset as usize) < len && entity.length > 0)
        .cloned()
        .collect();
    for entity in &mut entities {
        let end = (entity.end() as usize).min(len) as u16;
        entity.length = end - entity.offset;
    }
    entities.sort_by_key(|entity| entity.offset);

    let mut bounds = BTreeSet::new();
    bounds.insert(0_usize);
    bounds.insert(len);
    for entity in &entities {
        bounds.insert(entity.offset as usize);
        bounds.insert(entity.end() as usize);
    }
    for (index, byte) in text.bytes().enumerate() {
        if byte == b'\n' {
            bounds.insert(index);
            bounds.insert(index + 1);
        }
    }

    let style = *doc.style.as_ref().expect("parse runs on a styled document");
    // Slots are allocated lazily so entities past a truncation point never
    // reserve table space.
    let mut link_slots: Vec<Option<u16>> = vec![None; entities.len()];
    let mut spoiler_slots: Vec<Option<u16>> = vec![None; entities.len()];

    let para_limit = if options.max_height > 0 {
        (options.max_height / style.default_line_height()).max(1)
    } else {
        i32::MAX
    };
    let mut paragraphs = 1_i32;
    let mut truncate_at = None;

    let offsets: Vec<usize> = bounds.into_iter().collect();
    for pair in offsets.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        if from >= to || from >= len {
            continue;
        }

        let mut flags = StyleFlags::EMPTY;
        let mut link_index = 0_u16;
        let mut spoiler_index = 0_u16;
        let mut custom: Option<&str> = None;
        for (index, entity) in entities.iter().enumerate() {
            let start = entity.offset as usize;
            let end = entity.end() as usize;
            if start > from {
                break;
            }
            if from >= end {
                continue;
            }
            match &entity.kind {
                EntityKind::Bold => flags |= StyleFlags::BOLD,
                EntityKind::Italic => flags |= StyleFlags::ITALIC,
                EntityKind::Underline => flags |= StyleFlags::UNDERLINE,
                EntityKind::StrikeOut => flags |= StyleFlags::STRIKE_OUT,
                EntityKind::Code => flags |= StyleFlags::CODE,
                EntityKind::Pre => flags |= StyleFlags::PRE,
                EntityKind::Url | EntityKind::TextUrl(_) => {
                    let slot = link_slots[index].get_or_insert_with(|| {
                        let url = match &entity.kind {
                            EntityKind::TextUrl(url) => url.clone(),
                            _ => text[start..end].to_owned(),
                        };
                        doc.links.push(Rc::new(Link::new(url)));
                        doc.links.len() as u16
                    });
                    link_index = *slot;
                }
                EntityKind::Spoiler => {
                    let slot = spoiler_slots[index].get_or_insert_with(|| {
                        doc.spoilers.push(Rc::new(Spoiler::default()));
                        doc.spoilers.len() as u16
                    });
                    spoiler_index = *slot;
                }
                EntityKind::CustomEmoji(data) => {
                    if start == from && end == to {
                        custom = Some(data.as_str());
                    }
                }
            }
        }

        if text.as_bytes()[from] == b'\n' && to == from + 1 {
            if paragraphs >= para_limit {
                truncate_at = Some(from);
                break;
            }
            paragraphs += 1;
            doc.blocks.push(Block::newline(
                from as u16,
                1,
                flags,
                link_index,
                spoiler_index,
            ));
            continue;
        }

        let resolved = custom.and_then(|data| ctx.emoji.and_then(|provider| provider.custom(data)));
        if let Some(handle) = resolved {
            doc.blocks.push(Block::custom_emoji(
                &style,
                &text,
                from as u16,
                (to - from) as u16,
                flags,
                link_index,
                spoiler_index,
                handle,
            ));
            continue;
        }

        push_text_segment(
            doc,
            ctx,
            &style,
            &text,
            from,
            to,
            flags,
            link_index,
            spoiler_index,
        );
    }

    if let Some(at) = truncate_at {
        text.truncate(at);
    }
    doc.text = text;
    doc.hard_wrap_width = options.max_width.max(0);
}

/// Pushes a run of plain text as blocks, carving out emoji sub-runs through
/// the context's provider when one is attached.
fn push_text_segment(
    doc: &mut Text,
    ctx: &TextContext<'_>,
    style: &TextStyle,
    text: &str,
    from: usize,
    to: usize,
    flags: StyleFlags,
    link_index: u16,
    spoiler_index: u16,
) {
    let mut start = from;
    while start < to {
        let found = ctx
            .emoji
            .and_then(|provider| provider.find(&text[start..to]));
        match found {
            Some((range, emoji)) if range.end > range.start => {
                if range.start > 0 {
                    doc.blocks.push(Block::text(
                        ctx,
                        style,
                        text,
                        doc.min_resize_width,
                        start as u16,
                        range.start as u16,
                        flags,
                        link_index,
                        spoiler_index,
                    ));
                }
                doc.blocks.push(Block::emoji(
                    style,
                    text,
                    (start + range.start) as u16,
                    (range.end - range.start) as u16,
                    flags,
                    link_index,
                    spoiler_index,
                    emoji,
                ));
                start += range.end;
            }
            _ => {
                doc.blocks.push(Block::text(
                    ctx,
                    style,
                    text,
                    doc.min_resize_width,
                    start as u16,
                    (to - start) as u16,
                    flags,
                    link_index,
                    spoiler_index,
                ));
                break;
            }
        }
    }
}
