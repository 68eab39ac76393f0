// Copyright 2025 the Banter Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rich text shaping and line layout.
//!
//! Banter turns a string annotated with style spans into an ordered block
//! sequence whose text runs are pre-split into measurable, breakable words.
//! The resulting document supports natural-size measurement,
//! width-constrained wrapping, hit testing, selection adjustment and
//! round-tripping back to plain or marked text.
//!
//! Glyph shaping, font variant resolution and painting are external
//! collaborators, consumed through the [`Shaper`], [`Typography`] and
//! [`EmojiProvider`] seams bundled into a [`TextContext`].

mod block;
mod context;
mod emoji;
mod entity;
mod fixed;
mod font;
mod parse;
mod shape;
mod spoiler;
mod style;
mod text;
mod words;

#[cfg(test)]
mod tests;

pub use block::{
    block_height, Block, BlockKind, CustomEmojiBlock, EmojiBlock, NewlineBlock, SkipBlock,
    TextBlock, Word,
};
pub use context::TextContext;
pub use emoji::{CustomEmoji, EmojiProvider, EmojiRef};
pub use entity::{Entity, EntityKind, Link, LinkPtr, TextForMimeData, TextWithEntities};
pub use fixed::Fixed;
pub use font::{Font, FontMetrics, FontVariant, Typography};
pub use shape::{CharAttrs, ShapedGlyph, ShapedRun, Shaper};
pub use spoiler::{OverlayImage, Spoiler, SpoilerCache, SpoilerPtr};
pub use style::{text_direction, Direction, StyleFlags, TextStyle};
pub use text::{
    shift_selection, snap_selection, unshift_selection, ParseOptions, SelectType, Selection,
    StateFlags, StateRequest, StateRequestElided, StateResult, Text, MAX_TEXT_LEN,
};
