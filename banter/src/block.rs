// Copyright 2025 the Banter Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Text blocks: the measurable units a document is built from.

use smallvec::SmallVec;

use crate::context::TextContext;
use crate::emoji::{CustomEmoji, EmojiRef};
use crate::fixed::Fixed;
use crate::font::{Font, FontVariant};
use crate::style::{Direction, StyleFlags, TextStyle};
use crate::words;

/// One breakable unit inside a text block: a whitespace run, a cluster run,
/// or a single grapheme cluster carved out of an over-long token.
///
/// Immutable after construction except for the right padding, which
/// accumulates the width of trailing whitespace folded into the word.
#[derive(Copy, Clone, Debug)]
pub struct Word {
    from: u16,
    width: Fixed,
    /// Raw 26.6 right bearing, saturated to ±0x7FFF. Zero or negative:
    /// positive bearings are clamped away because only trailing overhang
    /// needs correcting at line ends.
    rbearing: i16,
    rpadding: Fixed,
    /// Whether a line may break after this word in every wrap mode. False
    /// for words emitted by the mid-token grapheme split, which only break
    /// under break-everywhere or when a line has no other opportunity.
    break_after: bool,
}

impl Word {
    pub(crate) fn new(from: u16, width: Fixed, rbearing: Fixed, break_after: bool) -> Self {
        Self {
            from,
            width,
            rbearing: rbearing.saturate_i16(),
            rpadding: Fixed::ZERO,
            break_after,
        }
    }

    /// Byte offset of the word in the document text.
    pub fn from(&self) -> u16 {
        self.from
    }

    pub fn width(&self) -> Fixed {
        self.width
    }

    pub fn rbearing(&self) -> Fixed {
        Fixed::from_raw(self.rbearing as i32)
    }

    pub fn rpadding(&self) -> Fixed {
        self.rpadding
    }

    pub fn break_after(&self) -> bool {
        self.break_after
    }

    pub(crate) fn add_rpadding(&mut self, padding: Fixed) {
        self.rpadding += padding;
    }
}

/// Data shared by every block variant.
#[derive(Clone, Debug)]
pub(crate) struct BlockData {
    pub(crate) from: u16,
    pub(crate) length: u16,
    pub(crate) flags: StyleFlags,
    pub(crate) link_index: u16,
    pub(crate) spoiler_index: u16,
    pub(crate) width: Fixed,
    pub(crate) rpadding: Fixed,
}

impl BlockData {
    fn new(from: u16, length: u16, flags: StyleFlags, link_index: u16, spoiler_index: u16) -> Self {
        Self {
            from,
            length,
            flags,
            link_index,
            spoiler_index,
            width: Fixed::ZERO,
            rpadding: Fixed::ZERO,
        }
    }
}

/// A run of uniformly styled text, decomposed into words.
#[derive(Clone, Debug)]
pub struct TextBlock {
    pub(crate) data: BlockData,
    pub(crate) words: SmallVec<[Word; 2]>,
}

impl TextBlock {
    pub fn words(&self) -> &[Word] {
        &self.words
    }

    /// Trailing overhang correction: the right bearing of the last word.
    pub fn rbearing(&self) -> Fixed {
        self.words.last().map(Word::rbearing).unwrap_or(Fixed::ZERO)
    }
}

/// An inline pictogram from the application's emoji table.
#[derive(Clone, Debug)]
pub struct EmojiBlock {
    pub(crate) data: BlockData,
    pub(crate) emoji: EmojiRef,
}

impl EmojiBlock {
    pub fn emoji(&self) -> EmojiRef {
        self.emoji
    }
}

/// An inline pictogram loaded on demand through a custom resource.
#[derive(Debug)]
pub struct CustomEmojiBlock {
    pub(crate) data: BlockData,
    pub(crate) custom: Box<dyn CustomEmoji>,
}

impl CustomEmojiBlock {
    pub fn custom(&self) -> &dyn CustomEmoji {
        &*self.custom
    }
}

/// A paragraph break carrying the resolved direction of what follows.
#[derive(Clone, Debug)]
pub struct NewlineBlock {
    pub(crate) data: BlockData,
    pub(crate) next_direction: Direction,
}

impl NewlineBlock {
    pub fn next_direction(&self) -> Direction {
        self.next_direction
    }
}

/// A content-free placeholder reserving caller-specified inline space.
#[derive(Clone, Debug)]
pub struct SkipBlock {
    pub(crate) data: BlockData,
    pub(crate) height: i32,
}

impl SkipBlock {
    pub fn height(&self) -> i32 {
        self.height
    }
}

/// Discriminant of a block variant.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum BlockKind {
    Newline,
    Text,
    Emoji,
    CustomEmoji,
    Skip,
}

/// One block of a document. The set of variants is closed; exhaustive
/// matching stands in for the manual tag discipline a type-erased union
/// would need.
#[derive(Debug)]
pub enum Block {
    Newline(NewlineBlock),
    Text(TextBlock),
    Emoji(EmojiBlock),
    CustomEmoji(CustomEmojiBlock),
    Skip(SkipBlock),
}

impl Block {
    /// Builds a text block, splitting `[from, from + length)` of `text` into
    /// words when the range is not empty.
    pub fn text(
        ctx: &TextContext<'_>,
        style: &TextStyle,
        text: &str,
        min_resize_width: Fixed,
        from: u16,
        length: u16,
        flags: StyleFlags,
        link_index: u16,
        spoiler_index: u16,
    ) -> Self {
        let mut block = TextBlock {
            data: BlockData::new(from, length, flags, link_index, spoiler_index),
            words: SmallVec::new(),
        };
        if length > 0 {
            let font = resolve_font(ctx, style, flags);
            words::split(&mut block, ctx, font, text, min_resize_width);
        }
        Self::Text(block)
    }

    pub fn newline(
        from: u16,
        length: u16,
        flags: StyleFlags,
        link_index: u16,
        spoiler_index: u16,
    ) -> Self {
        Self::Newline(NewlineBlock {
            data: BlockData::new(from, length, flags, link_index, spoiler_index),
            next_direction: Direction::Auto,
        })
    }

    pub fn emoji(
        style: &TextStyle,
        text: &str,
        from: u16,
        length: u16,
        flags: StyleFlags,
        link_index: u16,
        spoiler_index: u16,
        emoji: EmojiRef,
    ) -> Self {
        let mut data = BlockData::new(from, length, flags, link_index, spoiler_index);
        size_pictogram(&mut data, style, text);
        Self::Emoji(EmojiBlock { data, emoji })
    }

    pub fn custom_emoji(
        style: &TextStyle,
        text: &str,
        from: u16,
        length: u16,
        flags: StyleFlags,
        link_index: u16,
        spoiler_index: u16,
        custom: Box<dyn CustomEmoji>,
    ) -> Self {
        let mut data = BlockData::new(from, length, flags, link_index, spoiler_index);
        size_pictogram(&mut data, style, text);
        Self::CustomEmoji(CustomEmojiBlock { data, custom })
    }

    /// Builds a placeholder block of the given footprint. The nominal length
    /// is one code unit; the block carries no text of its own.
    pub fn skip(from: u16, width: i32, height: i32, link_index: u16, spoiler_index: u16) -> Self {
        let mut data = BlockData::new(from, 1, StyleFlags::EMPTY, link_index, spoiler_index);
        data.width = Fixed::from_i32(width);
        Self::Skip(SkipBlock { data, height })
    }

    fn data(&self) -> &BlockData {
        match self {
            Self::Newline(b) => &b.data,
            Self::Text(b) => &b.data,
            Self::Emoji(b) => &b.data,
            Self::CustomEmoji(b) => &b.data,
            Self::Skip(b) => &b.data,
        }
    }

    fn data_mut(&mut self) -> &mut BlockData {
        match self {
            Self::Newline(b) => &mut b.data,
            Self::Text(b) => &mut b.data,
            Self::Emoji(b) => &mut b.data,
            Self::CustomEmoji(b) => &mut b.data,
            Self::Skip(b) => &mut b.data,
        }
    }

    pub fn kind(&self) -> BlockKind {
        match self {
            Self::Newline(_) => BlockKind::Newline,
            Self::Text(_) => BlockKind::Text,
            Self::Emoji(_) => BlockKind::Emoji,
            Self::CustomEmoji(_) => BlockKind::CustomEmoji,
            Self::Skip(_) => BlockKind::Skip,
        }
    }

    /// Byte offset of the block in the document text.
    pub fn from(&self) -> u16 {
        self.data().from
    }

    pub fn length(&self) -> u16 {
        self.data().length
    }

    pub fn flags(&self) -> StyleFlags {
        self.data().flags
    }

    /// 1-based index into the document's link table; 0 means no link.
    pub fn link_index(&self) -> u16 {
        self.data().link_index
    }

    pub fn set_link_index(&mut self, link_index: u16) {
        self.data_mut().link_index = link_index;
    }

    /// 1-based index into the document's spoiler table; 0 means no spoiler.
    pub fn spoiler_index(&self) -> u16 {
        self.data().spoiler_index
    }

    pub fn set_spoiler_index(&mut self, spoiler_index: u16) {
        self.data_mut().spoiler_index = spoiler_index;
    }

    /// Content width, excluding trailing whitespace padding.
    pub fn width(&self) -> Fixed {
        self.data().width
    }

    /// Width of trailing whitespace, rendered but excluded from wrapping.
    pub fn rpadding(&self) -> Fixed {
        self.data().rpadding
    }

    /// Trailing overhang correction. Only text blocks carry one.
    pub fn rbearing(&self) -> Fixed {
        match self {
            Self::Text(b) => b.rbearing(),
            _ => Fixed::ZERO,
        }
    }
}

/// Maps style flags to the font variant the typography service should
/// resolve. Monospace overrides every other axis; bold wins over semibold;
/// the tilde fix substitutes semibold.
pub(crate) fn resolve_font(ctx: &TextContext<'_>, style: &TextStyle, flags: StyleFlags) -> Font {
    let mut select = FontVariant::EMPTY;
    if flags.is_mono() {
        select.insert(FontVariant::MONOSPACE);
    } else {
        if flags.contains(StyleFlags::BOLD) {
            select.insert(FontVariant::BOLD);
        } else if flags.contains(StyleFlags::SEMIBOLD) {
            select.insert(FontVariant::SEMIBOLD);
        }
        if flags.contains(StyleFlags::ITALIC) {
            select.insert(FontVariant::ITALIC);
        }
        if flags.contains(StyleFlags::UNDERLINE) {
            select.insert(FontVariant::UNDERLINE);
        }
        if flags.contains(StyleFlags::STRIKE_OUT) {
            select.insert(FontVariant::STRIKE_OUT);
        }
        if flags.contains(StyleFlags::TILDE) {
            select.insert(FontVariant::SEMIBOLD);
        }
    }
    ctx.fonts.variant(style.font, select)
}

/// Pictogram footprint: fixed size plus symmetric padding, with trailing
/// spaces of the source run folded into the right padding.
fn size_pictogram(data: &mut BlockData, style: &TextStyle, text: &str) {
    data.width = Fixed::from_i32(style.emoji_size + 2 * style.emoji_padding);
    data.rpadding = Fixed::ZERO;
    let from = data.from as usize;
    let end = from + data.length as usize;
    for ch in text[from..end].chars().rev() {
        if ch == ' ' {
            data.rpadding += style.font_metrics.space_width;
        } else {
            break;
        }
    }
}

/// Height contribution of a block on its line: a skip block's explicit
/// height, else the style's line height or font height, whichever is larger.
pub fn block_height(block: &Block, style: &TextStyle) -> i32 {
    match block {
        Block::Skip(skip) => skip.height(),
        _ => style.default_line_height(),
    }
}
