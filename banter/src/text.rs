// Copyright 2025 the Banter Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The rich text document: layout, hit testing, selection and serialization.

use std::collections::VecDeque;
use std::rc::Rc;

use crate::block::{block_height, resolve_font, Block, TextBlock};
use crate::context::TextContext;
use crate::entity::{Entity, EntityKind, LinkPtr, TextForMimeData, TextWithEntities};
use crate::fixed::Fixed;
use crate::parse;
use crate::spoiler::{OverlayImage, SpoilerCache, SpoilerPtr};
use crate::style::{text_direction, Direction, StyleFlags, TextStyle};

/// Documents cannot exceed this many code units; offsets are 16-bit.
pub const MAX_TEXT_LEN: usize = 0xFFFF;

/// Widest layout width that survives conversion to 26.6 fixed point.
const MAX_LAYOUT_WIDTH: i32 = i32::MAX >> 6;

/// A half-open byte range of selected text. Callers keep `from <= to`;
/// values clamp to the 16-bit document limit.
#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
pub struct Selection {
    pub from: u16,
    pub to: u16,
}

impl Selection {
    /// Selects the entire document, whatever its length.
    pub const ALL: Self = Self {
        from: 0,
        to: 0xFFFF,
    };

    pub const fn new(from: u16, to: u16) -> Self {
        Self { from, to }
    }

    pub const fn is_empty(self) -> bool {
        self.from == self.to
    }
}

/// Clamps a possibly out-of-range pair into a selection.
pub fn snap_selection(from: i32, to: i32) -> Selection {
    Selection::new(from.clamp(0, 0xFFFF) as u16, to.clamp(0, 0xFFFF) as u16)
}

/// Shifts a selection toward the end of the text by `by` code units.
pub fn shift_selection(selection: Selection, by: u16) -> Selection {
    snap_selection(
        i32::from(selection.from) + i32::from(by),
        i32::from(selection.to) + i32::from(by),
    )
}

/// Shifts a selection toward the start of the text by `by` code units.
pub fn unshift_selection(selection: Selection, by: u16) -> Selection {
    snap_selection(
        i32::from(selection.from) - i32::from(by),
        i32::from(selection.to) - i32::from(by),
    )
}

/// Granularity used when widening a selection.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SelectType {
    Letters,
    Words,
    Paragraphs,
}

/// Hit-test request flags.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct StateFlags(u8);

impl StateFlags {
    pub const NONE: Self = Self(0);
    pub const BREAK_EVERYWHERE: Self = Self(1 << 0);
    pub const LOOKUP_SYMBOL: Self = Self(1 << 1);
    pub const LOOKUP_LINK: Self = Self(1 << 2);
    pub const LOOKUP_CUSTOM_TOOLTIP: Self = Self(1 << 3);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl Default for StateFlags {
    fn default() -> Self {
        Self::LOOKUP_LINK
    }
}

impl core::ops::BitOr for StateFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// A hit-test request.
#[derive(Copy, Clone, Default, Debug)]
pub struct StateRequest {
    pub flags: StateFlags,
}

/// A hit-test request against an elided rendering.
#[derive(Copy, Clone, Debug)]
pub struct StateRequestElided {
    pub flags: StateFlags,
    /// Number of lines the elided rendering keeps.
    pub lines: usize,
}

impl Default for StateRequestElided {
    fn default() -> Self {
        Self {
            flags: StateFlags::default(),
            lines: 1,
        }
    }
}

/// The result of a hit test.
#[derive(Clone, Default, Debug)]
pub struct StateResult {
    pub link: Option<LinkPtr>,
    /// Set instead of `link` when the point falls on a hidden spoiler and
    /// the request asked for tooltip lookup.
    pub spoiler: Option<SpoilerPtr>,
    /// Whether the point lies exactly upon a symbol.
    pub upon_symbol: bool,
    /// Whether a caret at this point belongs after the symbol.
    pub after_symbol: bool,
    /// Byte offset of the nearest symbol.
    pub symbol: u16,
}

/// Options applied while building a document from parsed spans.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ParseOptions {
    /// When false, newline characters are replaced with spaces.
    pub multiline: bool,
    /// Hard wrap width for natural-size computation; 0 disables it.
    pub max_width: i32,
    /// Caps the paragraph count so over-long input stops laying out once
    /// this much height is reached; 0 disables it.
    pub max_height: i32,
    pub direction: Direction,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            multiline: true,
            max_width: 0,
            max_height: 0,
            direction: Direction::Auto,
        }
    }
}

impl ParseOptions {
    /// Single-line options for plain labels.
    pub fn plain() -> Self {
        Self {
            multiline: false,
            ..Self::default()
        }
    }
}

/// One packed unit on a line: a word of a text block, or a whole
/// emoji/custom-emoji/skip block.
#[derive(Clone, Debug)]
pub(crate) struct LineUnit {
    pub(crate) width: Fixed,
    pub(crate) rpadding: Fixed,
    pub(crate) rbearing: Fixed,
    /// Visible line width up to and including this unit.
    pub(crate) cum: Fixed,
    pub(crate) height: i32,
    pub(crate) break_after: bool,
    pub(crate) from: u16,
    pub(crate) to: u16,
    pub(crate) block: usize,
}

/// Greedy line packing state shared by every consumer of line enumeration.
struct Walk {
    max: Fixed,
    break_everywhere: bool,
    line: Vec<LineUnit>,
    width: Fixed,
    pending: Fixed,
    last_break: Option<usize>,
    queue: VecDeque<LineUnit>,
}

/// Per-line callback: visible width (overhang included), height, packed
/// units, and the byte span of the line. Returning false stops the walk.
type LineFn<'r> = dyn FnMut(Fixed, i32, &[LineUnit], (u16, u16)) -> bool + 'r;

impl Walk {
    fn new(max: Fixed, break_everywhere: bool) -> Self {
        Self {
            max,
            break_everywhere,
            line: Vec::new(),
            width: Fixed::ZERO,
            pending: Fixed::ZERO,
            last_break: None,
            queue: VecDeque::new(),
        }
    }

    fn commit(&mut self, mut unit: LineUnit) {
        let lead = if self.line.is_empty() {
            Fixed::ZERO
        } else {
            self.pending
        };
        self.width += lead + unit.width;
        unit.cum = self.width;
        self.pending = unit.rpadding;
        if unit.break_after || self.break_everywhere {
            self.last_break = Some(self.line.len());
        }
        self.line.push(unit);
    }

    fn reset_line(&mut self) {
        self.line.clear();
        self.width = Fixed::ZERO;
        self.pending = Fixed::ZERO;
        self.last_break = None;
    }

    /// Emits the line up to the last permitted break (or all of it) and
    /// returns the units rolled over to the next line. `None` means the
    /// callback asked to stop.
    fn emit_broken(&mut self, f: &mut LineFn<'_>) -> Option<Vec<LineUnit>> {
        let at = self.last_break.unwrap_or(self.line.len() - 1);
        let carried = self.line.split_off(at + 1);
        let last = &self.line[at];
        let width = last.cum - last.rbearing;
        let height = self.line.iter().map(|u| u.height).max().unwrap_or(0);
        let span = (self.line[0].from, last.to);
        let more = f(width, height, &self.line, span);
        self.reset_line();
        more.then_some(carried)
    }

    /// Adds one unit, emitting completed lines along the way.
    fn push(&mut self, unit: LineUnit, f: &mut LineFn<'_>) -> bool {
        self.queue.push_back(unit);
        while let Some(unit) = self.queue.pop_front() {
            let lead = if self.line.is_empty() {
                Fixed::ZERO
            } else {
                self.pending
            };
            let fits = self.line.is_empty()
                || self.width + lead + unit.width - unit.rbearing <= self.max;
            if fits {
                self.commit(unit);
                continue;
            }
            match self.emit_broken(f) {
                Some(carried) => {
                    self.queue.push_front(unit);
                    for unit in carried.into_iter().rev() {
                        self.queue.push_front(unit);
                    }
                }
                None => return false,
            }
        }
        true
    }

    /// Ends the current line at a paragraph break.
    fn newline(&mut self, at: u16, height: i32, f: &mut LineFn<'_>) -> bool {
        let (width, span) = match self.line.last() {
            Some(last) => (last.cum - last.rbearing, (self.line[0].from, last.to)),
            None => (Fixed::ZERO, (at, at)),
        };
        let line_height = self
            .line
            .iter()
            .map(|u| u.height)
            .max()
            .unwrap_or(0)
            .max(height);
        let more = f(width, line_height, &self.line, span);
        self.reset_line();
        more
    }

    /// Emits the final line. Documents always end in a line, so a trailing
    /// newline yields one empty line after it.
    fn finish(&mut self, end: u16, empty_height: i32, f: &mut LineFn<'_>) {
        let (width, height, span) = match self.line.last() {
            Some(last) => (
                last.cum - last.rbearing,
                self.line.iter().map(|u| u.height).max().unwrap_or(0),
                (self.line[0].from, last.to),
            ),
            None => (Fixed::ZERO, empty_height, (end, end)),
        };
        f(width, height, &self.line, span);
        self.reset_line();
    }
}

/// One logical rich-text document: an ordered block sequence over a text
/// buffer, plus the shared link and spoiler tables.
///
/// A document has two states: empty (no style, no blocks) and laid out.
/// `set_text`/`set_marked_text`/`clear` are the only transitions; every
/// measurement and query operation is read-only.
#[derive(Debug)]
pub struct Text {
    pub(crate) min_resize_width: Fixed,
    pub(crate) max_width: Fixed,
    pub(crate) min_height: i32,
    pub(crate) text: String,
    pub(crate) style: Option<TextStyle>,
    pub(crate) blocks: Vec<Block>,
    pub(crate) links: Vec<LinkPtr>,
    pub(crate) spoilers: Vec<SpoilerPtr>,
    pub(crate) start_dir: Direction,
    pub(crate) hard_wrap_width: i32,
    spoiler_cache: SpoilerCache,
    spoiler_shown_cache: SpoilerCache,
}

impl Default for Text {
    fn default() -> Self {
        Self::new()
    }
}

impl Text {
    /// An empty document that never splits words mid-token on resize.
    pub fn new() -> Self {
        Self::empty(Fixed::MAX)
    }

    /// An empty document whose over-long tokens are pre-split so it can be
    /// re-wrapped down to `min_resize_width` without re-shaping.
    pub fn with_min_resize_width(min_resize_width: i32) -> Self {
        Self::empty(Fixed::from_i32(min_resize_width))
    }

    fn empty(min_resize_width: Fixed) -> Self {
        Self {
            min_resize_width,
            max_width: Fixed::ZERO,
            min_height: 0,
            text: String::new(),
            style: None,
            blocks: Vec::new(),
            links: Vec::new(),
            spoilers: Vec::new(),
            start_dir: Direction::Auto,
            hard_wrap_width: 0,
            spoiler_cache: SpoilerCache::default(),
            spoiler_shown_cache: SpoilerCache::default(),
        }
    }

    /// Builds a laid-out document in one step.
    pub fn with_text(
        ctx: &TextContext<'_>,
        style: &TextStyle,
        text: &str,
        options: &ParseOptions,
    ) -> Self {
        let mut this = Self::new();
        this.set_text(ctx, style, text, options);
        this
    }

    pub fn set_text(
        &mut self,
        ctx: &TextContext<'_>,
        style: &TextStyle,
        text: &str,
        options: &ParseOptions,
    ) {
        self.set_marked_text(ctx, style, &TextWithEntities::plain(text), options);
    }

    pub fn set_marked_text(
        &mut self,
        ctx: &TextContext<'_>,
        style: &TextStyle,
        source: &TextWithEntities,
        options: &ParseOptions,
    ) {
        self.clear_fields();
        self.style = Some(*style);
        parse::parse_into(self, ctx, source, options);
        self.recount_natural_size(true, options.direction);
    }

    /// Returns the document to the empty state.
    pub fn clear(&mut self) {
        self.clear_fields();
        self.style = None;
    }

    fn clear_fields(&mut self) {
        self.text.clear();
        self.blocks.clear();
        self.links.clear();
        self.spoilers.clear();
        self.max_width = Fixed::ZERO;
        self.min_height = 0;
        self.start_dir = Direction::Auto;
        self.hard_wrap_width = 0;
        self.spoiler_cache.reset();
        self.spoiler_shown_cache.reset();
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Length of the document text in code units.
    pub fn length(&self) -> usize {
        self.text.len()
    }

    pub fn style(&self) -> Option<&TextStyle> {
        self.style.as_ref()
    }

    pub fn start_direction(&self) -> Direction {
        self.start_dir
    }

    /// Natural width: the widest line when nothing wraps, rounded up.
    pub fn max_width(&self) -> i32 {
        self.max_width.ceil_to_i32()
    }

    /// Natural height: the line heights summed when nothing wraps.
    pub fn min_height(&self) -> i32 {
        self.min_height
    }

    /// The widest line counting only monospace blocks; used to size code
    /// bubbles.
    pub fn count_max_monospace_width(&self) -> i32 {
        let mut widest = Fixed::ZERO;
        let mut line = Fixed::ZERO;
        let mut pending = Fixed::ZERO;
        for block in &self.blocks {
            match block {
                Block::Newline(_) => {
                    widest = widest.max(line);
                    line = Fixed::ZERO;
                    pending = Fixed::ZERO;
                }
                _ if block.flags().is_mono() => {
                    line += pending + block.width();
                    pending = block.rpadding();
                }
                _ => {}
            }
        }
        widest.max(line).ceil_to_i32()
    }

    pub fn has_links(&self) -> bool {
        !self.links.is_empty()
    }

    /// Replaces the handle in the 1-based link slot. Out-of-range indices
    /// are ignored.
    pub fn set_link(&mut self, index: u16, link: LinkPtr) {
        if index > 0 {
            if let Some(slot) = self.links.get_mut(index as usize - 1) {
                *slot = link;
            }
        }
    }

    pub fn spoilers_count(&self) -> usize {
        self.spoilers.len()
    }

    /// Replaces the handle in the 1-based spoiler slot. Out-of-range indices
    /// are ignored.
    pub fn set_spoiler(&mut self, index: u16, spoiler: SpoilerPtr) {
        if index > 0 {
            if let Some(slot) = self.spoilers.get_mut(index as usize - 1) {
                *slot = spoiler;
            }
        }
    }

    pub fn set_spoiler_shown(&mut self, index: u16, shown: bool) {
        if index > 0 {
            if let Some(spoiler) = self.spoilers.get(index as usize - 1) {
                spoiler.set_shown(shown);
            }
        }
    }

    /// Corner overlays for painting redacted or revealed spoiler regions.
    pub fn spoiler_corners(
        &mut self,
        shown: bool,
        color: u32,
        make: impl FnOnce(u32) -> [OverlayImage; 4],
    ) -> Rc<[OverlayImage; 4]> {
        if shown {
            self.spoiler_shown_cache.ensure(color, make)
        } else {
            self.spoiler_cache.ensure(color, make)
        }
    }

    pub fn has_custom_emoji(&self) -> bool {
        self.blocks
            .iter()
            .any(|block| matches!(block, Block::CustomEmoji(_)))
    }

    /// Releases custom pictogram imagery; handles stay bound.
    pub fn unload_custom_emoji(&mut self) {
        for block in &mut self.blocks {
            if let Block::CustomEmoji(block) = block {
                block.custom.unload();
            }
        }
    }

    pub fn has_skip_block(&self) -> bool {
        matches!(self.blocks.last(), Some(Block::Skip(_)))
    }

    /// Reserves `width`×`height` of trailing inline space for an overlay,
    /// adding or resizing the trailing skip block. Returns whether anything
    /// changed.
    pub fn update_skip_block(&mut self, width: i32, height: i32) -> bool {
        if let Some(Block::Skip(skip)) = self.blocks.last_mut() {
            if skip.data.width == Fixed::from_i32(width) && skip.height == height {
                return false;
            }
            skip.data.width = Fixed::from_i32(width);
            skip.height = height;
        } else {
            let from = self.text.len().min(MAX_TEXT_LEN) as u16;
            self.blocks.push(Block::skip(from, width, height, 0, 0));
        }
        self.recount_natural_size(false, Direction::Auto);
        true
    }

    /// Removes the trailing skip block, if any. Returns whether anything
    /// changed.
    pub fn remove_skip_block(&mut self) -> bool {
        if !self.has_skip_block() {
            return false;
        }
        self.blocks.pop();
        self.recount_natural_size(false, Direction::Auto);
        true
    }

    pub fn is_full_selection(&self, selection: Selection) -> bool {
        selection.from == 0 && selection.to as usize >= self.text.len()
    }

    /// End offset of the block at `index`: the next block's start, or the
    /// text end for the last one.
    pub(crate) fn block_end(&self, index: usize) -> u16 {
        self.blocks
            .get(index + 1)
            .map(Block::from)
            .unwrap_or(self.text.len().min(MAX_TEXT_LEN) as u16)
    }

    /// Recomputes the natural size, and on the initial pass the paragraph
    /// directions. Later passes (skip-block updates) keep directions as
    /// resolved.
    pub(crate) fn recount_natural_size(&mut self, initial: bool, options_dir: Direction) {
        if initial {
            self.start_dir = match options_dir {
                Direction::Auto => text_direction(&self.text),
                dir => dir,
            };
            for index in 0..self.blocks.len() {
                let tail = self.block_end(index) as usize;
                if let Block::Newline(newline) = &mut self.blocks[index] {
                    newline.next_direction = match options_dir {
                        Direction::Auto => text_direction(&self.text[tail.min(self.text.len())..]),
                        dir => dir,
                    };
                }
            }
        }
        let wrap = if self.hard_wrap_width > 0 {
            self.hard_wrap_width
        } else {
            MAX_LAYOUT_WIDTH
        };
        let mut widest = Fixed::ZERO;
        let mut height = 0;
        self.enumerate_lines(wrap, false, &mut |width, line_height, _, _| {
            widest = widest.max(width);
            height += line_height;
            true
        });
        self.max_width = widest;
        self.min_height = height;
    }

    /// Replays the block sequence into greedily packed lines of at most
    /// `width` units, reporting each line to `f`. The single mechanism
    /// behind width/height measurement, line-width enumeration and hit
    /// testing.
    pub(crate) fn enumerate_lines(&self, width: i32, break_everywhere: bool, f: &mut LineFn<'_>) {
        let style = match (&self.style, self.blocks.is_empty()) {
            (Some(style), false) => style,
            _ => return,
        };
        let max = Fixed::from_i32(width.clamp(0, MAX_LAYOUT_WIDTH));
        let mut walk = Walk::new(max, break_everywhere);
        for (index, block) in self.blocks.iter().enumerate() {
            let block_to = self.block_end(index);
            let height = block_height(block, style);
            match block {
                Block::Newline(_) => {
                    if !walk.newline(block.from(), height, f) {
                        return;
                    }
                }
                Block::Text(text_block) => {
                    let words = text_block.words();
                    for (i, word) in words.iter().enumerate() {
                        let to = words.get(i + 1).map(|w| w.from()).unwrap_or(block_to);
                        let unit = LineUnit {
                            width: word.width(),
                            rpadding: word.rpadding(),
                            rbearing: word.rbearing(),
                            cum: Fixed::ZERO,
                            height,
                            break_after: word.break_after(),
                            from: word.from(),
                            to,
                            block: index,
                        };
                        if !walk.push(unit, f) {
                            return;
                        }
                    }
                }
                _ => {
                    let unit = LineUnit {
                        width: block.width(),
                        rpadding: block.rpadding(),
                        rbearing: Fixed::ZERO,
                        cum: Fixed::ZERO,
                        height,
                        break_after: true,
                        from: block.from(),
                        to: block_to,
                        block: index,
                    };
                    if !walk.push(unit, f) {
                        return;
                    }
                }
            }
        }
        let end = self.text.len().min(MAX_TEXT_LEN) as u16;
        walk.finish(end, style.default_line_height(), f);
    }

    /// Width of the widest line when wrapped at `width`.
    pub fn count_width(&self, width: i32, break_everywhere: bool) -> i32 {
        let mut widest = Fixed::ZERO;
        self.enumerate_lines(width, break_everywhere, &mut |w, _, _, _| {
            widest = widest.max(w);
            true
        });
        widest.ceil_to_i32()
    }

    /// Total height when wrapped at `width`.
    pub fn count_height(&self, width: i32, break_everywhere: bool) -> i32 {
        let mut height = 0;
        self.enumerate_lines(width, break_everywhere, &mut |_, h, _, _| {
            height += h;
            true
        });
        height
    }

    /// Per-line widths when wrapped at `width`.
    pub fn count_line_widths(&self, width: i32, break_everywhere: bool) -> Vec<i32> {
        let mut widths = Vec::new();
        self.enumerate_lines(width, break_everywhere, &mut |w, _, _, _| {
            widths.push(w.ceil_to_i32());
            true
        });
        widths
    }

    /// Maps a point in layout space to the nearest symbol and any link or
    /// spoiler under it.
    pub fn get_state(
        &self,
        ctx: &TextContext<'_>,
        x: i32,
        y: i32,
        width: i32,
        request: StateRequest,
    ) -> StateResult {
        self.state_impl(ctx, x, y, width, request.flags, usize::MAX)
    }

    /// Hit test against an elided rendering capped at `request.lines` lines.
    pub fn get_state_elided(
        &self,
        ctx: &TextContext<'_>,
        x: i32,
        y: i32,
        width: i32,
        request: StateRequestElided,
    ) -> StateResult {
        self.state_impl(ctx, x, y, width, request.flags, request.lines.max(1))
    }

    fn state_impl(
        &self,
        ctx: &TextContext<'_>,
        x: i32,
        y: i32,
        width: i32,
        flags: StateFlags,
        max_lines: usize,
    ) -> StateResult {
        let mut result = StateResult::default();
        if self.blocks.is_empty() {
            return result;
        }
        let break_everywhere = flags.contains(StateFlags::BREAK_EVERYWHERE);
        let mut top = 0_i32;
        let mut line_index = 0_usize;
        let mut found = false;
        self.enumerate_lines(width, break_everywhere, &mut |_, height, units, span| {
            let last_allowed = line_index + 1 == max_lines;
            if y < top + height || last_allowed {
                found = true;
                self.hit_line(ctx, x, flags, units, span, &mut result);
                return false;
            }
            top += height;
            line_index += 1;
            result.symbol = span.1;
            true
        });
        if !found {
            // Below the last line: the caret belongs at the very end.
            result.after_symbol = result.symbol > 0;
        }
        result
    }

    fn hit_line(
        &self,
        ctx: &TextContext<'_>,
        x: i32,
        flags: StateFlags,
        units: &[LineUnit],
        span: (u16, u16),
        result: &mut StateResult,
    ) {
        result.symbol = span.0;
        if units.is_empty() {
            return;
        }
        let x = Fixed::from_i32(x);
        if x < Fixed::ZERO {
            return;
        }
        for unit in units {
            let start = unit.cum - unit.width;
            if x < start {
                // Inside the folded whitespace before this unit: the caret
                // belongs at the unit's start.
                result.symbol = unit.from;
                return;
            }
            let extent = unit.cum - unit.rbearing;
            if x <= extent {
                self.hit_unit(ctx, x - start, flags, unit, result);
                return;
            }
        }
        // Beyond the line's content.
        if let Some(last) = units.last() {
            result.symbol = last.to.min(span.1);
        }
        result.after_symbol = span.1 > span.0;
    }

    fn hit_unit(
        &self,
        ctx: &TextContext<'_>,
        offset: Fixed,
        flags: StateFlags,
        unit: &LineUnit,
        result: &mut StateResult,
    ) {
        let block = &self.blocks[unit.block];
        result.symbol = unit.from;
        result.upon_symbol = true;
        result.after_symbol = offset.raw() >= unit.width.raw() / 2;

        if flags.contains(StateFlags::LOOKUP_SYMBOL) {
            if let (Block::Text(text_block), Some(style)) = (block, &self.style) {
                self.hit_cluster(ctx, style, text_block, unit, offset, result);
            }
        }

        let hidden_spoiler = block.spoiler_index() > 0
            && self
                .spoilers
                .get(block.spoiler_index() as usize - 1)
                .is_some_and(|spoiler| !spoiler.shown());
        if flags.contains(StateFlags::LOOKUP_CUSTOM_TOOLTIP) && hidden_spoiler {
            result.spoiler = self
                .spoilers
                .get(block.spoiler_index() as usize - 1)
                .cloned();
            return;
        }
        if flags.contains(StateFlags::LOOKUP_LINK) && block.link_index() > 0 {
            result.link = self.links.get(block.link_index() as usize - 1).cloned();
        }
    }

    /// Refines a hit inside a text word to the cluster under the point by
    /// re-shaping the block's run through the context.
    fn hit_cluster(
        &self,
        ctx: &TextContext<'_>,
        style: &TextStyle,
        block: &TextBlock,
        unit: &LineUnit,
        offset: Fixed,
        result: &mut StateResult,
    ) {
        let block_from = block.data.from as usize;
        let part_end = (block_from + block.data.length as usize).min(self.text.len());
        let part = &self.text[block_from..part_end];
        let font = resolve_font(ctx, style, block.data.flags);
        let run = ctx.shaper.shape(part, font);
        if run.log_clusters.len() != part.len() {
            return;
        }

        let rel_from = unit.from as usize - block_from;
        let rel_to = (unit.to as usize).min(part_end) - block_from;
        let mut pos = rel_from;
        let mut edge = Fixed::ZERO;
        while pos < rel_to {
            let glyph_pos = run.log_clusters[pos] as usize;
            let mut next = pos + 1;
            while next < rel_to && run.log_clusters[next] as usize == glyph_pos {
                next += 1;
            }
            let mut advance = Fixed::ZERO;
            let mut g = glyph_pos;
            while g < run.glyphs.len() && (g == glyph_pos || !run.glyphs[g].cluster_start) {
                if !run.glyphs[g].dont_print {
                    advance += run.glyphs[g].advance;
                }
                g += 1;
            }
            if offset <= edge + advance || next >= rel_to {
                result.symbol = (block_from + pos).min(MAX_TEXT_LEN) as u16;
                result.upon_symbol = offset <= edge + advance;
                result.after_symbol = (offset - edge).raw() >= advance.raw() / 2;
                return;
            }
            edge += advance;
            pos = next;
        }
    }

    /// Widens a selection outward to whole units of the requested kind.
    /// Never narrows.
    pub fn adjust_selection(
        &self,
        ctx: &TextContext<'_>,
        selection: Selection,
        select_type: SelectType,
    ) -> Selection {
        let len = self.text.len().min(MAX_TEXT_LEN);
        let mut from = (selection.from as usize).min(len);
        let mut to = (selection.to as usize).min(len);
        while from > 0 && !self.text.is_char_boundary(from) {
            from -= 1;
        }
        while to < len && !self.text.is_char_boundary(to) {
            to += 1;
        }
        match select_type {
            SelectType::Letters => {
                let attrs = ctx.shaper.attributes(&self.text);
                while from > 0 && !attrs[from].is_grapheme_boundary() {
                    from -= 1;
                }
                while to < len && !attrs[to].is_grapheme_boundary() {
                    to += 1;
                }
            }
            SelectType::Words => {
                let attrs = ctx.shaper.attributes(&self.text);
                while from > 0 {
                    let prev = prev_char_start(&self.text, from);
                    if attrs[prev].is_whitespace() {
                        break;
                    }
                    from = prev;
                }
                while to < len && !attrs[to].is_whitespace() {
                    to = next_char_start(&self.text, to);
                }
            }
            SelectType::Paragraphs => {
                let bytes = self.text.as_bytes();
                while from > 0 && bytes[from - 1] != b'\n' {
                    from -= 1;
                }
                while to < len && bytes[to] != b'\n' {
                    to += 1;
                }
            }
        }
        snap_selection(from as i32, to as i32)
    }

    /// Plain text of the selection, style stripped.
    pub fn to_string(&self, selection: Selection) -> String {
        let mut collector = PlainCollector::default();
        self.enumerate_text(selection, &mut collector);
        collector.out
    }

    /// The selection as text plus entity spans, suitable for re-parsing.
    pub fn to_text_with_entities(&self, selection: Selection) -> TextWithEntities {
        let mut collector = RichCollector::default();
        self.enumerate_text(selection, &mut collector);
        collector.finish()
    }

    /// Clipboard flavours of the selection.
    pub fn to_text_for_mime_data(&self, selection: Selection) -> TextForMimeData {
        let rich = self.to_text_with_entities(selection);
        TextForMimeData {
            expanded: rich.text.clone(),
            rich,
        }
    }

    /// Replays blocks restricted to `selection`, reporting literal parts and
    /// link/spoiler/flag transitions. The single mechanism behind every
    /// serialization flavour.
    pub(crate) fn enumerate_text(&self, selection: Selection, emitter: &mut dyn Emitter) {
        let len = self.text.len().min(MAX_TEXT_LEN);
        let sel_from = (selection.from as usize).min(len);
        let sel_to = (selection.to as usize).min(len);
        if sel_from >= sel_to {
            return;
        }
        let mut flags = StyleFlags::EMPTY;
        let mut link = 0_u16;
        let mut spoiler = 0_u16;
        for (index, block) in self.blocks.iter().enumerate() {
            let from = block.from() as usize;
            let to = self.block_end(index) as usize;
            if to <= sel_from {
                continue;
            }
            if from >= sel_to {
                break;
            }
            if matches!(block, Block::Skip(_)) {
                continue;
            }

            let new_flags = block.flags();
            let new_link = block.link_index();
            let new_spoiler = block.spoiler_index();
            if new_spoiler != spoiler && spoiler != 0 {
                emitter.spoiler_end();
            }
            if new_link != link && link != 0 {
                if let Some(handle) = self.links.get(link as usize - 1) {
                    emitter.link_end(handle);
                }
            }
            if new_flags != flags {
                emitter.flags_change(flags, new_flags);
            }
            if new_link != link && new_link != 0 {
                if let Some(handle) = self.links.get(new_link as usize - 1) {
                    emitter.link_start(handle);
                }
            }
            if new_spoiler != spoiler && new_spoiler != 0 {
                emitter.spoiler_start();
            }
            flags = new_flags;
            link = new_link;
            spoiler = new_spoiler;

            let part_from = from.max(sel_from);
            let part_to = to.min(sel_to);
            if part_from >= part_to {
                continue;
            }
            let part = &self.text[part_from..part_to];
            match block {
                Block::CustomEmoji(custom) => emitter.custom_emoji(custom.custom().data(), part),
                _ => emitter.part(part),
            }
        }
        if spoiler != 0 {
            emitter.spoiler_end();
        }
        if link != 0 {
            if let Some(handle) = self.links.get(link as usize - 1) {
                emitter.link_end(handle);
            }
        }
        if !flags.is_empty() {
            emitter.flags_change(flags, StyleFlags::EMPTY);
        }
    }
}

fn prev_char_start(text: &str, index: usize) -> usize {
    let mut prev = index - 1;
    while prev > 0 && !text.is_char_boundary(prev) {
        prev -= 1;
    }
    prev
}

fn next_char_start(text: &str, index: usize) -> usize {
    let mut next = index + 1;
    while next < text.len() && !text.is_char_boundary(next) {
        next += 1;
    }
    next.min(text.len())
}

/// Receiver for [`Text::enumerate_text`] transitions.
pub(crate) trait Emitter {
    fn part(&mut self, text: &str);
    fn link_start(&mut self, _link: &LinkPtr) {}
    fn link_end(&mut self, _link: &LinkPtr) {}
    fn spoiler_start(&mut self) {}
    fn spoiler_end(&mut self) {}
    fn flags_change(&mut self, _old: StyleFlags, _new: StyleFlags) {}
    fn custom_emoji(&mut self, _data: &str, text: &str) {
        self.part(text);
    }
}

#[derive(Default)]
struct PlainCollector {
    out: String,
}

impl Emitter for PlainCollector {
    fn part(&mut self, text: &str) {
        self.out.push_str(text);
    }
}

/// Style flags that serialize as entities, with their entity kinds.
const ENTITY_FLAGS: [StyleFlags; 6] = [
    StyleFlags::BOLD,
    StyleFlags::ITALIC,
    StyleFlags::UNDERLINE,
    StyleFlags::STRIKE_OUT,
    StyleFlags::CODE,
    StyleFlags::PRE,
];

fn flag_entity_kind(flag: StyleFlags) -> EntityKind {
    match flag {
        StyleFlags::BOLD => EntityKind::Bold,
        StyleFlags::ITALIC => EntityKind::Italic,
        StyleFlags::UNDERLINE => EntityKind::Underline,
        StyleFlags::STRIKE_OUT => EntityKind::StrikeOut,
        StyleFlags::CODE => EntityKind::Code,
        _ => EntityKind::Pre,
    }
}

#[derive(Default)]
struct RichCollector {
    out: String,
    entities: Vec<Entity>,
    open_flags: Vec<(StyleFlags, usize)>,
    open_link: Option<(usize, String)>,
    open_spoiler: Option<usize>,
}

impl RichCollector {
    fn push_entity(&mut self, kind: EntityKind, from: usize) {
        let length = self.out.len() - from;
        if length > 0 {
            self.entities.push(Entity::new(
                kind,
                from.min(MAX_TEXT_LEN) as u16,
                length.min(MAX_TEXT_LEN) as u16,
            ));
        }
    }

    fn finish(mut self) -> TextWithEntities {
        self.entities
            .sort_by_key(|entity| (entity.offset, core::cmp::Reverse(entity.length)));
        TextWithEntities {
            text: self.out,
            entities: self.entities,
        }
    }
}

impl Emitter for RichCollector {
    fn part(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn link_start(&mut self, link: &LinkPtr) {
        self.open_link = Some((self.out.len(), link.url().to_owned()));
    }

    fn link_end(&mut self, _link: &LinkPtr) {
        if let Some((from, url)) = self.open_link.take() {
            self.push_entity(EntityKind::TextUrl(url), from);
        }
    }

    fn spoiler_start(&mut self) {
        self.open_spoiler = Some(self.out.len());
    }

    fn spoiler_end(&mut self) {
        if let Some(from) = self.open_spoiler.take() {
            self.push_entity(EntityKind::Spoiler, from);
        }
    }

    fn flags_change(&mut self, old: StyleFlags, new: StyleFlags) {
        for flag in ENTITY_FLAGS {
            let had = old.contains(flag);
            let has = new.contains(flag);
            if had && !has {
                if let Some(at) = self.open_flags.iter().position(|(f, _)| *f == flag) {
                    let (_, from) = self.open_flags.remove(at);
                    self.push_entity(flag_entity_kind(flag), from);
                }
            } else if !had && has {
                self.open_flags.push((flag, self.out.len()));
            }
        }
    }

    fn custom_emoji(&mut self, data: &str, text: &str) {
        let from = self.out.len();
        self.out.push_str(text);
        self.push_entity(EntityKind::CustomEmoji(data.to_owned()), from);
    }
}
