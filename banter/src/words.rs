// Copyright 2025 the Banter Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Word splitting: decomposing one styled run into breakable units.
//!
//! The splitter walks shaping clusters greedily, folding whitespace runs
//! into the right padding of the preceding word and closing words at break
//! opportunities. Runs wider than the resize threshold are additionally
//! split at grapheme boundaries so they can be re-wrapped on resize without
//! re-shaping; the split deliberately lags one boundary behind the overflow
//! point so the closed word never includes the cluster that overflowed.

use crate::block::{TextBlock, Word};
use crate::context::TextContext;
use crate::fixed::Fixed;
use crate::font::Font;
use crate::shape::{CharAttrs, ShapedRun};

const NBSP: char = '\u{00A0}';

/// Running length and width of a partial cluster run.
#[derive(Copy, Clone, Default)]
struct ScriptLine {
    length: usize,
    width: Fixed,
}

/// Diagnostic context dumped when the shaping service returns inconsistent
/// cluster bookkeeping.
struct RunDiag<'a> {
    text: &'a str,
    part: &'a str,
    from: u16,
    length: u16,
}

/// Tracks the previous cluster's glyph so the right bearing can be computed
/// lazily, only when a word boundary is actually emitted.
struct BearingTracker<'a> {
    ctx: &'a TextContext<'a>,
    font: Font,
    rbearing: Fixed,
    previous: Option<u32>,
}

impl BearingTracker<'_> {
    fn glyph_at(run: &ShapedRun, pos: usize) -> Option<u32> {
        if pos == 0 {
            return None;
        }
        let glyph = run.log_clusters[pos - 1] as usize;
        (glyph < run.glyphs.len()).then(|| run.glyphs[glyph].id)
    }

    fn save_current(&mut self, run: &ShapedRun, pos: usize) {
        self.previous = Self::glyph_at(run, pos);
    }

    fn compute_for(&mut self, glyph: u32) {
        let rb = self.ctx.shaper.right_bearing(self.font, glyph);
        // Only negative bearings matter: overhang past the advance.
        self.rbearing = Fixed::from_f32(rb).min(Fixed::ZERO);
    }

    fn compute(&mut self, run: &ShapedRun, pos: usize) {
        match Self::glyph_at(run, pos) {
            Some(glyph) => self.compute_for(glyph),
            None => self.rbearing = Fixed::ZERO,
        }
    }

    fn compute_for_previous(&mut self) {
        match self.previous {
            Some(glyph) => self.compute_for(glyph),
            None => self.rbearing = Fixed::ZERO,
        }
    }

    fn value(&self) -> Fixed {
        self.rbearing
    }
}

/// Splits the block's range of `text` into words, accumulating the block's
/// width and trailing padding. `min_resize_width` is the threshold beyond
/// which unbroken runs are subdivided at grapheme boundaries.
pub(crate) fn split(
    block: &mut TextBlock,
    ctx: &TextContext<'_>,
    font: Font,
    text: &str,
    min_resize_width: Fixed,
) {
    let from = block.data.from as usize;
    let end_offset = from + block.data.length as usize;
    let part = &text[from..end_offset];
    let diag = RunDiag {
        text,
        part,
        from: block.data.from,
        length: block.data.length,
    };

    let run = ctx.shaper.shape(part, font);
    let attrs = ctx.shaper.attributes(part);
    if run.log_clusters.len() != part.len() || attrs.len() != part.len() + 1 {
        cluster_mismatch(&diag, &run, 0, part.len(), 0, 0);
    }

    let end = part.len();
    let block_from = block.data.from;
    let mut bearing = BearingTracker {
        ctx,
        font,
        rbearing: Fixed::ZERO,
        previous: None,
    };

    block.words.clear();

    let mut pos = 0_usize;
    let mut glyph_count = 0_usize;
    let mut tmp = ScriptLine::default();
    let mut space = ScriptLine::default();
    let mut word_start = 0_usize;

    let mut adding_each_grapheme = false;
    let mut last_boundary: Option<(usize, ScriptLine)> = None;

    while pos < end {
        let at_space_break = {
            let mut found = false;
            for (offset, _) in part[pos..].char_indices() {
                let index = pos + offset;
                if !attrs[index].is_whitespace() {
                    break;
                } else if is_space_break(part, &attrs, index) {
                    found = true;
                    break;
                }
            }
            found
        };
        if at_space_break {
            while pos < end && attrs[pos].is_whitespace() {
                add_next_cluster(&mut pos, end, &mut space, &mut glyph_count, &run, &diag);
            }

            if block.words.is_empty() {
                block.words.push(Word::new(
                    word_start as u16 + block_from,
                    tmp.width,
                    bearing.value(),
                    true,
                ));
            }
            if let Some(last) = block.words.last_mut() {
                last.add_rpadding(space.width);
            }
            block.data.width += space.width;
            space = ScriptLine::default();

            word_start = pos;

            adding_each_grapheme = false;
            last_boundary = None;
        } else {
            loop {
                add_next_cluster(&mut pos, end, &mut tmp, &mut glyph_count, &run, &diag);

                if pos >= end
                    || is_space_break(part, &attrs, pos)
                    || is_line_break(part, &attrs, pos, block.data.link_index)
                {
                    bearing.compute(&run, pos);
                    block.words.push(Word::new(
                        word_start as u16 + block_from,
                        tmp.width,
                        bearing.value(),
                        true,
                    ));
                    block.data.width += tmp.width;
                    tmp = ScriptLine::default();
                    word_start = pos;
                    break;
                } else if attrs[pos].is_grapheme_boundary() {
                    if !adding_each_grapheme && tmp.width > min_resize_width {
                        // Close at the remembered boundary, not the current
                        // one: the word must not include the cluster that
                        // pushed it past the threshold.
                        if let Some((boundary_pos, boundary_line)) = last_boundary.take() {
                            bearing.compute_for_previous();
                            block.words.push(Word::new(
                                word_start as u16 + block_from,
                                boundary_line.width,
                                bearing.value(),
                                false,
                            ));
                            block.data.width += boundary_line.width;
                            tmp.width -= boundary_line.width;
                            tmp.length -= boundary_line.length;
                            word_start = boundary_pos;
                        }
                        adding_each_grapheme = true;
                    }
                    if adding_each_grapheme {
                        bearing.compute(&run, pos);
                        block.words.push(Word::new(
                            word_start as u16 + block_from,
                            tmp.width,
                            bearing.value(),
                            false,
                        ));
                        block.data.width += tmp.width;
                        tmp = ScriptLine::default();
                        word_start = pos;
                    } else {
                        last_boundary = Some((pos, tmp));
                        bearing.save_current(&run, pos);
                    }
                }

                if pos >= end {
                    break;
                }
            }
        }
    }

    if let Some(last) = block.words.last() {
        block.data.rpadding = last.rpadding();
        block.data.width -= block.data.rpadding;
        block.words.shrink_to_fit();
    }
}

/// Consumes one cluster: advances `pos` to the next cluster start and adds
/// the printed advances of the cluster's glyphs to `line`.
///
/// The closing check is the engine/shaper consistency invariant: after a
/// cluster, either the scan ended exactly at the glyph array end, or the
/// text cursor maps to the glyph cursor. A mismatch means the shaping
/// service returned a corrupt cluster table and aborts with diagnostics.
fn add_next_cluster(
    pos: &mut usize,
    end: usize,
    line: &mut ScriptLine,
    glyph_count: &mut usize,
    run: &ShapedRun,
    diag: &RunDiag<'_>,
) {
    let mut glyph_pos = run.log_clusters[*pos] as usize;
    if glyph_pos >= run.glyphs.len() {
        cluster_mismatch(diag, run, *pos, end, glyph_pos, *glyph_count);
    }
    loop {
        *pos += 1;
        line.length += 1;
        if !(*pos < end && run.log_clusters[*pos] as usize == glyph_pos) {
            break;
        }
    }
    loop {
        let glyph = run.glyphs[glyph_pos];
        if !glyph.dont_print {
            line.width += glyph.advance;
        }
        glyph_pos += 1;
        if !(glyph_pos < run.glyphs.len() && !run.glyphs[glyph_pos].cluster_start) {
            break;
        }
    }

    let consistent = (*pos == end && glyph_pos == run.glyphs.len())
        || (*pos < end && run.log_clusters[*pos] as usize == glyph_pos);
    if !consistent {
        cluster_mismatch(diag, run, *pos, end, glyph_pos, *glyph_count);
    }

    *glyph_count += 1;
}

fn is_space_break(part: &str, attrs: &[CharAttrs], index: usize) -> bool {
    // Never break on a non-breaking space, whatever the attribute table says.
    attrs[index].is_whitespace() && part[index..].chars().next() != Some(NBSP)
}

fn is_line_break(part: &str, attrs: &[CharAttrs], index: usize, link_index: u16) -> bool {
    // Don't break after '/' in links.
    attrs[index].is_line_break()
        && (link_index == 0 || index == 0 || part[..index].chars().next_back() != Some('/'))
}

#[cold]
fn cluster_mismatch(
    diag: &RunDiag<'_>,
    run: &ShapedRun,
    pos: usize,
    end: usize,
    glyph_pos: usize,
    glyph_count: usize,
) -> ! {
    log::error!(
        "text: {:?} (from: {}, length: {}) part: {:?}",
        diag.text,
        diag.from,
        diag.length,
        diag.part,
    );
    log::error!(
        "pos: {}, end: {}, glyph_pos: {}, glyph_count: {}, num_glyphs: {}, log_clusters[..pos]: {:?}",
        pos,
        end,
        glyph_pos,
        glyph_count,
        run.glyphs.len(),
        &run.log_clusters[..pos.min(run.log_clusters.len())],
    );
    panic!("inconsistent cluster data from the shaping service");
}
