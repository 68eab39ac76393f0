// Copyright 2025 the Banter Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A deterministic test environment: metrics-only typography and shaping
//! services with fixed per-character advances, so every width in a test is
//! computable by hand.
//!
//! Advances: regular characters 6 units, whitespace (including NBSP) 4,
//! CJK 12, combining marks 0 (merged into the preceding cluster). The
//! glyphs for `f`, `j` and `y` carry a -1 right bearing.

use core::ops::Range;

use crate::{
    CharAttrs, CustomEmoji, EmojiProvider, EmojiRef, Fixed, Font, FontMetrics, FontVariant,
    ParseOptions, ShapedGlyph, ShapedRun, Shaper, Text, TextContext, TextStyle, TextWithEntities,
    Typography,
};

const NBSP: char = '\u{00A0}';

fn is_combining(ch: char) -> bool {
    ('\u{0300}'..='\u{036F}').contains(&ch)
}

fn is_cjk(ch: char) -> bool {
    ('\u{4E00}'..='\u{9FFF}').contains(&ch)
}

fn is_emoji(ch: char) -> bool {
    ('\u{1F300}'..='\u{1FAFF}').contains(&ch)
}

fn advance_of(ch: char) -> Fixed {
    if is_combining(ch) {
        Fixed::ZERO
    } else if ch == ' ' || ch == '\t' || ch == '\n' || ch == NBSP {
        Fixed::from_i32(4)
    } else if is_cjk(ch) {
        Fixed::from_i32(12)
    } else {
        Fixed::from_i32(6)
    }
}

/// Typography service whose font handles encode the requested variant bits.
#[derive(Default, Debug)]
pub(crate) struct DevTypography;

impl Typography for DevTypography {
    fn variant(&self, base: Font, select: FontVariant) -> Font {
        Font::new(base.id() | (u32::from(select.bits()) << 8))
    }

    fn metrics(&self, _font: Font) -> FontMetrics {
        FontMetrics {
            height: 14,
            ascent: 11,
            space_width: Fixed::from_i32(4),
            elide_width: Fixed::from_i32(12),
        }
    }
}

/// Shaper mapping every character to one glyph (identified by its code
/// point), with combining marks merged into the preceding cluster.
#[derive(Default, Debug)]
pub(crate) struct DevShaper;

impl Shaper for DevShaper {
    fn shape(&self, text: &str, _font: Font) -> ShapedRun {
        let mut run = ShapedRun::default();
        for ch in text.chars() {
            let combining = is_combining(ch) && !run.glyphs.is_empty();
            let cluster_glyph = if combining {
                let mut start = run.glyphs.len();
                while start > 0 && !run.glyphs[start - 1].cluster_start {
                    start -= 1;
                }
                start - 1
            } else {
                run.glyphs.len()
            };
            run.glyphs.push(ShapedGlyph {
                id: ch as u32,
                advance: advance_of(ch),
                cluster_start: !combining,
                dont_print: ch == '\u{00AD}',
            });
            for _ in 0..ch.len_utf8() {
                run.log_clusters.push(cluster_glyph as u16);
            }
        }
        run
    }

    fn attributes(&self, text: &str) -> Vec<CharAttrs> {
        let mut attrs = vec![CharAttrs::default(); text.len() + 1];
        let mut prev: Option<char> = None;
        for (index, ch) in text.char_indices() {
            let mut bits = 0_u8;
            if !is_combining(ch) {
                bits |= CharAttrs::GRAPHEME;
            }
            if ch == ' ' || ch == '\t' || ch == '\n' || ch == NBSP {
                bits |= CharAttrs::WHITESPACE;
            }
            let break_before = match prev {
                Some(' ') | Some('\t') | Some('\n') => true,
                Some('-') | Some('/') => true,
                Some(p) if is_cjk(p) => true,
                _ => is_cjk(ch),
            };
            if index > 0 && break_before {
                bits |= CharAttrs::LINE_BREAK;
            }
            attrs[index] = CharAttrs::new(bits);
            prev = Some(ch);
        }
        attrs[text.len()] = CharAttrs::new(CharAttrs::GRAPHEME);
        attrs
    }

    fn right_bearing(&self, _font: Font, glyph: u32) -> f32 {
        match char::from_u32(glyph) {
            Some('f') | Some('j') | Some('y') => -1.0,
            _ => 0.0,
        }
    }
}

/// A custom pictogram identified by its entity payload.
#[derive(Debug)]
pub(crate) struct DevCustomEmoji {
    data: String,
}

impl CustomEmoji for DevCustomEmoji {
    fn data(&self) -> &str {
        &self.data
    }
}

/// Provider recognising emoji-presentation code points and resolving every
/// custom payload.
#[derive(Default, Debug)]
pub(crate) struct DevEmoji;

impl EmojiProvider for DevEmoji {
    fn find(&self, text: &str) -> Option<(Range<usize>, EmojiRef)> {
        for (index, ch) in text.char_indices() {
            if is_emoji(ch) {
                return Some((index..index + ch.len_utf8(), EmojiRef::new(ch as u32)));
            }
        }
        None
    }

    fn custom(&self, data: &str) -> Option<Box<dyn CustomEmoji>> {
        Some(Box::new(DevCustomEmoji {
            data: data.to_owned(),
        }))
    }
}

pub(crate) struct TestEnv {
    pub(crate) fonts: DevTypography,
    pub(crate) shaper: DevShaper,
    pub(crate) emoji: DevEmoji,
    pub(crate) style: TextStyle,
}

impl TestEnv {
    pub(crate) fn new() -> Self {
        let fonts = DevTypography;
        let style = TextStyle {
            font: Font::new(0),
            font_metrics: fonts.metrics(Font::new(0)),
            line_height: 0,
            emoji_size: 12,
            emoji_padding: 1,
        };
        Self {
            fonts,
            shaper: DevShaper,
            emoji: DevEmoji,
            style,
        }
    }

    pub(crate) fn ctx(&self) -> TextContext<'_> {
        TextContext::new(&self.fonts, &self.shaper)
    }

    pub(crate) fn ctx_with_emoji(&self) -> TextContext<'_> {
        self.ctx().with_emoji(&self.emoji)
    }

    /// A document over plain multiline text.
    pub(crate) fn plain(&self, text: &str) -> Text {
        Text::with_text(&self.ctx(), &self.style, text, &ParseOptions::default())
    }

    /// A document over marked text, with the emoji provider attached.
    pub(crate) fn marked(&self, source: &TextWithEntities) -> Text {
        let mut doc = Text::new();
        doc.set_marked_text(
            &self.ctx_with_emoji(),
            &self.style,
            source,
            &ParseOptions::default(),
        );
        doc
    }

    /// A document whose long tokens pre-split for resizing down to
    /// `min_resize_width`.
    pub(crate) fn resizable(&self, min_resize_width: i32, text: &str) -> Text {
        let mut doc = Text::with_min_resize_width(min_resize_width);
        doc.set_text(&self.ctx(), &self.style, text, &ParseOptions::default());
        doc
    }
}
