// Copyright 2025 the Banter Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rich styling support.

use core::ops::{BitAnd, BitOr, BitOrAssign};

use crate::font::{Font, FontMetrics};

/// The set of style attributes a run can carry.
///
/// CODE and PRE select the monospace variant of the style's font and
/// suppress the other axes; the remaining flags compose independently.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, Debug)]
pub struct StyleFlags(u16);

impl StyleFlags {
    pub const EMPTY: Self = Self(0);
    pub const BOLD: Self = Self(1 << 0);
    pub const ITALIC: Self = Self(1 << 1);
    pub const UNDERLINE: Self = Self(1 << 2);
    pub const STRIKE_OUT: Self = Self(1 << 3);
    /// Visual fix for tilde glyphs in the reference UI font; rendered with
    /// the semibold variant.
    pub const TILDE: Self = Self(1 << 4);
    pub const SEMIBOLD: Self = Self(1 << 5);
    pub const CODE: Self = Self(1 << 6);
    pub const PRE: Self = Self(1 << 7);

    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    /// Whether the run renders in the monospace variant.
    pub const fn is_mono(self) -> bool {
        self.intersects(Self(Self::CODE.0 | Self::PRE.0))
    }
}

impl BitOr for StyleFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for StyleFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for StyleFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

/// Resolved paragraph direction.
#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
pub enum Direction {
    /// Detect from the first strong character, falling back to LTR.
    #[default]
    Auto,
    Ltr,
    Rtl,
}

/// Returns the direction of the first strong character of `text`.
///
/// This is deliberately not a bidi implementation; reordering is the
/// painting collaborator's concern. The scan only answers "which margin does
/// this paragraph start from".
pub fn text_direction(text: &str) -> Direction {
    for ch in text.chars() {
        match ch {
            '\u{0590}'..='\u{08FF}' | '\u{FB1D}'..='\u{FDFF}' | '\u{FE70}'..='\u{FEFF}' => {
                return Direction::Rtl;
            }
            _ if ch.is_alphabetic() => return Direction::Ltr,
            _ => {}
        }
    }
    Direction::Auto
}

/// The resolved style a document is laid out with: the base font, its
/// invariant metrics as reported by the typography service, and the style
/// constants the block model needs.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct TextStyle {
    /// Base font; variants are resolved per block from its flags.
    pub font: Font,
    /// Metrics of the base font.
    pub font_metrics: FontMetrics,
    /// Minimum line height; the font height wins when larger.
    pub line_height: i32,
    /// Side length of an inline pictogram.
    pub emoji_size: i32,
    /// Horizontal padding on each side of an inline pictogram.
    pub emoji_padding: i32,
}

impl TextStyle {
    /// The height of a regular (non-skip) line in this style.
    pub fn default_line_height(&self) -> i32 {
        if self.line_height > self.font_metrics.height {
            self.line_height
        } else {
            self.font_metrics.height
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_composition() {
        let mut flags = StyleFlags::BOLD | StyleFlags::ITALIC;
        assert!(flags.contains(StyleFlags::BOLD));
        assert!(!flags.is_mono());
        flags.insert(StyleFlags::CODE);
        assert!(flags.is_mono());
        flags.remove(StyleFlags::BOLD);
        assert!(!flags.contains(StyleFlags::BOLD));
        assert!(flags.contains(StyleFlags::ITALIC));
    }

    #[test]
    fn first_strong_direction() {
        assert_eq!(text_direction("hello"), Direction::Ltr);
        assert_eq!(text_direction("123 \u{05D0}"), Direction::Rtl);
        assert_eq!(text_direction("123 ..."), Direction::Auto);
    }
}
