// Copyright 2025 the Banter Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Font handles and the typography service seam.

use core::ops::BitOr;

use crate::fixed::Fixed;

/// Opaque handle to a concrete font variant owned by the typography service.
///
/// The engine never inspects font data; it only forwards handles back to the
/// services that issued them.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Font(u32);

impl Font {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn id(self) -> u32 {
        self.0
    }
}

/// Style axes a block requests from the typography service when resolving
/// its font variant.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, Debug)]
pub struct FontVariant(u8);

impl FontVariant {
    pub const EMPTY: Self = Self(0);
    pub const MONOSPACE: Self = Self(1 << 0);
    pub const BOLD: Self = Self(1 << 1);
    pub const SEMIBOLD: Self = Self(1 << 2);
    pub const ITALIC: Self = Self(1 << 3);
    pub const UNDERLINE: Self = Self(1 << 4);
    pub const STRIKE_OUT: Self = Self(1 << 5);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

impl BitOr for FontVariant {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Invariant metrics of one font variant.
#[derive(Copy, Clone, Default, PartialEq, Debug)]
pub struct FontMetrics {
    /// Full line height of the font.
    pub height: i32,
    /// Typographic ascent.
    pub ascent: i32,
    /// Advance of the space glyph.
    pub space_width: Fixed,
    /// Advance of the ellipsis used when eliding.
    pub elide_width: Fixed,
}

/// The typography service: resolves style-variant fonts and reports their
/// invariant metrics.
///
/// Lookup internals (family matching, synthetic variants) are the service's
/// concern; the engine treats both directions as pure functions.
pub trait Typography {
    /// Resolves the variant of `base` carrying the requested axes.
    fn variant(&self, base: Font, select: FontVariant) -> Font;

    /// Metrics for a resolved font.
    fn metrics(&self, font: Font) -> FontMetrics;
}
