// Copyright 2025 the Banter Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Spoiler handles and the redaction overlay cache.

use core::cell::Cell;
use std::rc::Rc;

/// Shared toggle state for one spoiler region.
///
/// The document and the click-dispatch collaborator each hold a reference;
/// toggling through either side is visible to both.
#[derive(Default, Debug)]
pub struct Spoiler {
    shown: Cell<bool>,
}

impl Spoiler {
    pub fn shown(&self) -> bool {
        self.shown.get()
    }

    pub fn set_shown(&self, shown: bool) {
        self.shown.set(shown);
    }
}

/// Shared-ownership handle to a spoiler.
pub type SpoilerPtr = Rc<Spoiler>;

/// One rounded-corner overlay image prepared by the painting collaborator.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct OverlayImage {
    pub width: i32,
    pub height: i32,
    pub data: Vec<u8>,
}

/// Cached corner imagery for painting redacted regions, rebuilt only when
/// the overlay colour changes. The document keeps two of these: one for the
/// hidden rendering and one for the revealed rendering.
#[derive(Clone, Default, Debug)]
pub struct SpoilerCache {
    color: Option<u32>,
    corners: Option<Rc<[OverlayImage; 4]>>,
}

impl SpoilerCache {
    /// Returns the corner overlays for `color`, invoking `make` when the
    /// cache is cold or the colour changed.
    pub fn ensure(
        &mut self,
        color: u32,
        make: impl FnOnce(u32) -> [OverlayImage; 4],
    ) -> Rc<[OverlayImage; 4]> {
        if self.color != Some(color) || self.corners.is_none() {
            self.color = Some(color);
            self.corners = Some(Rc::new(make(color)));
        }
        self.corners
            .clone()
            .expect("corner overlays were just ensured")
    }

    pub fn reset(&mut self) {
        self.color = None;
        self.corners = None;
    }
}
