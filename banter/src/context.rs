// Copyright 2025 the Banter Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Borrowed bundle of the external services the engine consumes.

use core::fmt;

use crate::emoji::EmojiProvider;
use crate::font::Typography;
use crate::shape::Shaper;

/// The services a layout or hit-test pass needs, borrowed from the caller.
///
/// The engine holds no service state of its own; every operation that
/// shapes text receives one of these, in the same way the caller owns the
/// font machinery and lends it out per pass.
#[derive(Copy, Clone)]
pub struct TextContext<'a> {
    pub fonts: &'a dyn Typography,
    pub shaper: &'a dyn Shaper,
    pub emoji: Option<&'a dyn EmojiProvider>,
}

impl<'a> TextContext<'a> {
    pub fn new(fonts: &'a dyn Typography, shaper: &'a dyn Shaper) -> Self {
        Self {
            fonts,
            shaper,
            emoji: None,
        }
    }

    /// Attaches a pictogram provider for parsing passes.
    pub fn with_emoji(mut self, emoji: &'a dyn EmojiProvider) -> Self {
        self.emoji = Some(emoji);
        self
    }
}

impl fmt::Debug for TextContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextContext")
            .field("emoji", &self.emoji.is_some())
            .finish_non_exhaustive()
    }
}
