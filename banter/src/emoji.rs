// Copyright 2025 the Banter Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Inline pictogram handles.

use core::fmt::Debug;
use core::ops::Range;

/// Handle to an entry in the application's emoji table.
///
/// The table itself is owned by the application; blocks hold the handle,
/// never the pixels.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct EmojiRef(u32);

impl EmojiRef {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn id(self) -> u32 {
        self.0
    }
}

/// A custom pictogram resource loaded on demand by the application.
pub trait CustomEmoji: Debug {
    /// Serialized entity payload (e.g. a document id) used when exporting
    /// marked text.
    fn data(&self) -> &str;

    /// Releases loaded imagery; the handle stays valid and reloads lazily.
    fn unload(&mut self) {}
}

/// Resolves pictogram runs for block construction.
///
/// Detection of emoji inside raw text belongs to the span parser; this seam
/// only maps already-delimited runs and entity payloads to handles.
pub trait EmojiProvider {
    /// Finds the first emoji run inside `text`, if any.
    fn find(&self, text: &str) -> Option<(Range<usize>, EmojiRef)>;

    /// Instantiates the custom pictogram described by an entity payload.
    fn custom(&self, data: &str) -> Option<Box<dyn CustomEmoji>>;
}
