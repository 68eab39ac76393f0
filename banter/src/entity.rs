// Copyright 2025 the Banter Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Marked-text types: entities, entity-annotated text and clipboard text.

use std::rc::Rc;

/// The kind of a style span, with its payload where one exists.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum EntityKind {
    Bold,
    Italic,
    Underline,
    StrikeOut,
    /// Inline monospace.
    Code,
    /// Monospace paragraph.
    Pre,
    /// A link whose text is its own target.
    Url,
    /// A link with an explicit target.
    TextUrl(String),
    Spoiler,
    /// A custom pictogram; the payload identifies the resource.
    CustomEmoji(String),
}

/// One style span over a half-open byte range of the text.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Entity {
    pub kind: EntityKind,
    pub offset: u16,
    pub length: u16,
}

impl Entity {
    pub fn new(kind: EntityKind, offset: u16, length: u16) -> Self {
        Self {
            kind,
            offset,
            length,
        }
    }

    pub fn end(&self) -> u16 {
        self.offset.saturating_add(self.length)
    }
}

/// Text annotated with entity spans, as produced by the span parser and by
/// [`crate::Text::to_text_with_entities`].
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct TextWithEntities {
    pub text: String,
    pub entities: Vec<Entity>,
}

impl TextWithEntities {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            entities: Vec::new(),
        }
    }

    pub fn new(text: impl Into<String>, entities: Vec<Entity>) -> Self {
        Self {
            text: text.into(),
            entities,
        }
    }
}

/// Clipboard flavours of a selection: the expanded plain text plus the rich
/// form with entities.
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct TextForMimeData {
    pub expanded: String,
    pub rich: TextWithEntities,
}

/// A link target shared between the document and the click-dispatch
/// collaborator. The document holds one reference; activation state lives
/// with whoever else holds the handle.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Link {
    url: String,
}

impl Link {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Shared-ownership handle to a link.
pub type LinkPtr = Rc<Link>;
