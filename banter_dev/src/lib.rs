// Copyright 2025 the Banter Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # Banter Dev
//!
//! This crate provides utilities for developing Banter.

/// A sample to be used for development.
#[derive(Debug)]
pub struct Sample {
    /// The name of the sample.
    pub name: &'static str,
    /// The text of the sample.
    pub text: &'static str,
}

/// A collection of text samples.
#[derive(Debug)]
pub struct TextSamples {
    /// Plain Latin prose with ordinary word breaks.
    pub latin: Sample,
    /// A message with a long pasted URL and no break opportunities inside it.
    pub url: Sample,
    /// An unbroken token far wider than any reasonable wrap width.
    pub long_token: Sample,
    /// Text with non-breaking spaces between the measurements.
    pub nbsp: Sample,
}

impl TextSamples {
    /// Creates a new collection of text samples.
    pub const fn new() -> Self {
        Self {
            latin: Sample {
                name: "latin",
                text: "the quick brown fox jumps over the lazy dog",
            },
            url: Sample {
                name: "url",
                text: "see https://example.com/very/long/path/with/many/segments/inside for details",
            },
            long_token: Sample {
                name: "long_token",
                text: "pneumonoultramicroscopicsilicovolcanoconiosisandthensomemoretext",
            },
            nbsp: Sample {
                name: "nbsp",
                text: "10\u{00A0}kg and 20\u{00A0}km apart",
            },
        }
    }
}

impl Default for TextSamples {
    fn default() -> Self {
        Self::new()
    }
}
