//! The top-level shaping entry point.
//!
//! An [`Artist`] bundles a piece of text with a pattern and a direction and
//! drives the text processor over an album. Scripts with joining behavior
//! get their extra passes here; everything else runs the plain pipeline.

use std::sync::Arc;

use crate::album::Album;
use crate::codepoints::CodepointSequence;
use crate::font::Font;
use crate::knowledge::arabic;
use crate::pattern::Pattern;
use crate::processor::TextProcessor;
use crate::{TextDirection, TextMode};

pub struct Artist<'a> {
    text: Option<&'a str>,
    pattern: Option<Arc<Pattern>>,
    font: Option<Arc<Font>>,
    text_direction: TextDirection,
    text_mode: TextMode,
    ppem_width: u16,
    ppem_height: u16,
}

impl Default for Artist<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Artist<'a> {
    pub fn new() -> Self {
        Artist {
            text: None,
            pattern: None,
            font: None,
            text_direction: TextDirection::LeftToRight,
            text_mode: TextMode::Forward,
            ppem_width: 0,
            ppem_height: 0,
        }
    }

    /// The text to shape.
    pub fn set_text(&mut self, text: &'a str) -> &mut Self {
        self.text = Some(text);
        self
    }

    /// The shaping plan to apply. Its font becomes the shaping font.
    pub fn set_pattern(&mut self, pattern: Arc<Pattern>) -> &mut Self {
        self.font = Some(pattern.font().clone());
        self.pattern = Some(pattern);
        self
    }

    /// A font for shaping without a pattern: glyph discovery and advances
    /// still run, features do not.
    pub fn set_font(&mut self, font: Arc<Font>) -> &mut Self {
        self.font = Some(font);
        self
    }

    pub fn set_text_direction(&mut self, text_direction: TextDirection) -> &mut Self {
        self.text_direction = text_direction;
        self
    }

    /// Whether code points are consumed forward or backward.
    pub fn set_text_mode(&mut self, text_mode: TextMode) -> &mut Self {
        self.text_mode = text_mode;
        self
    }

    /// Pixels-per-em sizes consulted by classic device tables; zero
    /// disables device adjustments.
    pub fn set_ppem(&mut self, width: u16, height: u16) -> &mut Self {
        self.ppem_width = width;
        self.ppem_height = height;
        self
    }

    /// Shape the text into the album.
    ///
    /// The album always comes out wrapped up; with no pattern (or no font
    /// at all) the output degrades gracefully rather than failing.
    pub fn fill_album(&self, album: &mut Album) {
        let text = self.text.unwrap_or("");
        let codepoints = CodepointSequence::new(text, self.text_mode == TextMode::Backward);

        album.reset(codepoints.codeunit_count(), codepoints.is_backward());

        let Some(font) = &self.font else {
            album.begin_filling();
            album.end_filling();
            album.wrap_up();
            return;
        };

        let pattern = self.pattern.as_deref();
        let arabic_script = pattern
            .map(|pattern| arabic::seek_script(pattern.script_tag()).is_some())
            .unwrap_or(false);

        let mut processor = TextProcessor::new(
            pattern,
            font,
            album,
            &codepoints,
            self.text_direction,
            self.ppem_width,
            self.ppem_height,
        );

        processor.discover_glyphs();
        if arabic_script {
            arabic::put_feature_masks(processor.album, &codepoints);
        }
        processor.substitute_glyphs();
        processor.position_glyphs();
        processor.wrap_up();
    }
}
