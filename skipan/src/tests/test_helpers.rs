//! small utilities used in tests

use std::collections::HashMap;
use std::sync::Arc;

use types::{GlyphId16, Scalar, Tag};

use crate::font::{Font, FontSource, LayoutDirection};
use crate::font_data::FontData;
use crate::{Album, Artist, Scheme, TextDirection};

/// A convenience type for generating a buffer of big-endian bytes.
#[derive(Debug, Clone, Default)]
pub(crate) struct BeBuffer(Vec<u8>);

impl BeBuffer {
    pub fn new() -> Self {
        Default::default()
    }

    /// The current length of the buffer in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Return a reference to the contents of the buffer
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Write any scalar to this buffer.
    pub fn push(mut self, item: impl Scalar) -> Self {
        self.0.extend(item.to_raw().as_ref());
        self
    }

    /// Write multiple scalars into the buffer
    pub fn extend<T: Scalar>(mut self, iter: impl IntoIterator<Item = T>) -> Self {
        for item in iter {
            self.0.extend(item.to_raw().as_ref());
        }
        self
    }

    /// Append raw bytes verbatim.
    pub fn extend_bytes(mut self, bytes: &[u8]) -> Self {
        self.0.extend_from_slice(bytes);
        self
    }

    pub fn font_data(&self) -> FontData {
        FontData::new(&self.0)
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl std::ops::Deref for BeBuffer {
    type Target = [u8];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// A host font assembled from in-memory tables and explicit mappings.
#[derive(Default)]
pub(crate) struct TestFont {
    pub gdef: Option<Vec<u8>>,
    pub gsub: Option<Vec<u8>>,
    pub gpos: Option<Vec<u8>>,
    pub cmap: HashMap<char, u16>,
    pub advances: HashMap<u16, i32>,
}

impl TestFont {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn map_chars(mut self, mappings: &[(char, u16)]) -> Self {
        self.cmap.extend(mappings.iter().copied());
        self
    }

    pub fn with_gdef(mut self, gdef: Vec<u8>) -> Self {
        self.gdef = Some(gdef);
        self
    }

    pub fn with_gsub(mut self, gsub: Vec<u8>) -> Self {
        self.gsub = Some(gsub);
        self
    }

    pub fn with_gpos(mut self, gpos: Vec<u8>) -> Self {
        self.gpos = Some(gpos);
        self
    }

    pub fn with_advance(mut self, glyph: u16, advance: i32) -> Self {
        self.advances.insert(glyph, advance);
        self
    }
}

impl FontSource for TestFont {
    fn load_table(&self, tag: Tag) -> Option<Vec<u8>> {
        if tag == crate::tables::gdef::TAG {
            self.gdef.clone()
        } else if tag == crate::tables::gsub::TAG {
            self.gsub.clone()
        } else if tag == crate::tables::gpos::TAG {
            self.gpos.clone()
        } else {
            None
        }
    }

    fn glyph_for_codepoint(&self, codepoint: char) -> GlyphId16 {
        GlyphId16::new(self.cmap.get(&codepoint).copied().unwrap_or(0))
    }

    fn advance_for_glyph(&self, _direction: LayoutDirection, glyph: GlyphId16) -> i32 {
        self.advances.get(&glyph.to_u16()).copied().unwrap_or(0)
    }
}

/// Shape `text` against `script` with optional feature overrides, panicking
/// if the scheme produces no pattern.
pub(crate) fn shape(
    test_font: TestFont,
    script: &[u8; 4],
    text: &str,
    direction: TextDirection,
    overrides: &[(Tag, u16)],
) -> Album {
    let font = Arc::new(Font::new(test_font));

    let mut scheme = Scheme::new();
    scheme
        .set_font(font)
        .set_script_tag(Tag::new(script))
        .set_feature_values(overrides);
    let pattern = scheme.build_pattern().expect("pattern should resolve");

    let mut album = Album::new();
    let mut artist = Artist::new();
    artist
        .set_text(text)
        .set_pattern(pattern)
        .set_text_direction(direction);
    artist.fill_album(&mut album);
    album
}

pub(crate) fn glyph_ids(album: &Album) -> Vec<u16> {
    album.glyph_ids().iter().map(|glyph| glyph.to_u16()).collect()
}
