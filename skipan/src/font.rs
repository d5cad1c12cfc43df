//! The font resource consumed by shaping.
//!
//! The engine never touches font files itself; the host supplies the three
//! layout tables and the character/advance callbacks through the
//! [`FontSource`] trait, and the [`Font`] caches what it loads.

use types::{F2Dot14, GlyphId16, Tag};

use crate::font_data::FontData;

/// The layout axis an advance is queried for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutDirection {
    Horizontal,
    Vertical,
}

/// The host side of a font: table loading and character mapping.
///
/// Implementations must be thread-safe if fonts are shared across threads;
/// the engine itself calls into the source only while a `Font` is being
/// constructed and during glyph discovery and positioning.
pub trait FontSource: Send + Sync {
    /// The raw bytes of the named table, or `None` if the font has no such
    /// table.
    fn load_table(&self, tag: Tag) -> Option<Vec<u8>>;

    /// The nominal glyph for a code point (the cmap mapping).
    fn glyph_for_codepoint(&self, codepoint: char) -> GlyphId16;

    /// The advance of a glyph on the given layout axis, in font units.
    fn advance_for_glyph(&self, _direction: LayoutDirection, _glyph: GlyphId16) -> i32 {
        0
    }
}

/// A font ready for shaping: the layout tables loaded once, plus the host
/// callbacks and optional variation coordinates.
///
/// Fonts are immutable once constructed; share them with [`std::sync::Arc`].
pub struct Font {
    source: Box<dyn FontSource>,
    gdef: Option<Vec<u8>>,
    gsub: Option<Vec<u8>>,
    gpos: Option<Vec<u8>>,
    coords: Vec<F2Dot14>,
}

impl Font {
    /// Load the layout tables from the source and build a font.
    pub fn new(source: impl FontSource + 'static) -> Self {
        let gdef = source.load_table(crate::tables::gdef::TAG);
        let gsub = source.load_table(crate::tables::gsub::TAG);
        let gpos = source.load_table(crate::tables::gpos::TAG);
        Font {
            source: Box::new(source),
            gdef,
            gsub,
            gpos,
            coords: Vec::new(),
        }
    }

    /// Attach normalized variation coordinates, one per axis in axis order.
    pub fn with_variation_coordinates(mut self, coords: Vec<F2Dot14>) -> Self {
        self.coords = coords;
        self
    }

    pub fn variation_coordinates(&self) -> &[F2Dot14] {
        &self.coords
    }

    pub(crate) fn gdef_data(&self) -> Option<FontData<'_>> {
        self.gdef.as_deref().map(FontData::new)
    }

    pub(crate) fn gsub_data(&self) -> Option<FontData<'_>> {
        self.gsub.as_deref().map(FontData::new)
    }

    pub(crate) fn gpos_data(&self) -> Option<FontData<'_>> {
        self.gpos.as_deref().map(FontData::new)
    }

    pub(crate) fn glyph_for_codepoint(&self, codepoint: char) -> GlyphId16 {
        self.source.glyph_for_codepoint(codepoint)
    }

    pub(crate) fn advance_for_glyph(&self, direction: LayoutDirection, glyph: GlyphId16) -> i32 {
        self.source.advance_for_glyph(direction, glyph)
    }
}

impl std::fmt::Debug for Font {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Font")
            .field("gdef", &self.gdef.as_ref().map(Vec::len))
            .field("gsub", &self.gsub.as_ref().map(Vec::len))
            .field("gpos", &self.gpos.as_ref().map(Vec::len))
            .field("coords", &self.coords.len())
            .finish()
    }
}
