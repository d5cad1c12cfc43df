//! The shaping driver.
//!
//! A [`TextProcessor`] owns one shaping run: it discovers glyphs from the
//! code points, applies the pattern's substitution and positioning units,
//! resolves cursive chains and mark stacks, and wraps the album up for the
//! client. Lookup evaluators live in the sibling modules and are invoked
//! through the processor so they share its locator and album.

mod context;
mod positioning;
mod substitution;

use types::{F2Dot14, GlyphId16};

use crate::album::{Album, GlyphTraits};
use crate::codepoints::{self, CodepointSequence};
use crate::font::{Font, LayoutDirection};
use crate::font_data::FontData;
use crate::locator::Locator;
use crate::pattern::{FeatureUnit, Pattern};
use crate::read::FontRead;
use crate::tables::gdef::{glyph_class, Gdef};
use crate::tables::gsub;
use crate::tables::layout::{ClassDefTable, LayoutHeader, Lookup, LookupList};
use crate::tables::variations::ItemVariationStore;
use crate::TextDirection;

/// Which table's evaluators nested lookups dispatch to; chosen once per
/// pass rather than per call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LookupKind {
    Substitution,
    Positioning,
}

pub(crate) struct TextProcessor<'a> {
    pattern: Option<&'a Pattern>,
    font: &'a Font,
    pub(crate) album: &'a mut Album,
    codepoints: &'a CodepointSequence<'a>,

    glyph_class_def: Option<ClassDefTable<'a>>,
    item_var_store: Option<ItemVariationStore<'a>>,
    coords: &'a [F2Dot14],
    ppem_width: u16,
    ppem_height: u16,

    lookup_list: Option<LookupList<'a>>,
    lookup_kind: LookupKind,
    /// The value of the feature whose lookup is being applied.
    lookup_value: u16,

    text_direction: TextDirection,
    contains_zero_width: bool,

    pub(crate) locator: Locator<'a>,
}

impl<'a> TextProcessor<'a> {
    pub(crate) fn new(
        pattern: Option<&'a Pattern>,
        font: &'a Font,
        album: &'a mut Album,
        codepoints: &'a CodepointSequence<'a>,
        text_direction: TextDirection,
        ppem_width: u16,
        ppem_height: u16,
    ) -> Self {
        let gdef = font.gdef_data().and_then(|data| Gdef::read(data).ok());
        let glyph_class_def = gdef.as_ref().and_then(Gdef::glyph_class_def);
        let item_var_store = gdef.as_ref().and_then(Gdef::item_var_store);
        let locator = Locator::new(gdef.as_ref());

        album.set_rendering_direction(text_direction);

        TextProcessor {
            pattern,
            font,
            album,
            codepoints,
            glyph_class_def,
            item_var_store,
            coords: font.variation_coordinates(),
            ppem_width,
            ppem_height,
            lookup_list: None,
            lookup_kind: LookupKind::Substitution,
            lookup_value: 0,
            text_direction,
            contains_zero_width: false,
            locator,
        }
    }

    pub(crate) fn text_direction(&self) -> TextDirection {
        self.text_direction
    }

    pub(crate) fn lookup_value(&self) -> u16 {
        self.lookup_value
    }

    pub(crate) fn variation_context(
        &self,
    ) -> (u16, u16, Option<&ItemVariationStore<'a>>, &'a [F2Dot14]) {
        (
            self.ppem_width,
            self.ppem_height,
            self.item_var_store.as_ref(),
            self.coords,
        )
    }

    /// The basic traits of a glyph, from the GDEF glyph class definition.
    pub(crate) fn glyph_traits(&self, glyph: GlyphId16) -> GlyphTraits {
        let Some(class_def) = &self.glyph_class_def else {
            return GlyphTraits::NONE;
        };
        match class_def.get(glyph) {
            glyph_class::BASE => GlyphTraits::BASE,
            glyph_class::LIGATURE => GlyphTraits::LIGATURE,
            glyph_class::MARK => GlyphTraits::MARK,
            glyph_class::COMPONENT => GlyphTraits::COMPONENT,
            _ => GlyphTraits::NONE,
        }
    }

    fn is_zero_width_codepoint(codepoint: char) -> bool {
        // TODO: handle other control characters as well
        ('\u{200B}'..='\u{200F}').contains(&codepoint)
    }

    /// Map every code point to its nominal glyph and classify it.
    pub(crate) fn discover_glyphs(&mut self) {
        self.album.begin_filling();

        let rtl = self.text_direction == TextDirection::RightToLeft;
        for (index, codepoint) in self.codepoints.iter() {
            let codepoint = if rtl {
                codepoints::mirror(codepoint)
            } else {
                codepoint
            };

            let glyph = self.font.glyph_for_codepoint(codepoint);
            let mut traits = self.glyph_traits(glyph);

            if Self::is_zero_width_codepoint(codepoint) {
                self.contains_zero_width = true;
                traits |= GlyphTraits::ZERO_WIDTH;
            }

            self.album.add_glyph(glyph, traits, index);
        }
    }

    /// Run the pattern's substitution units over the album.
    pub(crate) fn substitute_glyphs(&mut self) {
        let font = self.font;
        if let (Some(pattern), Some(gsub)) = (self.pattern, font.gsub_data()) {
            self.lookup_list = lookup_list_of(gsub);
            self.lookup_kind = LookupKind::Substitution;
            self.apply_feature_units(pattern.gsub_units());
        }

        self.album.end_filling();
    }

    /// Initialize positions and advances, run the positioning units, and
    /// resolve attachments.
    pub(crate) fn position_glyphs(&mut self) {
        let font = self.font;
        self.album.begin_arranging();

        // placeholder glyphs take no space
        for index in 0..self.album.glyph_count() {
            let advance = if self.album.traits(index) != GlyphTraits::PLACEHOLDER {
                font.advance_for_glyph(LayoutDirection::Horizontal, self.album.glyph(index))
            } else {
                0
            };
            self.album.set_x(index, 0);
            self.album.set_y(index, 0);
            self.album.set_advance(index, advance);
        }

        if let (Some(pattern), Some(gpos)) = (self.pattern, font.gpos_data()) {
            self.lookup_list = lookup_list_of(gpos);
            self.lookup_kind = LookupKind::Positioning;
            self.apply_feature_units(pattern.gpos_units());
            self.resolve_attachments();
        }

        if self.contains_zero_width {
            for index in 0..self.album.glyph_count() {
                if self.album.traits(index).contains(GlyphTraits::ZERO_WIDTH) {
                    self.album.set_advance(index, 0);
                }
            }
        }

        self.album.end_arranging();
    }

    pub(crate) fn wrap_up(&mut self) {
        self.album.wrap_up();
    }

    /// Apply every lookup of every unit, in unit order and ascending
    /// lookup-index order within a unit.
    fn apply_feature_units(&mut self, units: &'a [FeatureUnit]) {
        for unit in units {
            for info in &unit.lookups {
                self.lookup_value = info.value;

                let glyph_count = self.album.glyph_count();
                self.locator.reset(&*self.album, 0, glyph_count);
                self.locator.set_feature_mask(unit.mask);

                let Some(lookup) = self.prepare_lookup(info.index) else {
                    continue;
                };

                log::trace!(
                    "applying {:?} lookup {} (mask {:#06x})",
                    self.lookup_kind,
                    info.index,
                    unit.mask
                );

                // reverse-chain substitutions walk the album backwards
                let reverse = self.lookup_kind == LookupKind::Substitution
                    && lookup.lookup_type() == Ok(gsub::lookup_type::REVERSE_CHAINING_CONTEXT);

                if reverse {
                    self.locator.jump_to(&*self.album, glyph_count);
                    while let Some(index) = self.locator.move_previous(&*self.album) {
                        self.apply_subtables(&lookup, index);
                    }
                } else {
                    while let Some(index) = self.locator.move_next(&*self.album) {
                        self.apply_subtables(&lookup, index);
                    }
                }
            }
        }
    }

    /// Fetch a lookup and configure the locator filter it mandates.
    fn prepare_lookup(&mut self, lookup_index: u16) -> Option<Lookup<'a>> {
        let lookup = self
            .lookup_list
            .as_ref()?
            .lookup(lookup_index as usize)
            .ok()?;
        let lookup_flag = lookup.lookup_flag().ok()?;

        self.locator.set_lookup_flag(lookup_flag);

        if lookup_flag.use_mark_filtering_set() {
            if let Ok(mark_filtering_set) = lookup.mark_filtering_set() {
                self.locator.set_mark_filtering_set(mark_filtering_set);
            }
        }

        Some(lookup)
    }

    /// Apply the lookup's subtables at `index` in file order; the first
    /// subtable that reports success wins.
    fn apply_subtables(&mut self, lookup: &Lookup<'a>, index: usize) {
        let (Ok(lookup_type), Ok(subtable_count)) = (lookup.lookup_type(), lookup.subtable_count())
        else {
            return;
        };

        for subtable_index in 0..subtable_count as usize {
            let Ok(subtable) = lookup.subtable_data(subtable_index) else {
                continue;
            };
            if self.apply_subtable(lookup_type, subtable, index) {
                break;
            }
        }
    }

    /// Dispatch one subtable to the pass's evaluator family. Any parse
    /// error counts as "did not apply".
    pub(crate) fn apply_subtable(
        &mut self,
        lookup_type: u16,
        subtable: FontData<'a>,
        index: usize,
    ) -> bool {
        let applied = match self.lookup_kind {
            LookupKind::Substitution => {
                self.apply_substitution_subtable(lookup_type, subtable, index)
            }
            LookupKind::Positioning => {
                self.apply_positioning_subtable(lookup_type, subtable, index)
            }
        };
        applied.unwrap_or(false)
    }

    /// Apply a lookup by list index at the given position; used by the
    /// contextual evaluators for their nested records.
    pub(crate) fn apply_lookup(&mut self, lookup_index: u16, index: usize) {
        if let Some(lookup) = self.prepare_lookup(lookup_index) {
            self.apply_subtables(&lookup, index);
        }
    }
}

fn lookup_list_of(header: FontData) -> Option<LookupList> {
    LayoutHeader::read(header)
        .ok()
        .and_then(|header| header.lookup_list().ok())
}
