//! GSUB lookup evaluators.
//!
//! Every evaluator returns `Ok(true)` only when its preconditions held and
//! the album changed; anything else (including truncated tables) means
//! "try the next subtable".

use types::GlyphId16;

use crate::album::GlyphTraits;
use crate::font_data::FontData;
use crate::read::{FontRead, ReadError};
use crate::tables::gsub::{
    lookup_type, AlternateSubst, LigatureSubst, MultipleSubst, ReverseChainSingleSubst, Sequence,
    SingleSubst,
};

use super::context::Assessment;
use super::TextProcessor;

impl<'a> TextProcessor<'a> {
    pub(crate) fn apply_substitution_subtable(
        &mut self,
        lookup_type: u16,
        subtable: FontData<'a>,
        index: usize,
    ) -> Result<bool, ReadError> {
        match lookup_type {
            lookup_type::SINGLE => self.apply_single_subst(subtable, index),
            lookup_type::MULTIPLE => self.apply_multiple_subst(subtable, index),
            lookup_type::ALTERNATE => self.apply_alternate_subst(subtable, index),
            lookup_type::LIGATURE => self.apply_ligature_subst(subtable, index),
            lookup_type::CONTEXT => self.apply_context_subtable(subtable, index),
            lookup_type::CHAINING_CONTEXT => self.apply_chain_context_subtable(subtable, index),
            lookup_type::EXTENSION => self.apply_extension_subtable(subtable, index),
            lookup_type::REVERSE_CHAINING_CONTEXT => {
                self.apply_reverse_chain_subst(subtable, index)
            }
            _ => Ok(false),
        }
    }

    /// Substitute the covered glyph and refresh its basic traits.
    fn substitute_glyph(&mut self, index: usize, substitute: GlyphId16) {
        let traits = self.glyph_traits(substitute);
        self.album.set_glyph(index, substitute);
        self.album.replace_basic_traits(index, traits);
    }

    fn apply_single_subst(
        &mut self,
        subtable: FontData<'a>,
        index: usize,
    ) -> Result<bool, ReadError> {
        let glyph = self.album.glyph(index);

        match SingleSubst::read(subtable)? {
            SingleSubst::Format1(table) => {
                if table.coverage()?.get(glyph).is_none() {
                    return Ok(false);
                }
                let delta = table.delta_glyph_id()?;
                let substitute = GlyphId16::new(glyph.to_u16().wrapping_add(delta as u16));
                self.substitute_glyph(index, substitute);
                Ok(true)
            }

            SingleSubst::Format2(table) => {
                let Some(coverage_index) = table.coverage()?.get(glyph) else {
                    return Ok(false);
                };
                if coverage_index >= table.glyph_count()? {
                    return Ok(false);
                }
                let substitute = table.substitute(coverage_index)?;
                self.substitute_glyph(index, substitute);
                Ok(true)
            }
        }
    }

    fn apply_multiple_subst(
        &mut self,
        subtable: FontData<'a>,
        index: usize,
    ) -> Result<bool, ReadError> {
        let table = MultipleSubst::read(subtable)?;
        let glyph = self.album.glyph(index);

        let Some(coverage_index) = table.coverage()?.get(glyph) else {
            return Ok(false);
        };
        if coverage_index >= table.sequence_count()? {
            return Ok(false);
        }

        self.apply_sequence(table.sequence(coverage_index)?, index)
    }

    fn apply_sequence(&mut self, sequence: Sequence<'a>, index: usize) -> Result<bool, ReadError> {
        let substitutes = sequence.substitutes()?;

        // the standard prohibits removing the glyph via an empty sequence
        let Some((&first, rest)) = substitutes.split_first() else {
            return Ok(false);
        };

        self.substitute_glyph(index, first.get());

        if !rest.is_empty() {
            let association = self.album.association(index);

            // reserve slots for the remaining substitutes
            self.locator.reserve_glyphs(self.album, rest.len());

            for (sub_index, substitute) in rest.iter().enumerate() {
                let new_index = index + 1 + sub_index;
                let traits = self.glyph_traits(substitute.get());

                self.album.set_glyph(new_index, substitute.get());
                self.album
                    .set_traits(new_index, traits | GlyphTraits::SEQUENCE);
                self.album.set_association(new_index, association);
            }

            // skip the added elements
            let jump = index + substitutes.len();
            self.locator.jump_to(&*self.album, jump);
        }

        Ok(true)
    }

    fn apply_alternate_subst(
        &mut self,
        subtable: FontData<'a>,
        index: usize,
    ) -> Result<bool, ReadError> {
        let table = AlternateSubst::read(subtable)?;
        let glyph = self.album.glyph(index);

        let Some(coverage_index) = table.coverage()?.get(glyph) else {
            return Ok(false);
        };
        if coverage_index >= table.alternate_set_count()? {
            return Ok(false);
        }

        let alternate_set = table.alternate_set(coverage_index)?;
        let alternate_index = self.lookup_value().wrapping_sub(1);

        if alternate_index >= alternate_set.glyph_count()? {
            return Ok(false);
        }

        let alternate = alternate_set.alternate(alternate_index)?;
        self.substitute_glyph(index, alternate);
        Ok(true)
    }

    fn apply_ligature_subst(
        &mut self,
        subtable: FontData<'a>,
        index: usize,
    ) -> Result<bool, ReadError> {
        let table = LigatureSubst::read(subtable)?;
        let glyph = self.album.glyph(index);

        let Some(coverage_index) = table.coverage()?.get(glyph) else {
            return Ok(false);
        };
        if coverage_index >= table.ligature_set_count()? {
            return Ok(false);
        }

        let ligature_set = table.ligature_set(coverage_index)?;
        let ligature_count = ligature_set.ligature_count()?;

        // match each ligature sequentially as they are ordered by preference
        let mut part_indexes = Vec::new();
        'ligatures: for ligature_index in 0..ligature_count {
            let ligature = ligature_set.ligature(ligature_index)?;
            let component_count = ligature.component_count()? as usize;
            if component_count == 0 {
                continue;
            }

            part_indexes.clear();
            let mut prev_index = index;

            // match components starting from the second one; the first is
            // the coverage glyph itself
            for component_index in 1..component_count {
                let Some(next_index) = self.locator.get_after(&*self.album, prev_index, true)
                else {
                    continue 'ligatures;
                };

                let component = ligature.component(component_index as u16 - 1)?;
                if component != self.album.glyph(next_index) {
                    continue 'ligatures;
                }

                part_indexes.push(next_index);
                prev_index = next_index;
            }

            // all components matched, so substitute
            let ligature_glyph = ligature.ligature_glyph()?;
            self.substitute_glyph(index, ligature_glyph);

            let ligature_association = self.album.association(index);
            let mut prev_index = index;

            for &next_index in &part_indexes {
                // the matched glyph becomes a placeholder component
                self.album.set_glyph(next_index, GlyphId16::new(0));
                self.album
                    .replace_basic_traits(next_index, GlyphTraits::PLACEHOLDER);

                // cluster the source indices of every in-between glyph
                for between in prev_index..=next_index {
                    self.album.set_association(between, ligature_association);
                }
                prev_index = next_index + 1;
            }

            return Ok(true);
        }

        Ok(false)
    }

    fn apply_reverse_chain_subst(
        &mut self,
        subtable: FontData<'a>,
        index: usize,
    ) -> Result<bool, ReadError> {
        let table = ReverseChainSingleSubst::read(subtable)?;
        let glyph = self.album.glyph(index);

        let Some(coverage_index) = table.coverage()?.get(glyph) else {
            return Ok(false);
        };

        let assessment = Assessment::coverage(table.offset_data());
        let backtrack = table.backtrack_coverage_offsets()?;
        let lookahead = table.lookahead_coverage_offsets()?;

        if self.assess_backtrack_glyphs(index, backtrack, &assessment)
            && self.assess_lookahead_glyphs(index, lookahead, &assessment)
            && coverage_index < table.glyph_count()?
        {
            let substitute = table.substitute(coverage_index)?;
            self.substitute_glyph(index, substitute);
            return Ok(true);
        }

        Ok(false)
    }
}
