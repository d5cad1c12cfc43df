//! Contextual and chained-contextual evaluation, shared by GSUB and GPOS.
//!
//! The three on-disk formats differ only in how a position is matched
//! against a rule value (by glyph, by class, or by coverage), so the
//! matchers are parameterized over an [`Assessment`] and the zone being
//! matched.

use types::{BigEndian, GlyphId16};

use crate::font_data::FontData;
use crate::read::{FontRead, ReadError};
use crate::tables::context::{
    ChainedRule, ChainedRuleSet, ChainedSequenceContext, ExtensionSubtable, Rule, RuleSet,
    SequenceContext, SequenceLookupRecord,
};
use crate::tables::layout::{ClassDefTable, CoverageTable};

use super::TextProcessor;

/// Which stretch of the context a value belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum GlyphZone {
    Input,
    Backtrack,
    Lookahead,
}

/// How rule values are matched against glyphs.
pub(crate) enum Assessment<'a> {
    /// Values are glyph ids.
    Equality,
    /// Values are classes in the zone's class definition.
    Classes {
        input: ClassDefTable<'a>,
        backtrack: Option<ClassDefTable<'a>>,
        lookahead: Option<ClassDefTable<'a>>,
    },
    /// Values are coverage offsets relative to the subtable.
    Coverage(FontData<'a>),
}

impl<'a> Assessment<'a> {
    pub(crate) fn coverage(parent: FontData<'a>) -> Self {
        Assessment::Coverage(parent)
    }

    fn assess(&self, zone: GlyphZone, glyph: GlyphId16, value: u16) -> bool {
        match self {
            Assessment::Equality => glyph.to_u16() == value,

            Assessment::Classes {
                input,
                backtrack,
                lookahead,
            } => {
                let class_def = match zone {
                    GlyphZone::Input => Some(input),
                    GlyphZone::Backtrack => backtrack.as_ref(),
                    GlyphZone::Lookahead => lookahead.as_ref(),
                };
                class_def.is_some_and(|class_def| class_def.get(glyph) == value)
            }

            Assessment::Coverage(parent) => parent
                .split_off(value as usize)
                .and_then(|data| CoverageTable::read(data).ok())
                .is_some_and(|coverage| coverage.get(glyph).is_some()),
        }
    }
}

impl<'a> TextProcessor<'a> {
    /// Match the input sequence starting at `index`; returns the index of
    /// the last input glyph (the context end).
    ///
    /// When `include_first` is set the first value describes the glyph at
    /// `index` itself; otherwise that glyph was already matched by the
    /// coverage or class that selected the rule.
    fn assess_input_glyphs(
        &self,
        index: usize,
        values: &[BigEndian<u16>],
        include_first: bool,
        assessment: &Assessment<'a>,
    ) -> Option<usize> {
        let mut input_index = index;
        let mut values = values.iter();

        if include_first {
            let value = values.next()?.get();
            if !assessment.assess(GlyphZone::Input, self.album.glyph(index), value) {
                return None;
            }
        }

        for value in values {
            input_index = self.locator.get_after(&*self.album, input_index, true)?;
            let glyph = self.album.glyph(input_index);
            if !assessment.assess(GlyphZone::Input, glyph, value.get()) {
                return None;
            }
        }

        Some(input_index)
    }

    /// Match the backtrack sequence, scanning backwards from `index`.
    pub(crate) fn assess_backtrack_glyphs(
        &self,
        index: usize,
        values: &[BigEndian<u16>],
        assessment: &Assessment<'a>,
    ) -> bool {
        let mut back_index = index;

        for value in values {
            let Some(previous) = self.locator.get_before(&*self.album, back_index, false) else {
                return false;
            };
            let glyph = self.album.glyph(previous);
            if !assessment.assess(GlyphZone::Backtrack, glyph, value.get()) {
                return false;
            }
            back_index = previous;
        }

        true
    }

    /// Match the lookahead sequence, scanning forwards from `context_end`.
    pub(crate) fn assess_lookahead_glyphs(
        &self,
        context_end: usize,
        values: &[BigEndian<u16>],
        assessment: &Assessment<'a>,
    ) -> bool {
        let mut ahead_index = context_end;

        for value in values {
            let Some(next) = self.locator.get_after(&*self.album, ahead_index, false) else {
                return false;
            };
            let glyph = self.album.glyph(next);
            if !assessment.assess(GlyphZone::Lookahead, glyph, value.get()) {
                return false;
            }
            ahead_index = next;
        }

        true
    }

    pub(crate) fn apply_context_subtable(
        &mut self,
        subtable: FontData<'a>,
        index: usize,
    ) -> Result<bool, ReadError> {
        let glyph = self.album.glyph(index);

        match SequenceContext::read(subtable)? {
            SequenceContext::Format1(table) => {
                let Some(coverage_index) = table.coverage()?.get(glyph) else {
                    return Ok(false);
                };
                if coverage_index >= table.rule_set_count()? {
                    return Ok(false);
                }
                let Some(rule_set) = table.rule_set(coverage_index as usize)? else {
                    return Ok(false);
                };
                self.apply_rule_set(&rule_set, &Assessment::Equality, index)
            }

            SequenceContext::Format2(table) => {
                if table.coverage()?.get(glyph).is_none() {
                    return Ok(false);
                }
                let class_def = table.class_def()?;
                let class = class_def.get(glyph);
                if class >= table.rule_set_count()? {
                    return Ok(false);
                }
                let Some(rule_set) = table.rule_set(class as usize)? else {
                    return Ok(false);
                };
                let assessment = Assessment::Classes {
                    input: class_def,
                    backtrack: None,
                    lookahead: None,
                };
                self.apply_rule_set(&rule_set, &assessment, index)
            }

            SequenceContext::Format3(table) => {
                let glyph_count = table.glyph_count()?;
                if glyph_count == 0 {
                    return Ok(false);
                }
                let assessment = Assessment::coverage(table.offset_data());
                let Some(context_end) = self.assess_input_glyphs(
                    index,
                    table.coverage_offsets()?,
                    true,
                    &assessment,
                ) else {
                    return Ok(false);
                };
                let records = table.lookup_records()?;
                Ok(self.apply_context_lookups(records, index, context_end))
            }
        }
    }

    fn apply_rule_set(
        &mut self,
        rule_set: &RuleSet<'a>,
        assessment: &Assessment<'a>,
        index: usize,
    ) -> Result<bool, ReadError> {
        // match each rule sequentially as they are ordered by preference
        let rule_count = rule_set.rule_count()?;
        for rule_index in 0..rule_count as usize {
            if let Some(rule) = rule_set.rule(rule_index)? {
                if self.apply_rule(&rule, assessment, index)? {
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }

    fn apply_rule(
        &mut self,
        rule: &Rule<'a>,
        assessment: &Assessment<'a>,
        index: usize,
    ) -> Result<bool, ReadError> {
        // the rule must cover at least the already-matched first glyph
        if rule.glyph_count()? == 0 {
            return Ok(false);
        }

        let Some(context_end) =
            self.assess_input_glyphs(index, rule.input_values()?, false, assessment)
        else {
            return Ok(false);
        };

        let records = rule.lookup_records()?;
        Ok(self.apply_context_lookups(records, index, context_end))
    }

    pub(crate) fn apply_chain_context_subtable(
        &mut self,
        subtable: FontData<'a>,
        index: usize,
    ) -> Result<bool, ReadError> {
        let glyph = self.album.glyph(index);

        match ChainedSequenceContext::read(subtable)? {
            ChainedSequenceContext::Format1(table) => {
                let Some(coverage_index) = table.coverage()?.get(glyph) else {
                    return Ok(false);
                };
                if coverage_index >= table.rule_set_count()? {
                    return Ok(false);
                }
                let Some(rule_set) = table.rule_set(coverage_index as usize)? else {
                    return Ok(false);
                };
                self.apply_chained_rule_set(&rule_set, &Assessment::Equality, index)
            }

            ChainedSequenceContext::Format2(table) => {
                if table.coverage()?.get(glyph).is_none() {
                    return Ok(false);
                }
                let input_class_def = table.input_class_def()?;
                let class = input_class_def.get(glyph);
                if class >= table.rule_set_count()? {
                    return Ok(false);
                }
                let Some(rule_set) = table.rule_set(class as usize)? else {
                    return Ok(false);
                };
                let assessment = Assessment::Classes {
                    input: input_class_def,
                    backtrack: Some(table.backtrack_class_def()?),
                    lookahead: Some(table.lookahead_class_def()?),
                };
                self.apply_chained_rule_set(&rule_set, &assessment, index)
            }

            ChainedSequenceContext::Format3(table) => {
                let assessment = Assessment::coverage(table.offset_data());
                let rule = table.rule()?;
                self.apply_chained_rule(&rule, true, &assessment, index)
            }
        }
    }

    fn apply_chained_rule_set(
        &mut self,
        rule_set: &ChainedRuleSet<'a>,
        assessment: &Assessment<'a>,
        index: usize,
    ) -> Result<bool, ReadError> {
        let rule_count = rule_set.rule_count()?;
        for rule_index in 0..rule_count as usize {
            if let Some(rule) = rule_set.rule(rule_index)? {
                if self.apply_chained_rule(&rule, false, assessment, index)? {
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }

    fn apply_chained_rule(
        &mut self,
        rule: &ChainedRule<'a>,
        input_includes_first: bool,
        assessment: &Assessment<'a>,
        index: usize,
    ) -> Result<bool, ReadError> {
        if rule.input_count()? == 0 {
            return Ok(false);
        }

        let Some(context_end) = self.assess_input_glyphs(
            index,
            rule.input_values(input_includes_first)?,
            input_includes_first,
            assessment,
        ) else {
            return Ok(false);
        };

        if !self.assess_backtrack_glyphs(index, rule.backtrack_values()?, assessment) {
            return Ok(false);
        }
        if !self.assess_lookahead_glyphs(
            context_end,
            rule.lookahead_values(input_includes_first)?,
            assessment,
        ) {
            return Ok(false);
        }

        let records = rule.lookup_records(input_includes_first)?;
        Ok(self.apply_context_lookups(records, index, context_end))
    }

    /// Run a matched rule's nested lookups over the context range.
    ///
    /// The locator narrows to the matched range for the nested lookups and
    /// is restored afterwards, widened by however much the nested lookups
    /// grew the album.
    fn apply_context_lookups(
        &mut self,
        records: &[SequenceLookupRecord],
        context_start: usize,
        context_end: usize,
    ) -> bool {
        let org_filter = self.locator.filter.clone();
        let (org_start, org_count) = self.locator.range();
        let context_length = (context_end - context_start) + 1;

        self.locator.reset(&*self.album, context_start, context_length);

        // apply the lookup records sequentially as they are ordered by
        // preference
        for record in records {
            let sequence_index = record.sequence_index.get() as usize;
            let lookup_list_index = record.lookup_list_index.get();

            self.locator.jump_to(&*self.album, context_start);

            if let Some(nested_index) = self.locator.skip(&*self.album, sequence_index + 1) {
                self.apply_lookup(lookup_list_index, nested_index);
                self.locator.update_filter(org_filter.clone());
            }
        }

        // restore the original range, widened by any glyphs the nested
        // lookups inserted
        let (_, context_count) = self.locator.range();
        self.locator.adjust_range(
            &*self.album,
            org_start,
            org_count + context_count - context_length,
        );

        true
    }

    /// Unwrap an extension subtable and dispatch to the wrapped type's
    /// evaluator for the current pass.
    pub(crate) fn apply_extension_subtable(
        &mut self,
        subtable: FontData<'a>,
        index: usize,
    ) -> Result<bool, ReadError> {
        let extension = ExtensionSubtable::read(subtable)?;
        let inner_type = extension.extension_lookup_type()?;
        let inner_data = extension.extension_data()?;

        Ok(self.apply_subtable(inner_type, inner_data, index))
    }
}
