//! Contextual and chained-contextual lookup subtables
//!
//! These formats are shared verbatim between GSUB (lookup types 5, 6, 7)
//! and GPOS (lookup types 7, 8, 9); only the nested lookups they trigger
//! differ. The extension subtable lives here for the same reason.

use types::{BigEndian, FixedSize};

use crate::font_data::FontData;
use crate::read::{FontRead, ReadError};

use super::layout::{ClassDefTable, CoverageTable};

/// A nested lookup invocation within a contextual rule.
#[derive(Clone, Copy, Debug, bytemuck::AnyBitPattern)]
#[repr(C, packed)]
pub struct SequenceLookupRecord {
    pub sequence_index: BigEndian<u16>,
    pub lookup_list_index: BigEndian<u16>,
}

impl FixedSize for SequenceLookupRecord {
    const RAW_BYTE_LEN: usize = 4;
}

/// A [Sequence Context](https://learn.microsoft.com/en-us/typography/opentype/spec/chapter2#sequence-context-format-1-simple-glyph-contexts) subtable
pub enum SequenceContext<'a> {
    Format1(SequenceContextFormat1<'a>),
    Format2(SequenceContextFormat2<'a>),
    Format3(SequenceContextFormat3<'a>),
}

impl<'a> FontRead<'a> for SequenceContext<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        match data.read_at::<u16>(0)? {
            1 => Ok(Self::Format1(SequenceContextFormat1 { data })),
            2 => Ok(Self::Format2(SequenceContextFormat2 { data })),
            3 => Ok(Self::Format3(SequenceContextFormat3 { data })),
            other => Err(ReadError::InvalidFormat(other.into())),
        }
    }
}

/// Simple glyph contexts: rules keyed by the first glyph.
pub struct SequenceContextFormat1<'a> {
    data: FontData<'a>,
}

impl<'a> SequenceContextFormat1<'a> {
    pub fn coverage(&self) -> Result<CoverageTable<'a>, ReadError> {
        let offset = self.data.read_at::<u16>(2)? as usize;
        CoverageTable::read(self.data.split_off(offset).ok_or(ReadError::OutOfBounds)?)
    }

    pub fn rule_set_count(&self) -> Result<u16, ReadError> {
        self.data.read_at(4)
    }

    /// The rule set for the given coverage index; a null offset yields `None`.
    pub fn rule_set(&self, index: usize) -> Result<Option<RuleSet<'a>>, ReadError> {
        Ok(self
            .data
            .resolve_offset16(6 + index * 2)?
            .map(|data| RuleSet { data }))
    }
}

/// Class-based glyph contexts.
pub struct SequenceContextFormat2<'a> {
    data: FontData<'a>,
}

impl<'a> SequenceContextFormat2<'a> {
    pub fn coverage(&self) -> Result<CoverageTable<'a>, ReadError> {
        let offset = self.data.read_at::<u16>(2)? as usize;
        CoverageTable::read(self.data.split_off(offset).ok_or(ReadError::OutOfBounds)?)
    }

    pub fn class_def(&self) -> Result<ClassDefTable<'a>, ReadError> {
        let offset = self.data.read_at::<u16>(4)? as usize;
        ClassDefTable::read(self.data.split_off(offset).ok_or(ReadError::OutOfBounds)?)
    }

    pub fn rule_set_count(&self) -> Result<u16, ReadError> {
        self.data.read_at(6)
    }

    pub fn rule_set(&self, index: usize) -> Result<Option<RuleSet<'a>>, ReadError> {
        Ok(self
            .data
            .resolve_offset16(8 + index * 2)?
            .map(|data| RuleSet { data }))
    }
}

/// Coverage-based contexts: a single rule with one coverage per position.
pub struct SequenceContextFormat3<'a> {
    data: FontData<'a>,
}

impl<'a> SequenceContextFormat3<'a> {
    /// The subtable data itself; coverage offsets in the rule are relative
    /// to this.
    pub fn offset_data(&self) -> FontData<'a> {
        self.data
    }

    pub fn glyph_count(&self) -> Result<u16, ReadError> {
        self.data.read_at(2)
    }

    pub fn lookup_count(&self) -> Result<u16, ReadError> {
        self.data.read_at(4)
    }

    /// Coverage offsets, one per input position (the first included).
    pub fn coverage_offsets(&self) -> Result<&'a [BigEndian<u16>], ReadError> {
        let count = self.glyph_count()? as usize;
        self.data.read_array(6..6 + count * 2)
    }

    pub fn lookup_records(&self) -> Result<&'a [SequenceLookupRecord], ReadError> {
        let glyph_count = self.glyph_count()? as usize;
        let lookup_count = self.lookup_count()? as usize;
        let start = 6 + glyph_count * 2;
        self.data.read_array(start..start + lookup_count * 4)
    }
}

/// A set of sequence rules, ordered by preference.
pub struct RuleSet<'a> {
    data: FontData<'a>,
}

impl<'a> RuleSet<'a> {
    pub fn rule_count(&self) -> Result<u16, ReadError> {
        self.data.read_at(0)
    }

    pub fn rule(&self, index: usize) -> Result<Option<Rule<'a>>, ReadError> {
        Ok(self
            .data
            .resolve_offset16(2 + index * 2)?
            .map(|data| Rule { data }))
    }
}

/// A single sequence rule: an input tail plus nested lookup records.
pub struct Rule<'a> {
    data: FontData<'a>,
}

impl<'a> Rule<'a> {
    pub fn glyph_count(&self) -> Result<u16, ReadError> {
        self.data.read_at(0)
    }

    pub fn lookup_count(&self) -> Result<u16, ReadError> {
        self.data.read_at(2)
    }

    /// Values for input positions 1..glyph_count (the first glyph is
    /// implied by the coverage / class that selected this rule).
    pub fn input_values(&self) -> Result<&'a [BigEndian<u16>], ReadError> {
        let count = (self.glyph_count()? as usize).saturating_sub(1);
        self.data.read_array(4..4 + count * 2)
    }

    pub fn lookup_records(&self) -> Result<&'a [SequenceLookupRecord], ReadError> {
        let glyph_count = (self.glyph_count()? as usize).saturating_sub(1);
        let lookup_count = self.lookup_count()? as usize;
        let start = 4 + glyph_count * 2;
        self.data.read_array(start..start + lookup_count * 4)
    }
}

/// A [Chained Sequence Context](https://learn.microsoft.com/en-us/typography/opentype/spec/chapter2#chained-sequence-context-format-1-simple-glyph-contexts) subtable
pub enum ChainedSequenceContext<'a> {
    Format1(ChainedSequenceContextFormat1<'a>),
    Format2(ChainedSequenceContextFormat2<'a>),
    Format3(ChainedSequenceContextFormat3<'a>),
}

impl<'a> FontRead<'a> for ChainedSequenceContext<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        match data.read_at::<u16>(0)? {
            1 => Ok(Self::Format1(ChainedSequenceContextFormat1 { data })),
            2 => Ok(Self::Format2(ChainedSequenceContextFormat2 { data })),
            3 => Ok(Self::Format3(ChainedSequenceContextFormat3 { data })),
            other => Err(ReadError::InvalidFormat(other.into())),
        }
    }
}

/// Simple chained glyph contexts.
pub struct ChainedSequenceContextFormat1<'a> {
    data: FontData<'a>,
}

impl<'a> ChainedSequenceContextFormat1<'a> {
    pub fn coverage(&self) -> Result<CoverageTable<'a>, ReadError> {
        let offset = self.data.read_at::<u16>(2)? as usize;
        CoverageTable::read(self.data.split_off(offset).ok_or(ReadError::OutOfBounds)?)
    }

    pub fn rule_set_count(&self) -> Result<u16, ReadError> {
        self.data.read_at(4)
    }

    pub fn rule_set(&self, index: usize) -> Result<Option<ChainedRuleSet<'a>>, ReadError> {
        Ok(self
            .data
            .resolve_offset16(6 + index * 2)?
            .map(|data| ChainedRuleSet { data }))
    }
}

/// Class-based chained contexts.
pub struct ChainedSequenceContextFormat2<'a> {
    data: FontData<'a>,
}

impl<'a> ChainedSequenceContextFormat2<'a> {
    pub fn coverage(&self) -> Result<CoverageTable<'a>, ReadError> {
        let offset = self.data.read_at::<u16>(2)? as usize;
        CoverageTable::read(self.data.split_off(offset).ok_or(ReadError::OutOfBounds)?)
    }

    pub fn backtrack_class_def(&self) -> Result<ClassDefTable<'a>, ReadError> {
        let offset = self.data.read_at::<u16>(4)? as usize;
        ClassDefTable::read(self.data.split_off(offset).ok_or(ReadError::OutOfBounds)?)
    }

    pub fn input_class_def(&self) -> Result<ClassDefTable<'a>, ReadError> {
        let offset = self.data.read_at::<u16>(6)? as usize;
        ClassDefTable::read(self.data.split_off(offset).ok_or(ReadError::OutOfBounds)?)
    }

    pub fn lookahead_class_def(&self) -> Result<ClassDefTable<'a>, ReadError> {
        let offset = self.data.read_at::<u16>(8)? as usize;
        ClassDefTable::read(self.data.split_off(offset).ok_or(ReadError::OutOfBounds)?)
    }

    pub fn rule_set_count(&self) -> Result<u16, ReadError> {
        self.data.read_at(10)
    }

    pub fn rule_set(&self, index: usize) -> Result<Option<ChainedRuleSet<'a>>, ReadError> {
        Ok(self
            .data
            .resolve_offset16(12 + index * 2)?
            .map(|data| ChainedRuleSet { data }))
    }
}

/// Coverage-based chained contexts: a single rule, one coverage per position.
pub struct ChainedSequenceContextFormat3<'a> {
    data: FontData<'a>,
}

impl<'a> ChainedSequenceContextFormat3<'a> {
    pub fn offset_data(&self) -> FontData<'a> {
        self.data
    }

    /// The embedded rule starts right after the format field.
    pub fn rule(&self) -> Result<ChainedRule<'a>, ReadError> {
        self.data
            .split_off(2)
            .map(|data| ChainedRule { data })
            .ok_or(ReadError::OutOfBounds)
    }
}

/// A set of chained sequence rules, ordered by preference.
pub struct ChainedRuleSet<'a> {
    data: FontData<'a>,
}

impl<'a> ChainedRuleSet<'a> {
    pub fn rule_count(&self) -> Result<u16, ReadError> {
        self.data.read_at(0)
    }

    pub fn rule(&self, index: usize) -> Result<Option<ChainedRule<'a>>, ReadError> {
        Ok(self
            .data
            .resolve_offset16(2 + index * 2)?
            .map(|data| ChainedRule { data }))
    }
}

/// A chained rule: backtrack, input, and lookahead sequences plus nested
/// lookup records, laid out back to back with leading counts.
///
/// For the format 3 embedded rule the values are coverage offsets and the
/// input array includes the first position; for rule-set rules they are
/// glyph ids or classes and the input array starts at position 1.
pub struct ChainedRule<'a> {
    data: FontData<'a>,
}

impl<'a> ChainedRule<'a> {
    /// `input_includes_first` is true for format 3 embedded rules.
    fn input_pos(&self) -> Result<usize, ReadError> {
        let backtrack_count = self.data.read_at::<u16>(0)? as usize;
        Ok(2 + backtrack_count * 2)
    }

    fn lookahead_pos(&self, input_includes_first: bool) -> Result<usize, ReadError> {
        let input_pos = self.input_pos()?;
        let mut input_count = self.data.read_at::<u16>(input_pos)? as usize;
        if !input_includes_first {
            input_count = input_count.saturating_sub(1);
        }
        Ok(input_pos + 2 + input_count * 2)
    }

    fn records_pos(&self, input_includes_first: bool) -> Result<usize, ReadError> {
        let lookahead_pos = self.lookahead_pos(input_includes_first)?;
        let lookahead_count = self.data.read_at::<u16>(lookahead_pos)? as usize;
        Ok(lookahead_pos + 2 + lookahead_count * 2)
    }

    pub fn backtrack_values(&self) -> Result<&'a [BigEndian<u16>], ReadError> {
        let count = self.data.read_at::<u16>(0)? as usize;
        self.data.read_array(2..2 + count * 2)
    }

    /// The declared input glyph count, including the first position.
    pub fn input_count(&self) -> Result<u16, ReadError> {
        let pos = self.input_pos()?;
        self.data.read_at(pos)
    }

    pub fn input_values(&self, input_includes_first: bool) -> Result<&'a [BigEndian<u16>], ReadError> {
        let pos = self.input_pos()?;
        let mut count = self.data.read_at::<u16>(pos)? as usize;
        if !input_includes_first {
            count = count.saturating_sub(1);
        }
        self.data.read_array(pos + 2..pos + 2 + count * 2)
    }

    pub fn lookahead_values(
        &self,
        input_includes_first: bool,
    ) -> Result<&'a [BigEndian<u16>], ReadError> {
        let pos = self.lookahead_pos(input_includes_first)?;
        let count = self.data.read_at::<u16>(pos)? as usize;
        self.data.read_array(pos + 2..pos + 2 + count * 2)
    }

    pub fn lookup_records(
        &self,
        input_includes_first: bool,
    ) -> Result<&'a [SequenceLookupRecord], ReadError> {
        let pos = self.records_pos(input_includes_first)?;
        let count = self.data.read_at::<u16>(pos)? as usize;
        self.data.read_array(pos + 2..pos + 2 + count * 4)
    }
}

/// An [Extension](https://learn.microsoft.com/en-us/typography/opentype/spec/gsub#ES) subtable, shared by GSUB type 7 and GPOS type 9.
pub struct ExtensionSubtable<'a> {
    data: FontData<'a>,
}

impl<'a> FontRead<'a> for ExtensionSubtable<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        match data.read_at::<u16>(0)? {
            1 => Ok(ExtensionSubtable { data }),
            other => Err(ReadError::InvalidFormat(other.into())),
        }
    }
}

impl<'a> ExtensionSubtable<'a> {
    pub fn extension_lookup_type(&self) -> Result<u16, ReadError> {
        self.data.read_at(2)
    }

    pub fn extension_data(&self) -> Result<FontData<'a>, ReadError> {
        let offset = self.data.read_at::<u32>(4)? as usize;
        self.data.split_off(offset).ok_or(ReadError::OutOfBounds)
    }
}
