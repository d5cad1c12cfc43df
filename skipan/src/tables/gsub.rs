//! the [GSUB](https://docs.microsoft.com/en-us/typography/opentype/spec/gsub) table
//!
//! Subtable views for the substitution lookup types. The contextual types
//! (5, 6) and the extension wrapper (7) are shared with GPOS and live in
//! [`context`](super::context).

use types::{BigEndian, GlyphId16, Tag};

use crate::font_data::FontData;
use crate::read::{FontRead, ReadError};

use super::layout::CoverageTable;

/// 'GSUB'
pub const TAG: Tag = Tag::new(b"GSUB");

/// GSUB lookup types.
pub mod lookup_type {
    pub const SINGLE: u16 = 1;
    pub const MULTIPLE: u16 = 2;
    pub const ALTERNATE: u16 = 3;
    pub const LIGATURE: u16 = 4;
    pub const CONTEXT: u16 = 5;
    pub const CHAINING_CONTEXT: u16 = 6;
    pub const EXTENSION: u16 = 7;
    pub const REVERSE_CHAINING_CONTEXT: u16 = 8;
}

/// A [Single Substitution](https://learn.microsoft.com/en-us/typography/opentype/spec/gsub#SS) subtable
pub enum SingleSubst<'a> {
    Format1(SingleSubstFormat1<'a>),
    Format2(SingleSubstFormat2<'a>),
}

impl<'a> FontRead<'a> for SingleSubst<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        match data.read_at::<u16>(0)? {
            1 => Ok(Self::Format1(SingleSubstFormat1 { data })),
            2 => Ok(Self::Format2(SingleSubstFormat2 { data })),
            other => Err(ReadError::InvalidFormat(other.into())),
        }
    }
}

/// Single substitution by glyph id delta.
pub struct SingleSubstFormat1<'a> {
    data: FontData<'a>,
}

impl<'a> SingleSubstFormat1<'a> {
    pub fn coverage(&self) -> Result<CoverageTable<'a>, ReadError> {
        let offset = self.data.read_at::<u16>(2)? as usize;
        CoverageTable::read(self.data.split_off(offset).ok_or(ReadError::OutOfBounds)?)
    }

    pub fn delta_glyph_id(&self) -> Result<i16, ReadError> {
        self.data.read_at(4)
    }
}

/// Single substitution by substitute array.
pub struct SingleSubstFormat2<'a> {
    data: FontData<'a>,
}

impl<'a> SingleSubstFormat2<'a> {
    pub fn coverage(&self) -> Result<CoverageTable<'a>, ReadError> {
        let offset = self.data.read_at::<u16>(2)? as usize;
        CoverageTable::read(self.data.split_off(offset).ok_or(ReadError::OutOfBounds)?)
    }

    pub fn glyph_count(&self) -> Result<u16, ReadError> {
        self.data.read_at(4)
    }

    pub fn substitute(&self, coverage_index: u16) -> Result<GlyphId16, ReadError> {
        self.data.read_at(6 + coverage_index as usize * 2)
    }
}

/// A [Multiple Substitution](https://learn.microsoft.com/en-us/typography/opentype/spec/gsub#MS) subtable (format 1 only)
pub struct MultipleSubst<'a> {
    data: FontData<'a>,
}

impl<'a> FontRead<'a> for MultipleSubst<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        match data.read_at::<u16>(0)? {
            1 => Ok(MultipleSubst { data }),
            other => Err(ReadError::InvalidFormat(other.into())),
        }
    }
}

impl<'a> MultipleSubst<'a> {
    pub fn coverage(&self) -> Result<CoverageTable<'a>, ReadError> {
        let offset = self.data.read_at::<u16>(2)? as usize;
        CoverageTable::read(self.data.split_off(offset).ok_or(ReadError::OutOfBounds)?)
    }

    pub fn sequence_count(&self) -> Result<u16, ReadError> {
        self.data.read_at(4)
    }

    pub fn sequence(&self, coverage_index: u16) -> Result<Sequence<'a>, ReadError> {
        let offset = self.data.read_at::<u16>(6 + coverage_index as usize * 2)? as usize;
        self.data
            .split_off(offset)
            .map(|data| Sequence { data })
            .ok_or(ReadError::OutOfBounds)
    }
}

/// The substitute glyphs replacing one input glyph.
pub struct Sequence<'a> {
    data: FontData<'a>,
}

impl<'a> Sequence<'a> {
    pub fn glyph_count(&self) -> Result<u16, ReadError> {
        self.data.read_at(0)
    }

    pub fn substitutes(&self) -> Result<&'a [BigEndian<GlyphId16>], ReadError> {
        let count = self.glyph_count()? as usize;
        self.data.read_array(2..2 + count * 2)
    }
}

/// An [Alternate Substitution](https://learn.microsoft.com/en-us/typography/opentype/spec/gsub#AS) subtable (format 1 only)
pub struct AlternateSubst<'a> {
    data: FontData<'a>,
}

impl<'a> FontRead<'a> for AlternateSubst<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        match data.read_at::<u16>(0)? {
            1 => Ok(AlternateSubst { data }),
            other => Err(ReadError::InvalidFormat(other.into())),
        }
    }
}

impl<'a> AlternateSubst<'a> {
    pub fn coverage(&self) -> Result<CoverageTable<'a>, ReadError> {
        let offset = self.data.read_at::<u16>(2)? as usize;
        CoverageTable::read(self.data.split_off(offset).ok_or(ReadError::OutOfBounds)?)
    }

    pub fn alternate_set_count(&self) -> Result<u16, ReadError> {
        self.data.read_at(4)
    }

    pub fn alternate_set(&self, coverage_index: u16) -> Result<AlternateSet<'a>, ReadError> {
        let offset = self.data.read_at::<u16>(6 + coverage_index as usize * 2)? as usize;
        self.data
            .split_off(offset)
            .map(|data| AlternateSet { data })
            .ok_or(ReadError::OutOfBounds)
    }
}

/// The alternate glyphs selectable for one input glyph.
pub struct AlternateSet<'a> {
    data: FontData<'a>,
}

impl<'a> AlternateSet<'a> {
    pub fn glyph_count(&self) -> Result<u16, ReadError> {
        self.data.read_at(0)
    }

    pub fn alternate(&self, index: u16) -> Result<GlyphId16, ReadError> {
        self.data.read_at(2 + index as usize * 2)
    }
}

/// A [Ligature Substitution](https://learn.microsoft.com/en-us/typography/opentype/spec/gsub#LS) subtable (format 1 only)
pub struct LigatureSubst<'a> {
    data: FontData<'a>,
}

impl<'a> FontRead<'a> for LigatureSubst<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        match data.read_at::<u16>(0)? {
            1 => Ok(LigatureSubst { data }),
            other => Err(ReadError::InvalidFormat(other.into())),
        }
    }
}

impl<'a> LigatureSubst<'a> {
    pub fn coverage(&self) -> Result<CoverageTable<'a>, ReadError> {
        let offset = self.data.read_at::<u16>(2)? as usize;
        CoverageTable::read(self.data.split_off(offset).ok_or(ReadError::OutOfBounds)?)
    }

    pub fn ligature_set_count(&self) -> Result<u16, ReadError> {
        self.data.read_at(4)
    }

    pub fn ligature_set(&self, coverage_index: u16) -> Result<LigatureSet<'a>, ReadError> {
        let offset = self.data.read_at::<u16>(6 + coverage_index as usize * 2)? as usize;
        self.data
            .split_off(offset)
            .map(|data| LigatureSet { data })
            .ok_or(ReadError::OutOfBounds)
    }
}

/// Ligatures beginning with the same glyph, ordered by preference.
pub struct LigatureSet<'a> {
    data: FontData<'a>,
}

impl<'a> LigatureSet<'a> {
    pub fn ligature_count(&self) -> Result<u16, ReadError> {
        self.data.read_at(0)
    }

    pub fn ligature(&self, index: u16) -> Result<Ligature<'a>, ReadError> {
        let offset = self.data.read_at::<u16>(2 + index as usize * 2)? as usize;
        self.data
            .split_off(offset)
            .map(|data| Ligature { data })
            .ok_or(ReadError::OutOfBounds)
    }
}

/// One ligature: the produced glyph and the component tail to match.
pub struct Ligature<'a> {
    data: FontData<'a>,
}

impl<'a> Ligature<'a> {
    pub fn ligature_glyph(&self) -> Result<GlyphId16, ReadError> {
        self.data.read_at(0)
    }

    pub fn component_count(&self) -> Result<u16, ReadError> {
        self.data.read_at(2)
    }

    /// Components 1..component_count; the first component is the coverage
    /// glyph itself.
    pub fn component(&self, index: u16) -> Result<GlyphId16, ReadError> {
        self.data.read_at(4 + index as usize * 2)
    }
}

/// A [Reverse Chaining Contextual Single Substitution](https://learn.microsoft.com/en-us/typography/opentype/spec/gsub#RCCS) subtable (format 1 only)
pub struct ReverseChainSingleSubst<'a> {
    data: FontData<'a>,
}

impl<'a> FontRead<'a> for ReverseChainSingleSubst<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        match data.read_at::<u16>(0)? {
            1 => Ok(ReverseChainSingleSubst { data }),
            other => Err(ReadError::InvalidFormat(other.into())),
        }
    }
}

impl<'a> ReverseChainSingleSubst<'a> {
    pub fn offset_data(&self) -> FontData<'a> {
        self.data
    }

    pub fn coverage(&self) -> Result<CoverageTable<'a>, ReadError> {
        let offset = self.data.read_at::<u16>(2)? as usize;
        CoverageTable::read(self.data.split_off(offset).ok_or(ReadError::OutOfBounds)?)
    }

    fn backtrack_pos(&self) -> usize {
        4
    }

    pub fn backtrack_coverage_offsets(&self) -> Result<&'a [BigEndian<u16>], ReadError> {
        let pos = self.backtrack_pos();
        let count = self.data.read_at::<u16>(pos)? as usize;
        self.data.read_array(pos + 2..pos + 2 + count * 2)
    }

    fn lookahead_pos(&self) -> Result<usize, ReadError> {
        let pos = self.backtrack_pos();
        let count = self.data.read_at::<u16>(pos)? as usize;
        Ok(pos + 2 + count * 2)
    }

    pub fn lookahead_coverage_offsets(&self) -> Result<&'a [BigEndian<u16>], ReadError> {
        let pos = self.lookahead_pos()?;
        let count = self.data.read_at::<u16>(pos)? as usize;
        self.data.read_array(pos + 2..pos + 2 + count * 2)
    }

    pub fn glyph_count(&self) -> Result<u16, ReadError> {
        let pos = self.lookahead_pos()?;
        let count = self.data.read_at::<u16>(pos)? as usize;
        self.data.read_at(pos + 2 + count * 2)
    }

    pub fn substitute(&self, coverage_index: u16) -> Result<GlyphId16, ReadError> {
        let pos = self.lookahead_pos()?;
        let count = self.data.read_at::<u16>(pos)? as usize;
        self.data
            .read_at(pos + 4 + count * 2 + coverage_index as usize * 2)
    }
}
