//! OpenType Layout common table formats
//!
//! These are the structures shared between the [GSUB](super::gsub) and
//! [GPOS](super::gpos) tables: the script/feature/lookup lists, glyph
//! coverage, and glyph class definitions.

#[path = "./lookupflag.rs"]
mod lookupflag;

pub use lookupflag::LookupFlag;

use types::{BigEndian, F2Dot14, FixedSize, GlyphId16, Tag};

use crate::font_data::FontData;
use crate::read::{FontRead, ReadError};

/// 'dflt', the pseudo language-system tag selecting a script's default LangSys.
pub const DFLT_LANG_SYS: Tag = Tag::new(b"dflt");

/// The common header shared by the GSUB and GPOS tables.
pub struct LayoutHeader<'a> {
    data: FontData<'a>,
}

impl<'a> FontRead<'a> for LayoutHeader<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        // read the version eagerly so that an empty blob is rejected up front
        data.read_at::<u32>(0)?;
        Ok(LayoutHeader { data })
    }
}

impl<'a> LayoutHeader<'a> {
    pub fn version(&self) -> Result<u32, ReadError> {
        self.data.read_at(0)
    }

    pub fn script_list(&self) -> Result<ScriptList<'a>, ReadError> {
        let offset = self.data.read_at::<u16>(4)? as usize;
        self.data
            .split_off(offset)
            .map(|data| ScriptList { data })
            .ok_or(ReadError::OutOfBounds)
    }

    pub fn feature_list(&self) -> Result<FeatureList<'a>, ReadError> {
        let offset = self.data.read_at::<u16>(6)? as usize;
        self.data
            .split_off(offset)
            .map(|data| FeatureList { data })
            .ok_or(ReadError::OutOfBounds)
    }

    pub fn lookup_list(&self) -> Result<LookupList<'a>, ReadError> {
        let offset = self.data.read_at::<u16>(8)? as usize;
        self.data
            .split_off(offset)
            .map(|data| LookupList { data })
            .ok_or(ReadError::OutOfBounds)
    }

    /// The FeatureVariations table, present only in version 1.1 headers.
    pub fn feature_variations(&self) -> Option<FeatureVariations<'a>> {
        if self.version().ok()? < 0x0001_0001 {
            return None;
        }
        let offset = self.data.read_at::<u32>(10).ok()? as usize;
        if offset == 0 {
            return None;
        }
        self.data.split_off(offset).map(|data| FeatureVariations { data })
    }
}

/// The [ScriptList](https://learn.microsoft.com/en-us/typography/opentype/spec/chapter2#slTbl_sRec) table
pub struct ScriptList<'a> {
    data: FontData<'a>,
}

impl<'a> ScriptList<'a> {
    pub fn script_count(&self) -> Result<u16, ReadError> {
        self.data.read_at(0)
    }

    /// Find the script table for the given tag, by linear search over the
    /// script records.
    pub fn find_script(&self, script_tag: Tag) -> Option<Script<'a>> {
        let count = self.script_count().ok()?;
        for index in 0..count as usize {
            let record = 2 + index * 6;
            let tag = self.data.read_at::<Tag>(record).ok()?;
            if tag == script_tag {
                let offset = self.data.read_at::<u16>(record + 4).ok()? as usize;
                return self.data.split_off(offset).map(|data| Script { data });
            }
        }
        None
    }
}

/// A [Script](https://learn.microsoft.com/en-us/typography/opentype/spec/chapter2#script-table-and-language-system-record) table
pub struct Script<'a> {
    data: FontData<'a>,
}

impl<'a> Script<'a> {
    pub fn default_lang_sys(&self) -> Option<LangSys<'a>> {
        let offset = self.data.read_at::<u16>(0).ok()? as usize;
        if offset == 0 {
            return None;
        }
        self.data.split_off(offset).map(|data| LangSys { data })
    }

    pub fn lang_sys_count(&self) -> Result<u16, ReadError> {
        self.data.read_at(2)
    }

    /// Find the language system for the given tag; `dflt` selects the
    /// default LangSys.
    pub fn find_lang_sys(&self, language_tag: Tag) -> Option<LangSys<'a>> {
        if language_tag == DFLT_LANG_SYS {
            return self.default_lang_sys();
        }
        let count = self.lang_sys_count().ok()?;
        for index in 0..count as usize {
            let record = 4 + index * 6;
            let tag = self.data.read_at::<Tag>(record).ok()?;
            if tag == language_tag {
                let offset = self.data.read_at::<u16>(record + 4).ok()? as usize;
                return self.data.split_off(offset).map(|data| LangSys { data });
            }
        }
        None
    }
}

/// A [LangSys](https://learn.microsoft.com/en-us/typography/opentype/spec/chapter2#language-system-table) table
pub struct LangSys<'a> {
    data: FontData<'a>,
}

impl<'a> LangSys<'a> {
    pub fn feature_index_count(&self) -> Result<u16, ReadError> {
        self.data.read_at(4)
    }

    pub fn feature_index(&self, index: usize) -> Result<u16, ReadError> {
        self.data.read_at(6 + index * 2)
    }
}

/// The [FeatureList](https://learn.microsoft.com/en-us/typography/opentype/spec/chapter2#flTbl) table
pub struct FeatureList<'a> {
    data: FontData<'a>,
}

impl<'a> FeatureList<'a> {
    pub fn feature_count(&self) -> Result<u16, ReadError> {
        self.data.read_at(0)
    }

    pub fn feature_tag(&self, index: usize) -> Result<Tag, ReadError> {
        self.data.read_at(2 + index * 6)
    }

    pub fn feature(&self, index: usize) -> Result<Feature<'a>, ReadError> {
        let offset = self.data.read_at::<u16>(2 + index * 6 + 4)? as usize;
        self.data
            .split_off(offset)
            .map(|data| Feature { data })
            .ok_or(ReadError::OutOfBounds)
    }
}

/// A [Feature](https://learn.microsoft.com/en-us/typography/opentype/spec/chapter2#feature-table) table
pub struct Feature<'a> {
    data: FontData<'a>,
}

impl<'a> Feature<'a> {
    pub fn lookup_index_count(&self) -> Result<u16, ReadError> {
        self.data.read_at(2)
    }

    pub fn lookup_list_index(&self, index: usize) -> Result<u16, ReadError> {
        self.data.read_at(4 + index * 2)
    }
}

/// The [LookupList](https://learn.microsoft.com/en-us/typography/opentype/spec/chapter2#lookup-list-table) table
pub struct LookupList<'a> {
    data: FontData<'a>,
}

impl<'a> LookupList<'a> {
    pub fn lookup_count(&self) -> Result<u16, ReadError> {
        self.data.read_at(0)
    }

    pub fn lookup(&self, index: usize) -> Result<Lookup<'a>, ReadError> {
        let offset = self.data.read_at::<u16>(2 + index * 2)? as usize;
        self.data
            .split_off(offset)
            .map(|data| Lookup { data })
            .ok_or(ReadError::OutOfBounds)
    }
}

/// A [Lookup](https://learn.microsoft.com/en-us/typography/opentype/spec/chapter2#lookup-table) table
pub struct Lookup<'a> {
    data: FontData<'a>,
}

impl<'a> Lookup<'a> {
    pub fn lookup_type(&self) -> Result<u16, ReadError> {
        self.data.read_at(0)
    }

    pub fn lookup_flag(&self) -> Result<LookupFlag, ReadError> {
        self.data.read_at::<u16>(2).map(LookupFlag::from_bits)
    }

    pub fn subtable_count(&self) -> Result<u16, ReadError> {
        self.data.read_at(4)
    }

    pub fn subtable_data(&self, index: usize) -> Result<FontData<'a>, ReadError> {
        let offset = self.data.read_at::<u16>(6 + index * 2)? as usize;
        self.data.split_off(offset).ok_or(ReadError::OutOfBounds)
    }

    /// The mark filtering set index, stored after the subtable offsets.
    ///
    /// Only meaningful when the lookup flag has UseMarkFilteringSet.
    pub fn mark_filtering_set(&self) -> Result<u16, ReadError> {
        let count = self.subtable_count()? as usize;
        self.data.read_at(6 + count * 2)
    }
}

/// A [Coverage Table](https://learn.microsoft.com/en-us/typography/opentype/spec/chapter2#coverage-table)
#[derive(Clone)]
pub enum CoverageTable<'a> {
    Format1(CoverageFormat1<'a>),
    Format2(CoverageFormat2<'a>),
}

impl<'a> FontRead<'a> for CoverageTable<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        match data.read_at::<u16>(0)? {
            1 => Ok(Self::Format1(CoverageFormat1 { data })),
            2 => Ok(Self::Format2(CoverageFormat2 { data })),
            other => Err(ReadError::InvalidFormat(other.into())),
        }
    }
}

impl<'a> CoverageTable<'a> {
    /// Map a glyph to its dense coverage index, or `None` if not covered.
    pub fn get(&self, glyph: GlyphId16) -> Option<u16> {
        match self {
            Self::Format1(table) => table.get(glyph),
            Self::Format2(table) => table.get(glyph),
        }
    }
}

/// [Coverage format 1](https://learn.microsoft.com/en-us/typography/opentype/spec/chapter2#coverage-format-1): a sorted glyph array
#[derive(Clone)]
pub struct CoverageFormat1<'a> {
    data: FontData<'a>,
}

impl<'a> CoverageFormat1<'a> {
    pub fn glyph_count(&self) -> Result<u16, ReadError> {
        self.data.read_at(2)
    }

    pub fn glyph_array(&self) -> Result<&'a [BigEndian<GlyphId16>], ReadError> {
        let count = self.glyph_count()? as usize;
        self.data.read_array(4..4 + count * 2)
    }

    fn get(&self, glyph: GlyphId16) -> Option<u16> {
        let glyphs = self.glyph_array().ok()?;
        glyphs
            .binary_search_by(|probe| probe.get().cmp(&glyph))
            .ok()
            .map(|index| index as u16)
    }
}

/// [Coverage format 2](https://learn.microsoft.com/en-us/typography/opentype/spec/chapter2#coverage-format-2): sorted glyph ranges
#[derive(Clone)]
pub struct CoverageFormat2<'a> {
    data: FontData<'a>,
}

impl<'a> CoverageFormat2<'a> {
    pub fn range_count(&self) -> Result<u16, ReadError> {
        self.data.read_at(2)
    }

    pub fn range_records(&self) -> Result<&'a [RangeRecord], ReadError> {
        let count = self.range_count()? as usize;
        self.data.read_array(4..4 + count * 6)
    }

    fn get(&self, glyph: GlyphId16) -> Option<u16> {
        let records = self.range_records().ok()?;
        let record = search_glyph_range(records, glyph, |record| {
            (record.start_glyph_id.get(), record.end_glyph_id.get())
        })?;
        let delta = glyph.to_u16() - record.start_glyph_id.get().to_u16();
        Some(record.start_coverage_index.get() + delta)
    }
}

/// A glyph range plus the coverage index of its first glyph.
#[derive(Clone, Copy, Debug, bytemuck::AnyBitPattern)]
#[repr(C, packed)]
pub struct RangeRecord {
    pub start_glyph_id: BigEndian<GlyphId16>,
    pub end_glyph_id: BigEndian<GlyphId16>,
    pub start_coverage_index: BigEndian<u16>,
}

impl FixedSize for RangeRecord {
    const RAW_BYTE_LEN: usize = 6;
}

/// A [Class Definition Table](https://learn.microsoft.com/en-us/typography/opentype/spec/chapter2#class-definition-table)
#[derive(Clone)]
pub enum ClassDefTable<'a> {
    Format1(ClassDefFormat1<'a>),
    Format2(ClassDefFormat2<'a>),
}

impl<'a> FontRead<'a> for ClassDefTable<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        match data.read_at::<u16>(0)? {
            1 => Ok(Self::Format1(ClassDefFormat1 { data })),
            2 => Ok(Self::Format2(ClassDefFormat2 { data })),
            other => Err(ReadError::InvalidFormat(other.into())),
        }
    }
}

impl<'a> ClassDefTable<'a> {
    /// The class of the given glyph. A glyph not assigned a class falls
    /// into class 0.
    pub fn get(&self, glyph: GlyphId16) -> u16 {
        match self {
            Self::Format1(table) => table.get(glyph),
            Self::Format2(table) => table.get(glyph),
        }
    }
}

/// [ClassDef format 1](https://learn.microsoft.com/en-us/typography/opentype/spec/chapter2#class-definition-table-format-1): class array over a contiguous glyph range
#[derive(Clone)]
pub struct ClassDefFormat1<'a> {
    data: FontData<'a>,
}

impl<'a> ClassDefFormat1<'a> {
    pub fn start_glyph_id(&self) -> Result<GlyphId16, ReadError> {
        self.data.read_at(2)
    }

    pub fn glyph_count(&self) -> Result<u16, ReadError> {
        self.data.read_at(4)
    }

    fn get(&self, glyph: GlyphId16) -> u16 {
        let (Ok(start), Ok(count)) = (self.start_glyph_id(), self.glyph_count()) else {
            return 0;
        };
        let Some(index) = glyph.to_u16().checked_sub(start.to_u16()) else {
            return 0;
        };
        if index >= count {
            return 0;
        }
        self.data.read_at(6 + index as usize * 2).unwrap_or(0)
    }
}

/// [ClassDef format 2](https://learn.microsoft.com/en-us/typography/opentype/spec/chapter2#class-definition-table-format-2): sorted class ranges
#[derive(Clone)]
pub struct ClassDefFormat2<'a> {
    data: FontData<'a>,
}

impl<'a> ClassDefFormat2<'a> {
    pub fn class_range_count(&self) -> Result<u16, ReadError> {
        self.data.read_at(2)
    }

    pub fn class_range_records(&self) -> Result<&'a [ClassRangeRecord], ReadError> {
        let count = self.class_range_count()? as usize;
        self.data.read_array(4..4 + count * 6)
    }

    fn get(&self, glyph: GlyphId16) -> u16 {
        let Ok(records) = self.class_range_records() else {
            return 0;
        };
        search_glyph_range(records, glyph, |record| {
            (record.start_glyph_id.get(), record.end_glyph_id.get())
        })
        .map(|record| record.class.get())
        .unwrap_or(0)
    }
}

/// A glyph range mapped to a single class value.
#[derive(Clone, Copy, Debug, bytemuck::AnyBitPattern)]
#[repr(C, packed)]
pub struct ClassRangeRecord {
    pub start_glyph_id: BigEndian<GlyphId16>,
    pub end_glyph_id: BigEndian<GlyphId16>,
    pub class: BigEndian<u16>,
}

impl FixedSize for ClassRangeRecord {
    const RAW_BYTE_LEN: usize = 6;
}

/// Binary search over sorted, non-overlapping glyph ranges.
fn search_glyph_range<T>(
    records: &[T],
    glyph: GlyphId16,
    bounds: impl Fn(&T) -> (GlyphId16, GlyphId16),
) -> Option<&T> {
    records
        .binary_search_by(|record| {
            let (start, end) = bounds(record);
            if glyph < start {
                std::cmp::Ordering::Greater
            } else if glyph > end {
                std::cmp::Ordering::Less
            } else {
                std::cmp::Ordering::Equal
            }
        })
        .ok()
        .map(|index| &records[index])
}

/// The [FeatureVariations](https://learn.microsoft.com/en-us/typography/opentype/spec/chapter2#featurevariations-table) table
pub struct FeatureVariations<'a> {
    data: FontData<'a>,
}

impl<'a> FeatureVariations<'a> {
    pub fn record_count(&self) -> Result<u32, ReadError> {
        self.data.read_at(4)
    }

    /// Find the FeatureTableSubstitution whose condition set matches the
    /// given normalized design coordinates. Records are evaluated in order;
    /// the first match wins.
    pub fn matching_substitution(&self, coords: &[F2Dot14]) -> Option<FeatureTableSubstitution<'a>> {
        let count = self.record_count().ok()?;
        for index in 0..count as usize {
            let record = 8 + index * 8;
            let cond_set_offset = self.data.read_at::<u32>(record).ok()? as usize;
            let cond_set = ConditionSet {
                data: self.data.split_off(cond_set_offset)?,
            };
            if cond_set.matches(coords) {
                let subst_offset = self.data.read_at::<u32>(record + 4).ok()? as usize;
                return self
                    .data
                    .split_off(subst_offset)
                    .map(|data| FeatureTableSubstitution { data });
            }
        }
        None
    }
}

/// A [ConditionSet](https://learn.microsoft.com/en-us/typography/opentype/spec/chapter2#conditionset-table) table
pub struct ConditionSet<'a> {
    data: FontData<'a>,
}

impl<'a> ConditionSet<'a> {
    fn matches(&self, coords: &[F2Dot14]) -> bool {
        let Ok(count) = self.data.read_at::<u16>(0) else {
            return false;
        };
        (0..count as usize).all(|index| {
            self.data
                .read_at::<u32>(2 + index * 4)
                .ok()
                .and_then(|offset| self.data.split_off(offset as usize))
                .map(|data| condition_matches(data, coords))
                .unwrap_or(false)
        })
    }
}

/// Evaluate a format-1 axis range condition; unknown formats never match.
fn condition_matches(data: FontData, coords: &[F2Dot14]) -> bool {
    let Ok(1) = data.read_at::<u16>(0) else {
        return false;
    };
    let (Ok(axis_index), Ok(min), Ok(max)) = (
        data.read_at::<u16>(2),
        data.read_at::<F2Dot14>(4),
        data.read_at::<F2Dot14>(6),
    ) else {
        return false;
    };
    let coord = coords
        .get(axis_index as usize)
        .copied()
        .unwrap_or(F2Dot14::from_bits(0));
    coord >= min && coord <= max
}

/// A [FeatureTableSubstitution](https://learn.microsoft.com/en-us/typography/opentype/spec/chapter2#featuretablesubstitution-table) table
pub struct FeatureTableSubstitution<'a> {
    data: FontData<'a>,
}

impl<'a> FeatureTableSubstitution<'a> {
    pub fn substitution_count(&self) -> Result<u16, ReadError> {
        self.data.read_at(4)
    }

    /// The alternate feature table for the given feature index, if this
    /// substitution carries one.
    pub fn alternate_feature(&self, feature_index: u16) -> Option<Feature<'a>> {
        let count = self.substitution_count().ok()?;
        for index in 0..count as usize {
            let record = 6 + index * 6;
            let record_index = self.data.read_at::<u16>(record).ok()?;
            if record_index == feature_index {
                let offset = self.data.read_at::<u32>(record + 2).ok()? as usize;
                return self.data.split_off(offset).map(|data| Feature { data });
            }
            // records are sorted; stop once we pass the wanted index
            if record_index > feature_index {
                break;
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::test_helpers::BeBuffer;

    #[test]
    fn coverage_format1_search() {
        let buf = BeBuffer::new()
            .push(1u16)
            .push(3u16)
            .extend([2u16, 5, 9]);
        let coverage = CoverageTable::read(buf.font_data()).unwrap();
        assert_eq!(coverage.get(GlyphId16::new(2)), Some(0));
        assert_eq!(coverage.get(GlyphId16::new(5)), Some(1));
        assert_eq!(coverage.get(GlyphId16::new(9)), Some(2));
        assert_eq!(coverage.get(GlyphId16::new(3)), None);
        assert_eq!(coverage.get(GlyphId16::new(10)), None);
    }

    #[test]
    fn coverage_format2_search() {
        let buf = BeBuffer::new()
            .push(2u16)
            .push(2u16)
            // range 10..=14 starting at coverage index 0
            .extend([10u16, 14, 0])
            // range 20..=20 starting at coverage index 5
            .extend([20u16, 20, 5]);
        let coverage = CoverageTable::read(buf.font_data()).unwrap();
        assert_eq!(coverage.get(GlyphId16::new(12)), Some(2));
        assert_eq!(coverage.get(GlyphId16::new(20)), Some(5));
        assert_eq!(coverage.get(GlyphId16::new(15)), None);
        assert_eq!(coverage.get(GlyphId16::new(9)), None);
    }

    #[test]
    fn coverage_unknown_format() {
        let buf = BeBuffer::new().push(3u16);
        assert!(CoverageTable::read(buf.font_data()).is_err());
    }

    #[test]
    fn classdef_format1_lookup() {
        let buf = BeBuffer::new()
            .push(1u16)
            .push(30u16)
            .push(3u16)
            .extend([7u16, 0, 4]);
        let classdef = ClassDefTable::read(buf.font_data()).unwrap();
        assert_eq!(classdef.get(GlyphId16::new(30)), 7);
        assert_eq!(classdef.get(GlyphId16::new(31)), 0);
        assert_eq!(classdef.get(GlyphId16::new(32)), 4);
        // out of range falls into class 0
        assert_eq!(classdef.get(GlyphId16::new(29)), 0);
        assert_eq!(classdef.get(GlyphId16::new(33)), 0);
    }

    #[test]
    fn classdef_format2_lookup() {
        let buf = BeBuffer::new()
            .push(2u16)
            .push(2u16)
            .extend([5u16, 9, 1])
            .extend([12u16, 12, 2]);
        let classdef = ClassDefTable::read(buf.font_data()).unwrap();
        assert_eq!(classdef.get(GlyphId16::new(7)), 1);
        assert_eq!(classdef.get(GlyphId16::new(12)), 2);
        assert_eq!(classdef.get(GlyphId16::new(10)), 0);
    }

    #[test]
    fn truncated_coverage_is_an_error_not_a_panic() {
        let buf = BeBuffer::new().push(1u16).push(4u16).push(1u16);
        let coverage = CoverageTable::read(buf.font_data()).unwrap();
        assert_eq!(coverage.get(GlyphId16::new(1)), None);
    }
}
