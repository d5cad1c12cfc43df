//! the [GPOS](https://docs.microsoft.com/en-us/typography/opentype/spec/gpos) table
//!
//! Subtable views for the positioning lookup types. The contextual types
//! (7, 8) and the extension wrapper (9) are shared with GSUB and live in
//! [`context`](super::context).

use types::{GlyphId16, Tag};

use crate::font_data::FontData;
use crate::read::{FontRead, ReadError};

use super::layout::{ClassDefTable, CoverageTable};
use super::variations::DeviceOrVariationIndex;

/// 'GPOS'
pub const TAG: Tag = Tag::new(b"GPOS");

/// GPOS lookup types.
pub mod lookup_type {
    pub const SINGLE_ADJUSTMENT: u16 = 1;
    pub const PAIR_ADJUSTMENT: u16 = 2;
    pub const CURSIVE_ATTACHMENT: u16 = 3;
    pub const MARK_TO_BASE_ATTACHMENT: u16 = 4;
    pub const MARK_TO_LIGATURE_ATTACHMENT: u16 = 5;
    pub const MARK_TO_MARK_ATTACHMENT: u16 = 6;
    pub const CONTEXT_POSITIONING: u16 = 7;
    pub const CHAINED_CONTEXT_POSITIONING: u16 = 8;
    pub const EXTENSION_POSITIONING: u16 = 9;
}

/// The [ValueFormat](https://learn.microsoft.com/en-us/typography/opentype/spec/gpos#value-record) bit enumeration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ValueFormat(u16);

impl ValueFormat {
    pub const X_PLACEMENT: ValueFormat = ValueFormat(0x0001);
    pub const Y_PLACEMENT: ValueFormat = ValueFormat(0x0002);
    pub const X_ADVANCE: ValueFormat = ValueFormat(0x0004);
    pub const Y_ADVANCE: ValueFormat = ValueFormat(0x0008);
    pub const X_PLACEMENT_DEVICE: ValueFormat = ValueFormat(0x0010);
    pub const Y_PLACEMENT_DEVICE: ValueFormat = ValueFormat(0x0020);
    pub const X_ADVANCE_DEVICE: ValueFormat = ValueFormat(0x0040);
    pub const Y_ADVANCE_DEVICE: ValueFormat = ValueFormat(0x0080);

    pub fn from_bits(bits: u16) -> Self {
        ValueFormat(bits)
    }

    pub fn to_bits(self) -> u16 {
        self.0
    }

    pub fn contains(self, other: ValueFormat) -> bool {
        (self.0 & other.0) == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The number of bytes required to store a value record in this format.
    ///
    /// Each set bit contributes one uint16, present or not in meaning.
    pub fn record_byte_len(self) -> usize {
        self.0.count_ones() as usize * 2
    }
}

impl std::ops::BitOr for ValueFormat {
    type Output = ValueFormat;
    fn bitor(self, other: ValueFormat) -> ValueFormat {
        ValueFormat(self.0 | other.0)
    }
}

/// An unresolved positioning value record.
///
/// The record's fields are consumed in fixed bit order by the positioning
/// pass; device offsets are resolved against `parent`, the table the record
/// is embedded in.
#[derive(Clone, Copy)]
pub struct ValueRecord<'a> {
    pub data: FontData<'a>,
    pub parent: FontData<'a>,
    pub format: ValueFormat,
}

impl<'a> ValueRecord<'a> {
    pub fn new(parent: FontData<'a>, offset: usize, format: ValueFormat) -> Option<Self> {
        let data = parent.split_off(offset)?;
        Some(ValueRecord {
            data,
            parent,
            format,
        })
    }
}

/// A [Single Adjustment](https://learn.microsoft.com/en-us/typography/opentype/spec/gpos#SP) subtable
pub enum SinglePos<'a> {
    Format1(SinglePosFormat1<'a>),
    Format2(SinglePosFormat2<'a>),
}

impl<'a> FontRead<'a> for SinglePos<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        match data.read_at::<u16>(0)? {
            1 => Ok(Self::Format1(SinglePosFormat1 { data })),
            2 => Ok(Self::Format2(SinglePosFormat2 { data })),
            other => Err(ReadError::InvalidFormat(other.into())),
        }
    }
}

/// One value record applied to every covered glyph.
pub struct SinglePosFormat1<'a> {
    data: FontData<'a>,
}

impl<'a> SinglePosFormat1<'a> {
    pub fn coverage(&self) -> Result<CoverageTable<'a>, ReadError> {
        let offset = self.data.read_at::<u16>(2)? as usize;
        CoverageTable::read(self.data.split_off(offset).ok_or(ReadError::OutOfBounds)?)
    }

    pub fn value_format(&self) -> Result<ValueFormat, ReadError> {
        self.data.read_at::<u16>(4).map(ValueFormat::from_bits)
    }

    pub fn value_record(&self) -> Result<ValueRecord<'a>, ReadError> {
        let format = self.value_format()?;
        ValueRecord::new(self.data, 6, format).ok_or(ReadError::OutOfBounds)
    }
}

/// One value record per coverage index.
pub struct SinglePosFormat2<'a> {
    data: FontData<'a>,
}

impl<'a> SinglePosFormat2<'a> {
    pub fn coverage(&self) -> Result<CoverageTable<'a>, ReadError> {
        let offset = self.data.read_at::<u16>(2)? as usize;
        CoverageTable::read(self.data.split_off(offset).ok_or(ReadError::OutOfBounds)?)
    }

    pub fn value_format(&self) -> Result<ValueFormat, ReadError> {
        self.data.read_at::<u16>(4).map(ValueFormat::from_bits)
    }

    pub fn value_count(&self) -> Result<u16, ReadError> {
        self.data.read_at(6)
    }

    pub fn value_record(&self, index: u16) -> Result<ValueRecord<'a>, ReadError> {
        let format = self.value_format()?;
        let offset = 8 + index as usize * format.record_byte_len();
        ValueRecord::new(self.data, offset, format).ok_or(ReadError::OutOfBounds)
    }
}

/// A [Pair Adjustment](https://learn.microsoft.com/en-us/typography/opentype/spec/gpos#PP) subtable
pub enum PairPos<'a> {
    Format1(PairPosFormat1<'a>),
    Format2(PairPosFormat2<'a>),
}

impl<'a> FontRead<'a> for PairPos<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        match data.read_at::<u16>(0)? {
            1 => Ok(Self::Format1(PairPosFormat1 { data })),
            2 => Ok(Self::Format2(PairPosFormat2 { data })),
            other => Err(ReadError::InvalidFormat(other.into())),
        }
    }
}

/// Pair adjustment by glyph pair.
pub struct PairPosFormat1<'a> {
    data: FontData<'a>,
}

impl<'a> PairPosFormat1<'a> {
    pub fn coverage(&self) -> Result<CoverageTable<'a>, ReadError> {
        let offset = self.data.read_at::<u16>(2)? as usize;
        CoverageTable::read(self.data.split_off(offset).ok_or(ReadError::OutOfBounds)?)
    }

    pub fn value_format1(&self) -> Result<ValueFormat, ReadError> {
        self.data.read_at::<u16>(4).map(ValueFormat::from_bits)
    }

    pub fn value_format2(&self) -> Result<ValueFormat, ReadError> {
        self.data.read_at::<u16>(6).map(ValueFormat::from_bits)
    }

    pub fn pair_set_count(&self) -> Result<u16, ReadError> {
        self.data.read_at(8)
    }

    pub fn pair_set(&self, coverage_index: u16) -> Result<PairSet<'a>, ReadError> {
        let offset = self.data.read_at::<u16>(10 + coverage_index as usize * 2)? as usize;
        self.data
            .split_off(offset)
            .map(|data| PairSet { data })
            .ok_or(ReadError::OutOfBounds)
    }
}

/// The pair value records sharing a first glyph, sorted by second glyph.
pub struct PairSet<'a> {
    data: FontData<'a>,
}

impl<'a> PairSet<'a> {
    pub fn offset_data(&self) -> FontData<'a> {
        self.data
    }

    pub fn pair_value_count(&self) -> Result<u16, ReadError> {
        self.data.read_at(0)
    }

    fn second_glyph(&self, index: usize, record_size: usize) -> Result<GlyphId16, ReadError> {
        self.data.read_at(2 + index * record_size)
    }

    /// Binary search the records by second glyph; returns the byte offset
    /// of the matched record within the set.
    pub fn find_second_glyph(
        &self,
        second: GlyphId16,
        value1_len: usize,
        value2_len: usize,
    ) -> Option<usize> {
        let record_size = 2 + value1_len + value2_len;
        let count = self.pair_value_count().ok()? as usize;
        let (mut lo, mut hi) = (0usize, count);
        while lo < hi {
            let mid = (lo + hi) / 2;
            let glyph = self.second_glyph(mid, record_size).ok()?;
            match glyph.cmp(&second) {
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
                std::cmp::Ordering::Equal => return Some(2 + mid * record_size),
            }
        }
        None
    }
}

/// Pair adjustment by glyph classes.
pub struct PairPosFormat2<'a> {
    data: FontData<'a>,
}

impl<'a> PairPosFormat2<'a> {
    pub fn offset_data(&self) -> FontData<'a> {
        self.data
    }

    pub fn coverage(&self) -> Result<CoverageTable<'a>, ReadError> {
        let offset = self.data.read_at::<u16>(2)? as usize;
        CoverageTable::read(self.data.split_off(offset).ok_or(ReadError::OutOfBounds)?)
    }

    pub fn value_format1(&self) -> Result<ValueFormat, ReadError> {
        self.data.read_at::<u16>(4).map(ValueFormat::from_bits)
    }

    pub fn value_format2(&self) -> Result<ValueFormat, ReadError> {
        self.data.read_at::<u16>(6).map(ValueFormat::from_bits)
    }

    pub fn class_def1(&self) -> Result<ClassDefTable<'a>, ReadError> {
        let offset = self.data.read_at::<u16>(8)? as usize;
        ClassDefTable::read(self.data.split_off(offset).ok_or(ReadError::OutOfBounds)?)
    }

    pub fn class_def2(&self) -> Result<ClassDefTable<'a>, ReadError> {
        let offset = self.data.read_at::<u16>(10)? as usize;
        ClassDefTable::read(self.data.split_off(offset).ok_or(ReadError::OutOfBounds)?)
    }

    pub fn class1_count(&self) -> Result<u16, ReadError> {
        self.data.read_at(12)
    }

    pub fn class2_count(&self) -> Result<u16, ReadError> {
        self.data.read_at(14)
    }

    /// The byte offset of the (class1, class2) cell in the class matrix.
    pub fn class_record_offset(&self, class1: u16, class2: u16) -> Result<usize, ReadError> {
        let class2_count = self.class2_count()? as usize;
        let value_len = self.value_format1()?.record_byte_len() + self.value_format2()?.record_byte_len();
        let class1_size = class2_count * value_len;
        Ok(16 + class1 as usize * class1_size + class2 as usize * value_len)
    }
}

/// A [Cursive Attachment](https://learn.microsoft.com/en-us/typography/opentype/spec/gpos#CAP) subtable (format 1 only)
pub struct CursivePos<'a> {
    data: FontData<'a>,
}

impl<'a> FontRead<'a> for CursivePos<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        match data.read_at::<u16>(0)? {
            1 => Ok(CursivePos { data }),
            other => Err(ReadError::InvalidFormat(other.into())),
        }
    }
}

impl<'a> CursivePos<'a> {
    pub fn coverage(&self) -> Result<CoverageTable<'a>, ReadError> {
        let offset = self.data.read_at::<u16>(2)? as usize;
        CoverageTable::read(self.data.split_off(offset).ok_or(ReadError::OutOfBounds)?)
    }

    pub fn entry_exit_count(&self) -> Result<u16, ReadError> {
        self.data.read_at(4)
    }

    /// The entry and exit anchors of the covered glyph, either of which may
    /// be absent.
    pub fn entry_exit_anchors(
        &self,
        glyph: GlyphId16,
    ) -> (Option<AnchorTable<'a>>, Option<AnchorTable<'a>>) {
        let Some(index) = self.coverage().ok().and_then(|coverage| coverage.get(glyph)) else {
            return (None, None);
        };
        if index >= self.entry_exit_count().unwrap_or(0) {
            return (None, None);
        }
        let record = 6 + index as usize * 4;
        let entry = self.anchor_at(record);
        let exit = self.anchor_at(record + 2);
        (entry, exit)
    }

    fn anchor_at(&self, pos: usize) -> Option<AnchorTable<'a>> {
        let data = self.data.resolve_offset16(pos).ok()??;
        AnchorTable::read(data).ok()
    }
}

/// A [Mark-to-Base Attachment](https://learn.microsoft.com/en-us/typography/opentype/spec/gpos#MBP) subtable (format 1 only)
pub struct MarkBasePos<'a> {
    data: FontData<'a>,
}

impl<'a> FontRead<'a> for MarkBasePos<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        match data.read_at::<u16>(0)? {
            1 => Ok(MarkBasePos { data }),
            other => Err(ReadError::InvalidFormat(other.into())),
        }
    }
}

impl<'a> MarkBasePos<'a> {
    pub fn mark_coverage(&self) -> Result<CoverageTable<'a>, ReadError> {
        let offset = self.data.read_at::<u16>(2)? as usize;
        CoverageTable::read(self.data.split_off(offset).ok_or(ReadError::OutOfBounds)?)
    }

    pub fn base_coverage(&self) -> Result<CoverageTable<'a>, ReadError> {
        let offset = self.data.read_at::<u16>(4)? as usize;
        CoverageTable::read(self.data.split_off(offset).ok_or(ReadError::OutOfBounds)?)
    }

    pub fn mark_class_count(&self) -> Result<u16, ReadError> {
        self.data.read_at(6)
    }

    pub fn mark_array(&self) -> Result<MarkArray<'a>, ReadError> {
        let offset = self.data.read_at::<u16>(8)? as usize;
        self.data
            .split_off(offset)
            .map(|data| MarkArray { data })
            .ok_or(ReadError::OutOfBounds)
    }

    pub fn base_array(&self) -> Result<BaseArray<'a>, ReadError> {
        let offset = self.data.read_at::<u16>(10)? as usize;
        self.data
            .split_off(offset)
            .map(|data| BaseArray { data })
            .ok_or(ReadError::OutOfBounds)
    }
}

/// One anchor per mark class for every base glyph.
pub struct BaseArray<'a> {
    data: FontData<'a>,
}

impl<'a> BaseArray<'a> {
    pub fn base_count(&self) -> Result<u16, ReadError> {
        self.data.read_at(0)
    }

    pub fn base_anchor(
        &self,
        base_index: u16,
        class: u16,
        class_count: u16,
    ) -> Option<AnchorTable<'a>> {
        let record = 2 + base_index as usize * class_count as usize * 2;
        let data = self.data.resolve_offset16(record + class as usize * 2).ok()??;
        AnchorTable::read(data).ok()
    }
}

/// A [Mark-to-Ligature Attachment](https://learn.microsoft.com/en-us/typography/opentype/spec/gpos#MLP) subtable (format 1 only)
pub struct MarkLigPos<'a> {
    data: FontData<'a>,
}

impl<'a> FontRead<'a> for MarkLigPos<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        match data.read_at::<u16>(0)? {
            1 => Ok(MarkLigPos { data }),
            other => Err(ReadError::InvalidFormat(other.into())),
        }
    }
}

impl<'a> MarkLigPos<'a> {
    pub fn mark_coverage(&self) -> Result<CoverageTable<'a>, ReadError> {
        let offset = self.data.read_at::<u16>(2)? as usize;
        CoverageTable::read(self.data.split_off(offset).ok_or(ReadError::OutOfBounds)?)
    }

    pub fn ligature_coverage(&self) -> Result<CoverageTable<'a>, ReadError> {
        let offset = self.data.read_at::<u16>(4)? as usize;
        CoverageTable::read(self.data.split_off(offset).ok_or(ReadError::OutOfBounds)?)
    }

    pub fn mark_class_count(&self) -> Result<u16, ReadError> {
        self.data.read_at(6)
    }

    pub fn mark_array(&self) -> Result<MarkArray<'a>, ReadError> {
        let offset = self.data.read_at::<u16>(8)? as usize;
        self.data
            .split_off(offset)
            .map(|data| MarkArray { data })
            .ok_or(ReadError::OutOfBounds)
    }

    pub fn ligature_array(&self) -> Result<LigatureArray<'a>, ReadError> {
        let offset = self.data.read_at::<u16>(10)? as usize;
        self.data
            .split_off(offset)
            .map(|data| LigatureArray { data })
            .ok_or(ReadError::OutOfBounds)
    }
}

/// One attach table per covered ligature.
pub struct LigatureArray<'a> {
    data: FontData<'a>,
}

impl<'a> LigatureArray<'a> {
    pub fn ligature_count(&self) -> Result<u16, ReadError> {
        self.data.read_at(0)
    }

    pub fn ligature_attach(&self, index: u16) -> Result<LigatureAttach<'a>, ReadError> {
        let offset = self.data.read_at::<u16>(2 + index as usize * 2)? as usize;
        self.data
            .split_off(offset)
            .map(|data| LigatureAttach { data })
            .ok_or(ReadError::OutOfBounds)
    }
}

/// One anchor per mark class for every component of one ligature.
pub struct LigatureAttach<'a> {
    data: FontData<'a>,
}

impl<'a> LigatureAttach<'a> {
    pub fn component_count(&self) -> Result<u16, ReadError> {
        self.data.read_at(0)
    }

    pub fn component_anchor(
        &self,
        component: u16,
        class: u16,
        class_count: u16,
    ) -> Option<AnchorTable<'a>> {
        let record = 2 + component as usize * class_count as usize * 2;
        let data = self.data.resolve_offset16(record + class as usize * 2).ok()??;
        AnchorTable::read(data).ok()
    }
}

/// A [Mark-to-Mark Attachment](https://learn.microsoft.com/en-us/typography/opentype/spec/gpos#MMP) subtable (format 1 only)
pub struct MarkMarkPos<'a> {
    data: FontData<'a>,
}

impl<'a> FontRead<'a> for MarkMarkPos<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        match data.read_at::<u16>(0)? {
            1 => Ok(MarkMarkPos { data }),
            other => Err(ReadError::InvalidFormat(other.into())),
        }
    }
}

impl<'a> MarkMarkPos<'a> {
    pub fn mark1_coverage(&self) -> Result<CoverageTable<'a>, ReadError> {
        let offset = self.data.read_at::<u16>(2)? as usize;
        CoverageTable::read(self.data.split_off(offset).ok_or(ReadError::OutOfBounds)?)
    }

    pub fn mark2_coverage(&self) -> Result<CoverageTable<'a>, ReadError> {
        let offset = self.data.read_at::<u16>(4)? as usize;
        CoverageTable::read(self.data.split_off(offset).ok_or(ReadError::OutOfBounds)?)
    }

    pub fn mark_class_count(&self) -> Result<u16, ReadError> {
        self.data.read_at(6)
    }

    pub fn mark1_array(&self) -> Result<MarkArray<'a>, ReadError> {
        let offset = self.data.read_at::<u16>(8)? as usize;
        self.data
            .split_off(offset)
            .map(|data| MarkArray { data })
            .ok_or(ReadError::OutOfBounds)
    }

    pub fn mark2_array(&self) -> Result<Mark2Array<'a>, ReadError> {
        let offset = self.data.read_at::<u16>(10)? as usize;
        self.data
            .split_off(offset)
            .map(|data| Mark2Array { data })
            .ok_or(ReadError::OutOfBounds)
    }
}

/// One anchor per mark class for every attaching (mark2) glyph.
pub struct Mark2Array<'a> {
    data: FontData<'a>,
}

impl<'a> Mark2Array<'a> {
    pub fn mark2_count(&self) -> Result<u16, ReadError> {
        self.data.read_at(0)
    }

    pub fn mark2_anchor(
        &self,
        mark2_index: u16,
        class: u16,
        class_count: u16,
    ) -> Option<AnchorTable<'a>> {
        let record = 2 + mark2_index as usize * class_count as usize * 2;
        let data = self.data.resolve_offset16(record + class as usize * 2).ok()??;
        AnchorTable::read(data).ok()
    }
}

/// A [MarkArray](https://learn.microsoft.com/en-us/typography/opentype/spec/gpos#mark-array-table): class and anchor per covered mark.
pub struct MarkArray<'a> {
    data: FontData<'a>,
}

impl<'a> MarkArray<'a> {
    pub fn mark_count(&self) -> Result<u16, ReadError> {
        self.data.read_at(0)
    }

    /// The class value and anchor for the given mark coverage index.
    pub fn mark_record(&self, mark_index: u16) -> Option<(u16, AnchorTable<'a>)> {
        if mark_index >= self.mark_count().ok()? {
            return None;
        }
        let record = 2 + mark_index as usize * 4;
        let class = self.data.read_at::<u16>(record).ok()?;
        let anchor_offset = self.data.read_at::<u16>(record + 2).ok()? as usize;
        let anchor = AnchorTable::read(self.data.split_off(anchor_offset)?).ok()?;
        Some((class, anchor))
    }
}

/// An [Anchor Table](https://learn.microsoft.com/en-us/typography/opentype/spec/gpos#anchor-tables)
pub enum AnchorTable<'a> {
    Format1(AnchorFormat1<'a>),
    Format2(AnchorFormat2<'a>),
    Format3(AnchorFormat3<'a>),
}

impl<'a> FontRead<'a> for AnchorTable<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        match data.read_at::<u16>(0)? {
            1 => Ok(Self::Format1(AnchorFormat1 { data })),
            2 => Ok(Self::Format2(AnchorFormat2 { data })),
            3 => Ok(Self::Format3(AnchorFormat3 { data })),
            other => Err(ReadError::InvalidFormat(other.into())),
        }
    }
}

/// Design units only.
pub struct AnchorFormat1<'a> {
    data: FontData<'a>,
}

impl AnchorFormat1<'_> {
    pub fn x_coordinate(&self) -> Result<i16, ReadError> {
        self.data.read_at(2)
    }

    pub fn y_coordinate(&self) -> Result<i16, ReadError> {
        self.data.read_at(4)
    }
}

/// Design units plus a contour point.
pub struct AnchorFormat2<'a> {
    data: FontData<'a>,
}

impl AnchorFormat2<'_> {
    pub fn x_coordinate(&self) -> Result<i16, ReadError> {
        self.data.read_at(2)
    }

    pub fn y_coordinate(&self) -> Result<i16, ReadError> {
        self.data.read_at(4)
    }

    pub fn anchor_point(&self) -> Result<u16, ReadError> {
        self.data.read_at(6)
    }
}

/// Design units plus device or variation-index adjustments.
pub struct AnchorFormat3<'a> {
    data: FontData<'a>,
}

impl<'a> AnchorFormat3<'a> {
    pub fn x_coordinate(&self) -> Result<i16, ReadError> {
        self.data.read_at(2)
    }

    pub fn y_coordinate(&self) -> Result<i16, ReadError> {
        self.data.read_at(4)
    }

    pub fn x_device(&self) -> Option<DeviceOrVariationIndex<'a>> {
        let data = self.data.resolve_offset16(6).ok()??;
        DeviceOrVariationIndex::read(data).ok()
    }

    pub fn y_device(&self) -> Option<DeviceOrVariationIndex<'a>> {
        let data = self.data.resolve_offset16(8).ok()??;
        DeviceOrVariationIndex::read(data).ok()
    }
}
