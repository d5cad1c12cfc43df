//! the [GDEF](https://docs.microsoft.com/en-us/typography/opentype/spec/gdef) table
//!
//! Only the pieces the shaping engine consumes are exposed: the glyph class
//! definition, the mark attachment class definition, the mark glyph sets
//! (version 1.2+), and the item variation store (version 1.3+).

use types::Tag;

use crate::font_data::FontData;
use crate::read::{FontRead, ReadError};

use super::layout::{ClassDefTable, CoverageTable};
use super::variations::ItemVariationStore;

/// 'GDEF'
pub const TAG: Tag = Tag::new(b"GDEF");

/// Glyph classes assigned by the [GDEF glyph class definition](https://learn.microsoft.com/en-us/typography/opentype/spec/gdef#glyph-class-definition-table).
pub mod glyph_class {
    pub const BASE: u16 = 1;
    pub const LIGATURE: u16 = 2;
    pub const MARK: u16 = 3;
    pub const COMPONENT: u16 = 4;
}

pub struct Gdef<'a> {
    data: FontData<'a>,
}

impl<'a> FontRead<'a> for Gdef<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        data.read_at::<u32>(0)?;
        Ok(Gdef { data })
    }
}

impl<'a> Gdef<'a> {
    pub fn version(&self) -> Result<u32, ReadError> {
        self.data.read_at(0)
    }

    pub fn glyph_class_def(&self) -> Option<ClassDefTable<'a>> {
        let data = self.data.resolve_offset16(4).ok()??;
        ClassDefTable::read(data).ok()
    }

    pub fn mark_attach_class_def(&self) -> Option<ClassDefTable<'a>> {
        let data = self.data.resolve_offset16(10).ok()??;
        ClassDefTable::read(data).ok()
    }

    /// The mark glyph sets definition, present in version 1.2 and later.
    pub fn mark_glyph_sets_def(&self) -> Option<MarkGlyphSets<'a>> {
        if self.version().ok()? < 0x0001_0002 {
            return None;
        }
        let data = self.data.resolve_offset16(12).ok()??;
        Some(MarkGlyphSets { data })
    }

    /// The item variation store, present in version 1.3 and later.
    pub fn item_var_store(&self) -> Option<ItemVariationStore<'a>> {
        if self.version().ok()? < 0x0001_0003 {
            return None;
        }
        let offset = self.data.read_at::<u32>(14).ok()? as usize;
        if offset == 0 {
            return None;
        }
        let data = self.data.split_off(offset)?;
        ItemVariationStore::read(data).ok()
    }
}

/// The [Mark Glyph Sets](https://learn.microsoft.com/en-us/typography/opentype/spec/gdef#mark-glyph-sets-table) table
pub struct MarkGlyphSets<'a> {
    data: FontData<'a>,
}

impl<'a> MarkGlyphSets<'a> {
    pub fn format(&self) -> Result<u16, ReadError> {
        self.data.read_at(0)
    }

    pub fn mark_glyph_set_count(&self) -> Result<u16, ReadError> {
        self.data.read_at(2)
    }

    /// The coverage table naming the marks in the given set.
    pub fn coverage(&self, index: u16) -> Option<CoverageTable<'a>> {
        if self.format().ok()? != 1 || index >= self.mark_glyph_set_count().ok()? {
            return None;
        }
        let offset = self.data.read_at::<u32>(4 + index as usize * 4).ok()? as usize;
        let data = self.data.split_off(offset)?;
        CoverageTable::read(data).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::test_helpers::BeBuffer;

    #[test]
    fn version_gates_optional_tables() {
        // version 1.0 header with a nonzero mark glyph sets offset that
        // must not be consulted
        let buf = BeBuffer::new()
            .push(0x0001_0000u32)
            .extend([0u16, 0, 0, 0, 12]);
        let gdef = Gdef::read(buf.font_data()).unwrap();
        assert!(gdef.glyph_class_def().is_none());
        assert!(gdef.mark_glyph_sets_def().is_none());
        assert!(gdef.item_var_store().is_none());
    }
}
