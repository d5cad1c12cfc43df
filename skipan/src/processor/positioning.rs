//! GPOS lookup evaluators and attachment resolution.
//!
//! Positioning adjustments accumulate into the album's offsets and
//! advances; cursive chains and mark attachments are recorded as relative
//! offsets and resolved in a final pass once every lookup has run.

use crate::album::GlyphTraits;
use crate::font_data::FontData;
use crate::locator::Locator;
use crate::read::{FontRead, ReadError};
use crate::tables::gpos::{
    lookup_type, AnchorTable, CursivePos, MarkBasePos, MarkLigPos, MarkMarkPos, PairPos,
    PairPosFormat1, PairPosFormat2, SinglePos, ValueFormat, ValueRecord,
};
use crate::tables::variations::DeviceOrVariationIndex;
use crate::TextDirection;

use super::TextProcessor;

impl<'a> TextProcessor<'a> {
    pub(crate) fn apply_positioning_subtable(
        &mut self,
        lookup_type: u16,
        subtable: FontData<'a>,
        index: usize,
    ) -> Result<bool, ReadError> {
        match lookup_type {
            lookup_type::SINGLE_ADJUSTMENT => self.apply_single_pos(subtable, index),
            lookup_type::PAIR_ADJUSTMENT => self.apply_pair_pos(subtable, index),
            lookup_type::CURSIVE_ATTACHMENT => self.apply_cursive_pos(subtable, index),
            lookup_type::MARK_TO_BASE_ATTACHMENT => self.apply_mark_to_base_pos(subtable, index),
            lookup_type::MARK_TO_LIGATURE_ATTACHMENT => {
                self.apply_mark_to_lig_pos(subtable, index)
            }
            lookup_type::MARK_TO_MARK_ATTACHMENT => self.apply_mark_to_mark_pos(subtable, index),
            lookup_type::CONTEXT_POSITIONING => self.apply_context_subtable(subtable, index),
            lookup_type::CHAINED_CONTEXT_POSITIONING => {
                self.apply_chain_context_subtable(subtable, index)
            }
            lookup_type::EXTENSION_POSITIONING => self.apply_extension_subtable(subtable, index),
            _ => Ok(false),
        }
    }

    fn x_delta_pixels(&self, device: &DeviceOrVariationIndex) -> i32 {
        let (ppem_width, _, var_store, coords) = self.variation_context();
        device.delta_pixels(ppem_width, var_store, coords)
    }

    fn y_delta_pixels(&self, device: &DeviceOrVariationIndex) -> i32 {
        let (_, ppem_height, var_store, coords) = self.variation_context();
        device.delta_pixels(ppem_height, var_store, coords)
    }

    /// Apply one value record to the glyph at `target`.
    ///
    /// All eight format bits are consumed in fixed order whether or not a
    /// bit contributes; vertical advances are read and discarded.
    fn apply_value_record(&mut self, value: &ValueRecord<'a>, target: usize) {
        let format = value.format;
        let data = value.data;
        let mut offset = 0usize;

        if format.contains(ValueFormat::X_PLACEMENT) {
            if let Ok(adjustment) = data.read_at::<i16>(offset) {
                self.album.add_x(target, i32::from(adjustment));
            }
            offset += 2;
        }

        if format.contains(ValueFormat::Y_PLACEMENT) {
            if let Ok(adjustment) = data.read_at::<i16>(offset) {
                self.album.add_y(target, i32::from(adjustment));
            }
            offset += 2;
        }

        if format.contains(ValueFormat::X_ADVANCE) {
            if let Ok(adjustment) = data.read_at::<i16>(offset) {
                self.album.add_advance(target, i32::from(adjustment));
            }
            offset += 2;
        }

        if format.contains(ValueFormat::Y_ADVANCE) {
            // TODO: vertical layout
            offset += 2;
        }

        if format.contains(ValueFormat::X_PLACEMENT_DEVICE) {
            if let Some(device) = device_at(value.parent, data, offset) {
                let adjustment = self.x_delta_pixels(&device);
                self.album.add_x(target, adjustment);
            }
            offset += 2;
        }

        if format.contains(ValueFormat::Y_PLACEMENT_DEVICE) {
            if let Some(device) = device_at(value.parent, data, offset) {
                let adjustment = self.y_delta_pixels(&device);
                self.album.add_y(target, adjustment);
            }
            offset += 2;
        }

        if format.contains(ValueFormat::X_ADVANCE_DEVICE) {
            if let Some(device) = device_at(value.parent, data, offset) {
                let adjustment = self.x_delta_pixels(&device);
                self.album.add_advance(target, adjustment);
            }
        }

        // Y_ADVANCE_DEVICE closes the fixed field order; vertical layout
        // is not supported, so its device table is never chased
    }

    fn apply_single_pos(
        &mut self,
        subtable: FontData<'a>,
        index: usize,
    ) -> Result<bool, ReadError> {
        let glyph = self.album.glyph(index);

        match SinglePos::read(subtable)? {
            SinglePos::Format1(table) => {
                if table.coverage()?.get(glyph).is_none() {
                    return Ok(false);
                }
                let value = table.value_record()?;
                self.apply_value_record(&value, index);
                Ok(true)
            }

            SinglePos::Format2(table) => {
                let Some(coverage_index) = table.coverage()?.get(glyph) else {
                    return Ok(false);
                };
                if coverage_index >= table.value_count()? {
                    return Ok(false);
                }
                let value = table.value_record(coverage_index)?;
                self.apply_value_record(&value, index);
                Ok(true)
            }
        }
    }

    fn apply_pair_pos(
        &mut self,
        subtable: FontData<'a>,
        first_index: usize,
    ) -> Result<bool, ReadError> {
        let mut did_position = false;
        let mut should_skip = false;

        // proceed only if a pair glyph is available
        let second_index = self.locator.get_after(&*self.album, first_index, true);
        if let Some(second_index) = second_index {
            match PairPos::read(subtable)? {
                PairPos::Format1(table) => {
                    (did_position, should_skip) =
                        self.apply_pair_pos_format1(&table, first_index, second_index)?;
                }
                PairPos::Format2(table) => {
                    (did_position, should_skip) =
                        self.apply_pair_pos_format2(&table, first_index, second_index)?;
                }
            }

            if should_skip {
                self.locator.jump_to(&*self.album, second_index);
            }
        }

        Ok(did_position)
    }

    fn apply_pair_pos_format1(
        &mut self,
        table: &PairPosFormat1<'a>,
        first_index: usize,
        second_index: usize,
    ) -> Result<(bool, bool), ReadError> {
        let first_glyph = self.album.glyph(first_index);
        let second_glyph = self.album.glyph(second_index);

        let Some(coverage_index) = table.coverage()?.get(first_glyph) else {
            return Ok((false, false));
        };
        if coverage_index >= table.pair_set_count()? {
            return Ok((false, false));
        }

        let format1 = table.value_format1()?;
        let format2 = table.value_format2()?;
        let value1_len = format1.record_byte_len();
        let value2_len = format2.record_byte_len();

        let pair_set = table.pair_set(coverage_index)?;
        let Some(record_offset) = pair_set.find_second_glyph(second_glyph, value1_len, value2_len)
        else {
            return Ok((false, false));
        };

        let parent = pair_set.offset_data();
        let mut should_skip = false;

        if value1_len != 0 {
            if let Some(value) = ValueRecord::new(parent, record_offset + 2, format1) {
                self.apply_value_record(&value, first_index);
            }
        }
        if value2_len != 0 {
            if let Some(value) = ValueRecord::new(parent, record_offset + 2 + value1_len, format2)
            {
                self.apply_value_record(&value, second_index);
            }
            // the pair element is consumed only when the second glyph has
            // its own value record
            should_skip = true;
        }

        Ok((true, should_skip))
    }

    fn apply_pair_pos_format2(
        &mut self,
        table: &PairPosFormat2<'a>,
        first_index: usize,
        second_index: usize,
    ) -> Result<(bool, bool), ReadError> {
        let first_glyph = self.album.glyph(first_index);
        let second_glyph = self.album.glyph(second_index);

        if table.coverage()?.get(first_glyph).is_none() {
            return Ok((false, false));
        }

        let class1 = table.class_def1()?.get(first_glyph);
        let class2 = table.class_def2()?.get(second_glyph);
        if class1 >= table.class1_count()? || class2 >= table.class2_count()? {
            return Ok((false, false));
        }

        let format1 = table.value_format1()?;
        let format2 = table.value_format2()?;
        let record_offset = table.class_record_offset(class1, class2)?;
        let parent = table.offset_data();
        let mut should_skip = false;

        if !format1.is_empty() {
            if let Some(value) = ValueRecord::new(parent, record_offset, format1) {
                self.apply_value_record(&value, first_index);
            }
        }
        if !format2.is_empty() {
            let value1_len = format1.record_byte_len();
            if let Some(value) = ValueRecord::new(parent, record_offset + value1_len, format2) {
                self.apply_value_record(&value, second_index);
            }
            should_skip = true;
        }

        Ok((true, should_skip))
    }

    /// An anchor's position, with any device or variation adjustments.
    fn anchor_point(&self, anchor: &AnchorTable<'a>) -> (i32, i32) {
        match anchor {
            AnchorTable::Format1(anchor) => (
                anchor.x_coordinate().unwrap_or(0).into(),
                anchor.y_coordinate().unwrap_or(0).into(),
            ),
            // TODO: contour-point adjustment
            AnchorTable::Format2(anchor) => (
                anchor.x_coordinate().unwrap_or(0).into(),
                anchor.y_coordinate().unwrap_or(0).into(),
            ),
            AnchorTable::Format3(anchor) => {
                let mut x = i32::from(anchor.x_coordinate().unwrap_or(0));
                let mut y = i32::from(anchor.y_coordinate().unwrap_or(0));
                if let Some(device) = anchor.x_device() {
                    x += self.x_delta_pixels(&device);
                }
                if let Some(device) = anchor.y_device() {
                    y += self.y_delta_pixels(&device);
                }
                (x, y)
            }
        }
    }

    fn apply_cursive_pos(
        &mut self,
        subtable: FontData<'a>,
        first_index: usize,
    ) -> Result<bool, ReadError> {
        let table = CursivePos::read(subtable)?;

        let first_glyph = self.album.glyph(first_index);
        let (_, exit_anchor) = table.entry_exit_anchors(first_glyph);
        let Some(exit_anchor) = exit_anchor else {
            return Ok(false);
        };

        let Some(second_index) = self.locator.get_after(&*self.album, first_index, true) else {
            return Ok(false);
        };
        let second_glyph = self.album.glyph(second_index);
        let (entry_anchor, _) = table.entry_exit_anchors(second_glyph);
        let Some(entry_anchor) = entry_anchor else {
            return Ok(false);
        };

        let exit = self.anchor_point(&exit_anchor);
        let entry = self.anchor_point(&entry_anchor);
        let rtl_flag = self.locator.filter.lookup_flag.right_to_left();

        let mut traits = GlyphTraits::CURSIVE;
        if rtl_flag {
            traits |= GlyphTraits::RIGHT_TO_LEFT;
        }

        let album = &mut *self.album;
        match self.text_direction {
            TextDirection::LeftToRight => {
                // the first glyph's advance ends at its exit x; the second
                // starts at its entry x with its advance preserved
                let offset = album.x(first_index);
                album.set_advance(first_index, offset + exit.0);

                let offset = album.x(second_index);
                let advance = album.advance(second_index);
                album.set_advance(second_index, advance - offset + -entry.0);
                album.set_x(second_index, -entry.0);

                let y = if rtl_flag { entry.1 - exit.1 } else { exit.1 - entry.1 };
                album.set_y(second_index, y);
            }

            TextDirection::RightToLeft => {
                // mirrored: a glyph runs from its advance towards zero, so
                // the second glyph's advance ends at its entry x
                let offset = album.x(second_index);
                album.set_advance(second_index, offset + entry.0);

                let offset = album.x(first_index);
                let advance = album.advance(first_index);
                album.set_advance(first_index, advance - offset + -exit.0);
                album.set_x(first_index, -exit.0);

                let y = if rtl_flag { entry.1 - exit.1 } else { exit.1 - entry.1 };
                album.set_y(first_index, y);
            }
        }

        album.set_cursive_offset(first_index, (second_index - first_index) as u16);
        album.insert_helper_traits(first_index, traits);

        album.set_cursive_offset(second_index, 0);
        album.insert_helper_traits(second_index, traits);

        Ok(true)
    }

    /// Attach the mark at `index` to the anchor owner at `attachment_index`.
    fn attach_mark(
        &mut self,
        index: usize,
        attachment_index: usize,
        mark_point: (i32, i32),
        owner_point: (i32, i32),
    ) {
        debug_assert!(attachment_index < index);

        self.album.set_x(index, owner_point.0 - mark_point.0);
        self.album.set_y(index, owner_point.1 - mark_point.1);
        self.album
            .set_attachment_offset(index, (index - attachment_index) as u16);
        self.album.insert_helper_traits(index, GlyphTraits::ATTACHED);
    }

    fn apply_mark_to_base_pos(
        &mut self,
        subtable: FontData<'a>,
        index: usize,
    ) -> Result<bool, ReadError> {
        let table = MarkBasePos::read(subtable)?;
        let glyph = self.album.glyph(index);

        let Some(mark_index) = table.mark_coverage()?.get(glyph) else {
            return Ok(false);
        };

        // proceed only if there is a previous base glyph
        let Some(prev_index) = self.locator.preceding_base_index(&*self.album, index) else {
            return Ok(false);
        };
        let prev_glyph = self.album.glyph(prev_index);
        let Some(base_index) = table.base_coverage()?.get(prev_glyph) else {
            return Ok(false);
        };

        let class_count = table.mark_class_count()?;
        let Some((class, mark_anchor)) = table.mark_array()?.mark_record(mark_index) else {
            return Ok(false);
        };
        if class >= class_count {
            return Ok(false);
        }

        let base_array = table.base_array()?;
        if base_index >= base_array.base_count()? {
            return Ok(false);
        }
        let Some(base_anchor) = base_array.base_anchor(base_index, class, class_count) else {
            return Ok(false);
        };

        let mark_point = self.anchor_point(&mark_anchor);
        let base_point = self.anchor_point(&base_anchor);
        self.attach_mark(index, prev_index, mark_point, base_point);

        Ok(true)
    }

    fn apply_mark_to_lig_pos(
        &mut self,
        subtable: FontData<'a>,
        index: usize,
    ) -> Result<bool, ReadError> {
        let table = MarkLigPos::read(subtable)?;
        let glyph = self.album.glyph(index);

        let Some(mark_index) = table.mark_coverage()?.get(glyph) else {
            return Ok(false);
        };

        let Some((prev_index, component)) =
            self.locator.preceding_ligature_index(&*self.album, index)
        else {
            return Ok(false);
        };
        let prev_glyph = self.album.glyph(prev_index);
        let Some(lig_index) = table.ligature_coverage()?.get(prev_glyph) else {
            return Ok(false);
        };

        let class_count = table.mark_class_count()?;
        let Some((class, mark_anchor)) = table.mark_array()?.mark_record(mark_index) else {
            return Ok(false);
        };
        if class >= class_count {
            return Ok(false);
        }

        let ligature_array = table.ligature_array()?;
        if lig_index >= ligature_array.ligature_count()? {
            return Ok(false);
        }
        let attach = ligature_array.ligature_attach(lig_index)?;
        let component_count = attach.component_count()?;

        // use the last component in case of error
        let component = (component as u16).min(component_count.saturating_sub(1));
        let Some(lig_anchor) = attach.component_anchor(component, class, class_count) else {
            return Ok(false);
        };

        let mark_point = self.anchor_point(&mark_anchor);
        let lig_point = self.anchor_point(&lig_anchor);
        self.attach_mark(index, prev_index, mark_point, lig_point);

        Ok(true)
    }

    fn apply_mark_to_mark_pos(
        &mut self,
        subtable: FontData<'a>,
        index: usize,
    ) -> Result<bool, ReadError> {
        let table = MarkMarkPos::read(subtable)?;
        let glyph = self.album.glyph(index);

        let Some(mark1_index) = table.mark1_coverage()?.get(glyph) else {
            return Ok(false);
        };

        let Some(prev_index) = self.locator.preceding_mark_index(&*self.album, index) else {
            return Ok(false);
        };
        let prev_glyph = self.album.glyph(prev_index);
        let Some(mark2_index) = table.mark2_coverage()?.get(prev_glyph) else {
            return Ok(false);
        };

        let class_count = table.mark_class_count()?;
        let Some((class, mark1_anchor)) = table.mark1_array()?.mark_record(mark1_index) else {
            return Ok(false);
        };
        if class >= class_count {
            return Ok(false);
        }

        let mark2_array = table.mark2_array()?;
        if mark2_index >= mark2_array.mark2_count()? {
            return Ok(false);
        }
        let Some(mark2_anchor) = mark2_array.mark2_anchor(mark2_index, class, class_count) else {
            return Ok(false);
        };

        let mark1_point = self.anchor_point(&mark1_anchor);
        let mark2_point = self.anchor_point(&mark2_anchor);
        self.attach_mark(index, prev_index, mark1_point, mark2_point);

        Ok(true)
    }

    /// Resolve recorded cursive chains and mark attachments into absolute
    /// positions. Runs with an unfiltered locator over the whole album.
    pub(crate) fn resolve_attachments(&mut self) {
        let mut locator = Locator::new(None);

        self.resolve_cursive_positions(&mut locator);
        self.resolve_mark_positions(&mut locator);
    }

    fn resolve_cursive_positions(&mut self, locator: &mut Locator<'a>) {
        locator.reset(&*self.album, 0, self.album.glyph_count());

        while let Some(index) = locator.move_next(&*self.album) {
            let traits = self.album.traits(index);

            if traits.contains(GlyphTraits::CURSIVE) && !traits.contains(GlyphTraits::RESOLVED) {
                if traits.contains(GlyphTraits::RIGHT_TO_LEFT) {
                    self.resolve_right_cursive_segment(index);
                } else {
                    self.resolve_left_cursive_segment(index);
                }
            }
        }
    }

    /// For a left-to-right attached segment the first glyph sits on the
    /// baseline, pushing the following glyphs downward.
    fn resolve_left_cursive_segment(&mut self, index: usize) {
        let offset = self.album.cursive_offset(index) as usize;

        if offset != 0 {
            let next_index = index + offset;

            let y = self.album.y(index);
            let next_y = self.album.y(next_index);
            self.album.set_y(next_index, next_y + y);

            self.resolve_left_cursive_segment(next_index);

            self.album.insert_helper_traits(index, GlyphTraits::RESOLVED);
        }
    }

    /// For a right-to-left attached segment the last glyph sits on the
    /// baseline, pulling the preceding glyphs upward.
    fn resolve_right_cursive_segment(&mut self, index: usize) {
        let offset = self.album.cursive_offset(index) as usize;

        if offset != 0 {
            let next_index = index + offset;

            self.resolve_right_cursive_segment(next_index);

            let y = self.album.y(index);
            let next_y = self.album.y(next_index);
            self.album.set_y(index, y + next_y);

            self.album.insert_helper_traits(index, GlyphTraits::RESOLVED);
        }
    }

    fn resolve_mark_positions(&mut self, locator: &mut Locator<'a>) {
        locator.reset(&*self.album, 0, self.album.glyph_count());

        while let Some(index) = locator.move_next(&*self.album) {
            if !self.album.traits(index).contains(GlyphTraits::ATTACHED) {
                continue;
            }

            let attachment_index = index - self.album.attachment_offset(index) as usize;
            let mut mark_x = self.album.x(index);
            let mut mark_y = self.album.y(index);

            // put the mark over the attached glyph
            mark_x += self.album.x(attachment_index);
            mark_y += self.album.y(attachment_index);

            // close the gap between the mark and its anchor owner
            match self.text_direction() {
                TextDirection::LeftToRight => {
                    for between in attachment_index..index {
                        mark_x -= self.album.advance(between);
                    }
                }
                TextDirection::RightToLeft => {
                    for between in attachment_index + 1..=index {
                        mark_x += self.album.advance(between);
                    }
                }
            }

            self.album.set_x(index, mark_x);
            self.album.set_y(index, mark_y);
        }
    }
}

/// Chase a device offset embedded in a value record.
fn device_at<'a>(
    parent: FontData<'a>,
    record: FontData<'a>,
    offset: usize,
) -> Option<DeviceOrVariationIndex<'a>> {
    let device_offset = record.read_at::<u16>(offset).ok()?;
    if device_offset == 0 {
        return None;
    }
    let data = parent.split_off(device_offset as usize)?;
    DeviceOrVariationIndex::read(data).ok()
}
