//! Device tables, variation index tables, and the item variation store
//!
//! A positioning value may carry either a classic ppem-keyed [`Device`]
//! table or a [`VariationIndex`] into the font's [`ItemVariationStore`];
//! the two are distinguished by the delta-format field, with `0x8000`
//! reserved for variation indices.

use types::F2Dot14;

use crate::font_data::FontData;
use crate::read::{FontRead, ReadError};

/// DeltaFormat value marking a VariationIndex table.
pub const VARIATION_INDEX_FORMAT: u16 = 0x8000;

/// Either a classic device table or a variation index.
pub enum DeviceOrVariationIndex<'a> {
    Device(Device<'a>),
    VariationIndex(VariationIndex<'a>),
}

impl<'a> FontRead<'a> for DeviceOrVariationIndex<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        match data.read_at::<u16>(4)? {
            1..=3 => Ok(Self::Device(Device { data })),
            VARIATION_INDEX_FORMAT => Ok(Self::VariationIndex(VariationIndex { data })),
            other => Err(ReadError::InvalidFormat(other.into())),
        }
    }
}

impl DeviceOrVariationIndex<'_> {
    /// The delta in pixels relevant at the given ppem size and design
    /// coordinates. Classic device tables consult only the ppem size;
    /// variation indices only the variation store and coordinates.
    pub fn delta_pixels(
        &self,
        ppem: u16,
        var_store: Option<&ItemVariationStore>,
        coords: &[F2Dot14],
    ) -> i32 {
        match self {
            Self::Device(device) => device.delta(ppem),
            Self::VariationIndex(index) => {
                let Some(store) = var_store else { return 0 };
                let (Ok(outer), Ok(inner)) = (index.outer_index(), index.inner_index()) else {
                    return 0;
                };
                let delta = store.compute_delta(outer, inner, coords);
                // round away from zero
                if delta >= 0.0 {
                    (delta + 0.5) as i32
                } else {
                    (delta - 0.5) as i32
                }
            }
        }
    }
}

/// A classic [Device](https://learn.microsoft.com/en-us/typography/opentype/spec/chapter2#device-and-variationindex-tables) table with packed per-ppem deltas.
pub struct Device<'a> {
    data: FontData<'a>,
}

impl<'a> Device<'a> {
    pub fn start_size(&self) -> Result<u16, ReadError> {
        self.data.read_at(0)
    }

    pub fn end_size(&self) -> Result<u16, ReadError> {
        self.data.read_at(2)
    }

    pub fn delta_format(&self) -> Result<u16, ReadError> {
        self.data.read_at(4)
    }

    /// The signed delta for the given ppem size, or 0 when the size falls
    /// outside the covered range.
    pub fn delta(&self, ppem: u16) -> i32 {
        let (Ok(start), Ok(end), Ok(format)) =
            (self.start_size(), self.end_size(), self.delta_format())
        else {
            return 0;
        };
        if ppem < start || ppem > end {
            return 0;
        }
        let size_index = (ppem - start) as usize;
        // 2, 4, or 8 bit signed values packed most-significant first
        let bits = match format {
            1 => 2,
            2 => 4,
            3 => 8,
            _ => return 0,
        };
        let per_word = 16 / bits;
        let word_index = size_index / per_word;
        let Ok(word) = self.data.read_at::<u16>(6 + word_index * 2) else {
            return 0;
        };
        // sign extend by shifting the packed value to the top of an i32
        let left_shift = 16 + bits * (size_index % per_word);
        ((word as i32) << left_shift) >> (32 - bits)
    }
}

/// A [VariationIndex](https://learn.microsoft.com/en-us/typography/opentype/spec/chapter2#device-and-variationindex-tables) table.
pub struct VariationIndex<'a> {
    data: FontData<'a>,
}

impl<'a> VariationIndex<'a> {
    pub fn outer_index(&self) -> Result<u16, ReadError> {
        self.data.read_at(0)
    }

    pub fn inner_index(&self) -> Result<u16, ReadError> {
        self.data.read_at(2)
    }
}

/// The [ItemVariationStore](https://learn.microsoft.com/en-us/typography/opentype/spec/otvarcommonformats#item-variation-store) table.
pub struct ItemVariationStore<'a> {
    data: FontData<'a>,
}

impl<'a> FontRead<'a> for ItemVariationStore<'a> {
    fn read(data: FontData<'a>) -> Result<Self, ReadError> {
        match data.read_at::<u16>(0)? {
            1 => Ok(ItemVariationStore { data }),
            other => Err(ReadError::InvalidFormat(other.into())),
        }
    }
}

impl<'a> ItemVariationStore<'a> {
    fn region_list(&self) -> Result<VariationRegionList<'a>, ReadError> {
        let offset = self.data.read_at::<u32>(2)? as usize;
        self.data
            .split_off(offset)
            .map(|data| VariationRegionList { data })
            .ok_or(ReadError::OutOfBounds)
    }

    fn item_variation_data(&self, outer: u16) -> Option<ItemVariationData<'a>> {
        let count = self.data.read_at::<u16>(6).ok()?;
        if outer >= count {
            return None;
        }
        let offset = self.data.read_at::<u32>(8 + outer as usize * 4).ok()? as usize;
        self.data.split_off(offset).map(|data| ItemVariationData { data })
    }

    /// The interpolated delta for the given outer/inner index pair at the
    /// given normalized coordinates, as an unrounded value.
    pub fn compute_delta(&self, outer: u16, inner: u16, coords: &[F2Dot14]) -> f64 {
        let Some(data) = self.item_variation_data(outer) else {
            return 0.0;
        };
        let Ok(regions) = self.region_list() else {
            return 0.0;
        };
        data.accumulate_deltas(inner, &regions, coords)
    }
}

/// The [VariationRegionList](https://learn.microsoft.com/en-us/typography/opentype/spec/otvarcommonformats#variation-regions) table.
struct VariationRegionList<'a> {
    data: FontData<'a>,
}

impl VariationRegionList<'_> {
    fn axis_count(&self) -> u16 {
        self.data.read_at(0).unwrap_or(0)
    }

    fn region_count(&self) -> u16 {
        self.data.read_at(2).unwrap_or(0)
    }

    /// The interpolation scalar for one region at the given coordinates.
    ///
    /// See the [algorithm for interpolation of instance values](https://learn.microsoft.com/en-us/typography/opentype/spec/otvaroverview#algorithm-for-interpolation-of-instance-values).
    fn region_scalar(&self, region_index: u16, coords: &[F2Dot14]) -> f64 {
        let axis_count = self.axis_count();
        if region_index >= self.region_count() {
            return 1.0;
        }
        let region_pos = 4 + region_index as usize * axis_count as usize * 6;
        let mut scalar = 1.0f64;
        for axis in 0..axis_count as usize {
            let axis_pos = region_pos + axis * 6;
            let (Ok(start), Ok(peak), Ok(end)) = (
                self.data.read_at::<F2Dot14>(axis_pos),
                self.data.read_at::<F2Dot14>(axis_pos + 2),
                self.data.read_at::<F2Dot14>(axis_pos + 4),
            ) else {
                return 0.0;
            };
            let (start, peak, end) = (start.to_bits(), peak.to_bits(), end.to_bits());
            let coord = coords.get(axis).map(|c| c.to_bits()).unwrap_or(0);

            let axis_scalar = if start > peak || peak > end {
                1.0
            } else if start < 0 && end > 0 && peak != 0 {
                1.0
            } else if peak == 0 {
                1.0
            } else if coord < start || coord > end {
                0.0
            } else if coord == peak {
                1.0
            } else if coord < peak {
                f64::from(coord - start) / f64::from(peak - start)
            } else {
                f64::from(end - coord) / f64::from(end - peak)
            };

            scalar *= axis_scalar;
        }
        scalar
    }
}

/// An [ItemVariationData](https://learn.microsoft.com/en-us/typography/opentype/spec/otvarcommonformats#item-variation-data) subtable.
struct ItemVariationData<'a> {
    data: FontData<'a>,
}

impl ItemVariationData<'_> {
    fn accumulate_deltas(
        &self,
        inner: u16,
        regions: &VariationRegionList,
        coords: &[F2Dot14],
    ) -> f64 {
        let (Ok(item_count), Ok(word_count), Ok(region_count)) = (
            self.data.read_at::<u16>(0),
            self.data.read_at::<u16>(2),
            self.data.read_at::<u16>(4),
        ) else {
            return 0.0;
        };
        if inner >= item_count {
            return 0.0;
        }
        let short_count = (word_count & 0x7FFF) as usize;
        let region_count = region_count as usize;
        let rows_pos = 6 + region_count * 2;
        let row_size = short_count * 2 + region_count.saturating_sub(short_count);
        let row_pos = rows_pos + inner as usize * row_size;

        let mut adjustment = 0.0f64;
        for value in 0..region_count {
            let Ok(region_index) = self.data.read_at::<u16>(6 + value * 2) else {
                return adjustment;
            };
            let delta = if value < short_count {
                self.data.read_at::<i16>(row_pos + value * 2).map(i32::from)
            } else {
                self.data
                    .read_at::<i8>(row_pos + short_count * 2 + (value - short_count))
                    .map(i32::from)
            };
            let Ok(delta) = delta else {
                return adjustment;
            };
            adjustment += regions.region_scalar(region_index, coords) * f64::from(delta);
        }
        adjustment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::test_helpers::BeBuffer;

    fn device(start: u16, end: u16, format: u16, words: &[u16]) -> BeBuffer {
        BeBuffer::new()
            .push(start)
            .push(end)
            .push(format)
            .extend(words.iter().copied())
    }

    #[test]
    fn device_format1_packs_eight_per_word() {
        // deltas for sizes 12..=19: +1 at 12, -2 at 13, rest zero
        // 2-bit values: 01 10 00 00 00 00 00 00 -> 0x6000
        let buf = device(12, 19, 1, &[0x6000]);
        let device = Device { data: buf.font_data() };
        assert_eq!(device.delta(12), 1);
        assert_eq!(device.delta(13), -2);
        assert_eq!(device.delta(14), 0);
        assert_eq!(device.delta(11), 0);
        assert_eq!(device.delta(20), 0);
    }

    #[test]
    fn device_format2_packs_four_per_word() {
        // 4-bit values: 0111 1000 0000 0000 -> +7 at 10, -8 at 11
        let buf = device(10, 13, 2, &[0x7800]);
        let device = Device { data: buf.font_data() };
        assert_eq!(device.delta(10), 7);
        assert_eq!(device.delta(11), -8);
        assert_eq!(device.delta(12), 0);
    }

    #[test]
    fn device_format3_packs_two_per_word() {
        // 8-bit values: 0x05 0xFB -> +5 at 9, -5 at 10
        let buf = device(9, 10, 3, &[0x05FB]);
        let device = Device { data: buf.font_data() };
        assert_eq!(device.delta(9), 5);
        assert_eq!(device.delta(10), -5);
    }

    #[test]
    fn variation_delta_is_interpolated_and_rounded() {
        // one region over one axis peaking at 0.5, one delta set row with a
        // single short delta of 100
        let region_list = BeBuffer::new()
            .push(1u16) // axis count
            .push(1u16) // region count
            .extend([0i16, 0x2000, 0x4000]); // start 0, peak 0.5, end 1.0
        let var_data = BeBuffer::new()
            .push(1u16) // item count
            .push(1u16) // word delta count
            .push(1u16) // region index count
            .push(0u16) // region index 0
            .push(100i16);
        let mut store = BeBuffer::new()
            .push(1u16) // format
            .push(12u32) // region list offset
            .push(1u16) // item variation data count
            .push(12 + region_list.len() as u32);
        store = store.extend_bytes(region_list.as_slice());
        store = store.extend_bytes(var_data.as_slice());

        let store = ItemVariationStore::read(store.font_data()).unwrap();
        // at peak: full delta
        assert_eq!(
            store.compute_delta(0, 0, &[F2Dot14::from_bits(0x2000)]),
            100.0
        );
        // halfway to peak: half delta
        assert_eq!(
            store.compute_delta(0, 0, &[F2Dot14::from_bits(0x1000)]),
            50.0
        );
        // outside the region
        assert_eq!(
            store.compute_delta(0, 0, &[F2Dot14::from_bits(-0x2000)]),
            0.0
        );
    }
}
