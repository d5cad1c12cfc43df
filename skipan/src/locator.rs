//! A filtered bidirectional cursor over an album.
//!
//! Lookups never see every glyph: the lookup flag, the active feature
//! unit's mask, and GDEF's mark classifications all remove glyphs from
//! consideration. The [`Locator`] centralizes that skipping discipline.
//!
//! The locator holds no reference to the album it walks; every movement
//! takes the album as a parameter and cross-checks a version snapshot so
//! that a stale cursor cannot silently index into a reshaped run.

use types::GlyphId16;

use crate::album::{anti_feature_mask, Album, GlyphMask, GlyphTraits};
use crate::tables::gdef::{Gdef, MarkGlyphSets};
use crate::tables::layout::{ClassDefTable, CoverageTable, LookupFlag};

/// The per-lookup skipping configuration.
#[derive(Clone, Default)]
pub(crate) struct LocatorFilter<'a> {
    pub mark_filtering_coverage: Option<CoverageTable<'a>>,
    /// Feature section (upper 16 bits) and trait section (lower 16 bits),
    /// laid out to match the album's glyph masks.
    pub ignore_mask: u32,
    pub lookup_flag: LookupFlag,
}

pub(crate) struct Locator<'a> {
    mark_attach_class_def: Option<ClassDefTable<'a>>,
    mark_glyph_sets_def: Option<MarkGlyphSets<'a>>,
    pub(crate) filter: LocatorFilter<'a>,
    version: u64,
    start: usize,
    count: usize,
    coming_index: usize,
}

impl<'a> Locator<'a> {
    pub(crate) fn new(gdef: Option<&Gdef<'a>>) -> Self {
        Locator {
            mark_attach_class_def: gdef.and_then(Gdef::mark_attach_class_def),
            mark_glyph_sets_def: gdef.and_then(Gdef::mark_glyph_sets_def),
            filter: LocatorFilter::default(),
            version: u64::MAX,
            start: 0,
            count: 0,
            coming_index: 0,
        }
    }

    pub(crate) fn range(&self) -> (usize, usize) {
        (self.start, self.count)
    }

    fn limit(&self) -> usize {
        self.start + self.count
    }

    fn check_version(&self, album: &Album) {
        assert_eq!(
            self.version,
            album.version(),
            "stale locator: the album has been modified since reset"
        );
    }

    /// Snapshot the album version and park the cursor just before `start`.
    pub(crate) fn reset(&mut self, album: &Album, start: usize, count: usize) {
        assert!(start <= album.glyph_count() && start <= start + count);

        self.version = album.version();
        self.start = start;
        self.count = count;
        self.coming_index = start;
    }

    /// Change the covered range without resetting the cursor.
    pub(crate) fn adjust_range(&mut self, album: &Album, start: usize, count: usize) {
        assert!(start <= album.glyph_count() && start <= start + count);

        self.start = start;
        self.count = count;
    }

    /// Insert glyph slots at the cursor's coming position, keeping this
    /// locator (and only this locator) valid.
    pub(crate) fn reserve_glyphs(&mut self, album: &mut Album, glyph_count: usize) {
        self.check_version(album);

        album.reserve_glyphs(self.coming_index, glyph_count);

        self.version = album.version();
        self.count += glyph_count;
    }

    pub(crate) fn set_feature_mask(&mut self, feature_mask: u16) {
        let anti = anti_feature_mask(feature_mask);
        self.filter.ignore_mask =
            (self.filter.ignore_mask & 0x0000_FFFF) | (u32::from(anti) << 16);
    }

    pub(crate) fn set_lookup_flag(&mut self, lookup_flag: LookupFlag) {
        let mut ignore_traits = GlyphTraits::PLACEHOLDER;

        if lookup_flag.ignore_base_glyphs() {
            ignore_traits |= GlyphTraits::BASE;
        }
        if lookup_flag.ignore_ligatures() {
            ignore_traits |= GlyphTraits::LIGATURE;
        }
        if lookup_flag.ignore_marks() {
            ignore_traits |= GlyphTraits::MARK;
        }

        self.filter.lookup_flag = lookup_flag;
        self.set_ignore_traits(ignore_traits);
    }

    fn set_ignore_traits(&mut self, traits: GlyphTraits) {
        self.filter.ignore_mask =
            (self.filter.ignore_mask & 0xFFFF_0000) | u32::from(traits.to_bits());
    }

    fn ignore_traits(&self) -> GlyphTraits {
        GlyphTraits::from_bits(self.filter.ignore_mask as u16)
    }

    pub(crate) fn set_mark_filtering_set(&mut self, mark_filtering_set: u16) {
        self.filter.mark_filtering_coverage = self
            .mark_glyph_sets_def
            .as_ref()
            .and_then(|sets| sets.coverage(mark_filtering_set));
    }

    pub(crate) fn update_filter(&mut self, filter: LocatorFilter<'a>) {
        self.filter = filter;
    }

    fn is_ignored(&self, album: &Album, index: usize) -> bool {
        let glyph_mask = album.glyph_mask(index);
        let lookup_flag = self.filter.lookup_flag;

        if self.filter.ignore_mask & glyph_mask != 0 {
            return true;
        }

        if GlyphMask::traits_of(glyph_mask).contains(GlyphTraits::MARK) {
            if lookup_flag.use_mark_filtering_set() {
                if let Some(coverage) = &self.filter.mark_filtering_coverage {
                    let glyph = album.glyph(index);
                    if coverage.get(glyph).is_none() {
                        return true;
                    }
                }
            }

            let attachment_class = lookup_flag.mark_attachment_class();
            if attachment_class != 0 {
                if let Some(class_def) = &self.mark_attach_class_def {
                    let glyph: GlyphId16 = album.glyph(index);
                    if class_def.get(glyph) != attachment_class {
                        return true;
                    }
                }
            }
        }

        false
    }

    /// Advance to the next glyph the filter admits.
    pub(crate) fn move_next(&mut self, album: &Album) -> Option<usize> {
        self.check_version(album);
        let limit = self.limit();
        debug_assert!(self.coming_index >= self.start && self.coming_index <= limit);

        while self.coming_index < limit {
            let index = self.coming_index;
            self.coming_index += 1;

            if !self.is_ignored(album, index) {
                return Some(index);
            }
        }

        None
    }

    /// Step back to the previous glyph the filter admits.
    pub(crate) fn move_previous(&mut self, album: &Album) -> Option<usize> {
        self.check_version(album);
        debug_assert!(self.coming_index >= self.start && self.coming_index <= self.limit());

        while self.coming_index > self.start {
            self.coming_index -= 1;
            let index = self.coming_index;

            if !self.is_ignored(album, index) {
                return Some(index);
            }
        }

        None
    }

    /// `count` successful forward moves; the index reached by the last one.
    pub(crate) fn skip(&mut self, album: &Album, count: usize) -> Option<usize> {
        debug_assert!(count > 0);

        let mut reached = None;
        for _ in 0..count {
            reached = Some(self.move_next(album)?);
        }
        reached
    }

    /// Park the cursor so the next `move_next` starts scanning at `index`.
    ///
    /// Jumping to the limit index is legal and makes the next move fail.
    pub(crate) fn jump_to(&mut self, album: &Album, index: usize) {
        assert!(index >= self.start && index <= self.limit());
        self.check_version(album);

        self.coming_index = index;
    }

    /// The next admitted glyph after `index`, without moving the cursor.
    ///
    /// `bounded` constrains the scan to the current range rather than the
    /// whole album.
    pub(crate) fn get_after(&self, album: &Album, index: usize, bounded: bool) -> Option<usize> {
        self.check_version(album);
        let limit = if bounded { self.limit() } else { album.glyph_count() };

        let mut index = index + 1;
        while index < limit {
            if !self.is_ignored(album, index) {
                return Some(index);
            }
            index += 1;
        }

        None
    }

    /// The previous admitted glyph before `index`, without moving the cursor.
    pub(crate) fn get_before(&self, album: &Album, index: usize, bounded: bool) -> Option<usize> {
        self.check_version(album);
        let start = if bounded { self.start } else { 0 };

        let mut index = index;
        while index > start {
            index -= 1;
            if !self.is_ignored(album, index) {
                return Some(index);
            }
        }

        None
    }

    fn with_ignore_traits<R>(
        &mut self,
        traits: GlyphTraits,
        body: impl FnOnce(&Self) -> R,
    ) -> R {
        let saved = self.ignore_traits();
        self.set_ignore_traits(traits);
        let result = body(self);
        self.set_ignore_traits(saved);
        result
    }

    /// The base a mark at `index` attaches to.
    ///
    /// Multiple-substitution sequence glyphs are skipped as well so that the
    /// mark aligns with the first corresponding glyph of its base.
    pub(crate) fn preceding_base_index(&mut self, album: &Album, index: usize) -> Option<usize> {
        self.with_ignore_traits(
            GlyphTraits::PLACEHOLDER | GlyphTraits::MARK | GlyphTraits::SEQUENCE,
            |locator| locator.get_before(album, index, false),
        )
    }

    /// The ligature a mark at `index` attaches to, plus the component the
    /// mark belongs to.
    ///
    /// Ligature components are not removed from the album; they become
    /// placeholders. Counting the placeholders between the ligature and the
    /// mark identifies the component.
    pub(crate) fn preceding_ligature_index(
        &mut self,
        album: &Album,
        index: usize,
    ) -> Option<(usize, usize)> {
        let lig_index = self.with_ignore_traits(
            GlyphTraits::PLACEHOLDER | GlyphTraits::MARK,
            |locator| locator.get_before(album, index, false),
        )?;

        let mut component = 0;
        for next_index in lig_index + 1..index {
            if album.traits(next_index).contains(GlyphTraits::PLACEHOLDER) {
                component += 1;
            }
        }

        Some((lig_index, component))
    }

    /// The mark a mark at `index` attaches to.
    ///
    /// Placeholders are admitted by the scan so that marks stay within the
    /// same ligature component, then rejected afterwards.
    pub(crate) fn preceding_mark_index(&mut self, album: &Album, index: usize) -> Option<usize> {
        let mark_index =
            self.with_ignore_traits(GlyphTraits::NONE, |locator| {
                locator.get_before(album, index, false)
            })?;

        if album.traits(mark_index).contains(GlyphTraits::PLACEHOLDER) {
            return None;
        }

        Some(mark_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::GlyphId16;

    fn album_with_traits(traits: &[GlyphTraits]) -> Album {
        let mut album = Album::new();
        album.reset(traits.len(), false);
        album.begin_filling();
        for (i, &t) in traits.iter().enumerate() {
            album.add_glyph(GlyphId16::new(i as u16), t, i);
        }
        album
    }

    #[test]
    fn move_next_skips_ignored_traits() {
        let album = album_with_traits(&[
            GlyphTraits::BASE,
            GlyphTraits::MARK,
            GlyphTraits::BASE,
        ]);
        let mut locator = Locator::new(None);
        locator.reset(&album, 0, album.glyph_count());
        locator.set_lookup_flag(LookupFlag::from_bits(0x0008)); // IgnoreMarks

        assert_eq!(locator.move_next(&album), Some(0));
        assert_eq!(locator.move_next(&album), Some(2));
        assert_eq!(locator.move_next(&album), None);
    }

    #[test]
    fn placeholders_always_skipped() {
        let album = album_with_traits(&[GlyphTraits::PLACEHOLDER, GlyphTraits::BASE]);
        let mut locator = Locator::new(None);
        locator.reset(&album, 0, album.glyph_count());
        locator.set_lookup_flag(LookupFlag::empty());

        assert_eq!(locator.move_next(&album), Some(1));
    }

    #[test]
    fn feature_mask_gates_application() {
        let mut album = album_with_traits(&[GlyphTraits::BASE, GlyphTraits::BASE]);
        album.set_feature_mask(0, 0x0001);
        album.set_feature_mask(1, 0x0002);

        let mut locator = Locator::new(None);
        locator.reset(&album, 0, album.glyph_count());
        locator.set_lookup_flag(LookupFlag::empty());
        locator.set_feature_mask(0x0001);

        assert_eq!(locator.move_next(&album), Some(0));
        assert_eq!(locator.move_next(&album), None);
    }

    #[test]
    fn zero_unit_mask_gates_nothing() {
        let mut album = album_with_traits(&[GlyphTraits::BASE, GlyphTraits::BASE]);
        album.set_feature_mask(0, 0x0004);

        let mut locator = Locator::new(None);
        locator.reset(&album, 0, album.glyph_count());
        locator.set_lookup_flag(LookupFlag::empty());
        locator.set_feature_mask(0);

        assert_eq!(locator.move_next(&album), Some(0));
        assert_eq!(locator.move_next(&album), Some(1));
    }

    #[test]
    fn default_glyph_mask_fails_specific_units() {
        // a freshly added glyph keeps the sentinel mask and is ignored by a
        // unit gated to a specific positional bit
        let album = album_with_traits(&[GlyphTraits::BASE]);
        let mut locator = Locator::new(None);
        locator.reset(&album, 0, album.glyph_count());
        locator.set_lookup_flag(LookupFlag::empty());
        locator.set_feature_mask(0x0001);

        assert_eq!(locator.move_next(&album), None);
    }

    #[test]
    #[should_panic(expected = "stale locator")]
    fn stale_locator_is_rejected() {
        let mut album = album_with_traits(&[GlyphTraits::BASE]);
        let mut locator = Locator::new(None);
        locator.reset(&album, 0, album.glyph_count());
        // mutate the album behind the locator's back
        album.add_glyph(GlyphId16::new(9), GlyphTraits::BASE, 0);
        let _ = locator.move_next(&album);
    }

    #[test]
    fn jump_to_restarts_scanning() {
        let album = album_with_traits(&[GlyphTraits::BASE, GlyphTraits::BASE, GlyphTraits::BASE]);
        let mut locator = Locator::new(None);
        locator.reset(&album, 0, album.glyph_count());
        locator.set_lookup_flag(LookupFlag::empty());

        locator.jump_to(&album, 2);
        assert_eq!(locator.move_next(&album), Some(2));

        locator.jump_to(&album, 3);
        assert_eq!(locator.move_next(&album), None);
    }

    #[test]
    fn preceding_base_skips_marks_and_sequences() {
        let album = album_with_traits(&[
            GlyphTraits::BASE,
            GlyphTraits::SEQUENCE,
            GlyphTraits::MARK,
            GlyphTraits::MARK,
        ]);
        let mut locator = Locator::new(None);
        locator.reset(&album, 0, album.glyph_count());
        locator.set_lookup_flag(LookupFlag::empty());

        assert_eq!(locator.preceding_base_index(&album, 3), Some(0));
    }

    #[test]
    fn preceding_ligature_counts_components() {
        let album = album_with_traits(&[
            GlyphTraits::LIGATURE,
            GlyphTraits::PLACEHOLDER,
            GlyphTraits::PLACEHOLDER,
            GlyphTraits::MARK,
        ]);
        let mut locator = Locator::new(None);
        locator.reset(&album, 0, album.glyph_count());
        locator.set_lookup_flag(LookupFlag::empty());

        assert_eq!(locator.preceding_ligature_index(&album, 3), Some((0, 2)));
    }

    #[test]
    fn preceding_mark_rejects_placeholder() {
        let album = album_with_traits(&[GlyphTraits::MARK, GlyphTraits::PLACEHOLDER, GlyphTraits::MARK]);
        let mut locator = Locator::new(None);
        locator.reset(&album, 0, album.glyph_count());
        locator.set_lookup_flag(LookupFlag::empty());

        assert_eq!(locator.preceding_mark_index(&album, 2), None);
        assert_eq!(locator.preceding_mark_index(&album, 1), Some(0));
    }
}
