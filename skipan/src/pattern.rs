//! The compiled shaping plan.
//!
//! A [`Pattern`] is what a [`Scheme`](crate::Scheme) resolves a font,
//! script, and language into: an ordered list of feature units whose
//! lookups the text processor applies in turn. Patterns are immutable and
//! meant to be built once and shared across shaping calls.

use std::sync::Arc;

use types::Tag;

use crate::font::Font;
use crate::TextDirection;

/// A lookup reference carried by a feature unit: the lookup-list index and
/// the value of the feature that referenced it (consumed by alternate
/// substitution).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LookupInfo {
    pub index: u16,
    pub value: u16,
}

/// A bundle of features whose lookups are applied simultaneously under a
/// shared locator mask.
#[derive(Clone, Debug)]
pub struct FeatureUnit {
    /// Unique lookup indexes of all features belonging to the unit, in
    /// ascending order.
    pub lookups: Vec<LookupInfo>,
    /// The unit's features, as a range into the pattern's feature tags.
    pub range: std::ops::Range<usize>,
    pub mask: u16,
}

/// An immutable shaping plan for one font + script + language.
pub struct Pattern {
    pub(crate) font: Arc<Font>,
    pub(crate) feature_tags: Vec<Tag>,
    pub(crate) feature_units: Vec<FeatureUnit>,
    pub(crate) gsub_unit_count: usize,
    pub(crate) gpos_unit_count: usize,
    pub(crate) script_tag: Tag,
    pub(crate) language_tag: Tag,
    pub(crate) default_direction: TextDirection,
}

impl Pattern {
    pub fn font(&self) -> &Arc<Font> {
        &self.font
    }

    pub fn script_tag(&self) -> Tag {
        self.script_tag
    }

    pub fn language_tag(&self) -> Tag {
        self.language_tag
    }

    pub fn default_direction(&self) -> TextDirection {
        self.default_direction
    }

    pub fn feature_tags(&self) -> &[Tag] {
        &self.feature_tags
    }

    /// The substitution units, in application order.
    pub fn gsub_units(&self) -> &[FeatureUnit] {
        &self.feature_units[..self.gsub_unit_count]
    }

    /// The positioning units, in application order.
    pub fn gpos_units(&self) -> &[FeatureUnit] {
        &self.feature_units[self.gsub_unit_count..]
    }
}

impl std::fmt::Debug for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Pattern")
            .field("script_tag", &self.script_tag)
            .field("language_tag", &self.language_tag)
            .field("feature_tags", &self.feature_tags)
            .field("gsub_unit_count", &self.gsub_unit_count)
            .field("gpos_unit_count", &self.gpos_unit_count)
            .finish()
    }
}

/// Which table a run of features belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FeatureKind {
    Substitution,
    Positioning,
}

/// Accumulates features and lookups into a [`Pattern`].
///
/// Features are added in two passes (substitution, then positioning); each
/// call to [`make_feature_unit`](Self::make_feature_unit) seals the
/// features added since the previous unit.
pub(crate) struct PatternBuilder {
    font: Option<Arc<Font>>,
    feature_tags: Vec<Tag>,
    feature_units: Vec<FeatureUnit>,
    lookup_infos: Vec<LookupInfo>,
    gsub_unit_count: usize,
    gpos_unit_count: usize,
    feature_index: usize,
    script_tag: Tag,
    language_tag: Tag,
    default_direction: TextDirection,
    feature_value: u16,
    feature_mask: u16,
    feature_kind: Option<FeatureKind>,
}

impl PatternBuilder {
    pub(crate) fn new() -> Self {
        PatternBuilder {
            font: None,
            feature_tags: Vec::with_capacity(24),
            feature_units: Vec::with_capacity(24),
            lookup_infos: Vec::with_capacity(32),
            gsub_unit_count: 0,
            gpos_unit_count: 0,
            feature_index: 0,
            script_tag: Tag::new(b"DFLT"),
            language_tag: crate::tables::layout::DFLT_LANG_SYS,
            default_direction: TextDirection::LeftToRight,
            feature_value: 0,
            feature_mask: 0,
            feature_kind: None,
        }
    }

    pub(crate) fn set_font(&mut self, font: Arc<Font>) {
        self.font = Some(font);
    }

    pub(crate) fn set_script(&mut self, script_tag: Tag, default_direction: TextDirection) {
        self.script_tag = script_tag;
        self.default_direction = default_direction;
    }

    pub(crate) fn set_language(&mut self, language_tag: Tag) {
        self.language_tag = language_tag;
    }

    pub(crate) fn script_tag(&self) -> Tag {
        self.script_tag
    }

    pub(crate) fn language_tag(&self) -> Tag {
        self.language_tag
    }

    pub(crate) fn contains_feature(&self, feature_tag: Tag) -> bool {
        self.feature_tags.contains(&feature_tag)
    }

    pub(crate) fn begin_features(&mut self, kind: FeatureKind) {
        assert!(
            self.feature_kind.is_none(),
            "one kind of features must be ended before beginning new ones"
        );
        self.feature_kind = Some(kind);
    }

    /// Add a feature to the pending unit.
    pub(crate) fn add_feature(&mut self, feature_tag: Tag, value: u16, mask: u16) {
        assert!(
            self.feature_kind.is_some(),
            "the kind of features must be specified before adding them"
        );
        assert!(
            !self.contains_feature(feature_tag),
            "only unique features can be added"
        );
        assert_ne!(value, 0, "feature value must be non-zero");

        self.feature_tags.push(feature_tag);
        self.feature_value = value;
        self.feature_mask |= mask;
    }

    /// Add a lookup of the current feature; duplicate indexes keep a single
    /// entry whose value is the latest feature's.
    pub(crate) fn add_lookup(&mut self, lookup_index: u16) {
        assert!(
            self.feature_tags.len() > self.feature_index,
            "a feature must be available before adding lookups"
        );

        if let Some(info) = self
            .lookup_infos
            .iter_mut()
            .find(|info| info.index == lookup_index)
        {
            info.value = self.feature_value;
        } else {
            self.lookup_infos.push(LookupInfo {
                index: lookup_index,
                value: self.feature_value,
            });
        }
    }

    /// Seal the pending features and lookups into one unit.
    pub(crate) fn make_feature_unit(&mut self) {
        assert!(
            self.feature_tags.len() > self.feature_index,
            "at least one feature must be available before making a feature unit"
        );

        let mut lookups = std::mem::take(&mut self.lookup_infos);
        lookups.sort_by_key(|info| info.index);

        let unit = FeatureUnit {
            lookups,
            range: self.feature_index..self.feature_tags.len(),
            mask: self.feature_mask,
        };
        self.feature_index = unit.range.end;
        self.feature_units.push(unit);

        match self.feature_kind {
            Some(FeatureKind::Substitution) => self.gsub_unit_count += 1,
            Some(FeatureKind::Positioning) => self.gpos_unit_count += 1,
            None => unreachable!("make_feature_unit called outside a feature pass"),
        }

        self.feature_mask = 0;
    }

    pub(crate) fn end_features(&mut self) {
        assert!(
            self.feature_kind.is_some(),
            "features of the specified kind must be begun before ending them"
        );
        assert_eq!(
            self.feature_tags.len(),
            self.feature_index,
            "there should be no pending feature unit"
        );
        self.feature_kind = None;
    }

    pub(crate) fn build(self) -> Pattern {
        assert!(self.feature_kind.is_none(), "all features must be ended");

        Pattern {
            font: self.font.expect("a font must be set before building"),
            feature_tags: self.feature_tags,
            feature_units: self.feature_units,
            gsub_unit_count: self.gsub_unit_count,
            gpos_unit_count: self.gpos_unit_count,
            script_tag: self.script_tag,
            language_tag: self.language_tag,
            default_direction: self.default_direction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::{Font, FontSource};
    use types::GlyphId16;

    struct NoTables;

    impl FontSource for NoTables {
        fn load_table(&self, _tag: Tag) -> Option<Vec<u8>> {
            None
        }
        fn glyph_for_codepoint(&self, _codepoint: char) -> GlyphId16 {
            GlyphId16::new(0)
        }
    }

    fn builder_with_font() -> PatternBuilder {
        let mut builder = PatternBuilder::new();
        builder.set_font(Arc::new(Font::new(NoTables)));
        builder
    }

    #[test]
    fn lookups_sort_ascending_regardless_of_insertion() {
        let mut builder = builder_with_font();
        builder.begin_features(FeatureKind::Substitution);
        builder.add_feature(Tag::new(b"liga"), 1, 0);
        builder.add_lookup(9);
        builder.add_lookup(2);
        builder.add_lookup(5);
        builder.make_feature_unit();
        builder.end_features();

        let pattern = builder.build();
        let indexes: Vec<_> = pattern.gsub_units()[0]
            .lookups
            .iter()
            .map(|info| info.index)
            .collect();
        assert_eq!(indexes, vec![2, 5, 9]);
    }

    #[test]
    fn duplicate_lookup_takes_latest_value() {
        let mut builder = builder_with_font();
        builder.begin_features(FeatureKind::Substitution);
        builder.add_feature(Tag::new(b"salt"), 1, 0);
        builder.add_lookup(4);
        builder.add_feature(Tag::new(b"ss01"), 3, 0);
        builder.add_lookup(4);
        builder.make_feature_unit();
        builder.end_features();

        let pattern = builder.build();
        let unit = &pattern.gsub_units()[0];
        assert_eq!(unit.lookups, vec![LookupInfo { index: 4, value: 3 }]);
        assert_eq!(unit.range, 0..2);
    }

    #[test]
    fn units_partition_into_gsub_then_gpos() {
        let mut builder = builder_with_font();
        builder.begin_features(FeatureKind::Substitution);
        builder.add_feature(Tag::new(b"ccmp"), 1, 0);
        builder.make_feature_unit();
        builder.end_features();
        builder.begin_features(FeatureKind::Positioning);
        builder.add_feature(Tag::new(b"kern"), 1, 0);
        builder.make_feature_unit();
        builder.add_feature(Tag::new(b"mark"), 1, 0);
        builder.make_feature_unit();
        builder.end_features();

        let pattern = builder.build();
        assert_eq!(pattern.gsub_units().len(), 1);
        assert_eq!(pattern.gpos_units().len(), 2);
        assert_eq!(pattern.feature_tags().len(), 3);
    }

    #[test]
    fn unit_mask_is_or_of_feature_masks() {
        let mut builder = builder_with_font();
        builder.begin_features(FeatureKind::Substitution);
        builder.add_feature(Tag::new(b"isol"), 1, 0x1);
        builder.add_feature(Tag::new(b"fina"), 1, 0x8);
        builder.make_feature_unit();
        builder.end_features();

        let pattern = builder.build();
        assert_eq!(pattern.gsub_units()[0].mask, 0x9);
    }

    #[test]
    #[should_panic(expected = "only unique features")]
    fn duplicate_feature_rejected() {
        let mut builder = builder_with_font();
        builder.begin_features(FeatureKind::Substitution);
        builder.add_feature(Tag::new(b"liga"), 1, 0);
        builder.add_feature(Tag::new(b"liga"), 1, 0);
    }
}
