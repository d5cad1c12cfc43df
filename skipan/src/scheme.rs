//! Resolving a shaping request into a pattern.
//!
//! A [`Scheme`] gathers the font, script, language, and any user feature
//! overrides, then walks the font's GSUB and GPOS tables to find which of
//! the script's expected features the font actually implements, emitting a
//! [`Pattern`] that sequences their lookups.

use std::sync::Arc;

use types::{F2Dot14, Tag};

use crate::font::Font;
use crate::font_data::FontData;
use crate::knowledge::{self, FeatureInfo, FeatureNature};
use crate::pattern::{FeatureKind, Pattern, PatternBuilder};
use crate::read::FontRead;
use crate::tables::layout::{Feature, FeatureList, LangSys, LayoutHeader};

/// A builder for [`Pattern`]s.
pub struct Scheme {
    font: Option<Arc<Font>>,
    script_tag: Option<Tag>,
    language_tag: Tag,
    feature_values: Vec<(Tag, u16)>,
}

impl Default for Scheme {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheme {
    pub fn new() -> Self {
        Scheme {
            font: None,
            script_tag: None,
            language_tag: crate::tables::layout::DFLT_LANG_SYS,
            feature_values: Vec::new(),
        }
    }

    pub fn set_font(&mut self, font: Arc<Font>) -> &mut Self {
        self.font = Some(font);
        self
    }

    pub fn set_script_tag(&mut self, script_tag: Tag) -> &mut Self {
        self.script_tag = Some(script_tag);
        self
    }

    pub fn set_language_tag(&mut self, language_tag: Tag) -> &mut Self {
        self.language_tag = language_tag;
        self
    }

    /// Per-feature overrides: a zero value disables a default-on feature, a
    /// non-zero value enables (and parameterizes) any other feature.
    pub fn set_feature_values(&mut self, feature_values: &[(Tag, u16)]) -> &mut Self {
        self.feature_values = feature_values.to_vec();
        self
    }

    /// Resolve the request into a pattern.
    ///
    /// Returns `None` when the script has no shaping knowledge or the font
    /// carries neither a GSUB nor a GPOS table.
    pub fn build_pattern(&self) -> Option<Arc<Pattern>> {
        let font = self.font.clone()?;
        let script_tag = self.script_tag?;
        let script_knowledge = knowledge::seek_script(script_tag)?;

        let gsub = font.gsub_data();
        let gpos = font.gpos_data();
        if gsub.is_none() && gpos.is_none() {
            return None;
        }

        let mut builder = PatternBuilder::new();
        builder.set_script(script_tag, script_knowledge.default_direction);
        builder.set_language(self.language_tag);

        if let Some(gsub) = gsub {
            builder.begin_features(FeatureKind::Substitution);
            self.add_header_features(
                &mut builder,
                gsub,
                &font,
                script_knowledge.subst_features,
            );
            builder.end_features();
        }

        if let Some(gpos) = gpos {
            builder.begin_features(FeatureKind::Positioning);
            self.add_header_features(&mut builder, gpos, &font, script_knowledge.pos_features);
            builder.end_features();
        }

        builder.set_font(font);
        let pattern = builder.build();
        log::debug!(
            "built pattern for script '{}': {} gsub + {} gpos units",
            script_tag,
            pattern.gsub_units().len(),
            pattern.gpos_units().len(),
        );
        Some(Arc::new(pattern))
    }

    fn add_header_features(
        &self,
        builder: &mut PatternBuilder,
        header: FontData,
        font: &Font,
        feature_infos: &[FeatureInfo],
    ) {
        let Ok(header) = LayoutHeader::read(header) else {
            return;
        };
        let Some(lang_sys) = header
            .script_list()
            .ok()
            .and_then(|scripts| scripts.find_script(builder.script_tag()))
            .and_then(|script| script.find_lang_sys(builder.language_tag()))
        else {
            return;
        };
        let Ok(feature_list) = header.feature_list() else {
            return;
        };

        let finder = FeatureFinder {
            lang_sys,
            feature_list,
            header: &header,
            coords: font.variation_coordinates(),
        };

        self.add_known_features(builder, &finder, feature_infos);
        self.add_override_features(builder, &finder, feature_infos);
    }

    /// Walk the script's feature catalog in order, emitting one unit per
    /// feature, except that a run of simultaneous features sharing a group
    /// is emitted as a single unit.
    fn add_known_features(
        &self,
        builder: &mut PatternBuilder,
        finder: &FeatureFinder,
        feature_infos: &[FeatureInfo],
    ) {
        let mut index = 0;
        while index < feature_infos.len() {
            let info = &feature_infos[index];

            if info.simultaneous {
                let group_len = feature_infos[index..]
                    .iter()
                    .take_while(|other| other.simultaneous && other.group == info.group)
                    .count();
                let mut added = false;
                for info in &feature_infos[index..index + group_len] {
                    added |= self.add_feature(builder, finder, info);
                }
                if added {
                    builder.make_feature_unit();
                }
                index += group_len;
            } else {
                if self.add_feature(builder, finder, info) {
                    builder.make_feature_unit();
                }
                index += 1;
            }
        }
    }

    /// Add one feature with its lookups, honoring user overrides.
    fn add_feature(
        &self,
        builder: &mut PatternBuilder,
        finder: &FeatureFinder,
        info: &FeatureInfo,
    ) -> bool {
        let override_value = self.override_value(info.tag);

        let value = match info.nature {
            // required features always apply; an override may only change
            // the value
            FeatureNature::Required => override_value.filter(|&value| value != 0).unwrap_or(1),
            FeatureNature::On => match override_value {
                Some(0) => return false,
                Some(value) => value,
                None => 1,
            },
            FeatureNature::Off => match override_value {
                Some(0) | None => return false,
                Some(value) => value,
            },
        };

        let Some(feature) = finder.find(info.tag) else {
            return false;
        };

        builder.add_feature(info.tag, value, info.mask);
        add_feature_lookups(builder, &feature);
        true
    }

    /// Features the user enabled that the script knowledge does not name;
    /// each becomes its own trailing unit when the font has it.
    fn add_override_features(
        &self,
        builder: &mut PatternBuilder,
        finder: &FeatureFinder,
        feature_infos: &[FeatureInfo],
    ) {
        for &(tag, value) in &self.feature_values {
            if value == 0
                || feature_infos.iter().any(|info| info.tag == tag)
                || builder.contains_feature(tag)
            {
                continue;
            }
            let Some(feature) = finder.find(tag) else {
                continue;
            };

            builder.add_feature(tag, value, 0);
            add_feature_lookups(builder, &feature);
            builder.make_feature_unit();
        }
    }

    fn override_value(&self, tag: Tag) -> Option<u16> {
        self.feature_values
            .iter()
            .find(|(override_tag, _)| *override_tag == tag)
            .map(|&(_, value)| value)
    }
}

fn add_feature_lookups(builder: &mut PatternBuilder, feature: &Feature) {
    let count = feature.lookup_index_count().unwrap_or(0);
    for index in 0..count as usize {
        if let Ok(lookup_index) = feature.lookup_list_index(index) {
            builder.add_lookup(lookup_index);
        }
    }
}

/// Locates a feature's table within one layout header's LangSys, applying
/// any matching feature-variations substitution first.
struct FeatureFinder<'a, 'b> {
    lang_sys: LangSys<'a>,
    feature_list: FeatureList<'a>,
    header: &'b LayoutHeader<'a>,
    coords: &'b [F2Dot14],
}

impl<'a> FeatureFinder<'a, '_> {
    fn find(&self, feature_tag: Tag) -> Option<Feature<'a>> {
        let count = self.lang_sys.feature_index_count().ok()?;
        for array_index in 0..count as usize {
            let feature_index = self.lang_sys.feature_index(array_index).ok()?;
            let tag = self.feature_list.feature_tag(feature_index as usize).ok()?;
            if tag != feature_tag {
                continue;
            }

            // a variable font may substitute the feature table under the
            // current design coordinates
            if !self.coords.is_empty() {
                if let Some(alternate) = self
                    .header
                    .feature_variations()
                    .and_then(|variations| variations.matching_substitution(self.coords))
                    .and_then(|substitution| substitution.alternate_feature(feature_index))
                {
                    return Some(alternate);
                }
            }

            return self.feature_list.feature(feature_index as usize).ok();
        }
        None
    }
}
