//! Arabic script knowledge and the joining-state pass.
//!
//! Beyond the feature catalog, Arabic needs every glyph stamped with the
//! positional form its joining context selects, so that the `isol`, `init`,
//! `medi`, and `fina` lookups each apply only to the glyphs in that form.

use types::Tag;
use unicode_general_category::{get_general_category, GeneralCategory};
use unicode_joining_type::{get_joining_type, JoiningType};

use super::{FeatureInfo, FeatureNature, ScriptKnowledge};
use crate::album::Album;
use crate::codepoints::CodepointSequence;
use crate::TextDirection;

/// Feature mask bits for the Arabic positional forms.
pub(crate) mod feature_mask {
    pub const ISOLATED: u16 = 1 << 0;
    pub const INITIAL: u16 = 1 << 1;
    pub const MEDIAL: u16 = 1 << 2;
    pub const FINAL: u16 = 1 << 3;
}

const SUBST_FEATURES: &[FeatureInfo] = &[
    // language based forms
    FeatureInfo {
        group: 1,
        simultaneous: false,
        tag: Tag::new(b"ccmp"),
        nature: FeatureNature::Required,
        mask: 0,
    },
    FeatureInfo {
        group: 2,
        simultaneous: false,
        tag: Tag::new(b"isol"),
        nature: FeatureNature::Required,
        mask: feature_mask::ISOLATED,
    },
    FeatureInfo {
        group: 2,
        simultaneous: false,
        tag: Tag::new(b"fina"),
        nature: FeatureNature::Required,
        mask: feature_mask::FINAL,
    },
    FeatureInfo {
        group: 2,
        simultaneous: false,
        tag: Tag::new(b"medi"),
        nature: FeatureNature::Required,
        mask: feature_mask::MEDIAL,
    },
    FeatureInfo {
        group: 2,
        simultaneous: false,
        tag: Tag::new(b"init"),
        nature: FeatureNature::Required,
        mask: feature_mask::INITIAL,
    },
    FeatureInfo {
        group: 3,
        simultaneous: true,
        tag: Tag::new(b"rlig"),
        nature: FeatureNature::Required,
        mask: 0,
    },
    FeatureInfo {
        group: 3,
        simultaneous: true,
        tag: Tag::new(b"calt"),
        nature: FeatureNature::Required,
        mask: 0,
    },
    // typographical forms
    FeatureInfo {
        group: 4,
        simultaneous: false,
        tag: Tag::new(b"liga"),
        nature: FeatureNature::On,
        mask: 0,
    },
    FeatureInfo {
        group: 4,
        simultaneous: false,
        tag: Tag::new(b"dlig"),
        nature: FeatureNature::Off,
        mask: 0,
    },
    FeatureInfo {
        group: 4,
        simultaneous: false,
        tag: Tag::new(b"cswh"),
        nature: FeatureNature::Off,
        mask: 0,
    },
    FeatureInfo {
        group: 4,
        simultaneous: false,
        tag: Tag::new(b"mset"),
        nature: FeatureNature::Required,
        mask: 0,
    },
];

const POS_FEATURES: &[FeatureInfo] = &[
    FeatureInfo {
        group: 5,
        simultaneous: false,
        tag: Tag::new(b"curs"),
        nature: FeatureNature::Required,
        mask: 0,
    },
    FeatureInfo {
        group: 5,
        simultaneous: false,
        tag: Tag::new(b"kern"),
        nature: FeatureNature::Required,
        mask: 0,
    },
    FeatureInfo {
        group: 5,
        simultaneous: false,
        tag: Tag::new(b"mark"),
        nature: FeatureNature::Required,
        mask: 0,
    },
    FeatureInfo {
        group: 5,
        simultaneous: false,
        tag: Tag::new(b"mkmk"),
        nature: FeatureNature::Required,
        mask: 0,
    },
];

static ARABIC_KNOWLEDGE: ScriptKnowledge = ScriptKnowledge {
    default_direction: TextDirection::RightToLeft,
    subst_features: SUBST_FEATURES,
    pos_features: POS_FEATURES,
};

pub(crate) fn seek_script(script_tag: Tag) -> Option<&'static ScriptKnowledge> {
    (script_tag == Tag::new(b"arab")).then_some(&ARABIC_KNOWLEDGE)
}

/// The joining type driving the positional state machine.
fn joining_type(codepoint: char) -> JoiningType {
    let joining = get_joining_type(codepoint);

    // a transparent character only stays transparent when its general
    // category says it takes no visual space of its own
    if joining == JoiningType::Transparent {
        return match get_general_category(codepoint) {
            GeneralCategory::NonspacingMark
            | GeneralCategory::EnclosingMark
            | GeneralCategory::Format => JoiningType::Transparent,
            _ => JoiningType::NonJoining,
        };
    }

    joining
}

fn joins_from_left(joining: JoiningType) -> bool {
    matches!(joining, JoiningType::RightJoining | JoiningType::DualJoining)
}

/// Stamp every glyph's feature mask with the positional form its joining
/// context selects.
///
/// Must run after glyph discovery (one glyph per code point) and before
/// substitution.
pub(crate) fn put_feature_masks(album: &mut Album, codepoints: &CodepointSequence) {
    let mut iter = codepoints.iter();

    let mut current_index = 0usize;
    let mut next_index = 0usize;
    let mut prior_joining = JoiningType::NonJoining;
    let mut joining = match iter.next() {
        Some((_, codepoint)) => Some(joining_type(codepoint)),
        None => None,
    };

    while let Some(mut current_joining) = joining {
        let mut feature_mask = 0u16;
        let mut next_joining = None;

        // the joining type of the next character, skipping transparents and
        // normalizing join-causers to dual
        for (_, next_codepoint) in iter.by_ref() {
            next_index += 1;
            let candidate = joining_type(next_codepoint);
            next_joining = Some(candidate);

            match candidate {
                JoiningType::Transparent => continue,
                JoiningType::JoinCausing => {
                    next_joining = Some(JoiningType::DualJoining);
                    break;
                }
                _ => break,
            }
        }

        loop {
            match current_joining {
                JoiningType::RightJoining => {
                    feature_mask |= if prior_joining == JoiningType::DualJoining {
                        feature_mask::FINAL
                    } else {
                        feature_mask::ISOLATED
                    };
                }

                JoiningType::DualJoining => {
                    let joins_next = next_joining.is_some_and(joins_from_left);
                    feature_mask |= if prior_joining == JoiningType::DualJoining {
                        if joins_next {
                            feature_mask::MEDIAL
                        } else {
                            feature_mask::FINAL
                        }
                    } else if joins_next {
                        feature_mask::INITIAL
                    } else {
                        feature_mask::ISOLATED
                    };
                }

                // can only occur for the first character; behaves as dual
                JoiningType::JoinCausing => {
                    current_joining = JoiningType::DualJoining;
                    continue;
                }

                // can only occur for the first character; behaves as if
                // there was no character at all
                JoiningType::Transparent => {
                    current_joining = JoiningType::NonJoining;
                }

                _ => {}
            }
            break;
        }

        album.set_feature_mask(current_index, feature_mask);

        prior_joining = current_joining;
        current_index = next_index;
        joining = next_joining;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::album::GlyphTraits;
    use types::GlyphId16;

    fn stamped_masks(text: &str) -> Vec<u16> {
        let codepoints = CodepointSequence::new(text, false);
        let mut album = Album::new();
        album.reset(codepoints.codeunit_count(), false);
        album.begin_filling();
        for (index, _) in codepoints.iter() {
            album.add_glyph(GlyphId16::new(0), GlyphTraits::NONE, index);
        }
        put_feature_masks(&mut album, &codepoints);
        (0..album.glyph_count())
            .map(|index| album.feature_mask(index))
            .collect()
    }

    #[test]
    fn beh_reh_alef_take_initial_final_isolated() {
        // BA (dual), RA (right), ALEF (right)
        let masks = stamped_masks("\u{0628}\u{0631}\u{0627}");
        assert_eq!(
            masks,
            vec![
                feature_mask::INITIAL,
                feature_mask::FINAL,
                feature_mask::ISOLATED
            ]
        );
    }

    #[test]
    fn dual_run_produces_initial_medial_final() {
        // SEEN BA SEEN, all dual joining
        let masks = stamped_masks("\u{0633}\u{0628}\u{0633}");
        assert_eq!(
            masks,
            vec![
                feature_mask::INITIAL,
                feature_mask::MEDIAL,
                feature_mask::FINAL
            ]
        );
    }

    #[test]
    fn transparent_marks_do_not_break_joining() {
        // BA, FATHA (transparent mark), BA
        let masks = stamped_masks("\u{0628}\u{064E}\u{0628}");
        assert_eq!(masks[0], feature_mask::INITIAL);
        // the skipped transparent keeps its default mask
        assert_eq!(masks[1], crate::album::DEFAULT_FEATURE_MASK);
        assert_eq!(masks[2], feature_mask::FINAL);
    }

    #[test]
    fn isolated_letters_between_spaces() {
        let masks = stamped_masks("\u{0627} \u{0627}");
        assert_eq!(masks[0], feature_mask::ISOLATED);
        assert_eq!(masks[1], 0);
        assert_eq!(masks[2], feature_mask::ISOLATED);
    }

    #[test]
    fn zwj_causes_joining() {
        // BA ZWJ: the join causer behaves as dual, so BA takes initial form
        let masks = stamped_masks("\u{0628}\u{200D}");
        assert_eq!(masks[0], feature_mask::INITIAL);
    }
}
