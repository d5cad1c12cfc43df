//! Standard (horizontal, non-joining) script knowledge.

use types::Tag;

use super::{FeatureInfo, FeatureNature, ScriptKnowledge};
use crate::TextDirection;

const SUBST_FEATURES: &[FeatureInfo] = &[
    // language based forms
    FeatureInfo {
        group: 0,
        simultaneous: false,
        tag: Tag::new(b"ccmp"),
        nature: FeatureNature::On,
        mask: 0,
    },
    // typographical forms
    FeatureInfo {
        group: 1,
        simultaneous: false,
        tag: Tag::new(b"liga"),
        nature: FeatureNature::On,
        mask: 0,
    },
    FeatureInfo {
        group: 1,
        simultaneous: false,
        tag: Tag::new(b"clig"),
        nature: FeatureNature::On,
        mask: 0,
    },
];

const POS_FEATURES: &[FeatureInfo] = &[
    FeatureInfo {
        group: 2,
        simultaneous: false,
        tag: Tag::new(b"dist"),
        nature: FeatureNature::Required,
        mask: 0,
    },
    FeatureInfo {
        group: 2,
        simultaneous: false,
        tag: Tag::new(b"kern"),
        nature: FeatureNature::On,
        mask: 0,
    },
    FeatureInfo {
        group: 2,
        simultaneous: false,
        tag: Tag::new(b"mark"),
        nature: FeatureNature::Required,
        mask: 0,
    },
    FeatureInfo {
        group: 2,
        simultaneous: false,
        tag: Tag::new(b"mkmk"),
        nature: FeatureNature::Required,
        mask: 0,
    },
];

static STANDARD_KNOWLEDGE: ScriptKnowledge = ScriptKnowledge {
    default_direction: TextDirection::LeftToRight,
    subst_features: SUBST_FEATURES,
    pos_features: POS_FEATURES,
};

pub(crate) fn seek_script(script_tag: Tag) -> Option<&'static ScriptKnowledge> {
    const SCRIPTS: &[&[u8; 4]] = &[
        b"armn", b"cyrl", b"geor", b"grek", b"latn", b"ogam", b"runr",
    ];

    SCRIPTS
        .iter()
        .any(|tag| Tag::new(tag) == script_tag)
        .then_some(&STANDARD_KNOWLEDGE)
}
