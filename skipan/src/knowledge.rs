//! Static per-script shaping knowledge.
//!
//! Each supported script family contributes a catalog of the OpenType
//! features it expects, in implementation order, together with each
//! feature's default nature and the locator mask its lookups are gated by.

pub(crate) mod arabic;
pub(crate) mod standard;

use types::Tag;

use crate::TextDirection;

/// Whether a feature applies by default and whether the user may toggle it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FeatureNature {
    /// Applied only when explicitly enabled.
    Off,
    /// Applied by default; the user may disable it.
    On,
    /// Always applied; user overrides cannot disable it.
    Required,
}

/// One feature a script's shaping depends on.
#[derive(Clone, Copy, Debug)]
pub(crate) struct FeatureInfo {
    /// Features sharing a group may be bundled, see `simultaneous`.
    pub group: u8,
    /// Bundle this feature with its group neighbours into one unit so
    /// their lookups apply together.
    pub simultaneous: bool,
    pub tag: Tag,
    pub nature: FeatureNature,
    /// The locator mask gating this feature's lookups; zero gates nothing.
    pub mask: u16,
}

/// Everything the engine knows about shaping one script.
pub(crate) struct ScriptKnowledge {
    pub default_direction: TextDirection,
    /// Substitution features in implementation order.
    pub subst_features: &'static [FeatureInfo],
    /// Positioning features in implementation order.
    pub pos_features: &'static [FeatureInfo],
}

/// The knowledge for the given script, if the engine has any.
pub(crate) fn seek_script(script_tag: Tag) -> Option<&'static ScriptKnowledge> {
    arabic::seek_script(script_tag).or_else(|| standard::seek_script(script_tag))
}
