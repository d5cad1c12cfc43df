//! Shaping complex-script text with OpenType fonts.
//!
//! This crate turns a sequence of Unicode code points plus a font's layout
//! tables into a positioned run of glyphs: context-sensitive forms,
//! ligatures, cursive attachments, mark placement, kerning, and the other
//! behaviors a font's GSUB and GPOS tables describe.
//!
//! The host supplies the font bytes and character map through the
//! [`FontSource`] trait; the engine performs no file or rasterization work
//! of its own. A typical shaping call builds a [`Pattern`] once per
//! font/script/language with a [`Scheme`], then drives an [`Artist`] over
//! an [`Album`] per text run:
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use skipan::{Album, Artist, Font, Scheme, TextDirection};
//! # fn shape(font: Arc<Font>) {
//! let mut scheme = Scheme::new();
//! scheme
//!     .set_font(font)
//!     .set_script_tag(skipan::types::Tag::new(b"arab"));
//! let pattern = scheme.build_pattern().expect("script is supported");
//!
//! let mut album = Album::new();
//! let mut artist = Artist::new();
//! artist
//!     .set_text("\u{0644}\u{0627}")
//!     .set_pattern(pattern)
//!     .set_text_direction(TextDirection::RightToLeft);
//! artist.fill_album(&mut album);
//!
//! let _glyphs = album.glyph_ids();
//! let _advances = album.glyph_advances();
//! # }
//! ```

#![deny(rustdoc::broken_intra_doc_links)]

mod album;
mod artist;
mod codepoints;
mod font;
mod font_data;
mod knowledge;
mod locator;
mod pattern;
mod processor;
mod read;
mod scheme;
pub mod tables;

#[cfg(test)]
mod tests;

pub use album::{Album, GlyphTraits, Point};
pub use artist::Artist;
pub use codepoints::{CodepointSequence, Codepoints};
pub use font::{Font, FontSource, LayoutDirection};
pub use font_data::FontData;
pub use pattern::{FeatureUnit, LookupInfo, Pattern};
pub use read::{FontRead, ReadError};
pub use scheme::Scheme;

/// Public re-export of the font-types crate.
pub extern crate font_types as types;

/// The visual direction text is laid out in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextDirection {
    LeftToRight,
    RightToLeft,
}

/// The order in which a run's code points are consumed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextMode {
    Forward,
    Backward,
}
