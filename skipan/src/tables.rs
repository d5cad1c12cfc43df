//! Views over the OpenType layout tables consumed by the shaping engine.
//!
//! Every view interprets big-endian fields in place over the font-supplied
//! bytes; nothing is copied. Reads are bounds-checked and surface
//! [`ReadError`](crate::ReadError) on truncation, which the lookup
//! evaluators treat as a format mismatch.

pub mod context;
pub mod gdef;
pub mod gpos;
pub mod gsub;
pub mod layout;
pub mod variations;
