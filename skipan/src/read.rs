//! Traits and errors for interpreting font data

use crate::font_data::FontData;

/// A type that can be read from raw table data.
///
/// This trait is implemented for all font tables that are self-describing:
/// that is, tables that do not require any external state in order to
/// interpret their underlying bytes.
pub trait FontRead<'a>: Sized {
    /// Read an instance of `Self` from the provided data.
    ///
    /// In the case of a table with multiple on-disk formats, this method is
    /// responsible for inspecting the format field and selecting the
    /// matching variant.
    fn read(data: FontData<'a>) -> Result<Self, ReadError>;
}

/// An error that occurs when reading font data
#[derive(Debug, Clone, PartialEq)]
pub enum ReadError {
    OutOfBounds,
    // i64 is flexible enough to store any value we might encounter
    InvalidFormat(i64),
    InvalidArrayLen,
}

impl std::fmt::Display for ReadError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ReadError::OutOfBounds => write!(f, "an offset was out of bounds"),
            ReadError::InvalidFormat(x) => write!(f, "invalid format '{x}'"),
            ReadError::InvalidArrayLen => {
                write!(f, "an array length was not a multiple of the item size")
            }
        }
    }
}

impl std::error::Error for ReadError {}
