//! Error types for reflective CDR encoding and decoding.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while sizing, writing, or reading a message.
///
/// Malformed descriptors are not represented here: a descriptor that lies
/// about its layout is a programming error and aborts via `assert!` rather
/// than surfacing as a recoverable value.
#[derive(Debug, Error)]
pub enum Error {
    /// Destination buffer cannot hold the bytes about to be written.
    #[error("destination buffer too small: need {needed} more bytes, {remaining} left")]
    CapacityExceeded { needed: usize, remaining: usize },

    /// Source buffer ends before a declared field does.
    #[error("input truncated: need {needed} bytes, {remaining} left")]
    TruncatedInput { needed: usize, remaining: usize },

    /// First bytes of the buffer name an encoding this codec does not speak.
    #[error("unrecognized encapsulation identifier {0:#06x}")]
    BadEncapsulation(u16),

    /// An 8-bit string payload does not end in a null terminator.
    #[error("string data is not null-terminated")]
    MissingNullTerminator,

    /// A wide-string byte count that does not divide into whole characters.
    #[error("wide string byte count {0} is not a multiple of the character size")]
    BadWideStringLength(usize),

    /// A primitive discriminant with no corresponding kind.
    #[error("unknown type discriminant {0}")]
    UnknownTypeDiscriminant(u8),

    /// A descriptor node with no wire mapping for the requested operation.
    #[error("no wire mapping for {0}")]
    UnsupportedShape(&'static str),
}
