//! Reflective CDR codec for runtime-described message types.
//!
//! Given a [`schema::StructType`] descriptor tree and the byte image of an
//! in-memory instance, the codec sizes, writes, and reads a
//! length-prefixed, aligned, endian-aware CDR encoding for an open set of
//! message shapes, with no per-type generated code.
//!
//! The central structural property: one traversal serves both the sizing
//! pass and the writing pass, distinguished only by the
//! [`cursor::WriteCursor`] implementation driving it, so the two passes can
//! never disagree on a message's length. Callers size first, allocate
//! exactly that many bytes, then write:
//!
//! ```rust,ignore
//! let size = rcdr::get_serialized_size(obj, &ty)?;
//! let mut buf = vec![0; size];
//! rcdr::serialize(&mut buf, obj, &ty)?;
//! ```

pub mod cursor;
pub mod deserializer;
pub mod error;
pub mod host;
pub mod printer;
pub mod request;
pub mod schema;
pub mod serializer;

pub use cursor::{DataCursor, SizeCursor, WriteCursor};
pub use deserializer::{CdrReader, deserialize, deserialize_request};
pub use error::{Error, Result};
pub use printer::{CdrPrinter, print_message};
pub use request::{
    REQUEST_HEADER_SIZE, RequestHeader, get_request_serialized_size, serialize_request,
};
pub use schema::{
    ArrayType, BoolVectorType, ContainerKind, Member, PrimitiveKind, SequenceType, StructType,
    U8StringType, U16StringType, ValueKind, ValueType, classify_container,
};
pub use serializer::{
    CdrWriter, DEFAULT_MAX_ALIGNMENT, ENCAPSULATION_HEADER_SIZE, EncodingVersion,
    NATIVE_ENDIAN_FLAG, get_serialized_size, serialize, serialize_to_vec,
};
