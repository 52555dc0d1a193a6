//! RPC correlation envelope: a caller identifier and sequence number written
//! between the encapsulation header and the message body.

use crate::error::Result;
use crate::schema::StructType;
use crate::serializer::CdrWriter;

/// Correlates a service request with its reply.
///
/// On the wire the envelope occupies the first [`REQUEST_HEADER_SIZE`] bytes
/// of the body and counts toward the body's alignment base.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RequestHeader {
    /// Stable identifier of the calling endpoint.
    pub guid: u64,
    /// Per-caller request sequence number.
    pub seq: i64,
}

/// Bytes the envelope occupies at the start of the body.
pub const REQUEST_HEADER_SIZE: usize = 16;

/// Size a request-wrapped message with the default configuration.
pub fn get_request_serialized_size(
    header: RequestHeader,
    obj: &[u8],
    ty: &StructType,
) -> Result<usize> {
    CdrWriter::default().request_serialized_size(header, obj, ty)
}

/// Write a request-wrapped message with the default configuration.
pub fn serialize_request(
    dest: &mut [u8],
    header: RequestHeader,
    obj: &[u8],
    ty: &StructType,
) -> Result<usize> {
    CdrWriter::default().serialize_request(dest, header, obj, ty)
}
