//! Reflective CDR writer.
//!
//! One traversal over a (descriptor, object image) pair drives both passes:
//! run it over a [`SizeCursor`] to learn the exact encoded length, then over
//! a [`DataCursor`] wrapping a buffer of that length to produce the bytes.
//! The two runs observe identical offsets at every step.

use crate::cursor::{DataCursor, SizeCursor, WriteCursor};
use crate::error::Result;
use crate::request::RequestHeader;
use crate::schema::{
    ArrayType, BoolVectorType, PrimitiveKind, SequenceType, StructType, ValueType,
};

/// Encapsulation header length; also the rebase distance that keeps the
/// header outside the alignment arithmetic.
pub const ENCAPSULATION_HEADER_SIZE: usize = 4;

/// Elements never align beyond this many bytes.
pub const DEFAULT_MAX_ALIGNMENT: usize = 8;

/// On-wire extent of one legacy wide character.
pub(crate) const LEGACY_WCHAR_SIZE: usize = 4;

/// Endianness flag recorded in byte 1 of the encapsulation header.
#[cfg(target_endian = "little")]
pub const NATIVE_ENDIAN_FLAG: u8 = 0x01;
#[cfg(target_endian = "big")]
pub const NATIVE_ENDIAN_FLAG: u8 = 0x00;

/// Wire-format variants carried in byte 0 of the encapsulation header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EncodingVersion {
    /// Format spoken by legacy peers: wide strings carry element counts and
    /// empty messages emit a placeholder byte.
    #[default]
    CdrLegacy,
    /// Current format: wide strings carry byte counts.
    Cdr1,
}

impl EncodingVersion {
    pub(crate) fn tag(self) -> u8 {
        match self {
            Self::CdrLegacy => 0x00,
            Self::Cdr1 => 0x01,
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0x00 => Some(Self::CdrLegacy),
            0x01 => Some(Self::Cdr1),
            _ => None,
        }
    }
}

/// The recursive descriptor walk, generic over the cursor capability.
#[derive(Clone, Copy, Debug)]
pub struct CdrWriter {
    eversion: EncodingVersion,
    max_align: usize,
}

impl Default for CdrWriter {
    fn default() -> Self {
        Self::new(EncodingVersion::default())
    }
}

impl CdrWriter {
    pub fn new(eversion: EncodingVersion) -> Self {
        Self {
            eversion,
            max_align: DEFAULT_MAX_ALIGNMENT,
        }
    }

    /// Bound padding below the default. `max_align` must be a power of two.
    pub fn with_max_alignment(mut self, max_align: usize) -> Self {
        assert!(max_align.is_power_of_two());
        self.max_align = max_align;
        self
    }

    /// Size a message: the traversal over a [`SizeCursor`].
    pub fn serialized_size(&self, obj: &[u8], ty: &StructType) -> Result<usize> {
        let mut cursor = SizeCursor::new();
        self.serialize_enveloped(&mut cursor, None, obj, ty)?;
        tracing::trace!(type_name = %ty.type_name, size = cursor.position(), "sized message");
        Ok(cursor.position())
    }

    /// Write a message into `dest`, returning the bytes produced. `dest`
    /// must have been sized by [`CdrWriter::serialized_size`] over the same
    /// descriptor and object.
    pub fn serialize(&self, dest: &mut [u8], obj: &[u8], ty: &StructType) -> Result<usize> {
        let mut cursor = DataCursor::new(dest);
        self.serialize_enveloped(&mut cursor, None, obj, ty)?;
        Ok(cursor.position())
    }

    /// Size a request-wrapped message.
    pub fn request_serialized_size(
        &self,
        header: RequestHeader,
        obj: &[u8],
        ty: &StructType,
    ) -> Result<usize> {
        let mut cursor = SizeCursor::new();
        self.serialize_enveloped(&mut cursor, Some(header), obj, ty)?;
        Ok(cursor.position())
    }

    /// Write a request-wrapped message into `dest`.
    pub fn serialize_request(
        &self,
        dest: &mut [u8],
        header: RequestHeader,
        obj: &[u8],
        ty: &StructType,
    ) -> Result<usize> {
        let mut cursor = DataCursor::new(dest);
        self.serialize_enveloped(&mut cursor, Some(header), obj, ty)?;
        Ok(cursor.position())
    }

    /// Header, optional correlation envelope, body: the entry every variant
    /// shares. Alignment is computed relative to the body origin, so the
    /// encapsulation header is rebased away for the duration of the body.
    fn serialize_enveloped<C: WriteCursor>(
        &self,
        cursor: &mut C,
        header: Option<RequestHeader>,
        obj: &[u8],
        ty: &StructType,
    ) -> Result<()> {
        assert_eq!(
            obj.len(),
            ty.size_of,
            "{}: object image does not match the declared struct size",
            ty.type_name
        );
        self.put_encapsulation_header(cursor)?;
        cursor.rebase(ENCAPSULATION_HEADER_SIZE as isize);
        if let Some(header) = header {
            // the envelope counts toward the body's alignment base
            self.align(cursor, 8)?;
            cursor.put_bytes(&header.guid.to_ne_bytes())?;
            self.align(cursor, 8)?;
            cursor.put_bytes(&header.seq.to_ne_bytes())?;
        }
        if ty.members.is_empty() && self.eversion == EncodingVersion::CdrLegacy {
            // legacy peers expect a placeholder byte for an empty message
            cursor.put_bytes(&[0])?;
        } else {
            self.serialize_struct(cursor, obj, ty)?;
        }
        cursor.rebase(-(ENCAPSULATION_HEADER_SIZE as isize));
        Ok(())
    }

    fn put_encapsulation_header<C: WriteCursor>(&self, cursor: &mut C) -> Result<()> {
        cursor.put_bytes(&[self.eversion.tag(), NATIVE_ENDIAN_FLAG, 0, 0])
    }

    fn align<C: WriteCursor>(&self, cursor: &mut C, unit: usize) -> Result<()> {
        cursor.align(unit.min(self.max_align))
    }

    fn put_u32<C: WriteCursor>(&self, cursor: &mut C, value: usize) -> Result<()> {
        assert!(
            value < u32::MAX as usize,
            "length {value} exceeds what a 32-bit count field can carry"
        );
        self.align(cursor, 4)?;
        cursor.put_bytes(&(value as u32).to_ne_bytes())
    }

    fn serialize_value<C: WriteCursor>(
        &self,
        cursor: &mut C,
        obj: &[u8],
        value_type: &ValueType,
    ) -> Result<()> {
        match value_type {
            ValueType::Primitive(kind) => self.serialize_primitive(cursor, obj, *kind),
            ValueType::U8String(ty) => self.serialize_u8_string(cursor, ty.access.get(obj)),
            ValueType::U16String(ty) => self.serialize_u16_string(cursor, ty.access.get(obj)),
            ValueType::Struct(ty) => self.serialize_struct(cursor, obj, ty),
            ValueType::Array(ty) => self.serialize_array(cursor, obj, ty),
            ValueType::Sequence(ty) => self.serialize_sequence(cursor, obj, ty),
            ValueType::BoolVector(ty) => self.serialize_bool_vector(cursor, obj, ty),
        }
    }

    /// Wire byte order is the producer's native order, recorded in the
    /// header for the consumer, so primitives are copied verbatim.
    fn serialize_primitive<C: WriteCursor>(
        &self,
        cursor: &mut C,
        obj: &[u8],
        kind: PrimitiveKind,
    ) -> Result<()> {
        let size = kind.size_of();
        self.align(cursor, size)?;
        cursor.put_bytes(&obj[..size])
    }

    fn serialize_struct<C: WriteCursor>(
        &self,
        cursor: &mut C,
        obj: &[u8],
        ty: &StructType,
    ) -> Result<()> {
        for member in &ty.members {
            let field = &obj[member.offset..member.offset + member.value_type.size_of()];
            self.serialize_value(cursor, field, &member.value_type)?;
        }
        Ok(())
    }

    /// Count includes the trailing null; payload is the raw bytes plus one
    /// null byte.
    fn serialize_u8_string<C: WriteCursor>(&self, cursor: &mut C, value: &[u8]) -> Result<()> {
        self.put_u32(cursor, value.len() + 1)?;
        cursor.put_bytes(value)?;
        cursor.put_bytes(&[0])
    }

    fn serialize_u16_string<C: WriteCursor>(&self, cursor: &mut C, value: &[u16]) -> Result<()> {
        match self.eversion {
            EncodingVersion::CdrLegacy => {
                // legacy wide strings count elements, each widened on the wire
                self.put_u32(cursor, value.len())?;
                if cursor.ignores_data() {
                    self.align(cursor, LEGACY_WCHAR_SIZE)?;
                    cursor.advance(value.len() * LEGACY_WCHAR_SIZE)
                } else {
                    for &c in value {
                        self.align(cursor, LEGACY_WCHAR_SIZE)?;
                        cursor.put_bytes(&u32::from(c).to_ne_bytes())?;
                    }
                    Ok(())
                }
            }
            EncodingVersion::Cdr1 => {
                // current wide strings count bytes and bulk-copy the span
                self.put_u32(cursor, value.len() * size_of::<u16>())?;
                cursor.put_bytes(u16_bytes(value))
            }
        }
    }

    fn serialize_array<C: WriteCursor>(
        &self,
        cursor: &mut C,
        obj: &[u8],
        ty: &ArrayType,
    ) -> Result<()> {
        self.serialize_elements(cursor, obj, &ty.element, ty.len)
    }

    fn serialize_sequence<C: WriteCursor>(
        &self,
        cursor: &mut C,
        obj: &[u8],
        ty: &SequenceType,
    ) -> Result<()> {
        let len = ty.access.len(obj);
        self.put_u32(cursor, len)?;
        self.serialize_elements(cursor, ty.access.contents(obj), &ty.element, len)
    }

    /// Shared element walk for arrays and sequences: one aligned bulk copy
    /// when the element's memory and wire representations coincide,
    /// element-wise recursion otherwise. Strings, nested messages, and
    /// booleans always take the element-wise path.
    fn serialize_elements<C: WriteCursor>(
        &self,
        cursor: &mut C,
        contents: &[u8],
        element: &ValueType,
        len: usize,
    ) -> Result<()> {
        if len == 0 {
            return Ok(());
        }
        if let ValueType::Primitive(kind) = element {
            if kind.is_bulk_copyable() {
                self.align(cursor, kind.size_of())?;
                return cursor.put_bytes(&contents[..len * kind.size_of()]);
            }
        }
        let stride = element.size_of();
        for chunk in contents[..len * stride].chunks_exact(stride) {
            self.serialize_value(cursor, chunk, element)?;
        }
        Ok(())
    }

    fn serialize_bool_vector<C: WriteCursor>(
        &self,
        cursor: &mut C,
        obj: &[u8],
        ty: &BoolVectorType,
    ) -> Result<()> {
        let len = ty.access.len(obj);
        self.put_u32(cursor, len)?;
        for index in 0..len {
            cursor.put_bytes(&[ty.access.get(obj, index) as u8])?;
        }
        Ok(())
    }
}

fn u16_bytes(value: &[u16]) -> &[u8] {
    // u8 alignment is never stricter than u16, so the cast is always valid
    unsafe { std::slice::from_raw_parts(value.as_ptr().cast(), std::mem::size_of_val(value)) }
}

/// Size a message with the default (legacy) configuration.
pub fn get_serialized_size(obj: &[u8], ty: &StructType) -> Result<usize> {
    CdrWriter::default().serialized_size(obj, ty)
}

/// Write a message with the default configuration. Callers size first, then
/// pass a buffer of exactly that many bytes over the identical descriptor
/// and object.
pub fn serialize(dest: &mut [u8], obj: &[u8], ty: &StructType) -> Result<usize> {
    CdrWriter::default().serialize(dest, obj, ty)
}

/// Size-then-write into a fresh buffer.
pub fn serialize_to_vec(obj: &[u8], ty: &StructType) -> Result<Vec<u8>> {
    let writer = CdrWriter::default();
    let size = writer.serialized_size(obj, ty)?;
    let mut dest = vec![0; size];
    let written = writer.serialize(&mut dest, obj, ty)?;
    debug_assert_eq!(written, size);
    Ok(dest)
}
