//! Reflective CDR reader.
//!
//! Mirrors the writer's traversal with the validation the wire side needs:
//! every read is bounds-checked against the source buffer, string payloads
//! must carry their null terminator, counts are checked against the
//! remaining input before any allocation happens on their behalf, and
//! multi-byte primitives are byte-swapped when the header's endianness flag
//! disagrees with the local native order.

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::error::{Error, Result};
use crate::request::RequestHeader;
use crate::schema::{BoolVectorType, PrimitiveKind, SequenceType, StructType, U8StringType,
    U16StringType, ValueType};
use crate::serializer::{
    DEFAULT_MAX_ALIGNMENT, ENCAPSULATION_HEADER_SIZE, EncodingVersion, LEGACY_WCHAR_SIZE,
};

/// Bounds-checked consumption of an encoded buffer.
///
/// Shared by the binary decoder and the diagnostic printer so the two cannot
/// drift apart on alignment or validation.
pub(crate) struct DecodeCursor<'a> {
    data: &'a [u8],
    position: usize,
    origin: usize,
    wire_is_little: bool,
}

impl<'a> DecodeCursor<'a> {
    pub(crate) fn position(&self) -> usize {
        self.position
    }

    pub(crate) fn offset(&self) -> usize {
        self.position - self.origin
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    pub(crate) fn rebase(&mut self, delta: isize) {
        self.origin = self
            .origin
            .checked_add_signed(delta)
            .expect("cursor origin moved before the start of the buffer");
    }

    pub(crate) fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(Error::TruncatedInput {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let head = &self.data[self.position..self.position + n];
        self.position += n;
        Ok(head)
    }

    /// Consume alignment padding relative to the body origin.
    pub(crate) fn align(&mut self, alignment: usize) -> Result<()> {
        let misaligned = self.offset() % alignment;
        if alignment > 1 && misaligned != 0 {
            self.take(alignment - misaligned)?;
        }
        Ok(())
    }

    /// Guard a wire count against the remaining input before anything is
    /// allocated on its behalf.
    pub(crate) fn validate_count(&self, count: usize, element_size: usize) -> Result<()> {
        let element_size = element_size.max(1);
        if count > self.remaining() / element_size {
            return Err(Error::TruncatedInput {
                needed: count.saturating_mul(element_size),
                remaining: self.remaining(),
            });
        }
        Ok(())
    }

    pub(crate) fn swap_bytes(&self) -> bool {
        self.wire_is_little != cfg!(target_endian = "little")
    }

    pub(crate) fn get_u16(&self, bytes: &[u8]) -> u16 {
        if self.wire_is_little {
            LittleEndian::read_u16(bytes)
        } else {
            BigEndian::read_u16(bytes)
        }
    }

    pub(crate) fn get_u32(&self, bytes: &[u8]) -> u32 {
        if self.wire_is_little {
            LittleEndian::read_u32(bytes)
        } else {
            BigEndian::read_u32(bytes)
        }
    }

    pub(crate) fn get_u64(&self, bytes: &[u8]) -> u64 {
        if self.wire_is_little {
            LittleEndian::read_u64(bytes)
        } else {
            BigEndian::read_u64(bytes)
        }
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16> {
        self.align(2)?;
        let bytes = self.take(2)?;
        Ok(self.get_u16(bytes))
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32> {
        self.align(4)?;
        let bytes = self.take(4)?;
        Ok(self.get_u32(bytes))
    }

    pub(crate) fn read_u64(&mut self) -> Result<u64> {
        self.align(8)?;
        let bytes = self.take(8)?;
        Ok(self.get_u64(bytes))
    }

    /// Length-prefixed 8-bit string: returns the contents without the
    /// terminator. A zero-length payload is tolerated as an empty string;
    /// anything longer must end in a null byte.
    pub(crate) fn read_string_contents(&mut self) -> Result<&'a [u8]> {
        let len = self.read_u32()? as usize;
        self.validate_count(len, 1)?;
        if len == 0 {
            return Ok(&[]);
        }
        let bytes = self.take(len)?;
        let (terminator, contents) = bytes.split_last().expect("len is nonzero");
        if *terminator != 0 {
            return Err(Error::MissingNullTerminator);
        }
        Ok(contents)
    }

    /// Length-prefixed wide string; the count's meaning depends on the
    /// encoding version.
    pub(crate) fn read_wide_string(&mut self, eversion: EncodingVersion) -> Result<Vec<u16>> {
        let len = self.read_u32()? as usize;
        match eversion {
            EncodingVersion::CdrLegacy => {
                // element count; each character widened on the wire
                self.validate_count(len, LEGACY_WCHAR_SIZE)?;
                let mut value = Vec::with_capacity(len);
                for _ in 0..len {
                    value.push(self.read_u32()? as u16);
                }
                Ok(value)
            }
            EncodingVersion::Cdr1 => {
                // byte count over the raw character span
                if len % size_of::<u16>() != 0 {
                    return Err(Error::BadWideStringLength(len));
                }
                let count = len / size_of::<u16>();
                self.validate_count(count, size_of::<u16>())?;
                let mut value = Vec::with_capacity(count);
                for _ in 0..count {
                    value.push(self.read_u16()?);
                }
                Ok(value)
            }
        }
    }
}

/// Parse the 4-byte encapsulation header and position a cursor at the body
/// origin, with the header rebased out of the alignment arithmetic.
pub(crate) fn parse_encapsulation(data: &[u8]) -> Result<(DecodeCursor<'_>, EncodingVersion)> {
    let mut cursor = DecodeCursor {
        data,
        position: 0,
        origin: 0,
        wire_is_little: cfg!(target_endian = "little"),
    };
    let header = cursor.take(ENCAPSULATION_HEADER_SIZE)?;
    let identifier = u16::from_be_bytes([header[0], header[1]]);
    let eversion =
        EncodingVersion::from_tag(header[0]).ok_or(Error::BadEncapsulation(identifier))?;
    cursor.wire_is_little = match header[1] {
        0x00 => false,
        0x01 => true,
        _ => return Err(Error::BadEncapsulation(identifier)),
    };
    cursor.rebase(ENCAPSULATION_HEADER_SIZE as isize);
    Ok((cursor, eversion))
}

/// Fewest wire bytes one value of `value_type` can occupy. A lower bound,
/// used to reject counts no remaining input could satisfy.
pub(crate) fn min_wire_size(value_type: &ValueType) -> usize {
    let bound = match value_type {
        ValueType::Primitive(kind) => kind.size_of(),
        ValueType::U8String(_)
        | ValueType::U16String(_)
        | ValueType::Sequence(_)
        | ValueType::BoolVector(_) => 4,
        ValueType::Array(ty) => ty.len * min_wire_size(&ty.element),
        ValueType::Struct(ty) => ty
            .members
            .iter()
            .map(|member| min_wire_size(&member.value_type))
            .sum(),
    };
    bound.max(1)
}

/// Walks an encoded buffer and populates a destination object image.
pub struct CdrReader<'a> {
    cursor: DecodeCursor<'a>,
    eversion: EncodingVersion,
    max_align: usize,
}

impl<'a> CdrReader<'a> {
    /// Parse the encapsulation header and position the reader at the body.
    pub fn new(data: &'a [u8]) -> Result<Self> {
        let (cursor, eversion) = parse_encapsulation(data)?;
        Ok(Self {
            cursor,
            eversion,
            max_align: DEFAULT_MAX_ALIGNMENT,
        })
    }

    /// Bytes consumed so far, including the encapsulation header.
    pub fn bytes_consumed(&self) -> usize {
        self.cursor.position()
    }

    /// Decode the correlation envelope a request-wrapped message starts
    /// with.
    pub fn read_request_header(&mut self) -> Result<RequestHeader> {
        let guid = self.cursor.read_u64()?;
        let seq = self.cursor.read_u64()? as i64;
        Ok(RequestHeader { guid, seq })
    }

    /// Decode a message body into `obj`, the byte image of a destination
    /// instance laid out per `ty`.
    pub fn deserialize_top_level(&mut self, obj: &mut [u8], ty: &StructType) -> Result<()> {
        assert_eq!(
            obj.len(),
            ty.size_of,
            "{}: object image does not match the declared struct size",
            ty.type_name
        );
        if ty.members.is_empty() && self.eversion == EncodingVersion::CdrLegacy {
            self.cursor.take(1)?;
            return Ok(());
        }
        self.deserialize_struct(obj, ty)
    }

    fn align(&mut self, unit: usize) -> Result<()> {
        self.cursor.align(unit.min(self.max_align))
    }

    fn deserialize_value(&mut self, obj: &mut [u8], value_type: &ValueType) -> Result<()> {
        match value_type {
            ValueType::Primitive(kind) => self.deserialize_primitive(obj, *kind),
            ValueType::U8String(ty) => self.deserialize_u8_string(obj, ty),
            ValueType::U16String(ty) => self.deserialize_u16_string(obj, ty),
            ValueType::Struct(ty) => self.deserialize_struct(obj, ty),
            ValueType::Array(ty) => {
                self.cursor
                    .validate_count(ty.len, min_wire_size(&ty.element))?;
                self.deserialize_elements(obj, &ty.element, ty.len)
            }
            ValueType::Sequence(ty) => self.deserialize_sequence(obj, ty),
            ValueType::BoolVector(ty) => self.deserialize_bool_vector(obj, ty),
        }
    }

    fn deserialize_primitive(&mut self, obj: &mut [u8], kind: PrimitiveKind) -> Result<()> {
        let size = kind.size_of();
        self.align(size)?;
        let bytes = self.cursor.take(size)?;
        if kind == PrimitiveKind::Boolean {
            // any nonzero byte decodes as true
            obj[0] = (bytes[0] != 0) as u8;
        } else if self.cursor.swap_bytes() {
            for (dst, src) in obj[..size].iter_mut().zip(bytes.iter().rev()) {
                *dst = *src;
            }
        } else {
            obj[..size].copy_from_slice(bytes);
        }
        Ok(())
    }

    fn deserialize_struct(&mut self, obj: &mut [u8], ty: &StructType) -> Result<()> {
        for member in &ty.members {
            let range = member.offset..member.offset + member.value_type.size_of();
            self.deserialize_value(&mut obj[range], &member.value_type)?;
        }
        Ok(())
    }

    fn deserialize_u8_string(&mut self, obj: &mut [u8], ty: &U8StringType) -> Result<()> {
        let contents = self.cursor.read_string_contents()?;
        ty.access.assign(obj, contents);
        Ok(())
    }

    fn deserialize_u16_string(&mut self, obj: &mut [u8], ty: &U16StringType) -> Result<()> {
        let value = self.cursor.read_wide_string(self.eversion)?;
        ty.access.assign(obj, &value);
        Ok(())
    }

    fn deserialize_sequence(&mut self, obj: &mut [u8], ty: &SequenceType) -> Result<()> {
        let len = self.cursor.read_u32()? as usize;
        self.cursor.validate_count(len, min_wire_size(&ty.element))?;
        // the destination is sized before any element is read into it
        ty.access.resize(obj, len);
        let contents = ty.access.contents_mut(obj);
        self.deserialize_elements(contents, &ty.element, len)
    }

    /// Mirror of the writer's element walk: bulk copy only when memory and
    /// wire representations coincide and no swap is needed.
    fn deserialize_elements(
        &mut self,
        contents: &mut [u8],
        element: &ValueType,
        len: usize,
    ) -> Result<()> {
        if len == 0 {
            return Ok(());
        }
        if let ValueType::Primitive(kind) = element {
            if kind.is_bulk_copyable() && !self.cursor.swap_bytes() {
                let size = kind.size_of();
                self.align(size)?;
                let bytes = self.cursor.take(len * size)?;
                contents[..len * size].copy_from_slice(bytes);
                return Ok(());
            }
        }
        let stride = element.size_of();
        for chunk in contents[..len * stride].chunks_exact_mut(stride) {
            self.deserialize_value(chunk, element)?;
        }
        Ok(())
    }

    fn deserialize_bool_vector(&mut self, obj: &mut [u8], ty: &BoolVectorType) -> Result<()> {
        let len = self.cursor.read_u32()? as usize;
        self.cursor.validate_count(len, 1)?;
        ty.access.resize(obj, len);
        for index in 0..len {
            let byte = self.cursor.take(1)?[0];
            ty.access.set(obj, index, byte != 0);
        }
        Ok(())
    }
}

/// Decode an encoded message into `obj`, the byte image of a destination
/// instance described by `ty`.
pub fn deserialize(obj: &mut [u8], ty: &StructType, data: &[u8]) -> Result<()> {
    let result = CdrReader::new(data).and_then(|mut reader| reader.deserialize_top_level(obj, ty));
    if let Err(error) = &result {
        tracing::warn!(type_name = %ty.type_name, %error, "failed to deserialize message");
    }
    result
}

/// Decode a request-wrapped message, returning the correlation envelope.
pub fn deserialize_request(obj: &mut [u8], ty: &StructType, data: &[u8]) -> Result<RequestHeader> {
    let mut reader = CdrReader::new(data)?;
    let header = reader.read_request_header()?;
    reader.deserialize_top_level(obj, ty)?;
    Ok(header)
}
