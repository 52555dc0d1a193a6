//! Diagnostic decoder.
//!
//! Renders an encoded message as human-readable text without needing a live
//! destination instance, which makes wire captures inspectable on their own.
//! It drives the same [`DecodeCursor`](crate::deserializer) the binary
//! decoder drives, so alignment and bounds validation cannot diverge
//! between the two; only the leaf actions differ.

use crate::deserializer::{DecodeCursor, min_wire_size, parse_encapsulation};
use crate::error::{Error, Result};
use crate::schema::{PrimitiveKind, StructType, ValueType};
use crate::serializer::{DEFAULT_MAX_ALIGNMENT, EncodingVersion};

/// Walks an encoded buffer and renders each decoded value as text.
pub struct CdrPrinter<'a> {
    cursor: DecodeCursor<'a>,
    eversion: EncodingVersion,
    max_align: usize,
    out: String,
}

impl<'a> CdrPrinter<'a> {
    /// Parse the encapsulation header and position the printer at the body.
    pub fn new(data: &'a [u8]) -> Result<Self> {
        let (cursor, eversion) = parse_encapsulation(data)?;
        Ok(Self {
            cursor,
            eversion,
            max_align: DEFAULT_MAX_ALIGNMENT,
            out: String::new(),
        })
    }

    /// Render the whole message as indented `name: value` lines.
    pub fn print_top_level(mut self, ty: &StructType) -> Result<String> {
        if ty.members.is_empty() && self.eversion == EncodingVersion::CdrLegacy {
            self.cursor.take(1)?;
            return Ok(self.out);
        }
        self.print_struct(ty, 0)?;
        Ok(self.out)
    }

    fn print_struct(&mut self, ty: &StructType, indent: usize) -> Result<()> {
        for member in &ty.members {
            self.out.push_str(&"  ".repeat(indent));
            self.out.push_str(&member.name);
            self.out.push(':');
            match &member.value_type {
                ValueType::Struct(nested) => {
                    self.out.push('\n');
                    self.print_struct(nested, indent + 1)?;
                }
                other => {
                    self.out.push(' ');
                    self.print_value(other)?;
                    self.out.push('\n');
                }
            }
        }
        Ok(())
    }

    /// Compact single-line rendering, used for everything below the member
    /// level.
    fn print_value(&mut self, value_type: &ValueType) -> Result<()> {
        match value_type {
            ValueType::Primitive(kind) => self.print_primitive(*kind),
            ValueType::U8String(_) => self.print_u8_string(),
            ValueType::U16String(_) => self.print_u16_string(),
            ValueType::Struct(ty) => self.print_inline_struct(ty),
            ValueType::Array(ty) => {
                self.cursor
                    .validate_count(ty.len, min_wire_size(&ty.element))?;
                self.print_elements(&ty.element, ty.len)
            }
            ValueType::Sequence(ty) => {
                let len = self.cursor.read_u32()? as usize;
                self.cursor
                    .validate_count(len, min_wire_size(&ty.element))?;
                self.print_elements(&ty.element, len)
            }
            ValueType::BoolVector(_) => self.print_bool_vector(),
        }
    }

    fn print_inline_struct(&mut self, ty: &StructType) -> Result<()> {
        self.out.push('{');
        for (index, member) in ty.members.iter().enumerate() {
            if index != 0 {
                self.out.push_str(", ");
            }
            self.out.push_str(&member.name);
            self.out.push_str(": ");
            self.print_value(&member.value_type)?;
        }
        self.out.push('}');
        Ok(())
    }

    fn print_elements(&mut self, element: &ValueType, len: usize) -> Result<()> {
        self.out.push('[');
        for index in 0..len {
            if index != 0 {
                self.out.push_str(", ");
            }
            self.print_value(element)?;
        }
        self.out.push(']');
        Ok(())
    }

    fn print_primitive(&mut self, kind: PrimitiveKind) -> Result<()> {
        let size = kind.size_of();
        self.cursor.align(size.min(self.max_align))?;
        let bytes = self.cursor.take(size)?;
        let rendered = match kind {
            PrimitiveKind::Boolean => format!("{}", bytes[0] != 0),
            PrimitiveKind::Octet | PrimitiveKind::UInt8 => format!("{}", bytes[0]),
            PrimitiveKind::Int8 => format!("{}", bytes[0] as i8),
            PrimitiveKind::Char => format!("'{}'", (bytes[0] as char).escape_default()),
            PrimitiveKind::WChar | PrimitiveKind::UInt16 => {
                format!("{}", self.cursor.get_u16(bytes))
            }
            PrimitiveKind::Int16 => format!("{}", self.cursor.get_u16(bytes) as i16),
            PrimitiveKind::UInt32 => format!("{}", self.cursor.get_u32(bytes)),
            PrimitiveKind::Int32 => format!("{}", self.cursor.get_u32(bytes) as i32),
            PrimitiveKind::UInt64 => format!("{}", self.cursor.get_u64(bytes)),
            PrimitiveKind::Int64 => format!("{}", self.cursor.get_u64(bytes) as i64),
            PrimitiveKind::Float => format!("{}", f32::from_bits(self.cursor.get_u32(bytes))),
            PrimitiveKind::Double => format!("{}", f64::from_bits(self.cursor.get_u64(bytes))),
            // no portable text rendering for extended floats
            PrimitiveKind::LongDouble => return Err(Error::UnsupportedShape("long double")),
        };
        self.out.push_str(&rendered);
        Ok(())
    }

    fn print_u8_string(&mut self) -> Result<()> {
        let contents = self.cursor.read_string_contents()?;
        self.out
            .push_str(&format!("{:?}", String::from_utf8_lossy(contents)));
        Ok(())
    }

    fn print_u16_string(&mut self) -> Result<()> {
        let value = self.cursor.read_wide_string(self.eversion)?;
        self.out
            .push_str(&format!("{:?}", String::from_utf16_lossy(&value)));
        Ok(())
    }

    fn print_bool_vector(&mut self) -> Result<()> {
        let len = self.cursor.read_u32()? as usize;
        self.cursor.validate_count(len, 1)?;
        self.out.push('[');
        for index in 0..len {
            if index != 0 {
                self.out.push_str(", ");
            }
            let byte = self.cursor.take(1)?[0];
            self.out.push_str(if byte != 0 { "true" } else { "false" });
        }
        self.out.push(']');
        Ok(())
    }
}

/// Render an encoded message as indented `name: value` text.
pub fn print_message(data: &[u8], ty: &StructType) -> Result<String> {
    CdrPrinter::new(data)?.print_top_level(ty)
}
